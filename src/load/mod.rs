pub mod pipeline;
pub mod stage;

pub use pipeline::{LoadPipeline, LoadedPage};
pub use stage::{Placement, RenderStage};
