mod directory;
mod traits;

pub use directory::DirectoryFetcher;
pub use traits::Fetcher;
