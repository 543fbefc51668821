pub mod bus;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod event;
pub mod extension;
pub mod fetch;
pub mod load;
pub mod monitor;
pub mod stats;
pub mod throttle;
