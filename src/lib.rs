pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod model;
pub mod snapshot;
pub mod wallet;
