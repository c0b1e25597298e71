pub mod config;
pub mod config_loader;
pub mod environment;
pub mod error;

pub use config::*;
pub use config_loader::*;
pub use environment::*;
pub use error::*;
