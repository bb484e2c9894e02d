//! Configuration file handling and logging setup.

pub mod logging;
pub mod settings;

pub use logging::LoggingConfig;
pub use settings::{Region, Settings};
