pub mod config;
pub mod error;

pub use config::MahalleConfig;
pub use error::{MahalleError, Result};
