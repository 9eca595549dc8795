pub mod api;
pub mod config;
pub mod detail;
pub mod error;
pub mod logging;
pub mod quiz;
pub mod session;
pub mod terms;
pub mod ui;

pub use error::{Error, Result};
