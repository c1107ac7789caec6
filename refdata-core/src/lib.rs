pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod store;

pub use error::{RefDataError, Result};
