//! Core types, traits, and error hierarchy shared by all Verdin crates.

pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use error::{Result, VerdinError};
