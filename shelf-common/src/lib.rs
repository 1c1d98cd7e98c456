//! # Shelf Common Library
//!
//! Shared code for the Shelf services including:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Event types (ShelfEvent enum) and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
