//! Core application layer
//!
//! This module provides:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system
//! - Inventory business logic

pub mod config;
pub mod error;
pub mod logging;
pub mod services;

pub use config::Config;
pub use error::{ErrorContext, ErrorResponse, FieldError, Result, StockroomError};
pub use logging::Logger;
pub use services::ItemService;
