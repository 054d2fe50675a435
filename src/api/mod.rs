//! REST API module
//!
//! This module provides the HTTP server and REST API endpoints including:
//! - Route table with the gated `/api` group
//! - Trace ID, security header and no-cache middleware
//! - Inventory and health handlers

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
pub use server::{build_router, build_state, ApiServer};
