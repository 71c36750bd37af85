//! HTTP API module for twingraph
//!
//! Provides REST endpoints for:
//! - The latest graph (`GET /latest`)
//! - Point-in-time graphs (`GET /pit?timestamp=...`)
//! - Health checks (`GET /`, `GET /health`)

pub mod server;

pub use server::{create_server, start_server, AppState, ErrorResponse, GraphQuery, HealthResponse};
