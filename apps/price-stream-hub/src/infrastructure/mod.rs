//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Upstream WebSocket feed connector.
pub mod feed;

/// Broadcast channel adapter for price-update fan-out.
pub mod broadcast;

/// Configuration loading from environment variables.
pub mod config;

/// HTTP server: SSE streaming, symbol management, and health endpoints.
pub mod http;

/// Tracing subscriber initialization.
pub mod telemetry;
