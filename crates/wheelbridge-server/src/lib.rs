//! # wheelbridge-server
//!
//! Axum HTTP + `WebSocket` front end for the motion controller.
//!
//! - `GET /ws`: persistent channel; replies to the sender, status fan-out to everyone else
//! - `POST /robot/command`, `POST /robot/dual_wheel`: request/response framing
//! - `GET /health`, `GET /metrics`
//! - Graceful shutdown via two `CancellationToken`s (stop accepting, close sessions)

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, BridgeServer};
pub use shutdown::ShutdownCoordinator;
