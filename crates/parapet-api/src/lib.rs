//! HTTP API for account security and avatar management
//!
//! Exposes presigned avatar uploads, session inspection and revocation, and
//! the two-factor enrollment flow over a JSON API. Authentication itself is
//! delegated to an external identity provider; object bytes never transit
//! this server.

pub mod auth;
pub mod auth_client;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
