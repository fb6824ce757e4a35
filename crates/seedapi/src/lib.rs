//! SeedNote API - HTTP surface of the SeedNote Telegram Mini App
//!
//! Serves stored memo attachments to authorized Telegram users and relays
//! memos through the bot. Verification and access rules live in `seedcore`;
//! this crate only maps them onto axum.

pub mod cli;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, run_server, AppState};
