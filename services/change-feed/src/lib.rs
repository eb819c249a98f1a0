//! Home Change Feed
//!
//! Keeps many observers of a shared home model in sync:
//! - Per-home version counter and bounded event log
//! - Live subscriber mailboxes with drop-oldest backpressure
//! - Catch-up with gap detection for reconnecting clients
//! - Server-Sent Events streams with heartbeats and resume ids
//!
//! # Architecture
//!
//! ```text
//!  Mutation handlers
//!        │ publish
//!   ┌────▼──────┐
//!   │ ChangeFeed│  ← one locked EntityFeed per home
//!   └──┬─────┬──┘
//!      │     │
//! ┌────▼──┐ ┌▼────────┐
//! │EventLog│ │Mailboxes│
//! └────┬──┘ └┬────────┘
//!      │     │
//! ┌────▼─────▼───┐
//! │ StreamSession│  → SSE frames
//! └──────────────┘
//! ```

pub mod backpressure;
pub mod catchup;
pub mod config;
pub mod error;
pub mod event_log;
pub mod events;
pub mod feed;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod session;
pub mod state;
pub mod store;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
