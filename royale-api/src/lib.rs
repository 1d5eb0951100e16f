//! Clash Royale REST API surface used by the dashboard.
//!
//! - [`client::RoyaleApi`]: bearer-authenticated client with one method per
//!   upstream resource, in raw (relay) and typed (rendering) flavours
//! - [`types`]: response models for players, battles, cards, clans and
//!   tournaments
//!
//! Paths are relative to the configured base, which defaults to the
//! community proxy at `https://proxy.royaleapi.dev/v1/`.
pub mod client;
pub mod types;

pub use client::{ApiError, Cursor, RoyaleApi};
