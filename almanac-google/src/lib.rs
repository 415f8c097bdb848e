//! Google Calendar provider for the almanac sync engine.
//!
//! Implements the `almanac-core` remote traits against the Calendar v3
//! REST API and the Google OAuth token endpoint.

pub mod auth;
pub mod client;
mod wire;

pub use auth::GoogleOAuth;
pub use client::GoogleCalendarClient;
