//! Core types for the almanac calendar sync engine.
//!
//! This crate provides the provider-neutral pieces shared by the server
//! and calendar providers:
//! - `event` — canonical and raw event shapes
//! - `credential` — persisted OAuth token material
//! - `normalize` — raw → canonical conversion rules
//! - `window` — the fixed fetch window policy
//! - `remote` — trait seams for the provider and OAuth collaborators
//! - `sync` — per-run reporting types

pub mod credential;
pub mod error;
pub mod event;
pub mod normalize;
pub mod remote;
pub mod sync;
pub mod window;

pub use credential::{Credential, TokenSet, CALENDAR_SERVICE};
pub use error::SyncError;
pub use event::{CanonicalEvent, EventOrigin, RawEventTime, RawRemoteEvent, RemoteCalendar};
pub use normalize::normalize;
pub use remote::{EventPayload, OAuthExchange, RemoteCalendarApi};
pub use sync::{CalendarSyncResult, RemoteStatus, SyncRun};
pub use window::{SyncWindow, DEFAULT_MAX_RESULTS};
