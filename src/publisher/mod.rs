//! Segment publisher
//!
//! The publisher distributes each produced segment to every eligible client
//! and keeps a short history for late joiners.
//!
//! # Architecture
//!
//! ```text
//!   Producer ──ingest()──► [ingest ring]
//!                               │ publish()
//!                               ▼
//!                ┌──────────────┼───────────────┐
//!                ▼              ▼               ▼
//!         [slot 0 ring]   [slot 1 ring]   [prebuffer ring]
//!                │              │               │
//!           SlotWriter     SlotWriter       commit() replay
//!                │              │               │
//!                ▼              ▼               ▼
//!              sink           sink         new client's ring
//! ```
//!
//! Segments are `Arc`-shared: every ring holds a reference to the same
//! instance, so fan-out never copies payloads.
//!
//! # Connection lifecycle
//!
//! `reserve` claims a slot, `commit` attaches a sink and replays the
//! prebuffer, `cancel` gives up a reservation, `disconnect` resets the slot.
//! A client that cannot keep up has segments dropped instead of slowing the
//! producer or anyone else.

pub mod config;
pub mod context;
pub mod pool;
pub mod status;

pub use config::PublisherConfig;
pub use context::{FanOut, PublisherContext};
pub use pool::SlotPool;
pub use status::StatusSnapshot;
