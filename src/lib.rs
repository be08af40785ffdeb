//! # segpub-rs
//!
//! Live-distribution core of a media segment publisher.
//!
//! A single producer hands over sequentially numbered segments; a fixed pool
//! of subscribers each receive the live stream plus a replay of recent
//! history when they join. A stalled subscriber never blocks the producer or
//! the other subscribers: once its private queue is full, segments destined
//! for it are dropped.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use segpub_rs::client::ChannelSink;
//! use segpub_rs::media::Segment;
//! use segpub_rs::{PublisherConfig, PublisherContext};
//!
//! # async fn example() -> segpub_rs::error::Result<()> {
//! let ctx = Arc::new(PublisherContext::new(PublisherConfig::default())?);
//!
//! // Connection setup
//! let slot = ctx.reserve()?;
//! let (sink, mut rx) = ChannelSink::new();
//! ctx.commit(slot, sink)?;
//! ctx.writer(slot)?.spawn();
//!
//! // Producer
//! ctx.publish_segment(Segment::shared(1, &b"payload"[..]))?;
//!
//! let segment = rx.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod client;
pub mod error;
pub mod media;
pub mod publisher;
pub mod stats;

pub use error::{Error, Result};
pub use publisher::{PublisherConfig, PublisherContext, StatusSnapshot};
