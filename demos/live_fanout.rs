//! Live fan-out demo
//!
//! Run with: cargo run --example live_fanout
//!
//! Set `RUST_LOG=segpub_rs=debug` to see reservation and prebuffer events.
//!
//! A producer publishes one segment every 40ms. Three clients join at
//! different times:
//! - `fast` drains continuously through a `SlotWriter`
//! - `late` joins after a second and starts with the prebuffer replay
//! - `stalled` is pumped only twice a second, fills its ring and has
//!   segments dropped without slowing anyone else down
//!
//! A status line is printed every second.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use segpub_rs::client::{Pump, SegmentSink, SinkError, SlotWriter};
use segpub_rs::media::{Segment, SharedSegment};
use segpub_rs::{PublisherConfig, PublisherContext};
use tracing_subscriber::EnvFilter;

/// Sink that counts what it receives
struct CountingSink {
    name: &'static str,
    segments: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
}

impl CountingSink {
    fn new(name: &'static str) -> (Self, Arc<AtomicU64>) {
        let segments = Arc::new(AtomicU64::new(0));
        let sink = Self {
            name,
            segments: Arc::clone(&segments),
            bytes: Arc::new(AtomicU64::new(0)),
        };
        (sink, segments)
    }
}

impl SegmentSink for CountingSink {
    fn write(&mut self, segment: &SharedSegment) -> Result<(), SinkError> {
        self.segments.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(segment.size() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        println!(
            "[{}] closed after {} segments / {} bytes",
            self.name,
            self.segments.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

fn join(ctx: &Arc<PublisherContext>, name: &'static str) -> (usize, Arc<AtomicU64>) {
    let slot = ctx.reserve().expect("pool has room");
    let (sink, counter) = CountingSink::new(name);
    let replayed = ctx.commit(slot, sink).expect("slot was reserved");
    println!("[{}] joined on slot {} with {} replayed segments", name, slot, replayed);
    (slot, counter)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("segpub_rs=info")),
        )
        .init();

    let config = PublisherConfig::default()
        .max_clients(4)
        .prebuffer_segments(10)
        .client_buffer_segments(16)
        .writer_poll_interval(Duration::from_millis(20));
    let ctx = Arc::new(PublisherContext::new(config)?);

    // Producer
    let producer = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(40));
            let mut id = 0u64;
            while !ctx.is_shutdown() {
                ticker.tick().await;
                id += 1;
                let payload = Bytes::from(vec![(id % 256) as u8; 1316]);
                if let Err(e) = ctx.publish_segment(Segment::shared(id, payload)) {
                    println!("producer stopped: {}", e);
                    break;
                }
            }
        })
    };

    let (fast, fast_count) = join(&ctx, "fast");
    ctx.writer(fast)?.spawn();

    let (stalled, stalled_count) = join(&ctx, "stalled");
    let stalled_writer = SlotWriter::new(Arc::clone(&ctx), stalled);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            match stalled_writer.pump() {
                Ok(Pump::Detached) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    let (late, late_count) = join(&ctx, "late");
    ctx.writer(late)?.spawn();

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let stats = ctx.stats();
        println!(
            "fast={} late={} stalled={} dropped={} drop_ratio={:.2}",
            fast_count.load(Ordering::Relaxed),
            late_count.load(Ordering::Relaxed),
            stalled_count.load(Ordering::Relaxed),
            stats.segments_dropped,
            stats.drop_ratio(),
        );
        println!("{}", ctx.status().to_json()?);
    }

    ctx.shutdown();
    producer.await?;
    Ok(())
}
