//! Segment buffering

pub mod ring;

pub use ring::SegmentRing;
