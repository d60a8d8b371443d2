// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Region handles are recorded as raw index/generation pairs, since decoded
//! events describe a run that is already over.

use terrane_core::bake::BakeToken;
use terrane_core::region::RegionId;
use terrane_core::surface::SurfaceId;
use terrane_core::trace::{
    BakeCompletedEvent, BakeDispatchedEvent, SurfaceEvictedEvent, SurfaceRevivedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_BAKE_DISPATCHED: u8 = 1;
const TAG_BAKE_COMPLETED: u8 = 2;
const TAG_SURFACE_EVICTED: u8 = 3;
const TAG_SURFACE_REVIVED: u8 = 4;
const TAG_UNKNOWN_REMOVAL: u8 = 5;
const TAG_UNMATCHED_COMPLETION: u8 = 6;
const TAG_DISPATCH_REJECTED: u8 = 7;
const TAG_QUEUE_UNDERFLOW: u8 = 8;
const TAG_ORPHAN_FAILURE: u8 = 9;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_region(&mut self, region: RegionId) {
        self.write_u32(region.index());
        self.write_u32(region.generation());
    }
}

impl TraceSink for RecorderSink {
    fn on_bake_dispatched(&mut self, e: &BakeDispatchedEvent) {
        self.write_u8(TAG_BAKE_DISPATCHED);
        self.write_u64(e.token.0);
        self.write_u32(e.surface.0);
        self.write_region(e.region);
        self.write_f64(e.triangles_per_cubic_meter);
        self.write_bool(e.bake_collider);
    }

    fn on_bake_completed(&mut self, e: &BakeCompletedEvent) {
        self.write_u8(TAG_BAKE_COMPLETED);
        self.write_u64(e.token.0);
        self.write_u32(e.surface.0);
        self.write_bool(e.output_written);
        self.write_u64(e.elapsed.ticks());
    }

    fn on_surface_evicted(&mut self, e: &SurfaceEvictedEvent) {
        self.write_u8(TAG_SURFACE_EVICTED);
        self.write_u32(e.surface.0);
        self.write_region(e.region);
    }

    fn on_surface_revived(&mut self, e: &SurfaceRevivedEvent) {
        self.write_u8(TAG_SURFACE_REVIVED);
        self.write_u32(e.surface.0);
        self.write_region(e.region);
    }

    fn on_unknown_removal(&mut self, surface: SurfaceId, region: RegionId) {
        self.write_u8(TAG_UNKNOWN_REMOVAL);
        self.write_u32(surface.0);
        self.write_region(region);
    }

    fn on_unmatched_completion(&mut self, token: BakeToken, surface: SurfaceId) {
        self.write_u8(TAG_UNMATCHED_COMPLETION);
        self.write_u64(token.0);
        self.write_u32(surface.0);
    }

    fn on_dispatch_rejected(&mut self, region: RegionId, surface: SurfaceId) {
        self.write_u8(TAG_DISPATCH_REJECTED);
        self.write_region(region);
        self.write_u32(surface.0);
    }

    fn on_queue_underflow(&mut self) {
        self.write_u8(TAG_QUEUE_UNDERFLOW);
    }

    fn on_orphan_failure(&mut self, surface: SurfaceId) {
        self.write_u8(TAG_ORPHAN_FAILURE);
        self.write_u32(surface.0);
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded trace record, with handles flattened to raw values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A bake request went out to a device.
    BakeDispatched {
        /// Correlation token.
        token: u64,
        /// Surface handle.
        surface: u32,
        /// Region slot index.
        region: u32,
        /// Region slot generation.
        region_generation: u32,
        /// Requested triangle density.
        triangles_per_cubic_meter: f64,
        /// Whether collision geometry was requested.
        bake_collider: bool,
    },
    /// A bake finished.
    BakeCompleted {
        /// Correlation token.
        token: u64,
        /// Surface handle.
        surface: u32,
        /// Whether output buffers were written.
        output_written: bool,
        /// Bake duration in host ticks.
        elapsed_ticks: u64,
    },
    /// A surface was destroyed by eviction.
    SurfaceEvicted {
        /// Surface handle.
        surface: u32,
        /// Region slot index.
        region: u32,
        /// Region slot generation.
        region_generation: u32,
    },
    /// A pending-eviction surface was re-observed.
    SurfaceRevived {
        /// Surface handle.
        surface: u32,
        /// Region slot index.
        region: u32,
        /// Region slot generation.
        region_generation: u32,
    },
    /// Warning: removal for an untracked surface.
    UnknownRemoval {
        /// Surface handle.
        surface: u32,
        /// Region slot index.
        region: u32,
        /// Region slot generation.
        region_generation: u32,
    },
    /// Error: completion matched no in-flight slot.
    UnmatchedCompletion {
        /// Correlation token.
        token: u64,
        /// Surface handle.
        surface: u32,
    },
    /// Error: device refused a dispatch.
    DispatchRejected {
        /// Region slot index.
        region: u32,
        /// Region slot generation.
        region_generation: u32,
        /// Surface handle.
        surface: u32,
    },
    /// Error: slot accounting disagreed with the in-flight count.
    QueueUnderflow,
    /// Error: failed bake with no known requester.
    OrphanFailure {
        /// Surface handle.
        surface: u32,
    },
}

/// Decodes recorded bytes back into events.
///
/// Decoding stops at the first truncated or unrecognized record.
pub fn decode(bytes: &[u8]) -> impl Iterator<Item = RecordedEvent> + '_ {
    Decoder { bytes, pos: 0 }
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn read_u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let end = self.pos.checked_add(4)?;
        let v = u32::from_le_bytes(self.bytes.get(self.pos..end)?.try_into().ok()?);
        self.pos = end;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        let end = self.pos.checked_add(8)?;
        let v = u64::from_le_bytes(self.bytes.get(self.pos..end)?.try_into().ok()?);
        self.pos = end;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        let end = self.pos.checked_add(8)?;
        let v = f64::from_le_bytes(self.bytes.get(self.pos..end)?.try_into().ok()?);
        self.pos = end;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }
}

impl Iterator for Decoder<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        match self.read_u8()? {
            TAG_BAKE_DISPATCHED => Some(RecordedEvent::BakeDispatched {
                token: self.read_u64()?,
                surface: self.read_u32()?,
                region: self.read_u32()?,
                region_generation: self.read_u32()?,
                triangles_per_cubic_meter: self.read_f64()?,
                bake_collider: self.read_bool()?,
            }),
            TAG_BAKE_COMPLETED => Some(RecordedEvent::BakeCompleted {
                token: self.read_u64()?,
                surface: self.read_u32()?,
                output_written: self.read_bool()?,
                elapsed_ticks: self.read_u64()?,
            }),
            TAG_SURFACE_EVICTED => Some(RecordedEvent::SurfaceEvicted {
                surface: self.read_u32()?,
                region: self.read_u32()?,
                region_generation: self.read_u32()?,
            }),
            TAG_SURFACE_REVIVED => Some(RecordedEvent::SurfaceRevived {
                surface: self.read_u32()?,
                region: self.read_u32()?,
                region_generation: self.read_u32()?,
            }),
            TAG_UNKNOWN_REMOVAL => Some(RecordedEvent::UnknownRemoval {
                surface: self.read_u32()?,
                region: self.read_u32()?,
                region_generation: self.read_u32()?,
            }),
            TAG_UNMATCHED_COMPLETION => Some(RecordedEvent::UnmatchedCompletion {
                token: self.read_u64()?,
                surface: self.read_u32()?,
            }),
            TAG_DISPATCH_REJECTED => Some(RecordedEvent::DispatchRejected {
                region: self.read_u32()?,
                region_generation: self.read_u32()?,
                surface: self.read_u32()?,
            }),
            TAG_QUEUE_UNDERFLOW => Some(RecordedEvent::QueueUnderflow),
            TAG_ORPHAN_FAILURE => Some(RecordedEvent::OrphanFailure {
                surface: self.read_u32()?,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrane_core::time::Duration;

    fn region(idx: u32, generation: u32) -> RegionId {
        RegionId::from_raw(idx, generation)
    }

    #[test]
    fn round_trip_all_event_kinds() {
        let mut rec = RecorderSink::new();
        rec.on_bake_dispatched(&BakeDispatchedEvent {
            token: BakeToken(1),
            surface: SurfaceId(7),
            region: region(0, 2),
            triangles_per_cubic_meter: 750.0,
            bake_collider: true,
        });
        rec.on_bake_completed(&BakeCompletedEvent {
            token: BakeToken(1),
            surface: SurfaceId(7),
            output_written: true,
            elapsed: Duration(123_456),
        });
        rec.on_surface_evicted(&SurfaceEvictedEvent {
            surface: SurfaceId(8),
            region: region(1, 0),
        });
        rec.on_surface_revived(&SurfaceRevivedEvent {
            surface: SurfaceId(9),
            region: region(1, 0),
        });
        rec.on_unknown_removal(SurfaceId(10), region(2, 1));
        rec.on_unmatched_completion(BakeToken(99), SurfaceId(11));
        rec.on_dispatch_rejected(region(3, 0), SurfaceId(12));
        rec.on_queue_underflow();
        rec.on_orphan_failure(SurfaceId(13));

        let decoded: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(decoded.len(), 9);
        assert_eq!(
            decoded[0],
            RecordedEvent::BakeDispatched {
                token: 1,
                surface: 7,
                region: 0,
                region_generation: 2,
                triangles_per_cubic_meter: 750.0,
                bake_collider: true,
            }
        );
        assert_eq!(
            decoded[1],
            RecordedEvent::BakeCompleted {
                token: 1,
                surface: 7,
                output_written: true,
                elapsed_ticks: 123_456,
            }
        );
        assert_eq!(decoded[7], RecordedEvent::QueueUnderflow);
        assert_eq!(decoded[8], RecordedEvent::OrphanFailure { surface: 13 });
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_unmatched_completion(BakeToken(5), SurfaceId(6));
        let mut bytes = rec.into_bytes();
        bytes.truncate(bytes.len() - 2);

        let decoded: Vec<_> = decode(&bytes).collect();
        assert!(decoded.is_empty(), "partial record is dropped");
    }

    #[test]
    fn unknown_tag_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_queue_underflow();
        let mut bytes = rec.into_bytes();
        bytes.push(0xFF);
        bytes.push(0x00);

        let decoded: Vec<_> = decode(&bytes).collect();
        assert_eq!(decoded, vec![RecordedEvent::QueueUnderflow]);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert_eq!(decode(&[]).count(), 0);
    }
}
