// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the bake pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! registry and scheduler call as surfaces move through their lifecycle. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! The warning and error events (`unknown_removal`, `unmatched_completion`,
//! `dispatch_rejected`, `queue_underflow`, `orphan_failure`) are how the
//! core reports recoverable protocol degradations; the affected event is
//! dropped and the system stays consistent.

use crate::bake::BakeToken;
use crate::region::RegionId;
use crate::surface::SurfaceId;
use crate::time::Duration;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the scheduler dispatches a bake request to the backend.
#[derive(Clone, Copy, Debug)]
pub struct BakeDispatchedEvent {
    /// Correlation token of the dispatch.
    pub token: BakeToken,
    /// Surface being baked.
    pub surface: SurfaceId,
    /// Region whose request was selected.
    pub region: RegionId,
    /// Requested triangle density.
    pub triangles_per_cubic_meter: f64,
    /// Whether collision geometry is baked.
    pub bake_collider: bool,
}

/// Emitted when the backend reports a bake finished (either way).
#[derive(Clone, Copy, Debug)]
pub struct BakeCompletedEvent {
    /// Correlation token of the completed dispatch.
    pub token: BakeToken,
    /// Surface that was baked.
    pub surface: SurfaceId,
    /// Whether output buffers were written.
    pub output_written: bool,
    /// Time the device spent baking.
    pub elapsed: Duration,
}

/// Emitted when a pending-eviction surface is destroyed.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceEvictedEvent {
    /// Surface that was destroyed.
    pub surface: SurfaceId,
    /// Region that owned it.
    pub region: RegionId,
}

/// Emitted when a pending-eviction surface is re-observed and moved back to
/// the active registry.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceRevivedEvent {
    /// Surface that was revived.
    pub surface: SurfaceId,
    /// Region that owns it.
    pub region: RegionId,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the bake pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a bake request is dispatched.
    fn on_bake_dispatched(&mut self, e: &BakeDispatchedEvent) {
        _ = e;
    }

    /// Called when a bake completion arrives.
    fn on_bake_completed(&mut self, e: &BakeCompletedEvent) {
        _ = e;
    }

    /// Called when a surface is destroyed by eviction.
    fn on_surface_evicted(&mut self, e: &SurfaceEvictedEvent) {
        _ = e;
    }

    /// Called when a pending-eviction surface is revived.
    fn on_surface_revived(&mut self, e: &SurfaceRevivedEvent) {
        _ = e;
    }

    /// Warning: a removal arrived for a surface the region does not track.
    fn on_unknown_removal(&mut self, surface: SurfaceId, region: RegionId) {
        _ = (surface, region);
    }

    /// Error: a completion matched no in-flight slot.
    fn on_unmatched_completion(&mut self, token: BakeToken, surface: SurfaceId) {
        _ = (token, surface);
    }

    /// Error: the backend rejected a dispatch outright.
    fn on_dispatch_rejected(&mut self, region: RegionId, surface: SurfaceId) {
        _ = (region, surface);
    }

    /// Error: slot accounting disagreed with the in-flight count.
    fn on_queue_underflow(&mut self) {}

    /// Error: a failed bake could not be routed to any requester.
    fn on_orphan_failure(&mut self, surface: SurfaceId) {
        _ = surface;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`BakeDispatchedEvent`].
    #[inline]
    pub fn bake_dispatched(&mut self, e: &BakeDispatchedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bake_dispatched(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BakeCompletedEvent`].
    #[inline]
    pub fn bake_completed(&mut self, e: &BakeCompletedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bake_completed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceEvictedEvent`].
    #[inline]
    pub fn surface_evicted(&mut self, e: &SurfaceEvictedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_evicted(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SurfaceRevivedEvent`].
    #[inline]
    pub fn surface_revived(&mut self, e: &SurfaceRevivedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_surface_revived(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an unknown-removal warning.
    #[inline]
    pub fn unknown_removal(&mut self, surface: SurfaceId, region: RegionId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_unknown_removal(surface, region);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (surface, region);
        }
    }

    /// Emits an unmatched-completion error.
    #[inline]
    pub fn unmatched_completion(&mut self, token: BakeToken, surface: SurfaceId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_unmatched_completion(token, surface);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (token, surface);
        }
    }

    /// Emits a dispatch-rejected error.
    #[inline]
    pub fn dispatch_rejected(&mut self, region: RegionId, surface: SurfaceId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dispatch_rejected(region, surface);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (region, surface);
        }
    }

    /// Emits a queue-underflow error.
    #[inline]
    pub fn queue_underflow(&mut self) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_queue_underflow();
        }
    }

    /// Emits an orphan-failure error.
    #[inline]
    pub fn orphan_failure(&mut self, surface: SurfaceId) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_orphan_failure(surface);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = surface;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_queue_underflow();
        sink.on_unknown_removal(SurfaceId(1), RegionId::from_raw(0, 0));
        sink.on_orphan_failure(SurfaceId(2));
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.queue_underflow();
        tracer.unknown_removal(SurfaceId(1), RegionId::from_raw(0, 0));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            tokens: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_bake_completed(&mut self, e: &BakeCompletedEvent) {
                self.tokens.push(e.token.0);
            }
        }

        let mut sink = RecordingSink { tokens: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.bake_completed(&BakeCompletedEvent {
            token: BakeToken(9),
            surface: SurfaceId(1),
            output_written: true,
            elapsed: Duration(5),
        });
        drop(tracer);
        assert_eq!(sink.tokens, &[9]);
    }
}
