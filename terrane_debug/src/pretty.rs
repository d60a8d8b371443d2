// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Bake
//! durations are converted to milliseconds using a [`Timebase`].

use std::io::Write;

use terrane_core::bake::BakeToken;
use terrane_core::region::RegionId;
use terrane_core::surface::SurfaceId;
use terrane_core::time::Timebase;
use terrane_core::trace::{
    BakeCompletedEvent, BakeDispatchedEvent, SurfaceEvictedEvent, SurfaceRevivedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

fn region_label(region: RegionId) -> String {
    format!("{}@gen{}", region.index(), region.generation())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_bake_dispatched(&mut self, e: &BakeDispatchedEvent) {
        let _ = writeln!(
            self.writer,
            "[dispatch] token={} surface={} region={} tpcm={} collider={}",
            e.token.0,
            e.surface.0,
            region_label(e.region),
            e.triangles_per_cubic_meter,
            e.bake_collider,
        );
    }

    fn on_bake_completed(&mut self, e: &BakeCompletedEvent) {
        let _ = writeln!(
            self.writer,
            "[complete] token={} surface={} ok={} elapsed={:.2}ms",
            e.token.0,
            e.surface.0,
            e.output_written,
            e.elapsed.to_millis_f64(self.timebase),
        );
    }

    fn on_surface_evicted(&mut self, e: &SurfaceEvictedEvent) {
        let _ = writeln!(
            self.writer,
            "[evict] surface={} region={}",
            e.surface.0,
            region_label(e.region),
        );
    }

    fn on_surface_revived(&mut self, e: &SurfaceRevivedEvent) {
        let _ = writeln!(
            self.writer,
            "[revive] surface={} region={}",
            e.surface.0,
            region_label(e.region),
        );
    }

    fn on_unknown_removal(&mut self, surface: SurfaceId, region: RegionId) {
        let _ = writeln!(
            self.writer,
            "[warn:unknown-removal] surface={} region={}",
            surface.0,
            region_label(region),
        );
    }

    fn on_unmatched_completion(&mut self, token: BakeToken, surface: SurfaceId) {
        let _ = writeln!(
            self.writer,
            "[err:unmatched-completion] token={} surface={}",
            token.0, surface.0,
        );
    }

    fn on_dispatch_rejected(&mut self, region: RegionId, surface: SurfaceId) {
        let _ = writeln!(
            self.writer,
            "[err:dispatch-rejected] region={} surface={}",
            region_label(region),
            surface.0,
        );
    }

    fn on_queue_underflow(&mut self) {
        let _ = writeln!(self.writer, "[err:queue-underflow]");
    }

    fn on_orphan_failure(&mut self, surface: SurfaceId) {
        let _ = writeln!(self.writer, "[err:orphan-failure] surface={}", surface.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrane_core::time::Duration;

    #[test]
    fn lines_are_labelled_by_event_kind() {
        let mut out = Vec::new();
        {
            let mut sink = PrettyPrintSink::with_writer(&mut out, Timebase::NANOS);
            sink.on_bake_dispatched(&BakeDispatchedEvent {
                token: BakeToken(3),
                surface: SurfaceId(7),
                region: RegionId::from_raw(0, 0),
                triangles_per_cubic_meter: 750.0,
                bake_collider: false,
            });
            sink.on_bake_completed(&BakeCompletedEvent {
                token: BakeToken(3),
                surface: SurfaceId(7),
                output_written: true,
                elapsed: Duration(2_000_000),
            });
            sink.on_queue_underflow();
        }

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[dispatch] token=3 surface=7"));
        assert!(lines[1].contains("ok=true"));
        assert!(lines[1].contains("2.00ms"));
        assert_eq!(lines[2], "[err:queue-underflow]");
    }
}
