// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes [Chrome Trace
//! Event Format][spec] JSON to the given writer.
//!
//! The core scheduler is time-free, so event timestamps are synthesized from
//! record order (one microsecond per record); bake spans use their real
//! duration, converted through the provided [`Timebase`]. The result is a
//! faithful ordering view, not a wall-clock one.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::collections::HashMap;
use std::io::{self, Write};

use serde_json::{Value, json};

use terrane_core::time::{Duration, Timebase};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Completed bakes become `X` (complete) spans anchored at their dispatch
/// record; everything else becomes an instant event.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // token → (sequence index of dispatch, surface)
    let mut dispatches: HashMap<u64, (usize, u32)> = HashMap::new();

    for (seq, recorded) in decode(bytes).enumerate() {
        let ts = seq as f64;
        match recorded {
            RecordedEvent::BakeDispatched {
                token,
                surface,
                region,
                triangles_per_cubic_meter,
                bake_collider,
                ..
            } => {
                dispatches.insert(token, (seq, surface));
                events.push(json!({
                    "ph": "i",
                    "name": "BakeDispatched",
                    "cat": "Scheduler",
                    "ts": ts,
                    "pid": region,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "token": token,
                        "surface": surface,
                        "tpcm": triangles_per_cubic_meter,
                        "collider": bake_collider,
                    }
                }));
            }
            RecordedEvent::BakeCompleted {
                token,
                surface,
                output_written,
                elapsed_ticks,
            } => {
                let dur = Duration(elapsed_ticks).to_millis_f64(timebase) * 1000.0;
                let start = dispatches
                    .remove(&token)
                    .map_or(ts, |(dispatch_seq, _)| dispatch_seq as f64);
                events.push(json!({
                    "ph": "X",
                    "name": "Bake",
                    "cat": "Device",
                    "ts": start,
                    "dur": dur,
                    "pid": 0,
                    "tid": token,
                    "args": {
                        "surface": surface,
                        "ok": output_written,
                    }
                }));
            }
            RecordedEvent::SurfaceEvicted { surface, region, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "SurfaceEvicted",
                    "cat": "Eviction",
                    "ts": ts,
                    "pid": region,
                    "tid": 0,
                    "s": "g",
                    "args": { "surface": surface }
                }));
            }
            RecordedEvent::SurfaceRevived { surface, region, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "SurfaceRevived",
                    "cat": "Eviction",
                    "ts": ts,
                    "pid": region,
                    "tid": 0,
                    "s": "g",
                    "args": { "surface": surface }
                }));
            }
            RecordedEvent::UnknownRemoval { surface, region, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "UnknownRemoval",
                    "cat": "Error",
                    "ts": ts,
                    "pid": region,
                    "tid": 0,
                    "s": "p",
                    "args": { "surface": surface }
                }));
            }
            RecordedEvent::UnmatchedCompletion { token, surface } => {
                events.push(json!({
                    "ph": "i",
                    "name": "UnmatchedCompletion",
                    "cat": "Error",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": { "token": token, "surface": surface }
                }));
            }
            RecordedEvent::DispatchRejected { region, surface, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DispatchRejected",
                    "cat": "Error",
                    "ts": ts,
                    "pid": region,
                    "tid": 0,
                    "s": "p",
                    "args": { "surface": surface }
                }));
            }
            RecordedEvent::QueueUnderflow => {
                events.push(json!({
                    "ph": "i",
                    "name": "QueueUnderflow",
                    "cat": "Error",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {}
                }));
            }
            RecordedEvent::OrphanFailure { surface } => {
                events.push(json!({
                    "ph": "i",
                    "name": "OrphanFailure",
                    "cat": "Error",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": { "surface": surface }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
