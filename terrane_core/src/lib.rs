// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core surface registry and bake scheduling for spatial mapping.
//!
//! `terrane_core` provides the engine-independent heart of a mixed-reality
//! spatial-mapping system: tracking chunks of scanned geometry ("surfaces")
//! reported by a native observer, scheduling asynchronous mesh bakes for
//! them against a small fixed-capacity device queue, and deferring
//! destruction of surfaces that drop out of observation. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! The crate is organized around a cooperative tick loop that turns observer
//! deltas into baked meshes:
//!
//! ```text
//!   SurfaceSource (native observer + bake device, one per region)
//!       │ poll_changes
//!       ▼
//!   MappingRegion::tick ──► SurfaceRegistry (active / pending-eviction)
//!       │ work available                │ eviction pass
//!       ▼                              ▼
//!   BakeContext::notify_work_available  DrawableHost::destroy
//!       │ fill_slots (round-robin, ≤2 in flight)
//!       ▼
//!   SurfaceSource::request_bake ─ ─ async ─ ─► BakeCompletion
//!                                                  │
//!   BakeContext::on_bake_complete ◄────────────────┘
//!       │ fan out by BakeProfile, backfill
//!       ▼
//!   MappingRegion::data_ready ──► DrawableHost::apply_baked / adopt_mesh
//! ```
//!
//! **[`surface`]** — Surface identity and the per-region registry that moves
//! surfaces between the active and pending-eviction sets, including the
//! deferred-eviction countdown.
//!
//! **[`region`]** — [`MappingRegion`](region::MappingRegion) (one observing
//! component: configuration, tick gating, volume placement) and the
//! generational [`RegionStore`](region::RegionStore).
//!
//! **[`context`]** — The [`BakeContext`](context::BakeContext) scheduler:
//! bounded in-flight slots, round-robin admission, completion fan-out.
//!
//! **[`bake`]** — The request/completion vocabulary flowing between regions,
//! scheduler, and device.
//!
//! **[`volume`]** — Observed-volume containment geometry.
//!
//! **[`backend`]** — The [`SurfaceSource`](backend::SurfaceSource) and
//! [`DrawableHost`](backend::DrawableHost) traits platform integrations
//! implement.
//!
//! **[`time`]** — Monotonic tick time types shared with backends.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! pipeline instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Concurrency model
//!
//! Everything here runs on one logical thread, driven by the embedder's
//! tick. The only genuine concurrency is the native bake device behind
//! [`SurfaceSource`](backend::SurfaceSource): completions are drained
//! cooperatively and may arrive on later ticks, in any order. There is no
//! cancellation and no slot timeout.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod bake;
pub mod context;
pub mod region;
pub mod surface;
pub mod time;
pub mod trace;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_support;
