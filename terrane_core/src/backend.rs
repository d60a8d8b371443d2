// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for platform integrations.
//!
//! Terrane splits platform-specific work into two trait seams:
//!
//! - **[`SurfaceSource`]** — one per
//!   [`MappingRegion`](crate::region::MappingRegion), wrapping the native
//!   surface observer and the asynchronous mesh-baking device behind it. It
//!   is told the observed volume, polled for surface deltas, handed bake
//!   requests, and drained for completions.
//!
//! - **[`DrawableHost`]** — the embedder's scene, passed `&mut` into the
//!   calls that need it. It owns every drawable object (scene node, mesh
//!   buffers, collider, anchor); the core only holds
//!   [`DrawableId`](crate::surface::DrawableId) handles and tells the host
//!   when to create, show, hide, or destroy them. Both engine-backed hosts
//!   and test doubles implement this trait.
//!
//! # Crate boundaries
//!
//! `terrane_core` owns the surface registries, eviction, and bake
//! scheduling, plus this contract module. Platform crates implement the two
//! traits over native APIs; application code wires them together in a tick
//! loop.
//!
//! # Tick loop pseudocode
//!
//! ```rust,ignore
//! fn on_tick(now: HostTime) {
//!     for id in region_ids {
//!         let region = regions.region_mut(id);
//!         region.set_position(device_pose.position);
//!         if region.tick(now, &mut host, &mut tracer) {
//!             context.notify_work_available(&mut regions, &mut host, &mut tracer);
//!         }
//!     }
//!
//!     // Hand finished bakes back to the scheduler, in whatever order the
//!     // device finished them.
//!     for id in region_ids {
//!         let mut done = Vec::new();
//!         regions.region_mut(id).source_mut().drain_completions(&mut |c| done.push(c));
//!         for completion in done {
//!             context.on_bake_complete(&completion, &mut regions, &mut host, &mut tracer);
//!         }
//!     }
//! }
//! ```

use glam::Vec3;

use crate::bake::{BakeCompletion, BakeRequest, BakeToken, SurfaceEvent};
use crate::region::RegionId;
use crate::surface::{DrawableId, SurfaceId};
use crate::volume::ObservedVolume;

/// The native surface observer and mesh-baking device for one region.
///
/// Implementations wrap a platform observer handle. The baking half is
/// asynchronous: [`request_bake`](Self::request_bake) returns as soon as the
/// device accepts the work, and the result surfaces later through
/// [`drain_completions`](Self::drain_completions) — possibly several ticks
/// later, and not necessarily in dispatch order.
///
/// There is no cancellation: an accepted request always completes (success
/// or failure) and must be drained. There is no timeout either; a device
/// that never reports back permanently occupies one of the scheduler's
/// in-flight slots.
pub trait SurfaceSource {
    /// Updates the volume of space the observer watches.
    fn set_volume(&mut self, volume: &ObservedVolume);

    /// Polls the observer for surface changes since the last poll, invoking
    /// `sink` once per change event.
    fn poll_changes(&mut self, sink: &mut dyn FnMut(SurfaceEvent));

    /// Asks the baking device to bake `request`, correlated by `token`.
    ///
    /// Returns whether the device accepted the dispatch. A rejected dispatch
    /// produces no completion.
    fn request_bake(&mut self, request: &BakeRequest, token: BakeToken) -> bool;

    /// Drains finished bakes, invoking `sink` exactly once per accepted
    /// dispatch that has completed since the last drain.
    fn drain_completions(&mut self, sink: &mut dyn FnMut(BakeCompletion));
}

/// The embedder's scene, owner of all drawable objects.
///
/// The core calls these methods from registry and scheduler passes; the
/// host is free to implement them over engine scene graphs, GPU resources,
/// or plain test state.
pub trait DrawableHost {
    /// Returns the drawable backing `surface` in `region`, creating it (with
    /// empty mesh buffers and an anchor) if it does not exist yet.
    fn ensure_drawable(&mut self, region: RegionId, surface: SurfaceId) -> DrawableId;

    /// Returns whether the drawable still exists.
    ///
    /// Embedders may destroy drawables out from under the core (a user
    /// deleting scene objects by hand); the core re-creates or forgets them
    /// as appropriate.
    fn is_alive(&self, drawable: DrawableId) -> bool;

    /// Returns the drawable's world-space position.
    fn position(&self, drawable: DrawableId) -> Vec3;

    /// Shows or hides the drawable.
    fn set_visible(&mut self, drawable: DrawableId, visible: bool);

    /// Applies a successful bake's output to the drawable it was baked into.
    ///
    /// Called on the requester's own drawable once the device has written
    /// the buffers named in `request`.
    fn apply_baked(&mut self, drawable: DrawableId, request: &BakeRequest);

    /// Copies the baked mesh from another region's output drawable into
    /// `target`.
    ///
    /// Called when a region receives a bake it did not request itself
    /// (shared-profile reuse), so the mesh is adopted rather than re-baked.
    fn adopt_mesh(&mut self, target: DrawableId, baked_output: DrawableId);

    /// Destroys the drawable and all resources hanging off it.
    fn destroy(&mut self, drawable: DrawableId);
}
