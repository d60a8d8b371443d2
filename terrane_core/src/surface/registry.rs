// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-region surface bookkeeping: the active and pending-eviction sets.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use glam::Vec3;

use crate::backend::DrawableHost;
use crate::bake::BakeRequest;
use crate::region::RegionId;
use crate::surface::{DrawableId, SurfaceId};
use crate::time::HostTime;
use crate::trace::{SurfaceEvictedEvent, Tracer};
use crate::volume::ObservedVolume;

/// Squared distance (in metres) below which a pending-eviction surface
/// counts as "near the user". A vanished surface this close ticks toward
/// destruction even while it sits inside the observed volume, since the
/// device would have re-observed it by now if it still existed.
const NEAR_USER_DISTANCE_SQ: f32 = 100.0; // 10 m * 10 m

/// One tracked chunk of spatially-mapped geometry.
///
/// A surface lives in exactly one of the registry's two sets at a time and
/// is destroyed on eviction or region shutdown.
#[derive(Clone, Copy, Debug)]
pub struct Surface {
    /// Stable handle from the observation feed.
    pub id: SurfaceId,
    /// When the feed last reported this surface changing. Drives bake
    /// priority: oldest update bakes first.
    pub updated_at: HostTime,
    /// The externally-owned drawable backing this surface, if one has been
    /// created.
    pub drawable: Option<DrawableId>,
    /// Snapshot of the most recent bake request built for this surface.
    pub request: BakeRequest,
    /// Eviction countdown. Only meaningful while the surface is pending
    /// eviction; `-1` means the surface has already been destroyed.
    pub remaining_ticks: i32,
    /// Whether the surface has changed since it was last baked.
    pub awaiting_bake: bool,
}

impl Surface {
    fn new(id: SurfaceId) -> Self {
        Self {
            id,
            updated_at: HostTime(0),
            drawable: None,
            request: BakeRequest::empty(id),
            remaining_ticks: 0,
            awaiting_bake: false,
        }
    }
}

/// Result of handing a Removed event to [`SurfaceRegistry::begin_removal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The id was not in the active set; the event was dropped.
    Unknown,
    /// The removal-tick threshold is below one, so the surface was destroyed
    /// immediately.
    Destroyed,
    /// The surface moved to the pending-eviction set and will be destroyed
    /// once its countdown expires.
    Deferred {
        /// The surface's drawable, for the caller's visibility policy.
        drawable: Option<DrawableId>,
    },
}

/// A region's surface bookkeeping.
///
/// Both sets are keyed by [`SurfaceId`] in a `BTreeMap`, which makes every
/// scan deterministic: where two surfaces tie (equal update timestamps in
/// the priority scan), the lower surface id wins.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    active: BTreeMap<SurfaceId, Surface>,
    pending_eviction: BTreeMap<SurfaceId, Surface>,
    // Scratch list reused across eviction passes.
    scratch: Vec<SurfaceId>,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of surfaces in the active set.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of surfaces awaiting eviction.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending_eviction.len()
    }

    /// Returns the active surface with the given id.
    #[must_use]
    pub fn active(&self, id: SurfaceId) -> Option<&Surface> {
        self.active.get(&id)
    }

    /// Returns the active surface with the given id, mutably.
    #[must_use]
    pub fn active_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.active.get_mut(&id)
    }

    /// Returns the pending-eviction surface with the given id.
    #[must_use]
    pub fn pending(&self, id: SurfaceId) -> Option<&Surface> {
        self.pending_eviction.get(&id)
    }

    /// Applies an Added or Updated observation.
    ///
    /// Creates the surface if it is unknown, or revives it from the
    /// pending-eviction set (keeping its drawable, so a surface that blinks
    /// out and back reuses its resources). Either way the surface is marked
    /// awaiting bake, stamped with `updated_at`, and its request snapshot is
    /// rebuilt from the region's current profile. The drawable is created
    /// through `host` if missing or externally destroyed.
    ///
    /// Returns whether the surface was revived from pending eviction.
    pub fn add_or_update(
        &mut self,
        id: SurfaceId,
        updated_at: HostTime,
        triangles_per_cubic_meter: f64,
        bake_collider: bool,
        region: RegionId,
        host: &mut dyn DrawableHost,
    ) -> bool {
        let revived = match self.pending_eviction.remove(&id) {
            Some(mut surface) => {
                surface.remaining_ticks = 0;
                self.active.insert(id, surface);
                true
            }
            None => false,
        };

        let surface = self.active.entry(id).or_insert_with(|| Surface::new(id));
        surface.awaiting_bake = true;
        surface.updated_at = updated_at;

        let drawable = match surface.drawable {
            // Be resilient to the embedder destroying drawables by hand.
            Some(d) if host.is_alive(d) => d,
            _ => host.ensure_drawable(region, id),
        };
        surface.drawable = Some(drawable);
        surface.request = BakeRequest {
            surface: id,
            triangles_per_cubic_meter,
            bake_collider,
            output: Some(drawable),
        };

        revived
    }

    /// Applies a Removed observation.
    ///
    /// Moves the surface from the active set to the pending-eviction set
    /// with a countdown of `removal_ticks + 1`, or destroys it immediately
    /// when `removal_ticks < 1`. An id missing from the active set yields
    /// [`RemovalOutcome::Unknown`] and changes nothing.
    pub fn begin_removal(
        &mut self,
        id: SurfaceId,
        removal_ticks: i32,
        host: &mut dyn DrawableHost,
    ) -> RemovalOutcome {
        let Some(mut surface) = self.active.remove(&id) else {
            return RemovalOutcome::Unknown;
        };

        if removal_ticks < 1 {
            destroy_surface(&mut surface, host);
            return RemovalOutcome::Destroyed;
        }

        surface.remaining_ticks = removal_ticks + 1;
        let drawable = surface.drawable;
        self.pending_eviction.insert(id, surface);
        RemovalOutcome::Deferred { drawable }
    }

    /// Runs one eviction pass over the pending set.
    ///
    /// Surfaces whose drawable the embedder has already destroyed are
    /// dropped from bookkeeping without ticking. The countdown of every
    /// other surface decrements only when the surface sits outside `volume`
    /// or within the near-user distance of `observer_position`; a surface
    /// that reaches zero is destroyed through `host` and removed.
    ///
    /// Returns how many surfaces were destroyed this pass.
    pub fn process_evictions(
        &mut self,
        volume: &ObservedVolume,
        observer_position: Vec3,
        region: RegionId,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        let mut destroyed = 0;
        self.scratch.clear();

        for (&id, surface) in self.pending_eviction.iter_mut() {
            let Some(drawable) = surface.drawable else {
                self.scratch.push(id);
                continue;
            };
            if !host.is_alive(drawable) {
                surface.drawable = None;
                self.scratch.push(id);
                continue;
            }

            let position = host.position(drawable);
            let out_of_volume = !volume.contains(position);
            let near_user =
                position.distance_squared(observer_position) <= NEAR_USER_DISTANCE_SQ;
            if !(out_of_volume || near_user) {
                // Lingering near its last known position; leave the
                // countdown alone in case the surface is re-observed.
                continue;
            }

            surface.remaining_ticks -= 1;
            if surface.remaining_ticks <= 0 {
                destroy_surface(surface, host);
                self.scratch.push(id);
                destroyed += 1;
                tracer.surface_evicted(&SurfaceEvictedEvent {
                    surface: id,
                    region,
                });
            }
        }

        for id in self.scratch.drain(..) {
            self.pending_eviction.remove(&id);
        }
        destroyed
    }

    /// Returns the active surface that should bake next: awaiting bake with
    /// the earliest update timestamp. Ties resolve to the lowest surface id
    /// (map iteration order).
    #[must_use]
    pub fn highest_priority_mut(&mut self) -> Option<&mut Surface> {
        let mut best: Option<(SurfaceId, HostTime)> = None;
        for (&id, surface) in &self.active {
            if !surface.awaiting_bake {
                continue;
            }
            match best {
                Some((_, t)) if surface.updated_at >= t => {}
                _ => best = Some((id, surface.updated_at)),
            }
        }
        best.and_then(|(id, _)| self.active.get_mut(&id))
    }

    /// Shows or hides every owned drawable, in both sets.
    pub fn set_all_visible(&mut self, visible: bool, host: &mut dyn DrawableHost) {
        for surface in self.active.values().chain(self.pending_eviction.values()) {
            if let Some(drawable) = surface.drawable {
                if host.is_alive(drawable) {
                    host.set_visible(drawable, visible);
                }
            }
        }
    }

    /// Destroys every surface in both sets and clears the registry.
    ///
    /// Called on region shutdown; the scheduler never touches these
    /// resources.
    pub fn destroy_all(&mut self, host: &mut dyn DrawableHost) {
        for (_, mut surface) in core::mem::take(&mut self.active) {
            destroy_surface(&mut surface, host);
        }
        for (_, mut surface) in core::mem::take(&mut self.pending_eviction) {
            destroy_surface(&mut surface, host);
        }
    }
}

/// Releases a surface's drawable and marks the record destroyed.
fn destroy_surface(surface: &mut Surface, host: &mut dyn DrawableHost) {
    surface.remaining_ticks = -1;
    if let Some(drawable) = surface.drawable.take() {
        if host.is_alive(drawable) {
            host.destroy(drawable);
        }
    }
}
