// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping regions and their storage.
//!
//! A [`MappingRegion`] is one mesh-consuming observer: it owns a
//! [`SurfaceRegistry`], the [`SurfaceSource`] wrapping its native observer,
//! and the configuration that decides what gets baked (detail level,
//! collider flag, observed volume, eviction policy). Regions are stored in a
//! [`RegionStore`] and addressed by generational [`RegionId`] handles so the
//! scheduler can hold references across region churn.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use glam::Vec3;

use crate::backend::{DrawableHost, SurfaceSource};
use crate::bake::{BakeCompletion, BakeProfile, BakeRequest, LodLevel, SurfaceChange, SurfaceEvent};
use crate::surface::{RemovalOutcome, SurfaceRegistry};
use crate::time::{Duration, HostTime};
use crate::trace::{SurfaceEvictedEvent, SurfaceRevivedEvent, Tracer};
use crate::volume::{ObservedVolume, VolumeShape};

/// Squared distance (in metres) a region must move before its observed
/// volume is re-pushed to the native observer.
const MOVEMENT_UPDATE_THRESHOLD_SQ: f32 = 0.0001; // 1 cm * 1 cm

/// A handle to a region in a [`RegionStore`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a region is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl RegionId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Reconstructs a handle from raw parts.
    ///
    /// Intended for diagnostics tooling and test fixtures; a fabricated
    /// handle fails store validation unless its parts match a live slot.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({}@gen{})", self.idx, self.generation)
    }
}

/// Configuration for one mapping region.
#[derive(Clone, Copy, Debug)]
pub struct RegionConfig {
    /// Shape of the observed volume around the region's position.
    pub shape: VolumeShape,
    /// Mesh detail requested for this region's bakes.
    pub lod: LodLevel,
    /// Whether this region's bakes include collision geometry.
    pub bake_collider: bool,
    /// While set, the region neither polls its observer nor ticks
    /// evictions.
    pub freeze_updates: bool,
    /// How many eviction-pass ticks a vanished surface survives before
    /// destruction. Below one destroys immediately on removal.
    pub removal_ticks: i32,
    /// Minimum host time between observer polls.
    pub update_interval: Duration,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            shape: VolumeShape::AxisAlignedBox {
                half_extents: Vec3::splat(4.0),
            },
            lod: LodLevel::Medium,
            bake_collider: false,
            freeze_updates: false,
            removal_ticks: 10,
            // 2.5 s at 1 ns tick resolution.
            update_interval: Duration(2_500_000_000),
        }
    }
}

/// One mesh-consuming observer component.
pub struct MappingRegion {
    id: RegionId,
    config: RegionConfig,
    registry: SurfaceRegistry,
    source: Box<dyn SurfaceSource>,
    /// Current device/region position; also the observer position for
    /// near-user eviction checks.
    position: Vec3,
    /// Position the observed volume was last pushed at.
    volume_center: Vec3,
    next_update_at: Option<HostTime>,
    // Scratch buffer for draining the source without aliasing it.
    event_scratch: Vec<SurfaceEvent>,
}

impl fmt::Debug for MappingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRegion")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("position", &self.position)
            .field("active", &self.registry.active_len())
            .field("pending_eviction", &self.registry.pending_len())
            .finish_non_exhaustive()
    }
}

impl MappingRegion {
    fn new(id: RegionId, config: RegionConfig, mut source: Box<dyn SurfaceSource>) -> Self {
        source.set_volume(&ObservedVolume {
            center: Vec3::ZERO,
            shape: config.shape,
        });
        Self {
            id,
            config,
            registry: SurfaceRegistry::new(),
            source,
            position: Vec3::ZERO,
            volume_center: Vec3::ZERO,
            next_update_at: None,
            event_scratch: Vec::new(),
        }
    }

    /// Returns this region's handle.
    #[must_use]
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Returns this region's configuration.
    #[must_use]
    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Returns this region's surface bookkeeping.
    #[must_use]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Returns the bake-sharing profile this region participates in.
    #[must_use]
    pub fn profile(&self) -> BakeProfile {
        BakeProfile {
            lod: self.config.lod,
            bake_collider: self.config.bake_collider,
        }
    }

    /// Returns the observed volume at its last pushed centre.
    #[must_use]
    pub fn volume(&self) -> ObservedVolume {
        ObservedVolume {
            center: self.volume_center,
            shape: self.config.shape,
        }
    }

    /// Returns the region's native source, e.g. to drain completions.
    pub fn source_mut(&mut self) -> &mut dyn SurfaceSource {
        &mut *self.source
    }

    /// Freezes or unfreezes observer updates.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.config.freeze_updates = frozen;
    }

    /// Moves the region, re-pushing the observed volume to the native
    /// observer when the move exceeds the movement threshold.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        if position.distance_squared(self.volume_center) > MOVEMENT_UPDATE_THRESHOLD_SQ {
            self.volume_center = position;
            let volume = self.volume();
            self.source.set_volume(&volume);
        }
    }

    /// Runs one region tick: drains observer deltas into the registry, then
    /// runs the eviction pass.
    ///
    /// Skipped entirely (returning `false`) while updates are frozen or the
    /// update interval has not elapsed; the first tick after construction
    /// always runs. Returns `true` when the tick ran, in which case the
    /// caller should follow up with
    /// [`BakeContext::notify_work_available`](crate::context::BakeContext::notify_work_available).
    pub fn tick(
        &mut self,
        now: HostTime,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        if self.config.freeze_updates {
            return false;
        }
        if self.next_update_at.is_some_and(|due| now < due) {
            return false;
        }

        let mut events = core::mem::take(&mut self.event_scratch);
        events.clear();
        self.source.poll_changes(&mut |event| events.push(event));
        for event in &events {
            self.apply_event(event, host, tracer);
        }
        self.event_scratch = events;

        let volume = self.volume();
        self.registry
            .process_evictions(&volume, self.position, self.id, host, tracer);

        self.next_update_at = Some(now + self.config.update_interval);
        true
    }

    /// Applies a single observation event to the registry.
    pub fn apply_event(
        &mut self,
        event: &SurfaceEvent,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) {
        match event.change {
            SurfaceChange::Added | SurfaceChange::Updated => {
                let revived = self.registry.add_or_update(
                    event.id,
                    event.updated_at,
                    self.config.lod.triangles_per_cubic_meter(),
                    self.config.bake_collider,
                    self.id,
                    host,
                );
                if revived {
                    tracer.surface_revived(&SurfaceRevivedEvent {
                        surface: event.id,
                        region: self.id,
                    });
                }
            }
            SurfaceChange::Removed => {
                match self
                    .registry
                    .begin_removal(event.id, self.config.removal_ticks, host)
                {
                    RemovalOutcome::Unknown => tracer.unknown_removal(event.id, self.id),
                    RemovalOutcome::Destroyed => tracer.surface_evicted(&SurfaceEvictedEvent {
                        surface: event.id,
                        region: self.id,
                    }),
                    RemovalOutcome::Deferred { drawable } => {
                        if let Some(drawable) = drawable {
                            // A vanished surface stays visible only while it
                            // sits outside the observed volume; one still
                            // inside is hidden in case it comes right back.
                            let keep_visible =
                                !self.volume().contains(host.position(drawable));
                            host.set_visible(drawable, keep_visible);
                        }
                    }
                }
            }
        }
    }

    /// Returns this region's next bake request, if any surface awaits one.
    ///
    /// Re-ensures the chosen surface's drawable through `host` (the embedder
    /// may have destroyed it) and refreshes the request snapshot from the
    /// region's current profile before handing it out.
    pub fn highest_priority(&mut self, host: &mut dyn DrawableHost) -> Option<BakeRequest> {
        let id = self.id;
        let triangles = self.config.lod.triangles_per_cubic_meter();
        let bake_collider = self.config.bake_collider;

        let surface = self.registry.highest_priority_mut()?;
        let drawable = match surface.drawable {
            Some(d) if host.is_alive(d) => d,
            _ => host.ensure_drawable(id, surface.id),
        };
        surface.drawable = Some(drawable);
        surface.request = BakeRequest {
            surface: surface.id,
            triangles_per_cubic_meter: triangles,
            bake_collider,
            output: Some(drawable),
        };
        Some(surface.request)
    }

    /// Delivers a bake completion for a surface this region tracks.
    ///
    /// Unknown surfaces are ignored: the region may never receive a removal
    /// for them, and resurrecting bookkeeping for one would leak a zombie.
    /// A successful bake clears the surface's awaiting flag and applies (or
    /// adopts) the output; a failed bake leaves the flag set so the surface
    /// is reselected on a later scheduling pass.
    pub fn data_ready(
        &mut self,
        requester: Option<RegionId>,
        completion: &BakeCompletion,
        host: &mut dyn DrawableHost,
    ) {
        let own_id = self.id;
        let Some(surface) = self.registry.active_mut(completion.request.surface) else {
            return;
        };
        if !completion.output_written {
            return;
        }

        surface.awaiting_bake = false;
        let Some(drawable) = surface.drawable else {
            return;
        };
        if !host.is_alive(drawable) {
            return;
        }

        if requester.is_some() && requester != Some(own_id) {
            if let Some(output) = completion.request.output {
                host.adopt_mesh(drawable, output);
            }
        }
        host.apply_baked(drawable, &completion.request);
    }

    /// Shows or hides every drawable this region owns.
    pub fn set_active(&mut self, active: bool, host: &mut dyn DrawableHost) {
        self.registry.set_all_visible(active, host);
    }

    /// Destroys every surface this region owns, in both registries.
    ///
    /// The embedder deregisters the region from the
    /// [`BakeContext`](crate::context::BakeContext) first; the scheduler
    /// never releases region resources.
    pub fn shutdown(&mut self, host: &mut dyn DrawableHost) {
        self.registry.destroy_all(host);
    }
}

/// Slot-and-generation storage for all regions.
///
/// Regions are addressed by [`RegionId`] handles. Destroyed regions are
/// recycled via a free list, and generation counters prevent stale handle
/// access.
#[derive(Debug, Default)]
pub struct RegionStore {
    slots: Vec<Option<MappingRegion>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
}

impl RegionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a region over the given native source and returns its handle.
    ///
    /// The source is immediately told the configured observed volume,
    /// centred at the origin until [`MappingRegion::set_position`] moves it.
    pub fn create(&mut self, config: RegionConfig, source: Box<dyn SurfaceSource>) -> RegionId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).expect("region count exceeds u32");
            self.slots.push(None);
            self.generation.push(0);
            idx
        };

        let id = RegionId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.slots[idx as usize] = Some(MappingRegion::new(id, config, source));
        id
    }

    /// Shuts the region down (destroying its surfaces through `host`) and
    /// frees its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy(&mut self, id: RegionId, host: &mut dyn DrawableHost) {
        self.validate(id);
        if let Some(mut region) = self.slots[id.idx as usize].take() {
            region.shutdown(host);
        }
        self.generation[id.idx as usize] += 1;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live region.
    #[must_use]
    pub fn is_alive(&self, id: RegionId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    /// Returns the region for a handle, or `None` if the handle is stale.
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&MappingRegion> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    /// Returns the region for a handle mutably, or `None` if the handle is
    /// stale.
    #[must_use]
    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut MappingRegion> {
        if self.is_alive(id) {
            self.slots[id.idx as usize].as_mut()
        } else {
            None
        }
    }

    /// Returns the region for a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn region(&self, id: RegionId) -> &MappingRegion {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_ref()
            .expect("validated slot is occupied")
    }

    /// Returns the region for a handle mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn region_mut(&mut self, id: RegionId) -> &mut MappingRegion {
        self.validate(id);
        self.slots[id.idx as usize]
            .as_mut()
            .expect("validated slot is occupied")
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: RegionId) {
        assert!(
            self.is_alive(id),
            "stale RegionId: {id:?} (current gen: {})",
            if (id.idx as usize) < self.generation.len() {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
