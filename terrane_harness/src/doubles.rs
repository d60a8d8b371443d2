// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Queue-and-slab doubles for the backend traits.
//!
//! [`ScriptedSource`] clones share one underlying state, so a test can keep
//! a handle after boxing the source into a region: script change events and
//! completions from the outside, let the core drive the trait side.

use alloc::rc::Rc;
use alloc::vec::Vec;
use alloc::collections::VecDeque;
use core::cell::RefCell;

use glam::Vec3;

use terrane_core::backend::{DrawableHost, SurfaceSource};
use terrane_core::bake::{BakeCompletion, BakeRequest, BakeToken, SurfaceEvent};
use terrane_core::region::RegionId;
use terrane_core::surface::{DrawableId, SurfaceId};
use terrane_core::time::Duration;
use terrane_core::volume::ObservedVolume;

/// Runtime fault toggles for stress tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaultToggles {
    /// Refuse every dispatch.
    pub reject_dispatches: bool,
    /// Complete every bake with `output_written == false`.
    pub fail_bakes: bool,
    /// Complete the newest pending bake first instead of the oldest.
    pub reorder_completions: bool,
}

#[derive(Default)]
struct SourceState {
    events: VecDeque<SurfaceEvent>,
    volumes: Vec<ObservedVolume>,
    dispatched: Vec<(BakeRequest, BakeToken)>,
    pending: VecDeque<(BakeRequest, BakeToken)>,
    completions: VecDeque<BakeCompletion>,
    faults: FaultToggles,
}

/// A scriptable [`SurfaceSource`]; clones share state.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Rc<RefCell<SourceState>>,
}

impl core::fmt::Debug for ScriptedSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ScriptedSource")
            .field("queued_events", &state.events.len())
            .field("pending", &state.pending.len())
            .field("faults", &state.faults)
            .finish_non_exhaustive()
    }
}

impl ScriptedSource {
    /// Creates a source with empty queues and no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fault toggles.
    pub fn set_faults(&self, faults: FaultToggles) {
        self.state.borrow_mut().faults = faults;
    }

    /// Queues a surface change for the next poll.
    pub fn push_event(&self, event: SurfaceEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// The most recently pushed observed volume, if any.
    #[must_use]
    pub fn last_volume(&self) -> Option<ObservedVolume> {
        self.state.borrow().volumes.last().copied()
    }

    /// Every dispatch the device has accepted, in order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<(BakeRequest, BakeToken)> {
        self.state.borrow().dispatched.clone()
    }

    /// Accepted dispatches that have not completed yet.
    #[must_use]
    pub fn pending(&self) -> Vec<(BakeRequest, BakeToken)> {
        self.state.borrow().pending.iter().copied().collect()
    }

    /// Finishes one pending bake and queues its completion for the next
    /// drain.
    ///
    /// Takes the oldest pending dispatch, or the newest when the
    /// [`FaultToggles::reorder_completions`] fault is set; the bake fails
    /// when [`FaultToggles::fail_bakes`] is set. Returns the completion, or
    /// `None` if nothing is pending.
    pub fn finish_next(&self, elapsed: Duration) -> Option<BakeCompletion> {
        let mut state = self.state.borrow_mut();
        let (request, token) = if state.faults.reorder_completions {
            state.pending.pop_back()?
        } else {
            state.pending.pop_front()?
        };
        let completion = BakeCompletion {
            token,
            request,
            output_written: !state.faults.fail_bakes,
            elapsed,
        };
        state.completions.push_back(completion);
        Some(completion)
    }
}

impl SurfaceSource for ScriptedSource {
    fn set_volume(&mut self, volume: &ObservedVolume) {
        self.state.borrow_mut().volumes.push(*volume);
    }

    fn poll_changes(&mut self, sink: &mut dyn FnMut(SurfaceEvent)) {
        let mut state = self.state.borrow_mut();
        while let Some(event) = state.events.pop_front() {
            sink(event);
        }
    }

    fn request_bake(&mut self, request: &BakeRequest, token: BakeToken) -> bool {
        let mut state = self.state.borrow_mut();
        if state.faults.reject_dispatches {
            return false;
        }
        state.dispatched.push((*request, token));
        state.pending.push_back((*request, token));
        true
    }

    fn drain_completions(&mut self, sink: &mut dyn FnMut(BakeCompletion)) {
        let mut state = self.state.borrow_mut();
        while let Some(completion) = state.completions.pop_front() {
            sink(completion);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Drawable {
    region: RegionId,
    surface: SurfaceId,
    alive: bool,
    visible: bool,
    position: Vec3,
    applied: u32,
    adopted: u32,
}

/// A slab-backed [`DrawableHost`] double with settable positions and
/// external-destroy support.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    drawables: Vec<Drawable>,
}

impl ScriptedHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroys a drawable out from under the core, as an embedder might.
    pub fn kill(&mut self, drawable: DrawableId) {
        self.drawables[drawable.0 as usize].alive = false;
    }

    /// Moves a drawable in world space.
    pub fn place(&mut self, drawable: DrawableId, position: Vec3) {
        self.drawables[drawable.0 as usize].position = position;
    }

    /// Whether the drawable is currently shown.
    #[must_use]
    pub fn is_visible(&self, drawable: DrawableId) -> bool {
        self.drawables[drawable.0 as usize].visible
    }

    /// The region and surface a drawable was created for.
    #[must_use]
    pub fn owner(&self, drawable: DrawableId) -> (RegionId, SurfaceId) {
        let d = &self.drawables[drawable.0 as usize];
        (d.region, d.surface)
    }

    /// Total drawables ever created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.drawables.len()
    }

    /// Drawables not yet destroyed.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.drawables.iter().filter(|d| d.alive).count()
    }

    /// How many times baked output was applied to this drawable.
    #[must_use]
    pub fn applied_count(&self, drawable: DrawableId) -> u32 {
        self.drawables[drawable.0 as usize].applied
    }

    /// How many times a mesh was adopted into this drawable.
    #[must_use]
    pub fn adopted_count(&self, drawable: DrawableId) -> u32 {
        self.drawables[drawable.0 as usize].adopted
    }
}

impl DrawableHost for ScriptedHost {
    fn ensure_drawable(&mut self, region: RegionId, surface: SurfaceId) -> DrawableId {
        let id = DrawableId(u32::try_from(self.drawables.len()).expect("drawable count"));
        self.drawables.push(Drawable {
            region,
            surface,
            alive: true,
            visible: true,
            position: Vec3::ZERO,
            applied: 0,
            adopted: 0,
        });
        id
    }

    fn is_alive(&self, drawable: DrawableId) -> bool {
        self.drawables
            .get(drawable.0 as usize)
            .is_some_and(|d| d.alive)
    }

    fn position(&self, drawable: DrawableId) -> Vec3 {
        self.drawables[drawable.0 as usize].position
    }

    fn set_visible(&mut self, drawable: DrawableId, visible: bool) {
        self.drawables[drawable.0 as usize].visible = visible;
    }

    fn apply_baked(&mut self, drawable: DrawableId, _request: &BakeRequest) {
        self.drawables[drawable.0 as usize].applied += 1;
    }

    fn adopt_mesh(&mut self, target: DrawableId, _baked_output: DrawableId) {
        self.drawables[target.0 as usize].adopted += 1;
    }

    fn destroy(&mut self, drawable: DrawableId) {
        self.drawables[drawable.0 as usize].alive = false;
    }
}
