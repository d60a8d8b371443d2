// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal backend doubles shared by the crate's unit tests.
//!
//! [`ScriptSource`] clones share one queue, so a test can keep a handle to a
//! source after boxing it into a region. Richer, reusable doubles live in
//! the `terrane_harness` crate; these stay just big enough for the tests
//! here.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use glam::Vec3;

use crate::backend::{DrawableHost, SurfaceSource};
use crate::bake::{BakeCompletion, BakeRequest, BakeToken, SurfaceEvent};
use crate::region::RegionId;
use crate::surface::{DrawableId, SurfaceId};
use crate::volume::ObservedVolume;

#[derive(Default)]
struct SourceState {
    events: VecDeque<SurfaceEvent>,
    dispatched: Vec<(BakeRequest, BakeToken)>,
    pending: Vec<(BakeRequest, BakeToken)>,
    completions: VecDeque<BakeCompletion>,
    volumes_pushed: usize,
    reject_next: bool,
}

/// A scriptable [`SurfaceSource`]; clones share state.
#[derive(Clone, Default)]
pub(crate) struct ScriptSource {
    state: Rc<RefCell<SourceState>>,
}

impl ScriptSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a surface change for the next poll.
    pub(crate) fn push_event(&self, event: SurfaceEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// Every dispatch the device has accepted, in order.
    pub(crate) fn dispatched(&self) -> Vec<(BakeRequest, BakeToken)> {
        self.state.borrow().dispatched.clone()
    }

    /// Accepted dispatches that have not completed yet.
    pub(crate) fn pending(&self) -> Vec<(BakeRequest, BakeToken)> {
        self.state.borrow().pending.clone()
    }

    /// Removes and returns the oldest pending dispatch.
    pub(crate) fn pop_pending(&self) -> (BakeRequest, BakeToken) {
        self.state.borrow_mut().pending.remove(0)
    }

    /// Removes the pending dispatch with the given token.
    pub(crate) fn remove_pending(&self, token: BakeToken) {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|&(_, t)| t != token);
    }

    /// Makes the device refuse the next `request_bake` call.
    pub(crate) fn reject_next_dispatch(&self) {
        self.state.borrow_mut().reject_next = true;
    }

    /// Queues a completion for the next drain.
    pub(crate) fn finish(&self, completion: BakeCompletion) {
        self.state.borrow_mut().completions.push_back(completion);
    }

    /// How many times the observed volume has been pushed to the device.
    pub(crate) fn volumes_pushed(&self) -> usize {
        self.state.borrow().volumes_pushed
    }
}

impl SurfaceSource for ScriptSource {
    fn set_volume(&mut self, _volume: &ObservedVolume) {
        self.state.borrow_mut().volumes_pushed += 1;
    }

    fn poll_changes(&mut self, sink: &mut dyn FnMut(SurfaceEvent)) {
        let mut state = self.state.borrow_mut();
        while let Some(event) = state.events.pop_front() {
            sink(event);
        }
    }

    fn request_bake(&mut self, request: &BakeRequest, token: BakeToken) -> bool {
        let mut state = self.state.borrow_mut();
        if state.reject_next {
            state.reject_next = false;
            return false;
        }
        state.dispatched.push((*request, token));
        state.pending.push((*request, token));
        true
    }

    fn drain_completions(&mut self, sink: &mut dyn FnMut(BakeCompletion)) {
        let mut state = self.state.borrow_mut();
        while let Some(completion) = state.completions.pop_front() {
            sink(completion);
        }
    }
}

#[derive(Clone, Copy)]
struct Drawable {
    alive: bool,
    visible: bool,
    position: Vec3,
}

/// A slab-backed [`DrawableHost`] double.
#[derive(Default)]
pub(crate) struct ScriptHost {
    drawables: Vec<Drawable>,
    applied: usize,
    adopted: usize,
}

impl ScriptHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Destroys a drawable out from under the core, as an embedder might.
    pub(crate) fn kill(&mut self, drawable: DrawableId) {
        self.drawables[drawable.0 as usize].alive = false;
    }

    /// Moves a drawable in world space.
    pub(crate) fn place(&mut self, drawable: DrawableId, position: Vec3) {
        self.drawables[drawable.0 as usize].position = position;
    }

    pub(crate) fn is_visible(&self, drawable: DrawableId) -> bool {
        self.drawables[drawable.0 as usize].visible
    }

    /// Total drawables ever created.
    pub(crate) fn created_count(&self) -> usize {
        self.drawables.len()
    }

    /// Drawables not yet destroyed.
    pub(crate) fn alive_count(&self) -> usize {
        self.drawables.iter().filter(|d| d.alive).count()
    }

    /// `apply_baked` call count.
    pub(crate) fn applied_count(&self) -> usize {
        self.applied
    }

    /// `adopt_mesh` call count.
    pub(crate) fn adopted_count(&self) -> usize {
        self.adopted
    }
}

impl DrawableHost for ScriptHost {
    fn ensure_drawable(&mut self, _region: RegionId, _surface: SurfaceId) -> DrawableId {
        let id = DrawableId(u32::try_from(self.drawables.len()).expect("drawable count"));
        self.drawables.push(Drawable {
            alive: true,
            visible: true,
            position: Vec3::ZERO,
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

    fn apply_baked(&mut self, _drawable: DrawableId, _request: &BakeRequest) {
        self.applied += 1;
    }

    fn adopt_mesh(&mut self, _target: DrawableId, _baked_output: DrawableId) {
        self.adopted += 1;
    }

    fn destroy(&mut self, drawable: DrawableId) {
        self.drawables[drawable.0 as usize].alive = false;
    }
}
