// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The bake scheduler shared by all mapping regions.
//!
//! [`BakeContext`] multiplexes bake requests from every registered region
//! against the baking device's bounded work queue. It keeps a fixed array of
//! in-flight slots, asks regions for their highest-priority surface in
//! round-robin order, and fans completion events out to every region whose
//! bake profile matches the finished request.
//!
//! The context is an explicit object: the embedder constructs one before any
//! region registers and drops it after all have deregistered. It owns no
//! surfaces — only registration order and in-flight request snapshots.

use alloc::vec::Vec;
use core::fmt;

use crate::backend::{DrawableHost, SurfaceSource};
use crate::bake::{BakeCompletion, BakeProfile, BakeRequest, BakeToken};
use crate::region::{RegionId, RegionStore};
use crate::trace::{BakeCompletedEvent, BakeDispatchedEvent, Tracer};

/// The optimal number of bakes to keep in flight is 2. A single request
/// stalls the device queue while it is out for service, and more than two
/// raises the chance that a queued surface is removed or re-updated before
/// it cooks.
pub const IDEAL_IN_FLIGHT: usize = 2;

/// Registration contract violations, surfaced to the caller immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// The region is already registered.
    AlreadyRegistered(RegionId),
    /// The region was never registered (or already deregistered).
    NotRegistered(RegionId),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered(id) => {
                write!(f, "region {id:?} is already registered with the context")
            }
            Self::NotRegistered(id) => {
                write!(f, "region {id:?} is not registered with the context")
            }
        }
    }
}

impl core::error::Error for ContextError {}

/// A dispatched request occupying one in-flight slot.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    token: BakeToken,
    request: BakeRequest,
    requester: RegionId,
}

/// The bake scheduler.
///
/// Each in-flight slot moves `Empty -> Dispatched -> Empty`; a completion
/// (success or failure) is the only thing that frees a slot. At most
/// [`IDEAL_IN_FLIGHT`] slots are ever occupied.
#[derive(Debug, Default)]
pub struct BakeContext {
    /// Registered regions in round-robin order; a freshly served region
    /// moves to the back so a hungry one cannot starve the rest.
    records: Vec<RegionId>,
    slots: [Option<InFlight>; IDEAL_IN_FLIGHT],
    in_flight: usize,
    next_token: u64,
}

impl BakeContext {
    /// Creates a context with no registered regions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registered regions in current round-robin order.
    #[must_use]
    pub fn registered(&self) -> &[RegionId] {
        &self.records
    }

    /// Returns how many bakes are currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Registers a region with the context.
    ///
    /// Regions must register before their first surface can bake. Each
    /// region registers exactly once.
    pub fn register(&mut self, region: RegionId) -> Result<(), ContextError> {
        if self.records.contains(&region) {
            return Err(ContextError::AlreadyRegistered(region));
        }
        self.records.push(region);
        Ok(())
    }

    /// Removes a region from the context.
    ///
    /// The region's surfaces are untouched; releasing them stays the
    /// owner's responsibility.
    pub fn deregister(&mut self, region: RegionId) -> Result<(), ContextError> {
        let Some(pos) = self.records.iter().position(|&r| r == region) else {
            return Err(ContextError::NotRegistered(region));
        };
        self.records.remove(pos);
        Ok(())
    }

    /// Re-runs the scheduling pass.
    ///
    /// Regions call this (through the embedder) when new data requests may
    /// exist. Callable any time; does nothing when the in-flight queue is
    /// full or no region has work.
    pub fn notify_work_available(
        &mut self,
        regions: &mut RegionStore,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) {
        self.fill_slots(regions, host, tracer);
    }

    /// Handles a completion reported by a baking device.
    ///
    /// Success is fanned out to every registered region whose profile
    /// matches the completed request, so regions sharing a detail/collider
    /// profile reuse one bake. Failure is routed only to the requester. The
    /// freed slot is backfilled immediately.
    ///
    /// A completion whose token matches no in-flight slot is a protocol
    /// error: it is traced, fan-out still runs (with no requester), and the
    /// backfill is skipped since no slot is known to have freed.
    pub fn on_bake_complete(
        &mut self,
        completion: &BakeCompletion,
        regions: &mut RegionStore,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) {
        let slot_idx = self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|in_flight| in_flight.token == completion.token)
        });
        let requester = slot_idx
            .and_then(|i| self.slots[i].as_ref())
            .map(|in_flight| in_flight.requester);

        tracer.bake_completed(&BakeCompletedEvent {
            token: completion.token,
            surface: completion.request.surface,
            output_written: completion.output_written,
            elapsed: completion.elapsed,
        });

        self.propagate(requester, completion, regions, host, tracer);

        let Some(idx) = slot_idx else {
            tracer.unmatched_completion(completion.token, completion.request.surface);
            return;
        };
        self.slots[idx] = None;
        if self.in_flight == 0 {
            tracer.queue_underflow();
        } else {
            self.in_flight -= 1;
        }

        self.fill_slots(regions, host, tracer);
    }

    /// Delivers a completion to the regions that should hear about it.
    fn propagate(
        &mut self,
        requester: Option<RegionId>,
        completion: &BakeCompletion,
        regions: &mut RegionStore,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) {
        if completion.output_written {
            // Successes go to everyone with a matching profile; the regions
            // screen out surfaces they do not track.
            let profile = BakeProfile::from_request(&completion.request);
            for i in 0..self.records.len() {
                let id = self.records[i];
                let Some(region) = regions.get_mut(id) else {
                    continue;
                };
                if region.profile() == profile {
                    region.data_ready(requester, completion, host);
                }
            }
        } else if let Some(id) = requester {
            // Only the requester cares about a failure.
            if let Some(region) = regions.get_mut(id) {
                region.data_ready(requester, completion, host);
            }
        } else {
            tracer.orphan_failure(completion.request.surface);
        }
    }

    /// Runs one scheduling pass: at most one dispatch per call.
    ///
    /// Walks regions in round-robin order until one yields a request. An
    /// accepted dispatch occupies the next free slot and rotates that region
    /// to the back of the order; a rejected dispatch is traced and the pass
    /// ends with the slot still empty, to be reconsidered on the next call.
    fn fill_slots(
        &mut self,
        regions: &mut RegionStore,
        host: &mut dyn DrawableHost,
        tracer: &mut Tracer<'_>,
    ) {
        if self.in_flight >= IDEAL_IN_FLIGHT {
            return;
        }
        let Some(free) = self.slots.iter().position(Option::is_none) else {
            // Count says there is capacity but every slot is occupied.
            tracer.queue_underflow();
            return;
        };

        for i in 0..self.records.len() {
            let id = self.records[i];
            let Some(region) = regions.get_mut(id) else {
                continue;
            };
            let Some(request) = region.highest_priority(host) else {
                continue;
            };

            let token = BakeToken(self.next_token);
            self.next_token += 1;

            if region.source_mut().request_bake(&request, token) {
                self.slots[free] = Some(InFlight {
                    token,
                    request,
                    requester: id,
                });
                self.in_flight += 1;
                tracer.bake_dispatched(&BakeDispatchedEvent {
                    token,
                    surface: request.surface,
                    region: id,
                    triangles_per_cubic_meter: request.triangles_per_cubic_meter,
                    bake_collider: request.bake_collider,
                });
                // Rotate the served region to the back of the list.
                let record = self.records.remove(i);
                self.records.push(record);
            } else {
                // Almost always a misconfigured region or device.
                tracer.dispatch_rejected(id, request.surface);
            }
            break;
        }
    }
}
