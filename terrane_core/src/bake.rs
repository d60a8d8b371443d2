// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types that flow between the native backend and the bake scheduler.
//!
//! This module defines the request/completion vocabulary of the bake
//! pipeline:
//!
//! - [`SurfaceEvent`] — a change delivered by the native observation feed
//! - [`LodLevel`] / [`BakeProfile`] — the sharing key for bake results
//! - [`BakeRequest`] — an immutable bake work item
//! - [`BakeToken`] — correlation token for an in-flight request
//! - [`BakeCompletion`] — the backend's report for a finished bake
//!
//! # Data flow
//!
//! 1. The backend produces [`SurfaceEvent`]s once per poll; each updates a
//!    region's surface registry.
//! 2. The scheduler asks registries for their highest-priority surface and
//!    dispatches the resulting [`BakeRequest`] with a fresh [`BakeToken`].
//! 3. The backend bakes asynchronously and eventually hands back a
//!    [`BakeCompletion`] echoing the token and request snapshot.
//! 4. The scheduler fans successful completions out to every region whose
//!    [`BakeProfile`] matches, so regions sharing a profile reuse one bake.

use crate::surface::{DrawableId, SurfaceId};
use crate::time::{Duration, HostTime};
use crate::volume::SurfaceBounds;

/// The kind of change reported for a surface by the observation feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceChange {
    /// The surface entered the observed volume.
    Added,
    /// The surface's geometry was refined.
    Updated,
    /// The surface stopped being observed.
    Removed,
}

/// One surface change delivered by the native observation feed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceEvent {
    /// Which surface changed.
    pub id: SurfaceId,
    /// What happened to it.
    pub change: SurfaceChange,
    /// Axis-aligned bounds of the surface, as reported by the feed.
    pub bounds: SurfaceBounds,
    /// When the device observed the change.
    pub updated_at: HostTime,
}

/// Mesh detail level requested from the baking device.
///
/// The level is a proxy for triangle density; see
/// [`triangles_per_cubic_meter`](Self::triangles_per_cubic_meter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LodLevel {
    /// Densest output, for visualization.
    High,
    /// Mid density, the default.
    Medium,
    /// Sparse output, suited to physics.
    Low,
}

impl LodLevel {
    /// Returns the triangle density the baking device is asked for at this
    /// level.
    #[must_use]
    pub const fn triangles_per_cubic_meter(self) -> f64 {
        match self {
            Self::High => 2000.0,
            Self::Medium => 750.0,
            Self::Low => 200.0,
        }
    }

    /// Recovers the level from a request's triangle density.
    ///
    /// The bands are deliberately loose so completions echoed by a device
    /// that clamped or jittered the density still classify correctly:
    /// anything ≥ 1999 is [`High`](Self::High), 749..=751 is
    /// [`Medium`](Self::Medium), everything else is [`Low`](Self::Low).
    #[must_use]
    pub fn from_tpcm(triangles_per_cubic_meter: f64) -> Self {
        if triangles_per_cubic_meter >= 1999.0 {
            Self::High
        } else if (749.0..=751.0).contains(&triangles_per_cubic_meter) {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// The two-dimensional key deciding which regions can share a bake result.
///
/// A completed bake is delivered to every registered region whose profile
/// matches the completed request; regions that differ in either field need
/// their own bake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BakeProfile {
    /// Requested mesh detail.
    pub lod: LodLevel,
    /// Whether collision geometry is baked alongside the mesh.
    pub bake_collider: bool,
}

impl BakeProfile {
    /// Computes the profile a request belongs to.
    #[must_use]
    pub fn from_request(request: &BakeRequest) -> Self {
        Self {
            lod: LodLevel::from_tpcm(request.triangles_per_cubic_meter),
            bake_collider: request.bake_collider,
        }
    }
}

/// An immutable bake work item.
///
/// Built by a region when the scheduler asks it for work, and held as a
/// snapshot in the scheduler's in-flight slot until the matching
/// [`BakeCompletion`] arrives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakeRequest {
    /// The surface to bake.
    pub surface: SurfaceId,
    /// Requested triangle density.
    pub triangles_per_cubic_meter: f64,
    /// Whether to bake collision geometry as well.
    pub bake_collider: bool,
    /// The drawable whose mesh buffers (and optional collider and anchor)
    /// receive the baked output.
    pub output: Option<DrawableId>,
}

impl BakeRequest {
    /// An empty request bound to the given surface, before any bake has been
    /// asked for.
    #[must_use]
    pub const fn empty(surface: SurfaceId) -> Self {
        Self {
            surface,
            triangles_per_cubic_meter: 0.0,
            bake_collider: false,
            output: None,
        }
    }
}

/// Correlation token for one dispatched bake request.
///
/// Tokens are unique per dispatch, so a completion identifies its in-flight
/// slot even when two slots carry otherwise identical requests from
/// different regions.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BakeToken(pub u64);

impl core::fmt::Debug for BakeToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BakeToken({})", self.0)
    }
}

/// The baking device's report for one finished request.
///
/// Delivered exactly once per accepted dispatch. Completion order across
/// concurrently in-flight requests is not guaranteed to match dispatch
/// order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakeCompletion {
    /// Token of the dispatch this completes.
    pub token: BakeToken,
    /// Echo of the dispatched request.
    pub request: BakeRequest,
    /// Whether the bake succeeded and output buffers were written.
    pub output_written: bool,
    /// How long the device spent baking.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lod_density_table() {
        assert_eq!(LodLevel::High.triangles_per_cubic_meter(), 2000.0);
        assert_eq!(LodLevel::Medium.triangles_per_cubic_meter(), 750.0);
        assert_eq!(LodLevel::Low.triangles_per_cubic_meter(), 200.0);
    }

    #[test]
    fn tpcm_banding_round_trips_the_table() {
        for lod in [LodLevel::High, LodLevel::Medium, LodLevel::Low] {
            assert_eq!(
                LodLevel::from_tpcm(lod.triangles_per_cubic_meter()),
                lod,
                "table density must classify back to its own level"
            );
        }
    }

    #[test]
    fn tpcm_band_edges() {
        assert_eq!(LodLevel::from_tpcm(1999.0), LodLevel::High);
        assert_eq!(LodLevel::from_tpcm(1998.9), LodLevel::Low, "below High band");
        assert_eq!(LodLevel::from_tpcm(749.0), LodLevel::Medium);
        assert_eq!(LodLevel::from_tpcm(751.0), LodLevel::Medium);
        assert_eq!(LodLevel::from_tpcm(751.1), LodLevel::Low);
        assert_eq!(LodLevel::from_tpcm(0.0), LodLevel::Low);
    }

    #[test]
    fn profile_from_request() {
        let request = BakeRequest {
            surface: SurfaceId(7),
            triangles_per_cubic_meter: 750.0,
            bake_collider: true,
            output: None,
        };
        assert_eq!(
            BakeProfile::from_request(&request),
            BakeProfile {
                lod: LodLevel::Medium,
                bake_collider: true,
            }
        );
    }

    #[test]
    fn empty_request_has_no_output() {
        let request = BakeRequest::empty(SurfaceId(3));
        assert_eq!(request.surface, SurfaceId(3));
        assert_eq!(request.output, None);
        assert!(!request.bake_collider);
    }
}
