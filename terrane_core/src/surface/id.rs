// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface and drawable identity types.

use core::fmt;

/// An opaque handle identifying a physical surface.
///
/// Handles are minted by the native observation feed; two events with the
/// same handle refer to the same chunk of spatially-mapped geometry.
/// Equality, ordering, and hashing are by handle value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// An opaque reference to a surface's drawable object.
///
/// Drawables (scene node, mesh buffers, collider, spatial anchor) are created
/// and owned externally by the embedder behind
/// [`DrawableHost`](crate::backend::DrawableHost); the core only tracks which
/// drawable backs which surface and when it should be destroyed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId(pub u32);

impl fmt::Debug for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrawableId({})", self.0)
    }
}
