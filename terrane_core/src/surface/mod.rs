// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface identity and per-region surface lifecycle.
//!
//! A [`Surface`] is a discrete chunk of spatially-mapped geometry identified
//! by a stable [`SurfaceId`] handle. Each region owns a [`SurfaceRegistry`]
//! that moves surfaces between its active set and its pending-eviction set
//! as the observation feed reports them appearing, changing, and vanishing.

mod id;
mod registry;

pub use id::{DrawableId, SurfaceId};
pub use registry::{RemovalOutcome, Surface, SurfaceRegistry};
