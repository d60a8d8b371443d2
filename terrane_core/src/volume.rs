// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observed-volume geometry.
//!
//! Each mapping region watches a bounded volume of space around the device.
//! The native observer is told about the volume through
//! [`SurfaceSource::set_volume`](crate::backend::SurfaceSource::set_volume),
//! and the eviction pass uses [`ObservedVolume::contains`] to decide whether
//! a vanished surface is still inside the tracked region.

use glam::Vec3;

/// The shape of a region's observed volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VolumeShape {
    /// A sphere of the given radius around the volume centre.
    Sphere {
        /// Sphere radius in metres.
        radius: f32,
    },
    /// An axis-aligned box around the volume centre.
    AxisAlignedBox {
        /// Half of the box edge lengths, per axis, in metres.
        half_extents: Vec3,
    },
}

/// A positioned observed volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedVolume {
    /// World-space centre of the volume.
    pub center: Vec3,
    /// Volume shape around the centre.
    pub shape: VolumeShape,
}

impl ObservedVolume {
    /// Returns whether `point` lies inside the volume.
    ///
    /// Sphere containment compares squared distances; box containment is a
    /// per-axis half-extent test. Points exactly on the boundary count as
    /// inside.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        match self.shape {
            VolumeShape::Sphere { radius } => {
                point.distance_squared(self.center) <= radius * radius
            }
            VolumeShape::AxisAlignedBox { half_extents } => {
                let d = (point - self.center).abs();
                d.x <= half_extents.x && d.y <= half_extents.y && d.z <= half_extents.z
            }
        }
    }
}

/// Axis-aligned bounds reported with a surface change event.
///
/// Carried through from the native feed for consumers that want them; the
/// core's own bookkeeping keys off surface identity and drawable positions
/// instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceBounds {
    /// World-space centre of the surface bounds.
    pub center: Vec3,
    /// Half of the bounding-box edge lengths, per axis.
    pub half_extents: Vec3,
}

impl SurfaceBounds {
    /// Bounds centred at the origin with zero extent.
    pub const ZERO: Self = Self {
        center: Vec3::ZERO,
        half_extents: Vec3::ZERO,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_contains_by_distance() {
        let volume = ObservedVolume {
            center: Vec3::new(1.0, 0.0, 0.0),
            shape: VolumeShape::Sphere { radius: 2.0 },
        };
        assert!(volume.contains(Vec3::new(2.5, 0.0, 0.0)));
        assert!(volume.contains(Vec3::new(3.0, 0.0, 0.0)), "boundary is inside");
        assert!(!volume.contains(Vec3::new(3.1, 0.0, 0.0)));
    }

    #[test]
    fn box_contains_per_axis() {
        let volume = ObservedVolume {
            center: Vec3::ZERO,
            shape: VolumeShape::AxisAlignedBox {
                half_extents: Vec3::new(4.0, 2.0, 1.0),
            },
        };
        assert!(volume.contains(Vec3::new(3.9, -1.9, 0.9)));
        assert!(!volume.contains(Vec3::new(3.9, -1.9, 1.1)), "z out of range");
        assert!(!volume.contains(Vec3::new(4.1, 0.0, 0.0)), "x out of range");
    }

    #[test]
    fn box_containment_moves_with_center() {
        let volume = ObservedVolume {
            center: Vec3::new(10.0, 0.0, 0.0),
            shape: VolumeShape::AxisAlignedBox {
                half_extents: Vec3::splat(1.0),
            },
        };
        assert!(!volume.contains(Vec3::ZERO));
        assert!(volume.contains(Vec3::new(10.5, 0.5, -0.5)));
    }
}
