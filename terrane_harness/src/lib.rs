// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable backend doubles and bake-churn metrics for demos and tests.
//!
//! [`ScriptedSource`] and [`ScriptedHost`] implement the
//! [`terrane_core::backend`] traits over plain queues and slabs, so a demo
//! or stress test can drive the whole bake pipeline without a device.
//! [`ChurnTracker`] aggregates bake latencies and failures into a letter
//! grade for HUD rendering.

#![no_std]

extern crate alloc;

mod doubles;
mod metrics;

pub use doubles::{FaultToggles, ScriptedHost, ScriptedSource};
pub use metrics::{ChurnGrade, ChurnReport, ChurnSample, ChurnTracker};

// The whole pipeline, driven exactly as the backend contract's tick loop
// describes, with two regions racing for the same physical surface.
#[cfg(test)]
mod pipeline_tests {
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    use glam::Vec3;

    use terrane_core::backend::DrawableHost;
    use terrane_core::bake::{SurfaceChange, SurfaceEvent};
    use terrane_core::context::BakeContext;
    use terrane_core::region::{RegionConfig, RegionStore};
    use terrane_core::surface::SurfaceId;
    use terrane_core::time::{Duration, HostTime, Timebase};
    use terrane_core::trace::Tracer;
    use terrane_core::volume::SurfaceBounds;

    use crate::{ChurnGrade, ChurnSample, ChurnTracker, ScriptedHost, ScriptedSource};

    fn added(surface: u32, at: u64) -> SurfaceEvent {
        SurfaceEvent {
            id: SurfaceId(surface),
            change: SurfaceChange::Added,
            bounds: SurfaceBounds::ZERO,
            updated_at: HostTime(at),
        }
    }

    fn removed(surface: u32, at: u64) -> SurfaceEvent {
        SurfaceEvent {
            id: SurfaceId(surface),
            change: SurfaceChange::Removed,
            bounds: SurfaceBounds::ZERO,
            updated_at: HostTime(at),
        }
    }

    #[test]
    fn full_pipeline_bakes_shares_and_evicts() {
        let mut regions = RegionStore::new();
        let mut context = BakeContext::new();
        let mut host = ScriptedHost::new();
        let mut tracker = ChurnTracker::<16>::new(0.0);
        let mut tracer = Tracer::none();

        let source_a = ScriptedSource::new();
        let source_b = ScriptedSource::new();
        let config = RegionConfig {
            update_interval: Duration(100),
            removal_ticks: 2,
            ..RegionConfig::default()
        };
        let a = regions.create(config, Box::new(source_a.clone()));
        let b = regions.create(config, Box::new(source_b.clone()));
        context.register(a).unwrap();
        context.register(b).unwrap();

        // Both observers report the same physical surface.
        source_a.push_event(added(1, 10));
        source_b.push_event(added(1, 10));

        for id in [a, b] {
            if regions.region_mut(id).tick(HostTime(0), &mut host, &mut tracer) {
                context.notify_work_available(&mut regions, &mut host, &mut tracer);
            }
        }
        // Each region requested the surface through its own observer; the
        // correlation tokens keep the two otherwise identical requests apart.
        assert_eq!(context.in_flight(), 2);
        assert_eq!(source_a.pending().len(), 1);
        assert_eq!(source_b.pending().len(), 1);

        // A's device finishes first; the embedder drains and reports.
        source_a.finish_next(Duration(5_000_000)).unwrap();
        let mut done = Vec::new();
        regions
            .region_mut(a)
            .source_mut()
            .drain_completions(&mut |c| done.push(c));
        for completion in done.drain(..) {
            context.on_bake_complete(&completion, &mut regions, &mut host, &mut tracer);
            let report = tracker.observe(ChurnSample {
                latency_ms: completion.elapsed.to_millis_f64(Timebase::NANOS),
                failed: !completion.output_written,
                backlog: 0,
            });
            assert_eq!(report.grade, ChurnGrade::A);
        }

        let drawable_a = regions
            .region(a)
            .registry()
            .active(SurfaceId(1))
            .unwrap()
            .drawable
            .unwrap();
        let drawable_b = regions
            .region(b)
            .registry()
            .active(SurfaceId(1))
            .unwrap()
            .drawable
            .unwrap();
        assert_eq!(host.applied_count(drawable_a), 1);
        assert_eq!(host.applied_count(drawable_b), 1, "b shared a's bake");
        assert_eq!(host.adopted_count(drawable_b), 1, "b adopted a's mesh");
        assert!(
            !regions
                .region(b)
                .registry()
                .active(SurfaceId(1))
                .unwrap()
                .awaiting_bake
        );
        assert_eq!(
            context.in_flight(),
            1,
            "b's duplicate request has no cancel; it stays in flight"
        );

        // The duplicate always completes and must be drained.
        source_b.finish_next(Duration(7_000_000)).unwrap();
        done.clear();
        regions
            .region_mut(b)
            .source_mut()
            .drain_completions(&mut |c| done.push(c));
        for completion in done.drain(..) {
            context.on_bake_complete(&completion, &mut regions, &mut host, &mut tracer);
        }
        assert_eq!(context.in_flight(), 0);
        assert_eq!(host.adopted_count(drawable_a), 1, "a adopted b's duplicate");

        // The surface vanishes from a's feed. Parked outside a's volume, it
        // survives exactly removal_ticks + 1 eviction passes.
        source_a.push_event(removed(1, 200));
        host.place(drawable_a, Vec3::new(100.0, 0.0, 0.0));
        let mut now = HostTime(200);
        for _ in 0..3 {
            regions.region_mut(a).tick(now, &mut host, &mut tracer);
            now = now + Duration(100);
        }
        assert!(!host.is_alive(drawable_a), "evicted after its countdown");
        assert_eq!(regions.region(a).registry().pending_len(), 0);
        assert!(host.is_alive(drawable_b), "b's copy is untouched");
    }
}
