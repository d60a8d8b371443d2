// Copyright 2026 the Terrane Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics tooling for `terrane_core` traces.
//!
//! - [`recorder`] — compact binary event recording and decoding
//! - [`pretty`] — human-readable line output for live debugging
//! - [`chrome`] — Chrome Trace Event Format export for `chrome://tracing`

pub mod chrome;
pub mod pretty;
pub mod recorder;
