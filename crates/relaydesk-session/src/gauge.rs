// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counter of live timer handles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared count of armed poll loops and deadlines.
#[derive(Debug, Clone, Default)]
pub struct LiveGauge(Arc<AtomicUsize>);

impl LiveGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more live handle until the returned guard is dropped.
    pub(crate) fn enter(&self) -> GaugeGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        GaugeGuard(self.0.clone())
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements its gauge on drop.
#[derive(Debug)]
pub(crate) struct GaugeGuard(Arc<AtomicUsize>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_count() {
        let gauge = LiveGauge::new();
        let a = gauge.enter();
        let b = gauge.clone().enter();
        assert_eq!(gauge.get(), 2);
        drop(a);
        assert_eq!(gauge.get(), 1);
        drop(b);
        assert_eq!(gauge.get(), 0);
    }
}
