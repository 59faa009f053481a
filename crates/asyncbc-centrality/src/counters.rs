//! Per-rule action counters.
//!
//! Updated with relaxed atomics from inside the forward and backward phases
//! when enabled; a disabled set costs one branch per event. Saturation events
//! are always counted.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::Serialize;

/// One counted engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ShortestPath,
    SigmaRefreshChecked,
    SigmaRefreshApplied,
    FirstValidation,
    CorrectionChecked,
    CorrectionApplied,
    NoAction,
    Leaf,
}

#[derive(Debug, Default)]
pub struct ActionCounters {
    enabled: AtomicBool,
    shortest_path: AtomicU64,
    sigma_refresh_checked: AtomicU64,
    sigma_refresh_applied: AtomicU64,
    first_validation: AtomicU64,
    correction_checked: AtomicU64,
    correction_applied: AtomicU64,
    no_action: AtomicU64,
    leaves: AtomicU64,
    largest_distance: AtomicU32,
    sigma_saturations: AtomicU64,
}

impl ActionCounters {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        let counters = Self::default();
        counters.enabled.store(enabled, Ordering::Relaxed);
        counters
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn record(&self, action: Action) {
        self.record_n(action, 1);
    }

    pub fn record_n(&self, action: Action, n: u64) {
        if !self.is_enabled() {
            return;
        }
        let slot = match action {
            Action::ShortestPath => &self.shortest_path,
            Action::SigmaRefreshChecked => &self.sigma_refresh_checked,
            Action::SigmaRefreshApplied => &self.sigma_refresh_applied,
            Action::FirstValidation => &self.first_validation,
            Action::CorrectionChecked => &self.correction_checked,
            Action::CorrectionApplied => &self.correction_applied,
            Action::NoAction => &self.no_action,
            Action::Leaf => &self.leaves,
        };
        slot.fetch_add(n, Ordering::Relaxed);
    }

    pub fn observe_distance(&self, distance: u32) {
        if self.is_enabled() {
            self.largest_distance.fetch_max(distance, Ordering::Relaxed);
        }
    }

    pub fn record_saturation(&self) {
        self.sigma_saturations.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn report(&self) -> ActionReport {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ActionReport {
            shortest_path: get(&self.shortest_path),
            sigma_refresh_checked: get(&self.sigma_refresh_checked),
            sigma_refresh_applied: get(&self.sigma_refresh_applied),
            first_validation: get(&self.first_validation),
            correction_checked: get(&self.correction_checked),
            correction_applied: get(&self.correction_applied),
            no_action: get(&self.no_action),
            leaves: get(&self.leaves),
            largest_distance: self.largest_distance.load(Ordering::Relaxed),
            sigma_saturations: get(&self.sigma_saturations),
        }
    }

    pub fn clear(&self) {
        for c in [
            &self.shortest_path,
            &self.sigma_refresh_checked,
            &self.sigma_refresh_applied,
            &self.first_validation,
            &self.correction_checked,
            &self.correction_applied,
            &self.no_action,
            &self.leaves,
            &self.sigma_saturations,
        ] {
            c.store(0, Ordering::Relaxed);
        }
        self.largest_distance.store(0, Ordering::Relaxed);
    }
}

/// Counter values at the time of [`ActionCounters::report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub shortest_path: u64,
    pub sigma_refresh_checked: u64,
    pub sigma_refresh_applied: u64,
    pub first_validation: u64,
    pub correction_checked: u64,
    pub correction_applied: u64,
    pub no_action: u64,
    pub leaves: u64,
    pub largest_distance: u32,
    pub sigma_saturations: u64,
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: [(&str, u64); 10] = [
            ("new shortest path", self.shortest_path),
            ("sigma refresh checked", self.sigma_refresh_checked),
            ("sigma refresh applied", self.sigma_refresh_applied),
            ("first validation", self.first_validation),
            ("correction checked", self.correction_checked),
            ("correction applied", self.correction_applied),
            ("no action", self.no_action),
            ("leaves", self.leaves),
            ("largest distance", u64::from(self.largest_distance)),
            ("sigma saturations", self.sigma_saturations),
        ];
        for (label, value) in rows {
            writeln!(f, "{label:<24} {value:>12}")?;
        }
        Ok(())
    }
}
