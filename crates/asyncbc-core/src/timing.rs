//! Phase timing for driver-side instrumentation.
//!
//! Samples are thread-local: the source driver records `forward`,
//! `leaf_scan`, `backward` and `reset` on its own thread while the worker
//! pool runs, so one report covers a whole run without cross-thread merging.
//! Phase names are static strings; a report lists them alphabetically.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

pub const TIMING_ENV: &str = "ASYNCBC_TIMING";

thread_local! {
    static PHASES: RefCell<BTreeMap<&'static str, Vec<Duration>>> =
        const { RefCell::new(BTreeMap::new()) };
}

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Timing summary for every phase recorded on the current thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub phases: Vec<PhaseTiming>,
}

/// Distribution of one phase's samples. Durations are in microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub phase: &'static str,
    pub samples: usize,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
    /// Sum over all samples; for per-source phases this is the run total.
    pub total_us: u64,
}

impl PhaseTiming {
    fn from_samples(phase: &'static str, mut samples: Vec<Duration>) -> Self {
        samples.sort_unstable();
        let total: Duration = samples.iter().sum();
        Self {
            phase,
            samples: samples.len(),
            p50_us: micros(quantile(&samples, 50)),
            p95_us: micros(quantile(&samples, 95)),
            max_us: micros(samples.last().copied().unwrap_or_default()),
            total_us: micros(total),
        }
    }
}

/// `ASYNCBC_TIMING` set to `1`, `true`, `yes` or `on`, in any case.
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var(TIMING_ENV).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Turn collection on or off. Turning it off drops this thread's samples.
pub fn set_timing_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn clear_timings() {
    PHASES.with(|phases| phases.borrow_mut().clear());
}

/// Run `f`, recording its wall time under `phase` when collection is on.
pub fn timed<R>(phase: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }

    let started = Instant::now();
    let result = f();
    record(phase, started.elapsed());
    result
}

/// Take this thread's samples and summarize them.
#[must_use]
pub fn collect_report() -> TimingReport {
    let phases = PHASES.with(|phases| std::mem::take(&mut *phases.borrow_mut()));
    TimingReport {
        phases: phases
            .into_iter()
            .map(|(phase, samples)| PhaseTiming::from_samples(phase, samples))
            .collect(),
    }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Fixed-width table in milliseconds, one row per phase.
    #[must_use]
    pub fn display_table(&self) -> String {
        let mut out = format!(
            "{:<12} {:>8} {:>10} {:>10} {:>10} {:>12}\n",
            "phase", "samples", "p50 ms", "p95 ms", "max ms", "total ms"
        );
        for p in &self.phases {
            let _ = writeln!(
                out,
                "{:<12} {:>8} {:>10} {:>10} {:>10} {:>12}",
                p.phase,
                p.samples,
                millis(p.p50_us),
                millis(p.p95_us),
                millis(p.max_us),
                millis(p.total_us),
            );
        }
        out
    }
}

fn record(phase: &'static str, elapsed: Duration) {
    PHASES.with(|phases| phases.borrow_mut().entry(phase).or_default().push(elapsed));
}

/// Lower nearest-rank quantile of sorted samples.
fn quantile(sorted: &[Duration], pct: usize) -> Duration {
    match sorted.len() {
        0 => Duration::ZERO,
        len => sorted[(len - 1) * pct.min(100) / 100],
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn millis(us: u64) -> String {
    format!("{}.{:03}", us / 1_000, us % 1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn nothing_recorded_while_disabled() {
        let _serial = SERIAL.lock().expect("serial lock");
        set_timing_enabled(false);

        assert_eq!(timed("forward", || 7_u8), 7);
        assert!(collect_report().is_empty());
    }

    #[test]
    fn enabled_timer_records_the_phase() {
        let _serial = SERIAL.lock().expect("serial lock");
        set_timing_enabled(true);
        clear_timings();

        timed("backward", || std::thread::sleep(Duration::from_millis(1)));
        let report = collect_report();
        set_timing_enabled(false);

        assert_eq!(report.phases.len(), 1);
        assert_eq!(report.phases[0].phase, "backward");
        assert_eq!(report.phases[0].samples, 1);
        assert!(report.phases[0].total_us >= 1_000);
        assert!(collect_report().is_empty(), "collect drains samples");
    }

    #[test]
    fn per_source_samples_are_summarized() {
        let _serial = SERIAL.lock().expect("serial lock");
        clear_timings();

        for us in [3_000, 1_000, 2_000] {
            record("forward", Duration::from_micros(us));
        }
        record("backward", Duration::from_micros(500));

        let report = collect_report();
        let names: Vec<_> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(names, ["backward", "forward"]);

        let forward = &report.phases[1];
        assert_eq!(forward.samples, 3);
        assert_eq!(forward.p50_us, 2_000);
        assert_eq!(forward.max_us, 3_000);
        assert_eq!(forward.total_us, 6_000);

        let table = report.display_table();
        assert!(table.starts_with("phase"));
        assert!(table.contains("6.000"));
        assert!(table.contains("0.500"));
    }

    #[test]
    fn quantile_of_empty_is_zero() {
        assert_eq!(quantile(&[], 95), Duration::ZERO);
        let one = [Duration::from_micros(4)];
        assert_eq!(quantile(&one, 95), one[0]);
    }
}
