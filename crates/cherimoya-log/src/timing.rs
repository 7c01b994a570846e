//! Wall-clock timing of closures.

use std::collections::BTreeMap;
use std::time::Instant;

/// Run `f` and log how long it took at debug level.
pub fn timed<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = f();
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    tracing::debug!("'{name}'  {ms:.2} ms");
    out
}

/// Run `f` and record its duration in whole milliseconds under `name`
/// instead of logging it.
pub fn timed_into<T>(name: &str, timings: &mut BTreeMap<String, u128>, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = f();
    timings.insert(name.to_string(), started.elapsed().as_millis());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timed_returns_closure_value() {
        assert_eq!(timed("answer", || 42), 42);
    }

    #[test]
    fn timed_into_records_duration() {
        let mut timings = BTreeMap::new();
        let out = timed_into("SLEEP", &mut timings, || {
            std::thread::sleep(Duration::from_millis(5));
            "done"
        });
        assert_eq!(out, "done");
        assert!(timings["SLEEP"] >= 5);
    }
}
