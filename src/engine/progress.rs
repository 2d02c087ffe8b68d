//! Countdown display for the inter-item delay

use kdam::{Animation, Bar, BarExt};
use std::time::Duration;

use super::retry::Sleeper;

/// Create a countdown bar with one tick per second of `total`.
pub fn create_countdown(total: Duration, desc: &'static str) -> Bar {
    kdam::tqdm!(
        total = total.as_secs() as usize,
        desc = desc,
        animation = Animation::Classic,
        unit = "s",
        leave = false
    )
}

/// Sleep for `total` in one-second steps, advancing `bar` when present.
/// Returns the time actually slept.
pub fn countdown(sleeper: &dyn Sleeper, total: Duration, show_bar: bool) -> Duration {
    let secs = total.as_secs();
    let mut bar = (show_bar && secs > 0).then(|| create_countdown(total, "next item"));
    for _ in 0..secs {
        sleeper.sleep(Duration::from_secs(1), false);
        if let Some(bar) = bar.as_mut() {
            let _ = bar.update(1);
        }
    }
    let rest = total - Duration::from_secs(secs);
    if !rest.is_zero() {
        sleeper.sleep(rest, false);
    }
    if let Some(bar) = bar.as_mut() {
        let _ = bar.clear();
    }
    total
}
