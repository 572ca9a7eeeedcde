use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep while waiting on a run flag.
pub const POLL_SLICE: Duration = Duration::from_millis(50);

/// Sleep for `total`, waking every `POLL_SLICE` to check `running`.
/// Returns `false` as soon as the flag is cleared.
pub fn sleep_while(total: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(POLL_SLICE.min(deadline - now));
    }
}

/// Sleep for exact milliseconds (no interruption).
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
