use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::interval;
use crate::logger;
use crate::platform::Platform;
use crate::similarity::SimilarityGate;
use crate::sleep;
use crate::status::{RunStatus, StatusReporter};
use crate::types::{Point, RunPlan};

/// Consecutive injection failures before the log escalates to error level.
pub const FAILURE_ESCALATION: u32 = 3;

// Pause between the action and the rest-point click
const REST_SETTLE_MS: u64 = 50;

/// Runs the gate → act → countdown cycle on a background thread.
///
/// Only the cycle thread writes the shared `RunStatus`; readers get whole
/// copies, either from `status()` or through the reporter.
pub struct ActionScheduler {
    platform: Arc<dyn Platform>,
    reporter: Arc<dyn StatusReporter>,
    tick: Duration,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<RunStatus>>,
    worker: Option<JoinHandle<()>>,
}

impl ActionScheduler {
    pub fn new(platform: Arc<dyn Platform>, reporter: Arc<dyn StatusReporter>) -> Self {
        logger::register_prefix("sched", logger::COLOR_BLUE);
        Self {
            platform,
            reporter,
            tick: Duration::from_secs(1),
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(RunStatus::default())),
            worker: None,
        }
    }

    /// Length of one countdown step. One second unless overridden.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RunStatus {
        self.status.lock().clone()
    }

    pub fn validate(&self, plan: &RunPlan) -> Result<(), ConfigError> {
        interval::validate(&plan.interval)?;

        let threshold = plan.safety.threshold_percent;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        if plan.safety.enabled && plan.capture.is_none() {
            return Err(ConfigError::MissingReference);
        }

        let bounds = match self.platform.display_size() {
            Ok(size) => Some(size),
            Err(e) => {
                logger::warn_p("sched", &format!("display size unknown, skipping bounds check: {:#}", e));
                None
            }
        };
        check_point("click", plan.click_point, bounds)?;
        if let Some(rest) = plan.rest_point() {
            check_point("rest", rest, bounds)?;
        }
        Ok(())
    }

    /// Validate `plan` and begin cycling. A no-op while already running.
    pub fn start(&mut self, plan: RunPlan) -> Result<(), ConfigError> {
        if self.is_running() {
            logger::warn_p("sched", "start ignored: already running");
            return Ok(());
        }
        if let Err(e) = self.validate(&plan) {
            logger::warn_p("sched", &format!("start rejected: {}", e));
            return Err(e);
        }
        // A previous worker may have died without stop(); reap it first
        if let Some(old) = self.worker.take() {
            old.join().ok();
        }

        let initial = RunStatus {
            running: true,
            randomized: plan.interval.randomized,
            started_at: Some(Local::now()),
            ..Default::default()
        };
        *self.status.lock() = initial.clone();
        self.running.store(true, Ordering::Release);
        self.reporter.publish(&initial);

        logger::info_p("sched", &describe(&plan));

        let worker = CycleWorker {
            plan,
            platform: Arc::clone(&self.platform),
            reporter: Arc::clone(&self.reporter),
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
            tick: self.tick,
        };
        self.worker = Some(thread::spawn(move || worker.run()));
        Ok(())
    }

    /// Clear the run flag, wait for the cycle thread to leave and publish
    /// the final stopped snapshot. Does nothing when idle.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            logger::error_p("sched", "cycle thread panicked");
        }

        let snapshot = {
            let mut s = self.status.lock();
            s.running = false;
            s.seconds_remaining = 0;
            s.clone()
        };
        self.reporter.publish(&snapshot);
        logger::info_p(
            "sched",
            &format!("stopped: {} click(s), {} skipped", snapshot.click_count, snapshot.skipped_count),
        );
    }
}

impl Drop for ActionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_point(what: &'static str, point: Point, bounds: Option<(u32, u32)>) -> Result<(), ConfigError> {
    if point.x < 0 || point.y < 0 {
        return Err(ConfigError::NegativePoint { what, point });
    }
    if let Some((width, height)) = bounds {
        if point.x as u32 >= width || point.y as u32 >= height {
            return Err(ConfigError::PointOutOfBounds { what, point, width, height });
        }
    }
    Ok(())
}

fn describe(plan: &RunPlan) -> String {
    let every = if plan.interval.randomized {
        format!("{}-{}s", plan.interval.min_seconds, plan.interval.max_seconds)
    } else {
        format!("{}s", plan.interval.min_seconds)
    };
    let mut line = format!("started: {} click at {} every {}", plan.click_kind, plan.click_point, every);
    if let Some(rest) = plan.rest_point() {
        line.push_str(&format!(", rest at {}", rest));
    }
    if plan.safety.enabled {
        line.push_str(&format!(", gated at {:.1}%", plan.safety.threshold_percent));
    }
    line
}

/// True when `p` sits in one of the four corners of a `width`x`height` display.
/// Coordinates past the edge count as the edge.
pub fn in_display_corner(p: Point, (width, height): (u32, u32)) -> bool {
    let (x, y) = (p.x as i64, p.y as i64);
    let (max_x, max_y) = (width as i64 - 1, height as i64 - 1);
    (x <= 0 || x >= max_x) && (y <= 0 || y >= max_y)
}

/// Marks the run as over when the cycle thread exits, panics included.
struct RunGuard {
    running: Arc<AtomicBool>,
    status: Arc<Mutex<RunStatus>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        let mut s = self.status.lock();
        s.running = false;
        s.seconds_remaining = 0;
    }
}

enum GateVerdict {
    Disabled,
    Passed(f64),
    Blocked(f64),
    /// Capture failed; the action proceeds anyway
    Unavailable(String),
}

struct CycleWorker {
    plan: RunPlan,
    platform: Arc<dyn Platform>,
    reporter: Arc<dyn StatusReporter>,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<RunStatus>>,
    tick: Duration,
}

impl CycleWorker {
    fn run(self) {
        let _guard = RunGuard {
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
        };
        let mut rng = rand::thread_rng();

        while self.is_running() {
            self.cycle();
            if !self.is_running() {
                break;
            }
            let delay = interval::next_delay(&self.plan.interval, &mut rng);
            if !self.countdown(delay) {
                break;
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn publish_with(&self, f: impl FnOnce(&mut RunStatus)) {
        let snapshot = {
            let mut s = self.status.lock();
            f(&mut s);
            s.clone()
        };
        self.reporter.publish(&snapshot);
    }

    /// Pointer parked in a display corner aborts the run. Returns true if it did.
    fn failsafe_tripped(&self) -> bool {
        let (Ok(pointer), Ok(display)) = (self.platform.cursor_position(), self.platform.display_size()) else {
            return false;
        };
        if !in_display_corner(pointer, display) {
            return false;
        }
        let msg = format!("failsafe: pointer in screen corner at {}, run aborted", pointer);
        logger::warn_p("sched", &msg);
        self.running.store(false, Ordering::Release);
        self.publish_with(|s| {
            s.running = false;
            s.seconds_remaining = 0;
            s.last_action_taken = false;
            s.last_error = Some(msg);
        });
        true
    }

    fn evaluate_gate(&self) -> GateVerdict {
        let Some(capture) = self.plan.capture.as_ref().filter(|_| self.plan.safety.enabled) else {
            return GateVerdict::Disabled;
        };
        let current = match self.platform.capture_region(capture.region) {
            Ok(img) => img,
            Err(e) => return GateVerdict::Unavailable(format!("screen capture failed: {:#}", e)),
        };
        let gate = SimilarityGate::new(self.plan.safety.threshold_percent);
        match gate.evaluate(&capture.reference_image, &current) {
            (score, true) => GateVerdict::Passed(score),
            (score, false) => GateVerdict::Blocked(score),
        }
    }

    /// One gate + act step, ending with a single status publish.
    fn cycle(&self) {
        let verdict = self.evaluate_gate();
        if !self.is_running() || self.failsafe_tripped() {
            return;
        }

        let mut similarity = None;
        let mut cycle_error = None;
        match verdict {
            GateVerdict::Blocked(score) => {
                logger::info_p(
                    "sched",
                    &format!("skipped: similarity {:.1}% below {:.1}%", score, self.plan.safety.threshold_percent),
                );
                self.publish_with(|s| {
                    s.skipped_count += 1;
                    s.last_similarity = Some(score);
                    s.last_action_taken = false;
                    s.last_error = None;
                });
                return;
            }
            GateVerdict::Passed(score) => similarity = Some(score),
            GateVerdict::Unavailable(msg) => {
                logger::warn_p("sched", &format!("{}, clicking anyway", msg));
                cycle_error = Some(msg);
            }
            GateVerdict::Disabled => {}
        }

        match self.platform.move_and_click(self.plan.click_point, self.plan.click_kind) {
            Ok(()) => {
                if let Some(rest) = self.plan.rest_point() {
                    sleep::sleep_ms(REST_SETTLE_MS);
                    if let Err(e) = self.platform.click(rest) {
                        let msg = format!("rest click failed: {:#}", e);
                        logger::warn_p("sched", &msg);
                        cycle_error = Some(msg);
                    }
                }
                self.publish_with(|s| {
                    s.click_count += 1;
                    s.last_action_taken = true;
                    s.last_action_at = Some(Local::now());
                    s.consecutive_failures = 0;
                    if similarity.is_some() {
                        s.last_similarity = similarity;
                    }
                    s.last_error = cycle_error;
                });
            }
            Err(e) => {
                let msg = format!("click failed: {:#}", e);
                let failures = {
                    let s = self.status.lock();
                    s.consecutive_failures + 1
                };
                if failures >= FAILURE_ESCALATION {
                    logger::error_p("sched", &format!("{} ({} in a row)", msg, failures));
                } else {
                    logger::warn_p("sched", &msg);
                }
                self.publish_with(|s| {
                    s.consecutive_failures = failures;
                    s.last_action_taken = false;
                    if similarity.is_some() {
                        s.last_similarity = similarity;
                    }
                    s.last_error = Some(msg);
                });
            }
        }
    }

    /// Publish `delay, delay-1, .., 1`, one per tick. False once stopped.
    fn countdown(&self, delay: u64) -> bool {
        for remaining in (1..=delay).rev() {
            if !self.is_running() {
                return false;
            }
            self.publish_with(|s| s.seconds_remaining = remaining);
            if !sleep::sleep_while(self.tick, &self.running) {
                return false;
            }
        }
        self.status.lock().seconds_remaining = 0;
        self.is_running()
    }
}
