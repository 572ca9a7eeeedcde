use std::sync::{mpsc, Arc};

use pulse_core::capture::{CaptureEvent, CaptureOutcome, CaptureSession};
use pulse_core::logger::{self, LogLine};
use pulse_core::platform::Platform;
use pulse_core::types::{CaptureResult, ClickKind, IntervalConfig, Point, RunPlan, SafetyConfig};
use pulse_core::{ActionScheduler, RunStatus};

use crate::confirm::ConfirmDialog;

const THRESHOLD_STEP: f64 = 1.0;
/// Newest log lines kept for the log panel.
pub const LOG_CAPACITY: usize = 1000;

/// Settings edited in the TUI before a run starts.
#[derive(Debug, Clone)]
pub struct Draft {
    pub click_point: Option<Point>,
    pub click_kind: ClickKind,
    pub interval: IntervalConfig,
    pub safety: SafetyConfig,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            click_point: None,
            click_kind: ClickKind::Left,
            interval: IntervalConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

pub struct App {
    pub platform: Arc<dyn Platform>,
    pub scheduler: ActionScheduler,
    pub status: RunStatus,
    pub status_rx: mpsc::Receiver<RunStatus>,
    pub draft: Draft,
    pub capture: Option<Arc<CaptureResult>>,
    pub session: Option<CaptureSession>,
    pub pointer: Option<Point>,
    pub notice: Option<String>,
    pub confirm: Option<ConfirmDialog>,
    pub log_visible: bool,
    pub log_messages: Vec<LogLine>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<LogLine>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        platform: Arc<dyn Platform>,
        scheduler: ActionScheduler,
        status_rx: mpsc::Receiver<RunStatus>,
        log_rx: mpsc::Receiver<LogLine>,
        draft: Draft,
    ) -> Self {
        Self {
            platform,
            scheduler,
            status: RunStatus::default(),
            status_rx,
            draft,
            capture: None,
            session: None,
            pointer: None,
            notice: None,
            confirm: None,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        self.log_messages.extend(self.log_rx.try_iter());
        let excess = self.log_messages.len().saturating_sub(LOG_CAPACITY);
        if excess > 0 {
            self.log_messages.drain(..excess);
        }
    }

    /// Keep only the newest snapshot; older ones are superseded.
    pub fn drain_status(&mut self) {
        if let Some(latest) = self.status_rx.try_iter().last() {
            self.status = latest;
        }
    }

    /// Refresh the pointer readout and feed live drag moves to an open session.
    pub fn poll_pointer(&mut self) {
        self.pointer = self.platform.cursor_position().ok();
        if let (Some(session), Some(at)) = (self.session.as_mut(), self.pointer) {
            if let Some(ev) = session.event_for_motion(at) {
                session.handle(ev);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn run_plan(&self) -> Result<RunPlan, String> {
        let click_point = self
            .draft
            .click_point
            .ok_or_else(|| "no click point: press p or run a capture first".to_string())?;
        Ok(RunPlan {
            click_point,
            click_kind: self.draft.click_kind,
            interval: self.draft.interval,
            safety: self.draft.safety,
            capture: self.capture.clone(),
        })
    }

    pub fn start_stop(&mut self) {
        if self.is_running() {
            self.scheduler.stop();
            self.notice = None;
            return;
        }
        if self.session.is_some() {
            self.notice = Some("finish or cancel the capture first".into());
            return;
        }
        let result = self
            .run_plan()
            .and_then(|plan| self.scheduler.start(plan).map_err(|e| e.to_string()));
        self.notice = result.err();
    }

    pub fn begin_capture(&mut self) {
        if self.is_running() {
            self.notice = Some("stop the run before capturing".into());
            return;
        }
        match CaptureSession::begin(self.platform.as_ref()) {
            Ok(session) => {
                self.session = Some(session);
                self.notice = None;
            }
            Err(e) => {
                logger::error(&format!("{:#}", e));
                self.notice = Some(format!("capture failed: {:#}", e));
            }
        }
    }

    /// Confirm the current capture step at the pointer location.
    pub fn confirm_capture_step(&mut self) {
        let Some(at) = self.pointer else {
            self.notice = Some("pointer position unavailable".into());
            return;
        };
        let Some(session) = self.session.as_mut() else { return };
        let Some(event) = session.event_for_confirm(at) else { return };
        if let Some(outcome) = session.handle(event) {
            self.finish_capture(outcome);
        }
    }

    pub fn cancel_capture(&mut self) {
        let outcome = self
            .session
            .as_mut()
            .and_then(|s| s.handle(CaptureEvent::Cancel));
        if let Some(outcome) = outcome {
            self.finish_capture(outcome);
        }
    }

    fn finish_capture(&mut self, outcome: CaptureOutcome) {
        self.session = None;
        match outcome {
            CaptureOutcome::Completed(result) => {
                self.draft.click_point = Some(result.click_point);
                self.notice = Some(format!("captured region {}", result.region));
                self.capture = Some(Arc::new(result));
            }
            CaptureOutcome::Cancelled => {
                self.notice = Some("capture cancelled".into());
            }
        }
    }

    /// Use the current pointer position as the click point.
    pub fn pick_point(&mut self) {
        match self.platform.cursor_position() {
            Ok(p) => {
                self.draft.click_point = Some(p);
                self.notice = Some(format!("click point set to {}", p));
            }
            Err(e) => self.notice = Some(format!("pointer position unavailable: {:#}", e)),
        }
    }

    pub fn cycle_click_kind(&mut self) {
        self.draft.click_kind = self.draft.click_kind.next();
    }

    pub fn adjust_min(&mut self, delta: i64) {
        let i = &mut self.draft.interval;
        i.min_seconds = i.min_seconds.saturating_add_signed(delta);
    }

    pub fn adjust_max(&mut self, delta: i64) {
        let i = &mut self.draft.interval;
        i.max_seconds = i.max_seconds.saturating_add_signed(delta);
    }

    pub fn toggle_random(&mut self) {
        self.draft.interval.randomized = !self.draft.interval.randomized;
    }

    pub fn toggle_safety(&mut self) {
        self.draft.safety.enabled = !self.draft.safety.enabled;
    }

    pub fn adjust_threshold(&mut self, steps: f64) {
        let t = self.draft.safety.threshold_percent + steps * THRESHOLD_STEP;
        self.draft.safety.threshold_percent = t.clamp(0.0, 100.0);
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Quit right away when idle, ask first while a run is active.
    pub fn request_quit(&mut self) {
        if self.is_running() {
            self.confirm = Some(ConfirmDialog::new("Stop clicking and quit?"));
        } else {
            self.quit();
        }
    }

    pub fn answer_confirm(&mut self) {
        if let Some(dialog) = self.confirm.take() {
            if dialog.selected {
                self.quit();
            }
        }
    }

    pub fn quit(&mut self) {
        self.scheduler.stop();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::capture::CaptureStep;
    use pulse_core::platform::stub::StubPlatform;
    use pulse_core::ChannelReporter;

    fn app(stub: &Arc<StubPlatform>) -> App {
        let platform: Arc<dyn Platform> = Arc::clone(stub) as Arc<dyn Platform>;
        let (reporter, status_rx) = ChannelReporter::channel();
        let scheduler = ActionScheduler::new(Arc::clone(&platform), Arc::new(reporter));
        let (_log_tx, log_rx) = mpsc::channel();
        App::new(platform, scheduler, status_rx, log_rx, Draft::default())
    }

    #[test]
    fn log_buffer_keeps_newest_lines() {
        let stub = Arc::new(StubPlatform::new());
        let platform: Arc<dyn Platform> = Arc::clone(&stub) as Arc<dyn Platform>;
        let (reporter, status_rx) = ChannelReporter::channel();
        let scheduler = ActionScheduler::new(Arc::clone(&platform), Arc::new(reporter));
        let (log_tx, log_rx) = mpsc::channel();
        let mut app = App::new(platform, scheduler, status_rx, log_rx, Draft::default());

        for i in 0..LOG_CAPACITY + 5 {
            log_tx
                .send(LogLine {
                    level: logger::Level::Info,
                    prefix: String::new(),
                    color: logger::COLOR_DEFAULT,
                    timestamp: "00:00:00".into(),
                    message: i.to_string(),
                })
                .unwrap();
        }
        app.drain_logs();
        assert_eq!(app.log_messages.len(), LOG_CAPACITY);
        assert_eq!(app.log_messages[0].message, "5");
        assert_eq!(app.log_messages.last().map(|l| l.message.as_str()), Some("1004"));
    }

    fn confirm_at(app: &mut App, stub: &StubPlatform, p: Point) {
        stub.set_cursor(p);
        app.poll_pointer();
        app.confirm_capture_step();
    }

    #[test]
    fn capture_flow_through_pointer_confirms() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        app.begin_capture();
        assert!(app.session.is_some());

        confirm_at(&mut app, &stub, Point::new(100, 100));
        confirm_at(&mut app, &stub, Point::new(50, 50));
        assert_eq!(app.session.as_ref().map(|s| s.step()), Some(CaptureStep::DraggingRegion));

        stub.set_cursor(Point::new(120, 90));
        app.poll_pointer();
        let live = app.session.as_ref().and_then(|s| s.live_region());
        assert_eq!(live.map(|r| (r.width, r.height)), Some((70, 40)));

        confirm_at(&mut app, &stub, Point::new(250, 150));
        confirm_at(&mut app, &stub, Point::new(10, 10));

        assert!(app.session.is_none());
        let capture = app.capture.clone().expect("capture stored");
        assert_eq!(capture.rest_point, Point::new(10, 10));
        assert_eq!(app.draft.click_point, Some(Point::new(100, 100)));

        let plan = app.run_plan().unwrap();
        assert_eq!(plan.rest_point(), Some(Point::new(10, 10)));
    }

    #[test]
    fn cancel_keeps_previous_capture() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        app.begin_capture();
        confirm_at(&mut app, &stub, Point::new(100, 100));
        app.cancel_capture();
        assert!(app.session.is_none());
        assert!(app.capture.is_none());
        assert!(app.draft.click_point.is_none());
        assert_eq!(app.notice.as_deref(), Some("capture cancelled"));
    }

    #[test]
    fn start_without_point_reports_notice() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        app.start_stop();
        assert!(!app.is_running());
        assert!(app.notice.as_deref().is_some_and(|n| n.contains("no click point")));
    }

    #[test]
    fn start_reports_config_error() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        stub.set_cursor(Point::new(5, 5));
        app.pick_point();
        app.toggle_safety();
        app.start_stop();
        assert!(!app.is_running());
        assert!(app.notice.as_deref().is_some_and(|n| n.contains("no region has been captured")));
    }

    #[test]
    fn draft_adjustments_saturate() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        app.draft.interval = IntervalConfig::fixed(2);
        app.adjust_min(-5);
        assert_eq!(app.draft.interval.min_seconds, 0);
        app.adjust_threshold(50.0);
        assert_eq!(app.draft.safety.threshold_percent, 100.0);
        app.cycle_click_kind();
        assert_eq!(app.draft.click_kind, ClickKind::Right);
    }

    #[test]
    fn quit_while_running_asks_first() {
        let stub = Arc::new(StubPlatform::new());
        let mut app = app(&stub);
        app.draft.click_point = Some(Point::new(1, 1));
        app.draft.interval = IntervalConfig::fixed(600);
        app.start_stop();
        assert!(app.is_running());

        app.request_quit();
        assert!(app.confirm.is_some());
        app.answer_confirm(); // defaults to No
        assert!(!app.should_quit);
        assert!(app.is_running());

        app.request_quit();
        if let Some(d) = app.confirm.as_mut() {
            d.toggle();
        }
        app.answer_confirm();
        assert!(app.should_quit);
        assert!(!app.is_running());
    }
}
