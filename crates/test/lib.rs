//! Shared fixtures for the end-to-end scenarios.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use pulse_core::platform::stub::StubPlatform;
use pulse_core::platform::Platform;
use pulse_core::{
    ActionScheduler, CaptureEvent, CaptureOutcome, CaptureResult, CaptureSession, ChannelReporter, Point,
    RunStatus,
};

pub const TICK: Duration = Duration::from_millis(20);

pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Stub-backed scheduler with a short tick, plus the receiver of every snapshot it publishes.
pub fn scheduler(stub: &Arc<StubPlatform>) -> (ActionScheduler, mpsc::Receiver<RunStatus>) {
    let (reporter, rx) = ChannelReporter::channel();
    let platform = Arc::clone(stub) as Arc<dyn Platform>;
    (ActionScheduler::new(platform, Arc::new(reporter)).with_tick(TICK), rx)
}

/// Run a full selection against the stub: click point, dragged region, rest point.
pub fn capture(stub: &StubPlatform, click: Point, corners: (Point, Point), rest: Point) -> Result<CaptureResult> {
    let session = CaptureSession::begin(stub)?;
    let events = [
        CaptureEvent::Point(click),
        CaptureEvent::DragStart(corners.0),
        CaptureEvent::DragMove(corners.1),
        CaptureEvent::DragRelease(corners.1),
        CaptureEvent::Point(rest),
    ];
    match session.drive(events) {
        Some(CaptureOutcome::Completed(result)) => Ok(result),
        Some(CaptureOutcome::Cancelled) => Err(anyhow!("capture was cancelled")),
        None => Err(anyhow!("capture did not complete")),
    }
}

pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn ensure(cond: bool, msg: impl Into<String>) -> Result<()> {
    if cond {
        return Ok(());
    }
    let msg: String = msg.into();
    Err(anyhow!(msg))
}
