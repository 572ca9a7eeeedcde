use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use image::imageops;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::logger;
use crate::types::{ClickKind, Point, Region};
use super::{InputInjector, ScreenCapture};

/// A pointer action the stub has received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedClick {
    /// `move_and_click` at the click point
    Action(Point, ClickKind),
    /// plain `click`, i.e. the rest point
    Rest(Point),
}

/// Headless platform: logs every call, records clicks, serves a canned screen.
pub struct StubPlatform {
    screen: Mutex<RgbaImage>,
    region_frame: Mutex<Option<RgbaImage>>,
    cursor: Mutex<Point>,
    clicks: Mutex<Vec<InjectedClick>>,
    fail_captures: Mutex<u32>,
    fail_clicks: Mutex<u32>,
    fail_rest_clicks: Mutex<u32>,
    capture_delay: Mutex<Duration>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::with_screen(RgbaImage::from_pixel(1920, 1080, Rgba([32, 32, 48, 255])))
    }

    /// The pointer starts at the screen centre, away from the failsafe corners.
    pub fn with_screen(screen: RgbaImage) -> Self {
        let centre = Point::new((screen.width() / 2) as i32, (screen.height() / 2) as i32);
        Self {
            screen: Mutex::new(screen),
            region_frame: Mutex::new(None),
            cursor: Mutex::new(centre),
            clicks: Mutex::new(Vec::new()),
            fail_captures: Mutex::new(0),
            fail_clicks: Mutex::new(0),
            fail_rest_clicks: Mutex::new(0),
            capture_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Serve `frame` from every `capture_region` call instead of cropping the screen.
    pub fn set_region_frame(&self, frame: Option<RgbaImage>) {
        *self.region_frame.lock() = frame;
    }

    pub fn set_cursor(&self, point: Point) {
        *self.cursor.lock() = point;
    }

    /// Make the next `n` screen captures fail.
    pub fn fail_next_captures(&self, n: u32) {
        *self.fail_captures.lock() = n;
    }

    /// Make the next `n` click injections fail.
    pub fn fail_next_clicks(&self, n: u32) {
        *self.fail_clicks.lock() = n;
    }

    /// Make the next `n` plain `click` calls fail while `move_and_click` keeps working.
    pub fn fail_next_rest_clicks(&self, n: u32) {
        *self.fail_rest_clicks.lock() = n;
    }

    /// Block every `capture_region` call for `delay` before answering.
    pub fn set_capture_delay(&self, delay: Duration) {
        *self.capture_delay.lock() = delay;
    }

    pub fn clicks(&self) -> Vec<InjectedClick> {
        self.clicks.lock().clone()
    }

    fn take_failure(counter: &Mutex<u32>) -> bool {
        let mut n = counter.lock();
        if *n > 0 {
            *n -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for StubPlatform {
    fn move_and_click(&self, point: Point, kind: ClickKind) -> Result<()> {
        logger::info_p("stub", &format!("move_and_click({}, {})", point, kind));
        if Self::take_failure(&self.fail_clicks) {
            bail!("stub input device busy");
        }
        *self.cursor.lock() = point;
        self.clicks.lock().push(InjectedClick::Action(point, kind));
        Ok(())
    }

    fn click(&self, point: Point) -> Result<()> {
        logger::info_p("stub", &format!("click({})", point));
        if Self::take_failure(&self.fail_clicks) || Self::take_failure(&self.fail_rest_clicks) {
            bail!("stub input device busy");
        }
        *self.cursor.lock() = point;
        self.clicks.lock().push(InjectedClick::Rest(point));
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(*self.cursor.lock())
    }

    fn display_size(&self) -> Result<(u32, u32)> {
        Ok(self.screen.lock().dimensions())
    }
}

impl ScreenCapture for StubPlatform {
    fn capture_full_screen(&self) -> Result<RgbaImage> {
        logger::info_p("stub", "capture_full_screen()");
        if Self::take_failure(&self.fail_captures) {
            bail!("stub screen capture unavailable");
        }
        Ok(self.screen.lock().clone())
    }

    fn capture_region(&self, region: Region) -> Result<RgbaImage> {
        logger::info_p("stub", &format!("capture_region({})", region));
        let delay = *self.capture_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if Self::take_failure(&self.fail_captures) {
            bail!("stub screen capture unavailable");
        }
        if let Some(frame) = self.region_frame.lock().as_ref() {
            return Ok(frame.clone());
        }
        let screen = self.screen.lock();
        let (sw, sh) = screen.dimensions();
        if region.left < 0 || region.top < 0 || region.right() > sw as i64 || region.bottom() > sh as i64 {
            bail!("region {} is outside the {}x{} screen", region, sw, sh);
        }
        Ok(imageops::crop_imm(&*screen, region.left as u32, region.top as u32, region.width, region.height).to_image())
    }
}
