//! Interactive selection of click point, monitored region and rest point.
//!
//! The session owns one full-screen snapshot taken when it begins; the
//! reference image is cropped from it so nothing drawn during selection
//! (overlay, repositioned client window) ends up in the reference.

use anyhow::{Context, Result};
use image::imageops;
use image::RgbaImage;

use crate::logger;
use crate::platform::ScreenCapture;
use crate::types::{CaptureResult, Point, Region};

/// Smallest accepted width and height of a dragged region, in pixels.
pub const MIN_REGION_SIDE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    AwaitingClickPoint,
    AwaitingRegionDrag,
    DraggingRegion,
    AwaitingRestPoint,
    Complete,
    Cancelled,
}

impl CaptureStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, CaptureStep::Complete | CaptureStep::Cancelled)
    }

    /// Operator-facing hint for the step.
    pub fn prompt(self) -> &'static str {
        match self {
            CaptureStep::AwaitingClickPoint => "1/3 point at the click target and confirm",
            CaptureStep::AwaitingRegionDrag => "2/3 point at one corner of the region to watch and confirm",
            CaptureStep::DraggingRegion => "2/3 move to the opposite corner and confirm",
            CaptureStep::AwaitingRestPoint => "3/3 point at a rest spot outside the region and confirm",
            CaptureStep::Complete => "capture complete",
            CaptureStep::Cancelled => "capture cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Point(Point),
    DragStart(Point),
    DragMove(Point),
    DragRelease(Point),
    Cancel,
}

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Completed(CaptureResult),
    Cancelled,
}

pub struct CaptureSession {
    snapshot: RgbaImage,
    step: CaptureStep,
    click_point: Option<Point>,
    anchor: Option<Point>,
    live: Option<Region>,
    region: Option<Region>,
    reference: Option<RgbaImage>,
}

impl CaptureSession {
    /// Start a session, grabbing the full-screen snapshot first.
    pub fn begin<S: ScreenCapture + ?Sized>(screen: &S) -> Result<Self> {
        logger::register_prefix("capture", logger::COLOR_GREEN);
        let snapshot = screen
            .capture_full_screen()
            .context("capturing screen for region selection")?;
        logger::info_p(
            "capture",
            &format!("session started on {}x{} snapshot", snapshot.width(), snapshot.height()),
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: RgbaImage) -> Self {
        Self {
            snapshot,
            step: CaptureStep::AwaitingClickPoint,
            click_point: None,
            anchor: None,
            live: None,
            region: None,
            reference: None,
        }
    }

    pub fn step(&self) -> CaptureStep {
        self.step
    }

    pub fn snapshot(&self) -> &RgbaImage {
        &self.snapshot
    }

    pub fn click_point(&self) -> Option<Point> {
        self.click_point
    }

    /// Rectangle under the current drag, for feedback only.
    pub fn live_region(&self) -> Option<Region> {
        self.live
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Feed one event. Returns the outcome on the transition into a terminal
    /// step; afterwards every event is ignored, so the outcome is produced once.
    pub fn handle(&mut self, event: CaptureEvent) -> Option<CaptureOutcome> {
        if self.step.is_terminal() {
            return None;
        }
        if event == CaptureEvent::Cancel {
            self.discard();
            self.step = CaptureStep::Cancelled;
            logger::info_p("capture", "cancelled");
            return Some(CaptureOutcome::Cancelled);
        }

        match (self.step, event) {
            (CaptureStep::AwaitingClickPoint, CaptureEvent::Point(p)) => {
                self.click_point = Some(p);
                self.step = CaptureStep::AwaitingRegionDrag;
                logger::info_p("capture", &format!("click point {}", p));
                None
            }
            (CaptureStep::AwaitingRegionDrag | CaptureStep::DraggingRegion, CaptureEvent::DragStart(p)) => {
                self.anchor = Some(p);
                self.live = Some(Region::from_corners(p, p));
                self.step = CaptureStep::DraggingRegion;
                None
            }
            (CaptureStep::DraggingRegion, CaptureEvent::DragMove(p)) => {
                self.live = self.anchor.map(|a| Region::from_corners(a, p));
                None
            }
            (CaptureStep::DraggingRegion, CaptureEvent::DragRelease(p)) => {
                let anchor = self.anchor.take();
                self.live = None;
                let crop = anchor.and_then(|a| self.crop(Region::from_corners(a, p)));
                match crop {
                    Some((region, reference)) => {
                        logger::info_p("capture", &format!("region {}", region));
                        self.region = Some(region);
                        self.reference = Some(reference);
                        self.step = CaptureStep::AwaitingRestPoint;
                    }
                    None => {
                        logger::warn_p("capture", "region too small, drag again");
                        self.step = CaptureStep::AwaitingRegionDrag;
                    }
                }
                None
            }
            (CaptureStep::AwaitingRestPoint, CaptureEvent::Point(p)) => self.finish(p),
            _ => None,
        }
    }

    /// Drive the session from an event source until it reaches a terminal step.
    /// Returns `None` if the source runs dry first.
    pub fn drive<I>(mut self, events: I) -> Option<CaptureOutcome>
    where
        I: IntoIterator<Item = CaptureEvent>,
    {
        events.into_iter().find_map(|ev| self.handle(ev))
    }

    /// What "confirm at the pointer" means in the current step.
    pub fn event_for_confirm(&self, at: Point) -> Option<CaptureEvent> {
        match self.step {
            CaptureStep::AwaitingClickPoint | CaptureStep::AwaitingRestPoint => Some(CaptureEvent::Point(at)),
            CaptureStep::AwaitingRegionDrag => Some(CaptureEvent::DragStart(at)),
            CaptureStep::DraggingRegion => Some(CaptureEvent::DragRelease(at)),
            CaptureStep::Complete | CaptureStep::Cancelled => None,
        }
    }

    /// Live drag update for a pointer that moved to `at`.
    pub fn event_for_motion(&self, at: Point) -> Option<CaptureEvent> {
        (self.step == CaptureStep::DraggingRegion).then_some(CaptureEvent::DragMove(at))
    }

    /// Clip to the snapshot and crop; `None` when the visible part is below the minimum size.
    fn crop(&self, region: Region) -> Option<(Region, RgbaImage)> {
        let (sw, sh) = self.snapshot.dimensions();
        let left = region.left.clamp(0, sw as i32);
        let top = region.top.clamp(0, sh as i32);
        let right = region.right().clamp(0, sw as i64) as i32;
        let bottom = region.bottom().clamp(0, sh as i64) as i32;
        let clipped = Region {
            left,
            top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        };
        if clipped.width < MIN_REGION_SIDE || clipped.height < MIN_REGION_SIDE {
            return None;
        }
        let img = imageops::crop_imm(&self.snapshot, left as u32, top as u32, clipped.width, clipped.height).to_image();
        Some((clipped, img))
    }

    fn finish(&mut self, rest_point: Point) -> Option<CaptureOutcome> {
        let (Some(click_point), Some(region), Some(reference_image)) =
            (self.click_point, self.region, self.reference.take())
        else {
            return None;
        };
        self.step = CaptureStep::Complete;
        if region.contains(rest_point) {
            logger::warn_p("capture", &format!("rest point {} lies inside region {}", rest_point, region));
        }
        logger::info_p("capture", &format!("rest point {}, capture complete", rest_point));
        Some(CaptureOutcome::Completed(CaptureResult {
            click_point,
            region,
            reference_image,
            rest_point,
        }))
    }

    fn discard(&mut self) {
        self.click_point = None;
        self.anchor = None;
        self.live = None;
        self.region = None;
        self.reference = None;
    }
}
