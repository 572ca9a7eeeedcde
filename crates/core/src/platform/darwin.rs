use anyhow::{anyhow, Result};
use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton, EventField};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use core_graphics::image::CGImage;
use core_graphics::window::{
    create_image, kCGNullWindowID, kCGWindowImageNominalResolution, kCGWindowListOptionOnScreenOnly,
};
use image::{Rgba, RgbaImage};

use crate::logger;
use crate::sleep;
use crate::types::{ClickKind, Point, Region};
use super::{InputInjector, ScreenCapture};

// Gap between down/up pairs; shorter gaps get coalesced by some apps
const CLICK_GAP_MS: u64 = 15;

/// CoreGraphics-backed input and capture for the main display.
pub struct DarwinPlatform;

impl DarwinPlatform {
    pub fn new() -> Self {
        DarwinPlatform
    }

    fn source() -> Result<CGEventSource> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow!("failed to create CGEventSource (Accessibility permission?)"))
    }

    fn post_move(point: CGPoint) -> Result<()> {
        let ev = CGEvent::new_mouse_event(Self::source()?, CGEventType::MouseMoved, point, CGMouseButton::Left)
            .map_err(|_| anyhow!("failed to create mouse move event"))?;
        ev.post(CGEventTapLocation::HID);
        Ok(())
    }

    /// Post `count` down/up pairs, tagging each with its click state so a
    /// second pair registers as a double click.
    fn post_clicks(point: CGPoint, button: CGMouseButton, count: i64) -> Result<()> {
        let (down_type, up_type) = match button {
            CGMouseButton::Right => (CGEventType::RightMouseDown, CGEventType::RightMouseUp),
            _ => (CGEventType::LeftMouseDown, CGEventType::LeftMouseUp),
        };
        for n in 1..=count {
            let down = CGEvent::new_mouse_event(Self::source()?, down_type, point, button)
                .map_err(|_| anyhow!("failed to create mouse down event"))?;
            down.set_integer_value_field(EventField::MOUSE_EVENT_CLICK_STATE, n);
            down.post(CGEventTapLocation::HID);

            sleep::sleep_ms(CLICK_GAP_MS);

            let up = CGEvent::new_mouse_event(Self::source()?, up_type, point, button)
                .map_err(|_| anyhow!("failed to create mouse up event"))?;
            up.set_integer_value_field(EventField::MOUSE_EVENT_CLICK_STATE, n);
            up.post(CGEventTapLocation::HID);

            sleep::sleep_ms(CLICK_GAP_MS);
        }
        Ok(())
    }

    fn grab(rect: CGRect) -> Result<RgbaImage> {
        let image = create_image(rect, kCGWindowListOptionOnScreenOnly, kCGNullWindowID, kCGWindowImageNominalResolution)
            .ok_or_else(|| anyhow!("CGWindowListCreateImage returned nothing (Screen Recording permission?)"))?;
        bgra_to_rgba(&image)
    }
}

impl Default for DarwinPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn cg_point(p: Point) -> CGPoint {
    CGPoint::new(p.x as f64, p.y as f64)
}

/// CGImage rows are BGRA and may carry padding past `width * 4`.
fn bgra_to_rgba(image: &CGImage) -> Result<RgbaImage> {
    let width = image.width() as u32;
    let height = image.height() as u32;
    let bpr = image.bytes_per_row();
    let data = image.data();
    let bytes = data.bytes();
    if bytes.len() < bpr * height as usize || bpr < width as usize * 4 {
        return Err(anyhow!("unexpected CGImage layout {}x{} bpr={}", width, height, bpr));
    }
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let i = y as usize * bpr + x as usize * 4;
        Rgba([bytes[i + 2], bytes[i + 1], bytes[i], bytes[i + 3]])
    }))
}

impl InputInjector for DarwinPlatform {
    fn move_and_click(&self, point: Point, kind: ClickKind) -> Result<()> {
        let at = cg_point(point);
        Self::post_move(at)?;
        match kind {
            ClickKind::Left => Self::post_clicks(at, CGMouseButton::Left, 1),
            ClickKind::Right => Self::post_clicks(at, CGMouseButton::Right, 1),
            ClickKind::Double => Self::post_clicks(at, CGMouseButton::Left, 2),
        }
    }

    fn click(&self, point: Point) -> Result<()> {
        let at = cg_point(point);
        Self::post_move(at)?;
        Self::post_clicks(at, CGMouseButton::Left, 1)
    }

    fn cursor_position(&self) -> Result<Point> {
        let ev = CGEvent::new(Self::source()?).map_err(|_| anyhow!("failed to read pointer location"))?;
        let loc = ev.location();
        Ok(Point::new(loc.x.round() as i32, loc.y.round() as i32))
    }

    fn display_size(&self) -> Result<(u32, u32)> {
        let bounds = CGDisplay::main().bounds();
        Ok((bounds.size.width as u32, bounds.size.height as u32))
    }
}

impl ScreenCapture for DarwinPlatform {
    fn capture_full_screen(&self) -> Result<RgbaImage> {
        let bounds = CGDisplay::main().bounds();
        let img = Self::grab(bounds)?;
        logger::info_p("darwin", &format!("captured screen {}x{}", img.width(), img.height()));
        Ok(img)
    }

    fn capture_region(&self, region: Region) -> Result<RgbaImage> {
        let rect = CGRect::new(
            &CGPoint::new(region.left as f64, region.top as f64),
            &CGSize::new(region.width as f64, region.height as f64),
        );
        Self::grab(rect)
    }
}
