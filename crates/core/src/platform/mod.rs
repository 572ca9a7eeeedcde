pub mod stub;

#[cfg(target_os = "macos")]
pub mod darwin;

use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;

use crate::logger;
use crate::types::{ClickKind, Point, Region};

/// Synthetic pointer input.
pub trait InputInjector: Send + Sync {
    /// Move the pointer to `point` and inject `kind` there.
    fn move_and_click(&self, point: Point, kind: ClickKind) -> Result<()>;
    /// Plain left click at `point`, used to park the pointer at the rest point.
    fn click(&self, point: Point) -> Result<()>;
    fn cursor_position(&self) -> Result<Point>;
    /// Size of the display input coordinates refer to.
    fn display_size(&self) -> Result<(u32, u32)>;
}

/// Screenshots in RGBA, coordinates matching `InputInjector`.
pub trait ScreenCapture: Send + Sync {
    fn capture_full_screen(&self) -> Result<RgbaImage>;
    fn capture_region(&self, region: Region) -> Result<RgbaImage>;
}

/// Both services from one backend.
pub trait Platform: InputInjector + ScreenCapture {}

impl<T: InputInjector + ScreenCapture> Platform for T {}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Arc<dyn Platform> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Arc::new(stub::StubPlatform::new());
    }
    #[cfg(target_os = "macos")]
    {
        logger::register_prefix("darwin", logger::COLOR_GRAY);
        return Arc::new(darwin::DarwinPlatform::new());
    }
    #[cfg(not(target_os = "macos"))]
    {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        logger::warn("no native input backend for this OS, using stub platform");
        return Arc::new(stub::StubPlatform::new());
    }
}
