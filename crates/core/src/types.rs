use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;

/// Screen coordinate in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Screen-coordinate rectangle monitored for visual change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Normalized rectangle spanned by two corners, in either order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    pub fn contains(&self, p: Point) -> bool {
        let (x, y) = (p.x as i64, p.y as i64);
        x >= self.left as i64 && x < self.right() && y >= self.top as i64 && y < self.bottom()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.left, self.top)
    }
}

/// Which pointer action a run injects at the click point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickKind {
    #[default]
    Left,
    Right,
    Double,
}

impl ClickKind {
    pub fn label(self) -> &'static str {
        match self {
            ClickKind::Left => "left",
            ClickKind::Right => "right",
            ClickKind::Double => "double",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ClickKind::Left => ClickKind::Right,
            ClickKind::Right => ClickKind::Double,
            ClickKind::Double => ClickKind::Left,
        }
    }
}

impl fmt::Display for ClickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClickKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(ClickKind::Left),
            "right" | "r" => Ok(ClickKind::Right),
            "double" | "d" => Ok(ClickKind::Double),
            other => Err(format!("unknown click kind '{}' (expected left, right or double)", other)),
        }
    }
}

/// Delay configuration between two actions, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalConfig {
    pub min_seconds: u64,
    pub randomized: bool,
    /// Upper bound, only read when `randomized` is set
    pub max_seconds: u64,
}

impl IntervalConfig {
    pub const fn fixed(seconds: u64) -> Self {
        Self { min_seconds: seconds, randomized: false, max_seconds: seconds }
    }

    pub const fn random(min_seconds: u64, max_seconds: u64) -> Self {
        Self { min_seconds, randomized: true, max_seconds }
    }

    /// Build from the minutes + seconds pairs operators usually type in.
    pub fn from_minutes_seconds(min: (u64, u64), max: Option<(u64, u64)>) -> Self {
        let total = |(m, s): (u64, u64)| m.saturating_mul(60).saturating_add(s);
        match max {
            Some(max) => Self::random(total(min), total(max)),
            None => Self::fixed(total(min)),
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self { min_seconds: 300, randomized: false, max_seconds: 1200 }
    }
}

/// Similarity gating settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyConfig {
    pub enabled: bool,
    pub threshold_percent: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self { enabled: false, threshold_percent: 90.0 }
    }
}

/// Outcome of a completed capture session. Never mutated once built.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub click_point: Point,
    pub region: Region,
    pub reference_image: RgbaImage,
    pub rest_point: Point,
}

/// Everything `ActionScheduler::start` needs for one run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub click_point: Point,
    pub click_kind: ClickKind,
    pub interval: IntervalConfig,
    pub safety: SafetyConfig,
    pub capture: Option<Arc<CaptureResult>>,
}

impl RunPlan {
    /// Plan that clicks the captured click point and parks at the captured rest point.
    pub fn from_capture(
        capture: Arc<CaptureResult>,
        click_kind: ClickKind,
        interval: IntervalConfig,
        safety: SafetyConfig,
    ) -> Self {
        Self {
            click_point: capture.click_point,
            click_kind,
            interval,
            safety,
            capture: Some(capture),
        }
    }

    pub fn rest_point(&self) -> Option<Point> {
        self.capture.as_ref().map(|c| c.rest_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_from_corners_normalizes_reverse_drag() {
        let r = Region::from_corners(Point::new(250, 150), Point::new(50, 50));
        assert_eq!(r, Region { left: 50, top: 50, width: 200, height: 100 });
        assert!(r.contains(Point::new(50, 50)));
        assert!(!r.contains(Point::new(250, 150)));
    }

    #[test]
    fn click_kind_parses_case_insensitively() {
        assert_eq!("Double".parse::<ClickKind>(), Ok(ClickKind::Double));
        assert_eq!("r".parse::<ClickKind>(), Ok(ClickKind::Right));
        assert!("middle".parse::<ClickKind>().is_err());
    }

    #[test]
    fn interval_from_minutes_seconds() {
        let fixed = IntervalConfig::from_minutes_seconds((5, 0), None);
        assert_eq!(fixed, IntervalConfig::fixed(300));

        let rnd = IntervalConfig::from_minutes_seconds((0, 30), Some((1, 15)));
        assert!(rnd.randomized);
        assert_eq!((rnd.min_seconds, rnd.max_seconds), (30, 75));
    }
}
