//! Whole-region similarity between a reference frame and a fresh capture.
//!
//! The score is a global mean absolute difference over RGB channels. It is meant to
//! notice that a panel changed or disappeared, not to locate anything.

use image::buffer::ConvertBuffer;
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};

/// Similarity in percent, `0.0..=100.0`.
///
/// A missing or empty frame scores 0. When sizes differ, `current` is resampled
/// (nearest neighbour) to the reference's dimensions first.
pub fn similarity(reference: Option<&RgbaImage>, current: Option<&RgbaImage>) -> f64 {
    let (Some(reference), Some(current)) = (reference, current) else {
        return 0.0;
    };
    let (w, h) = reference.dimensions();
    if w == 0 || h == 0 || current.width() == 0 || current.height() == 0 {
        return 0.0;
    }

    let reference: RgbImage = reference.convert();
    let current: RgbImage = if current.dimensions() == (w, h) {
        current.convert()
    } else {
        imageops::resize(current, w, h, FilterType::Nearest).convert()
    };

    let total: u64 = reference
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();
    let mean = total as f64 / reference.as_raw().len() as f64;

    (100.0 - mean / 255.0 * 100.0).clamp(0.0, 100.0)
}

/// Threshold check applied to each capture while a run is gated.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGate {
    pub threshold_percent: f64,
}

impl SimilarityGate {
    pub fn new(threshold_percent: f64) -> Self {
        Self { threshold_percent }
    }

    pub fn passes(&self, score: f64) -> bool {
        score >= self.threshold_percent
    }

    /// Score a capture and decide in one go.
    pub fn evaluate(&self, reference: &RgbaImage, current: &RgbaImage) -> (f64, bool) {
        let score = similarity(Some(reference), Some(current));
        (score, self.passes(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
    }

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90, 255]))
    }

    #[test]
    fn identical_images_score_100() {
        let img = gradient(40, 30);
        assert_eq!(similarity(Some(&img), Some(&img)), 100.0);
    }

    #[test]
    fn missing_image_scores_zero() {
        let img = solid(10, 10, 5);
        assert_eq!(similarity(None, Some(&img)), 0.0);
        assert_eq!(similarity(Some(&img), None), 0.0);
        assert_eq!(similarity(Some(&RgbaImage::new(0, 0)), Some(&img)), 0.0);
    }

    #[test]
    fn opposite_extremes_score_zero() {
        assert_eq!(similarity(Some(&solid(8, 8, 0)), Some(&solid(8, 8, 255))), 0.0);
    }

    #[test]
    fn size_drift_alone_is_neutral() {
        let reference = solid(20, 20, 140);
        let bigger = solid(40, 40, 140);
        let smaller = solid(7, 9, 140);
        assert_eq!(similarity(Some(&reference), Some(&bigger)), 100.0);
        assert_eq!(similarity(Some(&reference), Some(&smaller)), 100.0);
        assert_eq!(similarity(Some(&bigger), Some(&reference)), 100.0);
    }

    #[test]
    fn score_decreases_as_difference_grows() {
        let reference = solid(16, 16, 0);
        let mut last = f64::INFINITY;
        for delta in [0u8, 10, 40, 100, 200, 255] {
            let score = similarity(Some(&reference), Some(&solid(16, 16, delta)));
            assert!(score < last, "delta {} scored {}", delta, score);
            last = score;
        }
    }

    #[test]
    fn alpha_channel_is_ignored() {
        let a = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        let b = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0]));
        assert_eq!(similarity(Some(&a), Some(&b)), 100.0);
    }

    #[test]
    fn gate_at_100_rejects_any_difference() {
        let gate = SimilarityGate::new(100.0);
        let (score, pass) = gate.evaluate(&solid(10, 10, 100), &solid(10, 10, 101));
        assert!(score < 100.0);
        assert!(!pass);

        let (_, pass) = gate.evaluate(&solid(10, 10, 100), &solid(10, 10, 100));
        assert!(pass);
    }
}
