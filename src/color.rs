//! Background colour matching: statistical colour transfer between two images
//! and an equivalent engine `setTransform` filter.

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-6;
const TRANSFORM_SUFFIX: &str = "-target=bg-main -duration=0 -next;";

/// Interpolation method used when resizing the reference image onto the
/// source image's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeInterpolation {
    /// Fast nearest-neighbor interpolation.
    Nearest,
    /// Bilinear interpolation (`image`'s `Triangle` filter).
    Bilinear,
    /// Bicubic interpolation (`image`'s `CatmullRom` filter).
    #[default]
    Bicubic,
    /// Lanczos (windowed sinc) interpolation.
    Lanczos3,
}

impl From<ResizeInterpolation> for FilterType {
    fn from(value: ResizeInterpolation) -> Self {
        match value {
            ResizeInterpolation::Nearest => FilterType::Nearest,
            ResizeInterpolation::Bilinear => FilterType::Triangle,
            ResizeInterpolation::Bicubic => FilterType::CatmullRom,
            ResizeInterpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

// ─── Statistics ───────────────────────────────────────────────────────────────

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let (sum, count) = values.clone().fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    (mean, variance.sqrt())
}

fn channel(image: &RgbImage, index: usize) -> impl Iterator<Item = f64> + Clone + '_ {
    image.as_raw().iter().skip(index).step_by(3).map(|value| f64::from(*value))
}

fn all_channels(image: &RgbImage) -> impl Iterator<Item = f64> + Clone + '_ {
    image.as_raw().iter().map(|value| f64::from(*value) / 255.0)
}

fn mean_saturation(image: &RgbImage) -> f64 {
    let count = image.width() as usize * image.height() as usize;
    if count == 0 {
        return 0.0;
    }
    let total: f64 = image
        .pixels()
        .map(|pixel| {
            let [r, g, b] = pixel.0.map(|v| f64::from(v) / 255.0);
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            (max - min) / (max + EPSILON)
        })
        .sum();
    total / count as f64
}

fn estimate_gamma(image: &RgbImage) -> f64 {
    let (mean, _) = mean_std(all_channels(image).map(|v| v.clamp(EPSILON, 1.0)));
    mean.ln() / 0.5f64.ln()
}

fn ratio_or_one(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() > EPSILON {
        numerator / denominator
    } else {
        1.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ─── Colour transfer ──────────────────────────────────────────────────────────

/// Shift each RGB channel of `source` to the mean and standard deviation of
/// the same channel in `target`.
pub fn match_color(source: &RgbImage, target: &RgbImage) -> RgbImage {
    let stats: Vec<((f64, f64), (f64, f64))> = (0..3)
        .map(|c| {
            let (src_mean, src_std) = mean_std(channel(source, c));
            (
                (src_mean, src_std.max(EPSILON)),
                mean_std(channel(target, c)),
            )
        })
        .collect();

    let mut matched = source.clone();
    for pixel in matched.pixels_mut() {
        for (c, ((src_mean, src_std), (tgt_mean, tgt_std))) in stats.iter().enumerate() {
            let value = (f64::from(pixel.0[c]) - src_mean) / src_std * tgt_std + tgt_mean;
            pixel.0[c] = value.clamp(0.0, 255.0) as u8;
        }
    }
    matched
}

/// Filter parameters approximating the colour shift from `source` to
/// `target`, in the engine's `setTransform` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTransform {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub gamma: f64,
    pub color_red: i64,
    pub color_green: i64,
    pub color_blue: i64,
}

pub fn extract_transform(source: &RgbImage, target: &RgbImage) -> ColorTransform {
    let (src_lum, src_contrast) = mean_std(all_channels(source));
    let (tgt_lum, tgt_contrast) = mean_std(all_channels(target));

    let brightness = ratio_or_one(tgt_lum, src_lum);
    let contrast = ratio_or_one(tgt_contrast, src_contrast).powf(0.6);
    let saturation = ratio_or_one(mean_saturation(target), mean_saturation(source)).clamp(0.0, 2.0);
    let gamma_ratio = ratio_or_one(estimate_gamma(target), estimate_gamma(source));
    let gamma = if gamma_ratio > 0.0 {
        (1.0 / gamma_ratio).sqrt().clamp(0.5, 2.0)
    } else {
        1.0
    };

    let shift = |c: usize| {
        let (src_mean, _) = mean_std(channel(source, c));
        let (tgt_mean, _) = mean_std(channel(target, c));
        // Values above 255 are accepted by the engine.
        (255.0 - (src_mean - tgt_mean)).trunc() as i64
    };

    ColorTransform {
        brightness: round2(brightness),
        contrast: round2(contrast),
        saturation: round2(saturation),
        gamma: round2(gamma),
        color_red: shift(0),
        color_green: shift(1),
        color_blue: shift(2),
    }
}

/// Full `setTransform` command for the background.
pub fn format_transform_code(transform: &ColorTransform) -> Result<String> {
    let json = serde_json::to_string(transform).context("failed to serialize colour transform")?;
    Ok(format!("setTransform:{json} {TRANSFORM_SUFFIX}"))
}

/// `setTransform` command carrying only the RGB channel values, which are
/// the most stable part of the estimate.
pub fn format_rgb_code(transform: &ColorTransform) -> String {
    format!(
        "setTransform:{{\"colorRed\":{},\"colorGreen\":{},\"colorBlue\":{}}} {TRANSFORM_SUFFIX}",
        transform.color_red, transform.color_green, transform.color_blue
    )
}

/// Match `source_path` to `target_path`, write the result to `output_path`
/// and return the equivalent transform.
pub fn match_color_files(
    source_path: &Path,
    target_path: &Path,
    output_path: &Path,
    interpolation: ResizeInterpolation,
) -> Result<ColorTransform> {
    let source = image::open(source_path)
        .with_context(|| format!("failed to open source image: {}", source_path.display()))?
        .to_rgb8();
    let target = image::open(target_path)
        .with_context(|| format!("failed to open reference image: {}", target_path.display()))?;
    let target = target
        .resize_exact(source.width(), source.height(), interpolation.into())
        .to_rgb8();

    let matched = match_color(&source, &target);
    DynamicImage::ImageRgb8(matched)
        .save(output_path)
        .with_context(|| format!("failed to save matched image: {}", output_path.display()))?;

    Ok(extract_transform(&source, &target))
}
