use rayon::prelude::*;

use super::frame::Frame;
use crate::shared::constants;

/// Sampled pixels above which rows are summed on the rayon pool
const PARALLEL_SAMPLE_THRESHOLD: usize = 4096;

/// Average brightness of a frame in [0, 1], sampling every
/// `constants::SAMPLE_STRIDE`th row and column.
///
/// A missing or zero-sized frame yields 0.0, which downstream code treats as
/// "no signal".
pub fn extract_brightness<F: Frame + ?Sized>(frame: Option<&F>) -> f64 {
    brightness_with_stride(frame, constants::SAMPLE_STRIDE)
}

fn brightness_with_stride<F: Frame + ?Sized>(frame: Option<&F>, stride: usize) -> f64 {
    let Some(frame) = frame else {
        return 0.0;
    };

    let stride = stride.max(1);
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let rows: Vec<usize> = (0..height).step_by(stride).collect();
    let samples_per_row = width.div_ceil(stride);

    // Per-row partial sums are collected in order and folded sequentially so
    // the result does not depend on how rayon splits the work.
    let row_totals: Vec<(f64, usize)> = if rows.len() * samples_per_row >= PARALLEL_SAMPLE_THRESHOLD {
        rows.par_iter()
            .map(|&y| sample_row(frame, y, width, stride))
            .collect()
    } else {
        rows.iter()
            .map(|&y| sample_row(frame, y, width, stride))
            .collect()
    };

    let (sum, count) = row_totals
        .iter()
        .fold((0.0, 0usize), |(sum, count), (row_sum, row_count)| {
            (sum + row_sum, count + row_count)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn sample_row<F: Frame + ?Sized>(frame: &F, y: usize, width: usize, stride: usize) -> (f64, usize) {
    (0..width)
        .step_by(stride)
        .filter_map(|x| frame.rgba(x, y))
        .fold((0.0, 0usize), |(sum, count), px| (sum + pixel_brightness(px), count + 1))
}

/// Mean of the normalized red, green and blue channels. Alpha is ignored.
fn pixel_brightness(px: [u8; 4]) -> f64 {
    let r = px[0] as f64 / 255.0;
    let g = px[1] as f64 / 255.0;
    let b = px[2] as f64 / 255.0;
    (r + g + b) / 3.0
}
