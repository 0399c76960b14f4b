//! Sprite extraction from captured footage: crop, pixelation cleanup, and
//! background isolation via connected-component analysis.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::{
    distance_transform::Norm,
    morphology::{dilate, erode},
    region_labelling::{Connectivity, connected_components},
};

use crate::{
    error::{SpriteweaveError, SpriteweaveResult},
    sequence,
};

/// Loads the frames of a captured sequence: files under `folder` named
/// `{prefix}` + 1-3 decimal digits + `.png`, sorted ascending. An empty
/// match list is not an error by itself; downstream operations reject empty
/// input.
pub fn load_sequence(folder: &Path, prefix: &str) -> SpriteweaveResult<Vec<RgbImage>> {
    sequence::load_numbered(folder, prefix)
}

/// Crops every frame to the fixed rectangle `[y, y+height) x [x, x+width)`,
/// clamped to the frame bounds.
pub fn crop(
    frames: &[RgbImage],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> SpriteweaveResult<Vec<RgbImage>> {
    require_frames(frames, "crop")?;
    Ok(frames
        .iter()
        .map(|frame| imageops::crop_imm(frame, x, y, width, height).to_image())
        .collect())
}

/// Undoes block-resampling artifacts from upstream capture.
///
/// `pixel_ref` is the top-left corner of one true sprite pixel in the
/// capture; each edge is trimmed by its pixel distance from `pixel_ref`
/// modulo `block_size`, so the remaining dimensions are exact multiples of
/// `block_size`. Each block then averages to one output pixel, truncating
/// the per-channel mean to an integer.
pub fn clean_pixelation(
    frames: &[RgbImage],
    pixel_ref: (u32, u32),
    block_size: u32,
) -> SpriteweaveResult<Vec<RgbImage>> {
    require_frames(frames, "clean_pixelation")?;
    if block_size == 0 {
        return Err(SpriteweaveError::invalid_argument(
            "block size must be >= 1",
        ));
    }

    frames
        .iter()
        .map(|frame| clean_frame(frame, pixel_ref, block_size))
        .collect()
}

/// Isolates the sprite in every frame against a black background.
///
/// A pixel is foreground when any channel lies outside
/// `background +/- tolerance` (per channel, saturating). The mask is
/// cleaned with dilate-erode-dilate (5x5 structuring element) and its
/// 8-connected components are ranked by pixel count. The largest component
/// is kept; `prefer_second_largest` keeps the second largest instead, for
/// captures where residual background forms the dominant blob. Pixels
/// outside the selected region, and pixels inside it that still match the
/// background key, are zeroed.
#[tracing::instrument(skip(frames, background))]
pub fn isolate(
    frames: &[RgbImage],
    background: &RgbImage,
    tolerance: u8,
    prefer_second_largest: bool,
) -> SpriteweaveResult<Vec<RgbImage>> {
    require_frames(frames, "isolate")?;

    frames
        .iter()
        .map(|frame| isolate_frame(frame, background, tolerance, prefer_second_largest))
        .collect()
}

/// Writes the sequence as zero-padded numbered PNG files, creating
/// `out_dir` if absent.
pub fn save_sequence(
    frames: &[RgbImage],
    out_dir: &Path,
    prefix: &str,
) -> SpriteweaveResult<()> {
    require_frames(frames, "save_sequence")?;
    sequence::save_numbered(frames, out_dir, prefix)
}

fn require_frames(frames: &[RgbImage], operation: &str) -> SpriteweaveResult<()> {
    if frames.is_empty() {
        return Err(SpriteweaveError::empty_input(format!(
            "{operation} requires at least one frame"
        )));
    }
    Ok(())
}

fn clean_frame(
    frame: &RgbImage,
    pixel_ref: (u32, u32),
    block_size: u32,
) -> SpriteweaveResult<RgbImage> {
    let (w, h) = frame.dimensions();
    let (ref_x, ref_y) = pixel_ref;
    if ref_x >= w || ref_y >= h {
        return Err(SpriteweaveError::invalid_argument(format!(
            "pixel reference ({ref_x}, {ref_y}) outside {w}x{h} frame"
        )));
    }

    // Per-edge remainder of the distance to the reference point; trimming it
    // aligns the frame to the capture's block grid.
    let cut_left = ref_x % block_size;
    let cut_top = ref_y % block_size;
    let cut_right = (w - ref_x) % block_size;
    let cut_bottom = (h - ref_y) % block_size;

    let new_w = w - cut_left - cut_right;
    let new_h = h - cut_top - cut_bottom;
    if new_w < block_size || new_h < block_size {
        return Err(SpriteweaveError::invalid_argument(format!(
            "frame {w}x{h} too small for block size {block_size}"
        )));
    }

    let out_w = new_w / block_size;
    let out_h = new_h / block_size;
    let area = block_size * block_size;

    let mut out = RgbImage::new(out_w, out_h);
    for out_y in 0..out_h {
        for out_x in 0..out_w {
            let mut sums = [0u32; 3];
            for dy in 0..block_size {
                for dx in 0..block_size {
                    let px = frame.get_pixel(
                        cut_left + out_x * block_size + dx,
                        cut_top + out_y * block_size + dy,
                    );
                    for c in 0..3 {
                        sums[c] += u32::from(px[c]);
                    }
                }
            }
            out.put_pixel(
                out_x,
                out_y,
                Rgb([
                    (sums[0] / area) as u8,
                    (sums[1] / area) as u8,
                    (sums[2] / area) as u8,
                ]),
            );
        }
    }
    Ok(out)
}

fn isolate_frame(
    frame: &RgbImage,
    background: &RgbImage,
    tolerance: u8,
    prefer_second_largest: bool,
) -> SpriteweaveResult<RgbImage> {
    if frame.dimensions() != background.dimensions() {
        return Err(SpriteweaveError::invalid_argument(format!(
            "background reference {:?} does not match frame {:?}",
            background.dimensions(),
            frame.dimensions()
        )));
    }

    let raw_mask = chroma_mask(frame, background, tolerance);

    // One dilation, one erosion, one more dilation with a 5x5 structuring
    // element suppresses speckle noise while preserving the main blob.
    let cleaned = dilate(
        &erode(&dilate(&raw_mask, Norm::LInf, 2), Norm::LInf, 2),
        Norm::LInf,
        2,
    );

    let labels = connected_components(&cleaned, Connectivity::Eight, Luma([0u8]));
    let selected = select_region(&labels, prefer_second_largest)?;

    let (w, h) = frame.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if labels.get_pixel(x, y)[0] == selected && raw_mask.get_pixel(x, y)[0] != 0 {
                out.put_pixel(x, y, *frame.get_pixel(x, y));
            }
        }
    }
    Ok(out)
}

/// Foreground mask: 255 where any channel of `frame` lies outside
/// `background ± tolerance` for the corresponding background pixel.
fn chroma_mask(frame: &RgbImage, background: &RgbImage, tolerance: u8) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let px = frame.get_pixel(x, y);
        let bg = background.get_pixel(x, y);
        let foreground = (0..3).any(|c| {
            px[c] < bg[c].saturating_sub(tolerance) || px[c] > bg[c].saturating_add(tolerance)
        });
        Luma([if foreground { 255 } else { 0 }])
    })
}

/// Picks the connected-component label with the largest pixel count, or the
/// second largest when `prefer_second_largest` is set. Label 0 (background)
/// is never a candidate.
fn select_region(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    prefer_second_largest: bool,
) -> SpriteweaveResult<u32> {
    let mut counts: std::collections::BTreeMap<u32, u64> = std::collections::BTreeMap::new();
    for px in labels.pixels() {
        if px[0] != 0 {
            *counts.entry(px[0]).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(u32, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let rank = usize::from(prefer_second_largest);
    ranked.get(rank).map(|&(label, _)| label).ok_or_else(|| {
        SpriteweaveError::no_region_found(format!(
            "mask has {} region(s), need at least {}",
            ranked.len(),
            rank + 1
        ))
    })
}

/// A declarative extraction pipeline: load, then the enabled stages in
/// order (crop, clean, isolate), then save.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtractJob {
    pub input_dir: PathBuf,
    pub input_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate: Option<IsolateSpec>,
    pub output_dir: PathBuf,
    pub output_prefix: String,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CleanSpec {
    /// Top-left corner of one true sprite pixel, relative to the (possibly
    /// cropped) frame.
    pub pixel_ref: (u32, u32),
    pub block_size: u32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IsolateSpec {
    /// Image of the scene without the sprite.
    pub background: PathBuf,
    pub tolerance: u8,
    #[serde(default)]
    pub prefer_second_largest: bool,
}

impl ExtractJob {
    pub fn validate(&self) -> SpriteweaveResult<()> {
        if let Some(crop) = &self.crop
            && (crop.width == 0 || crop.height == 0)
        {
            return Err(SpriteweaveError::invalid_argument(
                "crop width/height must be > 0",
            ));
        }
        if let Some(clean) = &self.clean
            && clean.block_size == 0
        {
            return Err(SpriteweaveError::invalid_argument(
                "clean block size must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Runs an extraction job end to end and returns the number of frames
/// written.
#[tracing::instrument(skip(job), fields(input = %job.input_dir.display()))]
pub fn run_job(job: &ExtractJob) -> SpriteweaveResult<usize> {
    job.validate()?;

    let mut frames = load_sequence(&job.input_dir, &job.input_prefix)?;
    if frames.is_empty() {
        return Err(SpriteweaveError::empty_input(format!(
            "no frames matching '{}' in '{}'",
            job.input_prefix,
            job.input_dir.display()
        )));
    }

    if let Some(rect) = &job.crop {
        frames = crop(&frames, rect.x, rect.y, rect.width, rect.height)?;
    }
    if let Some(clean) = &job.clean {
        frames = clean_pixelation(&frames, clean.pixel_ref, clean.block_size)?;
    }
    if let Some(spec) = &job.isolate {
        let background = image::open(&spec.background)
            .map_err(|err| {
                SpriteweaveError::not_found(format!(
                    "unreadable background reference '{}': {err}",
                    spec.background.display()
                ))
            })?
            .to_rgb8();
        frames = isolate(&frames, &background, spec.tolerance, spec.prefer_second_largest)?;
    }

    save_sequence(&frames, &job.output_dir, &job.output_prefix)?;
    Ok(frames.len())
}
