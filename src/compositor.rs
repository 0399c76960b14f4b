//! The frame compositing engine: accumulate draw instructions, commit
//! frames, render the committed sequence to numbered PNG files.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use rayon::prelude::*;

use crate::{
    composite,
    error::{SpriteweaveError, SpriteweaveResult},
    sequence, transform,
};

/// Where and how a sprite is placed in a frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Canvas-space position of the sprite's top-left corner. May be
    /// negative; out-of-bounds regions are clipped at render time.
    pub position: (i32, i32),
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    /// Rotation in degrees, positive = counter-clockwise.
    pub rotation_deg: f64,
    /// Integer block-replication factor, >= 1.
    pub scale: u32,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: (0, 0),
            alpha: 1.0,
            rotation_deg: 0.0,
            scale: 1,
            flip_h: false,
            flip_v: false,
        }
    }
}

impl Placement {
    pub fn validate(&self) -> SpriteweaveResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SpriteweaveError::invalid_argument(format!(
                "alpha {} outside [0, 1]",
                self.alpha
            )));
        }
        if self.scale < 1 {
            return Err(SpriteweaveError::invalid_argument(format!(
                "scale {} must be >= 1",
                self.scale
            )));
        }
        Ok(())
    }
}

/// One sprite placed in a frame. Instructions share sprite pixel data by
/// reference; the committed sequence owns independent instruction lists.
#[derive(Clone, Debug)]
pub struct DrawInstruction {
    pub image: Arc<RgbImage>,
    pub placement: Placement,
}

/// Accumulates draw instructions into frames and renders the committed
/// frame sequence as a numbered PNG image sequence.
///
/// The first instruction of the first committed frame is the bottom layer
/// and fixes the canvas dimensions for every frame of a render call.
#[derive(Clone, Debug, Default)]
pub struct Compositor {
    alpha_key: u8,
    pending: Vec<DrawInstruction>,
    frames: Vec<Vec<DrawInstruction>>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chroma-key channel value: sprite pixels whose channels all
    /// equal `key` are treated as fully transparent when deriving the alpha
    /// mask. Independent per instance, so concurrent renders can use
    /// different keys.
    pub fn set_alpha_key(&mut self, key: u8) {
        self.alpha_key = key;
    }

    pub fn alpha_key(&self) -> u8 {
        self.alpha_key
    }

    /// Appends a draw instruction to the current pending frame. Later
    /// instructions paint over earlier ones.
    pub fn add(&mut self, image: Arc<RgbImage>, placement: Placement) -> SpriteweaveResult<()> {
        placement.validate()?;
        self.pending.push(DrawInstruction { image, placement });
        Ok(())
    }

    /// Commits the pending instruction list as `repeat` identical frames
    /// (holding a pose across several output frames), then clears the
    /// pending list. The copies are independent of the pending buffer.
    pub fn commit(&mut self, repeat: u32) -> SpriteweaveResult<()> {
        if repeat < 1 {
            return Err(SpriteweaveError::invalid_argument(
                "commit repeat count must be >= 1",
            ));
        }
        for _ in 0..repeat {
            self.frames.push(self.pending.clone());
        }
        self.pending.clear();
        Ok(())
    }

    pub fn committed_frames(&self) -> usize {
        self.frames.len()
    }

    /// Composites every committed frame, in order, and writes
    /// `{prefix}{index}.png` files under `out_dir` (created if absent).
    /// Indices are zero-padded to the digit count of the total frame count.
    ///
    /// Frames are composited in parallel; a frame is either fully
    /// composited and written, or not written at all.
    #[tracing::instrument(skip(self))]
    pub fn render(&self, out_dir: &Path, prefix: &str) -> SpriteweaveResult<()> {
        if self.frames.is_empty() {
            return Err(SpriteweaveError::empty_input(
                "render requires at least one committed frame",
            ));
        }
        if let Some(index) = self.frames.iter().position(Vec::is_empty) {
            return Err(SpriteweaveError::empty_frame(format!(
                "committed frame {index} has no draw instructions"
            )));
        }

        let (canvas_w, canvas_h) = transformed_dims(&self.frames[0][0]);

        let composed: SpriteweaveResult<Vec<RgbaImage>> = self
            .frames
            .par_iter()
            .map(|instructions| compose_frame(instructions, canvas_w, canvas_h, self.alpha_key))
            .collect();

        let flattened: Vec<RgbImage> = composed?
            .into_iter()
            .map(|canvas| DynamicImage::ImageRgba8(canvas).into_rgb8())
            .collect();
        sequence::save_numbered(&flattened, out_dir, prefix)
    }
}

/// Post-transform dimensions of an instruction's sprite: flips preserve
/// dimensions, scale multiplies them, rotation expands to the rotated
/// bounding box.
fn transformed_dims(instruction: &DrawInstruction) -> (u32, u32) {
    let (w, h) = instruction.image.dimensions();
    let scale = instruction.placement.scale;
    transform::rotated_dims(w * scale, h * scale, instruction.placement.rotation_deg)
}

fn compose_frame(
    instructions: &[DrawInstruction],
    canvas_w: u32,
    canvas_h: u32,
    alpha_key: u8,
) -> SpriteweaveResult<RgbaImage> {
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([255, 255, 255, 255]));

    for instruction in instructions {
        let placement = instruction.placement;
        let flipped = transform::flip(&instruction.image, placement.flip_h, placement.flip_v);
        let scaled = transform::scale(&flipped, placement.scale);
        let (rotated, position) =
            transform::rotate(&scaled, placement.rotation_deg, placement.position);
        let sprite = transform::apply_alpha(&rotated, placement.alpha, alpha_key);
        composite::layer(&mut canvas, &sprite, position);
    }
    Ok(canvas)
}
