//! Named sprite collections for one animated entity.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use image::RgbImage;

use crate::{
    error::{SpriteweaveError, SpriteweaveResult},
    sequence,
};

/// A collection of related sprites, subdivided into named events
/// ("walking", "jumping", ...). Each event holds an ordered sprite sequence;
/// a shared playback cursor walks one sequence at a time for looping
/// animations.
#[derive(Clone, Debug)]
pub struct FrameElement {
    events: BTreeMap<String, Vec<Arc<RgbImage>>>,
    cursor: isize,
}

impl Default for FrameElement {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameElement {
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            cursor: -1,
        }
    }

    /// Loads the images under `dir` (lexicographic file order is playback
    /// order) and stores them as the sprite sequence for `name`.
    pub fn add_event(&mut self, name: impl Into<String>, dir: &Path) -> SpriteweaveResult<()> {
        let frames = sequence::load_dir_sorted(dir)?;
        if frames.is_empty() {
            return Err(SpriteweaveError::not_found(format!(
                "no loadable images in '{}'",
                dir.display()
            )));
        }
        self.add_event_frames(name, frames);
        Ok(())
    }

    /// Stores an already-decoded sprite sequence for `name`. The caller
    /// guarantees the frames are in playback order.
    pub fn add_event_frames(&mut self, name: impl Into<String>, frames: Vec<RgbImage>) {
        self.events
            .insert(name.into(), frames.into_iter().map(Arc::new).collect());
    }

    /// Advances the playback cursor within `event` and returns its new
    /// value, to be used as a sprite index.
    ///
    /// The cursor is a small state machine over `[-1, N-1]`:
    /// `advance(start) = if state + start < N-1 then state + start + 1
    /// else -1`. The net effect walks the sequence once from index 0 to
    /// N-1 and then restarts; the `-1` rest state addresses the last
    /// sprite until the next advance.
    pub fn advance_cursor(&mut self, event: &str, start_index: usize) -> SpriteweaveResult<isize> {
        let len = self.sequence(event)?.len();
        if len == 0 {
            return Err(SpriteweaveError::empty_input(format!(
                "event '{event}' has an empty sprite sequence"
            )));
        }

        self.cursor += start_index as isize;
        if self.cursor < len as isize - 1 {
            self.cursor += 1;
        } else {
            self.cursor = -1;
        }
        Ok(self.cursor)
    }

    /// Fetches a sprite by index. A negative index addresses from the end
    /// of the sequence, so the cursor's `-1` rest state selects the last
    /// sprite.
    pub fn sprite_at(&self, event: &str, index: isize) -> SpriteweaveResult<Arc<RgbImage>> {
        let seq = self.sequence(event)?;
        let len = seq.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return Err(SpriteweaveError::invalid_argument(format!(
                "sprite index {index} out of range for event '{event}' of length {len}"
            )));
        }
        Ok(Arc::clone(&seq[resolved as usize]))
    }

    pub fn event_len(&self, event: &str) -> SpriteweaveResult<usize> {
        Ok(self.sequence(event)?.len())
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    fn sequence(&self, event: &str) -> SpriteweaveResult<&Vec<Arc<RgbImage>>> {
        self.events.get(event).ok_or_else(|| {
            SpriteweaveError::not_found(format!("unknown event '{event}'"))
        })
    }
}
