//! Loading and saving of ordered sprite image sequences.
//!
//! On disk a sequence is a directory of 3-channel PNG files whose
//! lexicographic file order is the playback order. Numbered sequences use
//! `{prefix}{index}.png` names where the index is zero-padded to the decimal
//! digit count of the total frame count.

use std::path::Path;

use anyhow::Context as _;
use image::RgbImage;

use crate::error::{SpriteweaveError, SpriteweaveResult};

/// Zero-pad width for a sequence of `count` frames: 150 frames get 3-digit
/// indices `000`..`149`.
pub fn index_width(count: usize) -> usize {
    count.to_string().len()
}

/// True if `name` is `{prefix}` followed by 1-3 decimal digits and `.png`.
pub fn matches_numbered_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name.strip_prefix(prefix) else {
        return false;
    };
    let Some(digits) = rest.strip_suffix(".png") else {
        return false;
    };
    (1..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Lists `dir`, sorts file names ascending, decodes every entry that is a
/// readable image. Entries that fail to decode are skipped.
pub fn load_dir_sorted(dir: &Path) -> SpriteweaveResult<Vec<RgbImage>> {
    let names = sorted_file_names(dir)?;

    let mut frames = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(name);
        match image::open(&path) {
            Ok(img) => frames.push(img.to_rgb8()),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable file");
            }
        }
    }
    Ok(frames)
}

/// Loads the frames of a numbered sequence (`{prefix}\d{1,3}.png`), sorted
/// ascending by file name. An empty match list is not an error; a matched
/// file that fails to decode is.
pub fn load_numbered(dir: &Path, prefix: &str) -> SpriteweaveResult<Vec<RgbImage>> {
    let mut names = sorted_file_names(dir)?;
    names.retain(|name| matches_numbered_name(name, prefix));

    let mut frames = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(name);
        let img = image::open(&path).map_err(|err| {
            SpriteweaveError::not_found(format!("unreadable frame '{}': {err}", path.display()))
        })?;
        frames.push(img.to_rgb8());
    }
    Ok(frames)
}

/// Writes `frames` as `{prefix}{index}.png` under `dir`, creating the
/// directory if absent.
pub fn save_numbered(frames: &[RgbImage], dir: &Path, prefix: &str) -> SpriteweaveResult<()> {
    if frames.is_empty() {
        return Err(SpriteweaveError::empty_input(
            "save_numbered requires at least one frame",
        ));
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;

    let width = index_width(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("{prefix}{index:0width$}.png"));
        frame
            .save(&path)
            .with_context(|| format!("failed to write frame '{}'", path.display()))?;
    }
    Ok(())
}

fn sorted_file_names(dir: &Path) -> SpriteweaveResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        SpriteweaveError::not_found(format!("unreadable directory '{}': {err}", dir.display()))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            SpriteweaveError::not_found(format!(
                "unreadable entry in '{}': {err}",
                dir.display()
            ))
        })?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_width_matches_digit_count_of_total() {
        assert_eq!(index_width(1), 1);
        assert_eq!(index_width(9), 1);
        assert_eq!(index_width(10), 2);
        assert_eq!(index_width(150), 3);
    }

    #[test]
    fn numbered_name_pattern() {
        assert!(matches_numbered_name("Cat_0.png", "Cat_"));
        assert!(matches_numbered_name("Cat_000.png", "Cat_"));
        assert!(matches_numbered_name("Cat_999.png", "Cat_"));
        assert!(!matches_numbered_name("Cat_1000.png", "Cat_"));
        assert!(!matches_numbered_name("Cat_.png", "Cat_"));
        assert!(!matches_numbered_name("Cat_01.jpg", "Cat_"));
        assert!(!matches_numbered_name("Dog_01.png", "Cat_"));
        assert!(!matches_numbered_name("Cat_x1.png", "Cat_"));
    }

    #[test]
    fn load_numbered_missing_dir_is_not_found() {
        let err = load_numbered(Path::new("/nonexistent/spriteweave"), "Cat_").unwrap_err();
        assert!(matches!(
            err,
            crate::error::SpriteweaveError::NotFound(_)
        ));
    }

    #[test]
    fn save_numbered_rejects_empty_input() {
        let err = save_numbered(&[], Path::new("."), "x_").unwrap_err();
        assert!(matches!(
            err,
            crate::error::SpriteweaveError::EmptyInput(_)
        ));
    }
}
