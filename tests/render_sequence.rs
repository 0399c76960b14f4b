use std::sync::Arc;

use image::{Rgb, RgbImage};

use spriteweave::{Compositor, FrameElement, Placement, SpriteweaveError};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "spriteweave_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Arc<RgbImage> {
    Arc::new(RgbImage::from_pixel(w, h, Rgb(rgb)))
}

#[test]
fn render_numbers_files_with_padded_indices() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let out = temp_dir("render_numbering");
    let mut comp = Compositor::new();
    comp.add(solid(4, 4, [80, 90, 100]), Placement::default())
        .unwrap();
    comp.commit(150).unwrap();
    comp.render(&out, "anim_").unwrap();

    for index in 0..150 {
        let path = out.join(format!("anim_{index:03}.png"));
        assert!(path.exists(), "missing {}", path.display());
    }
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 150);

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn render_composites_layers_over_white_canvas() {
    let out = temp_dir("render_layers");
    let mut comp = Compositor::new();

    // Bottom layer fixes an 8x8 canvas; the black sprite is keyed out by
    // the default alpha key, so the white canvas shows through around the
    // red top layer.
    comp.add(solid(8, 8, [0, 0, 0]), Placement::default())
        .unwrap();
    comp.add(
        solid(2, 2, [200, 0, 0]),
        Placement {
            position: (3, 3),
            ..Placement::default()
        },
    )
    .unwrap();
    comp.commit(1).unwrap();
    comp.render(&out, "frame_").unwrap();

    let frame = image::open(out.join("frame_0.png")).unwrap().to_rgb8();
    assert_eq!(frame.dimensions(), (8, 8));
    assert_eq!(*frame.get_pixel(0, 0), Rgb([255, 255, 255]));
    assert_eq!(*frame.get_pixel(3, 3), Rgb([200, 0, 0]));
    assert_eq!(*frame.get_pixel(4, 4), Rgb([200, 0, 0]));
    assert_eq!(*frame.get_pixel(5, 5), Rgb([255, 255, 255]));

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn render_clips_sprites_to_first_frame_canvas() {
    let out = temp_dir("render_clip");
    let mut comp = Compositor::new();

    comp.add(solid(4, 4, [10, 20, 30]), Placement::default())
        .unwrap();
    comp.commit(1).unwrap();

    // Second frame: a larger sprite and a fully off-canvas one. The canvas
    // stays 4x4; the big sprite is clipped, the off-canvas one ignored.
    comp.add(solid(9, 9, [60, 70, 80]), Placement::default())
        .unwrap();
    comp.add(
        solid(2, 2, [1, 2, 3]),
        Placement {
            position: (40, 40),
            ..Placement::default()
        },
    )
    .unwrap();
    comp.commit(1).unwrap();
    comp.render(&out, "frame_").unwrap();

    let second = image::open(out.join("frame_1.png")).unwrap().to_rgb8();
    assert_eq!(second.dimensions(), (4, 4));
    assert!(second.pixels().all(|px| *px == Rgb([60, 70, 80])));

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn render_applies_partial_alpha_over_white() {
    let out = temp_dir("render_alpha");
    let mut comp = Compositor::new();

    comp.add(
        solid(2, 2, [0, 0, 100]),
        Placement {
            alpha: 0.5,
            ..Placement::default()
        },
    )
    .unwrap();
    comp.commit(1).unwrap();
    comp.render(&out, "frame_").unwrap();

    // Over an opaque white canvas: c = 0.502 * c_s + 0.498 * 255.
    let frame = image::open(out.join("frame_0.png")).unwrap().to_rgb8();
    let px = frame.get_pixel(0, 0);
    assert!(px[0] >= 126 && px[0] <= 128, "got {:?}", px);
    assert!(px[2] >= 176 && px[2] <= 178, "got {:?}", px);

    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn render_without_committed_frames_is_empty_input() {
    let comp = Compositor::new();
    let err = comp.render(&temp_dir("render_none"), "frame_").unwrap_err();
    assert!(matches!(err, SpriteweaveError::EmptyInput(_)));
}

#[test]
fn render_with_empty_first_frame_is_empty_frame() {
    let out = temp_dir("render_empty_frame");
    let mut comp = Compositor::new();
    comp.commit(1).unwrap();

    let err = comp.render(&out, "frame_").unwrap_err();
    assert!(matches!(err, SpriteweaveError::EmptyFrame(_)));
    assert!(!out.exists(), "no output may be written on failure");
}

#[test]
fn element_cursor_drives_looping_animation() {
    let frames: Vec<RgbImage> = (0..3)
        .map(|i| RgbImage::from_pixel(4, 4, Rgb([i * 50 + 50, 0, 0])))
        .collect();
    let mut cat = FrameElement::new();
    cat.add_event_frames("walking", frames);

    let out = temp_dir("render_loop");
    let mut comp = Compositor::new();
    for _ in 0..6 {
        let index = cat.advance_cursor("walking", 0).unwrap();
        comp.add(cat.sprite_at("walking", index).unwrap(), Placement::default())
            .unwrap();
        comp.commit(1).unwrap();
    }
    comp.render(&out, "walk_").unwrap();

    // Cursor cadence 0, 1, 2, -1, 0, 1 maps to sprites 0, 1, 2, 2, 0, 1.
    let expected = [50u8, 100, 150, 150, 50, 100];
    for (index, value) in expected.iter().enumerate() {
        let frame = image::open(out.join(format!("walk_{index}.png")))
            .unwrap()
            .to_rgb8();
        assert_eq!(frame.get_pixel(0, 0)[0], *value, "frame {index}");
    }

    std::fs::remove_dir_all(&out).ok();
}
