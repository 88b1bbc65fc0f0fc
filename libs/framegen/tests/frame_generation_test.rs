//! End-to-end frame generation on a real GPU thread with the software
//! backend.

use std::sync::Arc;

use framegen::core::rhi::{TextureUnit, WrapMode, cv_return};
use framegen::software::{SoftwareBackend, SoftwarePixelBuffer};
use framegen::{
    ColorConversionMatrix, ColorMatrixPreset, FrameBufferGenerator, FrameGeneratorConfig,
    FramebufferPoolConfig, ImageOrientation, MediaTime, PixelBuffer, PixelFormat,
    PoolExhaustionPolicy, Size, Timestamp,
};

fn setup(config: FrameGeneratorConfig) -> (FrameBufferGenerator, SoftwareBackend) {
    let backend = SoftwareBackend::new();
    let ctx = backend
        .spawn_context(config.gpu_context_config())
        .expect("GPU context");
    let generator = FrameBufferGenerator::new(ctx, &config).expect("generator");
    (generator, backend)
}

fn gray(width: u32, height: u32) -> Arc<SoftwarePixelBuffer> {
    let format = PixelFormat::Nv12FullRange;
    let buffer = SoftwarePixelBuffer::filled(width, height, format, 128, 128, 128);
    Arc::new(buffer)
}

fn frame_time() -> MediaTime {
    MediaTime::new(3003, 90_000)
}

#[test]
fn test_landscape_right_1080p_becomes_portrait_1080x1920() {
    let (generator, _backend) = setup(FrameGeneratorConfig::default());
    let buffer = PixelBuffer::from_arc(gray(1920, 1080));

    let fb = generator
        .generate(&buffer, frame_time(), ImageOrientation::LandscapeRight)
        .expect("framebuffer");

    assert_eq!(fb.size(), Size::new(1080, 1920));
    assert_eq!(fb.orientation(), ImageOrientation::Portrait);
    assert!(!fb.is_texture_only());
}

#[test]
fn test_portrait_640x480_keeps_its_size() {
    let (generator, _backend) = setup(FrameGeneratorConfig::default());
    let buffer = PixelBuffer::from_arc(gray(640, 480));

    let fb = generator
        .generate(&buffer, frame_time(), ImageOrientation::Portrait)
        .expect("framebuffer");

    assert_eq!(fb.size(), Size::new(640, 480));
    assert_eq!(fb.orientation(), ImageOrientation::Portrait);
}

#[test]
fn test_chroma_failure_drops_frame_and_cleans_up() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    backend.fail_plane(1, cv_return::ALLOCATION_FAILED);
    let raw = gray(64, 48);
    let buffer = PixelBuffer::from_arc(raw.clone());

    let result = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);

    assert!(result.is_none());
    let stats = backend.stats();
    assert_eq!(stats.textures_created, 1, "luminance texture was created");
    assert_eq!(stats.live_plane_textures, 0, "and released by the flush");
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.draws, 0);
    assert_eq!(raw.lock_count(), 0);
    assert_eq!(raw.total_locks(), 1);
    let pool = generator.context().framebuffer_pool_stats();
    assert_eq!(pool.total_framebuffers, 0);
}

#[test]
fn test_luma_failure_reports_plane_and_status() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    backend.fail_plane(0, cv_return::PIXEL_BUFFER_NOT_OPENGL_COMPATIBLE);
    let raw = gray(16, 16);
    let buffer = PixelBuffer::from_arc(raw.clone());

    let err = generator
        .try_generate(&buffer, frame_time(), ImageOrientation::Portrait)
        .unwrap_err();

    assert!(err.is_frame_recoverable());
    assert!(err.to_string().contains("plane 0"), "{err}");
    assert!(err.to_string().contains("-6683"), "{err}");
    assert_eq!(backend.stats().textures_created, 0);
    assert_eq!(backend.stats().flushes, 1);
    assert_eq!(raw.lock_count(), 0);
}

#[test]
fn test_three_plane_buffer_is_dropped_before_any_texture() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    let raw = SoftwarePixelBuffer::with_planes(
        PixelFormat::Nv12FullRange,
        vec![
            (8, 4, vec![0; 32]),
            (4, 2, vec![128; 16]),
            (4, 2, vec![128; 16]),
        ],
    );
    let raw = Arc::new(raw);
    let buffer = PixelBuffer::from_arc(raw.clone());

    let frame = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);

    assert!(frame.is_none());
    assert_eq!(backend.stats().textures_created, 0);
    assert_eq!(backend.stats().draws, 0);
    assert_eq!(raw.total_locks(), 0);
}

#[test]
fn test_failed_lock_still_flushes() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    let raw = gray(16, 16);
    raw.fail_next_lock();
    let buffer = PixelBuffer::from_arc(raw.clone());

    let frame = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);
    assert!(frame.is_none());
    assert_eq!(backend.stats().flushes, 1);
    assert_eq!(raw.lock_count(), 0);

    // The next frame is independent of the failed one.
    let frame = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);
    assert!(frame.is_some());
}

#[test]
fn test_exhausted_pool_drops_frame_without_leaking_lock() {
    let config = FrameGeneratorConfig {
        pool: FramebufferPoolConfig {
            max_framebuffers_per_bucket: 1,
            exhaustion_policy: PoolExhaustionPolicy::ReturnError,
        },
        ..FrameGeneratorConfig::default()
    };
    let (generator, backend) = setup(config);
    let raw = gray(32, 32);
    let buffer = PixelBuffer::from_arc(raw.clone());

    let held = generator
        .generate(&buffer, frame_time(), ImageOrientation::Portrait)
        .expect("first frame");
    let frame = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);
    assert!(frame.is_none());

    assert_eq!(raw.lock_count(), 0);
    assert_eq!(raw.total_locks(), 2);
    assert_eq!(backend.stats().flushes, 2);
    assert_eq!(backend.stats().live_plane_textures, 0);

    drop(held);
    let frame = generator.generate(&buffer, frame_time(), ImageOrientation::Portrait);
    assert!(frame.is_some());
}

#[test]
fn test_generation_is_idempotent_and_reuses_pool() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    let buffer = PixelBuffer::from_arc(gray(40, 30));

    let a = generator
        .generate(&buffer, frame_time(), ImageOrientation::LandscapeLeft)
        .unwrap();
    let b = generator
        .generate(&buffer, frame_time(), ImageOrientation::LandscapeLeft)
        .unwrap();

    assert_eq!(a.size(), b.size());
    assert_eq!(a.orientation(), b.orientation());
    assert_eq!(a.timestamp(), b.timestamp());
    assert_ne!(a.texture(), b.texture(), "both frames are alive");
    assert_eq!(
        generator.context().read_rgba(&a).unwrap(),
        generator.context().read_rgba(&b).unwrap()
    );

    let texture = a.texture();
    drop(a);
    let c = generator
        .generate(&buffer, frame_time(), ImageOrientation::LandscapeLeft)
        .unwrap();
    assert_eq!(c.texture(), texture);
    assert_eq!(backend.stats().render_targets_allocated, 2);
}

#[test]
fn test_frame_time_is_stamped() {
    let (generator, _backend) = setup(FrameGeneratorConfig::default());
    let buffer = PixelBuffer::from_arc(gray(8, 8));
    let time = MediaTime::new(1001, 30000);

    let fb = generator
        .generate(&buffer, time, ImageOrientation::Portrait)
        .unwrap();
    assert_eq!(fb.timestamp(), Some(Timestamp::from_nanos(33_366_667)));
}

#[test]
fn test_planes_are_bound_to_units_zero_and_one_with_clamping() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    let buffer = PixelBuffer::from_arc(gray(1920, 1080));

    let _fb = generator
        .generate(&buffer, frame_time(), ImageOrientation::Portrait)
        .unwrap();

    let draw = backend.last_draw().expect("one draw");
    assert_eq!(draw.target_size, Size::new(1920, 1080));
    assert_eq!(draw.inputs.len(), 2);

    let clamp = (WrapMode::ClampToEdge, WrapMode::ClampToEdge);
    assert_eq!(draw.inputs[0].unit, TextureUnit::TEXTURE0);
    assert_eq!(draw.inputs[0].size, Size::new(1920, 1080));
    assert_eq!(draw.inputs[0].channels, 1);
    assert_eq!(draw.inputs[0].wrap, clamp);
    assert_eq!(draw.inputs[1].unit, TextureUnit::TEXTURE1);
    assert_eq!(draw.inputs[1].size, Size::new(960, 540));
    assert_eq!(draw.inputs[1].channels, 2);
    assert_eq!(draw.inputs[1].wrap, clamp);
}

#[test]
fn test_every_orientation_pair_sizes_and_balances_locks() {
    for target in ImageOrientation::ALL {
        let config = FrameGeneratorConfig {
            target_orientation: target,
            ..FrameGeneratorConfig::default()
        };
        let (generator, backend) = setup(config);
        let raw = gray(6, 4);
        let buffer = PixelBuffer::from_arc(raw.clone());

        for source in ImageOrientation::ALL {
            let fb = generator
                .generate(&buffer, frame_time(), source)
                .unwrap_or_else(|| panic!("{source:?} -> {target:?}"));
            let expected = source.rotation_needed_for(target).size_for(6, 4);
            assert_eq!(fb.size(), expected, "{source:?} -> {target:?}");
            assert_eq!(fb.orientation(), target);
            assert_eq!(raw.lock_count(), 0);
        }

        assert_eq!(raw.total_locks(), 8);
        assert_eq!(backend.stats().flushes, 8);
        assert_eq!(backend.stats().live_plane_textures, 0);
    }
}

#[test]
fn test_concurrent_callers_each_get_a_frame() {
    let (generator, backend) = setup(FrameGeneratorConfig::default());
    let generator = Arc::new(generator);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let generator = Arc::clone(&generator);
            std::thread::spawn(move || {
                let buffer = PixelBuffer::from_arc(gray(16 + i * 2, 8));
                for frame in 0..5 {
                    let time = MediaTime::new(frame, 30);
                    let fb = generator
                        .generate(&buffer, time, ImageOrientation::Portrait)
                        .expect("frame");
                    assert_eq!(fb.size(), Size::new(16 + i * 2, 8));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(backend.stats().flushes, 20);
    assert_eq!(backend.stats().draws, 20);
}

fn expected_rgb(matrix: &ColorConversionMatrix, y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let rgb = matrix.apply(y as f32 / 255.0, cb as f32 / 255.0, cr as f32 / 255.0);
    rgb.map(|v| (v * 255.0).round() as u8)
}

fn assert_close(actual: &[u8], expected: &[u8]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(*e) <= 1, "{actual:?} != {expected:?}");
    }
}

#[test]
fn test_full_range_conversion_values() {
    let (generator, _backend) = setup(FrameGeneratorConfig::default());
    let matrix = ColorConversionMatrix::BT601_FULL_RANGE;

    for (y, cb, cr) in [(128, 128, 128), (200, 90, 180), (30, 200, 60)] {
        let raw = SoftwarePixelBuffer::filled(4, 4, PixelFormat::Nv12FullRange, y, cb, cr);
        let buffer = PixelBuffer::new(raw);
        let fb = generator
            .generate(&buffer, frame_time(), ImageOrientation::Portrait)
            .unwrap();
        let rgba = generator.context().read_rgba(&fb).unwrap();

        let expected = expected_rgb(&matrix, y, cb, cr);
        for pixel in rgba.chunks_exact(4) {
            assert_close(&pixel[..3], &expected);
            assert_eq!(pixel[3], 255);
        }
    }
}

#[test]
fn test_video_range_matrix_maps_nominal_black_and_white() {
    let config = FrameGeneratorConfig {
        color_matrix: ColorMatrixPreset::Bt601VideoRange,
        ..FrameGeneratorConfig::default()
    };
    let (generator, _backend) = setup(config);

    for (luma, expected) in [(16u8, 0u8), (235, 255)] {
        let raw = SoftwarePixelBuffer::filled(2, 2, PixelFormat::Nv12VideoRange, luma, 128, 128);
        let buffer = PixelBuffer::new(raw);
        let fb = generator
            .generate(&buffer, frame_time(), ImageOrientation::Portrait)
            .unwrap();
        let rgba = generator.context().read_rgba(&fb).unwrap();
        assert_close(&rgba[..3], &[expected; 3]);
    }
}

#[test]
fn test_rotation_moves_pixels() {
    let (generator, _backend) = setup(FrameGeneratorConfig::default());
    let matrix = ColorConversionMatrix::BT601_FULL_RANGE;

    // 4×2 landscape frame with a distinct luma value per pixel.
    let luma_at = |x: usize, y: usize| (20 + 25 * (y * 4 + x)) as u8;
    let luma: Vec<u8> = (0..2)
        .flat_map(|y| (0..4).map(move |x| luma_at(x, y)))
        .collect();
    let buffer = PixelBuffer::new(SoftwarePixelBuffer::with_planes(
        PixelFormat::Nv12FullRange,
        vec![(4, 2, luma), (2, 1, vec![128; 4])],
    ));

    let fb = generator
        .generate(&buffer, frame_time(), ImageOrientation::LandscapeRight)
        .unwrap();
    assert_eq!(fb.size(), Size::new(2, 4));
    let rgba = generator.context().read_rgba(&fb).unwrap();

    // Turning counterclockwise: output (col, row) reads input (row, 1 - col).
    for row in 0..4 {
        for col in 0..2 {
            let offset = (row * 2 + col) * 4;
            let expected = expected_rgb(&matrix, luma_at(row, 1 - col), 128, 128);
            assert_close(&rgba[offset..offset + 3], &expected);
        }
    }
}
