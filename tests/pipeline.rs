use msrcr::{
    compute_scales, decompose, dynamic_range, msrcr, normalize, restore, PixelBuffer,
    RetinexConfig, RetinexError, ScaleMode,
};

fn filled(width: u32, height: u32, rgb: [u8; 3]) -> PixelBuffer {
    let data = (0..width * height).flat_map(|_| rgb).collect();
    PixelBuffer::new(width, height, 3, data).unwrap()
}

fn textured(width: u32, height: u32) -> PixelBuffer {
    let mut state = 0x2545_f491u32;
    let data = (0..width * height * 3)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    PixelBuffer::new(width, height, 3, data).unwrap()
}

#[test]
fn test_uniform_red_image_end_to_end() {
    let mut buffer = filled(64, 64, [200, 50, 50]);
    let config = RetinexConfig {
        max_scale: 100,
        nscales: 3,
        mode: ScaleMode::Uniform,
        variance_factor: 1.2,
    };

    msrcr(&mut buffer, &config, None).unwrap();

    assert_eq!((buffer.width(), buffer.height(), buffer.bpp()), (64, 64, 3));
    let first = buffer.pixels().next().unwrap().to_vec();
    assert!(buffer.pixels().all(|pixel| pixel == first.as_slice()));
}

#[test]
fn test_flat_gray_stages() {
    let buffer = filled(32, 32, [128, 128, 128]);
    let scales = compute_scales(240, 3, ScaleMode::Uniform);

    let reflectance = decompose(&buffer, &scales).unwrap();
    assert!(reflectance.values().all(|v| v.abs() < 1e-6));

    let restored = restore(&buffer, &reflectance).unwrap();
    let stats = dynamic_range(&restored, 1.2);
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.range, 1.0);

    let output = normalize(&buffer, &restored, 1.2).unwrap();
    let first = output.pixels().next().unwrap().to_vec();
    assert!(output.pixels().all(|pixel| pixel == first.as_slice()));
}

#[test]
fn test_msrcr_is_deterministic() {
    let config = RetinexConfig {
        max_scale: 60,
        nscales: 4,
        mode: ScaleMode::High,
        variance_factor: 2.0,
    };

    let mut a = textured(40, 30);
    let mut b = textured(40, 30);
    assert_eq!(a, b);

    msrcr(&mut a, &config, None).unwrap();
    msrcr(&mut b, &config, None).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn test_textured_image_changes() {
    let original = textured(32, 32);
    let mut buffer = original.clone();
    msrcr(&mut buffer, &RetinexConfig::default(), None).unwrap();
    assert_ne!(buffer, original);
}

#[test]
fn test_scale_boundaries() {
    assert_eq!(
        compute_scales(240, 1, ScaleMode::Uniform).into_inner(),
        [120.0f32]
    );
    assert_eq!(
        compute_scales(240, 2, ScaleMode::Uniform).into_inner(),
        [120.0f32, 240.0]
    );
}

#[test]
fn test_out_of_range_parameters_are_rejected() {
    let cases = [
        RetinexConfig {
            max_scale: 8,
            ..Default::default()
        },
        RetinexConfig {
            nscales: 0,
            ..Default::default()
        },
        RetinexConfig {
            variance_factor: 5.0,
            ..Default::default()
        },
    ];

    for config in cases {
        let mut buffer = textured(8, 8);
        let before = buffer.clone();
        let result = msrcr(&mut buffer, &config, None);
        assert!(matches!(result, Err(RetinexError::InvalidConfig { .. })));
        assert_eq!(buffer, before);
    }
}
