use super::*;

#[test]
fn translucent_png_is_premultiplied() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    image::RgbaImage::from_pixel(1, 1, image::Rgba([100, 50, 200, 128]))
        .save(&path)
        .unwrap();

    let prepared = load_working_image(
        &path,
        Canvas {
            width: 1,
            height: 1,
        },
    )
    .unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn working_image_is_stretched_to_working_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    image::RgbImage::from_pixel(10, 4, image::Rgb([10, 200, 30]))
        .save(&path)
        .unwrap();

    let working = Canvas {
        width: 24,
        height: 12,
    };
    let prepared = load_working_image(&path, working).unwrap();
    assert_eq!((prepared.width, prepared.height), (24, 12));
    assert_eq!(prepared.rgba8_premul.len(), 24 * 12 * 4);
    for (got, want) in prepared.rgba8_premul[..4].iter().zip([10u8, 200, 30, 255]) {
        assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
    }
}

#[test]
fn undecodable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"not an image").unwrap();
    assert!(
        load_working_image(
            &path,
            Canvas {
                width: 2,
                height: 2
            }
        )
        .is_err()
    );
}
