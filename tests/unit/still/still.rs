use super::*;

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("vidpipe_still_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for y in 0..height {
        for x in 0..width {
            data.extend([(x * 40) as u8, (y * 60) as u8, 200, 255 - (x as u8)]);
        }
    }
    data
}

#[test]
fn png_round_trip_is_lossless() {
    let path = scratch("rgba.png");
    let data = gradient(5, 3);
    write_image(&path, 5, 3, &data).unwrap();

    let img = read_image(&path).unwrap();
    assert_eq!((img.width, img.height), (5, 3));
    assert_eq!(img.depth(), 4);
    assert_eq!(img.data, data);
}

#[test]
fn rgb_buffers_read_back_opaque() {
    let path = scratch("rgb.png");
    let rgb = vec![10u8, 20, 30, 40, 50, 60];
    write_image(&path, 2, 1, &rgb).unwrap();

    let img = read_image(&path).unwrap();
    assert_eq!(img.data, vec![10, 20, 30, 255, 40, 50, 60, 255]);
}

#[test]
fn read_into_fills_the_front_of_a_larger_buffer() {
    let path = scratch("into.png");
    let data = gradient(2, 2);
    write_image(&path, 2, 2, &data).unwrap();

    let mut buf = vec![7u8; 20];
    assert_eq!(read_image_into(&path, &mut buf).unwrap(), (2, 2));
    assert_eq!(&buf[..16], data.as_slice());
    assert_eq!(&buf[16..], &[7, 7, 7, 7]);

    let mut short = vec![0u8; 15];
    assert!(matches!(
        read_image_into(&path, &mut short),
        Err(VidError::BufferTooSmall(_))
    ));
}

#[test]
fn jpeg_drops_alpha() {
    let path = scratch("photo.jpg");
    let data = vec![128u8; 8 * 8 * 4];
    write_image(&path, 8, 8, &data).unwrap();

    let img = read_image(&path).unwrap();
    assert_eq!((img.width, img.height), (8, 8));
    assert!(img.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn missing_file_is_not_found() {
    assert!(matches!(
        read_image("/definitely/not/here.png"),
        Err(VidError::NotFound(_))
    ));
}

#[test]
fn mismatched_buffer_length_is_rejected() {
    let err = write_image(scratch("bad.png"), 4, 4, &[0u8; 10]).unwrap_err();
    assert!(matches!(err, VidError::Validation(_)));
}

#[test]
fn unknown_extension_is_rejected() {
    let err = write_image(scratch("frame.nope"), 1, 1, &[0, 0, 0]).unwrap_err();
    assert!(matches!(err, VidError::Validation(_)));
}
