use super::*;

#[test]
fn sequential_decode_args() {
    let args = decode_args(Path::new("clips/koala.mp4"), 0, PixelFormat::Rgba, None);
    assert_eq!(
        args,
        [
            "-i",
            "clips/koala.mp4",
            "-f",
            "image2pipe",
            "-loglevel",
            "quiet",
            "-pix_fmt",
            "rgba",
            "-vcodec",
            "rawvideo",
            "-map",
            "0:v:0",
            "-"
        ]
    );
}

#[test]
fn selection_decode_args_disable_frame_rate_sync() {
    let select = build_select_expression(&[5, 15]);
    let args = decode_args(Path::new("a.mkv"), 2, PixelFormat::Rgb24, Some(&select));
    let tail: Vec<&str> = args[args.len() - 5..].iter().map(String::as_str).collect();
    assert_eq!(
        tail,
        ["-vf", r"select='eq(n\,5)+eq(n\,15)'", "-vsync", "0", "-"]
    );
    assert!(args.contains(&"0:v:2".to_string()));
    assert!(args.contains(&"rgb24".to_string()));
}

#[test]
fn open_missing_file_is_not_found() {
    let err = Video::open_with(&Toolchain::default(), "test/koala-video-not-present.mp4")
        .err()
        .unwrap();
    assert!(matches!(err, VidError::NotFound(_)));
}

#[test]
fn open_without_engine_is_tool_missing() {
    let tools = Toolchain::default().with_ffmpeg("vidpipe-no-such-ffmpeg");
    let err = Video::open_with(&tools, "Cargo.toml").err().unwrap();
    assert!(matches!(err, VidError::ToolMissing(_)));
}

/// Reader over a fake engine script that prints `output` whatever it is asked to decode.
#[cfg(unix)]
fn scripted_video(name: &str, output: &str, width: u32, height: u32) -> Video {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = std::env::temp_dir().join(format!("vidpipe_video_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join(name);
    std::fs::write(
        &script,
        format!("#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\nprintf '{output}'\n"),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    // Wait out ETXTBSY from processes forked concurrently by other tests.
    for _ in 0..100 {
        if crate::foundation::tools::is_installed(&script) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    Video {
        tools: Toolchain::default().with_ffmpeg(&script),
        path: dir.join("clip.mp4"),
        stream: 0,
        format: PixelFormat::Rgb24,
        meta: StreamMetadata {
            width,
            height,
            frames: 10,
            ..Default::default()
        },
        has_streams: false,
        audio_codec: None,
        seq: SequentialStream::new(),
    }
}

#[cfg(unix)]
#[test]
fn truncated_random_access_keeps_the_previous_frame() {
    let mut video = scripted_video("short_engine", "abcdef", 2, 1);
    video.read_frame(3).unwrap();
    assert_eq!(video.frame_buffer(), b"abcdef");

    let mut short = scripted_video("truncating_engine", "xyz", 2, 1);
    short.set_frame_buffer(b"abcdef".to_vec()).unwrap();
    assert!(matches!(short.read_frame(3), Err(VidError::PipeIo(_))));
    assert_eq!(short.frame_buffer(), b"abcdef");

    let mut buf = *b"012345";
    assert!(short.read_frame_into(3, &mut buf).is_err());
    assert_eq!(&buf, b"012345");
}

#[cfg(unix)]
#[test]
fn pixel_format_switch_keeps_a_large_enough_buffer() {
    let mut video = scripted_video("format_engine", "", 2, 2);
    video.set_frame_buffer(vec![7u8; 16]).unwrap();
    video.set_pixel_format(PixelFormat::Rgba).unwrap();
    assert_eq!(video.frame_size(), 16);
    assert_eq!(video.frame_buffer(), &[7u8; 16]);

    let mut small = scripted_video("format_engine_small", "", 2, 2);
    small.set_frame_buffer(vec![7u8; 12]).unwrap();
    small.set_pixel_format(PixelFormat::Rgba).unwrap();
    assert!(small.frame_buffer().is_empty());
}
