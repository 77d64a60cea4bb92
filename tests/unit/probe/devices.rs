use super::*;

const WIKI_LISTING: &str = r#"ffmpeg version N-45279-g6b86dd5... --enable-runtime-cpudetect
  libavutil      51. 74.100 / 51. 74.100
  libavcodec     54. 65.100 / 54. 65.100
  libavformat    54. 31.100 / 54. 31.100
  libavdevice    54.  3.100 / 54.  3.100
  libavfilter     3. 19.102 /  3. 19.102
  libswscale      2.  1.101 /  2.  1.101
  libswresample   0. 16.100 /  0. 16.100
[dshow @ 03ACF580] DirectShow video devices
[dshow @ 03ACF580]  "Integrated Camera"
[dshow @ 03ACF580]  "screen-capture-recorder"
[dshow @ 03ACF580] DirectShow audio devices
[dshow @ 03ACF580]  "Internal Microphone (Conexant 2"
[dshow @ 03ACF580]  "virtual-audio-capturer"
dummy: Immediate exit requested"#;

#[test]
fn parses_only_video_devices_in_order() {
    let devices = parse_devices(WIKI_LISTING);
    assert_eq!(
        devices,
        vec![
            "Integrated Camera".to_string(),
            "screen-capture-recorder".to_string()
        ]
    );
}

#[test]
fn duplicate_display_names_use_alternative_name() {
    let text = r#"[dshow @ 0000] DirectShow video devices (some may be both video and audio devices)
[dshow @ 0000]  "USB Camera"
[dshow @ 0000]     Alternative name "@device_pnp_\\?\usb#vid_0001"
[dshow @ 0000]  "USB Camera"
[dshow @ 0000]     Alternative name "@device_pnp_\\?\usb#vid_0002"
[dshow @ 0000] DirectShow audio devices
[dshow @ 0000]  "Microphone"
[dshow @ 0000]     Alternative name "@device_cm_{33D9}\wave_{A1}""#;
    let devices = parse_devices(text);
    assert_eq!(
        devices,
        vec![
            "USB Camera".to_string(),
            r"@device_pnp_\\?\usb#vid_0002".to_string()
        ]
    );
}

#[test]
fn non_adjacent_duplicate_uses_alternative_name() {
    let text = r#"[dshow @ 0000] DirectShow video devices
[dshow @ 0000]  "USB Camera"
[dshow @ 0000]     Alternative name "@alt_1"
[dshow @ 0000]  "Screen Capture"
[dshow @ 0000]     Alternative name "@alt_2"
[dshow @ 0000]  "USB Camera"
[dshow @ 0000]     Alternative name "@alt_3"
[dshow @ 0000] DirectShow audio devices"#;
    assert_eq!(
        parse_devices(text),
        vec![
            "USB Camera".to_string(),
            "Screen Capture".to_string(),
            "@alt_3".to_string()
        ]
    );
}

#[test]
fn tagged_listing_without_headers_skips_audio() {
    let text = "[dshow @ 01] \"HD Webcam\" (video)\n\
                [dshow @ 01]   Alternative name \"@device_pnp_a\"\n\
                [dshow @ 01] \"Mic Array\" (audio)\n\
                [dshow @ 01]   Alternative name \"@device_cm_b\"\n";
    assert_eq!(parse_devices(text), vec!["HD Webcam".to_string()]);
}

#[test]
fn no_devices_is_empty() {
    assert!(parse_devices("dummy: Immediate exit requested").is_empty());
}

#[test]
fn parses_camera_header() {
    let info = parse_camera_header(
        "Input #0, dshow, from 'video=Integrated Camera':\n  Duration: N/A, start: 1367309.442000, bitrate: N/A\n  Stream #0:0: Video: mjpeg (Baseline) (MJPG / 0x47504A4D), yuvj422p(pc, bt470bg/unknown/unknown), 1280x720, 30 fps, 30 tbr, 10000k tbn\nAt least one output file must be specified",
    );
    assert_eq!(info.width, 1280);
    assert_eq!(info.height, 720);
    assert!((info.fps - 30.0).abs() < 1e-9);
    assert_eq!(info.codec, "mjpeg");
}

#[test]
fn parses_fractional_fps_and_v4l2_codec() {
    let info = parse_camera_header(
        "[video4linux2,v4l2 @ 0x55d0] ...\nInput #0, video4linux2,v4l2, from '/dev/video0':\n  Stream #0:0: Video: rawvideo (YUY2 / 0x32595559), yuyv422, 640x480, 147456 kb/s, 29.97 fps, 29.97 tbr, 1000k tbn",
    );
    assert_eq!((info.width, info.height), (640, 480));
    assert!((info.fps - 29.97).abs() < 1e-9);
    assert_eq!(info.codec, "rawvideo");
}

#[test]
fn header_without_stream_is_default() {
    assert_eq!(parse_camera_header("nothing useful"), CameraInfo::default());
}

#[test]
fn capture_format_matches_platform() {
    if cfg!(target_os = "linux") {
        assert_eq!(capture_format(), Some("v4l2"));
    }
}
