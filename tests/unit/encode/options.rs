use super::*;

fn resolve(path: &str, w: u32, h: u32, opts: &EncodeOptions) -> ResolvedEncode {
    ResolvedEncode::resolve(Path::new(path), w, h, opts).unwrap()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn defaults_follow_the_table() {
    let r = resolve("out.mp4", 640, 480, &EncodeOptions::default());
    assert_eq!(r.loop_count, 0);
    assert_eq!(r.delay, -1);
    assert_eq!(r.macroblock, 16);
    assert_eq!(r.fps, 25.0);
    assert_eq!(r.quality, 0.5);
    assert_eq!(r.codec, "libx264");
    assert_eq!(r.pixel_format, PixelFormat::Rgba);
    assert_eq!(r.stream_file, None);
}

#[test]
fn codec_defaults_by_extension() {
    let opts = EncodeOptions::default();
    assert_eq!(resolve("clip.WMV", 16, 16, &opts).codec, "msmpeg4");
    assert_eq!(resolve("anim.gif", 16, 16, &opts).codec, "gif");
    assert_eq!(resolve("clip.mkv", 16, 16, &opts).codec, "libx264");

    let explicit = EncodeOptions {
        codec: Some("mpeg4".into()),
        ..Default::default()
    };
    assert_eq!(resolve("anim.gif", 16, 16, &explicit).codec, "mpeg4");
}

#[test]
fn explicit_zero_delay_still_reuses_previous() {
    let opts = EncodeOptions {
        delay: Some(0),
        ..Default::default()
    };
    assert_eq!(resolve("a.gif", 16, 16, &opts).delay, -1);

    let opts = EncodeOptions {
        delay: Some(150),
        ..Default::default()
    };
    assert_eq!(resolve("a.gif", 16, 16, &opts).delay, 150);
}

#[test]
fn quality_maps_to_crf_for_h264() {
    let best = EncodeOptions {
        quality: Some(0.0),
        ..Default::default()
    };
    let worst = EncodeOptions {
        quality: Some(1.0),
        ..Default::default()
    };
    assert_eq!(
        resolve("a.mp4", 16, 16, &best).rate_control(),
        RateControl::ConstantRateFactor(0)
    );
    assert_eq!(
        resolve("a.mp4", 16, 16, &worst).rate_control(),
        RateControl::ConstantRateFactor(51)
    );
    assert_eq!(
        resolve("a.mp4", 16, 16, &EncodeOptions::default()).rate_control(),
        RateControl::ConstantRateFactor(25)
    );
}

#[test]
fn quality_maps_to_qscale_for_other_codecs() {
    let best = EncodeOptions {
        quality: Some(0.0),
        codec: Some("mpeg4".into()),
        ..Default::default()
    };
    let worst = EncodeOptions {
        quality: Some(1.0),
        codec: Some("mpeg4".into()),
        ..Default::default()
    };
    assert_eq!(
        resolve("a.avi", 16, 16, &best).rate_control(),
        RateControl::QualityScale(1)
    );
    assert_eq!(
        resolve("a.avi", 16, 16, &worst).rate_control(),
        RateControl::QualityScale(31)
    );
}

#[test]
fn quality_is_clamped() {
    let opts = EncodeOptions {
        quality: Some(7.5),
        ..Default::default()
    };
    assert_eq!(resolve("a.mp4", 16, 16, &opts).quality, 1.0);
    let opts = EncodeOptions {
        quality: Some(-3.0),
        ..Default::default()
    };
    assert_eq!(resolve("a.mp4", 16, 16, &opts).quality, 0.0);
}

#[test]
fn bitrate_wins_over_quality() {
    let opts = EncodeOptions {
        bitrate: Some(400_000),
        quality: Some(0.1),
        ..Default::default()
    };
    let r = resolve("a.mp4", 16, 16, &opts);
    assert_eq!(r.rate_control(), RateControl::Bitrate(400_000));
    let args = r.args();
    assert_eq!(flag_value(&args, "-b:v"), Some("400000"));
    assert!(!args.iter().any(|a| a == "-crf"));
}

#[test]
fn padding_rounds_up_to_the_macroblock() {
    assert_eq!(pad_to_macroblock(480, 270, 16), (480, 272));
    assert_eq!(pad_to_macroblock(17, 33, 16), (32, 48));
    assert_eq!(pad_to_macroblock(17, 33, 1), (17, 33));
    assert_eq!(pad_to_macroblock(17, 33, 0), (17, 33));

    let r = resolve("a.mp4", 480, 270, &EncodeOptions::default());
    assert_eq!((r.width, r.height), (480, 272));
    let args = r.args();
    assert_eq!(flag_value(&args, "-s"), Some("480x272"));
    assert_eq!(flag_value(&args, "-vf"), Some("scale=480:272"));
}

#[test]
fn aligned_sizes_add_no_scale_filter() {
    let args = resolve("a.mp4", 640, 480, &EncodeOptions::default()).args();
    assert!(!args.iter().any(|a| a == "-vf"));
}

#[test]
fn padding_applies_to_gifs_too() {
    let args = resolve("a.gif", 30, 30, &EncodeOptions::default()).args();
    assert_eq!(flag_value(&args, "-vf"), Some("scale=32:32"));
}

#[test]
fn base_argv_layout() {
    let opts = EncodeOptions {
        fps: Some(29.97),
        pixel_format: Some(PixelFormat::Rgb24),
        ..Default::default()
    };
    let args = resolve("out.mp4", 64, 48, &opts).args();
    let expected: Vec<String> = [
        "-y", "-loglevel", "quiet", "-f", "rawvideo", "-vcodec", "rawvideo", "-s", "64x48",
        "-pix_fmt", "rgb24", "-r", "29.97", "-i", "-", "-vcodec", "libx264", "-pix_fmt",
        "yuv420p", "-crf", "25", "out.mp4",
    ]
    .map(String::from)
    .to_vec();
    assert_eq!(args, expected);
}

#[test]
fn fps_is_formatted_with_two_decimals() {
    let args = resolve("out.mp4", 16, 16, &EncodeOptions::default()).args();
    assert_eq!(flag_value(&args, "-r"), Some("25.00"));
}

#[test]
fn gif_gets_loop_and_final_delay() {
    let opts = EncodeOptions {
        loop_count: Some(-1),
        delay: Some(200),
        ..Default::default()
    };
    let args = resolve("anim.gif", 32, 32, &opts).args();
    assert_eq!(flag_value(&args, "-loop"), Some("-1"));
    assert_eq!(flag_value(&args, "-final_delay"), Some("200"));
    assert_eq!(flag_value(&args, "-q:v"), Some("16"));

    let mp4 = resolve("anim.mp4", 32, 32, &opts).args();
    assert!(!mp4.iter().any(|a| a == "-loop" || a == "-final_delay"));
}

#[test]
fn aux_source_maps_and_copies_streams() {
    let aux = std::env::temp_dir().join("vidpipe_options_aux.bin");
    std::fs::write(&aux, b"x").unwrap();
    let opts = EncodeOptions {
        stream_file: Some(aux.clone()),
        audio_codec: Some("aac".into()),
        ..Default::default()
    };
    let args = resolve("out.mp4", 64, 64, &opts).args();

    let aux_at = args.iter().position(|a| a == &aux.display().to_string()).unwrap();
    assert_eq!(args[aux_at - 1], "-i");
    let tail: Vec<&str> = args[aux_at + 1..aux_at + 20]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        [
            "-map", "0:v:0", "-map", "1:a?", "-map", "1:s?", "-map", "1:d?", "-map", "1:t?",
            "-c:a", "copy", "-c:s", "copy", "-c:d", "copy", "-c:t", "copy", "-shortest",
        ]
    );

    let vcodec_at = args.iter().rposition(|a| a == "-vcodec").unwrap();
    assert_eq!(vcodec_at, aux_at + 20);
    assert_eq!(args[vcodec_at + 1], "libx264");
    let acodec_at = args.iter().position(|a| a == "-acodec").unwrap();
    assert!(acodec_at > aux_at);
    assert_eq!(args[acodec_at + 1], "aac");
    assert_eq!(args.iter().filter(|a| *a == "0:v:0").count(), 1);
    assert_eq!(args.last().map(String::as_str), Some("out.mp4"));

    let gif = resolve("out.gif", 64, 64, &opts).args();
    assert!(!gif.iter().any(|a| a == "-shortest" || a == "-acodec"));

    let _ = std::fs::remove_file(&aux);
}

#[test]
fn audio_codec_without_aux_source_is_ignored() {
    let opts = EncodeOptions {
        audio_codec: Some("aac".into()),
        ..Default::default()
    };
    let args = resolve("out.mp4", 64, 64, &opts).args();
    assert!(!args.iter().any(|a| a == "-acodec"));
}

#[test]
fn missing_aux_source_is_not_found() {
    let opts = EncodeOptions {
        stream_file: Some(PathBuf::from("/definitely/not/here.mp4")),
        ..Default::default()
    };
    let err = ResolvedEncode::resolve(Path::new("out.mp4"), 16, 16, &opts).unwrap_err();
    assert!(matches!(err, VidError::NotFound(_)));
}

#[test]
fn invalid_dimensions_and_fps_are_rejected() {
    let opts = EncodeOptions::default();
    assert!(matches!(
        ResolvedEncode::resolve(Path::new("o.mp4"), 0, 16, &opts),
        Err(VidError::Validation(_))
    ));
    let bad_fps = EncodeOptions {
        fps: Some(0.0),
        ..Default::default()
    };
    assert!(matches!(
        ResolvedEncode::resolve(Path::new("o.mp4"), 16, 16, &bad_fps),
        Err(VidError::Validation(_))
    ));
}

#[test]
fn options_load_from_json() {
    let opts = EncodeOptions::from_json_str(
        r#"{"fps": 30, "quality": 0.0, "loop": -1, "macro": 8, "pixel_format": "rgb24"}"#,
    )
    .unwrap();
    assert_eq!(opts.fps, Some(30.0));
    assert_eq!(opts.quality, Some(0.0));
    assert_eq!(opts.loop_count, Some(-1));
    assert_eq!(opts.macroblock, Some(8));
    assert_eq!(opts.pixel_format, Some(PixelFormat::Rgb24));
    assert_eq!(opts.bitrate, None);

    let r = resolve("a.mp4", 16, 16, &opts);
    assert_eq!(r.rate_control(), RateControl::ConstantRateFactor(0));
}

#[test]
fn unknown_json_fields_are_rejected() {
    let err = EncodeOptions::from_json_str(r#"{"framerate": 30}"#).unwrap_err();
    assert!(matches!(err, VidError::Validation(_)));
}
