//! Re-encode a video frame by frame: `cargo run --example transcode -- in.mp4 out.mp4 [options.json]`

use vidpipe::{EncodeOptions, Video, VideoWriter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: transcode <input> <output> [options.json]");
    };
    let mut opts = match args.next() {
        Some(path) => EncodeOptions::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EncodeOptions::default(),
    };

    let mut video = Video::open(&input)?;
    if opts.fps.is_none() {
        opts.fps = Some(video.fps());
    }
    if opts.stream_file.is_none() && video.has_streams() {
        opts.stream_file = Some(input.clone().into());
    }

    let mut writer = VideoWriter::new(&output, video.width(), video.height(), &opts)?;
    // The writer wants frames at its macroblock-padded size; unaligned sources are copied row
    // by row into the top-left corner.
    let mut padded = vec![0u8; writer.frame_size()];
    let src_row = video.width() as usize * video.depth();
    let dst_row = writer.width() as usize * writer.depth();
    while video.read() {
        if src_row == dst_row && video.frame_size() == writer.frame_size() {
            writer.write(video.frame_buffer())?;
            continue;
        }
        for (src, dst) in video
            .frame_buffer()
            .chunks_exact(src_row)
            .zip(padded.chunks_exact_mut(dst_row))
        {
            dst[..src_row].copy_from_slice(src);
        }
        writer.write(&padded)?;
    }
    writer.close()?;

    println!(
        "{input} -> {output}: {} frames at {}x{} ({})",
        writer.frames_written(),
        writer.width(),
        writer.height(),
        writer.codec()
    );
    Ok(())
}
