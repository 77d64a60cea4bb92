//! Save selected frames as PNGs: `cargo run --example grab_frames -- in.mp4 0 10 20`

use vidpipe::{Video, write_image};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        anyhow::bail!("usage: grab_frames <input> <frame>...");
    };
    let indices = args
        .map(|a| a.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()?;

    let video = Video::open(&input)?;
    println!("{}", serde_json::to_string_pretty(video.metadata())?);

    for (n, frame) in indices.iter().zip(video.read_frames(&indices)?) {
        let out = format!("frame_{n:05}.png");
        write_image(&out, video.width(), video.height(), &frame)?;
        println!("wrote {out}");
    }
    Ok(())
}
