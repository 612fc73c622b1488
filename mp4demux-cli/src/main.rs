use std::fs::File;
use std::io::Write;

use anyhow::{anyhow, Result};
use structopt::StructOpt;

use mp4demux::Demuxer;

#[derive(StructOpt, Debug)]
#[structopt(setting = clap::AppSettings::VersionlessSubcommands)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUST_LOG; trace, debug, info etc)
    pub log: Option<String>,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Media information.
    Info(InfoOpts),

    #[structopt(display_order = 2)]
    /// Show the box tree.
    Boxes(BoxesOpts),

    #[structopt(display_order = 3)]
    /// Show the chapter list.
    Chapters(ChaptersOpts),

    #[structopt(display_order = 4)]
    /// Show the metadata tags.
    Tags(TagsOpts),

    #[structopt(display_order = 5)]
    /// Extract the cover art.
    Cover(CoverOpts),

    #[structopt(display_order = 6)]
    /// Dump a track's raw samples to a file.
    Dump(DumpOpts),
}

#[derive(StructOpt, Debug)]
pub struct InfoOpts {
    #[structopt(short, long)]
    /// Output in JSON.
    pub json: bool,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct BoxesOpts {
    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct ChaptersOpts {
    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct TagsOpts {
    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct CoverOpts {
    #[structopt(short, long)]
    /// Output filename; the extension is derived from the image type.
    pub output: Option<String>,

    /// Input filename.
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct DumpOpts {
    #[structopt(short, long)]
    /// Track id to dump.
    pub track: u32,

    /// Input filename.
    pub input: String,
    /// Output filename.
    pub output: String,
}

fn main() -> Result<()> {
    let opts = MainOpts::from_args();

    let filter = opts.log.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match opts.cmd {
        Command::Info(opts) => info(opts),
        Command::Boxes(opts) => boxes(opts),
        Command::Chapters(opts) => chapters(opts),
        Command::Tags(opts) => tags(opts),
        Command::Cover(opts) => cover(opts),
        Command::Dump(opts) => dump(opts),
    }
}

fn info(opts: InfoOpts) -> Result<()> {
    let dmx = Demuxer::open(&opts.input)?;
    let media = dmx.media_info();
    let tracks = (0..dmx.track_count())
        .map(|idx| dmx.track_info(idx))
        .collect::<mp4demux::Result<Vec<_>>>()?;

    if opts.json {
        let val = serde_json::json!({
            "media": media,
            "tracks": tracks,
        });
        println!("{}", serde_json::to_string_pretty(&val)?);
        return Ok(());
    }

    if let Some(ftyp) = dmx.file_type() {
        println!("brand: {}", ftyp.major_brand);
    }
    println!(
        "duration: {}.{:06}s, {} track(s)",
        media.duration_us / 1_000_000,
        media.duration_us % 1_000_000,
        media.track_count
    );
    for track in &tracks {
        println!(
            "track {}: {} [{}], {} samples, {}.{:06}s",
            track.id,
            track.track_type,
            track.language,
            track.sample_count,
            track.duration_us / 1_000_000,
            track.duration_us % 1_000_000,
        );
        match &track.specific_info {
            mp4demux::demux::SpecificTrackInfo::Video(v) => {
                match &v.codec_name {
                    Some(name) => println!("    {} ({}) {}x{}", v.codec_id, name, v.width, v.height),
                    None => println!("    {} {}x{}", v.codec_id, v.width, v.height),
                }
            },
            mp4demux::demux::SpecificTrackInfo::Audio(a) => {
                println!(
                    "    {} {} ch, {} bit, {} Hz",
                    a.codec_id, a.channel_count, a.bit_depth, a.sample_rate
                );
            },
            mp4demux::demux::SpecificTrackInfo::Metadata(m) => {
                println!("    {}", m.mime_format);
            },
            mp4demux::demux::SpecificTrackInfo::Unknown(u) => {
                println!("    {}", u.codec_id);
            },
        }
    }
    Ok(())
}

fn boxes(opts: BoxesOpts) -> Result<()> {
    let dmx = Demuxer::open(&opts.input)?;
    println!("{:#?}", dmx.boxes());
    Ok(())
}

fn chapters(opts: ChaptersOpts) -> Result<()> {
    let dmx = Demuxer::open(&opts.input)?;
    for chapter in dmx.chapters() {
        let secs = chapter.time_us / 1_000_000;
        println!(
            "{:02}:{:02}:{:02} {}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            chapter.name
        );
    }
    Ok(())
}

fn tags(opts: TagsOpts) -> Result<()> {
    let dmx = Demuxer::open(&opts.input)?;
    let (keys, values) = dmx.metadata_strings();
    for (key, value) in keys.iter().zip(values.iter()) {
        println!("{}: {}", key, value);
    }
    if let Some((size, kind)) = dmx.metadata_cover(None)? {
        println!("cover: {} bytes ({})", size, kind.extension());
    }
    Ok(())
}

fn cover(opts: CoverOpts) -> Result<()> {
    let dmx = Demuxer::open(&opts.input)?;
    let (size, kind) = dmx
        .metadata_cover(None)?
        .ok_or_else(|| anyhow!("{}: no cover art", opts.input))?;

    let mut buf = vec![0u8; size as usize];
    dmx.metadata_cover(Some(&mut buf[..]))?;

    let output = opts
        .output
        .unwrap_or_else(|| format!("cover.{}", kind.extension()));
    File::create(&output)?.write_all(&buf)?;
    println!("{}: {} bytes", output, size);
    Ok(())
}

fn dump(opts: DumpOpts) -> Result<()> {
    let mut dmx = Demuxer::open(&opts.input)?;
    let mut out = File::create(&opts.output)?;

    let largest = dmx
        .movie()
        .tracks
        .iter()
        .find(|t| t.id == opts.track)
        .ok_or_else(|| anyhow!("{}: no track with id {}", opts.input, opts.track))?
        .sample_size
        .iter()
        .copied()
        .max()
        .unwrap_or(0);

    let mut buf = vec![0u8; largest as usize];
    let mut count = 0u64;
    let mut bytes = 0u64;
    loop {
        let info = dmx.next_sample(opts.track, Some(&mut buf[..]), None)?;
        if info.sample_size == 0 {
            break;
        }
        out.write_all(&buf[..info.sample_size as usize])?;
        count += 1;
        bytes += info.sample_size as u64;
    }

    println!("{}: {} samples, {} bytes", opts.output, count, bytes);
    Ok(())
}
