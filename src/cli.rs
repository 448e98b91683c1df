use clap::Parser;
use std::path::PathBuf;

use crate::audio::capture::DEFAULT_LEAD;

#[derive(Parser, Debug)]
#[command(name = "soundriver", about = "Renders a scrolling 3D spectrum river video from an audio file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Output video file
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Video width in pixels (640-1920)
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Video height in pixels (560-1080)
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Visualizer tick interval in milliseconds
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Output latency compensation in milliseconds
    #[arg(long, default_value_t = DEFAULT_LEAD.as_millis() as u64)]
    pub latency_lead_ms: u64,

    /// How far the simulated producer runs ahead of the clock, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub buffer_ahead_ms: u64,

    /// Config file (defaults to soundriver.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["soundriver", "song.flac"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("song.flac"));
        assert_eq!(cli.output, PathBuf::from("output.mp4"));
        assert_eq!((cli.width, cli.height, cli.fps), (1280, 720, 30));
        assert_eq!(cli.tick_ms, 10);
        assert_eq!(cli.latency_lead_ms, 300);
        assert_eq!(cli.buffer_ahead_ms, 100);
        assert!(cli.bitrate.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn overrides() {
        let cli = Cli::try_parse_from([
            "soundriver", "in.wav", "-o", "river.mkv", "--width", "1920", "--height", "1080",
            "-b", "5M", "--tick-ms", "20", "--pix-fmt", "yuv444p",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("river.mkv"));
        assert_eq!(cli.width, 1920);
        assert_eq!(cli.bitrate.as_deref(), Some("5M"));
        assert_eq!(cli.tick_ms, 20);
        assert_eq!(cli.pix_fmt, "yuv444p");
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["soundriver"]).is_err());
    }
}
