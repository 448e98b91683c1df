mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod player;
mod render;
mod river;
mod spectrum;
mod visualizer;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use audio::capture::DEFAULT_LEAD;
use cli::Cli;
use encode::ffmpeg::{FfmpegEncoder, VideoSettings};
use player::PlaybackSettings;
use render::projection::{MAX_HEIGHT, MAX_WIDTH, MIN_HEIGHT, MIN_WIDTH};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Explicit --config path, or auto-detect soundriver.toml / user config
    let config_path = cli.config.clone().or_else(config::discover);
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1280 { cli.width = cfg.output.width; }
            if cli.height == 720 { cli.height = cfg.output.height; }
            if cli.fps == 30 { cli.fps = cfg.output.fps; }
            if cli.crf == 18 { cli.crf = cfg.output.crf; }
            if cli.codec == "libx264" { cli.codec = cfg.output.codec; }
            if cli.pix_fmt == "yuv420p" { cli.pix_fmt = cfg.output.pix_fmt; }
            if cli.tick_ms == 10 { cli.tick_ms = cfg.playback.tick_ms; }
            if cli.latency_lead_ms == DEFAULT_LEAD.as_millis() as u64 { cli.latency_lead_ms = cfg.playback.latency_lead_ms; }
            if cli.buffer_ahead_ms == 100 { cli.buffer_ahead_ms = cfg.playback.buffer_ahead_ms; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&cli.width) || !(MIN_HEIGHT..=MAX_HEIGHT).contains(&cli.height) {
        anyhow::bail!(
            "Resolution {}x{} outside supported range {}-{} x {}-{}",
            cli.width, cli.height, MIN_WIDTH, MAX_WIDTH, MIN_HEIGHT, MAX_HEIGHT
        );
    }

    log::info!("soundriver - 3D spectrum river renderer");
    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(&cli.input)?;
    let total_frames = player::video_frame_count(&audio_data, cli.fps);
    log::info!("Total frames: {}, Duration: {:.1}s", total_frames, audio_data.duration_secs());

    // 2. Start FFmpeg encoder
    log::info!("Starting FFmpeg encoder...");
    let video = VideoSettings {
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        codec: cli.codec.clone(),
        pix_fmt: cli.pix_fmt.clone(),
        crf: cli.crf,
        bitrate: cli.bitrate.clone(),
    };
    let mut encoder = FfmpegEncoder::new(&cli.output, &cli.input, &video)?;

    // 3. Simulated playback drives the visualizer
    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let settings = PlaybackSettings {
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        tick: Duration::from_millis(cli.tick_ms),
        lead: Duration::from_millis(cli.latency_lead_ms),
        buffer_ahead: Duration::from_millis(cli.buffer_ahead_ms),
    };
    let stats = player::play(&audio_data, &settings, |framebuffer| {
        encoder.write_frame(framebuffer.pixels())?;
        pb.inc(1);
        Ok(())
    })?;

    pb.finish_with_message("Rendering complete");
    log::info!(
        "{} ticks, {} river redraws, {} skipped ticks",
        stats.ticks, stats.rendered, stats.skipped
    );

    // 4. Finish encoding
    log::info!("Finishing encoding...");
    encoder.finish()?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}
