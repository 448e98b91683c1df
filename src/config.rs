use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::capture::DEFAULT_LEAD;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_latency_lead_ms")]
    pub latency_lead_ms: u64,
    #[serde(default = "default_buffer_ahead_ms")]
    pub buffer_ahead_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            latency_lead_ms: default_latency_lead_ms(),
            buffer_ahead_ms: default_buffer_ahead_ms(),
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_tick_ms() -> u64 { 10 }
fn default_latency_lead_ms() -> u64 { DEFAULT_LEAD.as_millis() as u64 }
fn default_buffer_ahead_ms() -> u64 { 100 }

/// First existing config among `soundriver.toml`, `~/.config/soundriver/config.toml`
/// and the platform config dir.
pub fn discover() -> Option<PathBuf> {
    let local = PathBuf::from("soundriver.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("soundriver").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("soundriver").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unique_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "soundriver_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.output.width, 1280);
        assert_eq!(cfg.output.height, 720);
        assert_eq!(cfg.output.pix_fmt, "yuv420p");
        assert_eq!(cfg.playback.tick_ms, 10);
        assert_eq!(cfg.playback.latency_lead_ms, 300);
        assert_eq!(cfg.playback.buffer_ahead_ms, 100);
    }

    #[test]
    fn partial_sections_override() {
        let path = unique_path("partial.toml");
        fs::write(
            &path,
            "[output]\nwidth = 1920\ncodec = \"libx265\"\n\n[playback]\nlatency_lead_ms = 150\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.output.width, 1920);
        assert_eq!(cfg.output.height, 720);
        assert_eq!(cfg.output.codec, "libx265");
        assert_eq!(cfg.playback.latency_lead_ms, 150);
        assert_eq!(cfg.playback.tick_ms, 10);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unreadable_or_invalid_is_none() {
        assert!(load_config(&unique_path("missing.toml")).is_none());

        let path = unique_path("broken.toml");
        fs::write(&path, "[output\nwidth = ").unwrap();
        assert!(load_config(&path).is_none());
        let _ = fs::remove_file(&path);
    }
}
