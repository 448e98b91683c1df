use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Video stream parameters passed through to ffmpeg.
#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    pub bitrate: Option<String>,
}

pub struct FfmpegEncoder {
    child: Child,
    frame_bytes: usize,
    frames: u64,
}

impl FfmpegEncoder {
    /// Spawns ffmpeg reading raw RGBA frames on stdin and muxing in `input_audio`.
    pub fn new(output_path: &Path, input_audio: &Path, video: &VideoSettings) -> Result<Self> {
        let args = build_args(output_path, input_audio, video)?;
        log::debug!("ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            video.width,
            video.height,
            video.fps,
            video.codec
        );

        Ok(Self {
            child,
            frame_bytes: video.width as usize * video.height as usize * 4,
            frames: 0,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        if rgba_pixels.len() != self.frame_bytes {
            anyhow::bail!(
                "Frame is {} bytes, encoder expects {}",
                rgba_pixels.len(),
                self.frame_bytes
            );
        }
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Closing stdin is ffmpeg's end-of-input.
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames);
        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

fn build_args(output_path: &Path, input_audio: &Path, video: &VideoSettings) -> Result<Vec<String>> {
    let mut args = vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", video.width, video.height),
        "-framerate".into(), video.fps.to_string(),
        "-i".into(), "pipe:0".into(),
        "-i".into(), path_arg(input_audio)?,
        "-c:v".into(), video.codec.clone(),
        "-pix_fmt".into(), video.pix_fmt.clone(),
    ];

    if let Some(ref br) = video.bitrate {
        args.extend(["-b:v".to_string(), br.clone()]);
    } else {
        args.extend(["-crf".to_string(), video.crf.to_string()]);
        args.extend(["-preset".to_string(), "medium".to_string()]);
    }

    args.extend([
        "-c:a".into(), "aac".into(),
        "-b:a".into(), "192k".into(),
        "-shortest".into(),
        path_arg(output_path)?,
    ]);
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(bitrate: Option<&str>) -> VideoSettings {
        VideoSettings {
            width: 800,
            height: 600,
            fps: 30,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
            bitrate: bitrate.map(str::to_string),
        }
    }

    #[test]
    fn crf_mode_args() {
        let args = build_args(Path::new("out.mp4"), Path::new("in.flac"), &video(None)).unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("-video_size 800x600"));
        assert!(joined.contains("-i in.flac"));
        assert!(joined.contains("-crf 18 -preset medium"));
        assert!(!joined.contains("-b:v"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn bitrate_replaces_crf() {
        let args = build_args(Path::new("out.mp4"), Path::new("in.wav"), &video(Some("5M"))).unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("-b:v 5M"));
        assert!(!joined.contains("-crf"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let bad = Path::new(OsStr::from_bytes(b"out\xff.mp4"));
        let err = build_args(bad, Path::new("in.wav"), &video(None)).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}
