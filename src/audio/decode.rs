use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::ring::CHANNELS;

/// Decoded PCM, interleaved 16-bit with [`CHANNELS`] channels per frame.
pub struct AudioData {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut all_samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        to_stereo(sample_buf.samples(), channels, &mut all_samples);
    }

    let data = AudioData {
        samples: all_samples,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} frames, {}Hz, {} source channels, {:.1}s",
        data.frames(),
        sample_rate,
        channels,
        data.duration_secs()
    );

    Ok(data)
}

/// Mono is duplicated to both sides; extra channels beyond the first two are dropped.
fn to_stereo(samples: &[i16], channels: usize, out: &mut Vec<i16>) {
    match channels {
        0 => {}
        1 => out.extend(samples.iter().flat_map(|&s| [s, s])),
        _ => {
            for frame in samples.chunks_exact(channels) {
                out.extend_from_slice(&frame[..CHANNELS]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let mut out = Vec::new();
        to_stereo(&[1, -2, 3], 1, &mut out);
        assert_eq!(out, vec![1, 1, -2, -2, 3, 3]);
    }

    #[test]
    fn surround_keeps_front_pair() {
        let mut out = Vec::new();
        to_stereo(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12], 6, &mut out);
        assert_eq!(out, vec![1, 2, 7, 8]);
    }

    #[test]
    fn duration_counts_frames() {
        let audio = AudioData {
            samples: vec![0; 44_100 * 2],
            sample_rate: 44_100,
        };
        assert_eq!(audio.frames(), 44_100);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_has_context() {
        let err = decode_audio(Path::new("/nonexistent/soundriver.wav")).err().unwrap();
        assert!(err.to_string().contains("Failed to open audio file"));
    }
}
