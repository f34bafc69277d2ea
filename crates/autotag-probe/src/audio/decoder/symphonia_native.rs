use std::{fs::File, path::Path};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::{AudioLoader, MonoAudio, resample::resample_mono};
use crate::error::Error;

/// Decodifica con symphonia, mezcla a mono y remuestrea con rubato.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaLoader;

impl SymphoniaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Devuelve la señal mono a la frecuencia original del fichero.
    pub fn decode_mono(&self, path: &Path) -> Result<MonoAudio, Error> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(Error::Decode("no audio track found".into()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(Error::Decode("unknown sample rate".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(e.to_string()))?;

        let mut mono: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(Error::Decode(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // paquete corrupto: se salta, como hacen los reproductores
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(path = %path.display(), error = %e, "paquete descartado");
                    continue;
                }
                Err(e) => return Err(Error::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
            if buf.capacity() < decoded.capacity() * channels {
                *buf = SampleBuffer::new(decoded.capacity() as u64, spec);
            }
            buf.copy_interleaved_ref(decoded);

            mono.extend(
                buf.samples()
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        if mono.is_empty() {
            return Err(Error::EmptyAudio(path.display().to_string()));
        }

        debug!(
            path = %path.display(),
            sample_rate,
            frames = mono.len(),
            "decodificado"
        );
        Ok(MonoAudio {
            samples: mono,
            sample_rate,
        })
    }
}

impl AudioLoader for SymphoniaLoader {
    fn load(&self, path: &Path, sample_rate: u32, quality: u8) -> Result<MonoAudio, Error> {
        let decoded = self.decode_mono(path)?;
        let samples = resample_mono(decoded.samples, decoded.sample_rate, sample_rate, quality)?;
        Ok(MonoAudio {
            samples,
            sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_stereo_wav(path: &Path, rate: u32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (rate as f32 * seconds) as usize;
        for i in 0..frames {
            let s = ((i as f32 * 440.0 * 2.0 * std::f32::consts::PI / rate as f32).sin() * 8000.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(-s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_is_downmixed_to_mono() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tone.wav");
        write_stereo_wav(&path, 16_000, 0.5);

        let audio = SymphoniaLoader::new().decode_mono(&path).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples.len(), 8_000);
        // canales en oposición de fase: la mezcla se anula
        assert!(audio.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn load_resamples_to_requested_rate() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tone.wav");
        write_stereo_wav(&path, 32_000, 1.0);

        let audio = SymphoniaLoader::new().load(&path, 16_000, 4).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert!((audio.samples.len() as i64 - 16_000).abs() < 200);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(SymphoniaLoader::new().load(&path, 16_000, 4).is_err());
    }
}
