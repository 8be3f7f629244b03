//! Fixed-length mono waveform extraction.

use std::path::Path;
use std::sync::Arc;

use emo_media::{ClipDecoder, DecodedAudio};
use emo_models::features::{AUDIO_SAMPLES, AUDIO_SAMPLE_RATE};
use ndarray::Array1;
use tracing::{debug, warn};

use crate::extraction::Extraction;

/// Decodes a clip's audio track into `[AUDIO_SAMPLES]` mono samples.
#[derive(Clone)]
pub struct AudioFeatureExtractor {
    decoder: Arc<dyn ClipDecoder>,
}

impl AudioFeatureExtractor {
    pub fn new(decoder: Arc<dyn ClipDecoder>) -> Self {
        Self { decoder }
    }

    pub async fn extract(&self, clip: &Path) -> Extraction<Array1<f32>> {
        match self.decoder.decode_audio(clip, AUDIO_SAMPLE_RATE).await {
            Ok(audio) if audio.frames() > 0 => {
                debug!(
                    channels = audio.channels,
                    frames = audio.frames(),
                    "Audio decoded"
                );
                Extraction::Ok(normalize_waveform(&audio))
            }
            Ok(_) => {
                warn!("Audio track decoded to zero samples");
                Extraction::degraded(Array1::zeros(AUDIO_SAMPLES), "audio track is empty")
            }
            Err(e) => {
                warn!(error = %e, "Audio decode failed, using silence");
                Extraction::degraded(Array1::zeros(AUDIO_SAMPLES), e.to_string())
            }
        }
    }
}

/// Average channels to mono, then keep the first `AUDIO_SAMPLES` samples or
/// zero-pad on the right.
pub fn normalize_waveform(audio: &DecodedAudio) -> Array1<f32> {
    let channels = audio.channels.max(1) as usize;
    let mut out = Array1::<f32>::zeros(AUDIO_SAMPLES);

    for (slot, frame) in out
        .iter_mut()
        .zip(audio.samples.chunks_exact(channels))
    {
        *slot = frame.iter().sum::<f32>() / channels as f32;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use emo_media::{MediaError, MediaResult, RgbFrame};

    fn mono(len: usize) -> DecodedAudio {
        DecodedAudio {
            samples: (0..len).map(|i| (i % 7) as f32 * 0.1).collect(),
            channels: 1,
            sample_rate: AUDIO_SAMPLE_RATE,
        }
    }

    #[test]
    fn test_length_always_fixed() {
        for len in [0, 8000, 16000, 32000] {
            let wave = normalize_waveform(&mono(len));
            assert_eq!(wave.len(), AUDIO_SAMPLES, "input of {} samples", len);
        }
    }

    #[test]
    fn test_short_input_padded_right() {
        let wave = normalize_waveform(&mono(8000));
        assert!((wave[7999] - (7999 % 7) as f32 * 0.1).abs() < 1e-6);
        assert!(wave.iter().skip(8000).all(|v| *v == 0.0));
    }

    #[test]
    fn test_long_input_keeps_head() {
        let wave = normalize_waveform(&mono(32000));
        assert!((wave[15999] - (15999 % 7) as f32 * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_averaged() {
        let audio = DecodedAudio {
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
            channels: 2,
            sample_rate: AUDIO_SAMPLE_RATE,
        };
        let wave = normalize_waveform(&audio);
        assert_eq!(&wave.as_slice().unwrap()[..3], &[0.5, 0.5, 0.0]);
    }

    struct FakeDecoder {
        audio: Option<DecodedAudio>,
    }

    #[async_trait]
    impl ClipDecoder for FakeDecoder {
        async fn decode_audio(&self, _clip: &Path, _rate: u32) -> MediaResult<DecodedAudio> {
            self.audio.clone().ok_or(MediaError::NoAudioStream)
        }

        async fn frame_count(&self, _clip: &Path) -> MediaResult<u64> {
            Ok(0)
        }

        async fn sample_frames(
            &self,
            _clip: &Path,
            _stride: u64,
            _max_frames: usize,
            _size: u32,
        ) -> MediaResult<Vec<RgbFrame>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_missing_audio_degrades_to_silence() {
        let extractor = AudioFeatureExtractor::new(Arc::new(FakeDecoder { audio: None }));
        let result = extractor.extract(Path::new("clip.mp4")).await;
        assert!(result.is_degraded());
        assert!(result.reason().unwrap().contains("No audio stream"));
        assert_eq!(result.value().len(), AUDIO_SAMPLES);
        assert!(result.value().iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_empty_audio_degrades() {
        let extractor = AudioFeatureExtractor::new(Arc::new(FakeDecoder {
            audio: Some(mono(0)),
        }));
        assert!(extractor.extract(Path::new("clip.mp4")).await.is_degraded());
    }

    #[tokio::test]
    async fn test_decoded_audio_ok() {
        let extractor = AudioFeatureExtractor::new(Arc::new(FakeDecoder {
            audio: Some(mono(4000)),
        }));
        let result = extractor.extract(Path::new("clip.mp4")).await;
        assert!(!result.is_degraded());
        assert_eq!(result.value().len(), AUDIO_SAMPLES);
    }
}
