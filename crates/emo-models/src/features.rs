//! Feature tensor dimensions.
//!
//! Extraction and fusion must agree on these shapes; both crates read them
//! from here.

/// Audio decode sample rate (Hz)
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;
/// Audio waveform length in samples
pub const AUDIO_SAMPLES: usize = 16_000;

/// Number of sampled video frames
pub const NUM_FRAMES: usize = 16;
/// Frame width and height after resize
pub const FRAME_SIZE: usize = 112;
/// RGB channels per frame
pub const FRAME_CHANNELS: usize = 3;

/// Token sequence length (including markers and padding)
pub const TEXT_MAX_TOKENS: usize = 128;

/// Text embedding width
pub const TEXT_EMBED_DIM: usize = 128;
/// Audio embedding width
pub const AUDIO_EMBED_DIM: usize = 32;
/// Visual embedding width
pub const VISUAL_EMBED_DIM: usize = 512;
/// Concatenated fusion vector width
pub const FUSION_DIM: usize = TEXT_EMBED_DIM + AUDIO_EMBED_DIM + VISUAL_EMBED_DIM;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion_dim() {
        assert_eq!(FUSION_DIM, 672);
    }
}
