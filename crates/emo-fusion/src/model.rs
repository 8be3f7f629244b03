//! Multimodal fusion classifier.
//!
//! Three modality towers produce fixed-width embeddings which are
//! concatenated and passed through a two-layer head:
//!
//! | tower  | input                 | output |
//! |--------|-----------------------|--------|
//! | text   | 128 token ids + mask  | 128    |
//! | audio  | 16000 samples         | 32     |
//! | visual | `[3, 16, 112, 112]`   | 512    |
//!
//! The text tower is a BERT encoder run through candle; the convolution
//! towers and the head run on ndarray. Weights are read once and never
//! mutated; inference takes `&self`, so a single classifier can be shared
//! across requests behind an `Arc`.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use emo_features::{FeatureSet, TextFeature};
use emo_models::features::{
    AUDIO_EMBED_DIM, AUDIO_SAMPLES, FRAME_CHANNELS, FRAME_SIZE, FUSION_DIM, NUM_FRAMES, TEXT_EMBED_DIM,
    TEXT_MAX_TOKENS, VISUAL_EMBED_DIM,
};
use emo_models::{EmotionLabel, FusionOutput};
use ndarray::{concatenate, Array1, Array4, ArrayView1, Axis, Ix1, Ix2, Ix3, Ix5};
use tracing::{debug, info};

use crate::compute::ComputeMode;
use crate::error::{FusionError, FusionResult};
use crate::layers::{adaptive_avg_pool1d, relu_inplace, spatial_mean, Conv1d, Conv3d, Linear};
use crate::weights::TensorStore;

/// Audio feature maps are pooled to this many bins before averaging.
const AUDIO_POOL_BINS: usize = 128;
const HEAD_HIDDEN: usize = 128;

const AUDIO_CONV1_CHANNELS: usize = 16;
const VISUAL_CONV1_CHANNELS: usize = 16;
const VISUAL_CONV2_CHANNELS: usize = VISUAL_EMBED_DIM / NUM_FRAMES;

/// Read a BERT `config.json` describing the text encoder.
pub fn load_text_encoder_config(path: impl AsRef<Path>) -> FusionResult<BertConfig> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|source| FusionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|e| FusionError::Config(format!("{}: {}", path.display(), e)))
}

/// Text tower: BERT encoder, mean over all positions, projection.
pub struct TextTower {
    bert: BertModel,
    fc: Linear,
    vocab_size: usize,
    device: Device,
}

impl TextTower {
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn forward(&self, text: &TextFeature) -> FusionResult<Array1<f32>> {
        if text.input_ids.len() != TEXT_MAX_TOKENS || text.attention_mask.len() != TEXT_MAX_TOKENS {
            return Err(FusionError::invalid_input(format!(
                "text feature must have {} positions",
                TEXT_MAX_TOKENS
            )));
        }
        if let Some(id) = text.input_ids.iter().find(|id| **id as usize >= self.vocab_size) {
            return Err(FusionError::invalid_input(format!(
                "token id {} outside vocabulary of {}",
                id, self.vocab_size
            )));
        }

        let input_ids = Tensor::new(text.input_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(text.attention_mask.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [1, seq, hidden]
        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Padding positions are included in the mean
        let pooled: Vec<f32> = hidden.mean(1)?.squeeze(0)?.to_vec1()?;
        Ok(self.fc.forward(ArrayView1::from(pooled.as_slice())))
    }
}

impl fmt::Debug for TextTower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextTower")
            .field("vocab_size", &self.vocab_size)
            .field("fc", &self.fc)
            .finish_non_exhaustive()
    }
}

/// Audio tower: two strided 1-D convolutions, pooled and averaged.
#[derive(Debug, Clone)]
pub struct AudioTower {
    conv1: Conv1d,
    conv2: Conv1d,
}

impl AudioTower {
    pub fn forward(&self, waveform: ArrayView1<f32>) -> FusionResult<Array1<f32>> {
        if waveform.len() != AUDIO_SAMPLES {
            return Err(FusionError::invalid_input(format!(
                "audio feature must have {} samples, got {}",
                AUDIO_SAMPLES,
                waveform.len()
            )));
        }

        let input = waveform.insert_axis(Axis(0));
        let mut x = self.conv1.forward(input);
        relu_inplace(&mut x);
        let mut x = self.conv2.forward(x.view());
        relu_inplace(&mut x);

        let pooled = adaptive_avg_pool1d(x.view(), AUDIO_POOL_BINS);
        Ok(pooled
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(AUDIO_EMBED_DIM)))
    }
}

/// Visual tower: two 3-D convolutions, then a per-frame spatial mean.
#[derive(Debug, Clone)]
pub struct VisualTower {
    conv1: Conv3d,
    conv2: Conv3d,
}

impl VisualTower {
    pub fn forward(&self, frames: &Array4<f32>, mode: ComputeMode) -> FusionResult<Array1<f32>> {
        let expected = (FRAME_CHANNELS, NUM_FRAMES, FRAME_SIZE, FRAME_SIZE);
        if frames.dim() != expected {
            return Err(FusionError::invalid_input(format!(
                "visual feature must have shape {:?}, got {:?}",
                expected,
                frames.dim()
            )));
        }

        let mut x = self.conv1.forward(frames, mode);
        relu_inplace(&mut x);
        let mut x = self.conv2.forward(&x, mode);
        relu_inplace(&mut x);

        // [channels, frames] flattened channel-major
        Ok(spatial_mean(&x).iter().copied().collect())
    }
}

/// Fusion head over the concatenated embeddings.
#[derive(Debug, Clone)]
pub struct FusionHead {
    fc1: Linear,
    fc2: Linear,
}

impl FusionHead {
    /// Returns raw logits.
    pub fn forward(&self, fused: ArrayView1<f32>) -> Array1<f32> {
        let mut hidden = self.fc1.forward(fused);
        relu_inplace(&mut hidden);
        self.fc2.forward(hidden.view())
    }
}

/// Loaded fusion classifier.
#[derive(Debug)]
pub struct FusionClassifier {
    text: TextTower,
    audio: AudioTower,
    visual: VisualTower,
    head: FusionHead,
    mode: ComputeMode,
}

impl FusionClassifier {
    /// Load weights from a file.
    pub fn load(path: impl AsRef<Path>, encoder: &BertConfig, mode: ComputeMode) -> FusionResult<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let store = TensorStore::load(path)?;
        let model = Self::from_store(store, encoder, mode)?;
        info!(
            path = %path.display(),
            vocab_size = model.text.vocab_size(),
            mode = %mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded fusion model"
        );
        Ok(model)
    }

    /// Build from a weight file, validating every shape.
    pub fn from_store(store: TensorStore, encoder: &BertConfig, mode: ComputeMode) -> FusionResult<Self> {
        let text_fc = linear(&store, "text_fc", TEXT_EMBED_DIM, encoder.hidden_size)?;

        let audio = AudioTower {
            conv1: conv1d(&store, "audio_cnn.0", AUDIO_CONV1_CHANNELS, 1)?,
            conv2: conv1d(&store, "audio_cnn.2", AUDIO_EMBED_DIM, AUDIO_CONV1_CHANNELS)?,
        };

        let visual = VisualTower {
            conv1: conv3d(&store, "video_cnn.0", VISUAL_CONV1_CHANNELS, FRAME_CHANNELS)?,
            conv2: conv3d(&store, "video_cnn.2", VISUAL_CONV2_CHANNELS, VISUAL_CONV1_CHANNELS)?,
        };

        let head = FusionHead {
            fc1: linear(&store, "fc.0", HEAD_HIDDEN, FUSION_DIM)?,
            fc2: linear(&store, "fc.3", EmotionLabel::COUNT, HEAD_HIDDEN)?,
        };

        let device = Device::Cpu;
        let vb = store.into_var_builder(&device)?;
        let bert = BertModel::load(vb.pp("bert"), encoder)?;
        debug!(
            hidden = encoder.hidden_size,
            layers = encoder.num_hidden_layers,
            "Loaded text encoder"
        );

        let text = TextTower {
            bert,
            fc: text_fc,
            vocab_size: encoder.vocab_size,
            device,
        };

        Ok(Self {
            text,
            audio,
            visual,
            head,
            mode,
        })
    }

    pub fn mode(&self) -> ComputeMode {
        self.mode
    }

    pub fn vocab_size(&self) -> usize {
        self.text.vocab_size()
    }

    /// Concatenated `[text | audio | visual]` embedding.
    pub fn embed(&self, features: &FeatureSet) -> FusionResult<Array1<f32>> {
        let text = self.text.forward(&features.text)?;
        let audio = self.audio.forward(features.audio.view())?;
        let visual = self.visual.forward(&features.visual, self.mode)?;

        concatenate(Axis(0), &[text.view(), audio.view(), visual.view()])
            .map_err(|e| FusionError::invalid_input(e.to_string()))
    }

    /// Classify one feature set.
    pub fn predict(&self, features: &FeatureSet) -> FusionResult<FusionOutput> {
        let start = Instant::now();
        let fused = self.embed(features)?;
        debug_assert_eq!(fused.len(), FUSION_DIM);

        let logits = self.head.forward(fused.view());
        let logits = logits.as_slice().ok_or(FusionError::NonFinite)?;
        let output = FusionOutput::from_logits(logits).ok_or(FusionError::NonFinite)?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fusion inference complete"
        );
        Ok(output)
    }
}

fn linear(store: &TensorStore, prefix: &str, out: usize, input: usize) -> FusionResult<Linear> {
    Ok(Linear {
        weight: store.take::<Ix2>(&format!("{}.weight", prefix), &[out, input])?,
        bias: store.take::<Ix1>(&format!("{}.bias", prefix), &[out])?,
    })
}

fn conv1d(store: &TensorStore, prefix: &str, out: usize, input: usize) -> FusionResult<Conv1d> {
    Ok(Conv1d {
        weight: store.take::<Ix3>(&format!("{}.weight", prefix), &[out, input, 5])?,
        bias: store.take::<Ix1>(&format!("{}.bias", prefix), &[out])?,
        stride: 2,
        padding: 2,
    })
}

fn conv3d(store: &TensorStore, prefix: &str, out: usize, input: usize) -> FusionResult<Conv3d> {
    Ok(Conv3d {
        weight: store.take::<Ix5>(&format!("{}.weight", prefix), &[out, input, 3, 3, 3])?,
        bias: store.take::<Ix1>(&format!("{}.bias", prefix), &[out])?,
    })
}

/// Deterministic small random weights for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use super::*;
    use crate::weights::serialize_tensors;

    const ENCODER_LAYERS: usize = 1;
    const ENCODER_HEADS: usize = 2;

    /// One-layer BERT config with the given vocabulary and hidden width.
    pub fn tiny_encoder_config(vocab: usize, hidden: usize) -> BertConfig {
        let config = serde_json::json!({
            "vocab_size": vocab,
            "hidden_size": hidden,
            "num_hidden_layers": ENCODER_LAYERS,
            "num_attention_heads": ENCODER_HEADS,
            "intermediate_size": hidden * 2,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.1,
            "max_position_embeddings": TEXT_MAX_TOKENS,
            "type_vocab_size": 2,
            "initializer_range": 0.02,
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0,
            "position_embedding_type": "absolute",
            "use_cache": true,
            "classifier_dropout": null,
            "model_type": "bert"
        });
        serde_json::from_value(config).unwrap_or_else(|e| panic!("tiny encoder config must parse: {}", e))
    }

    fn encoder_shapes(vocab: usize, hidden: usize) -> Vec<(String, Vec<usize>)> {
        let intermediate = hidden * 2;
        let mut shapes = vec![
            ("bert.embeddings.word_embeddings.weight".to_string(), vec![vocab, hidden]),
            (
                "bert.embeddings.position_embeddings.weight".to_string(),
                vec![TEXT_MAX_TOKENS, hidden],
            ),
            ("bert.embeddings.token_type_embeddings.weight".to_string(), vec![2, hidden]),
            ("bert.embeddings.LayerNorm.weight".to_string(), vec![hidden]),
            ("bert.embeddings.LayerNorm.bias".to_string(), vec![hidden]),
        ];
        for layer in 0..ENCODER_LAYERS {
            let p = format!("bert.encoder.layer.{}", layer);
            for (name, out, input) in [
                ("attention.self.query", hidden, hidden),
                ("attention.self.key", hidden, hidden),
                ("attention.self.value", hidden, hidden),
                ("attention.output.dense", hidden, hidden),
                ("intermediate.dense", intermediate, hidden),
                ("output.dense", hidden, intermediate),
            ] {
                shapes.push((format!("{}.{}.weight", p, name), vec![out, input]));
                shapes.push((format!("{}.{}.bias", p, name), vec![out]));
            }
            for norm in ["attention.output.LayerNorm", "output.LayerNorm"] {
                shapes.push((format!("{}.{}.weight", p, norm), vec![hidden]));
                shapes.push((format!("{}.{}.bias", p, norm), vec![hidden]));
            }
        }
        shapes
    }

    /// Tensor names and shapes of a complete model.
    pub fn tensor_shapes(vocab: usize, hidden: usize) -> Vec<(String, Vec<usize>)> {
        let mut shapes = encoder_shapes(vocab, hidden);
        shapes.extend([
            ("text_fc.weight".to_string(), vec![TEXT_EMBED_DIM, hidden]),
            ("text_fc.bias".to_string(), vec![TEXT_EMBED_DIM]),
            ("audio_cnn.0.weight".to_string(), vec![AUDIO_CONV1_CHANNELS, 1, 5]),
            ("audio_cnn.0.bias".to_string(), vec![AUDIO_CONV1_CHANNELS]),
            ("audio_cnn.2.weight".to_string(), vec![AUDIO_EMBED_DIM, AUDIO_CONV1_CHANNELS, 5]),
            ("audio_cnn.2.bias".to_string(), vec![AUDIO_EMBED_DIM]),
            (
                "video_cnn.0.weight".to_string(),
                vec![VISUAL_CONV1_CHANNELS, FRAME_CHANNELS, 3, 3, 3],
            ),
            ("video_cnn.0.bias".to_string(), vec![VISUAL_CONV1_CHANNELS]),
            (
                "video_cnn.2.weight".to_string(),
                vec![VISUAL_CONV2_CHANNELS, VISUAL_CONV1_CHANNELS, 3, 3, 3],
            ),
            ("video_cnn.2.bias".to_string(), vec![VISUAL_CONV2_CHANNELS]),
            ("fc.0.weight".to_string(), vec![HEAD_HIDDEN, FUSION_DIM]),
            ("fc.0.bias".to_string(), vec![HEAD_HIDDEN]),
            ("fc.3.weight".to_string(), vec![EmotionLabel::COUNT, HEAD_HIDDEN]),
            ("fc.3.bias".to_string(), vec![EmotionLabel::COUNT]),
        ]);
        shapes.sort();
        shapes
    }

    /// Named tensors with values in `[-0.1, 0.1)` from a fixed seed.
    pub fn random_tensors(vocab: usize, hidden: usize, seed: u64) -> Vec<(String, Vec<usize>, Vec<f32>)> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            // xorshift64*
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            let bits = state.wrapping_mul(0x2545F4914F6CDD1D) >> 40;
            (bits as f32 / (1u64 << 24) as f32) * 0.2 - 0.1
        };

        tensor_shapes(vocab, hidden)
            .into_iter()
            .map(|(name, shape)| {
                let n: usize = shape.iter().product();
                let values = (0..n).map(|_| next()).collect();
                (name, shape, values)
            })
            .collect()
    }

    pub fn weight_file(tensors: &[(String, Vec<usize>, Vec<f32>)]) -> Vec<u8> {
        serialize_tensors(
            tensors
                .iter()
                .map(|(n, s, v)| (n.as_str(), s.as_slice(), v.as_slice())),
        )
        .unwrap_or_else(|e| panic!("test tensors must serialize: {}", e))
    }

    /// Serialized [`random_tensors`].
    pub fn random_weight_file(vocab: usize, hidden: usize, seed: u64) -> Vec<u8> {
        weight_file(&random_tensors(vocab, hidden, seed))
    }

    /// Classifier built from [`random_weight_file`].
    pub fn random_classifier(vocab: usize, hidden: usize, seed: u64, mode: ComputeMode) -> FusionClassifier {
        let bytes = random_weight_file(vocab, hidden, seed);
        TensorStore::from_bytes(bytes)
            .and_then(|store| FusionClassifier::from_store(store, &tiny_encoder_config(vocab, hidden), mode))
            .unwrap_or_else(|e| panic!("random weights must load: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn zero_features() -> FeatureSet {
        let mut input_ids = vec![0u32; TEXT_MAX_TOKENS];
        let mut attention_mask = vec![0u32; TEXT_MAX_TOKENS];
        input_ids[0] = 2;
        input_ids[1] = 3;
        attention_mask[0] = 1;
        attention_mask[1] = 1;

        FeatureSet {
            text: TextFeature {
                input_ids,
                attention_mask,
            },
            audio: Array1::zeros(AUDIO_SAMPLES),
            visual: Array4::zeros((FRAME_CHANNELS, NUM_FRAMES, FRAME_SIZE, FRAME_SIZE)),
        }
    }

    fn varied_features() -> FeatureSet {
        let mut features = zero_features();
        features.audio = Array1::from_shape_fn(AUDIO_SAMPLES, |i| ((i as f32) * 0.01).sin() * 0.5);
        features.visual = Array4::from_shape_fn(features.visual.dim(), |(c, t, y, x)| {
            ((c * 31 + t * 7 + y * 3 + x) % 255) as f32 / 255.0
        });
        features.text.input_ids[2] = 9;
        features.text.attention_mask[2] = 1;
        features
    }

    fn assert_distribution(output: &FusionOutput) {
        let sum: f32 = output.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum {}", sum);
        assert!(output.probabilities().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_zero_inputs_give_distribution() {
        let model = random_classifier(16, 8, 7, ComputeMode::Sequential);
        assert_distribution(&model.predict(&zero_features()).unwrap());
    }

    #[test]
    fn test_varied_inputs_give_distribution() {
        let model = random_classifier(16, 8, 11, ComputeMode::Parallel);
        assert_distribution(&model.predict(&varied_features()).unwrap());
    }

    #[test]
    fn test_embedding_width() {
        let model = random_classifier(16, 8, 3, ComputeMode::Sequential);
        let fused = model.embed(&varied_features()).unwrap();
        assert_eq!(fused.len(), FUSION_DIM);
    }

    #[test]
    fn test_modes_agree() {
        let seq = random_classifier(16, 8, 5, ComputeMode::Sequential);
        let par = random_classifier(16, 8, 5, ComputeMode::Parallel);
        let features = varied_features();

        let a = seq.predict(&features).unwrap();
        let b = par.predict(&features).unwrap();
        for (x, y) in a.probabilities().iter().zip(b.probabilities()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_inference_is_deterministic() {
        let model = random_classifier(16, 8, 9, ComputeMode::Parallel);
        let features = varied_features();
        assert_eq!(model.predict(&features).unwrap(), model.predict(&features).unwrap());
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let model = random_classifier(16, 8, 1, ComputeMode::Sequential);

        let mut features = zero_features();
        features.audio = Array1::zeros(100);
        assert!(matches!(model.predict(&features), Err(FusionError::InvalidInput(_))));

        let mut features = zero_features();
        features.text.input_ids[1] = 1000;
        assert!(matches!(model.predict(&features), Err(FusionError::InvalidInput(_))));
    }

    #[test]
    fn test_text_hint_changes_embedding() {
        let model = random_classifier(16, 8, 4, ComputeMode::Sequential);
        let plain = zero_features();
        let hinted = varied_features();

        let a = model.text.forward(&plain.text).unwrap();
        let b = model.text.forward(&hinted.text).unwrap();
        assert_eq!(a.len(), TEXT_EMBED_DIM);
        assert!(a.iter().zip(b.iter()).any(|(x, y)| (x - y).abs() > 1e-6));
    }

    #[test]
    fn test_tokenizer_output_feeds_text_tower() {
        let model = random_classifier(16, 8, 6, ComputeMode::Sequential);
        let tokenizer = emo_features::text::testing::tiny_tokenizer();
        let text = tokenizer.encode("I am so happy today!").unwrap();
        assert!(model.text.forward(&text).is_ok());
    }

    #[test]
    fn test_missing_tensor_fails_load() {
        let bytes = crate::weights::serialize_tensors([(
            "bert.embeddings.word_embeddings.weight",
            &[4usize, 2][..],
            &[0.0f32; 8][..],
        )])
        .unwrap();
        let store = TensorStore::from_bytes(bytes).unwrap();
        assert!(matches!(
            FusionClassifier::from_store(store, &tiny_encoder_config(4, 2), ComputeMode::Sequential),
            Err(FusionError::MissingTensor(_))
        ));
    }

    #[test]
    fn test_missing_encoder_tensor_fails_load() {
        let tensors: Vec<_> = random_tensors(16, 8, 2)
            .into_iter()
            .filter(|(name, _, _)| !name.starts_with("bert.encoder.layer.0.intermediate"))
            .collect();
        let store = TensorStore::from_bytes(weight_file(&tensors)).unwrap();
        assert!(matches!(
            FusionClassifier::from_store(store, &tiny_encoder_config(16, 8), ComputeMode::Sequential),
            Err(FusionError::Candle(_))
        ));
    }

    #[test]
    fn test_encoder_width_must_match_projection() {
        let store = TensorStore::from_bytes(random_weight_file(16, 8, 2)).unwrap();
        assert!(matches!(
            FusionClassifier::from_store(store, &tiny_encoder_config(16, 4), ComputeMode::Sequential),
            Err(FusionError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        std::fs::write(&path, random_weight_file(16, 8, 2)).unwrap();

        let config_path = dir.path().join("bert_config.json");
        let config = serde_json::to_string(&serde_json::json!({
            "vocab_size": 16,
            "hidden_size": 8,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 16,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.1,
            "max_position_embeddings": 128,
            "type_vocab_size": 2,
            "initializer_range": 0.02,
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0
        }))
        .unwrap();
        std::fs::write(&config_path, config).unwrap();

        let encoder = load_text_encoder_config(&config_path).unwrap();
        let model = FusionClassifier::load(&path, &encoder, ComputeMode::Sequential).unwrap();
        assert_eq!(model.vocab_size(), 16);

        assert!(matches!(
            FusionClassifier::load(dir.path().join("missing.safetensors"), &encoder, ComputeMode::Sequential),
            Err(FusionError::Io { .. })
        ));

        std::fs::write(&config_path, "{}").unwrap();
        assert!(matches!(
            load_text_encoder_config(&config_path),
            Err(FusionError::Config(_))
        ));
    }
}
