//! Text hint tokenization to fixed-length id/mask pairs.
//!
//! Wraps a Hugging Face `tokenizer.json` (BERT uncased in production) with
//! truncation and fixed padding at `TEXT_MAX_TOKENS`.

use std::path::Path;
use std::sync::Arc;

use emo_models::features::TEXT_MAX_TOKENS;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::error::{FeatureError, FeatureResult};
use crate::extraction::Extraction;

const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const PAD: &str = "[PAD]";

/// Token ids and attention mask, both `TEXT_MAX_TOKENS` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFeature {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl TextFeature {
    /// Number of unmasked positions.
    pub fn len(&self) -> usize {
        self.attention_mask.iter().filter(|m| **m == 1).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `[CLS] pieces [SEP] [PAD]...` encoder.
#[derive(Debug, Clone)]
pub struct TextTokenizer {
    inner: Tokenizer,
    /// Encoding of the empty hint
    empty: TextFeature,
}

impl TextTokenizer {
    /// Load a serialized `tokenizer.json`.
    pub fn from_file(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| FeatureError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let tokenizer = Self::configure(inner)?;
        info!(
            path = %path.display(),
            vocab_size = tokenizer.vocab_size(),
            "Loaded tokenizer"
        );
        Ok(tokenizer)
    }

    /// Parse an in-memory `tokenizer.json`.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> FeatureResult<Self> {
        let inner = Tokenizer::from_bytes(bytes).map_err(FeatureError::tokenizer)?;
        Self::configure(inner)
    }

    fn configure(mut inner: Tokenizer) -> FeatureResult<Self> {
        for token in [CLS, SEP] {
            if inner.token_to_id(token).is_none() {
                return Err(FeatureError::MissingSpecialToken(token));
            }
        }
        let pad_id = inner
            .token_to_id(PAD)
            .ok_or(FeatureError::MissingSpecialToken(PAD))?;

        inner
            .with_truncation(Some(TruncationParams {
                max_length: TEXT_MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(FeatureError::tokenizer)?;
        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(TEXT_MAX_TOKENS),
            pad_id,
            pad_token: PAD.to_string(),
            ..Default::default()
        }));

        let empty = encode_with(&inner, "")?;
        Ok(Self { inner, empty })
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Encode `text` with markers, truncated and padded to `TEXT_MAX_TOKENS`.
    pub fn encode(&self, text: &str) -> FeatureResult<TextFeature> {
        encode_with(&self.inner, text)
    }

    /// Encoding of the empty hint, `[CLS] [SEP]` + padding.
    pub fn empty(&self) -> &TextFeature {
        &self.empty
    }
}

fn encode_with(tokenizer: &Tokenizer, text: &str) -> FeatureResult<TextFeature> {
    let encoding = tokenizer.encode(text, true).map_err(FeatureError::tokenizer)?;

    let input_ids = encoding.get_ids().to_vec();
    let attention_mask = encoding.get_attention_mask().to_vec();
    if input_ids.len() != TEXT_MAX_TOKENS || attention_mask.len() != TEXT_MAX_TOKENS {
        return Err(FeatureError::Tokenizer(format!(
            "expected {} positions, tokenizer produced {}",
            TEXT_MAX_TOKENS,
            input_ids.len()
        )));
    }

    Ok(TextFeature {
        input_ids,
        attention_mask,
    })
}

/// Tokenizes the optional text hint.
#[derive(Debug, Clone)]
pub struct TextFeatureExtractor {
    tokenizer: Arc<TextTokenizer>,
}

impl TextFeatureExtractor {
    pub fn new(tokenizer: Arc<TextTokenizer>) -> Self {
        Self { tokenizer }
    }

    /// An empty hint yields `[CLS] [SEP]` + padding. Encoding failures fall
    /// back to that same feature.
    pub fn extract(&self, hint: &str) -> Extraction<TextFeature> {
        match self.tokenizer.encode(hint) {
            Ok(feature) => Extraction::Ok(feature),
            Err(e) => Extraction::degraded(self.tokenizer.empty().clone(), e.to_string()),
        }
    }
}

/// Small in-memory tokenizers for tests in this and downstream crates.
#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use serde_json::{json, Map, Value};

    use super::TextTokenizer;

    /// Vocabulary of [`tiny_tokenizer`], in id order.
    pub const TINY_VOCAB: &[&str] = &[
        "[PAD]", "[UNK]", "[CLS]", "[SEP]", "i", "am", "so", "happy", "un", "##happy", "!", "to",
        "##day", "day", ",",
    ];

    /// BERT-style uncased WordPiece `tokenizer.json` over `vocab` (id order).
    /// The first four entries must be `[PAD] [UNK] [CLS] [SEP]`.
    pub fn bert_tokenizer_json(vocab: &[&str]) -> String {
        let ids: Map<String, Value> = vocab
            .iter()
            .enumerate()
            .map(|(id, token)| (token.to_string(), json!(id)))
            .collect();
        let special = |id: usize| {
            json!({
                "id": id,
                "content": vocab[id],
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        };

        json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": (0..4).map(special).collect::<Vec<_>>(),
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": [vocab[3], 3],
                "cls": [vocab[2], 2]
            },
            "decoder": { "type": "WordPiece", "prefix": "##", "cleanup": true },
            "model": {
                "type": "WordPiece",
                "unk_token": vocab[1],
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": ids
            }
        })
        .to_string()
    }

    pub fn tiny_tokenizer() -> TextTokenizer {
        TextTokenizer::from_bytes(bert_tokenizer_json(TINY_VOCAB)).expect("valid tokenizer.json")
    }
}
