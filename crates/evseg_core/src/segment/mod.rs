use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::Sentence;
use crate::error::{AppError, SEGMENTATION_FAILURE};

/// Splits normalized text into ordered sentences.
///
/// Implementations are shared by reference across pipeline workers, so `split` must be safe to
/// call concurrently. A model that is not reentrant should be pooled behind this trait.
pub trait SentenceSource: Send + Sync {
    /// Deterministic for identical input. Elements may carry surrounding whitespace; callers
    /// go through [`sentences_for`] which trims and drops empties.
    fn split(&self, text: &str) -> Result<Vec<String>, AppError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Documents longer than this many characters fail segmentation for that document only.
    pub max_text_chars: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 5_000_000,
        }
    }
}

/// UAX #29 sentence boundaries.
#[derive(Debug, Clone, Default)]
pub struct UnicodeSentenceSource {
    config: SegmentationConfig,
}

impl UnicodeSentenceSource {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }
}

impl SentenceSource for UnicodeSentenceSource {
    fn split(&self, text: &str) -> Result<Vec<String>, AppError> {
        // Byte length bounds char count from above; only count when it could matter.
        if text.len() > self.config.max_text_chars {
            let chars = text.chars().count();
            if chars > self.config.max_text_chars {
                return Err(AppError::new(
                    SEGMENTATION_FAILURE,
                    "Text exceeds the sentence splitter processing limit",
                )
                .with_details(format!(
                    "chars={chars}; max_text_chars={}",
                    self.config.max_text_chars
                )));
            }
        }
        Ok(text.unicode_sentences().map(|s| s.to_string()).collect())
    }
}

/// Run `source` over `text` and keep non-empty trimmed sentences in order.
pub fn sentences_for(source: &dyn SentenceSource, text: &str) -> Result<Vec<Sentence>, AppError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw = source.split(text)?;
    Ok(raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(order_index, s)| Sentence {
            text: s.to_string(),
            order_index,
        })
        .collect())
}
