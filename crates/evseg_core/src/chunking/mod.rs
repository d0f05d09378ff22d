use serde::{Deserialize, Serialize};

use crate::domain::{Chunk, Sentence};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound, in characters, on a window before its overflow sentence is added.
    pub chunk_size: usize,
    /// Trailing sentences of each emitted chunk repeated at the start of the next.
    pub overlap_sentences: usize,
    /// A trailing window must be longer than this to be emitted.
    pub min_final_chunk_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap_sentences: 2,
            min_final_chunk_length: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "chunk_size must be a positive integer",
            ));
        }
        Ok(())
    }
}

// Every sentence costs its length plus one separator, both while accumulating and when a
// seeded window is re-measured.
fn sentence_cost(s: &Sentence) -> usize {
    s.char_len() + 1
}

fn window_cost(window: &[Sentence]) -> usize {
    window.iter().map(sentence_cost).sum()
}

/// Greedy sentence-respecting sliding window.
///
/// Sentences are never split: one that alone exceeds `chunk_size` becomes (part of) a chunk
/// that exceeds the bound. Adjacent chunks share `min(overlap_sentences, len(previous))`
/// sentences.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    config: ChunkingConfig,
}

impl ChunkBuilder {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn build(&self, sentences: &[Sentence]) -> Vec<Chunk> {
        let cfg = &self.config;
        let mut out: Vec<Chunk> = Vec::new();
        let mut window: Vec<Sentence> = Vec::new();
        let mut window_len: usize = 0;

        for sentence in sentences {
            if window_len + sentence.char_len() < cfg.chunk_size {
                window_len += sentence_cost(sentence);
                window.push(sentence.clone());
                continue;
            }

            if !window.is_empty() {
                let keep = cfg.overlap_sentences.min(window.len());
                let seed = window[window.len() - keep..].to_vec();
                let emitted = std::mem::replace(&mut window, seed);
                out.push(Chunk {
                    sentences: emitted,
                    sequence_index: out.len(),
                });
            }
            window.push(sentence.clone());
            window_len = window_cost(&window);
        }

        if !window.is_empty() {
            let joined_len = window_len - 1;
            // An overlong remainder is real content, not debris.
            if joined_len > cfg.min_final_chunk_length || joined_len >= cfg.chunk_size {
                out.push(Chunk {
                    sentences: window,
                    sequence_index: out.len(),
                });
            }
        }

        out
    }
}

/// Convenience wrapper over [`ChunkBuilder::build`].
pub fn build_chunks(sentences: &[Sentence], config: &ChunkingConfig) -> Vec<Chunk> {
    ChunkBuilder::new(*config).build(sentences)
}
