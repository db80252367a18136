//! Deterministic keyword embedder.
//!
//! Each dimension counts one vocabulary word; the count vector is then
//! L2-normalised. Texts sharing vocabulary words score high, texts sharing
//! none score 0.0. Useful wherever a real model is too slow or
//! nondeterministic, mainly tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{EmbeddingError, EmbeddingGateway, l2_normalize};
use crate::memory::Metadata;

/// Term-count embedder over a fixed vocabulary, with failure injection.
#[derive(Debug, Default)]
pub struct KeywordGateway {
    vocabulary: HashMap<String, usize>,
    failures: HashSet<String>,
    batch_calls: AtomicUsize,
}

impl KeywordGateway {
    /// Build a gateway whose dimension is the number of distinct words.
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = HashMap::new();
        for word in vocabulary {
            let word = word.as_ref().to_lowercase();
            let next = words.len();
            words.entry(word).or_insert(next);
        }
        Self {
            vocabulary: words,
            failures: HashSet::new(),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Fail with `EmbeddingError::Provider` whenever `text` is embedded.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.failures.insert(text.into());
        self
    }

    /// Vector length produced by this gateway.
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of `batch_embed` calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.failures.contains(text) {
            return Err(EmbeddingError::Provider(format!(
                "refusing to embed {:?}",
                text
            )));
        }

        let mut counts = vec![0.0f32; self.vocabulary.len()];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(&dim) = self.vocabulary.get(&token.to_lowercase()) {
                counts[dim] += 1.0;
            }
        }
        Ok(l2_normalize(&counts))
    }
}

impl EmbeddingGateway for KeywordGateway {
    fn embed(&self, text: &str, _metadata: Option<&Metadata>) -> Result<Vec<f32>, EmbeddingError> {
        self.vectorize(text)
    }

    fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|text| self.vectorize(text)).collect()
    }
}
