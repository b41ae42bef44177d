//! Query segmentation.
//!
//! Shop queries are mostly Chinese and carry no spaces, so token-level
//! matching needs a word segmenter. [`Segmenter`] wraps one process-wide
//! `jieba_rs::Jieba` (HMM enabled); loading its dictionary is the expensive
//! part and happens once, on first use.

use std::sync::OnceLock;

use jieba_rs::Jieba;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

/// Cheap handle to the shared segmenter.
#[derive(Clone, Copy)]
pub struct Segmenter {
    jieba: &'static Jieba,
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segmenter").finish_non_exhaustive()
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::shared()
    }
}

impl Segmenter {
    /// Handle to the process-wide segmenter, initializing it on first call.
    pub fn shared() -> Self {
        let jieba = JIEBA.get_or_init(|| {
            tracing::debug!("Loading jieba dictionary");
            Jieba::new()
        });
        Self { jieba }
    }

    /// Segment `text` and keep segments of at least `min_chars` characters.
    ///
    /// Order and duplicates are preserved.
    pub fn tokens<'a>(&self, text: &'a str, min_chars: usize) -> Vec<&'a str> {
        self.jieba
            .cut(text, true)
            .into_iter()
            .filter(|w| w.chars().count() >= min_chars)
            .collect()
    }

    /// Split on whitespace and keep tokens of at least `min_chars` characters.
    pub fn whitespace_tokens(text: &str, min_chars: usize) -> Vec<&str> {
        text.split_whitespace()
            .filter(|w| w.chars().count() >= min_chars)
            .collect()
    }
}
