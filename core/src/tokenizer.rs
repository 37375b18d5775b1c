use anyhow::{Context, Result};
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Maps a lowercase token to its stem. Implementations must be deterministic
/// and free of external state, otherwise the stem cache changes results.
pub trait Stem {
    fn stem(&self, token: &str) -> String;
}

impl Stem for Stemmer {
    fn stem(&self, token: &str) -> String {
        Stemmer::stem(self, token).into_owned()
    }
}

/// English (Porter2) stemmer from `rust-stemmers`.
pub fn english_stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(Into::into).collect() }
    }

    /// One stopword per line; surrounding whitespace is trimmed and blank lines ignored.
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|w| !w.is_empty()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading stopwords from {}", path.display()))?;
        let stopwords = Self::parse(&text);
        tracing::info!(path = %path.display(), count = stopwords.len(), "loaded stopwords");
        Ok(stopwords)
    }

    pub fn contains(&self, word: &str) -> bool { self.words.contains(word) }
    pub fn len(&self) -> usize { self.words.len() }
    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

/// Turns raw text into normalized terms: strip punctuation, lowercase,
/// drop stopwords, stem. Stems are memoized per instance.
pub struct Normalizer<S = Stemmer> {
    stopwords: Stopwords,
    stemmer: S,
    cache: HashMap<String, String>,
}

impl Normalizer<Stemmer> {
    pub fn english(stopwords: Stopwords) -> Self {
        Self::new(stopwords, english_stemmer())
    }
}

impl<S: Stem> Normalizer<S> {
    pub fn new(stopwords: Stopwords, stemmer: S) -> Self {
        Self { stopwords, stemmer, cache: HashMap::new() }
    }

    /// Normalize one whitespace-delimited token. `None` for stopwords. A token
    /// made only of punctuation yields the empty term, which still counts
    /// toward document length.
    pub fn normalize_token(&mut self, raw: &str) -> Option<String> {
        let stripped = raw.trim_matches(|c: char| c.is_ascii_punctuation());
        let lower = stripped.to_lowercase();
        if self.stopwords.contains(&lower) {
            return None;
        }
        if lower.is_empty() {
            return Some(lower);
        }
        if let Some(stem) = self.cache.get(&lower) {
            return Some(stem.clone());
        }
        let stem = self.stemmer.stem(&lower);
        self.cache.insert(lower, stem.clone());
        Some(stem)
    }

    /// Normalize a line of text into its sequence of terms.
    pub fn normalize(&mut self, text: &str) -> Vec<String> {
        text.split_whitespace().filter_map(|raw| self.normalize_token(raw)).collect()
    }

    pub fn stopwords(&self) -> &Stopwords { &self.stopwords }

    /// Number of distinct tokens stemmed so far.
    pub fn cached_stems(&self) -> usize { self.cache.len() }
}
