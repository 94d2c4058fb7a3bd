//! TF-IDF vectorizer loaded from an exported vocabulary.
//!
//! The export mirrors the fitted vectorizer's state: vocabulary, idf
//! weights and the analyzer settings used during training. Terms are
//! produced exactly as the fitted analyzer produced them, so indices line
//! up with the columns the regression model was trained on.

use crate::features::SparseVector;
use crate::models::TextVectorizer;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("static regex is valid"));

/// How documents are split into terms
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Word n-grams from `token_pattern` matches
    #[default]
    Word,
    /// Character n-grams over the whole document
    Char,
    /// Character n-grams inside word boundaries, words padded with a space
    CharWb,
}

/// Accent stripping applied after lowercasing
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StripAccents {
    /// NFKD, then drop every non-ASCII character
    Ascii,
    /// NFKD, then drop combining characters
    Unicode,
}

/// Row normalization applied after idf weighting
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk vectorizer export (JSON).
///
/// Unknown keys are rejected: a setting this vectorizer does not apply
/// would silently change which terms are produced.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorizerExport {
    pub vocabulary: HashMap<String, usize>,
    /// Per-column idf weights; absent when the vectorizer was fitted without idf
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default)]
    pub analyzer: Analyzer,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub strip_accents: Option<StripAccents>,

    // Fit-time settings. They shaped `vocabulary` and `idf` and are accepted
    // so a full export loads; only `use_idf` is checked against `idf`.
    #[serde(default)]
    pub use_idf: Option<bool>,
    #[serde(default)]
    pub smooth_idf: Option<bool>,
    #[serde(default)]
    pub min_df: Option<serde_json::Value>,
    #[serde(default)]
    pub max_df: Option<serde_json::Value>,
    #[serde(default)]
    pub max_features: Option<usize>,
    #[serde(default)]
    pub dtype: Option<String>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    r"(?u)\b\w\w+\b".to_string()
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// TF-IDF vectorizer producing fixed-width sparse rows
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, u32>,
    idf: Option<Vec<f64>>,
    analyzer: Analyzer,
    ngram_range: (usize, usize),
    lowercase: bool,
    strip_accents: Option<StripAccents>,
    token_pattern: Regex,
    stop_words: HashSet<String>,
    binary: bool,
    sublinear_tf: bool,
    norm: Option<Norm>,
    dimension: usize,
}

impl TfidfVectorizer {
    /// Load a vectorizer export from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading text vectorizer");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vectorizer from {:?}", path))?;
        let vectorizer = Self::from_json(&raw)
            .with_context(|| format!("Invalid vectorizer export {:?}", path))?;

        info!(
            dimension = vectorizer.dimension,
            analyzer = ?vectorizer.analyzer,
            ngram_range = ?vectorizer.ngram_range,
            "Text vectorizer loaded"
        );
        Ok(vectorizer)
    }

    /// Parse a vectorizer export from a JSON string
    pub fn from_json(raw: &str) -> Result<Self> {
        let export: VectorizerExport =
            serde_json::from_str(raw).context("Failed to parse vectorizer JSON")?;
        Self::from_export(export)
    }

    /// Build a vectorizer from a parsed export, validating its consistency
    pub fn from_export(export: VectorizerExport) -> Result<Self> {
        let dimension = export.vocabulary.len();
        if dimension == 0 {
            anyhow::bail!("vocabulary is empty");
        }

        let (min_n, max_n) = export.ngram_range;
        if min_n == 0 || min_n > max_n {
            anyhow::bail!("invalid ngram_range ({}, {})", min_n, max_n);
        }

        let mut seen = vec![false; dimension];
        let mut vocabulary = HashMap::with_capacity(dimension);
        for (term, index) in export.vocabulary {
            if index >= dimension {
                anyhow::bail!(
                    "term {:?} has index {} outside vocabulary of {}",
                    term,
                    index,
                    dimension
                );
            }
            if std::mem::replace(&mut seen[index], true) {
                anyhow::bail!("index {} is assigned to more than one term", index);
            }
            vocabulary.insert(term, index as u32);
        }

        if export.use_idf == Some(true) && export.idf.is_none() {
            anyhow::bail!("use_idf is set but no idf weights were exported");
        }

        if let Some(idf) = &export.idf {
            if idf.len() != dimension {
                anyhow::bail!(
                    "idf has {} weights but vocabulary has {} terms",
                    idf.len(),
                    dimension
                );
            }
        }

        // The `(?u)` prefix is implicit here: `\w` and `\b` are Unicode-aware.
        let pattern = export
            .token_pattern
            .strip_prefix("(?u)")
            .unwrap_or(&export.token_pattern);
        let token_pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid token_pattern {:?}", export.token_pattern))?;

        Ok(Self {
            vocabulary,
            idf: export.idf,
            analyzer: export.analyzer,
            ngram_range: export.ngram_range,
            lowercase: export.lowercase,
            strip_accents: export.strip_accents,
            token_pattern,
            stop_words: export.stop_words.into_iter().collect(),
            binary: export.binary,
            sublinear_tf: export.sublinear_tf,
            norm: export.norm,
            dimension,
        })
    }

    /// Terms of a document in analyzer order, including out-of-vocabulary ones
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let document = if self.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };
        let document = match self.strip_accents {
            Some(mode) => strip_accents(&document, mode),
            None => document,
        };

        match self.analyzer {
            Analyzer::Word => self.word_ngrams(&document),
            Analyzer::Char => self.char_ngrams(&document),
            Analyzer::CharWb => self.char_wb_ngrams(&document),
        }
    }

    fn word_ngrams(&self, document: &str) -> Vec<String> {
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(document)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    fn char_ngrams(&self, document: &str) -> Vec<String> {
        let collapsed = MULTI_SPACE.replace_all(document, " ");
        let chars: Vec<char> = collapsed.chars().collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            terms.extend(chars.windows(n).map(|window| window.iter().collect::<String>()));
        }
        terms
    }

    fn char_wb_ngrams(&self, document: &str) -> Vec<String> {
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();

        for word in document.split_whitespace() {
            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            let len = padded.len();

            for n in min_n..=max_n {
                // A padded word shorter than n contributes itself once.
                if len <= n {
                    terms.push(padded.iter().collect());
                    break;
                }
                terms.extend(padded.windows(n).map(|window| window.iter().collect::<String>()));
            }
        }
        terms
    }

    fn weigh(&self, counts: BTreeMap<u32, f64>) -> SparseVector {
        let mut entries: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(index, count)| {
                let mut tf = if self.binary { 1.0 } else { count };
                if self.sublinear_tf {
                    tf = tf.ln() + 1.0;
                }
                let weight = match &self.idf {
                    Some(idf) => tf * idf[index as usize],
                    None => tf,
                };
                (index, weight)
            })
            .collect();

        let norm = match self.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, value) in &mut entries {
                *value /= norm;
            }
        }

        SparseVector::from_sorted(
            self.dimension,
            entries
                .into_iter()
                .map(|(index, value)| (index, value as f32))
                .collect(),
        )
    }
}

fn strip_accents(text: &str, mode: StripAccents) -> String {
    let decomposed = text.nfkd();
    match mode {
        StripAccents::Ascii => decomposed.filter(char::is_ascii).collect(),
        StripAccents::Unicode => decomposed
            .filter(|&c| canonical_combining_class(c) == 0)
            .collect(),
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn transform(&self, text: &str) -> Result<SparseVector> {
        let mut counts: BTreeMap<u32, f64> = BTreeMap::new();
        for term in self.analyze(text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }
        Ok(self.weigh(counts))
    }
}
