//! TF-IDF relevance, with the vector space fit per call over the task and
//! its contributions.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
    StopWordFilter, TextAnalyzer, TokenStream,
};

/// Tokens shorter than this (in chars) carry no signal.
const MIN_TOKEN_CHARS: usize = 2;
const NGRAM: usize = 3;

type SparseVector = BTreeMap<String, f32>;

#[derive(Clone)]
pub struct LexicalScorer {
    analyzer: TextAnalyzer,
}

impl LexicalScorer {
    /// With `preprocess`, English stop words are removed and tokens are
    /// stemmed before weighting.
    pub fn new(preprocess: bool) -> Result<Self> {
        let analyzer = if preprocess {
            let stop_words = StopWordFilter::new(Language::English)
                .context("English stop-word list unavailable")?;
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .filter(stop_words)
                .filter(Stemmer::new(Language::English))
                .build()
        } else {
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(40))
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .build()
        };
        Ok(Self { analyzer })
    }

    /// Cosine similarity in [0, 1] between `task` and each contribution.
    /// Contributions with no usable terms score 0.
    pub fn score(&self, task: &str, contributions: &[String]) -> Vec<f32> {
        let mut analyzer = self.analyzer.clone();
        let mut counts = Vec::with_capacity(contributions.len() + 1);
        counts.push(term_counts(&mut analyzer, task));
        for contribution in contributions {
            counts.push(term_counts(&mut analyzer, contribution));
        }

        let vectors = tfidf(&counts);
        let Some((task_vec, rest)) = vectors.split_first() else {
            return Vec::new();
        };
        rest.iter().map(|v| dot(task_vec, v)).collect()
    }

    /// Stemmed, stop-word-free tokens of `text`.
    #[cfg(test)]
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        tokenize(&mut analyzer, text)
    }
}

fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = &stream.token().text;
        if token.chars().count() >= MIN_TOKEN_CHARS {
            tokens.push(token.clone());
        }
    }
    tokens
}

/// Whole-token features plus space-padded character trigrams, so that
/// "firebreak" still shares weight with "fire".
fn term_counts(analyzer: &mut TextAnalyzer, text: &str) -> BTreeMap<String, f32> {
    let mut counts = BTreeMap::new();
    for token in tokenize(analyzer, text) {
        let padded: Vec<char> = format!(" {} ", token).chars().collect();
        for gram in padded.windows(NGRAM) {
            let key: String = std::iter::once('#').chain(gram.iter().copied()).collect();
            *counts.entry(key).or_insert(0.0) += 1.0;
        }
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

/// Smoothed idf `ln((1 + n) / (1 + df)) + 1`, L2-normalised rows.
fn tfidf(counts: &[BTreeMap<String, f32>]) -> Vec<SparseVector> {
    let n = counts.len() as f32;
    let mut df: BTreeMap<&str, f32> = BTreeMap::new();
    for doc in counts {
        let terms: HashSet<&str> = doc.keys().map(String::as_str).collect();
        for term in terms {
            *df.entry(term).or_insert(0.0) += 1.0;
        }
    }

    counts
        .iter()
        .map(|doc| {
            let mut vector: SparseVector = doc
                .iter()
                .map(|(term, tf)| {
                    let idf = ((1.0 + n) / (1.0 + df[term.as_str()])).ln() + 1.0;
                    (term.clone(), tf * idf)
                })
                .collect();
            let norm = vector.values().map(|w| w * w).sum::<f32>().sqrt();
            if norm > 0.0 {
                vector.values_mut().for_each(|w| *w /= norm);
            }
            vector
        })
        .collect()
}

fn dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum::<f32>()
        .clamp(0.0, 1.0)
}
