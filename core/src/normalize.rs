use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use anyhow::{Context, Result};

lazy_static! {
    // Every punctuation character except full stop and hyphen becomes a word
    // separator; those two are handled per token below.
    static ref PUNCTUATION: Regex = Regex::new(r"[[:punct:]--[.-]]").expect("valid regex");
}

/// Memoizes raw-token -> stem lookups against the stemmer. One cache lives
/// per build-or-query session; the table it accumulates is persisted with
/// the index and reused to seed query-time caches.
pub struct StemmingCache {
    stemmer: Stemmer,
    table: HashMap<String, String>,
}

impl StemmingCache {
    pub fn new() -> Self {
        Self { stemmer: Stemmer::create(Algorithm::English), table: HashMap::new() }
    }

    /// Seed the cache from a previously persisted raw-token -> stem table.
    pub fn from_table(table: HashMap<String, String>) -> Self {
        Self { stemmer: Stemmer::create(Algorithm::English), table }
    }

    pub fn stem(&mut self, word: &str) -> String {
        if let Some(stem) = self.table.get(word) {
            return stem.clone();
        }
        let stem = self.stemmer.stem(word).to_string();
        self.table.insert(word.to_string(), stem.clone());
        stem
    }

    pub fn into_table(self) -> HashMap<String, String> {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for StemmingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an emitted term was the whole token (hyphens removed) or one
/// hyphen-delimited part of it. Only joined terms in the body section count
/// toward document length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Joined,
    Fragment,
}

/// A stemmed term produced from one input line, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedTerm {
    pub stem: String,
    pub kind: TermKind,
}

/// Turns raw text lines into stemmed, valid terms. Owns the stop-word set;
/// the stemming cache is passed in by whichever component is indexing or
/// querying so its lifetime stays scoped to that session.
pub struct Normalizer {
    stop_words: HashSet<String>,
}

impl Normalizer {
    pub fn new(stop_words: HashSet<String>) -> Self {
        Self { stop_words }
    }

    /// Valid terms are non-empty, not pure integers, and not stop words.
    fn is_valid(&self, word: &str) -> bool {
        !word.is_empty() && word.parse::<i64>().is_err() && !self.stop_words.contains(word)
    }

    /// Normalize one line into stems.
    ///
    /// NFKC-folds and lowercases, strips punctuation except `.` and `-`,
    /// treats `--` as a separator, then per whitespace token: removes
    /// internal full stops (collapsing abbreviations like "u.s.a." to
    /// "usa"), emits the hyphen-joined form when valid, and additionally
    /// emits each valid hyphen-delimited part. Occurrences are not
    /// deduplicated here; query construction applies its own suppression.
    pub fn normalize(&self, line: &str, cache: &mut StemmingCache) -> Vec<EmittedTerm> {
        let folded = line.nfkc().collect::<String>().to_lowercase();
        let separated = PUNCTUATION.replace_all(&folded, " ").replace("--", " ");

        let mut terms = Vec::new();
        for raw in separated.split_whitespace() {
            let token = raw.replace('.', "");
            let joined = token.replace('-', "");
            if !self.is_valid(&joined) {
                continue;
            }
            terms.push(EmittedTerm { stem: cache.stem(&joined), kind: TermKind::Joined });
            if token.contains('-') {
                for part in token.split('-') {
                    if self.is_valid(part) {
                        terms.push(EmittedTerm { stem: cache.stem(part), kind: TermKind::Fragment });
                    }
                }
            }
        }
        terms
    }
}

/// Load a stop-word list, one word per line, trailing whitespace stripped.
pub fn read_stop_words<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("cannot open stop-word list {}", path.display()))?;
    let mut words = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let word = line.trim_end();
        if !word.is_empty() {
            words.insert(word.to_string());
        }
    }
    Ok(words)
}
