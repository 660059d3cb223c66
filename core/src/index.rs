use std::collections::HashMap;

pub type DocId = u32;
pub type QueryId = u32;

/// Raw occurrence counts for one term, keyed by document. Entries are always
/// >= 1; a document that lacks a term is simply absent.
pub type Postings = HashMap<DocId, u32>;

/// Immutable product of one indexing run. Built once per corpus version and
/// read-only for every subsequent query.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    /// Raw surface form -> stem memo accumulated while indexing; reused to
    /// seed the query-session stemming cache.
    pub stemming: HashMap<String, String>,
    /// Term -> postings. Document IDs are dense, 1-based, assigned in corpus
    /// order; they are not the collection's original identifiers.
    pub term_vectors: HashMap<String, Postings>,
    /// Document -> length normalized against the corpus average of
    /// square-rooted raw term counts. Mean value is 1.0 by construction.
    pub doc_lengths: HashMap<DocId, f64>,
}

impl IndexSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_docs(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.term_vectors.len()
    }
}
