use crate::corpus::{classify, LineKind, Section};
use crate::index::QueryId;
use crate::normalize::{Normalizer, StemmingCache};
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::BufRead;

/// An ordered sequence of stemmed query terms. Duplicates are suppressed at
/// construction time, so a repeated query word contributes once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str, normalizer: &Normalizer, cache: &mut StemmingCache) -> Self {
        let mut query = Self::new();
        query.absorb(text, normalizer, cache);
        query
    }

    /// Normalize `text` and append any stems not already present.
    pub fn absorb(&mut self, text: &str, normalizer: &Normalizer, cache: &mut StemmingCache) {
        for term in normalizer.normalize(text, cache) {
            if !self.terms.contains(&term.stem) {
                self.terms.push(term.stem);
            }
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Parse a batch query file in the tagged record format: one record per
/// query, body section lines concatenated into a single term list. Query IDs
/// are sequential and 1-based in stream order; the original collection's IDs
/// are ignored since they need not be consecutive.
pub fn parse_query_file<R: BufRead>(
    reader: R,
    normalizer: &Normalizer,
    cache: &mut StemmingCache,
) -> Result<BTreeMap<QueryId, Query>> {
    let mut queries = BTreeMap::new();
    let mut current = Query::new();
    let mut query_id: QueryId = 0;
    let mut section: Option<Section> = None;

    for line in reader.lines() {
        let line = line?;
        match classify(&line) {
            LineKind::RecordStart => {
                if query_id > 0 {
                    queries.insert(query_id, std::mem::take(&mut current));
                }
                query_id += 1;
                section = None;
            }
            LineKind::SectionMarker(marker) => {
                if query_id == 0 {
                    tracing::warn!(line = %line, "section marker before any query record; ignoring");
                } else {
                    section = Some(marker);
                }
            }
            LineKind::Content(text) => {
                if query_id > 0 && section == Some(Section::Words) {
                    current.absorb(text, normalizer, cache);
                }
            }
        }
    }
    if query_id > 0 {
        queries.insert(query_id, current);
    }
    Ok(queries)
}
