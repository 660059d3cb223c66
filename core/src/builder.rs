use crate::corpus::{classify, LineKind, Section};
use crate::index::{DocId, IndexSnapshot, Postings};
use crate::normalize::{Normalizer, StemmingCache, TermKind};
use anyhow::{ensure, Result};
use std::collections::HashMap;
use std::io::BufRead;

/// Position of the record parser within the stream.
enum State {
    NoRecord,
    /// Inside a record; `None` until the first section marker is seen.
    InRecord(Option<Section>),
}

/// Accumulates the inverted index and per-document lengths over a tagged
/// corpus stream. Documents get sequential 1-based IDs in stream order; a
/// record's raw length is the number of joined body terms, finalized as its
/// square root when the next record starts (and once more at end of stream,
/// since corpora carry no trailing end marker).
pub struct IndexBuilder<'a> {
    normalizer: &'a Normalizer,
    cache: StemmingCache,
    term_vectors: HashMap<String, Postings>,
    raw_lengths: HashMap<DocId, f64>,
    current_doc: DocId,
    current_length: f64,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Self {
            normalizer,
            cache: StemmingCache::new(),
            term_vectors: HashMap::new(),
            raw_lengths: HashMap::new(),
            current_doc: 0,
            current_length: 0.0,
        }
    }

    /// Consume the corpus stream and produce the immutable snapshot.
    pub fn build<R: BufRead>(mut self, reader: R) -> Result<IndexSnapshot> {
        let mut state = State::NoRecord;
        for line in reader.lines() {
            let line = line?;
            match classify(&line) {
                LineKind::RecordStart => {
                    self.close_document();
                    state = State::InRecord(None);
                }
                LineKind::SectionMarker(section) => match state {
                    State::NoRecord => {
                        tracing::warn!(line = %line, "section marker outside any record; ignoring");
                    }
                    State::InRecord(_) => state = State::InRecord(Some(section)),
                },
                LineKind::Content(text) => match state {
                    State::NoRecord => {
                        tracing::warn!(line = text, "content outside any record; ignoring");
                    }
                    State::InRecord(None) => {
                        tracing::warn!(line = text, "content before any section marker; ignoring");
                    }
                    State::InRecord(Some(section)) => self.content_line(section, text),
                },
            }
        }
        self.close_document();

        // The entry under ID 0 is the placeholder closed by the first record
        // start; it must not take part in the average.
        self.raw_lengths.remove(&0);
        ensure!(!self.raw_lengths.is_empty(), "corpus contains no records");

        let average = self.raw_lengths.values().sum::<f64>() / self.raw_lengths.len() as f64;
        ensure!(average > 0.0, "every document in the corpus is empty");
        let doc_lengths: HashMap<DocId, f64> =
            self.raw_lengths.into_iter().map(|(id, len)| (id, len / average)).collect();

        tracing::info!(
            num_docs = doc_lengths.len(),
            num_terms = self.term_vectors.len(),
            cached_stems = self.cache.len(),
            "index build complete"
        );
        Ok(IndexSnapshot {
            stemming: self.cache.into_table(),
            term_vectors: self.term_vectors,
            doc_lengths,
        })
    }

    /// Finalize the current document's length and move to the next ID.
    fn close_document(&mut self) {
        self.raw_lengths.insert(self.current_doc, self.current_length.sqrt());
        self.current_doc += 1;
        self.current_length = 0.0;
    }

    fn content_line(&mut self, section: Section, text: &str) {
        if !section.is_indexed() {
            return;
        }
        for term in self.normalizer.normalize(text, &mut self.cache) {
            if term.kind == TermKind::Joined && section.counts_toward_length() {
                self.current_length += 1.0;
            }
            *self
                .term_vectors
                .entry(term.stem)
                .or_default()
                .entry(self.current_doc)
                .or_insert(0) += 1;
        }
    }
}
