use crate::index::{DocId, IndexSnapshot};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk form of an [`IndexSnapshot`]. JSON objects only key on strings,
/// so document IDs are stringified here, at every nesting level, and parsed
/// back on load; string-typed IDs never leak past this module.
#[derive(Serialize, Deserialize)]
struct StoredIndex {
    stemming: HashMap<String, String>,
    term_vectors: HashMap<String, HashMap<String, u32>>,
    doc_lengths: HashMap<String, f64>,
}

impl From<&IndexSnapshot> for StoredIndex {
    fn from(snapshot: &IndexSnapshot) -> Self {
        Self {
            stemming: snapshot.stemming.clone(),
            term_vectors: snapshot
                .term_vectors
                .iter()
                .map(|(term, postings)| {
                    let postings =
                        postings.iter().map(|(id, count)| (id.to_string(), *count)).collect();
                    (term.clone(), postings)
                })
                .collect(),
            doc_lengths: snapshot
                .doc_lengths
                .iter()
                .map(|(id, len)| (id.to_string(), *len))
                .collect(),
        }
    }
}

impl StoredIndex {
    fn into_snapshot(self) -> Result<IndexSnapshot> {
        let mut term_vectors = HashMap::with_capacity(self.term_vectors.len());
        for (term, postings) in self.term_vectors {
            let mut parsed = HashMap::with_capacity(postings.len());
            for (id, count) in postings {
                parsed.insert(parse_doc_id(&id)?, count);
            }
            term_vectors.insert(term, parsed);
        }
        let mut doc_lengths = HashMap::with_capacity(self.doc_lengths.len());
        for (id, len) in self.doc_lengths {
            doc_lengths.insert(parse_doc_id(&id)?, len);
        }
        Ok(IndexSnapshot { stemming: self.stemming, term_vectors, doc_lengths })
    }
}

fn parse_doc_id(key: &str) -> Result<DocId> {
    key.parse::<DocId>().with_context(|| format!("invalid document ID key {key:?} in index file"))
}

pub fn save_index<P: AsRef<Path>>(path: P, snapshot: &IndexSnapshot) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("cannot create index file {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &StoredIndex::from(snapshot))
        .with_context(|| format!("cannot write index file {}", path.display()))?;
    Ok(())
}

pub fn load_index<P: AsRef<Path>>(path: P) -> Result<IndexSnapshot> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("cannot open index file {}", path.display()))?;
    let stored: StoredIndex = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse index file {}", path.display()))?;
    stored.into_snapshot()
}
