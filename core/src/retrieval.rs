use crate::index::{DocId, IndexSnapshot, QueryId};
use crate::query::Query;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// Tuning knobs for the BM25 scoring pass.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    /// Cap on the ranked result list.
    pub top_k: usize,
    /// Keep documents whose aggregate score is <= 0. Possible whenever a
    /// matched term occurs in more than about half the corpus, since the IDF
    /// goes negative and is deliberately not clamped.
    pub include_nonpositive: bool,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.0, b: 0.75, top_k: 15, include_nonpositive: false }
    }
}

/// One scored document in a ranked result list. Ranks are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    pub doc_id: DocId,
    pub rank: usize,
    pub score: f64,
}

/// Ranked results for a batch of queries, keyed by query ID.
pub type RankedResults = BTreeMap<QueryId, Vec<RankedHit>>;

/// Score `query` against the snapshot with BM25.
///
/// Terms absent from the vocabulary contribute nothing. Documents matching
/// no query term never appear; documents with a nonpositive aggregate score
/// appear only when [`Bm25Params::include_nonpositive`] is set. Results are
/// sorted by score descending, ties broken by ascending document ID, then
/// truncated to `top_k`.
pub fn score(query: &Query, index: &IndexSnapshot, params: &Bm25Params) -> Vec<RankedHit> {
    let total_docs = f64::from(index.num_docs());
    let mut scores: HashMap<DocId, f64> = HashMap::new();

    for term in query.terms() {
        let Some(postings) = index.term_vectors.get(term) else {
            continue;
        };
        let n_t = postings.len() as f64;
        let idf = ((total_docs - n_t + 0.5) / (n_t + 0.5)).log2();
        for (&doc_id, &count) in postings {
            let frequency = f64::from(count);
            let norm_len = index.doc_lengths.get(&doc_id).copied().unwrap_or(1.0);
            let saturation = frequency * (1.0 + params.k1)
                / (frequency + params.k1 * (1.0 - params.b + params.b * norm_len));
            *scores.entry(doc_id).or_insert(0.0) += saturation * idf;
        }
    }

    let mut hits: Vec<(DocId, f64)> = scores
        .into_iter()
        .filter(|(_, score)| params.include_nonpositive || *score > 0.0)
        .collect();
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    hits.truncate(params.top_k);
    hits.into_iter()
        .enumerate()
        .map(|(i, (doc_id, score))| RankedHit { doc_id, rank: i + 1, score })
        .collect()
}

/// Score every query in a batch.
pub fn score_queries(
    queries: &BTreeMap<QueryId, Query>,
    index: &IndexSnapshot,
    params: &Bm25Params,
) -> RankedResults {
    queries
        .iter()
        .map(|(&query_id, query)| (query_id, score(query, index, params)))
        .collect()
}

/// Write a run as `queryID documentID rank` lines, one per retrieved
/// document, in query order.
pub fn write_run<W: Write>(results: &RankedResults, mut out: W) -> Result<()> {
    for (query_id, hits) in results {
        for hit in hits {
            writeln!(out, "{} {} {}", query_id, hit.doc_id, hit.rank)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::normalize::{Normalizer, StemmingCache};
    use std::collections::HashSet;
    use std::io::Cursor;

    const CORPUS: &str = "\
.I 1
.W
solar wind plasma
.I 2
.W
plasma flow model
.I 3
.W
solar flare model
";

    // Two filler documents push the query terms below half the corpus so
    // their IDF stays positive.
    const WIDE_CORPUS: &str = "\
.I 1
.W
solar wind plasma
.I 2
.W
plasma flow model
.I 3
.W
solar flare model
.I 4
.W
turbulent heat transfer
.I 5
.W
laminar boundary layer
";

    fn build_from(corpus: &str) -> IndexSnapshot {
        let normalizer = Normalizer::new(HashSet::new());
        IndexBuilder::new(&normalizer).build(Cursor::new(corpus)).unwrap()
    }

    fn build_index() -> IndexSnapshot {
        build_from(CORPUS)
    }

    fn make_query(index: &IndexSnapshot, text: &str) -> Query {
        let normalizer = Normalizer::new(HashSet::new());
        let mut cache = StemmingCache::from_table(index.stemming.clone());
        Query::from_text(text, &normalizer, &mut cache)
    }

    #[test]
    fn idf_goes_negative_without_clamping() {
        let index = build_index();
        // "solar" appears in 2 of 3 documents: log2(1.5 / 2.5) ~ -0.737.
        let n_t = index.term_vectors["solar"].len() as f64;
        let idf = ((3.0 - n_t + 0.5) / (n_t + 0.5)).log2();
        assert!((idf - (-0.737)).abs() < 1e-3);

        let query = make_query(&index, "solar");
        assert!(score(&query, &index, &Bm25Params::default()).is_empty());
        let kept = score(
            &query,
            &index,
            &Bm25Params { include_nonpositive: true, ..Bm25Params::default() },
        );
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|hit| hit.score < 0.0));
    }

    #[test]
    fn document_matching_both_terms_ranks_first() {
        let index = build_from(WIDE_CORPUS);
        let query = make_query(&index, "solar plasma");
        let hits = score(&query, &index, &Bm25Params::default());
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[0].rank, 1);
        assert!(hits[1..].iter().all(|hit| hit.score < hits[0].score));
    }

    #[test]
    fn matching_both_negative_idf_terms_ranks_last() {
        // In the three-document corpus both query terms occur in two of the
        // three documents, so each contribution is negative and the document
        // matching both accumulates the lowest score.
        let index = build_index();
        let query = make_query(&index, "solar plasma");
        let params = Bm25Params { include_nonpositive: true, ..Bm25Params::default() };
        let hits = score(&query, &index, &params);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits.last().unwrap().doc_id, 1);
    }

    #[test]
    fn unmatched_documents_never_appear() {
        let index = build_index();
        let query = make_query(&index, "flare");
        let hits = score(&query, &index, &Bm25Params::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 3);
    }

    #[test]
    fn vocabulary_misses_contribute_nothing() {
        let index = build_index();
        let query = make_query(&index, "flare unheard-of-term");
        let hits = score(&query, &index, &Bm25Params::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 3);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let index = build_index();
        let query = Query::new();
        assert!(score(&query, &index, &Bm25Params::default()).is_empty());
    }

    #[test]
    fn ties_resolve_by_ascending_document_id() {
        let index = build_from(WIDE_CORPUS);
        // "model" appears once in documents 2 and 3, which have identical
        // lengths, so the scores tie exactly.
        let query = make_query(&index, "model");
        let hits = score(&query, &index, &Bm25Params::default());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(hits[1].doc_id, 3);
        assert_eq!((hits[0].rank, hits[1].rank), (1, 2));
    }

    #[test]
    fn results_are_capped_at_top_k() {
        let index = build_from(WIDE_CORPUS);
        let query = make_query(&index, "model plasma solar flare wind flow");
        let params = Bm25Params { top_k: 2, ..Bm25Params::default() };
        let hits = score(&query, &index, &params);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.last().unwrap().rank, 2);
    }

    #[test]
    fn term_contribution_is_monotone_in_frequency() {
        let params = Bm25Params::default();
        let saturation = |f: f64| {
            f * (1.0 + params.k1) / (f + params.k1 * (1.0 - params.b + params.b * 1.0))
        };
        let mut previous = 0.0;
        for f in 1..50 {
            let next = saturation(f64::from(f));
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn run_output_lists_query_document_rank_triples() {
        let index = build_index();
        let mut queries = BTreeMap::new();
        queries.insert(1, make_query(&index, "flare"));
        queries.insert(2, make_query(&index, "flow"));
        let results = score_queries(&queries, &index, &Bm25Params::default());
        let mut buffer = Vec::new();
        write_run(&results, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "1 3 1\n2 2 1\n");
    }
}
