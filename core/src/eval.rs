//! Ranking-quality metrics against graded human relevance judgments:
//! precision, recall, P@N, mean average precision, and NDCG@N.
//!
//! Grades are ordinal with lower numbers meaning more relevant; the relevant
//! set for a query is its judged documents with grade at or below a
//! threshold. Queries whose relevant set is empty cannot contribute to
//! recall, MAP, or NDCG (the denominators vanish); they are excluded from
//! those averages, logged, and reported, never absorbed into a silent zero.

use crate::index::{DocId, QueryId};
use crate::retrieval::{RankedHit, RankedResults};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;

/// One judged (document, grade) pair. Lower grades mean more relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgment {
    pub doc_id: DocId,
    pub grade: i32,
}

/// Graded relevance judgments keyed by query, each list sorted by grade
/// ascending (most relevant first). Loaded once per evaluation session and
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct RelevanceJudgments {
    by_query: BTreeMap<QueryId, Vec<Judgment>>,
}

impl RelevanceJudgments {
    /// Parse whitespace-separated `queryID documentID grade` triples, one
    /// per line. Blank lines are skipped; anything else malformed is an
    /// error carrying its line number. Duplicate (query, document) pairs
    /// are assumed absent upstream.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut by_query: BTreeMap<QueryId, Vec<Judgment>> = BTreeMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let number = index + 1;
            let mut fields = line.split_whitespace();
            let mut next = |name: &str| {
                fields
                    .next()
                    .with_context(|| format!("judgment line {number}: missing {name}"))
            };
            let query_id: QueryId = next("query ID")?
                .parse()
                .with_context(|| format!("judgment line {number}: bad query ID"))?;
            let doc_id: DocId = next("document ID")?
                .parse()
                .with_context(|| format!("judgment line {number}: bad document ID"))?;
            let grade: i32 = next("grade")?
                .parse()
                .with_context(|| format!("judgment line {number}: bad grade"))?;
            by_query.entry(query_id).or_default().push(Judgment { doc_id, grade });
        }
        for judgments in by_query.values_mut() {
            judgments.sort_by_key(|judgment| judgment.grade);
        }
        Ok(Self { by_query })
    }

    pub fn queries(&self) -> impl Iterator<Item = (&QueryId, &Vec<Judgment>)> {
        self.by_query.iter()
    }

    pub fn len(&self) -> usize {
        self.by_query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }
}

/// Knobs for the evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalParams {
    /// Judged documents with grade <= this count as relevant.
    pub relevance_threshold: i32,
    /// Rank cutoff for P@N and NDCG@N.
    pub n: usize,
    /// Minuend converting a grade into an NDCG gain; must exceed the
    /// threshold so every relevant document carries positive gain.
    pub gain_fix: i32,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self { relevance_threshold: 4, n: 10, gain_fix: 5 }
    }
}

/// Averaged metrics over one evaluation session.
#[derive(Debug, Clone, Default)]
pub struct MetricsReport {
    pub precision: f64,
    pub recall: f64,
    pub p_at_n: f64,
    pub mean_average_precision: f64,
    /// Mean of the final NDCG value across queries with a nonempty relevant
    /// set.
    pub mean_ndcg: f64,
    /// Per-query NDCG curves truncated at N.
    pub ndcg_curves: BTreeMap<QueryId, Vec<f64>>,
    /// Queries that took part in the evaluation at all.
    pub evaluated_queries: usize,
    /// Queries excluded from the recall, MAP, and NDCG averages because
    /// their relevant set is empty.
    pub excluded_queries: Vec<QueryId>,
}

/// Per-query precision: |retrieved ∩ relevant| / |retrieved|. Zero when
/// nothing was retrieved.
fn precision(retrieved: &[RankedHit], relevant: &HashSet<DocId>) -> f64 {
    if retrieved.is_empty() {
        return 0.0;
    }
    let hits = retrieved.iter().filter(|hit| relevant.contains(&hit.doc_id)).count();
    hits as f64 / retrieved.len() as f64
}

/// Per-query recall: |retrieved ∩ relevant| / |relevant|. `None` when the
/// relevant set is empty.
fn recall(retrieved: &[RankedHit], relevant: &HashSet<DocId>) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }
    let hits = retrieved.iter().filter(|hit| relevant.contains(&hit.doc_id)).count();
    Some(hits as f64 / relevant.len() as f64)
}

/// Per-query P@N: relevant documents at ranks 1 through N inclusive,
/// divided by N.
fn p_at_n(retrieved: &[RankedHit], relevant: &HashSet<DocId>, n: usize) -> f64 {
    let hits = retrieved
        .iter()
        .filter(|hit| hit.rank <= n && relevant.contains(&hit.doc_id))
        .count();
    hits as f64 / n as f64
}

/// Per-query average precision: at each rank holding a relevant document,
/// add (relevant hits so far) / rank; divide by the relevant-set size.
/// `None` when the relevant set is empty.
fn average_precision(retrieved: &[RankedHit], relevant: &HashSet<DocId>) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }
    let mut hits = 0u32;
    let mut sum = 0.0;
    for hit in retrieved {
        if relevant.contains(&hit.doc_id) {
            hits += 1;
            sum += f64::from(hits) / hit.rank as f64;
        }
    }
    Some(sum / relevant.len() as f64)
}

/// Running discounted cumulated gain: the first gain enters undiscounted,
/// every later gain at rank i is divided by log2(i) before accumulating.
fn cumulate(gains: &[f64]) -> Vec<f64> {
    let mut dcg = Vec::with_capacity(gains.len());
    let mut total = 0.0;
    for (index, gain) in gains.iter().enumerate() {
        let rank = index + 1;
        total += if rank == 1 { *gain } else { gain / (rank as f64).log2() };
        dcg.push(total);
    }
    dcg
}

/// Per-query NDCG curve truncated at `n`.
///
/// The gain of a retrieved document is `gain_fix - grade` if it is in the
/// relevant set, else 0. The ideal vector takes the relevant set's judged
/// documents by grade ascending. `None` when the ideal vector is empty.
fn ndcg_curve(
    retrieved: &[RankedHit],
    judged: &[Judgment],
    relevant: &HashSet<DocId>,
    params: &EvalParams,
) -> Option<Vec<f64>> {
    let ideal: Vec<f64> = judged
        .iter()
        .filter(|judgment| relevant.contains(&judgment.doc_id))
        .map(|judgment| f64::from(params.gain_fix - judgment.grade))
        .collect();
    if ideal.is_empty() {
        return None;
    }

    let grade_of: HashMap<DocId, i32> =
        judged.iter().map(|judgment| (judgment.doc_id, judgment.grade)).collect();
    let gains: Vec<f64> = retrieved
        .iter()
        .map(|hit| {
            if relevant.contains(&hit.doc_id) {
                f64::from(params.gain_fix - grade_of[&hit.doc_id])
            } else {
                0.0
            }
        })
        .collect();

    let mut curve: Vec<f64> = cumulate(&gains)
        .into_iter()
        .zip(cumulate(&ideal))
        .map(|(dcg, ideal_dcg)| dcg / ideal_dcg)
        .collect();
    curve.truncate(params.n);
    Some(curve)
}

/// Evaluate ranked results against judgments. Only queries present in the
/// judgments take part; a judged query with no ranked result counts as an
/// empty retrieval.
pub fn evaluate(
    results: &RankedResults,
    judgments: &RelevanceJudgments,
    params: &EvalParams,
) -> MetricsReport {
    let mut report = MetricsReport::default();
    let mut precision_sum = 0.0;
    let mut p_at_n_sum = 0.0;
    let mut recall_sum = 0.0;
    let mut map_sum = 0.0;
    let mut ndcg_sum = 0.0;
    let mut graded = 0usize;

    for (&query_id, judged) in judgments.queries() {
        let retrieved: &[RankedHit] =
            results.get(&query_id).map(Vec::as_slice).unwrap_or_default();
        let relevant: HashSet<DocId> = judged
            .iter()
            .filter(|judgment| judgment.grade <= params.relevance_threshold)
            .map(|judgment| judgment.doc_id)
            .collect();

        report.evaluated_queries += 1;
        precision_sum += precision(retrieved, &relevant);
        p_at_n_sum += p_at_n(retrieved, &relevant, params.n);

        match (recall(retrieved, &relevant), average_precision(retrieved, &relevant)) {
            (Some(recall_value), Some(ap)) => {
                graded += 1;
                recall_sum += recall_value;
                map_sum += ap;
            }
            _ => {
                tracing::warn!(
                    query = query_id,
                    "empty relevant set; query excluded from recall, MAP, and NDCG averages"
                );
                report.excluded_queries.push(query_id);
                continue;
            }
        }
        if let Some(curve) = ndcg_curve(retrieved, judged, &relevant, params) {
            if let Some(&last) = curve.last() {
                ndcg_sum += last;
            }
            report.ndcg_curves.insert(query_id, curve);
        }
    }

    if report.evaluated_queries > 0 {
        report.precision = precision_sum / report.evaluated_queries as f64;
        report.p_at_n = p_at_n_sum / report.evaluated_queries as f64;
    }
    if graded > 0 {
        report.recall = recall_sum / graded as f64;
        report.mean_average_precision = map_sum / graded as f64;
        report.mean_ndcg = ndcg_sum / graded as f64;
    }
    report
}
