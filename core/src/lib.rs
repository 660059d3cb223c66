//! BM25 indexing, retrieval, and ranking-quality evaluation over tagged text
//! collections.
//!
//! The pipeline runs strictly forward: a tagged corpus stream is normalized
//! into stems and accumulated into an [`IndexSnapshot`] by the
//! [`builder::IndexBuilder`]; queries are scored against the snapshot with
//! [`retrieval::score`]; ranked results are measured against graded human
//! judgments by [`eval::evaluate`]. The snapshot is built once and read-only
//! afterwards.

pub mod builder;
pub mod corpus;
pub mod eval;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod query;
pub mod retrieval;

pub use index::{DocId, IndexSnapshot, QueryId};
pub use normalize::{Normalizer, StemmingCache};
pub use query::Query;
pub use retrieval::{Bm25Params, RankedHit, RankedResults};
