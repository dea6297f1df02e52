//! Candidate persistence: normalization, identifiers, the on-disk JSON store.

pub mod candidate_store;
pub mod identifiers;
pub mod json_file;
pub mod normalizer;

pub use candidate_store::{load_records, read_candidate_file, CandidateStore};
pub use normalizer::normalize_candidate;
