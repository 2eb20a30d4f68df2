//! Ingestion: reconciling fresh crawl and extraction output with the store
//!
//! - `transaction`: entity kinds, write operations and the existing-intel
//!   snapshot
//! - `dedup`: per-kind identity keys
//! - `reconciler`: the pure delete-then-recreate transaction builder
//! - `pipeline`: crawl → extract → reconcile → apply

mod dedup;
mod pipeline;
mod reconciler;
mod transaction;

pub use dedup::{dedupe, DedupKey};
pub use pipeline::{IngestionReport, IngestionService};
pub use reconciler::{build_replace_company_intel_txns, ReplaceIntelParams};
pub use transaction::{EntityKind, ExistingCompanyIntel, Fields, Transaction};
