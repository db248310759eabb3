//! Pharmacogenomics knowledge base.
//!
//! This crate owns the on-disk knowledge base files and everything needed to turn them
//! into an immutable, indexed lookup structure:
//! - strict wire models for the three KB documents (JSON or YAML)
//! - fail-fast validation at load time, so interpretation never re-checks structure
//! - case-insensitive indexes over drugs, genes and drug pairs
//! - the [`KnowledgeSource`] query contract consumed by the interpretation engine
//!
//! A loaded [`KnowledgeBase`] is read-only and can be shared across threads behind an
//! `Arc` without locking.

mod constants;
mod knowledge_base;
mod model;
mod source;
mod wire;

pub use constants::{
    DOSING_GUIDELINES_STEM, DRUG_DRUG_INTERACTIONS_STEM, GENE_DRUG_INTERACTIONS_STEM,
    HEPATIC_ALT_RATIO_THRESHOLD, KB_FILE_STEMS, SEVERE_HEPATIC_ALT_RATIO,
};
pub use knowledge_base::{DocumentFormat, KbStats, KbVersion, KnowledgeBase, RawDocument};
pub use model::{
    CypInhibitor, DrugInteraction, GeneDrugInteraction, HepaticAdjustment, HepaticSeverity,
    ModulationDirection, PhenoconversionLink, PhenotypeImpact, RenalAdjustment,
};
pub use source::KnowledgeSource;

use std::path::PathBuf;

/// Errors returned while loading or validating the knowledge base.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("knowledge base file not found: {stem}.json or {stem}.yaml under {dir}", dir = dir.display())]
    MissingFile { dir: PathBuf, stem: &'static str },

    #[error("failed to read knowledge base file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} schema mismatch at {path}: {message}")]
    Schema {
        file: String,
        path: String,
        message: String,
    },

    #[error("invalid record in {file}: {message}")]
    InvalidRecord { file: String, message: String },
}

/// Type alias for Results that can fail with a [`KbError`].
pub type KbResult<T> = Result<T, KbError>;
