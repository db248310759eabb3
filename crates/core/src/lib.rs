//! # PGx Core
//!
//! Core business logic for the pharmacogenomics interpretation platform.
//!
//! This crate turns a patient's genotype, medication list and lab values into scored
//! clinical findings and prioritised recommendations:
//! - [`InterpretationEngine`] evaluates a patient against a [`pgx_kb::KnowledgeSource`]
//! - [`RiskScorer`] scores findings and rolls them up into a [`RiskSummary`]
//! - [`Recommender`] turns scored findings into one action per drug
//! - [`DdiBurdenScorer`] weighs the interacting medication pairs on a patient's list
//! - [`PgxService`] runs the whole pipeline and writes analysis files
//! - [`ClinicalValidator`] checks the pipeline against built-in reference cases
//!
//! Interpretation, scoring and recommendation never fail: missing data yields no finding.
//! Only parsing, knowledge base loading, configuration and output writing return errors.
//!
//! **No process concerns**: environment variables, logging setup and concurrency across
//! patients belong to the binaries.

pub mod clinical_validation;
pub mod config;
pub mod constants;
pub mod ddi_burden;
pub mod engine;
pub mod finding;
pub mod patient;
pub mod recommender;
pub mod scoring;
pub mod service;
pub mod validation;

mod error;

pub use clinical_validation::{
    calculate_metrics, render_report, CaseResult, CheckResult, ClinicalValidator,
    ExpectedFinding, ValidationMetrics,
};
pub use config::{resolve_knowledge_base_dir, CoreConfig};
pub use ddi_burden::{BurdenLevel, DdiBurden, DdiBurdenScorer};
pub use engine::InterpretationEngine;
pub use error::{PgxError, PgxResult};
pub use finding::{Finding, ScoredFinding};
pub use patient::{parse_cohort_json, ClinicalContext, Demographics, Medication, Patient};
pub use recommender::{Recommendation, Recommender};
pub use scoring::{RiskScorer, RiskSummary};
pub use service::{CohortEntry, CohortSummary, PatientAnalysis, PgxService};

pub use pgx_types::{
    ActionType, DosingAdjustment, EvidenceLevel, FindingSource, FindingType, Priority,
    RiskCategory, Severity, TimeFrame,
};
