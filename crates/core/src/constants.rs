//! Constants used throughout the PGx core crate.
//!
//! Clinical thresholds live here so the engine, scorer and recommender agree on a single
//! value for each.

/// Default directory name of the bundled knowledge base.
pub const DEFAULT_KNOWLEDGE_BASE_DIR: &str = "knowledge";

/// Default directory for analysis output when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Platform version recorded on every analysis.
pub const PLATFORM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming an explicit knowledge base directory.
pub const KB_DIR_ENV: &str = "PGX_KB_DIR";

/// Environment variable naming the cohort file read by the batch runner.
pub const PATIENTS_FILE_ENV: &str = "PGX_PATIENTS_FILE";

/// Cohort file used by the batch runner when `PGX_PATIENTS_FILE` is unset.
pub const DEFAULT_PATIENTS_FILE: &str = "data/sample_cohort.json";

/// Environment variable naming the output directory.
pub const OUTPUT_DIR_ENV: &str = "PGX_OUTPUT_DIR";

/// Lab code for estimated glomerular filtration rate.
pub const EGFR_LAB: &str = "egfr";

/// Lab code for alanine aminotransferase.
pub const ALT_LAB: &str = "alt";

/// Assumed ALT upper limit of normal, in U/L.
pub const ALT_UPPER_LIMIT_OF_NORMAL: f64 = 40.0;

/// eGFR below which a renal warning is graded high rather than moderate.
pub const RENAL_HIGH_SEVERITY_EGFR: f64 = 30.0;

/// Genes checked for drug-induced phenoconversion.
pub const PHENOCONVERSION_GENES: [&str; 4] = ["CYP2D6", "CYP2C19", "CYP2C9", "CYP3A4"];

/// Maximum length of a patient identifier.
pub const MAX_PATIENT_ID_LEN: usize = 64;
