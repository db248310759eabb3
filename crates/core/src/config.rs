//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the core
//! never consults process-wide state while analysing a patient.

use crate::constants::{DEFAULT_KNOWLEDGE_BASE_DIR, PLATFORM_VERSION};
use crate::{PgxError, PgxResult};
use pgx_kb::{KnowledgeBase, KB_FILE_STEMS};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    knowledge_base_dir: PathBuf,
    output_dir: PathBuf,
    platform_version: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The knowledge base directory must already exist; the output directory is created on
    /// first write.
    pub fn new(knowledge_base_dir: PathBuf, output_dir: PathBuf) -> PgxResult<Self> {
        if !knowledge_base_dir.is_dir() {
            return Err(PgxError::InvalidInput(format!(
                "knowledge base directory does not exist: {}",
                knowledge_base_dir.display()
            )));
        }
        if output_dir.as_os_str().is_empty() {
            return Err(PgxError::InvalidInput(
                "output directory cannot be empty".into(),
            ));
        }

        Ok(Self {
            knowledge_base_dir,
            output_dir,
            platform_version: PLATFORM_VERSION.to_string(),
        })
    }

    pub fn knowledge_base_dir(&self) -> &Path {
        &self.knowledge_base_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }
}

/// Resolve the knowledge base directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory holding all three KB documents.
/// Otherwise this searches for `knowledge/` relative to the current working directory and
/// then walks up from `CARGO_MANIFEST_DIR`.
pub fn resolve_knowledge_base_dir(override_dir: Option<PathBuf>) -> PgxResult<PathBuf> {
    fn looks_like_kb_dir(path: &Path) -> bool {
        path.is_dir()
            && KB_FILE_STEMS
                .iter()
                .all(|stem| KnowledgeBase::document_path(path, stem).is_some())
    }

    if let Some(kb_dir) = override_dir {
        if looks_like_kb_dir(&kb_dir) {
            return Ok(kb_dir);
        }
        return Err(PgxError::InvalidInput(format!(
            "PGX_KB_DIR override is not a knowledge base directory (must contain {})",
            KB_FILE_STEMS.join(", ")
        )));
    }

    let cwd_relative = PathBuf::from(DEFAULT_KNOWLEDGE_BASE_DIR);
    if looks_like_kb_dir(&cwd_relative) {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(DEFAULT_KNOWLEDGE_BASE_DIR);
        if looks_like_kb_dir(&candidate) {
            return Ok(candidate);
        }
    }

    Err(PgxError::InvalidInput(
        "could not locate knowledge/ directory with the knowledge base documents".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn override_must_contain_all_documents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("gene_drug_interactions.json"), "{}")
            .expect("write document");

        let err = resolve_knowledge_base_dir(Some(temp_dir.path().to_path_buf()))
            .expect_err("incomplete directory should be rejected");
        assert!(matches!(err, PgxError::InvalidInput(_)));

        fs::write(temp_dir.path().join("drug_drug_interactions.yaml"), "{}")
            .expect("write document");
        fs::write(temp_dir.path().join("dosing_guidelines.json"), "{}").expect("write document");

        let resolved = resolve_knowledge_base_dir(Some(temp_dir.path().to_path_buf()))
            .expect("complete directory should resolve");
        assert_eq!(resolved, temp_dir.path());
    }

    #[test]
    fn bundled_knowledge_base_is_found_without_override() {
        let resolved = resolve_knowledge_base_dir(None).expect("bundled knowledge/ should resolve");
        assert!(resolved.ends_with(DEFAULT_KNOWLEDGE_BASE_DIR));
    }

    #[test]
    fn config_rejects_missing_kb_dir() {
        let err = CoreConfig::new(PathBuf::from("/definitely/not/here"), PathBuf::from("out"))
            .expect_err("missing directory should be rejected");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn config_records_platform_version() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf(), temp_dir.path().join("out"))
            .expect("valid config");
        assert_eq!(cfg.platform_version(), PLATFORM_VERSION);
        assert_eq!(cfg.output_dir(), temp_dir.path().join("out"));
    }
}
