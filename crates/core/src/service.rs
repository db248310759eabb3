//! Patient analysis orchestration.
//!
//! [`PgxService`] wires the interpretation engine, risk scorer and recommender over one
//! shared knowledge base and produces a self-contained [`PatientAnalysis`] per patient.
//! The service holds no mutable state, so a single instance behind an `Arc` can serve
//! many worker threads.

use crate::clinical_validation::{calculate_metrics, CaseResult, ClinicalValidator, ValidationMetrics};
use crate::config::CoreConfig;
use crate::ddi_burden::{BurdenLevel, DdiBurden, DdiBurdenScorer};
use crate::engine::InterpretationEngine;
use crate::finding::ScoredFinding;
use crate::patient::{ClinicalContext, Demographics, Patient};
use crate::recommender::{Recommendation, Recommender};
use crate::scoring::{RiskScorer, RiskSummary};
use crate::{PgxError, PgxResult};
use chrono::{DateTime, Utc};
use pgx_kb::{DrugInteraction, KbVersion, KnowledgeBase, KnowledgeSource};
use pgx_types::RiskCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// File name of the cohort summary written next to per-patient analyses.
pub const COHORT_SUMMARY_FILE: &str = "cohort_summary.json";

/// Full analysis of one patient.
#[derive(Clone, Debug, Serialize)]
pub struct PatientAnalysis {
    pub patient_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub platform_version: String,
    pub kb_version: KbVersion,
    pub demographics: Demographics,
    pub clinical_context: Option<ClinicalContext>,
    pub medications_analyzed: Vec<String>,
    pub genes_tested: Vec<String>,
    pub findings: Vec<ScoredFinding>,
    pub risk_summary: RiskSummary,
    pub recommendations: Vec<Recommendation>,
    /// Raw knowledge base records for every interacting medication pair.
    pub drug_interactions: Vec<DrugInteraction>,
    pub ddi_burden: DdiBurden,
}

/// One line of the cohort summary.
#[derive(Clone, Debug, Serialize)]
pub struct CohortEntry {
    pub patient_id: String,
    pub risk_category: RiskCategory,
    pub overall_score: f64,
    pub total_findings: usize,
    pub actionable_count: usize,
    pub recommendation_count: usize,
    pub ddi_burden: BurdenLevel,
}

#[derive(Clone, Debug, Serialize)]
pub struct CohortSummary {
    pub generated_at: DateTime<Utc>,
    pub platform_version: String,
    pub kb_version: KbVersion,
    pub patient_count: usize,
    /// Patients per risk category label.
    pub by_category: BTreeMap<&'static str, usize>,
    pub patients: Vec<CohortEntry>,
}

/// Runs the full pharmacogenomic pipeline for patients.
#[derive(Clone, Debug)]
pub struct PgxService {
    cfg: Arc<CoreConfig>,
    kb: Arc<KnowledgeBase>,
    engine: InterpretationEngine<KnowledgeBase>,
    scorer: RiskScorer,
    recommender: Recommender,
    ddi_burden: DdiBurdenScorer<KnowledgeBase>,
}

impl PgxService {
    pub fn new(cfg: Arc<CoreConfig>, kb: Arc<KnowledgeBase>) -> Self {
        Self {
            cfg,
            engine: InterpretationEngine::new(Arc::clone(&kb)),
            ddi_burden: DdiBurdenScorer::new(Arc::clone(&kb)),
            kb,
            scorer: RiskScorer::new(),
            recommender: Recommender::new(),
        }
    }

    /// Load the knowledge base from the configured directory and build the service.
    ///
    /// # Errors
    ///
    /// Returns `PgxError::KnowledgeBase` if any KB document is missing, unreadable or invalid.
    pub fn load(cfg: Arc<CoreConfig>) -> PgxResult<Self> {
        let kb = KnowledgeBase::load(cfg.knowledge_base_dir())?;
        Ok(Self::new(cfg, Arc::new(kb)))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn engine(&self) -> &InterpretationEngine<KnowledgeBase> {
        &self.engine
    }

    /// Interpret, score and build recommendations for one patient.
    pub fn analyze_patient(&self, patient: &Patient) -> PatientAnalysis {
        let medications = patient.medication_names();

        let findings = self.engine.generate_findings(patient);
        let scored = self.scorer.score_findings(findings);
        let risk_summary = self.scorer.get_patient_risk_summary(&scored);
        let recommendations = self
            .recommender
            .generate_recommendations(&scored, patient);
        let drug_interactions = self
            .kb
            .drug_drug_interactions(&medications)
            .into_iter()
            .cloned()
            .collect();
        let ddi_burden = self.ddi_burden.score_patient(patient);

        tracing::info!(
            patient_id = patient.patient_id(),
            findings = scored.len(),
            recommendations = recommendations.len(),
            category = %risk_summary.category,
            "patient analyzed"
        );

        PatientAnalysis {
            patient_id: patient.patient_id().to_string(),
            analyzed_at: Utc::now(),
            platform_version: self.cfg.platform_version().to_string(),
            kb_version: self.kb.version().clone(),
            demographics: patient.demographics.clone(),
            clinical_context: patient.clinical_context.clone(),
            medications_analyzed: medications,
            genes_tested: patient.genes_tested(),
            findings: scored,
            risk_summary,
            recommendations,
            drug_interactions,
            ddi_burden,
        }
    }

    /// Analyze each patient in order.
    pub fn analyze_cohort(&self, patients: &[Patient]) -> Vec<PatientAnalysis> {
        patients.iter().map(|p| self.analyze_patient(p)).collect()
    }

    /// Write `<output_dir>/<patient_id>.json`, creating the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `PgxError::FileWrite` if the directory or file cannot be written, or
    /// `PgxError::Serialization` if the analysis cannot be encoded.
    pub fn write_analysis(&self, analysis: &PatientAnalysis) -> PgxResult<PathBuf> {
        let path = self
            .cfg
            .output_dir()
            .join(format!("{}.json", analysis.patient_id));
        self.write_json(path, analysis)
    }

    /// Summarise a cohort's analyses.
    pub fn cohort_summary(&self, analyses: &[PatientAnalysis]) -> CohortSummary {
        let mut by_category: BTreeMap<&'static str, usize> = BTreeMap::new();
        let patients = analyses
            .iter()
            .map(|a| {
                *by_category.entry(a.risk_summary.category.label()).or_default() += 1;
                CohortEntry {
                    patient_id: a.patient_id.clone(),
                    risk_category: a.risk_summary.category,
                    overall_score: a.risk_summary.overall_score,
                    total_findings: a.risk_summary.total_findings,
                    actionable_count: a.risk_summary.actionable_count,
                    recommendation_count: a.recommendations.len(),
                    ddi_burden: a.ddi_burden.level,
                }
            })
            .collect();

        CohortSummary {
            generated_at: Utc::now(),
            platform_version: self.cfg.platform_version().to_string(),
            kb_version: self.kb.version().clone(),
            patient_count: analyses.len(),
            by_category,
            patients,
        }
    }

    /// Write the cohort summary to `<output_dir>/cohort_summary.json`.
    ///
    /// # Errors
    ///
    /// As for [`PgxService::write_analysis`].
    pub fn write_cohort_summary(&self, summary: &CohortSummary) -> PgxResult<PathBuf> {
        let path = self.cfg.output_dir().join(COHORT_SUMMARY_FILE);
        self.write_json(path, summary)
    }

    /// Run the built-in clinical reference cases against this service's knowledge base.
    ///
    /// # Errors
    ///
    /// Returns `PgxError::InvalidInput` if a reference case cannot be built.
    pub fn run_validation(&self) -> PgxResult<(Vec<CaseResult>, ValidationMetrics)> {
        let validator = ClinicalValidator::new()?;
        let results = validator.run_validation(&self.engine, &self.scorer, &self.recommender);
        let metrics = calculate_metrics(&results);
        Ok((results, metrics))
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> PgxResult<PathBuf> {
        let output_dir = self.cfg.output_dir();
        fs::create_dir_all(output_dir).map_err(|source| PgxError::FileWrite {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let json = serde_json::to_string_pretty(value).map_err(PgxError::Serialization)?;
        fs::write(&path, json).map_err(|source| PgxError::FileWrite {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "analysis written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgx_types::{ActionType, FindingType, Severity};
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir) -> PgxService {
        let kb = KnowledgeBase::from_json(
            r#"{
                "version": "test-gd",
                "gene_drug_interactions": [
                    {
                        "gene": "CYP2D6",
                        "drug": "codeine",
                        "mechanism": "Prodrug activated by CYP2D6.",
                        "phenotype_impacts": {
                            "ultra_rapid_metabolizer": { "risk_level": "critical", "effect": "Excess morphine", "dosing_adjustment": "contraindicated", "evidence_level": "CPIC Level A", "fda_label": true }
                        }
                    }
                ]
            }"#,
            r#"{
                "version": "test-ddi",
                "drug_drug_interactions": [
                    { "drug_a": "fluoxetine", "drug_b": "codeine", "severity": "major", "clinical_effect": "Reduced analgesia" }
                ]
            }"#,
            r#"{ "version": "test-dosing" }"#,
        )
        .expect("fixture kb loads");

        let cfg = CoreConfig::new(temp_dir.path().to_path_buf(), temp_dir.path().join("out"))
            .expect("valid config");
        PgxService::new(Arc::new(cfg), Arc::new(kb))
    }

    fn patient() -> Patient {
        Patient::new("SVC_001")
            .expect("valid id")
            .with_genotype("CYP2D6", "ultra_rapid_metabolizer", Some("*1/*1xN"))
            .with_medication("codeine")
            .with_medication("fluoxetine")
    }

    #[test]
    fn analysis_carries_pipeline_outputs_and_versions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);

        let analysis = svc.analyze_patient(&patient());
        assert_eq!(analysis.patient_id, "SVC_001");
        assert_eq!(analysis.medications_analyzed, vec!["codeine", "fluoxetine"]);
        assert_eq!(analysis.genes_tested, vec!["CYP2D6"]);
        assert_eq!(analysis.kb_version.gene_drug.as_deref(), Some("test-gd"));
        assert_eq!(analysis.drug_interactions.len(), 1);
        assert_eq!(analysis.ddi_burden.weighted_score, 3);
        assert_eq!(analysis.ddi_burden.level, BurdenLevel::Low);
        assert!(analysis.ddi_burden.gene_linked.is_empty());
        assert_eq!(analysis.risk_summary.category, RiskCategory::Critical);

        let top = &analysis.findings[0];
        assert_eq!(top.finding.finding_type, FindingType::Contraindication);
        assert_eq!(top.finding.severity, Severity::Critical);
        assert_eq!(top.risk_score, 100.0);

        let codeine = analysis
            .recommendations
            .iter()
            .find(|r| r.drug == "codeine")
            .expect("codeine recommendation");
        assert_eq!(codeine.action_type, ActionType::StopDrug);
    }

    #[test]
    fn write_analysis_creates_output_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);

        let analysis = svc.analyze_patient(&patient());
        let path = svc.write_analysis(&analysis).expect("write analysis");
        assert_eq!(path, temp_dir.path().join("out").join("SVC_001.json"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
        assert_eq!(written["patient_id"], "SVC_001");
        assert_eq!(
            written["risk_summary"]["category"],
            "Critical - Immediate Action Required"
        );
        assert_eq!(written["findings"][0]["risk_score"], 100.0);
        assert_eq!(written["recommendations"][0]["priority"], 1);
    }

    #[test]
    fn cohort_summary_counts_categories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let svc = service(&temp_dir);

        let quiet = Patient::new("SVC_002").expect("valid id");
        let analyses = svc.analyze_cohort(&[patient(), quiet]);
        let summary = svc.cohort_summary(&analyses);

        assert_eq!(summary.patient_count, 2);
        assert_eq!(summary.by_category.get("Critical - Immediate Action Required"), Some(&1));
        assert_eq!(summary.by_category.get("Low - Informational"), Some(&1));
        assert_eq!(summary.patients[1].recommendation_count, 0);

        let path = svc.write_cohort_summary(&summary).expect("write summary");
        assert!(path.ends_with(COHORT_SUMMARY_FILE));
    }
}
