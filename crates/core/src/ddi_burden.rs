//! Drug-drug interaction burden.
//!
//! Weighs every interacting medication pair by severity (major 3, moderate 2, minor 1) and
//! bands the total into a burden level. Pairs whose knowledge base record carries an enzyme
//! shift are listed separately, since they change how the patient's genotype should be read.

use crate::patient::Patient;
use pgx_kb::{DrugInteraction, KnowledgeSource, ModulationDirection};
use pgx_types::DdiSeverity;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Weighted score at or above which the burden is high.
pub const HIGH_BURDEN_SCORE: u32 = 9;

/// Weighted score at or above which the burden is moderate.
pub const MODERATE_BURDEN_SCORE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BurdenLevel {
    None,
    Low,
    Moderate,
    High,
}

impl BurdenLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= HIGH_BURDEN_SCORE {
            BurdenLevel::High
        } else if score >= MODERATE_BURDEN_SCORE {
            BurdenLevel::Moderate
        } else if score >= 1 {
            BurdenLevel::Low
        } else {
            BurdenLevel::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BurdenLevel::None => "none",
            BurdenLevel::Low => "low",
            BurdenLevel::Moderate => "moderate",
            BurdenLevel::High => "high",
        }
    }
}

impl fmt::Display for BurdenLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

pub fn severity_weight(severity: DdiSeverity) -> u32 {
    match severity {
        DdiSeverity::Major => 3,
        DdiSeverity::Moderate => 2,
        DdiSeverity::Minor => 1,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub major: usize,
    pub moderate: usize,
    pub minor: usize,
}

/// An interacting pair that shifts a pharmacogene's activity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneLinkedInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub target_gene: String,
    pub direction: ModulationDirection,
    pub severity: DdiSeverity,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DdiBurden {
    pub patient_id: String,
    pub total_medications: usize,
    pub total_interactions: usize,
    pub by_severity: SeverityCounts,
    pub weighted_score: u32,
    pub level: BurdenLevel,
    pub gene_linked: Vec<GeneLinkedInteraction>,
}

impl DdiBurden {
    /// Build the burden from the interactions already found for a medication list.
    pub fn from_interactions(
        patient_id: &str,
        total_medications: usize,
        interactions: &[&DrugInteraction],
    ) -> Self {
        let mut by_severity = SeverityCounts::default();
        let mut gene_linked = Vec::new();

        for ddi in interactions {
            match ddi.severity {
                DdiSeverity::Major => by_severity.major += 1,
                DdiSeverity::Moderate => by_severity.moderate += 1,
                DdiSeverity::Minor => by_severity.minor += 1,
            }
            if let Some(link) = &ddi.phenoconversion {
                gene_linked.push(GeneLinkedInteraction {
                    drug_a: ddi.drug_a.clone(),
                    drug_b: ddi.drug_b.clone(),
                    target_gene: link.target_gene.clone(),
                    direction: link.direction,
                    severity: ddi.severity,
                });
            }
        }

        let weighted_score = interactions
            .iter()
            .map(|ddi| severity_weight(ddi.severity))
            .sum();

        Self {
            patient_id: patient_id.to_string(),
            total_medications,
            total_interactions: interactions.len(),
            by_severity,
            weighted_score,
            level: BurdenLevel::from_score(weighted_score),
            gene_linked,
        }
    }
}

/// Scores interaction burden against a shared knowledge source.
#[derive(Debug)]
pub struct DdiBurdenScorer<K: ?Sized> {
    kb: Arc<K>,
}

impl<K: ?Sized> Clone for DdiBurdenScorer<K> {
    fn clone(&self) -> Self {
        Self {
            kb: Arc::clone(&self.kb),
        }
    }
}

impl<K: KnowledgeSource + ?Sized> DdiBurdenScorer<K> {
    pub fn new(kb: Arc<K>) -> Self {
        Self { kb }
    }

    pub fn score_patient(&self, patient: &Patient) -> DdiBurden {
        let medications = patient.medication_names();
        let interactions = self.kb.drug_drug_interactions(&medications);
        let burden =
            DdiBurden::from_interactions(patient.patient_id(), medications.len(), &interactions);

        tracing::debug!(
            patient_id = patient.patient_id(),
            interactions = burden.total_interactions,
            weighted_score = burden.weighted_score,
            gene_linked = burden.gene_linked.len(),
            "ddi burden scored"
        );
        burden
    }

    pub fn score_cohort(&self, patients: &[Patient]) -> Vec<DdiBurden> {
        patients.iter().map(|p| self.score_patient(p)).collect()
    }
}
