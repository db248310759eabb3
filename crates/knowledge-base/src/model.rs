//! Domain-level knowledge base records.
//!
//! These are the validated forms handed out by [`crate::KnowledgeSource`] queries.

use pgx_types::{DdiSeverity, DosingAdjustment, EvidenceLevel, InhibitorStrength, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Clinical impact of one phenotype on one gene-drug pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhenotypeImpact {
    pub risk_level: RiskLevel,
    pub effect: Option<String>,
    pub recommendation: Option<String>,
    pub clinical_consequence: Option<String>,
    pub dosing_adjustment: DosingAdjustment,
    pub evidence_level: Option<EvidenceLevel>,
    pub fda_label: bool,
}

/// Gene-drug interaction record with its per-phenotype impacts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GeneDrugInteraction {
    pub gene: String,
    pub drug: String,
    pub drug_class: Option<String>,
    pub therapeutic_area: Option<String>,
    pub cpic_guideline: Option<String>,
    pub mechanism: Option<String>,
    pub references: Vec<String>,
    /// Keyed by case-folded phenotype label.
    pub(crate) phenotype_impacts: BTreeMap<String, PhenotypeImpact>,
}

impl GeneDrugInteraction {
    /// Impact defined for `phenotype`, if any. Matching is case-insensitive.
    pub fn impact_for(&self, phenotype: &str) -> Option<&PhenotypeImpact> {
        self.phenotype_impacts
            .get(pgx_types::LookupKey::fold(phenotype).as_str())
    }

    /// Phenotype labels that carry an impact, in sorted order.
    pub fn phenotypes(&self) -> impl Iterator<Item = &str> {
        self.phenotype_impacts.keys().map(String::as_str)
    }
}

/// Whether a perpetrator drug inhibits or induces an enzyme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationDirection {
    Inhibition,
    Induction,
}

/// Enzyme shift caused by a drug-drug interaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhenoconversionLink {
    pub target_gene: String,
    pub direction: ModulationDirection,
}

/// Drug-drug interaction record for an unordered drug pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrugInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: DdiSeverity,
    pub mechanism: Option<String>,
    pub clinical_effect: Option<String>,
    pub recommendation: Option<String>,
    pub evidence_level: Option<EvidenceLevel>,
    pub references: Vec<String>,
    pub phenoconversion: Option<PhenoconversionLink>,
}

/// A CYP inhibitor found in a medication list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CypInhibitor {
    pub drug: String,
    pub gene: String,
    pub strength: InhibitorStrength,
}

/// Renal dose adjustment triggered by an eGFR below the drug's cutoff.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenalAdjustment {
    pub drug: String,
    pub egfr: f64,
    pub cutoff: f64,
    pub action: String,
    pub renal_stage: String,
}

/// Grade of a hepatic adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HepaticSeverity {
    Severe,
    Moderate,
}

/// Hepatic adjustment triggered by an elevated ALT/ULN ratio.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HepaticAdjustment {
    pub drug: String,
    pub alt_ratio: f64,
    pub action: String,
    pub severity: HepaticSeverity,
}
