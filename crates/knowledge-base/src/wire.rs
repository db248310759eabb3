//! Wire representations of the knowledge base documents.
//!
//! These structs mirror the files exactly and are strict: unknown keys and unknown
//! codes are rejected during deserialisation. Semantic checks that serde cannot
//! express live in `knowledge_base.rs`.

use crate::model::ModulationDirection;
use pgx_types::{DdiSeverity, DosingAdjustment, RiskLevel};
use serde::Deserialize;
use std::collections::BTreeMap;

// ============================================================================
// gene_drug_interactions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GeneDrugFileWire {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub gene_drug_interactions: Vec<GeneDrugInteractionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GeneDrugInteractionWire {
    pub gene: String,
    pub drug: String,

    #[serde(default)]
    pub drug_class: Option<String>,

    #[serde(default)]
    pub therapeutic_area: Option<String>,

    #[serde(default)]
    pub cpic_guideline: Option<String>,

    #[serde(default)]
    pub mechanism: Option<String>,

    #[serde(default)]
    pub references: Vec<String>,

    pub phenotype_impacts: BTreeMap<String, PhenotypeImpactWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PhenotypeImpactWire {
    pub risk_level: RiskLevel,

    #[serde(default)]
    pub effect: Option<String>,

    #[serde(default)]
    pub recommendation: Option<String>,

    #[serde(default)]
    pub clinical_consequence: Option<String>,

    #[serde(default)]
    pub dosing_adjustment: DosingAdjustment,

    #[serde(default)]
    pub evidence_level: Option<String>,

    #[serde(default)]
    pub fda_label: bool,
}

// ============================================================================
// drug_drug_interactions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DrugInteractionFileWire {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub drug_drug_interactions: Vec<DrugInteractionWire>,

    #[serde(default)]
    pub cyp_inhibitors: BTreeMap<String, InhibitorTiersWire>,

    #[serde(default)]
    pub cyp_inducers: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DrugInteractionWire {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: DdiSeverity,

    #[serde(default)]
    pub mechanism: Option<String>,

    #[serde(default)]
    pub clinical_effect: Option<String>,

    #[serde(default)]
    pub recommendation: Option<String>,

    #[serde(default)]
    pub evidence_level: Option<String>,

    #[serde(default)]
    pub references: Vec<String>,

    #[serde(default)]
    pub phenoconversion: Option<PhenoconversionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PhenoconversionWire {
    pub target_gene: String,
    pub direction: ModulationDirection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InhibitorTiersWire {
    #[serde(default)]
    pub strong: Vec<String>,

    #[serde(default)]
    pub moderate: Vec<String>,

    #[serde(default)]
    pub weak: Vec<String>,
}

// ============================================================================
// dosing_guidelines
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DosingFileWire {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub renal_adjustments: RenalSectionWire,

    #[serde(default)]
    pub hepatic_adjustments: HepaticSectionWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RenalSectionWire {
    #[serde(default)]
    pub egfr_thresholds: RenalThresholdsWire,

    #[serde(default)]
    pub drugs_requiring_renal_adjustment: BTreeMap<String, RenalDrugWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RenalThresholdsWire {
    #[serde(default)]
    pub normal: Option<StageLabelWire>,

    #[serde(default)]
    pub mild_impairment: Option<StageLabelWire>,

    #[serde(default)]
    pub moderate_impairment: Option<StageLabelWire>,

    #[serde(default)]
    pub severe_impairment: Option<StageLabelWire>,

    #[serde(default)]
    pub kidney_failure: Option<StageLabelWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StageLabelWire {
    pub label: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RenalDrugWire {
    pub egfr_cutoff: f64,

    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HepaticSectionWire {
    #[serde(default)]
    pub drugs_requiring_hepatic_adjustment: BTreeMap<String, String>,
}
