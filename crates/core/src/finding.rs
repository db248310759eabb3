//! Findings produced by interpretation and their scored form.

use pgx_types::{
    DosingAdjustment, EvidenceLevel, FindingSource, FindingType, LookupKey, Severity,
};
use serde::Serialize;

/// One clinical finding for one patient.
///
/// Every optional attribute is always present on the value; a step that has nothing to say
/// about a field leaves it `None` or empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Finding {
    pub finding_type: FindingType,
    pub severity: Severity,
    pub gene: Option<String>,
    /// Medication name, or `"drug_a + drug_b"` for a drug-drug interaction.
    pub drug: String,
    pub phenotype: Option<String>,
    pub diplotype: Option<String>,
    /// Genotype-predicted phenotype, set on phenoconversion findings.
    pub genetic_phenotype: Option<String>,
    /// Perpetrator drugs behind a phenoconversion.
    pub inhibitor_drugs: Vec<String>,
    pub summary: String,
    pub recommendation: Option<String>,
    pub clinical_consequence: Option<String>,
    pub dosing_adjustment: Option<DosingAdjustment>,
    pub evidence_level: Option<EvidenceLevel>,
    pub fda_label: bool,
    pub mechanism: Option<String>,
    pub cpic_guideline: Option<String>,
    pub references: Vec<String>,
    pub therapeutic_area: Option<String>,
    pub drug_class: Option<String>,
    pub source: FindingSource,
}

impl Finding {
    /// A finding with only its identity and summary set.
    pub fn new(
        finding_type: FindingType,
        severity: Severity,
        drug: impl Into<String>,
        summary: impl Into<String>,
        source: FindingSource,
    ) -> Self {
        Self {
            finding_type,
            severity,
            gene: None,
            drug: drug.into(),
            phenotype: None,
            diplotype: None,
            genetic_phenotype: None,
            inhibitor_drugs: Vec::new(),
            summary: summary.into(),
            recommendation: None,
            clinical_consequence: None,
            dosing_adjustment: None,
            evidence_level: None,
            fda_label: false,
            mechanism: None,
            cpic_guideline: None,
            references: Vec::new(),
            therapeutic_area: None,
            drug_class: None,
            source,
        }
    }

    /// Identity used for deduplication: case-folded (drug, gene, finding type).
    pub fn dedup_key(&self) -> (String, String, FindingType) {
        (
            LookupKey::fold(&self.drug),
            self.gene.as_deref().map(LookupKey::fold).unwrap_or_default(),
            self.finding_type,
        )
    }
}

/// A finding with its 0-100 risk score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredFinding {
    #[serde(flatten)]
    pub finding: Finding,
    pub risk_score: f64,
}
