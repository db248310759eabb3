//! Interpretation engine.
//!
//! Evaluates one patient's genotype, medication list and labs against the knowledge base.
//! The steps run in a fixed order and their results are concatenated, then deduplicated on
//! (drug, gene, finding type):
//!
//! 1. gene-drug interactions from the patient's own phenotypes
//! 2. phenoconversion caused by CYP inhibitors or inducers in the medication list
//! 3. pairwise drug-drug interactions
//! 4. renal adjustment, when eGFR is recorded
//! 5. hepatic adjustment, when ALT is recorded
//!
//! Missing data (untested gene, unknown drug, absent lab) produces no finding and is never
//! an error.

use crate::constants::{
    ALT_LAB, ALT_UPPER_LIMIT_OF_NORMAL, EGFR_LAB, PHENOCONVERSION_GENES, RENAL_HIGH_SEVERITY_EGFR,
};
use crate::finding::Finding;
use crate::patient::Patient;
use pgx_kb::{GeneDrugInteraction, HepaticSeverity, KnowledgeSource, PhenotypeImpact};
use pgx_types::{
    DosingAdjustment, EvidenceLevel, FindingSource, FindingType, FunctionalPhenotype, LookupKey,
    Severity,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Rule-evaluation engine over a shared, read-only knowledge source.
#[derive(Debug)]
pub struct InterpretationEngine<K: ?Sized> {
    kb: Arc<K>,
}

impl<K: ?Sized> Clone for InterpretationEngine<K> {
    fn clone(&self) -> Self {
        Self {
            kb: Arc::clone(&self.kb),
        }
    }
}

impl<K: KnowledgeSource + ?Sized> InterpretationEngine<K> {
    pub fn new(kb: Arc<K>) -> Self {
        Self { kb }
    }

    pub fn knowledge(&self) -> &K {
        &self.kb
    }

    /// Generate the deduplicated findings for one patient.
    pub fn generate_findings(&self, patient: &Patient) -> Vec<Finding> {
        let medications = patient.medication_names();

        let mut findings = self.gene_drug_findings(patient, &medications);
        findings.extend(self.phenoconversion_findings(patient, &medications));
        findings.extend(self.drug_interaction_findings(&medications));

        if let Some(egfr) = patient.lab_value(EGFR_LAB) {
            findings.extend(self.renal_findings(&medications, egfr));
        }
        if let Some(alt) = patient.lab_value(ALT_LAB) {
            let alt_ratio = alt / ALT_UPPER_LIMIT_OF_NORMAL;
            findings.extend(self.hepatic_findings(&medications, alt_ratio));
        }

        let raw = findings.len();
        let findings = deduplicate_findings(findings);
        tracing::debug!(
            patient_id = patient.patient_id(),
            raw,
            kept = findings.len(),
            "interpretation complete"
        );
        findings
    }

    fn gene_drug_findings(&self, patient: &Patient, medications: &[String]) -> Vec<Finding> {
        let mut findings = Vec::new();

        for drug in medications {
            for interaction in self.kb.interactions_for_drug(drug) {
                let Some(call) = patient.genotype_for(&interaction.gene) else {
                    continue;
                };
                let Some(impact) = interaction.impact_for(&call.phenotype) else {
                    continue;
                };

                let (finding_type, severity) =
                    if impact.dosing_adjustment == DosingAdjustment::Contraindicated {
                        (FindingType::Contraindication, Severity::Critical)
                    } else {
                        (
                            FindingType::GeneDrugInteraction,
                            impact
                                .risk_level
                                .elevated_severity()
                                .unwrap_or(Severity::Informational),
                        )
                    };

                let summary = format!(
                    "{} {}: {}",
                    interaction.gene,
                    title_case(&call.phenotype),
                    impact.effect.as_deref().unwrap_or_default()
                );
                let mut finding = Finding::new(
                    finding_type,
                    severity,
                    drug.as_str(),
                    summary,
                    FindingSource::Genotype,
                );
                finding.phenotype = Some(call.phenotype.clone());
                finding.diplotype = call.diplotype.clone();
                finding.fda_label = impact.fda_label;
                finding.mechanism = interaction.mechanism.clone();
                apply_interaction_context(&mut finding, interaction, impact);
                findings.push(finding);
            }
        }

        findings
    }

    fn phenoconversion_findings(&self, patient: &Patient, medications: &[String]) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut inhibitors = None;
        let mut inducers = None;

        for gene in PHENOCONVERSION_GENES {
            let Some(functional) = self.kb.phenoconversion(medications, gene) else {
                continue;
            };
            let Some(call) = patient.genotype_for(gene) else {
                continue;
            };
            if phenotype_rank(functional.label()) <= phenotype_rank(&call.phenotype) {
                continue;
            }

            let gene_key = LookupKey::fold(gene);
            let perpetrators: Vec<String> = if functional.is_inhibition() {
                inhibitors
                    .get_or_insert_with(|| self.kb.cyp_inhibitors_in_list(medications))
                    .get(&gene_key)
                    .map(|found| found.iter().map(|i| i.drug.clone()).collect())
                    .unwrap_or_default()
            } else {
                inducers
                    .get_or_insert_with(|| self.kb.cyp_inducers_in_list(medications))
                    .get(&gene_key)
                    .cloned()
                    .unwrap_or_default()
            };
            let excluded: HashSet<String> =
                perpetrators.iter().map(|d| LookupKey::fold(d)).collect();
            let names = perpetrators.join(", ");
            let verb = if functional.is_inhibition() {
                "inhibits"
            } else {
                "induces"
            };

            for drug in medications {
                if excluded.contains(&LookupKey::fold(drug)) {
                    continue;
                }
                let Some(interaction) = self.kb.gene_drug_interaction(gene, drug) else {
                    continue;
                };
                let Some(impact) = interaction.impact_for(functional.label()) else {
                    continue;
                };
                let Some(severity) = impact.risk_level.elevated_severity() else {
                    continue;
                };

                findings.push(self.phenoconversion_finding(
                    PhenoconversionShift {
                        gene,
                        drug,
                        functional,
                        genetic_phenotype: &call.phenotype,
                        perpetrators: &perpetrators,
                        names: &names,
                        verb,
                    },
                    severity,
                    interaction,
                    impact,
                ));
            }
        }

        findings
    }

    fn phenoconversion_finding(
        &self,
        shift: PhenoconversionShift<'_>,
        severity: Severity,
        interaction: &GeneDrugInteraction,
        impact: &PhenotypeImpact,
    ) -> Finding {
        let PhenoconversionShift {
            gene,
            drug,
            functional,
            genetic_phenotype,
            perpetrators,
            names,
            verb,
        } = shift;

        let summary = format!(
            "Phenoconversion: {names} {verb} {gene}, shifting functional phenotype from {} to {} for {drug}",
            title_case(genetic_phenotype),
            title_case(functional.label()),
        );
        let mut finding = Finding::new(
            FindingType::Phenoconversion,
            severity,
            drug.as_str(),
            summary,
            FindingSource::Phenoconversion,
        );
        finding.gene = Some(gene.to_string());
        finding.phenotype = Some(functional.label().to_string());
        finding.genetic_phenotype = Some(genetic_phenotype.to_string());
        finding.inhibitor_drugs = perpetrators.to_vec();
        finding.mechanism = Some(format!(
            "{names} {verb} {gene} enzyme activity, altering metabolism of {drug}"
        ));
        apply_interaction_context(&mut finding, interaction, impact);
        finding
    }

    fn drug_interaction_findings(&self, medications: &[String]) -> Vec<Finding> {
        self.kb
            .drug_drug_interactions(medications)
            .into_iter()
            .map(|ddi| {
                let summary = format!(
                    "Drug interaction: {} + {} - {}",
                    ddi.drug_a,
                    ddi.drug_b,
                    ddi.clinical_effect.as_deref().unwrap_or_default()
                );
                let mut finding = Finding::new(
                    FindingType::DrugDrugInteraction,
                    ddi.severity.to_severity(),
                    format!("{} + {}", ddi.drug_a, ddi.drug_b),
                    summary,
                    FindingSource::Ddi,
                );
                finding.gene = ddi.phenoconversion.as_ref().map(|p| p.target_gene.clone());
                finding.recommendation = ddi.recommendation.clone();
                finding.clinical_consequence = ddi.clinical_effect.clone();
                finding.mechanism = ddi.mechanism.clone();
                finding.evidence_level = ddi.evidence_level.clone();
                finding.references = ddi.references.clone();
                finding
            })
            .collect()
    }

    fn renal_findings(&self, medications: &[String], egfr: f64) -> Vec<Finding> {
        medications
            .iter()
            .filter_map(|drug| self.kb.renal_adjustment(drug, egfr))
            .map(|adjustment| {
                let severity = if egfr < RENAL_HIGH_SEVERITY_EGFR {
                    Severity::High
                } else {
                    Severity::Moderate
                };
                let mut finding = Finding::new(
                    FindingType::RenalWarning,
                    severity,
                    adjustment.drug,
                    format!("Renal impairment (eGFR {egfr}): {}", adjustment.action),
                    FindingSource::Renal,
                );
                finding.clinical_consequence = Some(format!(
                    "Drug accumulation risk with eGFR {egfr} ({})",
                    adjustment.renal_stage
                ));
                finding.recommendation = Some(adjustment.action);
                finding.evidence_level = Some(EvidenceLevel::StandardOfCare);
                finding.fda_label = true;
                finding
            })
            .collect()
    }

    fn hepatic_findings(&self, medications: &[String], alt_ratio: f64) -> Vec<Finding> {
        medications
            .iter()
            .filter_map(|drug| self.kb.hepatic_adjustment(drug, alt_ratio))
            .map(|adjustment| {
                let severity = match adjustment.severity {
                    HepaticSeverity::Severe => Severity::High,
                    HepaticSeverity::Moderate => Severity::Moderate,
                };
                let mut finding = Finding::new(
                    FindingType::HepaticWarning,
                    severity,
                    adjustment.drug,
                    format!(
                        "Hepatic concern (ALT {alt_ratio:.1}x ULN): {}",
                        adjustment.action
                    ),
                    FindingSource::Hepatic,
                );
                finding.clinical_consequence =
                    Some(format!("Hepatotoxicity risk with ALT {alt_ratio:.1}x ULN"));
                finding.recommendation = Some(adjustment.action);
                finding.evidence_level = Some(EvidenceLevel::StandardOfCare);
                finding.fda_label = true;
                finding
            })
            .collect()
    }
}

struct PhenoconversionShift<'a> {
    gene: &'a str,
    drug: &'a String,
    functional: FunctionalPhenotype,
    genetic_phenotype: &'a str,
    perpetrators: &'a [String],
    names: &'a str,
    verb: &'a str,
}

/// Copy the record-level and impact-level context shared by genotype and
/// phenoconversion findings.
fn apply_interaction_context(
    finding: &mut Finding,
    interaction: &GeneDrugInteraction,
    impact: &PhenotypeImpact,
) {
    if finding.gene.is_none() {
        finding.gene = Some(interaction.gene.clone());
    }
    finding.recommendation = impact.recommendation.clone();
    finding.clinical_consequence = impact.clinical_consequence.clone();
    finding.dosing_adjustment = Some(impact.dosing_adjustment);
    finding.evidence_level = impact.evidence_level.clone();
    finding.cpic_guideline = interaction.cpic_guideline.clone();
    finding.references = interaction.references.clone();
    finding.therapeutic_area = interaction.therapeutic_area.clone();
    finding.drug_class = interaction.drug_class.clone();
}

/// Keep one finding per (drug, gene, finding type).
///
/// The higher-severity finding wins a collision and takes the slot of the first one seen,
/// so output order follows first appearance.
pub fn deduplicate_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut slots: HashMap<(String, String, FindingType), usize> = HashMap::new();
    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());

    for finding in findings {
        match slots.get(&finding.dedup_key()) {
            Some(&slot) => {
                if finding.severity.rank() > kept[slot].severity.rank() {
                    kept[slot] = finding;
                }
            }
            None => {
                slots.insert(finding.dedup_key(), kept.len());
                kept.push(finding);
            }
        }
    }

    kept
}

/// Ordinal of how concerning a phenotype is, used to decide whether a drug-induced shift
/// makes things worse than the genotype alone. Unknown labels rank 0.
pub fn phenotype_rank(phenotype: &str) -> u8 {
    match LookupKey::fold(phenotype).as_str() {
        "normal_metabolizer" | "normal_function" | "normal_sensitivity" | "hla_b_1502_negative" => 0,
        "intermediate_metabolizer" | "intermediate_function" => 1,
        "moderate_sensitivity" => 2,
        "poor_metabolizer" | "poor_function" | "ultra_rapid_metabolizer" => 3,
        "high_sensitivity" | "hla_b_1502_positive" => 4,
        _ => 0,
    }
}

/// `"ultra_rapid_metabolizer"` -> `"Ultra Rapid Metabolizer"`.
fn title_case(label: &str) -> String {
    label
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgx_kb::KnowledgeBase;

    const GENE_DRUG: &str = r#"{
        "gene_drug_interactions": [
            {
                "gene": "CYP2D6", "drug": "codeine",
                "mechanism": "Prodrug activated by CYP2D6",
                "phenotype_impacts": {
                    "ultra_rapid_metabolizer": { "risk_level": "critical", "effect": "Excess morphine", "dosing_adjustment": "contraindicated", "evidence_level": "CPIC Level A", "fda_label": true },
                    "poor_metabolizer": { "risk_level": "high", "effect": "No analgesia", "dosing_adjustment": "use_alternative_preferred", "evidence_level": "CPIC Level A" },
                    "intermediate_metabolizer": { "risk_level": "moderate", "effect": "Reduced analgesia", "dosing_adjustment": "monitor" },
                    "normal_metabolizer": { "risk_level": "low", "effect": "Expected response" }
                }
            },
            {
                "gene": "CYP2D6", "drug": "metoprolol",
                "phenotype_impacts": {
                    "poor_metabolizer": { "risk_level": "moderate", "effect": "Higher exposure", "dosing_adjustment": "reduce_50_percent", "evidence_level": "CPIC Level B" },
                    "intermediate_metabolizer": { "risk_level": "low", "effect": "Mild" }
                }
            },
            {
                "gene": "CYP3A4", "drug": "simvastatin",
                "phenotype_impacts": {
                    "ultra_rapid_metabolizer": { "risk_level": "moderate", "effect": "Lower exposure", "dosing_adjustment": "monitor" }
                }
            }
        ]
    }"#;

    const DRUG_DRUG: &str = r#"{
        "drug_drug_interactions": [
            { "drug_a": "fluoxetine", "drug_b": "codeine", "severity": "major", "clinical_effect": "Loss of analgesia", "mechanism": "CYP2D6 inhibition", "evidence_level": "strong", "phenoconversion": { "target_gene": "CYP2D6", "direction": "inhibition" } },
            { "drug_a": "aspirin", "drug_b": "ibuprofen", "severity": "minor", "clinical_effect": "GI irritation" }
        ],
        "cyp_inhibitors": {
            "CYP2D6": { "strong": ["fluoxetine"], "moderate": ["duloxetine"] }
        },
        "cyp_inducers": { "CYP3A4": ["rifampin"] }
    }"#;

    const DOSING: &str = r#"{
        "renal_adjustments": {
            "drugs_requiring_renal_adjustment": { "metformin": { "egfr_cutoff": 30, "action": "Stop metformin" } }
        },
        "hepatic_adjustments": {
            "drugs_requiring_hepatic_adjustment": { "simvastatin": "Avoid" }
        }
    }"#;

    fn engine() -> InterpretationEngine<KnowledgeBase> {
        let kb = KnowledgeBase::from_json(GENE_DRUG, DRUG_DRUG, DOSING).expect("fixture KB");
        InterpretationEngine::new(Arc::new(kb))
    }

    fn patient() -> Patient {
        Patient::new("T1").expect("valid id")
    }

    #[test]
    fn contraindication_escalates_to_critical() {
        let p = patient()
            .with_genotype("CYP2D6", "ultra_rapid_metabolizer", Some("*1/*1xN"))
            .with_medication("codeine");
        let findings = engine().generate_findings(&p);

        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.finding_type, FindingType::Contraindication);
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.gene.as_deref(), Some("CYP2D6"));
        assert_eq!(f.drug, "codeine");
        assert_eq!(f.diplotype.as_deref(), Some("*1/*1xN"));
        assert_eq!(f.summary, "CYP2D6 Ultra Rapid Metabolizer: Excess morphine");
        assert_eq!(f.source, FindingSource::Genotype);
        assert!(f.fda_label);
    }

    #[test]
    fn low_risk_impact_is_informational() {
        let p = patient()
            .with_genotype("cyp2d6", "normal_metabolizer", None)
            .with_medication("Codeine");
        let findings = engine().generate_findings(&p);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Informational);
        assert_eq!(findings[0].drug, "Codeine");
    }

    #[test]
    fn untested_gene_and_unknown_drug_yield_nothing() {
        let p = patient()
            .with_genotype("CYP2C19", "poor_metabolizer", None)
            .with_medication("codeine")
            .with_medication("paracetamol");
        assert!(engine().generate_findings(&p).is_empty());
        assert!(engine().generate_findings(&patient()).is_empty());
    }

    #[test]
    fn phenoconversion_flags_victim_drug_not_inhibitor() {
        let p = patient()
            .with_genotype("CYP2D6", "normal_metabolizer", None)
            .with_medication("metoprolol")
            .with_medication("fluoxetine");
        let findings = engine().generate_findings(&p);

        let pheno: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.finding_type == FindingType::Phenoconversion)
            .collect();
        assert_eq!(pheno.len(), 1);
        let f = pheno[0];
        assert_eq!(f.drug, "metoprolol");
        assert_eq!(f.severity, Severity::Moderate);
        assert_eq!(f.phenotype.as_deref(), Some("poor_metabolizer"));
        assert_eq!(f.genetic_phenotype.as_deref(), Some("normal_metabolizer"));
        assert_eq!(f.inhibitor_drugs, vec!["fluoxetine".to_string()]);
        assert!(!f.fda_label);
        assert_eq!(
            f.summary,
            "Phenoconversion: fluoxetine inhibits CYP2D6, shifting functional phenotype from Normal Metabolizer to Poor Metabolizer for metoprolol"
        );
        assert_eq!(
            f.mechanism.as_deref(),
            Some("fluoxetine inhibits CYP2D6 enzyme activity, altering metabolism of metoprolol")
        );
    }

    #[test]
    fn phenoconversion_requires_worsening() {
        let p = patient()
            .with_genotype("CYP2D6", "poor_metabolizer", None)
            .with_medication("metoprolol")
            .with_medication("fluoxetine");
        let findings = engine().generate_findings(&p);
        assert!(findings
            .iter()
            .all(|f| f.finding_type != FindingType::Phenoconversion));
    }

    #[test]
    fn phenoconversion_skips_low_risk_functional_impact() {
        let p = patient()
            .with_genotype("CYP2D6", "normal_metabolizer", None)
            .with_medication("metoprolol")
            .with_medication("duloxetine");
        let findings = engine().generate_findings(&p);
        assert!(findings
            .iter()
            .all(|f| f.finding_type != FindingType::Phenoconversion));
    }

    #[test]
    fn induction_names_the_inducer() {
        let p = patient()
            .with_genotype("CYP3A4", "normal_metabolizer", None)
            .with_medication("simvastatin")
            .with_medication("Rifampin");
        let findings = engine().generate_findings(&p);
        let f = findings
            .iter()
            .find(|f| f.finding_type == FindingType::Phenoconversion)
            .expect("induction finding");
        assert_eq!(f.phenotype.as_deref(), Some("ultra_rapid_metabolizer"));
        assert_eq!(f.inhibitor_drugs, vec!["rifampin".to_string()]);
        assert!(f.summary.contains("rifampin induces CYP3A4"));
    }

    #[test]
    fn drug_interaction_uses_kb_names_and_target_gene() {
        let p = patient()
            .with_medication("Codeine")
            .with_medication("FLUOXETINE");
        let findings = engine().generate_findings(&p);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.finding_type, FindingType::DrugDrugInteraction);
        assert_eq!(f.drug, "fluoxetine + codeine");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.gene.as_deref(), Some("CYP2D6"));
        assert_eq!(f.clinical_consequence.as_deref(), Some("Loss of analgesia"));
        assert_eq!(f.evidence_level, Some(EvidenceLevel::Strong));
    }

    #[test]
    fn minor_interaction_maps_to_low_without_gene() {
        let p = patient().with_medication("aspirin").with_medication("ibuprofen");
        let findings = engine().generate_findings(&p);
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].gene, None);
    }

    #[test]
    fn renal_severity_depends_on_egfr() {
        let severe = patient().with_medication("metformin").with_lab("egfr", 25.0);
        let findings = engine().generate_findings(&severe);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, FindingType::RenalWarning);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].summary, "Renal impairment (eGFR 25): Stop metformin");
        assert_eq!(
            findings[0].clinical_consequence.as_deref(),
            Some("Drug accumulation risk with eGFR 25 (Severe impairment)")
        );

        let adequate = patient().with_medication("metformin").with_lab("egfr", 45.0);
        assert!(engine().generate_findings(&adequate).is_empty());
    }

    #[test]
    fn hepatic_severity_depends_on_alt_ratio() {
        let severe = patient().with_medication("simvastatin").with_lab("alt", 240.0);
        let findings = engine().generate_findings(&severe);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(
            findings[0].summary,
            "Hepatic concern (ALT 6.0x ULN): Avoid"
        );

        let moderate = patient().with_medication("simvastatin").with_lab("alt", 160.0);
        assert_eq!(
            engine().generate_findings(&moderate)[0].severity,
            Severity::Moderate
        );

        let normal = patient().with_medication("simvastatin").with_lab("alt", 120.0);
        assert!(engine().generate_findings(&normal).is_empty());
    }

    #[test]
    fn dedup_keeps_highest_severity_in_first_slot() {
        let low = Finding::new(
            FindingType::RenalWarning,
            Severity::Moderate,
            "metformin",
            "first",
            FindingSource::Renal,
        );
        let other = Finding::new(
            FindingType::HepaticWarning,
            Severity::Moderate,
            "metformin",
            "other",
            FindingSource::Hepatic,
        );
        let high = Finding::new(
            FindingType::RenalWarning,
            Severity::High,
            "metformin",
            "second",
            FindingSource::Renal,
        );
        let kept = deduplicate_findings(vec![low, other, high]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].summary, "second");
        assert_eq!(kept[1].summary, "other");
    }

    #[test]
    fn duplicate_medication_entries_collapse() {
        let p = patient()
            .with_genotype("CYP2D6", "poor_metabolizer", None)
            .with_medication("codeine")
            .with_medication("codeine");
        assert_eq!(engine().generate_findings(&p).len(), 1);
    }

    #[test]
    fn medication_case_variants_collapse() {
        let p = patient()
            .with_genotype("CYP2D6", "ultra_rapid_metabolizer", None)
            .with_medication("codeine")
            .with_medication("Codeine");
        let findings = engine().generate_findings(&p);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].drug, "codeine");
        assert_eq!(findings[0].finding_type, FindingType::Contraindication);
    }

    #[test]
    fn phenotype_rank_table() {
        assert_eq!(phenotype_rank("normal_metabolizer"), 0);
        assert_eq!(phenotype_rank("intermediate_function"), 1);
        assert_eq!(phenotype_rank("moderate_sensitivity"), 2);
        assert_eq!(phenotype_rank("ultra_rapid_metabolizer"), 3);
        assert_eq!(phenotype_rank("HLA_B_1502_Positive"), 4);
        assert_eq!(phenotype_rank("rapid_metabolizer"), 0);
    }

    #[test]
    fn title_case_formats_labels() {
        assert_eq!(title_case("poor_metabolizer"), "Poor Metabolizer");
        assert_eq!(title_case("hla_b_1502_positive"), "Hla B 1502 Positive");
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn raw_finding() -> impl Strategy<Value = Finding> {
        (
            prop::sample::select(vec![
                FindingType::GeneDrugInteraction,
                FindingType::Contraindication,
                FindingType::RenalWarning,
            ]),
            prop::sample::select(Severity::ALL.to_vec()),
            prop::sample::select(vec!["codeine", "warfarin", "metformin"]),
            prop::option::of(prop::sample::select(vec!["CYP2D6", "CYP2C9"])),
        )
            .prop_map(|(finding_type, severity, drug, gene)| {
                let mut f = Finding::new(finding_type, severity, drug, "raw", FindingSource::Genotype);
                f.gene = gene.map(String::from);
                f
            })
    }

    proptest! {
        /// One finding per key, and each kept finding is the most severe for its key
        #[test]
        fn dedup_keeps_one_most_severe_per_key(raw in prop::collection::vec(raw_finding(), 0..24)) {
            let kept = deduplicate_findings(raw.clone());

            let keys: HashSet<_> = kept.iter().map(Finding::dedup_key).collect();
            prop_assert_eq!(keys.len(), kept.len());

            for f in &kept {
                let max = raw
                    .iter()
                    .filter(|r| r.dedup_key() == f.dedup_key())
                    .map(|r| r.severity.rank())
                    .max();
                prop_assert_eq!(Some(f.severity.rank()), max);
            }
        }
    }
}
