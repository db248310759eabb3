//! Clinical recommendations built from scored findings.
//!
//! One candidate is built per actionable finding, then candidates are collapsed to one per
//! drug (case-insensitive) and ordered urgent first.

use crate::finding::ScoredFinding;
use crate::patient::Patient;
use pgx_types::{
    ActionType, DosingAdjustment, EvidenceLevel, FindingType, Priority, Severity, TimeFrame,
};
use serde::Serialize;
use std::collections::HashMap;

/// A prioritised action for one drug.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub action_type: ActionType,
    pub drug: String,
    pub gene: Option<String>,
    pub phenotype: Option<String>,
    pub finding_type: FindingType,
    pub severity: Severity,
    pub suggested_alternatives: Vec<String>,
    /// Empty when the finding carries no dose-reduction code.
    pub suggested_dose: String,
    pub rationale: String,
    pub monitoring_plan: String,
    pub time_frame: TimeFrame,
    pub recommendation_text: Option<String>,
    pub evidence_level: Option<EvidenceLevel>,
    pub fda_label: bool,
    pub risk_score: f64,
    pub therapeutic_area: Option<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Recommender;

impl Recommender {
    pub fn new() -> Self {
        Self
    }

    /// Build recommendations for every non-informational finding.
    ///
    /// The result holds at most one recommendation per drug and is sorted by priority,
    /// keeping input order among equal priorities.
    pub fn generate_recommendations(
        &self,
        scored: &[ScoredFinding],
        patient: &Patient,
    ) -> Vec<Recommendation> {
        let candidates = scored
            .iter()
            .filter(|s| s.finding.severity != Severity::Informational)
            .map(build_recommendation)
            .collect();

        let mut recommendations = deduplicate(candidates);
        recommendations.sort_by_key(|r| r.priority);

        tracing::debug!(
            patient_id = patient.patient_id(),
            count = recommendations.len(),
            "recommendations generated"
        );
        recommendations
    }
}

fn build_recommendation(scored: &ScoredFinding) -> Recommendation {
    let finding = &scored.finding;
    let action_type = action_for(finding.finding_type, finding.severity, finding.dosing_adjustment);
    let gene = finding.gene.as_deref().unwrap_or_default();

    Recommendation {
        priority: priority_for(finding.severity, finding.finding_type),
        action_type,
        drug: finding.drug.clone(),
        gene: finding.gene.clone(),
        phenotype: finding.phenotype.clone(),
        finding_type: finding.finding_type,
        severity: finding.severity,
        suggested_alternatives: alternatives_for(&finding.drug)
            .iter()
            .map(|alt| alt.to_string())
            .collect(),
        suggested_dose: finding
            .dosing_adjustment
            .and_then(dose_text)
            .unwrap_or_default()
            .to_string(),
        rationale: rationale(scored),
        monitoring_plan: monitoring_plan(
            &finding.drug,
            gene,
            finding.drug_class.as_deref(),
            action_type,
        )
        .to_string(),
        time_frame: time_frame_for(finding.severity, action_type),
        recommendation_text: finding.recommendation.clone(),
        evidence_level: finding.evidence_level.clone(),
        fda_label: finding.fda_label,
        risk_score: scored.risk_score,
        therapeutic_area: finding.therapeutic_area.clone(),
    }
}

pub fn priority_for(severity: Severity, finding_type: FindingType) -> Priority {
    if severity == Severity::Critical || finding_type == FindingType::Contraindication {
        return Priority::Urgent;
    }
    match severity {
        Severity::High => Priority::High,
        Severity::Moderate => Priority::Moderate,
        _ => Priority::Low,
    }
}

/// Choose the action for a finding.
///
/// A gene-drug finding with no dosing code maps to `InformOnly`.
pub fn action_for(
    finding_type: FindingType,
    severity: Severity,
    adjustment: Option<DosingAdjustment>,
) -> ActionType {
    match finding_type {
        FindingType::Contraindication => ActionType::StopDrug,
        FindingType::DrugDrugInteraction | FindingType::Phenoconversion => {
            if matches!(severity, Severity::Critical | Severity::High) {
                ActionType::SwitchDrug
            } else {
                ActionType::IncreaseMonitoring
            }
        }
        FindingType::RenalWarning | FindingType::HepaticWarning => ActionType::IncreaseMonitoring,
        FindingType::GeneDrugInteraction => {
            adjustment.map_or(ActionType::InformOnly, action_for_adjustment)
        }
    }
}

fn action_for_adjustment(adjustment: DosingAdjustment) -> ActionType {
    use DosingAdjustment as D;
    match adjustment {
        D::Contraindicated => ActionType::StopDrug,
        D::SwitchDrug
        | D::ReduceDoseOrSwitch
        | D::IncreaseDoseOrSwitch
        | D::SwitchOrIncrease
        | D::UseAlternativePreferred => ActionType::SwitchDrug,
        D::Reduce25Percent
        | D::Reduce30Percent
        | D::Reduce50Percent
        | D::Reduce30To50Percent
        | D::Reduce90Percent
        | D::ReduceMajor
        | D::ReduceModerate
        | D::ReduceDose => ActionType::ReduceDose,
        D::IncreaseDose | D::Monitor => ActionType::IncreaseMonitoring,
        D::None => ActionType::NoChange,
    }
}

fn dose_text(adjustment: DosingAdjustment) -> Option<&'static str> {
    use DosingAdjustment as D;
    let text = match adjustment {
        D::Reduce50Percent => "Reduce dose by 50%",
        D::Reduce25Percent => "Reduce dose by 25%",
        D::Reduce30Percent => "Reduce dose by 30%",
        D::Reduce30To50Percent => "Reduce dose by 30-50%",
        D::Reduce90Percent => "Reduce dose to 10% of standard",
        D::ReduceMajor => "Major dose reduction required (see pharmacogenomic dosing table)",
        D::ReduceModerate => "Moderate dose reduction required",
        _ => return None,
    };
    Some(text)
}

/// Alternatives for the primary drug, the first name of a `"a + b"` pair.
pub fn alternatives_for(drug: &str) -> &'static [&'static str] {
    let primary = drug.split(" + ").next().unwrap_or(drug).trim().to_lowercase();
    match primary.as_str() {
        "codeine" | "tramadol" => &["morphine", "hydromorphone", "acetaminophen", "ketorolac"],
        "citalopram" | "escitalopram" => &["sertraline", "fluoxetine", "bupropion"],
        "clopidogrel" => &["prasugrel (10 mg/day)", "ticagrelor (90 mg BID)"],
        "simvastatin" => &["rosuvastatin", "pravastatin"],
        "tamoxifen" => &["aromatase inhibitor (anastrozole/letrozole)", "raloxifene"],
        "fluorouracil" | "capecitabine" => &["alternative chemotherapy regimen per oncologist"],
        "nortriptyline" => &["sertraline", "bupropion", "mirtazapine"],
        "warfarin" => &["dose adjustment per pharmacogenomic algorithm"],
        "carbamazepine" => &["valproate", "lamotrigine", "lithium"],
        "atomoxetine" => &["methylphenidate", "lisdexamfetamine"],
        "mercaptopurine" => &["dose-adjusted mercaptopurine (10% of standard)"],
        "irinotecan" => &["dose-reduced irinotecan (70% of standard)"],
        "ondansetron" => &["granisetron"],
        _ => &[],
    }
}

/// Monitoring text; the first matching rule wins.
fn monitoring_plan(
    drug: &str,
    gene: &str,
    drug_class: Option<&str>,
    action_type: ActionType,
) -> &'static str {
    let drug = drug.to_lowercase();
    let gene_is = |symbol: &str| gene.eq_ignore_ascii_case(symbol);
    let statin_class = drug_class.is_some_and(|class| class.to_lowercase().contains("statin"));

    if drug.contains("warfarin") {
        "Monitor INR every 2-3 days until stable, then weekly. Target INR 2.0-3.0."
    } else if action_type == ActionType::StopDrug {
        "Discontinue medication. Monitor for withdrawal effects. Initiate alternative therapy."
    } else if action_type == ActionType::ReduceDose {
        "Implement dose reduction. Monitor for therapeutic response and side effects at 2 and 4 weeks."
    } else if action_type == ActionType::SwitchDrug {
        "Transition to alternative medication. Monitor for efficacy and tolerability at 2-4 weeks."
    } else if drug.contains("tamoxifen") {
        "Consider endoxifen level monitoring after dose change. Reassess at 3 months."
    } else if gene_is("DPYD") {
        "If dose-reduced fluoropyrimidine used, monitor CBC and mucositis assessment before each cycle."
    } else if gene_is("TPMT") {
        "Monitor TGN levels and CBC weekly for first month, then biweekly."
    } else if gene_is("UGT1A1") {
        "Monitor CBC and assess for diarrhea before each chemotherapy cycle."
    } else if statin_class || drug.contains("simvastatin") {
        "Monitor for muscle symptoms (pain, weakness). Check CK if symptomatic."
    } else if gene_is("SLCO1B1") {
        "Monitor for muscle symptoms. Check CK if symptomatic."
    } else {
        "Monitor for therapeutic response and adverse effects per standard of care."
    }
}

pub fn time_frame_for(severity: Severity, action_type: ActionType) -> TimeFrame {
    if severity == Severity::Critical || action_type == ActionType::StopDrug {
        TimeFrame::Immediate
    } else if severity == Severity::High {
        TimeFrame::NextVisit
    } else {
        TimeFrame::Routine
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn rationale(scored: &ScoredFinding) -> String {
    let finding = &scored.finding;
    let mut parts = Vec::new();

    if let (Some(gene), Some(phenotype)) = (present(&finding.gene), present(&finding.phenotype)) {
        parts.push(format!(
            "Patient is a {} for {gene}.",
            phenotype.replace('_', " ")
        ));
    }
    if let Some(mechanism) = present(&finding.mechanism) {
        parts.push(mechanism.to_string());
    }
    if let Some(consequence) = present(&finding.clinical_consequence) {
        parts.push(format!("Clinical risk: {consequence}."));
    }
    if let Some(evidence) = finding.evidence_level.as_ref().filter(|e| !e.label().is_empty()) {
        parts.push(format!("Evidence: {evidence}."));
    }

    parts.join(" ")
}

/// Collapse candidates to one per drug.
///
/// The lower priority number wins, then the higher risk score. A replacement takes the slot
/// of the candidate it replaces.
fn deduplicate(candidates: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Recommendation> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = candidate.drug.to_lowercase();
        match slots.get(&key) {
            Some(&idx) => {
                let current = &kept[idx];
                let better = candidate.priority < current.priority
                    || (candidate.priority == current.priority
                        && candidate.risk_score > current.risk_score);
                if better {
                    kept[idx] = candidate;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::finding::Finding;
    use pgx_types::FindingSource;
    use proptest::prelude::*;
    use std::collections::HashSet;

    prop_compose! {
        fn any_scored()(
            severity in prop::sample::select(Severity::ALL.to_vec()),
            contraindication in any::<bool>(),
            drug in prop::sample::select(vec!["codeine", "Codeine", "warfarin", "WARFARIN", "clopidogrel", "metformin"]),
            adjustment in prop::option::of(prop::sample::select(DosingAdjustment::ALL.to_vec())),
            risk_score in 0.0..100.0f64,
        ) -> ScoredFinding {
            let finding_type = if contraindication {
                FindingType::Contraindication
            } else {
                FindingType::GeneDrugInteraction
            };
            let mut finding = Finding::new(finding_type, severity, drug, "summary", FindingSource::Genotype);
            finding.dosing_adjustment = adjustment;
            ScoredFinding { finding, risk_score }
        }
    }

    proptest! {
        /// Drugs are unique case-insensitively and every drug traces back to an actionable finding
        #[test]
        fn recommendations_are_unique_and_covered(
            findings in proptest::collection::vec(any_scored(), 0..16)
        ) {
            let patient = Patient::new("PROP").expect("valid id");
            let recs = Recommender::new().generate_recommendations(&findings, &patient);

            let mut seen = HashSet::new();
            for rec in &recs {
                prop_assert!(seen.insert(rec.drug.to_lowercase()), "duplicate drug {}", rec.drug);
                let covered = findings.iter().any(|s| {
                    s.finding.severity != Severity::Informational && s.finding.drug == rec.drug
                });
                prop_assert!(covered, "no actionable finding for {}", rec.drug);
            }
            for pair in recs.windows(2) {
                prop_assert!(pair[0].priority <= pair[1].priority);
            }
        }
    }
}
