//! Risk scoring.
//!
//! Each finding gets a 0-100 score from its severity band, scaled by evidence quality and
//! adjusted for FDA labelling, contraindications, phenoconversion, gene-linked drug
//! interactions and organ-function warnings. The patient summary category is driven by the
//! most severe finding present, not by the numeric score.

use crate::finding::{Finding, ScoredFinding};
use pgx_types::{EvidenceLevel, FindingSource, FindingType, RiskCategory, Severity};
use serde::Serialize;

/// Bonus for findings backed by an FDA label.
const FDA_LABEL_BONUS: f64 = 5.0;

/// Minimum score of a contraindication.
const CONTRAINDICATION_FLOOR: f64 = 92.0;

/// Bonus for drug-induced phenoconversion.
const PHENOCONVERSION_BONUS: f64 = 8.0;

/// Bonus for a drug-drug interaction that acts through a pharmacogene.
const GENE_LINKED_DDI_BONUS: f64 = 5.0;

/// Minimum score of renal and hepatic warnings.
const ORGAN_FUNCTION_FLOOR: f64 = 45.0;

/// Multiplier for missing or unrecognised evidence levels.
const DEFAULT_EVIDENCE_MULTIPLIER: f64 = 0.75;

/// Per-patient roll-up of scored findings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskSummary {
    pub category: RiskCategory,
    /// Highest finding score.
    pub overall_score: f64,
    pub average_score: f64,
    pub critical_count: usize,
    pub high_count: usize,
    pub moderate_count: usize,
    pub low_count: usize,
    pub informational_count: usize,
    pub total_findings: usize,
    pub actionable_count: usize,
}

impl RiskSummary {
    fn empty() -> Self {
        Self {
            category: RiskCategory::Low,
            overall_score: 0.0,
            average_score: 0.0,
            critical_count: 0,
            high_count: 0,
            moderate_count: 0,
            low_count: 0,
            informational_count: 0,
            total_findings: 0,
            actionable_count: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score every finding and sort by descending score.
    ///
    /// The sort is stable: findings with equal scores keep their input order.
    pub fn score_findings(&self, findings: Vec<Finding>) -> Vec<ScoredFinding> {
        let mut scored: Vec<ScoredFinding> = findings
            .into_iter()
            .map(|finding| {
                let risk_score = score_finding(&finding);
                ScoredFinding {
                    finding,
                    risk_score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        tracing::debug!(count = scored.len(), "findings scored");
        scored
    }

    pub fn get_patient_risk_summary(&self, scored: &[ScoredFinding]) -> RiskSummary {
        if scored.is_empty() {
            return RiskSummary::empty();
        }

        let count = |severity: Severity| {
            scored
                .iter()
                .filter(|s| s.finding.severity == severity)
                .count()
        };
        let critical_count = count(Severity::Critical);
        let high_count = count(Severity::High);
        let moderate_count = count(Severity::Moderate);

        let category = if critical_count > 0 {
            RiskCategory::Critical
        } else if high_count > 0 {
            RiskCategory::High
        } else if moderate_count > 0 {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        };

        let max_score = scored
            .iter()
            .map(|s| s.risk_score)
            .fold(f64::MIN, f64::max);
        let average = scored.iter().map(|s| s.risk_score).sum::<f64>() / scored.len() as f64;

        RiskSummary {
            category,
            overall_score: round_one_decimal(max_score),
            average_score: round_one_decimal(average),
            critical_count,
            high_count,
            moderate_count,
            low_count: count(Severity::Low),
            informational_count: count(Severity::Informational),
            total_findings: scored.len(),
            actionable_count: scored
                .iter()
                .filter(|s| s.finding.severity.is_actionable())
                .count(),
        }
    }
}

/// Score a single finding on the 0-100 scale, rounded to one decimal.
pub fn score_finding(finding: &Finding) -> f64 {
    let (low, high) = finding.severity.score_range();
    let mut score = (low + high) / 2.0 * evidence_multiplier(finding.evidence_level.as_ref());

    if finding.fda_label {
        score += FDA_LABEL_BONUS;
    }
    if finding.finding_type == FindingType::Contraindication {
        score = score.max(CONTRAINDICATION_FLOOR);
    }
    if finding.source == FindingSource::Phenoconversion {
        score += PHENOCONVERSION_BONUS;
    }
    if finding.finding_type == FindingType::DrugDrugInteraction
        && finding.gene.as_deref().is_some_and(|g| !g.is_empty())
    {
        score += GENE_LINKED_DDI_BONUS;
    }
    if finding.finding_type.is_organ_function() {
        score = score.max(ORGAN_FUNCTION_FLOOR);
    }

    round_one_decimal(score.clamp(0.0, 100.0))
}

/// Evidence multiplier; absent and unrecognised levels fall back to 0.75.
pub fn evidence_multiplier(level: Option<&EvidenceLevel>) -> f64 {
    match level {
        Some(EvidenceLevel::CpicLevelA | EvidenceLevel::Strong) => 1.0,
        Some(EvidenceLevel::CpicLevelB | EvidenceLevel::Moderate) => 0.85,
        Some(EvidenceLevel::CpicLevelC | EvidenceLevel::Weak) => 0.65,
        Some(EvidenceLevel::StandardOfCare) => 0.95,
        Some(EvidenceLevel::Unrecognized(_)) | None => DEFAULT_EVIDENCE_MULTIPLIER,
    }
}

/// Round half away from zero to one decimal place.
pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(finding_type: FindingType, severity: Severity, source: FindingSource) -> Finding {
        Finding::new(finding_type, severity, "drug", "summary", source)
    }

    #[test]
    fn base_scores_use_band_midpoints() {
        let cases = [
            (Severity::Critical, 95.0),
            (Severity::High, 79.5),
            (Severity::Moderate, 54.5),
            (Severity::Low, 24.5),
            (Severity::Informational, 5.0),
        ];
        for (severity, expected) in cases {
            let mut f = finding(FindingType::GeneDrugInteraction, severity, FindingSource::Genotype);
            f.evidence_level = Some(EvidenceLevel::CpicLevelA);
            assert_eq!(score_finding(&f), expected, "severity {severity}");
        }
    }

    #[test]
    fn evidence_and_fda_adjustments() {
        let mut f = finding(FindingType::GeneDrugInteraction, Severity::High, FindingSource::Genotype);
        f.evidence_level = Some(EvidenceLevel::CpicLevelB);
        // 79.5 * 0.85 = 67.575
        assert_eq!(score_finding(&f), 67.6);

        f.fda_label = true;
        assert_eq!(score_finding(&f), 72.6);

        f.evidence_level = Some(EvidenceLevel::Unrecognized("PharmGKB 1A".into()));
        f.fda_label = false;
        // 79.5 * 0.75 = 59.625
        assert_eq!(score_finding(&f), 59.6);

        f.evidence_level = None;
        assert_eq!(score_finding(&f), 59.6);
    }

    #[test]
    fn contraindication_is_floored() {
        let mut f = finding(FindingType::Contraindication, Severity::Critical, FindingSource::Genotype);
        f.evidence_level = Some(EvidenceLevel::CpicLevelC);
        // 95 * 0.65 = 61.75, floored
        assert_eq!(score_finding(&f), 92.0);

        f.evidence_level = Some(EvidenceLevel::CpicLevelA);
        f.fda_label = true;
        assert_eq!(score_finding(&f), 100.0);
    }

    #[test]
    fn phenoconversion_and_gene_linked_ddi_bonuses() {
        let mut pheno = finding(FindingType::Phenoconversion, Severity::Moderate, FindingSource::Phenoconversion);
        pheno.evidence_level = Some(EvidenceLevel::CpicLevelA);
        assert_eq!(score_finding(&pheno), 62.5);

        let mut ddi = finding(FindingType::DrugDrugInteraction, Severity::High, FindingSource::Ddi);
        ddi.evidence_level = Some(EvidenceLevel::Strong);
        assert_eq!(score_finding(&ddi), 79.5);
        ddi.gene = Some("CYP2D6".into());
        assert_eq!(score_finding(&ddi), 84.5);
        ddi.gene = Some(String::new());
        assert_eq!(score_finding(&ddi), 79.5);
    }

    #[test]
    fn organ_function_warnings_are_floored() {
        let mut renal = finding(FindingType::RenalWarning, Severity::Moderate, FindingSource::Renal);
        renal.evidence_level = Some(EvidenceLevel::StandardOfCare);
        renal.fda_label = true;
        // 54.5 * 0.95 + 5 = 56.775
        assert_eq!(score_finding(&renal), 56.8);

        let low = finding(FindingType::HepaticWarning, Severity::Low, FindingSource::Hepatic);
        assert_eq!(score_finding(&low), 45.0);
    }

    #[test]
    fn score_findings_sorts_descending_and_stably() {
        let scorer = RiskScorer::new();
        let mut a = finding(FindingType::GeneDrugInteraction, Severity::Moderate, FindingSource::Genotype);
        a.summary = "a".into();
        let mut b = finding(FindingType::GeneDrugInteraction, Severity::Critical, FindingSource::Genotype);
        b.summary = "b".into();
        let mut c = finding(FindingType::GeneDrugInteraction, Severity::Moderate, FindingSource::Genotype);
        c.summary = "c".into();

        let scored = scorer.score_findings(vec![a, b, c]);
        let order: Vec<&str> = scored.iter().map(|s| s.finding.summary.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn summary_of_empty_list_is_zeroed() {
        let summary = RiskScorer::new().get_patient_risk_summary(&[]);
        assert_eq!(summary.category, RiskCategory::Low);
        assert_eq!(summary.category.label(), "Low - Informational");
        assert_eq!(summary.total_findings, 0);
        assert_eq!(summary.actionable_count, 0);
        assert_eq!(summary.overall_score, 0.0);
    }

    #[test]
    fn summary_category_follows_highest_severity() {
        let scorer = RiskScorer::new();
        let findings = vec![
            finding(FindingType::GeneDrugInteraction, Severity::High, FindingSource::Genotype),
            finding(FindingType::GeneDrugInteraction, Severity::Low, FindingSource::Genotype),
            finding(FindingType::GeneDrugInteraction, Severity::Informational, FindingSource::Genotype),
            finding(FindingType::RenalWarning, Severity::Moderate, FindingSource::Renal),
        ];
        let scored = scorer.score_findings(findings);
        let summary = scorer.get_patient_risk_summary(&scored);

        assert_eq!(summary.category, RiskCategory::High);
        assert_eq!(summary.high_count, 1);
        assert_eq!(summary.moderate_count, 1);
        assert_eq!(summary.low_count, 1);
        assert_eq!(summary.informational_count, 1);
        assert_eq!(summary.total_findings, 4);
        assert_eq!(summary.actionable_count, 2);
        // 59.6, 45.0, 18.4, 3.8
        assert_eq!(summary.overall_score, 59.6);
        assert_eq!(summary.average_score, 31.7);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn severity() -> impl Strategy<Value = Severity> {
        prop::sample::select(Severity::ALL.to_vec())
    }

    fn finding_type() -> impl Strategy<Value = FindingType> {
        prop::sample::select(vec![
            FindingType::GeneDrugInteraction,
            FindingType::Contraindication,
            FindingType::Phenoconversion,
            FindingType::DrugDrugInteraction,
            FindingType::RenalWarning,
            FindingType::HepaticWarning,
        ])
    }

    fn source() -> impl Strategy<Value = FindingSource> {
        prop::sample::select(vec![
            FindingSource::Genotype,
            FindingSource::Phenoconversion,
            FindingSource::Ddi,
            FindingSource::Renal,
            FindingSource::Hepatic,
        ])
    }

    fn evidence() -> impl Strategy<Value = Option<EvidenceLevel>> {
        prop::option::of(prop::sample::select(vec![
            EvidenceLevel::CpicLevelA,
            EvidenceLevel::CpicLevelB,
            EvidenceLevel::CpicLevelC,
            EvidenceLevel::Strong,
            EvidenceLevel::Moderate,
            EvidenceLevel::Weak,
            EvidenceLevel::StandardOfCare,
            EvidenceLevel::Unrecognized("other".into()),
        ]))
    }

    prop_compose! {
        fn any_finding()(
            finding_type in finding_type(),
            severity in severity(),
            source in source(),
            evidence_level in evidence(),
            fda_label in any::<bool>(),
            gene in prop::option::of("[A-Z0-9]{0,6}"),
        ) -> Finding {
            let mut f = Finding::new(finding_type, severity, "drug", "summary", source);
            f.evidence_level = evidence_level;
            f.fda_label = fda_label;
            f.gene = gene;
            f
        }
    }

    proptest! {
        /// Every score lies within [0, 100]
        #[test]
        fn score_is_bounded(f in any_finding()) {
            let score = score_finding(&f);
            prop_assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
        }

        /// Contraindications never score below the floor
        #[test]
        fn contraindication_floor_holds(mut f in any_finding()) {
            f.finding_type = FindingType::Contraindication;
            prop_assert!(score_finding(&f) >= CONTRAINDICATION_FLOOR);
        }

        /// Organ-function warnings never score below their floor
        #[test]
        fn organ_function_floor_holds(mut f in any_finding(), hepatic in any::<bool>()) {
            f.finding_type = if hepatic { FindingType::HepaticWarning } else { FindingType::RenalWarning };
            prop_assert!(score_finding(&f) >= ORGAN_FUNCTION_FLOOR);
        }

        /// Output is sorted descending and preserves the input multiset size
        #[test]
        fn scored_output_is_sorted(findings in proptest::collection::vec(any_finding(), 0..20)) {
            let n = findings.len();
            let scored = RiskScorer::new().score_findings(findings);
            prop_assert_eq!(scored.len(), n);
            for pair in scored.windows(2) {
                prop_assert!(pair[0].risk_score >= pair[1].risk_score);
            }
        }

        /// Summary counts partition the findings
        #[test]
        fn summary_counts_partition(findings in proptest::collection::vec(any_finding(), 1..20)) {
            let scorer = RiskScorer::new();
            let scored = scorer.score_findings(findings);
            let s = scorer.get_patient_risk_summary(&scored);
            prop_assert_eq!(
                s.critical_count + s.high_count + s.moderate_count + s.low_count + s.informational_count,
                s.total_findings
            );
            prop_assert_eq!(s.actionable_count, s.critical_count + s.high_count + s.moderate_count);
            prop_assert!(s.average_score <= s.overall_score);
        }
    }
}
