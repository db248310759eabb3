//! Shared code sets for the PGx interpretation pipeline.
//!
//! Every string-keyed code the knowledge base or the pipeline produces is a closed
//! enumeration here. Wire parsing rejects unknown codes, so lookup tables built on
//! these types are total by construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing codes or building lookup keys.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input was empty or contained only whitespace
    #[error("lookup key cannot be empty")]
    EmptyKey,
    /// The code is not part of the closed code set
    #[error("unknown {kind} code: '{value}'")]
    UnknownCode { kind: &'static str, value: String },
}

pub type TypesResult<T> = Result<T, TypesError>;

/// Case-folded, trimmed key used for every knowledge base index.
///
/// Drug and gene names arrive in mixed case from patient records and KB files; all
/// lookups compare on this folded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupKey(String);

impl LookupKey {
    /// Builds a key from `input`, trimming and lower-casing it.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::EmptyKey` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> TypesResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyKey);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Folds a name without validation, for probing indexes.
    pub fn fold(input: &str) -> String {
        input.trim().to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LookupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for LookupKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Clinical severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Moderate,
    Low,
    Informational,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Moderate,
        Severity::Low,
        Severity::Informational,
    ];

    /// Rank used for deduplication; higher wins.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Moderate => 3,
            Severity::Low => 2,
            Severity::Informational => 1,
        }
    }

    /// Inclusive numeric score band for this severity.
    pub fn score_range(self) -> (f64, f64) {
        match self {
            Severity::Critical => (90.0, 100.0),
            Severity::High => (70.0, 89.0),
            Severity::Moderate => (40.0, 69.0),
            Severity::Low => (10.0, 39.0),
            Severity::Informational => (1.0, 9.0),
        }
    }

    /// Critical, high and moderate findings warrant clinical action.
    pub fn is_actionable(self) -> bool {
        matches!(self, Severity::Critical | Severity::High | Severity::Moderate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Moderate => "moderate",
            Severity::Low => "low",
            Severity::Informational => "informational",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypesError::UnknownCode {
                kind: "severity",
                value: s.to_string(),
            })
    }
}

/// Risk level attached to a phenotype impact in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    /// Severity carried by a non-low risk level. `Low` has no direct counterpart:
    /// callers decide whether it becomes informational or is dropped.
    pub fn elevated_severity(self) -> Option<Severity> {
        match self {
            RiskLevel::Critical => Some(Severity::Critical),
            RiskLevel::High => Some(Severity::High),
            RiskLevel::Moderate => Some(Severity::Moderate),
            RiskLevel::Low => None,
        }
    }
}

/// Category of a finding produced by the interpretation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    GeneDrugInteraction,
    Contraindication,
    Phenoconversion,
    DrugDrugInteraction,
    RenalWarning,
    HepaticWarning,
}

impl FindingType {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingType::GeneDrugInteraction => "gene_drug_interaction",
            FindingType::Contraindication => "contraindication",
            FindingType::Phenoconversion => "phenoconversion",
            FindingType::DrugDrugInteraction => "drug_drug_interaction",
            FindingType::RenalWarning => "renal_warning",
            FindingType::HepaticWarning => "hepatic_warning",
        }
    }

    pub fn is_organ_function(self) -> bool {
        matches!(self, FindingType::RenalWarning | FindingType::HepaticWarning)
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline step that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    Genotype,
    Phenoconversion,
    Ddi,
    Renal,
    Hepatic,
}

/// Clinical action proposed by a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    StopDrug,
    SwitchDrug,
    ReduceDose,
    IncreaseMonitoring,
    NoChange,
    InformOnly,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::StopDrug => "stop_drug",
            ActionType::SwitchDrug => "switch_drug",
            ActionType::ReduceDose => "reduce_dose",
            ActionType::IncreaseMonitoring => "increase_monitoring",
            ActionType::NoChange => "no_change",
            ActionType::InformOnly => "inform_only",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How soon a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    Immediate,
    NextVisit,
    Routine,
}

impl TimeFrame {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFrame::Immediate => "immediate",
            TimeFrame::NextVisit => "next_visit",
            TimeFrame::Routine => "routine",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority, 1 (urgent) to 4 (low).
///
/// Ordering follows the integer value, so `Urgent < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Urgent = 1,
    High = 2,
    Moderate = 3,
    Low = 4,
}

impl Priority {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Priority::Urgent),
            2 => Some(Priority::High),
            3 => Some(Priority::Moderate),
            4 => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Priority::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("priority out of range: {value}")))
    }
}

/// Overall patient risk category, driven by the most severe finding present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCategory {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskCategory {
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Critical => "Critical - Immediate Action Required",
            RiskCategory::High => "High - Action Recommended",
            RiskCategory::Moderate => "Moderate - Monitor Closely",
            RiskCategory::Low => "Low - Informational",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RiskCategory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// Dosing adjustment code attached to a phenotype impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DosingAdjustment {
    #[serde(rename = "contraindicated")]
    Contraindicated,
    #[serde(rename = "switch_drug")]
    SwitchDrug,
    #[serde(rename = "reduce_25_percent")]
    Reduce25Percent,
    #[serde(rename = "reduce_30_percent")]
    Reduce30Percent,
    #[serde(rename = "reduce_50_percent")]
    Reduce50Percent,
    #[serde(rename = "reduce_30_to_50_percent")]
    Reduce30To50Percent,
    #[serde(rename = "reduce_90_percent")]
    Reduce90Percent,
    #[serde(rename = "reduce_major")]
    ReduceMajor,
    #[serde(rename = "reduce_moderate")]
    ReduceModerate,
    #[serde(rename = "reduce_dose")]
    ReduceDose,
    #[serde(rename = "reduce_dose_or_switch")]
    ReduceDoseOrSwitch,
    #[serde(rename = "increase_dose")]
    IncreaseDose,
    #[serde(rename = "increase_dose_or_switch")]
    IncreaseDoseOrSwitch,
    #[serde(rename = "switch_or_increase")]
    SwitchOrIncrease,
    #[serde(rename = "use_alternative_preferred")]
    UseAlternativePreferred,
    #[serde(rename = "monitor")]
    Monitor,
    #[default]
    #[serde(rename = "none")]
    None,
}

impl DosingAdjustment {
    pub const ALL: [DosingAdjustment; 17] = [
        DosingAdjustment::Contraindicated,
        DosingAdjustment::SwitchDrug,
        DosingAdjustment::Reduce25Percent,
        DosingAdjustment::Reduce30Percent,
        DosingAdjustment::Reduce50Percent,
        DosingAdjustment::Reduce30To50Percent,
        DosingAdjustment::Reduce90Percent,
        DosingAdjustment::ReduceMajor,
        DosingAdjustment::ReduceModerate,
        DosingAdjustment::ReduceDose,
        DosingAdjustment::ReduceDoseOrSwitch,
        DosingAdjustment::IncreaseDose,
        DosingAdjustment::IncreaseDoseOrSwitch,
        DosingAdjustment::SwitchOrIncrease,
        DosingAdjustment::UseAlternativePreferred,
        DosingAdjustment::Monitor,
        DosingAdjustment::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DosingAdjustment::Contraindicated => "contraindicated",
            DosingAdjustment::SwitchDrug => "switch_drug",
            DosingAdjustment::Reduce25Percent => "reduce_25_percent",
            DosingAdjustment::Reduce30Percent => "reduce_30_percent",
            DosingAdjustment::Reduce50Percent => "reduce_50_percent",
            DosingAdjustment::Reduce30To50Percent => "reduce_30_to_50_percent",
            DosingAdjustment::Reduce90Percent => "reduce_90_percent",
            DosingAdjustment::ReduceMajor => "reduce_major",
            DosingAdjustment::ReduceModerate => "reduce_moderate",
            DosingAdjustment::ReduceDose => "reduce_dose",
            DosingAdjustment::ReduceDoseOrSwitch => "reduce_dose_or_switch",
            DosingAdjustment::IncreaseDose => "increase_dose",
            DosingAdjustment::IncreaseDoseOrSwitch => "increase_dose_or_switch",
            DosingAdjustment::SwitchOrIncrease => "switch_or_increase",
            DosingAdjustment::UseAlternativePreferred => "use_alternative_preferred",
            DosingAdjustment::Monitor => "monitor",
            DosingAdjustment::None => "none",
        }
    }
}

impl fmt::Display for DosingAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DosingAdjustment {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DosingAdjustment::ALL
            .into_iter()
            .find(|code| code.as_str() == s.trim())
            .ok_or_else(|| TypesError::UnknownCode {
                kind: "dosing_adjustment",
                value: s.to_string(),
            })
    }
}

/// Severity grade used by drug-drug interaction sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdiSeverity {
    Major,
    Moderate,
    Minor,
}

impl DdiSeverity {
    pub fn to_severity(self) -> Severity {
        match self {
            DdiSeverity::Major => Severity::High,
            DdiSeverity::Moderate => Severity::Moderate,
            DdiSeverity::Minor => Severity::Low,
        }
    }
}

/// Strength tier of a CYP inhibitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InhibitorStrength {
    Strong,
    Moderate,
    Weak,
}

/// Drug-induced functional phenotype inferred from concomitant medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionalPhenotype {
    PoorMetabolizer,
    IntermediateMetabolizer,
    UltraRapidMetabolizer,
}

impl FunctionalPhenotype {
    /// Phenotype label as used in knowledge base impact tables.
    pub fn label(self) -> &'static str {
        match self {
            FunctionalPhenotype::PoorMetabolizer => "poor_metabolizer",
            FunctionalPhenotype::IntermediateMetabolizer => "intermediate_metabolizer",
            FunctionalPhenotype::UltraRapidMetabolizer => "ultra_rapid_metabolizer",
        }
    }

    /// True when the shift comes from enzyme inhibition rather than induction.
    pub fn is_inhibition(self) -> bool {
        !matches!(self, FunctionalPhenotype::UltraRapidMetabolizer)
    }
}

impl fmt::Display for FunctionalPhenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evidence grade attached to a finding.
///
/// Labels outside the known grades are kept verbatim in `Unrecognized`; they still
/// render and serialise, and receive the scorer's default multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceLevel {
    CpicLevelA,
    CpicLevelB,
    CpicLevelC,
    Strong,
    Moderate,
    Weak,
    StandardOfCare,
    Unrecognized(String),
}

impl EvidenceLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "CPIC Level A" => EvidenceLevel::CpicLevelA,
            "CPIC Level B" => EvidenceLevel::CpicLevelB,
            "CPIC Level C" => EvidenceLevel::CpicLevelC,
            "strong" => EvidenceLevel::Strong,
            "moderate" => EvidenceLevel::Moderate,
            "weak" => EvidenceLevel::Weak,
            "standard_of_care" => EvidenceLevel::StandardOfCare,
            other => EvidenceLevel::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EvidenceLevel::CpicLevelA => "CPIC Level A",
            EvidenceLevel::CpicLevelB => "CPIC Level B",
            EvidenceLevel::CpicLevelC => "CPIC Level C",
            EvidenceLevel::Strong => "strong",
            EvidenceLevel::Moderate => "moderate",
            EvidenceLevel::Weak => "weak",
            EvidenceLevel::StandardOfCare => "standard_of_care",
            EvidenceLevel::Unrecognized(label) => label,
        }
    }
}

impl fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for EvidenceLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for EvidenceLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(EvidenceLevel::from_label(&s))
    }
}
