//! Knowledge base loading, validation and indexing.
//!
//! The three KB documents are parsed through strict wire models, checked for semantic
//! problems (duplicate keys, self-interacting drugs, impossible cutoffs) and folded
//! into case-insensitive indexes. Any problem aborts the load; a constructed
//! [`KnowledgeBase`] is always structurally valid.

use crate::constants::{
    DEFAULT_RENAL_ACTION, DOSING_GUIDELINES_STEM, DRUG_DRUG_INTERACTIONS_STEM,
    GENE_DRUG_INTERACTIONS_STEM, HEPATIC_ALT_RATIO_THRESHOLD, SEVERE_HEPATIC_ALT_RATIO,
};
use crate::model::{
    CypInhibitor, DrugInteraction, GeneDrugInteraction, HepaticAdjustment, HepaticSeverity,
    PhenoconversionLink, PhenotypeImpact, RenalAdjustment,
};
use crate::source::KnowledgeSource;
use crate::wire::{
    DosingFileWire, DrugInteractionFileWire, DrugInteractionWire, GeneDrugFileWire,
    GeneDrugInteractionWire, PhenotypeImpactWire, RenalThresholdsWire,
};
use crate::{KbError, KbResult};
use pgx_types::{EvidenceLevel, FunctionalPhenotype, InhibitorStrength, LookupKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialisation format of a KB document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

/// Raw text of one KB document, before parsing.
#[derive(Clone, Debug)]
pub struct RawDocument {
    pub name: String,
    pub format: DocumentFormat,
    pub text: String,
}

impl RawDocument {
    pub fn json(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::Json,
            text: text.into(),
        }
    }

    pub fn yaml(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: DocumentFormat::Yaml,
            text: text.into(),
        }
    }
}

/// Version stamp of a loaded knowledge base.
///
/// `sha256` covers the raw bytes of the three documents in fixed order, so two loads
/// with the same digest index identical content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KbVersion {
    pub gene_drug: Option<String>,
    pub drug_drug: Option<String>,
    pub dosing: Option<String>,
    pub sha256: String,
}

/// Entry counts of a loaded knowledge base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KbStats {
    pub gene_drug_interactions: usize,
    pub drug_drug_interactions: usize,
    pub inhibitor_entries: usize,
    pub inducer_entries: usize,
    pub renal_entries: usize,
    pub hepatic_entries: usize,
}

#[derive(Debug, Default)]
struct GeneModulators {
    strong: Vec<String>,
    moderate: Vec<String>,
    weak: Vec<String>,
    inducers: Vec<String>,
}

impl GeneModulators {
    fn tier(&self, strength: InhibitorStrength) -> &[String] {
        match strength {
            InhibitorStrength::Strong => &self.strong,
            InhibitorStrength::Moderate => &self.moderate,
            InhibitorStrength::Weak => &self.weak,
        }
    }
}

#[derive(Debug)]
struct RenalEntry {
    cutoff: f64,
    action: String,
}

#[derive(Debug)]
struct RenalStageLabels {
    normal: String,
    mild: String,
    moderate: String,
    severe: String,
    failure: String,
}

impl RenalStageLabels {
    fn from_wire(wire: RenalThresholdsWire) -> Self {
        let label = |stage: Option<crate::wire::StageLabelWire>, default: &str| {
            stage
                .map(|s| s.label.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            normal: label(wire.normal, "Normal"),
            mild: label(wire.mild_impairment, "Mild impairment"),
            moderate: label(wire.moderate_impairment, "Moderate impairment"),
            severe: label(wire.severe_impairment, "Severe impairment"),
            failure: label(wire.kidney_failure, "Kidney failure"),
        }
    }

    fn stage_for(&self, egfr: f64) -> &str {
        if egfr >= 90.0 {
            &self.normal
        } else if egfr >= 60.0 {
            &self.mild
        } else if egfr >= 30.0 {
            &self.moderate
        } else if egfr >= 15.0 {
            &self.severe
        } else {
            &self.failure
        }
    }
}

/// Indexed, immutable pharmacogenomics knowledge base.
#[derive(Debug)]
pub struct KnowledgeBase {
    interactions: Vec<GeneDrugInteraction>,
    by_drug: HashMap<LookupKey, Vec<usize>>,
    by_gene_drug: HashMap<(LookupKey, LookupKey), usize>,
    ddis: Vec<DrugInteraction>,
    ddi_by_pair: HashMap<(LookupKey, LookupKey), usize>,
    modulators: BTreeMap<LookupKey, GeneModulators>,
    renal: HashMap<LookupKey, RenalEntry>,
    renal_stages: RenalStageLabels,
    hepatic: HashMap<LookupKey, String>,
    version: KbVersion,
}

impl KnowledgeBase {
    /// Load the three KB documents from `dir`.
    ///
    /// Each document is looked up as `<stem>.json`, then `<stem>.yaml`, then
    /// `<stem>.yml`.
    ///
    /// # Errors
    ///
    /// Returns a [`KbError`] if:
    /// - a document is missing or unreadable,
    /// - a document does not match its schema (unknown keys, unknown codes, wrong types),
    /// - a record fails semantic validation.
    pub fn load(dir: &Path) -> KbResult<Self> {
        let gene_drug = read_document(dir, GENE_DRUG_INTERACTIONS_STEM)?;
        let drug_drug = read_document(dir, DRUG_DRUG_INTERACTIONS_STEM)?;
        let dosing = read_document(dir, DOSING_GUIDELINES_STEM)?;

        let kb = Self::from_documents(&gene_drug, &drug_drug, &dosing)?;
        let stats = kb.stats();
        tracing::info!(
            dir = %dir.display(),
            gene_drug = stats.gene_drug_interactions,
            drug_drug = stats.drug_drug_interactions,
            digest = %kb.version.sha256,
            "knowledge base loaded"
        );
        Ok(kb)
    }

    /// Path of the document for `stem` under `dir`, if present.
    pub fn document_path(dir: &Path, stem: &str) -> Option<PathBuf> {
        ["json", "yaml", "yml"]
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }

    /// Build a knowledge base from three JSON texts.
    pub fn from_json(gene_drug: &str, drug_drug: &str, dosing: &str) -> KbResult<Self> {
        Self::from_documents(
            &RawDocument::json(format!("{GENE_DRUG_INTERACTIONS_STEM}.json"), gene_drug),
            &RawDocument::json(format!("{DRUG_DRUG_INTERACTIONS_STEM}.json"), drug_drug),
            &RawDocument::json(format!("{DOSING_GUIDELINES_STEM}.json"), dosing),
        )
    }

    /// Build a knowledge base from already-read documents.
    pub fn from_documents(
        gene_drug: &RawDocument,
        drug_drug: &RawDocument,
        dosing: &RawDocument,
    ) -> KbResult<Self> {
        let gene_drug_wire: GeneDrugFileWire = parse_document(gene_drug)?;
        let drug_drug_wire: DrugInteractionFileWire = parse_document(drug_drug)?;
        let dosing_wire: DosingFileWire = parse_document(dosing)?;

        let mut hasher = Sha256::new();
        for doc in [gene_drug, drug_drug, dosing] {
            hasher.update(doc.text.as_bytes());
        }
        let version = KbVersion {
            gene_drug: gene_drug_wire.version.clone(),
            drug_drug: drug_drug_wire.version.clone(),
            dosing: dosing_wire.version.clone(),
            sha256: hex::encode(hasher.finalize()),
        };

        let (interactions, by_drug, by_gene_drug) =
            index_interactions(&gene_drug.name, gene_drug_wire.gene_drug_interactions)?;
        let (ddis, ddi_by_pair) =
            index_drug_interactions(&drug_drug.name, drug_drug_wire.drug_drug_interactions)?;
        let modulators = index_modulators(
            &drug_drug.name,
            drug_drug_wire.cyp_inhibitors,
            drug_drug_wire.cyp_inducers,
        )?;

        let mut renal = HashMap::new();
        for (drug, entry) in dosing_wire.renal_adjustments.drugs_requiring_renal_adjustment {
            let key = record_key(&dosing.name, &drug, "renal drug name")?;
            if !entry.egfr_cutoff.is_finite() || entry.egfr_cutoff < 0.0 {
                return Err(invalid(
                    &dosing.name,
                    format!("renal cutoff for '{drug}' must be a non-negative number"),
                ));
            }
            let action = non_empty(entry.action).unwrap_or_else(|| DEFAULT_RENAL_ACTION.into());
            renal.insert(
                key,
                RenalEntry {
                    cutoff: entry.egfr_cutoff,
                    action,
                },
            );
        }
        let renal_stages =
            RenalStageLabels::from_wire(dosing_wire.renal_adjustments.egfr_thresholds);

        let mut hepatic = HashMap::new();
        for (drug, action) in dosing_wire.hepatic_adjustments.drugs_requiring_hepatic_adjustment {
            let key = record_key(&dosing.name, &drug, "hepatic drug name")?;
            let action = non_empty(Some(action)).ok_or_else(|| {
                invalid(&dosing.name, format!("hepatic action for '{drug}' cannot be empty"))
            })?;
            hepatic.insert(key, action);
        }

        Ok(Self {
            interactions,
            by_drug,
            by_gene_drug,
            ddis,
            ddi_by_pair,
            modulators,
            renal,
            renal_stages,
            hepatic,
            version,
        })
    }

    pub fn version(&self) -> &KbVersion {
        &self.version
    }

    pub fn stats(&self) -> KbStats {
        let (inhibitor_entries, inducer_entries) =
            self.modulators.values().fold((0, 0), |(inh, ind), m| {
                (
                    inh + m.strong.len() + m.moderate.len() + m.weak.len(),
                    ind + m.inducers.len(),
                )
            });
        KbStats {
            gene_drug_interactions: self.interactions.len(),
            drug_drug_interactions: self.ddis.len(),
            inhibitor_entries,
            inducer_entries,
            renal_entries: self.renal.len(),
            hepatic_entries: self.hepatic.len(),
        }
    }

    /// All gene-drug interaction records, in file order.
    pub fn interactions(&self) -> &[GeneDrugInteraction] {
        &self.interactions
    }
}

impl KnowledgeSource for KnowledgeBase {
    fn interactions_for_drug(&self, drug: &str) -> Vec<&GeneDrugInteraction> {
        self.by_drug
            .get(LookupKey::fold(drug).as_str())
            .map(|positions| positions.iter().map(|&i| &self.interactions[i]).collect())
            .unwrap_or_default()
    }

    fn gene_drug_interaction(&self, gene: &str, drug: &str) -> Option<&GeneDrugInteraction> {
        let key = (LookupKey::new(gene).ok()?, LookupKey::new(drug).ok()?);
        self.by_gene_drug.get(&key).map(|&i| &self.interactions[i])
    }

    fn phenoconversion(&self, medications: &[String], gene: &str) -> Option<FunctionalPhenotype> {
        let modulators = self.modulators.get(LookupKey::fold(gene).as_str())?;
        let meds = folded_set(medications);
        let any_present = |drugs: &[String]| drugs.iter().any(|d| meds.contains(&LookupKey::fold(d)));

        if any_present(&modulators.strong) {
            Some(FunctionalPhenotype::PoorMetabolizer)
        } else if any_present(&modulators.moderate) {
            Some(FunctionalPhenotype::IntermediateMetabolizer)
        } else if any_present(&modulators.inducers) {
            Some(FunctionalPhenotype::UltraRapidMetabolizer)
        } else {
            None
        }
    }

    fn cyp_inhibitors_in_list(&self, medications: &[String]) -> BTreeMap<String, Vec<CypInhibitor>> {
        let meds = folded_set(medications);
        let mut found: BTreeMap<String, Vec<CypInhibitor>> = BTreeMap::new();

        for (gene_key, modulators) in &self.modulators {
            for strength in [
                InhibitorStrength::Strong,
                InhibitorStrength::Moderate,
                InhibitorStrength::Weak,
            ] {
                for drug in modulators.tier(strength) {
                    if meds.contains(&LookupKey::fold(drug)) {
                        found
                            .entry(gene_key.to_string())
                            .or_default()
                            .push(CypInhibitor {
                                drug: drug.clone(),
                                gene: gene_key.as_str().to_uppercase(),
                                strength,
                            });
                    }
                }
            }
        }

        found
    }

    fn cyp_inducers_in_list(&self, medications: &[String]) -> BTreeMap<String, Vec<String>> {
        let meds = folded_set(medications);
        self.modulators
            .iter()
            .filter_map(|(gene_key, modulators)| {
                let present: Vec<String> = modulators
                    .inducers
                    .iter()
                    .filter(|d| meds.contains(&LookupKey::fold(d)))
                    .cloned()
                    .collect();
                (!present.is_empty()).then(|| (gene_key.to_string(), present))
            })
            .collect()
    }

    fn drug_drug_interactions(&self, medications: &[String]) -> Vec<&DrugInteraction> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (i, drug_a) in medications.iter().enumerate() {
            for drug_b in &medications[i + 1..] {
                let Some(pair) = pair_key(drug_a, drug_b) else {
                    continue;
                };
                if seen.contains(&pair) {
                    continue;
                }
                if let Some(&idx) = self.ddi_by_pair.get(&pair) {
                    found.push(&self.ddis[idx]);
                    seen.insert(pair);
                }
            }
        }

        found
    }

    fn renal_adjustment(&self, drug: &str, egfr: f64) -> Option<RenalAdjustment> {
        let entry = self.renal.get(LookupKey::fold(drug).as_str())?;
        (egfr < entry.cutoff).then(|| RenalAdjustment {
            drug: drug.to_string(),
            egfr,
            cutoff: entry.cutoff,
            action: entry.action.clone(),
            renal_stage: self.renal_stages.stage_for(egfr).to_string(),
        })
    }

    fn hepatic_adjustment(&self, drug: &str, alt_ratio: f64) -> Option<HepaticAdjustment> {
        let action = self.hepatic.get(LookupKey::fold(drug).as_str())?;
        if alt_ratio <= HEPATIC_ALT_RATIO_THRESHOLD || alt_ratio.is_nan() {
            return None;
        }
        let severity = if alt_ratio > SEVERE_HEPATIC_ALT_RATIO {
            HepaticSeverity::Severe
        } else {
            HepaticSeverity::Moderate
        };
        Some(HepaticAdjustment {
            drug: drug.to_string(),
            alt_ratio,
            action: action.clone(),
            severity,
        })
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn read_document(dir: &Path, stem: &'static str) -> KbResult<RawDocument> {
    let path = KnowledgeBase::document_path(dir, stem)
        .ok_or_else(|| KbError::MissingFile {
            dir: dir.to_path_buf(),
            stem,
        })?;
    let text = fs::read_to_string(&path).map_err(|source| KbError::FileRead {
        path: path.clone(),
        source,
    })?;
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DocumentFormat::Json,
        _ => DocumentFormat::Yaml,
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(stem)
        .to_string();
    tracing::debug!(path = %path.display(), "reading knowledge base document");

    Ok(RawDocument { name, format, text })
}

/// Parse a document through `serde_path_to_error` so schema failures name the field.
fn parse_document<T: DeserializeOwned>(doc: &RawDocument) -> KbResult<T> {
    match doc.format {
        DocumentFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(&doc.text);
            let parsed = serde_path_to_error::deserialize(&mut deserializer)
                .map_err(|err| schema_error(&doc.name, err))?;
            deserializer.end().map_err(|err| KbError::Schema {
                file: doc.name.clone(),
                path: "<root>".into(),
                message: err.to_string(),
            })?;
            Ok(parsed)
        }
        DocumentFormat::Yaml => {
            let deserializer = serde_yaml::Deserializer::from_str(&doc.text);
            serde_path_to_error::deserialize(deserializer).map_err(|err| schema_error(&doc.name, err))
        }
    }
}

fn schema_error<E: std::fmt::Display>(file: &str, err: serde_path_to_error::Error<E>) -> KbError {
    let path = err.path().to_string();
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    KbError::Schema {
        file: file.to_string(),
        path,
        message: err.into_inner().to_string(),
    }
}

fn invalid(file: &str, message: String) -> KbError {
    KbError::InvalidRecord {
        file: file.to_string(),
        message,
    }
}

fn record_key(file: &str, name: &str, what: &str) -> KbResult<LookupKey> {
    LookupKey::new(name).map_err(|_| invalid(file, format!("{what} cannot be empty")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn folded_set(medications: &[String]) -> HashSet<String> {
    medications.iter().map(|m| LookupKey::fold(m)).collect()
}

/// Order-independent key for a drug pair. `None` for blank names.
fn pair_key(a: &str, b: &str) -> Option<(LookupKey, LookupKey)> {
    let a = LookupKey::new(a).ok()?;
    let b = LookupKey::new(b).ok()?;
    Some(if a <= b { (a, b) } else { (b, a) })
}

fn impact_from_wire(wire: PhenotypeImpactWire) -> PhenotypeImpact {
    PhenotypeImpact {
        risk_level: wire.risk_level,
        effect: non_empty(wire.effect),
        recommendation: non_empty(wire.recommendation),
        clinical_consequence: non_empty(wire.clinical_consequence),
        dosing_adjustment: wire.dosing_adjustment,
        evidence_level: non_empty(wire.evidence_level).map(|e| EvidenceLevel::from_label(&e)),
        fda_label: wire.fda_label,
    }
}

type InteractionIndexes = (
    Vec<GeneDrugInteraction>,
    HashMap<LookupKey, Vec<usize>>,
    HashMap<(LookupKey, LookupKey), usize>,
);

fn index_interactions(
    file: &str,
    records: Vec<GeneDrugInteractionWire>,
) -> KbResult<InteractionIndexes> {
    let mut interactions = Vec::with_capacity(records.len());
    let mut by_drug: HashMap<LookupKey, Vec<usize>> = HashMap::new();
    let mut by_gene_drug = HashMap::new();

    for (idx, record) in records.into_iter().enumerate() {
        let context = format!("gene_drug_interactions[{idx}]");
        let gene_key = record_key(file, &record.gene, &format!("{context}.gene"))?;
        let drug_key = record_key(file, &record.drug, &format!("{context}.drug"))?;

        if record.phenotype_impacts.is_empty() {
            return Err(invalid(
                file,
                format!("{context} ({gene_key}/{drug_key}) has no phenotype impacts"),
            ));
        }

        let mut impacts = BTreeMap::new();
        for (label, impact) in record.phenotype_impacts {
            let key = record_key(file, &label, &format!("{context}.phenotype label"))?;
            if impacts.insert(key.to_string(), impact_from_wire(impact)).is_some() {
                return Err(invalid(
                    file,
                    format!("{context} repeats phenotype '{key}' with different casing"),
                ));
            }
        }

        let position = interactions.len();
        if by_gene_drug
            .insert((gene_key.clone(), drug_key.clone()), position)
            .is_some()
        {
            return Err(invalid(
                file,
                format!("duplicate gene-drug record {gene_key}/{drug_key} at {context}"),
            ));
        }
        by_drug.entry(drug_key).or_default().push(position);

        interactions.push(GeneDrugInteraction {
            gene: record.gene.trim().to_string(),
            drug: record.drug.trim().to_string(),
            drug_class: non_empty(record.drug_class),
            therapeutic_area: non_empty(record.therapeutic_area),
            cpic_guideline: non_empty(record.cpic_guideline),
            mechanism: non_empty(record.mechanism),
            references: record.references,
            phenotype_impacts: impacts,
        });
    }

    Ok((interactions, by_drug, by_gene_drug))
}

fn index_drug_interactions(
    file: &str,
    records: Vec<DrugInteractionWire>,
) -> KbResult<(Vec<DrugInteraction>, HashMap<(LookupKey, LookupKey), usize>)> {
    let mut ddis = Vec::with_capacity(records.len());
    let mut by_pair = HashMap::new();

    for (idx, record) in records.into_iter().enumerate() {
        let context = format!("drug_drug_interactions[{idx}]");
        record_key(file, &record.drug_a, &format!("{context}.drug_a"))?;
        record_key(file, &record.drug_b, &format!("{context}.drug_b"))?;
        let Some(pair) = pair_key(&record.drug_a, &record.drug_b) else {
            return Err(invalid(file, format!("{context} has a blank drug name")));
        };
        if pair.0 == pair.1 {
            return Err(invalid(
                file,
                format!("{context} pairs '{}' with itself", pair.0),
            ));
        }

        let phenoconversion = match record.phenoconversion {
            Some(link) => {
                let gene = non_empty(Some(link.target_gene)).ok_or_else(|| {
                    invalid(file, format!("{context}.phenoconversion.target_gene cannot be empty"))
                })?;
                Some(PhenoconversionLink {
                    target_gene: gene,
                    direction: link.direction,
                })
            }
            None => None,
        };

        if by_pair.insert(pair.clone(), ddis.len()).is_some() {
            return Err(invalid(
                file,
                format!("duplicate drug pair {} + {} at {context}", pair.0, pair.1),
            ));
        }

        ddis.push(DrugInteraction {
            drug_a: record.drug_a.trim().to_string(),
            drug_b: record.drug_b.trim().to_string(),
            severity: record.severity,
            mechanism: non_empty(record.mechanism),
            clinical_effect: non_empty(record.clinical_effect),
            recommendation: non_empty(record.recommendation),
            evidence_level: non_empty(record.evidence_level).map(|e| EvidenceLevel::from_label(&e)),
            references: record.references,
            phenoconversion,
        });
    }

    Ok((ddis, by_pair))
}

fn index_modulators(
    file: &str,
    inhibitors: BTreeMap<String, crate::wire::InhibitorTiersWire>,
    inducers: BTreeMap<String, Vec<String>>,
) -> KbResult<BTreeMap<LookupKey, GeneModulators>> {
    let clean = |gene: &LookupKey, tier: &str, drugs: Vec<String>| -> KbResult<Vec<String>> {
        drugs
            .into_iter()
            .map(|d| {
                non_empty(Some(d)).ok_or_else(|| {
                    invalid(file, format!("blank drug name in {tier} list for {gene}"))
                })
            })
            .collect()
    };

    let mut modulators: BTreeMap<LookupKey, GeneModulators> = BTreeMap::new();

    for (gene, tiers) in inhibitors {
        let key = record_key(file, &gene, "cyp_inhibitors gene")?;
        let strong = clean(&key, "strong inhibitor", tiers.strong)?;
        let moderate = clean(&key, "moderate inhibitor", tiers.moderate)?;
        let weak = clean(&key, "weak inhibitor", tiers.weak)?;
        let entry = modulators.entry(key).or_default();
        entry.strong = strong;
        entry.moderate = moderate;
        entry.weak = weak;
    }

    for (gene, drugs) in inducers {
        let key = record_key(file, &gene, "cyp_inducers gene")?;
        let drugs = clean(&key, "inducer", drugs)?;
        modulators.entry(key).or_default().inducers = drugs;
    }

    Ok(modulators)
}
