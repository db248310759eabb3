//! Patient input model.
//!
//! Patient records arrive as JSON. The wire structs mirror that format exactly and reject
//! unknown keys; [`Patient`] is the validated domain form the pipeline reads. A `Patient`
//! is never mutated by any pipeline stage.

use crate::validation::validate_patient_id;
use crate::{PgxError, PgxResult};
use pgx_types::LookupKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Demographic details carried through to reports. Not used by interpretation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Demographics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapeutic_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_pgx_testing: Option<String>,
}

/// One gene's test result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenotypeCall {
    pub gene: String,
    pub phenotype: String,
    /// Diplotype, variant or allele string as reported by the lab.
    pub diplotype: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Medication {
    pub name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub indication: Option<String>,
}

impl Medication {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dose: None,
            frequency: None,
            route: None,
            indication: None,
        }
    }
}

/// A patient record ready for interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    patient_id: String,
    pub demographics: Demographics,
    genotype: BTreeMap<LookupKey, GenotypeCall>,
    medications: Vec<Medication>,
    lab_values: BTreeMap<String, f64>,
    pub clinical_context: Option<ClinicalContext>,
}

impl Patient {
    /// Create an empty patient record.
    ///
    /// # Errors
    ///
    /// Returns `PgxError::InvalidInput` if `patient_id` fails [`validate_patient_id`].
    pub fn new(patient_id: impl Into<String>) -> PgxResult<Self> {
        let patient_id = patient_id.into();
        validate_patient_id(&patient_id)?;
        Ok(Self {
            patient_id,
            demographics: Demographics::default(),
            genotype: BTreeMap::new(),
            medications: Vec::new(),
            lab_values: BTreeMap::new(),
            clinical_context: None,
        })
    }

    /// Add or replace the result for `gene`. Blank gene symbols are ignored.
    pub fn with_genotype(
        mut self,
        gene: &str,
        phenotype: &str,
        diplotype: Option<&str>,
    ) -> Self {
        if let Ok(key) = LookupKey::new(gene) {
            self.genotype.insert(
                key,
                GenotypeCall {
                    gene: gene.trim().to_string(),
                    phenotype: phenotype.trim().to_string(),
                    diplotype: diplotype.map(str::to_string),
                },
            );
        }
        self
    }

    pub fn with_medication(mut self, name: &str) -> Self {
        self.medications.push(Medication::named(name));
        self
    }

    /// Record a lab value; codes are stored lower-cased.
    pub fn with_lab(mut self, code: &str, value: f64) -> Self {
        self.lab_values.insert(LookupKey::fold(code), value);
        self
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Genotype result for `gene`, matched case-insensitively.
    pub fn genotype_for(&self, gene: &str) -> Option<&GenotypeCall> {
        self.genotype.get(LookupKey::fold(gene).as_str())
    }

    /// Gene symbols with a result, as reported.
    pub fn genes_tested(&self) -> Vec<String> {
        self.genotype.values().map(|call| call.gene.clone()).collect()
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    /// Medication names in list order, as reported.
    pub fn medication_names(&self) -> Vec<String> {
        self.medications.iter().map(|m| m.name.clone()).collect()
    }

    pub fn lab_value(&self, code: &str) -> Option<f64> {
        self.lab_values.get(&LookupKey::fold(code)).copied()
    }

    /// Parse a single patient record from JSON.
    ///
    /// # Errors
    ///
    /// Returns `PgxError::PatientSchema` naming the failing field, or
    /// `PgxError::InvalidInput` if the record fails domain validation.
    pub fn from_json(text: &str) -> PgxResult<Self> {
        let wire: PatientWire = parse_json(text)?;
        Patient::try_from(wire)
    }
}

/// Parse a cohort file: a JSON array of patient records.
///
/// # Errors
///
/// Fails on the first malformed record, naming its index in the schema path.
pub fn parse_cohort_json(text: &str) -> PgxResult<Vec<Patient>> {
    let wires: Vec<PatientWire> = parse_json(text)?;
    wires
        .into_iter()
        .enumerate()
        .map(|(idx, wire)| {
            Patient::try_from(wire).map_err(|err| match err {
                PgxError::InvalidInput(msg) => {
                    PgxError::InvalidInput(format!("patient [{idx}]: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> PgxResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let parsed = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        PgxError::PatientSchema {
            path,
            message: err.into_inner().to_string(),
        }
    })?;
    deserializer.end().map_err(|err| PgxError::PatientSchema {
        path: ".".into(),
        message: err.to_string(),
    })?;
    Ok(parsed)
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatientWire {
    patient_id: String,

    #[serde(default)]
    demographics: Option<Demographics>,

    #[serde(default)]
    genotype: BTreeMap<String, GenotypeWire>,

    #[serde(default)]
    medications: Vec<MedicationWire>,

    #[serde(default)]
    lab_values: BTreeMap<String, f64>,

    #[serde(default)]
    clinical_context: Option<ClinicalContext>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenotypeWire {
    phenotype: String,

    #[serde(default)]
    diplotype: Option<String>,

    #[serde(default)]
    variant: Option<String>,

    #[serde(default)]
    allele: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MedicationWire {
    Name(String),
    Detailed(MedicationDetailWire),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MedicationDetailWire {
    name: String,

    #[serde(default)]
    dose: Option<String>,

    #[serde(default)]
    frequency: Option<String>,

    #[serde(default)]
    route: Option<String>,

    #[serde(default)]
    indication: Option<String>,
}

impl TryFrom<PatientWire> for Patient {
    type Error = PgxError;

    fn try_from(wire: PatientWire) -> PgxResult<Self> {
        let mut patient = Patient::new(wire.patient_id)?;
        patient.demographics = wire.demographics.unwrap_or_default();
        patient.clinical_context = wire.clinical_context;

        for (gene, call) in wire.genotype {
            let key = LookupKey::new(&gene)
                .map_err(|_| PgxError::InvalidInput("genotype gene symbol cannot be empty".into()))?;
            if call.phenotype.trim().is_empty() {
                return Err(PgxError::InvalidInput(format!(
                    "genotype for {gene} has an empty phenotype"
                )));
            }
            let diplotype = call.diplotype.or(call.variant).or(call.allele);
            let replaced = patient.genotype.insert(
                key,
                GenotypeCall {
                    gene: gene.trim().to_string(),
                    phenotype: call.phenotype.trim().to_string(),
                    diplotype,
                },
            );
            if replaced.is_some() {
                return Err(PgxError::InvalidInput(format!(
                    "gene {gene} is reported more than once"
                )));
            }
        }

        for (idx, medication) in wire.medications.into_iter().enumerate() {
            let medication = match medication {
                MedicationWire::Name(name) => Medication::named(name),
                MedicationWire::Detailed(detail) => Medication {
                    name: detail.name,
                    dose: detail.dose,
                    frequency: detail.frequency,
                    route: detail.route,
                    indication: detail.indication,
                },
            };
            if medication.name.trim().is_empty() {
                return Err(PgxError::InvalidInput(format!(
                    "medications[{idx}] has an empty name"
                )));
            }
            patient.medications.push(medication);
        }

        for (code, value) in wire.lab_values {
            patient.lab_values.insert(LookupKey::fold(&code), value);
        }

        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATIENT: &str = r#"{
        "patient_id": "PGX001",
        "demographics": { "first_name": "Ada", "age": 45, "sex": "F" },
        "genotype": {
            "CYP2D6": { "diplotype": "*4/*4", "phenotype": "poor_metabolizer" },
            "VKORC1": { "variant": "-1639A>A", "phenotype": "high_sensitivity" },
            "HLA-B": { "allele": "*15:02 positive", "phenotype": "hla_b_1502_positive" }
        },
        "medications": ["codeine", { "name": "Warfarin", "dose": "5 mg", "frequency": "daily" }],
        "lab_values": { "eGFR": 55, "ALT": 30.5 }
    }"#;

    #[test]
    fn parses_mixed_medication_forms_and_genotype_strings() {
        let patient = Patient::from_json(PATIENT).expect("patient should parse");
        assert_eq!(patient.patient_id(), "PGX001");
        assert_eq!(patient.medication_names(), vec!["codeine", "Warfarin"]);
        assert_eq!(patient.medications()[1].dose.as_deref(), Some("5 mg"));

        let vkorc1 = patient.genotype_for("vkorc1").expect("case-insensitive gene lookup");
        assert_eq!(vkorc1.diplotype.as_deref(), Some("-1639A>A"));
        let hla = patient.genotype_for("HLA-B").expect("HLA-B present");
        assert_eq!(hla.diplotype.as_deref(), Some("*15:02 positive"));

        assert_eq!(patient.lab_value("egfr"), Some(55.0));
        assert_eq!(patient.lab_value("ALT"), Some(30.5));
        assert_eq!(patient.lab_value("ast"), None);
        assert_eq!(patient.demographics.age, Some(45));
    }

    #[test]
    fn rejects_unknown_fields_with_path() {
        let bad = PATIENT.replace("\"sex\": \"F\"", "\"sex\": \"F\", \"shoe_size\": 9");
        let err = Patient::from_json(&bad).expect_err("unknown field should be rejected");
        match err {
            PgxError::PatientSchema { path, message } => {
                assert!(path.starts_with("demographics"), "path was {path}");
                assert!(message.contains("shoe_size"));
            }
            other => panic!("expected PatientSchema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsafe_patient_id() {
        let bad = PATIENT.replace("PGX001", "../PGX001");
        let err = Patient::from_json(&bad).expect_err("unsafe id should be rejected");
        assert!(matches!(err, PgxError::InvalidInput(_)));
    }

    #[test]
    fn rejects_blank_medication_names() {
        let bad = PATIENT.replace("\"codeine\"", "\" \"");
        let err = Patient::from_json(&bad).expect_err("blank medication should be rejected");
        assert!(err.to_string().contains("medications[0]"));
    }

    #[test]
    fn negative_lab_values_pass_through() {
        let patient = Patient::new("P1")
            .expect("valid id")
            .with_lab("EGFR", -5.0);
        assert_eq!(patient.lab_value("egfr"), Some(-5.0));
    }

    #[test]
    fn cohort_errors_name_the_record() {
        let cohort = r#"[
            { "patient_id": "A1", "medications": ["codeine"] },
            { "patient_id": "bad id" }
        ]"#;
        let err = parse_cohort_json(cohort).expect_err("second record is invalid");
        assert!(err.to_string().contains("patient [1]"));

        let ok = parse_cohort_json(r#"[{ "patient_id": "A1" }, { "patient_id": "A2" }]"#)
            .expect("valid cohort");
        assert_eq!(ok.len(), 2);
        assert!(ok[0].medications().is_empty());
    }
}
