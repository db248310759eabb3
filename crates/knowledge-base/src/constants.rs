//! File names and fixed thresholds for the knowledge base.

/// File stem of the gene-drug interaction table.
pub const GENE_DRUG_INTERACTIONS_STEM: &str = "gene_drug_interactions";

/// File stem of the drug-drug interaction and CYP modulator table.
pub const DRUG_DRUG_INTERACTIONS_STEM: &str = "drug_drug_interactions";

/// File stem of the renal/hepatic dosing table.
pub const DOSING_GUIDELINES_STEM: &str = "dosing_guidelines";

/// All KB file stems, in digest order.
pub const KB_FILE_STEMS: [&str; 3] = [
    GENE_DRUG_INTERACTIONS_STEM,
    DRUG_DRUG_INTERACTIONS_STEM,
    DOSING_GUIDELINES_STEM,
];

/// ALT/ULN ratio above which hepatic adjustment applies.
pub const HEPATIC_ALT_RATIO_THRESHOLD: f64 = 3.0;

/// ALT/ULN ratio above which hepatic injury is graded severe.
pub const SEVERE_HEPATIC_ALT_RATIO: f64 = 5.0;

pub(crate) const DEFAULT_RENAL_ACTION: &str = "Review dosing";
