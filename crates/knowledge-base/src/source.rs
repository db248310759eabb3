//! Read-only query contract over the knowledge base.

use crate::model::{
    CypInhibitor, DrugInteraction, GeneDrugInteraction, HepaticAdjustment, RenalAdjustment,
};
use pgx_types::FunctionalPhenotype;
use std::collections::BTreeMap;

/// Queries the interpretation engine issues against the knowledge base.
///
/// All drug and gene names are matched case-insensitively. A name the knowledge base
/// does not know yields an empty or absent result, never an error.
pub trait KnowledgeSource {
    /// All gene-drug interaction records for `drug`, in file order.
    fn interactions_for_drug(&self, drug: &str) -> Vec<&GeneDrugInteraction>;

    /// The interaction record for a single gene-drug pair.
    fn gene_drug_interaction(&self, gene: &str, drug: &str) -> Option<&GeneDrugInteraction>;

    /// Functional phenotype imposed on `gene` by the medication list.
    ///
    /// Strong inhibitors are checked before moderate inhibitors, and both before
    /// inducers; the first tier with a match decides.
    fn phenoconversion(&self, medications: &[String], gene: &str) -> Option<FunctionalPhenotype>;

    /// CYP inhibitors present in `medications`, keyed by case-folded gene symbol.
    fn cyp_inhibitors_in_list(&self, medications: &[String]) -> BTreeMap<String, Vec<CypInhibitor>>;

    /// CYP inducers present in `medications`, keyed by case-folded gene symbol.
    fn cyp_inducers_in_list(&self, medications: &[String]) -> BTreeMap<String, Vec<String>>;

    /// Pairwise drug-drug interactions among `medications`, one per unordered pair.
    fn drug_drug_interactions(&self, medications: &[String]) -> Vec<&DrugInteraction>;

    /// Renal adjustment for `drug` when `egfr` is below its cutoff.
    fn renal_adjustment(&self, drug: &str, egfr: f64) -> Option<RenalAdjustment>;

    /// Hepatic adjustment for `drug` when the ALT/ULN ratio exceeds the threshold.
    fn hepatic_adjustment(&self, drug: &str, alt_ratio: f64) -> Option<HepaticAdjustment>;
}
