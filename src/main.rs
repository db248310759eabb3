use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pgx_core::constants::{
    DEFAULT_OUTPUT_DIR, DEFAULT_PATIENTS_FILE, KB_DIR_ENV, OUTPUT_DIR_ENV, PATIENTS_FILE_ENV,
};
use pgx_core::{CoreConfig, PatientAnalysis, PgxService, parse_cohort_json, resolve_knowledge_base_dir};

/// Batch entry point for the PGx platform
///
/// Loads the knowledge base once, analyzes every patient in the cohort file on
/// blocking workers that share one service, and writes one JSON report per patient
/// followed by a cohort summary.
///
/// # Environment Variables
/// - `PGX_KB_DIR`: Knowledge base directory (default: bundled `knowledge/`)
/// - `PGX_PATIENTS_FILE`: Cohort JSON file (default: "data/sample_cohort.json")
/// - `PGX_OUTPUT_DIR`: Directory for analysis reports (default: "output")
///
/// # Returns
/// * `Ok(())` - If the cohort was read and the summary written
/// * `Err(anyhow::Error)` - If configuration, the knowledge base or the cohort file is unusable
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("pgx=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let kb_dir = resolve_knowledge_base_dir(std::env::var_os(KB_DIR_ENV).map(PathBuf::from))?;
    let output_dir = std::env::var(OUTPUT_DIR_ENV).unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into());
    let patients_file =
        std::env::var(PATIENTS_FILE_ENV).unwrap_or_else(|_| DEFAULT_PATIENTS_FILE.into());

    let cfg = Arc::new(CoreConfig::new(kb_dir, PathBuf::from(output_dir))?);
    let service = Arc::new(PgxService::load(cfg.clone())?);

    let text = tokio::fs::read_to_string(&patients_file)
        .await
        .with_context(|| format!("failed to read cohort file {patients_file}"))?;
    let patients = parse_cohort_json(&text)?;

    tracing::info!(
        "++ Analyzing {} patients from {} with knowledge base {}",
        patients.len(),
        patients_file,
        cfg.knowledge_base_dir().display()
    );

    let mut handles = Vec::with_capacity(patients.len());
    for patient in patients {
        let service = Arc::clone(&service);
        handles.push(tokio::task::spawn_blocking(move || {
            let analysis = service.analyze_patient(&patient);
            let written = service.write_analysis(&analysis);
            (analysis, written)
        }));
    }

    let mut analyses: Vec<PatientAnalysis> = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((analysis, Ok(path))) => {
                tracing::info!(
                    patient_id = %analysis.patient_id,
                    category = %analysis.risk_summary.category,
                    "wrote {}",
                    path.display()
                );
                analyses.push(analysis);
            }
            Ok((analysis, Err(e))) => {
                tracing::warn!(patient_id = %analysis.patient_id, "failed to write analysis: {e}");
                analyses.push(analysis);
            }
            Err(e) => tracing::warn!("analysis worker failed: {e}"),
        }
    }

    let summary = service.cohort_summary(&analyses);
    let path = service.write_cohort_summary(&summary)?;
    tracing::info!("++ Cohort summary written to {}", path.display());

    Ok(())
}
