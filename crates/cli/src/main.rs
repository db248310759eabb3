use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use pgx_core::constants::{DEFAULT_OUTPUT_DIR, KB_DIR_ENV, OUTPUT_DIR_ENV};
use pgx_core::{
    parse_cohort_json, render_report, resolve_knowledge_base_dir, CoreConfig, Patient,
    PatientAnalysis, PgxService,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pgx")]
#[command(about = "Pharmacogenomic interpretation CLI")]
struct Cli {
    /// Knowledge base directory (defaults to PGX_KB_DIR, then the bundled knowledge/)
    #[arg(long, global = true)]
    kb_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single patient record
    Analyze {
        /// Patient JSON file
        patient_file: PathBuf,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
        /// Also write the analysis to this directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze every patient in a cohort file and write one report per patient
    Batch {
        /// Cohort JSON file (array of patient records)
        cohort_file: PathBuf,
        /// Output directory (defaults to PGX_OUTPUT_DIR, then output/)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the built-in clinical reference cases
    Validate {
        /// Print results and metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show knowledge base version and entry counts
    KbInfo,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("pgx=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let kb_dir = cli
        .kb_dir
        .or_else(|| std::env::var_os(KB_DIR_ENV).map(PathBuf::from));

    let outcome = match cli.command {
        Some(Commands::Analyze {
            patient_file,
            json,
            output,
        }) => analyze(kb_dir, &patient_file, json, output)
            .map_err(|e| format!("Error analyzing {}: {}", patient_file.display(), e)),
        Some(Commands::Batch {
            cohort_file,
            output,
        }) => batch(kb_dir, &cohort_file, output)
            .map(|written| println!("Wrote {} analyses", written))
            .map_err(|e| format!("Error running batch {}: {}", cohort_file.display(), e)),
        Some(Commands::Validate { json }) => {
            validate(kb_dir, json).map_err(|e| format!("Error running validation: {}", e))
        }
        Some(Commands::KbInfo) => {
            kb_info(kb_dir).map_err(|e| format!("Error loading knowledge base: {}", e))
        }
        None => {
            println!("Use 'pgx --help' for commands");
            Ok(())
        }
    };

    Ok(exit_code(outcome))
}

/// Print a command failure and map it to a non-zero exit status.
fn exit_code(outcome: Result<(), String>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn output_dir(output: Option<PathBuf>) -> PathBuf {
    output
        .or_else(|| std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn load_service(kb_dir: Option<PathBuf>, output: PathBuf) -> Result<PgxService, Box<dyn Error>> {
    let kb_dir = resolve_knowledge_base_dir(kb_dir)?;
    let cfg = CoreConfig::new(kb_dir, output)?;
    Ok(PgxService::load(Arc::new(cfg))?)
}

fn analyze(
    kb_dir: Option<PathBuf>,
    patient_file: &Path,
    json: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(patient_file)?;
    let patient = Patient::from_json(&text)?;
    let write = output.is_some();
    let service = load_service(kb_dir, output_dir(output))?;

    let analysis = service.analyze_patient(&patient);
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }

    if write {
        let path = service.write_analysis(&analysis)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn batch(
    kb_dir: Option<PathBuf>,
    cohort_file: &Path,
    output: Option<PathBuf>,
) -> Result<usize, Box<dyn Error>> {
    let text = fs::read_to_string(cohort_file)?;
    let patients = parse_cohort_json(&text)?;
    let service = load_service(kb_dir, output_dir(output))?;

    let analyses = service.analyze_cohort(&patients);
    for analysis in &analyses {
        let path = service.write_analysis(analysis)?;
        println!(
            "{:<16} {:<40} ddi {:<9} {}",
            analysis.patient_id,
            analysis.risk_summary.category.label(),
            analysis.ddi_burden.level,
            path.display()
        );
    }

    let summary = service.cohort_summary(&analyses);
    let path = service.write_cohort_summary(&summary)?;
    println!("Cohort summary: {}", path.display());
    Ok(analyses.len())
}

fn validate(kb_dir: Option<PathBuf>, json: bool) -> Result<(), Box<dyn Error>> {
    let service = load_service(kb_dir, output_dir(None))?;
    let (results, metrics) = service.run_validation()?;

    if json {
        let value = serde_json::json!({ "results": results, "metrics": metrics });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", render_report(&results, &metrics));
    }
    Ok(())
}

fn kb_info(kb_dir: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let kb_dir = resolve_knowledge_base_dir(kb_dir)?;
    let kb = pgx_kb::KnowledgeBase::load(&kb_dir)?;
    let version = kb.version();
    let stats = kb.stats();

    let label = |v: &Option<String>| v.clone().unwrap_or_else(|| "unversioned".into());
    println!("Knowledge base: {}", kb_dir.display());
    println!("  gene-drug version:  {}", label(&version.gene_drug));
    println!("  drug-drug version:  {}", label(&version.drug_drug));
    println!("  dosing version:     {}", label(&version.dosing));
    println!("  sha256:             {}", version.sha256);
    println!("  gene-drug records:  {}", stats.gene_drug_interactions);
    println!("  drug-drug records:  {}", stats.drug_drug_interactions);
    println!("  CYP inhibitors:     {}", stats.inhibitor_entries);
    println!("  CYP inducers:       {}", stats.inducer_entries);
    println!("  renal entries:      {}", stats.renal_entries);
    println!("  hepatic entries:    {}", stats.hepatic_entries);
    Ok(())
}

fn print_analysis(analysis: &PatientAnalysis) {
    let summary = &analysis.risk_summary;
    println!("Patient: {}", analysis.patient_id);
    println!(
        "Analyzed: {} (platform {})",
        analysis
            .analyzed_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        analysis.platform_version
    );
    println!(
        "Risk: {} (max {:.1}, average {:.1}, {} actionable of {})",
        summary.category,
        summary.overall_score,
        summary.average_score,
        summary.actionable_count,
        summary.total_findings
    );

    let burden = &analysis.ddi_burden;
    println!(
        "DDI burden: {} (score {}, {} interactions, {} gene-linked)",
        burden.level,
        burden.weighted_score,
        burden.total_interactions,
        burden.gene_linked.len()
    );

    if analysis.findings.is_empty() {
        println!("No findings.");
        return;
    }

    println!("Findings:");
    for scored in &analysis.findings {
        let f = &scored.finding;
        println!(
            "  [{:>5.1}] {:<13} {:<21} {}",
            scored.risk_score,
            f.severity.as_str(),
            f.finding_type.as_str(),
            f.summary
        );
    }

    if !analysis.recommendations.is_empty() {
        println!("Recommendations:");
        for rec in &analysis.recommendations {
            println!(
                "  P{} {:<19} {:<24} {:<10} {}",
                rec.priority,
                rec.action_type.as_str(),
                rec.drug,
                rec.time_frame.as_str(),
                rec.monitoring_plan
            );
            if !rec.suggested_alternatives.is_empty() {
                println!("     alternatives: {}", rec.suggested_alternatives.join(", "));
            }
        }
    }
}
