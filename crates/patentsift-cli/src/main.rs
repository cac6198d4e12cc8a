//! PatentSift: patent record classification pipeline driver.

use std::path::{Path, PathBuf};

use anyhow::Context;
use patentsift_core::{PipelineConfig, RawRecord};
use patentsift_runtime::{NoopAnalyzer, Pipeline, PipelineRun};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "PATENTSIFT_CONFIG";

fn resolve_config(path: Option<&str>) -> patentsift_core::Result<PipelineConfig> {
    let path = path
        .map(PathBuf::from)
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
    let config = match path {
        Some(path) => PipelineConfig::load(&path)?,
        None => {
            info!("No configuration given, using built-in profile");
            PipelineConfig::builtin()?
        }
    };
    config.with_env_overrides()
}

fn read_records(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    let records: Vec<RawRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    Ok(records)
}

fn write_run(run: &PipelineRun, output: Option<&str>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(run)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path))?;
            info!("Wrote run to {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_summary(run: &PipelineRun) {
    let short_fingerprint = run.config_fingerprint.get(..12).unwrap_or(&run.config_fingerprint);
    eprintln!(
        "Config: {} v{} ({})",
        run.config_name, run.config_version, short_fingerprint
    );
    for stage in &run.stages {
        eprint!(
            "{:<14} {:>6} -> {:<6}",
            format!("{:?}", stage.stage),
            stage.input,
            stage.output
        );
        for (reason, count) in &stage.excluded {
            eprint!("  {:?}={}", reason, count);
        }
        eprintln!();
    }
    if !run.summary.categories.is_empty() {
        eprint!("Categories:");
        for (category, count) in &run.summary.categories {
            eprint!("  {}={}", category, count);
        }
        eprintln!();
    }
    for (position, record) in run.ranked.iter().take(10).enumerate() {
        eprintln!(
            "{:>3}. {:<20} {:>7.2}  {}",
            position + 1,
            record.identifier(),
            record.total_score(),
            record
                .taxonomy
                .value(patentsift_core::Dimension::TherapeuticArea)
        );
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the run JSON can be piped.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "run" => {
            let Some(records_path) = args.get(2) else {
                eprintln!("Usage: patentsift run <records.json> [config.json] [output.json]");
                std::process::exit(1);
            };
            let config = match resolve_config(args.get(3).map(String::as_str)) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    std::process::exit(1);
                }
            };
            let pipeline = match Pipeline::new(config) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    std::process::exit(1);
                }
            };

            let records = read_records(Path::new(records_path))?;
            let mut run = pipeline.run(&records);
            run.enrich(&NoopAnalyzer);

            print_summary(&run);
            write_run(&run, args.get(4).map(String::as_str))?;
        }
        "validate" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: patentsift validate <config.json>");
                std::process::exit(1);
            };
            match PipelineConfig::load(path).and_then(|c| c.fingerprint().map(|f| (c, f))) {
                Ok((config, fingerprint)) => {
                    println!(
                        "{}: valid (name={}, version={}, categories={}, fingerprint={})",
                        path,
                        config.name,
                        config.version,
                        config.categories.len(),
                        fingerprint
                    );
                }
                Err(e) => {
                    eprintln!("{}: {}", path, e);
                    std::process::exit(1);
                }
            }
        }
        "--help" | "-h" | "help" => {
            println!("PatentSift: patent record classification pipeline");
            println!();
            println!("Usage: patentsift <command>");
            println!();
            println!("Commands:");
            println!("  run <records.json> [config.json] [output.json]");
            println!("                           Run the pipeline; output defaults to stdout");
            println!("  validate <config.json>   Check a configuration file");
            println!("  help                     Show this help message");
            println!();
            println!("Environment:");
            println!("  {}        Configuration file when none is given", CONFIG_ENV);
            println!("  PATENTSIFT_MIN_SCORE     Override the configured min_score");
            println!("  RUST_LOG                 Log filter (default: info)");
        }
        other => {
            eprintln!("Unknown command: {}. Use 'patentsift help' for usage.", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
