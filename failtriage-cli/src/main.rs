//! failtriage: run (or read) a Robot Framework result and triage its
//! failures with an AI classifier.
//!
//! Reads config from flags, env vars and an optional YAML file:
//!   OPENAI_API_KEY     oracle credential (required)
//!   OPENAI_MODEL       model id (default: gpt-4.1-mini)
//!   FAILTRIAGE_CONFIG  YAML config path
//!
//! Exit code mirrors Robot's return code; 2 when `output.xml` is missing.

mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use failtriage_core::{load_report, OpenAiOracle, Report, RunMetadata, TriagePipeline};

use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,failtriage_core=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.build_config()?;

    std::fs::create_dir_all(&args.outputdir)
        .with_context(|| format!("creating {}", args.outputdir.display()))?;

    let robot_rc = if args.run_robot {
        run_robot(&args.outputdir, &args.robot_args()).await?
    } else {
        args.robot_rc
    };

    let output_xml = args.output_xml();
    if !output_xml.exists() {
        tracing::error!("output.xml not found at {}", output_xml.display());
        return Ok(ExitCode::from(2));
    }

    let root = load_report(&output_xml)?;

    // Credential presence was checked by build_config.
    let api_key = config.oracle.api_key.clone().unwrap_or_default();
    let oracle = OpenAiOracle::new(api_key, &config.oracle.model, config.oracle.timeout())?
        .with_endpoint(config.oracle.endpoint.clone());
    let pipeline = TriagePipeline::new(&config, oracle)?;

    let analyses = pipeline.run(&root, args.trace_dir()).await?;

    let report = Report::assemble(
        RunMetadata {
            return_code: robot_rc,
            output_dir: args.outputdir.clone(),
            output_xml,
            model: pipeline.model_name().to_string(),
        },
        analyses,
        Utc::now(),
    );
    report
        .write_to(&args.ai_report)
        .with_context(|| format!("writing {}", args.ai_report.display()))?;
    tracing::info!(
        analyzed = report.failure_count_analyzed,
        "Wrote AI report: {}",
        args.ai_report.display()
    );

    Ok(exit_code(robot_rc))
}

/// Run `robot` into `outputdir` and return its exit status.
async fn run_robot(outputdir: &Path, robot_args: &[String]) -> Result<i32> {
    tracing::info!(args = ?robot_args, "Running Robot Framework");
    let status = tokio::process::Command::new("robot")
        .arg("--outputdir")
        .arg(outputdir)
        .args(["--output", "output.xml", "--log", "log.html", "--report", "report.html"])
        .args(robot_args)
        .status()
        .await
        .context("failed to launch robot")?;
    Ok(status.code().unwrap_or(-1))
}

fn exit_code(robot_rc: i32) -> ExitCode {
    ExitCode::from(u8::try_from(robot_rc).unwrap_or(u8::MAX))
}
