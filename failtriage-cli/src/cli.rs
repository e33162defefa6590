//! Command-line arguments and config layering

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use failtriage_core::TriageConfig;

/// Analyze Robot Framework failures with an AI classifier
#[derive(Parser, Debug)]
#[command(name = "failtriage", version)]
pub struct Args {
    /// YAML config file (caps, model, extra redaction rules)
    #[arg(long, env = "FAILTRIAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Robot output directory
    #[arg(long, default_value = "artifacts/robot")]
    pub outputdir: PathBuf,

    /// Where to write the AI report
    #[arg(long, default_value = "artifacts/ai_report.json")]
    pub ai_report: PathBuf,

    /// Directory holding the Playwright trace zip (defaults to --outputdir)
    #[arg(long)]
    pub trace_dir: Option<PathBuf>,

    /// Skip trace extraction entirely
    #[arg(long)]
    pub no_trace: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL")]
    pub model: Option<String>,

    /// Chat-completions endpoint
    #[arg(long, env = "OPENAI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Max failures to analyze (cost control)
    #[arg(long)]
    pub max_failures: Option<usize>,

    /// Max chars kept from each failure message
    #[arg(long)]
    pub max_message_chars: Option<usize>,

    /// Per-call oracle timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Run Robot Framework before analyzing
    #[arg(long)]
    pub run_robot: bool,

    /// Return code to record when Robot is not run here
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub robot_rc: i32,

    /// Arguments passed to Robot Framework (after `--`)
    #[arg(last = true)]
    pub robot_args: Vec<String>,
}

impl Args {
    pub fn output_xml(&self) -> PathBuf {
        self.outputdir.join("output.xml")
    }

    pub fn trace_dir(&self) -> Option<&Path> {
        if self.no_trace {
            None
        } else {
            Some(self.trace_dir.as_deref().unwrap_or(&self.outputdir))
        }
    }

    pub fn robot_args(&self) -> Vec<String> {
        if self.robot_args.is_empty() {
            vec!["tests/".to_string()]
        } else {
            self.robot_args.clone()
        }
    }

    /// Defaults, then the config file, then flags and environment.
    pub fn build_config(&self) -> Result<TriageConfig> {
        let mut config = match &self.config {
            Some(path) => TriageConfig::from_yaml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TriageConfig::default(),
        };

        if let Some(key) = &self.api_key {
            config.oracle.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            config.oracle.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.oracle.endpoint = endpoint.clone();
        }
        if let Some(n) = self.max_failures {
            config.max_failures = n;
        }
        if let Some(n) = self.max_message_chars {
            config.max_message_chars = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.oracle.timeout_secs = secs;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}
