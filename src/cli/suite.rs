//! Suite execution commands

use crate::cli::display::{ScenarioOutcome, TableRenderer};
use crate::domain::scenario::builtin_scenarios;
use crate::{
    ClusterClientImpl, FileRecorder, MemoryRecorder, ResultRecorder, Scenario, ScenarioContext,
    SuiteConfig, SuiteValidator,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    /// Kubernetes namespace the scenarios run in
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Path to kubeconfig file
    /// If not specified, uses default kubeconfig resolution (KUBECONFIG env or ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use
    /// If not specified, uses current context from kubeconfig
    #[arg(long)]
    pub context: Option<String>,

    /// Path to suite configuration file (csi-conformance.toml)
    /// If not provided, reads CSI_CONFORMANCE_CONF_FILE or falls back to defaults
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    /// Result artifact path; one PASS line is appended per successful scenario
    /// Defaults to the E2E_TEST_RESULT environment variable
    #[arg(long, value_name = "PATH")]
    pub result_file: Option<String>,

    /// Tag prefixed to every recorded result line
    #[arg(long)]
    pub suite_tag: Option<String>,

    /// Only run scenarios whose name contains this substring
    #[arg(long)]
    pub filter: Option<String>,
}

impl RunCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = resolve_config(
            self.config_file.as_deref(),
            self.namespace.clone(),
            self.result_file.clone(),
            self.suite_tag.clone(),
        )?;
        let ctx = connect(&config, self.kubeconfig.clone(), self.context.clone()).await?;

        SuiteValidator::new(ctx.kube_client())
            .validate_suite(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Cluster validation failed: {}", e))?;

        let mut recorder: Box<dyn ResultRecorder> = match &config.result_file {
            Some(path) => {
                println!("Recording results to {}", path.display());
                Box::new(FileRecorder::open(path)?)
            }
            None => {
                println!("ℹ️  No result file configured, outcomes are reported to the console only");
                Box::new(MemoryRecorder::new())
            }
        };

        let scenarios = builtin_scenarios(&config);
        let selected: Vec<&Scenario> = scenarios
            .iter()
            .filter(|s| {
                self.filter
                    .as_deref()
                    .map_or(true, |needle| s.name().contains(needle))
            })
            .collect();
        if selected.is_empty() {
            anyhow::bail!(
                "no scenario matches filter '{}'",
                self.filter.clone().unwrap_or_default()
            );
        }

        println!(
            "Running {} scenario(s) in namespace '{}' (started {})",
            selected.len(),
            config.namespace,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let mut outcomes = Vec::new();
        for scenario in selected {
            println!("\n▶ {} [{}]", scenario.name(), scenario.kind());
            let begin = Instant::now();
            match scenario.run(&ctx).await {
                Ok(()) => {
                    let line = format!("{}: {}: PASS\n", config.suite_tag, scenario.name());
                    recorder
                        .record(&line)
                        .map_err(|e| anyhow::anyhow!("Failed to record result: {}", e))?;
                    println!("✓ {}", scenario.name());
                    outcomes.push(ScenarioOutcome::pass(
                        scenario.name(),
                        scenario.kind(),
                        begin.elapsed(),
                    ));
                }
                Err(e) => {
                    println!("✗ {}: {}", scenario.name(), e);
                    outcomes.push(ScenarioOutcome::fail(
                        scenario.name(),
                        scenario.kind(),
                        begin.elapsed(),
                        e.to_string(),
                    ));
                }
            }
        }

        println!("\n{}", TableRenderer::new().render_outcomes(&outcomes));

        let failed = outcomes.iter().filter(|o| !o.passed).count();
        if failed > 0 {
            anyhow::bail!("{} of {} scenarios failed", failed, outcomes.len());
        }
        println!("All {} scenarios passed.", outcomes.len());
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct ListCommand {
    /// Path to suite configuration file (csi-conformance.toml)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,
}

impl ListCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = resolve_config(self.config_file.as_deref(), None, None, None)?;
        let scenarios = builtin_scenarios(&config);
        let rows: Vec<(String, &'static str)> = scenarios
            .iter()
            .map(|s| (s.name().to_string(), s.kind()))
            .collect();

        println!("{}", TableRenderer::new().render_catalog(&rows));
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub struct CheckCommand {
    /// Kubernetes namespace
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Kubeconfig file path
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context
    #[arg(long)]
    pub context: Option<String>,

    /// Path to suite configuration file (csi-conformance.toml)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,
}

impl CheckCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = resolve_config(self.config_file.as_deref(), self.namespace.clone(), None, None)?;
        println!("✓ Configuration valid");

        let ctx = connect(&config, self.kubeconfig.clone(), self.context.clone()).await?;
        SuiteValidator::new(ctx.kube_client())
            .validate_suite(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Cluster validation failed: {}", e))?;
        println!(
            "✓ Cluster reachable, namespace '{}' and all storage classes present",
            config.namespace
        );

        for scenario in builtin_scenarios(&config) {
            scenario
                .validate()
                .map_err(|e| anyhow::anyhow!("Scenario '{}' is invalid: {}", scenario.name(), e))?;
        }
        println!("✓ All catalog scenarios valid");
        Ok(())
    }
}

/// Resolution order: command line > environment > config file > defaults.
fn resolve_config(
    config_file: Option<&str>,
    namespace: Option<String>,
    result_file: Option<String>,
    suite_tag: Option<String>,
) -> anyhow::Result<SuiteConfig> {
    let mut config = if let Some(path) = config_file {
        SuiteConfig::from_file(path)?
    } else if let Ok(env_path) = std::env::var("CSI_CONFORMANCE_CONF_FILE") {
        SuiteConfig::from_file(&env_path)?
    } else {
        println!("ℹ️  No configuration file specified, using default settings");
        SuiteConfig::default()
    };

    config.apply_env();

    if let Some(namespace) = namespace {
        config.namespace = namespace;
    }
    if let Some(path) = result_file {
        config.result_file = Some(path.into());
    }
    if let Some(tag) = suite_tag {
        config.suite_tag = tag;
    }

    config.validate()?;
    Ok(config)
}

async fn connect(
    config: &SuiteConfig,
    kubeconfig: Option<String>,
    context: Option<String>,
) -> anyhow::Result<ScenarioContext> {
    let client = if kubeconfig.is_none() && context.is_none() {
        ClusterClientImpl::new(config.namespace.clone()).await
    } else {
        ClusterClientImpl::new_with_config(config.namespace.clone(), kubeconfig, context).await
    }
    .map_err(|e| anyhow::anyhow!("Failed to connect to cluster: {}", e))?;

    Ok(ScenarioContext::new(Arc::new(client)))
}
