// CLI command definitions

use super::suite::{CheckCommand, ListCommand, RunCommand};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "csi-conformance",
    version,
    about = "Conformance-test suite for block-storage CSI drivers on Kubernetes",
    long_about = "Provisions volumes across storage classes, attaches them to Pods, Deployments \
                  and StatefulSets, verifies volume contents survive restarts, node drains and \
                  resizes, and records one PASS line per fully-successful scenario"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario suite (all scenarios, or a filtered subset)
    Run(RunCommand),

    /// List the scenarios in the built-in catalog
    List(ListCommand),

    /// Validate configuration and cluster readiness without running scenarios
    Check(CheckCommand),
}
