use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "appctl-operator")]
#[command(about = "Reconciles App resources into Deployments and Services")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (overrides APPCTL_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Run the controller (default)
    #[default]
    Run,
    /// Print the App CustomResourceDefinition as JSON
    Crd,
    /// Print the effective configuration as TOML
    Config,
}
