use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubedeck",
    version,
    about = "Browse and operate a Kubernetes cluster from the terminal."
)]
pub struct CliArgs {
    /// Start in a specific namespace and skip the namespace picker
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Refresh interval in seconds (overrides the saved preference)
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Path to the preferences file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
