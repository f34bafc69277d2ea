use std::path::PathBuf;

use clap::Parser;

/// Etiqueta ficheros de audio con modelos de embeddings y clasificación.
#[derive(Parser, Debug)]
#[command(name = "autotag")]
#[command(about = "Tags audio files with labels predicted by embedding + classifier models")]
#[command(version)]
pub struct Args {
    /// Pipeline configuration (JSON). Defaults to config.json in the user config dir.
    #[arg(short, long, env = "AUTOTAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hide the per-group progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Also write logs to the user log file
    #[arg(long)]
    pub log_file: bool,
}
