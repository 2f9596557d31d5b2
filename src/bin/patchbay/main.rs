//! patchbay - play a factory patch from the computer keyboard
//!
//! Run with: cargo run -- --preset pad

mod app;

use clap::Parser;

/// Modular synthesizer demo
#[derive(Parser, Debug)]
#[command(name = "patchbay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Factory preset to load (lead, bass, pad, pluck, keys)
    #[arg(short, long, default_value = "lead")]
    pub preset: String,

    /// Voice pool size
    #[arg(long, default_value_t = 16)]
    pub polyphony: usize,

    /// Frames per render block
    #[arg(long, default_value_t = 256)]
    pub block_size: usize,

    /// Bypass effects after a block overruns its deadline
    #[arg(long)]
    pub deadline_guard: bool,

    /// How long a key sounds before its note-off, in milliseconds
    #[arg(long, default_value_t = 400)]
    pub hold_ms: u64,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();
    app::run(cli)
}
