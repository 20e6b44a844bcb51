//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `riskvault_core` linkage with deterministic output.
//! - Rank connection counts given as arguments.
//! - With `--config <file>`, open the configured local store and print a
//!   risk matrix summary.

use clap::Parser;
use log::info;
use riskvault_core::{
    init_logging_from_config, rank, CoreConfig, CoreContext, InMemoryNoteGraph,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// riskvault smoke CLI
#[derive(clap::Parser, Debug)]
#[command(name = "riskvault")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; prints the configured risk matrix summary
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection counts to rank
    counts: Vec<u32>,
}

fn print_matrix(config: CoreConfig) -> Result<(), String> {
    if init_logging_from_config(&config).map_err(|err| err.to_string())? {
        info!("event=cli_start module=cli status=ok");
    }
    let context = CoreContext::new(config, Arc::new(InMemoryNoteGraph::new()))
        .map_err(|err| err.to_string())?;
    let repo = context.open_repository().map_err(|err| err.to_string())?;
    let matrix = repo.risk_matrix().map_err(|err| err.to_string())?;

    println!(
        "matrix categories={} risks={}",
        matrix.categories.len(),
        matrix.risks.len()
    );
    for category in &matrix.categories {
        println!("  {category}: {}", matrix.risks_in(category).len());
    }
    println!("  (uncategorized): {}", matrix.uncategorized().len());
    Ok(())
}

fn run(args: Args) -> Result<(), String> {
    println!("riskvault_core ping={}", riskvault_core::ping());
    println!("riskvault_core version={}", riskvault_core::core_version());
    for count in &args.counts {
        println!("connections={count} tier={}", rank(*count));
    }

    if let Some(path) = args.config {
        let config = CoreConfig::load(&path).map_err(|err| err.to_string())?;
        print_matrix(config)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn counts_and_config_are_parsed() {
        let parsed =
            Args::try_parse_from(["riskvault", "12", "--config", "/tmp/rv.json", "3"]).unwrap();
        assert_eq!(parsed.counts, vec![12, 3]);
        assert_eq!(parsed.config.unwrap().to_str(), Some("/tmp/rv.json"));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["riskvault", "many"]).is_err());
        assert!(Args::try_parse_from(["riskvault", "--config"]).is_err());
        assert!(Args::try_parse_from(["riskvault", "-5"]).is_err());
    }
}
