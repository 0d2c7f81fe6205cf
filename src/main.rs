//! Command line front end
//!
//! ```bash
//! rcge check --sam data/open_economy.toml
//! rcge solve --sam data/open_economy.toml --config data/import_price_shock.toml
//! rcge solve --sample closed --json
//! ```

use clap::{Args, Parser, Subcommand};
use rcge::Economy;
use rcge_core::errors::CGEResult;
use rcge_core::sam::SocialAccountingMatrix;
use rcge_components::ModelConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Calibrate and solve a CGE model from a social accounting matrix
#[derive(Parser, Debug)]
#[command(name = "rcge")]
#[command(about = "Calibrate and solve a CGE model from a social accounting matrix")]
struct Cli {
    /// Increase logging output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the table and calibrate the model
    Check(Input),
    /// Solve for the equilibrium of the configured scenario
    Solve {
        #[command(flatten)]
        input: Input,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// Accounting table in TOML or JSON
    #[arg(long, conflicts_with = "sample", required_unless_present = "sample")]
    sam: Option<PathBuf>,

    /// Use a built-in economy instead of a file
    #[arg(long, value_enum)]
    sample: Option<SampleArg>,

    /// Model configuration in TOML
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SampleArg {
    Open,
    Closed,
}

impl Input {
    fn load(&self) -> CGEResult<(SocialAccountingMatrix, ModelConfig)> {
        match (&self.sam, self.sample) {
            (Some(path), _) => rcge::load(path, self.config.as_deref()),
            (None, sample) => {
                let economy = match sample {
                    Some(SampleArg::Closed) => Economy::Closed,
                    _ => Economy::Open,
                };
                let (sam, config) = economy.load()?;
                let config = match &self.config {
                    Some(path) => ModelConfig::from_file(path)?,
                    None => config,
                };
                Ok((sam, config))
            }
        }
    }
}

fn run(cli: &Cli) -> CGEResult<()> {
    match &cli.command {
        Command::Check(input) => {
            let (sam, config) = input.load()?;
            let model = rcge::check(&sam, &config)?;
            let sets = &model.parameters().sets;
            println!("{:<12} {:>14} {:>14}", "account", "receipts", "payments");
            for (label, receipts, payments) in sam.totals() {
                println!("{:<12} {:>14.4} {:>14.4}", label, receipts, payments);
            }
            println!();
            println!(
                "Table with {} accounts is balanced: {} sectors, {} factors, {} households",
                sam.len(),
                sets.sectors.len(),
                sets.factors.len(),
                sets.households.len()
            );
        }
        Command::Solve { input, json } => {
            let (sam, config) = input.load()?;
            let report = rcge::solve(&sam, &config)?;
            if *json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_input_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
