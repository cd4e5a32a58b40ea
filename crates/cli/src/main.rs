#![deny(unsafe_code)]
//! CLI binary for the fibertrace streamline tracker.
//!
//! Subcommands:
//! - `track <field>`: seed a lattice in a synthetic field, track, write curves as JSON
//! - `list`: print available field presets and the default configuration

mod error;
mod presets;

use clap::{Parser, Subcommand};
use error::CliError;
use fibertrace_core::seed::{lattice, subsample};
use fibertrace_core::Xorshift64;
use fibertrace_streamline::{CurveFilter, MaxCurves, TrackConfig, Tracker};
use presets::FieldPreset;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fibertrace", about = "Streamline tractography over synthetic fields")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track a seed lattice through a field preset and write the curves.
    Track {
        /// Field preset name (e.g. "crossing").
        field: String,

        /// Half-width of the cubic field domain.
        #[arg(short, long, default_value_t = 20.0)]
        extent: f64,

        /// Spacing of the seed lattice.
        #[arg(short, long, default_value_t = 4.0)]
        spacing: f64,

        /// Seed for the noise preset and the random streams.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Track a random subset of at most this many lattice seeds.
        #[arg(long)]
        max_seeds: Option<usize>,

        /// Keep a random subset of at most this many curves.
        #[arg(long)]
        max_curves: Option<usize>,

        /// Output file path; curves go to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tracking configuration as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// List available field presets and the default configuration.
    List,
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let fields = FieldPreset::list_fields();
            if cli.json {
                let info = serde_json::json!({
                    "fields": fields,
                    "config": TrackConfig::default(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Fields:");
                for name in fields {
                    println!("  {name}");
                }
                println!("Default config:");
                println!("{}", serde_json::to_string_pretty(&TrackConfig::default())?);
            }
        }
        Command::Track {
            field,
            extent,
            spacing,
            seed,
            max_seeds,
            max_curves,
            output,
            params,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).map_err(CliError::Params)?;
            let mut config = TrackConfig::from_json(&params);
            if params.get("rng_seed").is_none() {
                config.rng_seed = seed;
            }

            let preset = FieldPreset::from_name(&field, extent, seed)?;
            let domain = FieldPreset::domain(extent);
            let mut seeds =
                lattice(domain.min, domain.max, spacing).map_err(CliError::Seeds)?;
            if let Some(limit) = max_seeds {
                seeds = subsample(seeds, limit, &mut Xorshift64::new(seed));
            }
            info!(field = %field, seeds = seeds.len(), "seeded lattice");

            let tracker = Tracker::new(Arc::new(preset), config)?.with_track_region(Arc::new(domain));
            let mut curves = tracker.run(&seeds)?;
            if let Some(count) = max_curves {
                curves = MaxCurves { count, seed }.apply(curves, tracker.config().emit_empty);
            }

            let body = serde_json::to_string(&curves)?;
            match &output {
                Some(path) => std::fs::write(path, body).map_err(|source| CliError::Write {
                    path: path.clone(),
                    source,
                })?,
                None => println!("{body}"),
            }

            let vertices: usize = curves.iter().map(|c| c.len()).sum();
            let mean_length = if curves.non_empty() > 0 {
                curves.iter().map(|c| c.arc_length()).sum::<f64>() / curves.non_empty() as f64
            } else {
                0.0
            };
            if cli.json {
                let info = serde_json::json!({
                    "field": field,
                    "seeds": seeds.len(),
                    "curves": curves.non_empty(),
                    "vertices": vertices,
                    "mean_length": mean_length,
                    "output": output.as_ref().map(|p| p.display().to_string()),
                });
                eprintln!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "tracked {field} ({} seeds) -> {} curves, {vertices} vertices, mean length {mean_length:.2}",
                    seeds.len(),
                    curves.non_empty(),
                );
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
