use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use subnetviz::config::{PlanConfig, DEFAULT_CANVAS_EXTENT};
use subnetviz::config_loader;
use subnetviz::ip::AddressRange;
use subnetviz::report::{self, LayoutReport};

/// Subnet allocation planner: carve labeled subnets out of a summary block
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the layout of an allocation plan
    Show {
        /// Path to the allocation plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Override the plan's canvas extent
        #[arg(long)]
        extent: Option<f64>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export an allocation plan as CSV
    Export {
        /// Path to the allocation plan YAML file
        #[arg(short, long)]
        plan: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = "subnets.csv")]
        output: PathBuf,
    },

    /// Import subnets from CSV and render their layout
    Import {
        /// Path to the CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Summary range; inferred from the first row when omitted
        #[arg(short, long)]
        summary: Option<String>,

        /// Write the imported allocation as a plan YAML file
        #[arg(long)]
        plan_output: Option<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate an allocation plan
    Check {
        /// Path to the allocation plan YAML file
        #[arg(short, long)]
        plan: PathBuf,
    },
}

fn emit(report: &LayoutReport, json: bool, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => report::write_report(report, path, json),
        None => {
            if json {
                println!("{}", report::render_json(report)?);
            } else {
                print!("{}", report::render_text(report));
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still wins over --log-level
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Show { plan, extent, json, output } => {
            let (config, registry) = config_loader::load_registry(&plan)?;
            let extent = extent.unwrap_or(config.canvas_extent);
            let layout = LayoutReport::new(&registry, extent);
            emit(&layout, json, output.as_ref())?;
        }
        Commands::Export { plan, output } => {
            let (_, registry) = config_loader::load_registry(&plan)?;
            config_loader::export_csv(&registry, &output)?;
            info!("Subnet data exported to {}", output.display());
        }
        Commands::Import { input, summary, plan_output, json } => {
            let summary_hint = summary
                .as_deref()
                .map(AddressRange::parse)
                .transpose()
                .wrap_err("Invalid --summary")?;
            let registry = config_loader::import_csv(&input, summary_hint)?;

            if let Some(path) = plan_output {
                let plan = PlanConfig::from_registry(&registry, DEFAULT_CANVAS_EXTENT);
                config_loader::save_plan(&plan, &path)?;
            }

            let layout = LayoutReport::new(&registry, DEFAULT_CANVAS_EXTENT);
            emit(&layout, json, None)?;
        }
        Commands::Check { plan } => {
            let (_, registry) = config_loader::load_registry(&plan)?;
            let layout = LayoutReport::new(&registry, DEFAULT_CANVAS_EXTENT);
            report::print_summary(&layout);
            info!("Plan {} is valid", plan.display());
        }
    }

    Ok(())
}
