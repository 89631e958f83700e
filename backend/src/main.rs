//! deliverystats CLI - join delivery data sources and print the statistics report
//!
//! # Main Commands
//!
//! ```bash
//! deliverystats run                            # data/ inputs, export + text report
//! deliverystats run --format json --no-export  # JSON report only
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! deliverystats inspect users data/users.json  # first rows of one source as JSON
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use deliverystats::{
    init_logging, load_source, log_error, run_and_export, LoadOptions, PipelineOptions, ReportConfig,
    SourceKind,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deliverystats")]
#[command(about = "Merge orders, users and restaurants into one dataset and report on it", long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: load, merge, normalize, aggregate, export, report
    Run {
        /// Orders file (delimited text)
        #[arg(long, default_value = "data/orders.csv")]
        orders: PathBuf,

        /// Users file (JSON array of records)
        #[arg(long, default_value = "data/users.json")]
        users: PathBuf,

        /// Restaurants file (SQL schema and seed script)
        #[arg(long, default_value = "data/restaurants.sql")]
        restaurants: PathBuf,

        /// Table queried after running the restaurants script
        #[arg(long, default_value = "restaurants")]
        table: String,

        /// Orders delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Export file for the merged dataset
        #[arg(short, long, default_value = "final_food_delivery_dataset.csv")]
        output: PathBuf,

        /// Skip writing the export file
        #[arg(long)]
        no_export: bool,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Membership tier treated as Gold
        #[arg(long, default_value = "Gold")]
        gold_tier: String,

        /// City whose revenue is reported on its own
        #[arg(long, default_value = "Hyderabad")]
        city: String,
    },

    /// Load one source and print its first rows as JSON
    Inspect {
        /// Source kind
        #[arg(value_enum)]
        kind: SourceKind,

        /// Source file
        input: PathBuf,

        /// Number of rows to print
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,

        /// Table queried for relational sources
        #[arg(long, default_value = "restaurants")]
        table: String,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            orders,
            users,
            restaurants,
            table,
            delimiter,
            output,
            no_export,
            format,
            gold_tier,
            city,
        } => {
            let options = PipelineOptions {
                orders_path: orders,
                users_path: users,
                restaurants_path: restaurants,
                export_path: output,
                load: LoadOptions {
                    delimiter,
                    table_name: table,
                },
                report: ReportConfig {
                    gold_tier,
                    spotlight_city: city,
                    ..ReportConfig::default()
                },
            };
            cmd_run(&options, no_export, format)
        }

        Commands::Inspect {
            kind,
            input,
            rows,
            table,
        } => cmd_inspect(kind, input, rows, table),
    };

    if let Err(e) = result {
        log_error(e.to_string());
        std::process::exit(1);
    }
}

fn cmd_run(
    options: &PipelineOptions,
    no_export: bool,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = run_and_export(options, no_export)?;

    match format {
        Format::Text => print!("{}", output.report.render_text()),
        Format::Json => println!("{}", output.report.to_json()?),
    }
    Ok(())
}

fn cmd_inspect(
    kind: SourceKind,
    input: PathBuf,
    rows: usize,
    table: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = LoadOptions {
        delimiter: None,
        table_name: table,
    };
    let loaded = load_source(kind, &input, &options)?;

    eprintln!("   Columns: {}", loaded.columns.join(", "));
    eprintln!("   Rows: {}", loaded.len());

    let json = serde_json::to_string_pretty(&loaded.head_json(rows))?;
    println!("{}", json);
    Ok(())
}
