#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `map_tools`: import shapefiles and `GeoJSON` into tables, export tables
//! as `GeoJSON` or KML, and link records to their nearest neighbor.
//!
//! Without a subcommand an interactive menu is shown. Uses
//! `indicatif-log-bridge` (via [`map_tools_cli_utils::init_logger`]) so
//! that log lines and progress bars never fight for the terminal.

mod commands;
mod config;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use map_tools_analysis::NearestRequest;
use map_tools_formats::OutputFormat;

use crate::commands::Context;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "map_tools", about = "Geodata import, export and nearest-neighbor linking")]
struct Cli {
    /// Store file (overrides `store_path` and `MAP_TOOLS_STORE`)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Config file (default: `map_tools.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Refuse every write to the store
    #[arg(long, global = true)]
    read_only: bool,
    /// Accept locations outside the valid latitude/longitude ranges
    #[arg(long, global = true)]
    lenient: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show feature counts and name field candidates of a file
    Inspect {
        /// Zipped shapefile (.zip) or GeoJSON (.geojson, .json)
        file: PathBuf,
    },
    /// Import a file into a new table
    Import {
        /// Zipped shapefile (.zip) or GeoJSON (.geojson, .json)
        file: PathBuf,
        /// Property that becomes the record name
        #[arg(long)]
        name_field: String,
        /// Table to create (default: the file name without extension)
        #[arg(long)]
        table: Option<String>,
        /// Records per write (default: `chunk_size` from config, else 50)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// List tables
    Tables,
    /// Export a table
    Export {
        #[arg(long)]
        table: String,
        /// `geojson` or `kml`
        #[arg(long, default_value = "geojson")]
        format: OutputFormat,
        /// Copy every field into the feature properties
        #[arg(long)]
        all_fields: bool,
        /// Comma-separated fields to copy into the feature properties
        #[arg(long, conflicts_with = "all_fields")]
        fields: Option<String>,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Export a single record
    ExportRecord {
        #[arg(long)]
        table: String,
        /// Record id
        #[arg(long)]
        record: String,
        /// `geojson` or `kml`
        #[arg(long, default_value = "geojson")]
        format: OutputFormat,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
    /// Print map links for a record's location
    Links {
        #[arg(long)]
        table: String,
        /// Record id
        #[arg(long)]
        record: String,
    },
    /// Link every target record to its nearest input record
    Nearest {
        /// Table whose records receive the link
        #[arg(long)]
        target: String,
        /// Table searched for the nearest record
        #[arg(long)]
        input: String,
        /// Field of the target table that receives the link
        #[arg(long)]
        link_field: String,
        /// Create the link field if the target table lacks it
        #[arg(long)]
        create_field: bool,
    },
}

fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config =
        Config::load(cli.config.as_deref())?.with_env_overrides(|name| std::env::var(name).ok())?;

    if let Some(store) = &cli.store {
        config.store_path.clone_from(store);
    }
    if cli.read_only {
        config.read_only = true;
    }
    if cli.lenient {
        config.validate_ranges = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = map_tools_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let ctx = Context::open(config, multi).await?;

    let Some(command) = cli.command else {
        return interactive::run(&ctx).await;
    };

    match command {
        Commands::Inspect { file } => commands::inspect(&file)?,
        Commands::Import {
            file,
            name_field,
            table,
            chunk_size,
        } => commands::import(&ctx, &file, &name_field, table, chunk_size).await?,
        Commands::Tables => commands::tables(&ctx).await?,
        Commands::Export {
            table,
            format,
            all_fields,
            fields,
            output,
        } => {
            let selector = commands::field_selector(all_fields, fields.as_deref());
            commands::export(&ctx, &table, format, &selector, &output).await?;
        }
        Commands::ExportRecord {
            table,
            record,
            format,
            output,
        } => commands::export_one(&ctx, &table, &record, format, &output).await?,
        Commands::Links { table, record } => commands::links(&ctx, &table, &record).await?,
        Commands::Nearest {
            target,
            input,
            link_field,
            create_field,
        } => {
            let request = NearestRequest {
                target_table: target,
                input_table: input,
                link_field,
                create_link_field: create_field,
            };
            commands::nearest(&ctx, &request).await?;
        }
    }

    Ok(())
}
