//! Command implementations shared by the subcommands and the interactive
//! menu.

use std::path::{Path, PathBuf};
use std::time::Instant;

use map_tools_analysis::{NearestRequest, run_nearest};
use map_tools_cli_utils::{IndicatifProgress, MultiProgress};
use map_tools_export::{ExportFile, export_record, export_table, record_links};
use map_tools_features::{FeatureCollection, FieldSelector};
use map_tools_features::schema::property_keys;
use map_tools_formats::{OutputFormat, decode_file};
use map_tools_import::{ImportRequest, default_table_name, import_features};
use map_tools_store::{MemoryStore, RecordStore};

use crate::config::Config;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Store, settings and progress output for one invocation.
pub struct Context {
    pub store: MemoryStore,
    pub config: Config,
    pub multi: MultiProgress,
}

impl Context {
    /// Opens the store named by `config`.
    ///
    /// # Errors
    ///
    /// * If the store file exists but cannot be read
    pub async fn open(config: Config, multi: MultiProgress) -> Result<Self, Box<dyn std::error::Error>> {
        let store = MemoryStore::open(config.store_path.clone())
            .await?
            .with_read_only(config.read_only);
        log::debug!("Using store {}", config.store_path.display());
        Ok(Self {
            store,
            config,
            multi,
        })
    }
}

/// Prints what an import of `file` would produce.
pub fn inspect(file: &Path) -> CommandResult {
    let collection = decode_file(file)?;
    let keys = property_keys(&collection);

    println!("File:        {}", file.display());
    println!("Features:    {}", collection.len());
    println!("Importable:  {}", collection.located_count());
    println!("Table name:  {}", default_table_name(file));
    println!();
    if keys.is_empty() {
        println!("No properties; no name field can be chosen.");
    } else {
        println!("Name field candidates:");
        for key in &keys {
            println!("  {key}");
        }
    }
    Ok(())
}

/// Imports `file` into a new table.
pub async fn import(
    ctx: &Context,
    file: &Path,
    name_field: &str,
    table: Option<String>,
    chunk_size: Option<usize>,
) -> CommandResult {
    let collection = decode_file(file)?;
    import_decoded(ctx, file, collection, name_field, table, chunk_size).await
}

/// Imports a collection already decoded from `file`.
pub async fn import_decoded(
    ctx: &Context,
    file: &Path,
    collection: FeatureCollection,
    name_field: &str,
    table: Option<String>,
    chunk_size: Option<usize>,
) -> CommandResult {
    let start = Instant::now();
    let mut request = ImportRequest::new(
        table.unwrap_or_else(|| default_table_name(file)),
        name_field,
    );
    request.chunk_size = chunk_size.unwrap_or(ctx.config.chunk_size);

    let progress = IndicatifProgress::chunks_bar(&ctx.multi, &format!("Decoded {}", file.display()));
    let summary = import_features(&ctx.store, &request, collection, progress.as_ref()).await?;

    log::info!(
        "Imported {} records into {} in {} chunks ({} without geometry skipped) in {:.1}s",
        summary.record_ids.len(),
        summary.table,
        summary.chunks,
        summary.skipped,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Lists tables with their field and record counts.
pub async fn tables(ctx: &Context) -> CommandResult {
    let names = ctx.store.table_names().await?;
    if names.is_empty() {
        println!("No tables.");
        return Ok(());
    }

    println!("{:<30} {:>7} {:>9}", "TABLE", "FIELDS", "RECORDS");
    println!("{}", "-".repeat(48));
    for name in &names {
        let fields = ctx.store.table_fields(name).await?;
        let records = ctx.store.records(name).await?;
        println!("{name:<30} {:>7} {:>9}", fields.len(), records.len());
    }
    Ok(())
}

/// Exports a whole table into `output_dir`.
pub async fn export(
    ctx: &Context,
    table: &str,
    format: OutputFormat,
    selector: &FieldSelector,
    output_dir: &Path,
) -> CommandResult {
    let file = export_table(&ctx.store, table, format, selector, ctx.config.range_policy()).await?;
    let path = write_export(&file, output_dir).await?;
    println!("Wrote {} features to {}", file.features, path.display());
    Ok(())
}

/// Exports one record into `output_dir`.
pub async fn export_one(
    ctx: &Context,
    table: &str,
    record_id: &str,
    format: OutputFormat,
    output_dir: &Path,
) -> CommandResult {
    let file = export_record(&ctx.store, table, record_id, format, ctx.config.range_policy()).await?;
    let path = write_export(&file, output_dir).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Prints map links for one record.
pub async fn links(ctx: &Context, table: &str, record_id: &str) -> CommandResult {
    let links = record_links(&ctx.store, table, record_id, ctx.config.range_policy()).await?;

    println!("{} ({}, {})", links.name, links.latitude, links.longitude);
    println!("  OpenStreetMap: {}", links.openstreetmap);
    println!("  Google Maps:   {}", links.google_maps);
    println!("  geo URI:       {}", links.geo_uri);
    Ok(())
}

/// Links each target record to its nearest input record.
pub async fn nearest(ctx: &Context, request: &NearestRequest) -> CommandResult {
    let start = Instant::now();
    let progress = IndicatifProgress::records_bar(
        &ctx.multi,
        &format!("Loading {} and {}", request.target_table, request.input_table),
    );

    let summary = run_nearest(&ctx.store, request, ctx.config.range_policy(), progress.as_ref()).await?;

    log::info!(
        "Linked {} records in {} ({} without location) in {:.1}s",
        summary.matched,
        request.target_table,
        summary.skipped,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Parses a comma-separated field list into a selector; `all` wins.
#[must_use]
pub fn field_selector(all: bool, fields: Option<&str>) -> FieldSelector {
    if all {
        return FieldSelector::All;
    }
    match fields {
        Some(list) => {
            let names: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
            if names.is_empty() {
                FieldSelector::NameOnly
            } else {
                FieldSelector::Only(names)
            }
        }
        None => FieldSelector::NameOnly,
    }
}

async fn write_export(file: &ExportFile, output_dir: &Path) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(&file.file_name);
    tokio::fs::write(&path, &file.content).await?;
    log::debug!("Wrote {} ({})", path.display(), file.media_type);
    Ok(path)
}
