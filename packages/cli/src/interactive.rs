//! Menu-driven interface using `dialoguer`, for running the commands
//! without memorizing flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use map_tools_analysis::NearestRequest;
use map_tools_features::FieldSelector;
use map_tools_features::schema::property_keys;
use map_tools_formats::{OutputFormat, decode_file};
use map_tools_import::default_table_name;
use map_tools_store::RecordStore;
use strum::IntoEnumIterator;

use crate::commands::{self, Context};

type MenuResult = Result<(), Box<dyn std::error::Error>>;

/// Top-level actions in the interactive menu.
enum Action {
    Import,
    Inspect,
    ListTables,
    ExportTable,
    ExportRecord,
    MapLinks,
    Nearest,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Import,
        Self::Inspect,
        Self::ListTables,
        Self::ExportTable,
        Self::ExportRecord,
        Self::MapLinks,
        Self::Nearest,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Import => "Import a shapefile or GeoJSON file",
            Self::Inspect => "Inspect a file",
            Self::ListTables => "List tables",
            Self::ExportTable => "Export a table",
            Self::ExportRecord => "Export a single record",
            Self::MapLinks => "Show map links for a record",
            Self::Nearest => "Link records to their nearest neighbor",
        }
    }
}

/// Prompts for an action and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected command fails.
pub async fn run(ctx: &Context) -> MenuResult {
    println!("Map Tools");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Import => import(ctx).await,
        Action::Inspect => commands::inspect(&prompt_file()?),
        Action::ListTables => commands::tables(ctx).await,
        Action::ExportTable => export_table(ctx).await,
        Action::ExportRecord => export_record(ctx).await,
        Action::MapLinks => {
            let Some(table) = pick_table(ctx, "Table").await? else {
                return Ok(());
            };
            let Some(record) = pick_record(ctx, &table).await? else {
                return Ok(());
            };
            commands::links(ctx, &table, &record).await
        }
        Action::Nearest => nearest(ctx).await,
    }
}

fn prompt_file() -> Result<PathBuf, dialoguer::Error> {
    let path: String = Input::new()
        .with_prompt("File (.zip, .geojson or .json)")
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

async fn import(ctx: &Context) -> MenuResult {
    let file = prompt_file()?;
    let collection = decode_file(&file)?;
    let keys = property_keys(&collection);
    if keys.is_empty() {
        println!("The file has no properties to name records by.");
        return Ok(());
    }

    println!(
        "{} features, {} will be imported.",
        collection.len(),
        collection.located_count()
    );

    let idx = Select::new()
        .with_prompt("Name field")
        .items(&keys)
        .default(0)
        .max_length(20)
        .interact()?;

    let table: String = Input::new()
        .with_prompt("Table name")
        .default(default_table_name(&file))
        .interact_text()?;

    let chunk_size = prompt_chunk_size(ctx.config.chunk_size)?;

    let name_field = keys[idx].clone();
    commands::import_decoded(ctx, &file, collection, &name_field, Some(table), Some(chunk_size))
        .await
}

/// Asks again until the answer is a positive whole number.
fn prompt_chunk_size(default: usize) -> Result<usize, dialoguer::Error> {
    Input::<usize>::new()
        .with_prompt("Records per write")
        .default(default)
        .validate_with(|n: &usize| -> Result<(), &str> {
            if *n == 0 {
                Err("must be at least 1")
            } else {
                Ok(())
            }
        })
        .interact_text()
}

async fn export_table(ctx: &Context) -> MenuResult {
    let Some(table) = pick_table(ctx, "Table to export").await? else {
        return Ok(());
    };
    let format = pick_format()?;

    let fields: Vec<String> = ctx
        .store
        .table_fields(&table)
        .await?
        .into_iter()
        .map(|f| f.name)
        .collect();
    let chosen = MultiSelect::new()
        .with_prompt("Fields to include besides the name (space=toggle, enter=confirm)")
        .items(&fields)
        .max_length(20)
        .interact()?;

    let selector = if chosen.is_empty() {
        FieldSelector::NameOnly
    } else if chosen.len() == fields.len() {
        FieldSelector::All
    } else {
        FieldSelector::Only(chosen.into_iter().map(|i| fields[i].clone()).collect())
    };

    commands::export(ctx, &table, format, &selector, &prompt_output_dir()?).await
}

async fn export_record(ctx: &Context) -> MenuResult {
    let Some(table) = pick_table(ctx, "Table").await? else {
        return Ok(());
    };
    let Some(record) = pick_record(ctx, &table).await? else {
        return Ok(());
    };
    let format = pick_format()?;

    commands::export_one(ctx, &table, &record, format, &prompt_output_dir()?).await
}

async fn nearest(ctx: &Context) -> MenuResult {
    let Some(target_table) = pick_table(ctx, "Table whose records get a link").await? else {
        return Ok(());
    };
    let Some(input_table) = pick_table(ctx, "Table to search for the nearest record").await?
    else {
        return Ok(());
    };

    let link_field: String = Input::new()
        .with_prompt("Link field")
        .default("Nearest".to_string())
        .interact_text()?;
    let create_link_field = Confirm::new()
        .with_prompt("Create the field if it does not exist?")
        .default(true)
        .interact()?;

    let request = NearestRequest {
        target_table,
        input_table,
        link_field,
        create_link_field,
    };
    commands::nearest(ctx, &request).await
}

async fn pick_table(
    ctx: &Context,
    prompt: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut names = ctx.store.table_names().await?;
    if names.is_empty() {
        println!("No tables yet. Import a file first.");
        return Ok(None);
    }

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&names)
        .default(0)
        .max_length(20)
        .interact()?;
    Ok(Some(names.swap_remove(idx)))
}

async fn pick_record(
    ctx: &Context,
    table: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let records = ctx.store.records(table).await?;
    if records.is_empty() {
        println!("{table} has no records.");
        return Ok(None);
    }

    let labels: Vec<String> = records
        .iter()
        .map(|r| format!("{} ({})", r.name, r.id))
        .collect();
    let idx = Select::new()
        .with_prompt("Record")
        .items(&labels)
        .default(0)
        .max_length(20)
        .interact()?;
    Ok(Some(records[idx].id.clone()))
}

fn pick_format() -> Result<OutputFormat, dialoguer::Error> {
    let formats: Vec<OutputFormat> = OutputFormat::iter().collect();
    let labels: Vec<&str> = formats.iter().copied().map(OutputFormat::extension).collect();

    let idx = Select::new()
        .with_prompt("Format")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(formats[idx])
}

fn prompt_output_dir() -> Result<PathBuf, dialoguer::Error> {
    let dir: String = Input::new()
        .with_prompt("Output directory")
        .default(".".to_string())
        .interact_text()?;
    Ok(PathBuf::from(dir.trim()))
}
