use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use cdcom_format::{load_component_file, ComponentFile};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize the contents of a component file
    Info {
        /// Path to the .cdcom file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a component file's hash and signature
    Verify {
        /// Path to the .cdcom file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Command::Info { file, json } => info_command(&file, json),
        Command::Verify { file } => verify_command(&file),
    }
}

fn open(path: &Path) -> Result<ComponentFile> {
    if path.extension().map_or(true, |ext| ext != "cdcom") {
        warn!("File doesn't have .cdcom extension: {}", path.display());
    }
    load_component_file(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn info_command(path: &Path, json: bool) -> Result<()> {
    let file = open(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info_json(&file))?);
        return Ok(());
    }

    let header = &file.header;
    println!("format version: {}", header.version);
    println!("content hash:   {}", hex::encode(header.content_hash));
    println!("items:          {}", header.item_count);
    println!(
        "signed:         {}",
        if header.signature.is_some() { "yes" } else { "no" }
    );

    for description in &file.descriptions {
        println!();
        println!(
            "{} {}",
            description.component_name, description.metadata.version
        );
        if !description.metadata.author.is_empty() {
            println!("  author:         {}", description.metadata.author);
        }
        println!("  guid:           {}", description.metadata.guid);
        println!("  min size:       {}", description.min_size);
        println!("  properties:     {}", description.properties.len());
        let connections: usize = description
            .connections
            .iter()
            .map(|group| group.connections.len())
            .sum();
        println!("  connections:    {}", connections);
        println!(
            "  render groups:  {}",
            description.render_descriptions.len()
        );
        if !description.metadata.configurations.is_empty() {
            let names: Vec<&str> = description
                .metadata
                .configurations
                .iter()
                .map(|configuration| configuration.name.as_str())
                .collect();
            println!("  configurations: {}", names.join(", "));
        }
    }

    if !file.resources.is_empty() {
        println!();
        for resource in &file.resources {
            println!(
                "resource {}: {} ({} bytes)",
                resource.id,
                resource.resource_type.mime_type().unwrap_or("unknown"),
                resource.data.len()
            );
        }
    }

    Ok(())
}

fn info_json(file: &ComponentFile) -> serde_json::Value {
    serde_json::json!({
        "version": file.header.version,
        "contentHash": hex::encode(file.header.content_hash),
        "signed": file.header.signature.is_some(),
        "descriptions": file.descriptions.iter().map(|description| {
            serde_json::json!({
                "id": description.id,
                "name": description.component_name,
                "author": description.metadata.author,
                "version": description.metadata.version.to_string(),
                "guid": description.metadata.guid.to_string(),
                "minSize": description.min_size,
                "properties": description.properties.iter()
                    .map(|property| property.name.as_str())
                    .collect::<Vec<_>>(),
                "configurations": description.metadata.configurations.iter()
                    .map(|configuration| configuration.name.as_str())
                    .collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "resources": file.resources.iter().map(|resource| {
            serde_json::json!({
                "id": resource.id,
                "bytes": resource.data.len(),
            })
        }).collect::<Vec<_>>(),
    })
}

fn verify_command(path: &Path) -> Result<()> {
    let file = open(path)?;
    // A successful parse already proves the content hash.
    println!("content hash:   ok");

    if file.header.signature.is_none() {
        println!("signature:      not present");
        return Ok(());
    }
    match file
        .descriptions
        .first()
        .and_then(|description| description.metadata.signature.as_ref())
    {
        Some(signature) if signature.is_valid => {
            println!(
                "signature:      ok ({} byte certificate)",
                signature.certificate.len()
            );
            Ok(())
        }
        Some(_) => anyhow::bail!("signature verification failed"),
        None => anyhow::bail!("signed file contains no components to verify"),
    }
}
