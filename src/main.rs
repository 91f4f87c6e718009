//! msfs-exporter CLI
//!
//! Command-line front end for exporting a scene document as an MSFS asset
//! package, writing stand-alone manifests and inspecting scenes.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use msfs_core::{AmbiguityPolicy, ExportConfiguration, LodLevels, TextureResolution};
use msfs_export::logging::{self, TracingConfig};
use msfs_export::{generate_manifest, ExportPipeline, ExportSummary, TextureProcessingResult};
use msfs_scene::{InMemoryScene, SceneRepository};

/// Export scene collections as Microsoft Flight Simulator asset packages
#[derive(Parser)]
#[command(name = "msfs-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full export for one collection
    Export(ExportArgs),

    /// Write only the LOD manifest
    Manifest(ManifestArgs),

    /// List collections, materials and images of a scene document
    List(ListArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene document (JSON)
    scene: PathBuf,

    /// Export configuration file (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output root directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Collection to export
    #[arg(short, long)]
    collection: Option<String>,

    /// Additional LOD levels after LOD0 (0-3)
    #[arg(long)]
    lods: Option<u8>,

    /// Texture resolution (1024, 2048 or 4096)
    #[arg(long)]
    resolution: Option<u32>,

    /// Skip the XML manifest
    #[arg(long)]
    no_manifest: bool,

    /// Uniform scale factor
    #[arg(long)]
    scale: Option<f32>,

    /// Directory name used to repair stale texture paths
    #[arg(long)]
    landmark: Option<String>,

    /// Path components kept after the landmark
    #[arg(long)]
    repair_depth: Option<usize>,

    /// Leave a texture path alone when several files match
    #[arg(long)]
    require_unique: bool,
}

#[derive(Args)]
struct ManifestArgs {
    /// Directory the manifest is written to
    #[arg(short, long)]
    output: PathBuf,

    /// Asset base name
    #[arg(short, long)]
    name: String,

    /// Additional LOD levels after LOD0 (0-3)
    #[arg(long, default_value = "1")]
    lods: u8,
}

#[derive(Args)]
struct ListArgs {
    /// Scene document (JSON)
    scene: PathBuf,
}

fn setup_logging(verbosity: u8) {
    logging::init_with_config(TracingConfig::for_verbosity(verbosity));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Manifest(args) => cmd_manifest(args),
        Commands::List(args) => cmd_list(args, cli.format),
    }
}

fn build_config(args: &ExportArgs) -> Result<ExportConfiguration> {
    let mut config = match &args.config {
        Some(path) => ExportConfiguration::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ExportConfiguration::default(),
    };

    if let Some(output) = &args.output {
        config.output_root = output.clone();
    }
    if let Some(collection) = &args.collection {
        config.collection = collection.clone();
    }
    if let Some(lods) = args.lods {
        config.lod_levels = LodLevels::try_from(lods)?;
    }
    if let Some(resolution) = args.resolution {
        config.texture_resolution = TextureResolution::try_from(resolution)?;
    }
    if args.no_manifest {
        config.generate_manifest = false;
    }
    if let Some(scale) = args.scale {
        config.scale_factor = scale;
    }
    if let Some(landmark) = &args.landmark {
        config.path_repair.landmark = landmark.clone();
    }
    if let Some(depth) = args.repair_depth {
        config.path_repair.depth = depth;
    }
    if args.require_unique {
        config.path_repair.on_ambiguous = AmbiguityPolicy::RequireUnique;
    }

    Ok(config)
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let config = build_config(&args)?;

    info!("Loading scene: {:?}", args.scene);
    let mut scene = InMemoryScene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;

    let summary = ExportPipeline::new(config)
        .run(&mut scene)
        .context("Export failed")?;

    for miss in &summary.repair.misses {
        warn!("Unrepaired texture path: {:?}", miss);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn summary_json(summary: &ExportSummary) -> serde_json::Value {
    let textures: Vec<_> = summary
        .textures
        .outcomes
        .iter()
        .map(|o| {
            let (status, reason) = match &o.result {
                TextureProcessingResult::Succeeded => ("succeeded", None),
                TextureProcessingResult::RetriedAndSucceeded => ("retried", None),
                TextureProcessingResult::Skipped(reason) => ("skipped", Some(reason.to_string())),
            };
            serde_json::json!({
                "image": o.name,
                "status": status,
                "reason": reason,
                "output": o.output,
            })
        })
        .collect();

    let repaired: Vec<_> = summary
        .repair
        .repaired
        .iter()
        .map(|r| serde_json::json!({ "image": r.name, "old": r.old, "new": r.new }))
        .collect();

    serde_json::json!({
        "collection": summary.collection,
        "model_files": summary.model_files,
        "manifest": summary.manifest,
        "repaired_paths": repaired,
        "unrepaired_paths": summary.repair.miss_count(),
        "textures": textures,
        "removed_files": summary.removed_files,
    })
}

fn print_summary(summary: &ExportSummary) {
    println!("Exported collection '{}'", summary.collection);
    println!();
    println!("Models:");
    for path in &summary.model_files {
        println!("  {}", path.display());
    }
    if let Some(manifest) = &summary.manifest {
        println!("Manifest:  {}", manifest.display());
    }
    println!();
    println!(
        "Paths:     {} repaired, {} unresolved",
        summary.repair.repaired_count(),
        summary.repair.miss_count()
    );
    println!(
        "Textures:  {} written ({} after retry), {} skipped",
        summary.textures.processed(),
        summary.textures.retried(),
        summary.textures.skipped()
    );
    for outcome in &summary.textures.outcomes {
        if let TextureProcessingResult::Skipped(reason) = &outcome.result {
            println!("  skipped {}: {}", outcome.name, reason);
        }
    }
    println!("Cleanup:   {} files removed", summary.removed_files.len());
}

fn cmd_manifest(args: ManifestArgs) -> Result<()> {
    if args.name.trim().is_empty() {
        bail!("Asset name must not be empty");
    }
    let config = ExportConfiguration::new(&args.output, &args.name)
        .with_lod_levels(LodLevels::try_from(args.lods)?);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let base = args
        .output
        .join(format!("{}.{}", args.name, msfs_core::config::MODEL_EXTENSION));
    let path = generate_manifest(&base, &config).context("Failed to write manifest")?;

    println!("{}", path.display());
    Ok(())
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> Result<()> {
    let scene = InMemoryScene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;

    let collections: Vec<_> = scene
        .collection_names()
        .into_iter()
        .map(|name| {
            let objects: Vec<String> = scene
                .collection_objects(&name)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| scene.object(id).map(|o| o.name.clone()))
                .collect();
            (name, objects)
        })
        .collect();

    let materials: Vec<_> = scene
        .materials()
        .into_iter()
        .filter_map(|id| scene.material(id))
        .map(|m| {
            let images: Vec<String> = m
                .image_textures()
                .filter_map(|(_, image)| scene.image(image).map(|i| i.name.clone()))
                .collect();
            (m.name.clone(), images)
        })
        .collect();

    let images: Vec<_> = scene.images().into_iter().filter_map(|id| scene.image(id)).collect();

    match format {
        OutputFormat::Json => {
            let collections: Vec<_> = collections
                .iter()
                .map(|(name, objects)| serde_json::json!({ "name": name, "objects": objects }))
                .collect();
            let materials: Vec<_> = materials
                .iter()
                .map(|(name, images)| serde_json::json!({ "name": name, "images": images }))
                .collect();
            let images: Vec<_> = images
                .iter()
                .map(|i| {
                    serde_json::json!({
                        "name": i.name,
                        "path": i.filepath,
                        "width": i.width,
                        "height": i.height,
                        "channels": i.channels,
                        "packed": i.packed,
                        "resolves": i.path_resolves(),
                    })
                })
                .collect();
            let json = serde_json::json!({
                "collections": collections,
                "materials": materials,
                "images": images,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Collections:");
            for (name, objects) in &collections {
                println!("  {name} ({} objects)", objects.len());
                for object in objects {
                    println!("    {object}");
                }
            }
            println!("\nMaterials:");
            for (name, images) in &materials {
                println!("  {name}: {}", images.join(", "));
            }
            println!("\nImages:");
            println!("  {:<24} {:<11} {:<7} Path", "Name", "Size", "Status");
            for image in &images {
                let status = if image.packed {
                    "packed"
                } else if image.path_resolves() {
                    "ok"
                } else {
                    "missing"
                };
                let size = format!("{}x{}", image.width, image.height);
                println!("  {:<24} {:<11} {:<7} {}", image.name, size, status, image.filepath.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "msfs-exporter");
    }

    #[test]
    fn test_export_flags_override_defaults() {
        let cli = Cli::parse_from(["msfs-exporter", "export", "scene.json", "-o", "out", "-c", "Wing", "--lods", "2"]);
        let Commands::Export(args) = cli.command else {
            panic!("expected export command");
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.collection, "Wing");
        assert_eq!(config.lod_levels, LodLevels::Two);
    }
}
