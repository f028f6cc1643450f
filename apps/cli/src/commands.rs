//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use doxograph_graph::{DoxygenGraph, HierarchyNode, class_hierarchy};
use doxograph_graph::entity::EntityId;
use doxograph_shared::{BuildConfig, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Doxograph — entity graphs and Markdown from extractor XML.
#[derive(Parser)]
#[command(
    name = "doxograph",
    version,
    about = "Build a cross-referenced entity graph from Doxygen XML output.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the graph and print every categorization view.
    Inspect {
        /// Directory containing index.xml and the compound files.
        xml_dir: PathBuf,

        /// Build config TOML file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit a JSON summary instead of the tree dump.
        #[arg(long)]
        json: bool,
    },

    /// Render one entity's documentation as Markdown.
    Render {
        /// Directory containing index.xml and the compound files.
        xml_dir: PathBuf,

        /// Refid of the entity to render.
        #[arg(short, long)]
        refid: String,

        /// Build config TOML file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "doxograph=info",
        1 => "doxograph=debug",
        _ => "doxograph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect {
            xml_dir,
            config,
            json,
        } => cmd_inspect(&xml_dir, config.as_deref(), json),
        Command::Render {
            xml_dir,
            refid,
            config,
        } => cmd_render(&xml_dir, &refid, config.as_deref()),
    }
}

fn load_graph(xml_dir: &Path, config: Option<&Path>) -> Result<DoxygenGraph> {
    let config = match config {
        Some(path) => load_config_from(path)?,
        None => BuildConfig::default(),
    };
    info!(xml_dir = %xml_dir.display(), "building entity graph");
    Ok(DoxygenGraph::load(xml_dir, &config)?)
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

fn cmd_inspect(xml_dir: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let graph = load_graph(xml_dir, config)?;
    let views = graph.views();
    let labeled = [
        ("scopes", views.root),
        ("groups", views.groups),
        ("files", views.files),
        ("pages", views.pages),
        ("examples", views.examples),
    ];

    if json {
        let mut view_counts = serde_json::Map::new();
        for (label, root) in labeled {
            view_counts.insert(label.to_string(), subtree_size(&graph, root).into());
        }
        let stubs = graph
            .registry()
            .iter()
            .filter(|(_, e)| e.stub)
            .count();
        let summary = serde_json::json!({
            "entities": graph.registry().len(),
            "stubs": stubs,
            "views": view_counts,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for (label, root) in labeled {
        println!("{label}:");
        print_tree(&graph, root, 1);
    }

    let hierarchy = class_hierarchy(&graph);
    if !hierarchy.is_empty() {
        println!("hierarchy:");
        for node in hierarchy {
            match node {
                HierarchyNode::Documented(id) => {
                    println!("  {}", graph.entity(id).name);
                }
                HierarchyNode::Placeholder { name, derived } => {
                    println!("  {name} (undocumented)");
                    for id in derived {
                        println!("    {}", graph.entity(id).name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_tree(graph: &DoxygenGraph, node: EntityId, depth: usize) {
    for &child in graph.children(node) {
        let entity = graph.entity(child);
        let marker = if entity.stub { " (stub)" } else { "" };
        println!(
            "{:indent$}{} {}{marker}",
            "",
            entity.kind,
            entity.name,
            indent = depth * 2
        );
        print_tree(graph, child, depth + 1);
    }
}

fn subtree_size(graph: &DoxygenGraph, node: EntityId) -> usize {
    graph
        .children(node)
        .iter()
        .map(|&c| 1 + subtree_size(graph, c))
        .sum()
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

fn cmd_render(xml_dir: &Path, refid: &str, config: Option<&Path>) -> Result<()> {
    let graph = load_graph(xml_dir, config)?;
    let id = graph
        .lookup(refid)
        .ok_or_else(|| eyre!("refid '{refid}' not found in the graph"))?;
    let entity = graph.entity(id);

    let suffix = graph.overload_suffix(id);
    if suffix.is_empty() {
        println!("# {}", graph.name_long(id));
    } else {
        println!("# {} {suffix}", graph.name_long(id));
    }
    println!();
    println!("<{}>", graph.url(id));

    let brief = graph.brief(id);
    if !brief.is_empty() {
        println!("\n{brief}");
    }

    if entity.kind.is_language() && !entity.kind.is_parent() {
        println!("\n{}", graph.codeblock(id));
    }

    let details = graph.details(id);
    if !details.is_empty() {
        println!("\n{}", details.trim_end());
    }

    let listing = graph.listing(id);
    if !listing.is_empty() {
        println!("\n{}", listing.trim_end());
    }

    Ok(())
}
