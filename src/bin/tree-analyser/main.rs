//! tree-analyser - Inspect BSP tree and scene files of the fixed-point ray tracer.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tree_analyser::prelude::*;

/// Overrides the filter picked from -v/-q, e.g. `tree_analyser=trace`.
const LOG_ENV: &str = "TREE_ANALYSER_LOG";
/// Set to 1 to write a Chrome trace (`chrome-trace` feature).
#[cfg(feature = "chrome-trace")]
const TRACE_ENV: &str = "TREE_ANALYSER_TRACE";

#[cfg(feature = "chrome-trace")]
type TraceGuard = tracing_chrome::FlushGuard;
#[cfg(not(feature = "chrome-trace"))]
type TraceGuard = ();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

fn init_tracing(verbosity: Verbosity) -> Option<TraceGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry().with(filter).with(fmt);

    #[cfg(feature = "chrome-trace")]
    {
        if env::var(TRACE_ENV).ok().as_deref() == Some("1") {
            let (chrome, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file("trace.json")
                .build();
            return registry.with(chrome).try_init().ok().map(|_| guard);
        }
    }

    let _ = registry.try_init();
    None
}

/// Parsed command line: global flags pulled out, the rest kept in order.
struct Args {
    verbosity: Verbosity,
    config: Option<PathBuf>,
    json: bool,
    positional: Vec<String>,
    scenes: Vec<PathBuf>,
    wireframe: Option<PathBuf>,
}

impl Args {
    fn parse(raw: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut args = Args {
            verbosity: Verbosity::Info,
            config: None,
            json: false,
            positional: Vec::new(),
            scenes: Vec::new(),
            wireframe: None,
        };
        let mut it = raw.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-v" | "--verbose" => args.verbosity = Verbosity::Debug,
                "-vv" | "--trace" => args.verbosity = Verbosity::Trace,
                "-q" | "--quiet" => args.verbosity = Verbosity::Quiet,
                "-j" | "--json" => args.json = true,
                "-c" | "--config" => args.config = Some(value(&mut it, &arg)?.into()),
                "-s" | "--scene" => args.scenes.push(value(&mut it, &arg)?.into()),
                "-w" | "--wireframe" => args.wireframe = Some(value(&mut it, &arg)?.into()),
                _ => args.positional.push(arg),
            }
        }
        Ok(args)
    }

    fn tree_path(&self, usage: &str) -> anyhow::Result<&Path> {
        match self.positional.get(1) {
            Some(p) => Ok(Path::new(p)),
            None => bail!("missing tree file argument\nUsage: {usage}"),
        }
    }
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    it.next().with_context(|| format!("{flag} expects a value"))
}

fn main() {
    let args = match Args::parse(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };
    let _guard = init_tracing(args.verbosity);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let Some(command) = args.positional.first() else {
        print_help();
        return Ok(());
    };

    let options = match &args.config {
        Some(path) => LoadOptions::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LoadOptions::default(),
    };
    debug!(?options, "load options");

    match command.as_str() {
        "info" | "i" => cmd_info(args.tree_path("tree-analyser info <tree> [--scene <scene>]...")?, args, &options),
        "stats" | "s" => cmd_stats(args.tree_path("tree-analyser stats <tree> [--json]")?, args, &options),
        "boxes" | "b" => cmd_boxes(args.tree_path("tree-analyser boxes <tree> [--json] [--wireframe <out>]")?, args, &options),
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            print_help();
            bail!("unknown command: {other}")
        }
    }
}

fn print_version() {
    println!(
        "tree-analyser {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("TREE_ANALYSER_BUILD_DATE"),
        env!("TREE_ANALYSER_BUILD_TIME")
    );
}

fn print_help() {
    print_version();
    println!();
    println!("USAGE:");
    println!("    tree-analyser [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <tree> [-s <scene>]...   Tree header, bounds and loaded scene tables");
    println!("    s, stats  <tree>                   Depth histogram and primitive counts");
    println!("    b, boxes  <tree> [-w <out>]        Split planes and child boxes, optional line list");
    println!("    version                            Show version and build date");
    println!("    h, help                            Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Only show errors");
    println!("    -j, --json           Print results as JSON");
    println!("    -c, --config <file>  Load options from a JSON file");
    println!();
    println!("ENVIRONMENT:");
    println!("    {LOG_ENV}    Log filter, overrides -v/-q");
    #[cfg(feature = "chrome-trace")]
    println!("    {TRACE_ENV}  Set to 1 to write trace.json");
}

fn open_tree(path: &Path, options: &LoadOptions) -> anyhow::Result<TreeStore> {
    info!("Opening tree: {}", path.display());
    Ok(load_tree(path, options)?)
}

fn cmd_info(path: &Path, args: &Args, options: &LoadOptions) -> anyhow::Result<()> {
    let tree = open_tree(path, options)?;

    let mut db = GeometryDatabase::new(options.capacities);
    let mut scenes = Vec::new();
    for scene in &args.scenes {
        info!("Loading scene: {}", scene.display());
        scenes.push(load_scene(scene, &mut db, options)?);
    }

    let header = tree.header();
    let bounds = tree.bounds();
    if args.json {
        let out = json!({
            "tree": path,
            "header": header,
            "bounds": bounds,
            "scenes": scenes,
            "database": {
                "triangles": db.num_triangles(),
                "materials": db.num_materials(),
                "texture_slots": db.num_textures(),
                "textures_loaded": db.num_loaded_textures(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Tree: {}", path.display());
    println!("Bounds: min {} max {}", bounds.min(), bounds.max());
    println!();
    println!("Header:");
    println!("  Matrix rows:  {}", header.tree_matrix_count);
    println!("  Tree list:    {}", header.tree_list_count);
    println!("  Split list:   {} (top {})", header.split_list_count, header.split_list_top);
    println!("  Node list:    {}", header.node_list_count);

    for (scene, summary) in args.scenes.iter().zip(&scenes) {
        println!();
        println!("Scene: {}", scene.display());
        println!("  Textures:  {} ({} loaded)", summary.texture_slots, summary.textures_loaded);
        println!("  Materials: {}", summary.materials);
        println!("  Triangles: {} in {} batches", summary.triangles, summary.batches);
    }
    if !scenes.is_empty() {
        println!();
        println!(
            "Database: {} triangles, {} materials, {} textures",
            db.num_triangles(),
            db.num_materials(),
            db.num_textures()
        );
    }
    Ok(())
}

fn cmd_stats(path: &Path, args: &Args, options: &LoadOptions) -> anyhow::Result<()> {
    let tree = open_tree(path, options)?;
    let view = TreeView::with_options(&tree, options);

    let histogram = view.depth_histogram()?;
    let counts = view.primitive_counts()?;
    let summary = view.summary()?;

    if args.json {
        let out = json!({
            "tree": path,
            "depth_histogram": histogram,
            "primitives": counts.root(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Tree: {}", path.display());
    println!(
        "Nodes: {} ({} internal, {} leaves)",
        summary.nodes, summary.internal, summary.leaves
    );
    println!("Leaf entries: {}", counts.root());
    println!(
        "Entries per leaf: min {} max {} mean {:.2}",
        summary.smallest_leaf, summary.largest_leaf, summary.mean_leaf_entries
    );
    println!();
    println!("Depth histogram:");
    let widest = histogram.max_width().max(1);
    for (depth, &n) in histogram.counts().iter().enumerate() {
        let bar = "#".repeat((n * 40).div_ceil(widest));
        println!("  {:>3} {:>8}  {}", depth, n, bar);
    }
    Ok(())
}

fn cmd_boxes(path: &Path, args: &Args, options: &LoadOptions) -> anyhow::Result<()> {
    let tree = open_tree(path, options)?;
    let view = TreeView::with_options(&tree, options);

    if let Some(out) = &args.wireframe {
        let mut wire = WireframeBuilder::new();
        view.feed(&mut wire)?;
        std::fs::write(out, wire.as_bytes()).with_context(|| format!("writing {}", out.display()))?;
        info!("Wrote {} line vertices to {}", wire.vertices().len(), out.display());
    }

    if args.json {
        let mut rows = Vec::new();
        for split in view.splits() {
            let s = split?;
            rows.push(json!({
                "node": s.node,
                "depth": s.depth,
                "axis": s.axis,
                "position": s.position,
                "bounds": s.bounds,
                "left": s.left,
                "right": s.right,
            }));
        }
        let out = json!({ "bounds": view.bounds(), "splits": rows });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let bounds = view.bounds();
    println!("Root: min {} max {}", bounds.min(), bounds.max());
    for split in view.splits() {
        let s = split?;
        let indent = "  ".repeat(s.depth + 1);
        println!(
            "{}node {} split {} = {} -> {} [{} .. {}] | {} [{} .. {}]",
            indent,
            s.node,
            s.axis,
            s.position,
            s.left_child,
            s.left.min(),
            s.left.max(),
            s.right_child,
            s.right.min(),
            s.right.max()
        );
    }
    Ok(())
}
