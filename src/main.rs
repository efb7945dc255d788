//! Variant Config CLI
//!
//! Entry point for the `variant-config` command-line tool.

use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use variant_config::overrides::LayeredOverrides;
use variant_config::packaging::walk_resources;
use variant_config::{BuildDescriptor, EnvOverrides, MapOverrides, Resolver};

#[derive(Parser)]
#[command(name = "variant-config")]
#[command(about = "Resolve build variants and filter packaged resources", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Descriptor file; repeat to layer overlays (default: built-in descriptor)
    #[arg(long, short = 'd')]
    descriptor: Vec<PathBuf>,

    /// Override value as KEY=VALUE; takes precedence over the environment
    #[arg(long = "define", short = 'D')]
    defines: Vec<String>,

    /// Prefix for environment variable lookups
    #[arg(long)]
    env_prefix: Option<String>,

    /// Do not read overrides from the environment
    #[arg(long)]
    no_env: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a variant and print its configuration
    Resolve {
        /// Variant name (e.g. debug, release)
        variant: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        /// Write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the resource paths a variant keeps in its package
    Filter {
        /// Variant name (e.g. debug, release)
        variant: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Resource tree to enumerate instead of reading paths
        #[arg(long, short = 'r')]
        root: Option<PathBuf>,

        /// Print the excluded paths instead of the retained ones
        #[arg(long)]
        show_excluded: bool,

        /// Candidate paths (read from stdin when empty and no --root)
        paths: Vec<String>,
    },

    /// List the variants of a descriptor
    Variants {
        /// Descriptor file; repeat to layer overlays (default: built-in descriptor)
        #[arg(long, short = 'd')]
        descriptor: Vec<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            variant,
            source,
            human,
            output,
        } => run_resolve(&variant, source, human, output),
        Commands::Filter {
            variant,
            source,
            root,
            show_excluded,
            paths,
        } => run_filter(&variant, source, root, show_excluded, paths),
        Commands::Variants { descriptor } => run_variants(descriptor),
    }
}

fn load_descriptor(paths: &[PathBuf]) -> BuildDescriptor {
    let descriptor = if paths.is_empty() {
        BuildDescriptor::builtin()
    } else {
        BuildDescriptor::load_layers(paths)
    };

    match descriptor {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error loading descriptor: {}", e);
            process::exit(1);
        }
    }
}

fn build_resolver(args: SourceArgs) -> Resolver<LayeredOverrides> {
    let descriptor = load_descriptor(&args.descriptor);

    let defines = match MapOverrides::from_defines(&args.defines) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut source = LayeredOverrides::new().then(defines);
    if !args.no_env {
        source = match args.env_prefix {
            Some(prefix) => source.then(EnvOverrides::with_prefix(prefix)),
            None => source.then(EnvOverrides::new()),
        };
    }

    match Resolver::from_descriptor(descriptor, source) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error loading descriptor: {}", e);
            process::exit(1);
        }
    }
}

fn run_resolve(variant: &str, source: SourceArgs, human: bool, output: Option<PathBuf>) {
    let resolver = build_resolver(source);

    let config = match resolver.resolve(variant) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Resolution failed: {}", e);
            process::exit(1);
        }
    };

    if let Some(path) = output {
        if let Err(e) = config.write_to_file(&path) {
            eprintln!("Error writing {}: {}", path.display(), e);
            process::exit(1);
        }
        eprintln!("Wrote: {}", path.display());
    }

    if human {
        print!("{}", config.to_human());
    } else {
        match config.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_filter(
    variant: &str,
    source: SourceArgs,
    root: Option<PathBuf>,
    show_excluded: bool,
    paths: Vec<String>,
) {
    let resolver = build_resolver(source);

    let config = match resolver.resolve(variant) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Resolution failed: {}", e);
            process::exit(1);
        }
    };

    let candidates = match (root, paths.is_empty()) {
        (Some(root), _) => match walk_resources(&root) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error reading {}: {}", root.display(), e);
                process::exit(1);
            }
        },
        (None, false) => paths,
        (None, true) => read_stdin_paths(),
    };

    let rules = match config.packaging_rules() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let (retained, excluded) = rules.partition(&candidates);
    let selected = if show_excluded { excluded } else { retained };
    for path in selected {
        println!("{}", path);
    }
}

fn read_stdin_paths() -> Vec<String> {
    let stdin = io::stdin();
    let mut paths = Vec::new();
    for line in stdin.lock().lines() {
        match line {
            Ok(l) => {
                let trimmed = l.trim();
                if !trimmed.is_empty() {
                    paths.push(trimmed.to_string());
                }
            }
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                process::exit(1);
            }
        }
    }
    paths
}

fn run_variants(descriptor_paths: Vec<PathBuf>) {
    let descriptor = load_descriptor(&descriptor_paths);

    if descriptor.variants.is_empty() {
        println!("No variants declared.");
        return;
    }

    println!("Variants ({} total):\n", descriptor.variants.len());
    for (name, fragment) in &descriptor.variants {
        println!("  {}", name);
        for (attribute, value) in &fragment.attributes {
            println!("    {} = {}", attribute, value);
        }
        if !fragment.excludes.is_empty() {
            println!("    excludes: {}", fragment.excludes.len());
        }
        if !fragment.proguard_files.is_empty() {
            println!("    proguard files: {}", fragment.proguard_files.join(", "));
        }
    }
}
