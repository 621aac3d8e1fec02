use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anstream::{eprintln, println};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fs_err::File;
use itertools::Itertools;
use owo_colors::OwoColorize;
use petgraph::dot::{Config as DotConfig, Dot};

use spool_configuration::{FilesystemOptions, Options, ResolverSettings, UpgradeStrategy};
use spool_resolver::{Manifest, Resolver};
use spool_types::{IndexSnapshot, Interpreter};

#[derive(ValueEnum, Default, Clone)]
pub(crate) enum ResolveCliFormat {
    /// All packages to install on a single line.
    #[default]
    Compact,
    /// One package per line, with its source.
    Expanded,
}

#[derive(Parser)]
pub(crate) struct ResolveCliArgs {
    /// PEP 508 requirements to resolve.
    #[arg(required = true)]
    requirements: Vec<String>,
    /// Constrain versions using the given requirements, without installing them.
    #[arg(long, short)]
    constraint: Vec<String>,
    /// The JSON snapshot providing the index, file metadata and installed environment.
    #[arg(long)]
    index: PathBuf,
    /// Read settings from this `spool.toml` instead of searching the working directory.
    #[arg(long)]
    config_file: Option<PathBuf>,
    #[arg(long, value_enum)]
    upgrade_strategy: Option<UpgradeStrategy>,
    /// Reinstall all packages, regardless of whether they're already installed.
    #[arg(long)]
    reinstall: bool,
    /// Ignore the installed environment of the snapshot.
    #[arg(long)]
    ignore_installed: bool,
    #[arg(long)]
    ignore_requires_python: bool,
    /// Only resolve the given requirements, without their dependencies.
    #[arg(long)]
    no_deps: bool,
    /// The Python version to resolve for.
    #[arg(long, default_value = "3.12.0")]
    python_version: String,
    /// Write the dependency graph in DOT format for graphviz to this file.
    #[arg(long)]
    graphviz: Option<PathBuf>,
    #[arg(long, default_value = "compact")]
    format: ResolveCliFormat,
}

impl ResolveCliArgs {
    /// The options given on the command line, which take precedence over `spool.toml`.
    fn options(&self) -> Options {
        Options {
            upgrade_strategy: self.upgrade_strategy,
            reinstall: self.reinstall.then_some(true),
            reinstall_package: None,
            ignore_installed: self.ignore_installed.then_some(true),
            ignore_requires_python: self.ignore_requires_python.then_some(true),
            no_deps: self.no_deps.then_some(true),
            max_rounds: None,
        }
    }
}

pub(crate) fn resolve_cli(args: ResolveCliArgs) -> Result<()> {
    let filesystem = match &args.config_file {
        Some(path) => Some(FilesystemOptions::from_file(path)?),
        None => FilesystemOptions::find(&std::env::current_dir()?)?,
    };
    let options = match filesystem {
        Some(filesystem) => args.options().combine(filesystem.into_options()),
        None => args.options(),
    };
    let settings = ResolverSettings::from_options(options);

    let snapshot = IndexSnapshot::from_path(&args.index)?;
    let interpreter = Interpreter::artificial(&args.python_version)
        .with_context(|| format!("Invalid Python version: `{}`", args.python_version))?;
    let manifest = Manifest::from_strings(args.requirements.as_slice(), args.constraint.as_slice())?;

    let resolver = Resolver::new(&settings, &interpreter, &snapshot, &snapshot, &snapshot);
    let requirement_set = resolver.resolve(&manifest, true).with_context(|| {
        format!(
            "No solution found when resolving: {}",
            args.requirements.iter().join(", "),
        )
    })?;

    for diagnostic in requirement_set.diagnostics() {
        eprintln!("{}: {diagnostic}", "warning".yellow().bold());
    }

    if let Some(graphviz) = &args.graphviz {
        let mut writer = BufWriter::new(File::create(graphviz)?);
        let graphviz = Dot::with_attr_getters(
            requirement_set.graph(),
            &[DotConfig::NodeNoLabel, DotConfig::EdgeNoLabel],
            &|_graph, _edge_ref| String::new(),
            &|_graph, (_node_index, node)| format!("label={:?}", node.to_string()),
        );
        write!(&mut writer, "{graphviz:?}")?;
    }

    let order = resolver.installation_order(&requirement_set);
    match args.format {
        ResolveCliFormat::Compact => {
            println!("{}", order.iter().map(ToString::to_string).join(" "));
        }
        ResolveCliFormat::Expanded => {
            for request in order {
                let marker = if request.should_reinstall {
                    " (reinstall)"
                } else {
                    ""
                };
                println!("{request} from {}{marker}", request.link);
            }
        }
    }

    Ok(())
}
