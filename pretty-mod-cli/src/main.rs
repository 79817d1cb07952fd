//! pretty-mod - explore Python module trees and signatures

#![warn(missing_docs)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use pretty_mod_modules::{ErrorKind, ModuleError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod display;
mod format;

use commands::{sig, tree, Session};
use format::OutputFormat;

#[derive(Parser)]
#[command(name = "pretty-mod")]
#[command(about = "Explore Python module trees and function signatures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Python interpreter used for sys.path and introspection
    #[arg(long, global = true)]
    python: Option<String>,

    /// Only use packages that are already cached
    #[arg(long, global = true)]
    offline: bool,

    /// Directory for downloaded packages
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Package index JSON API base URL
    #[arg(long, global = true)]
    index_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the module tree of a package
    Tree {
        /// Module to explore (`json`, `requests@2.31.0`, `pillow::PIL`)
        module: String,

        /// Levels of submodules to descend into
        #[arg(short, long, default_value = "2")]
        depth: usize,

        /// Suppress warnings
        #[arg(short, long)]
        quiet: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Display the signature of a callable
    Sig {
        /// Import path of the callable (`json:loads`, `os.path.join`)
        import_path: String,

        /// Suppress warnings
        #[arg(short, long)]
        quiet: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let module_error = e.downcast_ref::<ModuleError>();
            if let Some(advice) = module_error.and_then(|err| err.advice()) {
                eprintln!("  {} {}", "hint:".yellow(), advice);
            }
            match module_error.map(|err| err.kind()) {
                Some(ErrorKind::Syntax) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PRETTY_MOD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = config::load_config(cli.config)?;
    config.apply_env();

    if let Some(python) = cli.python {
        config.modules.python = python;
    }
    if cli.offline {
        config.package.offline = true;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.package.cache_dir = cache_dir;
    }
    if let Some(index_url) = cli.index_url {
        config.package.index_url = index_url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Tree {
            module,
            depth,
            quiet,
            format,
        } => {
            let session = Session::new(config, quiet)?;
            tree::run(&session, &module, depth, format)
        }
        Commands::Sig {
            import_path,
            quiet,
            format,
        } => {
            let session = Session::new(config, quiet)?;
            sig::run(&session, &import_path, format)
        }
    }
}
