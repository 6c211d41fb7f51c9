// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use feedvault_runtime::cli;
use feedvault_runtime::config::{ConfigOverrides, RuntimeConfig};

#[derive(Parser)]
#[command(
    name = "feedvault",
    about = "Feedvault: resolve a profile's posts to direct media links",
    version,
    after_help = "Run 'feedvault <command> --help' for details on each command."
)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Media database path (overrides FEEDVAULT_DB)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (overrides FEEDVAULT_HTTP_PORT)
        #[arg(long)]
        http_port: Option<u16>,
        /// Posts file used by triggers without a body
        #[arg(long)]
        posts: Option<String>,
    },
    /// Resolve the posts file now and store the result
    Harvest {
        /// Posts file (overrides FEEDVAULT_POSTS)
        #[arg(long)]
        posts: Option<String>,
    },
    /// Print the stored media set
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download every stored media file
    Download {
        /// Output directory
        #[arg(long, default_value = "contents")]
        out: PathBuf,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let mut overrides = ConfigOverrides {
        db: cli.db,
        ..Default::default()
    };

    let result = match cli.command {
        Commands::Serve { http_port, posts } => {
            overrides.http_port = http_port;
            overrides.posts = posts;
            cli::serve::run(&RuntimeConfig::resolve(&overrides)).await
        }
        Commands::Harvest { posts } => {
            overrides.posts = posts;
            cli::harvest_cmd::run(&RuntimeConfig::resolve(&overrides)).await
        }
        Commands::List { json } => {
            cli::list_cmd::run(&RuntimeConfig::resolve(&overrides), json).await
        }
        Commands::Download { out } => {
            cli::download_cmd::run(&RuntimeConfig::resolve(&overrides), &out).await
        }
        Commands::Doctor => cli::doctor::run(&RuntimeConfig::resolve(&overrides)).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "feedvault", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
    result
}
