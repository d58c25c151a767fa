// src/main.rs
// =============================================================================
// Entry point of the brm-walk CLI.
//
// What happens here:
// 1. Parse command-line arguments (flags or BRM_* environment variables)
// 2. Set up logging
// 3. Load the repository catalog, then walk or list it
// 4. Exit with a code that tells CI what happened:
//    0 = complete snapshot, 1 = snapshot has failed nodes, 2 = fatal error
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use brm_walk::catalog::{self, Repository};
use brm_walk::client::BrmClient;
use brm_walk::logging::init_logging;
use brm_walk::snapshot::{write_snapshot, Snapshot};
use brm_walk::walk::walk_catalog;
use clap::Parser;
use cli::{Cli, Commands, ServerArgs, WalkArgs};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Repositories { server, json } => handle_repositories(&server, json).await,
        Commands::Walk {
            server,
            walk,
            out_dir,
            json,
        } => handle_walk(&server, &walk, &out_dir, json).await,
    }
}

// Handles the 'repositories' subcommand
async fn handle_repositories(server: &ServerArgs, json: bool) -> Result<i32> {
    let config = server.to_config();
    let client = BrmClient::new(&config).context("Cannot create repository client")?;

    let repositories = catalog::load(&client, &config)
        .await
        .context("Cannot load repository catalog")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&repositories)?);
    } else {
        print_table(&repositories);
    }
    Ok(0)
}

// Handles the 'walk' subcommand
//
// Ctrl-C cancels the catalog load or the walk; nothing is written for a
// cancelled run.
async fn handle_walk(server: &ServerArgs, walk: &WalkArgs, out_dir: &Path, json: bool) -> Result<i32> {
    let mut config = server.to_config();
    walk.apply(&mut config);
    let client = BrmClient::new(&config).context("Cannot create repository client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling walk");
            on_interrupt.cancel();
        }
    });

    let repositories = catalog::load_cancellable(&client, &config, &cancel)
        .await
        .context("Cannot load repository catalog")?;

    let tree = walk_catalog(&client, &config, &repositories, cancel)
        .await
        .context("Walk aborted")?;

    let snapshot = Snapshot::new(&config.base_url(), repositories, tree);
    let stats = snapshot.stats;
    info!(
        walked = stats.walked(),
        failed = stats.failed,
        directories = stats.directories,
        leaves = stats.leaves,
        "Walk finished"
    );

    emit_snapshot(&mut std::io::stdout().lock(), &snapshot, out_dir, json)?;

    Ok(if stats.failed > 0 { 1 } else { 0 })
}

// Writes the run's result to `out`
//
// With --json, `out` receives the snapshot document and nothing else, so it
// can be piped into a JSON tool; the counts go to stderr instead.
fn emit_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot, out_dir: &Path, json: bool) -> Result<()> {
    let stats = snapshot.stats;

    if json {
        serde_json::to_writer_pretty(&mut *out, snapshot)?;
        writeln!(out)?;
        eprintln!("Nodes walked: {}", stats.walked());
        eprintln!("Nodes failed: {}", stats.failed);
        return Ok(());
    }

    let path = write_snapshot(out_dir, snapshot)
        .with_context(|| format!("Cannot write snapshot to {}", out_dir.display()))?;
    writeln!(out, "Snapshot: {}", path.display())?;
    writeln!(out, "Nodes walked: {}", stats.walked())?;
    writeln!(out, "Nodes failed: {}", stats.failed)?;
    Ok(())
}

// Prints the catalog as a human-readable table
fn print_table(repositories: &BTreeMap<String, Repository>) {
    println!("{:<30} {:<10} {:<12} {:<60}", "KEY", "TYPE", "PACKAGE", "URL");
    println!("{}", "=".repeat(112));

    for repository in repositories.values() {
        let url = repository.url.as_deref().unwrap_or("(no url, will be skipped)");
        println!(
            "{:<30} {:<10} {:<12} {:<60}",
            repository.key,
            repository.repo_type,
            repository.package_type.as_deref().unwrap_or("-"),
            url
        );
    }

    println!();
    println!("Total: {}", repositories.len());
}
