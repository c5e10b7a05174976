// Compiler server CLI
//
// Command-line entrypoint for the always-compiled daemon: loads a project,
// runs discovery once, then (unless `--once`) watches for edits and serves
// the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::RwLock;

use warp_server::state::ProjectState;
use warp_server::{compiler, server, watcher};

#[derive(Parser)]
#[command(name = "warp-server")]
#[command(about = "Warp compiler server - always-on incremental daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(default_value = ".")]
    project: PathBuf,

    /// HTTP port
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Exit after the first discovery pass (for CI/scripts)
    #[arg(long)]
    once: bool,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_root = cli.project.canonicalize().unwrap_or(cli.project.clone());

    println!("Warp compiler server");
    println!("  Project: {}", project_root.display());
    println!();

    let state = Arc::new(RwLock::new(ProjectState::new(project_root.clone())));

    println!("Running discovery...");
    let build_result = {
        let mut state = state.write().await;
        compiler::full_build(&mut state)?
    };

    println!(
        "Discovery completed in {:?}: {} resource(s), {} error(s)",
        build_result.duration, build_result.resources_found, build_result.error_count
    );

    if cli.once {
        std::process::exit(if build_result.error_count > 0 { 1 } else { 0 });
    }

    let watcher_state = state.clone();
    let watcher_root = project_root.clone();
    actix_rt::spawn(async move {
        if let Err(e) = watcher::run_watcher(watcher_state, watcher_root).await {
            eprintln!("File watcher error: {}", e);
        }
    });

    println!();
    println!("Server listening on http://localhost:{}", cli.port);
    server::run_server(state, cli.port)?.await?;

    Ok(())
}
