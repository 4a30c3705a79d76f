//! Prints the branches, status and recent history of a lineage's worktree.
//!
//! Usage: `tandem-inspect <workspace> <root> <repo> [branch]`
//!
//! Never takes the worktree lock, so it only reads. Status is reported for
//! the checked-out branch alone.

use anyhow::{Context, bail};

use tandem_core::{ResourceId, WorkspaceId};
use tandem_git::{BlockingPool, GitExecutor, WorktreeLayout};
use tandem_service::{Settings, metrics, telemetry};

const HISTORY_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing().context("Failed to initialize tracing")?;
    metrics::register_metrics();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 || args.len() > 4 {
        bail!("usage: tandem-inspect <workspace> <root> <repo> [branch]");
    }

    let settings = Settings::load().context("Failed to load settings")?;
    let layout = WorktreeLayout::new(settings.worktree_root());
    let path = layout.path(
        &WorkspaceId::new(&args[0]),
        &ResourceId::new(&args[1]),
        &args[2],
    )?;
    if !path.join(".git").exists() {
        bail!("no worktree at {}", path.display());
    }

    let executor = GitExecutor::new(
        BlockingPool::new(settings.max_blocking_operations()),
        settings.merge_author(),
    );

    let branch = match args.get(3) {
        Some(branch) => branch.clone(),
        None => executor
            .current_branch(&path)
            .await?
            .context("HEAD is detached, pass a branch")?,
    };

    println!("Worktree: {}", path.display());
    println!("Branches:");
    for name in executor.list_branches(&path).await? {
        let marker = if name == branch { "*" } else { " " };
        println!("  {} {}", marker, name);
    }

    // read-only: a running service may hold this worktree
    let status = executor
        .inspect_status(&path, &branch)
        .await
        .with_context(|| format!("Cannot report status of {}", branch))?;
    println!("Status of {}:", branch);
    println!("{}", serde_json::to_string_pretty(&status)?);

    println!("History of {}:", branch);
    for record in executor
        .commit_history(&path, &branch)
        .await?
        .iter()
        .take(HISTORY_LIMIT)
    {
        println!("  {}", record);
    }

    Ok(())
}
