//! Pre-push policy gate CLI.
//!
//! Installed as a git `pre-push` hook (`pushgate check`), it reads the
//! `.skl/` project state, runs the scope checks and gates, and appends one
//! proposal per modified file to the knowledge store. Exit status follows
//! [`pushgate::exit_codes`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use pushgate::check::run_check;
use pushgate::classify::classify_files;
use pushgate::exit_codes;
use pushgate::io::git::Git;
use pushgate::io::layout::{SklPaths, find_repo_root};
use pushgate::logging;

const AGENT_ENV: &str = "SKL_AGENT_ID";

#[derive(Parser)]
#[command(
    name = "pushgate",
    version,
    about = "Pre-push policy gate for multi-agent repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run scope checks and gates, then queue one proposal per modified file.
    Check {
        /// Repository root (default: nearest ancestor containing `.git`).
        #[arg(long)]
        repo: Option<PathBuf>,
        /// Agent identity (default: `SKL_AGENT_ID`).
        #[arg(long)]
        agent: Option<String>,
    },
    /// Print the tree-differ classification of two versions of a file as JSON.
    Classify {
        /// Base version; omit for a newly created file.
        #[arg(long)]
        base: Option<PathBuf>,
        /// Head version.
        #[arg(long)]
        head: PathBuf,
        /// Repo path used to pick the language (default: the head file name).
        #[arg(long)]
        path: Option<String>,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pushgate: {:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Check { repo, agent } => cmd_check(repo, agent),
        Command::Classify { base, head, path } => cmd_classify(base, head, path),
    }
}

fn cmd_check(repo: Option<PathBuf>, agent: Option<String>) -> Result<i32> {
    let root = match repo {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().context("resolve current directory")?;
            find_repo_root(&cwd)?
        }
    };
    let agent = agent
        .or_else(|| std::env::var(AGENT_ENV).ok())
        .unwrap_or_default();
    let paths = SklPaths::new(&root);
    let git = Git::new(&root);
    let outcome = run_check(&paths, &agent, &git, Utc::now())?;
    for line in outcome.report_lines() {
        println!("{line}");
    }
    if outcome.is_blocked() {
        return Ok(exit_codes::BLOCKED);
    }
    Ok(exit_codes::OK)
}

fn cmd_classify(base: Option<PathBuf>, head: PathBuf, path: Option<String>) -> Result<i32> {
    let result = classify_files(base.as_deref(), &head, path.as_deref())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("serialize classification")?
    );
    Ok(exit_codes::OK)
}
