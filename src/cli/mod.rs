//! CLI argument parsing for distlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use distlock::config::Interval;
use std::path::PathBuf;

/// distlock: distributed, reentrant locks over a shared store.
///
/// Every acquisition prints a token. Pass that token to `extend` and
/// `release`, from this shell or from any other process sharing the store.
#[derive(Parser, Debug)]
#[command(name = "distlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the YAML config file (optional; defaults apply if missing).
    #[arg(short, long, global = true, default_value = "distlock.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for distlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire a lock, waiting while it is held.
    ///
    /// Prints the token of the new acquisition.
    Acquire(AcquireArgs),

    /// Acquire a lock only if it is free right now.
    ///
    /// Prints the token, or exits with code 3 if the lock is held.
    TryAcquire(NameArgs),

    /// Renew a held lock for another `maxtime`.
    Extend(TokenArgs),

    /// Release a held lock.
    Release(TokenArgs),

    /// Delete expired and released lock records.
    Vacuum,

    /// List lock records with their state.
    List(ListArgs),
}

/// Arguments for the `acquire` command.
#[derive(Parser, Debug)]
pub struct AcquireArgs {
    /// Lock name.
    pub name: String,

    /// How long to wait for a held lock (e.g., 500ms, 10s, 1m).
    ///
    /// Defaults to the configured `acquire_timeout`.
    #[arg(short, long, value_parser = parse_interval)]
    pub timeout: Option<Interval>,
}

/// Arguments naming a single lock.
#[derive(Parser, Debug)]
pub struct NameArgs {
    /// Lock name.
    pub name: String,
}

/// Arguments naming a lock and the token that holds it.
#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Lock name.
    pub name: String,

    /// Token printed by `acquire` / `try-acquire`.
    pub token: String,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show locks whose name matches this glob (e.g., "doc*").
    #[arg(short, long)]
    pub pattern: Option<String>,
}

fn parse_interval(s: &str) -> Result<Interval, String> {
    Interval::parse(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
