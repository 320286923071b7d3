//! Command implementations for distlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Commands print their result to stdout; errors bubble up
//! to `main`, which maps them to exit codes.

use crate::cli::{AcquireArgs, Command, ListArgs, NameArgs, TokenArgs};
use distlock::error::{DistlockError, Result};
use distlock::record::{LockState, format_duration};
use distlock::{LockManager, Token};
use globset::{Glob, GlobMatcher};

/// Dispatch a command to its implementation.
pub fn dispatch(manager: &LockManager, command: Command) -> Result<()> {
    match command {
        Command::Acquire(args) => cmd_acquire(manager, args),
        Command::TryAcquire(args) => cmd_try_acquire(manager, args),
        Command::Extend(args) => cmd_extend(manager, args),
        Command::Release(args) => cmd_release(manager, args),
        Command::Vacuum => cmd_vacuum(manager),
        Command::List(args) => cmd_list(manager, args),
    }
}

fn cmd_acquire(manager: &LockManager, args: AcquireArgs) -> Result<()> {
    let timeout = args.timeout.map(|t| t.as_duration());
    let token = manager.acquire(&args.name, timeout)?;
    println!("{}", token);
    Ok(())
}

fn cmd_try_acquire(manager: &LockManager, args: NameArgs) -> Result<()> {
    match manager.try_acquiring(&args.name)? {
        Some(token) => {
            println!("{}", token);
            Ok(())
        }
        None => Err(DistlockError::CouldNotAcquireLock(args.name)),
    }
}

fn cmd_extend(manager: &LockManager, args: TokenArgs) -> Result<()> {
    let token: Token = args.token.parse()?;
    manager.extend(&args.name, &token)?;
    println!("Extended '{}' by {}.", args.name, manager.config().maxtime);
    Ok(())
}

fn cmd_release(manager: &LockManager, args: TokenArgs) -> Result<()> {
    let token: Token = args.token.parse()?;
    manager.release(&args.name, &token)?;
    println!("Released '{}'.", args.name);
    Ok(())
}

fn cmd_vacuum(manager: &LockManager) -> Result<()> {
    let removed = manager.vacuum()?;
    println!("Removed {} lock record(s).", removed);
    Ok(())
}

fn cmd_list(manager: &LockManager, args: ListArgs) -> Result<()> {
    let matcher = args.pattern.as_deref().map(build_matcher).transpose()?;
    let now = manager.now();

    let records: Vec<_> = manager
        .records()?
        .into_iter()
        .filter(|r| matcher.as_ref().is_none_or(|m| m.is_match(&r.name)))
        .collect();

    if records.is_empty() {
        println!("No lock records.");
        return Ok(());
    }

    println!("Lock records ({}):", records.len());
    println!();

    for record in &records {
        let state = record.state(now);
        println!("  {} ({}):", record.name, state.as_str());
        if let Some(owner) = &record.owner {
            println!("    Owner:      {}", owner);
        }
        if let Some(acquired_at) = record.acquired_at {
            println!("    Acquired:   {}", acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("    Age:        {}", record.age_string(now));
        }
        if state != LockState::Unlocked {
            println!("    Holds:      {}", record.hold_count);
        }
        match (state, record.expires_at) {
            (LockState::Live, Some(expires_at)) => println!(
                "    Expires:    {} (in {})",
                expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
                format_duration(expires_at - now)
            ),
            (LockState::Expired, Some(expires_at)) => println!(
                "    Expired:    {} ago",
                format_duration(now - expires_at)
            ),
            _ => {}
        }
        println!();
    }

    let reclaimable = records.iter().filter(|r| !r.is_live(now)).count();
    if reclaimable > 0 {
        println!(
            "Note: {} record(s) are expired or released. Use `distlock vacuum` to remove them.",
            reclaimable
        );
    }

    Ok(())
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| DistlockError::Config(format!("invalid pattern '{}': {}", pattern, e)))
}
