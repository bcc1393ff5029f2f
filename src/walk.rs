//! Concurrent directory walk built on [`Dispatcher`].
//!
//! Each directory read is one item; its entries are fed back into the same
//! backlog, so the walk fans out as far as the concurrency cap allows.

use crate::context::Context;
use crate::dispatcher::{Dispatcher, Options};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Concurrency cap; 0 means unbounded.
    pub limit: usize,
    /// Entries deeper than this are not visited. The root is depth 0.
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkSummary {
    pub root: PathBuf,
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    depth: usize,
}

#[derive(Debug, Default)]
struct Tally {
    dirs: AtomicU64,
    files: AtomicU64,
    bytes: AtomicU64,
}

/// Walk `root`, counting directories, regular files and file bytes.
///
/// Symlinks are counted as files and never followed. The first I/O error
/// ends the walk.
pub fn walk(root: &Path, context: Context, options: &WalkOptions) -> Result<WalkSummary> {
    let started_at = Utc::now();
    let start = Instant::now();
    let tally = Arc::new(Tally::default());
    let max_depth = options.max_depth;

    let counts = Arc::clone(&tally);
    let dispatcher = Dispatcher::new(
        Options::new()
            .name("walk")
            .context(context)
            .limit(options.limit)
            .work(move |d: &Dispatcher<Entry>, entry: Entry| visit(d, entry, max_depth, &counts)),
    )?;

    dispatcher.add(Entry {
        path: root.to_path_buf(),
        depth: 0,
    })?;
    dispatcher.wait()?;

    Ok(WalkSummary {
        root: root.to_path_buf(),
        dirs: tally.dirs.load(Ordering::Relaxed),
        files: tally.files.load(Ordering::Relaxed),
        bytes: tally.bytes.load(Ordering::Relaxed),
        started_at,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

fn visit(
    dispatcher: &Dispatcher<Entry>,
    entry: Entry,
    max_depth: Option<usize>,
    tally: &Tally,
) -> Result<()> {
    let meta = std::fs::symlink_metadata(&entry.path)
        .map_err(|e| Error::Other(format!("{}: {e}", entry.path.display())))?;

    if !meta.is_dir() {
        tally.files.fetch_add(1, Ordering::Relaxed);
        tally.bytes.fetch_add(meta.len(), Ordering::Relaxed);
        return Ok(());
    }

    tally.dirs.fetch_add(1, Ordering::Relaxed);
    if max_depth.is_some_and(|max| entry.depth >= max) {
        return Ok(());
    }

    let children = std::fs::read_dir(&entry.path)
        .map_err(|e| Error::Other(format!("{}: {e}", entry.path.display())))?;
    for child in children {
        // Stop discovering once the run is over; the dispatcher drops
        // whatever is still queued.
        if dispatcher.context().is_done() {
            debug!(dir = %entry.path.display(), "walk canceled mid-directory");
            return Ok(());
        }
        let child = child?;
        dispatcher.add(Entry {
            path: child.path(),
            depth: entry.depth + 1,
        })?;
    }
    Ok(())
}
