//! Modification-time scanning of a data root.

use crate::paths::{is_data_file, relative_key, walk_files};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Tracks the last seen modification time of every `.json` file under a root
/// and accumulates the files that changed.
///
/// A file stays dirty until [`ModTimeScanner::clear`] is called for it, so a
/// failed reload is retried on later passes.
#[derive(Debug, Default)]
pub struct ModTimeScanner {
    seen: HashMap<String, SystemTime>,
    dirty: BTreeSet<String>,
    primed: bool,
}

impl ModTimeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current timestamps without marking anything dirty.
    pub fn prime(&mut self, root: &Path) -> io::Result<usize> {
        self.seen = observe(root)?;
        self.primed = true;
        Ok(self.seen.len())
    }

    /// Diff the current timestamps against the recorded ones.
    ///
    /// Files whose timestamp changed, and files that appeared since the last
    /// scan, join the dirty set. Returns the files newly marked by this pass.
    /// The first call on an unprimed scanner only primes it.
    pub fn rescan(&mut self, root: &Path) -> io::Result<Vec<String>> {
        if !self.primed {
            self.prime(root)?;
            return Ok(Vec::new());
        }

        let observed = observe(root)?;
        let mut changed = Vec::new();
        for (file, modified) in &observed {
            let is_change = match self.seen.get(file) {
                Some(previous) => previous != modified,
                None => true,
            };
            if is_change && self.dirty.insert(file.clone()) {
                changed.push(file.clone());
            }
        }
        self.seen = observed;
        changed.sort();
        Ok(changed)
    }

    pub fn is_dirty(&self, file: &str) -> bool {
        self.dirty.contains(file)
    }

    /// Remove `file` from the dirty set. Returns true if it was dirty.
    pub fn clear(&mut self, file: &str) -> bool {
        self.dirty.remove(file)
    }

    /// Remove `file` from the dirty set only if its recorded timestamp is still
    /// `seen_at`. A scan that observed a newer write in the meantime keeps the
    /// file dirty; false is returned in that case.
    pub fn clear_if_unchanged(&mut self, file: &str, seen_at: Option<SystemTime>) -> bool {
        if self.seen.get(file).copied() != seen_at {
            return false;
        }
        self.dirty.remove(file);
        true
    }

    /// Dirty files in sorted order.
    pub fn dirty_files(&self) -> Vec<String> {
        self.dirty.iter().cloned().collect()
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    pub fn modified(&self, file: &str) -> Option<SystemTime> {
        self.seen.get(file).copied()
    }
}

fn observe(root: &Path) -> io::Result<HashMap<String, SystemTime>> {
    let mut seen = HashMap::new();
    for path in walk_files(root, is_data_file)? {
        let Some(key) = relative_key(root, &path) else {
            continue;
        };
        match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => {
                seen.insert(key, modified);
            }
            Err(e) => debug!("Cannot stat {}: {}", path.display(), e),
        }
    }
    Ok(seen)
}
