use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::{CalibError, Result};

/// Renames that turn every matching file of a directory into `{prefix}{n}.{ext}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenamePlan {
    pub dir: PathBuf,
    /// `(source, target)` pairs, numbered from 1 in source filename order.
    pub moves: Vec<(PathBuf, PathBuf)>,
}

fn has_extension(p: &Path, extension: &str) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Plans the renumbering of every `*.{extension}` file in `dir` (case-insensitive).
///
/// Nothing is touched on disk. A target name already taken by a file that is
/// not itself being renumbered is a [`CalibError::RenameCollision`].
pub fn plan_renames(dir: &Path, extension: &str, prefix: &str) -> Result<RenamePlan> {
    if !dir.is_dir() {
        return Err(CalibError::MissingInput(dir.to_path_buf()));
    }
    let extension = extension.trim_start_matches('.');
    let mut sources = Vec::new();
    for entry in glob(&dir.join("*").to_string_lossy())? {
        let p = entry?;
        if p.is_file() && has_extension(&p, extension) {
            sources.push(p);
        }
    }
    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let source_set: HashSet<&PathBuf> = sources.iter().collect();
    let mut moves = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        let target = dir.join(format!("{}{}.{}", prefix, i + 1, extension));
        if target.exists() && !source_set.contains(&target) {
            return Err(CalibError::RenameCollision {
                from: source.clone(),
                to: target,
            });
        }
        moves.push((source.clone(), target));
    }
    Ok(RenamePlan {
        dir: dir.to_path_buf(),
        moves,
    })
}

impl RenamePlan {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    fn temp_path(&self, idx: usize) -> PathBuf {
        let mut attempt = 0;
        loop {
            let p = self.dir.join(format!(
                ".rename-{}-{}-{}.tmp",
                std::process::id(),
                idx,
                attempt
            ));
            if !p.exists() {
                return p;
            }
            attempt += 1;
        }
    }

    /// Performs the renames and returns how many files changed name.
    ///
    /// Every source first moves to a unique temporary name, then every temporary
    /// moves to its target, so a target that is also a source is never clobbered.
    /// There is no rollback; the error names the path that failed.
    pub fn apply(&self) -> Result<usize> {
        let pending: Vec<_> = self.moves.iter().filter(|(s, t)| s != t).collect();
        let mut staged = Vec::with_capacity(pending.len());
        for (idx, (source, target)) in pending.iter().enumerate() {
            let temp = self.temp_path(idx);
            std::fs::rename(source, &temp).map_err(|e| CalibError::RenameFailed {
                path: source.clone(),
                source: e,
            })?;
            staged.push((temp, target));
        }
        for (temp, target) in &staged {
            std::fs::rename(temp, target).map_err(|e| CalibError::RenameFailed {
                path: temp.clone(),
                source: e,
            })?;
        }
        for (source, target) in &pending {
            log::info!("{} -> {}", source.display(), target.display());
        }
        Ok(pending.len())
    }
}
