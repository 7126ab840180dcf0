//! Input file resolution.
//!
//! Expands a user-supplied path or glob into a sorted list of canonical file
//! paths. A pattern is split into its literal leading directory and a glob
//! remainder; the directory is walked with `walkdir` and matches are
//! filtered with `globset`.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

/// Resolve `pattern` relative to `cwd` into existing files, canonicalized
/// and sorted. A pattern naming an existing path resolves to that path.
pub fn resolve_files(pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    let literal = cwd.join(pattern);
    // An existing file wins even when its name contains glob characters.
    if literal.is_file() {
        let path = literal
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", literal.display()))?;
        return Ok(vec![path]);
    }
    if literal.is_dir() && !has_glob_meta(pattern) {
        return walk(&literal, None);
    }

    let (base, rest) = split_pattern(pattern);
    let root = cwd.join(&base);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let matcher = GlobBuilder::new(&rest)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern: {}", pattern))?
        .compile_matcher();
    walk(&root, Some(&matcher))
}

fn walk(root: &Path, matcher: Option<&GlobMatcher>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if let Some(m) = matcher {
            if !m.is_match(relative) {
                continue;
            }
        }
        files.push(path.canonicalize()?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Split `docs/**/*.md` into (`docs`, `**/*.md`).
fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let mut base = if pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    let mut parts = pattern.split('/').filter(|p| !p.is_empty()).peekable();
    while let Some(part) = parts.peek() {
        if has_glob_meta(part) {
            break;
        }
        base.push(part);
        parts.next();
    }
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        // No glob metacharacters at all: match the last component literally.
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        base.pop();
        return (base, name);
    }
    (base, rest.join("/"))
}

/// `path` relative to `base`, with `..` steps when `path` is outside it.
pub fn relative_path(path: &Path, base: &Path) -> String {
    if let Ok(stripped) = path.strip_prefix(base) {
        return stripped.to_string_lossy().to_string();
    }

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    out.to_string_lossy().to_string()
}

/// Canonical form of the working directory used for relative identifiers.
pub fn canonical_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let dir = match cwd {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        bail!("Working directory does not exist: {}", dir.display());
    }
    Ok(dir.canonicalize()?)
}
