//! Knowledge store loader.
//!
//! Reads one domain's subdirectory and produces its [`KnowledgeItem`]s.
//! Only files whose name matches the domain's include globs are read, and
//! only the directory's direct children are considered.
//!
//! # Guarantees
//!
//! - Items are ordered lexicographically by file name, whatever order the
//!   filesystem enumerates them in.
//! - A missing subdirectory yields an empty load, not an error.
//! - A file that cannot be read (permissions, invalid UTF-8, I/O error) is
//!   skipped and reported as a [`LoadDiagnostic`]; the remaining files are
//!   still returned.

use anyhow::Result;
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use knowledge_gateway_core::{DomainLoad, KnowledgeItem, LoadDiagnostic};

use crate::registry::DomainLoader;

/// Loader binding that reads plain-text documents matching a set of globs.
#[derive(Debug, Clone)]
pub struct FileLoader {
    patterns: Vec<String>,
    include: GlobSet,
}

impl FileLoader {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        let include = build_globset(&patterns)?;
        Ok(Self { patterns, include })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[async_trait]
impl DomainLoader for FileLoader {
    fn kind(&self) -> &str {
        "file"
    }

    async fn load(&self, dir: &Path, topic: &str) -> DomainLoad {
        let dir = dir.to_path_buf();
        let topic = topic.to_string();
        let include = self.include.clone();

        // Reads are blocking; keep them off the async workers.
        let task_dir = dir.clone();
        match tokio::task::spawn_blocking(move || load_domain(&task_dir, &topic, &include)).await {
            Ok(load) => load,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "domain load task failed");
                DomainLoad {
                    items: Vec::new(),
                    diagnostics: vec![LoadDiagnostic {
                        file: dir.display().to_string(),
                        message: format!("load task failed: {}", e),
                    }],
                }
            }
        }
    }
}

/// Loads every matching file directly under `dir` as an item of `topic`.
pub fn load_domain(dir: &Path, topic: &str, include: &GlobSet) -> DomainLoad {
    let mut load = DomainLoad::default();

    if !dir.exists() {
        debug!(topic, dir = %dir.display(), "domain directory missing, serving empty");
        return load;
    }
    if !dir.is_dir() {
        load.diagnostics.push(LoadDiagnostic {
            file: dir.display().to_string(),
            message: "domain path is not a directory".to_string(),
        });
        return load;
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let file = e
                    .path()
                    .map(display_name)
                    .unwrap_or_else(|| dir.display().to_string());
                record(&mut load, topic, file, e.to_string());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            record(
                &mut load,
                topic,
                display_name(entry.path()),
                "file name is not valid UTF-8".to_string(),
            );
            continue;
        };

        if !include.is_match(&name) {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => load.items.push(KnowledgeItem {
                file: name,
                topic: topic.to_string(),
                content,
            }),
            Err(e) => record(&mut load, topic, name, e.to_string()),
        }
    }

    load.items.sort_by(|a, b| a.file.cmp(&b.file));
    load.diagnostics.sort_by(|a, b| a.file.cmp(&b.file));

    load
}

fn record(load: &mut DomainLoad, topic: &str, file: String, message: String) {
    warn!(topic, file = %file, error = %message, "skipping unreadable knowledge file");
    load.diagnostics.push(LoadDiagnostic { file, message });
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Path of a domain directory under the store root.
pub fn domain_dir(store_root: &Path, subdirectory: &str) -> PathBuf {
    store_root.join(subdirectory)
}
