//! Incremental persistence of a run.
//!
//! The JSON sink keeps the document in memory and rewrites the whole file
//! after every record. Each rewrite lands in a sibling temp file that is
//! synced and renamed over the target, so the file on disk is always a
//! complete document holding every pull request finished so far.

use crate::types::{PullRequestStats, RepositoryInfo, RepositoryRunResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for per-PR records, written as they are produced.
pub trait StatsSink {
    /// Starts a fresh document with no pull requests.
    fn begin(&mut self, repository: RepositoryInfo, generated_at: DateTime<Utc>) -> Result<()>;

    /// Durably records one more pull request before returning.
    fn append(&mut self, stats: PullRequestStats) -> Result<()>;
}

pub struct JsonFileSink {
    path: PathBuf,
    document: Option<RepositoryRunResult>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: None,
        }
    }

    /// The document as last written, if the run has started.
    pub fn document(&self) -> Option<&RepositoryRunResult> {
        self.document.as_ref()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_document(path: &Path, document: &RepositoryRunResult) -> Result<()> {
    let tmp = tmp_path(path);
    let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

impl StatsSink for JsonFileSink {
    fn begin(&mut self, repository: RepositoryInfo, generated_at: DateTime<Utc>) -> Result<()> {
        let document = RepositoryRunResult::new(repository, generated_at);
        write_document(&self.path, &document)?;
        self.document = Some(document);
        Ok(())
    }

    fn append(&mut self, stats: PullRequestStats) -> Result<()> {
        let document = self
            .document
            .as_mut()
            .context("sink must be started before appending")?;
        document.pull_requests.push(stats);
        if let Err(e) = write_document(&self.path, document) {
            // Memory must not get ahead of the file.
            document.pull_requests.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// Collects records in memory only.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub document: Option<RepositoryRunResult>,
}

impl StatsSink for MemorySink {
    fn begin(&mut self, repository: RepositoryInfo, generated_at: DateTime<Utc>) -> Result<()> {
        self.document = Some(RepositoryRunResult::new(repository, generated_at));
        Ok(())
    }

    fn append(&mut self, stats: PullRequestStats) -> Result<()> {
        self.document
            .as_mut()
            .context("sink must be started before appending")?
            .pull_requests
            .push(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PullRequestMeta;

    fn repository() -> RepositoryInfo {
        RepositoryInfo {
            name: "hello".to_string(),
            owner: "octo".to_string(),
            url: "https://github.com/octo/hello".to_string(),
        }
    }

    fn stats(number: u64) -> PullRequestStats {
        PullRequestStats {
            pr_meta: PullRequestMeta {
                number,
                title: format!("PR {number}"),
                author: None,
                draft: false,
                created_at: None,
                updated_at: None,
                closed_at: None,
                merged_at: None,
            },
            ready_for_review_at: None,
            first_approval_at: None,
            first_review_at: None,
            reviews: vec![],
            timeline: vec![],
            comments: None,
            update_timestamps: None,
        }
    }

    fn read(path: &Path) -> RepositoryRunResult {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_file_is_valid_after_every_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let mut sink = JsonFileSink::new(&path);

        sink.begin(repository(), Utc::now()).unwrap();
        let on_disk = read(&path);
        assert_eq!(on_disk.repository, repository());
        assert!(on_disk.pull_requests.is_empty());

        for i in 1..=3 {
            sink.append(stats(i)).unwrap();
            let on_disk = read(&path);
            assert_eq!(on_disk.pull_requests.len(), i as usize);
            assert_eq!(on_disk.pull_requests.last().unwrap().pr_meta.number, i);
        }

        assert!(!tmp_path(&path).exists());
        assert_eq!(sink.document().unwrap().pull_requests.len(), 3);
    }

    #[test]
    fn test_begin_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "not json at all").unwrap();

        let mut sink = JsonFileSink::new(&path);
        sink.begin(repository(), Utc::now()).unwrap();

        assert!(read(&path).pull_requests.is_empty());
    }

    #[test]
    fn test_append_before_begin_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("stats.json"));
        assert!(sink.append(stats(1)).is_err());

        let mut memory = MemorySink::default();
        assert!(memory.append(stats(1)).is_err());
    }

    #[test]
    fn test_begin_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path().join("missing").join("stats.json"));
        assert!(sink.begin(repository(), Utc::now()).is_err());
    }
}
