//! Ingestion run orchestration.
//!
//! A run enumerates the citation files under the input directory,
//! screens out files already recorded in the store, slices the optional
//! ordinal window, and splits the remainder into contiguous chunks, one
//! worker task per chunk. Within a file, parsing runs on a blocking
//! thread and hands citations over a bounded channel, so memory stays
//! flat no matter how large the document is.
//!
//! A file's `xml_files` row is written only after every citation in it
//! has been handled. A crash mid-file therefore leaves the file
//! unscreened; the next run re-reads it and the per-citation existence
//! check skips the already-committed prefix.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use medlex_db::{Database, DbError};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::models::Citation;
use crate::parser::CitationReader;
use crate::repository::IngestionRepository;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    /// Worker tasks. Each gets one contiguous chunk of the file list.
    pub workers: usize,
    /// Index of the first file to take, after sorting and screening.
    pub start: usize,
    /// Exclusive end index; `None` runs to the end of the list.
    pub end: Option<usize>,
}

impl RunConfig {
    pub fn new(input_dir: PathBuf) -> Self {
        Self {
            input_dir,
            workers: 2,
            start: 0,
            end: None,
        }
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub citations_inserted: u64,
    pub citations_skipped: u64,
    pub citations_failed: u64,
    pub duration_ms: u64,
}

impl RunReport {
    fn merge(&mut self, other: &RunReport) {
        self.files_processed += other.files_processed;
        self.files_skipped += other.files_skipped;
        self.files_failed += other.files_failed;
        self.citations_inserted += other.citations_inserted;
        self.citations_skipped += other.citations_skipped;
        self.citations_failed += other.citations_failed;
    }
}

#[derive(Debug, Default)]
struct FileCounts {
    inserted: u64,
    skipped: u64,
    failed: u64,
}

/// Enumerate `.xml` and `.gz` files under `dir`, sorted by path so the
/// ordinal window is stable across runs.
pub fn enumerate_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("xml") | Some("gz") => paths.push(entry.into_path()),
            _ => {}
        }
    }
    paths.sort();
    Ok(paths)
}

/// File identity as recorded in the store: the bare file name with any
/// `.gz` and `.xml` suffixes stripped, so the compressed and plain form
/// of the same file screen as one.
pub fn invariant_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(name);
    let name = name.strip_suffix(".xml").unwrap_or(name);
    name.to_string()
}

/// Drop paths whose invariant name is already recorded as loaded.
pub fn screen_paths(paths: Vec<PathBuf>, loaded: &HashSet<String>) -> (Vec<PathBuf>, u64) {
    let mut kept = Vec::with_capacity(paths.len());
    let mut skipped = 0;
    for path in paths {
        if loaded.contains(&invariant_file_name(&path)) {
            debug!(path = %path.display(), "already loaded, skipping");
            skipped += 1;
        } else {
            kept.push(path);
        }
    }
    (kept, skipped)
}

/// Take the `[start, end)` window of the sorted list, clamped to its
/// bounds. An inverted or out-of-range window is empty, not an error.
pub fn slice_window(paths: Vec<PathBuf>, start: usize, end: Option<usize>) -> Vec<PathBuf> {
    let len = paths.len();
    let start = start.min(len);
    let end = end.unwrap_or(len).min(len);
    if start >= end {
        return Vec::new();
    }
    paths[start..end].to_vec()
}

/// Split the file list into at most `workers` contiguous chunks of near
/// equal size.
pub fn partition_chunks(paths: Vec<PathBuf>, workers: usize) -> Vec<Vec<PathBuf>> {
    if paths.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1).min(paths.len());
    let chunk_size = paths.len().div_ceil(workers);
    paths.chunks(chunk_size).map(<[PathBuf]>::to_vec).collect()
}

/// Run a full ingestion pass over the configured directory.
pub async fn run_ingestion(config: RunConfig, db: Database) -> Result<RunReport, IngestError> {
    let started = Instant::now();
    let mut report = RunReport::default();

    let all = enumerate_files(&config.input_dir)?;
    let loaded = db.loaded_file_names().await?;
    // Screen before slicing so already-loaded files never consume
    // window slots.
    let (kept, skipped) = screen_paths(all, &loaded);
    let pending = slice_window(kept, config.start, config.end);
    report.files_skipped = skipped;
    info!(
        pending = pending.len(),
        skipped, "starting ingestion run"
    );

    let repo = IngestionRepository::new(db);
    let mut handles = Vec::new();
    for chunk in partition_chunks(pending, config.workers) {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let mut part = RunReport::default();
            for path in chunk {
                match process_file(&repo, &path).await {
                    Ok(counts) => {
                        part.files_processed += 1;
                        part.citations_inserted += counts.inserted;
                        part.citations_skipped += counts.skipped;
                        part.citations_failed += counts.failed;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "file failed");
                        part.files_failed += 1;
                    }
                }
            }
            part
        }));
    }
    for handle in handles {
        let part = handle
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?;
        report.merge(&part);
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        files = report.files_processed,
        inserted = report.citations_inserted,
        skipped = report.citations_skipped,
        failed = report.citations_failed,
        duration_ms = report.duration_ms,
        "ingestion run finished"
    );
    Ok(report)
}

/// Ingest one file end to end, then record it as loaded.
///
/// Parsing happens on a blocking thread; the bounded channel holds one
/// citation, so the parser never runs ahead of the store.
async fn process_file(
    repo: &IngestionRepository,
    path: &Path,
) -> Result<FileCounts, IngestError> {
    let file_name = invariant_file_name(path);
    info!(path = %path.display(), "processing file");

    let (tx, mut rx) = mpsc::channel::<Result<Citation, IngestError>>(1);
    let parse_path = path.to_path_buf();
    let parser = tokio::task::spawn_blocking(move || {
        let mut reader = match CitationReader::open(&parse_path) {
            Ok(reader) => reader,
            Err(err) => {
                let _ = tx.blocking_send(Err(err));
                return;
            }
        };
        loop {
            match reader.next_citation() {
                Ok(Some(citation)) => {
                    if tx.blocking_send(Ok(citation)).is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(err) => {
                    let _ = tx.blocking_send(Err(err));
                    return;
                }
            }
        }
    });

    let mut counts = FileCounts::default();
    while let Some(item) = rx.recv().await {
        let citation = item?;
        if repo.db().citation_exists(citation.pmid).await? {
            debug!(pmid = citation.pmid, "citation already stored, skipping");
            counts.skipped += 1;
            continue;
        }
        match repo.insert_citation(&citation, &file_name).await {
            Ok(()) => counts.inserted += 1,
            Err(DbError::Duplicate(pmid)) => {
                warn!(pmid, "duplicate citation raced in, skipping");
                counts.skipped += 1;
            }
            Err(err) => {
                warn!(pmid = citation.pmid, error = %err, "citation insert failed");
                counts.failed += 1;
            }
        }
    }
    parser
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?;

    repo.db().record_file_loaded(&file_name).await?;
    info!(
        file = %file_name,
        inserted = counts.inserted,
        skipped = counts.skipped,
        failed = counts.failed,
        "file done"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn invariant_name_strips_both_suffixes() {
        assert_eq!(
            invariant_file_name(Path::new("/data/medline16n0001.xml.gz")),
            "medline16n0001"
        );
        assert_eq!(
            invariant_file_name(Path::new("medline16n0001.xml")),
            "medline16n0001"
        );
        assert_eq!(invariant_file_name(Path::new("plain")), "plain");
    }

    #[test]
    fn screening_drops_loaded_files() {
        let loaded: HashSet<String> = ["a".to_string()].into();
        let (kept, skipped) = screen_paths(paths(&["a.xml", "b.xml.gz"]), &loaded);
        assert_eq!(kept, paths(&["b.xml.gz"]));
        assert_eq!(skipped, 1);
    }

    #[test]
    fn window_is_clamped_not_fatal() {
        let input = paths(&["a", "b", "c", "d"]);
        assert_eq!(
            slice_window(input.clone(), 1, Some(3)),
            paths(&["b", "c"])
        );
        assert_eq!(slice_window(input.clone(), 2, None), paths(&["c", "d"]));
        assert_eq!(slice_window(input.clone(), 2, Some(100)), paths(&["c", "d"]));
        assert!(slice_window(input.clone(), 3, Some(2)).is_empty());
        assert!(slice_window(input, 100, None).is_empty());
    }

    #[test]
    fn chunks_are_contiguous_and_cover_everything() {
        let input = paths(&["a", "b", "c", "d", "e"]);
        let chunks = partition_chunks(input.clone(), 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat(), input);

        // More workers than files degrades to one file per chunk.
        let chunks = partition_chunks(paths(&["a", "b"]), 8);
        assert_eq!(chunks.len(), 2);

        assert!(partition_chunks(Vec::new(), 4).is_empty());
        assert_eq!(partition_chunks(paths(&["a"]), 0).len(), 1);
    }

    #[test]
    fn enumeration_takes_only_citation_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml", "a.xml.gz", "notes.txt", "c.XML"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let found = enumerate_files(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xml.gz".to_string(), "b.xml".to_string()]);
    }
}
