//! Snippet exporter
//!
//! Writes closed snippets as `{code}_{yyyyMMddTHHmmss}.json` into an export
//! directory. The name is claimed with an empty placeholder created
//! exclusively, so concurrent exports never pick the same file. The document
//! goes to a hidden temporary sibling first and is renamed over the
//! placeholder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use reel_core::{ReelError, ReelResult};
use tracing::{debug, info, warn};

use crate::{Snippet, SnippetRecord};

/// Upper bound on `_N` suffixes tried for one name
const MAX_SUFFIX: u32 = 10_000;

/// Persists closed snippets
#[derive(Debug, Clone)]
pub struct SnippetExporter {
    dir: PathBuf,
    pretty: bool,
}

impl SnippetExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnippetExporter {
            dir: dir.into(),
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export stamped with the current wall-clock time
    pub fn export(&self, snippet: &Snippet) -> ReelResult<PathBuf> {
        self.export_at(snippet, SystemTime::now())
    }

    /// Export stamped with `now`. Returns the path written.
    pub fn export_at(&self, snippet: &Snippet, now: SystemTime) -> ReelResult<PathBuf> {
        let record = SnippetRecord::from_snippet(snippet)?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&record)
        } else {
            serde_json::to_vec(&record)
        }
        .map_err(|err| ReelError::Encode(err.to_string()))?;

        fs::create_dir_all(&self.dir).map_err(|err| ReelError::export(&self.dir, err))?;

        let stem = format!("{}_{}", record.code, file_stamp(now));
        let path = self.claim_path(&stem)?;
        if let Err(err) = write_atomically(&path, &bytes) {
            if let Err(cleanup) = fs::remove_file(&path) {
                debug!(error = %cleanup, "export placeholder not removed");
            }
            return Err(err);
        }

        info!(
            snippet = %snippet.id(),
            code = record.code,
            frames = record.frame_count,
            path = %path.display(),
            "snippet exported"
        );
        Ok(path)
    }

    /// Create the first of `stem.json`, `stem_1.json`, ... that does not
    /// exist yet. The empty file holds the name until the rename.
    fn claim_path(&self, stem: &str) -> ReelResult<PathBuf> {
        for n in 0..=MAX_SUFFIX {
            let candidate = if n == 0 {
                self.dir.join(format!("{}.json", stem))
            } else {
                self.dir.join(format!("{}_{}.json", stem, n))
            };
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    if n > 0 {
                        debug!(path = %candidate.display(), "export name taken, using suffix");
                    }
                    return Ok(candidate);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(ReelError::export(&candidate, err)),
            }
        }
        Err(ReelError::export(
            self.dir.join(format!("{}.json", stem)),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free export name"),
        ))
    }
}

/// `yyyyMMddTHHmmss` in UTC
pub fn file_stamp(now: SystemTime) -> String {
    humantime::format_rfc3339_seconds(now)
        .to_string()
        .chars()
        .filter(|c| !matches!(c, '-' | ':' | 'Z'))
        .collect()
}

fn write_atomically(path: &Path, bytes: &[u8]) -> ReelResult<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", name));

    if let Err(err) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            debug!(error = %cleanup, "temporary export file not removed");
        }
        warn!(path = %path.display(), error = %err, "snippet export failed");
        return Err(ReelError::export(path, err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::{BodyObservation, Joint, JointType, OwasCode, PlaybackTime, SnippetId, SubjectId};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::CapturedFrame;

    fn closed_snippet(frames: usize) -> Snippet {
        let mut snippet = Snippet::open(
            SnippetId::new(1),
            SubjectId::new(7),
            PlaybackTime::from_secs(10),
        );
        let observation = BodyObservation::new(SubjectId::new(7))
            .with_joint(JointType::SpineMid, Joint::tracked(0.0, 0.4));
        for _ in 0..frames {
            snippet.push(CapturedFrame::from_observation(&observation));
        }
        snippet.close(OwasCode::new(2, 1, 5).unwrap(), PlaybackTime::from_secs(25));
        snippet
    }

    // 2026-10-19T08:30:05Z
    fn fixed_now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_792_398_605)
    }

    #[test]
    fn test_file_stamp() {
        assert_eq!(file_stamp(fixed_now()), "20261019T083005");
    }

    #[test]
    fn test_export_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnippetExporter::new(dir.path());

        let path = exporter.export_at(&closed_snippet(30), fixed_now()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "215_20261019T083005.json"
        );

        let record = SnippetRecord::load(&path).unwrap();
        assert_eq!(record.frame_count, 30);
        assert_eq!(record.code, 215);
        assert_eq!(record.beginning_time(), PlaybackTime::from_secs(10));
        assert_eq!(record.ending_time(), PlaybackTime::from_secs(25));

        // No temporary files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_name_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnippetExporter::new(dir.path()).with_pretty(false);
        let snippet = closed_snippet(1);

        let first = exporter.export_at(&snippet, fixed_now()).unwrap();
        let second = exporter.export_at(&snippet, fixed_now()).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "215_20261019T083005_1.json"
        );
    }

    #[test]
    fn test_open_snippet_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnippetExporter::new(dir.path());
        let snippet = Snippet::open(SnippetId::new(1), SubjectId::new(7), PlaybackTime::ZERO);

        assert!(matches!(exporter.export(&snippet), Err(ReelError::SnippetOpen)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_target_reports_export_error() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the export directory should be
        let blocker = dir.path().join("exports");
        fs::write(&blocker, b"not a directory").unwrap();

        let exporter = SnippetExporter::new(&blocker);
        let err = exporter.export(&closed_snippet(1)).unwrap_err();
        assert!(matches!(err, ReelError::Export { .. }));
    }

    #[test]
    fn test_concurrent_exports_get_distinct_names() {
        const WRITERS: usize = 8;
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(SnippetExporter::new(dir.path()));
        let snippet = Arc::new(closed_snippet(5));

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let exporter = Arc::clone(&exporter);
                let snippet = Arc::clone(&snippet);
                thread::spawn(move || exporter.export_at(&snippet, fixed_now()).unwrap())
            })
            .collect();
        let paths: HashSet<PathBuf> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(paths.len(), WRITERS);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), WRITERS);
        for path in &paths {
            assert_eq!(SnippetRecord::load(path).unwrap().frame_count, 5);
        }
    }

    #[test]
    fn test_failed_write_releases_claimed_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnippetExporter::new(dir.path());
        // A directory in the temporary file's place makes the write fail
        fs::create_dir(dir.path().join(".215_20261019T083005.json.tmp")).unwrap();

        let err = exporter.export_at(&closed_snippet(1), fixed_now()).unwrap_err();
        assert!(matches!(err, ReelError::Export { .. }));
        assert!(!dir.path().join("215_20261019T083005.json").exists());
    }
}
