use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::models::{JobKey, RecordingId, Service, Timeframe, Word};

use super::{Completion, CompletionStore};

const INDEX_FILE: &str = ".index.json";

/// Filesystem-backed catalog using the same hive-style partition layout
/// the pipeline uses on its object store:
///
/// ```text
/// transcript/service=aws/project=p/speaker=s/performance_date=d/part=1/
///            speaker_type=both/timeframe=10800/section=2/transcript.json
/// word/project=p/speaker=s/performance_date=d/part=1/service=aws/
///      protagonist=1/timeframe=10800/section=2/word.json
/// ```
///
/// External vendor workers drop `transcript.json` files into this tree;
/// `refresh_index` rescans it into a persisted index file, and the
/// `list_*` queries read only that index. Objects written since the
/// last refresh are invisible to listings, exactly like the real
/// queryable catalog.
pub struct FsCatalog {
    root: PathBuf,
    index: Mutex<CatalogIndex>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogIndex {
    transcripts: Vec<JobKey>,
    words: Vec<WordRow>,
}

/// One indexed word partition. Word paths carry no speaker_type, so
/// this is not a full `JobKey`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WordRow {
    recording: RecordingId,
    service: Service,
    protagonist: u8,
    timeframe: Timeframe,
    section: u32,
}

impl FsCatalog {
    /// Open a catalog rooted at `root`, creating the directory if
    /// needed and loading any previously persisted index.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| io_err("creating catalog root", &root, e))?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let content = std::fs::read_to_string(&index_path)
                .map_err(|e| io_err("reading catalog index", &index_path, e))?;
            serde_json::from_str(&content).map_err(|e| {
                PipelineError::CatalogUnavailable(format!(
                    "corrupt catalog index {}: {}",
                    index_path.display(),
                    e
                ))
            })?
        } else {
            CatalogIndex::default()
        };

        Ok(Self {
            root,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locked_index(&self) -> Result<std::sync::MutexGuard<'_, CatalogIndex>, PipelineError> {
        self.index
            .lock()
            .map_err(|_| PipelineError::CatalogUnavailable("catalog index lock poisoned".to_string()))
    }

    /// Walk the partition trees and rebuild the index from what is
    /// actually on disk.
    fn scan(&self) -> Result<CatalogIndex, PipelineError> {
        let mut index = CatalogIndex::default();

        let transcript_root = self.root.join("transcript");
        for path in collect_files(&transcript_root)? {
            let rel = relative_key(&path, &transcript_root);
            match parse_transcript_key(&rel) {
                Some(job) => index.transcripts.push(job),
                None => warn!("ignoring unrecognized catalog entry: {}", path.display()),
            }
        }

        let word_root = self.root.join("word");
        for path in collect_files(&word_root)? {
            let rel = relative_key(&path, &word_root);
            match parse_word_key(&rel) {
                Some(row) => index.words.push(row),
                None => warn!("ignoring unrecognized catalog entry: {}", path.display()),
            }
        }

        Ok(index)
    }
}

#[async_trait]
impl CompletionStore for FsCatalog {
    async fn list_transcripts(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError> {
        let index = self.locked_index()?;
        Ok(index
            .transcripts
            .iter()
            .filter(|job| &job.recording == recording)
            .map(Completion::from)
            .collect())
    }

    async fn list_words(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError> {
        let index = self.locked_index()?;
        Ok(index
            .words
            .iter()
            .filter(|row| &row.recording == recording)
            .map(|row| Completion {
                service: row.service,
                timeframe: row.timeframe,
                section: row.section,
            })
            .collect())
    }

    async fn transcript_exists(&self, job: &JobKey) -> Result<bool, PipelineError> {
        Ok(self.root.join(job.transcript_path()).exists())
    }

    async fn words_exist(&self, job: &JobKey) -> Result<bool, PipelineError> {
        Ok(self.root.join(job.words_path(1)).exists() || self.root.join(job.words_path(0)).exists())
    }

    async fn read_transcript(&self, job: &JobKey) -> Result<serde_json::Value, PipelineError> {
        let path = self.root.join(job.transcript_path());
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::TranscriptMissing(job.describe()));
            }
            Err(e) => return Err(io_err("reading transcript", &path, e)),
        };
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::malformed(job.service, format!("unparseable transcript artifact: {}", e))
        })
    }

    async fn write_words(
        &self,
        job: &JobKey,
        protagonist: u8,
        words: &[Word],
    ) -> Result<(), PipelineError> {
        let path = self.root.join(job.words_path(protagonist));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| io_err("creating word partition", parent, e))?;
        }
        let content = serde_json::to_string_pretty(words).map_err(|e| {
            PipelineError::CatalogUnavailable(format!("serializing words: {}", e))
        })?;
        std::fs::write(&path, content).map_err(|e| io_err("writing words", &path, e))?;
        debug!("wrote {} words to {}", words.len(), path.display());
        Ok(())
    }

    async fn delete_timeframe(
        &self,
        recording: &RecordingId,
        timeframe: Timeframe,
    ) -> Result<(), PipelineError> {
        let transcript_root = self.root.join("transcript");
        for path in collect_files(&transcript_root)? {
            let rel = relative_key(&path, &transcript_root);
            if let Some(job) = parse_transcript_key(&rel) {
                if &job.recording == recording && job.timeframe == timeframe {
                    remove_partition(&path)?;
                }
            }
        }

        let word_root = self.root.join("word");
        for path in collect_files(&word_root)? {
            let rel = relative_key(&path, &word_root);
            if let Some(row) = parse_word_key(&rel) {
                if &row.recording == recording && row.timeframe == timeframe {
                    remove_partition(&path)?;
                }
            }
        }
        Ok(())
    }

    async fn refresh_index(&self) -> Result<(), PipelineError> {
        let fresh = self.scan()?;

        let index_path = self.root.join(INDEX_FILE);
        let content = serde_json::to_string_pretty(&fresh).map_err(|e| {
            PipelineError::CatalogUnavailable(format!("serializing catalog index: {}", e))
        })?;
        std::fs::write(&index_path, content)
            .map_err(|e| io_err("writing catalog index", &index_path, e))?;

        let mut index = self.locked_index()?;
        debug!(
            "refreshed catalog index: {} transcripts, {} word partitions",
            fresh.transcripts.len(),
            fresh.words.len()
        );
        *index = fresh;
        Ok(())
    }
}

fn io_err(action: &str, path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::CatalogUnavailable(format!("{} {}: {}", action, path.display(), e))
}

/// Remove the section directory holding one artifact file.
fn remove_partition(file: &Path) -> Result<(), PipelineError> {
    let dir = file.parent().unwrap_or(file);
    std::fs::remove_dir_all(dir).map_err(|e| io_err("deleting partition", dir, e))
}

/// All regular files under `dir`, depth-first. A missing directory is
/// an empty tree, not an error.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }
    collect_into(dir, &mut files).map_err(|e| io_err("scanning catalog", dir, e))?;
    Ok(files)
}

fn collect_into(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_into(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Path relative to the partition root, '/'-separated regardless of
/// platform.
fn relative_key(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn kv<'a>(segment: &'a str, key: &str) -> Option<&'a str> {
    segment.strip_prefix(key)?.strip_prefix('=')
}

fn parse_transcript_key(rel: &str) -> Option<JobKey> {
    let segments: Vec<&str> = rel.split('/').collect();
    if segments.len() != 9 || segments[8] != "transcript.json" {
        return None;
    }
    Some(JobKey {
        service: kv(segments[0], "service")?.parse().ok()?,
        recording: RecordingId {
            project: kv(segments[1], "project")?.to_string(),
            speaker: kv(segments[2], "speaker")?.to_string(),
            performance_date: kv(segments[3], "performance_date")?.parse().ok()?,
            part: kv(segments[4], "part")?.parse().ok()?,
        },
        speaker_type: kv(segments[5], "speaker_type")?.parse().ok()?,
        timeframe: Timeframe::from_secs(kv(segments[6], "timeframe")?.parse().ok()?),
        section: kv(segments[7], "section")?.parse().ok()?,
    })
}

fn parse_word_key(rel: &str) -> Option<WordRow> {
    let segments: Vec<&str> = rel.split('/').collect();
    if segments.len() != 9 || segments[8] != "word.json" {
        return None;
    }
    Some(WordRow {
        recording: RecordingId {
            project: kv(segments[0], "project")?.to_string(),
            speaker: kv(segments[1], "speaker")?.to_string(),
            performance_date: kv(segments[2], "performance_date")?.parse().ok()?,
            part: kv(segments[3], "part")?.parse().ok()?,
        },
        service: kv(segments[4], "service")?.parse().ok()?,
        protagonist: kv(segments[5], "protagonist")?.parse().ok()?,
        timeframe: Timeframe::from_secs(kv(segments[6], "timeframe")?.parse().ok()?),
        section: kv(segments[7], "section")?.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::models::{Service, SpeakerType};

    use super::*;

    fn job(service: Service, section: u32, timeframe: Timeframe) -> JobKey {
        JobKey {
            service,
            recording: RecordingId {
                project: "oralhistory".to_string(),
                speaker: "maria".to_string(),
                performance_date: NaiveDate::from_ymd_opt(2021, 5, 14).unwrap(),
                part: 1,
            },
            speaker_type: SpeakerType::Both,
            timeframe,
            section,
        }
    }

    fn seed_transcript(catalog: &FsCatalog, job: &JobKey, raw: &serde_json::Value) {
        let path = catalog.root().join(job.transcript_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(raw).unwrap()).unwrap();
    }

    #[test]
    fn test_transcript_key_round_trip() {
        let job = job(Service::Microsoft, 3, Timeframe::DEFAULT);
        let rel = job
            .transcript_path()
            .strip_prefix("transcript/")
            .unwrap()
            .to_string();
        assert_eq!(parse_transcript_key(&rel), Some(job));
    }

    #[test]
    fn test_word_key_round_trip() {
        let job = job(Service::Google, 2, Timeframe::from_secs(14_400));
        let rel = job.words_path(0).strip_prefix("word/").unwrap().to_string();

        let row = parse_word_key(&rel).unwrap();
        assert_eq!(row.recording, job.recording);
        assert_eq!(row.service, Service::Google);
        assert_eq!(row.protagonist, 0);
        assert_eq!(row.timeframe, job.timeframe);
        assert_eq!(row.section, 2);
    }

    #[test]
    fn test_unrecognized_keys_are_skipped() {
        assert!(parse_transcript_key("service=aws/readme.txt").is_none());
        assert!(parse_word_key("project=p/other.json").is_none());
    }

    #[tokio::test]
    async fn test_listing_lags_until_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FsCatalog::open(dir.path()).unwrap();
        let job = job(Service::Aws, 1, Timeframe::DEFAULT);

        seed_transcript(&catalog, &job, &json!({"results": {"items": []}}));

        assert!(catalog.transcript_exists(&job).await.unwrap());
        assert!(catalog
            .list_transcripts(&job.recording)
            .await
            .unwrap()
            .is_empty());

        catalog.refresh_index().await.unwrap();
        let listed = catalog.list_transcripts(&job.recording).await.unwrap();
        assert!(listed.contains(&Completion::from(&job)));
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(Service::Ibm, 1, Timeframe::DEFAULT);
        {
            let catalog = FsCatalog::open(dir.path()).unwrap();
            seed_transcript(&catalog, &job, &json!({"results": []}));
            catalog.refresh_index().await.unwrap();
        }

        let reopened = FsCatalog::open(dir.path()).unwrap();
        let listed = reopened.list_transcripts(&job.recording).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_write_and_read_words() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FsCatalog::open(dir.path()).unwrap();
        let job = job(Service::Aws, 1, Timeframe::DEFAULT);

        let words = vec![Word {
            seq_num: 1,
            word: "hi!".to_string(),
            start_time: 0,
            end_time: 500,
            protagonist: 1,
        }];
        catalog.write_words(&job, 1, &words).await.unwrap();

        assert!(catalog.words_exist(&job).await.unwrap());
        catalog.refresh_index().await.unwrap();
        let listed = catalog.list_words(&job.recording).await.unwrap();
        assert!(listed.contains(&Completion::from(&job)));

        let content =
            std::fs::read_to_string(catalog.root().join(job.words_path(1))).unwrap();
        let stored: Vec<Word> = serde_json::from_str(&content).unwrap();
        assert_eq!(stored, words);
    }

    #[tokio::test]
    async fn test_delete_timeframe_removes_only_matching_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FsCatalog::open(dir.path()).unwrap();
        let old_job = job(Service::Aws, 1, Timeframe::from_secs(10_800));
        let new_job = job(Service::Aws, 1, Timeframe::from_secs(14_400));

        seed_transcript(&catalog, &old_job, &json!({}));
        seed_transcript(&catalog, &new_job, &json!({}));
        catalog.write_words(&old_job, 1, &[]).await.unwrap();

        catalog
            .delete_timeframe(&old_job.recording, old_job.timeframe)
            .await
            .unwrap();

        assert!(!catalog.transcript_exists(&old_job).await.unwrap());
        assert!(!catalog.words_exist(&old_job).await.unwrap());
        assert!(catalog.transcript_exists(&new_job).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_transcript_read() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FsCatalog::open(dir.path()).unwrap();
        let err = catalog
            .read_transcript(&job(Service::Aws, 1, Timeframe::DEFAULT))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TranscriptMissing(_)));
    }
}
