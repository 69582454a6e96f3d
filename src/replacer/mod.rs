//! 置換エンジン
//!
//! 行順・出現箇所順に1件ずつファイルを開いて置換・保存する。
//! 進捗は `ReplaceEvent` で通知し、バックグラウンド実行時は mpsc で送る。

mod types;

pub use types::{
    ReplaceEvent, ReplaceJob, ReplaceOptions, ReplaceSummary, RunOutcome, StatusUpdate,
};

use crate::config::FailurePolicy;
use crate::document::FormatExt;
use crate::error::{DocDupeError, Result};
use crate::scanner::FileFailure;
use docdupe_common::{FileId, MatchEntry, Occurrence, RegisteredFile};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

fn replace_occurrence<'a>(
    files: &HashMap<FileId, &'a RegisteredFile>,
    row: &MatchEntry,
    occurrence: &Occurrence,
    options: &ReplaceOptions,
) -> Result<(&'a RegisteredFile, usize)> {
    let file = files
        .get(&occurrence.file)
        .copied()
        .ok_or_else(|| DocDupeError::UnknownFile(occurrence.to_string()))?;

    let count = file.kind.format().replace_value(
        &file.path,
        &occurrence.location,
        &row.original,
        &row.replacement,
        &options.highlight,
    )?;
    Ok((file, count))
}

fn summary(
    per_file: BTreeMap<PathBuf, usize>,
    rows_processed: usize,
    failures: Vec<FileFailure>,
) -> ReplaceSummary {
    ReplaceSummary {
        total: per_file.values().sum(),
        per_file,
        rows_processed,
        failures,
        finished_at: chrono::Local::now(),
    }
}

/// 置換を同期実行する
///
/// 置換テキストが空、または元の値と同じ行は何もしない（進捗だけ進める）。
pub fn run_replacement<F>(job: &ReplaceJob, mut emit: F) -> RunOutcome
where
    F: FnMut(ReplaceEvent),
{
    let files: HashMap<FileId, &RegisteredFile> = job.files.iter().map(|f| (f.id, f)).collect();
    let row_count = job.rows.len();
    let mut per_file: BTreeMap<PathBuf, usize> = BTreeMap::new();
    let mut failures = Vec::new();

    tracing::info!(rows = row_count, pending = job.rows.iter().filter(|r| r.is_pending()).count(), "replace started");

    for (row_idx, row) in job.rows.iter().enumerate() {
        if row.is_pending() {
            let mut row_replacements = 0;

            for (occ_idx, occurrence) in row.occurrences.iter().enumerate() {
                match replace_occurrence(&files, row, occurrence, &job.options) {
                    Ok((file, count)) => {
                        *per_file.entry(file.path.clone()).or_default() += count;
                        row_replacements += count;
                        emit(ReplaceEvent::Status(StatusUpdate {
                            path: file.path.clone(),
                            value: row.original.clone(),
                            row_replacements,
                            occurrence_index: occ_idx + 1,
                        }));
                    }
                    Err(e) => {
                        let path = files
                            .get(&occurrence.file)
                            .map(|f| f.path.clone())
                            .unwrap_or_else(|| PathBuf::from(&occurrence.file_name));
                        let failure = FileFailure {
                            path,
                            message: e.to_string(),
                        };
                        tracing::warn!(path = %failure.path.display(), error = %failure.message, "replace failed");
                        emit(ReplaceEvent::FileError(failure.clone()));

                        match job.options.policy {
                            FailurePolicy::Abort => {
                                let outcome = RunOutcome::Failed {
                                    failure,
                                    partial: summary(per_file, row_idx, failures),
                                };
                                emit(outcome.clone().into());
                                return outcome;
                            }
                            FailurePolicy::Continue => failures.push(failure),
                        }
                    }
                }
            }
        }

        emit(ReplaceEvent::Progress(((row_idx + 1) * 100 / row_count) as u8));
    }

    let outcome = RunOutcome::Finished(summary(per_file, row_count, failures));
    tracing::info!(total = outcome.summary().total, "replace finished");
    emit(outcome.clone().into());
    outcome
}

/// バックグラウンド実行中の置換
pub struct ReplaceHandle {
    rx: Receiver<ReplaceEvent>,
    thread: Option<JoinHandle<()>>,
}

impl ReplaceHandle {
    pub fn events(&self) -> &Receiver<ReplaceEvent> {
        &self.rx
    }

    /// UIのポーリング用（ブロックしない）
    pub fn try_next(&self) -> Option<ReplaceEvent> {
        self.rx.try_recv().ok()
    }

    /// ワーカーが終了済みか
    pub fn is_done(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn wait(self) -> Result<RunOutcome> {
        self.wait_with(|_| {})
    }

    /// 終了までイベントを受け取り、最終状態を返す
    pub fn wait_with<F>(mut self, mut on_event: F) -> Result<RunOutcome>
    where
        F: FnMut(&ReplaceEvent),
    {
        let mut outcome = None;
        loop {
            match self.rx.recv() {
                Ok(event) => {
                    on_event(&event);
                    match event {
                        ReplaceEvent::Finished(summary) => {
                            outcome = Some(RunOutcome::Finished(summary));
                            break;
                        }
                        ReplaceEvent::Failed { failure, partial } => {
                            outcome = Some(RunOutcome::Failed { failure, partial });
                            break;
                        }
                        _ => {}
                    }
                }
                Err(_) => break,
            }
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                return Err(DocDupeError::WorkerDisconnected);
            }
        }

        outcome.ok_or(DocDupeError::WorkerDisconnected)
    }
}

impl std::fmt::Debug for ReplaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaceHandle")
            .field("done", &self.is_done())
            .finish()
    }
}

/// 専用スレッドで置換を実行する（使い捨て）
pub fn spawn_replacement(job: ReplaceJob) -> Result<ReplaceHandle> {
    spawn_guarded(job, ())
}

/// `guard` はワーカー終了時に破棄される
pub(crate) fn spawn_guarded<G>(job: ReplaceJob, guard: G) -> Result<ReplaceHandle>
where
    G: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let thread = std::thread::Builder::new()
        .name("docdupe-replace".into())
        .spawn(move || {
            let _guard = guard;
            run_replacement(&job, |event| {
                let _ = tx.send(event);
            });
        })?;

    Ok(ReplaceHandle {
        rx,
        thread: Some(thread),
    })
}
