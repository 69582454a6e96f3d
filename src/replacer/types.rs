use crate::config::{Config, FailurePolicy, Highlight};
use crate::scanner::FileFailure;
use chrono::{DateTime, Local};
use docdupe_common::{MatchEntry, RegisteredFile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    pub policy: FailurePolicy,
    pub highlight: Highlight,
}

impl ReplaceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.replace_policy,
            highlight: config.highlight(),
        }
    }
}

/// ワーカーに渡す不変スナップショット
#[derive(Debug, Clone)]
pub struct ReplaceJob {
    pub files: Vec<RegisteredFile>,
    pub rows: Vec<MatchEntry>,
    pub options: ReplaceOptions,
}

/// 1箇所処理するごとの状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub path: PathBuf,
    pub value: String,
    /// この行でここまでに置換したセル数
    pub row_replacements: usize,
    /// 行内の出現箇所番号（1始まり）
    pub occurrence_index: usize,
}

impl std::fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ファイル: {}, 置換: {}, 出現箇所: {}",
            self.path.display(),
            self.row_replacements,
            self.occurrence_index
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceSummary {
    /// ファイルごとの置換セル数
    pub per_file: BTreeMap<PathBuf, usize>,
    pub total: usize,
    /// 処理を終えた行数
    pub rows_processed: usize,
    /// 続行モードで飛ばしたファイル
    pub failures: Vec<FileFailure>,
    pub finished_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub enum ReplaceEvent {
    /// 完了行の割合（0〜100）
    Progress(u8),
    Status(StatusUpdate),
    FileError(FileFailure),
    Finished(ReplaceSummary),
    /// 中止。partial には中止までに保存済みの置換が入る
    Failed {
        failure: FileFailure,
        partial: ReplaceSummary,
    },
}

impl ReplaceEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReplaceEvent::Finished(_) | ReplaceEvent::Failed { .. })
    }
}

/// 1回の実行の最終状態
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Finished(ReplaceSummary),
    Failed {
        failure: FileFailure,
        partial: ReplaceSummary,
    },
}

impl RunOutcome {
    pub fn summary(&self) -> &ReplaceSummary {
        match self {
            RunOutcome::Finished(summary) => summary,
            RunOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished(_))
    }

    /// 最後まで進み、どのファイルでもエラーがなかった
    pub fn is_clean(&self) -> bool {
        matches!(self, RunOutcome::Finished(summary) if summary.failures.is_empty())
    }
}

impl From<RunOutcome> for ReplaceEvent {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Finished(summary) => ReplaceEvent::Finished(summary),
            RunOutcome::Failed { failure, partial } => ReplaceEvent::Failed { failure, partial },
        }
    }
}
