//! 重複スキャン
//!
//! 登録ファイルを順に読み、値 → 出現箇所（ファイル, 位置）の対応を作り、
//! 2箇所以上に現れる値だけを残す。ファイル単位の失敗は記録して続行する。

use crate::document::FormatExt;
use crate::error::{DocDupeError, Result};
use crate::session::FileSet;
use docdupe_common::{DocumentKind, MatchEntry, MatchTable, Occurrence, RegisteredFile};
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// スキャンで開けなかったファイル
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// スキャン結果
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub table: MatchTable,
    pub errors: Vec<FileFailure>,
}

/// 1ファイル読み終えるごとの通知
#[derive(Debug)]
pub struct ScanProgress<'a> {
    pub file: &'a RegisteredFile,
    /// 1始まり
    pub index: usize,
    pub total: usize,
    /// 読み出したセル値の数（失敗時は None）
    pub values: Option<usize>,
}

pub fn scan(files: &FileSet) -> ScanOutcome {
    scan_with(files, |_| {})
}

pub fn scan_with<F>(files: &FileSet, mut observer: F) -> ScanOutcome
where
    F: FnMut(ScanProgress<'_>),
{
    let mut values: IndexMap<String, IndexSet<Occurrence>> = IndexMap::new();
    let mut errors = Vec::new();
    let total = files.len();

    for (idx, file) in files.iter().enumerate() {
        let file_name = file.file_name();
        let read = file.kind.format().enumerate_values(&file.path);

        let count = match read {
            Ok(found) => {
                let count = found.len();
                for item in found {
                    values.entry(item.value).or_default().insert(Occurrence {
                        file: file.id,
                        file_name: file_name.clone(),
                        location: item.location,
                    });
                }
                tracing::debug!(path = %file.path.display(), values = count, "scanned");
                Some(count)
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                errors.push(FileFailure {
                    path: file.path.clone(),
                    message: e.to_string(),
                });
                None
            }
        };

        observer(ScanProgress {
            file,
            index: idx + 1,
            total,
            values: count,
        });
    }

    let entries: Vec<MatchEntry> = values
        .into_iter()
        .filter(|(_, occurrences)| occurrences.len() > 1)
        .map(|(value, occurrences)| MatchEntry::new(value, occurrences.into_iter().collect()))
        .collect();

    tracing::info!(files = total, duplicates = entries.len(), failed = errors.len(), "scan finished");

    ScanOutcome {
        table: MatchTable::new(entries),
        errors,
    }
}

/// Officeが作るロックファイル（~$xxx.docx）
fn is_lock_file(name: &str) -> bool {
    name.starts_with("~$")
}

/// フォルダ内の対応ドキュメントを集める（ファイル名順）
pub fn collect_documents(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(DocDupeError::FileNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut docs: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_lock_file(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .filter(|p| DocumentKind::from_path(p).is_some())
        .collect();

    docs.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));

    Ok(docs)
}
