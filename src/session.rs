//! セッション状態
//!
//! 登録ファイル（FileSet）と重複テーブル（MatchTable）を単独で所有する。
//! 置換ワーカーにはスナップショットだけを渡し、実行中は変更系の操作を拒否する。

use crate::error::{DocDupeError, Result};
use crate::replacer::{self, ReplaceHandle, ReplaceJob, ReplaceOptions, RunOutcome};
use crate::scanner::{self, FileFailure, ScanProgress};
use docdupe_common::{DocumentKind, FileId, MatchEntry, MatchTable, RegisteredFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 登録ファイルの集合（パス重複なし、登録順）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSet {
    files: Vec<RegisteredFile>,
    next_id: u32,
}

impl FileSet {
    /// 登録できるか確かめ、正規化したパスを返す
    ///
    /// `..` やシンボリックリンクを解決するので、同じファイルは常に同じパスになる
    fn resolve(path: &Path) -> Result<PathBuf> {
        if DocumentKind::from_path(path).is_none() {
            return Err(DocDupeError::UnsupportedFormat(path.display().to_string()));
        }
        if !path.is_file() {
            return Err(DocDupeError::FileNotFound(path.display().to_string()));
        }
        Ok(std::fs::canonicalize(path)?)
    }

    fn insert(&mut self, path: PathBuf) -> Result<FileId> {
        if let Some(existing) = self.files.iter().find(|f| f.path == path) {
            return Ok(existing.id);
        }

        let id = FileId(self.next_id);
        self.files.push(RegisteredFile::new(id, path)?);
        self.next_id += 1;
        Ok(id)
    }

    /// 登録する。登録済みなら既存のIDを返す
    pub fn add(&mut self, path: &Path) -> Result<FileId> {
        let path = Self::resolve(path)?;
        self.insert(path)
    }

    /// すべて確認してから登録する。1件でも登録できなければ何も変えない
    pub fn add_all(&mut self, paths: &[PathBuf]) -> Result<Vec<FileId>> {
        let resolved = paths
            .iter()
            .map(|path| Self::resolve(path))
            .collect::<Result<Vec<_>>>()?;
        resolved.into_iter().map(|path| self.insert(path)).collect()
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        // 削除済みのファイルは正規化できないので登録時のパスと比べる
        let target = std::fs::canonicalize(path)
            .or_else(|_| std::path::absolute(path))
            .unwrap_or_else(|_| path.to_path_buf());
        let before = self.files.len();
        self.files.retain(|f| f.path != target);
        self.files.len() != before
    }

    pub fn get(&self, id: FileId) -> Option<&RegisteredFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// ファイル名（パスの最後の要素）で探す
    pub fn find_by_name(&self, name: &str) -> Result<&RegisteredFile> {
        let matches: Vec<&RegisteredFile> = self
            .files
            .iter()
            .filter(|f| f.file_name() == name)
            .collect();

        match matches.as_slice() {
            [] => Err(DocDupeError::UnknownFile(name.to_string())),
            [single] => Ok(single),
            _ => Err(DocDupeError::AmbiguousFile {
                name: name.to_string(),
                candidates: matches.iter().map(|f| f.path.clone()).collect(),
            }),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisteredFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// 保存用スナップショット
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    version: u32,
    files: FileSet,
    table: MatchTable,
}

/// ワーカー終了時に実行中フラグを下ろす
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct Session {
    files: FileSet,
    table: MatchTable,
    busy: Arc<AtomicBool>,
}

impl Session {
    const SNAPSHOT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn table(&self) -> &MatchTable {
        &self.table
    }

    /// 置換ワーカーが動いているか
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(DocDupeError::ReplaceInProgress);
        }
        Ok(())
    }

    pub fn add_file(&mut self, path: &Path) -> Result<FileId> {
        self.ensure_idle()?;
        self.files.add(path)
    }

    /// フォルダ内の .xlsx / .docx をまとめて登録する
    pub fn add_folder(&mut self, folder: &Path, recursive: bool) -> Result<Vec<FileId>> {
        self.ensure_idle()?;
        let docs = scanner::collect_documents(folder, recursive)?;
        self.files.add_all(&docs)
    }

    pub fn remove_file(&mut self, path: &Path) -> Result<bool> {
        self.ensure_idle()?;
        Ok(self.files.remove(path))
    }

    /// ファイル名で登録解除する（同名が複数あればエラー）
    pub fn remove_by_name(&mut self, name: &str) -> Result<PathBuf> {
        self.ensure_idle()?;
        let path = self.files.find_by_name(name)?.path.clone();
        self.files.remove(&path);
        Ok(path)
    }

    /// 重複テーブルを作り直す。開けなかったファイルを返す
    pub fn scan(&mut self) -> Result<Vec<FileFailure>> {
        self.scan_with(|_| {})
    }

    pub fn scan_with<F>(&mut self, observer: F) -> Result<Vec<FileFailure>>
    where
        F: FnMut(ScanProgress<'_>),
    {
        self.ensure_idle()?;
        let outcome = scanner::scan_with(&self.files, observer);
        self.table = outcome.table;
        Ok(outcome.errors)
    }

    pub fn clear_table(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.table = MatchTable::default();
        Ok(())
    }

    pub fn set_replacement(&mut self, original: &str, text: &str) -> Result<()> {
        self.ensure_idle()?;
        let entry = self
            .table
            .get_mut(original)
            .ok_or_else(|| DocDupeError::UnknownValue(original.to_string()))?;
        entry.replacement = text.to_string();
        Ok(())
    }

    pub fn set_replacement_at(&mut self, index: usize, text: &str) -> Result<()> {
        self.ensure_idle()?;
        let entry: &mut MatchEntry = self
            .table
            .entries
            .get_mut(index)
            .ok_or_else(|| DocDupeError::UnknownValue(format!("#{}", index)))?;
        entry.replacement = text.to_string();
        Ok(())
    }

    /// 現在のファイル・テーブルのスナップショットで置換ワーカーを起動する
    pub fn start_replace(&self, options: ReplaceOptions) -> Result<ReplaceHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DocDupeError::ReplaceInProgress);
        }

        let job = ReplaceJob {
            files: self.files.iter().cloned().collect(),
            rows: self.table.entries.clone(),
            options,
        };
        let guard = BusyGuard(Arc::clone(&self.busy));
        // 起動に失敗した場合は guard がここで破棄されフラグが戻る
        replacer::spawn_guarded(job, guard)
    }

    /// 置換結果をテーブルに反映する
    ///
    /// エラーなく終わったときだけ再スキャンして `Some(読み込めなかったファイル)` を返す。
    /// 中止・エラーありの場合は再実行できるよう編集済みのテーブルを残して `None`。
    pub fn finish_replace(&mut self, outcome: &RunOutcome) -> Result<Option<Vec<FileFailure>>> {
        self.finish_replace_with(outcome, |_| {})
    }

    pub fn finish_replace_with<F>(
        &mut self,
        outcome: &RunOutcome,
        observer: F,
    ) -> Result<Option<Vec<FileFailure>>>
    where
        F: FnMut(ScanProgress<'_>),
    {
        if outcome.is_clean() {
            self.scan_with(observer).map(Some)
        } else {
            self.ensure_idle()?;
            Ok(None)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = SessionSnapshot {
            version: Self::SNAPSHOT_VERSION,
            files: self.files.clone(),
            table: self.table.clone(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocDupeError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let snapshot: SessionSnapshot = serde_json::from_str(&content)?;
        if snapshot.version != Self::SNAPSHOT_VERSION {
            return Err(DocDupeError::Config(format!(
                "セッションファイルのバージョンが違います: {}（対応: {}）",
                snapshot.version,
                Self::SNAPSHOT_VERSION
            )));
        }
        Ok(Self {
            files: snapshot.files,
            table: snapshot.table,
            busy: Arc::default(),
        })
    }
}
