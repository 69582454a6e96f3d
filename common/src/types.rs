//! 重複検出・置換の型定義
//!
//! CLIと表示レイヤで共有される型:
//! - RegisteredFile: 登録済みドキュメント（安定ID付き）
//! - Occurrence: 値が見つかった（ファイル, 位置）の組
//! - MatchEntry / MatchTable: 重複値と置換テキストの一覧

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Wordの表には名前がないため、位置は固定マーカーで表す
pub const TABLE_MARKER: &str = "Table";

/// 登録時に採番されるファイルID
///
/// セッション内で再利用されない。ファイル名の末尾一致による解決の代わりに使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// ドキュメント種別（拡張子のみで判定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// .xlsx
    Spreadsheet,
    /// .docx
    WordProcessing,
}

impl DocumentKind {
    pub const EXTENSIONS: &'static [&'static str] = &["xlsx", "docx"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(DocumentKind::Spreadsheet),
            "docx" => Some(DocumentKind::WordProcessing),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Spreadsheet => write!(f, "xlsx"),
            DocumentKind::WordProcessing => write!(f, "docx"),
        }
    }
}

/// 登録済みファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredFile {
    pub id: FileId,
    pub path: PathBuf,
    pub kind: DocumentKind,
}

impl RegisteredFile {
    /// 拡張子から種別を判定して登録エントリを作る
    pub fn new(id: FileId, path: PathBuf) -> Result<Self> {
        let kind = DocumentKind::from_path(&path)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Ok(Self { id, path, kind })
    }

    /// 表示用のファイル名（パスの最後の要素）
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// ファイル内の位置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "name")]
pub enum Location {
    /// スプレッドシートのシート名
    Sheet(String),
    /// Wordドキュメントの表（全体）
    Tables,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Sheet(name) => write!(f, "{}", name),
            Location::Tables => write!(f, "{}", TABLE_MARKER),
        }
    }
}

/// 値の出現箇所
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub file: FileId,
    /// 表示用ファイル名（解決には使わない）
    pub file_name: String,
    pub location: Location,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_name, self.location)
    }
}

/// 重複値1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub original: String,
    pub occurrences: Vec<Occurrence>,
    /// ユーザーが編集する置換テキスト（初期値は original）
    pub replacement: String,
}

impl MatchEntry {
    pub fn new(original: String, occurrences: Vec<Occurrence>) -> Self {
        Self {
            replacement: original.clone(),
            original,
            occurrences,
        }
    }

    /// 重複のない出現箇所数
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }

    /// 置換対象か（空でなく、元の値と異なる）
    pub fn is_pending(&self) -> bool {
        !self.replacement.is_empty() && self.replacement != self.original
    }
}

/// 重複値テーブル（スキャンごとに作り直す）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTable {
    pub entries: Vec<MatchEntry>,
}

impl MatchTable {
    pub fn new(entries: Vec<MatchEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchEntry> {
        self.entries.iter()
    }

    pub fn get(&self, original: &str) -> Option<&MatchEntry> {
        self.entries.iter().find(|e| e.original == original)
    }

    pub fn get_mut(&mut self, original: &str) -> Option<&mut MatchEntry> {
        self.entries.iter_mut().find(|e| e.original == original)
    }

    /// 置換待ちの行数
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// 元の値に対する大文字小文字を区別しない部分一致フィルタ
    pub fn filter<'a>(&'a self, text: &str) -> impl Iterator<Item = (usize, &'a MatchEntry)> + 'a {
        let needle = text.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| needle.is_empty() || e.original.to_lowercase().contains(&needle))
    }
}
