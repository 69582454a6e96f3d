use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocDupeError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("未対応のファイル形式です（.xlsx / .docx のみ）: {0}")]
    UnsupportedFormat(String),

    #[error("ファイルを開けません {path}: {reason}")]
    FileOpen { path: PathBuf, reason: String },

    #[error("{path} に位置 '{location}' が見つかりません")]
    LocationNotFound { path: PathBuf, location: String },

    #[error("ファイル名 '{name}' が複数の登録ファイルに一致します: {}", join_paths(.candidates))]
    AmbiguousFile { name: String, candidates: Vec<PathBuf> },

    #[error("登録されていないファイルです: {0}")]
    UnknownFile(String),

    #[error("重複値が見つかりません: {0}")]
    UnknownValue(String),

    #[error("保存エラー {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    #[error("置換処理の実行中です。完了までお待ちください")]
    ReplaceInProgress,

    #[error("置換ワーカーとの接続が切れました")]
    WorkerDisconnected,

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] docdupe_common::Error),
}

impl DocDupeError {
    pub(crate) fn open(path: &std::path::Path, reason: impl ToString) -> Self {
        DocDupeError::FileOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn save(path: &std::path::Path, reason: impl ToString) -> Self {
        DocDupeError::Save {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, DocDupeError>;
