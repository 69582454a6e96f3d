//! ドキュメントアクセス
//!
//! 形式ごとの読み書きアダプタ。スキャナと置換エンジンは
//! `DocumentKind::format()` 経由でのみ触り、拡張子の判定を繰り返さない。

pub mod docx;
pub mod xlsx;

use crate::config::Highlight;
use crate::error::Result;
use docdupe_common::{DocumentKind, Location};
use std::path::Path;

/// セル（またはWordの表セル）から読み出した値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundValue {
    pub value: String,
    pub location: Location,
}

/// 形式ごとの読み書き契約
pub trait DocumentFormat: Send + Sync {
    /// 空でないセル値を位置付きで列挙する
    fn enumerate_values(&self, path: &Path) -> Result<Vec<FoundValue>>;

    /// `location` 内で全文一致するセルを置換してハイライトし、1回だけ保存する
    ///
    /// 戻り値は変更したセル数
    fn replace_value(
        &self,
        path: &Path,
        location: &Location,
        original: &str,
        new: &str,
        highlight: &Highlight,
    ) -> Result<usize>;
}

static SPREADSHEET: xlsx::SpreadsheetFormat = xlsx::SpreadsheetFormat;
static WORD: docx::WordFormat = docx::WordFormat;

/// 種別から実装を引く
pub trait FormatExt {
    fn format(&self) -> &'static dyn DocumentFormat;
}

impl FormatExt for DocumentKind {
    fn format(&self) -> &'static dyn DocumentFormat {
        match self {
            DocumentKind::Spreadsheet => &SPREADSHEET,
            DocumentKind::WordProcessing => &WORD,
        }
    }
}
