//! docdupe
//!
//! Excel（.xlsx）とWord（.docx）の表から重複している値を探し、
//! 値ごとに置換テキストを設定して元のファイルへ一括で書き戻す。

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod replacer;
pub mod review;
pub mod scanner;
pub mod session;
