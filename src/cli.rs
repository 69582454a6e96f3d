use crate::config::FailurePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docdupe")]
#[command(about = "Excel/Wordの重複値スキャン・一括置換ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ファイル・フォルダを登録して重複値をスキャン
    Scan {
        /// .xlsx / .docx ファイル、またはフォルダ
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 保存先セッションファイル
        #[arg(short, long, default_value = "docdupe-session.json")]
        output: PathBuf,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 登録ファイルの追加・削除（重複テーブルはクリアされる）
    Files {
        /// セッションファイル
        session: PathBuf,

        /// 追加するファイル・フォルダ
        #[arg(long, num_args = 1..)]
        add: Vec<PathBuf>,

        /// 削除するファイル名
        #[arg(long, num_args = 1..)]
        remove: Vec<String>,

        /// フォルダ追加時にサブフォルダも含める
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 重複テーブルを表示
    Show {
        /// セッションファイル
        session: PathBuf,

        /// 元の値で絞り込み（大文字小文字を区別しない部分一致）
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// 1件の置換テキストを設定
    Set {
        /// セッションファイル
        session: PathBuf,

        /// 元の値
        original: String,

        /// 置換テキスト（空文字で置換しない）
        replacement: String,
    },

    /// 対話式で置換テキストを設定
    Review {
        /// セッションファイル
        session: PathBuf,

        /// 元の値で絞り込み
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// 置換を実行してファイルを上書き保存
    Apply {
        /// セッションファイル
        session: PathBuf,

        /// エラーのファイルを飛ばして続行
        #[arg(long)]
        keep_going: bool,

        /// 結果レポート（JSON）の出力先
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// 設定の表示・変更
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 置換エラー時の方針 (abort/continue)
        #[arg(long)]
        policy: Option<FailurePolicy>,

        /// Excel塗りつぶし色（ARGB 8桁、例: FFFFFF00）
        #[arg(long)]
        sheet_color: Option<String>,

        /// Wordハイライト色名（例: yellow）
        #[arg(long)]
        word_color: Option<String>,
    },
}
