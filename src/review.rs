//! 対話式レビュー
//!
//! 重複テーブルを1行ずつ表示し、置換テキストを入力してもらう。

use crate::error::{DocDupeError, Result};
use crate::session::Session;
use dialoguer::Input;
use docdupe_common::MatchEntry;
use std::path::Path;

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// 現在の置換テキストのまま
    Keep,
    /// 置換テキストを設定
    Replace(String),
    /// この値は置換しない（元の値に戻す）
    Skip,
    /// 保存して終了
    Quit,
}

/// 入力文字列をアクションに変換
pub fn parse_action(input: &str) -> ReviewAction {
    match input.trim() {
        "" => ReviewAction::Keep,
        "s" | "S" => ReviewAction::Skip,
        "q" | "Q" => ReviewAction::Quit,
        // 前後の空白は値の一部として残す
        _ => ReviewAction::Replace(input.to_string()),
    }
}

/// 出現箇所の一覧（表示用）
pub fn describe_occurrences(entry: &MatchEntry) -> String {
    entry
        .occurrences
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 対話式で置換テキストを設定し、セッションファイルに保存する
pub fn run_interactive_review(session_path: &Path, filter: Option<&str>) -> Result<()> {
    let mut session = Session::load(session_path)?;

    let rows: Vec<usize> = session
        .table()
        .filter(filter.unwrap_or(""))
        .map(|(idx, _)| idx)
        .collect();

    if rows.is_empty() {
        println!("✓ 対象の重複値はありません");
        return Ok(());
    }

    println!("🔎 重複値: {}件", rows.len());
    println!("---");
    println!("操作: [Enter]そのまま [テキスト]置換 [s]置換しない [q]保存して終了");
    println!("---\n");

    for (count, &idx) in rows.iter().enumerate() {
        let entry = &session.table().entries[idx];
        println!(
            "[{}/{}] \"{}\" ×{}",
            count + 1,
            rows.len(),
            entry.original,
            entry.count()
        );
        println!("  出現箇所: {}", describe_occurrences(entry));
        if entry.is_pending() {
            println!("  現在の置換: \"{}\"", entry.replacement);
        }

        match prompt_review_action()? {
            ReviewAction::Keep => println!("  → そのまま\n"),
            ReviewAction::Replace(text) => {
                session.set_replacement_at(idx, &text)?;
                println!("  → \"{}\"\n", text);
            }
            ReviewAction::Skip => {
                let original = session.table().entries[idx].original.clone();
                session.set_replacement_at(idx, &original)?;
                println!("  → 置換しない\n");
            }
            ReviewAction::Quit => {
                println!("保存して終了します...");
                break;
            }
        }
    }

    session.save(session_path)?;
    println!(
        "\n✓ 保存しました: {}（置換予定 {}件）",
        session_path.display(),
        session.table().pending_count()
    );

    Ok(())
}

fn prompt_review_action() -> Result<ReviewAction> {
    let input: String = Input::new()
        .with_prompt("置換テキスト (s:置換しない q:終了)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| DocDupeError::Prompt(e.to_string()))?;

    Ok(parse_action(&input))
}
