use anyhow::{bail, Context};
use clap::Parser;
use docdupe::{cli, config, logging, replacer, review, session};
use cli::{Cli, Commands};
use config::{Config, FailurePolicy};
use docdupe::scanner::FileFailure;
use docdupe_common::MatchTable;
use indicatif::{ProgressBar, ProgressStyle};
use replacer::{ReplaceEvent, ReplaceOptions, ReplaceSummary, RunOutcome};
use serde::Serialize;
use session::Session;
use std::path::{Path, PathBuf};

/// apply の結果レポート（--report）
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyReport<'a> {
    status: &'static str,
    summary: &'a ReplaceSummary,
    failure: Option<&'a FileFailure>,
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn register_paths(session: &mut Session, paths: &[PathBuf], recursive: bool) -> anyhow::Result<()> {
    for path in paths {
        if path.is_dir() {
            let ids = session.add_folder(path, recursive)?;
            println!("  + {} ({}件)", path.display(), ids.len());
        } else {
            session.add_file(path)?;
            println!("  + {}", path.display());
        }
    }
    Ok(())
}

fn print_failures(failures: &[FileFailure]) {
    for failure in failures {
        println!("  ⚠ {}: {}", failure.path.display(), failure.message);
    }
}

fn print_table(table: &MatchTable, filter: Option<&str>) {
    let rows: Vec<_> = table.filter(filter.unwrap_or("")).collect();
    if rows.is_empty() {
        println!("重複値はありません");
        return;
    }

    for (idx, entry) in rows {
        println!("{:>4}. \"{}\" ×{}", idx + 1, entry.original, entry.count());
        for occurrence in &entry.occurrences {
            println!("        {}", occurrence);
        }
        if entry.is_pending() {
            println!("      → \"{}\"", entry.replacement);
        }
    }
}

fn scan_session(session: &mut Session) -> anyhow::Result<()> {
    let pb = progress_bar(session.files().len() as u64);
    let failures = session.scan_with(|progress| {
        pb.set_message(progress.file.file_name());
        pb.set_position(progress.index as u64);
    })?;
    pb.finish_and_clear();
    print_scan_result(session, &failures);
    Ok(())
}

fn print_scan_result(session: &Session, failures: &[FileFailure]) {
    println!(
        "✔ {}ファイルをスキャン、重複値 {}件",
        session.files().len(),
        session.table().len()
    );
    if !failures.is_empty() {
        println!("⚠ 読み込めなかったファイル: {}件", failures.len());
        print_failures(failures);
    }
}

fn write_report(path: &Path, outcome: &RunOutcome) -> anyhow::Result<()> {
    let report = match outcome {
        RunOutcome::Finished(summary) => ApplyReport {
            status: "finished",
            summary,
            failure: None,
        },
        RunOutcome::Failed { failure, partial } => ApplyReport {
            status: "failed",
            summary: partial,
            failure: Some(failure),
        },
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json)
        .with_context(|| format!("レポートを書き込めません: {}", path.display()))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Scan { paths, output, recursive } => {
            println!("📑 docdupe - 重複スキャン\n");

            println!("[1/3] ファイルを登録中...");
            let mut session = Session::new();
            register_paths(&mut session, &paths, recursive || config.recursive)?;
            println!("✔ {}ファイルを登録\n", session.files().len());

            if session.files().is_empty() {
                bail!("対象ファイル（.xlsx / .docx）が見つかりません");
            }

            println!("[2/3] スキャン中...");
            scan_session(&mut session)?;
            println!();
            print_table(session.table(), None);

            println!("\n[3/3] セッションを保存中...");
            session.save(&output)?;
            println!("✔ 保存: {}", output.display());
        }

        Commands::Files { session: session_path, add, remove, recursive } => {
            let mut session = Session::load(&session_path)?;

            register_paths(&mut session, &add, recursive || config.recursive)?;
            for name in &remove {
                let removed = session.remove_by_name(name)?;
                println!("  - {}", removed.display());
            }

            if !add.is_empty() || !remove.is_empty() {
                session.clear_table()?;
                println!("✔ 登録ファイルを更新しました（重複テーブルは再スキャンが必要です）");
            }

            println!("登録ファイル: {}件", session.files().len());
            for file in session.files().iter() {
                println!("  {} {} [{}]", file.id, file.path.display(), file.kind);
            }
            session.save(&session_path)?;
        }

        Commands::Show { session, filter } => {
            let session = Session::load(&session)?;
            print_table(session.table(), filter.as_deref());
            println!(
                "\n重複値 {}件（置換予定 {}件）",
                session.table().len(),
                session.table().pending_count()
            );
        }

        Commands::Set { session: session_path, original, replacement } => {
            let mut session = Session::load(&session_path)?;
            session.set_replacement(&original, &replacement)?;
            session.save(&session_path)?;
            if replacement.is_empty() || replacement == original {
                println!("✔ \"{}\" は置換しません", original);
            } else {
                println!("✔ \"{}\" → \"{}\"", original, replacement);
            }
        }

        Commands::Review { session, filter } => {
            println!("🔎 docdupe - 置換テキスト設定\n");
            review::run_interactive_review(&session, filter.as_deref())?;
        }

        Commands::Apply { session: session_path, keep_going, report } => {
            println!("✏️  docdupe - 一括置換\n");

            let mut session = Session::load(&session_path)?;
            let pending = session.table().pending_count();
            if pending == 0 {
                println!("置換予定の値がありません");
                return Ok(());
            }

            let mut options = ReplaceOptions::from_config(&config);
            if keep_going {
                options.policy = FailurePolicy::Continue;
            }

            println!("[1/2] {}件の値を置換中...", pending);
            let pb = progress_bar(100);
            let handle = session.start_replace(options)?;
            let outcome = handle.wait_with(|event| match event {
                ReplaceEvent::Progress(percent) => pb.set_position(u64::from(*percent)),
                ReplaceEvent::Status(status) => pb.set_message(status.to_string()),
                ReplaceEvent::FileError(failure) => {
                    pb.println(format!("  ⚠ {}: {}", failure.path.display(), failure.message))
                }
                ReplaceEvent::Finished(_) | ReplaceEvent::Failed { .. } => {}
            })?;
            pb.finish_and_clear();

            let summary = outcome.summary();
            for (path, count) in &summary.per_file {
                println!("  {}: {}セル", path.display(), count);
            }
            println!("✔ 合計 {}セルを置換\n", summary.total);

            if let Some(report_path) = &report {
                write_report(report_path, &outcome)?;
                println!("✔ レポート: {}", report_path.display());
            }

            println!("[2/2] セッションを更新中...");
            let pb = progress_bar(session.files().len() as u64);
            let rescanned = session.finish_replace_with(&outcome, |progress| {
                pb.set_message(progress.file.file_name());
                pb.set_position(progress.index as u64);
            })?;
            pb.finish_and_clear();
            match rescanned {
                Some(failures) => print_scan_result(&session, &failures),
                None => println!("置換テキストは再実行できるようそのまま残します"),
            }
            session.save(&session_path)?;

            match outcome {
                RunOutcome::Finished(summary) if summary.failures.is_empty() => {
                    println!("\n✅ 置換完了");
                }
                RunOutcome::Finished(summary) => {
                    println!("\n⚠ 置換完了（{}件のファイルでエラー）", summary.failures.len());
                    print_failures(&summary.failures);
                }
                RunOutcome::Failed { failure, .. } => {
                    bail!(
                        "置換を中止しました: {}: {}",
                        failure.path.display(),
                        failure.message
                    );
                }
            }
        }

        Commands::Config { show, policy, sheet_color, word_color } => {
            let mut config = config;
            let changed = policy.is_some() || sheet_color.is_some() || word_color.is_some();

            if let Some(policy) = policy {
                config.replace_policy = policy;
            }
            if let Some(color) = sheet_color {
                config.sheet_highlight_argb = color;
            }
            if let Some(color) = word_color {
                config.word_highlight = color;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  置換エラー時: {}", config.replace_policy);
                println!("  Excel塗りつぶし色: {}", config.sheet_highlight_argb);
                println!("  Wordハイライト色: {}", config.word_highlight);
                println!("  サブフォルダ: {}", if config.recursive { "含める" } else { "含めない" });
                if let Ok(path) = Config::config_path() {
                    println!("  設定ファイル: {}", path.display());
                }
            }
        }
    }

    Ok(())
}
