//! セッションテスト
//!
//! ファイル登録、実行中ガード、保存と読み込みを検証

mod common;

use common::write_xlsx;
use docdupe::error::DocDupeError;
use docdupe::replacer::ReplaceOptions;
use docdupe::session::Session;
use tempfile::tempdir;

/// 同じパスを2回登録しても1件
#[test]
fn test_duplicate_registration_ignored() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.xlsx");
    write_xlsx(&a, &[("Sheet1", &[(0, 0, "Alpha")])]);

    let mut session = Session::new();
    let first = session.add_file(&a).unwrap();
    let second = session.add_file(&dir.path().join(".").join("a.xlsx")).unwrap();

    assert_eq!(first, second);
    assert_eq!(session.files().len(), 1);
}

/// 同名ファイルが複数あるとファイル名での削除は曖昧エラー
#[test]
fn test_remove_by_ambiguous_name() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("2024")).unwrap();
    std::fs::create_dir_all(dir.path().join("2025")).unwrap();
    let old = dir.path().join("2024").join("report.xlsx");
    let new = dir.path().join("2025").join("report.xlsx");
    write_xlsx(&old, &[("Sheet1", &[(0, 0, "Alpha")])]);
    write_xlsx(&new, &[("Sheet1", &[(0, 0, "Alpha")])]);

    let mut session = Session::new();
    session.add_file(&old).unwrap();
    session.add_file(&new).unwrap();

    let result = session.remove_by_name("report.xlsx");
    assert!(matches!(result, Err(DocDupeError::AmbiguousFile { .. })));
    assert_eq!(session.files().len(), 2);

    // パス指定なら削除できる
    assert!(session.remove_file(&old).unwrap());
    let removed = session.remove_by_name("report.xlsx").unwrap();
    assert!(removed.ends_with("2025/report.xlsx"));
    assert!(session.files().is_empty());
}

/// 置換中は変更系の操作を受け付けない
#[test]
fn test_mutations_rejected_while_replacing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    write_xlsx(&a, &[("Sheet1", &[(0, 0, "Alpha")])]);
    write_xlsx(&b, &[("Sheet1", &[(0, 0, "Alpha")])]);

    let mut session = Session::new();
    session.add_file(&a).unwrap();
    session.add_file(&b).unwrap();
    session.scan().unwrap();
    session.set_replacement("Alpha", "Beta").unwrap();

    let handle = session.start_replace(ReplaceOptions::default()).unwrap();

    // ワーカーが終わっていなければ拒否される
    if session.is_busy() {
        assert!(matches!(
            session.start_replace(ReplaceOptions::default()),
            Err(DocDupeError::ReplaceInProgress)
        ));
    }

    let outcome = handle.wait().unwrap();
    assert!(outcome.is_finished());
    assert!(!session.is_busy());

    // 終了後は再び操作できる
    session.scan().unwrap();
    assert!(session.table().get("Beta").is_some());
}

/// 保存したセッションを読み込むと置換テキストも復元される
#[test]
fn test_session_roundtrip_keeps_replacements() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    write_xlsx(&a, &[("Sheet1", &[(0, 0, "Alpha")])]);
    write_xlsx(&b, &[("Sheet1", &[(0, 0, "Alpha")])]);

    let mut session = Session::new();
    session.add_file(&a).unwrap();
    session.add_file(&b).unwrap();
    session.scan().unwrap();
    session.set_replacement("Alpha", "Beta").unwrap();

    let path = dir.path().join("session.json");
    session.save(&path).unwrap();

    let mut loaded = Session::load(&path).unwrap();
    assert_eq!(loaded.files().len(), 2);
    assert_eq!(loaded.table().pending_count(), 1);
    assert_eq!(loaded.table().get("Alpha").unwrap().replacement, "Beta");

    // ID は再利用されない
    loaded.remove_by_name("b.xlsx").unwrap();
    let c = dir.path().join("c.xlsx");
    write_xlsx(&c, &[("Sheet1", &[(0, 0, "Alpha")])]);
    let id = loaded.add_file(&c).unwrap();
    assert_eq!(id.0, 2);
}

/// 存在しないセッションファイル
#[test]
fn test_load_missing_session() {
    let result = Session::load(std::path::Path::new("/nonexistent/session.json"));
    assert!(matches!(result, Err(DocDupeError::FileNotFound(_))));
}

/// `..` を含むパスで同じファイルを登録しても1件で、値は重複扱いにならない
#[test]
fn test_same_file_via_parent_dir_registered_once() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    let a = dir.path().join("a.xlsx");
    write_xlsx(&a, &[("Sheet1", &[(0, 0, "OnlyOnce")])]);

    let mut session = Session::new();
    let first = session.add_file(&a).unwrap();
    let second = session
        .add_file(&dir.path().join("sub").join("..").join("a.xlsx"))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(session.files().len(), 1);

    session.scan().unwrap();
    assert!(session.table().is_empty());

    // `..` 付きのパスでも削除できる
    assert!(session
        .remove_file(&dir.path().join("sub").join("..").join("a.xlsx"))
        .unwrap());
    assert!(session.files().is_empty());
}

/// まとめて登録するとき、1件でも登録できなければ何も追加しない
#[test]
fn test_add_all_is_all_or_nothing() {
    use docdupe::session::FileSet;

    let dir = tempdir().expect("Failed to create temp dir");
    let a = dir.path().join("a.xlsx");
    write_xlsx(&a, &[("Sheet1", &[(0, 0, "Alpha")])]);
    let missing = dir.path().join("missing.docx");

    let mut files = FileSet::default();
    let result = files.add_all(&[a.clone(), missing]);

    assert!(matches!(result, Err(DocDupeError::FileNotFound(_))));
    assert!(files.is_empty());

    let ids = files.add_all(&[a.clone(), a]).unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
    assert_eq!(files.len(), 1);
}
