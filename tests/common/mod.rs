//! テスト用フィクスチャ
//!
//! .xlsx は rust_xlsxwriter、.docx は最小構成の zip を直接書いて作る。

#![allow(dead_code)]

use rust_xlsxwriter::{Formula, Workbook};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;

/// (シート名, [(行, 列, 文字列)]) からブックを作る
pub fn write_xlsx(path: &Path, sheets: &[(&str, &[(u32, u16, &str)])]) {
    let mut workbook = Workbook::new();
    for (name, cells) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).expect("シート名設定失敗");
        for (row, col, text) in cells.iter() {
            sheet.write_string(*row, *col, *text).expect("セル書き込み失敗");
        }
    }
    workbook.save(path).expect("xlsx保存失敗");
}

/// A1 に数式（キャッシュ済みの計算結果付き）だけを持つブックを作る
pub fn write_xlsx_formula(path: &Path, sheet_name: &str, formula: &str, cached: &str) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).expect("シート名設定失敗");
    sheet
        .write_formula(0, 0, Formula::new(formula).set_result(cached))
        .expect("数式書き込み失敗");
    workbook.save(path).expect("xlsx保存失敗");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 表 → 行 → セル文字列 から document.xml を作る
pub fn document_xml(tables: &[&[&[&str]]]) -> String {
    let mut body = String::new();
    body.push_str("<w:p><w:r><w:t>本文</w:t></w:r></w:p>");
    for table in tables {
        body.push_str("<w:tbl><w:tblPr/>");
        for row in table.iter() {
            body.push_str("<w:tr>");
            for text in row.iter() {
                body.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p></w:tc>"#,
                    escape(text)
                ));
            }
            body.push_str("</w:tr>");
        }
        body.push_str("</w:tbl>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub fn write_docx(path: &Path, tables: &[&[&[&str]]]) {
    write_docx_xml(path, &document_xml(tables));
}

/// document.xml をそのまま使って docx を作る
pub fn write_docx_xml(path: &Path, document: &str) {
    let file = std::fs::File::create(path).expect("docx作成失敗");
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document.to_string()),
    ];
    for (name, content) in parts {
        zip.start_file(name, options).expect("zipエントリ作成失敗");
        zip.write_all(content.as_bytes()).expect("zip書き込み失敗");
    }
    zip.finish().expect("zip終了失敗");
}

/// docx の word/document.xml を文字列で読む
pub fn read_document_xml(path: &Path) -> String {
    let file = std::fs::File::open(path).expect("docxを開けません");
    let mut archive = zip::ZipArchive::new(file).expect("zipではありません");
    let mut part = archive.by_name("word/document.xml").expect("document.xmlがありません");
    let mut xml = String::new();
    std::io::Read::read_to_string(&mut part, &mut xml).expect("読み込み失敗");
    xml
}

/// calamine でセルの文字列を読む
pub fn read_cell(path: &Path, sheet: &str, row: u32, col: u32) -> Option<String> {
    use calamine::{open_workbook, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path).expect("xlsxを開けません");
    let range = workbook.worksheet_range(sheet).expect("シートがありません");
    range.get_value((row, col)).map(|v| v.to_string())
}

/// umya-spreadsheet でセルの塗りつぶし色（ARGB）を読む
pub fn read_fill(path: &Path, sheet: &str, coordinate: &str) -> Option<String> {
    let book = umya_spreadsheet::reader::xlsx::read(path).expect("xlsxを開けません");
    let sheet = book.get_sheet_by_name(sheet)?;
    let cell = sheet.get_cell(coordinate)?;
    cell.get_style()
        .get_fill()
        .and_then(|fill| fill.get_pattern_fill())
        .and_then(|pattern| pattern.get_foreground_color())
        .map(|color| color.get_argb().to_string())
}

/// umya-spreadsheet でセルの数式を読む（数式でなければ None）
pub fn read_formula(path: &Path, sheet: &str, coordinate: &str) -> Option<String> {
    let book = umya_spreadsheet::reader::xlsx::read(path).expect("xlsxを開けません");
    let cell = book.get_sheet_by_name(sheet)?.get_cell(coordinate)?;
    cell.is_formula().then(|| cell.get_formula().to_string())
}
