//! Word（.docx）アダプタ
//!
//! docx は zip + WordprocessingML。`word/document.xml` をイベント単位で読み、
//! 最上位の表のセル（w:tc）だけをバッファして判定・書き換えする。
//! 入れ子の表の文字は外側のセルの文字に含めない。

use super::{DocumentFormat, FoundValue};
use crate::config::Highlight;
use crate::error::{DocDupeError, Result};
use docdupe_common::Location;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const DOCUMENT_PART: &str = "word/document.xml";

pub struct WordFormat;

/// zipエントリ（順序と圧縮方式を保持）
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// 表の走査結果
#[derive(Debug, Default, Clone, Copy)]
struct CellStats {
    tables: usize,
    replaced: usize,
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    if !path.exists() {
        return Err(DocDupeError::FileNotFound(path.display().to_string()));
    }
    let file = File::open(path).map_err(|e| DocDupeError::open(path, e))?;
    zip::ZipArchive::new(file).map_err(|e| DocDupeError::open(path, e))
}

fn read_document_part(path: &Path) -> Result<Vec<u8>> {
    let mut archive = open_archive(path)?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| DocDupeError::open(path, format!("{}: {}", DOCUMENT_PART, e)))?;
    let mut data = Vec::new();
    part.read_to_end(&mut data).map_err(|e| DocDupeError::open(path, e))?;
    Ok(data)
}

fn read_package(path: &Path) -> Result<Vec<PackageEntry>> {
    let mut archive = open_archive(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| DocDupeError::open(path, e))?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(|e| DocDupeError::open(path, e))?;
        entries.push(PackageEntry {
            name: entry.name().to_string(),
            data,
            compression: entry.compression(),
            is_dir: entry.is_dir(),
        });
    }
    Ok(entries)
}

/// 同じフォルダの一時ファイルに書いてから元のパスへ置き換える
fn write_package(path: &Path, entries: &[PackageEntry]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DocDupeError::save(path, e))?;

    {
        let mut zip = zip::ZipWriter::new(tmp.as_file_mut());
        for entry in entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)
                    .map_err(|e| DocDupeError::save(path, e))?;
                continue;
            }
            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| DocDupeError::save(path, e))?;
            zip.write_all(&entry.data).map_err(|e| DocDupeError::save(path, e))?;
        }
        zip.finish().map_err(|e| DocDupeError::save(path, e))?;
    }

    tmp.persist(path).map_err(|e| DocDupeError::save(path, e.error))?;
    Ok(())
}

fn xml_err<E: std::fmt::Display>(e: E) -> String {
    format!("XML: {}", e)
}

enum Mark {
    OpenCell,
    CloseCell,
    OpenTable,
    CloseTable,
    Other,
}

fn mark(event: &Event) -> Mark {
    match event {
        Event::Start(e) => match e.local_name().as_ref() {
            b"tc" => Mark::OpenCell,
            b"tbl" => Mark::OpenTable,
            _ => Mark::Other,
        },
        Event::End(e) => match e.local_name().as_ref() {
            b"tc" => Mark::CloseCell,
            b"tbl" => Mark::CloseTable,
            _ => Mark::Other,
        },
        _ => Mark::Other,
    }
}

/// 最上位の表の各セルについて `on_cell(トリム済みテキスト)` を呼び、
/// `Some(new)` が返ったセルを書き換えたXMLを返す
fn rewrite_cells<F>(
    xml: &[u8],
    highlight: &str,
    mut on_cell: F,
) -> std::result::Result<(Vec<u8>, CellStats), String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut stats = CellStats::default();

    let mut table_depth: usize = 0;
    let mut cell: Option<Vec<Event<'static>>> = None;
    let mut cell_depth: usize = 0;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_err)?;
        if matches!(event, Event::Eof) {
            break;
        }
        let kind = mark(&event);

        if let Some(events) = cell.as_mut() {
            match kind {
                Mark::OpenCell => cell_depth += 1,
                Mark::CloseCell => cell_depth -= 1,
                _ => {}
            }
            events.push(event.into_owned());
            if cell_depth == 0 {
                if let Some(events) = cell.take() {
                    flush_cell(&mut writer, events, highlight, &mut on_cell, &mut stats)?;
                }
            }
        } else {
            match kind {
                Mark::OpenTable => {
                    table_depth += 1;
                    if table_depth == 1 {
                        stats.tables += 1;
                    }
                }
                Mark::CloseTable => table_depth = table_depth.saturating_sub(1),
                Mark::OpenCell if table_depth == 1 => {
                    cell = Some(vec![event.into_owned()]);
                    cell_depth = 1;
                    buf.clear();
                    continue;
                }
                _ => {}
            }
            writer.write_event(event).map_err(xml_err)?;
        }
        buf.clear();
    }

    if cell.is_some() {
        return Err(xml_err("unterminated table cell"));
    }

    Ok((writer.into_inner(), stats))
}

fn flush_cell<F>(
    writer: &mut Writer<Vec<u8>>,
    events: Vec<Event<'static>>,
    highlight: &str,
    on_cell: &mut F,
    stats: &mut CellStats,
) -> std::result::Result<(), String>
where
    F: FnMut(&str) -> Option<String>,
{
    let text = cell_text(&events)?;
    match on_cell(text.trim()) {
        Some(new) => {
            write_replaced_cell(writer, &events, &new, highlight)?;
            stats.replaced += 1;
        }
        None => {
            for event in events {
                writer.write_event(event).map_err(xml_err)?;
            }
        }
    }
    Ok(())
}

/// セル直下の段落テキストを改行で連結する
fn cell_text(events: &[Event<'static>]) -> std::result::Result<String, String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut nested: usize = 0;
    let mut in_run = false;
    let mut in_text = false;

    for event in events {
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                // 入れ子の表とテキストボックスの中身はセルの文字に含めない
                b"tbl" | b"txbxContent" => nested += 1,
                _ if nested > 0 => {}
                b"p" => current = Some(String::new()),
                b"r" => in_run = true,
                b"t" if in_run => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" => nested = nested.saturating_sub(1),
                _ if nested > 0 => {}
                b"p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if nested == 0 => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_run => push_char(&mut current, '\t'),
                b"br" | b"cr" if in_run => push_char(&mut current, '\n'),
                _ => {}
            },
            Event::Text(t) if in_text && nested == 0 => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(c) if in_text && nested == 0 => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&String::from_utf8_lossy(c));
                }
            }
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn push_char(current: &mut Option<String>, c: char) {
    if let Some(p) = current.as_mut() {
        p.push(c);
    }
}

/// 名前空間プレフィックス付きの要素名（"w:" など）
fn prefixed(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// w:tcPr を残し、本文を「ハイライト付きの1段落・1ラン」に置き換える
fn write_replaced_cell(
    writer: &mut Writer<Vec<u8>>,
    events: &[Event<'static>],
    new: &str,
    highlight: &str,
) -> std::result::Result<(), String> {
    let (Some(open), Some(close)) = (events.first(), events.last()) else {
        return Err(xml_err("malformed table cell"));
    };
    let Event::Start(start) = open else {
        return Err(xml_err("malformed table cell"));
    };
    let qualified = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let prefix = qualified
        .rsplit_once(':')
        .map(|(p, _)| p.to_string())
        .unwrap_or_default();
    let tag = |local: &str| prefixed(&prefix, local);

    writer.write_event(open.clone()).map_err(xml_err)?;

    // 最初の子要素が w:tcPr ならそのまま残す
    let mut children = events[1..events.len() - 1]
        .iter()
        .skip_while(|e| matches!(e, Event::Text(_)));
    if let Some(first) = children.next() {
        match first {
            Event::Empty(e) if e.local_name().as_ref() == b"tcPr" => {
                writer.write_event(first.clone()).map_err(xml_err)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"tcPr" => {
                writer.write_event(first.clone()).map_err(xml_err)?;
                for inner in children {
                    writer.write_event(inner.clone()).map_err(xml_err)?;
                    if let Event::End(end) = inner {
                        if end.local_name().as_ref() == b"tcPr" {
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let p = tag("p");
    let r = tag("r");
    let rpr = tag("rPr");
    let t = tag("t");
    let val = tag("val");

    writer.write_event(Event::Start(BytesStart::new(p.as_str()))).map_err(xml_err)?;
    writer.write_event(Event::Start(BytesStart::new(r.as_str()))).map_err(xml_err)?;
    writer.write_event(Event::Start(BytesStart::new(rpr.as_str()))).map_err(xml_err)?;
    writer
        .write_event(Event::Empty(
            BytesStart::new(tag("highlight")).with_attributes([(val.as_str(), highlight)]),
        ))
        .map_err(xml_err)?;
    writer.write_event(Event::End(BytesEnd::new(rpr.as_str()))).map_err(xml_err)?;

    for (line_idx, line) in new.split('\n').enumerate() {
        if line_idx > 0 {
            writer.write_event(Event::Empty(BytesStart::new(tag("br")))).map_err(xml_err)?;
        }
        for (seg_idx, segment) in line.split('\t').enumerate() {
            if seg_idx > 0 {
                writer.write_event(Event::Empty(BytesStart::new(tag("tab")))).map_err(xml_err)?;
            }
            if segment.is_empty() {
                continue;
            }
            writer
                .write_event(Event::Start(
                    BytesStart::new(t.as_str()).with_attributes([("xml:space", "preserve")]),
                ))
                .map_err(xml_err)?;
            writer.write_event(Event::Text(BytesText::new(segment))).map_err(xml_err)?;
            writer.write_event(Event::End(BytesEnd::new(t.as_str()))).map_err(xml_err)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(r.as_str()))).map_err(xml_err)?;
    writer.write_event(Event::End(BytesEnd::new(p.as_str()))).map_err(xml_err)?;
    writer.write_event(close.clone()).map_err(xml_err)?;
    Ok(())
}

impl DocumentFormat for WordFormat {
    fn enumerate_values(&self, path: &Path) -> Result<Vec<FoundValue>> {
        let xml = read_document_part(path)?;
        let mut found = Vec::new();
        rewrite_cells(&xml, "", |text| {
            if !text.is_empty() {
                found.push(FoundValue {
                    value: text.to_string(),
                    location: Location::Tables,
                });
            }
            None
        })
        .map_err(|e| DocDupeError::open(path, e))?;
        Ok(found)
    }

    fn replace_value(
        &self,
        path: &Path,
        location: &Location,
        original: &str,
        new: &str,
        highlight: &Highlight,
    ) -> Result<usize> {
        if *location != Location::Tables {
            return Err(DocDupeError::LocationNotFound {
                path: path.to_path_buf(),
                location: location.to_string(),
            });
        }

        let mut entries = read_package(path)?;
        let part = entries
            .iter_mut()
            .find(|e| e.name == DOCUMENT_PART)
            .ok_or_else(|| DocDupeError::open(path, format!("{} がありません", DOCUMENT_PART)))?;

        let (xml, stats) = rewrite_cells(&part.data, &highlight.word_color, |text| {
            (text == original).then(|| new.to_string())
        })
        .map_err(|e| DocDupeError::open(path, e))?;

        if stats.tables == 0 {
            return Err(DocDupeError::LocationNotFound {
                path: path.to_path_buf(),
                location: location.to_string(),
            });
        }

        if stats.replaced > 0 {
            part.data = xml;
            write_package(path, &entries)?;
        }
        tracing::debug!(path = %path.display(), replaced = stats.replaced, "docx replaced");

        Ok(stats.replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {}><w:body>{}</w:body></w:document>"#,
            NS, inner
        )
    }

    fn cell(text: &str) -> String {
        format!(
            r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>"#,
            text
        )
    }

    fn collect(xml: &str) -> Vec<String> {
        let mut out = Vec::new();
        rewrite_cells(xml.as_bytes(), "", |t| {
            out.push(t.to_string());
            None
        })
        .unwrap();
        out
    }

    #[test]
    fn test_cell_texts_are_trimmed() {
        let xml = body(&format!(
            "<w:tbl><w:tr>{}{}</w:tr></w:tbl>",
            cell("  N/A "),
            cell("Total")
        ));
        assert_eq!(collect(&xml), vec!["N/A", "Total"]);
    }

    #[test]
    fn test_paragraph_outside_table_ignored() {
        let xml = body(&format!(
            "<w:p><w:r><w:t>Intro</w:t></w:r></w:p><w:tbl><w:tr>{}</w:tr></w:tbl>",
            cell("Only")
        ));
        assert_eq!(collect(&xml), vec!["Only"]);
    }

    #[test]
    fn test_multiple_runs_and_paragraphs() {
        let xml = body(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Grand</w:t></w:r><w:r><w:t xml:space="preserve"> Total</w:t></w:r></w:p><w:p><w:r><w:t>2024</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(collect(&xml), vec!["Grand Total\n2024"]);
    }

    #[test]
    fn test_tab_stops_in_paragraph_properties_ignored() {
        let xml = body(
            r#"<w:tbl><w:tr><w:tc><w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(collect(&xml), vec!["A\tB"]);
    }

    #[test]
    fn test_nested_table_text_excluded_from_outer_cell() {
        let xml = body(&format!(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Outer</w:t></w:r></w:p><w:tbl><w:tr>{}</w:tr></w:tbl><w:p/></w:tc></w:tr></w:tbl>",
            cell("Inner")
        ));
        assert_eq!(collect(&xml), vec!["Outer"]);
    }

    #[test]
    fn test_text_box_paragraphs_excluded_from_cell() {
        let xml = body(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Before</w:t></w:r><w:r><w:pict><v:shape><v:textbox><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></w:r><w:r><w:t xml:space="preserve"> after</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(collect(&xml), vec!["Before after"]);
    }

    #[test]
    fn test_escaped_text_unescaped() {
        let xml = body(&format!("<w:tbl><w:tr>{}</w:tr></w:tbl>", cell("R&amp;D")));
        assert_eq!(collect(&xml), vec!["R&D"]);
    }

    #[test]
    fn test_replace_keeps_properties_and_highlights() {
        let xml = body(&format!(
            "<w:tbl><w:tr>{}{}</w:tr></w:tbl>",
            cell("N/A"),
            cell("Keep")
        ));
        let (out, stats) = rewrite_cells(xml.as_bytes(), "yellow", |t| {
            (t == "N/A").then(|| "None & more".to_string())
        })
        .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(stats.tables, 1);
        assert_eq!(stats.replaced, 1);
        assert!(out.contains(r#"<w:tcW w:w="2000" w:type="dxa"/>"#));
        assert!(out.contains(r#"<w:highlight w:val="yellow"/>"#));
        assert!(out.contains("None &amp; more"));
        assert!(out.contains("<w:t>Keep</w:t>"));
        assert!(!out.contains(">N/A<"));

        assert_eq!(collect(&out), vec!["None & more", "Keep"]);
    }

    #[test]
    fn test_replace_multiline_uses_breaks() {
        let xml = body(&format!("<w:tbl><w:tr>{}</w:tr></w:tbl>", cell("x")));
        let (out, _) = rewrite_cells(xml.as_bytes(), "yellow", |_| Some("a\nb".into())).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("<w:br/>"));
        assert_eq!(collect(&out), vec!["a\nb"]);
    }

    #[test]
    fn test_no_tables_counted() {
        let xml = body("<w:p><w:r><w:t>text</w:t></w:r></w:p>");
        let (_, stats) = rewrite_cells(xml.as_bytes(), "yellow", |_| None).unwrap();
        assert_eq!(stats.tables, 0);
    }
}
