//! Excel（.xlsx）アダプタ
//!
//! umya-spreadsheet で読み込み、シート単位でセルを書き換えて保存する。

use super::{DocumentFormat, FoundValue};
use crate::config::Highlight;
use crate::error::{DocDupeError, Result};
use docdupe_common::Location;
use std::path::Path;
use umya_spreadsheet::{Cell, PatternValues, Spreadsheet, Worksheet};

pub struct SpreadsheetFormat;

fn open_book(path: &Path) -> Result<Spreadsheet> {
    if !path.exists() {
        return Err(DocDupeError::FileNotFound(path.display().to_string()));
    }
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| DocDupeError::open(path, e))
}

/// 行→列の順に並べたセル一覧
fn sorted_cells(sheet: &Worksheet) -> Vec<&Cell> {
    let mut cells = sheet.get_cell_collection();
    cells.sort_by_key(|cell| {
        let coord = cell.get_coordinate();
        (*coord.get_row_num(), *coord.get_col_num())
    });
    cells
}

/// セルの生の値。数式セルはキャッシュされた計算結果ではなく "=..." の数式文字列
fn raw_value(cell: &Cell) -> String {
    if cell.is_formula() {
        format!("={}", cell.get_formula().trim_start_matches('='))
    } else {
        cell.get_value().to_string()
    }
}

fn apply_fill(cell: &mut Cell, argb: &str) {
    let pattern = cell.get_style_mut().get_fill_mut().get_pattern_fill_mut();
    pattern.set_pattern_type(PatternValues::Solid);
    pattern.get_foreground_color_mut().set_argb(argb);
    pattern.get_background_color_mut().set_argb(argb);
}

impl DocumentFormat for SpreadsheetFormat {
    fn enumerate_values(&self, path: &Path) -> Result<Vec<FoundValue>> {
        let book = open_book(path)?;
        let mut found = Vec::new();

        for sheet in book.get_sheet_collection() {
            let name = sheet.get_name().to_string();
            for cell in sorted_cells(sheet) {
                let value = raw_value(cell);
                if value.is_empty() {
                    continue;
                }
                found.push(FoundValue {
                    value: value.to_string(),
                    location: Location::Sheet(name.clone()),
                });
            }
        }

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
        let Location::Sheet(sheet_name) = location else {
            return Err(DocDupeError::LocationNotFound {
                path: path.to_path_buf(),
                location: location.to_string(),
            });
        };

        let mut book = open_book(path)?;
        let sheet = book
            .get_sheet_by_name_mut(sheet_name)
            .ok_or_else(|| DocDupeError::LocationNotFound {
                path: path.to_path_buf(),
                location: sheet_name.clone(),
            })?;

        let mut replaced = 0;
        for cell in sheet.get_cell_collection_mut() {
            if raw_value(cell) != original {
                continue;
            }
            cell.set_value_string(new);
            apply_fill(cell, &highlight.sheet_argb);
            replaced += 1;
        }

        if replaced > 0 {
            umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|e| DocDupeError::save(path, e))?;
        }
        tracing::debug!(path = %path.display(), sheet = %sheet_name, replaced, "xlsx replaced");

        Ok(replaced)
    }
}
