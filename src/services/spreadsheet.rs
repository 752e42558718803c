// src/services/spreadsheet.rs
//
// Leitura das planilhas exportadas pelo ERP (.xls/.xlsx) com calamine.

use std::{io::Cursor, path::Path};

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};

use crate::{
    common::error::AppError,
    models::dataset::{format_number, Dataset, Value},
    services::coercion::{excel_serial_to_datetime, parse_datetime},
};

/// Lê a aba pedida de um arquivo enviado por upload.
pub fn read_sheet_from_bytes(bytes: Vec<u8>, file_name: &str, sheet: &str) -> Result<Dataset, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| AppError::Spreadsheet(format!("{file_name}: {e}")))?;
    let names = workbook.sheet_names();
    let name = pick_sheet(&names, sheet).ok_or_else(|| AppError::SheetNotFound {
        file: file_name.to_string(),
        sheet: sheet.to_string(),
    })?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| AppError::Spreadsheet(format!("{file_name}: {e}")))?;
    Ok(range_to_dataset(&range))
}

/// Lê a aba pedida de um arquivo em disco (pasta de downloads do robô).
pub fn read_sheet_from_path(path: &Path, sheet: &str) -> Result<Dataset, AppError> {
    let file_name = path.display().to_string();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::Spreadsheet(format!("{file_name}: {e}")))?;
    let names = workbook.sheet_names();
    let name = pick_sheet(&names, sheet).ok_or_else(|| AppError::SheetNotFound {
        file: file_name.clone(),
        sheet: sheet.to_string(),
    })?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| AppError::Spreadsheet(format!("{file_name}: {e}")))?;
    Ok(range_to_dataset(&range))
}

// Nome exato primeiro; depois ignora espaços nas pontas e maiúsculas.
fn pick_sheet(names: &[String], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|n| n.as_str() == wanted)
        .or_else(|| names.iter().find(|n| n.trim().eq_ignore_ascii_case(wanted.trim())))
        .cloned()
}

/// Primeira linha = cabeçalho; demais linhas = dados. Linhas vazias são descartadas.
pub fn range_to_dataset(range: &Range<Data>) -> Dataset {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Dataset::empty();
    };

    let columns: Vec<String> = header.iter().map(header_text).collect();
    let mut data = Dataset::new(columns);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_blank) {
            continue;
        }
        data.push_row(values);
    }
    data
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

pub fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Integer(*i),
        Data::Bool(b) => Value::Text(if *b { "S".into() } else { "N".into() }),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()).map_or(Value::Null, Value::Date),
        Data::DateTimeIso(s) => parse_datetime(s, None).map_or_else(|| Value::Text(s.clone()), Value::Date),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
