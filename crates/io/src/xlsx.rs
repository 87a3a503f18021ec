// Excel row source (xlsx, xls, xlsb, ods) and XLSX export writer

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use stocktake_recon::export::{ExportCell, ExportTable};
use stocktake_recon::RawRow;

use crate::error::IoError;

/// Read the first worksheet. Row 1 is the header row.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, IoError> {
    let workbook_err = |message: String| IoError::Workbook {
        path: path.display().to_string(),
        message,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| workbook_err(format!("failed to open: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| workbook_err("workbook contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| workbook_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .ok_or_else(|| IoError::NoHeader {
            path: path.display().to_string(),
        })?
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for cells in rows_iter {
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(cells.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, cell)| (h.clone(), cell_text(cell)))
            .collect();
        if fields.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(RawRow { fields });
    }

    Ok(rows)
}

/// Cell value as the text a user would see for quantities and codes.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        // Format nicely: integers without decimals, so GTINs stay intact
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => format!("{n}"),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
    }
}

/// Write one table to a single-sheet workbook with a bold, frozen header row.
pub fn write_table(table: &ExportTable, path: &Path) -> Result<(), IoError> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| IoError::Workbook {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet().set_name(table.sheet).map_err(xlsx_err)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(xlsx_err)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        // rust_xlsxwriter uses 0-based row/col as u32/u16
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            match cell {
                ExportCell::Text(s) if s.is_empty() => {}
                ExportCell::Text(s) => {
                    worksheet.write_string(row32, col16, s).map_err(xlsx_err)?;
                }
                ExportCell::Number(n) => {
                    worksheet.write_number(row32, col16, *n).map_err(xlsx_err)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}
