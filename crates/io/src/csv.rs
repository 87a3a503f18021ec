// CSV/TSV row source and export writer

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use stocktake_recon::export::{ExportCell, ExportTable};
use stocktake_recon::RawRow;

use crate::error::IoError;

pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    rows_from_str(&content, delimiter).map_err(|message| IoError::Csv {
        path: path.display().to_string(),
        message,
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed. Spreadsheet exports from Excel
/// on Windows are usually Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read {
        path: path.display().to_string(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// First record is the header row; blank records are skipped.
fn rows_from_str(content: &str, delimiter: u8) -> Result<Vec<RawRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(RawRow { fields });
    }

    Ok(rows)
}

pub fn write_table(table: &ExportTable, path: &Path) -> Result<(), IoError> {
    let csv_err = |e: csv::Error| IoError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut writer = csv::WriterBuilder::new().from_path(path).map_err(csv_err)?;

    writer.write_record(&table.headers).map_err(csv_err)?;
    for row in &table.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                ExportCell::Text(s) => s.clone(),
                ExportCell::Number(n) => n.to_string(),
            })
            .collect();
        writer.write_record(&fields).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_semicolon() {
        let content = "Local;GTIN;Lote\nA1;111;L1\nA2;222;L2\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_defaults_to_comma() {
        assert_eq!(sniff_delimiter(""), b',');
        assert_eq!(sniff_delimiter("single\nvalue\n"), b',');
    }

    #[test]
    fn rows_keyed_by_header() {
        let content = "Local,GTIN,Lote,Quantidade_Contada\nA1,111,L1,4\n,,,\nA2,222,,1.5\n";
        let rows = rows_from_str(content, b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Local"), Some("A1"));
        assert_eq!(rows[0].get("Quantidade_Contada"), Some("4"));
        assert_eq!(rows[1].get("Lote"), Some(""));
    }

    #[test]
    fn short_records_are_tolerated() {
        let content = "Local,GTIN,Lote\nA1,111\n";
        let rows = rows_from_str(content, b',').unwrap();
        assert_eq!(rows[0].get("Lote"), None);
    }

    #[test]
    fn windows_1252_and_bom() {
        let dir = tempfile::tempdir().unwrap();
        let latin = dir.path().join("latin.csv");
        // "Localização" in Windows-1252
        let mut bytes = b"Localiza\xe7\xe3o;GTIN\nA1;111\n".to_vec();
        std::fs::write(&latin, &bytes).unwrap();
        let rows = read_rows(&latin).unwrap();
        assert_eq!(rows[0].get("Localização"), Some("A1"));

        let bom = dir.path().join("bom.csv");
        bytes = "\u{feff}Local,GTIN\nA1,111\n".as_bytes().to_vec();
        std::fs::write(&bom, &bytes).unwrap();
        let rows = read_rows(&bom).unwrap();
        assert_eq!(rows[0].get("Local"), Some("A1"));
    }

    #[test]
    fn write_table_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = ExportTable {
            sheet: "Resultado",
            headers: vec!["Local".into(), "Qtd".into()],
            rows: vec![vec![ExportCell::from("A1"), ExportCell::Number(2.5)]],
        };
        write_table(&table, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec!["Local,Qtd", "A1,2.5"]);
    }
}
