//! Flat table projections of a run, ready for a spreadsheet writer.

use serde::Serialize;

use crate::model::{Counts, InventoryItem, ReconRun, RunMode, Tally};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportCell {
    Text(String),
    Number(f64),
}

impl From<&str> for ExportCell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ExportCell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for ExportCell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One worksheet: a header row plus data rows of the same width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    pub sheet: &'static str,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ExportCell>>,
}

impl ExportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every item of the run.
pub fn full_view(run: &ReconRun) -> ExportTable {
    item_table("Resultado", run, |_| true)
}

/// Items needing a recount or a system correction.
pub fn divergences_view(run: &ReconRun) -> ExportTable {
    item_table("Divergencias", run, |i| i.status.is_divergence())
}

/// Stock found in the wrong place: where it was found and where the system expects it.
pub fn transfers_view(run: &ReconRun) -> ExportTable {
    let headers = [
        "Local Físico (Bipado)",
        "GTIN",
        "Lote",
        "Descrição",
        "Qtd Encontrada",
        "Qtd Sistema Neste Local",
        "ONDE DEVERIA ESTAR",
    ];

    let rows = run
        .items
        .iter()
        .filter(|i| i.status.is_transfer())
        .map(|i| {
            vec![
                i.key.location.as_str().into(),
                i.key.product.as_str().into(),
                i.key.lot.as_str().into(),
                i.description.as_str().into(),
                i.deciding_qty().into(),
                i.system_qty.into(),
                i.expected_locations.join(", ").into(),
            ]
        })
        .collect();

    ExportTable {
        sheet: "Transferencias",
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

/// Suggested file name for a run's full export.
pub fn result_file_stem(mode: RunMode) -> String {
    match mode {
        RunMode::Initial => "Resultado_Rodada_Inicial".to_string(),
        RunMode::Audit(round) => format!("Resultado_Rodada_{round}"),
    }
}

fn item_table(sheet: &'static str, run: &ReconRun, keep: impl Fn(&InventoryItem) -> bool) -> ExportTable {
    let mut headers: Vec<String> = ["Local", "GTIN", "Lote", "Descrição"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    match run.meta.mode {
        RunMode::Initial => {
            headers.extend(["Qtd 1ª", "Usuário 1ª", "Qtd 2ª", "Usuário 2ª"].map(String::from));
        }
        RunMode::Audit(round) => {
            headers.push(format!("Qtd {round}ª"));
            headers.push(format!("Usuário {round}ª"));
        }
    }
    headers.extend(["Qtd Sistema", "Status", "Ação", "Locais Sistema"].map(String::from));

    let rows = run
        .items
        .iter()
        .filter(|i| keep(i))
        .map(|i| {
            let mut row: Vec<ExportCell> = vec![
                i.key.location.as_str().into(),
                i.key.product.as_str().into(),
                i.key.lot.as_str().into(),
                i.description.as_str().into(),
            ];
            match &i.counts {
                Counts::Initial { round1, round2 } => {
                    push_tally(&mut row, round1.as_ref());
                    push_tally(&mut row, round2.as_ref());
                }
                Counts::Audit { tally, .. } => push_tally(&mut row, Some(tally)),
            }
            row.push(i.system_qty.into());
            row.push(i.status.label().into());
            row.push(i.action.to_string().into());
            row.push(i.expected_locations.join(", ").into());
            row
        })
        .collect();

    ExportTable { sheet, headers, rows }
}

fn push_tally(row: &mut Vec<ExportCell>, tally: Option<&Tally>) {
    match tally {
        Some(t) => {
            row.push(t.qty.into());
            row.push(t.user.as_str().into());
        }
        None => {
            row.push("".into());
            row.push("".into());
        }
    }
}
