//! Key normalization and tolerant field extraction from spreadsheet rows.

use serde::Deserialize;

use crate::model::{CompositeKey, RawRow};

/// Trim and uppercase. Every key component goes through here.
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Ordered header aliases per logical field. The first alias with a
/// non-empty value wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldAliases {
    pub location: Vec<String>,
    pub product: Vec<String>,
    pub lot: Vec<String>,
    pub system_qty: Vec<String>,
    pub counted_qty: Vec<String>,
    pub user: Vec<String>,
    pub description: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            location: owned(&["Localização", "Localizacao", "Local"]),
            product: owned(&["GTIN", "Codigo"]),
            lot: owned(&["Lote", "Batch"]),
            system_qty: owned(&["Armazenado", "Qtd_Sistema"]),
            counted_qty: owned(&["Quantidade_Contada"]),
            user: owned(&["Usuario"]),
            description: owned(&[
                "Descrição",
                "Descricao",
                "Descrição do Produto",
                "Produto",
                "Material",
                "Description",
            ]),
        }
    }
}

impl FieldAliases {
    /// (field name, alias list) pairs, for validation and diagnostics.
    pub fn lists(&self) -> [(&'static str, &[String]); 7] {
        [
            ("location", &self.location),
            ("product", &self.product),
            ("lot", &self.lot),
            ("system_qty", &self.system_qty),
            ("counted_qty", &self.counted_qty),
            ("user", &self.user),
            ("description", &self.description),
        ]
    }

    /// Normalized composite key, or `None` when location or product is missing.
    pub fn key(&self, row: &RawRow) -> Option<CompositeKey> {
        let location = normalize(resolve(row, &self.location).unwrap_or(""));
        let product = normalize(resolve(row, &self.product).unwrap_or(""));
        if location.is_empty() || product.is_empty() {
            return None;
        }
        let lot = normalize(resolve(row, &self.lot).unwrap_or(""));
        Some(CompositeKey { location, product, lot })
    }

    pub fn system_qty(&self, row: &RawRow) -> f64 {
        parse_qty(resolve(row, &self.system_qty))
    }

    pub fn counted_qty(&self, row: &RawRow) -> f64 {
        parse_qty(resolve(row, &self.counted_qty))
    }

    pub fn user(&self, row: &RawRow) -> String {
        resolve(row, &self.user).map(|u| u.trim().to_string()).unwrap_or_default()
    }

    pub fn description(&self, row: &RawRow) -> String {
        resolve(row, &self.description).map(|d| d.trim().to_string()).unwrap_or_default()
    }
}

/// First alias whose value is present and non-blank.
pub fn resolve<'a>(row: &'a RawRow, aliases: &[String]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find(|value| !value.trim().is_empty())
}

/// Spreadsheet quantity cell to number. Blank is zero; a lone comma is read
/// as the decimal separator. Garbage counts as zero.
pub fn parse_qty(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };

    let parsed = if raw.contains(',') && !raw.contains('.') && raw.matches(',').count() == 1 {
        raw.replace(',', ".").parse::<f64>()
    } else {
        raw.parse::<f64>()
    };

    match parsed {
        Ok(n) if n.is_finite() => n,
        _ => {
            tracing::warn!(value = raw, "unparseable quantity, counting as 0");
            0.0
        }
    }
}
