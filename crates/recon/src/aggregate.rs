use std::collections::HashMap;

use crate::model::{CompositeKey, Counts, GlobalBalance, GlobalKey, Origin, PendingItem, RawRow, Tallied, Tally};
use crate::normalize::{normalize, FieldAliases};

/// Description given to audit rows that match nothing pending and carry none.
pub const UNREQUESTED_DESCRIPTION: &str = "Novo Item";

// ---------------------------------------------------------------------------
// Pass 1: global balances
// ---------------------------------------------------------------------------

/// Product/lot balances across every location.
///
/// Built from the system file alone; afterwards only the confirming-round
/// counted totals move.
#[derive(Debug, Clone, Default)]
pub struct GlobalBalances {
    map: HashMap<GlobalKey, GlobalBalance>,
}

impl GlobalBalances {
    /// Sum system quantities per (product, lot) and collect expected locations.
    pub fn from_system(rows: &[RawRow], aliases: &FieldAliases) -> Self {
        let mut map: HashMap<GlobalKey, GlobalBalance> = HashMap::new();

        for row in rows {
            let Some(key) = aliases.key(row) else {
                continue;
            };
            let balance = map.entry(key.global()).or_default();
            balance.system_total += aliases.system_qty(row);
            if !balance.expected_locations.contains(&key.location) {
                balance.expected_locations.push(key.location);
            }
        }

        Self { map }
    }

    pub fn get(&self, key: &GlobalKey) -> Option<&GlobalBalance> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Confirming-round contribution. Keys unknown to the system file get no entry.
    fn add_counted(&mut self, key: &GlobalKey, qty: f64) {
        if let Some(balance) = self.map.get_mut(key) {
            balance.counted_total += qty;
        }
    }

    fn expected_locations(&self, key: &GlobalKey) -> Vec<String> {
        self.map
            .get(key)
            .map(|b| b.expected_locations.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Pass 2: per-location records
// ---------------------------------------------------------------------------

/// Per-location records in discovery order.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub items: Vec<Tallied>,
    /// Rows without a location or product code.
    pub excluded_rows: usize,
}

#[derive(Default)]
struct Book {
    items: Vec<Tallied>,
    index: HashMap<CompositeKey, usize>,
    excluded_rows: usize,
}

impl Book {
    fn get_or_insert_with(&mut self, key: &CompositeKey, make: impl FnOnce() -> Tallied) -> &mut Tallied {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.items.push(make());
                self.index.insert(key.clone(), self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[idx]
    }

    fn exclude(&mut self, source: &str, row_no: usize) {
        tracing::debug!(source, row = row_no, "row has no location or product code, skipped");
        self.excluded_rows += 1;
    }

    fn finish(self) -> Aggregation {
        Aggregation {
            items: self.items,
            excluded_rows: self.excluded_rows,
        }
    }
}

#[derive(Clone, Copy)]
enum Source {
    System,
    Round1,
    Round2,
}

impl Source {
    fn name(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Round1 => "round1",
            Self::Round2 => "round2",
        }
    }
}

/// Merge system, round-1 and round-2 rows into one record per composite key.
///
/// `balances` must be the completed system pass; round-2 rows add to its
/// counted totals as they are merged.
pub fn aggregate_initial(
    balances: &mut GlobalBalances,
    system: &[RawRow],
    round1: Option<&[RawRow]>,
    round2: Option<&[RawRow]>,
    aliases: &FieldAliases,
) -> Aggregation {
    let mut book = Book::default();
    let has_round1 = round1.is_some();
    let has_round2 = round2.is_some();

    let sources = [
        (Source::System, Some(system)),
        (Source::Round1, round1),
        (Source::Round2, round2),
    ];

    for (source, rows) in sources {
        let Some(rows) = rows else {
            continue;
        };
        for (row_no, row) in rows.iter().enumerate() {
            let Some(key) = aliases.key(row) else {
                book.exclude(source.name(), row_no + 1);
                continue;
            };
            let global = key.global();
            let description = aliases.description(row);

            let item = book.get_or_insert_with(&key, || Tallied {
                id: None,
                key: key.clone(),
                description: description.clone(),
                system_qty: 0.0,
                counts: Counts::Initial {
                    round1: has_round1.then(Tally::default),
                    round2: has_round2.then(Tally::default),
                },
                origin: Origin::Expected,
                expected_locations: balances.expected_locations(&global),
            });

            if item.description.is_empty() && !description.is_empty() {
                item.description = description;
            }

            match source {
                Source::System => item.system_qty += aliases.system_qty(row),
                Source::Round1 | Source::Round2 => {
                    let qty = aliases.counted_qty(row);
                    let user = aliases.user(row);
                    if let Counts::Initial { round1, round2 } = &mut item.counts {
                        let slot = if matches!(source, Source::Round1) { round1 } else { round2 };
                        if let Some(tally) = slot {
                            tally.add(qty, &user);
                        }
                    }
                    if matches!(source, Source::Round2) {
                        balances.add_counted(&global, qty);
                    }
                }
            }
        }
    }

    book.finish()
}

/// Seed from the store's pending items, then merge the audit round's rows.
pub fn aggregate_audit(pending: &[PendingItem], round: u8, counts: &[RawRow], aliases: &FieldAliases) -> Aggregation {
    let mut book = Book::default();

    for p in pending {
        let key = CompositeKey {
            location: normalize(&p.key.location),
            product: normalize(&p.key.product),
            lot: normalize(&p.key.lot),
        };
        book.get_or_insert_with(&key, || Tallied {
            id: Some(p.id),
            key: key.clone(),
            description: p.description.clone(),
            system_qty: p.system_qty,
            counts: Counts::Audit {
                round,
                tally: Tally::default(),
            },
            origin: Origin::Expected,
            expected_locations: Vec::new(),
        });
    }

    for (row_no, row) in counts.iter().enumerate() {
        let Some(key) = aliases.key(row) else {
            book.exclude("audit", row_no + 1);
            continue;
        };
        let description = aliases.description(row);

        let item = book.get_or_insert_with(&key, || Tallied {
            id: None,
            key: key.clone(),
            description: if description.is_empty() {
                UNREQUESTED_DESCRIPTION.to_string()
            } else {
                description.clone()
            },
            system_qty: 0.0,
            counts: Counts::Audit {
                round,
                tally: Tally::default(),
            },
            origin: Origin::Unrequested,
            expected_locations: Vec::new(),
        });

        if item.description.is_empty() && !description.is_empty() {
            item.description = description;
        }
        if let Counts::Audit { tally, .. } = &mut item.counts {
            tally.add(aliases.counted_qty(row), &aliases.user(row));
        }
    }

    book.finish()
}
