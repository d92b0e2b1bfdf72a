//! Row grouper: correlates records that describe one logical event.

use crate::format::{ExchangeFormat, Grouping, Role};
use crate::mapping::{MappedRow, RawRecord};
use std::collections::HashMap;

/// Records believed to form one transaction. Consumed by reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionGroup {
    /// The grouping key, when grouping by id.
    pub key: Option<String>,
    pub records: Vec<RawRecord>,
    /// Lines of rejected rows that took a positional slot in this group.
    pub rejected: Vec<usize>,
}

impl TransactionGroup {
    fn single(record: RawRecord) -> Self {
        TransactionGroup {
            key: record.id.clone(),
            records: vec![record],
            rejected: Vec::new(),
        }
    }

    fn empty() -> Self {
        TransactionGroup {
            key: None,
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Line number of the first record.
    pub fn first_line(&self) -> usize {
        self.records.first().map_or(0, |r| r.line)
    }

    /// Raw text of every record, one per line.
    pub fn raw_text(&self) -> String {
        self.records
            .iter()
            .map(|r| r.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn slots(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

/// Splits mapped rows into groups according to the format's strategy.
///
/// Group order follows the first appearance of each group in the file.
/// Rejected rows are dropped, except under positional windows where they
/// still occupy their slot.
pub fn group(rows: Vec<MappedRow>, format: &ExchangeFormat) -> Vec<TransactionGroup> {
    match format.grouping {
        Grouping::ById => group_by_id(accepted(rows)),
        Grouping::ByTimestamp => group_by_timestamp(accepted(rows), format),
        Grouping::Window(size) => group_by_window(rows, format, size.max(1)),
        Grouping::Single => accepted(rows)
            .into_iter()
            .map(TransactionGroup::single)
            .collect(),
    }
}

fn accepted(rows: Vec<MappedRow>) -> Vec<RawRecord> {
    rows.into_iter()
        .filter_map(|row| match row {
            MappedRow::Accepted(record) => Some(record),
            MappedRow::Rejected(_) => None,
        })
        .collect()
}

fn group_by_id(records: Vec<RawRecord>) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match record.id.clone() {
            Some(id) => match index.get(&id) {
                Some(&i) => groups[i].records.push(record),
                None => {
                    index.insert(id, groups.len());
                    groups.push(TransactionGroup::single(record));
                }
            },
            None => groups.push(TransactionGroup::single(record)),
        }
    }
    groups
}

/// Only trade legs and fees of one fill share a timestamp group; transfers,
/// rewards and skipped rows always stand alone.
fn merges_by_timestamp(format: &ExchangeFormat, record: &RawRecord) -> bool {
    matches!(format.role_of(record), Role::Trade | Role::Fee)
}

fn group_by_timestamp(records: Vec<RawRecord>, format: &ExchangeFormat) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    for record in records {
        let joins_previous = match (groups.last().and_then(|g| g.records.last()), record.executed_at) {
            (Some(prev), Some(at)) => {
                prev.executed_at == Some(at)
                    && merges_by_timestamp(format, prev)
                    && merges_by_timestamp(format, &record)
            }
            _ => false,
        };
        match groups.last_mut() {
            Some(last) if joins_previous => last.records.push(record),
            _ => groups.push(TransactionGroup {
                key: None,
                ..TransactionGroup::single(record)
            }),
        }
    }
    groups
}

/// Pairs consecutive trade legs into windows of `size` slots.
///
/// Rows of any other role stand alone and do not take a slot. A rejected
/// trade leg keeps its slot so later windows stay aligned; its window is
/// marked and the row itself is already reported.
fn group_by_window(rows: Vec<MappedRow>, format: &ExchangeFormat, size: usize) -> Vec<TransactionGroup> {
    let mut groups: Vec<TransactionGroup> = Vec::new();
    let mut open: Option<usize> = None;

    for row in rows {
        let (record, rejected) = match row {
            MappedRow::Accepted(record) => (record, false),
            MappedRow::Rejected(record) => (record, true),
        };
        if format.role_of(&record) != Role::Trade {
            if !rejected {
                groups.push(TransactionGroup {
                    key: None,
                    ..TransactionGroup::single(record)
                });
            }
            continue;
        }

        let index = match open {
            Some(i) => i,
            None => {
                groups.push(TransactionGroup::empty());
                groups.len() - 1
            }
        };
        let window = &mut groups[index];
        if rejected {
            window.rejected.push(record.line);
        } else {
            window.records.push(record);
        }
        open = (window.slots() < size).then_some(index);
    }

    groups.retain(|g| !g.records.is_empty());
    groups
}
