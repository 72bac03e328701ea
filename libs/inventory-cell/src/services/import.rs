use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use shared_database::ClinicStore;
use shared_models::error::ClinicError;
use shared_models::inventory::{ImportOutcome, ImportRow};
use shared_utils::AppState;

use crate::models::{ImportSummary, RejectedRow};

const HEADER_NAMES: [&str; 3] = ["name", "item", "item_name"];

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|first| HEADER_NAMES.iter().any(|h| first.eq_ignore_ascii_case(h)))
}

fn parse_record(record: &StringRecord) -> Result<ImportRow, String> {
    if record.len() < 2 {
        return Err("expected at least name and quantity".to_string());
    }
    if record.len() > 4 {
        return Err(format!("expected at most 4 columns, found {}", record.len()));
    }

    let name = &record[0];
    if name.is_empty() {
        return Err("name is empty".to_string());
    }

    let quantity: i32 = record[1]
        .parse()
        .map_err(|_| format!("quantity '{}' is not a whole number", &record[1]))?;
    if quantity < 0 {
        return Err("quantity cannot be negative".to_string());
    }

    let unit = record
        .get(2)
        .filter(|unit| !unit.is_empty())
        .map(str::to_string);

    let min_threshold = match record.get(3).filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let threshold: i32 = raw
                .parse()
                .map_err(|_| format!("threshold '{}' is not a whole number", raw))?;
            if threshold < 0 {
                return Err("threshold cannot be negative".to_string());
            }
            Some(threshold)
        }
        None => None,
    };

    Ok(ImportRow {
        name: name.to_string(),
        quantity,
        unit,
        min_threshold,
    })
}

/// Parses `name,quantity[,unit[,threshold]]` lines. A header row is
/// recognised by its first cell; bad lines are collected, not fatal.
pub fn parse_rows(input: &str) -> (Vec<ImportRow>, Vec<RejectedRow>) {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                rejected.push(RejectedRow {
                    row: e.position().map(|p| p.line()).unwrap_or(fallback_line),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);

        if index == 0 && is_header(&record) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }

        match parse_record(&record) {
            Ok(row) => rows.push(row),
            Err(message) => rejected.push(RejectedRow { row: line, message }),
        }
    }

    (rows, rejected)
}

pub struct InventoryImporter {
    store: Arc<dyn ClinicStore>,
}

impl InventoryImporter {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Sets each named item to the quantity in the file, creating missing
    /// ones. Importing the same file twice changes nothing the second time.
    pub async fn import(&self, input: &str) -> Result<ImportSummary, ClinicError> {
        let (rows, rejected) = parse_rows(input);
        let mut summary = ImportSummary {
            rejected,
            ..ImportSummary::default()
        };

        for row in rows {
            let (_, outcome) = self.store.import_item(row).await?;
            match outcome {
                ImportOutcome::Created => summary.created += 1,
                ImportOutcome::Updated => summary.updated += 1,
                ImportOutcome::Unchanged => summary.unchanged += 1,
            }
        }

        for rejected in &summary.rejected {
            warn!("Import row {} rejected: {}", rejected.row, rejected.message);
        }
        info!(
            "Inventory import: {} created, {} updated, {} unchanged, {} rejected",
            summary.created,
            summary.updated,
            summary.unchanged,
            summary.rejected.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_optional() {
        let (with_header, _) = parse_rows("Name,Quantity,Unit,Threshold\nGloves,10,box,2\n");
        let (without_header, _) = parse_rows("Gloves,10,box,2\n");

        assert_eq!(with_header, without_header);
        assert_eq!(with_header[0].unit.as_deref(), Some("box"));
        assert_eq!(with_header[0].min_threshold, Some(2));
    }

    #[test]
    fn optional_columns_may_be_missing_or_blank() {
        let (rows, rejected) = parse_rows("Gauze, 40\nSyringe,12,,5\n");

        assert!(rejected.is_empty());
        assert_eq!(rows[0].name, "Gauze");
        assert_eq!(rows[0].quantity, 40);
        assert_eq!(rows[0].unit, None);
        assert_eq!(rows[1].unit, None);
        assert_eq!(rows[1].min_threshold, Some(5));
    }

    #[test]
    fn bad_rows_are_reported_with_their_line() {
        let input = "name,quantity\nGloves,ten\n,4\nMasks,-1\nSwabs,3,pcs,x\nTape\nCotton,7\n";
        let (rows, rejected) = parse_rows(input);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Cotton");
        let lines: Vec<u64> = rejected.iter().map(|r| r.row).collect();
        assert_eq!(lines, [2, 3, 4, 5, 6]);
        assert!(rejected[0].message.contains("ten"));
    }
}
