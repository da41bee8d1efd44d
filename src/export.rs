//! CSV download of a ledger
//!
//! Two header rows carry the column labels (holding, then attribute), followed
//! by one row per date. Cells go through the same formatting as the on-screen
//! table.

use chrono::NaiveDate;
use csv::WriterBuilder;

use crate::errors::LedgerError;
use crate::ledger::Ledger;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// `stocks_2026-04-10.csv`
pub fn file_name(portfolio_id: &str, today: NaiveDate) -> String {
    format!("{portfolio_id}_{}.csv", today.format("%Y-%m-%d"))
}

pub fn to_csv(ledger: &Ledger) -> Result<Vec<u8>, LedgerError> {
    let mut writer = WriterBuilder::new().flexible(false).from_writer(Vec::new());

    let mut groups = vec![""];
    groups.extend(ledger.columns.iter().map(|c| c.group.as_str()));
    writer.write_record(&groups)?;

    let mut attributes = vec!["Date"];
    attributes.extend(ledger.columns.iter().map(|c| c.attribute.as_str()));
    writer.write_record(&attributes)?;

    for (date, cells) in ledger.formatted_rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.to_string());
        record.extend(cells);
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| LedgerError::Io(e.into_error()))
}
