//! Serialize a (filtered) table back to CSV for download.
//!
//! Uses the same dialect the parser reads, in the table's column order, so
//! parsing an export yields the exported table again.

use crate::table::ResultTable;
use crate::variant::ResultVariant;
use crate::Result;

pub fn export_csv(table: &ResultTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.values())?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let text = String::from_utf8(bytes).map_err(anyhow::Error::from)?;
    Ok(text)
}

/// `<experiment>_<variant suffix>_results.csv`
pub fn export_file_name(experiment: &str, variant: &ResultVariant) -> String {
    format!("{}_{}_results.csv", experiment, variant.export_suffix())
}
