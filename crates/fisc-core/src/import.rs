//! Upload parsers for bulk budget data
//!
//! Uploaded files are tables with the columns `budgetName`,
//! `departmentName`, `projectName`, `vendorName`, `amount`, and an optional
//! `description`. CSV files are parsed with the csv crate; xls/xlsx
//! workbooks with calamine (first worksheet only, first row as header).
//!
//! Parsing is all-or-nothing: one row missing a required field, or carrying
//! a non-numeric amount, fails the whole batch before anything touches the
//! database.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::{Error, Result};

/// Accepted upload extensions.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx"];

/// One validated row of uploaded budget data.
///
/// Natural-key strings are already trimmed; `amount` is already checked to
/// be finite.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub budget_name: String,
    pub department_name: String,
    pub project_name: String,
    pub vendor_name: String,
    pub amount: f64,
    pub description: Option<String>,
}

const REQUIRED_KEYS: &[&str] = &[
    "budgetName",
    "departmentName",
    "projectName",
    "vendorName",
    "amount",
];

/// Parse a file into rows, dispatching on its extension.
pub fn parse_file(path: &Path, extension: &str) -> Result<Vec<RawRow>> {
    match extension.to_lowercase().as_str() {
        "csv" => {
            let file = std::fs::File::open(path)?;
            parse_csv(file)
        }
        "xls" | "xlsx" => parse_workbook(path),
        other => Err(Error::Validation(format!(
            "Unsupported file type '.{}'. Please upload a CSV or Excel file",
            other
        ))),
    }
}

/// Parse CSV data into validated rows.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let mut fields = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(i) {
                fields.insert(header.as_str(), value.to_string());
            }
        }
        rows.push(validate_row(&fields, idx + 1)?);
    }

    debug!(rows = rows.len(), "Parsed CSV upload");
    Ok(rows)
}

/// Parse the first worksheet of an xls/xlsx workbook into validated rows.
pub fn parse_workbook(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Validation("No sheets found in the uploaded workbook".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Validation(format!("Failed to read worksheet: {}", e)))?;

    let mut iter = range.rows();
    let headers: Vec<String> = match iter.next() {
        Some(header_row) => header_row.iter().map(|c| cell_to_string(c).trim().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (idx, data_row) in iter.enumerate() {
        // Skip fully blank rows; trailing blanks are common in exported sheets.
        if data_row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut fields = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(cell) = data_row.get(i) {
                fields.insert(header.as_str(), cell_to_string(cell));
            }
        }
        rows.push(validate_row(&fields, idx + 1)?);
    }

    debug!(rows = rows.len(), sheet = %sheet_name, "Parsed workbook upload");
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Validate one raw record: all required keys present and non-blank, amount
/// numeric and finite. `row_number` is 1-based for error messages.
fn validate_row(fields: &HashMap<&str, String>, row_number: usize) -> Result<RawRow> {
    for key in REQUIRED_KEYS {
        let missing = fields.get(key).map(|v| v.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(Error::Validation(format!(
                "Row {} is missing required field '{}'",
                row_number, key
            )));
        }
    }

    let amount = parse_amount(&fields["amount"]).map_err(|e| {
        Error::Validation(format!("Row {}: {}", row_number, e))
    })?;

    let description = fields
        .get("description")
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string());

    Ok(RawRow {
        budget_name: fields["budgetName"].trim().to_string(),
        department_name: fields["departmentName"].trim().to_string(),
        project_name: fields["projectName"].trim().to_string(),
        vendor_name: fields["vendorName"].trim().to_string(),
        amount,
        description,
    })
}

/// Parse an amount string. Negative amounts are valid (refunds); NaN,
/// infinity, and non-numeric input are not.
pub fn parse_amount(raw: &str) -> std::result::Result<f64, String> {
    let cleaned = raw.trim().replace(',', "");
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| format!("amount '{}' is not a number", raw.trim()))?;

    if !amount.is_finite() {
        return Err(format!("amount '{}' is not a finite number", raw.trim()));
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_OK: &str = "budgetName,departmentName,projectName,vendorName,amount,description\n\
        City 2026,Parks,Playgrounds,Acme Turf,1500.00,resurfacing\n\
        City 2026,Parks,Playgrounds,Acme Turf,-200,refund\n";

    #[test]
    fn test_parse_csv() {
        let rows = parse_csv(CSV_OK.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].budget_name, "City 2026");
        assert_eq!(rows[0].amount, 1500.0);
        assert_eq!(rows[0].description.as_deref(), Some("resurfacing"));
        // Sign is meaningful: refunds come through negative.
        assert_eq!(rows[1].amount, -200.0);
    }

    #[test]
    fn test_parse_csv_trims_natural_keys() {
        let csv = "budgetName,departmentName,projectName,vendorName,amount\n\
                   \" City 2026 \",  Parks ,Playgrounds,Acme Turf,10\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].budget_name, "City 2026");
        assert_eq!(rows[0].department_name, "Parks");
    }

    #[test]
    fn test_parse_csv_missing_field_fails_batch() {
        let csv = "budgetName,departmentName,projectName,vendorName,amount\n\
                   City 2026,Parks,Playgrounds,Acme Turf,10\n\
                   City 2026,Parks,Playgrounds,,20\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("vendorName"));
        assert!(err.to_string().contains("Row 2"));
    }

    #[test]
    fn test_parse_csv_bad_amount_fails_batch() {
        let csv = "budgetName,departmentName,projectName,vendorName,amount\n\
                   City 2026,Parks,Playgrounds,Acme Turf,ten\n";
        assert!(parse_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("150.00").unwrap(), 150.0);
        assert_eq!(parse_amount(" 1,500.25 ").unwrap(), 1500.25);
        assert_eq!(parse_amount("-42").unwrap(), -42.0);
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("12 dollars").is_err());
    }

    #[test]
    fn test_missing_description_is_none() {
        let csv = "budgetName,departmentName,projectName,vendorName,amount,description\n\
                   B,D,P,V,1,\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert!(rows[0].description.is_none());
    }
}
