// ============================================================
// EQUIPMENT CSV PARSER
// ============================================================
// Decode uploaded bytes, validate the header, build an EquipmentTable

use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use std::borrow::Cow;

use crate::domain::equipment::{
    EquipmentRow, EquipmentTable, COL_FLOWRATE, COL_NAME, COL_PRESSURE, COL_TEMPERATURE,
    COL_TYPE, REQUIRED_COLUMNS,
};
use crate::domain::error::{AppError, Result};

/// Positions of the required columns within the header record.
struct ColumnIndex {
    name: usize,
    equipment_type: usize,
    flowrate: usize,
    pressure: usize,
    temperature: usize,
}

impl ColumnIndex {
    /// Exact, case-sensitive header lookup. Reports every missing column at once.
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |column: &str| headers.iter().position(|h| h == column);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| position(**column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Schema(missing));
        }

        let lookup = |column: &str| {
            position(column).ok_or_else(|| AppError::Schema(vec![column.to_string()]))
        };

        Ok(Self {
            name: lookup(COL_NAME)?,
            equipment_type: lookup(COL_TYPE)?,
            flowrate: lookup(COL_FLOWRATE)?,
            pressure: lookup(COL_PRESSURE)?,
            temperature: lookup(COL_TEMPERATURE)?,
        })
    }
}

/// Parser for equipment parameter CSV files
pub struct EquipmentCsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for EquipmentCsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl EquipmentCsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse raw upload bytes into a validated table.
    ///
    /// Fails with `Schema` when a required header is absent and with `Parse`
    /// for malformed records or numeric cells that are not finite numbers.
    /// No row is ever skipped.
    pub fn parse(&self, bytes: &[u8]) -> Result<EquipmentTable> {
        let content = decode(bytes);

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::None)
            .flexible(false)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::Parse(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        let columns = ColumnIndex::resolve(&headers)?;

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::Parse(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            rows.push(parse_row(index + 1, &columns, &record)?);
        }

        Ok(EquipmentTable::from_rows(rows))
    }
}

/// UTF-8 first (BOM stripped); spreadsheet exports that are not valid UTF-8
/// are read as Windows-1252.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let (content, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return content;
    }
    let (content, _, _) = WINDOWS_1252.decode(bytes);
    content
}

fn parse_row(row: usize, columns: &ColumnIndex, record: &StringRecord) -> Result<EquipmentRow> {
    let text = |idx: usize| record.get(idx).unwrap_or_default();

    Ok(EquipmentRow {
        name: text(columns.name).to_string(),
        equipment_type: text(columns.equipment_type).to_string(),
        flowrate: parse_number(row, COL_FLOWRATE, text(columns.flowrate))?,
        pressure: parse_number(row, COL_PRESSURE, text(columns.pressure))?,
        temperature: parse_number(row, COL_TEMPERATURE, text(columns.temperature))?,
    })
}

fn parse_number(row: usize, column: &str, raw: &str) -> Result<f64> {
    let value = raw.trim();
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(AppError::Parse(format!(
            "Row {}: column '{}' expects a number, got '{}'",
            row, column, value
        ))),
    }
}
