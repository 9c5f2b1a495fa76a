use serde::{Deserialize, Serialize};

pub const COL_NAME: &str = "Equipment Name";
pub const COL_TYPE: &str = "Type";
pub const COL_FLOWRATE: &str = "Flowrate";
pub const COL_PRESSURE: &str = "Pressure";
pub const COL_TEMPERATURE: &str = "Temperature";

/// Header names every equipment CSV must carry, matched exactly.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_NAME,
    COL_TYPE,
    COL_FLOWRATE,
    COL_PRESSURE,
    COL_TEMPERATURE,
];

/// One CSV record. Serialized with the original column names so the
/// `data` array of the stats payload mirrors the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRow {
    #[serde(rename = "Equipment Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub equipment_type: String,
    #[serde(rename = "Flowrate")]
    pub flowrate: f64,
    #[serde(rename = "Pressure")]
    pub pressure: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
}

impl EquipmentRow {
    pub fn new(
        name: impl Into<String>,
        equipment_type: impl Into<String>,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            name: name.into(),
            equipment_type: equipment_type.into(),
            flowrate,
            pressure,
            temperature,
        }
    }
}

/// Rows of a single dataset in source order. Only built from a header
/// that carried every required column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentTable {
    rows: Vec<EquipmentRow>,
}

impl EquipmentTable {
    pub fn from_rows(rows: Vec<EquipmentRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EquipmentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<EquipmentRow> {
        self.rows
    }
}
