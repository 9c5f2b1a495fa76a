use crate::domain::equipment::{EquipmentRow, EquipmentTable};
use crate::domain::stats::{StatsResult, TypeDistribution};

/// Aggregates an equipment table. Stateless; every call is a pure function
/// of the table it is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsEngine;

impl StatsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, table: EquipmentTable) -> StatsResult {
        let rows = table.into_rows();

        StatsResult {
            total_count: rows.len(),
            average_flowrate: mean(&rows, |r| r.flowrate),
            average_pressure: mean(&rows, |r| r.pressure),
            average_temperature: mean(&rows, |r| r.temperature),
            type_distribution: TypeDistribution::from_labels(
                rows.iter().map(|r| r.equipment_type.as_str()),
            ),
            rows,
        }
    }
}

/// Arithmetic mean; undefined for an empty slice.
fn mean(rows: &[EquipmentRow], field: impl Fn(&EquipmentRow) -> f64) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let sum: f64 = rows.iter().map(&field).sum();
    if sum.is_finite() {
        return Some(sum / n);
    }
    // Finite inputs near f64::MAX can overflow the plain sum; scaling each
    // term first keeps the result finite.
    Some(rows.iter().map(|r| field(r) / n).sum())
}
