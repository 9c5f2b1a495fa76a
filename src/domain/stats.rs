use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use super::equipment::EquipmentRow;

/// Marker printed wherever a mean is undefined (no rows).
pub const UNDEFINED_METRIC: &str = "N/A";

/// Occurrences per `Type` value.
///
/// Entries are kept sorted by count descending, ties in first-seen order,
/// and serialize as a JSON object in that same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDistribution {
    entries: Vec<(String, usize)>,
}

impl TypeDistribution {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut entries: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for label in labels {
            match positions.get(label) {
                Some(&index) => entries[index].1 += 1,
                None => {
                    positions.insert(label, entries.len());
                    entries.push((label.to_string(), 1));
                }
            }
        }
        // stable sort keeps first-seen order among equal counts
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(seen, _)| seen.as_str() == label)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TypeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = TypeDistribution;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of type label to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, count)) = access.next_entry::<String, usize>()? {
                    entries.push((label, count));
                }
                Ok(TypeDistribution { entries })
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Aggregates over one equipment table. This is also the wire payload of
/// the stats endpoint; `rows` goes out as `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub total_count: usize,
    /// `None` when the table has no rows.
    pub average_flowrate: Option<f64>,
    pub average_pressure: Option<f64>,
    pub average_temperature: Option<f64>,
    pub type_distribution: TypeDistribution,
    #[serde(rename = "data")]
    pub rows: Vec<EquipmentRow>,
}

impl StatsResult {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// Two-decimal rendering used by reports; undefined means print `N/A`.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => UNDEFINED_METRIC.to_string(),
    }
}
