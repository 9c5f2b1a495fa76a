// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Equipment CSV decoding and header validation

mod csv_parser;

pub use csv_parser::EquipmentCsvParser;
