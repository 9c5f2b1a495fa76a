// ============================================================
// REPORT RENDERING
// ============================================================
// Stats -> fixed vertical layout -> PDF bytes

mod layout;
mod pdf_writer;

pub use layout::{ReportLayout, ReportLine, ReportPage};
pub use pdf_writer::PdfWriter;

use crate::domain::error::Result;
use crate::domain::stats::StatsResult;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub fn report_file_name(dataset_id: i64) -> String {
    format!("report_{}.pdf", dataset_id)
}

/// Renders the equipment parameter report for one dataset.
#[derive(Debug, Default, Clone)]
pub struct ReportRenderer {
    writer: PdfWriter,
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, dataset_id: i64, stats: &StatsResult) -> Result<Vec<u8>> {
        let layout = ReportLayout::build(dataset_id, stats);
        self.writer.write(&layout)
    }
}
