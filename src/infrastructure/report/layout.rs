use crate::domain::stats::{format_metric, StatsResult};

/// A4 portrait in PDF points.
pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;

const LEFT: i64 = 100;
const INDENT: i64 = 120;
const TOP: i64 = 800;
const LINE_STEP: i64 = 20;
/// Extra space above the "Type Distribution:" header.
const SECTION_GAP: i64 = 10;
const BOTTOM_MARGIN: i64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub x: i64,
    pub y: i64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub lines: Vec<ReportLine>,
}

/// Positioned text for the whole report, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<ReportPage>,
}

impl ReportLayout {
    pub fn build(dataset_id: i64, stats: &StatsResult) -> Self {
        let mut cursor = Cursor::new();

        cursor.line(LEFT, format!("Equipment Parameter Report - Dataset {}", dataset_id));
        cursor.line(LEFT, format!("Total Equipment: {}", stats.total_count));
        cursor.line(LEFT, format!("Avg Flowrate: {}", format_metric(stats.average_flowrate)));
        cursor.line(LEFT, format!("Avg Pressure: {}", format_metric(stats.average_pressure)));
        cursor.line(
            LEFT,
            format!("Avg Temperature: {}", format_metric(stats.average_temperature)),
        );

        cursor.gap(SECTION_GAP);
        cursor.line(LEFT, "Type Distribution:".to_string());
        for (label, count) in stats.type_distribution.iter() {
            cursor.line(INDENT, format!("{}: {}", label, count));
        }

        cursor.finish()
    }

    /// All lines in reading order across pages.
    pub fn lines(&self) -> impl Iterator<Item = &ReportLine> {
        self.pages.iter().flat_map(|page| page.lines.iter())
    }
}

struct Cursor {
    pages: Vec<ReportPage>,
    current: ReportPage,
    y: i64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: ReportPage::default(),
            y: TOP,
        }
    }

    fn line(&mut self, x: i64, text: String) {
        if self.y < BOTTOM_MARGIN {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = TOP;
        }
        self.current.lines.push(ReportLine { x, y: self.y, text });
        self.y -= LINE_STEP;
    }

    fn gap(&mut self, points: i64) {
        self.y -= points;
    }

    fn finish(mut self) -> ReportLayout {
        self.pages.push(self.current);
        ReportLayout { pages: self.pages }
    }
}
