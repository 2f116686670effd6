use crate::error::LabelError;
use crate::types::{Pt, Size};
use serde::Deserialize;
use std::path::Path;

// Geometry of one label sheet. All lengths are in points and measured from the
// top-left corner of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFormat {
    pub id: String,
    pub name: String,
    pub description: String,
    pub page_width: Pt,
    pub page_height: Pt,
    pub columns: usize,
    pub rows: usize,
    pub label_width: Pt,
    pub label_height: Pt,
    pub margin_left: Pt,
    pub margin_top: Pt,
    pub horizontal_gap: Pt,
    pub vertical_gap: Pt,
}

impl PaperFormat {
    pub fn labels_per_page(&self) -> usize {
        self.columns * self.rows
    }

    pub fn page_size(&self) -> Size {
        Size {
            width: self.page_width,
            height: self.page_height,
        }
    }

    // Rejects formats the paginator cannot place labels on. Formats whose grid
    // overflows the page are accepted.
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(LabelError::InvalidConfiguration(format!(
                "paper format '{}' needs at least one row and one column",
                self.id
            )));
        }
        if self.label_width <= Pt::ZERO || self.label_height <= Pt::ZERO {
            return Err(LabelError::InvalidConfiguration(format!(
                "paper format '{}' has a non-positive label size",
                self.id
            )));
        }
        if self.page_width <= Pt::ZERO || self.page_height <= Pt::ZERO {
            return Err(LabelError::InvalidConfiguration(format!(
                "paper format '{}' has a non-positive page size",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Pt,
    Mm,
    In,
}

impl LengthUnit {
    fn to_pt(self, value: f32) -> Pt {
        match self {
            LengthUnit::Pt => Pt::from_f32(value),
            LengthUnit::Mm => Pt::from_mm(value),
            LengthUnit::In => Pt::from_inches(value),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperFormatEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    unit: LengthUnit,
    page_width: f32,
    page_height: f32,
    columns: usize,
    rows: usize,
    label_width: f32,
    label_height: f32,
    margin_left: f32,
    margin_top: f32,
    #[serde(default)]
    horizontal_gap: f32,
    #[serde(default)]
    vertical_gap: f32,
}

impl From<PaperFormatEntry> for PaperFormat {
    fn from(entry: PaperFormatEntry) -> Self {
        let unit = entry.unit;
        PaperFormat {
            id: entry.id,
            name: entry.name,
            description: entry.description,
            page_width: unit.to_pt(entry.page_width),
            page_height: unit.to_pt(entry.page_height),
            columns: entry.columns,
            rows: entry.rows,
            label_width: unit.to_pt(entry.label_width),
            label_height: unit.to_pt(entry.label_height),
            margin_left: unit.to_pt(entry.margin_left),
            margin_top: unit.to_pt(entry.margin_top),
            horizontal_gap: unit.to_pt(entry.horizontal_gap),
            vertical_gap: unit.to_pt(entry.vertical_gap),
        }
    }
}

// Parses a JSON array of catalog entries. Lengths default to points unless the entry
// carries `"unit": "mm"` or `"unit": "in"`.
pub fn parse_formats_json(json: &str) -> Result<Vec<PaperFormat>, LabelError> {
    let entries: Vec<PaperFormatEntry> = serde_json::from_str(json)?;
    Ok(entries.into_iter().map(PaperFormat::from).collect())
}

pub fn load_formats_json(path: impl AsRef<Path>) -> Result<Vec<PaperFormat>, LabelError> {
    let json = std::fs::read_to_string(path)?;
    parse_formats_json(&json)
}

pub fn find_format<'a>(formats: &'a [PaperFormat], id: &str) -> Option<&'a PaperFormat> {
    let id = id.trim();
    formats
        .iter()
        .find(|format| format.id.eq_ignore_ascii_case(id))
}

#[allow(clippy::too_many_arguments)]
fn sheet(
    id: &str,
    name: &str,
    description: &str,
    unit: LengthUnit,
    page: Size,
    grid: (usize, usize),
    label: (f32, f32),
    margins: (f32, f32),
    gaps: (f32, f32),
) -> PaperFormat {
    PaperFormat {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        page_width: page.width,
        page_height: page.height,
        columns: grid.0,
        rows: grid.1,
        label_width: unit.to_pt(label.0),
        label_height: unit.to_pt(label.1),
        margin_left: unit.to_pt(margins.0),
        margin_top: unit.to_pt(margins.1),
        horizontal_gap: unit.to_pt(gaps.0),
        vertical_gap: unit.to_pt(gaps.1),
    }
}

pub fn builtin_formats() -> Vec<PaperFormat> {
    use LengthUnit::{In, Mm};
    vec![
        sheet(
            "avery-5160",
            "Avery 5160",
            "Address labels, 30 per Letter sheet (2 5/8\" x 1\")",
            In,
            Size::letter(),
            (3, 10),
            (2.625, 1.0),
            (0.1875, 0.5),
            (0.125, 0.0),
        ),
        sheet(
            "avery-5161",
            "Avery 5161",
            "Address labels, 20 per Letter sheet (4\" x 1\")",
            In,
            Size::letter(),
            (2, 10),
            (4.0, 1.0),
            (0.15625, 0.5),
            (0.1875, 0.0),
        ),
        sheet(
            "avery-5163",
            "Avery 5163",
            "Shipping labels, 10 per Letter sheet (4\" x 2\")",
            In,
            Size::letter(),
            (2, 5),
            (4.0, 2.0),
            (0.15625, 0.5),
            (0.1875, 0.0),
        ),
        sheet(
            "avery-5164",
            "Avery 5164",
            "Shipping labels, 6 per Letter sheet (4\" x 3 1/3\")",
            In,
            Size::letter(),
            (2, 3),
            (4.0, 3.3333),
            (0.15625, 0.5),
            (0.1875, 0.0),
        ),
        sheet(
            "l7160",
            "Avery L7160",
            "Address labels, 21 per A4 sheet (63.5 x 38.1 mm)",
            Mm,
            Size::a4(),
            (3, 7),
            (63.5, 38.1),
            (7.25, 15.15),
            (2.5, 0.0),
        ),
        sheet(
            "l7163",
            "Avery L7163",
            "Address labels, 14 per A4 sheet (99.1 x 38.1 mm)",
            Mm,
            Size::a4(),
            (2, 7),
            (99.1, 38.1),
            (4.65, 15.15),
            (2.5, 0.0),
        ),
        sheet(
            "l7651",
            "Avery L7651",
            "Mini labels, 65 per A4 sheet (38.1 x 21.2 mm)",
            Mm,
            Size::a4(),
            (5, 13),
            (38.1, 21.2),
            (4.7, 10.7),
            (2.5, 0.0),
        ),
        sheet(
            "l7173",
            "Avery L7173",
            "Shipping labels, 10 per A4 sheet (99.1 x 57 mm)",
            Mm,
            Size::a4(),
            (2, 5),
            (99.1, 57.0),
            (4.65, 6.0),
            (2.5, 0.0),
        ),
    ]
}
