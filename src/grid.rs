use crate::paper::PaperFormat;
use crate::types::{LineSegment, Pt, Rect};

pub const CUT_MARK_LENGTH: Pt = Pt::from_i32(9);
pub const CUT_MARK_OFFSET: Pt = Pt::from_i32(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub page_index: usize,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub page_index: usize,
    pub row: usize,
    pub column: usize,
    pub record_index: usize,
    pub x: Pt,
    pub y: Pt,
}

impl LabelPlacement {
    pub fn rect(&self, format: &PaperFormat) -> Rect {
        Rect::new(self.x, self.y, format.label_width, format.label_height)
    }
}

// Row-major slot for position `index`. Returns `None` when the format has no slots.
pub fn grid_position(index: usize, format: &PaperFormat) -> Option<GridPosition> {
    let per_page = format.labels_per_page();
    if per_page == 0 {
        return None;
    }
    let within_page = index % per_page;
    Some(GridPosition {
        page_index: index / per_page,
        row: within_page / format.columns,
        column: within_page % format.columns,
    })
}

pub fn label_origin(row: usize, column: usize, format: &PaperFormat) -> (Pt, Pt) {
    let x = format.margin_left + (format.label_width + format.horizontal_gap) * (column as i32);
    let y = format.margin_top + (format.label_height + format.vertical_gap) * (row as i32);
    (x, y)
}

// Pages needed for `slot_count` grid positions; zero positions need zero pages.
pub fn page_count(slot_count: usize, format: &PaperFormat) -> usize {
    let per_page = format.labels_per_page();
    if per_page == 0 || slot_count == 0 {
        return 0;
    }
    slot_count.div_ceil(per_page)
}

// Places `record_count` records in order, starting `skip` slots into the first page.
pub fn paginate(record_count: usize, skip: usize, format: &PaperFormat) -> Vec<LabelPlacement> {
    (0..record_count)
        .filter_map(|record_index| {
            let position = grid_position(record_index + skip, format)?;
            let (x, y) = label_origin(position.row, position.column, format);
            Some(LabelPlacement {
                page_index: position.page_index,
                row: position.row,
                column: position.column,
                record_index,
                x,
                y,
            })
        })
        .collect()
}

// Coordinate of grid line `index` along one axis: the outer edge for the first and last
// lines, the middle of the gap between neighbours otherwise.
fn grid_line(index: usize, count: usize, margin: Pt, size: Pt, gap: Pt) -> Pt {
    if index == 0 {
        return margin;
    }
    let before = margin + (size + gap) * (index as i32 - 1) + size;
    if index == count { before } else { before + gap / 2 }
}

// Trim marks for one page. Boundary intersections get marks pointing away from the
// grid, starting `CUT_MARK_OFFSET` from the intersection; interior intersections get
// a cross of four arms, each half a mark long.
pub fn cut_marks(format: &PaperFormat) -> Vec<LineSegment> {
    let columns = format.columns;
    let rows = format.rows;
    let mut marks = Vec::new();
    if columns == 0 || rows == 0 {
        return marks;
    }
    let arm = CUT_MARK_LENGTH / 2;

    for row in 0..=rows {
        let y = grid_line(
            row,
            rows,
            format.margin_top,
            format.label_height,
            format.vertical_gap,
        );
        for column in 0..=columns {
            let x = grid_line(
                column,
                columns,
                format.margin_left,
                format.label_width,
                format.horizontal_gap,
            );
            let left_edge = column == 0;
            let right_edge = column == columns;
            let top_edge = row == 0;
            let bottom_edge = row == rows;

            if !(left_edge || right_edge || top_edge || bottom_edge) {
                marks.push(LineSegment::new(x, y, x - arm, y));
                marks.push(LineSegment::new(x, y, x + arm, y));
                marks.push(LineSegment::new(x, y, x, y - arm));
                marks.push(LineSegment::new(x, y, x, y + arm));
                continue;
            }
            if left_edge {
                let start = x - CUT_MARK_OFFSET;
                marks.push(LineSegment::new(start, y, start - CUT_MARK_LENGTH, y));
            }
            if right_edge {
                let start = x + CUT_MARK_OFFSET;
                marks.push(LineSegment::new(start, y, start + CUT_MARK_LENGTH, y));
            }
            if top_edge {
                let start = y - CUT_MARK_OFFSET;
                marks.push(LineSegment::new(x, start, x, start - CUT_MARK_LENGTH));
            }
            if bottom_edge {
                let start = y + CUT_MARK_OFFSET;
                marks.push(LineSegment::new(x, start, x, start + CUT_MARK_LENGTH));
            }
        }
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(columns: usize, rows: usize) -> PaperFormat {
        PaperFormat {
            id: "test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            page_width: Pt::from_i32(612),
            page_height: Pt::from_i32(792),
            columns,
            rows,
            label_width: Pt::from_i32(100),
            label_height: Pt::from_i32(50),
            margin_left: Pt::from_i32(20),
            margin_top: Pt::from_i32(30),
            horizontal_gap: Pt::from_i32(10),
            vertical_gap: Pt::from_i32(4),
        }
    }

    #[test]
    fn seven_records_on_two_by_three_grid() {
        let format = format(2, 3);
        assert_eq!(format.labels_per_page(), 6);
        assert_eq!(page_count(7, &format), 2);
        let placements = paginate(7, 0, &format);
        let last = placements[6];
        assert_eq!((last.page_index, last.row, last.column), (1, 0, 0));
        assert_eq!(last.record_index, 6);
        assert_eq!((last.x, last.y), (Pt::from_i32(20), Pt::from_i32(30)));
    }

    #[test]
    fn placement_is_row_major() {
        let format = format(2, 3);
        let placements = paginate(4, 0, &format);
        let slots: Vec<(usize, usize)> = placements.iter().map(|p| (p.row, p.column)).collect();
        assert_eq!(slots, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(placements[3].x, Pt::from_i32(130));
        assert_eq!(placements[3].y, Pt::from_i32(84));
    }

    #[test]
    fn zero_records_need_no_pages() {
        let format = format(2, 3);
        assert_eq!(page_count(0, &format), 0);
        assert!(paginate(0, 0, &format).is_empty());
    }

    #[test]
    fn skip_shifts_the_first_page() {
        let format = format(2, 3);
        let placements = paginate(2, 5, &format);
        assert_eq!(
            (placements[0].page_index, placements[0].row, placements[0].column),
            (0, 2, 1)
        );
        assert_eq!(
            (placements[1].page_index, placements[1].row, placements[1].column),
            (1, 0, 0)
        );
    }

    #[test]
    fn degenerate_grid_places_nothing() {
        let format = format(0, 3);
        assert!(grid_position(0, &format).is_none());
        assert!(paginate(3, 0, &format).is_empty());
        assert!(cut_marks(&format).is_empty());
    }

    #[test]
    fn grid_lines_sit_on_edges_and_gap_midpoints() {
        let f = format(2, 3);
        assert_eq!(grid_line(0, 2, f.margin_left, f.label_width, f.horizontal_gap), Pt::from_i32(20));
        assert_eq!(grid_line(1, 2, f.margin_left, f.label_width, f.horizontal_gap), Pt::from_i32(125));
        assert_eq!(grid_line(2, 2, f.margin_left, f.label_width, f.horizontal_gap), Pt::from_i32(230));
        assert_eq!(grid_line(3, 3, f.margin_top, f.label_height, f.vertical_gap), Pt::from_i32(188));
    }

    #[test]
    fn cut_mark_counts() {
        // 2x3 grid: 4 corners x 2 marks, 6 non-corner edge points x 1, 2 interior x 4.
        let marks = cut_marks(&format(2, 3));
        assert_eq!(marks.len(), 8 + 6 + 8);
    }

    #[test]
    fn top_left_corner_marks_point_outward() {
        let marks = cut_marks(&format(2, 3));
        let left = LineSegment::new(
            Pt::from_i32(17),
            Pt::from_i32(30),
            Pt::from_i32(8),
            Pt::from_i32(30),
        );
        let up = LineSegment::new(
            Pt::from_i32(20),
            Pt::from_i32(27),
            Pt::from_i32(20),
            Pt::from_i32(18),
        );
        assert_eq!(marks[0], left);
        assert_eq!(marks[1], up);
    }

    #[test]
    fn interior_marks_form_a_cross() {
        let marks = cut_marks(&format(2, 3));
        let center_x = Pt::from_i32(125);
        let center_y = Pt::from_i32(82);
        let cross: Vec<&LineSegment> = marks
            .iter()
            .filter(|m| m.x1 == center_x && m.y1 == center_y)
            .collect();
        assert_eq!(cross.len(), 4);
        assert!(cross.iter().any(|m| m.x2 == Pt::from_f32(120.5)));
        assert!(cross.iter().any(|m| m.y2 == Pt::from_f32(86.5)));
    }
}
