use crate::error::LabelError;
use crate::font::TextMeasure;
use crate::markup::{StyledRun, segment};
use crate::types::{LineSegment, Pt, Rect};

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub width: Pt,
}

impl Fragment {
    fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    fn same_style(&self, other: &Fragment) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.underline == other.underline
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WrappedLine {
    pub fragments: Vec<Fragment>,
    pub width: Pt,
}

impl WrappedLine {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl HorizontalAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(HorizontalAlign::Left),
            "center" | "centre" => Some(HorizontalAlign::Center),
            "right" => Some(HorizontalAlign::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(VerticalAlign::Top),
            "middle" | "center" => Some(VerticalAlign::Middle),
            "bottom" => Some(VerticalAlign::Bottom),
            _ => None,
        }
    }
}

// Line pitch is fixed at 1.2 x font size.
pub fn line_height(font_size: Pt) -> Pt {
    font_size.mul_ratio(6, 5)
}

fn whitespace_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    let mut current: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match current {
            Some(kind) if kind == is_space => {}
            Some(_) => {
                tokens.push(&text[start..idx]);
                start = idx;
                current = Some(is_space);
            }
            None => current = Some(is_space),
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

struct LineBuilder {
    pieces: Vec<Fragment>,
    width: Pt,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            pieces: Vec::new(),
            width: Pt::ZERO,
        }
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn push(&mut self, piece: Fragment) {
        self.width += piece.width;
        self.pieces.push(piece);
    }

    // Drops trailing whitespace and merges neighbouring pieces that share a style.
    fn close(self) -> WrappedLine {
        let mut pieces = self.pieces;
        while pieces.last().is_some_and(Fragment::is_whitespace) {
            pieces.pop();
        }
        let mut fragments: Vec<Fragment> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match fragments.last_mut() {
                Some(last) if last.same_style(&piece) => {
                    last.text.push_str(&piece.text);
                    last.width += piece.width;
                }
                _ => fragments.push(piece),
            }
        }
        let width = fragments.iter().map(|f| f.width).sum();
        WrappedLine { fragments, width }
    }
}

// Greedy, style-aware wrapping. A token that does not fit closes the current line
// unless the line is still empty, so an over-wide word occupies a line of its own.
// Forced breaks always close the current line, even an empty one.
pub fn wrap_runs<M>(
    runs: &[StyledRun],
    max_width: Pt,
    font_size: Pt,
    measure: &M,
) -> Result<Vec<WrappedLine>, LabelError>
where
    M: TextMeasure + ?Sized,
{
    let mut lines = Vec::new();
    let mut current = LineBuilder::new();

    for run in runs {
        if run.is_line_break {
            lines.push(std::mem::replace(&mut current, LineBuilder::new()).close());
            continue;
        }
        for token in whitespace_tokens(&run.text) {
            let is_space = token.chars().all(char::is_whitespace);
            if is_space && current.is_empty() {
                continue;
            }
            let width = measure.measure(token, run.bold, run.italic, font_size)?;
            if !current.is_empty() && current.width + width > max_width {
                lines.push(std::mem::replace(&mut current, LineBuilder::new()).close());
                if is_space {
                    continue;
                }
            }
            current.push(Fragment {
                text: token.to_string(),
                bold: run.bold,
                italic: run.italic,
                underline: run.underline,
                width,
            });
        }
    }
    if !current.is_empty() {
        lines.push(current.close());
    }
    Ok(lines)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFragment {
    pub fragment: Fragment,
    pub x: Pt,
    // Top of the line box; the baseline sits one font size below.
    pub y: Pt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub fragments: Vec<PlacedFragment>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBlock {
    pub lines: Vec<PlacedLine>,
    pub underlines: Vec<LineSegment>,
    pub height: Pt,
}

// Positions wrapped lines inside `bounds`. Blocks taller or wider than the box are not
// clipped; they simply extend past its edges.
pub fn layout_block(
    lines: &[WrappedLine],
    bounds: Rect,
    font_size: Pt,
    h_align: HorizontalAlign,
    v_align: VerticalAlign,
) -> TextBlock {
    let pitch = line_height(font_size);
    let height = pitch * (lines.len() as i32);
    let mut y = match v_align {
        VerticalAlign::Top => bounds.y,
        VerticalAlign::Middle => bounds.y + (bounds.height - height) / 2,
        VerticalAlign::Bottom => bounds.y + bounds.height - height,
    };

    let mut placed = Vec::with_capacity(lines.len());
    let mut underlines = Vec::new();
    for line in lines {
        let x = match h_align {
            HorizontalAlign::Left => bounds.x,
            HorizontalAlign::Center => bounds.x + (bounds.width - line.width) / 2,
            HorizontalAlign::Right => bounds.x + bounds.width - line.width,
        };
        let mut cursor = x;
        let mut fragments = Vec::with_capacity(line.fragments.len());
        for fragment in &line.fragments {
            if fragment.underline {
                underlines.push(LineSegment::horizontal(
                    cursor,
                    y + font_size,
                    fragment.width,
                ));
            }
            fragments.push(PlacedFragment {
                fragment: fragment.clone(),
                x: cursor,
                y,
            });
            cursor += fragment.width;
        }
        placed.push(PlacedLine {
            x,
            y,
            width: line.width,
            fragments,
        });
        y += pitch;
    }

    TextBlock {
        lines: placed,
        underlines,
        height,
    }
}

pub fn layout_text<M>(
    text: &str,
    bounds: Rect,
    font_size: Pt,
    h_align: HorizontalAlign,
    v_align: VerticalAlign,
    measure: &M,
) -> Result<TextBlock, LabelError>
where
    M: TextMeasure + ?Sized,
{
    let runs = segment(text);
    let lines = wrap_runs(&runs, bounds.width, font_size, measure)?;
    Ok(layout_block(&lines, bounds, font_size, h_align, v_align))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every character is 5pt wide, bold characters 6pt.
    fn fixed_measure(text: &str, bold: bool, _italic: bool, _size: Pt) -> Result<Pt, LabelError> {
        let per_char = if bold { 6 } else { 5 };
        Ok(Pt::from_i32(per_char * text.chars().count() as i32))
    }

    fn unmeasurable(text: &str, _bold: bool, _italic: bool, _size: Pt) -> Result<Pt, LabelError> {
        if text.contains('?') {
            return Err(LabelError::Backend(format!("no glyph for '{text}'")));
        }
        Ok(Pt::from_i32(5 * text.chars().count() as i32))
    }

    fn texts(lines: &[WrappedLine]) -> Vec<String> {
        lines.iter().map(WrappedLine::text).collect()
    }

    fn size() -> Pt {
        Pt::from_i32(10)
    }

    #[test]
    fn tokens_alternate_whitespace() {
        assert_eq!(whitespace_tokens("  ab c\t\td "), vec!["  ", "ab", " ", "c", "\t\t", "d", " "]);
        assert!(whitespace_tokens("").is_empty());
    }

    #[test]
    fn greedy_wrap_respects_width() {
        let runs = vec![StyledRun::plain("aaa bbb ccc")];
        let lines = wrap_runs(&runs, Pt::from_i32(40), size(), &fixed_measure).expect("wrap");
        assert_eq!(texts(&lines), vec!["aaa bbb", "ccc"]);
        assert_eq!(lines[0].width, Pt::from_i32(35));
        for line in &lines {
            assert!(line.width <= Pt::from_i32(40));
        }
    }

    #[test]
    fn leading_whitespace_after_wrap_is_dropped() {
        let runs = vec![StyledRun::plain("   aaaa    bbbb")];
        let lines = wrap_runs(&runs, Pt::from_i32(25), size(), &fixed_measure).expect("wrap");
        assert_eq!(texts(&lines), vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn overwide_token_gets_its_own_line() {
        let runs = vec![StyledRun::plain("a verylongword b")];
        let lines = wrap_runs(&runs, Pt::from_i32(20), size(), &fixed_measure).expect("wrap");
        assert_eq!(texts(&lines), vec!["a", "verylongword", "b"]);
        assert_eq!(lines[1].width, Pt::from_i32(60));
    }

    #[test]
    fn forced_breaks_always_start_new_lines() {
        let runs = segment("ab\n\ncd\n");
        let lines = wrap_runs(&runs, Pt::from_i32(500), size(), &fixed_measure).expect("wrap");
        assert_eq!(texts(&lines), vec!["ab", "", "cd"]);
    }

    #[test]
    fn styles_are_measured_and_kept_per_fragment() {
        let runs = segment("**Bo**ld x");
        let lines = wrap_runs(&runs, Pt::from_i32(500), size(), &fixed_measure).expect("wrap");
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.fragments.len(), 2);
        assert!(line.fragments[0].bold);
        assert_eq!(line.fragments[0].width, Pt::from_i32(12));
        assert_eq!(line.fragments[1].text, "ld x");
        assert_eq!(line.width, Pt::from_i32(32));
    }

    #[test]
    fn empty_runs_produce_no_lines() {
        let lines = wrap_runs(&[], Pt::from_i32(10), size(), &fixed_measure).expect("wrap");
        assert!(lines.is_empty());
    }

    fn bounds() -> Rect {
        Rect::new(
            Pt::from_i32(100),
            Pt::from_i32(200),
            Pt::from_i32(100),
            Pt::from_i32(60),
        )
    }

    fn two_lines() -> Vec<WrappedLine> {
        wrap_runs(
            &segment("abcd\nab"),
            Pt::from_i32(100),
            size(),
            &fixed_measure,
        )
        .expect("wrap")
    }

    #[test]
    fn vertical_alignment_offsets() {
        let lines = two_lines();
        // Block height: 2 lines x 12pt.
        let top = layout_block(&lines, bounds(), size(), HorizontalAlign::Left, VerticalAlign::Top);
        assert_eq!(top.height, Pt::from_i32(24));
        assert_eq!(top.lines[0].y, Pt::from_i32(200));
        assert_eq!(top.lines[1].y, Pt::from_i32(212));

        let middle =
            layout_block(&lines, bounds(), size(), HorizontalAlign::Left, VerticalAlign::Middle);
        assert_eq!(middle.lines[0].y, Pt::from_i32(218));

        let bottom =
            layout_block(&lines, bounds(), size(), HorizontalAlign::Left, VerticalAlign::Bottom);
        assert_eq!(bottom.lines[0].y, Pt::from_i32(236));
        assert_eq!(bottom.lines[1].y, Pt::from_i32(248));
    }

    #[test]
    fn horizontal_alignment_offsets() {
        let lines = two_lines();
        let center =
            layout_block(&lines, bounds(), size(), HorizontalAlign::Center, VerticalAlign::Top);
        assert_eq!(center.lines[0].x, Pt::from_i32(140));
        assert_eq!(center.lines[1].x, Pt::from_i32(145));
        let right =
            layout_block(&lines, bounds(), size(), HorizontalAlign::Right, VerticalAlign::Top);
        assert_eq!(right.lines[0].x, Pt::from_i32(180));
        assert_eq!(right.lines[1].x, Pt::from_i32(190));
    }

    #[test]
    fn tall_block_is_not_clipped() {
        let lines = wrap_runs(
            &segment("a\nb\nc\nd\ne\nf"),
            Pt::from_i32(100),
            size(),
            &fixed_measure,
        )
        .expect("wrap");
        let block =
            layout_block(&lines, bounds(), size(), HorizontalAlign::Left, VerticalAlign::Middle);
        // 72pt block in a 60pt box starts 6pt above the box.
        assert_eq!(block.lines[0].y, Pt::from_i32(194));
        assert_eq!(block.lines.len(), 6);
    }

    #[test]
    fn underlined_fragments_yield_segments_at_baseline() {
        let block = layout_text(
            "ab ~~cd~~",
            bounds(),
            size(),
            HorizontalAlign::Left,
            VerticalAlign::Top,
            &fixed_measure,
        )
        .expect("layout");
        assert_eq!(block.underlines.len(), 1);
        let seg = block.underlines[0];
        assert_eq!(seg.x1, Pt::from_i32(115));
        assert_eq!(seg.x2, Pt::from_i32(125));
        assert_eq!(seg.y1, Pt::from_i32(210));
        assert_eq!(block.lines[0].fragments[1].x, Pt::from_i32(115));
    }

    #[test]
    fn measurement_failure_stops_wrapping() {
        let runs = segment("Ship to ??? today");
        let err = match wrap_runs(&runs, Pt::from_i32(100), size(), &unmeasurable) {
            Ok(_) => panic!("expected measurement failure"),
            Err(err) => err,
        };
        assert!(matches!(err, LabelError::Backend(ref cause) if cause == "no glyph for '???'"));
        assert!(
            layout_text(
                "ok?",
                bounds(),
                size(),
                HorizontalAlign::Left,
                VerticalAlign::Top,
                &unmeasurable,
            )
            .is_err()
        );
    }

    #[test]
    fn alignment_names_parse() {
        assert_eq!(HorizontalAlign::parse("Centre"), Some(HorizontalAlign::Center));
        assert_eq!(VerticalAlign::parse("bottom"), Some(VerticalAlign::Bottom));
        assert_eq!(VerticalAlign::parse("sideways"), None);
    }
}
