use crate::error::LabelError;
use crate::types::Pt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// Width measurement supplied by the rendering backend. A failure aborts the whole
// generation run and reaches the caller unchanged.
pub trait TextMeasure {
    fn measure(&self, text: &str, bold: bool, italic: bool, font_size: Pt)
    -> Result<Pt, LabelError>;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, bool, bool, Pt) -> Result<Pt, LabelError>,
{
    fn measure(
        &self,
        text: &str,
        bold: bool,
        italic: bool,
        font_size: Pt,
    ) -> Result<Pt, LabelError> {
        self(text, bold, italic, font_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans" | "sans-serif" => Some(FontFamily::Helvetica),
            "times" | "times-roman" | "serif" => Some(FontFamily::Times),
            "courier" | "mono" | "monospace" => Some(FontFamily::Courier),
            _ => None,
        }
    }

    // Base-14 PostScript name of the face for a style combination.
    pub fn face_name(self, bold: bool, italic: bool) -> &'static str {
        match self {
            FontFamily::Helvetica => match (bold, italic) {
                (true, true) => "Helvetica-BoldOblique",
                (true, false) => "Helvetica-Bold",
                (false, true) => "Helvetica-Oblique",
                (false, false) => "Helvetica",
            },
            FontFamily::Times => match (bold, italic) {
                (true, true) => "Times-BoldItalic",
                (true, false) => "Times-Bold",
                (false, true) => "Times-Italic",
                (false, false) => "Times-Roman",
            },
            FontFamily::Courier => match (bold, italic) {
                (true, true) => "Courier-BoldOblique",
                (true, false) => "Courier-Bold",
                (false, true) => "Courier-Oblique",
                (false, false) => "Courier",
            },
        }
    }

    fn advance(self, ch: char, bold: bool, italic: bool) -> u16 {
        let table: &[u16; 95] = match (self, bold, italic) {
            (FontFamily::Courier, _, _) => return 600,
            (FontFamily::Helvetica, false, _) => &HELVETICA_WIDTHS,
            (FontFamily::Helvetica, true, _) => &HELVETICA_BOLD_WIDTHS,
            (FontFamily::Times, false, false) => &TIMES_ROMAN_WIDTHS,
            (FontFamily::Times, false, true) => &TIMES_ITALIC_WIDTHS,
            (FontFamily::Times, true, _) => &TIMES_BOLD_WIDTHS,
        };
        let code = ch as u32;
        if (32..=126).contains(&code) {
            table[(code - 32) as usize]
        } else {
            self.missing_width()
        }
    }

    fn missing_width(self) -> u16 {
        match self {
            FontFamily::Helvetica => 556,
            FontFamily::Times => 500,
            FontFamily::Courier => 600,
        }
    }
}

// AFM advance widths (1/1000 em) for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

const TIMES_ITALIC_WIDTHS: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    text: String,
    bold: bool,
    italic: bool,
    size_milli: i64,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, Pt>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<Pt> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: Pt) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

#[derive(Debug)]
pub struct Base14Metrics {
    family: FontFamily,
    cache: Mutex<TextWidthCache>,
}

impl Base14Metrics {
    pub fn new(family: FontFamily) -> Self {
        Self {
            family,
            cache: Mutex::new(TextWidthCache::new(8_192)),
        }
    }

    pub fn family(&self) -> FontFamily {
        self.family
    }

    fn compute(&self, text: &str, bold: bool, italic: bool, font_size: Pt) -> Pt {
        let units: i64 = text
            .chars()
            .map(|ch| self.family.advance(ch, bold, italic) as i64)
            .sum();
        if units <= 0 {
            return Pt::ZERO;
        }
        let units = units.min(i32::MAX as i64) as i32;
        font_size.mul_ratio(units, 1000)
    }
}

impl Default for Base14Metrics {
    fn default() -> Self {
        Self::new(FontFamily::Helvetica)
    }
}

impl TextMeasure for Base14Metrics {
    fn measure(
        &self,
        text: &str,
        bold: bool,
        italic: bool,
        font_size: Pt,
    ) -> Result<Pt, LabelError> {
        if text.is_empty() {
            return Ok(Pt::ZERO);
        }
        let key = TextWidthKey {
            text: text.to_string(),
            bold,
            italic,
            size_milli: font_size.to_milli_i64(),
        };
        if let Ok(cache) = self.cache.lock() {
            if let Some(value) = cache.get(&key) {
                return Ok(value);
            }
        }
        let value = self.compute(text, bold, italic, font_size);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_follow_afm() {
        let metrics = Base14Metrics::default();
        let size = Pt::from_i32(10);
        // H(722) + i(222) = 944 units.
        assert_eq!(metrics.measure("Hi", false, false, size).expect("width"), Pt::from_f32(9.44));
        // Bold: H(722) + i(278) = 1000 units.
        assert_eq!(metrics.measure("Hi", true, false, size).expect("width"), Pt::from_i32(10));
        // Oblique shares upright widths.
        assert_eq!(
            metrics.measure("Hi", false, true, size).expect("width"),
            metrics.measure("Hi", false, false, size).expect("width")
        );
    }

    #[test]
    fn courier_is_monospaced() {
        let metrics = Base14Metrics::new(FontFamily::Courier);
        let size = Pt::from_i32(10);
        assert_eq!(metrics.measure("iiii", true, true, size).expect("width"), Pt::from_i32(24));
        assert_eq!(metrics.measure("WWWW", false, false, size).expect("width"), Pt::from_i32(24));
    }

    #[test]
    fn non_ascii_uses_missing_width() {
        let metrics = Base14Metrics::new(FontFamily::Times);
        assert_eq!(
            metrics.measure("\u{e9}", false, false, Pt::from_i32(10)).expect("width"),
            Pt::from_i32(5)
        );
    }

    #[test]
    fn cached_value_matches_fresh_value() {
        let metrics = Base14Metrics::default();
        let size = Pt::from_f32(11.5);
        let first = metrics.measure("Label", false, false, size).expect("width");
        let second = metrics.measure("Label", false, false, size).expect("width");
        assert_eq!(first, second);
        assert_eq!(metrics.measure("", true, true, size).expect("width"), Pt::ZERO);
    }

    #[test]
    fn cache_evicts_oldest_entries() {
        let mut cache = TextWidthCache::new(2);
        for (idx, text) in ["a", "b", "c"].iter().enumerate() {
            cache.insert(
                TextWidthKey {
                    text: text.to_string(),
                    bold: false,
                    italic: false,
                    size_milli: 1000,
                },
                Pt::from_i32(idx as i32),
            );
        }
        let oldest = TextWidthKey {
            text: "a".to_string(),
            bold: false,
            italic: false,
            size_milli: 1000,
        };
        assert!(cache.get(&oldest).is_none());
        assert_eq!(cache.map.len(), 2);
    }

    #[test]
    fn closures_are_measures() {
        let fixed = |text: &str, _bold: bool, _italic: bool, _size: Pt| -> Result<Pt, LabelError> {
            Ok(Pt::from_i32(text.chars().count() as i32))
        };
        let width = fixed.measure("abc", false, false, Pt::from_i32(9)).expect("width");
        assert_eq!(width, Pt::from_i32(3));
    }

    #[test]
    fn closure_errors_pass_through() {
        let offline = |_text: &str, _bold: bool, _italic: bool, _size: Pt| -> Result<Pt, LabelError> {
            Err(LabelError::Backend("metrics service offline".to_string()))
        };
        let err = match offline.measure("abc", false, false, Pt::from_i32(9)) {
            Ok(_) => panic!("expected measurement failure"),
            Err(err) => err,
        };
        assert!(matches!(err, LabelError::Backend(ref cause) if cause == "metrics service offline"));
    }

    #[test]
    fn family_names_resolve() {
        assert_eq!(FontFamily::parse(" Times "), Some(FontFamily::Times));
        assert_eq!(FontFamily::parse("comic"), None);
        assert_eq!(FontFamily::Helvetica.face_name(true, true), "Helvetica-BoldOblique");
        assert_eq!(FontFamily::Times.face_name(false, false), "Times-Roman");
    }
}
