#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub is_line_break: bool,
}

impl StyledRun {
    pub fn line_break() -> Self {
        Self {
            is_line_break: true,
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, bold: bool, italic: bool, underline: bool) -> Self {
        Self {
            text: text.into(),
            bold,
            italic,
            underline,
            is_line_break: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, false, false, false)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Toggles {
    bold: bool,
    italic: bool,
    underline: bool,
}

struct Segmenter {
    runs: Vec<StyledRun>,
    buffer: String,
    toggles: Toggles,
}

impl Segmenter {
    fn new() -> Self {
        Self {
            runs: Vec::new(),
            buffer: String::new(),
            toggles: Toggles::default(),
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        self.runs.push(StyledRun::styled(
            text,
            self.toggles.bold,
            self.toggles.italic,
            self.toggles.underline,
        ));
    }

    fn line_break(&mut self) {
        self.flush();
        self.runs.push(StyledRun::line_break());
    }

    fn finish(mut self) -> Vec<StyledRun> {
        self.flush();
        self.runs
    }
}

// Splits merged text into styled runs and explicit line breaks. Toggle state starts
// cleared on every call.
pub fn segment(text: &str) -> Vec<StyledRun> {
    let chars: Vec<char> = text.chars().collect();
    let mut state = Segmenter::new();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };

        if ch == '\r' && next == Some('\n') {
            i += 1;
            continue;
        }
        if ch == '\n' {
            state.line_break();
            i += 1;
            continue;
        }
        if (ch == '*' || ch == '_') && next == Some(ch) {
            state.flush();
            state.toggles.bold = !state.toggles.bold;
            i += 2;
            continue;
        }
        if ch == '~' && next == Some('~') {
            state.flush();
            state.toggles.underline = !state.toggles.underline;
            i += 2;
            continue;
        }
        if ch == '*' || ch == '_' {
            if prev == Some('\\') {
                // Escaped: the marker and its backslash both stay in the text.
                state.buffer.push(ch);
            } else {
                state.flush();
                state.toggles.italic = !state.toggles.italic;
            }
            i += 1;
            continue;
        }
        state.buffer.push(ch);
        i += 1;
    }

    state.finish()
}

pub fn plain_text(runs: &[StyledRun]) -> String {
    let mut out = String::new();
    for run in runs {
        if run.is_line_break {
            out.push('\n');
        } else {
            out.push_str(&run.text);
        }
    }
    out
}
