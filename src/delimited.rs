#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Comma => "comma",
            Delimiter::Tab => "tab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRows {
    pub delimiter: Delimiter,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

// Splits on `\n` and `\r\n`, dropping lines that are blank after trimming.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

// Tab wins only when the line has strictly more tabs than commas.
pub fn detect_delimiter(line: &str) -> Delimiter {
    let tabs = line.chars().filter(|ch| *ch == '\t').count();
    let commas = line.chars().filter(|ch| *ch == ',').count();
    if tabs > commas {
        Delimiter::Tab
    } else {
        Delimiter::Comma
    }
}

pub fn tokenize_line(line: &str, delimiter: Delimiter) -> Vec<String> {
    let delim = delimiter.as_char();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = ScanState::Unquoted;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            ScanState::Unquoted => {
                if ch == delim {
                    fields.push(field.trim().to_string());
                    field.clear();
                } else if ch == '"' {
                    state = ScanState::Quoted;
                } else {
                    field.push(ch);
                }
            }
            ScanState::Quoted => {
                if ch == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        state = ScanState::Unquoted;
                    }
                } else {
                    field.push(ch);
                }
            }
        }
    }
    fields.push(field.trim().to_string());
    fields
}

pub fn parse_rows(text: &str) -> ParsedRows {
    let lines = split_lines(text);
    let delimiter = lines
        .first()
        .map(|line| detect_delimiter(line))
        .unwrap_or(Delimiter::Comma);
    let rows = lines
        .iter()
        .map(|line| tokenize_line(line, delimiter))
        .collect();
    ParsedRows { delimiter, rows }
}
