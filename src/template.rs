use crate::dataset::Record;

const OPEN: &str = "<<";
const CLOSE: &str = ">>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub resolved: usize,
    pub unresolved: usize,
}

// Replaces every `<<Identifier>>` whose trimmed identifier names a header of `record`.
// Unknown placeholders are copied through verbatim and substituted values are never
// scanned again.
pub fn substitute(template: &str, record: &Record) -> String {
    substitute_counted(template, record).text
}

pub fn substitute_counted(template: &str, record: &Record) -> Substitution {
    let mut out = String::with_capacity(template.len());
    let mut resolved = 0usize;
    let mut unresolved = 0usize;
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        let identifier = after_open[..end].trim();
        match record.get(identifier) {
            Some(value) => {
                out.push_str(value);
                resolved += 1;
            }
            None => {
                out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]);
                unresolved += 1;
            }
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    out.push_str(rest);

    Substitution {
        text: out,
        resolved,
        unresolved,
    }
}

pub fn placeholders(template: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        out.push(after_open[..end].trim().to_string());
        rest = &after_open[end + CLOSE.len()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_dataset;

    fn first_record(text: &str) -> Record {
        parse_dataset(text).rows()[0].clone()
    }

    #[test]
    fn replaces_known_placeholders() {
        let record = first_record("FirstName,LastName\nJohn,Doe");
        assert_eq!(substitute("<<FirstName>> <<LastName>>", &record), "John Doe");
    }

    #[test]
    fn identifier_is_trimmed() {
        let record = first_record("Name,City\nAda,London");
        assert_eq!(substitute("<< City >>", &record), "London");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let record = first_record("Name,City\nAda,London");
        let template = "Return to sender\n**Fragile** < > >> <";
        assert_eq!(substitute(template, &record), template);
    }

    #[test]
    fn unknown_placeholder_stays_literal() {
        let record = first_record("Name,City\nAda,London");
        let result = substitute_counted("<<Name>> <<Unknown>>", &record);
        assert_eq!(result.text, "Ada <<Unknown>>");
        assert_eq!(result.resolved, 1);
        assert_eq!(result.unresolved, 1);
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let record = first_record("Name,City\n<<City>>,London");
        assert_eq!(substitute("<<Name>>", &record), "<<City>>");
    }

    #[test]
    fn unclosed_marker_is_copied() {
        let record = first_record("Name,City\nAda,London");
        assert_eq!(substitute("<<Name>> <<City", &record), "Ada <<City");
    }

    #[test]
    fn empty_value_replaces_with_nothing() {
        let record = first_record("Name,Company\nAda,");
        assert_eq!(substitute("[<<Company>>]", &record), "[]");
    }

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(
            placeholders("<<A>>, << B >> and <<C"),
            vec!["A".to_string(), "B".to_string()]
        );
    }
}
