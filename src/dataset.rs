use crate::delimited::{Delimiter, parse_rows};
use crate::header::{classify_header_row, synthetic_headers, unique_headers};
use std::sync::Arc;

// One data row. Every record of a dataset has exactly one value per header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Record {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|name| name == header)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    headers: Arc<[String]>,
    rows: Vec<Record>,
    has_headers: bool,
    delimiter: Delimiter,
}

impl Dataset {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn has_headers(&self) -> bool {
        self.has_headers
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// Builds a rectangular dataset from raw delimited text. Never fails: malformed input
// degrades to a best-effort dataset, and empty input yields no headers and no rows.
pub fn parse_dataset(text: &str) -> Dataset {
    let parsed = parse_rows(text);
    let mut rows = parsed.rows.into_iter();
    let Some(first) = rows.next() else {
        return Dataset {
            headers: Arc::from(Vec::<String>::new()),
            rows: Vec::new(),
            has_headers: false,
            delimiter: parsed.delimiter,
        };
    };

    let has_headers = classify_header_row(&first);
    let (headers, data): (Vec<String>, Vec<Vec<String>>) = if has_headers {
        (unique_headers(&first), rows.collect())
    } else {
        (
            synthetic_headers(first.len()),
            std::iter::once(first).chain(rows).collect(),
        )
    };

    let headers: Arc<[String]> = Arc::from(headers);
    let width = headers.len();
    let rows = data
        .into_iter()
        .map(|mut values| {
            values.resize(width, String::new());
            Record {
                headers: headers.clone(),
                values,
            }
        })
        .collect();

    Dataset {
        headers,
        rows,
        has_headers,
        delimiter: parsed.delimiter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_is_detected_and_consumed() {
        let dataset = parse_dataset("FirstName,LastName\nJohn,Doe\nJane,Smith");
        assert!(dataset.has_headers());
        assert_eq!(dataset.headers(), ["FirstName", "LastName"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].get("FirstName"), Some("John"));
        assert_eq!(dataset.rows()[1].get("LastName"), Some("Smith"));
    }

    #[test]
    fn unrecognized_first_row_is_data() {
        let dataset = parse_dataset("A1,B1\nA2,B2");
        assert!(!dataset.has_headers());
        assert_eq!(dataset.headers(), ["Column1", "Column2"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].get("Column1"), Some("A1"));
        assert_eq!(dataset.rows()[1].get("Column2"), Some("B2"));
    }

    #[test]
    fn ragged_rows_are_padded_and_truncated() {
        let dataset = parse_dataset("Name,City,Zip\nAda\nBob,Paris,75001,extra,more");
        assert_eq!(dataset.headers().len(), 3);
        for record in dataset.rows() {
            assert_eq!(record.len(), dataset.headers().len());
        }
        assert_eq!(dataset.rows()[0].get("City"), Some(""));
        assert_eq!(dataset.rows()[1].get("Zip"), Some("75001"));
    }

    #[test]
    fn synthetic_width_follows_first_row() {
        let dataset = parse_dataset("a,b\nc,d,e");
        assert_eq!(dataset.headers(), ["Column1", "Column2"]);
        assert_eq!(dataset.rows()[1].values(), ["c", "d"]);
    }

    #[test]
    fn empty_field_is_present_not_absent() {
        let dataset = parse_dataset("Name,Company\nAda,");
        let record = &dataset.rows()[0];
        assert_eq!(record.get("Company"), Some(""));
        assert_eq!(record.get("Missing"), None);
    }

    #[test]
    fn empty_input_gives_empty_dataset() {
        let dataset = parse_dataset("   \n");
        assert!(dataset.is_empty());
        assert!(dataset.headers().is_empty());
        assert!(!dataset.has_headers());
    }

    #[test]
    fn header_only_input_has_no_rows() {
        let dataset = parse_dataset("Name,Address,City\n");
        assert!(dataset.has_headers());
        assert!(dataset.is_empty());
    }

    #[test]
    fn record_iterates_in_header_order() {
        let dataset = parse_dataset("Name\tCity\nAda\tLondon");
        let pairs: Vec<(&str, &str)> = dataset.rows()[0].iter().collect();
        assert_eq!(pairs, vec![("Name", "Ada"), ("City", "London")]);
        assert_eq!(dataset.delimiter(), Delimiter::Tab);
    }
}
