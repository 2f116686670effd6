use std::collections::{HashMap, HashSet};

// Lower-cased, trimmed header spellings that commonly appear in address exports.
const KNOWN_HEADERS: &[&str] = &[
    "name",
    "full name",
    "fullname",
    "full_name",
    "first name",
    "firstname",
    "first_name",
    "first",
    "given name",
    "middle name",
    "middlename",
    "middle",
    "last name",
    "lastname",
    "last_name",
    "last",
    "surname",
    "family name",
    "title",
    "prefix",
    "suffix",
    "salutation",
    "attention",
    "attn",
    "company",
    "company name",
    "organization",
    "organisation",
    "business",
    "department",
    "dept",
    "address",
    "address1",
    "address 1",
    "address_1",
    "address line 1",
    "address2",
    "address 2",
    "address_2",
    "address line 2",
    "street",
    "street address",
    "street1",
    "street2",
    "suite",
    "apt",
    "apartment",
    "unit",
    "po box",
    "city",
    "town",
    "locality",
    "state",
    "province",
    "region",
    "county",
    "st",
    "zip",
    "zipcode",
    "zip code",
    "zip_code",
    "postal code",
    "postalcode",
    "postal_code",
    "postcode",
    "post code",
    "country",
    "email",
    "e-mail",
    "email address",
    "phone",
    "telephone",
    "tel",
    "mobile",
    "cell",
    "fax",
    "website",
    "notes",
];

pub fn is_known_header(field: &str) -> bool {
    let key = field.trim().to_lowercase();
    KNOWN_HEADERS.contains(&key.as_str())
}

// A first row is a header row with at least two dictionary hits, or with any hit that
// covers at least half of its fields.
pub fn classify_header_row(fields: &[String]) -> bool {
    let matches = fields.iter().filter(|field| is_known_header(field)).count();
    matches >= 2 || (matches > 0 && matches * 2 >= fields.len())
}

pub fn normalize_header(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || *ch == '-' || *ch == '_')
        .collect();
    kept.split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|word| !word.is_empty())
        .map(capitalize_first)
        .collect()
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Normalizes a header row and makes every name unique. The k-th repeat of a name
// (k >= 2) gets `k` appended; an empty normalized name becomes `ColumnN`.
pub fn unique_headers(raw: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for (index, field) in raw.iter().enumerate() {
        let mut base = normalize_header(field);
        if base.is_empty() {
            base = format!("Column{}", index + 1);
        }
        let count = counts.entry(base.clone()).or_insert(0);
        *count += 1;
        let mut occurrence = *count;
        let mut candidate = if occurrence == 1 {
            base.clone()
        } else {
            format!("{base}{occurrence}")
        };
        while taken.contains(&candidate) {
            occurrence += 1;
            candidate = format!("{base}{occurrence}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

pub fn synthetic_headers(count: usize) -> Vec<String> {
    (1..=count).map(|index| format!("Column{index}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn two_dictionary_hits_make_a_header_row() {
        assert!(classify_header_row(&row(&["Name", "Street", "Foo", "Bar", "Baz"])));
    }

    #[test]
    fn single_hit_needs_half_the_fields() {
        assert!(classify_header_row(&row(&["  EMAIL ", "x"])));
        assert!(!classify_header_row(&row(&["email", "x", "y"])));
    }

    #[test]
    fn zero_hits_is_data() {
        assert!(!classify_header_row(&row(&["A1", "B1"])));
        assert!(!classify_header_row(&row(&[])));
    }

    #[test]
    fn normalization_builds_pascal_case() {
        assert_eq!(normalize_header("first name"), "FirstName");
        assert_eq!(normalize_header("zip-code"), "ZipCode");
        assert_eq!(normalize_header("address_line_2"), "AddressLine2");
        assert_eq!(normalize_header("E-mail (work)!"), "EMailWork");
        assert_eq!(normalize_header("FirstName"), "FirstName");
    }

    #[test]
    fn duplicates_are_suffixed_from_second_occurrence() {
        let headers = unique_headers(&row(&["City", "city", "City", "State"]));
        assert_eq!(headers, vec!["City", "City2", "City3", "State"]);
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        let headers = unique_headers(&row(&["City2", "City", "City"]));
        assert_eq!(headers, vec!["City2", "City", "City3"]);
    }

    #[test]
    fn empty_normalized_name_falls_back_to_column() {
        let headers = unique_headers(&row(&["Name", "###", ""]));
        assert_eq!(headers, vec!["Name", "Column2", "Column3"]);
    }

    #[test]
    fn synthetic_headers_are_one_based() {
        assert_eq!(synthetic_headers(3), vec!["Column1", "Column2", "Column3"]);
    }
}
