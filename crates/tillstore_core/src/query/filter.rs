//! Filter-string parser.
//!
//! Syntax: `key1 = value1, key2 = value2`. Pairs are split on `,`, then on
//! the single `=` of each pair. Whitespace around pairs, keys and values is
//! dropped. There is no escaping, so values cannot contain `,` or `=`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordered `(attribute, literal)` pairs extracted from a filter string.
pub type FilterSpec = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Input was empty or only whitespace.
    Empty,
    /// A comma-separated segment did not contain exactly one `=`.
    Malformed { segment: String, equals_signs: usize },
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "filter string is empty"),
            Self::Malformed {
                segment,
                equals_signs,
            } => write!(
                f,
                "malformed filter segment `{segment}`: expected exactly one `=`, found {equals_signs}"
            ),
        }
    }
}

impl Error for FilterError {}

/// Parses a filter string into ordered pairs.
///
/// # Errors
/// - `FilterError::Empty` for blank input.
/// - `FilterError::Malformed` for any segment with zero or several `=`,
///   including the empty segment left by a trailing comma.
pub fn parse(filter: &str) -> Result<FilterSpec, FilterError> {
    if filter.trim().is_empty() {
        return Err(FilterError::Empty);
    }

    filter.split(',').map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Result<(String, String), FilterError> {
    let trimmed = segment.trim();
    let equals_signs = trimmed.matches('=').count();
    match trimmed.split_once('=') {
        Some((key, value)) if equals_signs == 1 => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(FilterError::Malformed {
            segment: trimmed.to_string(),
            equals_signs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, FilterError};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn parses_pairs_in_order_and_trims_whitespace() {
        let parsed = parse("  name = Pizza-lrg ,color=two-toppings,  price =19.99").unwrap();
        assert_eq!(
            parsed,
            pairs(&[
                ("name", "Pizza-lrg"),
                ("color", "two-toppings"),
                ("price", "19.99"),
            ])
        );
    }

    #[test]
    fn single_pair_without_spaces() {
        assert_eq!(parse("name=Pizza").unwrap(), pairs(&[("name", "Pizza")]));
    }

    #[test]
    fn keeps_duplicate_keys_and_inner_spaces() {
        let parsed = parse("name = Large Pizza, name = Small Pizza").unwrap();
        assert_eq!(
            parsed,
            pairs(&[("name", "Large Pizza"), ("name", "Small Pizza")])
        );
    }

    #[test]
    fn empty_key_and_value_are_left_to_the_builder() {
        assert_eq!(parse(" = ").unwrap(), pairs(&[("", "")]));
    }

    #[test]
    fn blank_input_is_empty_error() {
        assert_eq!(parse(""), Err(FilterError::Empty));
        assert_eq!(parse(" \t "), Err(FilterError::Empty));
    }

    #[test]
    fn segment_without_equals_is_malformed() {
        assert_eq!(
            parse("name=Pizza, large"),
            Err(FilterError::Malformed {
                segment: "large".to_string(),
                equals_signs: 0,
            })
        );
    }

    #[test]
    fn segment_with_two_equals_is_malformed() {
        assert_eq!(
            parse("name=Pizza=Large"),
            Err(FilterError::Malformed {
                segment: "name=Pizza=Large".to_string(),
                equals_signs: 2,
            })
        );
    }

    #[test]
    fn trailing_comma_leaves_malformed_empty_segment() {
        assert_eq!(
            parse("name=Pizza,"),
            Err(FilterError::Malformed {
                segment: String::new(),
                equals_signs: 0,
            })
        );
    }
}
