//! Results of `Store::query_one` and `Store::rollback`.

use crate::model::record::Record;
use std::fmt::{Display, Formatter};

/// More than one record matched a single-record lookup.
///
/// Carried alongside the returned record; never raised as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleResultsWarning {
    pub record_type: String,
    pub filter: String,
    pub match_count: usize,
    /// First match in insertion order, the same record the lookup returned.
    pub returned: Record,
}

impl Display for MultipleResultsWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "multiple results returned: type = {}, query = {:?}, matches = {}; returning first result {}",
            self.record_type, self.filter, self.match_count, self.returned
        )
    }
}

/// Outcome of a single-record lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOne {
    /// `None` when nothing matched or no query was made.
    pub record: Option<Record>,
    /// Set when several records matched and the first one was chosen.
    pub warning: Option<MultipleResultsWarning>,
}

impl QueryOne {
    /// Picks the first of `matches` and flags ambiguity.
    pub(crate) fn resolve(record_type: &str, filter: &str, matches: Vec<Record>) -> Self {
        let match_count = matches.len();
        let first = matches.into_iter().next();
        let warning = match &first {
            Some(returned) if match_count > 1 => Some(MultipleResultsWarning {
                record_type: record_type.to_string(),
                filter: filter.to_string(),
                match_count,
                returned: returned.clone(),
            }),
            _ => None,
        };

        Self {
            record: first,
            warning,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.warning.is_some()
    }

    pub fn into_record(self) -> Option<Record> {
        self.record
    }
}

/// What `Store::rollback` discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollback {
    /// Pending inserts that never reached the database.
    pub discarded: Vec<Record>,
    /// Last-committed state of every record that was dirty.
    pub reverted: Vec<Record>,
}

impl Rollback {
    pub fn is_empty(&self) -> bool {
        self.discarded.is_empty() && self.reverted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryOne;
    use crate::model::record::Record;

    #[test]
    fn resolve_distinguishes_none_one_and_many() {
        let empty = QueryOne::resolve("items", "name=x", Vec::new());
        assert_eq!(empty, QueryOne::default());

        let one = QueryOne::resolve("items", "name=x", vec![Record::new("items").with("n", 1_i64)]);
        assert!(one.record.is_some());
        assert!(!one.is_ambiguous());

        let first = Record::new("items").with("n", 1_i64);
        let second = Record::new("items").with("n", 2_i64);
        let many = QueryOne::resolve("items", "name=x", vec![first.clone(), second]);
        let warning = many.warning.clone().unwrap();
        assert_eq!(warning.match_count, 2);
        assert_eq!(warning.returned, first);
        assert_eq!(many.into_record(), Some(first));
    }

    #[test]
    fn warning_message_names_type_filter_and_record() {
        let first = Record::new("items").with("name", "Pizza");
        let many = QueryOne::resolve("items", "name = Pizza", vec![first.clone(), first]);
        let message = many.warning.unwrap().to_string();
        assert!(message.contains("type = items"));
        assert!(message.contains("\"name = Pizza\""));
        assert!(message.contains("items<transient, name=\"Pizza\">"));
    }
}
