//! Type-safe PubMed query builder.
//!
//! Helps construct PubMed search terms with field tags and date ranges.
//!
//! # Example
//!
//! ```
//! use pubmed_mcp::QueryBuilder;
//!
//! let query = QueryBuilder::new()
//!     .author("Smith J")
//!     .and()
//!     .title("CRISPR")
//!     .build();
//! assert_eq!(query, "\"Smith J\"[Author] AND CRISPR[Title]");
//! ```

use crate::error::{PubMedError, Result};
use crate::types::AdvancedQuery;

/// Lower bound used when a date range has no start.
const EARLIEST_DATE: &str = "1800/01/01";

/// Upper bound used when a date range has no end.
const LATEST_DATE: &str = "3000";

/// Builder for constructing PubMed search terms.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    parts: Vec<String>,
}

impl QueryBuilder {
    /// Create a new empty query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free-text term searched in all fields.
    pub fn term(mut self, text: &str) -> Self {
        self.parts.push(text.trim().to_string());
        self
    }

    /// Add a title search term.
    pub fn title(self, text: &str) -> Self {
        self.tagged(text, "Title")
    }

    /// Add a title-or-abstract search term.
    pub fn title_abstract(self, text: &str) -> Self {
        self.tagged(text, "Title/Abstract")
    }

    /// Add an author search term ("Smith J" or "Smith John").
    pub fn author(self, name: &str) -> Self {
        self.tagged(name, "Author")
    }

    /// Add a journal filter (full title, abbreviation or ISSN).
    pub fn journal(self, name: &str) -> Self {
        self.tagged(name, "Journal")
    }

    /// Add a MeSH heading filter.
    pub fn mesh(self, heading: &str) -> Self {
        self.tagged(heading, "MeSH Terms")
    }

    /// Add a publication type filter (e.g., "Review", "Clinical Trial").
    pub fn publication_type(self, kind: &str) -> Self {
        self.tagged(kind, "Publication Type")
    }

    /// Add an inclusive publication date range. Dates are `YYYY[/MM[/DD]]`.
    pub fn date_range(mut self, from: &str, to: &str) -> Self {
        self.parts.push(format!(
            "(\"{}\"[Date - Publication] : \"{}\"[Date - Publication])",
            from, to
        ));
        self
    }

    /// Add an AND operator.
    pub fn and(mut self) -> Self {
        self.parts.push("AND".to_string());
        self
    }

    /// Add an OR operator.
    pub fn or(mut self) -> Self {
        self.parts.push("OR".to_string());
        self
    }

    /// Add a NOT operator (exclude the following term).
    pub fn exclude(mut self) -> Self {
        self.parts.push("NOT".to_string());
        self
    }

    /// Add a raw query fragment (no escaping).
    pub fn raw(mut self, query: &str) -> Self {
        self.parts.push(query.to_string());
        self
    }

    /// True when nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build the final query string.
    pub fn build(self) -> String {
        self.parts.join(" ")
    }

    /// Translate advanced-search filters into a single PubMed term.
    ///
    /// Filters are ANDed in the order term, title, author, journal, dates.
    /// A lone start or end date is completed with an open bound.
    pub fn from_advanced(query: &AdvancedQuery) -> Result<String> {
        let mut qb = Self::new();

        let text_filters: [(Option<&str>, fn(Self, &str) -> Self); 4] = [
            (non_blank(&query.term), Self::term),
            (non_blank(&query.title), Self::title),
            (non_blank(&query.author), Self::author),
            (non_blank(&query.journal), Self::journal),
        ];
        for (value, add) in text_filters {
            if let Some(v) = value {
                if !qb.is_empty() {
                    qb = qb.and();
                }
                qb = add(qb, v);
            }
        }

        let start = non_blank(&query.start_date);
        let end = non_blank(&query.end_date);
        if start.is_some() || end.is_some() {
            let from = start.map(validate_date).transpose()?.unwrap_or(EARLIEST_DATE);
            let to = end.map(validate_date).transpose()?.unwrap_or(LATEST_DATE);
            if !qb.is_empty() {
                qb = qb.and();
            }
            qb = qb.date_range(from, to);
        }

        if qb.is_empty() {
            return Err(PubMedError::InvalidQuery(
                "at least one search filter is required".into(),
            ));
        }
        Ok(qb.build())
    }

    fn tagged(mut self, value: &str, tag: &str) -> Self {
        let value = value.trim();
        if value.contains(char::is_whitespace) {
            self.parts.push(format!("\"{}\"[{}]", value, tag));
        } else {
            self.parts.push(format!("{}[{}]", value, tag));
        }
        self
    }
}

impl std::fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.parts.join(" "))
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accept `YYYY`, `YYYY/MM` or `YYYY/MM/DD`.
fn validate_date(date: &str) -> Result<&str> {
    let parts: Vec<&str> = date.split('/').collect();
    let widths_ok = match parts.as_slice() {
        [y] => y.len() == 4,
        [y, m] => y.len() == 4 && m.len() == 2,
        [y, m, d] => y.len() == 4 && m.len() == 2 && d.len() == 2,
        _ => false,
    };
    if widths_ok && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        Ok(date)
    } else {
        Err(PubMedError::InvalidQuery(format!(
            "invalid date '{}', expected YYYY/MM/DD",
            date
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_author_query() {
        let q = QueryBuilder::new().author("Smith").build();
        assert_eq!(q, "Smith[Author]");
    }

    #[test]
    fn test_multi_word_values_are_quoted() {
        let q = QueryBuilder::new()
            .journal("Nature Medicine")
            .and()
            .mesh("Neoplasms")
            .build();
        assert_eq!(q, "\"Nature Medicine\"[Journal] AND Neoplasms[MeSH Terms]");
    }

    #[test]
    fn test_date_range() {
        let q = QueryBuilder::new().date_range("2020/01/01", "2021/12/31").build();
        assert_eq!(
            q,
            "(\"2020/01/01\"[Date - Publication] : \"2021/12/31\"[Date - Publication])"
        );
    }

    #[test]
    fn test_from_advanced_all_fields() {
        let adv = AdvancedQuery {
            term: Some("cancer".into()),
            title: Some("immunotherapy".into()),
            author: Some("Smith J".into()),
            journal: Some("Lancet".into()),
            start_date: Some("2020/01/01".into()),
            end_date: Some("2022/12/31".into()),
        };
        let q = QueryBuilder::from_advanced(&adv).unwrap();
        assert_eq!(
            q,
            "cancer AND immunotherapy[Title] AND \"Smith J\"[Author] AND Lancet[Journal] AND (\"2020/01/01\"[Date - Publication] : \"2022/12/31\"[Date - Publication])"
        );
    }

    #[test]
    fn test_from_advanced_open_ended_dates() {
        let adv = AdvancedQuery {
            start_date: Some("2019".into()),
            ..Default::default()
        };
        let q = QueryBuilder::from_advanced(&adv).unwrap();
        assert_eq!(
            q,
            "(\"2019\"[Date - Publication] : \"3000\"[Date - Publication])"
        );

        let adv = AdvancedQuery {
            term: Some("malaria".into()),
            end_date: Some("2000/06".into()),
            ..Default::default()
        };
        let q = QueryBuilder::from_advanced(&adv).unwrap();
        assert!(q.starts_with("malaria AND (\"1800/01/01\""));
    }

    #[test]
    fn test_from_advanced_rejects_empty() {
        let err = QueryBuilder::from_advanced(&AdvancedQuery::default()).unwrap_err();
        assert!(matches!(err, PubMedError::InvalidQuery(_)));
    }

    #[test]
    fn test_from_advanced_rejects_bad_date() {
        let adv = AdvancedQuery {
            term: Some("x".into()),
            start_date: Some("01-01-2020".into()),
            ..Default::default()
        };
        let err = QueryBuilder::from_advanced(&adv).unwrap_err();
        assert!(err.to_string().contains("01-01-2020"));
    }
}
