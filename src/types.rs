//! Public types for the PubMed client.
//!
//! Article records serialize with the key names agents already expect from
//! PubMed tooling ("PMID", "Title", "Authors", ...).

use serde::{Deserialize, Serialize};

/// A PubMed article record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// PubMed identifier.
    #[serde(rename = "PMID")]
    pub pmid: String,
    /// Article title.
    #[serde(rename = "Title")]
    pub title: String,
    /// Author names, serialized as one comma-separated string.
    #[serde(rename = "Authors", with = "joined_authors")]
    pub authors: Vec<String>,
    /// Journal title.
    #[serde(rename = "Journal")]
    pub journal: String,
    /// Publication date as printed by PubMed ("2023 Jan 5").
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    /// Abstract text.
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    /// DOI, if PubMed knows one.
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// PubMed Central identifier of the free full text.
    #[serde(rename = "PMCID", default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,
    /// Author keywords and MeSH headings.
    #[serde(rename = "Keywords", default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl Article {
    /// Authors as a single display string.
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }

    /// Canonical PubMed URL for this article.
    pub fn url(&self) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", self.pmid)
    }
}

mod joined_authors {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(authors: &[String], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&authors.join(", "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(d)?;
        Ok(joined
            .split(", ")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Filters for an advanced PubMed search.
///
/// Every field is optional; the client rejects a query with no filters.
/// Dates use PubMed's `YYYY/MM/DD` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    /// General search term.
    pub term: Option<String>,
    /// Words that must appear in the title.
    pub title: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Journal name.
    pub journal: Option<String>,
    /// Start of the publication date range.
    pub start_date: Option<String>,
    /// End of the publication date range.
    pub end_date: Option<String>,
}

impl AdvancedQuery {
    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        [
            &self.term,
            &self.title,
            &self.author,
            &self.journal,
            &self.start_date,
            &self.end_date,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

/// Result of an `esearch` call: the matching ids in relevance order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIds {
    /// Total number of matches (may be larger than `ids.len()`).
    pub count: u64,
    /// PMIDs of the returned page.
    pub ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serializes_with_pubmed_keys() {
        let article = Article {
            pmid: "12345".into(),
            title: "A Study".into(),
            authors: vec!["Jane Doe".into(), "John Roe".into()],
            journal: "Nature".into(),
            publication_date: "2023 Jan".into(),
            abstract_text: "Abstract text".into(),
            ..Default::default()
        };

        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["PMID"], "12345");
        assert_eq!(value["Authors"], "Jane Doe, John Roe");
        assert_eq!(value["Publication Date"], "2023 Jan");
        assert!(value.get("DOI").is_none());
        assert!(value.get("Keywords").is_none());
    }

    #[test]
    fn test_article_deserializes_joined_authors() {
        let json = r#"{
            "PMID": "1", "Title": "T", "Authors": "A One, B Two",
            "Journal": "J", "Publication Date": "2020", "Abstract": ""
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.authors, vec!["A One", "B Two"]);
        assert!(article.pmcid.is_none());
    }

    #[test]
    fn test_advanced_query_is_empty() {
        assert!(AdvancedQuery::default().is_empty());
        let blank = AdvancedQuery {
            term: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.is_empty());
        let q = AdvancedQuery {
            author: Some("Smith J".into()),
            ..Default::default()
        };
        assert!(!q.is_empty());
    }
}
