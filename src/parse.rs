//! E-utilities response parsing.
//!
//! `esearch` is requested as JSON; article records come from `efetch` in
//! MEDLINE text format, which carries the abstract (unlike `esummary`).

use crate::error::{PubMedError, Result};
use crate::types::{Article, SearchIds};
use serde::Deserialize;
use std::collections::HashMap;

/// `esearch` JSON wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ESearchResult {
    #[serde(default)]
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// Parse an `esearch.fcgi?retmode=json` body.
pub fn parse_esearch_response(json: &str) -> Result<SearchIds> {
    let response: ESearchResponse = serde_json::from_str(json)
        .map_err(|e| PubMedError::Parse(format!("Invalid esearch JSON: {}", e)))?;
    let result = response.esearchresult;

    if let Some(message) = result.error {
        return Err(PubMedError::Api {
            status: 200,
            message,
        });
    }

    Ok(SearchIds {
        count: result
            .count
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0),
        ids: result.idlist,
    })
}

/// Parse an `efetch.fcgi?rettype=medline&retmode=text` body.
///
/// Every record starts at a `PMID-` line. Lines that begin with six spaces
/// continue the previous field. Records without a PMID are dropped.
pub fn parse_medline(text: &str) -> Vec<Article> {
    let mut articles = Vec::new();
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("      ") {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(rest.trim());
            }
            continue;
        }
        let Some((tag, value)) = split_field(line) else {
            continue;
        };
        if tag == "PMID" && !fields.is_empty() {
            articles.extend(record_to_article(std::mem::take(&mut fields)));
        }
        fields.push((tag.to_string(), value.to_string()));
    }
    if !fields.is_empty() {
        articles.extend(record_to_article(fields));
    }

    articles
}

/// Reorder parsed articles to follow `ids`. Ids without a record are skipped.
pub fn order_by_ids(articles: Vec<Article>, ids: &[String]) -> Vec<Article> {
    let mut by_id: HashMap<String, Article> = articles
        .into_iter()
        .map(|a| (a.pmid.clone(), a))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Split `"TI  - Some title"` into `("TI", "Some title")`.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (tag, value) = line.split_once('-')?;
    let tag = tag.trim();
    if tag.is_empty() || tag.len() > 4 || !tag.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some((tag, value.trim()))
}

fn record_to_article(fields: Vec<(String, String)>) -> Option<Article> {
    let mut article = Article::default();
    let mut full_authors = Vec::new();
    let mut short_authors = Vec::new();
    let mut journal_abbrev = None;
    let mut abstract_parts = Vec::new();

    for (tag, value) in fields {
        match tag.as_str() {
            "PMID" => article.pmid = value,
            "TI" => article.title = value,
            "AB" => abstract_parts.push(value),
            "FAU" => full_authors.push(display_name(&value)),
            "AU" => short_authors.push(value),
            "JT" => article.journal = value,
            "TA" => journal_abbrev = Some(value),
            "DP" => article.publication_date = value,
            "LID" | "AID" => {
                if article.doi.is_none() {
                    if let Some(doi) = value.strip_suffix("[doi]") {
                        article.doi = Some(doi.trim().to_string());
                    }
                }
            }
            "PMC" => article.pmcid = Some(value),
            "OT" => article.keywords.push(value),
            "MH" => article.keywords.push(value.trim_start_matches('*').to_string()),
            _ => {}
        }
    }

    if article.pmid.is_empty() {
        return None;
    }

    article.authors = if full_authors.is_empty() {
        short_authors
    } else {
        full_authors
    };
    if article.journal.is_empty() {
        article.journal = journal_abbrev.unwrap_or_default();
    }
    article.abstract_text = abstract_parts.join(" ");

    Some(article)
}

/// Turn MEDLINE "Last, First M" into "First M Last".
fn display_name(name: &str) -> String {
    match name.split_once(',') {
        Some((family, given)) if !given.trim().is_empty() => {
            format!("{} {}", given.trim(), family.trim())
        }
        _ => name.trim_end_matches(',').trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MEDLINE: &str = "
PMID- 31452104
OWN - NLM
STAT- MEDLINE
TI  - Deep learning for the detection of diabetic retinopathy in primary
      care clinics.
AB  - BACKGROUND: Screening is costly. METHODS: We trained a network.
FAU - Doe, Jane A
AU  - Doe JA
FAU - Roe, Richard
AU  - Roe R
JT  - Journal of Medical Imaging
TA  - J Med Imaging
DP  - 2019 Aug 26
LID - 10.1000/jmi.2019.001 [doi]
AID - 10.1000/jmi.2019.001 [doi]
AID - S0000-0000(19)00001-1 [pii]
PMC - PMC6712345
MH  - Humans
MH  - *Diabetic Retinopathy/diagnosis
OT  - screening

PMID- 29000001
TI  - Second record.
AU  - Solo H
TA  - Short J
DP  - 2017
";

    #[test]
    fn test_parse_medline_records() {
        let articles = parse_medline(SAMPLE_MEDLINE);
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.pmid, "31452104");
        assert_eq!(
            first.title,
            "Deep learning for the detection of diabetic retinopathy in primary care clinics."
        );
        assert_eq!(first.authors, vec!["Jane A Doe", "Richard Roe"]);
        assert_eq!(first.journal, "Journal of Medical Imaging");
        assert_eq!(first.publication_date, "2019 Aug 26");
        assert_eq!(first.doi.as_deref(), Some("10.1000/jmi.2019.001"));
        assert_eq!(first.pmcid.as_deref(), Some("PMC6712345"));
        assert!(first.abstract_text.starts_with("BACKGROUND: Screening"));
        assert_eq!(
            first.keywords,
            vec!["Humans", "Diabetic Retinopathy/diagnosis", "screening"]
        );
    }

    #[test]
    fn test_parse_medline_fallbacks() {
        let articles = parse_medline(SAMPLE_MEDLINE);
        let second = &articles[1];
        assert_eq!(second.authors, vec!["Solo H"]);
        assert_eq!(second.journal, "Short J");
        assert_eq!(second.abstract_text, "");
        assert!(second.doi.is_none());
        assert!(second.pmcid.is_none());
    }

    #[test]
    fn test_parse_medline_empty() {
        assert!(parse_medline("").is_empty());
        assert!(parse_medline("\n\n").is_empty());
    }

    #[test]
    fn test_order_by_ids_follows_search_order() {
        let articles = parse_medline(SAMPLE_MEDLINE);
        let ids = vec![
            "29000001".to_string(),
            "404".to_string(),
            "31452104".to_string(),
        ];
        let ordered = order_by_ids(articles, &ids);
        let pmids: Vec<&str> = ordered.iter().map(|a| a.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["29000001", "31452104"]);
    }

    #[test]
    fn test_parse_esearch_response() {
        let json = r#"{
            "header": {"type": "esearch", "version": "0.3"},
            "esearchresult": {
                "count": "2543",
                "retmax": "2",
                "retstart": "0",
                "idlist": ["38000001", "37999999"]
            }
        }"#;
        let ids = parse_esearch_response(json).unwrap();
        assert_eq!(ids.count, 2543);
        assert_eq!(ids.ids, vec!["38000001", "37999999"]);
    }

    #[test]
    fn test_parse_esearch_error() {
        let json = r#"{"esearchresult": {"ERROR": "Invalid query"}}"#;
        let err = parse_esearch_response(json).unwrap_err();
        assert!(err.to_string().contains("Invalid query"));
    }

    #[test]
    fn test_parse_esearch_invalid_json() {
        let err = parse_esearch_response("<html>").unwrap_err();
        assert!(matches!(err, PubMedError::Parse(_)));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Doe, Jane"), "Jane Doe");
        assert_eq!(display_name("WHO Consortium"), "WHO Consortium");
    }
}
