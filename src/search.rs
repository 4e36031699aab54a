//! Search and fetch endpoints.
//!
//! A search is two round trips: `esearch` for the ids, then `efetch` for
//! the MEDLINE records of those ids.

use crate::client::PubMedClient;
use crate::error::{PubMedError, Result};
use crate::parse::{order_by_ids, parse_esearch_response, parse_medline};
use crate::query::QueryBuilder;
use crate::types::{AdvancedQuery, Article, SearchIds};

impl PubMedClient {
    /// Search PubMed with a free-text query and return up to `limit` articles.
    ///
    /// Uses PubMed query syntax: `crispr AND "Smith J"[Author]`, etc.
    pub fn search_keywords(&self, query: &str, limit: u32) -> Result<Vec<Article>> {
        if query.trim().is_empty() {
            return Err(PubMedError::InvalidQuery("search query is empty".into()));
        }
        let ids = self.search_ids(query, limit, 0)?;
        tracing::debug!(query, found = ids.count, returned = ids.ids.len(), "esearch");
        self.fetch_articles(&ids.ids)
    }

    /// Search with field filters and a publication date range.
    pub fn search_advanced(&self, query: &AdvancedQuery, limit: u32) -> Result<Vec<Article>> {
        let term = QueryBuilder::from_advanced(query)?;
        self.search_keywords(&term, limit)
    }

    /// Run `esearch` and return one page of matching PMIDs.
    pub fn search_ids(&self, term: &str, limit: u32, start: u32) -> Result<SearchIds> {
        let retmax = limit.to_string();
        let retstart = start.to_string();
        let params = [
            ("db", "pubmed"),
            ("retmode", "json"),
            ("term", term),
            ("retmax", retmax.as_str()),
            ("retstart", retstart.as_str()),
        ];

        let body = self.eutils_get("esearch.fcgi", &params)?;
        parse_esearch_response(&body)
    }

    /// Fetch full records for the given PMIDs, in the order given.
    ///
    /// Ids PubMed has no record for are left out of the result.
    pub fn fetch_articles(&self, pmids: &[String]) -> Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = pmids.join(",");
        let params = [
            ("db", "pubmed"),
            ("rettype", "medline"),
            ("retmode", "text"),
            ("id", id_list.as_str()),
        ];

        let body = self.eutils_post("efetch.fcgi", &params)?;
        Ok(order_by_ids(parse_medline(&body), pmids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    const TWO_RECORDS: &str = "PMID- 1
TI  - First by id.
AU  - One A
DP  - 2020

PMID- 2
TI  - Second by id.
AU  - Two B
DP  - 2021
";

    #[test]
    fn test_empty_idlist_skips_efetch() {
        let server = MockServer::start();
        let esearch = server.mock(|when, then| {
            when.method(GET).path("/esearch.fcgi");
            then.status(200)
                .body(r#"{"esearchresult":{"count":"0","idlist":[]}}"#);
        });
        let efetch = server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi");
            then.status(200).body(TWO_RECORDS);
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        let articles = client.search_keywords("nothing matches", 10).unwrap();

        assert!(articles.is_empty());
        esearch.assert();
        assert_eq!(efetch.hits(), 0);
    }

    #[test]
    fn test_results_follow_esearch_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param("retmax", "2");
            then.status(200)
                .body(r#"{"esearchresult":{"count":"2","idlist":["2","1","3"]}}"#);
        });
        server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi").body_contains("id=2%2C1%2C3");
            then.status(200).body(TWO_RECORDS);
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        let articles = client.search_keywords("anything", 2).unwrap();

        let pmids: Vec<&str> = articles.iter().map(|a| a.pmid.as_str()).collect();
        assert_eq!(pmids, vec!["2", "1"]);
        assert_eq!(articles[0].title, "Second by id.");
    }

    #[test]
    fn test_advanced_search_sends_built_term() {
        let server = MockServer::start();
        let esearch = server.mock(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param_exists("term");
            then.status(200)
                .body(r#"{"esearchresult":{"count":"0","idlist":[]}}"#);
        });

        let query = AdvancedQuery {
            author: Some("Smith J".into()),
            ..Default::default()
        };
        let client = PubMedClient::for_mock_server(&server.base_url());
        assert!(client.search_advanced(&query, 5).unwrap().is_empty());
        esearch.assert();
    }

    #[test]
    fn test_empty_query_rejected_without_request() {
        let server = MockServer::start();
        let esearch = server.mock(|when, then| {
            when.method(GET).path("/esearch.fcgi");
            then.status(200);
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        let err = client.search_keywords("   ", 5).unwrap_err();
        assert!(matches!(err, PubMedError::InvalidQuery(_)));
        assert_eq!(esearch.hits(), 0);
    }
}
