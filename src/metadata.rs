//! Single-article metadata lookup.

use crate::client::PubMedClient;
use crate::error::{PubMedError, Result};
use crate::types::Article;

impl PubMedClient {
    /// Fetch the record for one PMID.
    ///
    /// Returns `Ok(None)` when PubMed has no record for the id.
    pub fn fetch_metadata(&self, pmid: &str) -> Result<Option<Article>> {
        let pmid = pmid.trim();
        if pmid.is_empty() {
            return Err(PubMedError::InvalidQuery("PMID is empty".into()));
        }

        let articles = match self.fetch_articles(&[pmid.to_string()]) {
            Ok(articles) => articles,
            Err(PubMedError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(articles.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[test]
    fn test_found_record() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi").body_contains("id=7");
            then.status(200)
                .body("PMID- 7\nTI  - Seven.\nFAU - Doe, Jane\nJT  - Some Journal\n");
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        let article = client.fetch_metadata(" 7 ").unwrap().unwrap();
        assert_eq!(article.pmid, "7");
        assert_eq!(article.title, "Seven.");
        assert_eq!(article.authors, vec!["Jane Doe"]);
    }

    #[test]
    fn test_empty_body_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi");
            then.status(200).body("");
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        assert_eq!(client.fetch_metadata("99").unwrap(), None);
    }

    #[test]
    fn test_not_found_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi");
            then.status(404);
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        assert_eq!(client.fetch_metadata("99").unwrap(), None);
    }

    #[test]
    fn test_server_error_propagates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/efetch.fcgi");
            then.status(500).body("boom");
        });

        let client = PubMedClient::for_mock_server(&server.base_url());
        let err = client.fetch_metadata("99").unwrap_err();
        assert!(matches!(err, PubMedError::Api { status: 500, .. }));
    }

    #[test]
    fn test_empty_pmid_rejected() {
        let client = PubMedClient::for_mock_server("http://127.0.0.1:9");
        let err = client.fetch_metadata("  ").unwrap_err();
        assert!(matches!(err, PubMedError::InvalidQuery(_)));
    }
}
