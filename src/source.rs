//! The seam between the tool dispatcher and the code that talks to PubMed.

use crate::client::PubMedClient;
use crate::error::Result;
use crate::types::{AdvancedQuery, Article};

/// A blocking literature backend.
///
/// Every method may block on network I/O. The dispatcher never calls these
/// on an async worker thread.
pub trait LiteratureSource: Send + Sync + 'static {
    /// Free-text search returning at most `limit` articles, best match first.
    fn search_keywords(&self, query: &str, limit: u32) -> Result<Vec<Article>>;

    /// Field-filtered search returning at most `limit` articles.
    fn search_advanced(&self, query: &AdvancedQuery, limit: u32) -> Result<Vec<Article>>;

    /// Metadata for one PMID, `None` if there is no such article.
    fn fetch_metadata(&self, pmid: &str) -> Result<Option<Article>>;

    /// Try to download the full-text PDF and describe what happened.
    fn download_pdf(&self, pmid: &str) -> Result<String>;
}

impl LiteratureSource for PubMedClient {
    fn search_keywords(&self, query: &str, limit: u32) -> Result<Vec<Article>> {
        PubMedClient::search_keywords(self, query, limit)
    }

    fn search_advanced(&self, query: &AdvancedQuery, limit: u32) -> Result<Vec<Article>> {
        PubMedClient::search_advanced(self, query, limit)
    }

    fn fetch_metadata(&self, pmid: &str) -> Result<Option<Article>> {
        PubMedClient::fetch_metadata(self, pmid)
    }

    fn download_pdf(&self, pmid: &str) -> Result<String> {
        PubMedClient::download_pdf(self, pmid)
    }
}
