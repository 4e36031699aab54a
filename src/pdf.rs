//! Full-text PDF download.
//!
//! PubMed itself hosts no PDFs. Articles deposited in PubMed Central carry a
//! PMCID, and Europe PMC renders those as PDF.

use crate::client::PubMedClient;
use crate::error::{PubMedError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Magic bytes every PDF starts with.
const PDF_SIGNATURE: &[u8] = b"%PDF";

impl PubMedClient {
    /// Download the free full-text PDF of an article into the download
    /// directory and describe the outcome.
    ///
    /// An article without a PMC copy is not an error: the returned message
    /// says no free PDF exists.
    pub fn download_pdf(&self, pmid: &str) -> Result<String> {
        let article = self
            .fetch_metadata(pmid)?
            .ok_or_else(|| PubMedError::NotFound(format!("No article found for PMID: {}", pmid)))?;

        let Some(pmcid) = article.pmcid else {
            return Ok(format!(
                "No free full text PDF available for PMID: {}",
                pmid
            ));
        };

        let url = self.pmc_pdf_url(&pmcid)?;
        tracing::info!(pmid, %pmcid, "downloading PDF");
        let bytes = self.get_bytes(url.as_str())?;
        let path = save_pdf(&self.download_dir, pmid, &bytes)?;

        Ok(format!("PDF downloaded successfully to {}", path.display()))
    }

    /// Europe PMC render URL for a PMCID.
    pub fn pmc_pdf_url(&self, pmcid: &str) -> Result<Url> {
        let base = format!("{}/backend/ptpmcrender.fcgi", self.pdf_base_url);
        Url::parse_with_params(&base, &[("accid", pmcid), ("blobtype", "pdf")])
            .map_err(|e| PubMedError::Config(format!("invalid PDF base URL '{}': {}", base, e)))
    }
}

/// Write `bytes` to `<dir>/<pmid>.pdf` after checking they are a PDF.
pub(crate) fn save_pdf(dir: &Path, pmid: &str, bytes: &[u8]) -> Result<PathBuf> {
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(PubMedError::Parse(format!(
            "response for PMID {} is not a PDF",
            pmid
        )));
    }

    let stem: String = pmid.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if stem.is_empty() {
        return Err(PubMedError::InvalidQuery(format!("invalid PMID '{}'", pmid)));
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.pdf", stem));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
