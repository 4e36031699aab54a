//! Tool dispatcher.
//!
//! Owns the fixed catalog of five tools. Each invocation deserializes its
//! typed parameters, runs the blocking library call on tokio's blocking
//! pool, and folds the outcome into a [`ToolResult`]. Library failures never
//! leave this module as errors: they become failure payloads the agent reads
//! like any other answer.

use crate::analysis::DeepAnalysis;
use crate::error::Result as PubMedResult;
use crate::source::LiteratureSource;
use crate::types::{AdvancedQuery, Article};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Number of results returned when the caller does not say.
pub const DEFAULT_NUM_RESULTS: u32 = 10;

/// The five tools, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchByKeywords,
    SearchAdvanced,
    GetMetadata,
    DownloadPdf,
    DeepAnalysis,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        Self::SearchByKeywords,
        Self::SearchAdvanced,
        Self::GetMetadata,
        Self::DownloadPdf,
        Self::DeepAnalysis,
    ];

    /// Name the tool is registered under.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchByKeywords => "search_pubmed_key_words",
            Self::SearchAdvanced => "search_pubmed_advanced",
            Self::GetMetadata => "get_pubmed_article_metadata",
            Self::DownloadPdf => "download_pubmed_pdf",
            Self::DeepAnalysis => "deep_paper_analysis",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A PubMed identifier as sent by the caller: JSON string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Pmid {
    Text(String),
    Number(i64),
}

impl Pmid {
    /// Canonical string form handed to the library.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pmid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

fn default_num_results() -> NonZeroU32 {
    NonZeroU32::new(DEFAULT_NUM_RESULTS).unwrap_or(NonZeroU32::MIN)
}

/// Parameters of `search_pubmed_key_words`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSearchParams {
    pub key_words: String,
    #[serde(default = "default_num_results")]
    pub num_results: NonZeroU32,
}

/// Parameters of `search_pubmed_advanced`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvancedSearchParams {
    pub term: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub journal: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_num_results")]
    pub num_results: NonZeroU32,
}

impl AdvancedSearchParams {
    fn into_query(self) -> (AdvancedQuery, u32) {
        let query = AdvancedQuery {
            term: self.term,
            title: self.title,
            author: self.author,
            journal: self.journal,
            start_date: self.start_date,
            end_date: self.end_date,
        };
        (query, self.num_results.get())
    }
}

/// Parameters of the single-article tools.
#[derive(Debug, Clone, Deserialize)]
pub struct PmidParams {
    pub pmid: Pmid,
}

/// A successful tool answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Articles(Vec<Article>),
    Metadata(Article),
    Status(String),
    Analysis(DeepAnalysis),
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Payload),
    Failure(String),
}

impl ToolResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// A tool result tagged with the tool that produced it, which decides the
/// wire shape of a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub tool: ToolName,
    pub result: ToolResult,
}

impl ToolResponse {
    /// Structured form of the response.
    ///
    /// Failures are `[{"error": msg}]` for the searches, a bare string for
    /// the PDF download and `{"error": msg}` otherwise.
    pub fn to_value(&self) -> Value {
        match &self.result {
            ToolResult::Success(payload) => {
                serde_json::to_value(payload).unwrap_or_else(|e| json!({ "error": e.to_string() }))
            }
            ToolResult::Failure(message) => match self.tool {
                ToolName::SearchByKeywords | ToolName::SearchAdvanced => {
                    json!([{ "error": message }])
                }
                ToolName::DownloadPdf => Value::String(message.clone()),
                ToolName::GetMetadata | ToolName::DeepAnalysis => json!({ "error": message }),
            },
        }
    }

    /// Text content sent to the agent. Strings go out verbatim, everything
    /// else as pretty JSON with field order preserved.
    pub fn to_text(&self) -> String {
        let rendered = match (&self.result, self.tool) {
            (ToolResult::Success(Payload::Status(s)), _) => return s.clone(),
            (ToolResult::Failure(m), ToolName::DownloadPdf) => return m.clone(),
            (ToolResult::Success(payload), _) => serde_json::to_string_pretty(payload),
            (ToolResult::Failure(_), _) => serde_json::to_string_pretty(&self.to_value()),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

/// Problems with the request itself, before any library call is made.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: ToolName, message: String },
}

/// Routes tool invocations to a [`LiteratureSource`].
pub struct Dispatcher<S> {
    source: Arc<S>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: LiteratureSource> Dispatcher<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Invoke a tool by wire name with raw JSON arguments.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolResponse, DispatchError> {
        let tool =
            ToolName::from_wire(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let result = match tool {
            ToolName::SearchByKeywords => {
                self.search_by_keywords(parse_args(tool, arguments)?).await
            }
            ToolName::SearchAdvanced => self.search_advanced(parse_args(tool, arguments)?).await,
            ToolName::GetMetadata => self.get_metadata(parse_args(tool, arguments)?).await,
            ToolName::DownloadPdf => self.download_pdf(parse_args(tool, arguments)?).await,
            ToolName::DeepAnalysis => self.deep_analysis(parse_args(tool, arguments)?).await,
        };

        if let ToolResult::Failure(message) = &result {
            tracing::warn!(tool = %tool, %message, "tool call failed");
        }
        Ok(ToolResponse { tool, result })
    }

    pub async fn search_by_keywords(&self, params: KeywordSearchParams) -> ToolResult {
        tracing::info!(
            key_words = %params.key_words,
            num_results = params.num_results.get(),
            "searching for articles with key words"
        );
        let KeywordSearchParams {
            key_words,
            num_results,
        } = params;

        match self
            .offload(move |s| s.search_keywords(&key_words, num_results.get()))
            .await
        {
            Ok(articles) => ToolResult::Success(Payload::Articles(articles)),
            Err(e) => ToolResult::Failure(format!("An error occurred while searching: {}", e)),
        }
    }

    pub async fn search_advanced(&self, params: AdvancedSearchParams) -> ToolResult {
        tracing::info!(?params, "performing advanced search");
        let (query, limit) = params.into_query();

        match self.offload(move |s| s.search_advanced(&query, limit)).await {
            Ok(articles) => ToolResult::Success(Payload::Articles(articles)),
            Err(e) => ToolResult::Failure(format!(
                "An error occurred while performing advanced search: {}",
                e
            )),
        }
    }

    pub async fn get_metadata(&self, params: PmidParams) -> ToolResult {
        let pmid = params.pmid.canonical();
        tracing::info!(%pmid, "fetching metadata");

        let lookup = pmid.clone();
        match self.offload(move |s| s.fetch_metadata(&lookup)).await {
            Ok(Some(article)) => ToolResult::Success(Payload::Metadata(article)),
            Ok(None) => ToolResult::Failure(no_metadata(&pmid)),
            Err(e) => ToolResult::Failure(format!(
                "An error occurred while fetching metadata: {}",
                e
            )),
        }
    }

    pub async fn download_pdf(&self, params: PmidParams) -> ToolResult {
        let pmid = params.pmid.canonical();
        tracing::info!(%pmid, "attempting to download PDF");

        match self.offload(move |s| s.download_pdf(&pmid)).await {
            Ok(status) => ToolResult::Success(Payload::Status(status)),
            Err(e) => ToolResult::Failure(format!(
                "An error occurred while attempting to download the PDF: {}",
                e
            )),
        }
    }

    /// Fill the analysis templates from the article's metadata. Calls the
    /// library directly rather than going through [`Self::get_metadata`].
    pub async fn deep_analysis(&self, params: PmidParams) -> ToolResult {
        let pmid = params.pmid.canonical();
        tracing::info!(%pmid, "performing deep paper analysis");

        let lookup = pmid.clone();
        match self.offload(move |s| s.fetch_metadata(&lookup)).await {
            Ok(Some(article)) => {
                ToolResult::Success(Payload::Analysis(DeepAnalysis::for_article(&article)))
            }
            Ok(None) => ToolResult::Failure(no_metadata(&pmid)),
            Err(e) => ToolResult::Failure(format!(
                "An error occurred while performing the deep paper analysis: {}",
                e
            )),
        }
    }

    /// Run a blocking library call on the blocking pool.
    ///
    /// Errors and panics both come back as the message text.
    async fn offload<T, F>(&self, work: F) -> std::result::Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> PubMedResult<T> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        match tokio::task::spawn_blocking(move || work(source.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join) if join.is_panic() => {
                Err(format!("library call panicked: {}", panic_message(join.into_panic())))
            }
            Err(join) => Err(join.to_string()),
        }
    }
}

fn no_metadata(pmid: &str) -> String {
    format!("No metadata found for PMID: {}", pmid)
}

fn parse_args<T: serde::de::DeserializeOwned>(
    tool: ToolName,
    arguments: &Value,
) -> Result<T, DispatchError> {
    let args = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(args).map_err(|e| DispatchError::InvalidArguments {
        tool,
        message: e.to_string(),
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
