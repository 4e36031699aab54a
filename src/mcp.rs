//! MCP (Model Context Protocol) server implementation.
//!
//! Implements the JSON-RPC 2.0 protocol over stdio, exposing the PubMed
//! tools for AI agent integration. Tool calls run as separate tasks so a
//! slow download never holds up a quick metadata lookup; a single writer
//! task serializes the responses onto stdout.

use crate::dispatch::{Dispatcher, ToolName};
use crate::error::{PubMedError, Result};
use crate::source::LiteratureSource;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// MCP protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Run the MCP server over stdin/stdout until stdin closes.
pub async fn run_server<S: LiteratureSource>(dispatcher: Dispatcher<S>) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    serve(dispatcher, stdin, tokio::io::stdout()).await?;
    Ok(())
}

/// Serve JSON-RPC requests read line by line from `reader`, writing one
/// response line per request to `writer`.
///
/// Returns the writer once input is exhausted and every in-flight tool
/// call has answered.
pub async fn serve<S, R, W>(dispatcher: Dispatcher<S>, reader: R, writer: W) -> Result<W>
where
    S: LiteratureSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    let writer_task = tokio::spawn(write_responses(rx, writer));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                let error_response = json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": format!("Parse error: {}", e) }
                });
                if tx.send(error_response).is_err() {
                    break;
                }
                continue;
            }
        };

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request["method"].as_str().unwrap_or("");
        tracing::debug!(method, %id, "request");

        let response = match method {
            "initialize" => handle_initialize(&id),
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            "tools/list" => handle_tools_list(&id),
            "tools/call" => {
                let dispatcher = dispatcher.clone();
                let tx = tx.clone();
                let params = request["params"].clone();
                tokio::spawn(async move {
                    let response = handle_tool_call(&dispatcher, &id, &params).await;
                    // The writer only goes away when serving has ended.
                    let _ = tx.send(response);
                });
                continue;
            }
            "resources/list" => handle_resources_list(&id),
            "resources/read" => handle_resource_read(&id, &request["params"]),
            m if m.starts_with("notifications/") => continue,
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {}", method) }
            }),
        };

        if tx.send(response).is_err() {
            break;
        }
    }

    drop(tx);
    writer_task
        .await
        .map_err(|e| PubMedError::Config(format!("response writer failed: {}", e)))?
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = response.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": "pubmed-mcp",
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
}

fn handle_tools_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": tool_definitions()
        }
    })
}

fn handle_resources_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "resources": [
                {
                    "uri": "pubmed://syntax",
                    "name": "PubMed Query Syntax",
                    "description": "Guide to PubMed search syntax and field tags",
                    "mimeType": "text/plain"
                },
                {
                    "uri": "pubmed://fields",
                    "name": "PubMed Article Fields",
                    "description": "Fields present in article records returned by the tools",
                    "mimeType": "text/plain"
                }
            ]
        }
    })
}

fn handle_resource_read(id: &Value, params: &Value) -> Value {
    let uri = params["uri"].as_str().unwrap_or("");
    let content = match uri {
        "pubmed://syntax" => SYNTAX_REFERENCE,
        "pubmed://fields" => FIELDS_REFERENCE,
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32602, "message": format!("Unknown resource: {}", uri) }
            });
        }
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "contents": [{
                "uri": uri,
                "mimeType": "text/plain",
                "text": content
            }]
        }
    })
}

async fn handle_tool_call<S: LiteratureSource>(
    dispatcher: &Dispatcher<S>,
    id: &Value,
    params: &Value,
) -> Value {
    let tool_name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match dispatcher.call(tool_name, args).await {
        // Library failures are ordinary answers; the agent reads the error
        // payload from the content.
        Ok(response) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": response.to_text() }],
                "isError": false
            }
        }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": format!("Error: {}", e) }],
                "isError": true
            }
        }),
    }
}

// --- Tool definitions ---

fn pmid_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pmid": { "type": ["string", "integer"], "description": "PMID of the article (string or integer)" }
        },
        "required": ["pmid"]
    })
}

fn read_only_annotations() -> Value {
    json!({
        "readOnlyHint": true,
        "destructiveHint": false,
        "idempotentHint": true,
        "openWorldHint": true
    })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": ToolName::SearchByKeywords.as_str(),
            "description": "Search for articles on PubMed using key words. Returns a list of article records (PMID, Title, Authors, Journal, Publication Date, Abstract).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "key_words": { "type": "string", "description": "Search query string (PubMed syntax allowed)" },
                    "num_results": { "type": "integer", "minimum": 1, "description": "Number of results to return (default 10)", "default": 10 }
                },
                "required": ["key_words"]
            },
            "annotations": read_only_annotations()
        },
        {
            "name": ToolName::SearchAdvanced.as_str(),
            "description": "Perform an advanced search for articles on PubMed by term, title, author, journal and publication date range.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "term": { "type": "string", "description": "General search term" },
                    "title": { "type": "string", "description": "Search in title" },
                    "author": { "type": "string", "description": "Author name" },
                    "journal": { "type": "string", "description": "Journal name" },
                    "start_date": { "type": "string", "description": "Start date for search range (format: YYYY/MM/DD)" },
                    "end_date": { "type": "string", "description": "End date for search range (format: YYYY/MM/DD)" },
                    "num_results": { "type": "integer", "minimum": 1, "description": "Number of results to return (default 10)", "default": 10 }
                }
            },
            "annotations": read_only_annotations()
        },
        {
            "name": ToolName::GetMetadata.as_str(),
            "description": "Fetch metadata for a PubMed article using its PMID.",
            "inputSchema": pmid_schema(),
            "annotations": read_only_annotations()
        },
        {
            "name": ToolName::DownloadPdf.as_str(),
            "description": "Attempt to download the full text PDF for a PubMed article. Only articles with a free PubMed Central copy can be downloaded.",
            "inputSchema": pmid_schema(),
            "annotations": {
                "readOnlyHint": false,
                "destructiveHint": false,
                "idempotentHint": true,
                "openWorldHint": true
            }
        },
        {
            "name": ToolName::DeepAnalysis.as_str(),
            "description": "Build a structured analysis outline (executive summary, context, methodology, results, implications, future directions, broader impacts) for a PubMed article.",
            "inputSchema": pmid_schema(),
            "annotations": read_only_annotations()
        }
    ])
}

// --- Reference content ---

const SYNTAX_REFERENCE: &str = r#"PubMed Query Syntax Guide
=========================

Field tags:
  crispr[Title]                 - Title words
  sepsis[Title/Abstract]        - Title or abstract
  "Smith J"[Author]             - Author (last name + initials)
  "Nature Medicine"[Journal]    - Journal title, abbreviation or ISSN
  Neoplasms[MeSH Terms]         - MeSH heading
  Review[Publication Type]      - Publication type

Boolean operators (must be uppercase):
  term1 AND term2               - Both terms
  term1 OR term2                - Either term
  term1 NOT term2               - Exclude term2
  (term1 OR term2) AND term3    - Grouping

Date ranges:
  ("2020/01/01"[Date - Publication] : "2021/12/31"[Date - Publication])
  2019[Date - Publication]      - Single year

Phrases and wildcards:
  "heart attack"                - Exact phrase
  therap*                       - Truncation
"#;

const FIELDS_REFERENCE: &str = r#"PubMed Article Fields
=====================

Always present:
  PMID              - PubMed identifier
  Title             - Article title
  Authors           - Comma-separated author names
  Journal           - Journal title
  Publication Date  - Date as printed by PubMed (e.g. "2023 Jan 5")
  Abstract          - Abstract text (empty when PubMed has none)

Present when known:
  DOI               - Digital Object Identifier
  PMCID             - PubMed Central id; required for PDF download
  Keywords          - Author keywords and MeSH headings
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as PubMedResult;
    use crate::types::{AdvancedQuery, Article};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct StubSource;

    impl LiteratureSource for StubSource {
        fn search_keywords(&self, query: &str, _limit: u32) -> PubMedResult<Vec<Article>> {
            if query == "boom" {
                return Err(PubMedError::Parse("bad gateway page".into()));
            }
            Ok(vec![Article {
                pmid: "1".into(),
                title: format!("About {}", query),
                ..Default::default()
            }])
        }

        fn search_advanced(
            &self,
            _query: &AdvancedQuery,
            _limit: u32,
        ) -> PubMedResult<Vec<Article>> {
            Ok(Vec::new())
        }

        fn fetch_metadata(&self, pmid: &str) -> PubMedResult<Option<Article>> {
            std::thread::sleep(Duration::from_millis(150));
            Ok(Some(Article {
                pmid: pmid.into(),
                title: "Slow".into(),
                ..Default::default()
            }))
        }

        fn download_pdf(&self, pmid: &str) -> PubMedResult<String> {
            Ok(format!("No free full text PDF available for PMID: {}", pmid))
        }
    }

    async fn run(input: &str) -> HashMap<String, Value> {
        let dispatcher = Dispatcher::new(Arc::new(StubSource));
        let output = serve(dispatcher, input.as_bytes(), Vec::new()).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| {
                let v: Value = serde_json::from_str(l).unwrap();
                (v["id"].to_string(), v)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(responses.len(), 2);

        let init = &responses["1"];
        assert_eq!(init["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(init["result"]["serverInfo"]["name"], "pubmed-mcp");

        let tools = responses["2"]["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        let expected: Vec<&str> = ToolName::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_tool_call_success_and_failure_are_not_protocol_errors() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"search_pubmed_key_words","arguments":{"key_words":"sepsis"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/call","params":{"name":"search_pubmed_key_words","arguments":{"key_words":"boom"}}}"#,
            "\n",
        );
        let responses = run(input).await;

        let ok = &responses["\"a\""]["result"];
        assert_eq!(ok["isError"], false);
        let records: Value =
            serde_json::from_str(ok["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(records[0]["Title"], "About sepsis");

        let failed = &responses["\"b\""]["result"];
        assert_eq!(failed["isError"], false);
        let payload: Value =
            serde_json::from_str(failed["content"][0]["text"].as_str().unwrap()).unwrap();
        let message = payload[0]["error"].as_str().unwrap();
        assert!(message.contains("bad gateway page"));
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_fast_call() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_pubmed_article_metadata","arguments":{"pmid":7}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"download_pubmed_pdf","arguments":{"pmid":"7"}}}"#,
            "\n",
        );
        let dispatcher = Dispatcher::new(Arc::new(StubSource));
        let output = serve(dispatcher, input.as_bytes(), Vec::new()).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let ids: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].clone())
            .collect();

        // The PDF answer overtakes the slow metadata lookup.
        assert_eq!(ids, vec![json!(2), json!(1)]);
        assert!(text.contains("No free full text PDF available for PMID: 7"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_flagged_as_error() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"search_pubmed_key_words","arguments":{}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(responses["3"]["result"]["isError"], true);
        let text = responses["4"]["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(text, "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"prompts/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(responses["null"]["error"]["code"], -32700);
        assert_eq!(responses["5"]["error"]["code"], -32601);
        assert_eq!(responses["6"]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_resources() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"resources/read","params":{"uri":"pubmed://syntax"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"pubmed://missing"}}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(
            responses["1"]["result"]["resources"].as_array().unwrap().len(),
            2
        );
        let text = responses["2"]["result"]["contents"][0]["text"].as_str().unwrap();
        assert!(text.contains("[Date - Publication]"));
        assert_eq!(responses["3"]["error"]["code"], -32602);
    }
}
