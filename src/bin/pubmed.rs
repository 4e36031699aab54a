//! CLI binary for the PubMed client.
//!
//! Usage: pubmed search "crispr off-target" -n 10

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use pubmed_mcp::setup::EditorTarget;
    use pubmed_mcp::{AdvancedQuery, Article, DeepAnalysis, Dispatcher, PubMedClient, PubMedError};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(name = "pubmed", about = "PubMed search client and MCP server", version)]
    struct Cli {
        /// NCBI API key (overrides NCBI_API_KEY env var)
        #[arg(long, global = true)]
        api_key: Option<String>,

        /// Contact email sent to NCBI (overrides NCBI_EMAIL env var)
        #[arg(long, global = true)]
        email: Option<String>,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Search PubMed by key words
        Search {
            /// Search query (PubMed syntax)
            query: String,
            /// Maximum results to return
            #[arg(short = 'n', long, default_value = "10")]
            num_results: u32,
        },
        /// Search PubMed with field filters
        Advanced {
            /// General search term
            #[arg(long)]
            term: Option<String>,
            /// Words in the title
            #[arg(long)]
            title: Option<String>,
            /// Author name
            #[arg(long)]
            author: Option<String>,
            /// Journal name
            #[arg(long)]
            journal: Option<String>,
            /// Start date (YYYY/MM/DD)
            #[arg(long)]
            start_date: Option<String>,
            /// End date (YYYY/MM/DD)
            #[arg(long)]
            end_date: Option<String>,
            /// Maximum results to return
            #[arg(short = 'n', long, default_value = "10")]
            num_results: u32,
        },
        /// Show metadata for an article
        Metadata {
            /// PubMed identifier
            pmid: String,
        },
        /// Download the free full-text PDF of an article
        Pdf {
            /// PubMed identifier
            pmid: String,
            /// Directory to save into (overrides PUBMED_DOWNLOAD_DIR)
            #[arg(short, long)]
            dir: Option<PathBuf>,
        },
        /// Print the analysis outline for an article
        Analyze {
            /// PubMed identifier
            pmid: String,
        },
        /// Start MCP server (stdio)
        Serve,
        /// Register the MCP server with installed AI editors
        Setup {
            /// Only configure this editor
            #[arg(long)]
            editor: Option<EditorTarget>,
            /// Skip the PubMed connectivity check
            #[arg(long)]
            skip_check: bool,
            /// Answer yes to every prompt
            #[arg(short, long)]
            yes: bool,
        },
    }

    fn make_client(
        api_key: Option<String>,
        email: Option<String>,
    ) -> pubmed_mcp::error::Result<PubMedClient> {
        let mut client = PubMedClient::from_env()?;
        if let Some(key) = api_key {
            client = client.with_api_key(key);
        }
        if let Some(email) = email {
            client = client.with_email(email);
        }
        Ok(client)
    }

    fn init_logging() {
        // stdout carries the protocol when serving.
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn truncate(text: &str, max: usize) -> String {
        if text.chars().count() > max {
            let cut: String = text.chars().take(max - 3).collect();
            format!("{}...", cut)
        } else {
            text.to_string()
        }
    }

    fn print_articles_table(articles: &[Article]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["PMID", "Date", "First Author", "Title", "Journal"]);

        for article in articles {
            let first_author = article.authors.first().map(String::as_str).unwrap_or("-");
            table.add_row(vec![
                article.pmid.as_str(),
                article.publication_date.as_str(),
                first_author,
                &truncate(&article.title, 60),
                &truncate(&article.journal, 30),
            ]);
        }

        println!("{table}");
    }

    fn print_article(article: &Article) {
        println!("# {}\n", article.title);
        println!("Authors: {}", article.authors_display());
        println!("Journal: {}", article.journal);
        println!("Date:    {}", article.publication_date);
        println!("PMID:    {}", article.pmid);
        if let Some(doi) = &article.doi {
            println!("DOI:     {}", doi);
        }
        if let Some(pmcid) = &article.pmcid {
            println!("PMCID:   {}", pmcid);
        }
        if !article.keywords.is_empty() {
            println!("Keywords: {}", article.keywords.join("; "));
        }
        if !article.abstract_text.is_empty() {
            println!("\n{}", article.abstract_text);
        }
        println!("\n{}", article.url());
    }

    fn fetch_article(client: &PubMedClient, pmid: &str) -> pubmed_mcp::error::Result<Article> {
        client
            .fetch_metadata(pmid)?
            .ok_or_else(|| PubMedError::NotFound(format!("No metadata found for PMID: {}", pmid)))
    }

    fn print_results(articles: &[Article], output: OutputFormat) -> pubmed_mcp::error::Result<()> {
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(articles)?),
            OutputFormat::Table => {
                println!("{} results:", articles.len());
                print_articles_table(articles);
            }
        }
        Ok(())
    }

    /// Serve MCP over stdio. The blocking HTTP client is created and
    /// finally dropped outside the runtime.
    fn serve(client: PubMedClient) -> pubmed_mcp::error::Result<()> {
        let client = Arc::new(client);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        tracing::info!("PubMed MCP server v{} starting (stdio)", env!("CARGO_PKG_VERSION"));
        let dispatcher = Dispatcher::new(Arc::clone(&client));
        let result = runtime.block_on(pubmed_mcp::mcp::run_server(dispatcher));
        drop(runtime);
        tracing::info!("PubMed MCP server shutting down");
        result
    }

    pub fn run() -> pubmed_mcp::error::Result<()> {
        let cli = Cli::parse();
        init_logging();

        let client = make_client(cli.api_key, cli.email)?;

        match cli.command {
            Commands::Search { query, num_results } => {
                let articles = client.search_keywords(&query, num_results)?;
                print_results(&articles, cli.output)?;
            }

            Commands::Advanced {
                term,
                title,
                author,
                journal,
                start_date,
                end_date,
                num_results,
            } => {
                let query = AdvancedQuery {
                    term,
                    title,
                    author,
                    journal,
                    start_date,
                    end_date,
                };
                let articles = client.search_advanced(&query, num_results)?;
                print_results(&articles, cli.output)?;
            }

            Commands::Metadata { pmid } => {
                let article = fetch_article(&client, &pmid)?;
                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&article)?),
                    OutputFormat::Table => print_article(&article),
                }
            }

            Commands::Pdf { pmid, dir } => {
                let client = match dir {
                    Some(dir) => client.with_download_dir(dir),
                    None => client,
                };
                println!("{}", client.download_pdf(&pmid)?);
            }

            Commands::Analyze { pmid } => {
                let article = fetch_article(&client, &pmid)?;
                let analysis = DeepAnalysis::for_article(&article);
                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
                    OutputFormat::Table => {
                        for (name, body) in analysis.sections() {
                            println!("## {}\n{}\n", name, body);
                        }
                    }
                }
            }

            Commands::Serve => serve(client)?,

            Commands::Setup {
                editor,
                skip_check,
                yes,
            } => pubmed_mcp::setup::run_setup(editor, skip_check, yes)?,
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
