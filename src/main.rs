mod load;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ragline_core::{Config, ProductCatalog, RagError, RagPipeline, compose_query};
use ragline_llm::openai::OpenAiProvider;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ragline", version, about = "Answer questions over a folder of documents")]
struct Cli {
    /// Config file (default: $RAGLINE_CONFIG or config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve relevant chunks and generate a grounded answer
    Ask {
        /// Folder of documents to search
        #[arg(long)]
        docs: PathBuf,
        /// Keyword-to-completion JSON with product lists to build the question from
        #[arg(long)]
        products: Option<PathBuf>,
        /// Question, or the request appended after the product lists
        #[arg(long)]
        question: Option<String>,
        /// Also write the answer to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the ranked chunks for a question without generating an answer
    Search {
        #[arg(long)]
        docs: PathBuf,
        #[arg(long)]
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal, cancelling");
        on_signal.cancel();
    });

    match cli.command {
        Command::Ask {
            docs,
            products,
            question,
            output,
        } => {
            let query = build_query(&config, products.as_deref(), question).await?;
            let pipeline = RagPipeline::from_config(&config, Arc::new(create_provider(&config)?))?;
            let documents = load::load_folder(&docs, &load::default_loaders()).await?;

            let outcome = pipeline
                .run(documents, &query, &cancel)
                .await
                .map_err(stage_error)?;
            if !outcome.skipped.is_empty() {
                eprintln!(
                    "warning: {} of {} chunks could not be embedded and were left out",
                    outcome.skipped.len(),
                    outcome.chunk_count
                );
            }

            let text = outcome.answer.answer.text;
            if text.trim().is_empty() {
                eprintln!("warning: the model returned an empty answer");
            }
            println!("{text}");

            if let Some(path) = output {
                tokio::fs::write(&path, &text)
                    .await
                    .with_context(|| format!("failed to write answer to {}", path.display()))?;
                eprintln!("answer saved to {}", path.display());
            }
        }
        Command::Search {
            docs,
            question,
            top_k,
        } => {
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
            }
            let pipeline = RagPipeline::from_config(&config, Arc::new(create_provider(&config)?))?;
            let documents = load::load_folder(&docs, &load::default_loaders()).await?;

            let report = pipeline
                .ingest(documents, &cancel)
                .await
                .map_err(stage_error)?;
            let ranked = pipeline
                .retrieve(&question, &report.corpus)
                .await
                .map_err(stage_error)?;
            for (rank, chunk) in ranked.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {}#{}\n{}\n",
                    rank + 1,
                    chunk.score,
                    chunk.source,
                    chunk.chunk_index,
                    chunk.content
                );
            }
        }
    }

    Ok(())
}

async fn build_query(
    config: &Config,
    products: Option<&Path>,
    question: Option<String>,
) -> anyhow::Result<String> {
    let Some(path) = products else {
        return question.context("--question is required unless --products is given");
    };
    let catalog = ProductCatalog::load(path)
        .await
        .with_context(|| format!("failed to load product lists from {}", path.display()))?;
    if catalog.is_empty() {
        bail!("no product lists found in {}", path.display());
    }
    let request = question.unwrap_or_else(|| config.prompt.product_request.clone());
    Ok(compose_query(&catalog, &request))
}

fn create_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    let Some(api_key) = config.secrets.openai_api_key.as_ref() else {
        bail!("RAGLINE_OPENAI_API_KEY is not set");
    };
    Ok(OpenAiProvider::new(
        api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        config.llm.completion_model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    )
    .with_max_retries(config.llm.max_retries))
}

fn stage_error(e: RagError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{stage} stage failed"))
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Ok(path) = std::env::var("RAGLINE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "ragline", "--config", "x.toml", "ask", "--docs", "pdfs", "--question", "what?",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Command::Ask { ref docs, question: Some(ref q), products: None, output: None }
                if docs == Path::new("pdfs") && q == "what?"
        ));
    }

    #[test]
    fn cli_parses_search_with_top_k() {
        let cli = Cli::try_parse_from([
            "ragline", "search", "--docs", "d", "--question", "q", "--top-k", "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Search { top_k: Some(3), .. }));
    }

    #[test]
    fn search_requires_question() {
        assert!(Cli::try_parse_from(["ragline", "search", "--docs", "d"]).is_err());
    }

    #[test]
    fn explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some(PathBuf::from("custom.toml"))),
            PathBuf::from("custom.toml")
        );
    }

    #[tokio::test]
    async fn question_required_without_products() {
        let config = Config::default();
        assert!(build_query(&config, None, None).await.is_err());
        assert_eq!(
            build_query(&config, None, Some("q".into())).await.unwrap(),
            "q"
        );
    }

    #[tokio::test]
    async fn products_build_query_with_default_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"{"knee":{"choices":[{"message":{"content":"{\"keyword\":\"knee\",\"related_products\":[\"implant\"]}"}}]}}"#,
        )
        .unwrap();

        let config = Config::default();
        let query = build_query(&config, Some(&path), None).await.unwrap();
        assert!(query.starts_with("Here are several product lists:\n[keyword] knee\nimplant"));
        assert!(query.ends_with(&config.prompt.product_request));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        assert!(create_provider(&Config::default()).is_err());
    }

    #[test]
    fn stage_is_named_in_error() {
        let err = stage_error(RagError::EmptyCorpus);
        assert!(format!("{err:#}").starts_with("retrieval stage failed"));
    }
}
