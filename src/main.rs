use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;

use raglite::{
    build_index, load_documents, AnswerResponse, Embedder, FlatIndex, OpenAiChat,
    OpenAiEmbeddings, RagConfig, RagPipeline,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "raglite - grounded question answering over your own documents",
    long_about = None
)]
struct Cli {
    /// Path to a YAML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk and embed a directory of .txt/.md files into a persisted index
    Build {
        /// Directory to scan for documents
        #[arg(long)]
        data_dir: PathBuf,

        /// Override the vector artifact path from the config
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Override the metadata artifact path from the config
        #[arg(long)]
        meta_path: Option<PathBuf>,
    },
    /// Answer questions against a previously built index
    Query {
        /// One-shot question; omit for an interactive loop
        #[arg(short, long)]
        query: Option<String>,

        /// Override the retrieval cap from the config
        #[arg(long)]
        max_retrieval: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RagConfig::from_path(path)?,
        None => RagConfig::default(),
    };

    match cli.command {
        Command::Build {
            data_dir,
            index_path,
            meta_path,
        } => {
            let index_path = index_path.unwrap_or_else(|| config.store.index_path.clone());
            let meta_path = meta_path.unwrap_or_else(|| config.store.meta_path.clone());

            let embedder = embedder_from_config(&config)?;
            let documents = load_documents(&data_dir)?;
            let index = build_index(&documents, &embedder, &config.chunking)?;
            info!(rows = index.len(), "index built");
            index.save(&index_path, &meta_path)?;
            println!(
                "Indexed {} chunks from {} documents into {}",
                index.len(),
                documents.len(),
                index_path.display()
            );
        }
        Command::Query {
            query,
            max_retrieval,
        } => {
            let index = FlatIndex::load(&config.store.index_path, &config.store.meta_path)?;
            info!(rows = index.len(), "index loaded");

            let embedder = embedder_from_config(&config)?;
            let llm_key = api_key(&config.llm.api_key_env)?;
            let llm = OpenAiChat::new(
                &config.llm.base_url,
                &llm_key,
                &config.llm.model,
                config.llm.temperature,
            );
            let pipeline = RagPipeline::new(
                Arc::new(RwLock::new(index)),
                embedder,
                Box::new(llm),
                max_retrieval.unwrap_or(config.max_retrieval),
            )?;

            match query {
                Some(question) => print_response(&pipeline.answer(&question)?),
                None => interactive_loop(&pipeline)?,
            }
        }
    }

    Ok(())
}

fn embedder_from_config(config: &RagConfig) -> Result<Embedder, Box<dyn std::error::Error>> {
    let key = api_key(&config.embedding.api_key_env)?;
    let model = OpenAiEmbeddings::new(
        &config.embedding.base_url,
        &key,
        &config.embedding.model,
        config.embedding.dimension,
    );
    Ok(Embedder::new(Box::new(model), config.embedding.batch_size))
}

fn api_key(env_var: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::env::var(env_var).map_err(|_| format!("Environment variable {} is not set", env_var).into())
}

fn interactive_loop(pipeline: &RagPipeline) -> io::Result<()> {
    println!("Enter question (empty to quit):");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }
        match pipeline.answer(question) {
            Ok(response) => print_response(&response),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

fn print_response(response: &AnswerResponse) {
    println!("\n--- Answer ---");
    println!("{}", response.answer);
    println!("\n--- Sources ---");
    for source in &response.sources {
        println!("{}", source);
    }
    println!();
}
