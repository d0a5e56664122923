use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::catalog::DedupPolicy;

#[derive(Parser, Debug)]
#[command(version, about = "Recommend assessments for a query or a job description", long_about = None)]
pub struct Args {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct GlobalArgs {
    /// YAML config file. Defaults to ./config.yaml when present.
    #[clap(long, global = true, env = "RECOMMENDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog JSON produced by `crawl`
    #[clap(long, global = true, env = "RECOMMENDER_DATA")]
    pub data: Option<PathBuf>,

    /// Embedding model name (e.g. all-MiniLM-L6-v2)
    #[clap(long, global = true, env = "RECOMMENDER_MODEL")]
    pub model: Option<String>,

    /// How duplicate catalog entries are treated
    #[clap(long, global = true, value_enum)]
    pub dedup: Option<DedupPolicy>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API.
    Serve {
        /// host:port to listen on
        #[clap(long, env = "RECOMMENDER_BIND")]
        bind: Option<String>,
    },

    /// Recommend assessments once and print them
    Recommend {
        /// Free-text query
        query: Option<String>,

        /// Job description URL. Takes precedence over the query.
        #[clap(short, long)]
        url: Option<String>,

        /// Number of results
        #[clap(short, long)]
        k: Option<usize>,

        /// Print JSON instead of lines
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Crawl the product catalog into a JSON file
    Crawl {
        /// Output file. Defaults to the configured data path.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a column of predictions to a CSV of queries
    Predict {
        input: PathBuf,
        output: PathBuf,

        #[clap(short, long)]
        k: Option<usize>,
    },

    /// Compute Recall@k on a CSV with a labelled recommendations column
    Evaluate {
        input: PathBuf,

        #[clap(short, long)]
        k: Option<usize>,
    },
}
