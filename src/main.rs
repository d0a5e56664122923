use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod catalog;
mod cli;
mod config;
mod crawler;
mod evaluate;
mod extract;
mod resolver;
mod semantic;
#[cfg(test)]
mod tests;
mod web;

use app::AppContext;
use cli::{Command, GlobalArgs};
use config::Config;
use resolver::QueryPayload;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file first, then command line overrides.
fn load_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;

    if let Some(data) = &global.data {
        config.data_path = data.clone();
    }
    if let Some(model) = &global.model {
        config.model = model.clone();
    }
    if let Some(dedup) = global.dedup {
        config.dedup = dedup;
    }

    config.validate()?;
    Ok(config)
}

/// Names of the top `k` assessments for `query`.
fn names(app: &AppContext, query: &str, k: usize) -> anyhow::Result<Vec<String>> {
    Ok(app
        .recommend_text(query, k)?
        .into_iter()
        .map(|r| r.assessment_name)
        .collect())
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let mut config = load_config(&args.global)?;

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }

            let app = AppContext::from_config(&config)?;
            app.warm_up().context("failed to build embedding index")?;
            log::info!(
                "serving {} assessments embedded with '{}'",
                app.recommender().assessments_loaded(),
                app.recommender().model_name()
            );

            web::start_daemon(app.clone(), &config.bind)
        }

        Command::Recommend {
            query,
            url,
            k,
            json,
        } => {
            let app = AppContext::from_config(&config)?;
            let text = app.resolve(&QueryPayload { query, url })?;
            let results = app.recommend_text(&text, k.unwrap_or(config.top_k))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for r in results {
                    println!("{} -> {} ({:.4})", r.assessment_name, r.url, r.score);
                }
            }
            Ok(())
        }

        Command::Crawl { output } => {
            let output = output.unwrap_or_else(|| config.data_path.clone());
            let crawler = crawler::CatalogCrawler::new(config.crawler.clone())?;
            let records = crawler.crawl();
            crawler::write_catalog(&records, &output)
        }

        Command::Predict { input, output, k } => {
            let app = AppContext::from_config(&config)?;
            let k = k.unwrap_or(config.top_k);

            let table = evaluate::QueryTable::read(&input)?;
            let predictions = evaluate::predict(&table, k, |query, k| names(&app, query, k))?;

            let file = std::fs::File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            evaluate::write_predictions(&table, &predictions, file)?;

            log::info!("predictions saved to {}", output.display());
            Ok(())
        }

        Command::Evaluate { input, k } => {
            let app = AppContext::from_config(&config)?;
            let k = k.unwrap_or(config.top_k);

            let table = evaluate::QueryTable::read(&input)?;
            let evaluation = evaluate::evaluate(&table, k, |query, k| names(&app, query, k))?;

            println!(
                "Recall@{}: {:.2} ({}/{})",
                evaluation.k,
                evaluation.recall(),
                evaluation.hits,
                evaluation.total
            );
            Ok(())
        }
    }
}
