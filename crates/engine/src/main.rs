//! dhsheet-migrate - migrate an exported world file in place.
//!
//! Usage: `dhsheet-migrate [WORLD.json] [--output OUT.json]`
//!
//! The input defaults to `DHSHEET_WORLD_PATH`. Without `--output` the input
//! file is overwritten.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dhsheet_engine::infrastructure::config::{load_dotenv_from_repo_root, EngineConfig};
use dhsheet_engine::infrastructure::json_file::{load_documents, save_documents};
use dhsheet_engine::infrastructure::memory::InMemoryDocumentRepo;
use dhsheet_engine::App;

struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args {
        input: None,
        output: None,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                let path = args.next().context("--output needs a path")?;
                parsed.output = Some(PathBuf::from(path));
            }
            _ if parsed.input.is_none() => parsed.input = Some(PathBuf::from(arg)),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();
    let config = EngineConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let input = args
        .input
        .or_else(|| config.world_path.clone())
        .context("no world file given and DHSHEET_WORLD_PATH is unset")?;
    let output = args.output.unwrap_or_else(|| input.clone());

    tracing::info!(input = %input.display(), output = %output.display(), "Loading world");
    let documents = load_documents(&input).await?;
    let repo = Arc::new(InMemoryDocumentRepo::from_documents(documents));
    let app = App::new(repo.clone(), config);

    let report = app.use_cases.migration.world.execute().await?;
    save_documents(&output, &repo.snapshot()).await?;

    println!(
        "{} documents, {} changed, {} stamped, {} failed",
        report.documents,
        report.changed,
        report.stamped,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.document, failure.reason);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
