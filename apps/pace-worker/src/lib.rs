pub mod worker;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pace_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = pace_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let state = worker::WorkerState { db, qdrant, embedding: config.providers.embedding };

	Ok(worker::run_worker(state).await?)
}
