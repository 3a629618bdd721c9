pub mod delivery;
pub mod index;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod retriever;
pub mod store;
pub mod synthesizer;
pub mod tasks;

mod error;

pub use delivery::{Delivery, DeliveryOutcome, EstimationJob};
pub use error::{Error, Result};
pub use index::{HistoricalFilter, QdrantTaskIndex, ScoredTask};
pub use notify::{ChannelHub, Notification, RunStatus};
pub use pipeline::{Orchestrator, PipelineRun};
pub use queue::EstimationQueue;
pub use store::PgEstimationStore;
pub use tasks::{
	CompleteTaskRequest, CreateTaskRequest, CreateTaskResponse, EstimationResponse, TaskAck,
	UpsertTagRequest,
};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use pace_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use pace_domain::RecommendationResult;
use pace_providers::{embedding, judgment};
use pace_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Schema-constrained generative judgment. Implementations return the decoded JSON value as-is;
/// validation against the schema happens in the synthesizer.
pub trait JudgmentProvider
where
	Self: Send + Sync,
{
	fn judge<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		schema_name: &'a str,
		schema: &'a Value,
	) -> BoxFuture<'a, Result<Value>>;
}

/// Vector index over historical tasks.
pub trait TaskIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		filter: &'a HistoricalFilter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredTask>>>;
}

/// Durable side of a run: tag lookups and the estimate written back onto the task.
pub trait EstimationStore
where
	Self: Send + Sync,
{
	fn tag_description<'a>(
		&'a self,
		owner_id: &'a str,
		tag_name: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>>;

	fn record_estimation<'a>(
		&'a self,
		task_client_id: &'a str,
		result: &'a RecommendationResult,
	) -> BoxFuture<'a, Result<()>>;

	fn record_estimation_error<'a>(&'a self, task_client_id: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Ordered, per-channel delivery of run notifications. Sending never blocks.
pub trait NotificationSink
where
	Self: Send + Sync,
{
	fn send(&self, channel: &str, notification: Notification) -> Result<()>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub judgment: Arc<dyn JudgmentProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, judgment: Arc<dyn JudgmentProvider>) -> Self {
		Self { embedding, judgment }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), judgment: provider }
	}
}

pub struct PaceService {
	pub cfg: Config,
	pub db: Arc<Db>,
	pub hub: ChannelHub,
	pub queue: EstimationQueue,
}
impl PaceService {
	/// Wires the production collaborators and starts the estimation dispatcher.
	///
	/// Must be called from within a Tokio runtime.
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self::with_providers(cfg, db, qdrant, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, qdrant: QdrantStore, providers: Providers) -> Self {
		let db = Arc::new(db);
		let hub = ChannelHub::default();
		let index = Arc::new(QdrantTaskIndex::new(qdrant));
		let store = Arc::new(PgEstimationStore::new(db.clone()));
		let orchestrator = Orchestrator::new(&cfg, &providers, index);
		let delivery = Delivery::new(orchestrator, store, Arc::new(hub.clone()));
		let queue = EstimationQueue::start(Arc::new(delivery), cfg.estimation.max_concurrent_runs);

		Self { cfg, db, hub, queue }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl JudgmentProvider for DefaultProviders {
	fn judge<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		schema_name: &'a str,
		schema: &'a Value,
	) -> BoxFuture<'a, Result<Value>> {
		Box::pin(async move { Ok(judgment::judge(cfg, messages, schema_name, schema).await?) })
	}
}
