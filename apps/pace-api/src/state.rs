use std::sync::Arc;

use pace_service::PaceService;
use pace_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PaceService>,
}
impl AppState {
	pub async fn new(config: pace_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = PaceService::new(config, db, qdrant);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: PaceService) -> Self {
		Self { service: Arc::new(service) }
	}
}
