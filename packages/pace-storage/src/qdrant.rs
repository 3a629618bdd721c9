use qdrant_client::qdrant::{
	CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
	VectorParamsBuilder, VectorsConfigBuilder,
};
use uuid::Uuid;

use crate::Result;

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const TAGS_FIELD: &str = "tags";
pub const TASK_CLIENT_ID_FIELD: &str = "task_client_id";

const KEYWORD_INDEXES: [&str; 3] = [TAGS_FIELD, TASK_CLIENT_ID_FIELD, "owner_id"];

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &pace_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its keyword payload indexes when the collection is missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		for field in KEYWORD_INDEXES {
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(
						self.collection.clone(),
						field,
						FieldType::Keyword,
					)
					.wait(true),
				)
				.await?;
		}

		Ok(())
	}
}

/// Stable point id so re-indexing a task overwrites its previous point.
pub fn point_id_for(task_client_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, task_client_id.as_bytes())
}
