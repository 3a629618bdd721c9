use std::sync::{Arc, atomic::Ordering};

use pace_service::retriever::Retriever;

use super::{IndexBehavior, StubEmbedding, StubIndex, historical, scored, test_config};

fn retriever(embedding: StubEmbedding, index: StubIndex) -> Retriever {
	Retriever::new(Arc::new(embedding), Arc::new(index), test_config().providers.embedding)
}

#[tokio::test]
async fn blank_query_skips_providers() {
	let embedding = StubEmbedding::new();
	let embed_calls = embedding.calls.clone();
	let index = StubIndex::returning(vec![scored(historical("past-1", Some(30), &["work"]), 0.9)]);
	let search_calls = index.calls.clone();
	let retriever = retriever(embedding, index);

	assert!(retriever.retrieve("   \n", "work", "client-1", 4).await.is_empty());
	assert!(retriever.retrieve("query", "work", "client-1", 0).await.is_empty());
	assert_eq!(embed_calls.load(Ordering::SeqCst), 0);
	assert_eq!(search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rechecks_filter_on_returned_records() {
	let index = StubIndex::returning(vec![
		scored(historical("client-1", Some(30), &["work"]), 0.99),
		scored(historical("past-1", Some(45), &["home"]), 0.95),
		scored(historical("past-2", Some(60), &["work"]), 0.70),
		scored(historical("past-3", Some(75), &["work", "report"]), 0.85),
	]);
	let retriever = retriever(StubEmbedding::new(), index);
	let tasks = retriever.retrieve("Write the report", "work", "client-1", 4).await;
	let ids: Vec<_> = tasks.iter().map(|task| task.id.as_str()).collect();

	assert_eq!(ids, vec!["past-3", "past-2"]);
	assert!(tasks.iter().all(|task| task.has_tag("work") && task.id != "client-1"));
}

#[tokio::test]
async fn truncates_to_k_by_descending_score() {
	let index = StubIndex::returning(
		(0..6)
			.map(|index| scored(historical(&format!("past-{index}"), Some(30), &["work"]), index as f32))
			.collect(),
	);
	let retriever = retriever(StubEmbedding::new(), index);
	let tasks = retriever.retrieve("query", "work", "client-1", 2).await;
	let ids: Vec<_> = tasks.iter().map(|task| task.id.as_str()).collect();

	assert_eq!(ids, vec!["past-5", "past-4"]);
}

#[tokio::test]
async fn backend_failures_degrade_to_empty() {
	let failing_embedding = retriever(
		StubEmbedding::failing(),
		StubIndex::returning(vec![scored(historical("past-1", Some(30), &["work"]), 0.9)]),
	);

	assert!(failing_embedding.retrieve("query", "work", "client-1", 4).await.is_empty());

	let failing_index = retriever(StubEmbedding::new(), StubIndex::with(IndexBehavior::Fail));

	assert!(failing_index.retrieve("query", "work", "client-1", 4).await.is_empty());
}
