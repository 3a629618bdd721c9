use pace_config::Postgres;
use pace_storage::{
	db::Db,
	models::{AiEstimationUpdate, NewTask},
	outbox::{self, OutboxOp},
	queries,
};
use pace_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

fn new_task(task_client_id: &str) -> NewTask {
	NewTask {
		task_client_id: task_client_id.to_string(),
		owner_id: "owner@example.com".to_string(),
		title: "Write report".to_string(),
		description: "Quarterly numbers".to_string(),
		tag_names: vec!["work".to_string()],
		duration_minutes: 90,
		estimated_cost: 0,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PACE_PG_DSN to run."]
async fn schema_bootstrap_is_repeatable() {
	let Some(base_dsn) = pace_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_repeatable; set PACE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	db.ensure_schema().await.expect("Second bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM information_schema.tables
WHERE table_name IN ('tasks', 'tags', 'task_indexing_outbox')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PACE_PG_DSN to run."]
async fn estimation_is_persisted_by_correlation_id() {
	let Some(base_dsn) = pace_testkit::env_dsn() else {
		eprintln!(
			"Skipping estimation_is_persisted_by_correlation_id; set PACE_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	queries::upsert_task_tx(&mut tx, &new_task("client-1")).await.expect("Failed to upsert task.");
	tx.commit().await.expect("Failed to commit.");

	let update = AiEstimationUpdate {
		time_estimation: 120,
		cost_estimation: 0,
		recommendation: "increase".to_string(),
		reasoning: "Similar work ran long.".to_string(),
		confidence: "high".to_string(),
	};

	queries::record_ai_estimation(&db, "client-1", &update)
		.await
		.expect("Failed to record estimation.");

	let stored = queries::get_ai_estimation(&db, "client-1")
		.await
		.expect("Failed to read estimation.")
		.expect("Estimation row must exist.");

	assert_eq!(stored.ai_estimation_status.as_deref(), Some(queries::AI_STATUS_SUCCESS));
	assert_eq!(stored.ai_time_estimation, Some(120));
	assert_eq!(stored.ai_recommendation.as_deref(), Some("increase"));

	queries::record_ai_estimation_error(&db, "client-1").await.expect("Failed to record error.");

	let stored = queries::get_ai_estimation(&db, "client-1")
		.await
		.expect("Failed to read estimation.")
		.expect("Estimation row must exist.");

	assert_eq!(stored.ai_estimation_status.as_deref(), Some(queries::AI_STATUS_ERROR));
	assert!(matches!(
		queries::record_ai_estimation_error(&db, "missing").await,
		Err(pace_storage::Error::NotFound(_))
	));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PACE_PG_DSN to run."]
async fn completion_prefers_actual_values() {
	let Some(base_dsn) = pace_testkit::env_dsn() else {
		eprintln!("Skipping completion_prefers_actual_values; set PACE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	queries::upsert_task_tx(&mut tx, &new_task("client-2")).await.expect("Failed to upsert task.");

	assert!(
		queries::complete_task_tx(&mut tx, "client-2", Some(150), None)
			.await
			.expect("Failed to complete task.")
	);

	tx.commit().await.expect("Failed to commit.");

	let task = queries::get_task(&db, "client-2")
		.await
		.expect("Failed to read task.")
		.expect("Task must exist.");

	assert!(task.is_completed);
	assert_eq!(task.historical_duration(), 150);
	assert_eq!(task.historical_cost(), 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PACE_PG_DSN to run."]
async fn outbox_claims_are_leased() {
	let Some(base_dsn) = pace_testkit::env_dsn() else {
		eprintln!("Skipping outbox_claims_are_leased; set PACE_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
	let outbox_id = outbox::enqueue_tx(&mut tx, "client-3", OutboxOp::Upsert)
		.await
		.expect("Failed to enqueue outbox.");

	tx.commit().await.expect("Failed to commit.");

	let now = time::OffsetDateTime::now_utc();
	let lease = time::Duration::seconds(30);
	let job = outbox::fetch_next_job(&db, now, lease)
		.await
		.expect("Failed to fetch job.")
		.expect("A job must be due.");

	assert_eq!(job.outbox_id, outbox_id);
	assert_eq!(job.op, OutboxOp::Upsert.as_str());
	assert!(
		outbox::fetch_next_job(&db, now, lease).await.expect("Failed to fetch job.").is_none()
	);

	outbox::mark_done(&db, outbox_id, now).await.expect("Failed to mark done.");
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
