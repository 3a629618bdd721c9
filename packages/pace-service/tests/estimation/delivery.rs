use std::sync::Arc;

use pace_domain::Recommendation;
use pace_service::{DeliveryOutcome, Notification};

use super::{
	JudgmentBehavior, RecordingSink, RecordingStore, StubIndex, StubJudgment, delivery, job,
	judgment_reply, orchestrator, scenario_a_history,
};

#[tokio::test]
async fn success_notifies_then_persists_by_correlation_id() {
	let store = Arc::new(RecordingStore::with_tag("owner@example.com", "work", "Work tasks"));
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply("increase", 120, 0)),
		),
		store.clone(),
		sink.clone(),
	);
	let outcome = delivery.run(job("client-1", &["work", "report"])).await;

	let DeliveryOutcome::Completed(result) = outcome else {
		panic!("Expected a completed outcome.");
	};

	assert_eq!(result.recommendation, Recommendation::Increase);
	assert_eq!(sink.kinds_for("client-1"), vec!["result", "status:completed"]);
	assert!(sink.sent().iter().all(|(channel, _)| channel == "socket-1"));
	assert_eq!(store.estimations(), vec![("client-1".to_string(), result.clone())]);
	assert!(store.errors().is_empty());

	let sent = sink.sent();
	let (_, Notification::Result { result: notified, .. }) = &sent[0] else {
		panic!("First notification must carry the result.");
	};

	assert_eq!(notified, &result);
}

#[tokio::test]
async fn judgment_failure_is_not_an_error_notification() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::with(JudgmentBehavior::Fail),
		),
		store.clone(),
		sink.clone(),
	);
	let outcome = delivery.run(job("client-c", &["work"])).await;

	assert!(matches!(outcome, DeliveryOutcome::Completed(ref result) if result.suggested_minutes == 90));
	assert_eq!(sink.kinds_for("client-c"), vec!["result", "status:completed"]);
	assert!(store.errors().is_empty());
}

#[tokio::test]
async fn missing_tag_reports_error_and_marks_task() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply("increase", 120, 0)),
		),
		store.clone(),
		sink.clone(),
	);
	let outcome = delivery.run(job("client-d", &[])).await;

	assert!(matches!(outcome, DeliveryOutcome::Failed { ref message } if message.contains("tag_name")));
	assert_eq!(sink.kinds_for("client-d"), vec!["error"]);
	assert_eq!(store.errors(), vec!["client-d".to_string()]);
	assert!(store.estimations().is_empty());
}

#[tokio::test]
async fn persistence_failures_are_contained() {
	let store = Arc::new(RecordingStore { fail_record: true, ..RecordingStore::default() });
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply("increase", 120, 0)),
		),
		store.clone(),
		sink.clone(),
	);

	assert!(matches!(
		delivery.run(job("client-1", &["work"])).await,
		DeliveryOutcome::Completed(_)
	));
	assert_eq!(sink.kinds_for("client-1"), vec!["result", "status:completed"]);

	assert!(matches!(delivery.run(job("client-2", &[])).await, DeliveryOutcome::Failed { .. }));
	assert_eq!(sink.kinds_for("client-2"), vec!["error"]);
	assert_eq!(store.errors(), vec!["client-2".to_string()]);
}

#[tokio::test]
async fn tag_lookup_failure_uses_empty_description() {
	let store = Arc::new(RecordingStore { fail_tag_lookup: true, ..RecordingStore::default() });
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply("increase", 120, 0)),
		),
		store.clone(),
		sink.clone(),
	);

	assert!(matches!(
		delivery.run(job("client-1", &["work"])).await,
		DeliveryOutcome::Completed(_)
	));
	assert_eq!(store.estimations().len(), 1);
}

#[tokio::test]
async fn sink_failures_do_not_fail_the_run() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink { fail: true, ..RecordingSink::default() });
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply("increase", 120, 0)),
		),
		store.clone(),
		sink.clone(),
	);

	delivery.announce(&job("client-1", &["work"]));

	assert!(matches!(
		delivery.run(job("client-1", &["work"])).await,
		DeliveryOutcome::Completed(_)
	));
	assert_eq!(store.estimations().len(), 1);
	assert_eq!(sink.kinds_for("client-1"), vec!["status:started", "result", "status:completed"]);
}

#[tokio::test]
async fn concurrent_runs_for_one_task_are_rejected() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let delivery = delivery(
		orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::with(JudgmentBehavior::Hang),
		),
		store.clone(),
		sink.clone(),
	);
	let (first, second) =
		tokio::join!(delivery.run(job("client-1", &["work"])), delivery.run(job("client-1", &["work"])));

	assert!(matches!(first, DeliveryOutcome::Completed(_)));
	assert_eq!(second, DeliveryOutcome::Rejected);
	assert_eq!(store.estimations().len(), 1);
	assert!(store.errors().is_empty());

	let kinds = sink.kinds_for("client-1");

	assert_eq!(kinds.iter().filter(|kind| kind.as_str() == "error").count(), 1);
	assert_eq!(kinds.last().map(String::as_str), Some("status:completed"));

	// The lease is released once the first run finishes.
	assert!(matches!(
		delivery.run(job("client-1", &["work"])).await,
		DeliveryOutcome::Completed(_)
	));
}
