use std::sync::Arc;

use pace_service::EstimationQueue;

use super::{
	JudgmentBehavior, RecordingSink, RecordingStore, StubIndex, StubJudgment, delivery, job,
	judgment_reply, orchestrator, scenario_a_history, wait_until,
};

#[tokio::test]
async fn submit_announces_before_the_run() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let queue = EstimationQueue::start(
		Arc::new(delivery(
			orchestrator(
				StubIndex::returning(scenario_a_history()),
				StubJudgment::replying(judgment_reply("increase", 120, 0)),
			),
			store.clone(),
			sink.clone(),
		)),
		2,
	);

	queue.submit(job("client-1", &["work"])).expect("Queue must accept jobs.");

	assert_eq!(sink.kinds_for("client-1").first().map(String::as_str), Some("status:started"));
	assert!(wait_until(|| sink.kinds_for("client-1").len() == 3).await);
	assert_eq!(sink.kinds_for("client-1"), vec!["status:started", "result", "status:completed"]);
	assert_eq!(store.estimations().len(), 1);
}

#[tokio::test]
async fn every_job_keeps_its_own_notification_order() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let queue = EstimationQueue::start(
		Arc::new(delivery(
			orchestrator(
				StubIndex::returning(scenario_a_history()),
				StubJudgment::replying(judgment_reply("keep", 90, 0)),
			),
			store.clone(),
			sink.clone(),
		)),
		2,
	);
	let ids: Vec<_> = (0..6).map(|index| format!("client-{index}")).collect();

	for id in &ids {
		queue.submit(job(id, &["work"])).expect("Queue must accept jobs.");
	}

	assert!(wait_until(|| store.estimations().len() == ids.len()).await);
	assert!(
		wait_until(|| ids.iter().all(|id| sink.kinds_for(id).len() == 3)).await,
		"Every job must finish with a completed status."
	);

	for id in &ids {
		assert_eq!(sink.kinds_for(id), vec!["status:started", "result", "status:completed"]);
	}
}

#[tokio::test]
async fn panicking_run_is_contained() {
	let store = Arc::new(RecordingStore::default());
	let sink = Arc::new(RecordingSink::default());
	let queue = EstimationQueue::start(
		Arc::new(delivery(
			orchestrator(
				StubIndex::returning(scenario_a_history()),
				StubJudgment::with(JudgmentBehavior::Panic),
			),
			store.clone(),
			sink.clone(),
		)),
		1,
	);

	queue.submit(job("client-1", &["work"])).expect("Queue must accept jobs.");

	assert!(wait_until(|| sink.kinds_for("client-1").len() == 2).await);
	assert_eq!(sink.kinds_for("client-1"), vec!["status:started", "error"]);
	assert!(wait_until(|| store.errors() == vec!["client-1".to_string()]).await);

	// Jobs that never reach the judgment still run after the panic.
	queue.submit(job("client-2", &[])).expect("Queue must accept jobs.");

	assert!(wait_until(|| sink.kinds_for("client-2").len() == 2).await);
	assert_eq!(sink.kinds_for("client-2"), vec!["status:started", "error"]);
}
