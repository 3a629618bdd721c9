use std::{sync::atomic::Ordering, time::Duration};

use tokio::time;

use pace_domain::{Confidence, PipelineInputArgs, Recommendation};
use pace_service::Error;

use super::{
	IndexBehavior, JudgmentBehavior, StubIndex, StubJudgment, input_args, judgment_reply,
	orchestrator, scenario_a_history,
};

#[tokio::test]
async fn longer_history_recommends_increase() {
	let orchestrator = orchestrator(
		StubIndex::returning(scenario_a_history()),
		StubJudgment::replying(judgment_reply("increase", 100, 0)),
	);
	let run = orchestrator.run(input_args("client-a")).await.expect("Run must succeed.");

	assert_eq!(run.result.recommendation, Recommendation::Increase);
	assert!(run.result.suggested_minutes >= 90);
	assert_eq!(run.result.suggested_minutes, 100);
	assert_eq!(run.result.historical_tasks_analyzed, 3);
	assert_eq!(run.result.similar_tags_found, 2);
	assert_eq!(
		run.trace,
		vec!["retrieve: 3 historical tasks".to_string(), "synthesize: increase 100 minutes, cost 0".to_string()]
	);
}

#[tokio::test]
async fn empty_history_keeps_the_estimate_without_judgment() {
	let judgment = StubJudgment::replying(judgment_reply("increase", 500, 0));
	let judgment_calls = judgment.calls.clone();
	let orchestrator = orchestrator(StubIndex::returning(Vec::new()), judgment);
	let first = orchestrator.run(input_args("client-b")).await.expect("Run must succeed.");
	let second = orchestrator.run(input_args("client-b")).await.expect("Run must succeed.");

	for run in [&first, &second] {
		assert_eq!(run.result.recommendation, Recommendation::Keep);
		assert_eq!(run.result.suggested_minutes, 90);
		assert_eq!(run.result.suggested_cost, 0);
		assert_eq!(run.result.confidence, Confidence::Medium);
		assert_eq!(run.result.historical_tasks_analyzed, 0);
	}

	assert_eq!(first.result, second.result);
	assert_eq!(judgment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn judgment_failure_falls_back() {
	let orchestrator = orchestrator(
		StubIndex::returning(scenario_a_history()),
		StubJudgment::with(JudgmentBehavior::Fail),
	);
	let run = orchestrator.run(input_args("client-c")).await.expect("Run must succeed.");

	assert_eq!(run.result.recommendation, Recommendation::Keep);
	assert_eq!(run.result.suggested_minutes, 90);
	assert_eq!(run.result.confidence, Confidence::Medium);
	assert_eq!(run.result.reasoning, "No reasoning provided");
	assert_eq!(run.result.historical_tasks_analyzed, 3);
}

#[tokio::test]
async fn off_schema_judgment_falls_back() {
	for reply in [
		judgment_reply("decrease", 30, 0),
		serde_json::json!({ "recommendation": "increase" }),
		serde_json::json!("increase to 120 minutes"),
		{
			let mut extra = judgment_reply("increase", 120, 0);

			extra["notes"] = serde_json::json!("unexpected");

			extra
		},
	] {
		let orchestrator =
			orchestrator(StubIndex::returning(scenario_a_history()), StubJudgment::replying(reply));
		let run = orchestrator.run(input_args("client-c")).await.expect("Run must succeed.");

		assert_eq!(run.result.recommendation, Recommendation::Keep);
		assert_eq!(run.result.suggested_minutes, 90);
		assert_eq!(run.result.confidence, Confidence::Medium);
	}
}

#[tokio::test]
async fn suggestions_never_drop_below_the_initial_estimate() {
	for (recommendation, minutes, cost) in
		[("keep", 10, 0), ("increase", 45, 3), ("increase", 0, 0), ("keep", 90, 25)]
	{
		let orchestrator = orchestrator(
			StubIndex::returning(scenario_a_history()),
			StubJudgment::replying(judgment_reply(recommendation, minutes, cost)),
		);
		let mut args = input_args("client-floor");

		args.initial_cost = 20;

		let run = orchestrator.run(args).await.expect("Run must succeed.");

		assert!(run.result.suggested_minutes >= 90, "{recommendation} {minutes}");
		assert!(run.result.suggested_cost >= 20, "{recommendation} {cost}");
	}
}

#[tokio::test]
async fn slow_judgment_times_out_to_fallback() {
	let orchestrator = orchestrator(
		StubIndex::returning(scenario_a_history()),
		StubJudgment::with(JudgmentBehavior::Hang),
	);
	let run = time::timeout(Duration::from_secs(5), orchestrator.run(input_args("client-slow")))
		.await
		.expect("Judgment deadline must bound the run.")
		.expect("Run must succeed.");

	assert_eq!(run.result.recommendation, Recommendation::Keep);
	assert_eq!(run.result.suggested_minutes, 90);
	assert_eq!(run.result.historical_tasks_analyzed, 3);
}

#[tokio::test]
async fn slow_retrieval_times_out_to_empty_history() {
	let judgment = StubJudgment::replying(judgment_reply("increase", 200, 0));
	let judgment_calls = judgment.calls.clone();
	let orchestrator = orchestrator(StubIndex::with(IndexBehavior::Hang), judgment);
	let run = time::timeout(Duration::from_secs(5), orchestrator.run(input_args("client-slow")))
		.await
		.expect("Retrieval deadline must bound the run.")
		.expect("Run must succeed.");

	assert_eq!(run.result.recommendation, Recommendation::Keep);
	assert_eq!(run.result.historical_tasks_analyzed, 0);
	assert_eq!(run.trace[0], "retrieve: 0 historical tasks");
	assert_eq!(judgment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_tag_is_an_orchestrator_failure() {
	let orchestrator = orchestrator(
		StubIndex::returning(scenario_a_history()),
		StubJudgment::replying(judgment_reply("increase", 100, 0)),
	);
	let args = PipelineInputArgs { tag_name: None, ..input_args("client-d") };
	let err = orchestrator.run(args).await.expect_err("Missing tag must fail.");

	assert!(matches!(err, Error::Orchestrator { .. }));
	assert!(err.to_string().contains("tag_name"));
}
