//! In-process work queue for estimation runs.
//!
//! Producers never wait: jobs go onto an unbounded channel and a single dispatcher hands them to
//! spawned tasks, at most `max_concurrent_runs` at a time.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::{Delivery, Error, EstimationJob, Result};

#[derive(Clone)]
pub struct EstimationQueue {
	tx: mpsc::UnboundedSender<EstimationJob>,
	delivery: Arc<Delivery>,
}
impl EstimationQueue {
	/// Spawns the dispatcher. Must be called from within a Tokio runtime.
	pub fn start(delivery: Arc<Delivery>, max_concurrent_runs: u32) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let permits = (max_concurrent_runs as usize).max(1);

		tokio::spawn(dispatch(rx, delivery.clone(), Arc::new(Semaphore::new(permits))));

		Self { tx, delivery }
	}

	/// Emits `started` on the job's channel, then queues the run.
	pub fn submit(&self, job: EstimationJob) -> Result<()> {
		self.delivery.announce(&job);

		let task_client_id = job.task_client_id.clone();

		self.tx.send(job).map_err(|_| Error::QueueClosed)?;

		tracing::debug!(task_client_id = %task_client_id, "Estimation job queued.");

		Ok(())
	}
}

async fn dispatch(
	mut rx: mpsc::UnboundedReceiver<EstimationJob>,
	delivery: Arc<Delivery>,
	permits: Arc<Semaphore>,
) {
	while let Some(job) = rx.recv().await {
		let Ok(permit) = permits.clone().acquire_owned().await else {
			tracing::error!("Estimation semaphore closed. Stopping dispatcher.");

			return;
		};
		let delivery = delivery.clone();

		tokio::spawn(async move {
			let channel = job.channel.clone();
			let task_client_id = job.task_client_id.clone();
			let run = tokio::spawn({
				let delivery = delivery.clone();

				async move { delivery.run(job).await }
			});

			if let Err(err) = run.await {
				tracing::error!(
					error = %err,
					task_client_id = %task_client_id,
					channel = %channel,
					"Estimation run panicked."
				);

				delivery
					.fail(&channel, &task_client_id, "Estimation run aborted unexpectedly.")
					.await;
			}

			drop(permit);
		});
	}

	tracing::debug!("Estimation queue closed.");
}
