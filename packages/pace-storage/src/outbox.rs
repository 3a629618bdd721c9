use std::fmt;

use sqlx::{Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, Result, db::Db, models::TaskIndexingOutboxEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxOp {
	Upsert,
	Delete,
}
impl OutboxOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Upsert => "UPSERT",
			Self::Delete => "DELETE",
		}
	}

	pub fn parse(raw: &str) -> Result<Self> {
		match raw {
			"UPSERT" => Ok(Self::Upsert),
			"DELETE" => Ok(Self::Delete),
			other => Err(Error::InvalidArgument(format!("Unsupported outbox op: {other}."))),
		}
	}
}
impl fmt::Display for OutboxOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

pub async fn enqueue_tx(
	tx: &mut Transaction<'_, Postgres>,
	task_client_id: &str,
	op: OutboxOp,
) -> Result<Uuid> {
	let outbox_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO task_indexing_outbox (outbox_id, task_client_id, op, status)
VALUES ($1, $2, $3, 'PENDING')",
	)
	.bind(outbox_id)
	.bind(task_client_id)
	.bind(op.as_str())
	.execute(&mut **tx)
	.await?;

	Ok(outbox_id)
}

/// Claims the oldest due job and pushes its `available_at` out by `lease` so other workers skip it.
pub async fn fetch_next_job(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<TaskIndexingOutboxEntry>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, TaskIndexingOutboxEntry>(
		"\
SELECT
	outbox_id,
	task_client_id,
	op,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at
FROM task_indexing_outbox
WHERE status IN ('PENDING','FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;

		sqlx::query(
			"UPDATE task_indexing_outbox SET available_at = $1, updated_at = $2 WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, outbox_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"UPDATE task_indexing_outbox SET status = 'DONE', updated_at = $1 WHERE outbox_id = $2",
	)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn mark_failed(
	db: &Db,
	outbox_id: Uuid,
	attempts: i32,
	last_error: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE task_indexing_outbox
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE outbox_id = $5",
	)
	.bind(attempts)
	.bind(last_error)
	.bind(available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}
