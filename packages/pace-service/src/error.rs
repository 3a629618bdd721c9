pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	/// Terminal failure of a pipeline run. Stage-local degradations never surface as this.
	#[error("Orchestrator failure: {message}")]
	Orchestrator { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Notification error: {message}")]
	Notification { message: String },
	#[error("Estimation queue is closed.")]
	QueueClosed,
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<pace_storage::Error> for Error {
	fn from(err: pace_storage::Error) -> Self {
		match err {
			pace_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			pace_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			pace_storage::Error::NotFound(message) => Self::NotFound { message },
			pace_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<pace_providers::Error> for Error {
	fn from(err: pace_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
