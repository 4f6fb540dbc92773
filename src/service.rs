//! Async front of the interpreter.
//!
//! Interpretation is CPU-bound and synchronous, so each request runs on the
//! blocking pool under a deadline. When the deadline passes the caller gets
//! [`ServiceError::DeadlineExceeded`] and the result is discarded.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::interpret::{CompiledQuery, Interpreter};
use crate::semantic::InterpretError;
use crate::sql::NO_QUERY;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Interpretation exceeded the deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Interpretation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct InterpretService {
    interpreter: Arc<Interpreter>,
    timeout: Duration,
}

impl InterpretService {
    pub fn new(interpreter: Arc<Interpreter>, timeout: Duration) -> Self {
        Self {
            interpreter,
            timeout,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn interpret(&self, sentence: impl Into<String>) -> ServiceResult<Option<CompiledQuery>> {
        let sentence = sentence.into();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("interpret", %request_id);

        async {
            let interpreter = Arc::clone(&self.interpreter);
            let worker_span = tracing::Span::current();
            let task = tokio::task::spawn_blocking(move || {
                let _entered = worker_span.enter();
                interpreter.interpret(&sentence)
            });

            match tokio::time::timeout(self.timeout, task).await {
                Ok(joined) => Ok(joined??),
                Err(_) => {
                    tracing::warn!(timeout = ?self.timeout, "deadline exceeded");
                    Err(ServiceError::DeadlineExceeded(self.timeout))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// SQL for the sentence, or the no-query sentinel.
    pub async fn to_sql(&self, sentence: impl Into<String>) -> ServiceResult<String> {
        Ok(self
            .interpret(sentence)
            .await?
            .map(|c| c.sql())
            .unwrap_or_else(|| NO_QUERY.to_string()))
    }
}
