use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::metrics::QUIZ_SESSIONS_TOTAL;
use crate::models::activity::{ActivityEntry, ActivityStatus};
use crate::models::quiz::{QuizError, QuizSession, QuizState, QuizView};
use crate::models::{Subject, TestRecord};
use crate::services::activity_log::{record_event_quietly, ActivityLog};
use crate::services::gateway::DataGateway;
use crate::services::question_service::QuestionService;
use crate::services::session_store::{SessionLocks, SessionStore};
use crate::services::AppState;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

#[derive(Debug, Error)]
pub enum QuizServiceError {
    #[error("Quiz session not found")]
    NotFound,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

type QuizResultOf<T> = Result<T, QuizServiceError>;

/// Drives quiz sessions across requests. Each call loads the session,
/// applies elapsed time, performs one transition and stores it back, all
/// under that session's lock.
pub struct QuizService {
    sessions: Arc<dyn SessionStore>,
    locks: Arc<SessionLocks>,
    gateway: Arc<dyn DataGateway>,
    activity: Arc<dyn ActivityLog>,
    questions: QuestionService,
    duration_secs: u32,
}

impl QuizService {
    pub fn new(state: &AppState) -> Self {
        Self {
            sessions: state.sessions.clone(),
            locks: state.session_locks.clone(),
            gateway: state.gateway.clone(),
            activity: state.activity.clone(),
            questions: QuestionService::new(
                state.gateway.clone(),
                state.activity.clone(),
                state.http.clone(),
                &state.config,
            ),
            duration_secs: state.config.quiz_duration_secs,
        }
    }

    pub async fn start(&self, user_id: &str, actor: &str, subject: Subject) -> QuizResultOf<QuizView> {
        let mut session = QuizSession::new(user_id, self.duration_secs);
        session.open()?;
        session.select_subject(subject)?;

        let set = self.questions.resolve(subject, actor).await;
        session.begin(set, Utc::now())?;
        self.sessions.save(&session).await?;

        QUIZ_SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        tracing::info!(
            session_id = %session.id,
            user_id,
            %subject,
            source = ?session.source,
            "Quiz started"
        );

        Ok(session.view())
    }

    /// Current state with elapsed time applied; completes the quiz if the
    /// clock ran out.
    pub async fn refresh(&self, session_id: &str, user_id: &str) -> QuizResultOf<QuizSession> {
        self.transition(session_id, user_id, |_| Ok(())).await
    }

    pub async fn get(&self, session_id: &str, user_id: &str) -> QuizResultOf<QuizView> {
        Ok(self.refresh(session_id, user_id).await?.view())
    }

    pub async fn select(&self, session_id: &str, user_id: &str, option: u8) -> QuizResultOf<QuizView> {
        let session = self
            .transition(session_id, user_id, |s| s.select(option))
            .await?;
        Ok(session.view())
    }

    pub async fn confirm(&self, session_id: &str, user_id: &str) -> QuizResultOf<QuizView> {
        let session = self
            .transition(session_id, user_id, QuizSession::confirm)
            .await?;
        Ok(session.view())
    }

    /// Discards the session without recording anything.
    pub async fn abandon(&self, session_id: &str, user_id: &str) -> QuizResultOf<()> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let session = self.load_owned(session_id, user_id).await?;
        self.sessions.remove(session_id).await?;

        if session.state != QuizState::Completed {
            QUIZ_SESSIONS_TOTAL.with_label_values(&["abandoned"]).inc();
            tracing::info!(session_id, user_id, "Quiz abandoned");
        }
        Ok(())
    }

    async fn load_owned(&self, session_id: &str, user_id: &str) -> QuizResultOf<QuizSession> {
        match self.sessions.load(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            // Someone else's session looks the same as a missing one.
            _ => Err(QuizServiceError::NotFound),
        }
    }

    async fn transition<F>(&self, session_id: &str, user_id: &str, action: F) -> QuizResultOf<QuizSession>
    where
        F: FnOnce(&mut QuizSession) -> Result<(), QuizError>,
    {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let mut session = self.load_owned(session_id, user_id).await?;
        let before = session.clone();

        session.advance_clock(Utc::now());
        // Time ran out since the last request: submit what was confirmed and
        // skip the requested action.
        if session.state != QuizState::Submitting {
            action(&mut session)?;
        }
        if session.state == QuizState::Submitting {
            self.finalize(&mut session).await?;
        }

        if session != before {
            self.sessions.save(&session).await?;
        }
        Ok(session)
    }

    async fn finalize(&self, session: &mut QuizSession) -> QuizResultOf<()> {
        let expired = session.time_remaining == 0;
        let result = session.finish()?;

        let record = TestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: session.user_id.clone(),
            subject: result.subject,
            score: result.score,
            total: result.total,
            percentage: result.percentage,
            created_at: Utc::now(),
        };

        let persisted = retry_async_with_config(RetryConfig::persistence(), || {
            self.gateway.insert_test(&record)
        })
        .await;

        match persisted {
            Ok(()) => {
                record_event_quietly(
                    self.activity.as_ref(),
                    ActivityEntry::new(
                        "TEST_COMPLETED",
                        format!(
                            "{} assessment scored {}% ({}/{})",
                            result.subject, result.percentage, result.score, result.total
                        ),
                        ActivityStatus::Success,
                        session.user_id.as_str(),
                    ),
                )
                .await;
            }
            Err(e) => {
                // The user still gets the result; only the history misses it.
                tracing::error!(
                    session_id = %session.id,
                    user_id = %session.user_id,
                    "Failed to persist test record: {}",
                    e
                );
                record_event_quietly(
                    self.activity.as_ref(),
                    ActivityEntry::new(
                        "TEST_PERSIST_FAILED",
                        format!("Could not record {} assessment: {}", result.subject, e),
                        ActivityStatus::Error,
                        session.user_id.as_str(),
                    ),
                )
                .await;
            }
        }

        let outcome = if expired { "expired" } else { "completed" };
        QUIZ_SESSIONS_TOTAL.with_label_values(&[outcome]).inc();
        tracing::info!(
            session_id = %session.id,
            percentage = result.percentage,
            passed = result.passed,
            outcome,
            "Quiz finished"
        );
        Ok(())
    }
}
