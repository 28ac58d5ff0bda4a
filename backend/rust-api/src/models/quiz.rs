use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::Subject;

pub const PASS_PERCENTAGE: u8 = 60;
pub const QUESTIONS_PER_QUIZ: usize = 5;
pub const OPTIONS_PER_QUESTION: usize = 4;
pub const DEFAULT_DURATION_SECS: u32 = 300;

/// A multiple-choice question. `answer` is the index of the correct option
/// and never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub answer: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Generated,
    StaticFallback,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Generated => "generated",
            QuestionSource::StaticFallback => "static_fallback",
        }
    }
}

/// Resolved questions for one quiz, plus the banner to show when the
/// fallback bank was used.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
    pub source: QuestionSource,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
    Idle,
    Selecting,
    Loading,
    InProgress,
    Submitting,
    Completed,
}

impl fmt::Display for QuizState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuizState::Idle => "idle",
            QuizState::Selecting => "selecting",
            QuizState::Loading => "loading",
            QuizState::InProgress => "in_progress",
            QuizState::Submitting => "submitting",
            QuizState::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("Cannot {action} while quiz is {state}")]
    InvalidTransition {
        action: &'static str,
        state: QuizState,
    },
    #[error("No option selected")]
    NoSelection,
    #[error("Option {0} is out of range")]
    OptionOutOfRange(u8),
    #[error("Question set is empty")]
    EmptyQuestionSet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizResult {
    pub subject: Subject,
    pub score: u32,
    pub total: u32,
    pub incorrect: u32,
    pub percentage: u8,
    pub passed: bool,
}

impl QuizResult {
    pub fn new(subject: Subject, score: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (f64::from(score) / f64::from(total) * 100.0).round() as u8
        };
        Self {
            subject,
            score,
            total,
            incorrect: total.saturating_sub(score),
            percentage,
            passed: percentage >= PASS_PERCENTAGE,
        }
    }
}

/// One timed assessment. All transitions go through the methods below;
/// callers serialize access per session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub state: QuizState,
    pub subject: Option<Subject>,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub selected: Option<u8>,
    pub score: u32,
    pub duration_secs: u32,
    pub time_remaining: u32,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub source: Option<QuestionSource>,
    pub notice: Option<String>,
    pub result: Option<QuizResult>,
    pub created_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(user_id: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            state: QuizState::Idle,
            subject: None,
            questions: Vec::new(),
            current_index: 0,
            selected: None,
            score: 0,
            duration_secs,
            time_remaining: duration_secs,
            last_tick_at: None,
            source: None,
            notice: None,
            result: None,
            created_at: Utc::now(),
        }
    }

    fn expect_state(&self, expected: QuizState, action: &'static str) -> Result<(), QuizError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(QuizError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    pub fn open(&mut self) -> Result<(), QuizError> {
        match self.state {
            QuizState::Idle | QuizState::Completed => {
                self.state = QuizState::Selecting;
                Ok(())
            }
            state => Err(QuizError::InvalidTransition {
                action: "open subject selection",
                state,
            }),
        }
    }

    pub fn select_subject(&mut self, subject: Subject) -> Result<(), QuizError> {
        self.expect_state(QuizState::Selecting, "select a subject")?;
        self.subject = Some(subject);
        self.score = 0;
        self.current_index = 0;
        self.selected = None;
        self.time_remaining = self.duration_secs;
        self.questions.clear();
        self.result = None;
        self.state = QuizState::Loading;
        Ok(())
    }

    /// Installs the resolved questions and starts the clock at `now`.
    pub fn begin(&mut self, set: QuestionSet, now: DateTime<Utc>) -> Result<(), QuizError> {
        self.expect_state(QuizState::Loading, "begin")?;
        if set.questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }
        self.questions = set.questions;
        self.source = Some(set.source);
        self.notice = set.notice;
        self.last_tick_at = Some(now);
        self.state = QuizState::InProgress;
        Ok(())
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            QuizState::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn select(&mut self, option: u8) -> Result<(), QuizError> {
        self.expect_state(QuizState::InProgress, "select an option")?;
        let options = self
            .current_question()
            .map(|q| q.options.len())
            .unwrap_or_default();
        if usize::from(option) >= options {
            return Err(QuizError::OptionOutOfRange(option));
        }
        self.selected = Some(option);
        Ok(())
    }

    /// Scores the pending selection and moves to the next question, or to
    /// `Submitting` after the last one.
    pub fn confirm(&mut self) -> Result<(), QuizError> {
        self.expect_state(QuizState::InProgress, "confirm an answer")?;
        let selected = self.selected.ok_or(QuizError::NoSelection)?;
        if let Some(question) = self.questions.get(self.current_index) {
            if question.answer == selected {
                self.score += 1;
            }
        }
        self.selected = None;
        self.current_index += 1;
        if self.current_index >= self.questions.len() {
            self.state = QuizState::Submitting;
        }
        Ok(())
    }

    /// One second of countdown. Reaching zero submits; a selection that was
    /// never confirmed does not count.
    pub fn tick(&mut self) {
        if self.state != QuizState::InProgress {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.selected = None;
            self.state = QuizState::Submitting;
        }
    }

    /// Applies every whole second elapsed since the last tick.
    pub fn advance_clock(&mut self, now: DateTime<Utc>) -> u32 {
        let Some(last) = self.last_tick_at else {
            return 0;
        };
        if self.state != QuizState::InProgress {
            return 0;
        }
        let elapsed = (now - last).num_seconds();
        if elapsed <= 0 {
            return 0;
        }
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let applied = elapsed.min(self.time_remaining);
        for _ in 0..applied {
            self.tick();
        }
        self.last_tick_at = Some(last + chrono::Duration::seconds(i64::from(elapsed)));
        applied
    }

    pub fn finish(&mut self) -> Result<QuizResult, QuizError> {
        self.expect_state(QuizState::Submitting, "finish")?;
        let subject = self.subject.unwrap_or(Subject::Aptitude);
        let result = QuizResult::new(subject, self.score, self.questions.len() as u32);
        self.result = Some(result.clone());
        self.state = QuizState::Completed;
        Ok(result)
    }

    pub fn view(&self) -> QuizView {
        QuizView {
            id: self.id.clone(),
            state: self.state,
            subject: self.subject,
            current_index: self.current_index,
            total_questions: self.questions.len(),
            question: self.current_question().map(|q| QuestionView {
                text: q.text.clone(),
                options: q.options.clone(),
            }),
            selected: self.selected,
            score: self.score,
            time_remaining: self.time_remaining,
            source: self.source,
            notice: self.notice.clone(),
            result: self.result.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
}

/// Client-facing projection of a session with the answers stripped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuizView {
    pub id: String,
    pub state: QuizState,
    pub subject: Option<Subject>,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: Option<QuestionView>,
    pub selected: Option<u8>,
    pub score: u32,
    pub time_remaining: u32,
    pub source: Option<QuestionSource>,
    pub notice: Option<String>,
    pub result: Option<QuizResult>,
}

#[derive(Debug, Deserialize)]
pub struct StartQuizRequest {
    pub subject: Subject,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn questions() -> Vec<Question> {
        (0..QUESTIONS_PER_QUIZ)
            .map(|i| Question {
                text: format!("Question {}", i + 1),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                answer: 1,
            })
            .collect()
    }

    fn started(now: DateTime<Utc>) -> QuizSession {
        let mut session = QuizSession::new("u1", DEFAULT_DURATION_SECS);
        session.open().unwrap();
        session.select_subject(Subject::Dsa).unwrap();
        session
            .begin(
                QuestionSet {
                    questions: questions(),
                    source: QuestionSource::Generated,
                    notice: None,
                },
                now,
            )
            .unwrap();
        session
    }

    fn answer(session: &mut QuizSession, option: u8) {
        session.select(option).unwrap();
        session.confirm().unwrap();
    }

    #[test]
    fn three_of_five_correct_scores_sixty_and_passes() {
        let mut session = started(Utc::now());
        for option in [1, 1, 1, 0, 2] {
            answer(&mut session, option);
        }
        assert_eq!(session.state, QuizState::Submitting);

        let result = session.finish().unwrap();
        assert_eq!(result.score, 3);
        assert_eq!(result.incorrect, 2);
        assert_eq!(result.percentage, 60);
        assert!(result.passed);
        assert_eq!(session.state, QuizState::Completed);
    }

    #[test]
    fn two_of_five_fails() {
        let mut session = started(Utc::now());
        for option in [1, 1, 0, 0, 0] {
            answer(&mut session, option);
        }
        let result = session.finish().unwrap();
        assert_eq!(result.percentage, 40);
        assert!(!result.passed);
    }

    #[test]
    fn countdown_reaching_zero_auto_submits_with_answered_only() {
        let mut session = started(Utc::now());
        answer(&mut session, 1);
        answer(&mut session, 1);
        session.select(1).unwrap();

        for _ in 0..DEFAULT_DURATION_SECS {
            session.tick();
        }

        assert_eq!(session.state, QuizState::Submitting);
        assert_eq!(session.time_remaining, 0);
        let result = session.finish().unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.total, 5);
        assert_eq!(result.percentage, 40);
    }

    #[test]
    fn advance_clock_applies_whole_elapsed_seconds() {
        let start = Utc::now();
        let mut session = started(start);

        assert_eq!(session.advance_clock(start + Duration::milliseconds(2500)), 2);
        assert_eq!(session.time_remaining, DEFAULT_DURATION_SECS - 2);

        let applied = session.advance_clock(start + Duration::seconds(1000));
        assert_eq!(applied, DEFAULT_DURATION_SECS - 2);
        assert_eq!(session.state, QuizState::Submitting);
    }

    #[test]
    fn selecting_subject_resets_progress() {
        let mut session = started(Utc::now());
        answer(&mut session, 1);
        session.tick();
        for option in [1, 1, 1, 1] {
            answer(&mut session, option);
        }
        session.finish().unwrap();

        session.open().unwrap();
        session.select_subject(Subject::Aptitude).unwrap();
        assert_eq!(session.score, 0);
        assert_eq!(session.current_index, 0);
        assert_eq!(session.time_remaining, DEFAULT_DURATION_SECS);
        assert_eq!(session.state, QuizState::Loading);
        assert!(session.result.is_none());
    }

    #[test]
    fn confirm_without_selection_is_rejected() {
        let mut session = started(Utc::now());
        assert_eq!(session.confirm(), Err(QuizError::NoSelection));
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut session = started(Utc::now());
        assert_eq!(session.select(4), Err(QuizError::OptionOutOfRange(4)));
    }

    #[test]
    fn transitions_outside_their_state_fail() {
        let mut session = QuizSession::new("u1", DEFAULT_DURATION_SECS);
        assert!(matches!(
            session.select_subject(Subject::Dsa),
            Err(QuizError::InvalidTransition { .. })
        ));
        assert!(session.finish().is_err());
        session.tick();
        assert_eq!(session.time_remaining, DEFAULT_DURATION_SECS);
    }

    #[test]
    fn view_hides_answers_and_carries_fallback_notice() {
        let mut session = QuizSession::new("u1", DEFAULT_DURATION_SECS);
        session.open().unwrap();
        session.select_subject(Subject::Cybersecurity).unwrap();
        session
            .begin(
                QuestionSet {
                    questions: questions(),
                    source: QuestionSource::StaticFallback,
                    notice: Some("Offline".to_string()),
                },
                Utc::now(),
            )
            .unwrap();

        let view = session.view();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["question"].get("answer").is_none());
        assert_eq!(json["source"], "static_fallback");
        assert_eq!(view.notice.as_deref(), Some("Offline"));
        assert_eq!(view.total_questions, QUESTIONS_PER_QUIZ);
    }
}
