pub mod blank;
pub mod evaluator;
pub mod generator;

use crate::error::QuizError;
use crate::scoring::QuizResult;

pub const QUESTIONS_PER_QUIZ: usize = 3;
pub const MAX_ATTEMPTS: u8 = 2;

/// A three-question fill-in-the-blank quiz over one day's reading. Lives on
/// the user record while the quiz is running.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Quiz {
    pub readings: String,
    pub current_question_index: usize,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(readings: String, questions: Vec<Question>) -> Self {
        Self {
            readings,
            current_question_index: 0,
            questions,
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn is_completed(&self) -> bool {
        self.current_question_index >= self.questions.len()
    }

    /// Prompt for the question at `index`, numbered from 1.
    pub fn prompt(&self, index: usize) -> Option<String> {
        let question = self.questions.get(index)?;
        Some(format!(
            "第 {} 題 (共 {} 題) - 經文：{}\n\n{}\n\n請輸入您認為正確的答案 (詞彙)。",
            index + 1,
            self.questions.len(),
            question.reference,
            question.quiz_text
        ))
    }

    pub fn result(&self) -> QuizResult {
        if self.questions.iter().all(|q| q.answered_correctly) {
            QuizResult::Perfect
        } else {
            QuizResult::Partial
        }
    }

    /// Checks a quiz read back from storage before answering against it.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.len() != QUESTIONS_PER_QUIZ {
            return Err(QuizError::InvalidSessionState(format!(
                "expected {QUESTIONS_PER_QUIZ} questions, found {}",
                self.questions.len()
            )));
        }
        if self.is_completed() {
            return Err(QuizError::InvalidSessionState(format!(
                "question index {} is past the last question",
                self.current_question_index
            )));
        }
        match self.current() {
            Some(q) if q.attempts >= MAX_ATTEMPTS => Err(QuizError::InvalidSessionState(format!(
                "question {} already used {} attempts",
                q.reference, q.attempts
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "ref")]
    pub reference: String,
    pub quiz_text: String,
    pub full_verse: String,
    pub answer: String,
    pub attempts: u8,
    #[serde(default)]
    pub answered_correctly: bool,
}

impl Question {
    pub fn new(reference: String, quiz_text: String, full_verse: String, answer: String) -> Self {
        Self {
            reference,
            quiz_text,
            full_verse,
            answer,
            attempts: 0,
            answered_correctly: false,
        }
    }
}

/// A quiz as kept on the user record. Records that no longer decode into a
/// [`Quiz`] are kept verbatim, so one bad session never stops the rest of
/// the store from loading.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum StoredQuiz {
    Running(Quiz),
    Unreadable(serde_json::Value),
}

impl StoredQuiz {
    pub fn quiz(&self) -> Result<&Quiz, QuizError> {
        match self {
            StoredQuiz::Running(quiz) => Ok(quiz),
            StoredQuiz::Unreadable(_) => Err(unreadable()),
        }
    }

    pub fn into_quiz(self) -> Result<Quiz, QuizError> {
        match self {
            StoredQuiz::Running(quiz) => Ok(quiz),
            StoredQuiz::Unreadable(_) => Err(unreadable()),
        }
    }
}

fn unreadable() -> QuizError {
    QuizError::InvalidSessionState("stored quiz could not be decoded".to_string())
}
