use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::blank::create_fill_in_blank;
use super::{Question, Quiz, QUESTIONS_PER_QUIZ};
use crate::bible::plan::{PlanStore, PlanVariant};
use crate::bible::{verses_for_reading, Verse, VerseStore};
use crate::error::QuizError;

const MAX_SAMPLING_ATTEMPTS: usize = 100;

/// Builds today's quiz for a user on `variant` at `day`.
pub fn generate_quiz<R: Rng + ?Sized>(
    plans: &impl PlanStore,
    bible: &impl VerseStore,
    variant: PlanVariant,
    day: u32,
    rng: &mut R,
) -> Result<Quiz, QuizError> {
    debug!("Generating quiz for plan {variant} day {day}");

    let readings = plans
        .reading_for(variant, day)
        .filter(|readings| !readings.trim().is_empty())
        .ok_or(QuizError::NoPlanFound)?;

    let verses = verses_for_reading(bible, &readings);
    debug!("Total verses fetched for {readings}: {}", verses.len());

    quiz_from_verses(readings, &verses, rng)
}

/// Samples up to three distinct verses that can be blanked. When fewer than
/// three turn up, the first question is repeated to fill the quiz.
pub fn quiz_from_verses<R: Rng + ?Sized>(
    readings: String,
    verses: &[Verse],
    rng: &mut R,
) -> Result<Quiz, QuizError> {
    if verses.is_empty() {
        return Err(QuizError::NoVersesFound);
    }

    let mut questions: Vec<Question> = Vec::with_capacity(QUESTIONS_PER_QUIZ);
    let mut attempts = 0;
    while questions.len() < QUESTIONS_PER_QUIZ && attempts < MAX_SAMPLING_ATTEMPTS {
        attempts += 1;

        let Some(verse) = verses.choose(rng) else {
            break;
        };
        let reference = verse.reference();
        if questions.iter().any(|q| q.reference == reference) {
            continue;
        }
        if let Some(blank) = create_fill_in_blank(&verse.text, rng) {
            questions.push(Question::new(
                reference,
                blank.quiz_text,
                verse.text.clone(),
                blank.answer,
            ));
        }
    }

    let first = questions.first().cloned().ok_or(QuizError::NoValidQuestion)?;
    if questions.len() < QUESTIONS_PER_QUIZ {
        debug!(
            "Only {} usable verses after {attempts} attempts, repeating the first",
            questions.len()
        );
        questions.resize(QUESTIONS_PER_QUIZ, first);
    }

    Ok(Quiz::new(readings, questions))
}
