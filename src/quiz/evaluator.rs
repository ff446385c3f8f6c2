use rand::seq::SliceRandom;
use rand::Rng;

use super::{Quiz, MAX_ATTEMPTS};
use crate::error::QuizError;

const IGNORED_IN_ANSWERS: [char; 23] = [
    '，', '。', '！', '？', '：', '「', '」', '；', '、', ',', '.', '!', '?', ':', ';', '"', '\'',
    '(', ')', '[', ']', '{', '}',
];

const AFFIRMATIONS: [&str; 4] = [
    "太棒了！您完全答對了！🎉 您的記憶力真是驚人！",
    "哇！完全正確！💯 真是個愛慕真理、勤奮讀經的好榜樣！",
    "阿們！答案完全正確！🙏 願神的話語常在您心裡！",
    "恭喜您！這題難不倒您！🌟 繼續保持這份對聖經的熱情！",
];

const ALL_CORRECT: &str = "所有題目都答對了！您真是太棒了！";
const QUIZ_FINISHED: &str =
    "今天的測驗結束了！無論結果如何，您願意花時間讀經和學習，就是最棒的！願神祝福您！";

/// Strips whitespace and punctuation and lower-cases, so 「神創造天地。」 and
/// `神創造天地` compare equal.
pub fn normalize_answer(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !IGNORED_IN_ANSWERS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    /// First miss: the question stays open.
    Retry,
    /// Second miss: the answer is shown and the quiz moves on.
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: AnswerOutcome,
    pub completed: bool,
    pub messages: Vec<String>,
}

/// Scores one answer against the current question, advancing the quiz in
/// place. The caller persists the mutated quiz.
pub fn evaluate_answer<R: Rng + ?Sized>(
    quiz: &mut Quiz,
    answer: &str,
    rng: &mut R,
) -> Result<Evaluation, QuizError> {
    quiz.validate()?;

    let index = quiz.current_question_index;
    let question = &mut quiz.questions[index];
    let is_correct = normalize_answer(answer) == normalize_answer(&question.answer);

    let mut messages = Vec::new();
    let outcome = if is_correct {
        question.answered_correctly = true;
        if let Some(affirmation) = AFFIRMATIONS.choose(rng) {
            messages.push(affirmation.to_string());
        }
        AnswerOutcome::Correct
    } else {
        question.attempts += 1;
        if question.attempts < MAX_ATTEMPTS {
            messages.push(format!(
                "再想想看喔！😊\n\n這節經文是：{}\n\n請問：{}\n\n請再次輸入您的答案。",
                question.full_verse, question.quiz_text
            ));
            return Ok(Evaluation {
                outcome: AnswerOutcome::Retry,
                completed: false,
                messages,
            });
        }
        messages.push(format!(
            "沒關係，再接再勵！💪\n\n正確答案是：**{}**\n\n完整的經文是：{}\n\n",
            question.answer, question.full_verse
        ));
        AnswerOutcome::Revealed
    };

    quiz.current_question_index += 1;
    let completed = quiz.is_completed();
    if completed {
        let closing = if quiz.questions.iter().all(|q| q.answered_correctly) {
            ALL_CORRECT
        } else {
            QUIZ_FINISHED
        };
        messages.push(closing.to_string());
    } else if let Some(prompt) = quiz.prompt(quiz.current_question_index) {
        match outcome {
            AnswerOutcome::Revealed => messages.push(format!("讓我們繼續下一題吧！\n\n{prompt}")),
            _ => messages.push(prompt),
        }
    }

    Ok(Evaluation {
        outcome,
        completed,
        messages,
    })
}
