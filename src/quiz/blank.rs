use rand::seq::SliceRandom;
use rand::Rng;

pub const BLANK: &str = "[___]";

// Chinese punctuation that separates tokens in verse text.
const TOKEN_SEPARATORS: [char; 9] = ['，', '。', '！', '？', '：', '「', '」', '；', '、'];

// Pronouns and particles too common to make a useful blank.
const STOPWORDS: [&str; 41] = [
    "的", "了", "是", "在", "我", "你", "他", "她", "它", "這", "那", "與", "和", "都", "就",
    "又", "從", "到", "為", "因", "以", "所", "將", "必", "要", "向", "說", "看", "聽", "行",
    "來", "去", "上", "下", "中", "裡", "外", "已", "未", "更", "最",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillInBlank {
    pub quiz_text: String,
    pub answer: String,
}

/// Blanks one meaningful token of `text`.
///
/// Tokens are the runs between whitespace and Chinese punctuation; single
/// characters and stopwords are never chosen. When nothing qualifies the
/// longest word-character run is used instead. Only the first occurrence of
/// the answer is replaced. Returns `None` when no blank could be inserted.
pub fn create_fill_in_blank<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<FillInBlank> {
    let meaningful: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || TOKEN_SEPARATORS.contains(&c))
        .filter(|token| token.chars().count() > 1 && !STOPWORDS.contains(token))
        .collect();

    let answer = match meaningful.choose(rng) {
        Some(token) => *token,
        None => longest_word(text)?,
    };

    let quiz_text = text.replacen(answer, BLANK, 1);
    if quiz_text == text {
        return None;
    }

    Some(FillInBlank {
        quiz_text,
        answer: answer.to_string(),
    })
}

fn longest_word(text: &str) -> Option<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .fold(None, |longest: Option<&str>, word| match longest {
            Some(current) if current.chars().count() >= word.chars().count() => Some(current),
            _ => Some(word),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn reinsert(blank: &FillInBlank) -> String {
        blank.quiz_text.replacen(BLANK, &blank.answer, 1)
    }

    #[test]
    fn picks_a_clause_between_punctuation() {
        let text = "起初，神創造天地。";
        let blank = create_fill_in_blank(text, &mut rng()).unwrap();
        assert!(["起初", "神創造天地"].contains(&blank.answer.as_str()));
        assert_ne!(blank.quiz_text, text);
        assert_eq!(reinsert(&blank), text);
    }

    #[test]
    fn blanks_only_the_first_occurrence() {
        let text = "聖哉 聖哉 聖哉";
        let blank = create_fill_in_blank(text, &mut rng()).unwrap();
        assert_eq!(blank.answer, "聖哉");
        assert_eq!(blank.quiz_text, "[___] 聖哉 聖哉");
    }

    #[test]
    fn stopwords_are_distinct_single_characters() {
        let mut seen: Vec<&str> = STOPWORDS.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 41);
        assert!(STOPWORDS.iter().all(|w| w.chars().count() == 1));
        assert!(!STOPWORDS.contains(&"們"));
        assert!(!STOPWORDS.contains(&"之"));
    }

    #[test]
    fn never_chooses_stopwords_or_single_characters() {
        let text = "我 的 神 愛世人";
        let mut rng = rng();
        for _ in 0..50 {
            let blank = create_fill_in_blank(text, &mut rng).unwrap();
            assert_eq!(blank.answer, "愛世人");
        }
    }

    #[test]
    fn falls_back_to_longest_word() {
        let blank = create_fill_in_blank("神，愛。", &mut rng()).unwrap();
        assert_eq!(blank.answer, "神");
        assert_eq!(blank.quiz_text, "[___]，愛。");
    }

    #[test]
    fn punctuation_only_text_is_unusable() {
        assert_eq!(create_fill_in_blank("，。！", &mut rng()), None);
        assert_eq!(create_fill_in_blank("", &mut rng()), None);
    }

    #[test]
    fn latin_text_round_trips() {
        let text = "In the beginning God created the heaven and the earth.";
        let mut rng = rng();
        for _ in 0..20 {
            let blank = create_fill_in_blank(text, &mut rng).unwrap();
            assert_ne!(blank.quiz_text, text);
            assert_eq!(reinsert(&blank), text);
        }
    }
}
