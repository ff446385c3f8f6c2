pub mod books;
pub mod plan;
pub mod reference;

use std::collections::BTreeMap;
use std::io::Read;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::StoreError;
use reference::ReadingSpan;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Verse {
    pub book_abbr: String,
    /// Full book name; filled in from the abbreviation when the corpus omits it.
    #[serde(default)]
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

impl Verse {
    /// `創1:1` style label, also the verse identity.
    pub fn reference(&self) -> String {
        format!("{}{}:{}", self.book_abbr, self.chapter, self.verse)
    }
}

/// Read-only lookups over the verse corpus. Results are ordered by chapter,
/// then verse.
pub trait VerseStore {
    fn verse(&self, book: &str, chapter: u32, verse: u32) -> Option<Verse>;

    fn verses_in_chapter(&self, book: &str, chapter: u32) -> Vec<Verse>;

    /// Verse bounds only trim the first and last chapter of the range.
    fn verses_in_range(
        &self,
        book: &str,
        start_chapter: u32,
        end_chapter: u32,
        start_verse: Option<u32>,
        end_verse: Option<u32>,
    ) -> Vec<Verse>;
}

/// The whole corpus held in memory, keyed by (book, chapter).
#[derive(Debug, Default)]
pub struct Bible {
    chapters: BTreeMap<(String, u32), Vec<Verse>>,
}

impl Bible {
    pub fn new(verses: Vec<Verse>) -> Self {
        let mut chapters: BTreeMap<(String, u32), Vec<Verse>> = BTreeMap::new();
        for mut verse in verses {
            if verse.book.is_empty() {
                if let Some(name) = books::full_name(&verse.book_abbr) {
                    verse.book = name.to_string();
                }
            }
            chapters
                .entry((verse.book_abbr.clone(), verse.chapter))
                .or_default()
                .push(verse);
        }
        for verses in chapters.values_mut() {
            verses.sort_by_key(|v| v.verse);
            verses.dedup_by_key(|v| v.verse);
        }
        Self { chapters }
    }

    /// Loads a JSON array of verse records.
    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        let verses: Vec<Verse> = serde_json::from_reader(reader)?;
        Ok(Self::new(verses))
    }

    pub fn verse_count(&self) -> usize {
        self.chapters.values().map(Vec::len).sum()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }
}

impl VerseStore for Bible {
    fn verse(&self, book: &str, chapter: u32, verse: u32) -> Option<Verse> {
        self.chapters
            .get(&(book.to_string(), chapter))?
            .iter()
            .find(|v| v.verse == verse)
            .cloned()
    }

    fn verses_in_chapter(&self, book: &str, chapter: u32) -> Vec<Verse> {
        self.chapters
            .get(&(book.to_string(), chapter))
            .cloned()
            .unwrap_or_default()
    }

    fn verses_in_range(
        &self,
        book: &str,
        start_chapter: u32,
        end_chapter: u32,
        start_verse: Option<u32>,
        end_verse: Option<u32>,
    ) -> Vec<Verse> {
        if start_chapter > end_chapter {
            return Vec::new();
        }
        // Only chapters present in the corpus are visited, however wide the range.
        let first = (book.to_string(), start_chapter);
        let last = (book.to_string(), end_chapter);
        self.chapters
            .range(first..=last)
            .flat_map(|(_, verses)| verses)
            .filter(|v| {
                let after_start =
                    v.chapter != start_chapter || start_verse.map_or(true, |s| v.verse >= s);
                let before_end =
                    v.chapter != end_chapter || end_verse.map_or(true, |e| v.verse <= e);
                after_start && before_end
            })
            .cloned()
            .collect()
    }
}

/// Expands a reading range such as `創1:1-3:24;太1-2` into its verses, in
/// reading order. Segments that do not parse contribute nothing.
pub fn verses_for_reading(store: &impl VerseStore, reading: &str) -> Vec<Verse> {
    let mut all_verses = Vec::new();

    for span in reference::parse_reading(reading) {
        let verses = match &span {
            ReadingSpan::Passage {
                book,
                start_chapter,
                ..
            } if span.is_whole_chapter() => store.verses_in_chapter(book, *start_chapter),
            ReadingSpan::Passage {
                book,
                start_chapter,
                start_verse,
                end_chapter,
                end_verse,
            } => store.verses_in_range(
                book,
                *start_chapter,
                *end_chapter,
                Some(*start_verse),
                *end_verse,
            ),
            ReadingSpan::Unresolved(segment) => {
                debug!("Skipping unresolved reading segment {segment:?}");
                Vec::new()
            }
        };
        debug!("Verses fetched for {span:?}: {}", verses.len());
        all_verses.extend(verses);
    }

    all_verses
}

/// Full text of a reading range grouped under per-chapter headings, used for
/// the 「今日經文」 reply.
pub fn daily_reading_text(store: &impl VerseStore, reading: &str) -> String {
    let verses = verses_for_reading(store, reading);
    if verses.is_empty() {
        return "今日經文範圍無法取得。".to_string();
    }

    let mut text = String::new();
    let mut current_chapter = String::new();
    for verse in &verses {
        let chapter = format!("{}{}", verse.book_abbr, verse.chapter);
        if chapter != current_chapter {
            text.push_str(&format!("\n**{chapter}**\n"));
            current_chapter = chapter;
        }
        text.push_str(&format!("  {} {}", verse.verse, verse.text));
    }
    text
}

// (book, chapter, first verse, last verse)
const ENCOURAGING_REFERENCES: [(&str, u32, u32, u32); 18] = [
    ("詩", 23, 1, 1),
    ("詩", 27, 1, 1),
    ("詩", 46, 1, 1),
    ("詩", 121, 1, 1),
    ("箴", 3, 5, 5),
    ("箴", 16, 3, 3),
    ("箴", 18, 10, 10),
    ("太", 6, 33, 33),
    ("約", 14, 27, 27),
    ("羅", 8, 28, 28),
    ("林前", 10, 13, 13),
    ("林後", 12, 9, 9),
    ("腓", 4, 6, 7),
    ("腓", 4, 13, 13),
    ("提後", 1, 7, 7),
    ("來", 10, 24, 25),
    ("雅", 1, 2, 4),
    ("彼前", 5, 7, 7),
];

const FALLBACK_ENCOURAGEMENT: (&str, &str) = (
    "你當剛強壯膽，不要懼怕，也不要驚惶，因為你無論往哪裡去，耶和華你的神必與你同在。",
    "約書亞記 1:9",
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encouragement {
    pub text: String,
    pub reference: String,
}

/// Picks a verse from the fixed encouraging passages. Falls back to Joshua 1:9
/// when the corpus lacks the chosen verse.
pub fn random_encouraging_verse<R: Rng + ?Sized>(
    store: &impl VerseStore,
    rng: &mut R,
) -> Encouragement {
    let picked = ENCOURAGING_REFERENCES.choose(rng).and_then(|(book, chapter, first, last)| {
        let verse = rng.gen_range(*first..=*last);
        store.verse(book, *chapter, verse)
    });

    match picked {
        Some(verse) => Encouragement {
            reference: format!("{} {}:{}", verse.book, verse.chapter, verse.verse),
            text: verse.text,
        },
        None => Encouragement {
            text: FALLBACK_ENCOURAGEMENT.0.to_string(),
            reference: FALLBACK_ENCOURAGEMENT.1.to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn verse(book: &str, chapter: u32, verse: u32, text: &str) -> Verse {
        Verse {
            book_abbr: book.to_string(),
            book: books::full_name(book).unwrap_or(book).to_string(),
            chapter,
            verse,
            text: text.to_string(),
        }
    }

    /// Chapters 1..=3 of 創 and 1..=2 of 太 with 30 verses each.
    pub(crate) fn sample_bible() -> Bible {
        let mut verses = Vec::new();
        for (book, chapters) in [("創", 3), ("太", 2)] {
            for chapter in 1..=chapters {
                for v in 1..=30 {
                    verses.push(verse(
                        book,
                        chapter,
                        v,
                        &format!("{book}{chapter}章第{v}節，耶和華的話臨到先知。"),
                    ));
                }
            }
        }
        Bible::new(verses)
    }

    fn refs(verses: &[Verse]) -> Vec<String> {
        verses.iter().map(Verse::reference).collect()
    }

    #[test]
    fn chapter_range_expands_in_order() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "創1-3");
        assert_eq!(verses.len(), 90);
        assert_eq!(verses.first().unwrap().reference(), "創1:1");
        assert_eq!(verses.last().unwrap().reference(), "創3:30");
        assert!(verses
            .windows(2)
            .all(|w| (w[0].chapter, w[0].verse) < (w[1].chapter, w[1].verse)));
    }

    #[test]
    fn huge_chapter_range_stops_at_the_corpus() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "創1-4294967295");
        assert_eq!(verses.len(), 90);
        assert_eq!(verses.last().unwrap().reference(), "創3:30");

        let verses = bible.verses_in_range("創", 2, u32::MAX, Some(30), Some(1));
        let refs: Vec<String> = verses.iter().take(3).map(Verse::reference).collect();
        assert_eq!(refs, vec!["創2:30", "創3:1", "創3:2"]);
        assert_eq!(verses.len(), 31);

        assert!(bible.verses_in_range("創", 3, 1, None, None).is_empty());
    }

    #[test]
    fn cross_chapter_range_trims_only_the_edges() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "太1:1-2:23");
        assert_eq!(verses.len(), 30 + 23);
        assert_eq!(verses.first().unwrap().reference(), "太1:1");
        assert_eq!(verses.last().unwrap().reference(), "太2:23");
    }

    #[test]
    fn start_verse_trims_first_chapter() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "創2:29-3:2");
        assert_eq!(refs(&verses), vec!["創2:29", "創2:30", "創3:1", "創3:2"]);
    }

    #[test]
    fn verse_range_in_one_chapter() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "創1:3-5");
        assert_eq!(refs(&verses), vec!["創1:3", "創1:4", "創1:5"]);
    }

    #[test]
    fn segments_concatenate_and_unknown_books_are_skipped() {
        let bible = sample_bible();
        let verses = verses_for_reading(&bible, "創1:30;未知1;太2:1-2");
        assert_eq!(refs(&verses), vec!["創1:30", "太2:1", "太2:2"]);
    }

    #[test]
    fn missing_chapters_yield_nothing() {
        let bible = sample_bible();
        assert!(verses_for_reading(&bible, "啟22").is_empty());
    }

    #[test]
    fn loads_json_corpus() {
        let json = r#"[
            {"book_abbr":"創","book":"創世記","chapter":1,"verse":2,"text":"地是空虛混沌"},
            {"book_abbr":"創","chapter":1,"verse":1,"text":"起初神創造天地"}
        ]"#;
        let bible = Bible::from_reader(json.as_bytes()).unwrap();
        assert_eq!(bible.verse_count(), 2);
        assert_eq!(bible.verse("創", 1, 1).unwrap().book, "創世記");
        assert_eq!(bible.chapter_count(), 1);
        assert_eq!(refs(&bible.verses_in_chapter("創", 1)), vec!["創1:1", "創1:2"]);
    }

    #[test]
    fn daily_text_groups_by_chapter() {
        let bible = Bible::new(vec![
            verse("創", 1, 1, "起初神創造天地。"),
            verse("創", 2, 1, "天地萬物都造齊了。"),
        ]);
        let text = daily_reading_text(&bible, "創1-2");
        assert_eq!(
            text,
            "\n**創1**\n  1 起初神創造天地。\n**創2**\n  1 天地萬物都造齊了。"
        );
        assert_eq!(daily_reading_text(&bible, "啟1"), "今日經文範圍無法取得。");
    }

    #[test]
    fn encouraging_verse_falls_back_without_corpus() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = random_encouraging_verse(&Bible::default(), &mut rng);
        assert_eq!(picked.reference, "約書亞記 1:9");
    }

    #[test]
    fn encouraging_verse_comes_from_the_table() {
        let verses = ENCOURAGING_REFERENCES
            .iter()
            .flat_map(|(book, chapter, first, last)| {
                (*first..=*last).map(move |v| verse(book, *chapter, v, "經文"))
            })
            .collect();
        let bible = Bible::new(verses);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let picked = random_encouraging_verse(&bible, &mut rng);
            assert_eq!(picked.text, "經文");
            assert_ne!(picked.reference, "約書亞記 1:9");
            assert!(picked.reference.contains(' '));
        }
    }
}
