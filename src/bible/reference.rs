use super::books;

/// One `;`-separated piece of a reading range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingSpan {
    Passage {
        book: &'static str,
        start_chapter: u32,
        start_verse: u32,
        end_chapter: u32,
        /// `None` reads to the end of `end_chapter`.
        end_verse: Option<u32>,
    },
    /// A segment whose book or numbers could not be understood. Resolves to
    /// no verses.
    Unresolved(String),
}

impl ReadingSpan {
    /// True when the span covers exactly one whole chapter.
    pub fn is_whole_chapter(&self) -> bool {
        matches!(
            self,
            ReadingSpan::Passage {
                start_chapter,
                start_verse: 1,
                end_chapter,
                end_verse: None,
                ..
            } if start_chapter == end_chapter
        )
    }
}

/// Parses `創1:1-3:24;太1-2` style reading ranges. Never fails: segments it
/// cannot read come back as [`ReadingSpan::Unresolved`].
pub fn parse_reading(reading: &str) -> Vec<ReadingSpan> {
    reading
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> ReadingSpan {
    let normalized: String = segment
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '：' => ':',
            '－' | '–' | '—' | '~' | '～' => '-',
            other => other,
        })
        .collect();

    let Some((book, rest)) = books::split_book_prefix(&normalized) else {
        return ReadingSpan::Unresolved(segment.to_string());
    };

    parse_numbers(book, rest).unwrap_or_else(|| ReadingSpan::Unresolved(segment.to_string()))
}

fn parse_numbers(book: &'static str, rest: &str) -> Option<ReadingSpan> {
    let (start, end) = match rest.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (rest, None),
    };

    let (start_chapter, start_verse) = parse_point(start)?;

    let (end_chapter, end_verse) = match (end, start_verse) {
        // 書1 / 書1:5
        (None, verse) => (start_chapter, verse),
        // 書1:1-5 stays inside chapter 1
        (Some(end), Some(_)) if !end.contains(':') => (start_chapter, Some(end.parse().ok()?)),
        // 創1-3 / 書1:1-3:24 / 創1-3:5
        (Some(end), _) => parse_point(end)?,
    };

    if end_chapter < start_chapter {
        return None;
    }

    Some(ReadingSpan::Passage {
        book,
        start_chapter,
        start_verse: start_verse.unwrap_or(1),
        end_chapter,
        end_verse,
    })
}

fn parse_point(text: &str) -> Option<(u32, Option<u32>)> {
    match text.split_once(':') {
        Some((chapter, verse)) => Some((chapter.parse().ok()?, Some(verse.parse().ok()?))),
        None => Some((text.parse().ok()?, None)),
    }
}
