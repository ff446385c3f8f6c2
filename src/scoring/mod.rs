//! Points, streaks and badges for completed readings.
//!
//! Everything here mutates an in-memory [`UserProgress`]; saving it is the
//! caller's job.

pub mod badges;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use badges::{Badge, BadgeTrigger, BADGES, RESTART_BADGE_ID};

pub const BASE_READING_SCORE: u32 = 10;
pub const MAKEUP_1DAY_SCORE: u32 = 8;
pub const MAKEUP_OLD_SCORE: u32 = 6;
pub const QUIZ_PERFECT_SCORE: u32 = 5;
pub const QUIZ_PARTIAL_SCORE: u32 = 3;

// (minimum streak, bonus), descending.
const STREAK_BONUS_TIERS: [(u32, u32); 5] = [(100, 10), (60, 7), (30, 5), (14, 3), (7, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizResult {
    Perfect,
    Partial,
    #[serde(rename = "none")]
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UserProgress {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_streak_date: Option<NaiveDate>,
    pub total_score: u32,
    pub week_score: u32,
    pub month_score: u32,
    pub total_reading_days: u32,
    pub week_reading_days: u32,
    pub quiz_perfect_count: u32,
    pub quiz_total_count: u32,
    /// Emoji of every badge earned, in award order.
    pub badges: Vec<String>,
    /// Badge id to the date it was awarded. Presence means "never again".
    pub milestone_achieved: BTreeMap<String, NaiveDate>,
}

impl UserProgress {
    fn add_points(&mut self, points: u32) {
        self.total_score += points;
        self.week_score += points;
        self.month_score += points;
    }

    pub fn quiz_accuracy(&self) -> f64 {
        if self.quiz_total_count == 0 {
            return 0.0;
        }
        f64::from(self.quiz_perfect_count) / f64::from(self.quiz_total_count) * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingEvent {
    pub date: NaiveDate,
    pub is_makeup: bool,
    /// How far behind schedule a makeup reading is; ignored otherwise.
    pub days_ago: u32,
    pub quiz_result: QuizResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// Reading points, without badge rewards.
    pub score_earned: u32,
    pub streak_bonus: u32,
    /// Zero for makeup readings, which leave the streak alone.
    pub new_streak: u32,
    pub new_badges: Vec<&'static Badge>,
    pub total_badge_reward: u32,
    pub messages: Vec<String>,
}

pub fn streak_bonus(streak_days: u32) -> u32 {
    STREAK_BONUS_TIERS
        .iter()
        .find(|(min_days, _)| streak_days >= *min_days)
        .map_or(0, |(_, bonus)| *bonus)
}

/// Points for one reading, using the streak as it stood before the reading.
pub fn calculate_score(
    progress: &UserProgress,
    is_makeup: bool,
    days_ago: u32,
    quiz_result: QuizResult,
) -> u32 {
    let base = match (is_makeup, days_ago) {
        (false, _) => BASE_READING_SCORE,
        (true, 1) => MAKEUP_1DAY_SCORE,
        (true, _) => MAKEUP_OLD_SCORE,
    };

    let quiz = match quiz_result {
        QuizResult::Perfect => QUIZ_PERFECT_SCORE,
        QuizResult::Partial => QUIZ_PARTIAL_SCORE,
        QuizResult::Skipped => 0,
    };

    let streak = if is_makeup {
        0
    } else {
        streak_bonus(progress.current_streak)
    };

    base + quiz + streak
}

/// Returns the streak after reading on `reading_date`, and whether a live
/// streak was broken.
pub fn update_streak(progress: &UserProgress, reading_date: NaiveDate) -> (u32, bool) {
    let Some(last) = progress.last_streak_date else {
        return (1, false);
    };

    match (reading_date - last).num_days() {
        1 => (progress.current_streak + 1, false),
        // Same day, or a date before the last one.
        gap if gap <= 0 => (progress.current_streak, false),
        _ => (1, progress.current_streak > 0),
    }
}

/// Badges whose threshold is met and which were never awarded before.
pub fn check_new_badges(progress: &UserProgress, current_day: u32) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|b| !progress.milestone_achieved.contains_key(b.id))
        .filter(|b| match b.trigger {
            BadgeTrigger::CurrentStreak(min) => progress.current_streak >= min,
            BadgeTrigger::CurrentDay(min) => current_day >= min,
            BadgeTrigger::QuizPerfectCount(min) => progress.quiz_perfect_count >= min,
            BadgeTrigger::StreakRestart => false,
        })
        .collect()
}

/// Records `badge` and folds its reward into the scores. Returns the reward,
/// or 0 if the badge was already awarded.
pub fn award_badge(progress: &mut UserProgress, badge: &Badge, date: NaiveDate) -> u32 {
    if progress.milestone_achieved.contains_key(badge.id) {
        return 0;
    }
    if !progress.badges.iter().any(|e| e == badge.emoji) {
        progress.badges.push(badge.emoji.to_string());
    }
    progress
        .milestone_achieved
        .insert(badge.id.to_string(), date);
    progress.add_points(badge.score_reward);
    badge.score_reward
}

/// Applies a finished reading to `progress`.
///
/// `current_day` is the plan day the user moves on to after this reading.
pub fn add_reading_score(
    progress: &mut UserProgress,
    current_day: u32,
    event: ReadingEvent,
) -> ScoreOutcome {
    let mut outcome = ScoreOutcome {
        score_earned: calculate_score(progress, event.is_makeup, event.days_ago, event.quiz_result),
        streak_bonus: if event.is_makeup {
            0
        } else {
            streak_bonus(progress.current_streak)
        },
        new_streak: 0,
        new_badges: Vec::new(),
        total_badge_reward: 0,
        messages: Vec::new(),
    };

    if !event.is_makeup {
        let (new_streak, broken) = update_streak(progress, event.date);
        progress.current_streak = new_streak;
        progress.last_streak_date = Some(event.date);
        progress.longest_streak = progress.longest_streak.max(new_streak);
        outcome.new_streak = new_streak;

        if broken {
            if let Some(restart) = badges::badge(RESTART_BADGE_ID) {
                record_award(progress, restart, event.date, &mut outcome);
            }
        }
    }

    progress.total_reading_days += 1;
    progress.week_reading_days += 1;
    if event.quiz_result == QuizResult::Perfect {
        progress.quiz_perfect_count += 1;
    }
    if event.quiz_result != QuizResult::Skipped {
        progress.quiz_total_count += 1;
    }
    progress.add_points(outcome.score_earned);

    for badge in check_new_badges(progress, current_day) {
        record_award(progress, badge, event.date, &mut outcome);
    }

    outcome
}

fn record_award(
    progress: &mut UserProgress,
    badge: &'static Badge,
    date: NaiveDate,
    outcome: &mut ScoreOutcome,
) {
    let reward = award_badge(progress, badge, date);
    if reward == 0 {
        return;
    }
    outcome.total_badge_reward += reward;
    outcome.new_badges.push(badge);
    outcome
        .messages
        .push(format!("{} 獲得「{}」徽章！+{} 分", badge.emoji, badge.name, reward));
}

pub fn format_score_message(outcome: &ScoreOutcome) -> String {
    let mut lines = vec![format!("📊 今日獲得：{} 分", outcome.score_earned)];

    let base = outcome.score_earned - outcome.streak_bonus;
    let mut details = Vec::new();
    if base > 0 {
        details.push(format!("基礎 {base}"));
    }
    if outcome.streak_bonus > 0 {
        details.push(format!("連續加成 {}", outcome.streak_bonus));
    }
    if !details.is_empty() {
        lines.push(format!("（{}）", details.join(" + ")));
    }

    if outcome.new_streak > 0 {
        lines.push(format!("\n🔥 連續讀經：{} 天", outcome.new_streak));
    }

    if !outcome.new_badges.is_empty() {
        lines.push("\n".to_string());
        lines.extend(outcome.messages.iter().cloned());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn on_time(day: &str, quiz_result: QuizResult) -> ReadingEvent {
        ReadingEvent {
            date: date(day),
            is_makeup: false,
            days_ago: 0,
            quiz_result,
        }
    }

    fn makeup(day: &str, days_ago: u32, quiz_result: QuizResult) -> ReadingEvent {
        ReadingEvent {
            date: date(day),
            is_makeup: true,
            days_ago,
            quiz_result,
        }
    }

    fn with_streak(streak: u32, last: &str) -> UserProgress {
        UserProgress {
            current_streak: streak,
            longest_streak: streak,
            last_streak_date: Some(date(last)),
            ..UserProgress::default()
        }
    }

    #[test]
    fn streak_tiers() {
        let cases = [
            (0, 0),
            (1, 0),
            (6, 0),
            (7, 2),
            (13, 2),
            (14, 3),
            (29, 3),
            (30, 5),
            (59, 5),
            (60, 7),
            (99, 7),
            (100, 10),
            (1000, 10),
        ];
        for (streak, bonus) in cases {
            assert_eq!(streak_bonus(streak), bonus, "streak {streak}");
        }
    }

    #[test]
    fn base_scores() {
        let p = with_streak(20, "2025-01-01");
        assert_eq!(calculate_score(&p, false, 0, QuizResult::Skipped), 10 + 3);
        assert_eq!(calculate_score(&p, true, 1, QuizResult::Partial), 8 + 3);
        assert_eq!(calculate_score(&p, true, 4, QuizResult::Perfect), 6 + 5);
    }

    #[test]
    fn streak_continuity() {
        let p = with_streak(4, "2025-03-10");
        assert_eq!(update_streak(&p, date("2025-03-11")), (5, false));
        assert_eq!(update_streak(&p, date("2025-03-10")), (4, false));
        assert_eq!(update_streak(&p, date("2025-03-12")), (1, true));
        assert_eq!(update_streak(&UserProgress::default(), date("2025-03-12")), (1, false));
    }

    #[test]
    fn sixth_to_seventh_day_with_perfect_quiz() {
        let mut p = with_streak(6, "2025-04-30");
        let outcome = add_reading_score(&mut p, 8, on_time("2025-05-01", QuizResult::Perfect));

        assert_eq!(outcome.score_earned, 15);
        assert_eq!(outcome.streak_bonus, 0);
        assert_eq!(outcome.new_streak, 7);
        assert_eq!(outcome.new_badges.len(), 1);
        assert_eq!(outcome.new_badges[0].id, "streak_7");
        assert_eq!(outcome.total_badge_reward, 50);

        assert_eq!(p.current_streak, 7);
        assert_eq!(p.longest_streak, 7);
        assert_eq!(p.total_score, 65);
        assert_eq!(p.week_score, 65);
        assert_eq!(p.month_score, 65);
        assert_eq!(p.badges, vec!["🌱".to_string()]);
        assert_eq!(p.milestone_achieved.get("streak_7"), Some(&date("2025-05-01")));

        let again = add_reading_score(&mut p, 9, on_time("2025-05-02", QuizResult::Perfect));
        assert!(again.new_badges.is_empty());
        assert_eq!(again.score_earned, 10 + 5 + 2);
        assert_eq!(p.total_score, 65 + 17);
    }

    #[test]
    fn broken_streak_grants_restart_once() {
        let mut p = with_streak(12, "2025-01-01");
        let first = add_reading_score(&mut p, 20, on_time("2025-01-05", QuizResult::Partial));

        assert_eq!(first.new_streak, 1);
        assert_eq!(first.new_badges.iter().map(|b| b.id).collect::<Vec<_>>(), vec!["restart"]);
        assert_eq!(first.total_badge_reward, 50);
        assert_eq!(p.longest_streak, 12);
        assert_eq!(p.total_score, first.score_earned + 50);

        p.last_streak_date = Some(date("2025-01-01"));
        p.current_streak = 3;
        let second = add_reading_score(&mut p, 21, on_time("2025-01-09", QuizResult::Partial));
        assert_eq!(second.new_streak, 1);
        assert!(second.new_badges.is_empty());
        assert_eq!(second.total_badge_reward, 0);
    }

    #[test]
    fn makeup_leaves_streak_alone() {
        let mut p = with_streak(9, "2025-06-01");
        let outcome = add_reading_score(&mut p, 30, makeup("2025-06-05", 1, QuizResult::Perfect));

        assert_eq!(outcome.score_earned, 8 + 5);
        assert_eq!(outcome.streak_bonus, 0);
        assert_eq!(outcome.new_streak, 0);
        assert_eq!(p.current_streak, 9);
        assert_eq!(p.last_streak_date, Some(date("2025-06-01")));
        assert_eq!(p.total_reading_days, 1);
        assert_eq!(p.quiz_perfect_count, 1);
        assert_eq!(p.quiz_total_count, 1);
    }

    #[test]
    fn counters_follow_quiz_result() {
        let mut p = UserProgress::default();
        add_reading_score(&mut p, 2, on_time("2025-01-01", QuizResult::Skipped));
        add_reading_score(&mut p, 3, on_time("2025-01-02", QuizResult::Partial));
        assert_eq!(p.quiz_total_count, 1);
        assert_eq!(p.quiz_perfect_count, 0);
        assert_eq!(p.total_reading_days, 2);
        assert_eq!(p.week_reading_days, 2);
    }

    #[test]
    fn finishing_the_plan_awards_the_crown() {
        let mut p = with_streak(0, "2024-01-01");
        p.milestone_achieved.insert("restart".to_string(), date("2024-01-01"));
        let outcome = add_reading_score(&mut p, 366, makeup("2025-01-01", 3, QuizResult::Skipped));
        assert_eq!(outcome.new_badges.iter().map(|b| b.id).collect::<Vec<_>>(), vec!["streak_365"]);
        assert_eq!(p.total_score, 6 + 3650);
    }

    #[test]
    fn hundredth_perfect_quiz_awards_badge() {
        let mut p = UserProgress {
            quiz_perfect_count: 99,
            quiz_total_count: 120,
            ..UserProgress::default()
        };
        let outcome = add_reading_score(&mut p, 150, makeup("2025-01-01", 2, QuizResult::Perfect));
        assert!(outcome.new_badges.iter().any(|b| b.id == "quiz_perfect_100"));
    }

    #[test]
    fn awarding_twice_pays_once() {
        let mut p = UserProgress::default();
        let badge = badges::badge("streak_30").unwrap();
        assert_eq!(award_badge(&mut p, badge, date("2025-02-01")), 200);
        assert_eq!(award_badge(&mut p, badge, date("2025-02-02")), 0);
        assert_eq!(p.total_score, 200);
        assert_eq!(p.badges.len(), 1);
        assert_eq!(p.milestone_achieved.get("streak_30"), Some(&date("2025-02-01")));
    }

    #[test]
    fn score_message_lists_parts() {
        let mut p = with_streak(6, "2025-04-30");
        let outcome = add_reading_score(&mut p, 8, on_time("2025-05-01", QuizResult::Perfect));
        assert_eq!(
            format_score_message(&outcome),
            "📊 今日獲得：15 分\n（基礎 15）\n\n🔥 連續讀經：7 天\n\n\n🌱 獲得「初心者」徽章！+50 分"
        );
    }

    #[test]
    fn accuracy_handles_zero() {
        assert_eq!(UserProgress::default().quiz_accuracy(), 0.0);
        let p = UserProgress {
            quiz_perfect_count: 1,
            quiz_total_count: 4,
            ..UserProgress::default()
        };
        assert_eq!(p.quiz_accuracy(), 25.0);
    }
}
