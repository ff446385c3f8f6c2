//! Weekly, streak, newcomer and all-time boards over the user store. Only
//! users who keep `show_in_leaderboard` on are listed.

use std::cmp::Reverse;

use chrono::{Datelike, Days, NaiveDate};

use crate::scoring::badges::star_level;
use crate::user::User;

const ANONYMOUS: &str = "匿名使用者";
const EMPTY_BOARD: &str = "目前還沒有人上榜，快來成為第一名！💪";
const RULE: &str = "━━━━━━━━━━━━━━━";
const TOP_N_FOR_GAP: usize = 10;

/// Users who joined within this many days count as newcomers.
pub const NEWCOMER_DAYS: i64 = 30;

pub const PRIVACY_SHOWN_TEXT: &str = "✅ 排行榜顯示：公開";
pub const PRIVACY_HIDDEN_TEXT: &str = "🔒 排行榜顯示：隱藏";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardKind {
    Weekly,
    Streak,
    Newcomer,
    Total,
}

impl LeaderboardKind {
    pub fn limit(self) -> usize {
        match self {
            LeaderboardKind::Weekly | LeaderboardKind::Streak => 10,
            LeaderboardKind::Newcomer => 5,
            LeaderboardKind::Total => 20,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LeaderboardKind::Weekly => "🏆 本週讀經排行榜",
            LeaderboardKind::Streak => "🔥 連續天數排行榜",
            LeaderboardKind::Newcomer => "🌟 本週新星榜",
            LeaderboardKind::Total => "👑 總積分排行榜",
        }
    }

    /// The value the board sorts on. Newcomers compete on this week's score.
    pub fn metric(self, user: &User) -> u32 {
        let p = &user.progress;
        match self {
            LeaderboardKind::Weekly | LeaderboardKind::Newcomer => p.week_score,
            LeaderboardKind::Streak => p.current_streak,
            LeaderboardKind::Total => p.total_score,
        }
    }

    fn is_weekly(self) -> bool {
        matches!(self, LeaderboardKind::Weekly | LeaderboardKind::Newcomer)
    }
}

fn days_since_joined(user: &User, today: NaiveDate) -> Option<i64> {
    user.joined().map(|joined| (today - joined).num_days())
}

fn eligible(kind: LeaderboardKind, user: &User, today: NaiveDate) -> bool {
    if !user.show_in_leaderboard || kind.metric(user) == 0 {
        return false;
    }
    match kind {
        LeaderboardKind::Newcomer => {
            days_since_joined(user, today).is_some_and(|days| days <= NEWCOMER_DAYS)
        }
        _ => true,
    }
}

/// The top of the board, highest first. Ties keep store order.
pub fn leaderboard(kind: LeaderboardKind, users: &[User], today: NaiveDate) -> Vec<&User> {
    let mut board: Vec<&User> = users.iter().filter(|u| eligible(kind, u, today)).collect();
    board.sort_by_key(|u| Reverse(kind.metric(u)));
    board.truncate(kind.limit());
    board
}

/// One plus the number of listed users strictly ahead of `user`. `None`
/// when the user has nothing on this board yet, and always for newcomers.
pub fn user_rank(kind: LeaderboardKind, users: &[User], user: &User) -> Option<usize> {
    if kind == LeaderboardKind::Newcomer {
        return None;
    }
    let score = kind.metric(user);
    if score == 0 {
        return None;
    }
    let ahead = users
        .iter()
        .filter(|u| u.show_in_leaderboard && u.line_user_id != user.line_user_id)
        .filter(|u| kind.metric(u) > score)
        .count();
    Some(ahead + 1)
}

/// Monday to Sunday of the week holding `today`, as `（MM/DD - MM/DD）`.
fn week_range(today: NaiveDate) -> String {
    let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let sunday = monday + Days::new(6);
    format!("（{} - {}）", monday.format("%m/%d"), sunday.format("%m/%d"))
}

fn rank_icon(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("{n}."),
    }
}

fn entry_line(kind: LeaderboardKind, rank: usize, user: &User, today: NaiveDate) -> String {
    let p = &user.progress;
    let icon = rank_icon(rank);
    let name = user.display_name.as_deref().unwrap_or(ANONYMOUS);
    let stars = star_level(p.total_score).stars;
    match kind {
        LeaderboardKind::Weekly => format!(
            "{icon} {name} {stars} {}分\n   連續 {} 天 | 本週 {}/7 天",
            p.week_score, p.current_streak, p.week_reading_days
        ),
        LeaderboardKind::Streak => format!(
            "{icon} {name} {stars}\n   連續 {} 天 | 最長 {} 天",
            p.current_streak, p.longest_streak
        ),
        LeaderboardKind::Newcomer => format!(
            "{icon} {name} {stars} {}分\n   加入 {} 天",
            p.week_score,
            days_since_joined(user, today).unwrap_or(0)
        ),
        LeaderboardKind::Total => format!(
            "{icon} {name} {stars} {}分\n   累計 {} 天",
            p.total_score, p.total_reading_days
        ),
    }
}

/// Renders the board, followed by the viewer's own rank when they have one.
pub fn format_leaderboard(
    kind: LeaderboardKind,
    users: &[User],
    viewer: &User,
    today: NaiveDate,
) -> String {
    let board = leaderboard(kind, users, today);

    let mut lines = vec![if kind.is_weekly() {
        format!("{} {}", kind.title(), week_range(today))
    } else {
        kind.title().to_string()
    }];
    lines.push(String::new());

    if board.is_empty() {
        lines.push(EMPTY_BOARD.to_string());
    }
    for (i, user) in board.iter().enumerate() {
        lines.push(entry_line(kind, i + 1, user, today));
        lines.push(String::new());
    }

    if let Some(rank) = user_rank(kind, users, viewer) {
        let score = kind.metric(viewer);
        lines.push(RULE.to_string());
        lines.push(format!("您的排名：第 {rank} 名（{score} 分）"));
        if rank > board.len() && board.len() >= TOP_N_FOR_GAP {
            let gap = kind
                .metric(board[TOP_N_FOR_GAP - 1])
                .saturating_sub(score);
            if gap > 0 {
                lines.push(format!("再努力 {gap} 分就能進入前 10！💪"));
            }
        }
    }

    lines.join("\n")
}

pub fn privacy_status_text(user: &User) -> &'static str {
    if user.show_in_leaderboard {
        PRIVACY_SHOWN_TEXT
    } else {
        PRIVACY_HIDDEN_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn user(id: &str, name: &str, week: u32, streak: u32, total: u32) -> User {
        let mut user = User::new(id);
        user.display_name = Some(name.to_string());
        user.joined_date = Some(date("2025-01-01"));
        user.progress.week_score = week;
        user.progress.current_streak = streak;
        user.progress.longest_streak = streak;
        user.progress.total_score = total;
        user
    }

    fn sample_users() -> Vec<User> {
        vec![
            user("U1", "約翰", 30, 3, 120),
            user("U2", "馬可", 45, 5, 60),
            user("U3", "路加", 0, 0, 300),
            user("U4", "提摩太", 30, 1, 10),
        ]
    }

    fn ids(board: &[&User]) -> Vec<String> {
        board.iter().map(|u| u.line_user_id.clone()).collect()
    }

    #[test]
    fn boards_sort_by_their_own_metric() {
        let users = sample_users();
        let today = date("2025-01-08");

        assert_eq!(
            ids(&leaderboard(LeaderboardKind::Weekly, &users, today)),
            vec!["U2", "U1", "U4"]
        );
        assert_eq!(
            ids(&leaderboard(LeaderboardKind::Streak, &users, today)),
            vec!["U2", "U1", "U4"]
        );
        assert_eq!(
            ids(&leaderboard(LeaderboardKind::Total, &users, today)),
            vec!["U3", "U1", "U2", "U4"]
        );
    }

    #[test]
    fn hidden_users_are_left_off_and_do_not_push_others_down() {
        let mut users = sample_users();
        users[1].show_in_leaderboard = false;
        let today = date("2025-01-08");

        assert_eq!(
            ids(&leaderboard(LeaderboardKind::Weekly, &users, today)),
            vec!["U1", "U4"]
        );
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[0]), Some(1));
        // A hidden user still sees where they would stand.
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[1]), Some(1));
    }

    #[test]
    fn newcomers_joined_within_thirty_days() {
        let mut users = sample_users();
        users[0].joined_date = Some(date("2024-11-01"));
        users[3].joined_date = None;
        users[3].start_date = Some(date("2025-01-05"));

        let board = leaderboard(LeaderboardKind::Newcomer, &users, date("2025-01-08"));
        assert_eq!(ids(&board), vec!["U2", "U4"]);
        assert_eq!(user_rank(LeaderboardKind::Newcomer, &users, &users[1]), None);
    }

    #[test]
    fn ranks_count_users_strictly_ahead() {
        let users = sample_users();
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[1]), Some(1));
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[0]), Some(2));
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[3]), Some(2));
        assert_eq!(user_rank(LeaderboardKind::Weekly, &users, &users[2]), None);
        assert_eq!(user_rank(LeaderboardKind::Total, &users, &users[2]), Some(1));
    }

    #[test]
    fn weekly_board_text() {
        let mut users = sample_users();
        users[3].display_name = None;
        users[1].progress.week_reading_days = 4;
        // 2025-01-08 is a Wednesday.
        let text = format_leaderboard(LeaderboardKind::Weekly, &users, &users[0], date("2025-01-08"));
        assert_eq!(
            text,
            "🏆 本週讀經排行榜 （01/06 - 01/12）\n\n\
             🥇 馬可 ⭐ 45分\n   連續 5 天 | 本週 4/7 天\n\n\
             🥈 約翰 ⭐⭐ 30分\n   連續 3 天 | 本週 0/7 天\n\n\
             🥉 匿名使用者 ⭐ 30分\n   連續 1 天 | 本週 0/7 天\n\n\
             ━━━━━━━━━━━━━━━\n您的排名：第 2 名（30 分）"
        );
    }

    #[test]
    fn empty_board_and_gap_to_the_top_ten() {
        let today = date("2025-01-08");
        let nobody = User::new("U0");
        let text = format_leaderboard(LeaderboardKind::Streak, &[], &nobody, today);
        assert_eq!(text, format!("🔥 連續天數排行榜\n\n{EMPTY_BOARD}"));

        let mut users: Vec<User> = (1..=12)
            .map(|i| user(&format!("U{i:02}"), "弟兄", 100 + i * 10, 0, 0))
            .collect();
        users.push(user("U99", "姊妹", 5, 0, 0));
        let text = format_leaderboard(LeaderboardKind::Weekly, &users, &users[12], today);
        assert!(text.contains("10. 弟兄 ⭐ 130分"));
        assert!(!text.contains("11. "));
        assert!(text.ends_with("您的排名：第 13 名（5 分）\n再努力 125 分就能進入前 10！💪"));
    }

    #[test]
    fn privacy_status() {
        let mut user = User::new("U1");
        assert_eq!(privacy_status_text(&user), PRIVACY_SHOWN_TEXT);
        user.show_in_leaderboard = false;
        assert_eq!(privacy_status_text(&user), PRIVACY_HIDDEN_TEXT);
    }
}
