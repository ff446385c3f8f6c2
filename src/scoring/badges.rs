/// What a badge watches. Thresholds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTrigger {
    CurrentStreak(u32),
    /// Plan day after the reading; 366 means all 365 days are done.
    CurrentDay(u32),
    QuizPerfectCount(u32),
    /// Awarded by the streak update itself.
    StreakRestart,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub emoji: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub score_reward: u32,
    pub trigger: BadgeTrigger,
}

pub const RESTART_BADGE_ID: &str = "restart";

pub static BADGES: [Badge; 6] = [
    Badge {
        id: "streak_7",
        emoji: "🌱",
        name: "初心者",
        description: "連續讀經 7 天",
        score_reward: 50,
        trigger: BadgeTrigger::CurrentStreak(7),
    },
    Badge {
        id: "streak_30",
        emoji: "🌿",
        name: "堅持者",
        description: "連續讀經 30 天",
        score_reward: 200,
        trigger: BadgeTrigger::CurrentStreak(30),
    },
    Badge {
        id: "streak_100",
        emoji: "🌳",
        name: "忠心僕人",
        description: "連續讀經 100 天",
        score_reward: 1000,
        trigger: BadgeTrigger::CurrentStreak(100),
    },
    Badge {
        id: "streak_365",
        emoji: "👑",
        name: "讀經勇士",
        description: "完成全年讀經計畫",
        score_reward: 3650,
        trigger: BadgeTrigger::CurrentDay(366),
    },
    Badge {
        id: "quiz_perfect_100",
        emoji: "🎯",
        name: "真理探索者",
        description: "測驗累計 100 次全對",
        score_reward: 500,
        trigger: BadgeTrigger::QuizPerfectCount(100),
    },
    Badge {
        id: RESTART_BADGE_ID,
        emoji: "🔄",
        name: "重新出發",
        description: "中斷後重新開始讀經",
        score_reward: 50,
        trigger: BadgeTrigger::StreakRestart,
    },
];

pub fn badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

#[derive(Debug, PartialEq, Eq)]
pub struct StarLevel {
    pub min_score: u32,
    pub stars: &'static str,
    pub title: &'static str,
}

// Ascending by min_score.
static STAR_LEVELS: [StarLevel; 5] = [
    StarLevel {
        min_score: 0,
        stars: "⭐",
        title: "初學者",
    },
    StarLevel {
        min_score: 100,
        stars: "⭐⭐",
        title: "學習者",
    },
    StarLevel {
        min_score: 500,
        stars: "⭐⭐⭐",
        title: "追求者",
    },
    StarLevel {
        min_score: 1500,
        stars: "⭐⭐⭐⭐",
        title: "忠心者",
    },
    StarLevel {
        min_score: 3650,
        stars: "⭐⭐⭐⭐⭐",
        title: "勇士",
    },
];

pub fn star_level(total_score: u32) -> &'static StarLevel {
    STAR_LEVELS
        .iter()
        .rev()
        .find(|level| total_score >= level.min_score)
        .unwrap_or(&STAR_LEVELS[0])
}
