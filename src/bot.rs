use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, error, info, warn};
use rand::Rng;

use crate::bible::plan::{
    reading_plan_message, PlanStore, PlanVariant, ReadingPlans, NO_READING_TODAY,
};
use crate::bible::{daily_reading_text, random_encouraging_verse, Bible};
use crate::error::QuizError;
use crate::leaderboard::{format_leaderboard, privacy_status_text, user_rank, LeaderboardKind};
use crate::quiz::evaluator::evaluate_answer;
use crate::quiz::generator::generate_quiz;
use crate::scoring::badges::{badge, star_level};
use crate::scoring::{add_reading_score, format_score_message, ReadingEvent};
use crate::user::{User, UserStore};

pub type HandlerResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// An inbound event from one user, stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Follow {
        user_id: String,
        display_name: Option<String>,
    },
    Postback { user_id: String, data: String },
    Text { user_id: String, text: String },
}

const WELCOME_TEXT: &str = "歡迎加入一年讀經計畫！\n\n請先選擇您想進行的讀經計畫：";
const PLAN_MENU_TEXT: &str = "請選擇您的讀經計畫：\n\n1. 按卷順序計畫 (Canonical)：從創世記到啟示錄，一年讀完一遍。\n2. 平衡讀經計畫 (Balanced)：每日搭配舊約、新約、詩篇/箴言，一年讀完一遍。\n\n請回覆「1」或「2」來選擇。";
const INVALID_PLAN_TEXT: &str = "無效的計畫選擇。請重新選擇。";
const ALREADY_READ_TEXT: &str = "您今天已經回報並完成測驗了喔！請明天再回來繼續讀經。";
const QUIZ_INTRO_TEXT: &str = "太棒了！讓我們來進行今天的經文小測驗。";
const QUIZ_ERROR_TEXT: &str = "抱歉，生成測驗時發生錯誤。請稍後再試。";
const BROKEN_QUIZ_TEXT: &str = "測驗狀態錯誤，請重新開始測驗。";
const QUIZ_RESET_TEXT: &str = "已重置測驗狀態，請回覆「回報讀經」重新開始。";
const PROGRESS_RESET_TEXT: &str = "已將您的讀經進度重置到第 1 天。";
const DAY_COMPLETE_TEXT: &str = "恭喜您！今天的讀經與測驗都完成了！\n\n這是您明天的讀經計畫：";
const HELP_TEXT: &str = "我不太明白您的意思。您可以回覆「回報讀經」來開始今天的測驗，回覆「我的成績」來查看您的讀經進度，或是回覆「排行榜」看看大家的讀經情形。";
const PRIVACY_SHOWN_REPLY: &str = "✅ 設定已更新！\n\n您的名字現在會顯示在排行榜上。\n與弟兄姊妹一起見證讀經的堅持！";
const PRIVACY_HIDDEN_REPLY: &str = "🔒 設定已更新！\n\n您的名字現在不會顯示在排行榜上。\n您的讀經記錄仍會正常保留。";

const REPORT_COMMANDS: [&str; 3] = ["回報讀經", "已讀完", "開始測驗"];
const STATS_COMMANDS: [&str; 2] = ["我的成績", "我的進度"];
const RESET_QUIZ_COMMAND: &str = "重新測驗";
const RESET_PROGRESS_COMMAND: &str = "重設進度";
const ENCOURAGE_COMMAND: &str = "經文鼓勵";
const TODAY_TEXT_COMMAND: &str = "今日經文";
const PRIVACY_COMMAND: &str = "隱私設定";
const SHOW_IN_LEADERBOARD_COMMAND: &str = "公開排行榜";
const HIDE_FROM_LEADERBOARD_COMMAND: &str = "隱藏排行榜";

/// Conversation logic of the bot. Each call loads the user, mutates the
/// record and saves it back before returning the reply texts.
pub struct Bot {
    bible: Arc<Bible>,
    plans: Arc<ReadingPlans>,
}

impl Bot {
    pub fn new(bible: Arc<Bible>, plans: Arc<ReadingPlans>) -> Self {
        Self { bible, plans }
    }

    pub fn bible(&self) -> &Bible {
        &self.bible
    }

    pub fn plans(&self) -> &ReadingPlans {
        &self.plans
    }

    pub fn handle<R: Rng + ?Sized>(
        &self,
        users: &mut impl UserStore,
        event: BotEvent,
        today: NaiveDate,
        rng: &mut R,
    ) -> HandlerResult<Vec<String>> {
        match event {
            BotEvent::Follow {
                user_id,
                display_name,
            } => self.follow(users, &user_id, display_name, today),
            BotEvent::Postback { user_id, data } => self.postback(users, &user_id, &data, today),
            BotEvent::Text { user_id, text } => self.text(users, &user_id, text.trim(), today, rng),
        }
    }

    fn follow(
        &self,
        users: &mut impl UserStore,
        user_id: &str,
        display_name: Option<String>,
        today: NaiveDate,
    ) -> HandlerResult<Vec<String>> {
        let mut user = users.load(user_id).unwrap_or_else(|| {
            info!("New follower {user_id}");
            User::new(user_id)
        });
        if display_name.is_some() {
            user.display_name = display_name;
        }
        user.joined_date.get_or_insert(today);
        users.save(user)?;
        Ok(vec![WELCOME_TEXT.to_string(), PLAN_MENU_TEXT.to_string()])
    }

    fn postback(
        &self,
        users: &mut impl UserStore,
        user_id: &str,
        data: &str,
        today: NaiveDate,
    ) -> HandlerResult<Vec<String>> {
        let params = parse_postback(data);
        let user = users.load(user_id).unwrap_or_else(|| User::new(user_id));
        match param(&params, "action") {
            Some("select_plan") => {}
            Some("privacy_show") => return set_privacy(users, user, true),
            Some("privacy_hide") => return set_privacy(users, user, false),
            _ => {
                warn!("Ignoring postback {data:?} from {user_id}");
                return Ok(Vec::new());
            }
        }

        if let Some(current) = user.plan_type {
            return Ok(vec![format!(
                "您已經選擇了「{}」，目前進度為第 {} 天。",
                current.display_name(),
                user.current_day
            )]);
        }

        match param(&params, "plan").and_then(|p| p.parse::<PlanVariant>().ok()) {
            Some(variant) => self.select_plan(users, user, variant, today),
            None => Ok(vec![INVALID_PLAN_TEXT.to_string()]),
        }
    }

    fn select_plan(
        &self,
        users: &mut impl UserStore,
        mut user: User,
        variant: PlanVariant,
        today: NaiveDate,
    ) -> HandlerResult<Vec<String>> {
        user.select_plan(variant, today);
        let reading = self.reading_message(&user);
        info!("{} selected the {variant} plan", user.line_user_id);
        users.save(user)?;

        Ok(vec![
            format!(
                "太棒了！您已選擇「{}」。\n\n讓我們從今天開始吧！",
                variant.display_name()
            ),
            reading,
        ])
    }

    fn text<R: Rng + ?Sized>(
        &self,
        users: &mut impl UserStore,
        user_id: &str,
        text: &str,
        today: NaiveDate,
        rng: &mut R,
    ) -> HandlerResult<Vec<String>> {
        let user = match users.load(user_id) {
            Some(user) if user.plan_type.is_some() => user,
            maybe_user => {
                // No plan yet: a 「1」/「2」 reply picks one, anything else
                // repeats the welcome.
                let user = maybe_user.unwrap_or_else(|| User::new(user_id));
                return match PlanVariant::from_menu_choice(text) {
                    Some(variant) => self.select_plan(users, user, variant, today),
                    None => self.follow(users, user_id, None, today),
                };
            }
        };

        if REPORT_COMMANDS.contains(&text) {
            return self.report_reading(users, user, today, rng);
        }
        if STATS_COMMANDS.contains(&text) {
            let rank = user_rank(LeaderboardKind::Weekly, &users.all(), &user);
            return Ok(vec![stats_message(&user, rank)]);
        }
        if let Some(kind) = leaderboard_kind(text) {
            return Ok(vec![format_leaderboard(kind, &users.all(), &user, today)]);
        }
        match text {
            RESET_QUIZ_COMMAND => {
                let mut user = user;
                user.reset_quiz();
                users.save(user)?;
                return Ok(vec![QUIZ_RESET_TEXT.to_string()]);
            }
            RESET_PROGRESS_COMMAND => {
                let mut user = user;
                user.reset_reading_progress();
                let reading = self.reading_message(&user);
                users.save(user)?;
                return Ok(vec![PROGRESS_RESET_TEXT.to_string(), reading]);
            }
            ENCOURAGE_COMMAND => {
                let verse = random_encouraging_verse(self.bible.as_ref(), rng);
                return Ok(vec![format!("💪 {}\n\n（{}）", verse.text, verse.reference)]);
            }
            PRIVACY_COMMAND => return Ok(vec![privacy_message(&user)]),
            SHOW_IN_LEADERBOARD_COMMAND => return set_privacy(users, user, true),
            HIDE_FROM_LEADERBOARD_COMMAND => return set_privacy(users, user, false),
            TODAY_TEXT_COMMAND => {
                let text = match self.todays_reading(&user) {
                    Some(readings) => daily_reading_text(self.bible.as_ref(), &readings),
                    None => NO_READING_TODAY.to_string(),
                };
                return Ok(vec![text]);
            }
            _ => {}
        }

        if user.quiz.is_some() {
            return self.answer(users, user, text, today, rng);
        }

        Ok(vec![HELP_TEXT.to_string()])
    }

    fn report_reading<R: Rng + ?Sized>(
        &self,
        users: &mut impl UserStore,
        mut user: User,
        today: NaiveDate,
        rng: &mut R,
    ) -> HandlerResult<Vec<String>> {
        if let Some(stored) = &user.quiz {
            let pending = stored
                .quiz()
                .and_then(|quiz| quiz.validate().map(|()| quiz.current()));
            match pending {
                Ok(Some(question)) => {
                    return Ok(vec![format!(
                        "您還有未完成的測驗！\n\n{}\n\n請輸入您的答案。",
                        question.quiz_text
                    )]);
                }
                Ok(None) => warn!("Dropping finished quiz of {}", user.line_user_id),
                Err(e) => warn!("Dropping broken quiz of {}: {e}", user.line_user_id),
            }
            user.reset_quiz();
        }

        // Users behind schedule may catch up several days in one sitting.
        if user.has_read_today(today) && user.days_behind(today) == 0 {
            users.save(user)?;
            return Ok(vec![ALREADY_READ_TEXT.to_string()]);
        }

        let Some(variant) = user.plan_type else {
            return Ok(vec![PLAN_MENU_TEXT.to_string()]);
        };

        match generate_quiz(
            self.plans.as_ref(),
            self.bible.as_ref(),
            variant,
            user.current_day,
            rng,
        ) {
            Ok(quiz) => {
                let first = quiz.prompt(0).unwrap_or_default();
                user.start_quiz(quiz);
                users.save(user)?;
                Ok(vec![QUIZ_INTRO_TEXT.to_string(), first])
            }
            Err(QuizError::NoPlanFound) => {
                users.save(user)?;
                Ok(vec![NO_READING_TODAY.to_string()])
            }
            Err(e) => {
                error!("Error generating quiz for {}: {e}", user.line_user_id);
                users.save(user)?;
                Ok(vec![QUIZ_ERROR_TEXT.to_string()])
            }
        }
    }

    fn answer<R: Rng + ?Sized>(
        &self,
        users: &mut impl UserStore,
        mut user: User,
        text: &str,
        today: NaiveDate,
        rng: &mut R,
    ) -> HandlerResult<Vec<String>> {
        let Some(stored) = user.quiz.take() else {
            return Ok(vec![HELP_TEXT.to_string()]);
        };

        let answered = stored.into_quiz().and_then(|mut quiz| {
            let evaluation = evaluate_answer(&mut quiz, text, rng)?;
            Ok((quiz, evaluation))
        });
        let (quiz, evaluation) = match answered {
            Ok(answered) => answered,
            Err(e) => {
                warn!("Quiz of {} could not be answered: {e}", user.line_user_id);
                users.save(user)?;
                return Ok(vec![BROKEN_QUIZ_TEXT.to_string()]);
            }
        };

        debug!(
            "{} answered question {} of {}: {:?}",
            user.line_user_id,
            quiz.current_question_index,
            quiz.questions.len(),
            evaluation.outcome
        );
        let mut replies = evaluation.messages;
        if !evaluation.completed {
            user.start_quiz(quiz);
            users.save(user)?;
            return Ok(replies);
        }

        let days_behind = user.days_behind(today);
        let event = ReadingEvent {
            date: today,
            is_makeup: days_behind > 0,
            days_ago: days_behind,
            quiz_result: quiz.result(),
        };
        user.last_read_date = Some(today);
        user.current_day += 1;
        let outcome = add_reading_score(&mut user.progress, user.current_day, event);
        info!(
            "{} finished day {} ({:?}), +{} points",
            user.line_user_id,
            user.current_day - 1,
            event.quiz_result,
            outcome.score_earned + outcome.total_badge_reward
        );

        replies.push(format_score_message(&outcome));
        replies.push(DAY_COMPLETE_TEXT.to_string());
        replies.push(self.reading_message(&user));
        users.save(user)?;
        Ok(replies)
    }

    fn todays_reading(&self, user: &User) -> Option<String> {
        self.plans.reading_for(user.plan_type?, user.current_day)
    }

    /// The reading reminder for the user's current day.
    pub fn reading_message(&self, user: &User) -> String {
        match (user.plan_type, self.todays_reading(user)) {
            (Some(variant), Some(readings)) => {
                reading_plan_message(variant, user.current_day, &readings)
            }
            _ => NO_READING_TODAY.to_string(),
        }
    }
}

fn leaderboard_kind(text: &str) -> Option<LeaderboardKind> {
    match text {
        "排行榜" | "本週排行榜" => Some(LeaderboardKind::Weekly),
        "連續排行榜" => Some(LeaderboardKind::Streak),
        "新星榜" => Some(LeaderboardKind::Newcomer),
        "總排行榜" => Some(LeaderboardKind::Total),
        _ => None,
    }
}

fn set_privacy(
    users: &mut impl UserStore,
    mut user: User,
    show: bool,
) -> HandlerResult<Vec<String>> {
    user.show_in_leaderboard = show;
    info!("{} set leaderboard visibility to {show}", user.line_user_id);
    users.save(user)?;
    let reply = if show {
        PRIVACY_SHOWN_REPLY
    } else {
        PRIVACY_HIDDEN_REPLY
    };
    Ok(vec![reply.to_string()])
}

fn privacy_message(user: &User) -> String {
    let (description, toggle) = if user.show_in_leaderboard {
        (
            "您的名字會顯示在排行榜上，與弟兄姊妹一起見證讀經的堅持！",
            HIDE_FROM_LEADERBOARD_COMMAND,
        )
    } else {
        (
            "您的名字不會顯示在排行榜上，但您的讀經記錄仍會保留。",
            SHOW_IN_LEADERBOARD_COMMAND,
        )
    };
    format!(
        "🔒 隱私設定\n\n{}\n{description}\n\n回覆「{toggle}」即可切換。",
        privacy_status_text(user)
    )
}

fn parse_postback(data: &str) -> Vec<(&str, &str)> {
    data.split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

fn param<'a>(params: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// The stats card. `weekly_rank` is the user's place on this week's board.
pub fn stats_message(user: &User, weekly_rank: Option<usize>) -> String {
    let p = &user.progress;
    let level = star_level(p.total_score);
    let badges = if p.badges.is_empty() {
        "尚未獲得".to_string()
    } else {
        let earned: Vec<String> = p
            .milestone_achieved
            .keys()
            .filter_map(|id| badge(id))
            .map(|b| format!("\n  {} {}（{}）", b.emoji, b.name, b.description))
            .collect();
        format!("{}{}", p.badges.join(" "), earned.concat())
    };

    let mut text = format!(
        "📊 我的讀經成績\n\n{} {}\n總積分：{} 分\n本週積分：{} 分\n本月積分：{} 分\n\n🔥 目前連續：{} 天\n🏆 最長連續：{} 天\n📖 累計讀經：{} 天\n🎯 測驗全對：{}/{}（{:.0}%）\n🏅 徽章：{}\n\n目前進度：第 {} 天",
        level.stars,
        level.title,
        p.total_score,
        p.week_score,
        p.month_score,
        p.current_streak,
        p.longest_streak,
        p.total_reading_days,
        p.quiz_perfect_count,
        p.quiz_total_count,
        p.quiz_accuracy(),
        badges,
        user.current_day
    );
    if let Some(rank) = weekly_rank {
        text.push_str(&format!("\n🏆 本週排名：第 {rank} 名"));
    }
    text.push('\n');
    text.push_str(privacy_status_text(user));
    text
}
