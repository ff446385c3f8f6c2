use chrono::NaiveDate;
use log::{info, warn};

use crate::bot::Bot;
use crate::line::Messenger;
use crate::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PushSummary {
    pub pushed_count: usize,
    pub failed_count: usize,
}

/// Sends each enrolled user who has not read today their reading reminder.
/// Users are pushed one at a time; a failed push is logged and counted, and
/// the run carries on.
pub async fn push_daily_readings<M: Messenger>(
    bot: &Bot,
    users: &[User],
    messenger: &M,
    today: NaiveDate,
) -> PushSummary {
    let mut summary = PushSummary::default();

    for user in users {
        if user.plan_type.is_none() || user.has_read_today(today) {
            continue;
        }

        let message = bot.reading_message(user);
        match messenger.push(&user.line_user_id, &[message]).await {
            Ok(()) => summary.pushed_count += 1,
            Err(e) => {
                warn!("Daily push to {} failed: {e}", user.line_user_id);
                summary.failed_count += 1;
            }
        }
    }

    info!(
        "Daily push for {today}: {} sent, {} failed",
        summary.pushed_count, summary.failed_count
    );
    summary
}
