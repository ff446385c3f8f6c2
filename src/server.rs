use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use log::{debug, error, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;

use crate::bible::plan::{PlanStore, PlanVariant, ReadingPlanEntry};
use crate::bible::{verses_for_reading, Verse};
use crate::bot::{Bot, BotEvent};
use crate::error::AppError;
use crate::line::{MessageContent, Messenger, WebhookBody, WebhookEvent};
use crate::push::{push_daily_readings, PushSummary};
use crate::user::{JsonFileUserStore, UserStore};

/// Shared state for every route. The user store sits behind one async mutex
/// so load-mutate-save cycles never interleave within this process. Store
/// work runs on the blocking pool with the guard moved along.
pub struct AppState<M> {
    pub bot: Arc<Bot>,
    pub users: Arc<Mutex<JsonFileUserStore>>,
    pub messenger: Arc<M>,
}

impl<M> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            bot: self.bot.clone(),
            users: self.users.clone(),
            messenger: self.messenger.clone(),
        }
    }
}

pub fn build_router<M: Messenger>(state: AppState<M>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", post(webhook::<M>))
        .route("/schedule/daily_push", post(daily_push::<M>))
        .route("/api/plans/{plan_type}", get(plan_days::<M>))
        .route("/api/verses/{reading_ref}", get(reading_verses::<M>))
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn health() -> &'static str {
    "Bible reading bot is running."
}

/// Maps a webhook event to the bot's view of it, with the reply token.
/// Events without a user id (group chats) and unsupported kinds yield `None`.
fn bot_event(event: WebhookEvent) -> Option<(Option<String>, BotEvent)> {
    match event {
        WebhookEvent::Follow {
            reply_token,
            source,
        } => Some((
            reply_token,
            BotEvent::Follow {
                user_id: source.user_id?,
                display_name: None,
            },
        )),
        WebhookEvent::Postback {
            reply_token,
            source,
            postback,
        } => Some((
            reply_token,
            BotEvent::Postback {
                user_id: source.user_id?,
                data: postback.data,
            },
        )),
        WebhookEvent::Message {
            reply_token,
            source,
            message: MessageContent::Text { text },
        } => Some((
            reply_token,
            BotEvent::Text {
                user_id: source.user_id?,
                text,
            },
        )),
        WebhookEvent::Message { .. } | WebhookEvent::Unsupported => None,
    }
}

/// Fills in the LINE display name of a new follower. A failed lookup only
/// costs the name.
async fn with_profile<M: Messenger>(messenger: &M, event: BotEvent) -> BotEvent {
    match event {
        BotEvent::Follow {
            user_id,
            display_name: None,
        } => {
            let display_name = match messenger.display_name(&user_id).await {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Profile lookup for {user_id} failed: {e}");
                    None
                }
            };
            BotEvent::Follow {
                user_id,
                display_name,
            }
        }
        other => other,
    }
}

async fn webhook<M: Messenger>(
    State(app): State<AppState<M>>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let body: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid webhook body: {e}")))?;
    debug!(
        "Webhook for {:?} with {} events",
        body.destination,
        body.events.len()
    );

    let today = today();
    for event in body.events {
        let Some((reply_token, event)) = bot_event(event) else {
            continue;
        };

        let event = with_profile(app.messenger.as_ref(), event).await;

        // The store rewrites its file on save; keep that off the async workers.
        let mut users = app.users.clone().lock_owned().await;
        let bot = app.bot.clone();
        let handled = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::from_entropy();
            bot.handle(&mut *users, event, today, &mut rng)
        })
        .await;
        let replies = match handled {
            Ok(Ok(replies)) => replies,
            Ok(Err(e)) => {
                error!("Error handling webhook event: {e}");
                continue;
            }
            Err(e) => {
                error!("Webhook handler task failed: {e}");
                continue;
            }
        };

        match reply_token {
            Some(token) if !replies.is_empty() => {
                if let Err(e) = app.messenger.reply(&token, &replies).await {
                    warn!("Reply failed: {e}");
                }
            }
            _ => {}
        }
    }

    Ok("OK")
}

#[derive(Debug, serde::Serialize)]
struct PushResponse {
    status: &'static str,
    #[serde(flatten)]
    summary: PushSummary,
}

async fn daily_push<M: Messenger>(State(app): State<AppState<M>>) -> Json<PushResponse> {
    let users = app.users.lock().await.all();
    let summary = push_daily_readings(&app.bot, &users, app.messenger.as_ref(), today()).await;
    Json(PushResponse {
        status: "success",
        summary,
    })
}

async fn plan_days<M: Messenger>(
    State(app): State<AppState<M>>,
    Path(plan_type): Path<String>,
) -> Result<Json<Vec<ReadingPlanEntry>>, AppError> {
    let variant: PlanVariant = plan_type.parse().map_err(AppError::BadRequest)?;
    let days = app.bot.plans().days(variant);
    if days.is_empty() {
        return Err(AppError::NotFound(format!("no reading plan for {variant}")));
    }
    Ok(Json(days))
}

async fn reading_verses<M: Messenger>(
    State(app): State<AppState<M>>,
    Path(reading_ref): Path<String>,
) -> Result<Json<Vec<Verse>>, AppError> {
    let verses = verses_for_reading(app.bot.bible(), &reading_ref);
    if verses.is_empty() {
        return Err(AppError::NotFound(format!("no verses for {reading_ref}")));
    }
    Ok(Json(verses))
}
