use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::bible::plan::PlanVariant;
use crate::error::StoreError;
use crate::quiz::{Quiz, StoredQuiz};
use crate::scoring::UserProgress;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub line_user_id: String,
    /// LINE profile name, refreshed on follow.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "shown")]
    pub show_in_leaderboard: bool,
    #[serde(default)]
    pub joined_date: Option<NaiveDate>,
    #[serde(default)]
    pub plan_type: Option<PlanVariant>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub current_day: u32,
    #[serde(default)]
    pub last_read_date: Option<NaiveDate>,
    /// The running quiz, if any. `None` means the user is idle.
    #[serde(default)]
    pub quiz: Option<StoredQuiz>,
    #[serde(default)]
    pub progress: UserProgress,
}

impl User {
    pub fn new(line_user_id: impl Into<String>) -> Self {
        Self {
            line_user_id: line_user_id.into(),
            display_name: None,
            show_in_leaderboard: true,
            joined_date: None,
            plan_type: None,
            start_date: None,
            current_day: 1,
            last_read_date: None,
            quiz: None,
            progress: UserProgress::default(),
        }
    }

    pub fn select_plan(&mut self, variant: PlanVariant, today: NaiveDate) {
        self.joined_date.get_or_insert(today);
        self.plan_type = Some(variant);
        self.start_date = Some(today);
        self.current_day = 1;
    }

    /// The plan day the calendar says the user should be reading today.
    pub fn scheduled_day(&self, today: NaiveDate) -> Option<u32> {
        let start = self.start_date?;
        let elapsed = (today - start).num_days();
        u32::try_from(elapsed + 1).ok()
    }

    /// How many plan days the user is behind the calendar. Zero when on
    /// schedule or ahead of it.
    pub fn days_behind(&self, today: NaiveDate) -> u32 {
        self.scheduled_day(today)
            .map_or(0, |scheduled| scheduled.saturating_sub(self.current_day))
    }

    pub fn has_read_today(&self, today: NaiveDate) -> bool {
        self.last_read_date == Some(today)
    }

    /// The date the user joined, falling back to the plan start for records
    /// written before the join date was kept.
    pub fn joined(&self) -> Option<NaiveDate> {
        self.joined_date.or(self.start_date)
    }

    pub fn start_quiz(&mut self, quiz: Quiz) {
        self.quiz = Some(StoredQuiz::Running(quiz));
    }

    pub fn reset_quiz(&mut self) {
        self.quiz = None;
    }

    pub fn reset_reading_progress(&mut self) {
        self.current_day = 1;
        self.last_read_date = None;
        self.quiz = None;
    }
}

fn shown() -> bool {
    true
}

/// Whole-record persistence for users: load, mutate, save. Saving replaces
/// the stored record; there is no version check between load and save.
pub trait UserStore {
    fn load(&self, line_user_id: &str) -> Option<User>;

    fn save(&mut self, user: User) -> Result<(), StoreError>;

    fn all(&self) -> Vec<User>;
}

/// Keeps every user in memory and rewrites one JSON file on each save.
#[derive(Debug)]
pub struct JsonFileUserStore {
    path: PathBuf,
    users: BTreeMap<String, User>,
}

impl JsonFileUserStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let users = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.users)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl UserStore for JsonFileUserStore {
    fn load(&self, line_user_id: &str) -> Option<User> {
        self.users.get(line_user_id).cloned()
    }

    fn save(&mut self, user: User) -> Result<(), StoreError> {
        self.users.insert(user.line_user_id.clone(), user);
        self.flush()
    }

    fn all(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryUserStore {
    users: BTreeMap<String, User>,
}

#[cfg(test)]
impl UserStore for MemoryUserStore {
    fn load(&self, line_user_id: &str) -> Option<User> {
        self.users.get(line_user_id).cloned()
    }

    fn save(&mut self, user: User) -> Result<(), StoreError> {
        self.users.insert(user.line_user_id.clone(), user);
        Ok(())
    }

    fn all(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }
}
