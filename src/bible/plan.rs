use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PlanVariant {
    /// Genesis to Revelation in book order.
    Canonical,
    /// Old Testament, New Testament and Psalms/Proverbs every day.
    Balanced,
}

impl PlanVariant {
    pub fn display_name(self) -> &'static str {
        match self {
            PlanVariant::Canonical => "按卷順序計畫",
            PlanVariant::Balanced => "平衡讀經計畫",
        }
    }

    /// Maps the 「1」/「2」 menu replies to a plan.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(PlanVariant::Canonical),
            "2" => Some(PlanVariant::Balanced),
            _ => None,
        }
    }
}

impl fmt::Display for PlanVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanVariant::Canonical => write!(f, "Canonical"),
            PlanVariant::Balanced => write!(f, "Balanced"),
        }
    }
}

impl FromStr for PlanVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Canonical" => Ok(PlanVariant::Canonical),
            "Balanced" => Ok(PlanVariant::Balanced),
            other => Err(format!("unknown plan type {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReadingPlanEntry {
    pub plan_type: PlanVariant,
    pub day_number: u32,
    pub readings: String,
}

pub trait PlanStore {
    fn reading_for(&self, variant: PlanVariant, day: u32) -> Option<String>;

    /// All entries of one variant ordered by day.
    fn days(&self, variant: PlanVariant) -> Vec<ReadingPlanEntry>;
}

#[derive(Debug, Default)]
pub struct ReadingPlans {
    entries: HashMap<(PlanVariant, u32), String>,
}

impl ReadingPlans {
    pub fn new(entries: Vec<ReadingPlanEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| ((e.plan_type, e.day_number), e.readings))
                .collect(),
        }
    }

    /// Loads a JSON array of `{plan_type, day_number, readings}` records.
    pub fn from_reader(reader: impl Read) -> Result<Self, StoreError> {
        let entries: Vec<ReadingPlanEntry> = serde_json::from_reader(reader)?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl PlanStore for ReadingPlans {
    fn reading_for(&self, variant: PlanVariant, day: u32) -> Option<String> {
        self.entries.get(&(variant, day)).cloned()
    }

    fn days(&self, variant: PlanVariant) -> Vec<ReadingPlanEntry> {
        let mut days: Vec<ReadingPlanEntry> = self
            .entries
            .iter()
            .filter(|((plan_type, _), _)| *plan_type == variant)
            .map(|((plan_type, day_number), readings)| ReadingPlanEntry {
                plan_type: *plan_type,
                day_number: *day_number,
                readings: readings.clone(),
            })
            .collect();
        days.sort_by_key(|e| e.day_number);
        days
    }
}

pub const NO_READING_TODAY: &str = "今日無讀經計畫或計畫已完成。";

/// Text of the daily reading reminder, pushed each morning and attached to
/// quiz completion.
pub fn reading_plan_message(variant: PlanVariant, day: u32, readings: &str) -> String {
    format!(
        "【{} - 第 {} 天】\n\n今天的讀經範圍是：\n**{}**\n\n請您在讀完後，點擊下方選單的「回報讀經」來進行今日的經文測驗！",
        variant.display_name(),
        day,
        readings
    )
}
