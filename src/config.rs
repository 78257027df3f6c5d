//! Configuration loading for TutorQueue.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Get the TutorQueue home directory (~/.tutorqueue).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".tutorqueue"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.tutorqueue/settings.json
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load and validate settings from an explicit path.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Create it with at least one course.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.matchmaking.confirmation_timeout_secs == 0 {
        return Err(Error::Config(
            "matchmaking.confirmation_timeout_secs must be greater than zero".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for course in &settings.courses {
        let code = course.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(Error::Config("course code must not be empty".to_string()));
        }
        if !seen.insert(code.clone()) {
            return Err(Error::Config(format!("duplicate course code '{}'", code)));
        }
    }

    for (code, week) in &settings.schedule {
        if !seen.contains(&code.to_uppercase()) {
            return Err(Error::Config(format!(
                "schedule references unknown course '{}'",
                code
            )));
        }
        for (day, shifts) in week {
            for shift in shifts {
                let start = parse_clock(&shift.start)?;
                let end = parse_clock(&shift.end)?;
                if end <= start {
                    return Err(Error::Config(format!(
                        "{} {}: shift for {} ends before it starts",
                        code, day, shift.tutor
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Parse a 24-hour "HH:MM" clock time.
pub fn parse_clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| Error::Config(format!("invalid time '{}': {}", value, e)))
}

/// Telegram transport configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Chat the queue board and session announcements are posted to.
    pub announcement_chat_id: Option<i64>,
    /// Users allowed to run tutor and admin commands.
    #[serde(default)]
    pub tutor_ids: Vec<u64>,
}

/// An offered course.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CourseConfig {
    pub code: String,
    #[serde(default)]
    pub title: String,
}

/// Matchmaking tuning.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MatchmakingConfig {
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

fn default_confirmation_timeout_secs() -> u64 {
    15
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

/// One tutor's shift on a given weekday.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Shift {
    pub tutor: String,
    #[serde(default)]
    pub location: String,
    /// 24-hour "HH:MM".
    pub start: String,
    /// 24-hour "HH:MM".
    pub end: String,
}

/// Weekday name ("Monday") to that day's shifts.
pub type WeekSchedule = BTreeMap<String, Vec<Shift>>;

/// Roster persistence configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RosterConfig {
    pub path: Option<PathBuf>,
}

impl RosterConfig {
    /// Resolve the roster file, defaulting to ~/.tutorqueue/roster.json.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_home_dir()?.join("roster.json")),
        }
    }
}

/// TutorQueue settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub courses: Vec<CourseConfig>,

    #[serde(default)]
    pub matchmaking: MatchmakingConfig,

    /// Course code to weekly schedule.
    #[serde(default)]
    pub schedule: HashMap<String, WeekSchedule>,

    #[serde(default)]
    pub roster: RosterConfig,
}

impl Settings {
    /// Schedule for a course code, matched case-insensitively.
    pub fn schedule_for(&self, code: &str) -> Option<&WeekSchedule> {
        self.schedule
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(code))
            .map(|(_, v)| v)
    }

    pub fn is_tutor(&self, user_id: u64) -> bool {
        self.telegram.tutor_ids.contains(&user_id)
    }
}
