//! CLI commands for TutorQueue using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{get_settings_path, load_settings_from, Settings};
use crate::core::{CourseCode, Registry};
use crate::logging::LogOptions;
use crate::services::roster::{JsonRoster, RosterStore};
use crate::services::schedule::Schedule;

/// TutorQueue - course waitlists and tutor-driven ready checks over Telegram.
#[derive(Parser)]
#[command(name = "tutorqueue")]
#[command(version = "0.1.0")]
#[command(about = "TutorQueue - tutoring queue bot", long_about = None)]
pub struct Commands {
    /// Settings file (defaults to ~/.tutorqueue/settings.json)
    #[arg(long, global = true, env = "TUTORQUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level for tutorqueue, or a full filter directive
    #[arg(long, global = true, env = "TUTORQUEUE_LOG")]
    pub log_level: Option<String>,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Telegram bot in the foreground
    Start,

    /// List configured courses
    Courses,

    /// Show tutoring hours for a course
    Hours {
        /// Course code or number, e.g. EGR222 or 222
        course: String,
    },

    /// List registered students
    Roster,

    /// Validate the settings file
    ConfigCheck,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        let settings = self.settings()?;
        match &self.command {
            Command::Start => cmd_start(settings).await,
            Command::Courses => cmd_courses(&settings),
            Command::Hours { course } => cmd_hours(&settings, course),
            Command::Roster => cmd_roster(&settings),
            Command::ConfigCheck => cmd_config_check(&settings),
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            level: self.log_level.clone(),
            json: self.json_logs,
            dir: None,
        }
    }

    fn settings(&self) -> Result<Settings> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => get_settings_path()?,
        };
        Ok(load_settings_from(&path)?)
    }
}

// Command implementations

async fn cmd_start(settings: Settings) -> Result<()> {
    println!("Starting TutorQueue bot...");
    crate::telegram::run_telegram_daemon(settings).await?;
    println!("TutorQueue stopped.");
    Ok(())
}

fn cmd_courses(settings: &Settings) -> Result<()> {
    if settings.courses.is_empty() {
        println!("No courses configured.");
        return Ok(());
    }
    println!("Courses:");
    for course in &settings.courses {
        let code = CourseCode::new(&course.code);
        let shifts: usize = settings
            .schedule_for(code.as_str())
            .map(|week| week.values().map(Vec::len).sum())
            .unwrap_or(0);
        println!("  {} - {} ({} shifts/week)", code, course.title, shifts);
    }
    Ok(())
}

fn cmd_hours(settings: &Settings, course: &str) -> Result<()> {
    let registry = Registry::from_settings(settings);
    let code = registry
        .resolve_course(course)
        .ok_or_else(|| anyhow::anyhow!("Unknown course: {}", course))?;
    let week = settings.schedule_for(code.as_str()).cloned().unwrap_or_default();
    let schedule = Schedule::new(code, &week);
    println!("{}", schedule.title());
    println!("{}", schedule.render());
    Ok(())
}

fn cmd_roster(settings: &Settings) -> Result<()> {
    let roster = JsonRoster::new(settings.roster.resolve_path()?);
    let records = roster.load()?;
    println!("Roster: {} ({} students)", roster.path().display(), records.len());
    for record in records {
        let course = record
            .course
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} {} [{}] {} {}",
            record.id, record.first_name, record.last_name, record.student_id, course, record.degree
        );
    }
    Ok(())
}

fn cmd_config_check(settings: &Settings) -> Result<()> {
    println!("Settings OK");
    println!("  courses: {}", settings.courses.len());
    println!("  tutors: {}", settings.telegram.tutor_ids.len());
    println!(
        "  confirmation timeout: {}s",
        settings.matchmaking.confirmation_timeout_secs
    );
    if settings.telegram.bot_token.is_none() {
        println!("  warning: no telegram bot token, `start` will fail");
    }
    if settings.telegram.announcement_chat_id.is_none() {
        println!("  warning: no announcement chat, queue boards will not be posted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours() {
        let cli = Commands::try_parse_from(["tutorqueue", "hours", "222"]).unwrap();
        assert!(matches!(cli.command, Command::Hours { ref course } if course == "222"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_global_config() {
        let cli =
            Commands::try_parse_from(["tutorqueue", "config-check", "--config", "/tmp/s.json"])
                .unwrap();
        assert!(matches!(cli.command, Command::ConfigCheck));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_log_options() {
        let cli = Commands::try_parse_from(["tutorqueue", "start", "--log-level", "trace", "--json-logs"])
            .unwrap();
        let options = cli.log_options();
        assert_eq!(options.level.as_deref(), Some("trace"));
        assert!(options.json);
    }
}
