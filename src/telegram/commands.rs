//! Telegram command parsing and help text.

use teloxide::types::BotCommand;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Register {
        first_name: String,
        last_name: String,
        student_id: String,
        course: String,
        degree: Option<String>,
    },
    Join,
    Leave,
    Queue,
    Hours(String),
    RoomOpen(String),
    RoomJoin(String),
    RoomLeave,
    RoomList,
    Accept(String),
    Start(String),
    End,
    Next,
    Stop,
    Move(usize, usize),
    Swap(usize, usize),
    Kick(usize),
    Clear,
    /// Recognised command with missing or malformed arguments; carries usage.
    Usage(&'static str),
    Unknown,
}

impl Command {
    /// Whether only configured tutors may run this command.
    pub fn tutor_only(&self) -> bool {
        matches!(
            self,
            Command::Start(_)
                | Command::End
                | Command::Next
                | Command::Stop
                | Command::Move(..)
                | Command::Swap(..)
                | Command::Kick(_)
                | Command::Clear
        )
    }

    /// Parse a message. `None` if it is not a command at all.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let mut parts = text.split_whitespace();
        let head = parts.next().unwrap_or("");
        // Group chats address commands as /cmd@botname.
        let cmd = head.split('@').next().unwrap_or(head);
        let args: Vec<&str> = parts.collect();

        let command = match cmd {
            "/help" => Command::Help,
            "/register" => match args.as_slice() {
                [first, last, student_id, course] | [first, last, student_id, course, _] => {
                    Command::Register {
                        first_name: first.to_string(),
                        last_name: last.to_string(),
                        student_id: student_id.to_string(),
                        course: course.to_string(),
                        degree: args.get(4).map(|d| d.to_string()),
                    }
                }
                _ => Command::Usage("/register <first> <last> <student id> <course> [degree]"),
            },
            "/join" => Command::Join,
            "/leave" => Command::Leave,
            "/queue" => Command::Queue,
            "/hours" => match args.first() {
                Some(course) => Command::Hours(course.to_string()),
                None => Command::Usage("/hours <course>"),
            },
            "/room" => match args.as_slice() {
                ["open", name] => Command::RoomOpen(name.to_string()),
                ["join", name] => Command::RoomJoin(name.to_string()),
                ["leave"] => Command::RoomLeave,
                [] | ["list"] => Command::RoomList,
                _ => Command::Usage("/room [list|open <name>|join <name>|leave]"),
            },
            "/accept" => match args.first() {
                Some(token) => Command::Accept(token.to_string()),
                None => Command::Usage("/accept <invite>"),
            },
            "/start" => match args.first() {
                Some(course) => Command::Start(course.to_string()),
                None => Command::Usage("/start <course>"),
            },
            "/end" => Command::End,
            "/next" => Command::Next,
            "/stop" => Command::Stop,
            "/move" => match positions(&args) {
                Some((from, to)) => Command::Move(from, to),
                None => Command::Usage("/move <from> <to>"),
            },
            "/swap" => match positions(&args) {
                Some((a, b)) => Command::Swap(a, b),
                None => Command::Usage("/swap <position> <position>"),
            },
            "/kick" => match args.first().and_then(|p| p.parse().ok()) {
                Some(position) => Command::Kick(position),
                None => Command::Usage("/kick <position>"),
            },
            "/clear" => Command::Clear,
            _ => Command::Unknown,
        };
        Some(command)
    }
}

fn positions(args: &[&str]) -> Option<(usize, usize)> {
    match args {
        [a, b] => Some((a.parse().ok()?, b.parse().ok()?)),
        _ => None,
    }
}

/// Commands advertised in the Telegram client menu.
pub fn menu() -> Vec<BotCommand> {
    vec![
        BotCommand::new("help", "Show help"),
        BotCommand::new("register", "Create or update your profile"),
        BotCommand::new("join", "Join your course queue"),
        BotCommand::new("leave", "Leave your course queue"),
        BotCommand::new("queue", "Show your course queue"),
        BotCommand::new("hours", "Show tutoring hours for a course"),
        BotCommand::new("room", "List, open, join or leave rooms"),
        BotCommand::new("accept", "Accept a tutor's invite"),
        BotCommand::new("start", "Start a tutoring session"),
        BotCommand::new("end", "End your tutoring session"),
        BotCommand::new("next", "Find the next ready student"),
        BotCommand::new("stop", "Cancel the running search"),
    ]
}

pub const HELP_TEXT: &str = r#"TutorQueue Commands:

Students:
/register <first> <last> <student id> <course> [degree] - Create or update your profile
/join - Join your course queue
/leave - Leave your course queue
/queue - Show your course queue
/hours <course> - Show tutoring hours
/room [list|open <name>|join <name>|leave] - Study rooms
/accept <invite> - Accept a tutor's invite

Tutors:
/start <course> - Start a tutoring session
/end - End your tutoring session
/next - Ask students in order until one is ready
/stop - Cancel the running search
/move <from> <to> - Move a student
/swap <a> <b> - Swap two students
/kick <position> - Remove a student
/clear - Empty the queue
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_register() {
        assert_eq!(
            Command::parse("/register ada lovelace S1 222").unwrap(),
            Command::Register {
                first_name: "ada".to_string(),
                last_name: "lovelace".to_string(),
                student_id: "S1".to_string(),
                course: "222".to_string(),
                degree: None,
            }
        );
        assert!(matches!(
            Command::parse("/register ada lovelace S1 222 PGS").unwrap(),
            Command::Register { degree: Some(d), .. } if d == "PGS"
        ));
        assert!(matches!(Command::parse("/register ada").unwrap(), Command::Usage(_)));
    }

    #[test]
    fn test_positions() {
        assert_eq!(Command::parse("/swap 1 5").unwrap(), Command::Swap(1, 5));
        assert_eq!(Command::parse("/move@tutorbot 3 1").unwrap(), Command::Move(3, 1));
        assert!(matches!(Command::parse("/kick -1").unwrap(), Command::Usage(_)));
        assert!(matches!(Command::parse("/swap 1").unwrap(), Command::Usage(_)));
    }

    #[test]
    fn test_room() {
        assert_eq!(Command::parse("/room").unwrap(), Command::RoomList);
        assert_eq!(
            Command::parse("/room open Desk-1").unwrap(),
            Command::RoomOpen("Desk-1".to_string())
        );
        assert!(matches!(Command::parse("/room open").unwrap(), Command::Usage(_)));
    }

    #[test]
    fn test_tutor_only() {
        assert!(Command::parse("/next").unwrap().tutor_only());
        assert!(Command::parse("/clear").unwrap().tutor_only());
        assert!(!Command::parse("/join").unwrap().tutor_only());
        assert_eq!(Command::parse("/bogus").unwrap(), Command::Unknown);
    }
}
