//! Task and time handlers
//!
//! Both features wait on taskwarrior/timewarrior integration. Until the
//! argument mapping to those tools exists they only print a notice and
//! succeed, whatever arguments they are given.

/// Actions the task feature will support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    List,
    Add,
}

impl TaskAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list" => Some(Self::List),
            "add" => Some(Self::Add),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Add => "add",
        }
    }
}

/// Actions the time feature will support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAction {
    Start,
    Stop,
    Summary,
}

impl TimeAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Summary => "summary",
        }
    }
}

/// Notice printed by `pm task ...`
pub fn task_notice(args: &[String]) -> String {
    match args.first().and_then(|a| TaskAction::from_name(a)) {
        Some(action) => format!(
            "Task {} functionality - integrate with taskwarrior (not yet implemented)",
            action.as_str()
        ),
        None => "Task management is not yet implemented - pending taskwarrior integration"
            .to_string(),
    }
}

/// Notice printed by `pm time ...`
pub fn time_notice(args: &[String]) -> String {
    match args.first().and_then(|a| TimeAction::from_name(a)) {
        Some(action) => format!(
            "Time {} functionality - integrate with timewarrior (not yet implemented)",
            action.as_str()
        ),
        None => "Time tracking is not yet implemented - pending timewarrior integration"
            .to_string(),
    }
}
