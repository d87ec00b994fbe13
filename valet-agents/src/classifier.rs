//! Intent classification for user-facing text.
//!
//! The coordinator and the task manager both need to decide what a piece of
//! free text is asking for before any model call happens. Classification is
//! deliberately cheap: a fixed table of case-insensitive patterns checked in
//! order, first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// INTENT
// ============================================================================

/// What a piece of user text is asking the system to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Create a new personal task
    AddTask,
    /// List the known personal tasks
    ListTasks,
    /// Mark a personal task as done
    CompleteTask,
    /// Summarize a conversation
    Summarize,
    /// Look something up
    Research,
    /// Hand the work to whichever agent fits
    Delegate,
    /// Chit-chat with no actionable request
    SmallTalk,
    /// Nothing matched
    Unknown,
}

impl Intent {
    /// Stable name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AddTask => "add_task",
            Intent::ListTasks => "list_tasks",
            Intent::CompleteTask => "complete_task",
            Intent::Summarize => "summarize",
            Intent::Research => "research",
            Intent::Delegate => "delegate",
            Intent::SmallTalk => "small_talk",
            Intent::Unknown => "unknown",
        }
    }

    /// Capability an agent must advertise to serve this intent.
    ///
    /// `Delegate` and `Unknown` have no fixed owner; the coordinator decides
    /// those case by case.
    pub fn capability(&self) -> Option<&'static str> {
        match self {
            Intent::AddTask | Intent::ListTasks | Intent::CompleteTask => Some("tasks"),
            Intent::Research => Some("research"),
            Intent::Summarize | Intent::SmallTalk => Some("chat"),
            Intent::Delegate | Intent::Unknown => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Maps free text to an `Intent`.
pub trait IntentClassifier: Send + Sync {
    /// Classify one piece of text. Never fails; unmatched text is `Unknown`.
    fn classify(&self, content: &str) -> Intent;
}

/// Ordered pattern table; earlier rows win over later ones.
static PATTERNS: Lazy<Vec<(Regex, Intent)>> = Lazy::new(|| {
    let table: &[(&str, Intent)] = &[
        (
            r"(?i)\b(add|create|new|remind me to|remember to)\b.*\b(task|todo|reminder)\b|\b(remind me to|remember to)\b",
            Intent::AddTask,
        ),
        (
            r"(?i)\b(list|show|what are|see)\b.*\b(tasks|todos|reminders)\b",
            Intent::ListTasks,
        ),
        (
            r"(?i)\b(complete|done with|finish(ed)?|mark off|check off)\b.*\b(task|todo)?\b",
            Intent::CompleteTask,
        ),
        (
            r"(?i)\b(summari[sz]e|recap|sum up)\b",
            Intent::Summarize,
        ),
        (
            r"(?i)\b(research|look up|find out|investigate|search for)\b",
            Intent::Research,
        ),
        (
            r"(?i)\b(delegate|hand (this|it) (off|over)|assign)\b",
            Intent::Delegate,
        ),
        (
            r"(?i)\b(hi|hello|hey|thanks|thank you|good (morning|evening|night))\b",
            Intent::SmallTalk,
        ),
    ];

    table
        .iter()
        .map(|(pattern, intent)| (Regex::new(pattern).expect("Invalid intent regex"), *intent))
        .collect()
});

/// Keyword classifier backed by the static pattern table.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create a classifier.
    pub fn new() -> Self {
        Self
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, content: &str) -> Intent {
        for (pattern, intent) in PATTERNS.iter() {
            if pattern.is_match(content) {
                return *intent;
            }
        }
        Intent::Unknown
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(content: &str) -> Intent {
        KeywordClassifier::new().classify(content)
    }

    #[test]
    fn test_task_intents() {
        assert_eq!(classify("add a task to buy milk"), Intent::AddTask);
        assert_eq!(classify("remind me to call mom"), Intent::AddTask);
        assert_eq!(classify("list my tasks"), Intent::ListTasks);
        assert_eq!(classify("show me the todos"), Intent::ListTasks);
        assert_eq!(classify("I'm done with the groceries"), Intent::CompleteTask);
        assert_eq!(classify("mark off the laundry task"), Intent::CompleteTask);
    }

    #[test]
    fn test_conversation_intents() {
        assert_eq!(classify("summarize our conversation"), Intent::Summarize);
        assert_eq!(classify("can you recap what we said"), Intent::Summarize);
        assert_eq!(classify("hello there"), Intent::SmallTalk);
        assert_eq!(classify("thanks a lot"), Intent::SmallTalk);
    }

    #[test]
    fn test_research_and_delegate() {
        assert_eq!(classify("research the best flights to Lisbon"), Intent::Research);
        assert_eq!(classify("look up the weather tomorrow"), Intent::Research);
        assert_eq!(classify("delegate this to someone"), Intent::Delegate);
    }

    #[test]
    fn test_unknown_fallthrough() {
        assert_eq!(classify(""), Intent::Unknown);
        assert_eq!(classify("qwerty asdf"), Intent::Unknown);
    }

    #[test]
    fn test_first_match_wins() {
        // "add ... task" also contains "search"-free research words; the
        // earlier AddTask row must take precedence.
        assert_eq!(classify("add a task to look up hotels"), Intent::AddTask);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("ADD A TASK to stretch"), Intent::AddTask);
        assert_eq!(classify("SUMMARIZE this"), Intent::Summarize);
    }

    #[test]
    fn test_capability_mapping() {
        assert_eq!(Intent::AddTask.capability(), Some("tasks"));
        assert_eq!(Intent::ListTasks.capability(), Some("tasks"));
        assert_eq!(Intent::CompleteTask.capability(), Some("tasks"));
        assert_eq!(Intent::Research.capability(), Some("research"));
        assert_eq!(Intent::Summarize.capability(), Some("chat"));
        assert_eq!(Intent::SmallTalk.capability(), Some("chat"));
        assert_eq!(Intent::Delegate.capability(), None);
        assert_eq!(Intent::Unknown.capability(), None);
    }

    #[test]
    fn test_every_pattern_compiles_and_fires() {
        // Touching the lazy table forces compilation of every row.
        assert_eq!(PATTERNS.len(), 7);
        for (pattern, _) in PATTERNS.iter() {
            assert!(!pattern.as_str().is_empty());
        }
    }
}
