//! Post-processing of raw model output.
//!
//! Lines that leak the prompt template ("Contexto:", "Pregunta:", ...) are
//! dropped, runs of blank lines are collapsed, and, unless contacts are
//! allowed, phone-like digit runs are replaced with a pointer to the official
//! directory.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// Replacement for redacted phone numbers
pub const CONTACT_PLACEHOLDER: &str = "[consultar directorio oficial]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    DropLine,
    /// Only applied when contact redaction is on
    DropLineWhenRedacting,
}

struct LineRule {
    pattern: Regex,
    action: RuleAction,
}

impl LineRule {
    fn new(pattern: &str, action: RuleAction) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| panic!("invalid sanitizer pattern {:?}: {}", pattern, e));
        Self { pattern, action }
    }

    /// Case-sensitive variant
    fn exact(pattern: &str, action: RuleAction) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid sanitizer pattern {:?}: {}", pattern, e));
        Self { pattern, action }
    }

    fn applies(&self, redact_contacts: bool) -> bool {
        match self.action {
            RuleAction::DropLine => true,
            RuleAction::DropLineWhenRedacting => redact_contacts,
        }
    }
}

lazy_static! {
    static ref LINE_RULES: Vec<LineRule> = vec![
        LineRule::new(r"^\s*fuentes?\s*:", RuleAction::DropLine),
        LineRule::new(r"^\s*tiempo\s*:", RuleAction::DropLine),
        LineRule::new(r"^\s*contexto\s*:", RuleAction::DropLine),
        LineRule::new(r"^\s*pregunta\s*:", RuleAction::DropLine),
        LineRule::new(r"^\s*respuesta\s*:", RuleAction::DropLine),
        LineRule::new(r"estructura\s+sugerida", RuleAction::DropLine),
        LineRule::new(r"si no hay provincia", RuleAction::DropLine),
        LineRule::new(r"ahora responde", RuleAction::DropLine),
        LineRule::new(r"respuesta estructurada", RuleAction::DropLine),
        // Placeholder tokens the model copies from examples
        LineRule::exact(r"XXXX", RuleAction::DropLine),
        LineRule::new(r"^\s*tel", RuleAction::DropLineWhenRedacting),
    ];
    static ref BLANK_RUN: Regex = Regex::new(r"\n{3,}").unwrap_or_else(|e| panic!("{}", e));
    static ref PHONE_LIKE: Regex =
        Regex::new(r"\+?\d[\d\s().-]{7,}\d").unwrap_or_else(|e| panic!("{}", e));
}

#[derive(Debug, Clone, Copy)]
pub struct AnswerSanitizer {
    redact_contacts: bool,
}

impl Default for AnswerSanitizer {
    fn default() -> Self {
        Self { redact_contacts: true }
    }
}

impl AnswerSanitizer {
    pub fn new(redact_contacts: bool) -> Self {
        Self { redact_contacts }
    }

    pub fn redacts_contacts(&self) -> bool {
        self.redact_contacts
    }

    pub fn clean(&self, raw_text: &str) -> String {
        if raw_text.is_empty() {
            return String::new();
        }

        let kept: Vec<&str> = raw_text
            .lines()
            .filter(|line| {
                !LINE_RULES
                    .iter()
                    .any(|rule| rule.applies(self.redact_contacts) && rule.pattern.is_match(line))
            })
            .collect();

        let joined = kept.join("\n");
        let cleaned = BLANK_RUN.replace_all(joined.trim(), "\n\n");

        if self.redact_contacts {
            PHONE_LIKE.replace_all(&cleaned, CONTACT_PLACEHOLDER).into_owned()
        } else {
            cleaned.into_owned()
        }
    }
}
