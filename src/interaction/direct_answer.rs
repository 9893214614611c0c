//! Keyword-triggered canned responses, consulted before any generation.
//!
//! Rules are evaluated in declaration order and the first match wins, which
//! keeps operationally sensitive topics (room booking, payroll) on
//! deterministic, generation-independent answers.

use serde::Deserialize;

/// One canned-response rule: any keyword hit returns the reply.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DirectAnswerRule {
    pub keywords: Vec<String>,
    pub reply: String,
}

/// Ordered rule table.
#[derive(Debug, Clone, Default)]
pub struct DirectAnswerTable {
    rules: Vec<DirectAnswerRule>,
}

impl DirectAnswerTable {
    pub fn new(rules: Vec<DirectAnswerRule>) -> Self {
        Self { rules }
    }

    /// First rule with any keyword appearing as a substring of the query.
    /// Matching is case-sensitive.
    pub fn lookup(&self, query: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|keyword| query.contains(keyword.as_str())))
            .map(|rule| rule.reply.as_str())
    }
}

/// Built-in rule table, used when the configuration provides none.
pub fn default_rules() -> Vec<DirectAnswerRule> {
    vec![DirectAnswerRule {
        keywords: vec!["meeting room".to_string(), "room booking".to_string(), "book a room".to_string()],
        reply: "📌 Meeting rooms are booked through the office manager, not through me.\nPing the #office-ops channel and someone will sort you out.".to_string(),
    }]
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DirectAnswerTable {
        DirectAnswerTable::new(vec![
            DirectAnswerRule {
                keywords: vec!["room".to_string()],
                reply: "ask the office manager".to_string(),
            },
            DirectAnswerRule {
                keywords: vec!["meeting room".to_string()],
                reply: "never reached".to_string(),
            },
            DirectAnswerRule {
                keywords: vec!["payroll".to_string(), "salary".to_string()],
                reply: "ask the people team".to_string(),
            },
        ])
    }

    #[test]
    fn first_matching_rule_wins() {
        assert_eq!(table().lookup("how do I book a meeting room?"), Some("ask the office manager"));
    }

    #[test]
    fn any_keyword_matches() {
        assert_eq!(table().lookup("when is salary paid?"), Some("ask the people team"));
        assert_eq!(table().lookup("question about payroll taxes"), Some("ask the people team"));
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(table().lookup("where is the coffee machine?"), None);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(table().lookup("PAYROLL question"), None);
    }
}
