//! Bounded context window.
//!
//! Every outbound request carries at most the last N prior turns plus the new
//! user turn, regardless of how long the conversation has grown.

use nextstep_core::{Error, LabeledTurn, Result, Turn};

/// Default number of prior turns sent with each request.
pub const DEFAULT_CONTEXT_TURNS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    max_turns: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_TURNS)
    }
}

impl ContextWindow {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// The last `max_turns` of `history`, followed by the new user turn.
    ///
    /// The new text is trimmed; blank text is rejected.
    pub fn build(&self, history: &[Turn], new_user_text: &str) -> Result<Vec<Turn>> {
        let user = Turn::user(new_user_text)
            .map_err(|_| Error::InvalidInput("message must not be empty".into()))?;

        let start = history.len().saturating_sub(self.max_turns);
        let mut turns = Vec::with_capacity(history.len() - start + 1);
        turns.extend_from_slice(&history[start..]);
        turns.push(user);
        Ok(turns)
    }

    /// Like [`build`](Self::build), for history in free-form labeled shape.
    ///
    /// The window is taken first, then blank turns inside it are dropped, so a
    /// window full of blanks yields fewer than `max_turns` prior turns.
    pub fn build_labeled(&self, history: &[LabeledTurn], new_user_text: &str) -> Result<Vec<Turn>> {
        let start = history.len().saturating_sub(self.max_turns);
        let prior: Vec<Turn> = history[start..]
            .iter()
            .filter_map(LabeledTurn::to_turn)
            .collect();
        self.build(&prior, new_user_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextstep_core::Role;

    fn history(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("q{i}")).unwrap()
                } else {
                    Turn::assistant(format!("a{i}")).unwrap()
                }
            })
            .collect()
    }

    #[test]
    fn short_history_is_sent_whole() {
        let window = ContextWindow::default();
        let turns = window.build(&history(3), "next").unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].text(), "q0");
    }

    #[test]
    fn long_history_is_truncated_to_most_recent() {
        let window = ContextWindow::default();
        let turns = window.build(&history(30), "next").unwrap();
        assert_eq!(turns.len(), DEFAULT_CONTEXT_TURNS + 1);
        assert_eq!(turns[0].text(), "q18");
        assert_eq!(turns[11].text(), "a29");
    }

    #[test]
    fn last_turn_is_trimmed_user_text() {
        let window = ContextWindow::new(4);
        let turns = window.build(&history(10), "  what next?  \n").unwrap();
        let last = turns.last().unwrap();
        assert_eq!(last.role(), Role::User);
        assert_eq!(last.text(), "what next?");
    }

    #[test]
    fn blank_input_is_rejected() {
        let window = ContextWindow::default();
        let err = window.build(&history(2), " \t\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn labeled_history_maps_roles_and_drops_blanks() {
        let window = ContextWindow::default();
        let history = vec![
            LabeledTurn::new("system", "be nice"),
            LabeledTurn::new("  Assistant ", "hello"),
            LabeledTurn::new("assistant", "   "),
            LabeledTurn::new("model", "hi"),
        ];
        let turns = window.build_labeled(&history, "go").unwrap();
        let roles: Vec<Role> = turns.iter().map(|t| t.role()).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::User]
        );
        assert!(turns.iter().all(|t| !t.text().trim().is_empty()));
    }

    #[test]
    fn labeled_window_is_taken_before_filtering() {
        let window = ContextWindow::new(2);
        let history = vec![
            LabeledTurn::new("user", "old"),
            LabeledTurn::new("assistant", ""),
            LabeledTurn::new("user", "recent"),
        ];
        let turns = window.build_labeled(&history, "now").unwrap();
        let texts: Vec<&str> = turns.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["recent", "now"]);
    }
}
