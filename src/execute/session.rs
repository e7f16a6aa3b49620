//! Bookkeeping for bracketed compilation sessions.

use indexmap::IndexSet;

use super::ActionError;
use crate::action::Session;

/// Sessions currently open during execution.
#[derive(Debug, Default)]
pub(crate) struct SessionTracker {
    open: IndexSet<Session>,
}

impl SessionTracker {
    pub(crate) fn open(&mut self, session: &Session) -> Result<(), ActionError> {
        if self.open.insert(session.clone()) {
            Ok(())
        } else {
            Err(ActionError::SessionOverlap {
                language: session.language.clone(),
            })
        }
    }

    pub(crate) fn close(&mut self, session: &Session) -> Result<(), ActionError> {
        if self.open.shift_remove(session) {
            Ok(())
        } else {
            Err(ActionError::SessionNotOpen {
                language: session.language.clone(),
            })
        }
    }

    pub(crate) fn into_unclosed(self) -> Vec<Session> {
        self.open.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn session(name: &str) -> Session {
        Session {
            language: Language::new(name),
        }
    }

    #[test]
    fn same_language_sessions_cannot_overlap() {
        let mut tracker = SessionTracker::default();
        tracker.open(&session("cxx")).expect("first open");
        let err = tracker.open(&session("cxx")).expect_err("overlap");
        assert!(matches!(err, ActionError::SessionOverlap { .. }));
    }

    #[test]
    fn different_languages_are_independent() {
        let mut tracker = SessionTracker::default();
        tracker.open(&session("cxx")).expect("open cxx");
        tracker.open(&session("python")).expect("open python");
        tracker.close(&session("cxx")).expect("close cxx");
        assert_eq!(tracker.into_unclosed(), vec![session("python")]);
    }

    #[test]
    fn closing_an_unopened_session_fails() {
        let mut tracker = SessionTracker::default();
        let err = tracker.close(&session("cxx")).expect_err("not open");
        assert!(matches!(err, ActionError::SessionNotOpen { .. }));
    }
}
