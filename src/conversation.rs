use crate::model::Call;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConversationState {
    pub(crate) empathy_score: u32,
    pub(crate) current_index: usize,
    pub(crate) call_count: usize,
    pub(crate) is_complete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Selection {
    pub(crate) advanced: bool,
    pub(crate) correct: bool,
    pub(crate) call: Option<Call>,
    pub(crate) next_call: Option<Call>,
    pub(crate) empathy_score: u32,
}

pub(crate) struct ConversationEngine {
    deck: Vec<Call>,
    current_index: usize,
    empathy_score: u32,
}

impl ConversationEngine {
    pub(crate) fn new(deck: Vec<Call>) -> Self {
        Self {
            deck,
            current_index: 0,
            empathy_score: 0,
        }
    }

    pub(crate) fn current_call(&self) -> Option<&Call> {
        self.deck.get(self.current_index)
    }

    pub(crate) fn call_count(&self) -> usize {
        self.deck.len()
    }

    pub(crate) fn state(&self) -> ConversationState {
        ConversationState {
            empathy_score: self.empathy_score,
            current_index: self.current_index,
            call_count: self.deck.len(),
            is_complete: self.current_index >= self.deck.len(),
        }
    }

    /// Answers the current call. Any index is accepted: one that does not name
    /// an option counts as a wrong answer, and the deck advances either way.
    /// Calls without options are left in place.
    pub(crate) fn choose_option(&mut self, option_index: i64) -> Selection {
        let Some(call) = self.current_call().filter(|c| !c.options.is_empty()) else {
            return Selection {
                advanced: false,
                correct: false,
                call: None,
                next_call: None,
                empathy_score: self.empathy_score,
            };
        };
        let call = call.clone();

        let correct = usize::try_from(option_index)
            .ok()
            .and_then(|i| call.options.get(i))
            .map(|o| o.correct)
            .unwrap_or(false);

        if correct {
            self.empathy_score += 1;
        }
        self.current_index += 1;

        Selection {
            advanced: true,
            correct,
            call: Some(call),
            next_call: self.current_call().cloned(),
            empathy_score: self.empathy_score,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current_index = 0;
        self.empathy_score = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBundle;
    use crate::deck::generate_call_deck;

    fn engine() -> ConversationEngine {
        let bundle = ContentBundle::builtin().expect("builtin content");
        ConversationEngine::new(generate_call_deck(&bundle, None))
    }

    fn assert_score_invariant(e: &ConversationEngine) {
        let s = e.state();
        assert!(s.empathy_score as usize <= s.current_index, "{s:?}");
        assert!(s.current_index <= s.call_count, "{s:?}");
    }

    #[test]
    fn correct_answers_score_and_advance() {
        let mut e = engine();
        let first = e.current_call().cloned().expect("first call");

        let sel = e.choose_option(0);
        assert!(sel.advanced);
        assert!(sel.correct);
        assert_eq!(sel.empathy_score, 1);
        assert_eq!(sel.call.as_ref().map(|c| c.id.as_str()), Some(first.id.as_str()));
        assert_eq!(
            sel.next_call.as_ref().map(|c| c.id.clone()),
            e.current_call().map(|c| c.id.clone())
        );
        assert_eq!(e.state().current_index, 1);
    }

    #[test]
    fn out_of_range_choices_count_as_wrong_and_still_advance() {
        let mut e = engine();
        for idx in [-1_i64, 3, 99, i64::MAX] {
            let before = e.state().current_index;
            let sel = e.choose_option(idx);
            assert!(sel.advanced);
            assert!(!sel.correct, "index {idx}");
            assert_eq!(e.state().current_index, before + 1);
            assert_eq!(e.state().empathy_score, 0);
        }
    }

    #[test]
    fn score_never_outruns_progress() {
        let mut e = engine();
        let picks = [0_i64, 1, 0, 7, 0, 2, 0, 0, 0];
        for p in picks {
            e.choose_option(p);
            assert_score_invariant(&e);
        }
    }

    #[test]
    fn completion_and_reset_keep_the_deck() {
        let mut e = engine();
        let ids: Vec<String> = (0..e.call_count())
            .map(|i| e.deck[i].id.clone())
            .collect();
        while !e.state().is_complete {
            e.choose_option(0);
        }
        assert!(e.current_call().is_none());
        assert_eq!(e.state().empathy_score as usize, e.call_count());

        let after = e.choose_option(0);
        assert!(!after.advanced, "complete engine does not move");
        assert_eq!(e.state().current_index, e.call_count());

        e.reset();
        let s = e.state();
        assert_eq!((s.current_index, s.empathy_score), (0, 0));
        assert_eq!(e.call_count(), ids.len());
        let replay: Vec<String> = e.deck.iter().map(|c| c.id.clone()).collect();
        assert_eq!(replay, ids);
    }

    #[test]
    fn calls_without_options_do_not_mutate_state() {
        let mut e = engine();
        e.deck[0].options.clear();
        let sel = e.choose_option(0);
        assert!(!sel.advanced);
        assert!(sel.call.is_none());
        assert_eq!(e.state().current_index, 0);
    }

    #[test]
    fn empty_deck_is_immediately_complete() {
        let mut e = ConversationEngine::new(Vec::new());
        assert!(e.state().is_complete);
        assert!(e.current_call().is_none());
        assert!(!e.choose_option(0).advanced);
    }
}
