//! Editable copy of a generated draft.
//!
//! The session follows the same shape as the rest of the core: messages go
//! into a pure [`update`] function and come back out as effects for the caller
//! to execute. Destructive actions never apply directly; they park a
//! [`PendingAction`] and ask for confirmation first.

pub const REGENERATE_PROMPT: &str = "You have unsaved edits. Re-generate and lose changes?";
pub const CLEAR_PROMPT: &str = "Clear the draft? This cannot be undone.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Regenerate,
    Clear,
}

impl PendingAction {
    pub fn prompt(self) -> &'static str {
        match self {
            PendingAction::Regenerate => REGENERATE_PROMPT,
            PendingAction::Clear => CLEAR_PROMPT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMsg {
    /// A fresh generation result arrived.
    DraftDelivered(String),
    /// User replaced the editor contents.
    Edited(String),
    RegenerateRequested,
    ClearRequested,
    /// Answer to the last `ConfirmationRequired` effect.
    ConfirmationAnswered(bool),
    CopyRequested,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEffect {
    ConfirmationRequired {
        action: PendingAction,
        prompt: &'static str,
    },
    /// Caller should submit the last request to the job runner again.
    Regenerate,
    CopyToClipboard(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditView {
    pub text: String,
    pub dirty: bool,
    pub words: usize,
    pub chars: usize,
    pub pending: Option<PendingAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditSession {
    original_text: String,
    current_text: String,
    dirty: bool,
    pending: Option<PendingAction>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pending(&self) -> Option<PendingAction> {
        self.pending
    }

    pub fn word_count(&self) -> usize {
        self.current_text.split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.current_text.chars().count()
    }

    pub fn view(&self) -> EditView {
        EditView {
            text: self.current_text.clone(),
            dirty: self.dirty,
            words: self.word_count(),
            chars: self.char_count(),
            pending: self.pending,
        }
    }

    pub fn start(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.original_text = text.clone();
        self.current_text = text;
        self.dirty = false;
        self.pending = None;
    }

    pub fn edit(&mut self, text: impl Into<String>) {
        self.current_text = text.into();
        self.recompute_dirty();
    }

    /// Returns true when the caller should go ahead and regenerate.
    pub fn request_regenerate(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        self.drive(EditMsg::RegenerateRequested, confirm)
            .contains(&EditEffect::Regenerate)
    }

    /// Returns true when the draft was cleared.
    pub fn request_clear(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        let before = self.current_text.is_empty();
        self.drive(EditMsg::ClearRequested, confirm);
        !before && self.current_text.is_empty()
    }

    fn drive(&mut self, msg: EditMsg, confirm: impl FnOnce(&str) -> bool) -> Vec<EditEffect> {
        let (next, effects) = update(std::mem::take(self), msg);
        *self = next;
        let prompt = match effects.first() {
            Some(EditEffect::ConfirmationRequired { prompt, .. }) => *prompt,
            _ => return effects,
        };
        let answer = confirm(prompt);
        let (next, effects) = update(std::mem::take(self), EditMsg::ConfirmationAnswered(answer));
        *self = next;
        effects
    }

    fn recompute_dirty(&mut self) {
        self.dirty = self.current_text != self.original_text;
    }
}

/// Pure update function: applies a message to the session and returns effects.
pub fn update(mut session: EditSession, msg: EditMsg) -> (EditSession, Vec<EditEffect>) {
    let effects = match msg {
        EditMsg::DraftDelivered(text) => {
            session.start(text);
            Vec::new()
        }
        EditMsg::Edited(text) => {
            session.edit(text);
            Vec::new()
        }
        EditMsg::RegenerateRequested => {
            if session.dirty {
                ask(&mut session, PendingAction::Regenerate)
            } else {
                vec![EditEffect::Regenerate]
            }
        }
        EditMsg::ClearRequested => {
            if session.current_text.trim().is_empty() {
                Vec::new()
            } else {
                ask(&mut session, PendingAction::Clear)
            }
        }
        EditMsg::ConfirmationAnswered(accepted) => match session.pending.take() {
            None => Vec::new(),
            Some(_) if !accepted => Vec::new(),
            Some(PendingAction::Regenerate) => vec![EditEffect::Regenerate],
            Some(PendingAction::Clear) => {
                session.edit(String::new());
                Vec::new()
            }
        },
        EditMsg::CopyRequested => {
            if session.current_text.is_empty() {
                Vec::new()
            } else {
                vec![EditEffect::CopyToClipboard(session.current_text.clone())]
            }
        }
        EditMsg::NoOp => Vec::new(),
    };

    (session, effects)
}

fn ask(session: &mut EditSession, action: PendingAction) -> Vec<EditEffect> {
    session.pending = Some(action);
    vec![EditEffect::ConfirmationRequired {
        action,
        prompt: action.prompt(),
    }]
}
