//! Terminal front end for the draft edit session.
//!
//! Line commands are turned into `EditMsg`s and fed through the pure
//! `update_edit` function; the effects it returns (confirm, regenerate, copy)
//! are executed here and fed back as further messages.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use anyhow::Result;
use drafter_core::{update_edit, DraftError, EditEffect, EditMsg, EditSession};
use drafter_engine::SendReceipt;
use drafter_logging::drafter_debug;

/// Remote operations the editor needs while a draft is open.
pub trait DraftActions {
    /// Runs the previous request again and returns the new text.
    fn regenerate(&mut self) -> Result<String, DraftError>;

    fn send(&mut self, text: &str) -> Result<SendReceipt, DraftError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    Show,
    Edit,
    Regenerate,
    Clear,
    Copy,
    Send,
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Option<EditorCommand> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "" | "p" | "show" => EditorCommand::Show,
        "e" | "edit" => EditorCommand::Edit,
        "r" | "regenerate" => EditorCommand::Regenerate,
        "c" | "clear" => EditorCommand::Clear,
        "y" | "copy" => EditorCommand::Copy,
        "s" | "send" => EditorCommand::Send,
        "q" | "quit" => EditorCommand::Quit,
        "h" | "?" | "help" => EditorCommand::Help,
        _ => return None,
    };
    Some(command)
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    Sent(SendReceipt),
    Closed { text: String },
}

const HELP: &str = "commands: [p]rint  [e]dit  [r]egenerate  [c]lear  cop[y]  [s]end  [q]uit";
const END_OF_TEXT: &str = ".";

pub struct Editor<R, W, A> {
    input: R,
    output: W,
    actions: A,
    session: EditSession,
}

impl<R: BufRead, W: Write, A: DraftActions> Editor<R, W, A> {
    pub fn new(input: R, output: W, actions: A) -> Self {
        Self {
            input,
            output,
            actions,
            session: EditSession::new(),
        }
    }

    pub fn run(mut self, draft: String) -> Result<EditorOutcome> {
        self.dispatch(EditMsg::DraftDelivered(draft))?;
        self.show()?;
        writeln!(self.output, "{HELP}")?;

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                break;
            };
            let Some(command) = parse_command(&line) else {
                writeln!(self.output, "unknown command `{}`; {HELP}", line.trim())?;
                continue;
            };
            match command {
                EditorCommand::Show => self.show()?,
                EditorCommand::Help => writeln!(self.output, "{HELP}")?,
                EditorCommand::Edit => {
                    let text = self.read_block()?;
                    self.dispatch(EditMsg::Edited(text))?;
                    self.show()?;
                }
                EditorCommand::Regenerate => {
                    self.dispatch(EditMsg::RegenerateRequested)?;
                    self.show()?;
                }
                EditorCommand::Clear => {
                    self.dispatch(EditMsg::ClearRequested)?;
                    self.show()?;
                }
                EditorCommand::Copy => self.dispatch(EditMsg::CopyRequested)?,
                EditorCommand::Send => {
                    if let Some(receipt) = self.send()? {
                        return Ok(EditorOutcome::Sent(receipt));
                    }
                }
                EditorCommand::Quit => break,
            }
        }

        Ok(EditorOutcome::Closed {
            text: self.session.current_text().to_string(),
        })
    }

    fn dispatch(&mut self, msg: EditMsg) -> Result<()> {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            drafter_debug!("edit message {:?}", msg);
            let (next, effects) = update_edit(std::mem::take(&mut self.session), msg);
            self.session = next;
            for effect in effects {
                match effect {
                    EditEffect::ConfirmationRequired { prompt, .. } => {
                        write!(self.output, "{prompt} [y/N] ")?;
                        self.output.flush()?;
                        let answer = self.read_line()?.is_some_and(|line| is_yes(&line));
                        inbox.push_back(EditMsg::ConfirmationAnswered(answer));
                    }
                    EditEffect::Regenerate => {
                        writeln!(self.output, "regenerating...")?;
                        match self.actions.regenerate() {
                            Ok(text) => inbox.push_back(EditMsg::DraftDelivered(text)),
                            Err(err) => self.report(&err)?,
                        }
                    }
                    EditEffect::CopyToClipboard(text) => {
                        writeln!(self.output, "{text}")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn send(&mut self) -> Result<Option<SendReceipt>> {
        let text = self.session.current_text().to_string();
        match self.actions.send(&text) {
            Ok(receipt) => {
                writeln!(self.output, "sent.")?;
                Ok(Some(receipt))
            }
            Err(err) => {
                self.report(&err)?;
                Ok(None)
            }
        }
    }

    fn report(&mut self, err: &DraftError) -> Result<()> {
        writeln!(self.output, "error: {err}")?;
        if err.needs_reconnect() {
            writeln!(self.output, "run `drafter auth` to reconnect the mail account")?;
        }
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let view = self.session.view();
        writeln!(self.output, "----")?;
        writeln!(self.output, "{}", view.text)?;
        writeln!(
            self.output,
            "---- {} words, {} chars{}",
            view.words,
            view.chars,
            if view.dirty { ", edited" } else { "" }
        )?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Reads replacement text up to a line holding a single `.`.
    fn read_block(&mut self) -> Result<String> {
        writeln!(
            self.output,
            "enter the new text; finish with a line containing only `{END_OF_TEXT}`"
        )?;
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line == END_OF_TEXT {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct FakeActions {
        regenerations: Vec<String>,
        sent: Vec<String>,
        send_error: Option<DraftError>,
    }

    impl DraftActions for &mut FakeActions {
        fn regenerate(&mut self) -> Result<String, DraftError> {
            let text = format!("take {}", self.regenerations.len() + 2);
            self.regenerations.push(text.clone());
            Ok(text)
        }

        fn send(&mut self, text: &str) -> Result<SendReceipt, DraftError> {
            if let Some(err) = self.send_error.clone() {
                return Err(err);
            }
            self.sent.push(text.to_string());
            Ok(SendReceipt {
                thread_id: "t1".to_string(),
                message_id: None,
            })
        }
    }

    fn run(script: &str, actions: &mut FakeActions) -> (EditorOutcome, String) {
        let mut output = Vec::new();
        let outcome = Editor::new(Cursor::new(script.to_string()), &mut output, actions)
            .run("take 1".to_string())
            .unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn commands_parse_by_letter_or_word() {
        assert_eq!(parse_command(" E "), Some(EditorCommand::Edit));
        assert_eq!(parse_command("regenerate"), Some(EditorCommand::Regenerate));
        assert_eq!(parse_command(""), Some(EditorCommand::Show));
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn clean_draft_regenerates_without_asking() {
        let mut actions = FakeActions::default();
        let (outcome, output) = run("r\nq\n", &mut actions);

        assert_eq!(actions.regenerations, vec!["take 2"]);
        assert!(!output.contains("[y/N]"));
        assert_eq!(
            outcome,
            EditorOutcome::Closed {
                text: "take 2".to_string()
            }
        );
    }

    #[test]
    fn declining_keeps_the_edits() {
        let mut actions = FakeActions::default();
        let (outcome, output) = run("e\nmy words\n.\nr\nn\nq\n", &mut actions);

        assert!(output.contains("unsaved edits"));
        assert!(actions.regenerations.is_empty());
        assert_eq!(
            outcome,
            EditorOutcome::Closed {
                text: "my words".to_string()
            }
        );
    }

    #[test]
    fn confirmed_clear_then_edit_then_send() {
        let mut actions = FakeActions::default();
        let (outcome, _) = run("c\ny\ne\nSee you Tuesday.\n.\ns\n", &mut actions);

        assert_eq!(actions.sent, vec!["See you Tuesday."]);
        assert!(matches!(outcome, EditorOutcome::Sent(_)));
    }

    #[test]
    fn unauthorized_send_suggests_reconnect_and_stays_open() {
        let mut actions = FakeActions {
            send_error: Some(DraftError::Unauthorized),
            ..FakeActions::default()
        };
        let (outcome, output) = run("s\nq\n", &mut actions);

        assert!(output.contains("drafter auth"));
        assert_eq!(
            outcome,
            EditorOutcome::Closed {
                text: "take 1".to_string()
            }
        );
    }

    #[test]
    fn end_of_input_closes_the_editor() {
        let mut actions = FakeActions::default();
        let (outcome, _) = run("", &mut actions);
        assert_eq!(
            outcome,
            EditorOutcome::Closed {
                text: "take 1".to_string()
            }
        );
    }
}
