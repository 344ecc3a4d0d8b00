//! Terminal input lines

use kiosk_core::AnswerId;
use kiosk_session::SessionView;

/// What a typed line means for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Pick an answer of the current question
    Answer(AnswerId),
    /// Presence only
    Activity,
    /// Force a fresh session
    Reset,
    /// Stop the kiosk
    Quit,
    /// Not understood; still counts as presence
    Unrecognized(String),
}

/// Interpret one line against what is on screen. Answers are numbered from 1.
#[must_use]
pub fn parse_line(line: &str, view: &SessionView) -> Input {
    let line = line.trim();
    match line {
        "" => return Input::Activity,
        "reset" => return Input::Reset,
        "quit" | "exit" => return Input::Quit,
        _ => {}
    }

    let picked = line
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| view.question.as_ref()?.answers.get(index));
    match picked {
        Some(answer) => Input::Answer(answer.id.clone()),
        None => Input::Unrecognized(line.to_string()),
    }
}
