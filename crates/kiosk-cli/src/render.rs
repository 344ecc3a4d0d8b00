//! Plain-text kiosk screen

use kiosk_session::{Phase, SessionView};
use std::fmt::Write;

/// Render the screen for a session view
#[must_use]
pub fn screen(title: &str, view: &SessionView) -> String {
    let mut out = String::new();
    match (view.phase, &view.question) {
        (Phase::Active, Some(question)) => {
            let _ = writeln!(out, "== {title} ==  [{}/{}]", view.position + 1, view.total);
            let _ = writeln!(out, "{}", question.text);
            for (n, answer) in question.answers.iter().enumerate() {
                let _ = writeln!(out, "  {}) {}", n + 1, answer.display_label());
            }
        }
        (Phase::Completed, _) => {
            let _ = writeln!(out, "Thank you for your feedback!");
        }
        _ => {}
    }
    out
}
