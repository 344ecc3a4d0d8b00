//! `kiosk validate`

use crate::survey_file;
use crate::ValidateArgs;
use anyhow::{Context, Result};

/// Check a survey file, failing on the first authoring violation
///
/// # Errors
/// Fails if the file cannot be read or parsed, or breaks an authoring rule.
pub fn execute(args: &ValidateArgs) -> Result<()> {
    let survey = survey_file::load(&args.survey)?;
    survey
        .validate()
        .with_context(|| format!("{} is not a valid survey", args.survey.display()))?;
    println!(
        "ok: \"{}\" ({} questions{})",
        survey.title,
        survey.questions.len(),
        if survey.randomize { ", randomized" } else { "" }
    );
    Ok(())
}
