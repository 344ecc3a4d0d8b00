//! `kiosk run`
//!
//! Seeds an in-memory store with the survey, activates it through the admin
//! console and presents it until input ends. Aggregate results are printed
//! as JSON on exit.

use crate::input::{self, Input};
use crate::render;
use crate::survey_file;
use crate::RunArgs;
use anyhow::{Context, Result};
use kiosk_admin::{AdminConsole, SurveyResults};
use kiosk_cache::MokaQueryCache;
use kiosk_core::{KioskConfig, MemoryGateway, NewSurvey, SharedGateway, StoredResponse};
use kiosk_session::{load_active_definition, responses_key, CoordinatedSink, KioskSession};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Run the kiosk on stdin/stdout
///
/// # Errors
/// Fails on unreadable files, invalid configuration or surveys, and I/O errors.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let survey = survey_file::load(&args.survey)?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    match run_kiosk(survey, &config, stdin, &mut stdout).await? {
        Some(results) => {
            let json = serde_json::to_string_pretty(&results).context("serializing results")?;
            writeln!(stdout, "{json}")?;
        }
        None => writeln!(stdout, "No active survey")?,
    }
    Ok(())
}

/// Configuration file (or defaults) with command line overrides applied
///
/// # Errors
/// Fails if the file cannot be loaded or the result has zero timings.
pub fn resolve_config(args: &RunArgs) -> Result<KioskConfig> {
    let mut config = match &args.config {
        Some(path) => KioskConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => KioskConfig::new(),
    };
    if let Some(ms) = args.inactivity_ms {
        config = config.with_inactivity_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.completion_ms {
        config = config.with_completion_display(Duration::from_millis(ms));
    }
    if let Some(seed) = args.seed {
        config = config.with_shuffle_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

/// Drive one kiosk from `input` until it ends or reads `quit`.
///
/// Returns `None` when no survey ended up active.
///
/// # Errors
/// Fails if the survey is invalid or the output cannot be written.
pub async fn run_kiosk<R, W>(
    survey: NewSurvey,
    config: &KioskConfig,
    input: R,
    out: &mut W,
) -> Result<Option<SurveyResults>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let gateway: SharedGateway = Arc::new(MemoryGateway::new());
    let console = AdminConsole::new(Arc::clone(&gateway), &config.cache);
    let form_id = console.create(survey).await?;
    console.activate(&form_id).await?;

    let definitions = MokaQueryCache::new(config.cache.max_capacity);
    let Some(definition) = load_active_definition(&definitions, Arc::clone(&gateway)).await?
    else {
        return Ok(None);
    };
    let form_id = definition.id.clone();
    let title = definition.title.clone();

    let responses = Arc::new(MokaQueryCache::<Vec<StoredResponse>>::new(config.cache.max_capacity));
    let sink = Arc::new(CoordinatedSink::new(
        Arc::clone(&gateway),
        responses,
        &form_id,
        config.cache.invalidate_on_settled,
    ));
    tracing::debug!(query_key = %responses_key(&form_id), "submitting through coordinator");

    let (handle, task) = KioskSession::spawn(definition, &config.session, sink.clone());
    let mut views = handle.subscribe();
    out.write_all(render::screen(&title, &views.borrow_and_update()).as_bytes())?;

    let mut lines = input.lines();
    let mut awaiting_answer = false;
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                awaiting_answer = false;
                let view = views.borrow_and_update().clone();
                out.write_all(render::screen(&title, &view).as_bytes())?;
                out.flush()?;
            }
            line = lines.next_line(), if !awaiting_answer => {
                let Some(line) = line.context("reading input")? else {
                    break;
                };
                match input::parse_line(&line, &handle.view()) {
                    Input::Answer(answer_id) => {
                        handle.answer(answer_id).await?;
                        awaiting_answer = true;
                    }
                    Input::Activity => handle.activity().await?,
                    Input::Reset => handle.reset().await?,
                    Input::Quit => break,
                    Input::Unrecognized(text) => {
                        writeln!(out, "? unrecognised input {text:?}")?;
                        handle.activity().await?;
                    }
                }
            }
        }
    }

    drop(handle);
    task.await.context("session task")?;
    sink.flush().await;

    Ok(console.results(&form_id).await?)
}
