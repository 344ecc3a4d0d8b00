//! Scripted terminal sessions

use kiosk_cli::commands::run::run_kiosk;
use kiosk_core::KioskConfig;
use kiosk_test_utils::new_survey;
use pretty_assertions::assert_eq;

fn config() -> KioskConfig {
    KioskConfig::new().with_shuffle_seed(1)
}

#[tokio::test(start_paused = true)]
async fn scripted_session_produces_results() {
    let script: &[u8] = b"1\n2\n";
    let mut screen = Vec::new();

    let results = run_kiosk(new_survey("Lunch", 2), &config(), script, &mut screen)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(results.total_completed, 1);
    assert_eq!(results.total_partial, 0);
    let picks: Vec<_> = results
        .questions
        .iter()
        .map(|q| q.answers.iter().map(|a| a.count).collect::<Vec<_>>())
        .collect();
    assert_eq!(picks, vec![vec![1, 0], vec![0, 1]]);

    let screen = String::from_utf8(screen).unwrap();
    assert!(screen.contains("== Lunch ==  [1/2]"));
    assert!(screen.contains("Thank you for your feedback!"));
}

#[tokio::test(start_paused = true)]
async fn quit_mid_session_submits_nothing() {
    let script: &[u8] = b"1\nquit\n2\n";
    let mut screen = Vec::new();

    let results = run_kiosk(new_survey("Lunch", 2), &config(), script, &mut screen)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(results.total_responses(), 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_input_is_reported() {
    let script: &[u8] = b"banana\n\nreset\n";
    let mut screen = Vec::new();

    run_kiosk(new_survey("Lunch", 1), &config(), script, &mut screen)
        .await
        .unwrap();

    let screen = String::from_utf8(screen).unwrap();
    assert!(screen.contains("? unrecognised input \"banana\""));
}

#[tokio::test]
async fn invalid_survey_rejected() {
    let mut screen = Vec::new();
    let err = run_kiosk(new_survey("Lunch", 0), &config(), &b""[..], &mut screen)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no questions"));
}
