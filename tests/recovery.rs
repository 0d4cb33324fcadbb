//! Recovery procedures, rows-per-page setup and dialog closing against a
//! scripted page.
//!
//! Each error is injected into one session call; the tests then check what the
//! recovery did to the page (reloads, navigations, scripts) and how the
//! attempt was recorded.

mod helpers;

use dnscrypt_refresh::error_handling::{ErrorCategory, RecoveryAction, RecoveryStats, SessionError};
use dnscrypt_refresh::extract::{close_surface, CloseMethod, Orchestrator};
use dnscrypt_refresh::initialization::prepare_page;
use dnscrypt_refresh::models::{AttemptOutcome, ExtractionReport, ServerReference};
use dnscrypt_refresh::recovery::{
    select_all_rows, ConnectivityCheck, ErrorRecovery, StaticConnectivity, ALL_ROWS_OPTIONS,
    FRAMEWORK_READY_SCRIPT, ROWS_PER_PAGE_DROPDOWNS, SCRIPT_PAGINATION, SELECT_ALL_ROWS_SCRIPT,
};
use dnscrypt_refresh::session::{ActivationMethod, Key, Locator};
use dnscrypt_refresh::ExtractionSettings;
use helpers::{fast_settings, ElementId, FakeSession, PAGE_URL};

async fn extract_with(
    session: &FakeSession,
    settings: &ExtractionSettings,
    stats: &RecoveryStats,
    connectivity: &dyn ConnectivityCheck,
    name: &str,
) -> Result<ExtractionReport, SessionError> {
    let recovery = ErrorRecovery::new(session, connectivity, settings, stats);
    let orchestrator = Orchestrator::new(session, recovery, settings);
    orchestrator.run(&ServerReference::new(name)).await
}

/// A server row whose first activation fails with `error`.
fn page_failing_once(error: SessionError) -> FakeSession {
    let session = FakeSession::new();
    session.add_server_row("fast-dns", "Address: 1.2.3.4 DNSCrypt");
    session.fail_next("activate", error);
    session
}

/// Adds a Vuetify 2 rows-per-page dropdown whose menu offers "All".
fn add_rows_dropdown(session: &FakeSession) -> (ElementId, ElementId) {
    let (_, vuetify2) = ROWS_PER_PAGE_DROPDOWNS[1];
    let dropdown = session.add_element(&[Locator::css(vuetify2[0])], "10", true);
    let option = session.add_element(&[Locator::xpath(ALL_ROWS_OPTIONS[1])], "All", false);
    session.link(dropdown, option, None);
    (dropdown, option)
}

fn picked_all_rows(session: &FakeSession, dropdown: ElementId, option: ElementId) -> bool {
    let activations = session.activations();
    activations.contains(&(dropdown, ActivationMethod::PointerClick))
        && activations.contains(&(option, ActivationMethod::NativeClick))
}

#[tokio::test]
async fn test_rate_limit_waits_without_reloading() {
    let session = page_failing_once(SessionError::Command("429 Too Many Requests".to_string()));
    let (dropdown, option) = add_rows_dropdown(&session);
    let settings = fast_settings(3);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("a rate limit is not a fatal error");

    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::RecoveredRetry(ErrorCategory::RateLimited)
    );
    assert!(report.record.is_some());
    assert_eq!(session.reloads(), 0);
    assert!(session.navigations().is_empty());
    assert_eq!(stats.succeeded_with(RecoveryAction::WaitedOutRateLimit), 1);
    // The table was never reset, so it is left as it is
    assert!(!picked_all_rows(&session, dropdown, option));
}

#[tokio::test]
async fn test_network_error_renavigates_when_online() {
    let session = page_failing_once(SessionError::Command(
        "net::ERR_NAME_NOT_RESOLVED network error".to_string(),
    ));
    let settings = fast_settings(3);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("a network error is not a fatal error");

    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::RecoveredRetry(ErrorCategory::TransientNetwork)
    );
    assert!(report.record.is_some());
    assert_eq!(session.navigations(), vec![PAGE_URL.to_string()]);
    assert_eq!(session.reloads(), 0);
    assert_eq!(stats.succeeded_with(RecoveryAction::Renavigated), 1);
}

#[tokio::test]
async fn test_network_error_while_offline_does_not_navigate() {
    let session = page_failing_once(SessionError::Command("connection timeout".to_string()));
    let settings = fast_settings(2);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(false), "fast-dns")
        .await
        .expect("a network error is not a fatal error");

    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::FatalError {
            category: ErrorCategory::TransientNetwork,
            ..
        }
    ));
    assert!(session.navigations().is_empty());
    assert_eq!(session.reloads(), 0);
    assert_eq!(stats.failed_count(ErrorCategory::TransientNetwork), 1);
    // The retry loop still gets its second attempt
    assert_eq!(report.attempt_count(), 2);
    assert!(report.record.is_some());
}

#[tokio::test]
async fn test_script_fault_needs_the_app_to_mount_again() {
    let session = page_failing_once(SessionError::Script("t.open is not a function".to_string()));
    session.set_app_mounted(false);
    let settings = fast_settings(2);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("a script fault is not a fatal error");

    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::FatalError {
            category: ErrorCategory::ScriptFault,
            ..
        }
    ));
    assert_eq!(session.reloads(), 1);
    assert!(session
        .scripts()
        .iter()
        .any(|s| s == FRAMEWORK_READY_SCRIPT));
    assert_eq!(stats.failed_count(ErrorCategory::ScriptFault), 1);
    assert_eq!(stats.recovered_count(ErrorCategory::ScriptFault), 0);
}

#[tokio::test]
async fn test_script_fault_recovers_once_the_app_is_mounted() {
    let session = page_failing_once(SessionError::Script("Uncaught TypeError".to_string()));
    let settings = fast_settings(2);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("a script fault is not a fatal error");

    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::RecoveredRetry(ErrorCategory::ScriptFault)
    );
    assert_eq!(session.reloads(), 1);
    assert_eq!(stats.succeeded_with(RecoveryAction::ScriptReinitialized), 1);
}

#[tokio::test]
async fn test_unclassified_error_waits_and_reloads() {
    let session = page_failing_once(SessionError::Command(
        "element click intercepted".to_string(),
    ));
    let settings = fast_settings(3);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("an unclassified error is not a fatal error");

    assert_eq!(
        report.attempts[0].outcome,
        AttemptOutcome::RecoveredRetry(ErrorCategory::Unclassified)
    );
    assert!(report.record.is_some());
    assert_eq!(session.reloads(), 1);
    assert!(session.navigations().is_empty());
    assert_eq!(stats.succeeded_with(RecoveryAction::GenericReload), 1);
}

#[tokio::test]
async fn test_reload_is_followed_by_showing_all_rows() {
    let session = page_failing_once(SessionError::Command(
        "element click intercepted".to_string(),
    ));
    let (dropdown, option) = add_rows_dropdown(&session);
    let settings = fast_settings(3);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("an unclassified error is not a fatal error");

    assert!(report.record.is_some());
    assert!(picked_all_rows(&session, dropdown, option));
}

#[tokio::test]
async fn test_lost_session_while_showing_all_rows_propagates() {
    let session = page_failing_once(SessionError::Command(
        "element click intercepted".to_string(),
    ));
    session.fail_next(
        "eval_bool",
        SessionError::SessionLost("chrome not reachable".to_string()),
    );
    let settings = fast_settings(3);
    let stats = RecoveryStats::new();

    let err = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect_err("a lost session must abort the extraction");

    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_prepare_page_opens_the_page_and_shows_all_rows() {
    let session = FakeSession::new();
    let (dropdown, option) = add_rows_dropdown(&session);
    let settings = ExtractionSettings::without_delays();

    prepare_page(&session, PAGE_URL, &settings)
        .await
        .expect("page should be prepared");

    assert_eq!(session.navigations(), vec![PAGE_URL.to_string()]);
    assert!(picked_all_rows(&session, dropdown, option));
    // The dropdown worked, so no script was needed
    assert!(!session.scripts().iter().any(|s| s == SELECT_ALL_ROWS_SCRIPT));
}

#[tokio::test]
async fn test_prepare_page_fails_when_the_page_never_loads() {
    let session = FakeSession::new();
    session.set_ready_state("loading");
    let settings = ExtractionSettings::without_delays();

    let err = prepare_page(&session, PAGE_URL, &settings)
        .await
        .expect_err("an unfinished page must fail");

    assert!(err.to_string().contains(PAGE_URL));
}

#[tokio::test]
async fn test_all_rows_falls_back_to_script() {
    let session = FakeSession::new();
    session.set_page_size_script_applies(true);
    let settings = ExtractionSettings::without_delays();

    let applied = select_all_rows(&session, &settings)
        .await
        .expect("no fatal error");

    assert_eq!(applied, Some(SCRIPT_PAGINATION));
    assert_eq!(session.scripts(), vec![SELECT_ALL_ROWS_SCRIPT.to_string()]);
}

#[tokio::test]
async fn test_dropdown_without_all_entry_is_closed_again() {
    let session = FakeSession::new();
    let (_, vuetify3) = ROWS_PER_PAGE_DROPDOWNS[0];
    let dropdown = session.add_element(&[Locator::css(vuetify3[0])], "10", true);
    let settings = ExtractionSettings::without_delays();

    let applied = select_all_rows(&session, &settings)
        .await
        .expect("no fatal error");

    assert_eq!(applied, None);
    assert_eq!(
        session.activations(),
        vec![(dropdown, ActivationMethod::PointerClick)]
    );
    assert_eq!(session.keys(), vec![Key::Escape]);
    assert_eq!(session.scripts(), vec![SELECT_ALL_ROWS_SCRIPT.to_string()]);
}

#[tokio::test]
async fn test_close_button_used_when_escape_is_ignored() {
    let session = FakeSession::new();
    let dialog = session.add_dialog("Address: 1.2.3.4");
    session.open_dialog(dialog);
    session.ignore_escape();
    let button = session.add_close_button(dialog);
    let settings = ExtractionSettings::without_delays();

    let closed = close_surface(&session, &dialog, &settings)
        .await
        .expect("no fatal error");

    assert_eq!(closed, Some(CloseMethod::CloseButton));
    assert!(!session.is_open(dialog));
    assert_eq!(session.keys(), vec![Key::Escape]);
    assert_eq!(
        session.activations(),
        vec![(button, ActivationMethod::NativeClick)]
    );
}

#[tokio::test]
async fn test_click_outside_is_the_last_resort() {
    let session = FakeSession::new();
    let dialog = session.add_dialog("Address: 1.2.3.4");
    session.open_dialog(dialog);
    session.ignore_escape();
    let settings = ExtractionSettings::without_delays();

    let closed = close_surface(&session, &dialog, &settings)
        .await
        .expect("no fatal error");

    assert_eq!(closed, Some(CloseMethod::ClickOutside));
    assert!(!session.is_open(dialog));
    assert!(session.activations().is_empty());
}

#[tokio::test]
async fn test_extraction_closes_dialog_through_its_button() {
    let session = FakeSession::new();
    let (_, dialog) = session.add_server_row("fast-dns", "Address: 1.2.3.4 DNSCrypt");
    session.ignore_escape();
    session.add_close_button(dialog);
    let settings = fast_settings(2);
    let stats = RecoveryStats::new();

    let report = extract_with(&session, &settings, &stats, &StaticConnectivity(true), "fast-dns")
        .await
        .expect("extraction should not hit a fatal error");

    assert!(report.record.is_some());
    assert!(!session.is_open(dialog));
}
