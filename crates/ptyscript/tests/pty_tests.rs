//! Sessions against real children on a pseudo-terminal.

#![cfg(unix)]

use std::time::Duration;

use ptyscript::{
    ExpectError, Pattern, PatternSet, PtySignal, Session, SessionBuilder, SessionConfig,
    SessionState, SharedLog,
};

fn config() -> SessionConfig {
    SessionConfig::new().timeout(Duration::from_secs(5))
}

async fn cat() -> Session<ptyscript::PtyTransport> {
    Session::spawn_with_config("/bin/cat", &[] as &[&str], config())
        .await
        .expect("spawn /bin/cat")
}

/// With echo on, a line comes back twice: once from the terminal, once
/// from cat.
#[tokio::test]
async fn cat_with_echo_repeats_twice() {
    let mut session = cat().await;
    let log = SharedLog::new();
    session.set_log_read(Some(Box::new(log.clone())));
    assert_eq!(session.echo(), Some(true));

    session.send_line("1234").await.unwrap();
    session.expect("1234\r\n").await.unwrap();
    session.expect("1234\r\n").await.unwrap();
    assert_eq!(log.contents(), "1234\r\n1234\r\n");

    session.close().await.unwrap();
}

/// With echo off, only cat's copy comes back.
#[tokio::test]
async fn cat_without_echo_repeats_once() {
    let mut session = cat().await;
    session.set_echo(false).unwrap();
    assert_eq!(session.echo(), Some(false));

    session.send_line("5678").await.unwrap();
    let m = session.expect("5678\r\n").await.unwrap();
    assert_eq!(m.before, "");

    let err = session
        .expect_timeout("5678", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    session.close().await.unwrap();
}

/// Some terminals echo a bare EOF as `^D` followed by two backspaces.
const CAT_EOF_ECHO: &str = "^D\x08\x08";

/// Both taps record non-ASCII text exactly as sent and as read back.
#[tokio::test]
async fn taps_round_trip_unicode() {
    let msg = "abcΩ÷";
    let mut session = cat().await;
    let sent = SharedLog::new();
    let read = SharedLog::new();
    session.set_log_send(Some(Box::new(sent.clone())));
    session.set_log_read(Some(Box::new(read.clone())));

    session.send_line(msg).await.unwrap();
    session.send_eof().await.unwrap();
    session.expect_eof().await.unwrap();
    session.close().await.unwrap();

    assert_eq!(sent.contents(), format!("{msg}\n\u{4}"));
    assert_eq!(
        read.contents().replace(CAT_EOF_ECHO, ""),
        format!("{msg}\r\n").repeat(2)
    );
}

fn lit(text: &str) -> Pattern {
    Pattern::literal(text)
}

fn patterns(items: &[Pattern]) -> PatternSet {
    items.iter().cloned().collect()
}

/// Echo can be turned off and back on while the child runs, with sentinels
/// mixed into every pattern list.
#[tokio::test]
async fn echo_toggles_while_running() {
    let mut session = cat().await;

    session.send_line("1234").await.unwrap();
    let with_timeout = patterns(&[
        lit("1234"),
        lit("abcdé"),
        lit("wxyz"),
        Pattern::eof(),
        Pattern::timeout(),
    ]);
    assert_eq!(session.expect_any(&with_timeout).await.unwrap().pattern_index, 0);
    let four = patterns(&[lit("1234"), lit("abcdé"), lit("wxyz"), Pattern::eof()]);
    assert_eq!(session.expect_any(&four).await.unwrap().pattern_index, 0);

    session.set_echo(false).unwrap();
    session.send_line("abcdé").await.unwrap();
    session.send_line("wxyz").await.unwrap();
    let sentinels_first = patterns(&[
        Pattern::eof(),
        Pattern::timeout(),
        lit("abcdé"),
        lit("wxyz"),
        lit("1234"),
    ]);
    assert_eq!(session.expect_any(&sentinels_first).await.unwrap().pattern_index, 2);
    let tail = patterns(&[Pattern::eof(), lit("abcdé"), lit("wxyz"), lit("7890")]);
    assert_eq!(session.expect_any(&tail).await.unwrap().pattern_index, 2);

    session.set_echo(true).unwrap();
    session.send_line("7890").await.unwrap();
    assert_eq!(session.expect_any(&tail).await.unwrap().pattern_index, 3);
    assert_eq!(session.expect_any(&tail).await.unwrap().pattern_index, 3);

    session.send_eof().await.unwrap();
    session.expect_eof().await.unwrap();
}

/// Echo can be disabled before the child starts.
#[tokio::test]
async fn echo_disabled_from_config() {
    let mut session = Session::spawn_with_config("/bin/cat", &[] as &[&str], config().echo(false))
        .await
        .unwrap();
    assert_eq!(session.echo(), Some(false));

    session.send_line("quiet").await.unwrap();
    session.expect("quiet").await.unwrap();
    assert!(
        session
            .expect_timeout("quiet", Duration::from_millis(300))
            .await
            .is_err()
    );
    session.close().await.unwrap();
}

/// The send tap records exactly what was written.
#[tokio::test]
async fn send_tap_records_written_text() {
    let mut session = cat().await;
    let log = SharedLog::new();
    session.set_log_send(Some(Box::new(log.clone())));

    session.send("abc").await.unwrap();
    session.send_line("def").await.unwrap();
    assert_eq!(log.contents(), "abcdef\n");

    session.close().await.unwrap();
}

/// EOF on an empty line ends cat; the stream then reports end of file.
#[tokio::test]
async fn send_eof_ends_child() {
    let mut session = cat().await;
    session.send_line("last").await.unwrap();
    session.expect("last\r\nlast\r\n").await.unwrap();

    session.send_eof().await.unwrap();
    session.expect_eof().await.unwrap();
    assert_eq!(session.state(), SessionState::EndOfStream);

    let status = session.wait().await.unwrap();
    assert!(status.success());
    assert!(!session.is_alive());
}

/// Output of a short-lived child is fully readable after it exits.
#[tokio::test]
async fn output_then_eof_sentinel() {
    let mut session = Session::spawn_with_config("/bin/echo", &["hello", "world"], config())
        .await
        .unwrap();

    let mut patterns = PatternSet::new();
    patterns.add("goodbye").add(Pattern::eof());
    let m = session.expect_any(&patterns).await.unwrap();

    assert_eq!(m.pattern_index, 1);
    assert_eq!(m.before, "hello world\r\n");
}

/// Regex captures work against shell output.
#[tokio::test]
async fn shell_regex_capture() {
    let mut session = SessionBuilder::new()
        .command("/bin/sh")
        .args(["-c", "echo value=42"])
        .timeout(Duration::from_secs(5))
        .spawn()
        .await
        .unwrap();

    let m = session
        .expect(Pattern::regex(r"value=(\d+)").unwrap())
        .await
        .unwrap();
    assert_eq!(m.capture(1), Some("42"));
}

/// Environment and working directory reach the child.
#[tokio::test]
async fn env_and_working_dir() {
    let dir = std::env::temp_dir();
    let mut session = SessionBuilder::new()
        .command("/bin/sh")
        .args(["-c", "echo \"$GREETING\"; pwd"])
        .env("GREETING", "hi there")
        .working_directory(&dir)
        .timeout(Duration::from_secs(5))
        .spawn()
        .await
        .unwrap();

    session.expect("hi there").await.unwrap();
    let m = session.expect_eof().await.unwrap();
    let canonical = dir.canonicalize().unwrap_or(dir);
    assert!(m.before.contains(canonical.to_string_lossy().as_ref()));
}

/// A signalled child no longer runs.
#[tokio::test]
async fn signal_terminates_child() {
    let mut session = Session::spawn_with_config("/bin/sleep", &["30"], config())
        .await
        .unwrap();
    assert!(session.is_alive());

    session.signal(PtySignal::Terminate).unwrap();
    let status = session.wait().await.unwrap();
    assert!(!status.success());
}

/// Closing kills a child that ignores its terminal, and the session is
/// unusable afterwards.
#[tokio::test]
async fn close_is_final() {
    let mut session = Session::spawn_with_config("/bin/sleep", &["30"], config())
        .await
        .unwrap();

    session.close().await.unwrap();
    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.send("x").await,
        Err(ExpectError::SessionClosed)
    ));
    assert!(matches!(
        session.expect("x").await,
        Err(ExpectError::SessionClosed)
    ));
}

/// Spawning a missing program surfaces a spawn error or an immediate EOF,
/// depending on where exec fails.
#[tokio::test]
async fn missing_program() {
    match Session::spawn_with_config("/nonexistent/program", &[] as &[&str], config()).await {
        Err(err) => assert!(matches!(err, ExpectError::Spawn(_))),
        Ok(mut session) => {
            let m = session.expect_eof().await.unwrap();
            assert!(m.after.is_empty());
        }
    }
}
