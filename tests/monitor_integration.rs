//! End-to-end tests: scripted event source through the monitor to the log file.

mod common;

use std::path::PathBuf;

use common::{alice, create_event, rename_event, write_event, ScriptedSource, Users, ALICE};
use folder_audit::audit::{AuditRecord, EventKind};
use folder_audit::config::{AuditConfig, InvalidSetting};
use folder_audit::monitor::{Monitor, MonitorError};
use folder_audit::source::{ConnectError, FileRef, RawEvent, RawPayload};
use tempfile::TempDir;

const DOCS: &str = "/Users/x/Docs";

fn config(temp_dir: &TempDir) -> AuditConfig {
    AuditConfig {
        log_path: temp_dir.path().join("logs").join("audit.log"),
        monitored_folders: vec![DOCS.to_string()],
        ..AuditConfig::default()
    }
}

fn read_log(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

#[tokio::test]
async fn test_documented_scenario() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();

    let monitor = Monitor::start(&config, source, alice())
        .await
        .expect("Monitor should start");

    // The log's own name is ignored even though the config does not list it.
    assert!(handle.emit(write_event(999, 4242, "/Users/x/Docs/audit.log")));
    assert!(handle.emit(write_event(1000, 4242, "/Users/x/Docs/report.txt")));

    let written = monitor.shutdown().await.expect("Shutdown should drain");
    assert_eq!(written, 1);
    assert_eq!(read_log(&config.log_path), "report.txt,1000,alice,4242,Write\n");
}

#[tokio::test]
async fn test_connect_subscribes_and_mutes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (source, handle) = ScriptedSource::new();

    let monitor = Monitor::start(&config(&temp_dir), source, alice())
        .await
        .expect("Monitor should start");

    assert!(monitor.is_connected());
    assert!(handle.is_connected());
    assert!(handle.muted());
    assert_eq!(handle.subscribed(), EventKind::ALL.to_vec());

    monitor.shutdown().await.unwrap();
    assert!(!handle.is_connected());
    assert_eq!(handle.disconnects(), 1);
}

#[tokio::test]
async fn test_not_permitted_is_reported_specifically() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (source, handle) = ScriptedSource::failing(ConnectError::NotPermitted);

    let result = Monitor::start(&config(&temp_dir), source, alice()).await;

    assert!(matches!(
        result,
        Err(MonitorError::Connect(ConnectError::NotPermitted))
    ));
    assert!(!handle.is_connected());
    assert!(handle.subscribed().is_empty());
    assert!(!handle.emit(write_event(1, 4242, "/Users/x/Docs/a.txt")));
}

#[tokio::test]
async fn test_mute_failure_falls_back_to_ignored_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::without_mute();

    let monitor = Monitor::start(&config, source, alice())
        .await
        .expect("Mute failure must not be fatal");
    assert!(!handle.muted());

    // A write to the log itself, as the logger's own append would produce.
    let log_in_docs = format!("{DOCS}/audit.log");
    handle.emit(write_event(1, 4242, &log_in_docs));
    handle.emit(write_event(2, 4242, "/Users/x/Docs/kept.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 1);
    assert_eq!(read_log(&config.log_path), "kept.txt,2,alice,4242,Write\n");
}

#[tokio::test]
async fn test_own_process_events_never_recorded() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::without_mute();
    let own_pid = i32::try_from(std::process::id()).unwrap();

    let monitor = Monitor::start(&config, source, alice()).await.unwrap();
    handle.emit(write_event(1, own_pid, "/Users/x/Docs/mine.txt"));
    handle.emit(create_event(2, own_pid, DOCS, "mine2.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 0);
    assert_eq!(read_log(&config.log_path), "");
}

#[tokio::test]
async fn test_records_arrive_in_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();

    let monitor = Monitor::start(&config, source, alice()).await.unwrap();
    for (time, name) in [(10, "A.txt"), (11, "B.txt"), (12, "C.txt")] {
        assert!(handle.emit_from_thread(write_event(time, 4242, &format!("{DOCS}/{name}"))));
    }

    assert_eq!(monitor.shutdown().await.unwrap(), 3);
    let names: Vec<String> = read_log(&config.log_path)
        .lines()
        .map(|line| AuditRecord::parse_line(line).unwrap().file_name().to_string())
        .collect();
    assert_eq!(names, vec!["A.txt", "B.txt", "C.txt"]);
}

#[tokio::test]
async fn test_every_kind_is_recorded_by_file_name() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();
    let monitor = Monitor::start(&config, source, alice()).await.unwrap();

    handle.emit(create_event(1, 7, DOCS, "new.txt"));
    handle.emit(RawEvent::new(
        2,
        common::identity(7, ALICE),
        RawPayload::Open {
            file: FileRef::new("/Users/x/Docs/opened.txt"),
        },
    ));
    handle.emit(rename_event(3, 7, "/Users/x/Docs/draft.txt", "/tmp/final.txt"));
    handle.emit(RawEvent::new(
        4,
        common::identity(7, ALICE),
        RawPayload::Unlink {
            target: FileRef::new("/Users/x/Docs/gone.txt"),
            parent_dir: FileRef::new(DOCS),
        },
    ));
    handle.emit(write_event(5, 7, "/Users/x/Docs/written.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 5);
    assert_eq!(
        read_log(&config.log_path),
        "new.txt,1,alice,7,Create\n\
         opened.txt,2,alice,7,Open\n\
         draft.txt,3,alice,7,Rename\n\
         gone.txt,4,alice,7,Unlink\n\
         written.txt,5,alice,7,Write\n"
    );
}

#[tokio::test]
async fn test_degenerate_events_are_dropped_quietly() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();
    let monitor = Monitor::start(&config, source, Users::with(&[(ALICE, "alice")]))
        .await
        .unwrap();

    // Unmonitored native code.
    let mut unknown = write_event(1, 7, "/Users/x/Docs/a.txt");
    unknown.event_type = 11;
    handle.emit(unknown);
    // No resolvable path.
    handle.emit(RawEvent::new(
        2,
        common::identity(7, ALICE),
        RawPayload::Write {
            target: FileRef::unresolved(),
        },
    ));
    // Nested below the monitored folder.
    handle.emit(write_event(3, 7, "/Users/x/Docs/sub/b.txt"));
    // Unknown user.
    handle.emit(RawEvent::new(
        4,
        common::identity(7, 9999),
        RawPayload::Write {
            target: FileRef::new("/Users/x/Docs/c.txt"),
        },
    ));
    handle.emit(write_event(5, 7, "/Users/x/Docs/ok.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 1);
    assert_eq!(read_log(&config.log_path), "ok.txt,5,alice,7,Write\n");
}

#[tokio::test]
async fn test_policy_changes_apply_while_connected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();
    let monitor = Monitor::start(&config, source, alice()).await.unwrap();
    let policy = monitor.policy();

    handle.emit(write_event(1, 7, "/srv/share/a.txt"));
    policy.add_monitored_folder("/srv/share");
    handle.emit(write_event(2, 7, "/srv/share/b.txt"));
    policy.ignore_file("c.txt");
    handle.emit(write_event(3, 7, "/srv/share/c.txt"));
    policy.remove_monitored_folder(DOCS);
    handle.emit(write_event(4, 7, "/Users/x/Docs/d.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 1);
    assert_eq!(read_log(&config.log_path), "b.txt,2,alice,7,Write\n");
}

#[tokio::test]
async fn test_restart_appends_to_existing_log() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);

    for time in [1u64, 2] {
        let (source, handle) = ScriptedSource::new();
        let monitor = Monitor::start(&config, source, alice()).await.unwrap();
        handle.emit(write_event(time, 7, "/Users/x/Docs/a.txt"));
        monitor.shutdown().await.unwrap();
    }

    assert_eq!(
        read_log(&config.log_path),
        "a.txt,1,alice,7,Write\na.txt,2,alice,7,Write\n"
    );
}

#[tokio::test]
async fn test_folder_added_at_runtime_is_watched_and_audited() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let (source, handle) = ScriptedSource::new();
    let mut monitor = Monitor::start(&config, source, alice()).await.unwrap();

    assert!(monitor.add_monitored_folder("/srv/share").unwrap());
    assert!(!monitor.add_monitored_folder("/srv/share").unwrap());
    assert_eq!(handle.watched(), vec!["/srv/share".to_string()]);
    handle.emit(write_event(1, 7, "/srv/share/a.txt"));

    assert!(monitor.remove_monitored_folder("/srv/share"));
    assert!(handle.watched().is_empty());
    handle.emit(write_event(2, 7, "/srv/share/b.txt"));

    assert_eq!(monitor.shutdown().await.unwrap(), 1);
    assert_eq!(read_log(&config.log_path), "a.txt,1,alice,7,Write\n");
}

#[tokio::test]
async fn test_relative_folder_is_refused() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(&temp_dir);
    config.monitored_folders.push("Docs".to_string());
    let (source, handle) = ScriptedSource::new();

    let result = Monitor::start(&config, source, alice()).await;
    assert!(matches!(
        result,
        Err(MonitorError::Config(InvalidSetting::RelativeFolder(_)))
    ));
    assert!(!handle.is_connected());

    config.monitored_folders.pop();
    let (source, handle) = ScriptedSource::new();
    let mut monitor = Monitor::start(&config, source, alice()).await.unwrap();
    assert!(matches!(
        monitor.add_monitored_folder("relative/dir"),
        Err(MonitorError::Config(InvalidSetting::RelativeFolder(_)))
    ));
    assert!(handle.watched().is_empty());
    monitor.shutdown().await.unwrap();
}
