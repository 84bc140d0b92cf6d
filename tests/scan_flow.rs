//! End-to-end controller behaviour against the mock camera.

mod common;

use common::*;
use status_scanner::camera::{MockBackend, PlatformError};
use status_scanner::decode::FixedDecoder;
use status_scanner::{ErrorKind, ScanController, ScanResult, ScannerState};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_round_trip_state_sequence() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Status(ada()));
    let calls = verifier.calls();

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")).after(5),
            verifier,
        ))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    assert_eq!(scanner.run_until_settled().await, ScannerState::Success);

    assert_eq!(
        recorder.states(),
        vec![
            ScannerState::RequestingPermission,
            ScannerState::Scanning,
            ScannerState::Processing,
            ScannerState::Success,
        ]
    );
    assert_eq!(recorder.count(|e| matches!(e, Event::Detected(_))), 1);
    assert_eq!(
        recorder.count(|e| *e == Event::Verified("T-1001".to_string())),
        1
    );
    assert!(recorder.errors().is_empty());
    assert_eq!(calls.get(), 1);

    // Released on success
    assert_eq!(probe.open_streams(), 0);
    assert!(!scanner.camera().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_verification_per_detection() {
    let backend = MockBackend::new();
    let verifier = ScriptedVerifier::new(Reply::After(Duration::from_secs(2), ada()));
    let calls = verifier.calls();
    let decoder = FixedDecoder::new(code("T-1001"));

    let mut scanner = ScanController::builder(backend, decoder, verifier)
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    assert_eq!(
        scanner.next_result().await,
        Some(ScanResult::Hit(code("T-1001")))
    );
    assert_eq!(scanner.state(), ScannerState::Processing);

    // Abandon the wait twice while the directory is still answering
    for _ in 0..2 {
        let waited =
            tokio::time::timeout(Duration::from_millis(300), scanner.next_result()).await;
        assert!(waited.is_err());
        assert_eq!(scanner.state(), ScannerState::Processing);
    }

    match scanner.next_result().await {
        Some(ScanResult::Verified(status)) => assert_eq!(status.teacher_id, "T-1001"),
        other => panic!("expected verified status, got {:?}", other),
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(scanner.stats().verifications, 1);
}

#[tokio::test(start_paused = true)]
async fn test_tolerates_long_run_of_misses() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Status(ada()));
    let calls = verifier.calls();

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")).after(1000),
            verifier,
        ))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    for _ in 0..1000 {
        assert_eq!(scanner.next_result().await, Some(ScanResult::Miss));
    }
    assert_eq!(scanner.state(), ScannerState::Scanning);
    assert_eq!(probe.open_streams(), 1);
    assert!(recorder.errors().is_empty());
    assert_eq!(calls.get(), 0);

    let stats = scanner.stats();
    assert_eq!(stats.frames_sampled, 1000);
    assert_eq!(stats.decode_hits, 0);

    assert_eq!(
        scanner.next_result().await,
        Some(ScanResult::Hit(code("T-1001")))
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_resumes_scanning() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Status(ada()));
    let calls = verifier.calls();
    let valid = code("T-1001");
    let decoder = ScriptedDecoder::new([
        None,
        Some("https://example.com/menu".to_string()),
        Some("https://example.com/menu".to_string()),
        Some(valid.clone()),
    ]);

    let mut scanner = recorder
        .attach(ScanController::builder(backend, decoder, verifier))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    assert_eq!(scanner.next_result().await, Some(ScanResult::Miss));
    assert!(matches!(
        scanner.next_result().await,
        Some(ScanResult::Invalid(_))
    ));
    assert_eq!(scanner.state(), ScannerState::Scanning);
    assert_eq!(probe.open_streams(), 1);
    assert_eq!(calls.get(), 0);

    // Same code still in view
    assert_eq!(scanner.next_result().await, Some(ScanResult::Miss));

    assert_eq!(scanner.next_result().await, Some(ScanResult::Hit(valid)));
    assert!(matches!(
        scanner.next_result().await,
        Some(ScanResult::Verified(_))
    ));
    assert_eq!(calls.get(), 1);

    // Silent recovery: no error and no cue for the menu link
    assert!(recorder.errors().is_empty());
    assert_eq!(recorder.count(|e| matches!(e, Event::Detected(_))), 1);
    assert_eq!(scanner.stats().invalid_payloads, 1);
    assert_eq!(scanner.stats().suppressed_hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_verification_times_out_after_five_seconds() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Never);

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")),
            verifier,
        ))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    assert_eq!(
        scanner.next_result().await,
        Some(ScanResult::Hit(code("T-1001")))
    );

    let began = Instant::now();
    let result = scanner.next_result().await;
    let waited = began.elapsed();

    assert!(matches!(result, Some(ScanResult::VerificationFailed(_))));
    assert!(waited >= Duration::from_secs(5));
    assert!(waited < Duration::from_secs(6));
    assert_eq!(recorder.errors(), vec![ErrorKind::VerificationUnreachable]);
    assert_eq!(scanner.state(), ScannerState::Scanning);
    assert_eq!(probe.open_streams(), 1);

    let stats = scanner.stats();
    assert_eq!(stats.verification_timeouts, 1);
    assert_eq!(stats.verification_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_directory_reported_once_per_cooldown() {
    let backend = MockBackend::new();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Unreachable);
    let calls = verifier.calls();

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")),
            verifier,
        ))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    scanner.next_result().await;
    assert!(matches!(
        scanner.next_result().await,
        Some(ScanResult::VerificationFailed(_))
    ));

    // Ten ticks are well inside the two second cooldown
    for _ in 0..10 {
        assert_eq!(scanner.next_result().await, Some(ScanResult::Miss));
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(recorder.errors(), vec![ErrorKind::VerificationUnreachable]);

    // After the cooldown the code is tried again
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        scanner.next_result().await,
        Some(ScanResult::Hit(code("T-1001")))
    );
    scanner.next_result().await;
    assert_eq!(calls.get(), 2);
    assert_eq!(recorder.errors().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_from_processing() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let recorder = Recorder::default();
    let verifier = ScriptedVerifier::new(Reply::Never);

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")),
            verifier,
        ))
        .config(fast_config())
        .build();

    scanner.start().unwrap();
    scanner.next_result().await;
    assert_eq!(scanner.state(), ScannerState::Processing);

    scanner.stop();
    let after_first = recorder.events();
    scanner.stop();
    scanner.cancel();

    assert_eq!(scanner.state(), ScannerState::Idle);
    assert_eq!(recorder.events(), after_first);
    assert_eq!(probe.open_streams(), 0);
    assert_eq!(probe.releases(), 1);
    assert_eq!(scanner.next_result().await, None);
    assert!(recorder.errors().is_empty());
}

#[test]
fn test_permission_denied_holds_no_session() {
    let backend = MockBackend::new().fail_next(PlatformError::NotAllowed("denied".into()));
    let probe = backend.probe();
    let recorder = Recorder::default();

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")),
            directory(),
        ))
        .build();

    assert_eq!(scanner.start(), Err(ErrorKind::PermissionDenied));
    assert_eq!(
        recorder.states(),
        vec![
            ScannerState::RequestingPermission,
            ScannerState::Error(ErrorKind::PermissionDenied),
        ]
    );
    assert_eq!(recorder.errors(), vec![ErrorKind::PermissionDenied]);
    assert_eq!(probe.open_streams(), 0);
    assert!(ErrorKind::PermissionDenied.is_retryable());
}

#[test]
fn test_busy_camera_reported() {
    let backend = MockBackend::new().fail_next(PlatformError::NotReadable("in use".into()));
    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-1001")), directory()).build();

    assert_eq!(scanner.start(), Err(ErrorKind::DeviceBusy));
    assert_eq!(scanner.state(), ScannerState::Error(ErrorKind::DeviceBusy));
}

#[test]
fn test_no_cameras_is_not_retryable() {
    let backend = MockBackend::with_devices(Vec::new());
    let probe = backend.probe();
    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-1001")), directory()).build();

    let kind = scanner.start().unwrap_err();
    assert_eq!(kind, ErrorKind::NoDevicesFound);
    assert!(!kind.is_retryable());
    assert_eq!(probe.open_streams(), 0);
}

#[test]
fn test_failed_switch_releases_session() {
    let backend =
        MockBackend::new().fail_device("front", PlatformError::NotReadable("in use".into()));
    let probe = backend.probe();
    let recorder = Recorder::default();

    let mut scanner = recorder
        .attach(ScanController::builder(
            backend,
            FixedDecoder::new(code("T-1001")),
            directory(),
        ))
        .build();

    scanner.start().unwrap();
    assert_eq!(scanner.camera().session().unwrap().device_id(), "back");

    assert_eq!(scanner.switch_camera(), Err(ErrorKind::DeviceBusy));
    assert_eq!(scanner.state(), ScannerState::Error(ErrorKind::DeviceBusy));
    assert_eq!(probe.open_streams(), 0);
    assert_eq!(probe.peak_open(), 1);
    assert_eq!(recorder.errors(), vec![ErrorKind::DeviceBusy]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_during_processing_applied_on_resume() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let verifier = ScriptedVerifier::new(Reply::Reject);

    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-4040")), verifier)
            .config(fast_config())
            .build();

    scanner.start().unwrap();
    scanner.next_result().await;
    assert_eq!(scanner.state(), ScannerState::Processing);

    scanner.switch_camera().unwrap();
    assert_eq!(scanner.camera().session().unwrap().device_id(), "back");

    assert!(matches!(
        scanner.next_result().await,
        Some(ScanResult::VerificationFailed(_))
    ));
    assert_eq!(scanner.state(), ScannerState::Scanning);
    assert_eq!(scanner.camera().session().unwrap().device_id(), "front");
    assert_eq!(probe.open_streams(), 1);
    assert_eq!(probe.peak_open(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_warming_stream_skips_ticks() {
    let backend = MockBackend::new().with_warmup(3);
    let mut scanner = ScanController::builder(
        backend,
        FixedDecoder::new(code("T-1001")).after(1),
        directory(),
    )
    .config(fast_config())
    .build();

    scanner.start().unwrap();
    assert_eq!(scanner.next_result().await, Some(ScanResult::Miss));

    let stats = scanner.stats();
    assert_eq!(stats.frames_sampled, 1);
    assert!(stats.frames_skipped > 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_success() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let verifier = ScriptedVerifier::new(Reply::Status(ada()));
    let calls = verifier.calls();

    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-1001")), verifier)
            .config(fast_config())
            .build();

    for attempt in 1..=3u32 {
        scanner.start().unwrap();
        assert_eq!(scanner.run_until_settled().await, ScannerState::Success);
        assert_eq!(calls.get(), attempt);
        assert_eq!(probe.open_streams(), 0);
    }
    assert_eq!(scanner.stats().attempts, 3);
    assert_eq!(probe.peak_open(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_kept_open_on_success_released_on_restart() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let verifier = ScriptedVerifier::new(Reply::Status(ada()));
    let mut config = fast_config();
    config.camera.close_on_success = false;

    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-1001")), verifier)
            .config(config)
            .build();

    scanner.start().unwrap();
    assert_eq!(scanner.run_until_settled().await, ScannerState::Success);
    assert_eq!(probe.open_streams(), 1);
    assert!(scanner.stats().session_open);

    // Stop from Success releases the kept session
    scanner.stop();
    assert_eq!(probe.open_streams(), 0);

    scanner.start().unwrap();
    assert_eq!(scanner.run_until_settled().await, ScannerState::Success);
    assert_eq!(probe.open_streams(), 1);

    // Restarting from Success closes the old session before opening anew
    scanner.start().unwrap();
    assert_eq!(scanner.state(), ScannerState::Scanning);
    assert_eq!(probe.open_streams(), 1);
    assert_eq!(probe.peak_open(), 1);
    assert_eq!(probe.acquisitions(), 3);

    scanner.stop();
    assert_eq!(probe.open_streams(), 0);
    assert_eq!(probe.releases(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_switch_queued_during_processing_dropped_on_success() {
    let backend = MockBackend::new();
    let probe = backend.probe();
    let verifier = ScriptedVerifier::new(Reply::After(Duration::from_millis(500), ada()));

    let mut scanner =
        ScanController::builder(backend, FixedDecoder::new(code("T-1001")), verifier)
            .config(fast_config())
            .build();
    let preference = scanner.preference().clone();

    scanner.start().unwrap();
    assert_eq!(scanner.camera().session().unwrap().device_id(), "back");
    scanner.next_result().await;
    assert_eq!(scanner.state(), ScannerState::Processing);

    scanner.switch_camera().unwrap();
    assert!(matches!(
        scanner.next_result().await,
        Some(ScanResult::Verified(_))
    ));
    assert_eq!(scanner.state(), ScannerState::Success);
    assert_eq!(scanner.stats().camera_switches, 0);
    assert_eq!(*scanner.preference(), preference);

    scanner.start().unwrap();
    assert_eq!(scanner.camera().session().unwrap().device_id(), "back");
    assert_eq!(probe.peak_open(), 1);
}
