use std::{sync::Mutex, time::Duration};

use super::*;
use crate::{
    binary::resolver::RENDERER_NAME,
    foundation::core::{ExitOutcome, FrameKind},
    metadata::writer::load_metadata,
    render::launcher::{Invocation, LaunchReport},
};

/// Creates the `-o` target of every invocation, like a renderer that always succeeds.
#[derive(Default)]
struct TouchLauncher {
    calls: Mutex<Vec<Invocation>>,
    skip_writes: bool,
}

impl FrameLauncher for TouchLauncher {
    fn launch(
        &self,
        invocation: &Invocation,
        _timeout: Option<Duration>,
    ) -> ReelResult<LaunchReport> {
        self.calls.lock().unwrap().push(invocation.clone());
        if !self.skip_writes {
            let out = PathBuf::from(invocation.args.last().unwrap());
            std::fs::write(&out, b"png").unwrap();
        }
        Ok(LaunchReport {
            outcome: ExitOutcome::Success,
            stderr: String::new(),
        })
    }
}

fn fake_renderer(root: &Path) -> PathBuf {
    let path = root.join("target").join("release").join(RENDERER_NAME);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"#!/bin/sh\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn options(root: &Path, read_max: u32) -> ReelOptions {
    ReelOptions {
        read_max,
        out_dir: root.join("dnd"),
        candidates: vec![
            root.join("target").join("debug").join(RENDERER_NAME),
            root.join("target").join("release").join(RENDERER_NAME),
        ],
        create_dirs: true,
        ..ReelOptions::default()
    }
}

#[test]
fn zero_read_max_writes_three_frames_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let binary = fake_renderer(dir.path());
    let opts = options(dir.path(), 0);
    let launcher = TouchLauncher::default();

    let report = render_reel(&opts, &launcher).unwrap();

    assert_eq!(report.binary, binary);
    assert_eq!(report.metadata_path, dir.path().join("dnd").join("reads.json"));
    assert_eq!(
        std::fs::read_to_string(&report.metadata_path).unwrap(),
        r#"{"read_max":0}"#
    );
    assert_eq!(
        report.frames,
        vec![
            dir.path().join("dnd").join("0.png"),
            dir.path().join("dnd").join("1.png"),
            dir.path().join("dnd").join("2.png"),
        ]
    );
    assert!(report.frames.iter().all(|p| p.is_file()));
    assert_eq!(report.stats.frames_rendered, 3);
    assert_eq!(launcher.calls.lock().unwrap().len(), 3);
}

#[test]
fn metadata_matches_configured_read_max() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let opts = options(dir.path(), 20);

    let report = render_reel(&opts, &TouchLauncher::default()).unwrap();

    assert_eq!(load_metadata(&report.metadata_path).unwrap().read_max, 20);
    assert_eq!(report.frames.len(), 23);
}

#[test]
fn missing_renderer_fails_before_writing_anything() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), 20);
    let launcher = TouchLauncher::default();

    let err = render_reel(&opts, &launcher).unwrap_err();

    assert!(matches!(err, ReelError::BinaryNotFound(ref tried) if tried.len() == 2));
    assert!(!dir.path().join("dnd").exists());
    assert!(launcher.calls.lock().unwrap().is_empty());
}

#[test]
fn invalid_template_fails_before_resolving() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let opts = ReelOptions {
        template: vec!["-a".into(), "x.bam".into(), "-o".into(), "y.png".into()],
        ..options(dir.path(), 1)
    };

    let err = render_reel(&opts, &TouchLauncher::default()).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(!dir.path().join("dnd").exists());
}

#[test]
fn missing_out_dir_without_create_dirs_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let opts = ReelOptions {
        create_dirs: false,
        ..options(dir.path(), 1)
    };

    let err = render_reel(&opts, &TouchLauncher::default()).unwrap_err();
    match err {
        ReelError::Io { path, .. } => assert_eq!(path, dir.path().join("dnd")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn purge_policy_removes_frames_from_a_larger_run() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let out = dir.path().join("dnd");
    std::fs::create_dir_all(&out).unwrap();
    for name in ["3.png", "9.png", "10.png", "cover.png"] {
        std::fs::write(out.join(name), b"old").unwrap();
    }
    let opts = ReelOptions {
        stale_policy: StalePolicy::Purge,
        ..options(dir.path(), 1)
    };

    let report = render_reel(&opts, &TouchLauncher::default()).unwrap();

    assert_eq!(report.purged, vec![out.join("9.png"), out.join("10.png")]);
    assert!(!out.join("9.png").exists());
    assert!(!out.join("10.png").exists());
    assert!(out.join("cover.png").exists());
    // Slot 3 is this run's coverage frame and was rewritten.
    assert_eq!(std::fs::read(out.join("3.png")).unwrap(), b"png");
}

#[test]
fn keep_policy_leaves_stale_frames() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let out = dir.path().join("dnd");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("9.png"), b"old").unwrap();

    let report = render_reel(&options(dir.path(), 1), &TouchLauncher::default()).unwrap();

    assert!(report.purged.is_empty());
    assert!(out.join("9.png").exists());
}

#[test]
fn missing_outputs_make_the_frame_set_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    fake_renderer(dir.path());
    let launcher = TouchLauncher {
        skip_writes: true,
        ..TouchLauncher::default()
    };

    let err = render_reel(&options(dir.path(), 1), &launcher).unwrap_err();

    match err {
        ReelError::IncompleteFrameSet { missing } => assert_eq!(missing.len(), 4),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn verify_frame_set_accepts_complete_sets() {
    let dir = tempfile::tempdir().unwrap();
    let plan = FramePlan::new(crate::ReelConfig { read_max: 1 }, dir.path());
    for path in plan.expected_paths() {
        std::fs::write(path, b"").unwrap();
    }
    assert!(verify_frame_set(&plan).is_ok());

    std::fs::remove_file(dir.path().join("2.png")).unwrap();
    let err = verify_frame_set(&plan).unwrap_err();
    assert!(err.to_string().contains("2.png"));
    assert_eq!(plan.frame_at(2).unwrap().kind, FrameKind::Read(1));
}
