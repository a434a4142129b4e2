use super::*;

fn os(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

fn template(args: &[&str]) -> CommandTemplate {
    CommandTemplate::new(args.iter().map(|s| s.to_string()).collect()).unwrap()
}

#[test]
fn zero_read_max_is_ruler_read_coverage() {
    let plan = FramePlan::new(ReelConfig { read_max: 0 }, "dnd");
    let frames: Vec<Frame> = plan.frames().collect();

    assert_eq!(plan.len(), 3);
    assert_eq!(
        frames.iter().map(|f| f.kind).collect::<Vec<_>>(),
        vec![FrameKind::Ruler, FrameKind::Read(0), FrameKind::Coverage]
    );
    assert_eq!(
        plan.expected_paths(),
        vec![
            Path::new("dnd").join("0.png"),
            Path::new("dnd").join("1.png"),
            Path::new("dnd").join("2.png"),
        ]
    );
}

#[test]
fn slots_are_dense_and_ordered_for_any_read_max() {
    for read_max in [1u32, 2, 7, 20] {
        let plan = FramePlan::new(ReelConfig { read_max }, "dnd");
        let frames: Vec<Frame> = plan.frames().collect();

        assert_eq!(frames.len() as u64, u64::from(read_max) + 3);
        for (pos, frame) in frames.iter().enumerate() {
            assert_eq!(frame.slot, pos as u64);
            assert_eq!(frame.out_path, frame_path(Path::new("dnd"), pos as u64));
        }
        assert_eq!(frames[0].kind, FrameKind::Ruler);
        for i in 0..=read_max {
            assert_eq!(frames[i as usize + 1].kind, FrameKind::Read(i));
        }
        assert_eq!(frames.last().unwrap().kind, FrameKind::Coverage);
        assert_eq!(frames.last().unwrap().slot, u64::from(read_max) + 2);
        assert_eq!(plan.frame_at(u64::from(read_max) + 3), None);
    }
}

#[test]
fn ruler_args_use_sentinel_index_and_no_frame_flag() {
    let plan = FramePlan::new(ReelConfig { read_max: 4 }, "dnd");
    let ruler = plan.frame_at(0).unwrap();

    assert_eq!(
        ruler.render_args(12, &template(&["-a", "x.bam", "-s"])),
        os(&["-t12", "vis", "-_", "10000", "-a", "x.bam", "-s", "-o"])
            .into_iter()
            .chain([Path::new("dnd").join("0.png").into_os_string()])
            .collect::<Vec<_>>()
    );
}

#[test]
fn read_args_select_single_read() {
    let plan = FramePlan::new(ReelConfig { read_max: 4 }, "dnd");
    let read = plan.frame_at(3).unwrap();
    assert_eq!(read.kind, FrameKind::Read(2));

    assert_eq!(
        read.render_args(4, &template(&["-a", "x.bam"])),
        os(&["-t4", "vis", "-_", "2", "-a", "x.bam", "-*", "-o"])
            .into_iter()
            .chain([Path::new("dnd").join("3.png").into_os_string()])
            .collect::<Vec<_>>()
    );
}

#[test]
fn coverage_args_hide_alignments() {
    let plan = FramePlan::new(ReelConfig { read_max: 4 }, "dnd");
    let coverage = plan.frame_at(6).unwrap();
    assert_eq!(coverage.kind, FrameKind::Coverage);

    assert_eq!(
        coverage.render_args(12, &template(&["-a", "x.bam"])),
        os(&["-t12", "vis", "-_", "0", "-a", "x.bam", "-A", "-o"])
            .into_iter()
            .chain([Path::new("dnd").join("6.png").into_os_string()])
            .collect::<Vec<_>>()
    );
}

#[test]
fn every_frame_carries_the_whole_template_contiguously() {
    let tpl = CommandTemplate::default();
    let expected: Vec<OsString> = tpl.args().iter().map(OsString::from).collect();
    let plan = FramePlan::new(ReelConfig { read_max: 3 }, "dnd");

    for frame in plan.frames() {
        let args = frame.render_args(12, &tpl);
        assert_eq!(&args[4..4 + expected.len()], expected.as_slice(), "{:?}", frame.kind);
        let read_flag = args.iter().any(|a| a == SINGLE_READ_FLAG);
        assert_eq!(read_flag, matches!(frame.kind, FrameKind::Read(_)));
    }
}

#[test]
fn stale_outputs_are_numbered_pngs_above_coverage() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["0.png", "4.png", "5.png", "12.png", "6.png", "notes.png", "7.txt", "x5.png"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    std::fs::create_dir(dir.path().join("9.png")).unwrap();

    let plan = FramePlan::new(ReelConfig { read_max: 2 }, dir.path());
    assert_eq!(
        plan.stale_outputs().unwrap(),
        vec![
            dir.path().join("5.png"),
            dir.path().join("6.png"),
            dir.path().join("12.png"),
        ]
    );
}

#[test]
fn stale_outputs_skip_non_canonical_slot_names() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["007.png", "+9.png", "05.png", "8.png"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }

    let plan = FramePlan::new(ReelConfig { read_max: 2 }, dir.path());
    assert_eq!(plan.stale_outputs().unwrap(), vec![dir.path().join("8.png")]);
}

#[test]
fn missing_output_dir_has_no_stale_frames() {
    let dir = tempfile::tempdir().unwrap();
    let plan = FramePlan::new(ReelConfig { read_max: 2 }, dir.path().join("absent"));
    assert!(plan.stale_outputs().unwrap().is_empty());
    assert_eq!(plan.missing_outputs().len(), 5);
}
