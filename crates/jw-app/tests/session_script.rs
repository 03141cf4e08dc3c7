//! End-to-end: demo projects compiled into sessions and scripted.

use std::path::PathBuf;

use jw_app::*;
use jw_core::{SignalKind, SignalValue};
use jw_project::schema::{StepDef, TargetRef, TargetValue};

fn demo(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates
    path.pop(); // repo root
    path.push("demos");
    path.push(name);
    path
}

fn conference() -> Session {
    let project = load_project(&demo("conference_room.yaml")).expect("demo loads");
    compile(project).expect("demo compiles")
}

fn publish(target: TargetRef, value: impl Into<SignalValue>) -> StepDef {
    StepDef::Publish(TargetValue {
        target,
        value: value.into(),
    })
}

fn expect(target: TargetRef, value: impl Into<SignalValue>) -> StepDef {
    StepDef::Expect(TargetValue {
        target,
        value: value.into(),
    })
}

#[test]
fn conference_room_script_passes() {
    let session = conference();
    let steps = session.project().script.clone();
    let transcript = run(&session, &steps);
    assert!(transcript.passed(), "{transcript}");
    assert_eq!(transcript.outcomes.len(), steps.len());
    assert_eq!(session.timeline().now(), 600);
}

#[test]
fn signage_script_passes() {
    let project = load_project(&demo("signage.json")).unwrap();
    let session = compile(project).unwrap();
    let steps = session.project().script.clone();
    let transcript = run(&session, &steps);
    assert!(transcript.passed(), "{transcript}");
}

#[test]
fn compile_installs_mocks_rules_and_bindings() {
    let session = conference();
    let bus = session.bus();

    assert!(bus.has_wave(SignalKind::Boolean, "1"));
    assert!(bus.has_wave(SignalKind::Number, "1"));
    for address in ["10", "11", "12"] {
        assert!(bus.has_wave(SignalKind::Boolean, address));
        assert_eq!(bus.subscriber_count(SignalKind::Boolean, address), 1);
    }
    assert_eq!(bus.rule_count(SignalKind::Boolean, "1"), 2);
    assert_eq!(bus.config().name, "conference");

    let paths: Vec<&str> = session.binding_paths().collect();
    assert_eq!(paths.first(), Some(&"Room.Power"));
    assert!(paths.contains(&"Sources"));
    assert!(paths.contains(&"Display.Brightness"));

    // Seeded before any publish.
    assert_eq!(bus.state(SignalKind::Number, "1"), SignalValue::Number(40.0));
    assert_eq!(bus.state(SignalKind::Number, "5"), SignalValue::Number(60.0));
    let level = session.binding("Audio.Level").unwrap();
    assert_eq!(level.value(), SignalValue::Number(40.0));
}

#[test]
fn failures_are_recorded_and_the_run_continues() {
    let session = conference();
    let steps = vec![
        expect(TargetRef::path("Room.Power"), true),
        publish(TargetRef::path("Nowhere"), true),
        publish(TargetRef::path("Room.Power"), true),
        expect(TargetRef::path("Room.Power"), true),
    ];
    let transcript = run(&session, &steps);

    let failed: Vec<usize> = transcript.failures().map(|o| o.index).collect();
    assert_eq!(failed, vec![0, 1]);
    match &transcript.outcomes[0].status {
        StepStatus::Failed { reason } => assert!(reason.contains("expected true, found false")),
        StepStatus::Ok => panic!("first expect should fail"),
    }
    assert!(transcript.outcomes[3].passed());
}

#[test]
fn raw_addresses_bypass_binding_effects() {
    let session = conference();
    let mute = TargetRef::address(SignalKind::Boolean, "4");

    session.publish(&mute, true.into()).unwrap();
    session.advance(1_000);
    assert_eq!(session.state(&mute).unwrap(), SignalValue::Boolean(true));

    session
        .publish(&TargetRef::path("Audio.Mute"), true.into())
        .unwrap();
    session.advance(500);
    assert_eq!(session.state(&mute).unwrap(), SignalValue::Boolean(false));
}

#[test]
fn indexed_paths_publish_one_address() {
    let session = conference();
    session
        .publish(&TargetRef::path("Sources[2]"), true.into())
        .unwrap();

    let sources = session.binding("Sources").unwrap();
    assert_eq!(
        sources.values(),
        vec![
            SignalValue::Boolean(false),
            SignalValue::Boolean(false),
            SignalValue::Boolean(true)
        ]
    );
}

#[test]
fn command_line_steps_run_after_the_script() {
    let session = conference();
    let mut steps = session.project().script.clone();
    steps.push(parse_step("boolean:1=true").unwrap());
    steps.push(parse_step("wait:50").unwrap());
    let transcript = run(&session, &steps);
    assert!(transcript.passed(), "{transcript}");

    // Power toggled back off; the rule on false wrote the text.
    assert_eq!(
        session.state(&TargetRef::path("Room.Power")).unwrap(),
        SignalValue::Boolean(false)
    );
    assert_eq!(
        session.state(&TargetRef::path("Room.PowerText")).unwrap(),
        SignalValue::from("Off")
    );
}

#[test]
fn state_table_labels_joins_with_their_paths() {
    let session = conference();
    run(&session, &session.project().script.clone());

    let rows = session.state_table(Some(SignalKind::String));
    assert!(rows.iter().all(|r| r.key.kind == SignalKind::String));
    let source_name = rows
        .iter()
        .find(|r| r.paths == vec!["SourceName".to_string()])
        .expect("source name row");
    assert_eq!(source_name.value, SignalValue::from("Laptop"));

    let all = session.state_table(None);
    let source = all
        .iter()
        .find(|r| r.paths == vec!["Sources[1]".to_string()])
        .expect("indexed row");
    assert_eq!(source.value, SignalValue::Boolean(false));

    let json = serde_json::to_value(&all).unwrap();
    assert!(json.is_array());
}

#[test]
fn summary_counts_the_project() {
    let project = load_project(&demo("conference_room.yaml")).unwrap();
    let summary = summarize_project(&project).unwrap();
    assert_eq!(summary.join_count, 9);
    assert_eq!(summary.address_count, 11);
    assert_eq!(summary.mock_count, 5);
    assert_eq!(summary.rule_count, 4);
    assert!(summary.warnings.is_empty());

    let by_kind = render_joins(&project, true).unwrap();
    assert!(by_kind.contains("\"Sources\""));
}

#[test]
fn missing_files_report_the_path() {
    let err = load_project(&demo("missing.yaml")).unwrap_err();
    assert!(matches!(err, AppError::ProjectFileRead { .. }));
}
