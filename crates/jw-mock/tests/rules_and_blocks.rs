use jw_core::{SignalKind, SignalValue};
use jw_mock::{LogicBlock, MockBus, MockRule};

#[test]
fn rule_sets_source_name_on_press() {
    let bus = MockBus::new();
    bus.add_rule(
        MockRule::on(SignalKind::Boolean, "21")
            .when(|v| v.as_bool() == Some(true))
            .then(SignalKind::String, "1", |_, _, _| SignalValue::from("Laptop")),
    )
    .unwrap();

    bus.publish(SignalKind::Boolean, "21", false).unwrap();
    assert_eq!(bus.state(SignalKind::String, "1"), SignalValue::from(""));

    bus.publish(SignalKind::Boolean, "21", true).unwrap();
    assert_eq!(bus.state(SignalKind::String, "1"), SignalValue::from("Laptop"));
    assert_eq!(bus.state(SignalKind::Boolean, "21"), SignalValue::Boolean(true));
}

#[test]
fn rule_default_value_seeds_trigger() {
    let bus = MockBus::new();
    bus.add_rule(
        MockRule::on(SignalKind::Number, "level")
            .default_value(25)
            .then(SignalKind::Boolean, "muted", |t, _, _| {
                SignalValue::Boolean(t.as_number() == Some(0.0))
            }),
    )
    .unwrap();

    assert_eq!(bus.state(SignalKind::Number, "level"), SignalValue::Number(25.0));

    bus.publish(SignalKind::Number, "level", 0).unwrap();
    assert_eq!(bus.state(SignalKind::Boolean, "muted"), SignalValue::Boolean(true));
}

#[test]
fn effects_see_current_value_and_other_joins() {
    let bus = MockBus::new();
    bus.register_mock(SignalKind::Number, "step", None, Some(SignalValue::Number(5.0)))
        .unwrap();
    bus.add_rule(
        MockRule::on(SignalKind::Boolean, "up")
            .when(|v| v.as_bool() == Some(true))
            .then(SignalKind::Number, "level", |_, current, ctx| {
                let step = ctx.read_number("step");
                SignalValue::Number(current.as_number().unwrap_or_default() + step)
            }),
    )
    .unwrap();

    bus.publish(SignalKind::Boolean, "up", true).unwrap();
    bus.publish(SignalKind::Boolean, "up", true).unwrap();
    assert_eq!(bus.state(SignalKind::Number, "level"), SignalValue::Number(10.0));
}

#[test]
fn rules_run_after_the_wave_result() {
    let bus = MockBus::new();
    bus.register_block(SignalKind::Boolean, "power", LogicBlock::Toggle)
        .unwrap();
    bus.add_rule(
        MockRule::on(SignalKind::Boolean, "power").then(
            SignalKind::String,
            "power_text",
            |t, _, _| SignalValue::from(if t.as_bool() == Some(true) { "On" } else { "Off" }),
        ),
    )
    .unwrap();

    bus.publish(SignalKind::Boolean, "power", true).unwrap();
    assert_eq!(bus.state(SignalKind::String, "power_text"), SignalValue::from("On"));

    // Release abstains, so the rule sees the stored `true`.
    bus.publish(SignalKind::Boolean, "power", false).unwrap();
    assert_eq!(bus.state(SignalKind::String, "power_text"), SignalValue::from("On"));

    bus.publish(SignalKind::Boolean, "power", true).unwrap();
    assert_eq!(bus.state(SignalKind::String, "power_text"), SignalValue::from("Off"));
}

#[test]
fn rules_accumulate_and_clear() {
    let bus = MockBus::new();
    for target in ["a", "b"] {
        bus.add_rule(
            MockRule::on(SignalKind::Boolean, "go")
                .then(SignalKind::Boolean, target, |t, _, _| t.clone()),
        )
        .unwrap();
    }
    assert_eq!(bus.rule_count(SignalKind::Boolean, "go"), 2);

    bus.publish(SignalKind::Boolean, "go", true).unwrap();
    assert_eq!(bus.state(SignalKind::Boolean, "a"), SignalValue::Boolean(true));
    assert_eq!(bus.state(SignalKind::Boolean, "b"), SignalValue::Boolean(true));

    assert_eq!(bus.clear_rules(SignalKind::Boolean, "go"), 2);
    bus.publish(SignalKind::Boolean, "go", false).unwrap();
    assert_eq!(bus.state(SignalKind::Boolean, "a"), SignalValue::Boolean(true));
}

#[test]
fn interlock_releases_other_members() {
    let bus = MockBus::new();
    let members: Vec<jw_core::Address> =
        ["src1", "src2", "src3"].iter().map(|m| (*m).into()).collect();
    for member in ["src1", "src2", "src3"] {
        bus.register_block(
            SignalKind::Boolean,
            member,
            LogicBlock::Interlock {
                members: members.clone(),
            },
        )
        .unwrap();
    }

    bus.publish(SignalKind::Boolean, "src1", true).unwrap();
    bus.publish(SignalKind::Boolean, "src3", true).unwrap();

    assert_eq!(bus.state(SignalKind::Boolean, "src1"), SignalValue::Boolean(false));
    assert_eq!(bus.state(SignalKind::Boolean, "src2"), SignalValue::Boolean(false));
    assert_eq!(bus.state(SignalKind::Boolean, "src3"), SignalValue::Boolean(true));
}

#[test]
fn step_block_drives_number_join_within_bounds() {
    let bus = MockBus::new();
    bus.register_block(
        SignalKind::Boolean,
        "vol_down",
        LogicBlock::Step {
            target: "level".into(),
            delta: -40.0,
            min: Some(0.0),
            max: Some(100.0),
        },
    )
    .unwrap();
    bus.register_mock(SignalKind::Number, "level", None, Some(SignalValue::Number(50.0)))
        .unwrap();

    bus.publish(SignalKind::Boolean, "vol_down", true).unwrap();
    assert_eq!(bus.state(SignalKind::Number, "level"), SignalValue::Number(10.0));
    bus.publish(SignalKind::Boolean, "vol_down", false).unwrap();
    bus.publish(SignalKind::Boolean, "vol_down", true).unwrap();
    assert_eq!(bus.state(SignalKind::Number, "level"), SignalValue::Number(0.0));
}

#[test]
fn mirror_and_reverse_chain() {
    let bus = MockBus::new();
    bus.register_block(SignalKind::String, "in", LogicBlock::Mirror { target: "out".into() })
        .unwrap();
    bus.register_block(SignalKind::String, "out", LogicBlock::Reverse)
        .unwrap();

    bus.publish(SignalKind::String, "in", "abc").unwrap();
    assert_eq!(bus.state(SignalKind::String, "in"), SignalValue::from("abc"));
    assert_eq!(bus.state(SignalKind::String, "out"), SignalValue::from("cba"));
}

#[test]
fn re_registering_replaces_the_wave() {
    let bus = MockBus::new();
    bus.register_block(SignalKind::String, "1", LogicBlock::Reverse)
        .unwrap();
    bus.register_wave(SignalKind::String, "1", |v, _| {
        Ok(Some(SignalValue::from(v.as_str().unwrap_or_default().to_uppercase())))
    })
    .unwrap();
    // Keeps the wave, only changes the seed.
    bus.register_mock(SignalKind::String, "1", None, Some(SignalValue::from("x")))
        .unwrap();

    bus.publish(SignalKind::String, "1", "abc").unwrap();
    assert_eq!(bus.state(SignalKind::String, "1"), SignalValue::from("ABC"));
    assert!(bus.has_wave(SignalKind::String, "1"));
}

#[test]
fn block_kind_is_checked_on_install() {
    let bus = MockBus::new();
    assert!(
        bus.register_block(SignalKind::String, "1", LogicBlock::Toggle)
            .is_err()
    );
    assert!(!bus.has_wave(SignalKind::String, "1"));
}
