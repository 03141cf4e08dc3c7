use std::cell::RefCell;
use std::rc::Rc;

use jw_binding::{BindingError, JoinBinding, LogDirection, LogMode, Timeline};
use jw_core::{SignalKind, SignalValue};
use jw_joins::{JoinAtom, JoinError, JoinSpec, Offset};
use jw_mock::{LogicBlock, MockBus};
use proptest::prelude::*;

fn setup() -> (MockBus, Timeline) {
    (MockBus::new(), Timeline::new())
}

#[test]
fn binding_sees_current_value_on_creation() {
    let (bus, timeline) = setup();
    bus.publish(SignalKind::String, "4", "Room 101").unwrap();

    let spec = JoinSpec::single(SignalKind::String, 4);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    assert_eq!(binding.value(), SignalValue::from("Room 101"));
    assert_eq!(bus.subscriber_count(SignalKind::String, "4"), 1);
}

#[test]
fn binding_tracks_publishes_from_elsewhere() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::Number, 10, 12);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    bus.publish(SignalKind::Number, "11", 64).unwrap();

    assert_eq!(
        binding.values(),
        vec![
            SignalValue::Number(0.0),
            SignalValue::Number(64.0),
            SignalValue::Number(0.0)
        ]
    );
}

#[test]
fn drop_unsubscribes_every_address() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::list(
        SignalKind::Boolean,
        vec![JoinAtom::Number(1), JoinAtom::Text("Mute".into())],
    );
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();
    assert_eq!(bus.subscriber_count(SignalKind::Boolean, "1"), 1);
    assert_eq!(bus.subscriber_count(SignalKind::Boolean, "Mute"), 1);

    drop(binding);

    assert_eq!(bus.subscriber_count(SignalKind::Boolean, "1"), 0);
    assert_eq!(bus.subscriber_count(SignalKind::Boolean, "Mute"), 0);
}

#[test]
fn bad_spec_fails_before_subscribing() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::list(SignalKind::Number, Vec::<JoinAtom>::new());

    let err = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap_err();
    assert!(matches!(err, BindingError::Join(JoinError::EmptyList { .. })));

    let spec = JoinSpec::range(SignalKind::Number, 5, 1);
    let err = JoinBinding::new(bus.clone(), spec, timeline).unwrap_err();
    assert!(matches!(err, BindingError::Join(JoinError::EmptyRange { .. })));
    assert!(bus.snapshot().is_empty());
}

#[test]
fn offset_shifts_numeric_joins() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::Number, 10, 13).with_offset(Offset::Uniform(5));
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    let addresses: Vec<&str> = binding.addresses().iter().map(|a| a.as_str()).collect();
    assert_eq!(addresses, vec!["15", "16", "17", "18"]);
}

#[test]
fn publish_all_requires_matching_length() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::Boolean, 1, 3);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    let err = binding
        .publish_all(vec![true.into(), true.into()])
        .unwrap_err();
    assert!(matches!(
        err,
        BindingError::LengthMismatch {
            expected: 3,
            actual: 2
        }
    ));
    for address in ["1", "2", "3"] {
        assert_eq!(bus.state(SignalKind::Boolean, address), SignalValue::Boolean(false));
    }

    binding
        .publish_all(vec![true.into(), false.into(), true.into()])
        .unwrap();
    assert_eq!(
        binding.values(),
        vec![
            SignalValue::Boolean(true),
            SignalValue::Boolean(false),
            SignalValue::Boolean(true)
        ]
    );
}

#[test]
fn publish_rejects_wrong_kind_before_sending() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::Number, 1, 2);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    let err = binding
        .publish_all(vec![1.into(), "two".into()])
        .unwrap_err();
    assert!(matches!(err, BindingError::KindMismatch { .. }));
    assert_eq!(bus.state(SignalKind::Number, "1"), SignalValue::Number(0.0));
}

#[test]
fn publish_index_targets_one_address() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::String, 1, 3);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    binding.publish_index(1, "middle").unwrap();
    assert_eq!(bus.state(SignalKind::String, "2"), SignalValue::from("middle"));

    assert!(matches!(
        binding.publish_index(3, "nope"),
        Err(BindingError::IndexOutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn update_applies_function_to_current_value() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::single(SignalKind::Number, 8);
    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    binding
        .update(|v| SignalValue::Number(v.as_number().unwrap_or_default() + 5.0))
        .unwrap();
    binding
        .update(|v| SignalValue::Number(v.as_number().unwrap_or_default() + 5.0))
        .unwrap();

    assert_eq!(binding.value(), SignalValue::Number(10.0));
}

#[test]
fn mock_initial_value_seeds_the_bus() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::single(SignalKind::Number, 30).with_initial_value(40);

    let binding = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    assert_eq!(binding.value(), SignalValue::Number(40.0));
    assert_eq!(bus.state(SignalKind::Number, "30"), SignalValue::Number(40.0));
}

#[test]
fn logic_waves_reach_the_binding() {
    let (bus, timeline) = setup();
    bus.register_block(
        SignalKind::Number,
        "level",
        LogicBlock::Clamp {
            min: 0.0,
            max: 100.0,
        },
    )
    .unwrap();
    let spec = JoinSpec::named(SignalKind::Number, "level");
    let level = JoinBinding::new(bus.clone(), spec, timeline).unwrap();

    level.publish(150).unwrap();

    assert_eq!(level.value(), SignalValue::Number(100.0));
}

#[test]
fn log_records_init_sent_and_received() {
    let (bus, timeline) = setup();
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lines);
    let log = LogMode::custom(move |record| {
        sink.borrow_mut()
            .push((record.direction, record.index, record.label()));
        None
    });
    let spec = JoinSpec::range(SignalKind::Boolean, 1, 2).with_key("Sources");

    let binding = JoinBinding::with_log(bus.clone(), spec, timeline, log).unwrap();
    binding.publish_index(0, true).unwrap();

    let seen = lines.borrow();
    assert_eq!(
        *seen,
        vec![
            (LogDirection::Init, Some(0), "Sources[0]".to_string()),
            (LogDirection::Init, Some(1), "Sources[1]".to_string()),
            (LogDirection::Sent, Some(0), "Sources[0]".to_string()),
            (LogDirection::Received, Some(0), "Sources[0]".to_string()),
        ]
    );
}

#[test]
fn debounce_sends_only_the_last_value() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::single(SignalKind::Number, 2).with_debounce(100);
    let binding = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();

    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&published);
    bus.subscribe(SignalKind::Number, "2", move |v| sink.borrow_mut().push(v.clone()));
    published.borrow_mut().clear();

    for (n, gap) in [(10, 30), (20, 30), (30, 0)] {
        binding.publish(n).unwrap();
        timeline.advance_by(gap);
    }
    assert!(binding.has_pending_publish());
    assert!(published.borrow().is_empty());

    timeline.advance_by(99);
    assert!(published.borrow().is_empty());
    timeline.advance_by(1);

    assert_eq!(*published.borrow(), vec![SignalValue::Number(30.0)]);
    assert!(!binding.has_pending_publish());
}

#[test]
fn reset_after_returns_every_address_to_default() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::range(SignalKind::Number, 1, 2).with_reset_after(500);
    let binding = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();

    binding.publish_all(vec![3.into(), 4.into()]).unwrap();
    timeline.advance_by(499);
    assert_eq!(bus.state(SignalKind::Number, "2"), SignalValue::Number(4.0));

    timeline.advance_by(1);
    assert_eq!(
        binding.values(),
        vec![SignalValue::Number(0.0), SignalValue::Number(0.0)]
    );
}

#[test]
fn debounce_wraps_reset_after() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::single(SignalKind::Boolean, 9)
        .with_debounce(50)
        .with_reset_after(200);
    let binding = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();

    binding.publish(true).unwrap();
    timeline.advance_by(50);
    assert_eq!(bus.state(SignalKind::Boolean, "9"), SignalValue::Boolean(true));

    timeline.advance_by(200);
    assert_eq!(bus.state(SignalKind::Boolean, "9"), SignalValue::Boolean(false));
}

#[test]
fn dropping_a_binding_cancels_pending_effects() {
    let (bus, timeline) = setup();
    let spec = JoinSpec::single(SignalKind::Boolean, 5)
        .with_debounce(10)
        .with_reset_after(10);
    let binding = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();

    binding.publish(true).unwrap();
    assert_eq!(timeline.pending(), 1);
    drop(binding);

    assert_eq!(timeline.pending(), 0);
    timeline.run_until_idle();
    assert_eq!(bus.state(SignalKind::Boolean, "5"), SignalValue::Boolean(false));
}

proptest! {
    #[test]
    fn debounce_burst_publishes_once(
        values in proptest::collection::vec(-500i32..500, 1..12),
        gap in 0u64..50,
    ) {
        let (bus, timeline) = setup();
        let spec = JoinSpec::single(SignalKind::Number, 1).with_debounce(50);
        let binding = JoinBinding::new(bus.clone(), spec, timeline.clone()).unwrap();
        let count = Rc::new(RefCell::new(0usize));
        let c = Rc::clone(&count);
        bus.subscribe(SignalKind::Number, "1", move |_| *c.borrow_mut() += 1);

        for v in &values {
            binding.publish(*v).unwrap();
            timeline.advance_by(gap);
        }
        timeline.run_until_idle();

        prop_assert_eq!(*count.borrow(), 2);
        let last = *values.last().unwrap();
        prop_assert_eq!(binding.value(), SignalValue::from(last));
    }
}
