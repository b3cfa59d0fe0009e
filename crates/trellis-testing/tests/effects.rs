use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::{Path, PathSegment};
use trellis_testing::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// A component whose effect logs its runs and cleanups under `name`.
fn tracked(name: &'static str, log: &Log) -> Component {
    let log = log.clone();
    Component::new(name, move |props: &Props| {
        let dep = props.number("dep").unwrap_or(0.0);
        let log = log.clone();
        use_effect(
            move |scope| {
                log.borrow_mut().push(format!("run {name} {dep}"));
                scope.on_cleanup(move || log.borrow_mut().push(format!("cleanup {name} {dep}")))
            },
            deps![dep],
        );
        create_element("span", Props::new(), nodes![name]).into()
    })
}

#[test]
fn effects_run_after_commit_in_invocation_order() {
    let events = log();
    let harness = TestHarness::new();
    let target = harness.target();
    let mount = harness.mount();

    let record = events.clone();
    let child = tracked("child", &events);
    let parent = Component::new("Parent", move |_: &Props| {
        let record = record.clone();
        let target = target.clone();
        use_effect(
            move |_| {
                let text = target.borrow().text_content(mount);
                record.borrow_mut().push(format!("parent sees {text:?}"));
                EffectResult::default()
            },
            deps![],
        );
        create_element(
            "div",
            Props::new(),
            nodes![create_element(child.clone(), Props::new(), [])],
        )
        .into()
    });

    harness
        .set_content(create_element(parent, Props::new(), []))
        .unwrap();
    assert_eq!(
        entries(&events),
        vec!["parent sees \"child\"", "run child 0"]
    );
}

#[test]
fn previous_cleanup_runs_before_the_next_effect() {
    let events = log();
    let view = tracked("view", &events);
    let harness = TestHarness::new();
    let with_dep = |dep: i32| create_element(view.clone(), Props::new().with("dep", dep), []);

    harness.set_content(with_dep(1)).unwrap();
    harness.set_content(with_dep(1)).unwrap();
    harness.set_content(with_dep(2)).unwrap();

    assert_eq!(
        entries(&events),
        vec!["run view 1", "cleanup view 1", "run view 2"]
    );
}

#[test]
fn empty_deps_run_once_and_missing_deps_run_every_time() {
    let once = Rc::new(Cell::new(0));
    let always = Rc::new(Cell::new(0));
    let (once_count, always_count) = (once.clone(), always.clone());
    let view = Component::new("Counts", move |_: &Props| {
        let once_count = once_count.clone();
        let always_count = always_count.clone();
        use_effect(
            move |_| {
                once_count.set(once_count.get() + 1);
                EffectResult::none()
            },
            deps![],
        );
        use_effect(
            move |_| {
                always_count.set(always_count.get() + 1);
                EffectResult::none()
            },
            None,
        );
        Node::Empty
    });

    let harness = TestHarness::new();
    let element = create_element(view, Props::new(), []);
    for _ in 0..3 {
        harness.set_content(element.clone()).unwrap();
    }
    assert_eq!(once.get(), 1);
    assert_eq!(always.get(), 3);
}

#[test]
fn removed_components_are_cleaned_up_once() {
    let events = log();
    let keep = tracked("keep", &events);
    let gone = tracked("gone", &events);
    let harness = TestHarness::new();

    let tree = |with_gone: bool| -> Node {
        create_element(
            "div",
            Props::new(),
            nodes![
                create_element(keep.clone(), Props::new().key("keep"), []),
                with_gone.then(|| create_element(gone.clone(), Props::new().key("gone"), [])),
            ],
        )
        .into()
    };

    harness.set_content(tree(true)).unwrap();
    let root = Path::root(harness.root().id());
    let gone_path = root.child(PathSegment::Key("gone".into()));
    assert!(harness.runtime().has_hook_state(&gone_path));

    harness.set_content(tree(false)).unwrap();
    assert!(!harness.runtime().has_hook_state(&gone_path));
    assert_eq!(harness.runtime().hook_record_count(), 1);

    harness.set_content(tree(false)).unwrap();
    assert_eq!(
        entries(&events),
        vec!["run keep 0", "run gone 0", "cleanup gone 0"]
    );
    assert_eq!(harness.text(), "keep");
}

#[test]
fn cleanups_of_removed_components_run_before_the_next_render() {
    let events = log();
    let gone = tracked("gone", &events);
    let record = events.clone();
    let reader = Component::new("Reader", move |_: &Props| {
        let (value, _) = use_state(|| 0);
        record.borrow_mut().push(format!("read {value}"));
        Node::Empty
    });
    let harness = TestHarness::new();
    let tree = |with_gone: bool| -> Node {
        create_element(
            FRAGMENT,
            Props::new(),
            nodes![
                with_gone.then(|| create_element(gone.clone(), Props::new().key("g"), [])),
                create_element(reader.clone(), Props::new().key("r"), []),
            ],
        )
        .into()
    };

    harness.set_content(tree(true)).unwrap();
    harness.set_content(tree(false)).unwrap();
    harness.set_content(tree(false)).unwrap();

    assert_eq!(
        entries(&events),
        vec!["read 0", "run gone 0", "read 0", "cleanup gone 0", "read 0"]
    );
}

#[test]
fn failing_effect_cleanup_is_reported_and_the_queue_continues() {
    let events = log();
    let record = events.clone();
    let view = Component::new("Flaky", move |props: &Props| {
        let dep = props.number("dep").unwrap_or(0.0);
        let first = record.clone();
        use_effect(
            move |scope| {
                first.borrow_mut().push(format!("first {dep}"));
                scope.on_cleanup(|| panic!("cleanup exploded"))
            },
            deps![dep],
        );
        let second = record.clone();
        use_effect(
            move |_| {
                second.borrow_mut().push(format!("second {dep}"));
                EffectResult::default()
            },
            deps![dep],
        );
        Node::Empty
    });

    let harness = TestHarness::new();
    let with_dep = |dep: i32| create_element(view.clone(), Props::new().with("dep", dep), []);
    harness.set_content(with_dep(1)).unwrap();
    harness.set_content(with_dep(2)).unwrap();

    assert_eq!(
        entries(&events),
        vec!["first 1", "second 1", "first 2", "second 2"]
    );
    let errors = harness.runtime().take_reported_errors();
    assert_eq!(
        errors,
        vec![RenderError::EffectCleanup {
            path: Path::root(harness.root().id()),
            message: "cleanup exploded".to_owned(),
        }]
    );
    assert!(harness.runtime().take_reported_errors().is_empty());
}

#[test]
fn failing_unmount_cleanup_does_not_stop_the_sweep() {
    let events = log();
    let record = events.clone();
    let bomb = Component::new("Bomb", move |_: &Props| {
        let record = record.clone();
        use_effect(
            |scope| scope.on_cleanup(|| panic!("bomb")),
            deps![],
        );
        use_effect(
            move |scope| scope.on_cleanup(move || record.borrow_mut().push("after bomb".to_owned())),
            deps![],
        );
        Node::Empty
    });
    let quiet = tracked("quiet", &events);

    let harness = TestHarness::new();
    harness
        .set_content(create_element(
            FRAGMENT,
            Props::new(),
            nodes![
                create_element(bomb, Props::new().key("a"), []),
                create_element(quiet, Props::new().key("b"), []),
            ],
        ))
        .unwrap();
    harness.set_content("empty").unwrap();

    assert_eq!(
        entries(&events),
        vec!["run quiet 0", "after bomb", "cleanup quiet 0"]
    );
    let errors = harness.runtime().take_reported_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        RenderError::UnmountCleanup { message, .. } if message == "bomb"
    ));
    assert_eq!(harness.runtime().hook_record_count(), 0);
}

#[test]
fn reset_unmounts_everything() {
    let events = log();
    let view = tracked("view", &events);
    let harness = TestHarness::new();
    harness
        .set_content(create_element(view, Props::new(), []))
        .unwrap();

    harness.runtime().reset();
    assert_eq!(entries(&events), vec!["run view 0", "cleanup view 0"]);
    assert_eq!(harness.runtime().hook_record_count(), 0);
    assert!(!harness.runtime().has_root(harness.root().id()));

    harness.render("ignored");
    assert!(!harness.runtime().has_pending_tasks());
}
