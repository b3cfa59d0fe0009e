use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{MemoryTarget, NodeId, OutputTarget, Root, Runtime, SetState};
use trellis_testing::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn two_mounts() -> (Rc<RefCell<MemoryTarget>>, NodeId, NodeId) {
    let target = Rc::new(RefCell::new(MemoryTarget::new()));
    let (left, right) = {
        let mut target = target.borrow_mut();
        (target.create_element("div"), target.create_element("div"))
    };
    (target, left, right)
}

fn announcing(name: &'static str, log: &Log) -> Node {
    let log = log.clone();
    let component = Component::new(name, move |_: &Props| {
        log.borrow_mut().push(name.to_owned());
        Node::from(name)
    });
    create_element(component, Props::new(), []).into()
}

/// Sets its own state once from an effect, so a second render is requested
/// while the first flush is still running.
fn self_updating() -> Node {
    let component = Component::new("SelfUpdating", |_: &Props| {
        let (phase, set_phase) = use_state(|| "initial");
        use_effect(
            move |_| {
                set_phase.set("updated");
                EffectResult::default()
            },
            deps![],
        );
        Node::from(phase)
    });
    create_element(component, Props::new(), []).into()
}

#[test]
fn render_requests_coalesce_into_one_flush() {
    let harness = TestHarness::new();
    harness.render("one");
    harness.render("two");
    harness.render("three");
    assert_eq!(harness.text(), "");

    harness.flush().unwrap();
    assert_eq!(harness.text(), "three");
    assert_eq!(harness.root().render_count(), 1);
}

#[test]
fn roots_flush_in_first_scheduled_order() {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let runtime = Runtime::new();
    let (target, left, right) = two_mounts();
    let a = runtime.create_root(target.clone(), left).unwrap();
    let b = runtime.create_root(target.clone(), right).unwrap();

    b.render(announcing("b", &log));
    a.render(announcing("a", &log));
    b.render(announcing("b again", &log));
    assert_eq!(runtime.pending_roots(), vec![b.id(), a.id()]);

    runtime.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["b again", "a"]);
    assert_eq!(target.borrow().text_content(left), "a");
    assert_eq!(target.borrow().text_content(right), "b again");
    assert!(runtime.pending_roots().is_empty());
}

#[test]
fn deferred_tasks_run_after_the_flush_they_queued_behind() {
    let harness = TestHarness::new();
    let seen = Rc::new(RefCell::new(String::new()));
    harness.render("painted");
    let target = harness.target();
    let mount = harness.mount();
    let record = seen.clone();
    harness
        .runtime()
        .spawn_task(move || *record.borrow_mut() = target.borrow().text_content(mount));

    harness.flush().unwrap();
    assert_eq!(*seen.borrow(), "painted");
}

#[test]
fn updates_during_a_flush_wait_for_the_next_request() {
    let harness = TestHarness::new();
    harness.set_content(self_updating()).unwrap();

    assert_eq!(harness.text(), "initial");
    assert_eq!(harness.root().render_count(), 1);
    assert!(harness.runtime().is_pending(harness.root().id()));
    assert!(!harness.runtime().has_pending_tasks());

    harness.runtime().schedule_render(harness.root().id());
    harness.flush().unwrap();
    assert_eq!(harness.text(), "updated");
    assert_eq!(harness.root().render_count(), 2);
    assert!(!harness.runtime().is_pending(harness.root().id()));
}

#[test]
fn draining_picks_up_updates_made_during_the_flush() {
    let harness = TestHarness::with_options(RuntimeOptions::new().drain_reentrant_updates(true));
    harness.set_content(self_updating()).unwrap();

    assert_eq!(harness.text(), "updated");
    assert_eq!(harness.root().render_count(), 2);
    assert!(harness.runtime().pending_roots().is_empty());
}

#[test]
fn runaway_updates_hit_the_pass_limit() {
    let harness = TestHarness::with_options(
        RuntimeOptions::new()
            .drain_reentrant_updates(true)
            .max_flush_passes(3),
    );
    let component = Component::new("Runaway", |_: &Props| {
        let (count, set_count) = use_state(|| 0);
        use_effect(
            move |_| {
                set_count.set(count + 1);
                EffectResult::default()
            },
            None,
        );
        Node::from(count)
    });

    let result = harness.set_content(create_element(component, Props::new(), []));
    assert_eq!(result, Err(RenderError::UpdateDepthExceeded { passes: 3 }));
    assert_eq!(harness.root().render_count(), 3);
    assert!(!harness.runtime().is_flushing());
}

#[test]
fn a_failing_root_leaves_later_roots_pending() {
    let runtime = Runtime::new();
    let (target, left, right) = two_mounts();
    let bad = runtime.create_root(target.clone(), left).unwrap();
    let good = runtime.create_root(target.clone(), right).unwrap();

    bad.render(create_element("no such tag", Props::new(), []));
    good.render("fine");
    assert!(runtime.run_until_idle().is_err());
    assert!(runtime.is_pending(good.id()));
    assert!(!runtime.is_pending(bad.id()));
    assert_eq!(good.render_count(), 0);

    runtime.schedule_render(good.id());
    runtime.run_until_idle().unwrap();
    assert_eq!(target.borrow().text_content(right), "fine");
    assert_eq!(good.render_count(), 1);
}

#[test]
fn a_failing_task_keeps_later_tasks_queued() {
    let runtime = Runtime::new();
    let (target, left, _) = two_mounts();
    let root = runtime.create_root(target, left).unwrap();
    root.render(create_element("", Props::new(), []));
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();
    runtime.spawn_task(move || *flag.borrow_mut() = true);

    assert_eq!(
        runtime.run_until_idle(),
        Err(RenderError::UnsupportedElementType {
            name: String::new()
        })
    );
    assert!(!*ran.borrow());
    assert!(runtime.has_pending_tasks());
    runtime.run_until_idle().unwrap();
    assert!(*ran.borrow());
}

#[test]
fn missing_mounts_are_rejected() {
    let runtime = Runtime::new();
    let (target, _, _) = two_mounts();
    let err = runtime.render("x", target, 99).unwrap_err();
    assert_eq!(err, RenderError::MissingMount { mount: 99 });
    assert_eq!(err.to_string(), "cannot create a root: mount node 99 does not exist");
}

#[test]
fn render_shorthand_reuses_the_root_for_a_mount() {
    let runtime = Runtime::new();
    let (target, left, _) = two_mounts();
    let first: Root = runtime.render("first", target.clone(), left).unwrap();
    let second = runtime.render("second", target.clone(), left).unwrap();
    assert_eq!(first.id(), second.id());

    runtime.run_until_idle().unwrap();
    assert_eq!(target.borrow().text_content(left), "second");
    assert_eq!(first.render_count(), 1);
}

#[test]
fn setters_outlive_their_runtime_quietly() {
    let setter: Rc<RefCell<Option<SetState<i32>>>> = Rc::new(RefCell::new(None));
    let slot = setter.clone();
    {
        let harness = TestHarness::new();
        let component = Component::new("Keeper", move |_: &Props| {
            let (value, set_value) = use_state(|| 0);
            *slot.borrow_mut() = Some(set_value);
            Node::from(value)
        });
        harness
            .set_content(create_element(component, Props::new(), []))
            .unwrap();
    }
    let set_value = setter.borrow().clone().unwrap();
    set_value.set(5);
    assert_eq!(set_value.get(), 5);
}
