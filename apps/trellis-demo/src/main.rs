use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::{
    create_element, deps, nodes, use_callback, use_effect, use_state, Component, EffectResult,
    Event, MemoryTarget, Node, NodeId, OutputTarget, PropValue, Props,
};
use trellis_runtime_std::StdRuntime;

fn field_row() -> Component {
    Component::new("FieldRow", |props: &Props| {
        let name = props.str("name").unwrap_or_default().to_owned();
        let selected = props.bool("selected").unwrap_or(false);

        let mounted = name.clone();
        use_effect(
            move |scope| {
                log::debug!("field {mounted:?} placed");
                scope.on_cleanup(move || log::debug!("field {mounted:?} removed"))
            },
            deps![],
        );

        let class = if selected { "field selected" } else { "field" };
        let mut row = Props::new().with("class", class);
        if let Some(handler) = props.handler("onSelect") {
            row.insert("onClick", handler.clone());
        }
        create_element("li", row, nodes![name]).into()
    })
}

fn label_designer() -> Component {
    Component::new("LabelDesigner", |props: &Props| {
        let title = props.str("title").unwrap_or("Untitled label").to_owned();
        let (fields, set_fields) =
            use_state(|| vec!["Recipient".to_owned(), "Address".to_owned()]);
        let (selected, set_selected) = use_state(|| None::<usize>);

        let count = fields.len();
        use_effect(
            move |_| {
                log::info!("layout now has {count} field(s)");
                EffectResult::default()
            },
            deps![count],
        );

        let add = {
            let set_fields = set_fields.clone();
            let stable = set_fields.as_dep();
            use_callback(
                move |_: &Event| {
                    set_fields.update(|fields| {
                        let mut next = fields.clone();
                        next.push(format!("Field {}", next.len() + 1));
                        next
                    })
                },
                deps![stable],
            )
        };
        let remove = {
            let set_selected = set_selected.clone();
            move |_: &Event| {
                set_fields.update(|fields| {
                    let mut next = fields.clone();
                    next.pop();
                    next
                });
                set_selected.set(None);
            }
        };

        let rows = fields.iter().enumerate().map(|(index, name)| {
            let set_selected = set_selected.clone();
            Node::from(create_element(
                field_row(),
                Props::new()
                    .key(name.as_str())
                    .with("name", name.as_str())
                    .with("selected", selected == Some(index))
                    .with(
                        "onSelect",
                        PropValue::handler(move |_| set_selected.set(Some(index))),
                    ),
                [],
            ))
        });

        create_element(
            "div",
            Props::new().with("class", "designer"),
            nodes![
                create_element("h1", Props::new(), nodes![title]),
                create_element(
                    "div",
                    Props::new().with("class", "toolbar"),
                    nodes![
                        create_element(
                            "button",
                            Props::new().on("click", move |event| add(event)),
                            nodes!["Add field"],
                        ),
                        create_element(
                            "button",
                            Props::new()
                                .on("click", remove)
                                .with("disabled", count == 0),
                            nodes!["Remove field"],
                        ),
                    ],
                ),
                create_element("ul", Props::new(), rows.collect::<Vec<_>>()),
            ],
        )
        .into()
    })
}

/// Clicks the first element with `tag` whose text is `label`.
fn click(target: &Rc<RefCell<MemoryTarget>>, mount: NodeId, tag: &str, label: &str) {
    let handlers = {
        let target = target.borrow();
        let Some(node) = target
            .find_by_tag(mount, tag)
            .into_iter()
            .find(|&node| target.text_content(node) == label)
        else {
            log::warn!("no <{tag}> labelled {label:?}");
            return;
        };
        target.handlers(node, "click").into_iter().map(|handler| (node, handler)).collect::<Vec<_>>()
    };
    for (node, handler) in handlers {
        handler.call(&Event::new("click", node));
    }
}

fn show(target: &Rc<RefCell<MemoryTarget>>, mount: NodeId, step: &str) {
    println!("--- {step} ---");
    print!("{}", target.borrow().dump_tree(mount));
}

fn main() {
    env_logger::init();

    println!("=== Trellis Label Designer ===");
    println!("Drives a headless label layout through a few edits and prints the tree.");
    println!();

    let std_runtime = StdRuntime::new();
    let runtime = std_runtime.runtime();
    let target = Rc::new(RefCell::new(MemoryTarget::new()));
    let mount = target.borrow_mut().create_element("main");
    let root = match runtime.create_root(target.clone(), mount) {
        Ok(root) => root,
        Err(err) => {
            log::error!("cannot mount the designer: {err}");
            return;
        }
    };

    let pump = || {
        if let Err(err) = std_runtime.pump() {
            log::error!("render failed: {err}");
        }
    };

    root.render(create_element(
        label_designer(),
        Props::new().with("title", "Shipping label"),
        [],
    ));
    pump();
    show(&target, mount, "initial layout");

    click(&target, mount, "button", "Add field");
    pump();
    show(&target, mount, "after adding a field");

    click(&target, mount, "li", "Address");
    pump();
    show(&target, mount, "after selecting Address");

    click(&target, mount, "button", "Remove field");
    click(&target, mount, "button", "Remove field");
    pump();
    show(&target, mount, "after removing two fields");

    for error in runtime.take_reported_errors() {
        log::error!("{error}");
    }
    println!(
        "rendered {} time(s) from {} flush request(s)",
        root.render_count(),
        std_runtime.scheduler().request_count()
    );
}
