//! `@` event bindings and their modifiers.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use spark_bind::{ComponentType, Event, EventTarget, Value};

use common::Fixture;

#[test]
fn test_method_handler_receives_event_and_state() {
    let fx = Fixture::new();
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let log = kinds.clone();
    let ty = ComponentType::new("Counter")
        .state(Value::from_pairs([("count", 0)]))
        .method("increment", move |c, event, state| {
            log.borrow_mut().push(format!("{}:{}", c.name(), event.kind()));
            let next = state.get_value("count").to_number() + 1.0;
            state.set("count", next).unwrap();
        });
    let c = fx.mount(r#"<div><button @click="increment"></button><span :text="count"></span></div>"#, &ty);
    fx.tick();

    let button = fx.find("button");
    fx.doc().click(button);
    fx.doc().click(button);
    fx.tick();

    assert_eq!(c.state().get_value("count"), Value::from(2));
    assert_eq!(fx.text("span"), "2");
    assert_eq!(*kinds.borrow(), vec!["Counter:click", "Counter:click"]);
}

#[test]
fn test_inline_handlers() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ count: 0, last: '', items: [] }">
            <button id="inc" @click="count++"></button>
            <button id="add" @click="count += 10; last = event.type"></button>
            <button id="push" @click="items.push(count)"></button>
            <button id="call" @click="bump()"></button>
        </div>"#,
        &ComponentType::new("Inline").method("bump", |_, event, state| {
            state.set("last", event.kind()).unwrap();
        }),
    );
    let doc = fx.doc();

    doc.click(fx.find("#inc"));
    doc.click(fx.find("#add"));
    doc.click(fx.find("#push"));
    doc.dispatch_event(fx.find("#call"), &Event::bubbling("click"));

    let state = c.state();
    assert_eq!(state.get_value("count"), Value::from(11));
    assert_eq!(state.get_value("last"), Value::from("click"));
    assert_eq!(state.at("items").value(), Value::Array(vec![Value::from(11)]));
}

#[test]
fn test_inline_error_is_contained() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ n: 0 }">
            <button @click="undeclared = 1"></button>
            <button @click="n++"></button>
        </div>"#,
        &ComponentType::new("Contained"),
    );
    let buttons = c.find_all("button");

    fx.doc().click(buttons[0]);
    fx.doc().click(buttons[1]);

    assert_eq!(c.state().get_value("n"), Value::from(1));
    assert!(!c.state().contains_key("undeclared"));
}

#[test]
fn test_prevent_and_stop() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ outer: 0, inner: 0 }">
            <section @click="outer++">
                <a id="plain" @click="inner++"></a>
                <a id="stopped" @click.stop.prevent="inner++"></a>
            </section>
        </div>"#,
        &ComponentType::new("Bubbles"),
    );
    let doc = fx.doc();

    assert!(doc.click(fx.find("#plain")));
    assert!(!doc.click(fx.find("#stopped")));

    assert_eq!(c.state().get_value("inner"), Value::from(2));
    assert_eq!(c.state().get_value("outer"), Value::from(1));
}

#[test]
fn test_self_ignores_bubbled_events() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ hits: 0 }"><div id="panel" @click.self="hits++"><button></button></div></div>"#,
        &ComponentType::new("Overlay"),
    );

    fx.doc().click(fx.find("#panel button"));
    assert_eq!(c.state().get_value("hits"), Value::from(0));
    fx.doc().click(fx.find("#panel"));
    assert_eq!(c.state().get_value("hits"), Value::from(1));
}

#[test]
fn test_once_fires_a_single_time() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ n: 0 }"><button @click.once="n++"></button></div>"#,
        &ComponentType::new("Once"),
    );
    let button = fx.find("button");

    fx.doc().click(button);
    fx.doc().click(button);
    assert_eq!(c.state().get_value("n"), Value::from(1));
    assert_eq!(fx.doc().listener_count(button), 0);
}

#[test]
fn test_outside_listens_on_document() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ open: true }"><div id="menu" @click.outside="open = false"><a>item</a></div></div>"#,
        &ComponentType::new("Dropdown"),
    );
    let elsewhere = fx.load("<p>elsewhere</p>");

    fx.doc().click(fx.find("#menu a"));
    assert_eq!(c.state().get_value("open"), Value::Bool(true));
    fx.doc().click(elsewhere);
    assert_eq!(c.state().get_value("open"), Value::Bool(false));
}

#[test]
fn test_window_and_document_targets() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ resized: 0, keys: 0 }"><i @resize.window="resized++" @keydown.document="keys++"></i></div>"#,
        &ComponentType::new("Global"),
    );
    let doc = fx.doc();

    doc.dispatch_event(EventTarget::Window, &Event::new("resize"));
    doc.dispatch_event(EventTarget::Document, &Event::new("keydown"));
    doc.fire(fx.find("i"), "keydown");

    assert_eq!(c.state().get_value("resized"), Value::from(1));
    assert_eq!(c.state().get_value("keys"), Value::from(2));

    c.destroy();
    doc.dispatch_event(EventTarget::Window, &Event::new("resize"));
    assert_eq!(c.state().get_value("resized"), Value::from(1));
}

#[test]
fn test_unknown_modifiers_are_ignored() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ n: 0 }"><button @click.debounce="n++"></button></div>"#,
        &ComponentType::new("Lenient"),
    );
    fx.doc().click(fx.find("button"));
    assert_eq!(c.state().get_value("n"), Value::from(1));
}

#[test]
fn test_event_target_fields() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ q: '', on: false, from: '' }">
            <input id="query" name="q" @input="q = event.target.value; from = event.target.id">
            <input type="checkbox" @change="on = event.target.checked">
            <section @click="from = event.currentTarget.tagName + '<' + event.target.tagName">
                <em>x</em>
            </section>
        </div>"#,
        &ComponentType::new("Targets"),
    );
    let doc = fx.doc();

    let query = fx.find("#query");
    doc.set_value(query, "hello");
    doc.fire(query, "input");
    assert_eq!(c.state().get_value("q"), Value::from("hello"));
    assert_eq!(c.state().get_value("from"), Value::from("query"));

    let checkbox = fx.find("[type=checkbox]");
    doc.set_checked(checkbox, true);
    doc.fire(checkbox, "change");
    assert_eq!(c.state().get_value("on"), Value::from(true));

    doc.click(fx.find("em"));
    assert_eq!(c.state().get_value("from"), Value::from("SECTION<EM"));
}

#[test]
fn test_inline_handler_cancels_the_live_event() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ prevented: false, outer: 0 }">
            <section @click="outer++">
                <a id="prevent" @click="event.preventDefault(); prevented = true"></a>
                <a id="stop" @click="event.stopPropagation()"></a>
                <a id="halt" @click="event.stopImmediatePropagation()"></a>
                <a id="passive" @click.passive="event.preventDefault()"></a>
            </section>
        </div>"#,
        &ComponentType::new("Cancel"),
    );
    let doc = fx.doc();

    assert!(!doc.click(fx.find("#prevent")));
    assert_eq!(c.state().get_value("prevented"), Value::from(true));
    assert_eq!(c.state().get_value("outer"), Value::from(1));

    assert!(doc.click(fx.find("#stop")));
    assert_eq!(c.state().get_value("outer"), Value::from(1));

    doc.click(fx.find("#halt"));
    assert_eq!(c.state().get_value("outer"), Value::from(1));

    assert!(doc.click(fx.find("#passive")));
    assert_eq!(c.state().get_value("outer"), Value::from(2));
}

#[test]
fn test_state_key_named_event_shadows_the_event() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ event: { log: [] } }">
            <a id="log" @click="event.log.push(1)"></a>
            <a id="prevent" @click="event.preventDefault()"></a>
        </div>"#,
        &ComponentType::new("Shadow"),
    );
    fx.doc().click(fx.find("#log"));
    assert_eq!(c.state().at("event").at("log").value(), Value::from(vec![1]));
    // `event` is the state object here, which has no such method.
    assert!(fx.doc().click(fx.find("#prevent")));
}

#[test]
fn test_huge_index_write_does_not_panic() {
    let fx = Fixture::new();
    let c = fx.mount(
        r#"<div data-state="{ items: [] }">
            <button id="far" @click="items[1e300] = 1"></button>
            <button id="big" @click="items[1e9] = 1"></button>
            <button id="len" @click="items.length = 1e12"></button>
        </div>"#,
        &ComponentType::new("Huge"),
    );

    for id in ["#far", "#big", "#len"] {
        fx.doc().click(fx.find(id));
    }
    assert_eq!(c.state().get_value("items"), Value::array());
}
