//! Render batching across components and flushes.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use spark_bind::{BindConfig, ComponentType, Value};

use common::{Fixture, counting};

#[test]
fn test_synchronous_writes_render_once() {
    let fx = Fixture::new();
    let (ty, renders) = counting("Pair");
    let c = fx.mount(r#"<div data-state="{ a: 0, b: 0 }"></div>"#, &ty);
    fx.tick();
    assert_eq!(renders.get(), 1);

    let state = c.state();
    state.set("a", 1).unwrap();
    state.set("b", 2).unwrap();
    state.set("a", 3).unwrap();
    assert_eq!(renders.get(), 1);
    fx.tick();

    assert_eq!(renders.get(), 2);
    assert_eq!(state.get_value("a"), Value::from(3));
    assert_eq!(state.get_value("b"), Value::from(2));
}

#[test]
fn test_same_value_write_still_renders() {
    let fx = Fixture::new();
    let (ty, renders) = counting("Same");
    let c = fx.mount(r#"<div data-state="{ a: 1 }"></div>"#, &ty);
    fx.tick();

    c.state().set("a", 1).unwrap();
    fx.tick();
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_nested_and_array_writes_schedule_render() {
    let fx = Fixture::new();
    let (ty, renders) = counting("Deep");
    let c = fx.mount(r#"<div data-state="{ user: { tags: ['a'] } }"><b :text="user.tags.length"></b></div>"#, &ty);
    fx.tick();

    c.state().at("user").at("tags").push("b").unwrap();
    fx.tick();
    assert_eq!(renders.get(), 2);
    assert_eq!(fx.text("b"), "2");

    c.state().at("user").at("tags").set(0usize, "z").unwrap();
    fx.tick();
    assert_eq!(renders.get(), 3);
}

#[test]
fn test_components_render_in_enqueue_order() {
    let fx = Fixture::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let log = order.clone();
    let ty = ComponentType::new("Ordered").update(move |c, cx| {
        log.borrow_mut().push(format!("{}={}", c.id(), cx.get("v")));
    });
    let first = fx.mount(r#"<div data-state="{ v: 1 }"></div>"#, &ty);
    let second = fx.mount(r#"<div data-state="{ v: 2 }"></div>"#, &ty);
    fx.tick();
    order.borrow_mut().clear();

    second.state().set("v", 20).unwrap();
    first.state().set("v", 10).unwrap();
    second.state().set("v", 21).unwrap();
    fx.tick();

    assert_eq!(
        *order.borrow(),
        vec![format!("{}=21", second.id()), format!("{}=10", first.id())]
    );
}

#[test]
fn test_write_during_render_is_deferred() {
    let fx = Fixture::new();
    let renders = Rc::new(Cell::new(0));
    let seen = renders.clone();
    let ty = ComponentType::new("Settle").update(move |c, cx| {
        seen.set(seen.get() + 1);
        if cx.get("n").to_number() < 3.0 {
            let next = cx.get("n").to_number() + 1.0;
            c.state().set("n", next).unwrap();
        }
    });
    let c = fx.mount(r#"<div data-state="{ n: 0 }"><i :text="n"></i></div>"#, &ty);
    let generation = fx.runtime.scheduler().generation();

    fx.tick();

    // Each render's write lands in the following flush.
    assert_eq!(renders.get(), 4);
    assert_eq!(fx.runtime.scheduler().generation(), generation + 4);
    assert_eq!(c.state().get_value("n"), Value::from(3));
    assert_eq!(fx.text("i"), "3");
}

#[test]
fn test_runaway_render_loop_is_cut_off() {
    let config = BindConfig {
        max_flush_depth: 5,
        ..Default::default()
    };
    let fx = Fixture::with_config(config);
    let renders = Rc::new(Cell::new(0));
    let seen = renders.clone();
    let ty = ComponentType::new("Runaway").update(move |c, cx| {
        seen.set(seen.get() + 1);
        let next = cx.get("n").to_number() + 1.0;
        c.state().set("n", next).unwrap();
    });
    let c = fx.mount(r#"<div data-state="{ n: 0 }"></div>"#, &ty);

    fx.tick();

    assert_eq!(renders.get(), 6);
    assert!(!fx.runtime.scheduler().is_scheduled());
    assert_eq!(fx.runtime.scheduler().pending(), 0);

    // A fresh write starts a new chain.
    c.state().set("n", 0).unwrap();
    fx.tick();
    assert_eq!(renders.get(), 12);
}

proptest! {
    #[test]
    fn prop_any_write_burst_renders_once(writes in prop::collection::vec((0usize..3, -50i32..50), 1..24)) {
        let fx = Fixture::new();
        let (ty, renders) = counting("Burst");
        let c = fx.mount(r#"<div data-state="{ k0: 0, k1: 0, k2: 0 }"></div>"#, &ty);
        fx.tick();

        let mut expected = [0i32; 3];
        for (key, value) in &writes {
            c.state().set(format!("k{key}"), *value).unwrap();
            expected[*key] = *value;
        }
        fx.tick();

        prop_assert_eq!(renders.get(), 2);
        for (key, value) in expected.iter().enumerate() {
            prop_assert_eq!(c.state().get_value(format!("k{key}")), Value::from(*value));
        }
    }
}
