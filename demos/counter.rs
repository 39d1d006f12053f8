//! Counter Example - markup bindings driven by reactive state
//!
//! Builds a small page in a headless document, binds a counter component to
//! it, simulates a few clicks and prints the markup after each turn.
//!
//! Run with: RUST_LOG=spark_bind=debug cargo run --example counter

use spark_bind::{BindConfig, Component, ComponentType, Runtime};
use tracing_subscriber::EnvFilter;

const PAGE: &str = r#"
<main id="counter" data-state="{ count: 0, step: 1 }" data-props="{ label: 'Clicks' }">
  <h1 :text="label + ': ' + count"></h1>
  <p :show="count >= 3" :class="{ warn: count >= 5 }">Getting busy</p>
  <button ref="inc" @click="increment">+</button>
  <button ref="reset" @click.prevent="count = 0">reset</button>
  <input type="number" :model="step">
</main>
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let (runtime, queue) = Runtime::headless(BindConfig::default());
    let doc = runtime.document().clone();
    doc.append_html(doc.body(), PAGE);

    let counter = ComponentType::new("Counter")
        .computed("label", |cx| cx.component().props().get(&"label".into()))
        .method("increment", |_, _, state| {
            let next = state.get_value("count").to_number() + state.get_value("step").to_number();
            if let Err(error) = state.set("count", next) {
                tracing::warn!(%error, "increment failed");
            }
        })
        .update(|c, cx| println!("render #{} count={}", c.id(), cx.get("count")));

    let component = Component::mount(&runtime, "#counter", &counter);
    queue.tick();
    println!("{}\n", doc.outer_html(doc.body()).trim());

    let Some(inc) = component.refs().one("inc") else {
        eprintln!("increment button missing");
        return;
    };

    // Three clicks in one turn render once.
    for _ in 0..3 {
        doc.click(inc);
    }
    queue.tick();

    if let Some(input) = component.find_one("input") {
        doc.set_value(input, "2");
        doc.fire(input, "input");
    }
    doc.click(inc);
    queue.tick();
    println!("{}\n", doc.outer_html(doc.body()).trim());

    if let Some(reset) = component.refs().one("reset") {
        doc.click(reset);
    }
    queue.tick();
    println!("count after reset: {}", component.state().get_value("count"));

    component.destroy();
    doc.click(inc);
    queue.tick();
    println!(
        "after destroy: count={} generation={}",
        component.state().get_value("count"),
        runtime.scheduler().generation()
    );
}
