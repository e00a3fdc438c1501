//! Scan a page with wrapped translations, mutate it, and look up key positions
//!
//! Run with `RUST_LOG=debug` to see the observer's batch logging.

use inplace_dom::DOMRect;
use inplace_observer::{InvisibleWrapper, Observer, RunProps, WrapProps, Wrapper};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let wrapper = InvisibleWrapper::new();
    let greeting = wrapper.wrap(&WrapProps::new("greeting").translation("Hello"));
    let hint = wrapper.wrap(&WrapProps::new("search.hint").ns("forms").translation("Search..."));

    let html = format!(
        r#"<html><body>
            <h1 id="title">{greeting}</h1>
            <input id="search" placeholder="{hint}">
            <div id="feed"></div>
        </body></html>"#
    );
    let mut document = inplace_html::parse(&html)?;

    let mut observer = Observer::new();
    observer.run(Some(&mut document), RunProps::default())?;

    let title = document.get_element_by_id("title").ok_or_else(|| anyhow::anyhow!("missing #title"))?;
    println!("title now reads {:?}", document.tree().text_content(title));

    let feed = document.get_element_by_id("feed").ok_or_else(|| anyhow::anyhow!("missing #feed"))?;
    let item = wrapper.wrap(&WrapProps::new("feed.empty").translation("Nothing here yet"));
    inplace_html::append_html(document.tree_mut(), feed, &format!("<p>{item}</p>"))?;
    let records = observer.flush(&mut document);
    println!("processed {records} mutation records");

    document.tree_mut().set_bounding_rect(title, DOMRect::from_xywh(0.0, 0.0, 400.0, 40.0))?;
    for position in observer.find_positions(&document, None, None) {
        println!(
            "{:>12} ns={:<6} at ({}, {})",
            position.key_name, position.key_namespace, position.position.x, position.position.y
        );
    }

    if let Some(hit) = observer.key_at_point(&document, 10.0, 10.0) {
        println!("key under (10, 10): {}", hit.key_name);
    }

    observer.stop();
    Ok(())
}
