//! Observer scenarios
//!
//! Documents are parsed with inplace-html, mutated through the DOM API and
//! flushed the way a host event loop would.

use std::cell::RefCell;
use std::rc::Rc;

use inplace_dom::{DOMRect, Document, NodeId};
use inplace_observer::{
    ClickCallback, InvisibleWrapper, ModifierKey, Observer, ObserverOptions, PassToParent, PointerEvent, RunProps,
    TranslationClick, WrapProps, WrappedKey, Wrapper, KEY_ONLY_ATTRIBUTE,
};

fn wrap(key: &str, text: &str) -> String {
    InvisibleWrapper::new().wrap(&WrapProps::new(key).translation(text))
}

fn start(html: &str) -> (Document, Observer) {
    start_with(html, RunProps::default())
}

fn start_with(html: &str, props: RunProps) -> (Document, Observer) {
    let mut document = inplace_html::parse(html).expect("fixture parses");
    let mut observer = Observer::new();
    observer.run(Some(&mut document), props).expect("observer starts");
    (document, observer)
}

fn by_id(document: &Document, id: &str) -> NodeId {
    document.get_element_by_id(id).expect("fixture element")
}

// ============================================================================
// Initial scan and live updates
// ============================================================================

#[test]
fn test_initial_scan_decodes_and_indexes() {
    let html = format!(r#"<div id="a">Hello {}</div>"#, wrap("greet", "World"));
    let (document, observer) = start(&html);
    let div = by_id(&document, "a");

    assert_eq!(document.tree().text_content(div), "Hello World");
    let found = observer.find_all(Some("greet"), None);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].element, div);
    assert_eq!(found[0].nodes.len(), 1);

    let meta = found[0].nodes.values().next().unwrap();
    assert_eq!(meta.new_text_content, "Hello World");
    assert_eq!(meta.keys, vec![WrappedKey::new("greet")]);
    assert!(!meta.key_attribute_only);
}

#[test]
fn test_appended_markup_is_indexed_on_flush() {
    let (mut document, mut observer) = start(r#"<div id="root"></div>"#);
    let root = by_id(&document, "root");

    let markup = format!("<span>{}</span>", wrap("new", "New"));
    inplace_html::append_html(document.tree_mut(), root, &markup).unwrap();
    assert!(observer.find_all(Some("new"), None).is_empty());

    assert!(observer.flush(&mut document) > 0);
    let found = observer.find_all(Some("new"), None);
    assert_eq!(found.len(), 1);
    assert_eq!(document.tree().tag_name(found[0].element), Some("span"));
    assert_eq!(document.tree().text_content(root), "New");
}

#[test]
fn test_removed_element_is_forgotten() {
    let html = format!(r#"<div id="a">{}</div><p id="b">{}</p>"#, wrap("greet", "Hi"), wrap("other", "Other"));
    let (mut document, mut observer) = start(&html);
    let div = by_id(&document, "a");

    document.tree_mut().remove(div).unwrap();
    observer.flush(&mut document);

    assert!(observer.find_all(Some("greet"), None).is_empty());
    assert_eq!(observer.find_all(Some("other"), None).len(), 1);
}

#[test]
fn test_key_only_attribute() {
    let html = format!(r#"<img id="logo" src="logo.png" {KEY_ONLY_ATTRIBUTE}="brand.logo">"#);
    let (document, observer) = start(&html);
    let img = by_id(&document, "logo");

    let found = observer.find_all(Some("brand.logo"), None);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].element, img);
    let meta = found[0].nodes.values().next().unwrap();
    assert!(meta.key_attribute_only);
    assert_eq!(meta.old_text_content, "");
}

#[test]
fn test_unhighlight_reverses_only_its_own_toggle() {
    let html = format!(r#"<div id="a">{}</div>"#, wrap("greet", "Hi"));
    let (document, observer) = start(&html);
    let div = by_id(&document, "a");
    let highlighted = |observer: &Observer| observer.find_all(Some("greet"), None)[0].is_highlighted();

    let first = observer.highlight(Some("greet"), None);
    let everything = observer.highlight(None, None);
    assert_eq!(first.elements(), &[div]);
    assert!(highlighted(&observer));

    first.unhighlight();
    assert!(highlighted(&observer));
    everything.unhighlight();
    assert!(!highlighted(&observer));
}

#[test]
fn test_text_change_rescans() {
    let html = format!(r#"<p id="p">{}</p>"#, wrap("first", "One"));
    let (mut document, mut observer) = start(&html);
    let p = by_id(&document, "p");
    let text = document.tree().first_child(p).unwrap();

    document.tree_mut().set_node_value(text, &wrap("second", "Two")).unwrap();
    observer.flush(&mut document);
    assert!(observer.find_all(Some("first"), None).is_empty());
    assert_eq!(observer.find_all(Some("second"), None).len(), 1);
    assert_eq!(document.tree().node_value(text), Some("Two"));

    // the write-back echo keeps the registration
    observer.flush(&mut document);
    assert_eq!(observer.find_all(Some("second"), None).len(), 1);

    document.tree_mut().set_node_value(text, "Plain").unwrap();
    observer.flush(&mut document);
    assert!(observer.find_all(None, None).is_empty());
}

#[test]
fn test_scanned_attributes() {
    let html = format!(
        r#"<input id="in" placeholder="{}" data-x="{}"><div id="d">x</div>"#,
        wrap("hint", "Type here"),
        wrap("ignored", "nope"),
    );
    let (mut document, mut observer) = start(&html);
    let input = by_id(&document, "in");
    let div = by_id(&document, "d");

    assert_eq!(document.tree().get_attribute(input, "placeholder"), Some("Type here"));
    assert_eq!(observer.find_all(Some("hint"), None)[0].element, input);
    assert!(observer.find_all(Some("ignored"), None).is_empty());

    // wildcard entry applies to any tag
    document.tree_mut().set_attribute(div, "title", &wrap("tip", "Tip")).unwrap();
    observer.flush(&mut document);
    assert_eq!(observer.find_all(Some("tip"), None)[0].element, div);
    assert_eq!(document.tree().get_attribute(div, "title"), Some("Tip"));
}

#[test]
fn test_attribute_removal_purges_entries() {
    let html = format!(
        r#"<img id="i" alt="{}" {KEY_ONLY_ATTRIBUTE}="only">"#,
        wrap("alt.text", "Alt")
    );
    let (mut document, mut observer) = start(&html);
    let img = by_id(&document, "i");
    assert_eq!(observer.find_all(Some("only"), None).len(), 1);

    document.tree_mut().remove_attribute(img, KEY_ONLY_ATTRIBUTE).unwrap();
    observer.flush(&mut document);
    assert!(observer.find_all(Some("only"), None).is_empty());
    assert_eq!(observer.find_all(Some("alt.text"), None).len(), 1);

    document.tree_mut().remove_attribute(img, "alt").unwrap();
    observer.flush(&mut document);
    assert!(observer.find_all(None, None).is_empty());
}

#[test]
fn test_key_only_attribute_added_later() {
    let (mut document, mut observer) = start(r#"<button id="b">Save</button>"#);
    let button = by_id(&document, "b");

    document.tree_mut().set_attribute(button, KEY_ONLY_ATTRIBUTE, "actions.save").unwrap();
    observer.flush(&mut document);
    assert_eq!(observer.find_all(Some("actions.save"), None)[0].element, button);

    document.tree_mut().set_attribute(button, KEY_ONLY_ATTRIBUTE, "actions.store").unwrap();
    observer.flush(&mut document);
    assert!(observer.find_all(Some("actions.save"), None).is_empty());
    assert_eq!(observer.find_all(Some("actions.store"), None).len(), 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_pass_to_parent_tags() {
    let html = format!(
        r#"<select id="s"><option>{}</option></select>"#,
        wrap("choice", "Choice")
    );
    let (document, observer) = start(&html);
    let select = by_id(&document, "s");
    assert_eq!(observer.find_all(Some("choice"), None)[0].element, select);
}

#[test]
fn test_pass_to_parent_predicate() {
    let html = format!(r#"<p id="p"><b class="skip">{}</b></p>"#, wrap("bold", "Bold"));
    let props = RunProps {
        options: ObserverOptions {
            pass_to_parent: PassToParent::predicate(|tree, el| tree.get_attribute(el, "class") == Some("skip")),
            ..Default::default()
        },
        ..Default::default()
    };
    let (document, observer) = start_with(&html, props);
    let p = by_id(&document, "p");
    assert_eq!(observer.find_all(Some("bold"), None)[0].element, p);
}

#[test]
fn test_restricted_elements_are_not_scanned() {
    let html = format!(
        r#"<script>{}</script><div data-inplace-restricted><span>{}</span></div><p>{}</p>"#,
        wrap("script", "s"),
        wrap("marked", "m"),
        wrap("free", "f"),
    );
    let (document, observer) = start(&html);

    assert!(observer.find_all(Some("script"), None).is_empty());
    assert!(observer.find_all(Some("marked"), None).is_empty());
    assert_eq!(observer.find_all(Some("free"), None).len(), 1);
    // restricted text is left encoded
    let body = document.body().unwrap();
    assert!(document.tree().text_content(body).contains('\u{2064}'));
}

#[test]
fn test_options_from_json() {
    let options = ObserverOptions::from_json(r#"{"wrapper": "text", "restricted_elements": ["code"]}"#).unwrap();
    let props = RunProps {
        options,
        ..Default::default()
    };
    let (document, observer) = start_with(
        "<p id=\"p\">%-%fos:k,,,Shown%-%</p><code>%-%fos:c,,,Code%-%</code>",
        props,
    );

    assert_eq!(document.tree().text_content(by_id(&document, "p")), "Shown");
    assert_eq!(observer.find_all(Some("k"), None).len(), 1);
    assert!(observer.find_all(Some("c"), None).is_empty());
}

#[test]
fn test_explicit_target() {
    let html = format!(
        r#"<div id="inside">{}</div><div id="outside">{}</div>"#,
        wrap("in", "In"),
        wrap("out", "Out")
    );
    let mut document = inplace_html::parse(&html).unwrap();
    let inside = by_id(&document, "inside");
    let mut observer = Observer::new();
    let props = RunProps {
        options: ObserverOptions::default().with_target(inside),
        ..Default::default()
    };
    observer.run(Some(&mut document), props).unwrap();

    assert_eq!(observer.find_all(Some("in"), None).len(), 1);
    assert!(observer.find_all(Some("out"), None).is_empty());
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_find_positions_in_document_order() {
    let (mut document, mut observer) = start(r#"<div id="first"></div><div id="second"></div>"#);
    let first = by_id(&document, "first");
    let second = by_id(&document, "second");

    // register the later element first
    inplace_html::append_html(document.tree_mut(), second, &wrap("k", "B")).unwrap();
    observer.flush(&mut document);
    inplace_html::append_html(document.tree_mut(), first, &wrap("k", "A")).unwrap();
    observer.flush(&mut document);

    let tree = document.tree_mut();
    tree.set_bounding_rect(first, DOMRect::from_xywh(0.0, 0.0, 100.0, 20.0)).unwrap();
    tree.set_bounding_rect(second, DOMRect::from_xywh(0.0, 20.0, 100.0, 20.0)).unwrap();

    let positions = observer.find_positions(&document, Some("k"), None);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].position.y, 0.0);
    assert_eq!(positions[1].position.y, 20.0);
    assert_eq!(positions[0].key_name, "k");
    assert_eq!(positions[0].key_namespace, "");
}

#[test]
fn test_find_positions_with_namespace() {
    let ns_wrapped = InvisibleWrapper::new().wrap(&WrapProps::new("title").ns("admin").translation("Admin"));
    let html = format!("<h1>{}</h1><h2>{}</h2>", wrap("title", "Plain"), ns_wrapped);
    let (document, observer) = start(&html);

    let plain = observer.find_positions(&document, Some("title"), None);
    assert_eq!(plain.len(), 1);
    let admin = observer.find_positions(&document, Some("title"), Some("admin"));
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].key_namespace, "admin");
    assert_eq!(observer.find_positions(&document, None, None).len(), 2);
}

#[test]
fn test_key_at_point_prefers_innermost() {
    let html = format!(
        r#"<div id="outer">{}<span id="inner">{}</span></div>"#,
        wrap("outer", "Outer "),
        wrap("inner", "Inner")
    );
    let (mut document, observer) = start(&html);
    let outer = by_id(&document, "outer");
    let inner = by_id(&document, "inner");
    let tree = document.tree_mut();
    tree.set_bounding_rect(outer, DOMRect::from_xywh(0.0, 0.0, 200.0, 50.0)).unwrap();
    tree.set_bounding_rect(inner, DOMRect::from_xywh(50.0, 10.0, 40.0, 20.0)).unwrap();

    assert_eq!(observer.key_at_point(&document, 60.0, 15.0).unwrap().key_name, "inner");
    assert_eq!(observer.key_at_point(&document, 5.0, 5.0).unwrap().key_name, "outer");
    assert!(observer.key_at_point(&document, 500.0, 5.0).is_none());
}

#[test]
fn test_for_each_element_enumerates_live_elements() {
    let html = format!("<p>{}</p><p>{}</p>", wrap("a", "A"), wrap("b", "B"));
    let (document, observer) = start(&html);

    let mut seen = Vec::new();
    observer.for_each_element(|meta| seen.push(meta.element));
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|&el| document.tree().tag_name(el) == Some("p")));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_stop_ignores_pending_batches() {
    let (mut document, mut observer) = start(r#"<div id="root"></div>"#);
    let root = by_id(&document, "root");

    inplace_html::append_html(document.tree_mut(), root, &wrap("late", "Late")).unwrap();
    let batch = observer.take_batch().unwrap();
    observer.stop();
    observer.process(&mut document, batch);
    assert!(observer.find_all(None, None).is_empty());

    inplace_html::append_html(document.tree_mut(), root, &wrap("later", "Later")).unwrap();
    assert_eq!(observer.flush(&mut document), 0);
    assert!(!observer.is_running());
}

#[test]
fn test_batch_from_previous_run_is_ignored() {
    let (mut document, mut observer) = start(r#"<div id="root"></div>"#);
    let root = by_id(&document, "root");

    inplace_html::append_html(document.tree_mut(), root, &wrap("old", "Old")).unwrap();
    let stale = observer.take_batch().unwrap();
    observer.run(Some(&mut document), RunProps::default()).unwrap();
    // the re-run scanned the node itself
    assert_eq!(observer.find_all(Some("old"), None).len(), 1);

    observer.process(&mut document, stale);
    assert_eq!(observer.find_all(None, None).len(), 1);
}

#[test]
fn test_rerun_is_idempotent() {
    let html = format!("<p>{}</p><p>{}</p>", wrap("a", "A"), wrap("b", "B"));
    let (mut document, mut observer) = start(&html);
    let before = observer.find_all(None, None);

    observer.run(Some(&mut document), RunProps::default()).unwrap();
    assert_eq!(observer.find_all(None, None).len(), before.len());
}

#[test]
fn test_mouse_highlight_click() {
    let clicks: Rc<RefCell<Vec<TranslationClick>>> = Rc::default();
    let sink = clicks.clone();
    let on_click: ClickCallback = Rc::new(move |click| sink.borrow_mut().push(click.clone()));
    let html = format!(r#"<p id="p"><em id="em">{}</em></p>"#, wrap("hello", "Hello"));
    let props = RunProps {
        mouse_highlight: true,
        on_click: Some(on_click),
        ..Default::default()
    };
    let (document, mut observer) = start_with(&html, props);
    let em = by_id(&document, "em");
    let text = document.tree().first_child(em).unwrap();

    observer.handle_pointer_event(&document, PointerEvent::Over(text));
    assert!(!observer.handle_pointer_event(&document, PointerEvent::Click(text)));

    observer.handle_pointer_event(&document, PointerEvent::KeyDown(ModifierKey::Alt));
    assert!(observer.find_all(Some("hello"), None)[0].is_hovered());
    assert!(observer.handle_pointer_event(&document, PointerEvent::Click(text)));

    observer.handle_pointer_event(&document, PointerEvent::Out(text));
    assert!(!observer.find_all(Some("hello"), None)[0].is_highlighted());

    let clicks = clicks.borrow();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].element, em);
    assert_eq!(clicks[0].keys, vec![WrappedKey::new("hello")]);
}

#[test]
fn test_mouse_highlight_off_by_default() {
    let html = format!(r#"<p id="p">{}</p>"#, wrap("hello", "Hello"));
    let (document, mut observer) = start(&html);
    let p = by_id(&document, "p");

    observer.handle_pointer_event(&document, PointerEvent::KeyDown(ModifierKey::Alt));
    assert!(!observer.handle_pointer_event(&document, PointerEvent::Click(p)));
}
