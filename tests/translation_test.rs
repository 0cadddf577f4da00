//! End-to-end translation passes over small documents.

use tactus::translate::{AnnotationFragment, annotation_after};
use tactus::translator::{AsciiBrailleTranslator, RecordingTranslator};
use tactus::{
    Action, Document, EmphasisType, Engine, EngineOptions, Matcher, Registry, parse_html, parse_xml,
    to_xml_string,
};

type TestEngine = Engine<RecordingTranslator<AsciiBrailleTranslator>>;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/{}", FIXTURES_DIR, name)).expect("fixture should be readable")
}

fn engine(registry: Registry) -> TestEngine {
    Engine::new(registry, RecordingTranslator::new(AsciiBrailleTranslator::new()))
}

fn note_registry() -> Registry {
    Registry::builder(Action::Generic)
        .entry(
            Matcher::element("note"),
            Action::Emphasis {
                emphasis: EmphasisType::NoTranslate.into(),
            },
        )
        .build()
        .unwrap()
}

fn first_text(doc: &Document, tag: &str) -> tactus::NodeId {
    let el = doc.find_by_tag(tag).unwrap();
    doc.children(el).find(|&c| doc.is_text(c)).unwrap()
}

// ============================================================================
// Batching and remapping
// ============================================================================

#[test]
fn test_no_translate_note_in_paragraph() {
    let engine = engine(note_registry());
    let mut doc = parse_xml("<p>See <note>12</note> now.</p>").unwrap();
    let report = engine.translate_document(&mut doc).unwrap();

    let calls = engine.translator().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].text, "See 12 now.");
    let flagged: Vec<usize> = calls[0]
        .typeforms
        .iter()
        .enumerate()
        .filter(|(_, t)| t.contains(EmphasisType::NoTranslate))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, vec![4, 5]);

    let xml = to_xml_string(&doc).unwrap();
    assert!(xml.contains(r#"See <utd:brl index="0 0 1 2 3">⠠⠎⠑⠑⠀</utd:brl>"#), "{xml}");
    assert!(xml.contains(r#"12<utd:brl index="0 1">12</utd:brl></note>"#), "{xml}");
    assert!(xml.contains(r#" now.<utd:brl index="0 1 2 3 4">⠀⠝⠕⠺⠲</utd:brl>"#), "{xml}");
    assert_eq!(report.annotations, 3);
    assert_eq!(report.translator_calls, 1);
}

#[test]
fn test_every_leaf_gets_exactly_one_annotation() {
    let engine = engine(note_registry());
    let mut doc = parse_xml("<p>See <note>12</note> now.</p>").unwrap();
    engine.translate_document(&mut doc).unwrap();

    let leaves: Vec<_> = doc.descendants(doc.root()).filter(|&id| doc.is_text(id)).collect();
    let mut annotated = 0;
    for leaf in leaves {
        // Text inside an annotation is braille, not source text.
        let parent = doc.parent(leaf).unwrap();
        if doc.element_name(parent).is_some_and(|n| &**n == "brl") {
            continue;
        }
        let brl = annotation_after(&doc, leaf).expect("source leaf should be annotated");
        let fragment = AnnotationFragment::from_node(&doc, brl).unwrap();
        assert_eq!(fragment.text.chars().count(), fragment.indices.len());
        annotated += 1;
    }
    assert_eq!(annotated, 3);
}

#[test]
fn test_block_splits_enclosing_batch() {
    let registry = Registry::builder(Action::Generic)
        .entry(Matcher::element("h"), Action::block())
        .build()
        .unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml("<doc>before <h>Title</h> after</doc>").unwrap();
    engine.translate_document(&mut doc).unwrap();

    assert_eq!(
        engine.translator().texts(),
        vec!["Title".to_string(), "before ".to_string(), " after".to_string()]
    );
    let h = doc.find_by_tag("h").unwrap();
    assert_eq!(doc.get_attr(h, "translated"), Some("true"));
    assert_eq!(doc.get_attr(h, "action"), Some("block"));
}

#[test]
fn test_block_tables_override_engine_tables() {
    let registry = Registry::builder(Action::Generic)
        .entry(
            Matcher::element("m"),
            Action::Block {
                tables: vec!["nemeth.ctb".into()],
            },
        )
        .build()
        .unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml("<doc>x <m>y</m></doc>").unwrap();
    let err = engine.translate_document(&mut doc).unwrap_err();

    assert!(err.is_translation(), "{err}");
    assert!(err.to_string().contains("nemeth.ctb"), "{err}");
}

#[test]
fn test_registered_block_and_engine_tables_translate() {
    let registry = Registry::builder(Action::Generic)
        .entry(
            Matcher::element("m"),
            Action::Block {
                tables: vec!["nemeth.ctb".into()],
            },
        )
        .build()
        .unwrap();
    let engine_tables = ["en-ueb-g1.ctb", "en-us-comp8.ctb"];
    let translator = AsciiBrailleTranslator::new()
        .with_tables(engine_tables)
        .with_tables(registry.block_tables());
    let engine = Engine::new(registry, RecordingTranslator::new(translator))
        .with_options(EngineOptions::new().with_tables(engine_tables));

    let mut doc = parse_xml("<doc>x <m>y</m></doc>").unwrap();
    engine.translate_document(&mut doc).unwrap();

    let calls = engine.translator().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].text, "y");
    assert_eq!(calls[0].tables, vec!["nemeth.ctb".to_string()]);
    assert_eq!(calls[1].text, "x ");
    assert_eq!(
        calls[1].tables,
        vec!["en-ueb-g1.ctb".to_string(), "en-us-comp8.ctb".to_string()]
    );
}

#[test]
fn test_skip_leaves_subtree_untouched() {
    let registry = Registry::builder(Action::Generic)
        .entry(Matcher::element("math"), Action::Skip)
        .build()
        .unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml("<p>Hi <math>é</math></p>").unwrap();
    engine.translate_document(&mut doc).unwrap();

    assert_eq!(engine.translator().texts(), vec!["Hi ".to_string()]);
    let inner = first_text(&doc, "math");
    assert_eq!(annotation_after(&doc, inner), None);
    let xml = to_xml_string(&doc).unwrap();
    assert!(xml.contains("<math>é</math>"), "{xml}");
}

// ============================================================================
// Special actions
// ============================================================================

#[test]
fn test_attribute_text_is_annotated_after_element() {
    let registry = Registry::builder(Action::Generic)
        .entry(
            Matcher::element("img"),
            Action::Attribute {
                name: tactus::dom::qual_name(None, "", "alt"),
            },
        )
        .build()
        .unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml(r#"<p>A <img alt="cat"/>.</p>"#).unwrap();
    engine.translate_document(&mut doc).unwrap();

    assert_eq!(engine.translator().texts(), vec!["A cat.".to_string()]);
    let img = doc.find_by_tag("img").unwrap();
    let brl = annotation_after(&doc, img).unwrap();
    assert_eq!(AnnotationFragment::from_node(&doc, brl).unwrap().text, "⠉⠁⠞");
}

#[test]
fn test_pretranslated_text_is_kept_verbatim() {
    let registry = Registry::builder(Action::Generic)
        .entry(Matcher::element("pg"), Action::Pretranslated)
        .build()
        .unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml("<p>page <pg>⠼⠁</pg> end</p>").unwrap();
    engine.translate_document(&mut doc).unwrap();

    assert_eq!(
        engine.translator().texts(),
        vec!["page ".to_string(), " end".to_string()]
    );
    let xml = to_xml_string(&doc).unwrap();
    assert!(xml.contains(r#"⠼⠁</pg><utd:brl index="0 1">⠼⠁</utd:brl>"#), "{xml}");
}

#[test]
fn test_insertion_attributes_add_text_once() {
    let engine = engine(Registry::builder(Action::Generic).build().unwrap());
    let mut doc =
        parse_xml(r#"<p xmlns:utd="urn:tactus:utd"><q utd:before="(" utd:after=")">x</q></p>"#).unwrap();

    engine.translate_document(&mut doc).unwrap();
    engine.translate_document(&mut doc).unwrap();

    let q = doc.find_by_tag("q").unwrap();
    assert_eq!(doc.text_content(q).matches('(').count(), 1);
    let calls = engine.translator().texts();
    assert_eq!(calls, vec!["(x)".to_string(), "(x)".to_string()]);
}

#[test]
fn test_translator_failure_names_batch() {
    let engine = engine(Registry::builder(Action::Generic).build().unwrap());
    let mut doc = parse_xml("<p>naïve</p>").unwrap();
    let err = engine.translate_document(&mut doc).unwrap_err();
    assert!(err.is_translation());
    assert!(err.to_string().contains("naïve"), "{err}");
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_second_pass_is_a_no_op() {
    let registry = Registry::from_xml(&fixture("action_map.xml")).unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml(&fixture("sample.xml")).unwrap();

    engine.translate_document(&mut doc).unwrap();
    let first = to_xml_string(&doc).unwrap();
    engine.translate_document(&mut doc).unwrap();
    let second = to_xml_string(&doc).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_sample_document() {
    let registry = Registry::from_xml(&fixture("action_map.xml")).unwrap();
    let engine = engine(registry);
    let mut doc = parse_xml(&fixture("sample.xml")).unwrap();
    engine.translate_document(&mut doc).unwrap();

    let texts = engine.translator().texts();
    assert!(texts.contains(&"CHAPTER ONE".to_string()), "{texts:?}");
    assert!(texts.contains(&"It was late, see a+b and .".to_string()), "{texts:?}");

    let xml = to_xml_string(&doc).unwrap();
    // Template rewrote the heading in place.
    assert!(xml.contains(">CHAPTER ONE<"), "{xml}");
    // Skipped math keeps its content and gets no annotation or trace.
    assert!(xml.contains("<m:mi>x</m:mi></m:math>"), "{xml}");
    assert!(xml.contains(">⠨⠶⠇⠁⠞⠑"), "{xml}");
    assert!(xml.contains(r#"a+b<utd:brl index="0 1 2">a+b</utd:brl>"#), "{xml}");
    assert!(xml.contains("⠠⠁⠀⠉⠁⠞</utd:brl>"), "{xml}");
    assert!(xml.contains(r#"<utd:brl index="0 1">⠼⠁</utd:brl>"#), "{xml}");

    let math = doc.find_by_tag("math").unwrap();
    assert_eq!(doc.get_attr(math, "action"), None);
}

// ============================================================================
// HTML input
// ============================================================================

#[test]
fn test_html_document() {
    let registry = Registry::from_xml(
        r#"<actionMap version="1">
             <entry><match element="b"/><action kind="emphasis" emphasis="bold"/></entry>
             <entry><match element="script"/><action kind="skip"/></entry>
           </actionMap>"#,
    )
    .unwrap();
    let engine = engine(registry);
    let mut doc = parse_html("<html><body><p>Hi <b>there</b></p><script>var x;</script></body></html>");
    engine.translate_document(&mut doc).unwrap();

    assert_eq!(engine.translator().texts(), vec!["Hi there".to_string()]);
    let there = first_text(&doc, "b");
    let brl = annotation_after(&doc, there).unwrap();
    assert_eq!(AnnotationFragment::from_node(&doc, brl).unwrap().text, "⠘⠶⠞⠓⠑⠗⠑⠘⠄");
}
