//! Depth-first collection of text spans.
//!
//! The walker visits an element's children in document order, asks the
//! registry what to do with each element child and runs that action. Children
//! are iterated from a snapshot of their ids, so annotations inserted while a
//! block translates never show up in the iteration that produced them.

use html5ever::Namespace;

use super::batch::translate_spans;
use super::context::PassContext;
use super::span::{AnnotationFragment, TextSpan};
use crate::dom::{Document, NodeData, NodeId, UTD_NS, is_annotation, utd_name};
use crate::error::Result;
use crate::registry::Action;

/// Marker attributes, all in the engine namespace.
pub const TRANSLATED: &str = "translated";
pub const INSERTED: &str = "inserted";
pub const REWRITTEN: &str = "rewritten";
/// Trace attribute naming the action applied to an element.
pub const TRACE: &str = "action";
/// Text to insert as the first or last child of an element.
pub const BEFORE: &str = "before";
pub const AFTER: &str = "after";

/// Spans for the content of `node`.
///
/// A text leaf yields itself. An element yields the spans of its children,
/// each element child handled by its registered action. Annotations and
/// other nodes yield nothing.
pub fn walk(doc: &mut Document, node: NodeId, cx: &mut PassContext<'_>) -> Result<Vec<TextSpan>> {
    match doc.get(node).map(|n| &n.data) {
        Some(NodeData::Text(text)) => {
            let span = TextSpan::new(Some(node), text.as_str()).with_emphasis(cx.inherited);
            cx.count_spans(1);
            Ok(vec![span])
        }
        Some(NodeData::Element { .. }) if is_annotation(doc, node) => Ok(Vec::new()),
        Some(NodeData::Element { .. }) | Some(NodeData::Document) => {
            insert_content(doc, node)?;
            let mut spans = Vec::new();
            for child in doc.child_ids(node) {
                if doc.is_element(child) {
                    spans.extend(dispatch(doc, child, cx)?);
                } else {
                    spans.extend(walk(doc, child, cx)?);
                }
            }
            Ok(spans)
        }
        _ => Ok(Vec::new()),
    }
}

/// Resolve and run the action for an element, stamping the trace attribute
/// and attaching the element's identity to any error.
pub fn dispatch(doc: &mut Document, node: NodeId, cx: &mut PassContext<'_>) -> Result<Vec<TextSpan>> {
    if is_annotation(doc, node) {
        return Ok(Vec::new());
    }
    let registry = cx.registry;
    let action = registry.resolve(doc, node);
    log::debug!("{} -> {action}", doc.describe(node));

    let spans = apply(doc, node, action, cx).map_err(|e| e.at_node(doc, node))?;

    if cx.options.stamp_trace && action.stamps_trace() {
        doc.set_attr(node, utd_name(TRACE), action.kind())
            .map_err(|e| e.at_node(doc, node))?;
    }
    Ok(spans)
}

/// Run one action on an element.
pub fn apply(
    doc: &mut Document,
    node: NodeId,
    action: &Action,
    cx: &mut PassContext<'_>,
) -> Result<Vec<TextSpan>> {
    match action {
        Action::Generic => walk(doc, node, cx),
        Action::Skip => Ok(Vec::new()),
        Action::Block { tables } => {
            let spans = walk(doc, node, cx)?;
            let options = cx.options;
            let tables = if tables.is_empty() { &options.tables } else { tables };
            translate_block(doc, node, spans, tables, cx)
        }
        Action::Attribute { name } => {
            let Some(value) = doc.get_attr_ns(node, &name.ns, &name.local) else {
                log::debug!("{} has no attribute '{}'", doc.describe(node), name.local);
                return Ok(Vec::new());
            };
            let span = TextSpan::new(Some(node), value).with_emphasis(cx.inherited);
            cx.count_spans(1);
            mark(doc, node, TRANSLATED)?;
            Ok(vec![span])
        }
        Action::Emphasis { emphasis } => {
            let outer = cx.inherited;
            cx.inherited |= *emphasis;
            let spans = walk(doc, node, cx);
            cx.inherited = outer;
            spans
        }
        Action::Template { template } => {
            if !is_marked(doc, node, REWRITTEN) {
                let templates = cx.templates;
                templates.apply(template, doc, node)?;
                mark(doc, node, REWRITTEN)?;
            }
            let spans = walk(doc, node, cx)?;
            let options = cx.options;
            translate_block(doc, node, spans, &options.tables, cx)
        }
        Action::Pretranslated => {
            let text = readable_text(doc, node);
            let span = TextSpan::translated(Some(node), text.as_str())
                .with_annotation(AnnotationFragment::identity(&text));
            cx.count_spans(1);
            mark(doc, node, TRANSLATED)?;
            Ok(vec![span])
        }
    }
}

/// Translate a block's spans now and hand them back as translated, so the
/// enclosing batch treats the block as a boundary.
fn translate_block(
    doc: &mut Document,
    node: NodeId,
    spans: Vec<TextSpan>,
    tables: &[String],
    cx: &mut PassContext<'_>,
) -> Result<Vec<TextSpan>> {
    translate_spans(doc, &spans, tables, cx)?;
    mark(doc, node, TRANSLATED)?;
    Ok(spans
        .into_iter()
        .map(|span| TextSpan {
            translated: true,
            annotation: None,
            ..span
        })
        .collect())
}

/// Add the one-time `before`/`after` content of an element.
fn insert_content(doc: &mut Document, node: NodeId) -> Result<()> {
    let ns = Namespace::from(UTD_NS);
    if is_marked(doc, node, INSERTED) {
        return Ok(());
    }
    let before = doc.get_attr_ns(node, &ns, BEFORE).map(str::to_string);
    let after = doc.get_attr_ns(node, &ns, AFTER).map(str::to_string);
    if before.is_none() && after.is_none() {
        return Ok(());
    }

    if let Some(text) = before {
        let leaf = doc.create_text(text);
        doc.insert_child(node, 0, leaf)?;
    }
    if let Some(text) = after {
        let leaf = doc.create_text(text);
        doc.append(node, leaf);
    }
    mark(doc, node, INSERTED)
}

/// Text of all leaves under `node`, skipping annotations.
pub fn readable_text(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    collect_text(doc, node, &mut out);
    out
}

fn collect_text(doc: &Document, node: NodeId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(text);
        return;
    }
    if is_annotation(doc, node) {
        return;
    }
    for child in doc.children(node) {
        collect_text(doc, child, out);
    }
}

pub(crate) fn is_marked(doc: &Document, node: NodeId, marker: &str) -> bool {
    doc.get_attr_ns(node, &Namespace::from(UTD_NS), marker) == Some("true")
}

pub(crate) fn mark(doc: &mut Document, node: NodeId, marker: &str) -> Result<()> {
    if doc.is_element(node) {
        doc.set_attr(node, utd_name(marker), "true")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::dom::parse_xml;
    use crate::emphasis::EmphasisType;
    use crate::error::Error;
    use crate::registry::{Matcher, Registry};
    use crate::template::{TemplateError, TemplateSet};
    use crate::translate::EngineOptions;
    use crate::translator::{AsciiBrailleTranslator, RecordingTranslator};

    fn with_context<R>(
        registry: Registry,
        templates: TemplateSet,
        f: impl FnOnce(&mut PassContext<'_>, &RecordingTranslator<AsciiBrailleTranslator>) -> R,
    ) -> R {
        let translator = RecordingTranslator::new(AsciiBrailleTranslator::new());
        let options = EngineOptions::default();
        let mut cx = PassContext::new(&registry, &translator, &templates, &options);
        f(&mut cx, &translator)
    }

    fn texts(spans: &[TextSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_emphasis_overlays_children() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("note"),
                Action::Emphasis {
                    emphasis: EmphasisType::NoTranslate.into(),
                },
            )
            .build()
            .unwrap();
        let mut doc = parse_xml("<p>See <note>12</note> now.</p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();

        let spans = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(texts(&spans), vec!["See ", "12", " now."]);
        assert!(spans[1].emphasis.contains(EmphasisType::NoTranslate));
        assert!(spans[0].emphasis.is_empty());

        let note = doc.find_by_tag("note").unwrap();
        assert_eq!(doc.get_attr_ns(note, &Namespace::from(UTD_NS), TRACE), Some("emphasis"));
    }

    #[test]
    fn test_block_inside_emphasis_inherits_it() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("b"),
                Action::Emphasis {
                    emphasis: EmphasisType::Bold.into(),
                },
            )
            .entry(Matcher::element("h"), Action::block())
            .build()
            .unwrap();
        let mut doc = parse_xml("<p><b><h>xy</h></b>z</p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();

        let (spans, calls) = with_context(registry, TemplateSet::new(), |cx, t| {
            let spans = walk(&mut doc, p, cx);
            assert!(cx.inherited.is_empty());
            (spans, t.calls())
        });
        let spans = spans.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "xy");
        assert!(calls[0].typeforms.iter().all(|t| t.contains(EmphasisType::Bold)));

        // Emphasis ends with the element.
        assert_eq!(texts(&spans), vec!["xy", "z"]);
        assert!(spans[1].emphasis.is_empty());
    }

    #[test]
    fn test_skip_contributes_nothing_and_is_not_stamped() {
        let registry = Registry::builder(Action::Generic)
            .entry(Matcher::element("math"), Action::Skip)
            .build()
            .unwrap();
        let mut doc = parse_xml("<p>a<math>x</math>b</p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let spans = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(texts(&spans), vec!["a", "b"]);
        let math = doc.find_by_tag("math").unwrap();
        assert_eq!(doc.get_attr(math, TRACE), None);
    }

    #[test]
    fn test_block_translates_and_returns_translated_spans() {
        let registry = Registry::builder(Action::Generic)
            .entry(Matcher::element("h"), Action::block())
            .build()
            .unwrap();
        let mut doc = parse_xml("<p>a<h>b</h>c</p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();

        let (spans, calls) = with_context(registry, TemplateSet::new(), |cx, t| {
            (walk(&mut doc, p, cx), t.texts())
        });
        let spans = spans.unwrap();
        assert_eq!(calls, vec!["b".to_string()]);
        assert_eq!(texts(&spans), vec!["a", "b", "c"]);
        assert!(spans[1].translated && !spans[0].translated);

        let h = doc.find_by_tag("h").unwrap();
        assert!(is_marked(&doc, h, TRANSLATED));
    }

    #[test]
    fn test_attribute_action_reads_value() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("img"),
                Action::Attribute {
                    name: crate::dom::qual_name(None, "", "alt"),
                },
            )
            .build()
            .unwrap();
        let mut doc = parse_xml(r#"<p><img alt="cat">ignored</img><img/></p>"#).unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let spans = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(texts(&spans), vec!["cat"]);
        assert_eq!(spans[0].origin, doc.find_by_tag("img"));
    }

    #[test]
    fn test_insertion_happens_once() {
        let mut doc = parse_xml(
            r#"<p xmlns:utd="urn:tactus:utd"><q utd:before="(" utd:after=")">x</q></p>"#,
        )
        .unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let registry = Registry::builder(Action::Generic).build().unwrap();

        for _ in 0..2 {
            let spans = with_context(registry.clone(), TemplateSet::new(), |cx, _| walk(&mut doc, p, cx))
                .unwrap();
            assert_eq!(texts(&spans), vec!["(", "x", ")"]);
        }
        let q = doc.find_by_tag("q").unwrap();
        assert!(is_marked(&doc, q, INSERTED));
    }

    #[test]
    fn test_template_runs_once() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("h"),
                Action::Template {
                    template: "append".into(),
                },
            )
            .build()
            .unwrap();
        let mut templates = TemplateSet::new();
        templates.insert_fn("append", |doc, node| {
            doc.append_text(node, "!");
            Ok(())
        });
        let mut doc = parse_xml("<p><h>hi</h></p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let h = doc.find_by_tag("h").unwrap();

        let registry2 = registry.clone();
        let templates2 = TemplateSet::new();
        with_context(registry, templates, |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(readable_text(&doc, h), "hi!");
        assert!(is_marked(&doc, h, REWRITTEN));

        // Already rewritten: the template is not looked up again.
        with_context(registry2, templates2, |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(readable_text(&doc, h), "hi!");
    }

    #[test]
    fn test_errors_are_wrapped_with_the_failing_node() {
        let registry = Registry::builder(Action::Generic)
            .entry(
                Matcher::element("h"),
                Action::Template {
                    template: "boom".into(),
                },
            )
            .build()
            .unwrap();
        let mut templates = TemplateSet::new();
        templates.insert_fn("boom", |_, _| Err(TemplateError::rewrite("boom", "bad input")));
        let mut doc = parse_xml("<p><q><h>x</h></q></p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();

        let err = with_context(registry, templates, |cx, _| walk(&mut doc, p, cx)).unwrap_err();
        match err {
            Error::Processing { node, source } => {
                assert!(node.starts_with("<h>"), "{node}");
                assert!(matches!(*source, Error::Template(_)));
            }
            other => panic!("expected processing error, got {other:?}"),
        }
    }

    #[test]
    fn test_translation_errors_are_not_wrapped() {
        let registry = Registry::builder(Action::Generic)
            .entry(Matcher::element("h"), Action::block())
            .build()
            .unwrap();
        let mut doc = parse_xml("<p><q><h>é</h></q></p>").unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let err = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap_err();
        assert!(err.is_translation(), "{err:?}");
    }

    #[test]
    fn test_annotations_are_not_content() {
        let mut doc = parse_xml(
            r#"<p xmlns:utd="urn:tactus:utd">a<utd:brl index="0">⠁</utd:brl></p>"#,
        )
        .unwrap();
        let p = doc.find_by_tag("p").unwrap();
        let registry = Registry::builder(Action::Generic).build().unwrap();
        let spans = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap();
        assert_eq!(texts(&spans), vec!["a"]);
    }

    fn tree_strategy() -> impl Strategy<Value = String> {
        let leaf = "[a-z ]{0,4}".prop_map(|t| t.to_string());
        leaf.prop_recursive(4, 32, 4, |inner| {
            (prop::sample::select(vec!["b", "i", "note", "span"]), prop::collection::vec(inner, 0..4))
                .prop_map(|(tag, children)| format!("<{tag}>{}</{tag}>", children.concat()))
        })
    }

    proptest! {
        #[test]
        fn prop_spans_partition_leaf_text(body in tree_strategy()) {
            let registry = Registry::builder(Action::Generic)
                .entry(Matcher::element("note"), Action::Emphasis { emphasis: EmphasisType::Bold.into() })
                .entry(Matcher::element("i"), Action::block())
                .build()
                .unwrap();
            let mut doc = parse_xml(&format!("<p>{body}</p>")).unwrap();
            let p = doc.find_by_tag("p").unwrap();
            let expected = readable_text(&doc, p);

            let spans = with_context(registry, TemplateSet::new(), |cx, _| walk(&mut doc, p, cx)).unwrap();
            let joined: String = spans.iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(joined, expected);
        }
    }
}
