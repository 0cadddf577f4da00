//! Splitting spans into translator calls.

use super::context::PassContext;
use super::remap;
use super::span::{AnnotationFragment, TextSpan, annotation_after};
use crate::dom::Document;
use crate::emphasis::compose;
use crate::error::{Result, TranslationError};

/// Translate every untranslated span and annotate the origins.
///
/// Translated spans split the list into batches; each maximal run of
/// untranslated spans between them is one translator call.
pub fn translate_spans(
    doc: &mut Document,
    spans: &[TextSpan],
    tables: &[String],
    cx: &mut PassContext<'_>,
) -> Result<()> {
    if spans.is_empty() {
        log::info!("no text to translate");
        return Ok(());
    }

    let mut run_start = 0;
    for (i, span) in spans.iter().enumerate() {
        if span.translated {
            if run_start < i {
                translate_batch(doc, &spans[run_start..i], tables, cx)?;
            }
            keep_translated(doc, span, cx)?;
            run_start = i + 1;
        }
    }
    if run_start < spans.len() {
        translate_batch(doc, &spans[run_start..], tables, cx)?;
    }
    Ok(())
}

/// One compositor and translator call over a run of untranslated spans.
pub fn translate_batch(
    doc: &mut Document,
    spans: &[TextSpan],
    tables: &[String],
    cx: &mut PassContext<'_>,
) -> Result<()> {
    let batch = cx.next_batch();
    let translator = cx.translator;
    let composition = compose(
        spans.iter().map(|s| (s.text.as_str(), s.emphasis)),
        |c| translator.can_represent(c),
    );

    let fragments = if composition.is_empty() {
        log::debug!("batch {batch}: {} empty spans, skipping translator", spans.len());
        vec![AnnotationFragment::default(); spans.len()]
    } else {
        log::debug!(
            "batch {batch}: {} spans, {} chars, tables {:?}",
            spans.len(),
            composition.len(),
            tables
        );
        cx.count_call();
        let result = translator
            .translate(&composition.text, tables, &composition.typeforms)
            .map_err(|e| TranslationError::new(batch, tables, &composition.text, e))?;
        remap::slice(&composition, &result)?
    };

    remap::annotate(doc, spans, &fragments, batch, cx)
}

/// A translated span keeps whatever annotation its origin already has; a
/// precomputed one is written only when there is none.
fn keep_translated(doc: &mut Document, span: &TextSpan, cx: &mut PassContext<'_>) -> Result<()> {
    let Some(annotation) = &span.annotation else {
        return Ok(());
    };
    let Some(origin) = span.origin else {
        log::warn!("translated span {:?} has no origin; its annotation is dropped", span.text);
        return Ok(());
    };
    if annotation_after(doc, origin).is_some() {
        return Ok(());
    }
    let batch = cx.next_batch();
    remap::write_annotation(doc, origin, annotation, batch, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeId, is_annotation, parse_xml};
    use crate::registry::{Action, Registry};
    use crate::template::TemplateSet;
    use crate::translate::EngineOptions;
    use crate::translator::{AsciiBrailleTranslator, RecordingTranslator};

    struct Fixture {
        registry: Registry,
        translator: RecordingTranslator<AsciiBrailleTranslator>,
        templates: TemplateSet,
        options: EngineOptions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Registry::builder(Action::Generic).build().unwrap(),
                translator: RecordingTranslator::new(AsciiBrailleTranslator::new()),
                templates: TemplateSet::new(),
                options: EngineOptions::default(),
            }
        }

        fn context(&self) -> PassContext<'_> {
            PassContext::new(&self.registry, &self.translator, &self.templates, &self.options)
        }
    }

    fn leaves(doc: &Document) -> Vec<NodeId> {
        let p = doc.find_by_tag("p").unwrap();
        doc.children(p).filter(|&c| doc.is_text(c) || !is_annotation(doc, c)).collect()
    }

    #[test]
    fn test_translated_spans_separate_batches() {
        let mut doc = parse_xml(r#"<p>A<x>X</x>B</p>"#).unwrap();
        let ids = leaves(&doc);
        let fixture = Fixture::new();

        // Existing annotation for "X" must survive untouched.
        let x_text = doc.children(ids[1]).next().unwrap();
        let old = AnnotationFragment::new("old", vec![0, 0, 0]).to_node(&mut doc);
        doc.insert_after(x_text, old);

        let spans = vec![
            TextSpan::new(Some(ids[0]), "A"),
            TextSpan::translated(Some(x_text), "X"),
            TextSpan::new(Some(ids[2]), "B"),
        ];
        let mut cx = fixture.context();
        translate_spans(&mut doc, &spans, &fixture.options.tables, &mut cx).unwrap();

        assert_eq!(fixture.translator.texts(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(annotation_after(&doc, x_text), Some(old));
        assert_eq!(cx.report().translator_calls, 2);
    }

    #[test]
    fn test_empty_list_makes_no_call() {
        let mut doc = parse_xml("<p/>").unwrap();
        let fixture = Fixture::new();
        let mut cx = fixture.context();
        translate_spans(&mut doc, &[], &fixture.options.tables, &mut cx).unwrap();
        assert!(fixture.translator.calls().is_empty());
        assert_eq!(cx.report().batches, 0);
    }

    #[test]
    fn test_empty_text_annotates_without_calling() {
        let mut doc = parse_xml("<p>x</p>").unwrap();
        let text = leaves(&doc)[0];
        let fixture = Fixture::new();
        let mut cx = fixture.context();
        translate_spans(&mut doc, &[TextSpan::new(Some(text), "")], &fixture.options.tables, &mut cx)
            .unwrap();
        assert!(fixture.translator.calls().is_empty());
        let brl = annotation_after(&doc, text).unwrap();
        assert!(AnnotationFragment::from_node(&doc, brl).unwrap().is_empty());
    }

    #[test]
    fn test_precomputed_annotation_written_once() {
        let mut doc = parse_xml("<p><pg>⠼⠁</pg></p>").unwrap();
        let pg = doc.find_by_tag("pg").unwrap();
        let fixture = Fixture::new();
        let span = TextSpan::translated(Some(pg), "⠼⠁").with_annotation(AnnotationFragment::identity("⠼⠁"));

        let mut cx = fixture.context();
        translate_spans(&mut doc, std::slice::from_ref(&span), &fixture.options.tables, &mut cx).unwrap();
        let first = annotation_after(&doc, pg).unwrap();

        let mut cx = fixture.context();
        translate_spans(&mut doc, &[span], &fixture.options.tables, &mut cx).unwrap();
        assert_eq!(annotation_after(&doc, pg), Some(first));
        assert!(fixture.translator.calls().is_empty());
    }

    #[test]
    fn test_translator_errors_carry_batch_context() {
        let mut doc = parse_xml("<p>é</p>").unwrap();
        let text = leaves(&doc)[0];
        let fixture = Fixture::new();
        let mut cx = fixture.context();
        let err = translate_spans(&mut doc, &[TextSpan::new(Some(text), "é")], &fixture.options.tables, &mut cx)
            .unwrap_err();
        assert!(err.is_translation());
        assert!(err.to_string().contains("batch 0"));
    }
}
