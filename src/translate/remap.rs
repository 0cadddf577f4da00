//! Slicing translator output back onto the spans of a batch.

use super::context::PassContext;
use super::span::{AnnotationFragment, TextSpan, annotation_after};
use crate::dom::{Document, NodeId};
use crate::emphasis::Composition;
use crate::error::{Error, Result};
use crate::translator::TranslationResult;

/// Split `result` into one fragment per part of `composition`.
///
/// Fragment `i` is the longest stretch of output, starting where fragment
/// `i - 1` ended, whose index map entries fall before the end of part `i`.
/// Its indices are rebased onto the start of the part.
pub fn slice(composition: &Composition, result: &TranslationResult) -> Result<Vec<AnnotationFragment>> {
    let output: Vec<char> = result.output.chars().collect();
    let map = &result.index_map;

    if map.len() != output.len() {
        return Err(Error::Consistency(format!(
            "index map has {} entries for {} output chars",
            map.len(),
            output.len()
        )));
    }
    if let Some(k) = map.windows(2).position(|w| w[1] < w[0]) {
        return Err(Error::Consistency(format!(
            "index map decreases at output offset {}: {} after {}",
            k + 1,
            map[k + 1],
            map[k]
        )));
    }
    if let Some(&last) = map.last()
        && last >= composition.len()
    {
        return Err(Error::Consistency(format!(
            "index map points at input offset {last} past the end of {} input chars",
            composition.len()
        )));
    }

    let mut fragments = Vec::with_capacity(composition.ends.len());
    let mut cursor = 0;
    for (i, &end) in composition.ends.iter().enumerate() {
        let start = composition.start(i);
        let from = cursor;
        while cursor < output.len() && map[cursor] < end {
            cursor += 1;
        }
        fragments.push(AnnotationFragment {
            text: output[from..cursor].iter().collect(),
            indices: map[from..cursor].iter().map(|&m| m - start).collect(),
        });
    }

    if cursor != output.len() {
        return Err(Error::Consistency(format!(
            "fragments cover {cursor} of {} output chars",
            output.len()
        )));
    }
    Ok(fragments)
}

/// Write each span's fragment after its origin.
pub fn annotate(
    doc: &mut Document,
    spans: &[TextSpan],
    fragments: &[AnnotationFragment],
    batch: usize,
    cx: &mut PassContext<'_>,
) -> Result<()> {
    if spans.len() != fragments.len() {
        return Err(Error::Consistency(format!(
            "{} fragments for {} spans",
            fragments.len(),
            spans.len()
        )));
    }

    for (span, fragment) in spans.iter().zip(fragments) {
        match span.origin {
            Some(origin) => write_annotation(doc, origin, fragment, batch, cx)?,
            None if !fragment.is_empty() => {
                log::debug!("batch {batch}: dropping fragment {:?} of span without origin", fragment.text);
            }
            None => {}
        }
    }
    Ok(())
}

/// Put `fragment` right after `origin`, replacing the annotation already
/// there.
pub fn write_annotation(
    doc: &mut Document,
    origin: NodeId,
    fragment: &AnnotationFragment,
    batch: usize,
    cx: &mut PassContext<'_>,
) -> Result<()> {
    if doc.parent(origin).is_none() {
        return Err(Error::Tree(format!(
            "cannot annotate {}: it has no parent",
            doc.describe(origin)
        )));
    }
    if let Some(earlier) = cx.record_annotation(origin, batch) {
        return Err(Error::Consistency(format!(
            "{} annotated by batch {earlier} and again by batch {batch}",
            doc.describe(origin)
        )));
    }

    let node = fragment.to_node(doc);
    match annotation_after(doc, origin) {
        Some(existing) => doc.replace(existing, node)?,
        None => doc.insert_after(origin, node),
    }
    Ok(())
}
