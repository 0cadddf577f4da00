//! File-based workflow: load an action map and a document from disk,
//! translate, write the result and translate it again.

use std::fs;

use tempfile::TempDir;

use tactus::translator::{AsciiBrailleTranslator, RecordingTranslator};
use tactus::{
    ConfigError, Engine, EngineOptions, Error, Registry, TemplateError, TemplateSet, parse_xml, parse_xml_bytes,
    to_xml_string,
};

const MAP: &str = r#"<?xml version="1.0"?>
<actionMap version="1">
  <entry>
    <match element="title"/>
    <action kind="template" template="shout"/>
  </entry>
  <entry>
    <match selector="span.code"/>
    <action kind="emphasis" emphasis="no-translate"/>
  </entry>
  <entry>
    <match element="para"/>
    <action kind="block"/>
  </entry>
</actionMap>"#;

const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<doc>
  <title>intro</title>
  <para>Run <span class="code">ls -l</span> now.</para>
</doc>"#;

fn templates() -> TemplateSet {
    let mut templates = TemplateSet::builtin();
    templates.insert_fn("shout", |doc, node| {
        let leaf = doc
            .children(node)
            .find(|&c| doc.is_text(c))
            .ok_or_else(|| TemplateError::rewrite("shout", "no text"))?;
        let text = format!("{}!", doc.text(leaf).unwrap_or_default().to_uppercase());
        doc.set_text(leaf, text).map_err(|e| TemplateError::rewrite("shout", e))
    });
    templates
}

fn write_inputs(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let map_path = dir.path().join("map.xml");
    let doc_path = dir.path().join("doc.xml");
    fs::write(&map_path, MAP).unwrap();
    fs::write(&doc_path, DOC).unwrap();
    (map_path, doc_path)
}

#[test]
fn test_translate_from_files_and_retranslate_output() {
    let dir = TempDir::new().unwrap();
    let (map_path, doc_path) = write_inputs(&dir);

    let templates = templates();
    let registry =
        tactus::registry::load_action_map_with(&fs::read_to_string(&map_path).unwrap(), &templates).unwrap();
    let engine = Engine::new(registry, RecordingTranslator::new(AsciiBrailleTranslator::new()))
        .with_templates(templates)
        .unwrap();

    let mut doc = parse_xml_bytes(&fs::read(&doc_path).unwrap()).unwrap();
    engine.translate_document(&mut doc).unwrap();

    let out_path = dir.path().join("out.xml");
    fs::write(&out_path, to_xml_string(&doc).unwrap()).unwrap();
    let first = fs::read_to_string(&out_path).unwrap();

    assert!(first.contains(">INTRO!<"), "{first}");
    assert!(first.contains(r#"ls -l<utd:brl index="0 1 2 3 4">ls -l</utd:brl>"#), "{first}");
    assert!(
        engine.translator().texts().contains(&"Run ls -l now.".to_string()),
        "{:?}",
        engine.translator().texts()
    );

    // The saved output translates to itself.
    let mut reread = parse_xml(&first).unwrap();
    engine.translate_document(&mut reread).unwrap();
    assert_eq!(to_xml_string(&reread).unwrap(), first);
}

#[test]
fn test_unknown_template_in_map_file() {
    let dir = TempDir::new().unwrap();
    let (map_path, _) = write_inputs(&dir);

    let err = Registry::from_xml(&fs::read_to_string(&map_path).unwrap()).unwrap_err();
    assert!(
        matches!(&err, ConfigError::UnknownTemplate { entry: 0, name } if name == "shout"),
        "{err}"
    );
}

#[test]
fn test_engine_rejects_template_set_missing_a_name() {
    let registry = tactus::registry::load_action_map_with(MAP, &templates()).unwrap();
    let err = Engine::new(registry, AsciiBrailleTranslator::new())
        .with_templates(TemplateSet::builtin())
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::UnknownTemplate { .. })));
}

#[test]
fn test_broken_map_files() {
    let cases = [
        (r#"<actionMap version="2"/>"#, "unsupported"),
        (
            r#"<actionMap version="1"><entry><match element="a"/><action kind="dance"/></entry></actionMap>"#,
            "unknown action kind",
        ),
        (
            r#"<actionMap version="1"><entry><match element="a"/><action kind="emphasis"/></entry></actionMap>"#,
            "requires parameter 'emphasis'",
        ),
        (
            r#"<actionMap version="1"><entry><match element="x:a"/><action kind="skip"/></entry></actionMap>"#,
            "unknown namespace prefix 'x'",
        ),
        (
            r#"<actionMap version="1">
                 <entry><match element="a"/><action kind="skip"/></entry>
                 <entry><match element="a"/><action kind="generic"/></entry>
               </actionMap>"#,
            "same matcher",
        ),
    ];

    let dir = TempDir::new().unwrap();
    for (i, (source, expected)) in cases.iter().enumerate() {
        let path = dir.path().join(format!("map{i}.xml"));
        fs::write(&path, source).unwrap();
        let err = Registry::from_xml(&fs::read_to_string(&path).unwrap()).unwrap_err();
        assert!(err.to_string().contains(expected), "case {i}: {err}");
    }
}

#[test]
fn test_unknown_table_is_a_translation_error() {
    let registry = Registry::from_xml(r#"<actionMap version="1"/>"#).unwrap();
    let engine = Engine::new(registry, AsciiBrailleTranslator::new())
        .with_options(EngineOptions::new().with_tables(["fr-bfu-g2.ctb"]));
    let mut doc = parse_xml("<p>bonjour</p>").unwrap();
    let err = engine.translate_document(&mut doc).unwrap_err();
    assert!(err.is_translation());
    assert!(err.to_string().contains("fr-bfu-g2.ctb"), "{err}");
}
