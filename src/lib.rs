//! # tactus
//!
//! A semantic action engine that translates document trees into braille.
//!
//! An action map decides what happens to each element: pass through,
//! translate as a block, skip, read an attribute, add emphasis, rewrite with
//! a template, or keep pre-translated text. A pass walks the tree, batches the
//! readable text, hands each batch to a [`Translator`] and writes the result
//! back as `utd:brl` annotations right after the nodes the text came from.
//! Running a pass again over an unchanged tree gives the same tree.
//!
//! ## Quick Start
//!
//! ```
//! use tactus::{Engine, Registry, parse_xml, to_xml_string};
//! use tactus::translator::AsciiBrailleTranslator;
//!
//! let registry = Registry::from_xml(r#"
//!     <actionMap version="1">
//!       <entry>
//!         <match element="note"/>
//!         <action kind="emphasis" emphasis="no-translate"/>
//!       </entry>
//!     </actionMap>"#).unwrap();
//! let engine = Engine::new(registry, AsciiBrailleTranslator::new());
//!
//! let mut doc = parse_xml("<p>See <note>12</note> now.</p>").unwrap();
//! engine.translate_document(&mut doc).unwrap();
//!
//! let xml = to_xml_string(&doc).unwrap();
//! assert!(xml.contains(r#"<utd:brl index="0 1">12</utd:brl>"#));
//! ```
//!
//! ## Translators
//!
//! The engine never transliterates text itself. Implement [`Translator`] to
//! plug in a real braille translator; [`AsciiBrailleTranslator`] is an
//! uncontracted reference implementation good enough for tests and demos.
//!
//! [`AsciiBrailleTranslator`]: translator::AsciiBrailleTranslator

pub mod dom;
pub mod emphasis;
pub mod error;
pub mod registry;
pub mod template;
pub mod translate;
pub mod translator;
pub(crate) mod util;

pub use dom::{Document, NodeId, parse_html, parse_html_bytes, parse_xml, parse_xml_bytes, to_xml_string};
pub use emphasis::{EmphasisSet, EmphasisType};
pub use error::{ConfigError, Error, Result, TranslationError};
pub use registry::{Action, Matcher, Registry};
pub use template::{Template, TemplateError, TemplateSet};
pub use translate::{Engine, EngineOptions, PassReport, TextSpan};
pub use translator::{TranslationResult, Translator, TranslatorError};
