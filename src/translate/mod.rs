//! The translation pass.
//!
//! A pass walks a subtree collecting [`TextSpan`]s, splits them into batches
//! at already-translated spans, sends each batch through the translator and
//! writes one annotation after every span's origin node.
//!
//! ```
//! use tactus::dom::{parse_xml, to_xml_string};
//! use tactus::registry::{Action, Matcher, Registry};
//! use tactus::translate::Engine;
//! use tactus::translator::AsciiBrailleTranslator;
//!
//! let registry = Registry::builder(Action::Generic)
//!     .entry(Matcher::element("math"), Action::Skip)
//!     .build()
//!     .unwrap();
//! let engine = Engine::new(registry, AsciiBrailleTranslator::new());
//!
//! let mut doc = parse_xml("<p>Hi <math>x</math></p>").unwrap();
//! engine.translate_document(&mut doc).unwrap();
//! assert!(to_xml_string(&doc).unwrap().contains("⠠⠓⠊⠀"));
//! ```

pub mod batch;
mod context;
mod engine;
pub mod remap;
mod span;
pub mod walker;

pub use context::PassContext;
pub use engine::{Engine, EngineOptions, PassReport};
pub use span::{AnnotationFragment, INDEX_ATTR, TextSpan, annotation_after};
