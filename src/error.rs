//! Error types for tactus operations.

use thiserror::Error;

use crate::dom::{Document, NodeId};
use crate::template::TemplateError;
use crate::translator::TranslatorError;

/// Errors that can occur while loading an action map or running a pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Action map problems. Only raised at load time.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The external translator failed. Never wrapped with node context.
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Any other failure while an action processed a node.
    #[error("error processing {node}: {source}")]
    Processing {
        node: String,
        #[source]
        source: Box<Error>,
    },

    /// The translator's index map broke its contract.
    #[error("internal consistency error: {0}")]
    Consistency(String),

    #[error("tree error: {0}")]
    Tree(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Whether this is a translation-domain error.
    pub fn is_translation(&self) -> bool {
        matches!(self, Error::Translation(_))
    }

    /// Attach the identity of the node being processed.
    ///
    /// Translation and consistency errors pass through untouched, and an
    /// error that already names a node keeps the innermost one.
    pub(crate) fn at_node(self, doc: &Document, id: NodeId) -> Error {
        match self {
            Error::Translation(_) | Error::Processing { .. } | Error::Consistency(_) => self,
            other => Error::Processing {
                node: doc.describe(id),
                source: Box::new(other),
            },
        }
    }
}

/// Fatal problems found while loading or building an action map.
///
/// `entry` is the zero-based entry position, which is also its priority.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("entries {first} and {second} have the same matcher: {matcher}")]
    DuplicateMatcher {
        matcher: String,
        first: usize,
        second: usize,
    },

    #[error("entry {entry}: action '{kind}' requires parameter '{parameter}'")]
    MissingParameter {
        entry: usize,
        kind: String,
        parameter: &'static str,
    },

    #[error("entry {entry}: unknown action kind '{kind}'")]
    UnknownActionKind { entry: usize, kind: String },

    #[error("entry {entry}: unknown emphasis '{name}'")]
    UnknownEmphasis { entry: usize, name: String },

    #[error("entry {entry}: unknown namespace prefix '{prefix}'")]
    UnknownPrefix { entry: usize, prefix: String },

    #[error("entry {entry}: unknown template '{name}'")]
    UnknownTemplate { entry: usize, name: String },

    #[error("entry {entry}: invalid matcher: {message}")]
    InvalidMatcher { entry: usize, message: String },

    #[error("unsupported action map version '{0}'")]
    UnsupportedVersion(String),

    #[error("malformed action map: {0}")]
    Malformed(String),

    #[error("action map XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// A translator failure with the batch it happened in.
#[derive(Error, Debug)]
#[error("translation of batch {batch} with tables {tables:?} failed on \"{excerpt}\": {source}")]
pub struct TranslationError {
    pub batch: usize,
    pub tables: Vec<String>,
    /// The start of the batch text, for messages.
    pub excerpt: String,
    #[source]
    pub source: TranslatorError,
}

impl TranslationError {
    const EXCERPT_CHARS: usize = 40;

    pub fn new(batch: usize, tables: &[String], text: &str, source: TranslatorError) -> Self {
        let mut excerpt: String = text.chars().take(Self::EXCERPT_CHARS).collect();
        if text.chars().count() > Self::EXCERPT_CHARS {
            excerpt.push('…');
        }
        Self {
            batch,
            tables: tables.to_vec(),
            excerpt,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
