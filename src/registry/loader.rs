//! Action map reader.
//!
//! ```xml
//! <actionMap version="1">
//!   <namespace prefix="m" uri="http://www.w3.org/1998/Math/MathML"/>
//!   <default kind="generic"/>
//!   <entry>
//!     <match element="note"/>
//!     <action kind="emphasis" emphasis="no-translate"/>
//!   </entry>
//!   <entry>
//!     <match><all><element name="span"/><attribute name="class" value="b"/></all></match>
//!     <action kind="emphasis" emphasis="bold italic"/>
//!   </entry>
//! </actionMap>
//! ```
//!
//! The document is read in two steps: the XML is collected into raw entries,
//! then every entry is validated and resolved against the namespace table.
//! Namespace declarations may therefore appear anywhere in the map.

use std::borrow::Cow;
use std::collections::HashMap;

use html5ever::{LocalName, Namespace, Prefix, QualName};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use super::matcher::undeclared_selector_prefix;
use super::{Action, Matcher, Registry};
use crate::emphasis::EmphasisSet;
use crate::error::ConfigError;
use crate::template::TemplateSet;

/// The only action map version this reader understands.
pub const ACTION_MAP_VERSION: &str = "1";

/// Load an action map, checking template names against the built-in
/// templates.
pub fn load_action_map(source: &str) -> Result<Registry, ConfigError> {
    load_action_map_with(source, &TemplateSet::builtin())
}

/// Load an action map, checking template names against `templates`.
pub fn load_action_map_with(source: &str, templates: &TemplateSet) -> Result<Registry, ConfigError> {
    let raw = read_raw(source)?;

    let mut builder = Registry::builder(match &raw.default {
        Some(attrs) => build_action(raw.entries.len(), attrs, &raw.namespaces)?,
        None => Action::Generic,
    });
    for (prefix, uri) in &raw.namespaces {
        builder = builder.namespace(prefix.clone(), uri.clone());
    }

    for (entry, raw_entry) in raw.entries.iter().enumerate() {
        let matcher = match raw_entry.matchers.as_slice() {
            [single] => build_matcher(entry, single, &raw.namespaces)?,
            [] => {
                return Err(ConfigError::InvalidMatcher {
                    entry,
                    message: "entry has no matcher".into(),
                });
            }
            _ => {
                return Err(ConfigError::InvalidMatcher {
                    entry,
                    message: "entry has more than one matcher; combine them with <all> or <any>"
                        .into(),
                });
            }
        };
        let action = match &raw_entry.action {
            Some(attrs) => build_action(entry, attrs, &raw.namespaces)?,
            None => {
                return Err(ConfigError::MissingParameter {
                    entry,
                    kind: "entry".into(),
                    parameter: "action",
                });
            }
        };
        builder = builder.entry(matcher, action);
    }

    let registry = builder.build()?;
    registry.check_templates(templates)?;
    log::debug!(
        "loaded action map: {} entries, {} namespaces, default {}",
        registry.entries().len(),
        registry.namespaces().len(),
        registry.default_action()
    );
    Ok(registry)
}

// ============================================================================
// Raw document
// ============================================================================

type Attrs = Vec<(String, String)>;

#[derive(Debug)]
enum RawMatcher {
    Element(String),
    Attribute { name: String, value: Option<String> },
    Selector(String),
    All(Vec<RawMatcher>),
    Any(Vec<RawMatcher>),
    Not(Vec<RawMatcher>),
}

#[derive(Debug, Default)]
struct RawEntry {
    matchers: Vec<RawMatcher>,
    action: Option<Attrs>,
}

#[derive(Debug, Default)]
struct RawMap {
    namespaces: HashMap<String, String>,
    default: Option<Attrs>,
    entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Group {
    Match,
    All,
    Any,
    Not,
}

impl Group {
    fn from_tag(tag: &str) -> Option<Group> {
        match tag {
            "match" => Some(Group::Match),
            "all" => Some(Group::All),
            "any" => Some(Group::Any),
            "not" => Some(Group::Not),
            _ => None,
        }
    }
}

#[derive(Default)]
struct RawReader {
    map: RawMap,
    seen_root: bool,
    entry: Option<RawEntry>,
    groups: Vec<(Group, Vec<RawMatcher>)>,
}

fn read_raw(source: &str) -> Result<RawMap, ConfigError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);
    let mut state = RawReader::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => state.open(&e, false)?,
            Event::Empty(e) => state.open(&e, true)?,
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                state.close(&tag)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !state.seen_root {
        return Err(ConfigError::Malformed("no <actionMap> element".into()));
    }
    if state.entry.is_some() || !state.groups.is_empty() {
        return Err(ConfigError::Malformed("unclosed element at end of action map".into()));
    }
    Ok(state.map)
}

impl RawReader {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), ConfigError> {
        let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let attrs = attributes(e)?;

        if !self.seen_root {
            if tag != "actionMap" {
                return Err(ConfigError::Malformed(format!(
                    "expected <actionMap> root, found <{tag}>"
                )));
            }
            match attr(&attrs, "version") {
                Some(ACTION_MAP_VERSION) => {}
                Some(other) => return Err(ConfigError::UnsupportedVersion(other.to_string())),
                None => return Err(ConfigError::Malformed("<actionMap> has no version".into())),
            }
            self.seen_root = true;
            return Ok(());
        }

        match tag.as_str() {
            "namespace" => {
                let prefix = attr(&attrs, "prefix").unwrap_or_default();
                let uri = attr(&attrs, "uri")
                    .ok_or_else(|| ConfigError::Malformed(format!("namespace '{prefix}' has no uri")))?;
                self.map.namespaces.insert(prefix.to_string(), uri.to_string());
            }
            "default" => {
                if self.map.default.replace(attrs).is_some() {
                    return Err(ConfigError::Malformed("more than one <default>".into()));
                }
            }
            "entry" => {
                if self.entry.is_some() {
                    return Err(ConfigError::Malformed("nested <entry>".into()));
                }
                if empty {
                    self.map.entries.push(RawEntry::default());
                } else {
                    self.entry = Some(RawEntry::default());
                }
            }
            "action" => {
                let entry = self.current_entry("action")?;
                if entry.action.replace(attrs).is_some() {
                    return Err(ConfigError::Malformed("entry has more than one <action>".into()));
                }
            }
            "match" => {
                self.current_entry("match")?;
                let shorthand = shorthand_matcher(&attrs)?;
                self.groups.push((Group::Match, shorthand.into_iter().collect()));
                if empty {
                    self.close("match")?;
                }
            }
            "all" | "any" | "not" => {
                if self.groups.is_empty() {
                    return Err(ConfigError::Malformed(format!("<{tag}> outside <match>")));
                }
                if let Some(group) = Group::from_tag(&tag) {
                    self.groups.push((group, Vec::new()));
                }
                if empty {
                    self.close(&tag)?;
                }
            }
            "element" | "attribute" | "selector" => {
                let leaf = leaf_matcher(&tag, &attrs)?;
                match self.groups.last_mut() {
                    Some((_, children)) => children.push(leaf),
                    None => return Err(ConfigError::Malformed(format!("<{tag}> outside <match>"))),
                }
            }
            other => return Err(ConfigError::Malformed(format!("unexpected element <{other}>"))),
        }
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<(), ConfigError> {
        match tag {
            "entry" => {
                let entry = self
                    .entry
                    .take()
                    .ok_or_else(|| ConfigError::Malformed("unbalanced </entry>".into()))?;
                self.map.entries.push(entry);
            }
            "match" | "all" | "any" | "not" => {
                let (group, children) = self
                    .groups
                    .pop()
                    .ok_or_else(|| ConfigError::Malformed(format!("unbalanced </{tag}>")))?;
                if Group::from_tag(tag) != Some(group) {
                    return Err(ConfigError::Malformed(format!("unbalanced </{tag}>")));
                }
                let matcher = match group {
                    Group::Match => {
                        self.current_entry("match")?.matchers.extend(children);
                        return Ok(());
                    }
                    Group::All => RawMatcher::All(children),
                    Group::Any => RawMatcher::Any(children),
                    Group::Not => RawMatcher::Not(children),
                };
                match self.groups.last_mut() {
                    Some((_, siblings)) => siblings.push(matcher),
                    None => return Err(ConfigError::Malformed(format!("<{tag}> outside <match>"))),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn current_entry(&mut self, tag: &str) -> Result<&mut RawEntry, ConfigError> {
        self.entry
            .as_mut()
            .ok_or_else(|| ConfigError::Malformed(format!("<{tag}> outside <entry>")))
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<Attrs, ConfigError> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw).map(Cow::into_owned).map_err(quick_xml::Error::from)?;
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `<match element=".."/>`, `<match attribute=".." value=".."/>` or
/// `<match selector=".."/>`.
fn shorthand_matcher(attrs: &Attrs) -> Result<Option<RawMatcher>, ConfigError> {
    let element = attr(attrs, "element");
    let attribute = attr(attrs, "attribute");
    let selector = attr(attrs, "selector");
    let given = [element, attribute, selector].iter().filter(|a| a.is_some()).count();
    if given > 1 {
        return Err(ConfigError::Malformed(
            "<match> takes only one of element, attribute or selector".into(),
        ));
    }
    Ok(if let Some(name) = element {
        Some(RawMatcher::Element(name.to_string()))
    } else if let Some(name) = attribute {
        Some(RawMatcher::Attribute {
            name: name.to_string(),
            value: attr(attrs, "value").map(str::to_string),
        })
    } else {
        selector.map(|css| RawMatcher::Selector(css.to_string()))
    })
}

fn leaf_matcher(tag: &str, attrs: &Attrs) -> Result<RawMatcher, ConfigError> {
    let required = |key: &str| {
        attr(attrs, key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::Malformed(format!("<{tag}> needs a '{key}' attribute")))
    };
    Ok(match tag {
        "element" => RawMatcher::Element(required("name")?),
        "attribute" => RawMatcher::Attribute {
            name: required("name")?,
            value: attr(attrs, "value").map(str::to_string),
        },
        _ => RawMatcher::Selector(required("css")?),
    })
}

// ============================================================================
// Validation
// ============================================================================

fn build_matcher(
    entry: usize,
    raw: &RawMatcher,
    namespaces: &HashMap<String, String>,
) -> Result<Matcher, ConfigError> {
    let children = |raw: &[RawMatcher]| {
        raw.iter()
            .map(|r| build_matcher(entry, r, namespaces))
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(match raw {
        RawMatcher::Element(name) => match name.split_once(':') {
            Some((prefix, local)) => Matcher::Element {
                namespace: Some(Namespace::from(lookup(entry, prefix, namespaces)?)),
                local: LocalName::from(local),
            },
            None => Matcher::Element {
                namespace: namespaces.get("").map(|uri| Namespace::from(uri.as_str())),
                local: LocalName::from(name.as_str()),
            },
        },
        RawMatcher::Attribute { name, value } => {
            let name = attribute_name(entry, name, namespaces)?;
            Matcher::Attribute {
                namespace: name.ns,
                local: name.local,
                value: value.clone(),
            }
        }
        RawMatcher::Selector(css) => {
            if let Some(prefix) = undeclared_selector_prefix(css, namespaces) {
                return Err(ConfigError::UnknownPrefix { entry, prefix });
            }
            Matcher::selector(css, namespaces)
                .map_err(|message| ConfigError::InvalidMatcher { entry, message })?
        }
        RawMatcher::All(raw) | RawMatcher::Any(raw) if raw.is_empty() => {
            return Err(ConfigError::InvalidMatcher {
                entry,
                message: "empty <all> or <any>".into(),
            });
        }
        RawMatcher::All(raw) => Matcher::All(children(raw)?),
        RawMatcher::Any(raw) => Matcher::Any(children(raw)?),
        RawMatcher::Not(raw) => match raw.as_slice() {
            [single] => Matcher::Not(Box::new(build_matcher(entry, single, namespaces)?)),
            _ => {
                return Err(ConfigError::InvalidMatcher {
                    entry,
                    message: "<not> takes exactly one matcher".into(),
                });
            }
        },
    })
}

fn build_action(
    entry: usize,
    attrs: &Attrs,
    namespaces: &HashMap<String, String>,
) -> Result<Action, ConfigError> {
    let kind = attr(attrs, "kind").ok_or_else(|| ConfigError::MissingParameter {
        entry,
        kind: "action".into(),
        parameter: "kind",
    })?;
    let required = |parameter: &'static str| {
        attr(attrs, parameter)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingParameter {
                entry,
                kind: kind.to_string(),
                parameter,
            })
    };

    Ok(match kind {
        "generic" => Action::Generic,
        "block" => Action::Block {
            tables: attr(attrs, "tables")
                .map(|t| t.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        },
        "skip" => Action::Skip,
        "attribute" => Action::Attribute {
            name: attribute_name(entry, required("name")?, namespaces)?,
        },
        "emphasis" => {
            let emphasis: EmphasisSet = required("emphasis")?
                .parse()
                .map_err(|name| ConfigError::UnknownEmphasis { entry, name })?;
            Action::Emphasis { emphasis }
        }
        "template" => Action::Template {
            template: required("template")?.to_string(),
        },
        "pretranslated" => Action::Pretranslated,
        other => {
            return Err(ConfigError::UnknownActionKind {
                entry,
                kind: other.to_string(),
            });
        }
    })
}

fn lookup<'a>(
    entry: usize,
    prefix: &str,
    namespaces: &'a HashMap<String, String>,
) -> Result<&'a str, ConfigError> {
    namespaces
        .get(prefix)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::UnknownPrefix {
            entry,
            prefix: prefix.to_string(),
        })
}

/// Unprefixed attribute names are in no namespace.
fn attribute_name(
    entry: usize,
    name: &str,
    namespaces: &HashMap<String, String>,
) -> Result<QualName, ConfigError> {
    Ok(match name.split_once(':') {
        Some((prefix, local)) => QualName::new(
            Some(Prefix::from(prefix)),
            Namespace::from(lookup(entry, prefix, namespaces)?),
            LocalName::from(local),
        ),
        None => QualName::new(None, Namespace::from(""), LocalName::from(name)),
    })
}
