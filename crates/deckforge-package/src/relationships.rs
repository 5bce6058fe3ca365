//! Relationships (`.rels`) parsing and serialization.
//!
//! Maintains insertion order for deterministic output and records duplicate
//! ids seen during parse - the consistency scanner reports those as hard
//! failures rather than silently last-writer-wins.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq)]
pub struct RelTarget {
    /// The target path or URL
    pub target: String,

    /// The relationship type URI
    pub rel_type: String,

    /// `Some("External")` for URLs, `None` for internal parts
    pub target_mode: Option<String>,
}

impl RelTarget {
    /// True for internal package targets
    pub fn is_internal(&self) -> bool {
        self.target_mode.as_deref() != Some("External")
    }
}

/// Parsed relationships from one `.rels` part
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    /// Ordered relationship ids
    order: Vec<String>,

    /// Id -> target
    map: HashMap<String, RelTarget>,

    /// Ids that appeared more than once during parse
    duplicate_ids: Vec<String>,

    /// Counter for generating unique ids
    next_id_counter: u32,
}

impl Relationships {
    /// Create an empty relationships set
    pub fn new() -> Self {
        Self {
            next_id_counter: 1,
            ..Self::default()
        }
    }

    /// Parse from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut order = Vec::new();
        let mut map: HashMap<String, RelTarget> = HashMap::new();
        let mut duplicate_ids = Vec::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                                b"Target" => {
                                    target = attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                b"Type" => {
                                    rel_type = attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                b"TargetMode" => {
                                    target_mode =
                                        attr.unescape_value().ok().map(|s| s.to_string())
                                }
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            if let Some(num) = extract_id_number(&id) {
                                max_id = max_id.max(num);
                            }

                            if map.contains_key(&id) {
                                duplicate_ids.push(id.clone());
                            } else {
                                order.push(id.clone());
                            }
                            map.insert(
                                id,
                                RelTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(crate::error::PackageError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            order,
            map,
            duplicate_ids,
            next_id_counter: max_id + 1,
        })
    }

    /// Ids that appeared more than once in the source XML
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    /// Add a relationship with a generated id; returns the id
    pub fn add(&mut self, target: String, rel_type: String) -> String {
        let id = format!("rId{}", self.next_id_counter);
        self.next_id_counter += 1;

        self.order.push(id.clone());
        self.map.insert(
            id.clone(),
            RelTarget {
                target,
                rel_type,
                target_mode: None,
            },
        );
        id
    }

    /// The target for an id
    pub fn get(&self, id: &str) -> Option<&RelTarget> {
        self.map.get(id)
    }

    /// Whether an id exists
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Rewrite the target of an id; returns whether anything changed
    pub fn set_target(&mut self, id: &str, target: String) -> bool {
        match self.map.get_mut(id) {
            Some(rel) if rel.target != target => {
                rel.target = target;
                true
            }
            _ => false,
        }
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }

    /// Serialize back to `.rels` XML
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));
        xml.push('\n');

        for (id, rel) in self.iter() {
            xml.push_str("  <Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_xml(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_xml(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_xml(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            xml.push_str("/>\n");
        }

        xml.push_str("</Relationships>");
        xml
    }
}

/// Extract the numeric portion of a relationship id ("rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num| num.parse().ok())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
