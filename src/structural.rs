//! Structural parsing
//!
//! The tree-building parser runs only after validation passed. It is a
//! capability behind [`StructuralParser`]; the default implementation is
//! backed by `roxmltree` and converts its borrowed tree into owned nodes.

use std::collections::BTreeMap;
use std::fmt;

use roxmltree::{Document, Node, NodeType, ParsingOptions};

use crate::validation::{Diagnostic, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(XmlText),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlText {
    pub value: String,
    pub line: usize,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated text of the direct text children, trimmed
    pub fn text(&self) -> String {
        let text: String = self
            .children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.value.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect();
        text.trim().to_string()
    }
}

/// Failure reported by a structural parser
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralError {
    pub message: String,
    pub line: Option<usize>,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StructuralError {}

/// Parse XML text into a tree, or fail with a structural error
pub trait StructuralParser {
    fn parse(&self, text: &str) -> Result<XmlDocument, StructuralError>;
}

/// Default parser backed by `roxmltree`
#[derive(Debug, Clone, Copy, Default)]
pub struct RoxmlParser;

impl StructuralParser for RoxmlParser {
    fn parse(&self, text: &str) -> Result<XmlDocument, StructuralError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document =
            Document::parse_with_options(text, options).map_err(|error| StructuralError {
                line: Some(error.pos().row as usize),
                message: error.to_string(),
            })?;

        let Some(root) = document.root().children().find(|node| node.is_element()) else {
            return Err(StructuralError {
                message: "document has no root element".to_string(),
                line: None,
            });
        };

        Ok(XmlDocument {
            root: convert_element(&document, root),
        })
    }
}

fn convert_element(document: &Document<'_>, node: Node<'_, '_>) -> XmlElement {
    let attributes = node
        .attributes()
        .map(|attribute| (attribute.name().to_string(), attribute.value().to_string()))
        .collect();

    let mut children = Vec::new();
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => children.push(XmlNode::Element(convert_element(document, child))),
            NodeType::Text => {
                let value = child.text().unwrap_or_default();
                if value.trim().is_empty() {
                    continue;
                }
                children.push(XmlNode::Text(XmlText {
                    value: value.to_string(),
                    line: line_at(document, child.range().start),
                }));
            }
            _ => {}
        }
    }

    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes,
        children,
        line: line_at(document, node.range().start),
    }
}

fn line_at(document: &Document<'_>, offset: usize) -> usize {
    document.text_pos_at(offset).row as usize
}

/// Outcome of validating and, when valid, parsing one document
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedDocument {
    pub result: ValidationResult,
    pub document: Option<XmlDocument>,
}

/// Validate first; parse only a valid document. A parser failure after
/// validation passed becomes one extra Critical diagnostic.
pub fn validate_and_parse<P>(validator: &Validator, parser: &P, text: &str) -> CheckedDocument
where
    P: StructuralParser + ?Sized,
{
    let mut result = validator.validate(text);
    if !result.is_valid() {
        return CheckedDocument {
            result,
            document: None,
        };
    }

    match parser.parse(text) {
        Ok(document) => CheckedDocument {
            result,
            document: Some(document),
        },
        Err(error) => {
            log::debug!("structural parser rejected validated input: {}", error);
            let mut diagnostic =
                Diagnostic::critical(format!("Parser rejected input: {}", error.message));
            if let Some(line) = error.line {
                diagnostic = diagnostic.at_line(line);
            }
            result.push(diagnostic);
            CheckedDocument {
                result,
                document: None,
            }
        }
    }
}
