//! Attribute Tokenizer
//!
//! Splits the raw attribute text of a tag into name/value pairs.
//! Nothing here judges validity - callers decide what a malformed
//! attribute means for them.

/// How an attribute value was written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue<'a> {
    /// `name="value"` or `name='value'`
    Quoted(&'a str),
    /// `name=value`
    Unquoted(&'a str),
    /// An opening quote that is never closed
    Unterminated(&'a str),
    /// `name` or `name=` with nothing after it
    Missing,
}

/// One attribute from a tag's attribute list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: AttributeValue<'a>,
}

impl<'a> Attribute<'a> {
    pub fn is_quoted(&self) -> bool {
        matches!(self.value, AttributeValue::Quoted(_))
    }

    /// Value of a properly quoted attribute
    pub fn quoted_value(&self) -> Option<&'a str> {
        match self.value {
            AttributeValue::Quoted(value) => Some(value),
            _ => None,
        }
    }
}

/// Tokenize the attribute portion of a tag (everything after the name)
pub fn parse_attributes(raw: &str) -> Vec<Attribute<'_>> {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();
    let mut i = 0;

    loop {
        i = skip_whitespace(bytes, i);
        if i >= len {
            break;
        }

        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = &raw[name_start..i];

        i = skip_whitespace(bytes, i);
        let value = if i < len && bytes[i] == b'=' {
            i = skip_whitespace(bytes, i + 1);
            if i >= len {
                AttributeValue::Missing
            } else if bytes[i] == b'"' || bytes[i] == b'\'' {
                let quote = bytes[i];
                let value_start = i + 1;
                match bytes[value_start..].iter().position(|&b| b == quote) {
                    Some(rel) => {
                        i = value_start + rel + 1;
                        AttributeValue::Quoted(&raw[value_start..value_start + rel])
                    }
                    None => {
                        i = len;
                        AttributeValue::Unterminated(&raw[value_start..])
                    }
                }
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                AttributeValue::Unquoted(&raw[value_start..i])
            }
        } else {
            AttributeValue::Missing
        };

        attributes.push(Attribute { name, value });
    }

    attributes
}

/// Look up a quoted attribute value by name
pub fn find_attribute<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    parse_attributes(raw)
        .into_iter()
        .find(|attr| attr.name == name)
        .and_then(|attr| attr.quoted_value())
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
