//! Tag Scanner
//!
//! One forward pass over the raw text. Produces an ordered stream of
//! segments: tags, text runs between them, and regions that are not tag
//! space at all (declaration, comments, CDATA, DOCTYPE and processing
//! instructions). Every later pass works from this stream instead of
//! re-scanning the source.

use std::fmt;

use crate::scanner::attributes::{parse_attributes, Attribute};
use crate::scanner::lines::LineIndex;

const EXCERPT_CHARS: usize = 40;

/// Tag token types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Opening,
    /// `</name>`
    Closing,
    /// `<name ... />`
    SelfClosing,
}

/// A tag with its name, line and unparsed attribute text
#[derive(Debug, Clone, PartialEq)]
pub struct TagToken<'a> {
    pub kind: TagKind,
    pub name: &'a str,
    pub line: usize,
    pub raw_attributes: &'a str,
    /// Byte offset of the `<`
    pub start: usize,
}

impl<'a> TagToken<'a> {
    pub fn attributes(&self) -> Vec<Attribute<'a>> {
        parse_attributes(self.raw_attributes)
    }
}

/// Kinds of text excluded from tag space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// `<?xml ...?>`
    Declaration,
    /// `<!-- ... -->`
    Comment,
    /// `<![CDATA[ ... ]]>`
    CData,
    /// `<!DOCTYPE ...>` or a processing instruction
    Markup,
}

/// A non-tag region with its raw text (delimiters included)
#[derive(Debug, Clone, PartialEq)]
pub struct Region<'a> {
    pub kind: RegionKind,
    pub text: &'a str,
    pub start: usize,
    pub line: usize,
    /// False only for a comment that runs to end of input
    pub terminated: bool,
}

impl<'a> Region<'a> {
    /// Content between the opening and closing delimiters
    pub fn body(&self) -> &'a str {
        let (open, close) = match self.kind {
            RegionKind::Declaration => ("<?xml", "?>"),
            RegionKind::Comment => ("<!--", "-->"),
            RegionKind::CData => ("<![CDATA[", "]]>"),
            RegionKind::Markup if self.text.starts_with("<?") => ("<?", "?>"),
            RegionKind::Markup => ("<!", ">"),
        };
        let inner = self.text.strip_prefix(open).unwrap_or(self.text);
        if self.terminated {
            inner.strip_suffix(close).unwrap_or(inner)
        } else {
            inner
        }
    }
}

/// Character data between tags and regions
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub start: usize,
    pub line: usize,
}

/// One item of the scanned document, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Tag(TagToken<'a>),
    Text(TextRun<'a>),
    Region(Region<'a>),
}

/// Result of a complete scan
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    pub source: &'a str,
    pub segments: Vec<Segment<'a>>,
    pub lines: LineIndex,
}

impl<'a> Scan<'a> {
    pub fn tags(&self) -> impl Iterator<Item = &TagToken<'a>> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Tag(tag) => Some(tag),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextRun<'a>> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region<'a>> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Region(region) => Some(region),
            _ => None,
        })
    }

    pub fn declaration(&self) -> Option<&Region<'a>> {
        self.regions().find(|r| r.kind == RegionKind::Declaration)
    }

    /// Name of the first element in the document
    pub fn root_name(&self) -> Option<&'a str> {
        self.tags()
            .find(|t| t.kind != TagKind::Closing)
            .map(|t| t.name)
    }
}

/// What was left unterminated when scanning had to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    Tag,
    CData,
    Declaration,
    Markup,
}

/// Fatal scanning condition: a construct that never ends
#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub construct: Unterminated,
    pub line: usize,
    pub excerpt: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, missing) = match self.construct {
            Unterminated::Tag => ("Tag", ">"),
            Unterminated::CData => ("CDATA section", "]]>"),
            Unterminated::Declaration => ("XML declaration", "?>"),
            Unterminated::Markup => ("Markup declaration", ">"),
        };
        write!(
            f,
            "{} at line {} is incomplete: '{}' is unclosed (missing '{}')",
            what, self.line, self.excerpt, missing
        )
    }
}

impl std::error::Error for ScanError {}

/// Scan a whole document into segments
pub fn scan(source: &str) -> Result<Scan<'_>, ScanError> {
    let lines = LineIndex::new(source);
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    while let Some(rel) = bytes[pos..].iter().position(|&b| b == b'<') {
        let lt = pos + rel;
        if lt > pos {
            segments.push(Segment::Text(TextRun {
                text: &source[pos..lt],
                start: pos,
                line: lines.line_of(pos),
            }));
        }

        let rest = &source[lt..];
        let line = lines.line_of(lt);
        let (segment, end) = if rest.starts_with("<!--") {
            let (end, terminated) = match rest[4..].find("-->") {
                Some(i) => (lt + 4 + i + 3, true),
                None => (source.len(), false),
            };
            let region = Region {
                kind: RegionKind::Comment,
                text: &source[lt..end],
                start: lt,
                line,
                terminated,
            };
            (Segment::Region(region), end)
        } else if rest.starts_with("<![CDATA[") {
            let end = delimited_end(source, lt, 9, "]]>", Unterminated::CData, &lines)?;
            (region_segment(source, RegionKind::CData, lt, end, line), end)
        } else if rest.starts_with("<?") {
            let kind = if is_declaration(rest) {
                RegionKind::Declaration
            } else {
                RegionKind::Markup
            };
            let construct = match kind {
                RegionKind::Declaration => Unterminated::Declaration,
                _ => Unterminated::Markup,
            };
            let end = delimited_end(source, lt, 2, "?>", construct, &lines)?;
            (region_segment(source, kind, lt, end, line), end)
        } else if rest.starts_with("<!") {
            let end = markup_declaration_end(source, lt, &lines)?;
            (region_segment(source, RegionKind::Markup, lt, end, line), end)
        } else {
            let (tag, end) = scan_tag(source, lt, line)?;
            (Segment::Tag(tag), end)
        };

        segments.push(segment);
        pos = end;
    }

    if pos < source.len() {
        segments.push(Segment::Text(TextRun {
            text: &source[pos..],
            start: pos,
            line: lines.line_of(pos),
        }));
    }

    log::trace!(
        "scanned {} segments over {} lines",
        segments.len(),
        lines.line_count()
    );

    Ok(Scan {
        source,
        segments,
        lines,
    })
}

fn region_segment(
    source: &str,
    kind: RegionKind,
    start: usize,
    end: usize,
    line: usize,
) -> Segment<'_> {
    Segment::Region(Region {
        kind,
        text: &source[start..end],
        start,
        line,
        terminated: true,
    })
}

/// `<?xml` followed by whitespace or `?>`
fn is_declaration(rest: &str) -> bool {
    rest.strip_prefix("<?xml")
        .and_then(|after| after.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '?')
}

/// End offset (exclusive) of a construct closed by `close`
fn delimited_end(
    source: &str,
    start: usize,
    open_len: usize,
    close: &str,
    construct: Unterminated,
    lines: &LineIndex,
) -> Result<usize, ScanError> {
    source[start + open_len..]
        .find(close)
        .map(|i| start + open_len + i + close.len())
        .ok_or_else(|| scan_error(source, start, construct, lines))
}

/// `<!DOCTYPE ...>` may carry an internal subset in brackets
fn markup_declaration_end(
    source: &str,
    start: usize,
    lines: &LineIndex,
) -> Result<usize, ScanError> {
    let mut depth = 0usize;
    for (i, b) in source.bytes().enumerate().skip(start + 2) {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b'>' if depth == 0 => return Ok(i + 1),
            _ => {}
        }
    }
    Err(scan_error(source, start, Unterminated::Markup, lines))
}

/// Scan `<...>` starting at `start`. A `>` inside a quoted attribute value
/// does not end the tag; a `<` anywhere before the closing `>` does.
fn scan_tag(source: &str, start: usize, line: usize) -> Result<(TagToken<'_>, usize), ScanError> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut after_equals = false;
    let mut i = start + 1;

    let close = loop {
        let Some(&b) = bytes.get(i) else {
            return Err(incomplete_tag(source, start, line));
        };
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) if b == b'<' => return Err(incomplete_tag(source, start, line)),
            Some(_) => {}
            None => match b {
                b'>' => break i,
                b'<' => return Err(incomplete_tag(source, start, line)),
                b'"' | b'\'' if after_equals => quote = Some(b),
                _ => {}
            },
        }
        if !b.is_ascii_whitespace() {
            after_equals = quote.is_none() && b == b'=';
        }
        i += 1;
    };

    let body = &source[start + 1..close];
    let token_start = start;

    let token = if let Some(rest) = body.strip_prefix('/') {
        let name_end = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        TagToken {
            kind: TagKind::Closing,
            name: &rest[..name_end],
            line,
            raw_attributes: rest[name_end..].trim(),
            start: token_start,
        }
    } else {
        let (inner, kind) = match body.strip_suffix('/') {
            Some(inner) => (inner, TagKind::SelfClosing),
            None => (body, TagKind::Opening),
        };
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        TagToken {
            kind,
            name: &inner[..name_end],
            line,
            raw_attributes: &inner[name_end..],
            start: token_start,
        }
    };

    Ok((token, close + 1))
}

fn incomplete_tag(source: &str, start: usize, line: usize) -> ScanError {
    ScanError {
        construct: Unterminated::Tag,
        line,
        excerpt: excerpt_at(source, start),
    }
}

fn scan_error(
    source: &str,
    start: usize,
    construct: Unterminated,
    lines: &LineIndex,
) -> ScanError {
    ScanError {
        construct,
        line: lines.line_of(start),
        excerpt: excerpt_at(source, start),
    }
}

/// Rest of the line from `start`, cut to a readable length
fn excerpt_at(source: &str, start: usize) -> String {
    let line = source[start..].lines().next().unwrap_or("");
    let mut excerpt: String = line.chars().take(EXCERPT_CHARS).collect();
    if line.chars().count() > EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    excerpt.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags<'a>(scan: &'a Scan<'a>) -> Vec<(TagKind, &'a str, usize)> {
        scan.tags().map(|t| (t.kind, t.name, t.line)).collect()
    }

    #[test]
    fn test_scan_three_tag_kinds() {
        let scan = scan("<types>\n  <type name=\"AKM\"/>\n  <type />\n</types>").unwrap();

        assert_eq!(
            tags(&scan),
            vec![
                (TagKind::Opening, "types", 1),
                (TagKind::SelfClosing, "type", 2),
                (TagKind::SelfClosing, "type", 3),
                (TagKind::Closing, "types", 4),
            ]
        );
    }

    #[test]
    fn test_raw_attributes_kept_unparsed() {
        let scan = scan(r#"<type name="AKM" id=5/>"#).unwrap();
        let tag = scan.tags().next().unwrap();

        assert_eq!(tag.raw_attributes, r#" name="AKM" id=5"#);
        assert_eq!(tag.attributes().len(), 2);
    }

    #[test]
    fn test_declaration_and_comments_are_regions() {
        let source = "<?xml version=\"1.0\"?>\n<!-- <fake> & stuff -->\n<root/>";
        let scan = scan(source).unwrap();

        let kinds: Vec<_> = scan.regions().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RegionKind::Declaration, RegionKind::Comment]);
        assert_eq!(tags(&scan), vec![(TagKind::SelfClosing, "root", 3)]);

        let comment = scan.regions().nth(1).unwrap();
        assert_eq!(comment.body(), " <fake> & stuff ");
        assert_eq!(comment.line, 2);
    }

    #[test]
    fn test_declaration_tolerated_anywhere() {
        let scan = scan("<root/>\n<?xml version=\"1.0\"?>").unwrap();
        assert!(scan.declaration().is_some());
    }

    #[test]
    fn test_processing_instruction_is_not_declaration() {
        let scan = scan("<?xml-stylesheet href=\"a.xsl\"?><root/>").unwrap();
        assert!(scan.declaration().is_none());
        assert_eq!(scan.regions().next().unwrap().kind, RegionKind::Markup);
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let scan = scan("<root>\n<!-- never closed\n</root>").unwrap();
        let comment = scan.regions().next().unwrap();

        assert!(!comment.terminated);
        assert_eq!(comment.body(), " never closed\n</root>");
        assert_eq!(tags(&scan), vec![(TagKind::Opening, "root", 1)]);
    }

    #[test]
    fn test_cdata_excluded_from_tags() {
        let source = "<d><![CDATA[a & b <c> ]]></d>";
        let scan = scan(source).unwrap();

        assert_eq!(scan.tags().count(), 2);
        assert_eq!(scan.texts().count(), 0);
        assert_eq!(scan.regions().next().unwrap().body(), "a & b <c> ");
    }

    #[test]
    fn test_markup_bodies_drop_their_delimiters() {
        let scan = scan("<?xml-stylesheet href=\"a.xsl\"?><!DOCTYPE r><r/>").unwrap();
        let bodies: Vec<_> = scan.regions().map(|r| r.body()).collect();
        assert_eq!(bodies, vec!["xml-stylesheet href=\"a.xsl\"", "DOCTYPE r"]);
    }

    #[test]
    fn test_doctype_with_internal_subset() {
        let source = "<!DOCTYPE r [ <!ELEMENT r ANY> ]>\n<r/>";
        let scan = scan(source).unwrap();

        assert_eq!(scan.regions().count(), 1);
        assert_eq!(tags(&scan), vec![(TagKind::SelfClosing, "r", 2)]);
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let scan = scan(r#"<cond expr="a > b">x</cond>"#).unwrap();
        let first = scan.tags().next().unwrap();
        assert_eq!(first.name, "cond");
        assert_eq!(first.raw_attributes, r#" expr="a > b""#);
    }

    #[test]
    fn test_apostrophe_in_unquoted_value_is_not_a_quote() {
        let scan = scan("<type name=Bob's>x</type>").unwrap();
        assert_eq!(scan.tags().count(), 2);
    }

    #[test]
    fn test_text_runs_carry_lines() {
        let scan = scan("<a>\nhello\n</a>").unwrap();
        let text = scan.texts().next().unwrap();

        assert_eq!(text.text, "\nhello\n");
        assert_eq!(text.line, 1);
        assert_eq!(text.start, 3);
    }

    #[test]
    fn test_tag_without_close_at_eof() {
        let err = scan("<types>\n<type name=\"X\"").unwrap_err();

        assert_eq!(err.construct, Unterminated::Tag);
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("incomplete"));
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_tag_interrupted_by_another_tag() {
        let err = scan("<types>\n<type name=\"X\"\n<nominal>5</nominal>").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.excerpt, "<type name=\"X\"");
    }

    #[test]
    fn test_unterminated_cdata_is_fatal() {
        let err = scan("<a><![CDATA[ oops</a>").unwrap_err();
        assert_eq!(err.construct, Unterminated::CData);
    }

    #[test]
    fn test_root_name() {
        let scan = scan("<?xml version=\"1.0\"?><!-- c --><events><event/></events>").unwrap();
        assert_eq!(scan.root_name(), Some("events"));
    }
}
