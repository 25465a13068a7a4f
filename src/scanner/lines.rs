//! Line Index
//!
//! Maps byte offsets to 1-based line numbers without re-scanning the text.

/// Byte offsets of every line start in a document
#[derive(Debug, Clone, PartialEq)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(newline_offsets(text));
        Self { starts }
    }

    /// 1-based line containing `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

fn newline_offsets(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.bytes()
        .enumerate()
        .filter(|&(_, b)| b == b'\n')
        .map(|(idx, _)| idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("<a></a>");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(6), 1);
    }

    #[test]
    fn test_multi_line_offsets() {
        let text = "<a>\n  <b/>\n</a>\n";
        let index = LineIndex::new(text);

        assert_eq!(index.line_of(0), 1);
        // The newline itself belongs to the line it terminates
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(text.find("</a>").unwrap()), 3);
        assert_eq!(index.line_count(), 4);
    }
}
