use crate::SourceId;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Anything that can point back at the source text it came from.
pub trait Spanned {
    fn span(&self) -> Span;
}

/// Represents a byte range into a specific piece of source text.
///
/// The full source is carried along as a shared `Arc<str>` so that a span can
/// render its own text without consulting any external table. The optional
/// [SourceId] ties the span back to the file it was read from; synthesized
/// spans have none.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    src: Arc<str>,
    start: usize,
    end: usize,
    source_id: Option<SourceId>,
}

impl Span {
    pub fn new(src: Arc<str>, start: usize, end: usize, source_id: Option<SourceId>) -> Option<Span> {
        if src.get(start..end).is_none() {
            return None;
        }
        Some(Span {
            src,
            start,
            end,
            source_id,
        })
    }

    /// An empty span pointing at nothing. Used for entities that were never
    /// written down, like builtin declarations.
    pub fn dummy() -> Span {
        Span {
            src: Arc::from(""),
            start: 0,
            end: 0,
            source_id: None,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0 && self.source_id.is_none() && self.src.is_empty()
    }

    /// Wraps an entire string, for tests and synthesized sources.
    pub fn from_string(source: String) -> Span {
        let src: Arc<str> = Arc::from(source);
        let end = src.len();
        Span {
            src,
            start: 0,
            end,
            source_id: None,
        }
    }

    pub fn src(&self) -> &Arc<str> {
        &self.src
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn source_id(&self) -> Option<&SourceId> {
        self.source_id.as_ref()
    }

    pub fn as_str(&self) -> &str {
        &self.src[self.start..self.end]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Joins two spans over the same source into one covering both.
    pub fn join(lhs: &Span, rhs: &Span) -> Span {
        assert!(Arc::ptr_eq(&lhs.src, &rhs.src));
        assert_eq!(lhs.source_id, rhs.source_id);
        Span {
            src: lhs.src.clone(),
            start: lhs.start.min(rhs.start),
            end: lhs.end.max(rhs.end),
            source_id: lhs.source_id,
        }
    }

    /// Shrinks the span until it no longer covers leading or trailing
    /// whitespace.
    pub fn trim(self) -> Span {
        let text = self.as_str();
        let trimmed_start = text.len() - text.trim_start().len();
        let trimmed_end = text.len() - text.trim_end().len();
        Span {
            start: self.start + trimmed_start,
            end: self.end - trimmed_end,
            ..self
        }
    }

    /// The 1-indexed line and column of the start of the span.
    pub fn line_col(&self) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for c in self.src[..self.start].chars() {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.is_dummy() {
            fmt.write_str("Span::dummy()")
        } else {
            fmt.debug_struct("Span")
                .field("start", &self.start)
                .field("end", &self.end)
                .field("as_str", &self.as_str())
                .finish()
        }
    }
}
