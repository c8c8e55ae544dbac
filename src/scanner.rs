use crate::constants;
use memchr::memmem::Finder;

/// One delimiter line located in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delimiter {
    /// Offset of the leading `--`.
    pub(crate) start: usize,
    pub(crate) kind: DelimiterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelimiterKind {
    /// Opens a part whose header block begins at `content_start`.
    Part { content_start: usize },
    /// The closing `--boundary--` delimiter.
    Closing,
}

/// Finds the `"--" + boundary` delimiter lines of a payload.
///
/// An occurrence only counts when it starts a line (offset 0 or right after
/// `\r\n`) and is followed by `--`, by a line terminator (optionally after
/// transport padding), or by the end of the payload. Everything else is part
/// content.
pub(crate) struct DelimiterScanner {
    finder: Finder<'static>,
}

impl DelimiterScanner {
    pub(crate) fn new(boundary: &str) -> DelimiterScanner {
        let mut delimiter = Vec::with_capacity(constants::BOUNDARY_EXT.len() + boundary.len());
        delimiter.extend_from_slice(constants::BOUNDARY_EXT);
        delimiter.extend_from_slice(boundary.as_bytes());

        DelimiterScanner {
            finder: Finder::new(&delimiter).into_owned(),
        }
    }

    fn delimiter_len(&self) -> usize {
        self.finder.needle().len()
    }

    /// Returns delimiters in payload order. The scan stops after the closing
    /// delimiter; bytes after it are never looked at.
    pub(crate) fn scan(&self, payload: &[u8]) -> Vec<Delimiter> {
        let mut delimiters = Vec::new();
        let mut pos = 0;

        while let Some(rel_idx) = self.finder.find(&payload[pos..]) {
            let start = pos + rel_idx;

            if !is_line_start(payload, start) {
                pos = start + 1;
                continue;
            }

            match self.classify(payload, start) {
                Some(DelimiterKind::Closing) => {
                    delimiters.push(Delimiter {
                        start,
                        kind: DelimiterKind::Closing,
                    });
                    break;
                }
                Some(DelimiterKind::Part { content_start }) => {
                    delimiters.push(Delimiter {
                        start,
                        kind: DelimiterKind::Part { content_start },
                    });
                    pos = content_start;
                }
                None => pos = start + 1,
            }

            if pos >= payload.len() {
                break;
            }
        }

        trace!("found {} delimiter(s) in {} byte payload", delimiters.len(), payload.len());

        delimiters
    }

    fn classify(&self, payload: &[u8], start: usize) -> Option<DelimiterKind> {
        let after = start + self.delimiter_len();
        let rest = &payload[after..];

        if rest.starts_with(constants::BOUNDARY_EXT) {
            return Some(DelimiterKind::Closing);
        }

        let padding = rest.iter().take_while(|b| constants::is_lws(**b)).count();
        let rest = &rest[padding..];

        if rest.starts_with(constants::CRLF) {
            Some(DelimiterKind::Part {
                content_start: after + padding + constants::CRLF.len(),
            })
        } else if rest.is_empty() {
            Some(DelimiterKind::Part {
                content_start: payload.len(),
            })
        } else {
            None
        }
    }
}

fn is_line_start(payload: &[u8], idx: usize) -> bool {
    idx == 0 || payload[..idx].ends_with(constants::CRLF)
}
