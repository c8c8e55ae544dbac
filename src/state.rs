use crate::scanner::Delimiter;
use crate::Part;
use bytes::Bytes;
use http::header::HeaderMap;

#[derive(Debug)]
pub(crate) struct DecodeState {
    pub(crate) payload: Bytes,
    pub(crate) delimiters: Vec<Delimiter>,
    pub(crate) stage: DecodeStage,
    pub(crate) curr_part: Option<PendingPart>,
    pub(crate) parts: Vec<Part>,
}

/// Stages of a single decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeStage {
    /// Looking for the first delimiter; everything before it is preamble.
    FindingFirstDelimiter,
    /// Reading the header block of the part opened by the delimiter at `idx`.
    ReadingPartHeaders { idx: usize },
    /// Cutting out the body of the part opened by the delimiter at `idx`.
    ReadingPartData { idx: usize, body_start: usize },
    Done,
}

/// A part whose headers were accepted and whose data is read next.
#[derive(Debug)]
pub(crate) struct PendingPart {
    pub(crate) name: String,
    pub(crate) file_name: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) headers: HeaderMap,
}
