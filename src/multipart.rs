use crate::buffer::StreamBuffer;
use crate::constants;
use crate::constraints::Constraints;
use crate::headers::PartHeaders;
use crate::scanner::{DelimiterKind, DelimiterScanner};
use crate::state::{DecodeStage, DecodeState, PendingPart};
use crate::Part;
use bytes::Bytes;
use futures_util::stream::{Stream, TryStreamExt};
use memchr::memmem;
use std::ops::Range;
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

/// Decodes a `multipart/form-data` payload into its parts.
///
/// The parts are returned in payload order. Decoding never fails: a payload
/// without the `"--" + boundary` delimiter yields no parts, a part without a
/// header block or without a `name` is dropped, and a payload missing its
/// closing delimiter yields every part that was terminated by a following
/// delimiter.
///
/// The boundary is used as is, no trimming or unquoting is applied. The data of
/// each part is a zero-copy slice of `payload`.
///
/// A `"--" + boundary` line followed by anything other than `--`, transport
/// padding and `\r\n`, or the end of the payload (e.g. `--<boundary>junk`) is
/// not a delimiter and stays in the body of the current part.
///
/// # Examples
///
/// ```
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let parts = formparts::decode(data, "X-BOUNDARY");
///
/// assert_eq!(parts.len(), 1);
/// assert_eq!(parts[0].name(), "my_text_field");
/// assert_eq!(parts[0].data().as_ref(), b"abcd");
///
/// assert!(formparts::decode(data, "Y-BOUNDARY").is_empty());
/// ```
pub fn decode<P: Into<Bytes>>(payload: P, boundary: &str) -> Vec<Part> {
    let payload = payload.into();
    let delimiters = DelimiterScanner::new(boundary).scan(&payload);

    let mut state = DecodeState {
        payload,
        delimiters,
        stage: DecodeStage::FindingFirstDelimiter,
        curr_part: None,
        parts: Vec::new(),
    };

    loop {
        state.stage = match state.stage {
            DecodeStage::FindingFirstDelimiter => {
                if state.delimiters.is_empty() {
                    DecodeStage::Done
                } else {
                    DecodeStage::ReadingPartHeaders { idx: 0 }
                }
            }
            DecodeStage::ReadingPartHeaders { idx } => state.read_part_headers(idx),
            DecodeStage::ReadingPartData { idx, body_start } => state.read_part_data(idx, body_start),
            DecodeStage::Done => break,
        };
    }

    debug!("decoded {} part(s) from {} byte payload", state.parts.len(), state.payload.len());

    state.parts
}

impl DecodeState {
    /// The segment between the delimiter at `idx` and the next one.
    fn segment(&self, idx: usize) -> Option<Range<usize>> {
        let content_start = match self.delimiters[idx].kind {
            DelimiterKind::Part { content_start } => content_start,
            DelimiterKind::Closing => return None,
        };

        self.delimiters.get(idx + 1).map(|next| content_start..next.start)
    }

    fn next_delimiter(&self, idx: usize) -> DecodeStage {
        if idx + 1 < self.delimiters.len() {
            DecodeStage::ReadingPartHeaders { idx: idx + 1 }
        } else {
            DecodeStage::Done
        }
    }

    fn read_part_headers(&mut self, idx: usize) -> DecodeStage {
        let segment = match self.segment(idx) {
            Some(segment) => segment,
            None => {
                if let DelimiterKind::Part { .. } = self.delimiters[idx].kind {
                    trace!("no delimiter after part {}, closing delimiter missing", idx);
                }
                return DecodeStage::Done;
            }
        };

        let (header_block, body_offset) = match split_header_block(&self.payload[segment.clone()]) {
            Some(split) => split,
            None => {
                trace!("dropping part {}: no blank line ends its headers", idx);
                return self.next_delimiter(idx);
            }
        };

        let PartHeaders {
            content_disposition,
            content_type,
            headers,
        } = PartHeaders::parse(header_block);

        let name = match content_disposition.field_name {
            Some(name) => name,
            None => {
                trace!("dropping part {}: no field name", idx);
                return self.next_delimiter(idx);
            }
        };

        self.curr_part = Some(PendingPart {
            name,
            file_name: content_disposition.file_name,
            content_type,
            headers,
        });

        DecodeStage::ReadingPartData {
            idx,
            body_start: segment.start + body_offset,
        }
    }

    fn read_part_data(&mut self, idx: usize, body_start: usize) -> DecodeStage {
        let (segment, pending) = match (self.segment(idx), self.curr_part.take()) {
            (Some(segment), Some(pending)) => (segment, pending),
            _ => return DecodeStage::Done,
        };

        let body = trim_line_terminator(&self.payload, body_start..segment.end);
        let data = self.payload.slice(body);

        let part_idx = self.parts.len();
        self.parts.push(Part::new(
            pending.name,
            pending.file_name,
            pending.content_type,
            pending.headers,
            data,
            part_idx,
        ));

        self.next_delimiter(idx)
    }
}

/// Splits a part segment into its header block and the offset of the body.
///
/// The header block ends at the first blank line. A segment that starts with a
/// line terminator has an empty header block.
fn split_header_block(segment: &[u8]) -> Option<(&[u8], usize)> {
    if segment.starts_with(constants::CRLF) {
        return Some((&[][..], constants::CRLF.len()));
    }

    memmem::find(segment, constants::CRLF_CRLF).map(|idx| (&segment[..idx], idx + constants::CRLF_CRLF.len()))
}

/// Drops the one line terminator that precedes the next delimiter.
fn trim_line_terminator(payload: &[u8], body: Range<usize>) -> Range<usize> {
    let bytes = &payload[body.clone()];

    let trim = if bytes.ends_with(constants::CRLF) {
        constants::CRLF.len()
    } else if bytes.last() == Some(&constants::LF) || bytes.last() == Some(&constants::CR) {
        1
    } else {
        0
    };

    body.start..body.end - trim
}

/// The ordered parts of one decoded `multipart/form-data` payload.
///
/// Lookups by name go through the parts in payload order and keep duplicates,
/// the way a form-data container exposes them.
///
/// # Examples
///
/// ```
/// use formparts::Multipart;
///
/// let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n2\r\n--X--\r\n";
/// let form = Multipart::new(data, "X");
///
/// assert_eq!(form.get("a").map(|part| part.text()), Some("1".to_owned()));
/// assert_eq!(form.get_all("a").count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Multipart {
    parts: Vec<Part>,
}

impl Multipart {
    /// Decodes `payload` with the given boundary, see [`decode`].
    pub fn new<P: Into<Bytes>>(payload: P, boundary: &str) -> Multipart {
        Multipart {
            parts: decode(payload, boundary),
        }
    }

    /// Decodes `payload` and enforces the given [`Constraints`] on it.
    ///
    /// Unlike [`new`](Multipart::new) this fails when the payload, or any of
    /// the decoded parts, violates the constraints.
    pub fn with_constraints<P: Into<Bytes>>(
        payload: P,
        boundary: &str,
        constraints: Constraints,
    ) -> crate::Result<Multipart> {
        let payload = payload.into();
        constraints.check_stream_size(payload.len() as u64)?;

        let parts = decode(payload, boundary);
        for part in &parts {
            constraints.check_part(part)?;
        }

        Ok(Multipart { parts })
    }

    /// Reads a [`Bytes`] stream to its end and decodes the collected payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use formparts::Multipart;
    /// use futures_util::stream::once;
    /// use std::convert::Infallible;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
    /// let form = Multipart::from_stream(stream, "X-BOUNDARY").await.unwrap();
    ///
    /// assert_eq!(form.len(), 1);
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    pub async fn from_stream<S, O, E>(stream: S, boundary: &str) -> crate::Result<Multipart>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        Multipart::from_stream_with_constraints(stream, boundary, Constraints::default()).await
    }

    /// Like [`from_stream`](Multipart::from_stream), enforcing the whole stream
    /// size limit while reading and the remaining constraints after decoding.
    pub async fn from_stream_with_constraints<S, O, E>(
        stream: S,
        boundary: &str,
        constraints: Constraints,
    ) -> crate::Result<Multipart>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let stream = stream
            .map_ok(|b| b.into())
            .map_err(|err| crate::Error::StreamReadFailed(err.into()));

        let payload = StreamBuffer::new(stream, constraints.size_limit.whole_stream)
            .read_to_end()
            .await?;

        Multipart::with_constraints(payload, boundary, constraints)
    }

    /// Reads an [`AsyncRead`] to its end and decodes the collected payload.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use formparts::Multipart;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let form = Multipart::with_reader(data.as_bytes(), "X-BOUNDARY").await.unwrap();
    ///
    /// assert_eq!(form.get("my_text_field").unwrap().text(), "abcd");
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub async fn with_reader<R>(reader: R, boundary: &str) -> crate::Result<Multipart>
    where
        R: AsyncRead + Send + 'static,
    {
        Multipart::from_stream(ReaderStream::new(reader), boundary).await
    }

    /// Like [`with_reader`](Multipart::with_reader), enforcing the given
    /// [`Constraints`].
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub async fn with_reader_with_constraints<R>(
        reader: R,
        boundary: &str,
        constraints: Constraints,
    ) -> crate::Result<Multipart>
    where
        R: AsyncRead + Send + 'static,
    {
        Multipart::from_stream_with_constraints(ReaderStream::new(reader), boundary, constraints).await
    }

    /// The number of decoded parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if no part was decoded.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterates over the parts in payload order.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// The first part with the given name.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name() == name)
    }

    /// Every part with the given name, in payload order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Part> + 'a {
        self.parts.iter().filter(move |part| part.name() == name)
    }

    /// Returns `true` if at least one part has the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The file parts, in payload order.
    pub fn files(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|part| part.is_file())
    }

    /// Consumes the form, returning its parts in payload order.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl IntoIterator for Multipart {
    type Item = Part;
    type IntoIter = std::vec::IntoIter<Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Multipart {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_BOUNDARY: &str = "----WebKitFormBoundaryvef1fLxmoUdYZWXp";

    fn demo_payload() -> String {
        let mut body = String::from("trash1\r\n");
        body += "------WebKitFormBoundaryvef1fLxmoUdYZWXp\r\n";
        body += "Content-Type: text/plain\r\n";
        body += "Content-Disposition: form-data; name=\"uploads[]\"; filename=\"A.txt\"\r\n";
        body += "\r\n";
        body += "@11X111Y\r\n111Z\rCCCC\nCCCC\r\nCCCCC@\r\n\r\n";
        body += "------WebKitFormBoundaryvef1fLxmoUdYZWXp\r\n";
        body += "Content-Type: text/plain\r\n";
        body += "Content-Disposition: form-data; name=\"uploads[]\"; filename=\"B.txt\"\r\n";
        body += "\r\n";
        body += "@22X222Y\r\n222Z\r222W\n2220\r\n666@\r\n";
        body += "------WebKitFormBoundaryvef1fLxmoUdYZWXp\r\n";
        body += "Content-Disposition: form-data; name=\"input1\"\r\n";
        body += "\r\n";
        body += "value1\r\n";
        body += "------WebKitFormBoundaryvef1fLxmoUdYZWXp--\r\n";
        body
    }

    #[test]
    fn test_decode_demo_payload() {
        let parts = decode(demo_payload(), DEMO_BOUNDARY);
        assert_eq!(parts.len(), 3);

        assert_eq!(parts[0].name(), "uploads[]");
        assert_eq!(parts[0].file_name(), Some("A.txt"));
        assert_eq!(parts[0].content_type(), Some("text/plain"));
        assert_eq!(parts[0].data().as_ref(), b"@11X111Y\r\n111Z\rCCCC\nCCCC\r\nCCCCC@\r\n");

        assert_eq!(parts[1].name(), "uploads[]");
        assert_eq!(parts[1].file_name(), Some("B.txt"));
        assert_eq!(parts[1].content_type(), Some("text/plain"));
        assert_eq!(parts[1].data().as_ref(), b"@22X222Y\r\n222Z\r222W\n2220\r\n666@");

        assert_eq!(parts[2].name(), "input1");
        assert_eq!(parts[2].file_name(), None);
        assert_eq!(parts[2].content_type(), None);
        assert_eq!(parts[2].data().as_ref(), b"value1");

        let indices: Vec<usize> = parts.iter().map(|part| part.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_decode_wrong_boundary() {
        assert!(decode(demo_payload(), &format!("{}bad", DEMO_BOUNDARY)).is_empty());
        assert!(decode("hellow world", DEMO_BOUNDARY).is_empty());
        assert!(decode("", DEMO_BOUNDARY).is_empty());
    }

    #[test]
    fn test_decode_drops_malformed_parts() {
        let data = "--X\r\nContent-Disposition: form-data\r\n\r\nno name\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"no-blank-line\"\r\n\
                    --X\r\n\r\nno headers\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"kept\"\r\n\r\nok\r\n--X--";
        let parts = decode(data, "X");

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "kept");
        assert_eq!(parts[0].index(), 0);
        assert_eq!(parts[0].data().as_ref(), b"ok");
    }

    #[test]
    fn test_decode_truncated() {
        let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2";
        let parts = decode(data, "X");

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "a");
    }

    #[test]
    fn test_decode_delimiter_with_suffix_is_body() {
        let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nv\r\n--Xjunk\r\n\
                    Content-Disposition: form-data; name=\"b\"\r\n\r\nw\r\n--X--\r\n";
        let parts = decode(data, "X");

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "a");
        assert_eq!(
            parts[0].data().as_ref(),
            &b"v\r\n--Xjunk\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\nw"[..]
        );
    }

    #[test]
    fn test_decode_epilogue_ignored() {
        let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X--\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--X--";
        let parts = decode(data, "X");

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name(), "a");
    }

    #[test]
    fn test_decode_empty_and_blank_bodies() {
        let data = "--X\r\nContent-Disposition: form-data; name=\"empty\"\r\n\r\n\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"tight\"\r\n\r\n\
                    --X\r\nContent-Disposition: form-data; name=\"blank\"\r\n\r\n\r\n\r\n--X--";
        let parts = decode(data, "X");

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].data().as_ref(), b"");
        assert_eq!(parts[1].data().as_ref(), b"");
        assert_eq!(parts[2].data().as_ref(), b"\r\n");
    }

    #[test]
    fn test_decode_field_ignores_content_type() {
        let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\nContent-Type: text/plain\r\n\r\n1\r\n--X--";
        let parts = decode(data, "X");

        assert_eq!(parts[0].content_type(), None);
        assert_eq!(parts[0].headers().get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_decode_binary_data() {
        let mut data = b"--X\r\nContent-Disposition: form-data; name=\"bin\"; filename=\"b.bin\"\r\n\r\n".to_vec();
        let body: Vec<u8> = (0..=255u8).chain(b"\r\n--Y\r\n-X\r\n--X-".iter().copied()).collect();
        data.extend_from_slice(&body);
        data.extend_from_slice(b"\r\n--X--\r\n");

        let parts = decode(data, "X");

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].content_type(), None);
        assert_eq!(parts[0].data().as_ref(), &body[..]);
    }

    #[test]
    fn test_decode_is_zero_copy() {
        let payload = Bytes::from(demo_payload());
        let parts = decode(payload.clone(), DEMO_BOUNDARY);

        let range = payload.as_ptr() as usize..payload.as_ptr() as usize + payload.len();
        for part in &parts {
            assert!(range.contains(&(part.data().as_ptr() as usize)));
        }
    }

    #[test]
    fn test_trim_line_terminator() {
        assert_eq!(trim_line_terminator(b"ab\r\n", 0..4), 0..2);
        assert_eq!(trim_line_terminator(b"ab\r\n\r\n", 0..6), 0..4);
        assert_eq!(trim_line_terminator(b"ab\n", 0..3), 0..2);
        assert_eq!(trim_line_terminator(b"ab\r", 0..3), 0..2);
        assert_eq!(trim_line_terminator(b"ab", 0..2), 0..2);
        assert_eq!(trim_line_terminator(b"", 0..0), 0..0);
    }

    #[test]
    fn test_split_header_block() {
        assert_eq!(split_header_block(b"\r\nbody"), Some((&b""[..], 2)));
        assert_eq!(split_header_block(b"A: 1\r\nB: 2\r\n\r\nbody"), Some((&b"A: 1\r\nB: 2"[..], 14)));
        assert_eq!(split_header_block(b"A: 1\r\n"), None);
        assert_eq!(split_header_block(b""), None);
    }

    #[test]
    fn test_multipart_lookups() {
        let form = Multipart::new(demo_payload(), DEMO_BOUNDARY);

        assert_eq!(form.len(), 3);
        assert!(!form.is_empty());
        assert!(form.contains("input1"));
        assert!(!form.contains("missing"));
        assert_eq!(form.get("uploads[]").and_then(|part| part.file_name()), Some("A.txt"));
        assert_eq!(form.get_all("uploads[]").count(), 2);
        assert_eq!(form.files().count(), 2);
        assert_eq!((&form).into_iter().count(), 3);

        let names: Vec<String> = form.into_iter().map(|part| part.name().to_owned()).collect();
        assert_eq!(names, vec!["uploads[]", "uploads[]", "input1"]);

        assert!(Multipart::new("garbage", DEMO_BOUNDARY).is_empty());
    }
}
