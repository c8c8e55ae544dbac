use crate::constants;
use crate::content_disposition::ContentDisposition;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use memchr::memmem;

/// One `key: value` line of a part's header block, with surrounding
/// whitespace removed from both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawHeader<'a> {
    pub(crate) name: &'a [u8],
    pub(crate) value: &'a [u8],
}

/// Splits a header block into header lines.
///
/// Lines are separated by `\r\n`. A line without a `:` or with an empty key
/// can't be interpreted and is skipped, as are the bytes of any non-header
/// garbage. Nothing here requires the block to be valid UTF-8.
pub(crate) fn tokenize(block: &[u8]) -> Vec<RawHeader<'_>> {
    let mut headers = Vec::new();
    let mut pos = 0;

    while pos < block.len() {
        let line_end = memmem::find(&block[pos..], constants::CRLF)
            .map(|idx| pos + idx)
            .unwrap_or(block.len());
        let line = &block[pos..line_end];
        pos = line_end + constants::CRLF.len();

        if let Some(colon) = memchr::memchr(b':', line) {
            let name = constants::trim_lws(&line[..colon]);
            if !name.is_empty() {
                headers.push(RawHeader {
                    name,
                    value: constants::trim_lws(&line[colon + 1..]),
                });
            }
        }
    }

    headers
}

/// What a part's header block says about the part.
#[derive(Debug)]
pub(crate) struct PartHeaders {
    pub(crate) content_disposition: ContentDisposition,
    pub(crate) content_type: Option<String>,
    pub(crate) headers: HeaderMap,
}

impl PartHeaders {
    /// Interprets `Content-Disposition` and `Content-Type`; other lines only
    /// end up in the header map. The first occurrence of each wins.
    pub(crate) fn parse(block: &[u8]) -> PartHeaders {
        let raw_headers = tokenize(block);

        let content_disposition = find_header(&raw_headers, &header::CONTENT_DISPOSITION)
            .map(ContentDisposition::parse)
            .unwrap_or(ContentDisposition {
                field_name: None,
                file_name: None,
            });

        let content_type =
            find_header(&raw_headers, &header::CONTENT_TYPE).map(|val| String::from_utf8_lossy(val).into_owned());

        PartHeaders {
            content_disposition,
            content_type,
            headers: convert_raw_headers_to_header_map(&raw_headers),
        }
    }
}

fn find_header<'a>(raw_headers: &[RawHeader<'a>], name: &HeaderName) -> Option<&'a [u8]> {
    raw_headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name.as_str().as_bytes()))
        .map(|h| h.value)
}

/// Keeps every line that is a valid HTTP header, in order, duplicates included.
pub(crate) fn convert_raw_headers_to_header_map(raw_headers: &[RawHeader<'_>]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(raw_headers.len());

    for raw_header in raw_headers {
        let name = match HeaderName::from_bytes(raw_header.name) {
            Ok(name) => name,
            Err(_) => {
                trace!("skipping part header with invalid name: {:?}", raw_header.name);
                continue;
            }
        };

        let value = match HeaderValue::from_bytes(raw_header.value) {
            Ok(value) => value,
            Err(_) => {
                trace!("skipping part header {:?} with invalid value", name);
                continue;
            }
        };

        headers.append(name, value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let block = b"Content-Type: text/plain\r\nContent-Disposition:form-data; name=\"a\"  \r\nX-Empty:\r\nno colon here";
        let headers = tokenize(block);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].name, b"Content-Type");
        assert_eq!(headers[0].value, b"text/plain");
        assert_eq!(headers[1].name, b"Content-Disposition");
        assert_eq!(headers[1].value, b"form-data; name=\"a\"");
        assert_eq!(headers[2].name, b"X-Empty");
        assert_eq!(headers[2].value, b"");
    }

    #[test]
    fn test_tokenize_binary() {
        let block = b"\xff\xfe: \x00\x01\r\n: nameless\r\n\r\nX-A: 1:2";
        let headers = tokenize(block);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name, b"\xff\xfe");
        assert_eq!(headers[0].value, b"\x00\x01");
        assert_eq!(headers[1].name, b"X-A");
        assert_eq!(headers[1].value, b"1:2");

        assert!(tokenize(b"").is_empty());
    }

    #[test]
    fn test_part_headers() {
        let block = b"content-disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nCONTENT-TYPE: text/plain\r\nX-Custom: 1\r\nX-Custom: 2";
        let parsed = PartHeaders::parse(block);

        assert_eq!(parsed.content_disposition.field_name.as_deref(), Some("file"));
        assert_eq!(parsed.content_disposition.file_name.as_deref(), Some("a.txt"));
        assert_eq!(parsed.content_type.as_deref(), Some("text/plain"));
        assert_eq!(parsed.headers.get_all("x-custom").iter().count(), 2);
        assert_eq!(parsed.headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_part_headers_invalid_lines() {
        let block = b"Bad Name: x\r\nX-Bin: \x7f\r\nContent-Disposition: form-data; name=\"\xe4\xbd\xa0\"";
        let parsed = PartHeaders::parse(block);

        assert_eq!(parsed.content_disposition.field_name.as_deref(), Some("你"));
        assert_eq!(parsed.content_type, None);
        assert_eq!(parsed.headers.len(), 1);
        assert!(parsed.headers.contains_key(header::CONTENT_DISPOSITION));
    }
}
