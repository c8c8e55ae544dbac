use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use http::header::HeaderMap;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

/// A single decoded part of a `multipart/form-data` payload.
///
/// The part's data is a view into the decoded payload buffer, so cloning a
/// `Part` or calling [`bytes`](Part::bytes) never copies the content.
///
/// A part with a file name is a *file part*. Only file parts carry a
/// [`content_type`](Part::content_type); for plain fields a `Content-Type`
/// line is still visible through [`headers`](Part::headers) but otherwise
/// ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    headers: HeaderMap,
    data: Bytes,
    meta: PartMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PartMeta {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    idx: usize,
}

impl Part {
    pub(crate) fn new(
        name: String,
        file_name: Option<String>,
        content_type: Option<String>,
        headers: HeaderMap,
        data: Bytes,
        idx: usize,
    ) -> Part {
        // The declared type only matters for files.
        let content_type = file_name.as_ref().and(content_type);

        Part {
            headers,
            data,
            meta: PartMeta {
                name,
                file_name,
                content_type,
                idx,
            },
        }
    }

    /// The field name found in the `Content-Disposition` header.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The file name found in the `Content-Disposition` header.
    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name.as_deref()
    }

    /// The `Content-Type` declared by a file part, verbatim.
    pub fn content_type(&self) -> Option<&str> {
        self.meta.content_type.as_deref()
    }

    /// The declared `Content-Type` parsed as [`mime::Mime`], if it parses.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.content_type().and_then(|val| val.parse::<mime::Mime>().ok())
    }

    /// Returns `true` if the part carries a file name.
    pub fn is_file(&self) -> bool {
        self.meta.file_name.is_some()
    }

    /// The header lines of this part that are valid HTTP headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The index of this part in the order the parts were decoded.
    pub fn index(&self) -> usize {
        self.meta.idx
    }

    /// The exact bytes between the header block and the next delimiter.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the part data without copying it.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Consumes the part, returning its data.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Decodes the part data as text.
    ///
    /// The `charset` parameter of the declared content type is honored, UTF-8
    /// otherwise. Malformed sequences are replaced with `U+FFFD`.
    ///
    /// # Examples
    ///
    /// ```
    /// let data = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nabcd\r\n--X--\r\n";
    /// let parts = formparts::decode(data, "X");
    ///
    /// assert_eq!(parts[0].text(), "abcd");
    /// ```
    pub fn text(&self) -> String {
        self.text_with_charset("utf-8")
    }

    /// Like [`text`](Part::text), but with a caller-provided default encoding
    /// label used when the part doesn't declare a charset.
    pub fn text_with_charset(&self, default_encoding: &str) -> String {
        let mime = self.mime();

        let encoding_name = mime
            .as_ref()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .map(|charset| charset.as_str())
            .unwrap_or(default_encoding);

        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);

        let (text, _, _) = encoding.decode(&self.data);
        text.into_owned()
    }

    /// Deserializes the part data as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.data).map_err(crate::Error::DecodeJson)
    }
}
