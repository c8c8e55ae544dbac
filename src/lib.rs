//! A decoder for `multipart/form-data` payloads that are already in memory.
//!
//! Give it the payload bytes and the boundary token (usually taken from the
//! `Content-Type` header) and it returns the ordered list of form parts, each
//! with its field name, optional file name, optional declared content type and
//! its exact binary data.
//!
//! Decoding is total: malformed or adversarial input never produces an error,
//! only fewer parts. A payload that doesn't contain the boundary decodes to an
//! empty list, and a single broken part is skipped without affecting the rest.
//!
//! # Examples
//!
//! ```
//! let content_type = "multipart/form-data; boundary=X-BOUNDARY";
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_file_field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";
//!
//! let boundary = formparts::extract_boundary(content_type).unwrap();
//!
//! for part in formparts::decode(data, &boundary) {
//!     println!("Name: {:?}, File Name: {:?}", part.name(), part.file_name());
//!     println!("Content: {:?}", part.text());
//! }
//! ```
//!
//! ## Optional features
//!
//! * `json`: adds [`Part::json`] to deserialize part data with `serde_json`.
//! * `tokio-io`: adds [`Multipart::with_reader`] to collect a payload from a
//!   [`tokio::io::AsyncRead`].
//! * `log`: emits `log` records about dropped parts and decode results.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![cfg_attr(nightly, feature(doc_cfg))]

pub use bytes;

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)+) => (log::trace!($($arg)+))
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)+) => {
        if false {
            drop(format!($($arg)+));
        }
    };
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($arg:tt)+) => (log::debug!($($arg)+))
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)+) => {
        if false {
            drop(format!($($arg)+));
        }
    };
}

pub use boundary::extract_boundary;
pub use constraints::Constraints;
pub use error::Error;
pub use multipart::{decode, Multipart};
pub use part::Part;
pub use size_limit::SizeLimit;

mod boundary;
mod buffer;
mod constants;
mod constraints;
mod content_disposition;
mod error;
mod headers;
mod multipart;
mod part;
mod scanner;
mod size_limit;
mod state;

/// A Result type often returned from methods that can have `formparts` errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parses the `Content-Type` header to extract the boundary value, insisting on
/// a well-formed `multipart/form-data` media type.
///
/// [`extract_boundary`] is the lenient counterpart that only looks for the
/// parameter.
///
/// # Examples
///
/// ```
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(formparts::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| boundary::strip_quotes(name.as_str()).to_owned())
        .filter(|name| !name.is_empty())
        .ok_or(Error::NoBoundary)
}
