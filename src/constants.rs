pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: u64 = u64::MAX;
pub(crate) const DEFAULT_PER_FIELD_SIZE_LIMIT: u64 = u64::MAX;

pub(crate) const BOUNDARY_EXT: &[u8] = b"--";
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const CRLF_CRLF: &[u8] = b"\r\n\r\n";

pub(crate) const BOUNDARY_PARAM: &str = "boundary";
pub(crate) const NAME_PARAM: &[u8] = b"name";
pub(crate) const FILE_NAME_PARAM: &[u8] = b"filename";

/// Linear whitespace allowed around header values and after a delimiter.
pub(crate) fn is_lws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

pub(crate) fn trim_lws(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if is_lws(*first) {
            bytes = rest;
        } else {
            break;
        }
    }

    while let [rest @ .., last] = bytes {
        if is_lws(*last) {
            bytes = rest;
        } else {
            break;
        }
    }

    bytes
}
