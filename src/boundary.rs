use crate::constants;

/// Extracts the raw boundary token from a `Content-Type` style header value.
///
/// The `boundary` parameter is matched case-insensitively and its value runs up
/// to the next `;` or the end of the header. A single surrounding pair of `"` or
/// `'` quotes is stripped; nothing inside is unescaped. Text inside another
/// parameter's double-quoted value never starts a parameter.
///
/// Returns `None` if there is no (non-empty) `boundary` parameter, which means
/// the payload can't be decoded.
///
/// # Examples
///
/// ```
/// let boundary = formparts::extract_boundary("multipart/form-data; boundary=\"X-BOUNDARY\"");
/// assert_eq!(boundary.as_deref(), Some("X-BOUNDARY"));
///
/// assert_eq!(formparts::extract_boundary("text/plain"), None);
/// ```
pub fn extract_boundary<T: AsRef<str>>(header: T) -> Option<String> {
    let header = header.as_ref();

    param_starts(header)
        .filter_map(|start| {
            let param = header[start..].split(';').next()?;
            let (key, value) = split_param(param)?;
            if key.eq_ignore_ascii_case(constants::BOUNDARY_PARAM) {
                Some(value)
            } else {
                None
            }
        })
        .map(strip_quotes)
        .find(|value| !value.is_empty())
        .map(|value| value.to_owned())
}

/// Offsets where a parameter begins: the start of the header and every `;`
/// outside a double-quoted string.
fn param_starts(header: &str) -> impl Iterator<Item = usize> + '_ {
    let mut quoted = false;

    std::iter::once(0).chain(header.bytes().enumerate().filter_map(move |(idx, b)| {
        match b {
            b'"' => quoted = !quoted,
            b';' if !quoted => return Some(idx + 1),
            _ => {}
        }
        None
    }))
}

fn split_param(param: &str) -> Option<(&str, &str)> {
    let eq = param.find('=')?;
    Some((param[..eq].trim(), param[eq + 1..].trim()))
}

/// Strips exactly one matching pair of outer quote characters.
pub(crate) fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();

    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_boundary() {
        let header = "multipart/form-data; boundary=----WebKitFormBoundaryvm5A9tzU1ONaGP5B";
        assert_eq!(
            extract_boundary(header).as_deref(),
            Some("----WebKitFormBoundaryvm5A9tzU1ONaGP5B")
        );

        let header = "multipart/form-data; boundary=\"----WebKitFormBoundaryvm5A9tzU1ONaGP5B\"";
        assert_eq!(
            extract_boundary(header).as_deref(),
            Some("----WebKitFormBoundaryvm5A9tzU1ONaGP5B")
        );

        let header = "multipart/form-data; boundary='----WebKitFormBoundaryvm5A9tzU1ONaGP5B'";
        assert_eq!(
            extract_boundary(header).as_deref(),
            Some("----WebKitFormBoundaryvm5A9tzU1ONaGP5B")
        );
    }

    #[test]
    fn test_extract_boundary_params() {
        let header = "multipart/form-data; charset=utf-8; BOUNDARY=abc; foo=bar";
        assert_eq!(extract_boundary(header).as_deref(), Some("abc"));

        let header = "multipart/form-data;boundary=  spaced  ";
        assert_eq!(extract_boundary(header).as_deref(), Some("spaced"));

        let header = "multipart/form-data; boundary=\"a;b\"";
        assert_eq!(extract_boundary(header).as_deref(), Some("\"a"));

        let header = "multipart/form-data; myboundary=abc";
        assert_eq!(extract_boundary(header), None);
    }

    #[test]
    fn test_extract_boundary_skips_quoted_params() {
        let header = "multipart/form-data; foo=\"a;boundary=Y\"; boundary=X";
        assert_eq!(extract_boundary(header).as_deref(), Some("X"));
        assert_eq!(crate::parse_boundary(header).ok(), extract_boundary(header));

        let header = "multipart/form-data; foo=\"boundary=Y\"";
        assert_eq!(extract_boundary(header), None);

        let header = "multipart/form-data; foo=\"a;b\"; BOUNDARY=\"X;Y\"";
        assert_eq!(extract_boundary(header).as_deref(), Some("\"X"));
    }

    #[test]
    fn test_extract_boundary_absent() {
        assert_eq!(extract_boundary("multipart/form-data"), None);
        assert_eq!(extract_boundary("text/plain"), None);
        assert_eq!(extract_boundary(""), None);
        assert_eq!(extract_boundary("multipart/form-data; boundary="), None);
        assert_eq!(extract_boundary("multipart/form-data; boundary=\"\""), None);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"X\""), "X");
        assert_eq!(strip_quotes("'X'"), "X");
        assert_eq!(strip_quotes("\"X'"), "\"X'");
        assert_eq!(strip_quotes("\"\"X\"\""), "\"X\"");
        assert_eq!(strip_quotes("\\\"X\\\""), "\\\"X\\\"");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("X"), "X");
    }
}
