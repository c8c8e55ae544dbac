use crate::constants;

/// The `name` and `filename` parameters of a part's `Content-Disposition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    /// Parses a raw header value such as `form-data; name="a"; filename="a.txt"`.
    ///
    /// Parameter keys are case-insensitive and the first occurrence wins.
    /// Double-quoted values lose their quotes and are otherwise taken as is, so
    /// a `;` inside quotes doesn't end the value.
    pub(crate) fn parse(value: &[u8]) -> ContentDisposition {
        let mut field_name = None;
        let mut file_name = None;

        for (key, val) in Params::new(value) {
            if field_name.is_none() && key.eq_ignore_ascii_case(constants::NAME_PARAM) {
                field_name = Some(String::from_utf8_lossy(val).into_owned());
            } else if file_name.is_none() && key.eq_ignore_ascii_case(constants::FILE_NAME_PARAM) {
                file_name = Some(String::from_utf8_lossy(val).into_owned());
            }
        }

        ContentDisposition { field_name, file_name }
    }
}

/// Iterates over the `key=value` parameters following the disposition type.
struct Params<'a> {
    rest: &'a [u8],
}

impl<'a> Params<'a> {
    fn new(value: &'a [u8]) -> Params<'a> {
        // The disposition type itself is a bare token.
        let rest: &[u8] = match memchr::memchr(b';', value) {
            Some(idx) => &value[idx + 1..],
            None => &[],
        };

        Params { rest }
    }
}

impl<'a> Iterator for Params<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            let key_end = memchr::memchr2(b'=', b';', self.rest).unwrap_or(self.rest.len());
            let key = constants::trim_lws(&self.rest[..key_end]);

            if key_end == self.rest.len() || self.rest[key_end] == b';' {
                // A parameter without a value.
                self.rest = self.rest.get(key_end + 1..).unwrap_or(&[]);
                continue;
            }

            let after_eq = &self.rest[key_end + 1..];
            let skip = after_eq.iter().take_while(|b| constants::is_lws(**b)).count();
            let after_eq = &after_eq[skip..];

            let (val, rest) = if after_eq.first() == Some(&b'"') {
                match memchr::memchr(b'"', &after_eq[1..]) {
                    Some(close) => {
                        let val = &after_eq[1..close + 1];
                        let rest = &after_eq[close + 2..];
                        let rest: &[u8] = match memchr::memchr(b';', rest) {
                            Some(idx) => &rest[idx + 1..],
                            None => &[][..],
                        };
                        (val, rest)
                    }
                    // Unterminated quote: take the remainder.
                    None => (&after_eq[1..], &[][..]),
                }
            } else {
                match memchr::memchr(b';', after_eq) {
                    Some(idx) => (constants::trim_lws(&after_eq[..idx]), &after_eq[idx + 1..]),
                    None => (constants::trim_lws(after_eq), &[][..]),
                }
            };

            self.rest = rest;
            return Some((key, val));
        }
    }
}
