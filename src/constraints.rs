use crate::size_limit::SizeLimit;
use crate::Part;

/// Represents some rules to be applied on a decoded payload to keep untrusted
/// uploads in check.
///
/// Constraints are only enforced by the `*_with_constraints` constructors of
/// [`Multipart`](crate::Multipart); plain decoding never fails.
///
/// # Examples
///
/// ```
/// use formparts::{Constraints, Multipart, SizeLimit};
///
/// let data = "--X\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X--\r\n";
///
/// let constraints = Constraints::new()
///     .allowed_fields(vec!["my_text_field", "my_file_field"])
///     .size_limit(SizeLimit::new().whole_stream(15 * 1024 * 1024).per_field(10 * 1024 * 1024).for_field("my_text_field", 30));
///
/// let form = Multipart::with_constraints(data, "X", constraints).unwrap();
/// assert_eq!(form.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub(crate) size_limit: SizeLimit,
    pub(crate) allowed_fields: Option<Vec<String>>,
}

impl Constraints {
    /// Creates a set of rules with default behaviour.
    pub fn new() -> Constraints {
        Constraints::default()
    }

    /// Applies rules on the payload and part sizes.
    pub fn size_limit(self, size_limit: SizeLimit) -> Constraints {
        Constraints {
            size_limit,
            allowed_fields: self.allowed_fields,
        }
    }

    /// Specifies which fields are allowed. A part with any other name fails
    /// with [`Error::UnknownField`](crate::Error::UnknownField).
    pub fn allowed_fields<N: Into<String>>(self, allowed_fields: Vec<N>) -> Constraints {
        let allowed_fields = allowed_fields.into_iter().map(|item| item.into()).collect();

        Constraints {
            size_limit: self.size_limit,
            allowed_fields: Some(allowed_fields),
        }
    }

    pub(crate) fn is_it_allowed(&self, field: Option<&str>) -> bool {
        if let Some(ref allowed_fields) = self.allowed_fields {
            field
                .map(|field| allowed_fields.iter().any(|item| item == field))
                .unwrap_or(false)
        } else {
            true
        }
    }

    pub(crate) fn check_stream_size(&self, size: u64) -> crate::Result<()> {
        let limit = self.size_limit.whole_stream;

        if size > limit {
            return Err(crate::Error::StreamSizeExceeded { limit });
        }

        Ok(())
    }

    pub(crate) fn check_part(&self, part: &Part) -> crate::Result<()> {
        let field_name = Some(part.name());

        if !self.is_it_allowed(field_name) {
            return Err(crate::Error::UnknownField {
                field_name: field_name.map(|name| name.to_owned()),
            });
        }

        let limit = self.size_limit.extract_size_limit_for(field_name);
        if part.data().len() as u64 > limit {
            return Err(crate::Error::FieldSizeExceeded {
                limit,
                field_name: field_name.map(|name| name.to_owned()),
            });
        }

        Ok(())
    }
}
