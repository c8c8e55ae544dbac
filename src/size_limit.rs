use crate::constants;
use std::collections::HashMap;

/// Represents size limits on the payload and its parts, to keep untrusted
/// uploads from exhausting memory.
///
/// Please refer [`Constraints`](crate::Constraints) for more info.
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub(crate) whole_stream: u64,
    pub(crate) per_field: u64,
    pub(crate) field_map: HashMap<String, u64>,
}

impl SizeLimit {
    /// Creates a default size limit which is [`u64::MAX`] for the whole
    /// payload and for each part.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets size limit for the whole payload.
    pub fn whole_stream(mut self, limit: u64) -> SizeLimit {
        self.whole_stream = limit;
        self
    }

    /// Sets size limit for the data of each part.
    pub fn per_field(mut self, limit: u64) -> SizeLimit {
        self.per_field = limit;
        self
    }

    /// Sets size limit for a specific field, it overrides the `per_field` value
    /// for this field.
    ///
    /// It is useful when you want to set a size limit on a textual field which
    /// will be stored in memory.
    pub fn for_field<N: Into<String>>(mut self, field_name: N, limit: u64) -> SizeLimit {
        self.field_map.insert(field_name.into(), limit);
        self
    }

    pub(crate) fn extract_size_limit_for(&self, field: Option<&str>) -> u64 {
        field
            .and_then(|field| self.field_map.get(field))
            .copied()
            .unwrap_or(self.per_field)
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            whole_stream: constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT,
            per_field: constants::DEFAULT_PER_FIELD_SIZE_LIMIT,
            field_map: HashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_size_limit_for() {
        let size_limit = SizeLimit::new().per_field(30).for_field("a", 10);

        assert_eq!(size_limit.extract_size_limit_for(Some("a")), 10);
        assert_eq!(size_limit.extract_size_limit_for(Some("b")), 30);
        assert_eq!(size_limit.extract_size_limit_for(None), 30);
        assert_eq!(SizeLimit::default().extract_size_limit_for(Some("a")), u64::MAX);
    }
}
