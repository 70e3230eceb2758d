use core::fmt;

use uuid::Uuid;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is propagated instead of replaced.
const MAX_INBOUND_LEN: usize = 128;

/// Per-request correlation id.
///
/// Generated ids are UUIDv7, so they sort by arrival time in log indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Reuse a caller-supplied id when it is short printable ASCII, otherwise
    /// mint a fresh one.
    pub fn from_inbound(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(id)
                if !id.is_empty()
                    && id.len() <= MAX_INBOUND_LEN
                    && id.bytes().all(|b| b.is_ascii_graphic()) =>
            {
                Self(id.to_string())
            }
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuid_v7() {
        let id = RequestId::generate();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn inbound_ids_are_reused_only_when_sane() {
        assert_eq!(RequestId::from_inbound(Some("abc-123")).as_str(), "abc-123");
        assert_ne!(RequestId::from_inbound(Some("has space")).as_str(), "has space");
        assert_ne!(RequestId::from_inbound(Some("")).as_str(), "");
        let long = "x".repeat(MAX_INBOUND_LEN + 1);
        assert_ne!(RequestId::from_inbound(Some(&long)).as_str(), long);
    }
}
