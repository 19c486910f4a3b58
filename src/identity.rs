//! Identity fields
//!
//! `id` is an opaque global identifier (`base64("<Type>:<id>")`), while
//! `internalID` exposes the upstream id as-is.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::{GatewayError, Result};

/// Encode a global id for `type_name`
pub fn global_id(type_name: &str, id: &str) -> String {
    BASE64.encode(format!("{type_name}:{id}"))
}

/// Split a global id back into type name and internal id
pub fn from_global_id(global_id: &str) -> Result<(String, String)> {
    let bytes = BASE64
        .decode(global_id.as_bytes())
        .map_err(|e| GatewayError::InvalidGlobalId(e.to_string()))?;
    let decoded =
        String::from_utf8(bytes).map_err(|e| GatewayError::InvalidGlobalId(e.to_string()))?;
    decoded
        .split_once(':')
        .map(|(type_name, id)| (type_name.to_string(), id.to_string()))
        .ok_or_else(|| GatewayError::InvalidGlobalId(decoded.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_id_roundtrip() {
        let id = global_id("Artwork", "5d1f-ab");
        assert_eq!(
            from_global_id(&id).unwrap(),
            ("Artwork".to_string(), "5d1f-ab".to_string())
        );
    }

    #[test]
    fn test_invalid_global_id() {
        assert!(from_global_id("%%%").is_err());
        assert!(from_global_id(&BASE64.encode("no-separator")).is_err());
    }
}
