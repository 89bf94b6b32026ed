//! Canonical key encoding
//!
//! `namespace 0x00 package 0x00 version`, UTF-8. Identity validation
//! forbids NUL inside a component, so the encoding is injective and raw byte
//! order equals (namespace, package, version) order. Changing this layout
//! invalidates every existing store file.

use artifacts_common::ArtifactId;

pub const SEPARATOR: u8 = 0;

pub fn encode_key(id: &ArtifactId) -> Vec<u8> {
    let mut key =
        Vec::with_capacity(id.namespace.len() + id.package.len() + id.version.len() + 2);
    key.extend_from_slice(id.namespace.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(id.package.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(id.version.as_bytes());
    key
}

/// Decode a stored key. The error is a human-readable reason.
pub fn decode_key(bytes: &[u8]) -> Result<ArtifactId, String> {
    let parts: Vec<&[u8]> = bytes.split(|b| *b == SEPARATOR).collect();

    let [namespace, package, version] = parts.as_slice() else {
        return Err(format!("expected 3 components, found {}", parts.len()));
    };

    let text = |part: &[u8], field: &str| {
        std::str::from_utf8(part)
            .map(str::to_string)
            .map_err(|e| format!("{} is not UTF-8: {}", field, e))
    };

    Ok(ArtifactId {
        namespace: text(*namespace, "namespace")?,
        package: text(*package, "package")?,
        version: text(*version, "version")?,
    })
}
