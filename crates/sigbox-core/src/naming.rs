//! Naming conventions for containers and their signature entries.
//!
//! # Layout
//!
//! ```text
//! {containers_dir}/{name}.zip            # one container
//!   <payload files>                      # arbitrary relative paths
//!   META-INF/manifest{N}.tlv             # manifest for sequence N
//!   META-INF/signature{N}.ksi            # signature token for sequence N
//! ```
//!
//! Manifest and signature entries are paired by the sequence number parsed
//! out of the file name, never by rewriting one path into the other.

/// Directory inside a container reserved for manifests and signatures.
pub const META_INF: &str = "META-INF";

pub const MANIFEST_STEM: &str = "manifest";
pub const MANIFEST_EXTENSION: &str = "tlv";
pub const SIGNATURE_STEM: &str = "signature";
pub const SIGNATURE_EXTENSION: &str = "ksi";

/// Container file extension.
pub const CONTAINER_EXTENSION: &str = "zip";

/// A recognised entry under `META-INF/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaEntry {
    Manifest(u32),
    Signature(u32),
}

impl MetaEntry {
    pub fn sequence(self) -> u32 {
        match self {
            Self::Manifest(n) | Self::Signature(n) => n,
        }
    }
}

/// `META-INF/manifest{N}.tlv`
pub fn manifest_path(sequence: u32) -> String {
    format!("{META_INF}/{MANIFEST_STEM}{sequence}.{MANIFEST_EXTENSION}")
}

/// `META-INF/signature{N}.ksi`
pub fn signature_path(sequence: u32) -> String {
    format!("{META_INF}/{SIGNATURE_STEM}{sequence}.{SIGNATURE_EXTENSION}")
}

/// Whether an archive path lives in the reserved `META-INF` directory.
pub fn is_meta_path(path: &str) -> bool {
    path == META_INF
        || path
            .strip_prefix(META_INF)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Parse a manifest or signature path into its kind and sequence number.
///
/// Only direct children of `META-INF` with the exact `{stem}{N}.{ext}`
/// shape match. `N` is a positive decimal without leading zeros so that
/// [`manifest_path`]/[`signature_path`] reproduce the parsed name.
pub fn parse_meta_entry(path: &str) -> Option<MetaEntry> {
    let file_name = path.strip_prefix(META_INF)?.strip_prefix('/')?;
    if file_name.contains('/') {
        return None;
    }

    if let Some(n) = parse_numbered(file_name, MANIFEST_STEM, MANIFEST_EXTENSION) {
        return Some(MetaEntry::Manifest(n));
    }
    parse_numbered(file_name, SIGNATURE_STEM, SIGNATURE_EXTENSION).map(MetaEntry::Signature)
}

fn parse_numbered(file_name: &str, stem: &str, extension: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(stem)?
        .strip_suffix(extension)?
        .strip_suffix('.')?;

    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

/// Next free sequence number: one past the highest manifest or signature.
///
/// `None` once `u32::MAX` is taken.
pub fn next_sequence<'a>(paths: impl IntoIterator<Item = &'a str>) -> Option<u32> {
    paths
        .into_iter()
        .filter_map(parse_meta_entry)
        .map(MetaEntry::sequence)
        .max()
        .unwrap_or(0)
        .checked_add(1)
}

/// Filesystem noise that never belongs in a container or a listing.
pub fn is_noise(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name == ".DS_Store" || file_name.starts_with("._")
}

/// `{name}.zip`
pub fn container_file_name(name: &str) -> String {
    format!("{name}.{CONTAINER_EXTENSION}")
}

/// Extract the container name from a file name in the store directory.
pub fn parse_container_file_name(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') || is_noise(file_name) {
        return None;
    }
    file_name
        .strip_suffix(CONTAINER_EXTENSION)?
        .strip_suffix('.')
        .filter(|name| !name.is_empty())
}

/// Check that a container name can be used as a file name in the store.
///
/// Returns a user-facing reason on rejection.
pub fn check_container_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("container name must not be empty".to_string());
    }
    if name.starts_with('.') {
        return Err(format!("container name must not start with '.': {name}"));
    }
    if name.contains(['/', '\\']) {
        return Err(format!(
            "container name must not contain path separators: {name}"
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("container name must not contain control characters".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_paths() {
        assert_eq!(manifest_path(1), "META-INF/manifest1.tlv");
        assert_eq!(signature_path(12), "META-INF/signature12.ksi");
    }

    #[test]
    fn test_parse_meta_entry() {
        assert_eq!(
            parse_meta_entry("META-INF/manifest3.tlv"),
            Some(MetaEntry::Manifest(3))
        );
        assert_eq!(
            parse_meta_entry("META-INF/signature10.ksi"),
            Some(MetaEntry::Signature(10))
        );
    }

    #[test]
    fn test_parse_meta_entry_rejects_lookalikes() {
        for path in [
            "manifest1.tlv",
            "META-INF/manifest.tlv",
            "META-INF/manifest01.tlv",
            "META-INF/manifest1.ksi",
            "META-INF/signature1.tlv",
            "META-INF/signature1.ksi.bak",
            "META-INF/sub/signature1.ksi",
            "docs/META-INF/signature1.ksi",
            "META-INF/signature-1.ksi",
            "META-INF/signature1x.ksi",
            "META-INFO/signature1.ksi",
        ] {
            assert_eq!(parse_meta_entry(path), None, "{path}");
        }
    }

    #[test]
    fn test_pairing_survives_hostile_directory_names() {
        // A data file whose path contains both stems must not be mistaken for
        // a signature, and a signature's manifest is derived from its number.
        assert_eq!(parse_meta_entry("signature/manifest1.ksi"), None);
        let entry = parse_meta_entry("META-INF/signature7.ksi").unwrap();
        assert_eq!(manifest_path(entry.sequence()), "META-INF/manifest7.tlv");
    }

    #[test]
    fn test_next_sequence() {
        assert_eq!(next_sequence(["a.txt", "b/c.txt"]), Some(1));
        assert_eq!(
            next_sequence([
                "a.txt",
                "META-INF/manifest1.tlv",
                "META-INF/signature1.ksi",
                "META-INF/manifest3.tlv",
                "META-INF/signature3.ksi",
            ]),
            Some(4)
        );
        // Orphan signatures are never reused.
        assert_eq!(next_sequence(["META-INF/signature5.ksi"]), Some(6));
    }

    #[test]
    fn test_next_sequence_exhausted() {
        assert_eq!(next_sequence(["META-INF/signature4294967295.ksi"]), None);
        assert_eq!(next_sequence(["META-INF/manifest4294967295.tlv"]), None);
        assert_eq!(
            next_sequence(["META-INF/manifest4294967294.tlv"]),
            Some(u32::MAX)
        );
    }

    #[test]
    fn test_is_meta_path() {
        assert!(is_meta_path("META-INF/manifest1.tlv"));
        assert!(is_meta_path("META-INF"));
        assert!(!is_meta_path("META-INFO/x"));
        assert!(!is_meta_path("docs/META-INF/x"));
    }

    #[test]
    fn test_noise() {
        assert!(is_noise(".DS_Store"));
        assert!(is_noise("sub/.DS_Store"));
        assert!(is_noise("sub/._a.txt"));
        assert!(!is_noise("a.txt"));
    }

    #[test]
    fn test_container_file_names() {
        assert_eq!(container_file_name("konteiner"), "konteiner.zip");
        assert_eq!(parse_container_file_name("konteiner.zip"), Some("konteiner"));
        assert_eq!(parse_container_file_name("a.b.zip"), Some("a.b"));
        assert_eq!(parse_container_file_name(".zip"), None);
        assert_eq!(parse_container_file_name(".DS_Store"), None);
        assert_eq!(parse_container_file_name(".tmpAbC123"), None);
        assert_eq!(parse_container_file_name("notes.txt"), None);
    }

    #[test]
    fn test_check_container_name() {
        assert!(check_container_name("box").is_ok());
        assert!(check_container_name("box 2024.v1").is_ok());
        assert!(check_container_name("").is_err());
        assert!(check_container_name("../etc").is_err());
        assert!(check_container_name("a/b").is_err());
        assert!(check_container_name("a\\b").is_err());
        assert!(check_container_name(".hidden").is_err());
        assert!(check_container_name("bad\nname").is_err());
    }
}
