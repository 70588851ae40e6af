//! LFS pointer files.
//!
//! A pointer is the small text blob committed in place of large content:
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:<64 hex chars>
//! size <bytes>
//! ```

use crate::config::LfsConfig;
use crate::error::{MirrorError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static OID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("oid regex must compile"));

/// Identity of one LFS object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LfsPointer {
    pub oid: String,
    pub size: i64,
}

/// A pointer together with the git blob it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBlob {
    pub blob_id: String,
    pub pointer: LfsPointer,
}

impl LfsPointer {
    pub fn new(oid: impl Into<String>, size: i64) -> Self {
        Self {
            oid: oid.into(),
            size,
        }
    }

    /// Parse pointer text.
    ///
    /// The version line must come first; `oid` and `size` may appear in any
    /// order after it and extension lines are ignored.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(buf).map_err(|_| MirrorError::InvalidPointer {
            message: "pointer is not valid UTF-8".to_string(),
        })?;

        let mut lines = text.lines();
        if lines.next() != Some(LfsConfig::POINTER_VERSION) {
            return Err(MirrorError::InvalidPointer {
                message: "missing version line".to_string(),
            });
        }

        let mut oid = None;
        let mut size = None;
        for line in lines {
            if let Some(value) = line.strip_prefix(LfsConfig::POINTER_OID_PREFIX) {
                oid = Some(value);
            } else if let Some(value) = line.strip_prefix(LfsConfig::POINTER_SIZE_PREFIX) {
                size = Some(value);
            }
        }

        let oid = oid.ok_or_else(|| MirrorError::InvalidPointer {
            message: "missing oid line".to_string(),
        })?;
        if !Self::is_valid_oid(oid) {
            return Err(MirrorError::InvalidPointer {
                message: format!("invalid oid {:?}", oid),
            });
        }

        let size_text = size.ok_or_else(|| MirrorError::InvalidPointer {
            message: "missing size line".to_string(),
        })?;
        let size: i64 = size_text.parse().map_err(|_| MirrorError::InvalidPointer {
            message: format!("invalid size {:?}", size_text),
        })?;
        if size < 0 {
            return Err(MirrorError::InvalidPointer {
                message: format!("negative size {}", size),
            });
        }

        Ok(Self::new(oid, size))
    }

    /// The canonical pointer file content.
    pub fn to_pointer_text(&self) -> String {
        format!(
            "{}\n{}{}\n{}{}\n",
            LfsConfig::POINTER_VERSION,
            LfsConfig::POINTER_OID_PREFIX,
            self.oid,
            LfsConfig::POINTER_SIZE_PREFIX,
            self.size
        )
    }

    pub fn is_valid_oid(oid: &str) -> bool {
        OID_PATTERN.is_match(oid)
    }

    pub fn is_valid(&self) -> bool {
        Self::is_valid_oid(&self.oid) && self.size >= 0
    }

    /// Store-relative path, `aa/bb/rest-of-oid`.
    pub fn relative_path(&self) -> String {
        if self.oid.len() < 5 {
            return self.oid.clone();
        }
        format!("{}/{}/{}", &self.oid[0..2], &self.oid[2..4], &self.oid[4..])
    }
}

impl fmt::Display for LfsPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.oid, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OID: &str = "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";

    #[test]
    fn test_parse_pointer() {
        let text = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize 12345\n",
            OID
        );
        let pointer = LfsPointer::parse(text.as_bytes()).unwrap();
        assert_eq!(pointer.oid, OID);
        assert_eq!(pointer.size, 12345);
        assert_eq!(pointer.to_pointer_text(), text);
    }

    #[test]
    fn test_parse_rejects_non_pointer() {
        assert!(LfsPointer::parse(b"fn main() {}\n").is_err());
        assert!(LfsPointer::parse(b"version https://git-lfs.github.com/spec/v1\n").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_oid_and_size() {
        let short = "version https://git-lfs.github.com/spec/v1\noid sha256:abc\nsize 1\n";
        assert!(LfsPointer::parse(short.as_bytes()).is_err());

        let upper = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize 1\n",
            OID.to_uppercase()
        );
        assert!(LfsPointer::parse(upper.as_bytes()).is_err());

        let negative = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize -4\n",
            OID
        );
        assert!(LfsPointer::parse(negative.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_with_extension_lines() {
        let text = format!(
            "version https://git-lfs.github.com/spec/v1\next-0-foo sha256:{}\noid sha256:{}\nsize 7\n",
            "0".repeat(64),
            OID
        );
        let pointer = LfsPointer::parse(text.as_bytes()).unwrap();
        assert_eq!(pointer.oid, OID);
        assert_eq!(pointer.size, 7);
    }

    #[test]
    fn test_relative_path() {
        let pointer = LfsPointer::new(OID, 1);
        assert_eq!(
            pointer.relative_path(),
            format!("4d/7a/{}", &OID[4..])
        );
        assert_eq!(LfsPointer::new("abc", 1).relative_path(), "abc");
    }
}
