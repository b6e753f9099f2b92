use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A comment anchored to a line of its owning symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Line offset from the owner's `begin.y`
    #[serde(rename = "l")]
    pub rel_line: i32,

    /// Hash of the anchored source line when the comment was written.
    /// Stored as a signed 64-bit integer on disk.
    #[serde(rename = "h", with = "signed_hash", default)]
    pub line_hash: u64,

    #[serde(rename = "s")]
    pub text: String,
}

impl Comment {
    pub fn new(rel_line: i32, text: impl Into<String>, source_line: &str) -> Self {
        Self {
            rel_line,
            text: text.into(),
            line_hash: line_hash(source_line),
        }
    }

    /// Whether `source_line` still hashes to the value recorded at creation.
    pub fn matches_line(&self, source_line: &str) -> bool {
        self.line_hash == line_hash(source_line)
    }
}

/// Hash of a source line, ignoring surrounding whitespace
pub fn line_hash(line: &str) -> u64 {
    let digest = Sha256::digest(line.trim().as_bytes());
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

mod signed_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(*value as i64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        i64::deserialize(deserializer).map(|value| value as u64)
    }
}
