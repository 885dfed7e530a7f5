use crate::config::{HashAlgorithm, HashSize, SerialSize};
use sha2::{Digest, Sha256};

/// A derived identity key, ready for a sink. Which variant comes out is
/// fixed by the configured algorithm and width, so equal inputs always
/// produce bit-identical values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Text(String),
    Bytea(Vec<u8>),
    BigInt(i64),
    Int(i32),
    SmallInt(i16),
}

impl KeyValue {
    /// Text rendering used by the CSV sink and SQL literals. Binary keys
    /// keep the escape-string bytea form so equal inputs stay
    /// byte-for-byte comparable across sinks.
    pub fn as_pg_literal(&self) -> String {
        match self {
            KeyValue::Text(s) => s.clone(),
            KeyValue::Bytea(b) => format!("E'\\\\x{}'", hex_lower(b)),
            KeyValue::BigInt(v) => v.to_string(),
            KeyValue::Int(v) => v.to_string(),
            KeyValue::SmallInt(v) => v.to_string(),
        }
    }
}

/// Digests identity-key strings into their storage representation.
///
/// The digest instance is stateful and reused across calls, reset after
/// each one. Not safe to share across threads; each worker owns one.
#[derive(Debug)]
pub struct KeyDeriver {
    algorithm: HashAlgorithm,
    size: HashSize,
    digest: Sha256,
}

impl KeyDeriver {
    pub fn new(algorithm: HashAlgorithm, size: HashSize) -> Self {
        Self {
            algorithm,
            size,
            digest: Sha256::new(),
        }
    }

    pub fn hash_key(&mut self, key: &str) -> KeyValue {
        match self.algorithm {
            HashAlgorithm::Debug => KeyValue::Text(key.to_string()),
            HashAlgorithm::Sha256 => {
                self.digest.update(key.as_bytes());
                let out = self.digest.finalize_reset();
                match self.size {
                    HashSize::Native => KeyValue::Bytea(out.to_vec()),
                    HashSize::Bit64 => KeyValue::BigInt(abs_narrow_i64(&out)),
                    HashSize::Bit32 => KeyValue::Int(abs_narrow_i32(&out)),
                }
            }
        }
    }
}

/// Serial-key ordinal in its configured width.
pub fn serial_value(ordinal: u32, size: SerialSize) -> KeyValue {
    match size {
        SerialSize::Int => KeyValue::Int(ordinal as i32),
        SerialSize::SmallInt => KeyValue::SmallInt(ordinal as i16),
    }
}

/// Stable unsigned digest of a string, independent of any deriver
/// configuration. Used where a numeric document identity is needed.
pub fn digest_u64(s: &str) -> u64 {
    let out = Sha256::digest(s.as_bytes());
    narrow_u64(&abs_magnitude(&out))
}

/// Digest bytes interpreted as a signed big-endian integer, absolute
/// value taken, then narrowed to the low 64 bits.
pub fn abs_narrow_i64(bytes: &[u8]) -> i64 {
    narrow_u64(&abs_magnitude(bytes)) as i64
}

pub fn abs_narrow_i32(bytes: &[u8]) -> i32 {
    abs_narrow_i64(bytes) as i32
}

fn abs_magnitude(bytes: &[u8]) -> Vec<u8> {
    if bytes.first().map_or(true, |b| b & 0x80 == 0) {
        return bytes.to_vec();
    }
    let mut out: Vec<u8> = bytes.iter().map(|b| !b).collect();
    for byte in out.iter_mut().rev() {
        let (v, carry) = byte.overflowing_add(1);
        *byte = v;
        if !carry {
            break;
        }
    }
    out
}

fn narrow_u64(magnitude: &[u8]) -> u64 {
    let start = magnitude.len().saturating_sub(8);
    magnitude[start..]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

pub fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_passes_keys_through() {
        let mut deriver = KeyDeriver::new(HashAlgorithm::Debug, HashSize::Native);
        assert_eq!(
            deriver.hash_key("doc1/root/item[2]"),
            KeyValue::Text("doc1/root/item[2]".to_string())
        );
    }

    #[test]
    fn hashing_is_deterministic_across_calls_and_instances() {
        let mut a = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Native);
        let mut b = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Native);
        let first = a.hash_key("doc1/root");
        // interleave another digest to prove the reset is complete
        let _ = a.hash_key("doc1/other");
        assert_eq!(first, a.hash_key("doc1/root"));
        assert_eq!(first, b.hash_key("doc1/root"));
    }

    #[test]
    fn different_inputs_produce_different_keys() {
        let mut deriver = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Bit64);
        assert_ne!(deriver.hash_key("doc1/root/a"), deriver.hash_key("doc1/root/b"));
    }

    #[test]
    fn widths_narrow_the_same_digest() {
        let mut native = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Native);
        let mut wide = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Bit64);
        let mut narrow = KeyDeriver::new(HashAlgorithm::Sha256, HashSize::Bit32);
        let bytes = match native.hash_key("k") {
            KeyValue::Bytea(b) => b,
            other => panic!("expected bytea, got {other:?}"),
        };
        assert_eq!(wide.hash_key("k"), KeyValue::BigInt(abs_narrow_i64(&bytes)));
        assert_eq!(narrow.hash_key("k"), KeyValue::Int(abs_narrow_i32(&bytes)));
    }

    #[test]
    fn bytea_literal_is_escape_string_form() {
        let kv = KeyValue::Bytea(vec![0xde, 0xad]);
        assert_eq!(kv.as_pg_literal(), "E'\\\\xdead'");
    }

    #[test]
    fn serial_sizes() {
        assert_eq!(serial_value(3, SerialSize::Int), KeyValue::Int(3));
        assert_eq!(serial_value(3, SerialSize::SmallInt), KeyValue::SmallInt(3));
    }

    #[test]
    fn abs_magnitude_negates_twos_complement() {
        // 0xff = -1 as a signed byte; magnitude 1
        assert_eq!(abs_magnitude(&[0xff]), vec![0x01]);
        assert_eq!(abs_magnitude(&[0x7f]), vec![0x7f]);
    }
}
