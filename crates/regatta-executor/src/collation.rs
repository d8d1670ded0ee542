use regatta_common::error::{Error, Result};

/// Worst-case UTF-8 bytes per character after folding; collation key slots
/// are reserved at this width so folded text never overruns its slot.
const UTF8_BYTES_PER_CHAR: usize = 4;

/// Text collation resolved from a field's collation tag at plan time.
/// A collation turns a string into a byte-comparable key image: two strings
/// that compare equal under the collation produce identical key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// `und:ci`: case-insensitive, language-undetermined.
    CaseInsensitive,
}

impl Collation {
    pub fn resolve(tag: &str) -> Result<Self> {
        match tag {
            "und:ci" => Ok(Collation::CaseInsensitive),
            other => Err(Error::unsupported(format!("collation: {}", other))),
        }
    }

    /// Bytes to reserve for a key of `declared` characters.
    pub fn key_length(&self, declared: usize) -> usize {
        match self {
            Collation::CaseInsensitive => declared * UTF8_BYTES_PER_CHAR,
        }
    }

    /// Write the collation key into `out`, truncating to the slot. Bytes
    /// past the key are left untouched; callers hand in zeroed slots.
    pub fn string_to_key(&self, value: &str, out: &mut [u8]) {
        match self {
            Collation::CaseInsensitive => {
                let folded = value.to_lowercase();
                let bytes = folded.as_bytes();
                let n = bytes.len().min(out.len());
                out[..n].copy_from_slice(&bytes[..n]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(Collation::resolve("und:ci").unwrap(), Collation::CaseInsensitive);
        assert!(Collation::resolve("fr_CA").is_err());
    }

    #[test]
    fn test_key_length() {
        assert_eq!(Collation::CaseInsensitive.key_length(5), 20);
    }

    #[test]
    fn test_case_fold_keys_match() {
        let collation = Collation::CaseInsensitive;
        let mut a = [0u8; 12];
        let mut b = [0u8; 12];
        collation.string_to_key("HeLLo", &mut a);
        collation.string_to_key("hello", &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_strings_distinct_keys() {
        let collation = Collation::CaseInsensitive;
        let mut a = [0u8; 12];
        let mut b = [0u8; 12];
        collation.string_to_key("alpha", &mut a);
        collation.string_to_key("beta", &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_truncates_to_slot() {
        let collation = Collation::CaseInsensitive;
        let mut out = [0u8; 3];
        collation.string_to_key("ABCDEF", &mut out);
        assert_eq!(&out, b"abc");
    }
}
