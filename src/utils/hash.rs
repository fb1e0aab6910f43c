use sha2::{Digest, Sha256};

/// SHA-256 十六進位摘要
pub fn content_hash(input: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(input.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("jaxon"), content_hash(b"jaxon".to_vec()));
        assert_ne!(content_hash("jaxon"), content_hash("jaxon "));
    }
}
