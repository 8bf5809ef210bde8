pub mod filesystem;

use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::host::FileStore;
use crate::model::StoredFile;

pub use filesystem::FileSystemStore;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Recomputes the SHA-256 of a stored file from its content.
pub fn hash_file(store: &dyn FileStore, file: &StoredFile) -> Result<String, StorageError> {
    Ok(sha256_hex(&store.read(file)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
