use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Digest algorithms accepted in `--hash` options and link fragments.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["md5", "sha1", "sha224", "sha256", "sha384", "sha512"];

/// Compute the SHA-256 hash of a file, returning a lowercase hex string.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    digest_file::<Sha256>(path)
}

/// Compute the SHA-256 hash of a byte slice, returning a lowercase hex string.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the digest of a file with a named algorithm.
///
/// Returns `Ok(None)` when `algorithm` is not one of [`SUPPORTED_ALGORITHMS`].
pub fn file_digest(path: &Path, algorithm: &str) -> std::io::Result<Option<String>> {
    let digest = match algorithm {
        "md5" => digest_file::<Md5>(path)?,
        "sha1" => digest_file::<Sha1>(path)?,
        "sha224" => digest_file::<Sha224>(path)?,
        "sha256" => digest_file::<Sha256>(path)?,
        "sha384" => digest_file::<Sha384>(path)?,
        "sha512" => digest_file::<Sha512>(path)?,
        _ => return Ok(None),
    };
    Ok(Some(digest))
}

fn digest_file<D: Digest>(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
