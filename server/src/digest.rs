//! Content fingerprints.
//!
//! Every submission is reduced to a 128-bit MD5 digest rendered as 32
//! lowercase hex characters. Keys are prefixes of this string, so its
//! alphabet and length bound every key the server hands out.

use md5::{Digest, Md5};
use std::io::Read;

/// Length in hex characters of every digest produced here.
pub const DIGEST_HEX_LEN: usize = 32;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Digest of a URL string, taken over its raw UTF-8 bytes.
pub fn digest_str(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

/// Digest of a byte stream. Consumes the reader to EOF; callers that need
/// the bytes again must rewind it themselves.
pub fn digest_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether `s` has the shape of a full digest.
pub fn is_full_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
