//! Authenticated encryption for data and NACK datagrams (§6): a 24-byte
//! nonce prefix followed by ciphertext. The reference implementation uses
//! libsodium's `crypto_secretbox_easy` (XSalsa20-Poly1305, see
//! `examples/original_source/util/crypto.hh`); this workspace uses
//! XChaCha20-Poly1305 instead, which has the identical 24-byte extended
//! nonce and AEAD security properties but comes from a crate already
//! present in the retrieval pack's dependency surface
//! (`other_examples/manifests/TING-HiuYu-Remote-Mic`), rather than binding
//! libsodium. See DESIGN.md for the substitution rationale.

use chacha20poly1305::aead::{Aead as _, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

/// Length in bytes of the nonce prefix on every sealed datagram.
pub const NONCE_LEN: usize = 24;

/// Fixed, compiled-in key shared by the demo sender and peer binaries,
/// mirroring `crypto.hh`'s fixed `key[]` array: §1 treats the channel as
/// trusted and out of scope for key management, so there is no handshake
/// to derive one from.
pub const FIXED_DEMO_KEY: [u8; 32] = [
    0xf2, 0x5c, 0xf1, 0x3d, 0xc1, 0x4b, 0x20, 0xd8, 0x13, 0xfa, 0xa3, 0x91, 0xbc, 0x5e, 0xbc, 0x99,
    0x17, 0x79, 0xd3, 0x28, 0x7d, 0x9b, 0x95, 0x46, 0xa7, 0x42, 0x35, 0x90, 0xd5, 0x86, 0x04, 0x25,
];

/// Authenticated symmetric encryption, treated as a black box per §1's
/// scoping: the sketch and protocol logic never depend on a specific
/// cipher, only on "nonce-prefixed ciphertext in, plaintext or failure
/// out".
pub trait Aead: Send + Sync {
    /// Encrypts `plaintext`, returning `nonce || ciphertext`.
    fn seal(&self, plaintext: &[u8]) -> Vec<u8>;

    /// Decrypts `nonce || ciphertext`. Returns `None` on a too-short buffer
    /// or authentication failure.
    fn open(&self, sealed: &[u8]) -> Option<Vec<u8>>;
}

/// Fixed-key XChaCha20-Poly1305 AEAD. The reference implementation also
/// uses a fixed, compiled-in key (see `crypto.hh`); this is acceptable here
/// because quACK/Sidekick assumes a pre-shared channel (§1: "the channel is
/// assumed trusted in this replication study").
pub struct ChaChaAead {
    cipher: XChaCha20Poly1305,
}

impl ChaChaAead {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }
}

impl Aead for ChaChaAead {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .expect("XChaCha20-Poly1305 encryption does not fail for in-memory buffers");
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        out
    }

    fn open(&self, sealed: &[u8]) -> Option<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce);
        self.cipher.decrypt(nonce, ciphertext).ok()
    }
}
