//! Passphrase-encrypted private key container (spec.md §3): AES-256-CBC
//! keyed off `sha256d(salt ‖ sha256(passphrase))`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use thiserror::Error;

use crate::serialization::sha256d;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum EncryptedPrivateKeyError {
    #[error("passphrase did not decrypt to a valid padded private key")]
    WrongPassphrase,
}

/// A private key ciphertext, alongside the IV and salt needed to derive the
/// AES key that decrypts it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedPrivateKey {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; 16],
    pub salt: [u8; 8],
}

impl EncryptedPrivateKey {
    /// Encrypts `private_key` under `passphrase`, generating a random salt
    /// and IV.
    pub fn encrypt(private_key: &[u8], passphrase: &str) -> EncryptedPrivateKey {
        let mut salt = [0u8; 8];
        let mut iv = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut iv);

        let key = derive_key(&salt, passphrase);
        let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(private_key);

        EncryptedPrivateKey { ciphertext, iv, salt }
    }

    /// Decrypts the container, returning the raw private-key bytes.
    pub fn decrypt(&self, passphrase: &str) -> Result<Vec<u8>, EncryptedPrivateKeyError> {
        let key = derive_key(&self.salt, passphrase);
        Aes256CbcDec::new(&key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&self.ciphertext)
            .map_err(|_| EncryptedPrivateKeyError::WrongPassphrase)
    }
}

/// `sha256d(salt ‖ sha256(passphrase))`, the AES-256 key derivation this
/// container uses.
fn derive_key(salt: &[u8; 8], passphrase: &str) -> [u8; 32] {
    let passphrase_hash = sha256d::sha256(passphrase.as_bytes());
    let mut preimage = Vec::with_capacity(salt.len() + passphrase_hash.len());
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(&passphrase_hash);
    sha256d::double_sha256(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_recovers_key() {
        let private_key = [7u8; 32];
        let container = EncryptedPrivateKey::encrypt(&private_key, "correct horse battery staple");
        let recovered = container.decrypt("correct horse battery staple").unwrap();
        assert_eq!(recovered, private_key);
    }

    #[test]
    fn wrong_passphrase_is_detected() {
        let private_key = [7u8; 32];
        let container = EncryptedPrivateKey::encrypt(&private_key, "correct horse battery staple");
        assert!(container.decrypt("wrong passphrase").is_err());
    }
}
