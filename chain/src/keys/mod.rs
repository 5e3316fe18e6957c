//! secp256k1 key pairs: signing, DER encoding, address/WIF derivation, and
//! the `"Bitcoin Signed Message:\n"` message-signing convention (spec.md
//! §3, §4.8).

mod encrypted;

pub use encrypted::EncryptedPrivateKey;

use std::io;

use chrono::{DateTime, Utc};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use crate::hash::Hash256;
use crate::parameters::NetParams;
use crate::serialization::{sha256d, BitcoinSerialize};
use crate::transparent::Address;

/// Whether a key pair's public key is carried in compressed (33-byte) or
/// uncompressed (65-byte) form. Affects address derivation and the WIF
/// encoding's trailing compression flag.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PublicKeyForm {
    Compressed,
    Uncompressed,
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid secp256k1 private key bytes")]
    InvalidPrivateKey,
    #[error("invalid secp256k1 public key bytes")]
    InvalidPublicKey,
    #[error("invalid DER signature encoding")]
    InvalidDerSignature,
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("public key recovery failed")]
    RecoveryFailed,
    #[error("malformed dumped (WIF) private key")]
    MalformedDump,
    #[error(transparent)]
    Base58Check(#[from] crate::serialization::SerializationError),
}

/// A secp256k1 key pair: an optional private scalar, its public key, and
/// the bookkeeping the wallet format needs (creation time, optional
/// passphrase-encrypted private key container).
pub struct ECKey {
    private_key: Option<SecretKey>,
    public_key: PublicKey,
    form: PublicKeyForm,
    creation_time: DateTime<Utc>,
    encrypted: Option<EncryptedPrivateKey>,
}

impl ECKey {
    /// Generates a new random key pair.
    pub fn generate(form: PublicKeyForm) -> ECKey {
        let secp = Secp256k1::new();
        let mut rng = rand::thread_rng();
        let private_key = SecretKey::new(&mut rng);
        let public_key = PublicKey::from_secret_key(&secp, &private_key);
        ECKey {
            private_key: Some(private_key),
            public_key,
            form,
            creation_time: Utc::now(),
            encrypted: None,
        }
    }

    /// Builds a key pair from a raw 32-byte private scalar.
    pub fn from_private_key_bytes(bytes: &[u8], form: PublicKeyForm) -> Result<ECKey, KeyError> {
        let secp = Secp256k1::new();
        let private_key = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let public_key = PublicKey::from_secret_key(&secp, &private_key);
        Ok(ECKey {
            private_key: Some(private_key),
            public_key,
            form,
            creation_time: Utc::now(),
            encrypted: None,
        })
    }

    /// Builds a public-key-only key "pair" (for verifying, never signing).
    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<ECKey, KeyError> {
        let public_key = PublicKey::from_slice(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        let form = if bytes.len() == 33 {
            PublicKeyForm::Compressed
        } else {
            PublicKeyForm::Uncompressed
        };
        Ok(ECKey {
            private_key: None,
            public_key,
            form,
            creation_time: Utc::now(),
            encrypted: None,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn encrypted_private_key(&self) -> Option<&EncryptedPrivateKey> {
        self.encrypted.as_ref()
    }

    pub fn set_encrypted_private_key(&mut self, encrypted: EncryptedPrivateKey) {
        self.encrypted = Some(encrypted);
    }

    /// The public key bytes, in whichever form this key pair carries.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self.form {
            PublicKeyForm::Compressed => self.public_key.serialize().to_vec(),
            PublicKeyForm::Uncompressed => self.public_key.serialize_uncompressed().to_vec(),
        }
    }

    pub fn to_address(&self) -> Address {
        use crate::transparent::ToAddress;
        self.public_key.to_address()
    }

    /// Signs `digest` (already hashed by the caller), returning a DER-ready
    /// signature in canonical low-S form.
    pub fn sign(&self, digest: Hash256) -> Result<Signature, KeyError> {
        let private_key = self.private_key.ok_or(KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let message = Message::from_digest(digest.0);
        let mut sig = secp.sign_ecdsa(&message, &private_key);
        sig.normalize_s();
        Ok(sig)
    }

    /// Signs `digest`, returning a recoverable signature: the caller can
    /// recover the signing public key from `(digest, signature)` alone.
    pub fn sign_recoverable(&self, digest: Hash256) -> Result<RecoverableSignature, KeyError> {
        let private_key = self.private_key.ok_or(KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let message = Message::from_digest(digest.0);
        Ok(secp.sign_ecdsa_recoverable(&message, &private_key))
    }

    pub fn verify(public_key: &PublicKey, digest: Hash256, signature: &Signature) -> Result<(), KeyError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(digest.0);
        secp.verify_ecdsa(&message, signature, public_key)
            .map_err(|_| KeyError::VerificationFailed)
    }

    /// Recovers the public key that produced `signature` over `digest`.
    pub fn recover_public_key(
        digest: Hash256,
        signature: &RecoverableSignature,
    ) -> Result<PublicKey, KeyError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(digest.0);
        secp.recover_ecdsa(&message, signature)
            .map_err(|_| KeyError::RecoveryFailed)
    }

    /// Forces a signature into canonical low-S form, as Bitcoin's standard
    /// relay policy requires.
    pub fn canonicalize(mut signature: Signature) -> Signature {
        signature.normalize_s();
        signature
    }

    pub fn encode_der(signature: &Signature) -> Vec<u8> {
        signature.serialize_der().to_vec()
    }

    pub fn decode_der(bytes: &[u8]) -> Result<Signature, KeyError> {
        Signature::from_der(bytes).map_err(|_| KeyError::InvalidDerSignature)
    }

    /// Encodes `(digest, recoverable signature)` into the compact 65-byte
    /// form used by `signmessage`/`verifymessage`: a header byte (27 + a
    /// recovery id in 0..=3, +4 more if the key is compressed) followed by
    /// the 64-byte `(r, s)` pair.
    pub fn encode_compact_signature(&self, signature: &RecoverableSignature) -> [u8; 65] {
        let (recovery_id, bytes) = signature.serialize_compact();
        let mut header = 27 + recovery_id.to_i32() as u8;
        if matches!(self.form, PublicKeyForm::Compressed) {
            header += 4;
        }
        let mut out = [0u8; 65];
        out[0] = header;
        out[1..].copy_from_slice(&bytes);
        out
    }

    pub fn decode_compact_signature(bytes: &[u8; 65]) -> Result<(RecoverableSignature, PublicKeyForm), KeyError> {
        let header = bytes[0];
        if !(27..=34).contains(&header) {
            return Err(KeyError::InvalidRecoveryId(header));
        }
        let mut id = header - 27;
        let form = if id >= 4 {
            id -= 4;
            PublicKeyForm::Compressed
        } else {
            PublicKeyForm::Uncompressed
        };
        let recovery_id = RecoveryId::from_i32(id as i32).map_err(|_| KeyError::InvalidRecoveryId(id))?;
        let signature = RecoverableSignature::from_compact(&bytes[1..], recovery_id)
            .map_err(|_| KeyError::InvalidDerSignature)?;
        Ok((signature, form))
    }

    /// The digest Bitcoin hashes a free-form message to before signing it:
    /// double-SHA-256 of the fixed prefix, a var-int length, then the
    /// message bytes.
    pub fn message_digest(message: &str) -> Hash256 {
        const PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";
        let mut writer = sha256d::Writer::default();
        io::Write::write_all(&mut writer, PREFIX).expect("infallible");
        crate::compactint::CompactInt::from(message.len())
            .bitcoin_serialize(&mut writer)
            .expect("infallible");
        io::Write::write_all(&mut writer, message.as_bytes()).expect("infallible");
        Hash256(writer.finish())
    }

    /// Signs a free-form message, producing the compact signature that
    /// `verifymessage`-style tooling expects.
    pub fn sign_message(&self, message: &str) -> Result<[u8; 65], KeyError> {
        let digest = Self::message_digest(message);
        let signature = self.sign_recoverable(digest)?;
        Ok(self.encode_compact_signature(&signature))
    }

    /// Verifies a compact message signature, returning the address it
    /// recovers to so the caller can compare against an expected signer.
    pub fn verify_message(message: &str, signature: &[u8; 65]) -> Result<Address, KeyError> {
        let digest = Self::message_digest(message);
        let (recoverable, form) = Self::decode_compact_signature(signature)?;
        let public_key = Self::recover_public_key(digest, &recoverable)?;
        let key = ECKey {
            private_key: None,
            public_key,
            form,
            creation_time: Utc::now(),
            encrypted: None,
        };
        Ok(key.to_address())
    }

    /// The dumped (WIF) private-key format: version byte, 32-byte scalar,
    /// an `0x01` compression flag if the public key is compressed,
    /// Base58Check-encoded.
    pub fn dump_private_key(&self) -> Result<String, KeyError> {
        let private_key = self.private_key.ok_or(KeyError::InvalidPrivateKey)?;
        let params = NetParams::get();
        let mut payload = vec![params.dumped_key_version];
        payload.extend_from_slice(&private_key.secret_bytes());
        if matches!(self.form, PublicKeyForm::Compressed) {
            payload.push(0x01);
        }
        Ok(bs58::encode(payload).with_check().into_string())
    }

    pub fn from_dumped_private_key(wif: &str) -> Result<ECKey, KeyError> {
        let params = NetParams::get();
        let bytes = bs58::decode(wif)
            .with_check(None)
            .into_vec()
            .map_err(|_| KeyError::MalformedDump)?;
        if bytes.len() < 33 || bytes[0] != params.dumped_key_version {
            return Err(KeyError::MalformedDump);
        }
        let form = match bytes.len() {
            33 => PublicKeyForm::Uncompressed,
            34 if bytes[33] == 0x01 => PublicKeyForm::Compressed,
            _ => return Err(KeyError::MalformedDump),
        };
        ECKey::from_private_key_bytes(&bytes[1..33], form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_mainnet() {
        let _ = NetParams::init(NetParams::mainnet("btcproto-test"));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let key = ECKey::generate(PublicKeyForm::Compressed);
        let digest = Hash256([3u8; 32]);
        let signature = key.sign(digest).unwrap();
        ECKey::verify(key.public_key(), digest, &signature).unwrap();
    }

    #[test]
    fn recoverable_signature_recovers_signer() {
        let key = ECKey::generate(PublicKeyForm::Compressed);
        let digest = Hash256([9u8; 32]);
        let signature = key.sign_recoverable(digest).unwrap();
        let recovered = ECKey::recover_public_key(digest, &signature).unwrap();
        assert_eq!(recovered, *key.public_key());
    }

    #[test]
    fn der_round_trips() {
        let key = ECKey::generate(PublicKeyForm::Compressed);
        let signature = key.sign(Hash256([1u8; 32])).unwrap();
        let der = ECKey::encode_der(&signature);
        let parsed = ECKey::decode_der(&der).unwrap();
        assert_eq!(parsed, signature);
    }

    #[test]
    fn wif_round_trips() {
        ensure_mainnet();
        let key = ECKey::generate(PublicKeyForm::Compressed);
        let wif = key.dump_private_key().unwrap();
        let parsed = ECKey::from_dumped_private_key(&wif).unwrap();
        assert_eq!(parsed.public_key_bytes(), key.public_key_bytes());
    }

    #[test]
    fn message_sign_and_verify_round_trip() {
        ensure_mainnet();
        let key = ECKey::generate(PublicKeyForm::Compressed);
        let signature = key.sign_message("hello bitcoin").unwrap();
        let address = ECKey::verify_message("hello bitcoin", &signature).unwrap();
        assert_eq!(address, key.to_address());
    }
}
