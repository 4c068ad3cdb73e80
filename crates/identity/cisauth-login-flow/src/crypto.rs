//! Client-side credential encryption with RSA-OAEP (SHA-256).
//!
//! The identity backend publishes its public key as a base64 encoded PEM
//! document. Passwords never leave the client in plaintext: they are
//! encrypted here and decrypted only by the backend.

use crate::error::CryptoError;
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::sha2::Sha256;
use rsa::{Oaep, RsaPublicKey};

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

/// DER encoded SubjectPublicKeyInfo, decoded once at import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyMaterial {
    public_key_der: Vec<u8>,
}

impl RsaKeyMaterial {
    /// Decode a base64 wrapped PEM public key down to its DER bytes.
    pub fn from_pem_base64(pem_base64: &str) -> Result<Self, CryptoError> {
        // `base64` wraps its output at 76 columns
        let envelope: String = pem_base64.chars().filter(|c| !c.is_whitespace()).collect();
        let envelope = STANDARD
            .decode(envelope)
            .map_err(|e| CryptoError::KeyImportFailed(format!("envelope is not base64: {e}")))?;
        let pem = String::from_utf8(envelope)
            .map_err(|_| CryptoError::KeyImportFailed("envelope is not UTF-8".to_string()))?;

        let body = pem
            .trim()
            .strip_prefix(PEM_HEADER)
            .and_then(|rest| rest.strip_suffix(PEM_FOOTER))
            .ok_or_else(|| {
                CryptoError::KeyImportFailed("missing PUBLIC KEY PEM markers".to_string())
            })?;

        let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let public_key_der = STANDARD
            .decode(body)
            .map_err(|e| CryptoError::KeyImportFailed(format!("PEM body is not base64: {e}")))?;

        Ok(Self { public_key_der })
    }

    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }
}

/// Encrypt-only RSA-OAEP wrapper around an imported public key.
#[derive(Debug, Clone)]
pub struct CredentialEncryptor {
    material: RsaKeyMaterial,
    key: RsaPublicKey,
}

impl CredentialEncryptor {
    /// Import a base64 encoded PEM SubjectPublicKeyInfo.
    pub fn import_public_key(pem_base64: &str) -> Result<Self, CryptoError> {
        let material = RsaKeyMaterial::from_pem_base64(pem_base64)?;
        let key = RsaPublicKey::from_public_key_der(material.public_key_der())
            .map_err(|e| CryptoError::KeyImportFailed(e.to_string()))?;

        Ok(Self { material, key })
    }

    /// Encrypt `plaintext` and return standard base64 ciphertext.
    ///
    /// OAEP is randomized, so the same plaintext never yields the same
    /// ciphertext twice.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let ciphertext = self
            .key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(STANDARD.encode(ciphertext))
    }

    pub fn key_material(&self) -> &RsaKeyMaterial {
        &self.material
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use test_keys::{private_key, public_key_pem_base64};

    fn decrypt(ciphertext_b64: &str) -> String {
        let ciphertext = STANDARD.decode(ciphertext_b64).unwrap();
        let plaintext = private_key()
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .unwrap();
        String::from_utf8(plaintext).unwrap()
    }

    #[test]
    fn test_encrypt_round_trips_with_private_key() {
        let encryptor = CredentialEncryptor::import_public_key(&public_key_pem_base64()).unwrap();

        let ciphertext = encryptor.encrypt("S3cret!pass").unwrap();

        assert_eq!(decrypt(&ciphertext), "S3cret!pass");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let encryptor = CredentialEncryptor::import_public_key(&public_key_pem_base64()).unwrap();

        let first = encryptor.encrypt("same input").unwrap();
        let second = encryptor.encrypt("same input").unwrap();

        assert_ne!(first, second);
        assert_eq!(decrypt(&first), decrypt(&second));
    }

    #[test]
    fn test_key_material_is_der() {
        let encryptor = CredentialEncryptor::import_public_key(&public_key_pem_base64()).unwrap();
        let expected = private_key()
            .to_public_key()
            .to_public_key_der()
            .unwrap();

        assert_eq!(encryptor.key_material().public_key_der(), expected.as_bytes());
    }

    #[test]
    fn test_line_wrapped_envelope_imports() {
        let envelope = public_key_pem_base64();
        let wrapped = envelope
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(wrapped.contains('\n'));

        let single = RsaKeyMaterial::from_pem_base64(&envelope).unwrap();
        let encryptor = CredentialEncryptor::import_public_key(&format!("{wrapped}\n")).unwrap();

        assert_eq!(encryptor.key_material(), &single);
        assert_eq!(decrypt(&encryptor.encrypt("S3cret!pass").unwrap()), "S3cret!pass");
    }

    #[test]
    fn test_oversized_plaintext_fails() {
        let encryptor = CredentialEncryptor::import_public_key(&public_key_pem_base64()).unwrap();

        // 1024-bit modulus with SHA-256 OAEP fits at most 62 bytes
        let result = encryptor.encrypt(&"x".repeat(100));

        assert!(matches!(result, Err(CryptoError::EncryptionFailed(_))));
    }

    #[test]
    fn test_envelope_not_base64() {
        let result = CredentialEncryptor::import_public_key("not base64 at all!");
        assert!(matches!(result, Err(CryptoError::KeyImportFailed(_))));
    }

    #[test]
    fn test_missing_pem_markers() {
        let envelope = STANDARD.encode("MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA");
        let result = CredentialEncryptor::import_public_key(&envelope);
        assert!(matches!(result, Err(CryptoError::KeyImportFailed(_))));
    }

    #[test]
    fn test_garbage_key_body() {
        let pem = format!("{PEM_HEADER}\nAAAA\n{PEM_FOOTER}\n");
        let result = CredentialEncryptor::import_public_key(&STANDARD.encode(pem));
        assert!(matches!(result, Err(CryptoError::KeyImportFailed(_))));
    }
}
