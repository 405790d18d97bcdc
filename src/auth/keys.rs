/// EC key material for token signing
///
/// Each token kind has its own P-256 key pair. Private keys are read from PEM
/// (SEC1 `EC PRIVATE KEY` or PKCS#8 `PRIVATE KEY`); the public half is derived
/// from the private key so only one file per kind is needed.

use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::SecretKey;

use crate::error::KeyError;

/// Signing and verification halves of one P-256 key
#[derive(Clone)]
pub struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Parse a PEM encoded P-256 private key
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let secret = if pem.contains("BEGIN EC PRIVATE KEY") {
            SecretKey::from_sec1_pem(pem).map_err(|e| KeyError::Parse(e.to_string()))?
        } else {
            SecretKey::from_pkcs8_pem(pem).map_err(|e| KeyError::Parse(e.to_string()))?
        };

        let private_pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::Parse(e.to_string()))?;
        let public_pem = secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::Parse(e.to_string()))?;

        let encoding = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| KeyError::Parse(e.to_string()))?;
        let decoding = DecodingKey::from_ec_pem(public_pem.as_bytes())
            .map_err(|e| KeyError::Parse(e.to_string()))?;

        Ok(Self { encoding, decoding })
    }

    /// Read and parse a key file
    pub fn load(path: &str) -> Result<Self, KeyError> {
        let pem = std::fs::read_to_string(path).map_err(|e| KeyError::Read(path.to_string(), e))?;
        Self::from_pem(&pem)
    }
}

/// The access and refresh key pairs, immutable after startup
#[derive(Clone)]
pub struct TokenKeys {
    pub access: KeyPair,
    pub refresh: KeyPair,
}

impl TokenKeys {
    pub fn new(access: KeyPair, refresh: KeyPair) -> Self {
        Self { access, refresh }
    }

    pub fn load(access_path: &str, refresh_path: &str) -> Result<Self, KeyError> {
        Ok(Self::new(KeyPair::load(access_path)?, KeyPair::load(refresh_path)?))
    }
}
