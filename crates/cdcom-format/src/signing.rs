// crates/cdcom-format/src/signing.rs
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use x509_cert::der::referenced::OwnedToRef;
use x509_cert::der::Decode;
use x509_cert::Certificate;

use crate::{FormatError, Result};

/// Key material for producing signed files. The certificate is stored
/// DER-encoded and embedded verbatim next to the signature.
pub struct ComponentSigner {
    key: RsaPrivateKey,
    certificate: Vec<u8>,
}

impl ComponentSigner {
    pub fn new(key: RsaPrivateKey, certificate: Vec<u8>) -> Self {
        Self { key, certificate }
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// PKCS#1 v1.5 signature over the SHA-1 digest of `data`.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha1::digest(data);
        self.key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
            .map_err(|err| FormatError::Signing(err.to_string()))
    }
}

/// Decides whether an embedded certificate chains to a trusted root.
/// Trust stores live outside this crate; readers that have none simply
/// report every signature as untrusted.
pub trait CertificateValidator {
    fn is_trusted(&self, certificate_der: &[u8]) -> bool;
}

/// Check a signature against the RSA key carried by the embedded
/// certificate. A certificate that cannot be parsed, or that holds no
/// usable RSA key, makes the signature invalid rather than the file
/// unreadable.
pub fn verify_signature(certificate_der: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let certificate = match Certificate::from_der(certificate_der) {
        Ok(certificate) => certificate,
        Err(err) => {
            tracing::warn!("cannot parse embedded certificate: {}", err);
            return false;
        }
    };

    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .owned_to_ref();
    let key = match RsaPublicKey::try_from(spki) {
        Ok(key) => key,
        Err(err) => {
            tracing::warn!("embedded certificate carries no usable RSA key: {}", err);
            return false;
        }
    };

    let digest = Sha1::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &digest, signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_key() -> RsaPrivateKey {
        let mut rng = StdRng::seed_from_u64(42);
        RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    #[test]
    fn test_sign_and_verify_with_raw_key() {
        let key = test_key();
        let signer = ComponentSigner::new(key.clone(), vec![1, 2, 3]);

        let signature = signer.sign(b"component content").unwrap();
        let digest = Sha1::digest(b"component content");
        assert!(key
            .to_public_key()
            .verify(Pkcs1v15Sign::new::<Sha1>(), &digest, &signature)
            .is_ok());

        let tampered = Sha1::digest(b"component CONTENT");
        assert!(key
            .to_public_key()
            .verify(Pkcs1v15Sign::new::<Sha1>(), &tampered, &signature)
            .is_err());
    }

    #[test]
    fn test_garbage_certificate_is_invalid_not_fatal() {
        let key = test_key();
        let signer = ComponentSigner::new(key, vec![0xDE, 0xAD]);
        let signature = signer.sign(b"data").unwrap();

        assert!(!verify_signature(signer.certificate(), b"data", &signature));
    }
}
