//! Signed, expiring access URLs for stored blobs.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::BlobLocator;
use crate::error::StorageError;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks signed blob URLs.
///
/// A URL carries its expiry as a unix timestamp and a hex HMAC-SHA256 over
/// the blob's bucket and key and that expiry, keyed by the signing secret.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: String,
    ttl_secs: i64,
    public_base_url: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, ttl_secs: u64, public_base_url: &str) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Signed URL for a blob, valid for the configured TTL from `now`.
    pub fn signed_url(&self, locator: &BlobLocator, now: i64) -> Result<String, StorageError> {
        let expires = now.saturating_add(self.ttl_secs);
        let signature = hex::encode(self.mac(locator, expires)?.finalize().into_bytes());

        let key_path = locator
            .key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(format!(
            "{}/api/blobs/{}/{}?expires={}&signature={}",
            self.public_base_url,
            urlencoding::encode(&locator.bucket),
            key_path,
            expires,
            signature
        ))
    }

    /// Check a presented signature and expiry against a blob.
    pub fn verify(
        &self,
        locator: &BlobLocator,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), StorageError> {
        let presented = hex::decode(signature).map_err(|_| StorageError::InvalidSignature)?;
        self.mac(locator, expires)?
            .verify_slice(&presented)
            .map_err(|_| StorageError::InvalidSignature)?;

        if now > expires {
            return Err(StorageError::Expired { expires });
        }
        Ok(())
    }

    /// MAC over the signed message, ready to finalize or verify
    fn mac(&self, locator: &BlobLocator, expires: i64) -> Result<HmacSha256, StorageError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| StorageError::InvalidSigningKey)?;
        mac.update(locator.bucket.as_bytes());
        mac.update(b"/");
        mac.update(locator.key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("dogcow", 60, "http://localhost:8080/")
    }

    fn locator() -> BlobLocator {
        BlobLocator::new("ocr-poc-flex", "input/abc_my form.pdf").unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[test]
    fn test_signed_url_shape() {
        let url = signer().signed_url(&locator(), 1_000).unwrap();

        assert!(url.starts_with(
            "http://localhost:8080/api/blobs/ocr-poc-flex/input/abc_my%20form.pdf?expires=1060&signature="
        ));
    }

    #[test]
    fn test_verify_round_trip() {
        let signer = signer();
        let url = signer.signed_url(&locator(), 1_000).unwrap();
        let signature = query_param(&url, "signature");

        assert!(signer.verify(&locator(), 1_060, signature, 1_030).is_ok());
    }

    #[test]
    fn test_verify_rejects_expired() {
        let signer = signer();
        let url = signer.signed_url(&locator(), 1_000).unwrap();
        let signature = query_param(&url, "signature");

        assert!(matches!(
            signer.verify(&locator(), 1_060, signature, 1_061),
            Err(StorageError::Expired { expires: 1_060 })
        ));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signer = signer();
        let url = signer.signed_url(&locator(), 1_000).unwrap();
        let signature = query_param(&url, "signature");

        // Extending the expiry invalidates the signature
        assert!(matches!(
            signer.verify(&locator(), 9_999, signature, 1_030),
            Err(StorageError::InvalidSignature)
        ));

        let other = BlobLocator::new("ocr-poc-flex", "input/other.pdf").unwrap();
        assert!(matches!(
            signer.verify(&other, 1_060, signature, 1_030),
            Err(StorageError::InvalidSignature)
        ));

        let other_secret = UrlSigner::new("moof", 60, "http://localhost:8080");
        assert!(other_secret
            .verify(&locator(), 1_060, signature, 1_030)
            .is_err());
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        let signer = signer();
        let url = signer.signed_url(&locator(), 1_000).unwrap();

        let mut mac = HmacSha256::new_from_slice(b"dogcow").unwrap();
        mac.update(b"ocr-poc-flex/input/abc_my form.pdf\n1060");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(query_param(&url, "signature"), expected);
    }

    #[test]
    fn test_verify_rejects_malformed_signatures() {
        let signer = signer();
        let url = signer.signed_url(&locator(), 1_000).unwrap();
        let signature = query_param(&url, "signature");

        for presented in ["", "not-hex", &signature[..signature.len() - 2]] {
            assert!(matches!(
                signer.verify(&locator(), 1_060, presented, 1_030),
                Err(StorageError::InvalidSignature)
            ));
        }
    }
}
