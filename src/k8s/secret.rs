//! Secret classification (§3: "a Secret ... classified at validation time as
//! {TLS-keypair, CA-bundle, CRL, opaque-invalid}"). The cache stores the raw
//! bytes unconditionally; classification happens at lookup time here. The
//! certificate material itself is opaque to this crate — it is handed off
//! byte-for-byte to the data plane, which owns actual PEM/X.509 parsing.

use serde::{Deserialize, Serialize};

/// The Kubernetes `type` field distinguishes TLS secrets from opaque ones;
/// CA bundles and CRLs are conventionally opaque secrets with a `ca.crt` /
/// `crl.pem` data key, so classification also inspects `data`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SecretType {
	#[serde(rename = "kubernetes.io/tls")]
	Tls,
	#[serde(rename = "Opaque")]
	Opaque,
	#[serde(other)]
	Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Secret {
	#[serde(rename = "type")]
	pub secret_type: SecretType,
	/// Raw `data` map, still base64-free here (deserialization already
	/// decoded it the way `k8s-openapi`'s `ByteString` does).
	pub data: std::collections::HashMap<String, Vec<u8>>,
}

#[derive(Clone, Debug)]
pub enum SecretClass {
	TlsKeypair { cert: Vec<u8>, key: Vec<u8> },
	CaBundle { bundle: Vec<u8> },
	Crl { crl: Vec<u8> },
	OpaqueInvalid,
}

impl Secret {
	/// Classifies the secret for use as a server TLS certificate (§4.1
	/// `LookupTLSSecret`, §8 "A Secret whose tls.crt or tls.key is empty is
	/// invalid; a Secret of non-TLS type referenced as a TLS certificate is
	/// invalid").
	pub fn as_tls_keypair(&self) -> Result<(&[u8], &[u8]), String> {
		if self.secret_type != SecretType::Tls {
			return Err(format!("secret has type {:?}, want kubernetes.io/tls", self.secret_type));
		}
		let cert = self.data.get("tls.crt").map(Vec::as_slice).unwrap_or(&[]);
		let key = self.data.get("tls.key").map(Vec::as_slice).unwrap_or(&[]);
		if cert.is_empty() {
			return Err("tls.crt is empty".to_string());
		}
		if key.is_empty() {
			return Err("tls.key is empty".to_string());
		}
		Ok((cert, key))
	}

	/// Classifies the secret as a CA bundle (§4.1 `LookupCASecret`).
	/// Contour convention: either `ca.crt` (opaque secret) or, for a TLS
	/// secret reused as its own validation source, `tls.crt`.
	pub fn as_ca_bundle(&self) -> Result<&[u8], String> {
		if let Some(b) = self.data.get("ca.crt") {
			if !b.is_empty() {
				return Ok(b);
			}
		}
		if self.secret_type == SecretType::Tls {
			if let Some(b) = self.data.get("tls.crt") {
				if !b.is_empty() {
					return Ok(b);
				}
			}
		}
		Err("secret has no non-empty ca.crt (or tls.crt) entry".to_string())
	}

	/// Classifies the secret as a CRL (§4.1 `LookupCRLSecret`).
	pub fn as_crl(&self) -> Result<&[u8], String> {
		match self.data.get("crl.pem").filter(|b| !b.is_empty()) {
			Some(b) => Ok(b),
			None => Err("secret has no non-empty crl.pem entry".to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn tls_secret(cert: &str, key: &str) -> Secret {
		let mut data = HashMap::new();
		data.insert("tls.crt".to_string(), cert.as_bytes().to_vec());
		data.insert("tls.key".to_string(), key.as_bytes().to_vec());
		Secret {
			secret_type: SecretType::Tls,
			data,
		}
	}

	#[test]
	fn valid_tls_keypair() {
		let s = tls_secret("cert-bytes", "key-bytes");
		assert!(s.as_tls_keypair().is_ok());
	}

	#[test]
	fn empty_cert_is_invalid() {
		let s = tls_secret("", "key-bytes");
		assert!(s.as_tls_keypair().is_err());
	}

	#[test]
	fn empty_key_is_invalid() {
		let s = tls_secret("cert-bytes", "");
		assert!(s.as_tls_keypair().is_err());
	}

	#[test]
	fn opaque_secret_is_not_a_tls_keypair() {
		let mut data = HashMap::new();
		data.insert("tls.crt".to_string(), b"cert".to_vec());
		data.insert("tls.key".to_string(), b"key".to_vec());
		let s = Secret {
			secret_type: SecretType::Opaque,
			data,
		};
		assert!(s.as_tls_keypair().is_err());
	}

	#[test]
	fn ca_bundle_from_opaque() {
		let mut data = HashMap::new();
		data.insert("ca.crt".to_string(), b"ca-bytes".to_vec());
		let s = Secret {
			secret_type: SecretType::Opaque,
			data,
		};
		assert!(s.as_ca_bundle().is_ok());
	}
}
