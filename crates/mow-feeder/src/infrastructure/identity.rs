//! The self-signed certificate shared by both servers.
//!
//! A fresh identity is generated at every start.  The WebTransport server
//! takes it as a `wtransport::Identity`; the WebSocket server gets the same
//! certificate and key as a `rustls::ServerConfig` for `tokio-rustls`.
//!
//! Browsers only accept a self-signed WebTransport certificate when they are
//! told its SHA-256 hash, so the fingerprint is logged at startup.

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use thiserror::Error;
use tracing::info;
use wtransport::tls::Sha256DigestFmt;
use wtransport::Identity;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("cannot issue a certificate for {names:?}: {reason}")]
    InvalidName { names: Vec<String>, reason: String },

    #[error("generated identity has no certificate")]
    EmptyChain,

    #[error("TLS rejected the generated certificate: {0}")]
    Tls(#[from] rustls::Error),
}

/// Certificate, key and derived TLS settings for one feeder run.
pub struct ServerIdentity {
    identity: Identity,
    tls: Arc<rustls::ServerConfig>,
    fingerprint: String,
}

impl ServerIdentity {
    /// Generates a self-signed certificate valid for `names`.
    pub fn self_signed(names: &[String]) -> Result<Self, IdentityError> {
        let identity =
            Identity::self_signed(names).map_err(|e| IdentityError::InvalidName {
                names: names.to_vec(),
                reason: e.to_string(),
            })?;

        let chain = identity.certificate_chain().as_slice();
        let leaf = chain.first().ok_or(IdentityError::EmptyChain)?;
        let fingerprint = leaf.hash().fmt(Sha256DigestFmt::DottedHex);

        let certs: Vec<CertificateDer<'static>> = chain
            .iter()
            .map(|cert| CertificateDer::from(cert.der().to_vec()))
            .collect();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            identity.private_key().secret_der().to_vec(),
        ));

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        info!("generated self-signed certificate for {names:?}");
        info!("certificate SHA-256 fingerprint: {fingerprint}");

        Ok(Self {
            identity,
            tls: Arc::new(tls),
            fingerprint,
        })
    }

    /// A copy of the identity for a WebTransport endpoint.
    pub fn webtransport_identity(&self) -> Identity {
        self.identity.clone_identity()
    }

    /// TLS settings for the WebSocket listener.
    pub fn tls_config(&self) -> Arc<rustls::ServerConfig> {
        Arc::clone(&self.tls)
    }

    /// SHA-256 of the certificate, as colon-separated hex.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
