//! Server trust evaluation for TLS connections.
//!
//! # Design
//! Trust decisions are made per host. `TrustPolicies` maps host names to a
//! `TrustPolicy`, with `"*"` as the fallback entry; hosts with no entry at all
//! keep the default webpki verification. `TrustEvaluator` plugs the map into
//! rustls as the connection's certificate verifier, so a policy returning
//! `false` aborts the handshake.
//!
//! Handshake signatures are always checked against the presented certificate,
//! whatever the policy decided about the chain itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{VerifierBuilderError, WebPkiServerVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use thiserror::Error;

/// Host key that applies to every host without an entry of its own.
pub const WILDCARD_HOST: &str = "*";

/// Errors raised while setting up trust evaluation.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("cannot build certificate verifier: {0}")]
    Verifier(#[from] VerifierBuilderError),

    #[error("unparsable certificate: {0}")]
    Certificate(#[source] rustls::Error),

    #[error("cannot build TLS configuration: {0}")]
    Config(#[source] rustls::Error),
}

/// Decides whether a certificate chain is acceptable for a host.
///
/// `chain[0]` is the server's end-entity certificate, followed by whatever
/// intermediates it sent. During a handshake `TrustEvaluator` calls
/// `evaluate_at` with the verification time rustls supplies. Stapled OCSP
/// responses are not handed to policies; only hosts without a policy pass
/// them on to the default webpki verifier.
pub trait TrustPolicy: Send + Sync + fmt::Debug {
    fn evaluate(&self, chain: &[CertificateDer<'_>], host: &str) -> bool;

    /// Evaluate as of `now`. Policies that check validity periods override
    /// this; the default ignores the time.
    fn evaluate_at(&self, chain: &[CertificateDer<'_>], host: &str, now: UnixTime) -> bool {
        let _ = now;
        self.evaluate(chain, host)
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(crypto::ring::default_provider())
}

fn system_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

fn is_name_mismatch(error: &CertificateError) -> bool {
    matches!(
        error,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

/// Chain validation against a fixed anchor set.
#[derive(Debug, Clone)]
struct ChainVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ChainVerifier {
    fn new(roots: RootCertStore) -> Result<Self, TrustError> {
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), crypto_provider())
            .build()?;
        Ok(Self { inner })
    }

    fn verify(
        &self,
        chain: &[CertificateDer<'_>],
        host: &str,
        validate_host: bool,
        now: UnixTime,
    ) -> bool {
        let Some((end_entity, intermediates)) = chain.split_first() else {
            return false;
        };
        let Ok(server_name) = ServerName::try_from(host.to_owned()) else {
            return false;
        };
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, &server_name, &[], now)
        {
            Ok(_) => true,
            Err(rustls::Error::InvalidCertificate(error))
                if !validate_host && is_name_mismatch(&error) =>
            {
                true
            }
            Err(error) => {
                tracing::debug!(host, %error, "certificate chain rejected");
                false
            }
        }
    }
}

/// Platform default trust: the chain must lead to a webpki root.
#[derive(Debug, Clone)]
pub struct SystemTrust {
    verifier: ChainVerifier,
    validate_host: bool,
}

impl SystemTrust {
    pub fn new() -> Result<Self, TrustError> {
        Self::with_roots(system_roots())
    }

    pub fn with_roots(roots: RootCertStore) -> Result<Self, TrustError> {
        Ok(Self {
            verifier: ChainVerifier::new(roots)?,
            validate_host: true,
        })
    }

    /// Whether the certificate must also be valid for the requested host.
    pub fn validate_host(mut self, validate: bool) -> Self {
        self.validate_host = validate;
        self
    }
}

impl TrustPolicy for SystemTrust {
    fn evaluate(&self, chain: &[CertificateDer<'_>], host: &str) -> bool {
        self.evaluate_at(chain, host, UnixTime::now())
    }

    fn evaluate_at(&self, chain: &[CertificateDer<'_>], host: &str, now: UnixTime) -> bool {
        self.verifier.verify(chain, host, self.validate_host, now)
    }
}

/// Accepts a chain only if it contains one of the pinned certificates.
///
/// With `accept_self_signed`, the pinned certificates also act as trust
/// anchors during default validation, so a self-signed server certificate can
/// pass as long as it is pinned.
#[derive(Debug, Clone)]
pub struct PinnedCertificates {
    certificates: Vec<CertificateDer<'static>>,
    system: ChainVerifier,
    anchored: ChainVerifier,
    accept_self_signed: bool,
    perform_default_validation: bool,
    validate_host: bool,
}

impl PinnedCertificates {
    pub fn new(
        certificates: impl IntoIterator<Item = CertificateDer<'static>>,
    ) -> Result<Self, TrustError> {
        let certificates: Vec<_> = certificates.into_iter().collect();
        let mut anchors = system_roots();
        let (_, ignored) = anchors.add_parsable_certificates(certificates.iter().cloned());
        if ignored > 0 {
            tracing::debug!(ignored, "pinned certificates unusable as trust anchors");
        }
        Ok(Self {
            certificates,
            system: ChainVerifier::new(system_roots())?,
            anchored: ChainVerifier::new(anchors)?,
            accept_self_signed: false,
            perform_default_validation: true,
            validate_host: true,
        })
    }

    pub fn accept_self_signed(mut self, accept: bool) -> Self {
        self.accept_self_signed = accept;
        self
    }

    pub fn perform_default_validation(mut self, perform: bool) -> Self {
        self.perform_default_validation = perform;
        self
    }

    pub fn validate_host(mut self, validate: bool) -> Self {
        self.validate_host = validate;
        self
    }
}

impl TrustPolicy for PinnedCertificates {
    fn evaluate(&self, chain: &[CertificateDer<'_>], host: &str) -> bool {
        self.evaluate_at(chain, host, UnixTime::now())
    }

    fn evaluate_at(&self, chain: &[CertificateDer<'_>], host: &str, now: UnixTime) -> bool {
        if self.perform_default_validation {
            let verifier = if self.accept_self_signed {
                &self.anchored
            } else {
                &self.system
            };
            if !verifier.verify(chain, host, self.validate_host, now) {
                return false;
            }
        }
        chain.iter().any(|presented| {
            self.certificates
                .iter()
                .any(|pinned| pinned.as_ref() == presented.as_ref())
        })
    }
}

/// Accepts a chain only if one of its certificates carries a pinned public key.
///
/// Keys are DER-encoded SubjectPublicKeyInfo structures, which survive
/// certificate renewal as long as the key pair is kept.
#[derive(Debug, Clone)]
pub struct PinnedPublicKeys {
    keys: Vec<Vec<u8>>,
    system: ChainVerifier,
    perform_default_validation: bool,
    validate_host: bool,
}

impl PinnedPublicKeys {
    pub fn new(keys: impl IntoIterator<Item = Vec<u8>>) -> Result<Self, TrustError> {
        Ok(Self {
            keys: keys.into_iter().collect(),
            system: ChainVerifier::new(system_roots())?,
            perform_default_validation: true,
            validate_host: true,
        })
    }

    /// Pin the public keys of the given certificates.
    pub fn from_certificates(certificates: &[CertificateDer<'_>]) -> Result<Self, TrustError> {
        let keys = certificates
            .iter()
            .map(|cert| subject_public_key(cert).map_err(TrustError::Certificate))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(keys)
    }

    pub fn perform_default_validation(mut self, perform: bool) -> Self {
        self.perform_default_validation = perform;
        self
    }

    pub fn validate_host(mut self, validate: bool) -> Self {
        self.validate_host = validate;
        self
    }
}

impl TrustPolicy for PinnedPublicKeys {
    fn evaluate(&self, chain: &[CertificateDer<'_>], host: &str) -> bool {
        self.evaluate_at(chain, host, UnixTime::now())
    }

    fn evaluate_at(&self, chain: &[CertificateDer<'_>], host: &str, now: UnixTime) -> bool {
        if self.perform_default_validation
            && !self.system.verify(chain, host, self.validate_host, now)
        {
            return false;
        }
        chain
            .iter()
            .filter_map(|cert| subject_public_key(cert).ok())
            .any(|key| self.keys.contains(&key))
    }
}

fn subject_public_key(cert: &CertificateDer<'_>) -> Result<Vec<u8>, rustls::Error> {
    let parsed = ParsedCertificate::try_from(cert)?;
    Ok(parsed.subject_public_key_info().as_ref().to_vec())
}

/// Accepts every chain. Only for development against local servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAll;

impl TrustPolicy for TrustAll {
    fn evaluate(&self, _chain: &[CertificateDer<'_>], _host: &str) -> bool {
        true
    }
}

/// Host name to trust policy map with a `"*"` fallback.
#[derive(Debug, Clone, Default)]
pub struct TrustPolicies {
    policies: HashMap<String, Arc<dyn TrustPolicy>>,
}

impl TrustPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: impl Into<String>, policy: impl TrustPolicy + 'static) -> Self {
        self.insert(host, Arc::new(policy));
        self
    }

    pub fn insert(&mut self, host: impl Into<String>, policy: Arc<dyn TrustPolicy>) {
        self.policies.insert(host.into().to_ascii_lowercase(), policy);
    }

    /// The policy for `host`: its own entry first, then the `"*"` entry.
    pub fn policy_for(&self, host: &str) -> Option<&dyn TrustPolicy> {
        self.policies
            .get(&host.to_ascii_lowercase())
            .or_else(|| self.policies.get(WILDCARD_HOST))
            .map(Arc::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// rustls certificate verifier that consults `TrustPolicies` per host.
#[derive(Debug)]
pub struct TrustEvaluator {
    policies: TrustPolicies,
    fallback: Arc<WebPkiServerVerifier>,
    provider: Arc<CryptoProvider>,
}

impl TrustEvaluator {
    pub fn new(policies: TrustPolicies) -> Result<Self, TrustError> {
        let provider = crypto_provider();
        let fallback =
            WebPkiServerVerifier::builder_with_provider(Arc::new(system_roots()), provider.clone())
                .build()?;
        Ok(Self {
            policies,
            fallback,
            provider,
        })
    }

    /// Evaluate a chain with the policy configured for `host`.
    ///
    /// Returns `None` when no policy applies and default handling takes over.
    pub fn evaluate(&self, chain: &[CertificateDer<'_>], host: &str) -> Option<bool> {
        self.evaluate_at(chain, host, UnixTime::now())
    }

    /// Like `evaluate`, as of `now`.
    pub fn evaluate_at(&self, chain: &[CertificateDer<'_>], host: &str, now: UnixTime) -> Option<bool> {
        self.policies
            .policy_for(host)
            .map(|policy| policy.evaluate_at(chain, host, now))
    }

    /// A rustls client configuration verifying servers through this evaluator.
    pub fn into_client_config(self) -> Result<rustls::ClientConfig, TrustError> {
        let provider = self.provider.clone();
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(TrustError::Config)?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(self))
            .with_no_client_auth();
        Ok(config)
    }
}

impl ServerCertVerifier for TrustEvaluator {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let host = server_name.to_str();
        let mut chain = Vec::with_capacity(intermediates.len() + 1);
        chain.push(end_entity.clone());
        chain.extend(intermediates.iter().cloned());

        match self.evaluate_at(&chain, &host, now) {
            None => self.fallback.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ),
            Some(true) => {
                tracing::debug!(host = %host, "server trust evaluation passed");
                Ok(ServerCertVerified::assertion())
            }
            Some(false) => {
                tracing::warn!(host = %host, "server trust evaluation failed");
                Err(rustls::Error::InvalidCertificate(
                    CertificateError::ApplicationVerificationFailure,
                ))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
