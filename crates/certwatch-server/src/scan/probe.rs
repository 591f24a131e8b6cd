use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

/// Metadata extracted from a host's leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedCertificate {
    /// Uppercase hex octets joined with `:`, leading zero octets stripped.
    pub serial_number: String,
    pub expires_at: DateTime<Utc>,
}

/// Everything that can go wrong during one probe. Downstream folds all
/// variants into the same "host unreachable" outcome; the split only feeds
/// log context.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("probe timed out after {0}s")]
    Cancelled(u64),
}

/// Fetch the leaf certificate of `hostname:port`.
///
/// The handshake deliberately skips chain, hostname, and expiry
/// verification: this is an inventory probe, and the endpoints worth
/// surfacing (self-signed, expired, misconfigured) are exactly the ones a
/// verifying client refuses to talk to. Re-enabling verification here would
/// silently blind the scanner to them.
///
/// `timeout_secs` bounds the TCP connect and the TLS handshake separately;
/// either phase overrunning yields [`ProbeError::Cancelled`]. Stateless
/// across calls, no side effects beyond the outbound connection.
pub async fn probe(
    hostname: &str,
    port: u16,
    timeout_secs: u64,
) -> Result<ProbedCertificate, ProbeError> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| ProbeError::Connect(format!("invalid server name: {e}")))?;

    let addr = format!("{hostname}:{port}");
    let tcp = timeout(Duration::from_secs(timeout_secs), TcpStream::connect(&addr))
        .await
        .map_err(|_| ProbeError::Cancelled(timeout_secs))?
        .map_err(|e| ProbeError::Connect(e.to_string()))?;

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tls_stream = timeout(
        Duration::from_secs(timeout_secs),
        connector.connect(server_name, tcp),
    )
    .await
    .map_err(|_| ProbeError::Cancelled(timeout_secs))?
    .map_err(|e| ProbeError::Handshake(e.to_string()))?;

    let (_, conn) = tls_stream.get_ref();
    let certs = conn
        .peer_certificates()
        .ok_or_else(|| ProbeError::Handshake("no peer certificates".to_string()))?;
    if certs.is_empty() {
        return Err(ProbeError::Handshake("empty certificate chain".to_string()));
    }

    let (_, cert) = X509Certificate::from_der(certs[0].as_ref())
        .map_err(|e| ProbeError::Handshake(format!("certificate parse error: {e}")))?;

    let expires_at = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| ProbeError::Handshake("certificate expiry out of range".to_string()))?;

    Ok(ProbedCertificate {
        serial_number: canonical_serial(cert.raw_serial()),
        expires_at,
    })
}

/// Canonical serial encoding. DER prefixes high-bit serials with a zero
/// octet; that padding is stripped so the same serial always renders the
/// same way.
fn canonical_serial(raw: &[u8]) -> String {
    let bytes = match raw.iter().position(|b| *b != 0) {
        Some(idx) => &raw[idx..],
        None => &raw[..raw.len().min(1)],
    };
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Approves every server certificate. See [`probe`] for why.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
