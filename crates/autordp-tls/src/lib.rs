#![doc = include_str!("../README.md")]

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};

pub type TlsStream<S> = tokio_rustls::client::TlsStream<S>;

/// Upgrades the stream to TLS and returns it along the DER-encoded public
/// key of the server certificate.
pub async fn upgrade<S>(stream: S, server_name: &str) -> io::Result<(TlsStream<S>, Vec<u8>)>
where
    S: Unpin + AsyncRead + AsyncWrite,
{
    let mut tls_stream = {
        let mut config = tokio_rustls::rustls::client::ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(std::sync::Arc::new(danger::NoCertificateVerification))
            .with_no_client_auth();

        // Adds support for the SSLKEYLOGFILE environment variable.
        config.key_log = std::sync::Arc::new(tokio_rustls::rustls::KeyLogFile::new());

        // TLS session resumption is not supported by CredSSP:
        //
        // > The CredSSP Protocol does not extend the TLS wire protocol.
        // > TLS session resumption is not supported.
        config.resumption = tokio_rustls::rustls::client::Resumption::disabled();

        let config = std::sync::Arc::new(config);

        let server_name = server_name
            .try_into()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid server name"))?;

        tokio_rustls::TlsConnector::from(config)
            .connect(server_name, stream)
            .await?
    };

    tls_stream.flush().await?;

    let server_public_key = {
        let cert = tls_stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certificates| certificates.first())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "peer certificate is missing"))?;
        extract_tls_server_public_key(&cert.0)?
    };

    Ok((tls_stream, server_public_key))
}

fn extract_tls_server_public_key(cert: &[u8]) -> io::Result<Vec<u8>> {
    use x509_cert::der::Decode as _;

    let cert = x509_cert::Certificate::from_der(cert)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let server_public_key = cert
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "subject public key BIT STRING is not aligned"))?
        .to_owned();

    Ok(server_public_key)
}

mod danger {
    use std::time::SystemTime;

    use tokio_rustls::rustls::client::{ServerCertVerified, ServerCertVerifier};
    use tokio_rustls::rustls::{Certificate, Error, ServerName};

    /// The operator of the automation environment vouches for the target
    /// host; the chain is deliberately not validated.
    pub(super) struct NoCertificateVerification;

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &Certificate,
            _intermediates: &[Certificate],
            _server_name: &ServerName,
            _scts: &mut dyn Iterator<Item = &[u8]>,
            _ocsp_response: &[u8],
            _now: SystemTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }
    }
}
