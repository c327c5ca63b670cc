//! Secure socket support
//!
//! TLS itself runs inside the vendor stack. This module covers what the socket
//! layer has to prepare for it:
//! * the device certificate collaborator ([`CertificateStore`])
//! * the ordered TLS option set applied at creation
//! * hostname validation before it is handed to domain name verification

use crate::config::NetConfig;
use crate::stack::{SocketOption, StackResult};
use crate::{Error, Result};

/// On-device certificate catalog
pub trait CertificateStore {
    /// Make sure the device certificate material is present, installing it if
    /// needed
    fn check_or_install(&mut self) -> StackResult<()>;
}

impl<T: CertificateStore + ?Sized> CertificateStore for &mut T {
    fn check_or_install(&mut self) -> StackResult<()> {
        (**self).check_or_install()
    }
}

/// Certificates flashed at manufacturing time; nothing to install
#[derive(Debug, Clone, Copy, Default)]
pub struct PreinstalledCertificates;

impl CertificateStore for PreinstalledCertificates {
    fn check_or_install(&mut self) -> StackResult<()> {
        Ok(())
    }
}

/// Options applied to a freshly allocated secure endpoint, in order
pub fn creation_options(config: &NetConfig) -> Vec<SocketOption> {
    let mut options = Vec::with_capacity(3);
    if config.danger_disable_certificate_store {
        options.push(SocketOption::DisableCertificateStore);
    }
    options.push(SocketOption::SecureMethod(config.tls_version));
    options.push(SocketOption::TrustedRootFile(config.root_ca_file.clone()));
    options
}

/// Validate a hostname for peer certificate subject matching.
///
/// # Arguments
///
/// * `hostname` - Hostname to validate (without port)
///
/// # Returns
///
/// The hostname with any trailing dot removed
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the hostname is empty, too long, or
/// not a valid DNS name or IP address.
pub fn parse_server_name(hostname: &str) -> Result<String> {
    let hostname = hostname.trim_end_matches('.');

    if hostname.is_empty() || hostname.len() > 253 {
        return Err(Error::InvalidArgument(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    rustls_pki_types::ServerName::try_from(hostname).map_err(|_| {
        Error::InvalidArgument(format!("invalid hostname for TLS: '{}'", hostname))
    })?;

    Ok(hostname.to_string())
}
