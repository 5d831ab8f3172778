//! Certificate stub issuer
//!
//! Produces a short-lived self-signed certificate and key for a service
//! identity. The certificates only need to parse as X.509 and carry a DNS
//! subject alternative name matching the common name; nothing chains to a
//! real CA.

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::fs_util::{self, FsError};

/// Identity a certificate is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertIdentity {
    /// Service name, second DNS label.
    pub service_name: String,
    /// Node hostname, third DNS label.
    pub hostname: String,
    /// Instance id, first DNS label.
    pub instance_id: String,
    /// DNS suffix.
    pub domain: String,
}

impl CertIdentity {
    /// `<instance_id>.<service_name>.<hostname>.<domain>`
    pub fn dns_name(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.instance_id, self.service_name, self.hostname, self.domain
        )
    }
}

/// Files written by a successful issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCert {
    /// PEM certificate.
    pub cert_path: PathBuf,
    /// PEM private key.
    pub key_path: PathBuf,
    /// Name carried in the CN and SAN.
    pub dns_name: String,
}

/// Certificate generation failures.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// rcgen could not build the key or certificate.
    #[error("key or certificate generation failed: {0}")]
    Generate(#[from] rcgen::Error),

    /// No `openssl` on `PATH`.
    #[error("openssl binary not found: {0}")]
    OpensslNotFound(#[from] which::Error),

    /// The `openssl` process could not be started.
    #[error("failed to run openssl: {0}")]
    Spawn(#[source] std::io::Error),

    /// `openssl` exited unsuccessfully.
    #[error("openssl exited with {status}: {stderr}")]
    OpensslFailed {
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed stderr output.
        stderr: String,
    },

    /// The generated files could not be written or restricted.
    #[error(transparent)]
    Write(#[from] FsError),
}

/// Something that can mint a self-signed pair for an identity.
pub trait CertIssuer {
    /// Write `<service>.crt` and `<service>.key` into `certs_dir`, both
    /// owner-only, before returning.
    fn issue(&self, identity: &CertIdentity, certs_dir: &Path) -> Result<IssuedCert, IssueError>;
}

fn output_paths(identity: &CertIdentity, certs_dir: &Path) -> (PathBuf, PathBuf) {
    (
        certs_dir.join(format!("{}.crt", identity.service_name)),
        certs_dir.join(format!("{}.key", identity.service_name)),
    )
}

/// In-process issuer backed by `rcgen` (ECDSA P-256).
#[derive(Debug, Clone)]
pub struct RcgenIssuer {
    validity: Duration,
}

impl RcgenIssuer {
    /// Certificates valid for `validity_days` from now.
    pub fn new(validity_days: u32) -> Self {
        Self {
            validity: Duration::days(i64::from(validity_days)),
        }
    }
}

impl Default for RcgenIssuer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CertIssuer for RcgenIssuer {
    fn issue(&self, identity: &CertIdentity, certs_dir: &Path) -> Result<IssuedCert, IssueError> {
        let dns_name = identity.dns_name();
        let (cert_path, key_path) = output_paths(identity, certs_dir);

        let mut params = CertificateParams::new(vec![dns_name.clone()])?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, dns_name.clone());
        params.distinguished_name = dn;
        let not_before = OffsetDateTime::now_utc();
        params.not_before = not_before;
        params.not_after = not_before + self.validity;

        let key = KeyPair::generate()?;
        let cert = params.self_signed(&key)?;

        fs_util::write_private(&key_path, key.serialize_pem())?;
        fs_util::write_private(&cert_path, cert.pem())?;
        debug!(dns_name = %dns_name, "issued rcgen certificate");

        Ok(IssuedCert {
            cert_path,
            key_path,
            dns_name,
        })
    }
}

/// Issuer that shells out to `openssl req -x509` for an RSA-2048 pair.
#[derive(Debug, Clone)]
pub struct OpensslIssuer {
    binary: Option<PathBuf>,
    validity_days: u32,
}

impl OpensslIssuer {
    /// Resolve `openssl` from `PATH` at issue time.
    pub fn new(validity_days: u32) -> Self {
        Self {
            binary: None,
            validity_days,
        }
    }

    /// Use a specific `openssl` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn binary(&self) -> Result<PathBuf, IssueError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => Ok(which::which("openssl")?),
        }
    }
}

impl CertIssuer for OpensslIssuer {
    fn issue(&self, identity: &CertIdentity, certs_dir: &Path) -> Result<IssuedCert, IssueError> {
        let dns_name = identity.dns_name();
        let (cert_path, key_path) = output_paths(identity, certs_dir);

        let output = Command::new(self.binary()?)
            .args(["req", "-x509", "-nodes", "-newkey", "rsa:2048", "-keyout"])
            .arg(&key_path)
            .arg("-out")
            .arg(&cert_path)
            .arg("-days")
            .arg(self.validity_days.to_string())
            .arg("-subj")
            .arg(format!("/CN={dns_name}"))
            .arg("-addext")
            .arg(format!("subjectAltName=DNS:{dns_name}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(IssueError::Spawn)?;

        if !output.status.success() {
            return Err(IssueError::OpensslFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        fs_util::restrict(&cert_path)?;
        fs_util::restrict(&key_path)?;
        debug!(dns_name = %dns_name, "issued openssl certificate");

        Ok(IssuedCert {
            cert_path,
            key_path,
            dns_name,
        })
    }
}
