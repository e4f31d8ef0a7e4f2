use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("no certificate found in {0}")]
    NoCertificate(String),
    #[error("no private key found in {0}")]
    NoPrivateKey(String),
}

/// Checks that `cert_path` holds at least one PEM certificate and `key_path` a private key.
pub fn check_identity(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| TlsError::Io { path, source }
    };

    let cert_reader = &mut BufReader::new(File::open(cert_path).map_err(io_err(cert_path))?);
    let certs = rustls_pemfile::certs(cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err(cert_path))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificate(cert_path.display().to_string()));
    }

    let key_reader = &mut BufReader::new(File::open(key_path).map_err(io_err(key_path))?);
    match rustls_pemfile::private_key(key_reader).map_err(io_err(key_path))? {
        Some(_) => Ok(()),
        None => Err(TlsError::NoPrivateKey(key_path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("focus_room_{}_{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_files() {
        let err = check_identity(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .unwrap_err();
        assert!(matches!(err, TlsError::Io { .. }));
    }

    #[test]
    fn test_file_without_certificate() {
        let cert = temp_file("empty_cert.pem", "not a pem file\n");
        let key = temp_file("empty_key.pem", "");
        let err = check_identity(&cert, &key).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificate(_)));
    }

    #[test]
    fn test_certificate_without_key() {
        let cert = temp_file(
            "only_cert.pem",
            "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
        );
        let key = temp_file("no_key.pem", "nothing here\n");
        let err = check_identity(&cert, &key).unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(_)));
    }
}
