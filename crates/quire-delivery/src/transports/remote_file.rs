//! Remote file transfer over a pluggable client.

use crate::report::Receipt;
use crate::target::{DeliveryTarget, TransportKind};
use crate::{Transport, TransportError};
use log::debug;
use quire_types::{Artifact, CredentialsRef};

/// The minimal surface a remote file host exposes: authenticate, then put
/// bytes at a path. Implemented over a real protocol client in deployment
/// and over a local directory or mock in tests.
pub trait FileTransferClient: Send + Sync {
    /// Upload `bytes` to `path`, overwriting any existing file.
    fn put(
        &self,
        credentials: &CredentialsRef,
        path: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError>;
}

/// Delivers artifacts to a remote filesystem directory.
pub struct RemoteFileTransport<C: FileTransferClient> {
    client: C,
}

impl<C: FileTransferClient> RemoteFileTransport<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: FileTransferClient> Transport for RemoteFileTransport<C> {
    fn kind(&self) -> TransportKind {
        TransportKind::RemoteFileTransfer
    }

    fn send(
        &self,
        artifact: &Artifact,
        target: &DeliveryTarget,
    ) -> Result<Receipt, TransportError> {
        let destination = target.destination_for(artifact);
        debug!("[DISPATCH] Uploading {} bytes to {destination}", artifact.len());
        self.client
            .put(&target.credentials, &destination, artifact.bytes())?;
        Ok(Receipt {
            destination,
            bytes: artifact.len(),
        })
    }

    fn name(&self) -> &'static str {
        "RemoteFileTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RetryPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Writes into a local directory, treating the target address as a
    /// subdirectory of the root.
    struct DirClient {
        root: PathBuf,
    }

    impl FileTransferClient for DirClient {
        fn put(
            &self,
            _credentials: &CredentialsRef,
            path: &str,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            let full = self.root.join(path.trim_start_matches('/'));
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TransportError::Transient(e.to_string()))?;
            }
            std::fs::write(&full, bytes).map_err(|e| TransportError::Transient(e.to_string()))
        }
    }

    /// Records every put and fails the first `fail_first` of them.
    #[derive(Default)]
    struct RecordingClient {
        puts: Mutex<HashMap<String, Vec<u8>>>,
        fail_first: Mutex<u32>,
    }

    impl FileTransferClient for RecordingClient {
        fn put(
            &self,
            _credentials: &CredentialsRef,
            path: &str,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            let mut remaining = self.fail_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Transient("connection dropped".into()));
            }
            self.puts
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }
    }

    fn target(address: &str) -> DeliveryTarget {
        DeliveryTarget {
            id: "remote".into(),
            transport: TransportKind::RemoteFileTransfer,
            address: address.into(),
            credentials: CredentialsRef::new("vault/remote"),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_put_reaches_client_with_destination_path() {
        let transport = RemoteFileTransport::new(RecordingClient::default());
        let artifact = Artifact::new(b"report body".to_vec(), "text/plain", "april.txt");
        let receipt = transport
            .send(&artifact, &target("/srv/reports/"))
            .unwrap();
        assert_eq!(receipt.destination, "/srv/reports/april.txt");
        assert_eq!(
            transport.client.puts.lock().unwrap()["/srv/reports/april.txt"],
            b"report body"
        );
    }

    #[test]
    fn test_client_error_surfaces_unchanged() {
        let client = RecordingClient::default();
        *client.fail_first.lock().unwrap() = 1;
        let transport = RemoteFileTransport::new(client);
        let artifact = Artifact::new(b"x".to_vec(), "text/plain", "a.txt");
        let err = transport.send(&artifact, &target("/srv")).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_directory_client_writes_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RemoteFileTransport::new(DirClient {
            root: dir.path().to_path_buf(),
        });
        let artifact = Artifact::new(b"on disk".to_vec(), "text/plain", "out.txt");
        transport.send(&artifact, &target("drop/inbox")).unwrap();
        let written = std::fs::read(dir.path().join("drop/inbox/out.txt")).unwrap();
        assert_eq!(written, b"on disk");
    }
}
