//! Object storage delivery over a pluggable client.

use crate::report::Receipt;
use crate::target::{DeliveryTarget, TransportKind};
use crate::{Transport, TransportError};
use log::debug;
use quire_types::{Artifact, CredentialsRef};

/// The surface an object store exposes: put an object under a bucket/key
/// pair with a content type. Overwrite semantics are the store's native
/// behavior, so repeated puts to the same key are safe.
pub trait ObjectStoreClient: Send + Sync {
    fn put_object(
        &self,
        credentials: &CredentialsRef,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), TransportError>;
}

/// Delivers artifacts as objects. The target address is
/// `bucket[/key-prefix]`.
pub struct ObjectStoreTransport<C: ObjectStoreClient> {
    client: C,
}

impl<C: ObjectStoreClient> ObjectStoreTransport<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

/// Split `bucket[/prefix]` into the bucket and the key under it.
fn bucket_and_key(address: &str, filename: &str) -> Result<(String, String), TransportError> {
    let trimmed = address.trim_matches('/');
    if trimmed.is_empty() {
        return Err(TransportError::Permanent(
            "object storage address is empty".into(),
        ));
    }
    match trimmed.split_once('/') {
        Some((bucket, prefix)) => Ok((bucket.to_string(), format!("{prefix}/{filename}"))),
        None => Ok((trimmed.to_string(), filename.to_string())),
    }
}

impl<C: ObjectStoreClient> Transport for ObjectStoreTransport<C> {
    fn kind(&self) -> TransportKind {
        TransportKind::ObjectStorage
    }

    fn send(
        &self,
        artifact: &Artifact,
        target: &DeliveryTarget,
    ) -> Result<Receipt, TransportError> {
        let (bucket, key) = bucket_and_key(&target.address, artifact.filename())?;
        debug!("[DISPATCH] Putting {} bytes to {bucket}/{key}", artifact.len());
        self.client.put_object(
            &target.credentials,
            &bucket,
            &key,
            artifact.content_type(),
            artifact.bytes(),
        )?;
        Ok(Receipt {
            destination: format!("{bucket}/{key}"),
            bytes: artifact.len(),
        })
    }

    fn name(&self) -> &'static str {
        "ObjectStoreTransport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RetryPolicy;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        objects: Mutex<HashMap<(String, String), (String, Vec<u8>)>>,
    }

    impl ObjectStoreClient for FakeStore {
        fn put_object(
            &self,
            _credentials: &CredentialsRef,
            bucket: &str,
            key: &str,
            content_type: &str,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            self.objects.lock().unwrap().insert(
                (bucket.to_string(), key.to_string()),
                (content_type.to_string(), bytes.to_vec()),
            );
            Ok(())
        }
    }

    fn target(address: &str) -> DeliveryTarget {
        DeliveryTarget {
            id: "archive".into(),
            transport: TransportKind::ObjectStorage,
            address: address.into(),
            credentials: CredentialsRef::new("vault/archive"),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_address_with_prefix_splits_into_bucket_and_key() {
        let transport = ObjectStoreTransport::new(FakeStore::default());
        let artifact = Artifact::new(b"rows".to_vec(), "text/csv", "may.csv");
        let receipt = transport
            .send(&artifact, &target("reports/monthly"))
            .unwrap();
        assert_eq!(receipt.destination, "reports/monthly/may.csv");
        let objects = transport.client.objects.lock().unwrap();
        let (content_type, bytes) =
            &objects[&("reports".to_string(), "monthly/may.csv".to_string())];
        assert_eq!(content_type, "text/csv");
        assert_eq!(bytes, b"rows");
    }

    #[test]
    fn test_bare_bucket_address() {
        let transport = ObjectStoreTransport::new(FakeStore::default());
        let artifact = Artifact::new(b"x".to_vec(), "text/plain", "a.txt");
        let receipt = transport.send(&artifact, &target("reports")).unwrap();
        assert_eq!(receipt.destination, "reports/a.txt");
    }

    #[test]
    fn test_empty_address_is_permanent_failure() {
        let transport = ObjectStoreTransport::new(FakeStore::default());
        let artifact = Artifact::new(b"x".to_vec(), "text/plain", "a.txt");
        let err = transport.send(&artifact, &target("/")).unwrap_err();
        assert!(!err.is_transient());
    }
}
