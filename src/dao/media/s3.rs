use std::time::Duration;

use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Builder, Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use futures::future::BoxFuture;
use tracing::debug;

use super::{
    MediaBackend, MediaRef, ObjectStore, StoredObject, build_object_key, guess_content_type,
};
use crate::{
    config::ObjectStoreConfig,
    dao::storage::{StorageError, StorageResult},
};

/// Bucket reached through the S3 API with static credentials.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3ObjectStore {
    /// Build a path-style client for an S3-compatible endpoint (region `auto`).
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "hits-bot",
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint.clone())
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        }
    }
}

impl MediaBackend for S3ObjectStore {
    fn put(
        &self,
        subdir: &str,
        filename: &str,
        body: Vec<u8>,
    ) -> BoxFuture<'static, StorageResult<MediaRef>> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = build_object_key(&self.prefix, subdir, filename);

        Box::pin(async move {
            let size = body.len();
            client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .set_content_type(guess_content_type(&key))
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|source| StorageError::unavailable(format!("put `{key}`"), source))?;
            debug!(%bucket, %key, bytes = size, "stored object");
            Ok(MediaRef::Object(key))
        })
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

impl ObjectStore for S3ObjectStore {
    fn presign_get(
        &self,
        key: &str,
        expires: Duration,
        download_filename: Option<&str>,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = key.to_owned();
        let disposition = download_filename.map(|name| format!("inline; filename=\"{name}\""));

        Box::pin(async move {
            let presigning = PresigningConfig::expires_in(expires).map_err(|source| {
                StorageError::unavailable("invalid presign expiry".into(), source)
            })?;
            let request = client
                .get_object()
                .bucket(&bucket)
                .key(&key)
                .set_response_content_disposition(disposition)
                .set_response_content_type(guess_content_type(&key));
            let presigned = request
                .presigned(presigning)
                .await
                .map_err(|source| StorageError::unavailable(format!("presign `{key}`"), source))?;
            Ok(presigned.uri().to_string())
        })
    }

    fn fetch(&self, key: &str) -> BoxFuture<'static, StorageResult<StoredObject>> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = key.to_owned();

        Box::pin(async move {
            let output = match client.get_object().bucket(&bucket).key(&key).send().await {
                Ok(output) => output,
                Err(err) => {
                    let missing = err
                        .as_service_error()
                        .is_some_and(|service| service.is_no_such_key());
                    if missing {
                        return Err(StorageError::NotFound { key });
                    }
                    return Err(StorageError::unavailable(format!("get `{key}`"), err));
                }
            };

            let content_type = output.content_type().map(str::to_owned);
            let body = output
                .body
                .collect()
                .await
                .map_err(|source| StorageError::unavailable(format!("read `{key}`"), source))?
                .into_bytes()
                .to_vec();

            Ok(StoredObject { body, content_type })
        })
    }
}
