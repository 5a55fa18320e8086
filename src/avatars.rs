//! Avatar blob store. Accounts persist a reference (object key or absolute
//! URL); this module turns the reference into the URL served to clients and
//! releases objects the account no longer points at.

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};

use crate::config::AvatarConfig;

#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Absolute URL for a stored object key.
    async fn resolve_url(&self, key: &str) -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// References that are already absolute URLs are passed through on resolve
/// and never deleted from the bucket.
pub fn is_stored_key(reference: &str) -> bool {
    !reference.starts_with("http://") && !reference.starts_with("https://")
}

/// Resolve an account's avatar reference to the URL returned in profiles.
pub async fn avatar_url(
    store: &dyn AvatarStore,
    config: &AvatarConfig,
    avatar: Option<&str>,
) -> anyhow::Result<String> {
    match avatar {
        None => Ok(config.default_avatar_url.clone()),
        Some(reference) if !is_stored_key(reference) => Ok(reference.to_string()),
        Some(key) => store.resolve_url(key).await,
    }
}

pub struct S3AvatarStore {
    client: Client,
    bucket: String,
    presign_ttl_seconds: u64,
}

impl S3AvatarStore {
    pub async fn new(config: &AvatarConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: config.bucket.clone(),
            presign_ttl_seconds: config.presign_ttl_seconds,
        })
    }
}

#[async_trait]
impl AvatarStore for S3AvatarStore {
    async fn resolve_url(&self, key: &str) -> anyhow::Result<String> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(self.presign_ttl_seconds),
            )?)
            .await
            .context("s3 presign avatar")?;
        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete avatar")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls_are_not_stored_keys() {
        assert!(!is_stored_key("https://cdn.example.com/a.png"));
        assert!(!is_stored_key("http://cdn.example.com/a.png"));
        assert!(is_stored_key("avatars/42.png"));
    }
}
