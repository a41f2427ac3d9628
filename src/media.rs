use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::MediaConfig;

/// External binary-object host. Listings only ever hold the opaque URLs
/// this trait hands back.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload one image, returning the stable public URL to persist.
    async fn store(&self, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    /// Delete a previously stored image by the URL `store` returned.
    async fn delete(&self, url: &str) -> anyhow::Result<()>;
}

/// S3-compatible implementation (MinIO in dev).
#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket, key)
    }

    /// Recover the object key from a URL produced by `url_for`. The URL is
    /// the only reference a listing keeps, so deletes have to work backwards
    /// from it.
    fn key_from_url(&self, url: &str) -> anyhow::Result<String> {
        let marker = format!("/{}/", self.bucket);
        let start = url
            .find(&marker)
            .with_context(|| format!("url {} does not point into bucket {}", url, self.bucket))?;
        let key = &url[start + marker.len()..];
        anyhow::ensure!(!key.is_empty(), "url {} has an empty object key", url);
        Ok(key.to_string())
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn store(&self, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        let key = format!(
            "cars/{}.{}",
            Uuid::new_v4(),
            ext_from_mime(content_type).unwrap_or("bin")
        );
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}", key))?;
        Ok(self.url_for(&key))
    }

    async fn delete(&self, url: &str) -> anyhow::Result<()> {
        let key = self.key_from_url(url)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("s3 delete_object {}", key))?;
        Ok(())
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
