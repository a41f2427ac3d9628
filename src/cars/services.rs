use anyhow::Context;
use bytes::Bytes;
use futures::future::try_join_all;

use crate::media::MediaStore;

/// One image file pulled out of a multipart request.
#[derive(Debug)]
pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

/// Tags arrive as one comma-separated string and are split and trimmed
/// per element. Order and duplicates are preserved, and an empty input
/// yields a single empty tag rather than no tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(|tag| tag.trim().to_string()).collect()
}

/// Turn a user query into a `%...%` ILIKE pattern, escaping the LIKE
/// metacharacters so the query is matched literally.
pub fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

/// Upload a batch concurrently and return the stored URLs in field order.
/// One failure fails the whole batch; uploads that already finished are
/// not cleaned up.
pub async fn store_images(
    media: &dyn MediaStore,
    images: Vec<ImageUpload>,
) -> anyhow::Result<Vec<String>> {
    let uploads = images
        .into_iter()
        .map(|img| async move { media.store(img.body, &img.content_type).await });
    try_join_all(uploads).await
}

/// Delete every URL concurrently. Same batch policy as `store_images`:
/// jointly awaited, no retries, no rollback of the members that finished.
pub async fn delete_images(media: &dyn MediaStore, urls: &[String]) -> anyhow::Result<()> {
    let deletions = urls.iter().map(|url| async move {
        media
            .delete(url)
            .await
            .with_context(|| format!("delete {url}"))
    });
    try_join_all(deletions).await?;
    Ok(())
}
