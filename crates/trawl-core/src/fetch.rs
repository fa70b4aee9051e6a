//! The `Fetcher` trait: where raw posts come from.

use std::future::Future;

use crate::post::Post;

/// A source of posts for a topic.
///
/// Implementations return posts with `topic` populated and `identity_hash`
/// left empty; hashing happens in the run driver. Any error is treated as
/// "no posts for this topic this run" and the topic is retried next run.
pub trait Fetcher: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn fetch<'a>(
    &'a self,
    topic: &'a str,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;
}
