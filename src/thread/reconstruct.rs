//! Thread reconstruction: walk replies forward and parents backward from a
//! focal item, pulling more pages while cursors remain.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::bucket::{Bucket, ParentLookup};
use super::error::{FetchError, ReconstructError};
use super::item::{compare_ids, Cursor, Item, WalkDirection};
use super::status::{Author, Status, StatusBuilder};

/// Fetches one more page of the conversation around `focal_id`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        focal_id: &str,
        cursor: &Cursor,
        cancel: &CancellationToken,
    ) -> Result<Bucket, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReconstructConfig {
    /// Page fetches allowed per walk direction.
    pub max_pages: usize,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self { max_pages: 16 }
    }
}

/// How one direction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// No match and no unconsumed cursor left.
    Exhausted,
    /// Reached a root (backward only).
    Root,
    /// The walk's starting item was not in the bucket (backward only).
    Unlocated,
    /// A page fetch failed; the walk kept what it had.
    Truncated,
    /// Hit `max_pages`.
    PageLimit,
    /// An id repeated; the reply graph has a cycle.
    Cycle,
}

#[derive(Debug, Clone)]
struct Walk {
    items: Vec<Item>,
    end: WalkEnd,
    pages: usize,
}

/// Output of one reconstruction.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Items in walk order: ancestors, focal, replies.
    pub items: Vec<Item>,
    /// Built statuses sorted ascending by numeric id.
    pub statuses: Vec<Status>,
    pub forward_end: WalkEnd,
    pub backward_end: WalkEnd,
    pub pages_fetched: usize,
}

pub struct ThreadReconstructor<F: PageFetcher + ?Sized, B: StatusBuilder + ?Sized> {
    fetcher: Arc<F>,
    builder: Arc<B>,
    config: ReconstructConfig,
}

impl<F: PageFetcher + ?Sized, B: StatusBuilder + ?Sized> ThreadReconstructor<F, B> {
    pub fn new(fetcher: Arc<F>, builder: Arc<B>) -> Self {
        Self::with_config(fetcher, builder, ReconstructConfig::default())
    }

    pub fn with_config(fetcher: Arc<F>, builder: Arc<B>, config: ReconstructConfig) -> Self {
        Self {
            fetcher,
            builder,
            config,
        }
    }

    /// Assemble the thread around `focal_id` starting from `first_page`.
    ///
    /// Only a focal item missing from the first page is an error; page
    /// failures end their direction early and the rest is still returned.
    pub async fn reconstruct(
        &self,
        focal_id: &str,
        first_page: Bucket,
        thread_author: Option<&Author>,
        cancel: &CancellationToken,
    ) -> Result<Reconstruction, ReconstructError> {
        let focal = first_page
            .find(focal_id)
            .cloned()
            .ok_or_else(|| ReconstructError::FocalItemNotFound(focal_id.to_string()))?;

        let mut bucket = first_page;
        bucket.scope_to_author(focal.author_key.as_deref());

        let (forward, backward) = tokio::join!(
            self.walk_forward(&focal, bucket.clone(), cancel),
            self.walk_backward(&focal, bucket, cancel),
        );

        tracing::debug!(
            focal = %focal.id,
            replies = forward.items.len(),
            ancestors = backward.items.len(),
            forward_end = ?forward.end,
            backward_end = ?backward.end,
            "Thread walk finished"
        );

        let pages_fetched = forward.pages + backward.pages;
        // On a reply cycle both walks can reach the same item; keep the first.
        let mut seen = HashSet::from([focal.id.clone()]);
        let mut items: Vec<Item> = backward
            .items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();
        items.push(focal);
        items.extend(
            forward
                .items
                .into_iter()
                .filter(|item| seen.insert(item.id.clone())),
        );

        let mut statuses: Vec<Status> = join_all(
            items
                .iter()
                .map(|item| self.builder.build(item, thread_author)),
        )
        .await
        .into_iter()
        .filter_map(|outcome| outcome.into_status())
        .collect();
        statuses.sort_by(|a, b| compare_ids(&a.id, &b.id));

        Ok(Reconstruction {
            items,
            statuses,
            forward_end: forward.end,
            backward_end: backward.end,
            pages_fetched,
        })
    }

    async fn walk_forward(
        &self,
        focal: &Item,
        mut bucket: Bucket,
        cancel: &CancellationToken,
    ) -> Walk {
        let author = focal.author_key.clone();
        let mut visited: HashSet<String> = HashSet::from([focal.id.clone()]);
        let mut consumed: HashSet<String> = HashSet::new();
        let mut items = Vec::new();
        let mut pages = 0;
        let mut current = focal.id.clone();

        let end = loop {
            if let Some(next) = bucket.find_child(&current) {
                if !visited.insert(next.id.clone()) {
                    break WalkEnd::Cycle;
                }
                current = next.id.clone();
                items.push(next.clone());
                continue;
            }

            let Some(cursor) = bucket.cursor_for(WalkDirection::Forward, &consumed).cloned() else {
                break WalkEnd::Exhausted;
            };
            if pages >= self.config.max_pages {
                break WalkEnd::PageLimit;
            }
            consumed.insert(cursor.value.clone());
            pages += 1;

            match self.fetch(&focal.id, &cursor, WalkDirection::Forward, cancel).await {
                Some(page) => bucket.merge_forward(page, author.as_deref()),
                None => break WalkEnd::Truncated,
            }
        };

        Walk { items, end, pages }
    }

    async fn walk_backward(
        &self,
        focal: &Item,
        mut bucket: Bucket,
        cancel: &CancellationToken,
    ) -> Walk {
        let author = focal.author_key.clone();
        let mut visited: HashSet<String> = HashSet::from([focal.id.clone()]);
        let mut consumed: HashSet<String> = HashSet::new();
        let mut items = Vec::new();
        let mut pages = 0;
        let mut current = focal.id.clone();

        let end = loop {
            match bucket.find_parent(&current) {
                ParentLookup::Root => break WalkEnd::Root,
                ParentLookup::Unknown => {
                    tracing::warn!(id = %current, "Item vanished from bucket during backward walk");
                    break WalkEnd::Unlocated;
                }
                ParentLookup::Found(parent) => {
                    if !visited.insert(parent.id.clone()) {
                        break WalkEnd::Cycle;
                    }
                    current = parent.id.clone();
                    items.push(parent);
                }
                ParentLookup::Missing { .. } => {
                    let Some(cursor) = bucket
                        .cursor_for(WalkDirection::Backward, &consumed)
                        .cloned()
                    else {
                        break WalkEnd::Exhausted;
                    };
                    if pages >= self.config.max_pages {
                        break WalkEnd::PageLimit;
                    }
                    consumed.insert(cursor.value.clone());
                    pages += 1;

                    match self.fetch(&focal.id, &cursor, WalkDirection::Backward, cancel).await {
                        Some(page) => bucket.merge_backward(page, author.as_deref()),
                        None => break WalkEnd::Truncated,
                    }
                }
            }
        };

        items.reverse();
        Walk { items, end, pages }
    }

    async fn fetch(
        &self,
        focal_id: &str,
        cursor: &Cursor,
        direction: WalkDirection,
        cancel: &CancellationToken,
    ) -> Option<Bucket> {
        tracing::debug!(
            focal = %focal_id,
            direction = direction.as_str(),
            cursor_type = cursor.direction.as_tag(),
            "Fetching more thread items"
        );
        match self.fetcher.fetch_page(focal_id, cursor, cancel).await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!(
                    focal = %focal_id,
                    direction = direction.as_str(),
                    error = %e,
                    "Page fetch failed, truncating walk"
                );
                None
            }
        }
    }
}
