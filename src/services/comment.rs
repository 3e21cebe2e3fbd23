// src/services/comment.rs

use std::{collections::BTreeSet, sync::Arc};

use chrono::{SubsecRound, Utc};

use crate::{
    error::{CommentError, CommentResult},
    models::comment::{Comment, CommentFilter, CommentTree, NewComment},
    pagination::{select_roots, sort_roots},
    store::CommentStore,
    tree::{build_forest, build_tree},
};

/// Business logic for comment threads: creation, forest reads, search and cascading delete.
///
/// Stateless apart from the store handle; every read goes back to the store.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self { store }
    }

    /// Creates a comment, optionally as a reply to `parent_id`.
    ///
    /// Validation happens before anything is written: blank content yields `EmptyContent`,
    /// an unknown parent yields `InvalidParent`.
    pub async fn create(&self, parent_id: Option<i64>, content: &str) -> CommentResult<Comment> {
        if content.trim().is_empty() {
            return Err(CommentError::EmptyContent);
        }

        if let Some(pid) = parent_id {
            if self.store.get_by_id(pid).await?.is_none() {
                tracing::warn!("Rejected reply to missing parent comment {}", pid);
                return Err(CommentError::InvalidParent(pid));
            }
        }

        // Microsecond precision is what the databases keep.
        let created_at = Utc::now().trunc_subsecs(6);
        let comment = self
            .store
            .insert(&NewComment {
                parent_id,
                content: content.to_string(),
                created_at,
            })
            .await?;

        tracing::info!(
            "Created comment {} (parent: {:?})",
            comment.id,
            comment.parent_id
        );
        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> CommentResult<Comment> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(CommentError::NotFound(id))
    }

    /// The full thread below `id`, `id` included.
    pub async fn get_subtree(&self, id: i64) -> CommentResult<CommentTree> {
        let records = self.store.fetch_subtree(id).await?;
        let root = records
            .iter()
            .find(|c| c.id == id)
            .ok_or(CommentError::NotFound(id))?;

        Ok(build_tree(root, &records))
    }

    /// Reads one page of the forest described by `filter`.
    ///
    /// Search text takes precedence over `root_id`. Without either, roots are paged in
    /// the store and loaded together with their subtrees in one read, so a thread deleted
    /// concurrently is returned whole or not at all.
    pub async fn get_forest(&self, filter: &CommentFilter) -> CommentResult<Vec<CommentTree>> {
        let filter = filter.clone().normalized();
        tracing::debug!("Reading comment forest with {:?}", filter);

        if let Some(text) = filter.search.as_deref() {
            return self.search(text, &filter).await;
        }

        if let Some(root_id) = filter.root_id {
            return self.scoped_forest(root_id, &filter).await;
        }

        let records = self
            .store
            .fetch_forest_page(filter.sort_key, filter.order, filter.page_size, filter.offset())
            .await?;
        let mut roots: Vec<Comment> = records
            .iter()
            .filter(|c| c.parent_id.is_none())
            .cloned()
            .collect();
        sort_roots(&mut roots, filter.sort_key, filter.order);

        Ok(build_forest(&roots, &records))
    }

    /// The subtree of `root_id` as a single-entry forest.
    async fn scoped_forest(
        &self,
        root_id: i64,
        filter: &CommentFilter,
    ) -> CommentResult<Vec<CommentTree>> {
        let records = self.store.fetch_subtree(root_id).await?;
        let tops: Vec<Comment> = records.iter().filter(|c| c.id == root_id).cloned().collect();

        let selected = select_roots(
            tops,
            filter.sort_key,
            filter.order,
            filter.page,
            filter.page_size,
        );
        Ok(build_forest(&selected, &records))
    }

    /// Returns whole threads containing at least one comment that matches `text`.
    ///
    /// Every hit is resolved to its topmost ancestor. The threads of those roots are read
    /// in one statement, then the roots are ordered and paged and expanded with all of
    /// their replies, matching or not.
    pub async fn search(
        &self,
        text: &str,
        filter: &CommentFilter,
    ) -> CommentResult<Vec<CommentTree>> {
        let hits = self.store.search_by_content(text).await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut root_ids = BTreeSet::new();
        for hit in &hits {
            if hit.parent_id.is_none() {
                root_ids.insert(hit.id);
                continue;
            }
            if let Some(root_id) = self.store.find_root(hit.id).await? {
                root_ids.insert(root_id);
            }
        }

        let ids: Vec<i64> = root_ids.iter().copied().collect();
        let records = self.store.fetch_subtrees(&ids).await?;
        let roots: Vec<Comment> = records
            .iter()
            .filter(|c| c.parent_id.is_none() && root_ids.contains(&c.id))
            .cloned()
            .collect();
        let selected = select_roots(
            roots,
            filter.sort_key,
            filter.order,
            filter.page,
            filter.page_size,
        );

        tracing::debug!(
            "Search {:?} matched {} comments in {} threads",
            text,
            hits.len(),
            root_ids.len()
        );
        Ok(build_forest(&selected, &records))
    }

    /// Matching comments when `search` is given, else the subtree size of `root_id`,
    /// else the number of threads.
    pub async fn get_total_count(
        &self,
        root_id: Option<i64>,
        search: Option<&str>,
    ) -> CommentResult<i64> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.store.count(root_id, search).await
    }

    /// Deletes `id` together with every reply below it. Returns how many comments were removed.
    pub async fn delete(&self, id: i64) -> CommentResult<u64> {
        if self.store.get_by_id(id).await?.is_none() {
            return Err(CommentError::NotFound(id));
        }

        let removed = self.store.delete_subtree(id).await?;
        tracing::info!("Deleted comment {} and {} replies", id, removed.saturating_sub(1));

        Ok(removed)
    }
}
