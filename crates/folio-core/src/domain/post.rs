use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;
use crate::error::DomainError;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Post entity - a blog article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub preview: String,
    pub cover_image: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Apply the publication flag, keeping the first publication time.
    pub fn set_published(&mut self, published: bool, now: DateTime<Utc>) {
        self.published = published;
        self.published_at = match (published, self.published_at) {
            (true, Some(at)) => Some(at),
            (true, None) => Some(now),
            (false, _) => None,
        };
    }
}

/// Editable fields of a post, as submitted by the admin editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub cover_image: Option<String>,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        let title_len = self.title.trim().chars().count();
        if !(3..=255).contains(&title_len) {
            errors.push("title must be between 3 and 255 characters");
        }
        if self.content.trim().chars().count() < 10 {
            errors.push("content must be at least 10 characters");
        }
        if let Some(cover) = self.cover_image.as_deref().filter(|c| !c.is_empty()) {
            let absolute = cover.starts_with("http://") || cover.starts_with("https://");
            if !absolute && !cover.starts_with('/') {
                errors.push("cover_image must be an http(s) URL or a site path");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors.join("; ")))
        }
    }

    /// Cover image with empty strings treated as absent.
    pub fn cover_image(&self) -> Option<String> {
        self.cover_image
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
    }
}

/// A post as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub post: Post,
    pub author: Option<UserSummary>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
}

/// Pagination and filtering for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPostsQuery {
    pub page: u64,
    pub limit: u64,
    pub published: Option<bool>,
}

impl Default for ListPostsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            published: None,
        }
    }
}

impl ListPostsQuery {
    /// Build a query from raw parameters, clamping them to valid ranges.
    pub fn new(page: Option<u64>, limit: Option<u64>, published: Option<bool>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = match limit {
            Some(0) | None => DEFAULT_PAGE_LIMIT,
            Some(l) => l.min(MAX_PAGE_LIMIT),
        };
        Self {
            page,
            limit,
            published,
        }
    }

    /// Rows to skip. Saturates for absurd pages so the database still gets
    /// a valid signed offset and simply returns an empty page.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

/// One page of a post listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage<T> {
    pub posts: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PostPage<T> {
    pub fn new(posts: Vec<T>, total_count: u64, query: &ListPostsQuery) -> Self {
        Self {
            posts,
            total_count,
            page: query.page,
            limit: query.limit,
            total_pages: total_count.div_ceil(query.limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PostPage<U> {
        PostPage {
            posts: self.posts.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, content: &str) -> PostInput {
        PostInput {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_rejects_short_title_and_content() {
        let err = input("ab", "short").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("content"));
    }

    #[test]
    fn test_validate_cover_image() {
        let mut post = input("Hello world", "Long enough content");
        post.cover_image = Some("/media/a.png".into());
        assert!(post.validate().is_ok());

        post.cover_image = Some("javascript:alert(1)".into());
        assert!(post.validate().is_err());
    }

    #[test]
    fn test_query_clamps_values() {
        let q = ListPostsQuery::new(Some(0), Some(500), None);
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_PAGE_LIMIT);

        let q = ListPostsQuery::new(Some(3), None, Some(true));
        assert_eq!(q.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let q = ListPostsQuery::new(Some(u64::MAX), Some(MAX_PAGE_LIMIT), None);
        assert_eq!(q.offset(), i64::MAX as u64);

        let q = ListPostsQuery::new(Some(u64::MAX / 2), Some(2), None);
        assert_eq!(q.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let q = ListPostsQuery::new(Some(1), Some(10), None);
        assert_eq!(PostPage::<()>::new(vec![], 21, &q).total_pages, 3);
        assert_eq!(PostPage::<()>::new(vec![], 0, &q).total_pages, 0);
    }

    #[test]
    fn test_set_published_keeps_first_publication() {
        let now = Utc::now();
        let mut post = Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: "t".into(),
            slug: "t".into(),
            content: "c".into(),
            preview: String::new(),
            cover_image: None,
            published: false,
            published_at: None,
            read_time_minutes: 1,
            created_at: now,
            updated_at: now,
        };

        post.set_published(true, now);
        let first = post.published_at;
        post.set_published(true, now + chrono::Duration::days(1));
        assert_eq!(post.published_at, first);

        post.set_published(false, now);
        assert_eq!(post.published_at, None);
    }
}
