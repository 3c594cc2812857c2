//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use folio_core::domain::{
    Comment, CommentInput, CommentNode, Contacts, LikeStatus, ListPostsQuery, MediaFile, Post,
    PostPage, PostView, Profile, User, UserSummary,
};

/// The signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time_minutes: i32,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        let PostView {
            post,
            author,
            likes_count,
            comments_count,
            is_liked,
        } = view;
        Self {
            author,
            likes_count,
            comments_count,
            is_liked,
            ..Self::from(post)
        }
    }
}

/// A bare post, as returned by admin writes.
impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            preview: post.preview,
            cover_image: post.cover_image,
            author_id: post.author_id,
            author: None,
            published: post.published,
            published_at: post.published_at,
            read_time_minutes: post.read_time_minutes,
            likes_count: 0,
            comments_count: 0,
            is_liked: false,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total_count: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl From<PostPage<PostView>> for PostListResponse {
    fn from(page: PostPage<PostView>) -> Self {
        let page = page.map(PostResponse::from);
        Self {
            posts: page.posts,
            total_count: page.total_count,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

/// `GET /api/v1/posts` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub published: Option<bool>,
}

impl From<ListPostsParams> for ListPostsQuery {
    fn from(params: ListPostsParams) -> Self {
        ListPostsQuery::new(params.page, params.limit, params.published)
    }
}

/// A comment and its replies. Deleted comments keep their place in the
/// thread with the content removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
    pub likes_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub replies: Vec<CommentResponse>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        let content = if comment.is_deleted() {
            String::new()
        } else {
            comment.content
        };
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            content,
            author: None,
            likes_count: 0,
            is_liked: false,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            deleted_at: comment.deleted_at,
            replies: Vec::new(),
        }
    }
}

impl From<CommentNode> for CommentResponse {
    fn from(node: CommentNode) -> Self {
        Self {
            author: node.author,
            likes_count: node.likes_count,
            is_liked: node.is_liked,
            replies: node.replies.into_iter().map(Self::from).collect(),
            ..Self::from(node.comment)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThreadResponse {
    pub comments: Vec<CommentResponse>,
    /// Every comment in the thread, replies included.
    pub total: usize,
}

impl From<Vec<CommentNode>> for CommentThreadResponse {
    fn from(nodes: Vec<CommentNode>) -> Self {
        let total = nodes.iter().map(CommentNode::len).sum();
        Self {
            comments: nodes.into_iter().map(CommentResponse::from).collect(),
            total,
        }
    }
}

/// Body of `PUT /api/v1/comments/{id}`. Replies cannot be moved.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

impl From<UpdateCommentRequest> for CommentInput {
    fn from(request: UpdateCommentRequest) -> Self {
        CommentInput {
            content: request.content,
            parent_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub is_liked: bool,
    pub likes_count: i64,
}

impl From<LikeStatus> for LikeResponse {
    fn from(status: LikeStatus) -> Self {
        Self {
            is_liked: status.is_liked,
            likes_count: status.likes_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub name: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub activity: String,
    pub contacts: Contacts,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            name: profile.name,
            description: profile.description,
            photo_url: profile.photo_url,
            activity: profile.activity,
            contacts: profile.contacts,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Public URL the file is served from.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl MediaResponse {
    pub fn new(file: MediaFile, url: String) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            url,
            created_at: file.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(parent_id: Option<Uuid>) -> Comment {
        Comment::new(Uuid::new_v4(), Uuid::new_v4(), parent_id, "hello".into())
    }

    #[test]
    fn test_deleted_comment_content_is_blanked() {
        let mut deleted = comment(None);
        deleted.deleted_at = Some(Utc::now());
        let mut node = CommentNode::leaf(deleted);
        node.replies.push(CommentNode::leaf(comment(Some(node.comment.id))));

        let thread = CommentThreadResponse::from(vec![node]);

        assert_eq!(thread.total, 2);
        let root = &thread.comments[0];
        assert_eq!(root.content, "");
        assert!(root.deleted_at.is_some());
        assert_eq!(root.replies[0].content, "hello");
    }

    #[test]
    fn test_post_list_keeps_pagination() {
        let query = ListPostsQuery::from(ListPostsParams {
            page: Some(2),
            limit: Some(5),
            published: None,
        });
        let page = PostPage::<PostView>::new(Vec::new(), 11, &query);

        let response = PostListResponse::from(page);
        assert_eq!(response.page, 2);
        assert_eq!(response.limit, 5);
        assert_eq!(response.total_pages, 3);
        assert!(response.posts.is_empty());
    }

    #[test]
    fn test_user_response_role_is_lowercase() {
        let user = User::new(
            "a@example.com".into(),
            "A".into(),
            None,
            folio_core::domain::Role::Admin,
        );
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(json["role"], "admin");
    }
}
