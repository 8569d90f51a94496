#![allow(dead_code)]

use quill::{
    DispatchConfig, Envelope, Fault, Handler, Operation, RequestContext, Rules, Validator,
    Violation, status,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ============================================================================
// Blog Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: u64,
    pub title: String,
    pub author: String,
}

pub fn sample_posts() -> Vec<PostDto> {
    [
        (1, "Hello, world", "ada"),
        (2, "Ownership in practice", "grace"),
        (3, "Async without tears", "ada"),
        (4, "Link-time registries", "linus"),
    ]
    .into_iter()
    .map(|(id, title, author)| PostDto {
        id,
        title: title.to_string(),
        author: author.to_string(),
    })
    .collect()
}

/// Aliases and entities the blog front end relies on.
pub fn blog_config() -> DispatchConfig {
    DispatchConfig::default()
        .with_alias("getbyauthor", "GetBlogPostsByAuthor")
        .with_alias("signin", "LoginCommand")
        .with_entity("Author")
}

// ============================================================================
// Collected Operations
// ============================================================================

#[derive(Debug, Deserialize, Operation)]
#[operation(response = LoginResponse)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[quill::handler]
pub async fn login(cmd: LoginCommand) -> Result<LoginResponse, Fault> {
    if cmd.password.len() < 6 {
        return Err(Fault::unauthorized("invalid credentials"));
    }
    Ok(LoginResponse {
        token: format!("token:{}", cmd.email),
    })
}

#[derive(Debug, Deserialize, Operation)]
#[serde(rename_all = "camelCase")]
#[operation(response = Vec<PostDto>)]
pub struct GetBlogPostsQuery {
    pub page: u32,
    pub page_size: u32,
}

#[quill::handler]
pub async fn get_blog_posts(query: GetBlogPostsQuery) -> Result<Vec<PostDto>, Fault> {
    let skip = query.page.saturating_sub(1) * query.page_size;
    Ok(sample_posts()
        .into_iter()
        .skip(skip as usize)
        .take(query.page_size as usize)
        .collect())
}

#[quill::validator]
pub fn check_paging(query: &GetBlogPostsQuery) -> Vec<Violation> {
    Rules::new()
        .field_rule(
            "page",
            |q: &GetBlogPostsQuery| q.page > 0,
            "Page must be greater than 0",
        )
        .field_rule(
            "pageSize",
            |q: &GetBlogPostsQuery| (1..=50).contains(&q.page_size),
            "Page size must be between 1 and 50",
        )
        .validate(query)
}

#[derive(Debug, Deserialize, Operation)]
#[operation(response = Vec<PostDto>)]
pub struct GetBlogPostsByAuthorQuery {
    pub author: String,
}

#[quill::handler]
pub async fn get_posts_by_author(
    query: GetBlogPostsByAuthorQuery,
) -> Result<Vec<PostDto>, Fault> {
    Ok(sample_posts()
        .into_iter()
        .filter(|post| post.author.eq_ignore_ascii_case(&query.author))
        .collect())
}

/// Answers with its own envelope, which passes through untouched.
#[derive(Debug, Deserialize, Operation)]
#[operation(response = Envelope)]
pub struct GetPostQuery {
    pub id: u64,
}

#[quill::handler]
pub async fn get_post(query: GetPostQuery) -> Result<Envelope, Fault> {
    match sample_posts().into_iter().find(|post| post.id == query.id) {
        Some(post) => {
            let data = serde_json::to_value(post).map_err(Fault::internal)?;
            Ok(Envelope::success_with_message(data, "post found"))
        }
        None => Ok(Envelope::failure(
            status::NOT_FOUND,
            "post not found",
            vec![format!("post {} does not exist", query.id)],
        )),
    }
}

#[derive(Debug, Deserialize, Operation)]
#[operation(response = ())]
pub struct PublishPostCommand {
    pub id: u64,
}

#[quill::handler]
pub async fn publish_post(_cmd: PublishPostCommand) -> Result<(), Fault> {
    Err(Fault::internal("database unavailable"))
}

#[derive(Debug, Deserialize, Operation)]
#[operation(response = ())]
pub struct ArchivePostCommand {
    pub id: u64,
}

#[quill::handler]
pub async fn archive_post(cmd: ArchivePostCommand) -> Result<(), Fault> {
    panic!("archive index corrupted for post {}", cmd.id)
}

#[derive(Debug, Deserialize, Operation)]
#[operation(response = ())]
pub struct PostPublishedEvent {
    pub id: u64,
}

#[quill::handler]
pub async fn on_post_published(_event: PostPublishedEvent) -> Result<(), Fault> {
    Ok(())
}

/// Neither suffix nor default action: both come from the attribute.
#[derive(Debug, Deserialize, Operation)]
#[operation(response = String, kind = "command", action = "cache.refresh")]
pub struct RefreshCache {}

#[quill::handler]
pub async fn refresh_cache(_cmd: RefreshCache, ctx: RequestContext) -> Result<String, Fault> {
    let who = ctx.principal().map_or("anonymous", |p| p.subject());
    Ok(format!("refreshed by {}", who))
}

// ============================================================================
// Explicitly Registered Operations
// ============================================================================

/// Needs a store, so its handler is registered with an instance.
#[derive(Debug, Deserialize, Operation)]
#[operation(response = PostDto, authenticated)]
pub struct CreatePostCommand {
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct PostStore {
    posts: Arc<Mutex<Vec<PostDto>>>,
}

impl PostStore {
    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn titles(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|post| post.title.clone())
            .collect()
    }
}

pub struct CreatePostHandler {
    store: PostStore,
}

impl CreatePostHandler {
    pub fn new(store: PostStore) -> Self {
        Self { store }
    }
}

impl Handler<CreatePostCommand> for CreatePostHandler {
    async fn handle(&self, cmd: CreatePostCommand, ctx: RequestContext) -> Result<PostDto, Fault> {
        let author = ctx
            .principal()
            .map(|p| p.subject().to_string())
            .ok_or_else(|| Fault::unauthorized("authentication required"))?;

        let mut posts = self.store.posts.lock().unwrap();
        let post = PostDto {
            id: posts.len() as u64 + 1,
            title: cmd.title,
            author,
        };
        posts.push(post.clone());
        Ok(post)
    }
}

pub fn title_rules() -> Rules<CreatePostCommand> {
    Rules::new().field_rule(
        "title",
        |cmd: &CreatePostCommand| !cmd.title.trim().is_empty(),
        "Title is required",
    )
}

/// Served by a `PendingHandler` in cancellation tests.
#[derive(Debug, Deserialize, Operation)]
#[operation(response = ())]
pub struct ImportPostsCommand {}

/// Declared but never handled.
#[derive(Debug, Deserialize, Operation)]
#[operation(response = ())]
pub struct DeleteCommentCommand {
    pub id: u64,
}

/// Operations that only exist in the registry when registered explicitly.
pub const UNHANDLED_BY_DEFAULT: [&str; 3] =
    ["CreatePostCommand", "DeleteCommentCommand", "ImportPostsCommand"];
