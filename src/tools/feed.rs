//! Feed and search tools
//!
//! Implements the `get_timeline`, `get_author_feed`, `get_post_thread` and
//! `search_posts` MCP tools.

use crate::bsky::BskyAdapter;
use crate::error::AppError;
use crate::mcp::ToolResult;
use crate::registry::HandlerFuture;
use crate::tools::util::{format_post_list, format_thread_tree};
use crate::tools::{clamp_limit, parse_args};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const TIMELINE_DEFAULT_LIMIT: u32 = 50;
const AUTHOR_FEED_DEFAULT_LIMIT: u32 = 25;
const SEARCH_DEFAULT_LIMIT: u32 = 25;

/// Arguments for the get_timeline tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTimelineArgs {
    /// Maximum number of posts
    #[schemars(description = "Maximum number of posts (default 50, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Arguments for the get_author_feed tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetAuthorFeedArgs {
    /// Account whose posts to fetch
    #[schemars(description = "Handle (alice.bsky.social) or DID of the author")]
    pub actor: String,

    /// Maximum number of posts
    #[schemars(description = "Maximum number of posts (default 25, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Arguments for the get_post_thread tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetPostThreadArgs {
    /// Root or any post of the thread
    #[schemars(description = "Post to fetch the thread of: at:// URI or bsky.app URL")]
    pub uri: String,
}

/// Arguments for the search_posts tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPostsArgs {
    /// Search query
    #[schemars(description = "Keyword search query")]
    #[schemars(length(min = 1, max = 500))]
    pub query: String,

    /// Maximum number of results
    #[schemars(description = "Maximum number of results (default 25, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

pub fn get_timeline(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetTimelineArgs = parse_args(args)?;
        execute_get_timeline(adapter, args).await
    })
}

pub fn get_author_feed(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetAuthorFeedArgs = parse_args(args)?;
        execute_get_author_feed(adapter, args).await
    })
}

pub fn get_post_thread(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetPostThreadArgs = parse_args(args)?;
        execute_get_post_thread(adapter, args).await
    })
}

pub fn search_posts(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: SearchPostsArgs = parse_args(args)?;
        execute_search_posts(adapter, args).await
    })
}

async fn execute_get_timeline(
    adapter: &BskyAdapter,
    args: GetTimelineArgs,
) -> Result<ToolResult, AppError> {
    let limit = clamp_limit(args.limit, TIMELINE_DEFAULT_LIMIT);
    info!("Timeline request, limit {}", limit);

    let response = adapter.get_timeline(limit).await?;
    let posts: Vec<_> = response.feed.into_iter().map(|item| item.post).collect();
    Ok(ToolResult::text(format_post_list("Timeline", &posts)))
}

async fn execute_get_author_feed(
    adapter: &BskyAdapter,
    args: GetAuthorFeedArgs,
) -> Result<ToolResult, AppError> {
    let limit = clamp_limit(args.limit, AUTHOR_FEED_DEFAULT_LIMIT);
    info!("Author feed request for {}, limit {}", args.actor, limit);

    let response = adapter.get_author_feed(&args.actor, limit).await?;
    let posts: Vec<_> = response.feed.into_iter().map(|item| item.post).collect();
    let title = format!("Posts by @{}", args.actor.trim_start_matches('@'));
    Ok(ToolResult::text(format_post_list(&title, &posts)))
}

async fn execute_get_post_thread(
    adapter: &BskyAdapter,
    args: GetPostThreadArgs,
) -> Result<ToolResult, AppError> {
    info!("Thread request for {}", args.uri);

    let tree = adapter.get_post_thread(&args.uri).await?.ok_or_else(|| {
        AppError::NotFound(format!("Thread root is deleted or unavailable: {}", args.uri))
    })?;
    Ok(ToolResult::text(format_thread_tree(&tree)))
}

async fn execute_search_posts(
    adapter: &BskyAdapter,
    args: SearchPostsArgs,
) -> Result<ToolResult, AppError> {
    let limit = clamp_limit(args.limit, SEARCH_DEFAULT_LIMIT);
    info!("Search request: '{}', limit {}", args.query, limit);

    // Ordering is whatever the upstream relevance ranking returned
    let response = adapter.search_posts(&args.query, limit).await?;
    let title = format!("Search results for '{}'", args.query);
    Ok(ToolResult::text(format_post_list(&title, &response.posts)))
}
