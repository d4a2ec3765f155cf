//! Engagement and social-graph tools
//!
//! Implements like/unlike, repost/unrepost, follow/unfollow and the
//! paginated actor listings. The do/undo asymmetry is load-bearing: each
//! "do" returns the new relationship record's reference, and the matching
//! "undo" consumes that reference, never the original target's.

use crate::bsky::BskyAdapter;
use crate::error::AppError;
use crate::mcp::ToolResult;
use crate::registry::HandlerFuture;
use crate::tools::util::format_actor_list;
use crate::tools::{clamp_limit, parse_args};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const LISTING_DEFAULT_LIMIT: u32 = 50;

/// Arguments for the like_post tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LikePostArgs {
    /// Post to like
    #[schemars(description = "Post to like: at:// URI or bsky.app URL")]
    pub uri: String,
}

/// Arguments for the unlike_post tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlikePostArgs {
    /// The like record's own reference
    #[schemars(description = "The like record URI returned by like_post (not the post's URI)")]
    pub like_uri: String,
}

/// Arguments for the repost tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RepostArgs {
    /// Post to repost
    #[schemars(description = "Post to repost: at:// URI or bsky.app URL")]
    pub uri: String,
}

/// Arguments for the unrepost tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnrepostArgs {
    /// The repost record's own reference
    #[schemars(description = "The repost record URI returned by repost (not the post's URI)")]
    pub repost_uri: String,
}

/// Arguments for the follow_user tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FollowUserArgs {
    /// Account to follow
    #[schemars(description = "Handle (alice.bsky.social) or DID to follow")]
    pub actor: String,
}

/// Arguments for the unfollow_user tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowUserArgs {
    /// The follow record's own reference
    #[schemars(description = "The follow record URI returned by follow_user (not the account)")]
    pub follow_uri: String,
}

/// Arguments for the get_likes tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetLikesArgs {
    /// Post whose likers to list
    #[schemars(description = "Post: at:// URI or bsky.app URL")]
    pub uri: String,

    /// Maximum number of accounts
    #[schemars(description = "Maximum number of accounts (default 50, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Arguments for the get_reposted_by tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetRepostedByArgs {
    /// Post whose reposters to list
    #[schemars(description = "Post: at:// URI or bsky.app URL")]
    pub uri: String,

    /// Maximum number of accounts
    #[schemars(description = "Maximum number of accounts (default 50, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Arguments for the get_followers tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFollowersArgs {
    /// Account whose followers to list
    #[schemars(description = "Handle or DID (defaults to the authenticated account)")]
    pub actor: Option<String>,

    /// Maximum number of accounts
    #[schemars(description = "Maximum number of accounts (default 50, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Arguments for the get_follows tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFollowsArgs {
    /// Account whose follows to list
    #[schemars(description = "Handle or DID (defaults to the authenticated account)")]
    pub actor: Option<String>,

    /// Maximum number of accounts
    #[schemars(description = "Maximum number of accounts (default 50, max 100)")]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

pub fn like_post(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: LikePostArgs = parse_args(args)?;
        info!("Liking post {}", args.uri);
        let (created, post_uri) = adapter.like(&args.uri).await?;
        Ok(ToolResult::text(format!(
            "# Post Liked\n\n**Post:** {}\n**Like record:** {}\n\nKeep the like record URI to unlike later.\n",
            post_uri, created.uri
        )))
    })
}

pub fn unlike_post(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: UnlikePostArgs = parse_args(args)?;
        info!("Removing like {}", args.like_uri);
        adapter.unlike(&args.like_uri).await?;
        Ok(ToolResult::text(format!(
            "# Like Removed\n\n**Like record:** {}\n",
            args.like_uri
        )))
    })
}

pub fn repost(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: RepostArgs = parse_args(args)?;
        info!("Reposting {}", args.uri);
        let (created, post_uri) = adapter.repost(&args.uri).await?;
        Ok(ToolResult::text(format!(
            "# Reposted\n\n**Post:** {}\n**Repost record:** {}\n\nKeep the repost record URI to unrepost later.\n",
            post_uri, created.uri
        )))
    })
}

pub fn unrepost(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: UnrepostArgs = parse_args(args)?;
        info!("Removing repost {}", args.repost_uri);
        adapter.unrepost(&args.repost_uri).await?;
        Ok(ToolResult::text(format!(
            "# Repost Removed\n\n**Repost record:** {}\n",
            args.repost_uri
        )))
    })
}

pub fn follow_user(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: FollowUserArgs = parse_args(args)?;
        info!("Following {}", args.actor);
        let (created, did) = adapter.follow(&args.actor).await?;
        Ok(ToolResult::text(format!(
            "# Followed\n\n**Account:** {} ({})\n**Follow record:** {}\n\nKeep the follow record URI to unfollow later.\n",
            args.actor, did, created.uri
        )))
    })
}

pub fn unfollow_user(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: UnfollowUserArgs = parse_args(args)?;
        info!("Removing follow {}", args.follow_uri);
        adapter.unfollow(&args.follow_uri).await?;
        Ok(ToolResult::text(format!(
            "# Unfollowed\n\n**Follow record:** {}\n",
            args.follow_uri
        )))
    })
}

pub fn get_likes(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetLikesArgs = parse_args(args)?;
        let limit = clamp_limit(args.limit, LISTING_DEFAULT_LIMIT);
        let actors = adapter.get_likes(&args.uri, limit).await?;
        Ok(ToolResult::text(format_actor_list("Liked by", &actors)))
    })
}

pub fn get_reposted_by(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetRepostedByArgs = parse_args(args)?;
        let limit = clamp_limit(args.limit, LISTING_DEFAULT_LIMIT);
        let actors = adapter.get_reposted_by(&args.uri, limit).await?;
        Ok(ToolResult::text(format_actor_list("Reposted by", &actors)))
    })
}

pub fn get_followers(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetFollowersArgs = parse_args(args)?;
        let limit = clamp_limit(args.limit, LISTING_DEFAULT_LIMIT);
        let actors = adapter.get_followers(args.actor.as_deref(), limit).await?;
        Ok(ToolResult::text(format_actor_list("Followers", &actors)))
    })
}

pub fn get_follows(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetFollowsArgs = parse_args(args)?;
        let limit = clamp_limit(args.limit, LISTING_DEFAULT_LIMIT);
        let actors = adapter.get_follows(args.actor.as_deref(), limit).await?;
        Ok(ToolResult::text(format_actor_list("Following", &actors)))
    })
}
