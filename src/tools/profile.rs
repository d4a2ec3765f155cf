//! Profile tools
//!
//! Implements the `get_profile`, `update_profile` and `update_avatar` MCP
//! tools. Updates are merge-patches: current state is read, overrides are
//! applied, and the merged record is written back.

use crate::bsky::image::{load_image, ImageInput};
use crate::bsky::records::ProfilePatch;
use crate::bsky::BskyAdapter;
use crate::error::AppError;
use crate::mcp::ToolResult;
use crate::registry::HandlerFuture;
use crate::tools::parse_args;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Arguments for the get_profile tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetProfileArgs {
    /// Account whose profile to fetch
    #[schemars(description = "Handle or DID (defaults to the authenticated account)")]
    pub actor: Option<String>,
}

/// Arguments for the update_profile tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileArgs {
    /// New display name
    #[schemars(description = "New display name; omit to keep the current one")]
    #[schemars(length(max = 64))]
    pub display_name: Option<String>,

    /// New profile description
    #[schemars(description = "New profile description; omit to keep the current one")]
    #[schemars(length(max = 256))]
    pub description: Option<String>,
}

/// Arguments for the update_avatar tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateAvatarArgs {
    /// The avatar image
    #[schemars(description = "Avatar image as a file path or inline base64 data")]
    #[serde(flatten)]
    pub image: ImageInput,
}

pub fn get_profile(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: GetProfileArgs = parse_args(args)?;
        execute_get_profile(adapter, args).await
    })
}

pub fn update_profile(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: UpdateProfileArgs = parse_args(args)?;
        execute_update_profile(adapter, args).await
    })
}

pub fn update_avatar(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: UpdateAvatarArgs = parse_args(args)?;
        execute_update_avatar(adapter, args).await
    })
}

async fn execute_get_profile(
    adapter: &BskyAdapter,
    args: GetProfileArgs,
) -> Result<ToolResult, AppError> {
    let profile = adapter.get_profile(args.actor.as_deref()).await?;
    info!("Profile fetched for @{}", profile.handle);

    let mut markdown = format!("# @{}\n\n", profile.handle);
    if let Some(display_name) = &profile.display_name {
        markdown.push_str(&format!("**Name:** {}\n", display_name));
    }
    markdown.push_str(&format!("**DID:** {}\n", profile.did));
    markdown.push_str(&format!(
        "**Followers:** {} · **Following:** {} · **Posts:** {}\n",
        profile.followers_count.unwrap_or(0),
        profile.follows_count.unwrap_or(0),
        profile.posts_count.unwrap_or(0)
    ));
    if let Some(description) = &profile.description {
        markdown.push_str(&format!("\n{}\n", description));
    }
    Ok(ToolResult::text(markdown))
}

async fn execute_update_profile(
    adapter: &BskyAdapter,
    args: UpdateProfileArgs,
) -> Result<ToolResult, AppError> {
    if args.display_name.is_none() && args.description.is_none() {
        return Err(AppError::InvalidInput(
            "Provide at least one of 'displayName' or 'description'".to_string(),
        ));
    }

    info!("Updating profile record");
    let changed: Vec<&str> = [
        args.display_name.as_ref().map(|_| "display name"),
        args.description.as_ref().map(|_| "description"),
    ]
    .into_iter()
    .flatten()
    .collect();

    adapter
        .update_profile(ProfilePatch {
            display_name: args.display_name,
            description: args.description,
            avatar: None,
        })
        .await?;

    Ok(ToolResult::text(format!(
        "# Profile Updated\n\nChanged: {}. Other fields were left unchanged.\n",
        changed.join(", ")
    )))
}

async fn execute_update_avatar(
    adapter: &BskyAdapter,
    args: UpdateAvatarArgs,
) -> Result<ToolResult, AppError> {
    let image = load_image(args.image).await?;
    info!("Updating avatar ({} bytes, {})", image.bytes.len(), image.mime_type);
    let mime_type = image.mime_type.clone();

    adapter.update_avatar(image).await?;

    Ok(ToolResult::text(format!(
        "# Avatar Updated\n\n**Type:** {}\n",
        mime_type
    )))
}
