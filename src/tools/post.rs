//! Posting tools
//!
//! Implements the `create_post`, `create_thread`, `quote_post` and
//! `delete_post` MCP tools.

use crate::bsky::image::{load_image, ImageInput};
use crate::bsky::records::RecordCreated;
use crate::bsky::uri::at_uri_to_bsky_url;
use crate::bsky::{BskyAdapter, PostOptions};
use crate::error::AppError;
use crate::mcp::ToolResult;
use crate::registry::HandlerFuture;
use crate::tools::parse_args;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Arguments for the create_post tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostArgs {
    /// Post text
    #[schemars(description = "Post text, up to 300 characters")]
    #[schemars(length(max = 300))]
    pub text: String,

    /// Post being replied to
    #[schemars(description = "Post to reply to: at:// URI or bsky.app URL")]
    pub reply_to: Option<String>,

    /// Attached images
    #[schemars(description = "Up to 4 images to attach, in display order")]
    #[schemars(length(max = 4))]
    pub images: Option<Vec<ImageInput>>,
}

/// Arguments for the create_thread tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateThreadArgs {
    /// Texts of the thread posts, in order
    #[schemars(description = "Post texts in thread order; each becomes a reply to the previous one")]
    #[schemars(length(min = 2, max = 25))]
    pub texts: Vec<String>,
}

/// Arguments for the quote_post tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QuotePostArgs {
    /// Text of the quoting post
    #[schemars(description = "Post text, up to 300 characters")]
    #[schemars(length(max = 300))]
    pub text: String,

    /// at:// URI of the quoted post
    #[schemars(description = "at:// URI of the post to quote")]
    pub uri: String,

    /// CID of the quoted post revision
    #[schemars(description = "CID of the quoted post revision")]
    pub cid: String,
}

/// Arguments for the delete_post tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeletePostArgs {
    /// at:// URI of the post to delete
    #[schemars(description = "at:// URI of one of your posts")]
    pub uri: String,
}

pub fn create_post(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CreatePostArgs = parse_args(args)?;
        execute_create_post(adapter, args).await
    })
}

pub fn create_thread(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CreateThreadArgs = parse_args(args)?;
        execute_create_thread(adapter, args).await
    })
}

pub fn quote_post(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: QuotePostArgs = parse_args(args)?;
        execute_quote_post(adapter, args).await
    })
}

pub fn delete_post(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: DeletePostArgs = parse_args(args)?;
        execute_delete_post(adapter, args).await
    })
}

async fn execute_create_post(
    adapter: &BskyAdapter,
    args: CreatePostArgs,
) -> Result<ToolResult, AppError> {
    info!("Creating post ({} bytes)", args.text.len());

    let mut images = Vec::new();
    for input in args.images.unwrap_or_default() {
        images.push(load_image(input).await?);
    }

    let created = adapter
        .create_post(
            &args.text,
            PostOptions {
                reply_to: args.reply_to.clone(),
                images,
            },
        )
        .await?;

    let mut markdown = shaped_created("Post Created", &created, &adapter.session().handle);
    if let Some(reply_to) = &args.reply_to {
        markdown.push_str(&format!("**Reply to:** {}\n", reply_to));
    }
    Ok(ToolResult::text(markdown))
}

async fn execute_create_thread(
    adapter: &BskyAdapter,
    args: CreateThreadArgs,
) -> Result<ToolResult, AppError> {
    // The schema declares 2..=25, but the host may not pre-validate
    if args.texts.len() < 2 || args.texts.len() > 25 {
        return Err(AppError::InvalidInput(format!(
            "A thread needs between 2 and 25 posts, got {}",
            args.texts.len()
        )));
    }

    info!("Creating thread of {} posts", args.texts.len());

    match adapter.create_thread(&args.texts).await {
        Ok(created) => {
            let mut markdown = format!("# Thread Created\n\n{} posts.\n\n", created.len());
            for (i, record) in created.iter().enumerate() {
                markdown.push_str(&format!("{}. {}\n", i + 1, record.uri));
            }
            markdown.push_str(&format!(
                "\n**Link:** {}\n",
                at_uri_to_bsky_url(&created[0].uri, &adapter.session().handle)
            ));
            Ok(ToolResult::text(markdown))
        }
        Err(failure) => {
            // No rollback: surface the prefix so the caller can reconcile
            let mut message = format!(
                "Thread creation failed at post {} of {}: {}\n",
                failure.created.len() + 1,
                args.texts.len(),
                failure.error.message()
            );
            if !failure.created.is_empty() {
                message.push_str("\nAlready created (not rolled back):\n");
                for record in &failure.created {
                    message.push_str(&format!("- {}\n", record.uri));
                }
            }
            Ok(ToolResult::error(message))
        }
    }
}

async fn execute_quote_post(
    adapter: &BskyAdapter,
    args: QuotePostArgs,
) -> Result<ToolResult, AppError> {
    info!("Creating quote post of {}", args.uri);
    let created = adapter.quote_post(&args.text, &args.uri, &args.cid).await?;

    let mut markdown = shaped_created("Quote Posted", &created, &adapter.session().handle);
    markdown.push_str(&format!("**Quoted:** {}\n", args.uri));
    Ok(ToolResult::text(markdown))
}

async fn execute_delete_post(
    adapter: &BskyAdapter,
    args: DeletePostArgs,
) -> Result<ToolResult, AppError> {
    info!("Deleting post {}", args.uri);
    let uri = adapter.delete_post(&args.uri).await?;
    Ok(ToolResult::text(format!("# Post Deleted\n\n**URI:** {}\n", uri)))
}

fn shaped_created(title: &str, created: &RecordCreated, handle: &str) -> String {
    format!(
        "# {}\n\n**URI:** {}\n**CID:** {}\n**Link:** {}\n",
        title,
        created.uri,
        created.cid,
        at_uri_to_bsky_url(&created.uri, handle)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_post_args_parsing() {
        let args = json!({
            "text": "Hello, world!",
            "replyTo": "at://did:plc:abc/app.bsky.feed.post/123"
        });

        let parsed: CreatePostArgs = serde_json::from_value(args).unwrap();
        assert_eq!(parsed.text, "Hello, world!");
        assert_eq!(
            parsed.reply_to,
            Some("at://did:plc:abc/app.bsky.feed.post/123".to_string())
        );
        assert!(parsed.images.is_none());
    }

    #[test]
    fn test_create_post_args_with_images() {
        let args = json!({
            "text": "look at this",
            "images": [ { "path": "/tmp/a.png", "alt": "a picture" } ]
        });

        let parsed: CreatePostArgs = serde_json::from_value(args).unwrap();
        let images = parsed.images.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path.as_deref(), Some("/tmp/a.png"));
        assert_eq!(images[0].alt.as_deref(), Some("a picture"));
    }

    #[test]
    fn test_create_post_schema_declares_constraints() {
        let schema = serde_json::to_value(schemars::schema_for!(CreatePostArgs)).unwrap();
        assert_eq!(schema["properties"]["text"]["maxLength"], 300);
        assert_eq!(schema["properties"]["images"]["maxItems"], 4);
    }

    #[test]
    fn test_create_thread_schema_declares_bounds() {
        let schema = serde_json::to_value(schemars::schema_for!(CreateThreadArgs)).unwrap();
        assert_eq!(schema["properties"]["texts"]["minItems"], 2);
        assert_eq!(schema["properties"]["texts"]["maxItems"], 25);
    }

    #[test]
    fn test_quote_post_args_require_uri_and_cid() {
        let args = json!({ "text": "interesting" });
        let parsed: Result<QuotePostArgs, _> = serde_json::from_value(args);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_shaped_created_derives_url() {
        let created = RecordCreated {
            uri: "at://did:plc:me/app.bsky.feed.post/rk1".to_string(),
            cid: "cid1".to_string(),
        };
        let out = shaped_created("Post Created", &created, "me.bsky.social");
        assert!(out.contains("# Post Created"));
        assert!(out.contains("https://bsky.app/profile/me.bsky.social/post/rk1"));
    }
}
