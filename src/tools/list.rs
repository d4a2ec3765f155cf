//! List management tools
//!
//! Implements the `create_list`, `add_to_list` and `remove_from_list` MCP
//! tools. Membership follows the same do/undo asymmetry as likes and
//! follows: adding returns the membership record's reference, and removal
//! consumes that reference rather than the member's identity.

use crate::bsky::BskyAdapter;
use crate::mcp::ToolResult;
use crate::registry::HandlerFuture;
use crate::tools::parse_args;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Published list purpose, mapped to the upstream purpose NSID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListPurpose {
    Curation,
    Moderation,
}

impl ListPurpose {
    pub fn nsid(self) -> &'static str {
        match self {
            ListPurpose::Curation => "app.bsky.graph.defs#curatelist",
            ListPurpose::Moderation => "app.bsky.graph.defs#modlist",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ListPurpose::Curation => "curation",
            ListPurpose::Moderation => "moderation",
        }
    }
}

/// Arguments for the create_list tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateListArgs {
    /// List name
    #[schemars(description = "Name of the list")]
    #[schemars(length(max = 64))]
    pub name: String,

    /// List description
    #[schemars(description = "Optional description of the list")]
    #[schemars(length(max = 300))]
    pub description: Option<String>,

    /// What the list is for
    #[schemars(description = "List purpose: 'curation' or 'moderation'")]
    pub purpose: ListPurpose,
}

/// Arguments for the add_to_list tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToListArgs {
    /// The list to add to
    #[schemars(description = "at:// URI of the list")]
    pub list_uri: String,

    /// Account to add
    #[schemars(description = "Handle (alice.bsky.social) or DID to add")]
    pub actor: String,
}

/// Arguments for the remove_from_list tool
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromListArgs {
    /// The membership record's own reference
    #[schemars(description = "The membership record URI returned by add_to_list (not the account)")]
    pub item_uri: String,
}

pub fn create_list(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: CreateListArgs = parse_args(args)?;
        info!("Creating {} list '{}'", args.purpose.label(), args.name);

        let created = adapter
            .create_list(&args.name, args.description.as_deref(), args.purpose.nsid())
            .await?;

        Ok(ToolResult::text(format!(
            "# List Created\n\n**Name:** {}\n**Purpose:** {}\n**URI:** {}\n",
            args.name,
            args.purpose.label(),
            created.uri
        )))
    })
}

pub fn add_to_list(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: AddToListArgs = parse_args(args)?;
        info!("Adding {} to list {}", args.actor, args.list_uri);

        let created = adapter.add_to_list(&args.list_uri, &args.actor).await?;

        Ok(ToolResult::text(format!(
            "# Added to List\n\n**Account:** {}\n**List:** {}\n**Membership record:** {}\n\nKeep the membership record URI to remove this account later.\n",
            args.actor, args.list_uri, created.uri
        )))
    })
}

pub fn remove_from_list(adapter: &BskyAdapter, args: Value) -> HandlerFuture<'_> {
    Box::pin(async move {
        let args: RemoveFromListArgs = parse_args(args)?;
        info!("Removing list item {}", args.item_uri);

        adapter.remove_from_list(&args.item_uri).await?;

        Ok(ToolResult::text(format!(
            "# Removed from List\n\n**Membership record:** {}\n",
            args.item_uri
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_purpose_maps_to_nsid() {
        assert_eq!(ListPurpose::Curation.nsid(), "app.bsky.graph.defs#curatelist");
        assert_eq!(ListPurpose::Moderation.nsid(), "app.bsky.graph.defs#modlist");
    }

    #[test]
    fn test_purpose_rejects_unknown_values() {
        let parsed: Result<ListPurpose, _> = serde_json::from_value(json!("blocklist"));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_create_list_args_parsing() {
        let args: CreateListArgs = serde_json::from_value(json!({
            "name": "Rust folks",
            "purpose": "curation"
        }))
        .unwrap();
        assert_eq!(args.name, "Rust folks");
        assert!(args.description.is_none());
        assert_eq!(args.purpose, ListPurpose::Curation);
    }

    #[test]
    fn test_create_list_schema_declares_purpose_enum() {
        let schema = serde_json::to_value(schemars::schema_for!(CreateListArgs)).unwrap();
        let purpose = schema["definitions"]["ListPurpose"]["enum"]
            .as_array()
            .expect("enum values");
        assert!(purpose.contains(&json!("curation")));
        assert!(purpose.contains(&json!("moderation")));
    }

    #[test]
    fn test_remove_args_use_membership_record_key() {
        let args: RemoveFromListArgs = serde_json::from_value(json!({
            "itemUri": "at://did:plc:me/app.bsky.graph.listitem/3kq"
        }))
        .unwrap();
        assert_eq!(args.item_uri, "at://did:plc:me/app.bsky.graph.listitem/3kq");
    }
}
