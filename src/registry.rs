//! Tool registry and request dispatcher
//!
//! The registry is a fixed table mapping tool names to {schema, handler},
//! built once at startup and never mutated. The dispatcher is the single
//! boundary between "fails the whole process" and "fails one call": every
//! handler error is converted into an error-flagged result here, so a bad
//! call can never take down the serve loop.

use crate::bsky::BskyAdapter;
use crate::error::AppError;
use crate::mcp::ToolResult;
use crate::tools;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub type HandlerFuture<'a> = BoxFuture<'a, Result<ToolResult, AppError>>;

/// A tool handler: plain function pointer, so the registry stays a
/// homogeneous compile-time table
pub type Handler = for<'a> fn(&'a BskyAdapter, Value) -> HandlerFuture<'a>;

/// One registered tool: stable name, declarative input schema, handler
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: fn() -> Value,
    pub handler: Handler,
}

/// Immutable name → descriptor table with O(1) lookup
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            let previous = index.insert(tool.name, i);
            debug_assert!(previous.is_none(), "duplicate tool name: {}", tool.name);
        }
        Self { tools, index }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Serialize all descriptors for tools/list and initialize
    pub fn descriptors_json(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": (tool.input_schema)(),
                })
            })
            .collect();
        Value::Array(tools)
    }
}

fn schema_of<T: schemars::JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Build the full tool table
///
/// Adding a tool means adding one descriptor here plus its handler; nothing
/// else changes.
pub fn build_registry() -> Registry {
    use tools::{feed, list, post, profile, react};

    Registry::new(vec![
        // posting
        ToolDescriptor {
            name: "create_post",
            description: "Create a new post, optionally replying to another post or attaching up to 4 images",
            input_schema: schema_of::<post::CreatePostArgs>,
            handler: post::create_post,
        },
        ToolDescriptor {
            name: "create_thread",
            description: "Create a thread of chained posts, each replying to the previous one",
            input_schema: schema_of::<post::CreateThreadArgs>,
            handler: post::create_thread,
        },
        ToolDescriptor {
            name: "quote_post",
            description: "Create a post quoting another post",
            input_schema: schema_of::<post::QuotePostArgs>,
            handler: post::quote_post,
        },
        ToolDescriptor {
            name: "delete_post",
            description: "Delete one of your posts",
            input_schema: schema_of::<post::DeletePostArgs>,
            handler: post::delete_post,
        },
        // feeds & search
        ToolDescriptor {
            name: "get_timeline",
            description: "Fetch the authenticated account's home timeline",
            input_schema: schema_of::<feed::GetTimelineArgs>,
            handler: feed::get_timeline,
        },
        ToolDescriptor {
            name: "get_author_feed",
            description: "Fetch recent posts from a specific account",
            input_schema: schema_of::<feed::GetAuthorFeedArgs>,
            handler: feed::get_author_feed,
        },
        ToolDescriptor {
            name: "get_post_thread",
            description: "Fetch a post and its full reply thread",
            input_schema: schema_of::<feed::GetPostThreadArgs>,
            handler: feed::get_post_thread,
        },
        ToolDescriptor {
            name: "search_posts",
            description: "Search posts by keyword",
            input_schema: schema_of::<feed::SearchPostsArgs>,
            handler: feed::search_posts,
        },
        // engagement & graph
        ToolDescriptor {
            name: "like_post",
            description: "Like a post; returns the like record reference needed to unlike",
            input_schema: schema_of::<react::LikePostArgs>,
            handler: react::like_post,
        },
        ToolDescriptor {
            name: "unlike_post",
            description: "Remove a like, given the like record reference returned by like_post",
            input_schema: schema_of::<react::UnlikePostArgs>,
            handler: react::unlike_post,
        },
        ToolDescriptor {
            name: "repost",
            description: "Repost a post; returns the repost record reference needed to unrepost",
            input_schema: schema_of::<react::RepostArgs>,
            handler: react::repost,
        },
        ToolDescriptor {
            name: "unrepost",
            description: "Remove a repost, given the repost record reference returned by repost",
            input_schema: schema_of::<react::UnrepostArgs>,
            handler: react::unrepost,
        },
        ToolDescriptor {
            name: "follow_user",
            description: "Follow an account; returns the follow record reference needed to unfollow",
            input_schema: schema_of::<react::FollowUserArgs>,
            handler: react::follow_user,
        },
        ToolDescriptor {
            name: "unfollow_user",
            description: "Unfollow an account, given the follow record reference returned by follow_user",
            input_schema: schema_of::<react::UnfollowUserArgs>,
            handler: react::unfollow_user,
        },
        ToolDescriptor {
            name: "get_likes",
            description: "List accounts that liked a post",
            input_schema: schema_of::<react::GetLikesArgs>,
            handler: react::get_likes,
        },
        ToolDescriptor {
            name: "get_reposted_by",
            description: "List accounts that reposted a post",
            input_schema: schema_of::<react::GetRepostedByArgs>,
            handler: react::get_reposted_by,
        },
        ToolDescriptor {
            name: "get_followers",
            description: "List followers of an account (defaults to the authenticated account)",
            input_schema: schema_of::<react::GetFollowersArgs>,
            handler: react::get_followers,
        },
        ToolDescriptor {
            name: "get_follows",
            description: "List accounts an account follows (defaults to the authenticated account)",
            input_schema: schema_of::<react::GetFollowsArgs>,
            handler: react::get_follows,
        },
        // profile
        ToolDescriptor {
            name: "get_profile",
            description: "Fetch an account's profile (defaults to the authenticated account)",
            input_schema: schema_of::<profile::GetProfileArgs>,
            handler: profile::get_profile,
        },
        ToolDescriptor {
            name: "update_profile",
            description: "Update display name and/or description; omitted fields are left unchanged",
            input_schema: schema_of::<profile::UpdateProfileArgs>,
            handler: profile::update_profile,
        },
        ToolDescriptor {
            name: "update_avatar",
            description: "Upload a new avatar image for the authenticated account",
            input_schema: schema_of::<profile::UpdateAvatarArgs>,
            handler: profile::update_avatar,
        },
        // lists
        ToolDescriptor {
            name: "create_list",
            description: "Create a curation or moderation list",
            input_schema: schema_of::<list::CreateListArgs>,
            handler: list::create_list,
        },
        ToolDescriptor {
            name: "add_to_list",
            description: "Add an account to a list; returns the membership record reference needed to remove it",
            input_schema: schema_of::<list::AddToListArgs>,
            handler: list::add_to_list,
        },
        ToolDescriptor {
            name: "remove_from_list",
            description: "Remove a list member, given the membership record reference returned by add_to_list",
            input_schema: schema_of::<list::RemoveFromListArgs>,
            handler: list::remove_from_list,
        },
    ])
}

/// Routes tool calls to handlers and normalizes every outcome into a
/// `ToolResult`
pub struct Dispatcher {
    registry: Registry,
    adapter: Arc<BskyAdapter>,
}

impl Dispatcher {
    pub fn new(registry: Registry, adapter: Arc<BskyAdapter>) -> Self {
        Self { registry, adapter }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch one tool call
    ///
    /// Never panics and never propagates an error to the serve loop: unknown
    /// tools and handler failures both come back as error-flagged results.
    pub async fn dispatch(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        let Some(tool) = self.registry.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return ToolResult::error(format!("Unknown tool '{}'", name));
        };

        let args = arguments.unwrap_or_else(|| Value::Object(Default::default()));
        info!("Dispatching tool call: {}", name);

        match (tool.handler)(self.adapter.as_ref(), args).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool '{}' failed ({}): {}", name, e.error_code(), e);
                ToolResult::error(e.message())
            }
        }
    }
}
