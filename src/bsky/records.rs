//! Wire-level record and view types
//!
//! Typed views of the app.bsky responses the adapter consumes, plus the pure
//! transforms over them: reply-root inference, thread pruning, and the
//! profile merge-patch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A uri + cid pair pinning one immutable record revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordCreated {
    pub uri: String,
    pub cid: String,
}

/// Post author as returned by feed and thread views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthor {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// The record payload of a post view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// A post as it appears in feeds and threads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: PostAuthor,
    pub record: PostRecord,
    #[serde(rename = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(rename = "replyCount")]
    pub reply_count: Option<i64>,
    #[serde(rename = "repostCount")]
    pub repost_count: Option<i64>,
    #[serde(rename = "quoteCount")]
    pub quote_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
}

/// Response shape shared by getTimeline and getAuthorFeed
#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    pub feed: Vec<FeedViewPost>,
    pub cursor: Option<String>,
}

/// Response from app.bsky.feed.searchPosts
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub posts: Vec<PostView>,
}

/// An actor as returned by the paginated listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorView {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// Detailed profile view from app.bsky.actor.getProfile
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "followersCount")]
    pub followers_count: Option<i64>,
    #[serde(rename = "followsCount")]
    pub follows_count: Option<i64>,
    #[serde(rename = "postsCount")]
    pub posts_count: Option<i64>,
}

/// One node of the raw getPostThread response
#[derive(Debug, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    ThreadViewPost {
        post: PostView,
        #[serde(default)]
        replies: Vec<ThreadNode>,
    },
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFoundPost {
        uri: String,
        #[serde(rename = "notFound")]
        not_found: bool,
    },
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    BlockedPost { uri: String, blocked: bool },
}

#[derive(Debug, Deserialize)]
pub struct ThreadResponse {
    pub thread: ThreadNode,
}

/// A reconstructed thread with unavailable nodes pruned out
#[derive(Debug, Serialize)]
pub struct ThreadTree {
    pub post: PostView,
    pub replies: Vec<ThreadTree>,
}

impl ThreadNode {
    /// Prune deleted and blocked nodes from the thread
    ///
    /// A missing node's children are unreachable, so pruning recurses: the
    /// whole subtree is dropped while siblings are preserved.
    pub fn prune(self) -> Option<ThreadTree> {
        match self {
            ThreadNode::ThreadViewPost { post, replies } => Some(ThreadTree {
                post,
                replies: replies.into_iter().filter_map(ThreadNode::prune).collect(),
            }),
            ThreadNode::NotFoundPost { .. } | ThreadNode::BlockedPost { .. } => None,
        }
    }
}

impl ThreadTree {
    /// Total number of posts in the pruned tree
    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(ThreadTree::count).sum::<usize>()
    }
}

/// Build the reply context for a new post replying to the given parent
///
/// If the parent record is itself a reply, the root is copied from the
/// parent's own root so the reply tree stays flat-rooted at the original
/// top-level post. Otherwise root == parent.
pub fn reply_context(parent_uri: &str, parent_cid: &str, parent_record: &Value) -> Value {
    let parent_ref = json!({ "uri": parent_uri, "cid": parent_cid });

    let root_ref = parent_record
        .get("reply")
        .and_then(|reply| reply.get("root"))
        .cloned()
        .unwrap_or_else(|| parent_ref.clone());

    json!({ "root": root_ref, "parent": parent_ref })
}

/// Optional overrides applied to an existing profile record
#[derive(Debug, Default, Clone)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<Value>,
}

/// Merge-patch a profile record: read-modify-write, no hidden mutation
///
/// Fields absent from the patch keep their existing values, and fields this
/// server does not model (banner, labels, pinned post) pass through intact.
pub fn merge_profile(existing: Value, patch: &ProfilePatch) -> Value {
    let mut record = match existing {
        Value::Object(map) => Value::Object(map),
        _ => json!({}),
    };

    record["$type"] = json!("app.bsky.actor.profile");
    if let Some(display_name) = &patch.display_name {
        record["displayName"] = json!(display_name);
    }
    if let Some(description) = &patch.description {
        record["description"] = json!(description);
    }
    if let Some(avatar) = &patch.avatar {
        record["avatar"] = avatar.clone();
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_post(handle: &str, rkey: &str, text: &str) -> PostView {
        PostView {
            uri: format!("at://did:plc:{}/app.bsky.feed.post/{}", handle, rkey),
            cid: format!("cid-{}", rkey),
            author: PostAuthor {
                did: format!("did:plc:{}", handle),
                handle: handle.to_string(),
                display_name: None,
            },
            record: PostRecord {
                text: text.to_string(),
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
            like_count: Some(0),
            reply_count: Some(0),
            repost_count: Some(0),
            quote_count: Some(0),
        }
    }

    #[test]
    fn test_reply_context_top_level_parent() {
        // Parent is not a reply: root == parent
        let record = json!({ "text": "top level post" });
        let reply = reply_context("at://did:plc:a/app.bsky.feed.post/p1", "cid-p1", &record);
        assert_eq!(reply["root"], reply["parent"]);
        assert_eq!(reply["parent"]["uri"], "at://did:plc:a/app.bsky.feed.post/p1");
        assert_eq!(reply["parent"]["cid"], "cid-p1");
    }

    #[test]
    fn test_reply_context_nested_parent() {
        // Parent is a reply: root copied from the parent's own root
        let record = json!({
            "text": "a reply",
            "reply": {
                "root": { "uri": "at://did:plc:a/app.bsky.feed.post/root", "cid": "cid-root" },
                "parent": { "uri": "at://did:plc:b/app.bsky.feed.post/mid", "cid": "cid-mid" },
            }
        });
        let reply = reply_context("at://did:plc:c/app.bsky.feed.post/r1", "cid-r1", &record);
        assert_eq!(
            reply["root"]["uri"],
            "at://did:plc:a/app.bsky.feed.post/root"
        );
        assert_eq!(reply["root"]["cid"], "cid-root");
        assert_eq!(reply["parent"]["uri"], "at://did:plc:c/app.bsky.feed.post/r1");
    }

    #[test]
    fn test_thread_prune_removes_deleted_subtree() {
        let thread = ThreadNode::ThreadViewPost {
            post: mock_post("alice", "root", "root post"),
            replies: vec![
                ThreadNode::NotFoundPost {
                    uri: "at://did:plc:gone/app.bsky.feed.post/x".to_string(),
                    not_found: true,
                },
                ThreadNode::ThreadViewPost {
                    post: mock_post("bob", "r2", "surviving sibling"),
                    replies: vec![ThreadNode::BlockedPost {
                        uri: "at://did:plc:blocked/app.bsky.feed.post/y".to_string(),
                        blocked: true,
                    }],
                },
            ],
        };

        let tree = thread.prune().expect("root survives");
        assert_eq!(tree.count(), 2);
        assert_eq!(tree.replies.len(), 1);
        assert_eq!(tree.replies[0].post.record.text, "surviving sibling");
        assert!(tree.replies[0].replies.is_empty());
    }

    #[test]
    fn test_thread_prune_root_deleted() {
        let thread = ThreadNode::NotFoundPost {
            uri: "at://did:plc:gone/app.bsky.feed.post/x".to_string(),
            not_found: true,
        };
        assert!(thread.prune().is_none());
    }

    #[test]
    fn test_thread_node_parses_tagged_types() {
        let json = json!({
            "$type": "app.bsky.feed.defs#notFoundPost",
            "uri": "at://did:plc:x/app.bsky.feed.post/1",
            "notFound": true
        });
        let node: ThreadNode = serde_json::from_value(json).unwrap();
        assert!(matches!(node, ThreadNode::NotFoundPost { .. }));
    }

    #[test]
    fn test_merge_profile_keeps_omitted_fields() {
        let existing = json!({
            "$type": "app.bsky.actor.profile",
            "displayName": "Old Name",
            "description": "Old description",
            "banner": { "$type": "blob", "ref": "xyz" },
        });
        let patch = ProfilePatch {
            display_name: Some("New Name".to_string()),
            ..Default::default()
        };

        let merged = merge_profile(existing, &patch);
        assert_eq!(merged["displayName"], "New Name");
        assert_eq!(merged["description"], "Old description");
        assert_eq!(merged["banner"]["ref"], "xyz");
    }

    #[test]
    fn test_merge_profile_from_empty_record() {
        let patch = ProfilePatch {
            description: Some("fresh".to_string()),
            ..Default::default()
        };
        let merged = merge_profile(Value::Null, &patch);
        assert_eq!(merged["$type"], "app.bsky.actor.profile");
        assert_eq!(merged["description"], "fresh");
        assert!(merged.get("displayName").is_none());
    }

    #[test]
    fn test_merge_profile_avatar_only() {
        let existing = json!({ "displayName": "Keep Me" });
        let patch = ProfilePatch {
            avatar: Some(json!({ "$type": "blob", "mimeType": "image/png" })),
            ..Default::default()
        };
        let merged = merge_profile(existing, &patch);
        assert_eq!(merged["displayName"], "Keep Me");
        assert_eq!(merged["avatar"]["mimeType"], "image/png");
    }
}
