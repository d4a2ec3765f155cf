//! Shared response shaping for tools
//!
//! Adapter results are turned into compact markdown: counts up front, one
//! entry per record, derived bsky.app links where a web view exists.

use crate::bsky::records::{ActorView, PostView, ThreadTree};
use crate::bsky::uri::at_uri_to_bsky_url;

/// Format one post summary line block
pub fn format_post(post: &PostView) -> String {
    let mut out = String::new();
    out.push_str(&format!("**@{}", post.author.handle));
    if let Some(display_name) = &post.author.display_name {
        out.push_str(&format!(" ({})", display_name));
    }
    out.push_str("**\n");
    out.push_str(&format!("{}\n", post.record.text));

    let stats: Vec<String> = vec![
        post.like_count.map(|c| format!("{} likes", c)),
        post.repost_count.map(|c| format!("{} reposts", c)),
        post.reply_count.map(|c| format!("{} replies", c)),
        post.quote_count.map(|c| format!("{} quotes", c)),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !stats.is_empty() {
        out.push_str(&format!("{} · ", stats.join(", ")));
    }
    out.push_str(&format!("{}\n", post.record.created_at));
    out.push_str(&format!(
        "{}\n",
        at_uri_to_bsky_url(&post.uri, &post.author.handle)
    ));
    out
}

/// Format an ordered post listing with a heading and count
pub fn format_post_list(title: &str, posts: &[PostView]) -> String {
    let mut markdown = format!("# {}\n\n{} posts.\n\n", title, posts.len());
    for post in posts {
        markdown.push_str(&format_post(post));
        markdown.push_str("\n---\n\n");
    }
    markdown
}

/// Format a paginated actor listing
pub fn format_actor_list(title: &str, actors: &[ActorView]) -> String {
    let mut markdown = format!("# {}\n\n{} accounts.\n\n", title, actors.len());
    for actor in actors {
        match &actor.display_name {
            Some(name) => markdown.push_str(&format!("- @{} ({}): {}\n", actor.handle, name, actor.did)),
            None => markdown.push_str(&format!("- @{}: {}\n", actor.handle, actor.did)),
        }
    }
    markdown
}

/// Format a pruned thread tree, indenting replies by depth
pub fn format_thread_tree(tree: &ThreadTree) -> String {
    let mut markdown = format!("# Thread · {} posts\n\n", tree.count());
    format_thread_node(tree, 0, &mut markdown);
    markdown
}

fn format_thread_node(node: &ThreadTree, depth: usize, markdown: &mut String) {
    let indent = "  ".repeat(depth);
    markdown.push_str(&format!(
        "{}- **@{}**: {}\n",
        indent, node.post.author.handle, node.post.record.text
    ));
    markdown.push_str(&format!(
        "{}  {} likes · {}\n",
        indent,
        node.post.like_count.unwrap_or(0),
        node.post.uri
    ));
    for reply in &node.replies {
        format_thread_node(reply, depth + 1, markdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsky::records::{PostAuthor, PostRecord};

    fn mock_post(handle: &str, text: &str) -> PostView {
        PostView {
            uri: format!("at://did:plc:{}/app.bsky.feed.post/rkey1", handle),
            cid: "cid1".to_string(),
            author: PostAuthor {
                did: format!("did:plc:{}", handle),
                handle: handle.to_string(),
                display_name: Some("Display".to_string()),
            },
            record: PostRecord {
                text: text.to_string(),
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
            like_count: Some(3),
            reply_count: Some(1),
            repost_count: Some(0),
            quote_count: None,
        }
    }

    #[test]
    fn test_format_post_includes_link_and_stats() {
        let out = format_post(&mock_post("alice", "hello world"));
        assert!(out.contains("@alice (Display)"));
        assert!(out.contains("hello world"));
        assert!(out.contains("3 likes"));
        assert!(out.contains("https://bsky.app/profile/alice/post/rkey1"));
    }

    #[test]
    fn test_format_post_list_counts() {
        let posts = vec![mock_post("alice", "one"), mock_post("bob", "two")];
        let out = format_post_list("Timeline", &posts);
        assert!(out.starts_with("# Timeline"));
        assert!(out.contains("2 posts."));
    }

    #[test]
    fn test_format_actor_list_lines() {
        let actors = vec![
            ActorView {
                did: "did:plc:a".to_string(),
                handle: "alice.bsky.social".to_string(),
                display_name: Some("Alice".to_string()),
            },
            ActorView {
                did: "did:plc:b".to_string(),
                handle: "bob.bsky.social".to_string(),
                display_name: None,
            },
        ];
        let out = format_actor_list("Followers", &actors);
        assert!(out.starts_with("# Followers"));
        assert!(out.contains("2 accounts."));
        assert!(out.contains("- @alice.bsky.social (Alice): did:plc:a\n"));
        assert!(out.contains("- @bob.bsky.social: did:plc:b\n"));
    }

    #[test]
    fn test_format_thread_tree_indents_replies() {
        let tree = ThreadTree {
            post: mock_post("alice", "root"),
            replies: vec![ThreadTree {
                post: mock_post("bob", "reply"),
                replies: vec![],
            }],
        };
        let out = format_thread_tree(&tree);
        assert!(out.contains("# Thread · 2 posts"));
        assert!(out.contains("- **@alice**: root"));
        assert!(out.contains("  - **@bob**: reply"));
    }
}
