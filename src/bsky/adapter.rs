//! Bluesky domain adapter
//!
//! Normalizes the AT Protocol XRPC surface into the domain operations the
//! tool handlers consume: posting, feeds, search, engagement, profile and
//! list management. Holds the single authenticated session for the process
//! lifetime; the session is never mutated after login.

use crate::bsky::facets::detect_facets;
use crate::bsky::image::ImagePayload;
use crate::bsky::records::{
    merge_profile, reply_context, ActorView, FeedResponse, ProfilePatch, ProfileView,
    RecordCreated, SearchResponse, ThreadResponse, ThreadTree,
};
use crate::bsky::session::Session;
use crate::bsky::uri::RecordRef;
use crate::error::AppError;
use chrono::{SecondsFormat, Utc};
use futures::future::{self, BoxFuture};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const POST_COLLECTION: &str = "app.bsky.feed.post";
pub const LIKE_COLLECTION: &str = "app.bsky.feed.like";
pub const REPOST_COLLECTION: &str = "app.bsky.feed.repost";
pub const FOLLOW_COLLECTION: &str = "app.bsky.graph.follow";
pub const LIST_COLLECTION: &str = "app.bsky.graph.list";
pub const LISTITEM_COLLECTION: &str = "app.bsky.graph.listitem";

/// Pacing delay between successive posts of a thread, to stay within
/// upstream abuse thresholds
pub const THREAD_PACING: Duration = Duration::from_secs(1);

/// Optional attachments for create_post
#[derive(Debug, Default)]
pub struct PostOptions {
    /// Post reference (at:// URI or bsky.app URL) this post replies to
    pub reply_to: Option<String>,
    /// Up to four images, embedded as one ordered list
    pub images: Vec<ImagePayload>,
}

/// A thread creation aborted partway through
///
/// Carries the prefix of posts already created so the caller can reconcile
/// partial state; there is no automatic rollback.
#[derive(Debug)]
pub struct ThreadFailure {
    pub created: Vec<RecordCreated>,
    pub error: AppError,
}

/// Adapter over the upstream platform, shared by all tool handlers
pub struct BskyAdapter {
    client: reqwest::Client,
    session: Session,
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Deserialize)]
struct LikesResponse {
    likes: Vec<LikeEntry>,
}

#[derive(Deserialize)]
struct LikeEntry {
    actor: ActorView,
}

#[derive(Deserialize)]
struct RepostedByResponse {
    #[serde(rename = "repostedBy")]
    reposted_by: Vec<ActorView>,
}

#[derive(Deserialize)]
struct FollowersResponse {
    followers: Vec<ActorView>,
}

#[derive(Deserialize)]
struct FollowsResponse {
    follows: Vec<ActorView>,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl BskyAdapter {
    pub fn new(client: reqwest::Client, session: Session) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn xrpc_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.session.service, nsid)
    }

    async fn read_json(&self, response: reqwest::Response, nsid: &str) -> Result<Value, AppError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(AppError::Authentication(format!(
                    "{} returned status {}: {}",
                    nsid, status, error_text
                )));
            }
            if status.as_u16() == 404 || error_text.contains("RecordNotFound") {
                return Err(AppError::NotFound(format!(
                    "{} returned status {}: {}",
                    nsid, status, error_text
                )));
            }
            return Err(AppError::NetworkError(format!(
                "{} returned status {}: {}",
                nsid, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse {} response: {}", nsid, e)))
    }

    async fn xrpc_get(&self, nsid: &str, query: &[(&str, String)]) -> Result<Value, AppError> {
        debug!("GET {} {:?}", nsid, query);
        let response = self
            .client
            .get(self.xrpc_url(nsid))
            .query(query)
            .header("Authorization", format!("Bearer {}", self.session.access_jwt))
            .send()
            .await
            .map_err(|e| AppError::NetworkError(format!("{} request failed: {}", nsid, e)))?;
        self.read_json(response, nsid).await
    }

    async fn xrpc_post(&self, nsid: &str, body: &Value) -> Result<Value, AppError> {
        debug!("POST {}", nsid);
        let response = self
            .client
            .post(self.xrpc_url(nsid))
            .header("Authorization", format!("Bearer {}", self.session.access_jwt))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::NetworkError(format!("{} request failed: {}", nsid, e)))?;
        self.read_json(response, nsid).await
    }

    // ---- record primitives ----

    async fn create_record(&self, collection: &str, record: Value) -> Result<RecordCreated, AppError> {
        let body = json!({
            "repo": self.session.did,
            "collection": collection,
            "record": record,
        });
        let result = self.xrpc_post("com.atproto.repo.createRecord", &body).await?;
        let created: RecordCreated = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("createRecord response: {}", e)))?;
        Ok(created)
    }

    async fn delete_record(&self, collection: &str, rkey: &str) -> Result<(), AppError> {
        let body = json!({
            "repo": self.session.did,
            "collection": collection,
            "rkey": rkey,
        });
        self.xrpc_post("com.atproto.repo.deleteRecord", &body).await?;
        Ok(())
    }

    async fn get_record(&self, repo: &str, collection: &str, rkey: &str) -> Result<Value, AppError> {
        self.xrpc_get(
            "com.atproto.repo.getRecord",
            &[
                ("repo", repo.to_string()),
                ("collection", collection.to_string()),
                ("rkey", rkey.to_string()),
            ],
        )
        .await
    }

    async fn put_record(
        &self,
        collection: &str,
        rkey: &str,
        record: Value,
    ) -> Result<RecordCreated, AppError> {
        let body = json!({
            "repo": self.session.did,
            "collection": collection,
            "rkey": rkey,
            "record": record,
        });
        let result = self.xrpc_post("com.atproto.repo.putRecord", &body).await?;
        let created: RecordCreated = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("putRecord response: {}", e)))?;
        Ok(created)
    }

    /// Upload a binary blob; returns the blob handle used inside embeds
    pub async fn upload_blob(&self, image: &ImagePayload) -> Result<Value, AppError> {
        debug!("Uploading blob: {} bytes, {}", image.bytes.len(), image.mime_type);
        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.uploadBlob"))
            .header("Authorization", format!("Bearer {}", self.session.access_jwt))
            .header("Content-Type", image.mime_type.clone())
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| AppError::NetworkError(format!("uploadBlob request failed: {}", e)))?;
        let result = self.read_json(response, "com.atproto.repo.uploadBlob").await?;
        result
            .get("blob")
            .cloned()
            .ok_or_else(|| AppError::ParseError("No blob in uploadBlob response".to_string()))
    }

    /// Resolve a handle to a DID; DIDs pass through untouched
    pub async fn resolve_handle(&self, actor: &str) -> Result<String, AppError> {
        let actor = actor.trim_start_matches('@');
        if actor.starts_with("did:") {
            return Ok(actor.to_string());
        }
        let result = self
            .xrpc_get(
                "com.atproto.identity.resolveHandle",
                &[("handle", actor.to_string())],
            )
            .await?;
        let resolved: ResolveHandleResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("resolveHandle response: {}", e)))?;
        Ok(resolved.did)
    }

    /// Parse a post reference and resolve its repo to a DID if needed
    async fn resolve_post_ref(&self, reference: &str) -> Result<RecordRef, AppError> {
        let mut record_ref = RecordRef::parse(reference)?;
        if record_ref.needs_resolution() {
            record_ref.repo = self.resolve_handle(&record_ref.repo).await?;
        }
        Ok(record_ref)
    }

    /// Fetch a post record, returning (uri, cid, record value)
    pub async fn fetch_post(&self, reference: &str) -> Result<(String, String, Value), AppError> {
        let record_ref = self.resolve_post_ref(reference).await?;
        let data = self
            .get_record(&record_ref.repo, &record_ref.collection, &record_ref.rkey)
            .await?;
        let uri = data["uri"]
            .as_str()
            .ok_or_else(|| AppError::ParseError("No URI in record response".to_string()))?
            .to_string();
        let cid = data["cid"]
            .as_str()
            .ok_or_else(|| AppError::ParseError("No CID in record response".to_string()))?
            .to_string();
        let value = data.get("value").cloned().unwrap_or(Value::Null);
        Ok((uri, cid, value))
    }

    // ---- posting ----

    /// Create a post with auto-detected facets and optional reply/images
    pub async fn create_post(
        &self,
        text: &str,
        options: PostOptions,
    ) -> Result<RecordCreated, AppError> {
        let reply = match &options.reply_to {
            Some(reference) => {
                let (uri, cid, value) = self.fetch_post(reference).await?;
                Some(reply_context(&uri, &cid, &value))
            }
            None => None,
        };

        let embed = if options.images.is_empty() {
            None
        } else {
            // Uploads run concurrently; each yields an independent blob
            // handle, and all must finish before the post is submitted
            let uploads = options.images.iter().map(|image| self.upload_blob(image));
            let blobs = future::try_join_all(uploads).await?;
            let images: Vec<Value> = blobs
                .into_iter()
                .zip(options.images.iter())
                .map(|(blob, image)| {
                    json!({
                        "image": blob,
                        "alt": image.alt_text.clone().unwrap_or_default(),
                    })
                })
                .collect();
            Some(json!({ "$type": "app.bsky.embed.images", "images": images }))
        };

        self.submit_post(text, reply, embed).await
    }

    /// Create a post quoting the target reference verbatim
    pub async fn quote_post(
        &self,
        text: &str,
        target_uri: &str,
        target_cid: &str,
    ) -> Result<RecordCreated, AppError> {
        let embed = json!({
            "$type": "app.bsky.embed.record",
            "record": { "uri": target_uri, "cid": target_cid },
        });
        self.submit_post(text, None, Some(embed)).await
    }

    /// Create a chained thread: post i+1 replies to post i, all rooted at
    /// post 0, with the pacing delay between successive creates
    pub async fn create_thread(&self, texts: &[String]) -> Result<Vec<RecordCreated>, ThreadFailure> {
        run_paced(texts, move |text, reply| {
            Box::pin(self.submit_post(text, reply, None))
        })
        .await
    }

    /// Delete a post; deletion of an already-removed record propagates the
    /// upstream error rather than silently succeeding
    pub async fn delete_post(&self, reference: &str) -> Result<String, AppError> {
        let record_ref = self.own_record(reference, POST_COLLECTION)?;
        self.delete_record(POST_COLLECTION, &record_ref.rkey).await?;
        Ok(record_ref.to_at_uri())
    }

    async fn submit_post(
        &self,
        text: &str,
        reply: Option<Value>,
        embed: Option<Value>,
    ) -> Result<RecordCreated, AppError> {
        let mut record = json!({
            "$type": POST_COLLECTION,
            "text": text,
            "createdAt": now_timestamp(),
        });

        let facets = detect_facets(text);
        if !facets.is_empty() {
            record["facets"] = serde_json::to_value(&facets)?;
        }
        if let Some(reply) = reply {
            record["reply"] = reply;
        }
        if let Some(embed) = embed {
            record["embed"] = embed;
        }

        self.create_record(POST_COLLECTION, record).await
    }

    // ---- feeds & search ----

    pub async fn get_timeline(&self, limit: u32) -> Result<FeedResponse, AppError> {
        let result = self
            .xrpc_get("app.bsky.feed.getTimeline", &[("limit", limit.to_string())])
            .await?;
        serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getTimeline response: {}", e)))
    }

    pub async fn get_author_feed(&self, actor: &str, limit: u32) -> Result<FeedResponse, AppError> {
        let result = self
            .xrpc_get(
                "app.bsky.feed.getAuthorFeed",
                &[
                    ("actor", actor.trim_start_matches('@').to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getAuthorFeed response: {}", e)))
    }

    /// Fetch a thread and prune unavailable nodes; None when the root
    /// itself is deleted or blocked
    pub async fn get_post_thread(&self, reference: &str) -> Result<Option<ThreadTree>, AppError> {
        let record_ref = self.resolve_post_ref(reference).await?;
        let result = self
            .xrpc_get(
                "app.bsky.feed.getPostThread",
                &[("uri", record_ref.to_at_uri())],
            )
            .await?;
        let thread: ThreadResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getPostThread response: {}", e)))?;
        Ok(thread.thread.prune())
    }

    /// Keyword search; upstream relevance ordering is kept as-is
    pub async fn search_posts(&self, query: &str, limit: u32) -> Result<SearchResponse, AppError> {
        let result = self
            .xrpc_get(
                "app.bsky.feed.searchPosts",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("searchPosts response: {}", e)))
    }

    // ---- engagement & graph ----
    //
    // Creating a relationship returns the new record's own reference; the
    // matching undo consumes that reference, not the original target's.

    pub async fn like(&self, reference: &str) -> Result<(RecordCreated, String), AppError> {
        let (uri, cid, _) = self.fetch_post(reference).await?;
        let record = json!({
            "$type": LIKE_COLLECTION,
            "subject": { "uri": uri, "cid": cid },
            "createdAt": now_timestamp(),
        });
        let created = self.create_record(LIKE_COLLECTION, record).await?;
        Ok((created, uri))
    }

    pub async fn unlike(&self, like_uri: &str) -> Result<(), AppError> {
        let record_ref = self.own_record(like_uri, LIKE_COLLECTION)?;
        self.delete_record(LIKE_COLLECTION, &record_ref.rkey).await
    }

    pub async fn repost(&self, reference: &str) -> Result<(RecordCreated, String), AppError> {
        let (uri, cid, _) = self.fetch_post(reference).await?;
        let record = json!({
            "$type": REPOST_COLLECTION,
            "subject": { "uri": uri, "cid": cid },
            "createdAt": now_timestamp(),
        });
        let created = self.create_record(REPOST_COLLECTION, record).await?;
        Ok((created, uri))
    }

    pub async fn unrepost(&self, repost_uri: &str) -> Result<(), AppError> {
        let record_ref = self.own_record(repost_uri, REPOST_COLLECTION)?;
        self.delete_record(REPOST_COLLECTION, &record_ref.rkey).await
    }

    pub async fn follow(&self, actor: &str) -> Result<(RecordCreated, String), AppError> {
        let did = self.resolve_handle(actor).await?;
        let record = json!({
            "$type": FOLLOW_COLLECTION,
            "subject": did,
            "createdAt": now_timestamp(),
        });
        let created = self.create_record(FOLLOW_COLLECTION, record).await?;
        Ok((created, did))
    }

    pub async fn unfollow(&self, follow_uri: &str) -> Result<(), AppError> {
        let record_ref = self.own_record(follow_uri, FOLLOW_COLLECTION)?;
        self.delete_record(FOLLOW_COLLECTION, &record_ref.rkey).await
    }

    pub async fn get_likes(&self, reference: &str, limit: u32) -> Result<Vec<ActorView>, AppError> {
        let record_ref = self.resolve_post_ref(reference).await?;
        let result = self
            .xrpc_get(
                "app.bsky.feed.getLikes",
                &[
                    ("uri", record_ref.to_at_uri()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let likes: LikesResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getLikes response: {}", e)))?;
        Ok(likes.likes.into_iter().map(|l| l.actor).collect())
    }

    pub async fn get_reposted_by(
        &self,
        reference: &str,
        limit: u32,
    ) -> Result<Vec<ActorView>, AppError> {
        let record_ref = self.resolve_post_ref(reference).await?;
        let result = self
            .xrpc_get(
                "app.bsky.feed.getRepostedBy",
                &[
                    ("uri", record_ref.to_at_uri()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let reposts: RepostedByResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getRepostedBy response: {}", e)))?;
        Ok(reposts.reposted_by)
    }

    /// Followers of `actor`, defaulting to the authenticated account
    pub async fn get_followers(
        &self,
        actor: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ActorView>, AppError> {
        let actor = actor.unwrap_or(&self.session.handle);
        let result = self
            .xrpc_get(
                "app.bsky.graph.getFollowers",
                &[
                    ("actor", actor.trim_start_matches('@').to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let followers: FollowersResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getFollowers response: {}", e)))?;
        Ok(followers.followers)
    }

    /// Accounts `actor` follows, defaulting to the authenticated account
    pub async fn get_follows(
        &self,
        actor: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ActorView>, AppError> {
        let actor = actor.unwrap_or(&self.session.handle);
        let result = self
            .xrpc_get(
                "app.bsky.graph.getFollows",
                &[
                    ("actor", actor.trim_start_matches('@').to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let follows: FollowsResponse = serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getFollows response: {}", e)))?;
        Ok(follows.follows)
    }

    // ---- profile & lists ----

    pub async fn get_profile(&self, actor: Option<&str>) -> Result<ProfileView, AppError> {
        let actor = actor.unwrap_or(&self.session.handle);
        let result = self
            .xrpc_get(
                "app.bsky.actor.getProfile",
                &[("actor", actor.trim_start_matches('@').to_string())],
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|e| AppError::ParseError(format!("getProfile response: {}", e)))
    }

    /// Merge-patch the profile record: read current state, apply overrides,
    /// write back. Omitted fields stay unchanged.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<RecordCreated, AppError> {
        let existing = match self
            .get_record(&self.session.did, "app.bsky.actor.profile", "self")
            .await
        {
            Ok(data) => data.get("value").cloned().unwrap_or(Value::Null),
            Err(AppError::NotFound(_)) => Value::Null,
            Err(e) => return Err(e),
        };

        let merged = merge_profile(existing, &patch);
        self.put_record("app.bsky.actor.profile", "self", merged).await
    }

    /// Upload an avatar image then merge-patch only the avatar field
    pub async fn update_avatar(&self, image: ImagePayload) -> Result<RecordCreated, AppError> {
        let blob = self.upload_blob(&image).await?;
        self.update_profile(ProfilePatch {
            avatar: Some(blob),
            ..Default::default()
        })
        .await
    }

    pub async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
        purpose_nsid: &str,
    ) -> Result<RecordCreated, AppError> {
        let mut record = json!({
            "$type": LIST_COLLECTION,
            "name": name,
            "purpose": purpose_nsid,
            "createdAt": now_timestamp(),
        });
        if let Some(description) = description {
            record["description"] = json!(description);
        }
        self.create_record(LIST_COLLECTION, record).await
    }

    /// Add an actor to a list; returns the membership record's reference,
    /// which remove_from_list later consumes
    pub async fn add_to_list(&self, list_uri: &str, actor: &str) -> Result<RecordCreated, AppError> {
        let list_ref = expect_collection(list_uri, LIST_COLLECTION)?;
        let did = self.resolve_handle(actor).await?;
        let record = json!({
            "$type": LISTITEM_COLLECTION,
            "subject": did,
            "list": list_ref.to_at_uri(),
            "createdAt": now_timestamp(),
        });
        self.create_record(LISTITEM_COLLECTION, record).await
    }

    pub async fn remove_from_list(&self, item_uri: &str) -> Result<(), AppError> {
        let record_ref = self.own_record(item_uri, LISTITEM_COLLECTION)?;
        self.delete_record(LISTITEM_COLLECTION, &record_ref.rkey).await
    }

    /// Parse a record reference for deletion: it must belong to `collection`
    /// and to the authenticated account's repo
    ///
    /// deleteRecord always targets the session repo, so a reference into
    /// another repo must be rejected here; letting it through would delete
    /// whatever own record happens to share the rkey.
    fn own_record(&self, uri: &str, collection: &str) -> Result<RecordRef, AppError> {
        let record_ref = expect_collection(uri, collection)?;
        if record_ref.repo != self.session.did
            && !record_ref.repo.eq_ignore_ascii_case(&self.session.handle)
        {
            return Err(AppError::InvalidInput(format!(
                "Record {} is in repo {}, not the authenticated account's",
                uri, record_ref.repo
            )));
        }
        Ok(record_ref)
    }
}

/// Drive thread creation: submit each post in order, sleeping the pacing
/// delay between successive submissions, aborting on the first failure
/// with the already-created prefix.
async fn run_paced<'a, F>(
    texts: &'a [String],
    mut submit: F,
) -> Result<Vec<RecordCreated>, ThreadFailure>
where
    F: FnMut(&'a str, Option<Value>) -> BoxFuture<'a, Result<RecordCreated, AppError>>,
{
    let mut created: Vec<RecordCreated> = Vec::with_capacity(texts.len());

    for (i, text) in texts.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(THREAD_PACING).await;
        }

        match submit(text, thread_reply_refs(&created)).await {
            Ok(record) => {
                info!("Thread post {}/{} created: {}", i + 1, texts.len(), record.uri);
                created.push(record);
            }
            Err(error) => return Err(ThreadFailure { created, error }),
        }
    }

    Ok(created)
}

/// Reply refs for the next post of a thread: rooted at the first created
/// post, parented on the most recent one. None for the opening post.
fn thread_reply_refs(created: &[RecordCreated]) -> Option<Value> {
    match (created.first(), created.last()) {
        (Some(root), Some(parent)) => Some(json!({
            "root": { "uri": root.uri, "cid": root.cid },
            "parent": { "uri": parent.uri, "cid": parent.cid },
        })),
        _ => None,
    }
}

/// Parse a record reference and require it to belong to `collection`
///
/// Undo operations consume the relationship record's own reference; passing
/// the target post or account instead is caught here before any upstream
/// call can delete the wrong record.
fn expect_collection(uri: &str, collection: &str) -> Result<RecordRef, AppError> {
    let record_ref = RecordRef::parse(uri)?;
    if record_ref.collection != collection {
        return Err(AppError::InvalidInput(format!(
            "Expected a {} record reference, got {}",
            collection, record_ref.collection
        )));
    }
    Ok(record_ref)
}
