//! HTTP API Server for the swipe feed
//!
//! Thin REST binding of the feed engine, swipe recorder and inbox. The caller's
//! identity arrives as a plain id supplied by the external auth layer.

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ApiConfig, FeedConfig};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::feed::{CategoryFilter, FeedEngine, FeedQuery, SwipeCommand, SwipeInbox, SwipeRecorder};
use crate::models::{InboxEntry, NewPost, Post, PostId, SwipeRecord, UserId};
use crate::store::{PostStore, SwipeLedger, UserDirectory};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: FeedEngine,
    pub recorder: SwipeRecorder,
    pub inbox: SwipeInbox,
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserDirectory>,
    /// Present with the Postgres backend, used by the health check
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(
        posts: Arc<dyn PostStore>,
        ledger: Arc<dyn SwipeLedger>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            engine: FeedEngine::new(posts.clone(), ledger.clone()),
            recorder: SwipeRecorder::new(users.clone(), posts.clone(), ledger.clone()),
            inbox: SwipeInbox::new(posts.clone(), ledger),
            posts,
            users,
            db: None,
        }
    }

    pub fn with_feed_config(mut self, feed: &FeedConfig) -> Self {
        self.engine = self.engine.with_slow_threshold(feed.slow_feed_threshold);
        self.recorder = self.recorder.with_policy(feed.duplicate_policy);
        self
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    async fn require_user(&self, id: UserId) -> Result<()> {
        match self.users.find_user_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::not_found("user", id)),
        }
    }
}

/// `Json` body whose rejection renders as an `INVALID_ARGUMENT` error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection renders as an `INVALID_ARGUMENT` error body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query params naming the acting user
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

/// Query params for post creation
#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    pub author_id: String,
}

/// Query params for the feed endpoint
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub user_id: String,
    /// Comma-separated category labels
    pub categories: Option<String>,
}

/// Response for the feed endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<Post>,
    pub total: usize,
}

/// Request body for recording a swipe
#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub user_id: String,
    pub post_id: String,
    pub direction: String,
    pub swiped_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboxResponse {
    pub user_id: UserId,
    pub entries: Vec<InboxEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeftSwipedResponse {
    pub user_id: UserId,
    pub post_ids: Vec<PostId>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
}

/// Build the router with CORS, tracing, timeout and body-limit layers
pub fn router(state: Arc<AppState>, config: &ApiConfig) -> Router {
    let mut app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Posts
        .route("/api/posts", post(create_post).get(list_posts))
        .route("/api/posts/feed", get(get_feed))
        .route("/api/posts/user/:user_id", get(list_posts_by_author))
        .route("/api/posts/:id", get(get_post))
        // Swipes
        .route("/api/swipes", post(record_swipe))
        .route("/api/swipes/inbox", get(get_inbox))
        .route("/api/swipes/left/:user_id/ids", get(get_left_swiped_ids))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        app = app.layer(cors_layer(&config.cors_origins));
    }

    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(allowed)
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_server<F>(state: Arc<AppState>, config: &ApiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    info!("🚀 Starting swipe feed API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(Error::internal)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::internal)?;

    Ok(())
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, storage) = match &state.db {
        None => ("healthy", StatusCode::OK, "memory"),
        Some(db) => match db.health_check().await {
            Ok(()) => ("healthy", StatusCode::OK, "postgres"),
            Err(e) => {
                warn!("Health check failed: {}", e);
                ("degraded", StatusCode::SERVICE_UNAVAILABLE, "postgres")
            }
        },
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: storage.to_string(),
        }),
    )
}

/// Create a post authored by `author_id`
async fn create_post(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<AuthorQuery>,
    ApiJson(payload): ApiJson<NewPost>,
) -> Result<(StatusCode, Json<Post>)> {
    let author: UserId = query.author_id.parse()?;
    let post = state
        .posts
        .create_post(author, payload.normalized()?)
        .await?;

    info!("📝 Post {} created by {}", post.id, author);
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Post>>> {
    Ok(Json(state.posts.list_all_posts().await?))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>> {
    let id: PostId = id.parse()?;
    state
        .posts
        .find_post_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("post", id))
}

async fn list_posts_by_author(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Post>>> {
    let author: UserId = user_id.parse()?;
    state.require_user(author).await?;
    Ok(Json(state.posts.list_posts_by_author(author).await?))
}

/// Get the swipe feed for a user, optionally filtered by category
async fn get_feed(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<FeedParams>,
) -> Result<Json<FeedResponse>> {
    let user: UserId = params.user_id.parse()?;
    state.require_user(user).await?;

    let query = FeedQuery {
        user_id: user,
        categories: CategoryFilter::parse_list(params.categories.as_deref()),
    };
    let items = state.engine.compute_feed(&query).await?;

    Ok(Json(FeedResponse {
        total: items.len(),
        items,
    }))
}

/// Record a swipe
async fn record_swipe(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SwipeRequest>,
) -> Result<(StatusCode, Json<SwipeRecord>)> {
    let command = SwipeCommand::parse(
        req.user_id.parse()?,
        req.post_id.parse()?,
        &req.direction,
        req.swiped_at.as_deref(),
    )?;
    let record = state.recorder.record_swipe(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Posts the user accepted, newest first
async fn get_inbox(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<InboxResponse>> {
    let user: UserId = query.user_id.parse()?;
    state.require_user(user).await?;
    let entries = state.inbox.right_swiped(user).await?;
    Ok(Json(InboxResponse {
        user_id: user,
        entries,
    }))
}

async fn get_left_swiped_ids(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<LeftSwipedResponse>> {
    let user: UserId = user_id.parse()?;
    state.require_user(user).await?;
    let post_ids = state.inbox.left_swiped_ids(user).await?;
    Ok(Json(LeftSwipedResponse {
        user_id: user,
        post_ids,
    }))
}
