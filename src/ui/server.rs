//! Local HTTP surface for the dashboard.
//!
//! The browser talks only to this process: it polls the rendered fragments
//! and posts navigation and composer actions. The revision header lets the
//! page skip DOM swaps when nothing visible changed.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Form, Path, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::Html,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    backend::HttpBackend,
    usecases::{
        contracts::{ChannelMessagesApi, DirectoryApi, DmApi, IdentityApi},
        controller::ViewController,
    },
};

use super::render;

pub const REVISION_HEADER: &str = "x-perch-revision";
pub const NOTICE_HEADER: &str = "x-perch-notice";

type SharedController<A> = Arc<Mutex<ViewController<A>>>;

pub async fn serve(
    addr: SocketAddr,
    controller: SharedController<HttpBackend>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard listener on {addr}"))?;
    tracing::info!(%addr, "dashboard available");

    axum::serve(listener, router(controller))
        .await
        .context("dashboard server failed")
}

pub fn router<A>(controller: SharedController<A>) -> Router
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/view/transcript", get(transcript::<A>))
        .route("/view/sidebar", get(sidebar::<A>))
        .route("/nav/server/:id", post(nav_server::<A>))
        .route("/nav/channel/:id", post(nav_channel::<A>))
        .route("/nav/dm/:id", post(nav_dm::<A>))
        .route("/compose", post(compose::<A>))
        .with_state(controller)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn transcript<A>(State(controller): State<SharedController<A>>) -> (HeaderMap, Html<String>)
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    let mut controller = controller.lock().await;
    let html = format!(
        "{}{}",
        render::render_view_title(&controller.view_title()),
        render::render_transcript(controller.active_stream(), controller.identity()),
    );

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&controller.view_token()) {
        headers.insert(HeaderName::from_static(REVISION_HEADER), value);
    }
    if let Some(notice) = controller.take_notice() {
        if let Ok(value) = HeaderValue::from_str(&notice) {
            headers.insert(HeaderName::from_static(NOTICE_HEADER), value);
        }
    }

    (headers, Html(html))
}

async fn sidebar<A>(State(controller): State<SharedController<A>>) -> Html<String>
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    let controller = controller.lock().await;
    Html(render::render_sidebar(
        controller.directory(),
        controller.nav(),
        controller.dm_list(),
        controller.connection_status(),
    ))
}

async fn nav_server<A>(
    State(controller): State<SharedController<A>>,
    Path(id): Path<String>,
) -> StatusCode
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    controller.lock().await.select_server(&id).await;
    StatusCode::NO_CONTENT
}

async fn nav_channel<A>(
    State(controller): State<SharedController<A>>,
    Path(id): Path<String>,
) -> StatusCode
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    controller.lock().await.select_channel(&id).await;
    StatusCode::NO_CONTENT
}

async fn nav_dm<A>(
    State(controller): State<SharedController<A>>,
    Path(id): Path<String>,
) -> StatusCode
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    controller.lock().await.select_dm(&id).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct ComposeForm {
    text: String,
}

async fn compose<A>(
    State(controller): State<SharedController<A>>,
    Form(form): Form<ComposeForm>,
) -> StatusCode
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi + Send + Sync + 'static,
{
    // Failure shows up as an optimistic-bubble rollback plus a notice; the
    // request itself succeeds either way.
    controller.lock().await.compose(&form.text).await;
    StatusCode::NO_CONTENT
}

const INDEX_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>perch</title>
<style>
  body { display: flex; margin: 0; font-family: sans-serif; height: 100vh; }
  .sidebar { width: 260px; overflow-y: auto; background: #2b2d31; color: #dbdee1; padding: 8px; }
  .sidebar h2 { font-size: 12px; text-transform: uppercase; color: #949ba4; }
  .sidebar ul { list-style: none; padding: 0; margin: 0; }
  .sidebar li { padding: 6px 8px; border-radius: 4px; cursor: pointer; }
  .sidebar li.active { background: #404249; color: #fff; }
  .sidebar .unread { float: right; background: #f23f43; color: #fff; border-radius: 8px; padding: 0 6px; font-size: 11px; }
  .sidebar .preview { display: block; font-size: 11px; color: #949ba4; }
  .connection { font-size: 11px; padding: 6px; color: #949ba4; }
  main { flex: 1; display: flex; flex-direction: column; background: #313338; color: #dbdee1; }
  #transcript { flex: 1; overflow-y: auto; padding: 12px; }
  .message { margin: 4px 0; display: flex; gap: 8px; }
  .message.own .content { color: #c9e4ff; }
  .message .author { font-weight: bold; margin-right: 6px; }
  .message .time { font-size: 11px; color: #949ba4; }
  .message .content { margin: 2px 0; white-space: pre-wrap; }
  .message.pending .content { opacity: 0.6; }
  .sending { font-size: 11px; color: #949ba4; font-style: italic; }
  .placeholder { color: #949ba4; padding: 24px; text-align: center; }
  .view-title { font-size: 16px; margin: 0 0 8px; color: #f2f3f5; }
  .avatar { width: 32px; height: 32px; border-radius: 50%; }
  #composer { display: flex; padding: 12px; gap: 8px; }
  #composer input { flex: 1; padding: 10px; border-radius: 6px; border: none; background: #383a40; color: #dbdee1; }
  #notice { position: fixed; top: 12px; right: 12px; background: #f23f43; color: #fff; padding: 8px 12px; border-radius: 6px; display: none; }
</style>
</head>
<body>
<div id="sidebar" class="sidebar"></div>
<main>
  <div id="transcript"></div>
  <form id="composer"><input name="text" autocomplete="off" placeholder="Message"></form>
</main>
<div id="notice"></div>
<script>
let revision = null;

async function refreshTranscript() {
  const response = await fetch('/view/transcript');
  const next = response.headers.get('x-perch-revision');
  const notice = response.headers.get('x-perch-notice');
  if (notice) showNotice(notice);
  if (next !== revision) {
    revision = next;
    const container = document.getElementById('transcript');
    const stick = container.scrollTop + container.clientHeight >= container.scrollHeight - 40;
    container.innerHTML = await response.text();
    if (stick) container.scrollTop = container.scrollHeight;
  }
}

async function refreshSidebar() {
  const response = await fetch('/view/sidebar');
  document.getElementById('sidebar').innerHTML = await response.text();
}

function showNotice(text) {
  const el = document.getElementById('notice');
  el.textContent = text;
  el.style.display = 'block';
  setTimeout(() => { el.style.display = 'none'; }, 4000);
}

async function navigate(kind, id) {
  await fetch(`/nav/${kind}/${encodeURIComponent(id)}`, { method: 'POST' });
  revision = null;
  await Promise.all([refreshTranscript(), refreshSidebar()]);
}

document.getElementById('sidebar').addEventListener('click', (event) => {
  const channel = event.target.closest('[data-channel]');
  if (channel) return navigate('channel', channel.dataset.channel);
  const dm = event.target.closest('[data-dm]');
  if (dm) return navigate('dm', dm.dataset.dm);
  const server = event.target.closest('[data-server]');
  if (server) return navigate('server', server.dataset.server);
});

document.getElementById('composer').addEventListener('submit', async (event) => {
  event.preventDefault();
  const input = event.target.elements.text;
  const text = input.value;
  input.value = '';
  await fetch('/compose', {
    method: 'POST',
    headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
    body: new URLSearchParams({ text }),
  });
  await refreshTranscript();
});

setInterval(refreshTranscript, 1000);
setInterval(refreshSidebar, 2000);
refreshTranscript();
refreshSidebar();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{
            directory::{ChannelSummary, ServerDirectory, ServerSummary},
            dm_list::DmConversation,
            message::{Message, UserIdentity},
        },
        usecases::contracts::BackendError,
    };

    struct StubBackend;

    #[async_trait]
    impl ChannelMessagesApi for StubBackend {
        async fn list_channel_messages(
            &self,
            _channel_id: &str,
        ) -> Result<Vec<Message>, BackendError> {
            Ok(vec![Message {
                id: "m-1".to_owned(),
                author_id: "u-1".to_owned(),
                author_name: "alice".to_owned(),
                avatar_url: String::new(),
                content: "<script>alert(1)</script>".to_owned(),
                timestamp_seconds: 1_700_000_000,
                pending: false,
            }])
        }

        async fn post_channel_message(
            &self,
            _channel_id: &str,
            text: &str,
        ) -> Result<Message, BackendError> {
            Ok(Message {
                id: "srv-1".to_owned(),
                author_id: "me".to_owned(),
                author_name: "Me".to_owned(),
                avatar_url: String::new(),
                content: text.to_owned(),
                timestamp_seconds: 1_700_000_001,
                pending: false,
            })
        }
    }

    #[async_trait]
    impl DmApi for StubBackend {
        async fn list_dms(&self) -> Result<Vec<DmConversation>, BackendError> {
            Ok(vec![])
        }

        async fn list_dm_messages(&self, _dm_id: &str) -> Result<Vec<Message>, BackendError> {
            Err(BackendError::NotFound)
        }

        async fn send_dm_message(
            &self,
            _dm_id: &str,
            _text: &str,
        ) -> Result<Message, BackendError> {
            Err(BackendError::Unavailable)
        }
    }

    #[async_trait]
    impl DirectoryApi for StubBackend {
        async fn load_directory(&self) -> Result<ServerDirectory, BackendError> {
            Ok(ServerDirectory::new(vec![ServerSummary {
                id: "home".to_owned(),
                name: "Home".to_owned(),
                channels: vec![ChannelSummary {
                    id: "general".to_owned(),
                    name: "general".to_owned(),
                }],
            }]))
        }
    }

    #[async_trait]
    impl IdentityApi for StubBackend {
        async fn current_user(&self) -> Result<UserIdentity, BackendError> {
            Ok(UserIdentity {
                id: "me".to_owned(),
                username: "Me".to_owned(),
            })
        }
    }

    async fn serve_test() -> String {
        let mut controller = ViewController::new(StubBackend, Duration::from_secs(3));
        controller.initialize().await;
        let controller = Arc::new(Mutex::new(controller));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, router(controller))
                .await
                .expect("test server");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn index_serves_the_dashboard_page() {
        let base = serve_test().await;

        let body = reqwest::get(format!("{base}/"))
            .await
            .expect("index response")
            .text()
            .await
            .expect("index body");

        assert!(body.contains("<!doctype html>"));
        assert!(body.contains("refreshTranscript"));
    }

    #[tokio::test]
    async fn transcript_is_escaped_and_carries_a_revision() {
        let base = serve_test().await;

        let response = reqwest::get(format!("{base}/view/transcript"))
            .await
            .expect("transcript response");
        let revision = response
            .headers()
            .get(REVISION_HEADER)
            .expect("revision header")
            .to_str()
            .expect("revision value")
            .to_owned();
        let body = response.text().await.expect("transcript body");

        assert!(revision.starts_with("general:"));
        assert!(body.contains(r#"<h1 class="view-title">#general</h1>"#));
        assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!body.contains("<script>alert(1)"));
    }

    #[tokio::test]
    async fn unknown_navigation_keeps_the_revision_stable() {
        let base = serve_test().await;
        let client = reqwest::Client::new();

        let before = client
            .get(format!("{base}/view/transcript"))
            .send()
            .await
            .expect("transcript before")
            .headers()
            .get(REVISION_HEADER)
            .expect("revision header")
            .to_str()
            .expect("revision value")
            .to_owned();

        let status = client
            .post(format!("{base}/nav/channel/nonexistent"))
            .send()
            .await
            .expect("nav response")
            .status();
        assert_eq!(status, reqwest::StatusCode::NO_CONTENT);

        let after = client
            .get(format!("{base}/view/transcript"))
            .send()
            .await
            .expect("transcript after")
            .headers()
            .get(REVISION_HEADER)
            .expect("revision header")
            .to_str()
            .expect("revision value")
            .to_owned();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn compose_appends_the_sent_message_to_the_transcript() {
        let base = serve_test().await;
        let client = reqwest::Client::new();

        let status = client
            .post(format!("{base}/compose"))
            .form(&[("text", "hello from the composer")])
            .send()
            .await
            .expect("compose response")
            .status();
        assert_eq!(status, reqwest::StatusCode::NO_CONTENT);

        let body = client
            .get(format!("{base}/view/transcript"))
            .send()
            .await
            .expect("transcript response")
            .text()
            .await
            .expect("transcript body");

        assert!(body.contains("hello from the composer"));
        assert!(body.contains(r#"data-id="srv-1""#));
    }

    #[tokio::test]
    async fn sidebar_lists_servers_and_connection_state() {
        let base = serve_test().await;

        let body = reqwest::get(format!("{base}/view/sidebar"))
            .await
            .expect("sidebar response")
            .text()
            .await
            .expect("sidebar body");

        assert!(body.contains(r#"data-server="home""#));
        assert!(body.contains(r#"class="channel active" data-channel="general""#));
        assert!(body.contains("connecting"));
    }
}
