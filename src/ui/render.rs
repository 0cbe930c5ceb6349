//! HTML fragment rendering for the dashboard.
//!
//! Every function here is pure: state in, markup out. All user-controlled
//! text passes through [`escape_html`] before it reaches the page.

use chrono::DateTime;

use crate::domain::{
    directory::ServerDirectory,
    dm_list::{DmListState, DmListUiState},
    events::ConnectionStatus,
    message::{Message, UserIdentity},
    navigation::NavigationState,
    stream::{MessageStream, StreamUiState},
};

/// Escapes text for safe interpolation into HTML content and attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_time(timestamp_seconds: i64) -> String {
    match DateTime::from_timestamp(timestamp_seconds, 0) {
        Some(moment) => moment.format("%H:%M").to_string(),
        None => String::new(),
    }
}

/// Renders one message bubble. Own messages get the `own` class so the
/// stylesheet can right-align them; pending ones carry a sending marker.
pub fn render_message(message: &Message, is_own: bool) -> String {
    let side = if is_own { "own" } else { "other" };
    let pending = if message.pending { " pending" } else { "" };
    let marker = if message.pending {
        r#"<span class="sending">sending…</span>"#
    } else {
        ""
    };
    let avatar = if message.avatar_url.is_empty() {
        String::new()
    } else {
        format!(
            r#"<img class="avatar" src="{}" alt="">"#,
            escape_html(&message.avatar_url)
        )
    };

    format!(
        concat!(
            r#"<div class="message {side}{pending}" data-id="{id}">"#,
            "{avatar}",
            r#"<div class="body">"#,
            r#"<span class="author">{author}</span>"#,
            r#"<span class="time">{time}</span>"#,
            r#"<p class="content">{content}</p>"#,
            "{marker}",
            "</div></div>"
        ),
        side = side,
        pending = pending,
        id = escape_html(&message.id),
        avatar = avatar,
        author = escape_html(&message.author_name),
        time = format_time(message.timestamp_seconds),
        content = escape_html(&message.content),
        marker = marker,
    )
}

/// Renders the shared message view for whichever stream is active.
pub fn render_transcript(
    stream: Option<&MessageStream>,
    identity: Option<&UserIdentity>,
) -> String {
    let Some(stream) = stream else {
        return placeholder("Pick a channel or conversation to start reading.");
    };

    match stream.ui_state() {
        StreamUiState::Loading => placeholder("Loading messages…"),
        StreamUiState::Error => placeholder("Couldn't load messages. Try again in a moment."),
        StreamUiState::Ready => {
            if stream.messages().is_empty() {
                return placeholder("No messages yet. Say hello!");
            }

            let mut html = String::from(r#"<div class="transcript">"#);
            for message in stream.messages() {
                html.push_str(&render_message(message, message.is_own(identity)));
            }
            html.push_str("</div>");
            html
        }
    }
}

/// Renders the transcript heading, empty when nothing is selected.
pub fn render_view_title(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(r#"<h1 class="view-title">{}</h1>"#, escape_html(title))
    }
}

fn placeholder(text: &str) -> String {
    format!(r#"<div class="placeholder">{}</div>"#, escape_html(text))
}

/// Renders the navigation sidebar: servers with their channels, then DM
/// conversations with unread badges, then the connection indicator.
pub fn render_sidebar(
    directory: &ServerDirectory,
    nav: &NavigationState,
    dm_list: &DmListState,
    connection: ConnectionStatus,
) -> String {
    let mut html = String::from(r#"<nav class="sidebar">"#);

    for server in directory.servers() {
        let server_class = if nav.current_server_id() == server.id {
            "server active"
        } else {
            "server"
        };
        html.push_str(&format!(
            r#"<section class="{}" data-server="{}"><h2>{}</h2><ul>"#,
            server_class,
            escape_html(&server.id),
            escape_html(&server.name),
        ));
        for channel in &server.channels {
            let class = if nav.is_channel_active(&server.id, &channel.id) {
                "channel active"
            } else {
                "channel"
            };
            html.push_str(&format!(
                r#"<li class="{}" data-channel="{}">#{}</li>"#,
                class,
                escape_html(&channel.id),
                escape_html(&channel.name),
            ));
        }
        html.push_str("</ul></section>");
    }

    html.push_str(r#"<section class="dms"><h2>Direct Messages</h2>"#);
    match dm_list.ui_state() {
        DmListUiState::Loading => html.push_str(&placeholder("Loading conversations…")),
        DmListUiState::Error => html.push_str(&placeholder("Couldn't load conversations.")),
        DmListUiState::Empty => html.push_str(&placeholder("No conversations yet.")),
        DmListUiState::Ready => {
            html.push_str("<ul>");
            for entry in dm_list.entries() {
                let class = if nav.is_dm_active(&entry.conversation.id) {
                    "dm active"
                } else {
                    "dm"
                };
                let badge = if entry.unread > 0 {
                    format!(r#"<span class="unread">{}</span>"#, entry.unread)
                } else {
                    String::new()
                };
                let preview = entry
                    .preview
                    .as_deref()
                    .map(|text| format!(r#"<span class="preview">{}</span>"#, escape_html(text)))
                    .unwrap_or_default();
                html.push_str(&format!(
                    r#"<li class="{}" data-dm="{}"><span class="name">{}</span>{}{}</li>"#,
                    class,
                    escape_html(&entry.conversation.id),
                    escape_html(&entry.conversation.other_user.username),
                    preview,
                    badge,
                ));
            }
            html.push_str("</ul>");
        }
    }
    html.push_str("</section>");

    html.push_str(&format!(
        r#"<footer class="connection {}">{}</footer>"#,
        connection.as_label(),
        connection.as_label(),
    ));
    html.push_str("</nav>");
    html
}
