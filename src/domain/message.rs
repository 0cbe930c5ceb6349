/// Identity of the logged-in user, used to classify bubbles as own/other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
}

/// A single chat message, either confirmed by the server or optimistically
/// rendered while a send is in flight (`pending = true`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub avatar_url: String,
    pub content: String,
    pub timestamp_seconds: i64,
    pub pending: bool,
}

const PREVIEW_MAX_CHARS: usize = 48;

impl Message {
    pub fn is_own(&self, identity: Option<&UserIdentity>) -> bool {
        match identity {
            Some(user) => self.author_id == user.id,
            // Missing identity degrades to "other" instead of guessing.
            None => false,
        }
    }

    /// Single-line preview for the DM sidebar.
    pub fn preview(&self) -> String {
        let flat = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= PREVIEW_MAX_CHARS {
            return flat;
        }

        let truncated: String = flat.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(author_id: &str, content: &str) -> Message {
        Message {
            id: "m1".to_owned(),
            author_id: author_id.to_owned(),
            author_name: "Alice".to_owned(),
            avatar_url: "https://cdn.example/a.png".to_owned(),
            content: content.to_owned(),
            timestamp_seconds: 1_700_000_000,
            pending: false,
        }
    }

    fn identity(id: &str) -> UserIdentity {
        UserIdentity {
            id: id.to_owned(),
            username: "me".to_owned(),
        }
    }

    #[test]
    fn classifies_own_message_by_author_id() {
        let msg = message("u1", "hi");

        assert!(msg.is_own(Some(&identity("u1"))));
        assert!(!msg.is_own(Some(&identity("u2"))));
    }

    #[test]
    fn missing_identity_classifies_everything_as_other() {
        let msg = message("u1", "hi");

        assert!(!msg.is_own(None));
    }

    #[test]
    fn preview_flattens_whitespace() {
        let msg = message("u1", "line one\nline  two");

        assert_eq!(msg.preview(), "line one line two");
    }

    #[test]
    fn preview_truncates_long_content() {
        let msg = message("u1", &"x".repeat(100));

        let preview = msg.preview();
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 1);
        assert!(preview.ends_with('…'));
    }
}
