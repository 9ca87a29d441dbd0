//! Result items returned to the launcher.

use serde::Serialize;

/// What activating an action does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    CopyToClipboard { text: String },
    OpenUrl { url: String },
}

/// An action attached to a result item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: String,
    pub title: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn copy(id: &str, title: &str, text: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind: ActionKind::CopyToClipboard { text: text.into() },
        }
    }

    pub fn open_url(id: &str, title: &str, url: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind: ActionKind::OpenUrl { url: url.into() },
        }
    }
}

/// A list entry in the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    pub id: String,
    pub text: String,
    pub subtext: String,
    /// Freedesktop icon name
    pub icon: String,
    pub actions: Vec<Action>,
}

impl ResultItem {
    /// The action run when the item is activated
    pub fn default_action(&self) -> Option<&Action> {
        self.actions.first()
    }
}

/// A result item with its relevance for global queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankItem {
    pub item: ResultItem,
    pub score: f32,
}

impl RankItem {
    pub fn new(item: ResultItem, score: f32) -> Self {
        Self { item, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_action_is_first() {
        let item = ResultItem {
            id: "id".into(),
            text: "4".into(),
            subtext: "Result of 2+2".into(),
            icon: "accessories-calculator".into(),
            actions: vec![
                Action::copy("a", "First", "4"),
                Action::copy("b", "Second", "2+2 = 4"),
            ],
        };
        assert_eq!(item.default_action().unwrap().id, "a");
    }

    #[test]
    fn test_serialize_action_kind() {
        let action = Action::open_url("manual", "Visit documentation", "https://example.org");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"]["type"], "open_url");
        assert_eq!(json["kind"]["url"], "https://example.org");
    }
}
