//! Wire types shared between headwind, the host CMS that notifies it, and the
//! frontend that consumes its webhooks and preview endpoint.

use serde::{Deserialize, Serialize};

/// Kind of entity a content change refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Post,
    Term,
    Menu,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Term => "term",
            Self::Menu => "menu",
        }
    }
}

/// Whether the entity was written or removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    #[default]
    Upsert,
    Delete,
}

/// A taxonomy term currently assigned to a post-kind entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub taxonomy: String,
    pub slug: String,
}

impl TaxonomyTerm {
    pub fn new(taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            slug: slug.into(),
        }
    }
}

/// Content-change notification produced by the host CMS.
///
/// `content_kind` is the post type (`post`, `page`, custom types) for
/// post-kind entities and the taxonomy name for term entities. Every field
/// except the entity kind is optional on the wire so a partial event still
/// yields whatever tags it can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangeEvent {
    pub entity_kind: EntityKind,
    #[serde(default)]
    pub entity_id: i64,
    #[serde(default)]
    pub content_kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub action: ChangeAction,
    #[serde(default)]
    pub is_autosave: bool,
    #[serde(default)]
    pub is_revision: bool,
    #[serde(default)]
    pub taxonomy_terms: Vec<TaxonomyTerm>,
    /// Caller-supplied tags passed through to the webhook unchanged.
    /// Empty strings are dropped; nothing else is trimmed or rewritten.
    #[serde(default)]
    pub extra_tags: Vec<String>,
}

impl ContentChangeEvent {
    /// Post-kind upsert with no terms attached.
    pub fn post(content_kind: impl Into<String>, entity_id: i64, status: impl Into<String>) -> Self {
        Self {
            entity_kind: EntityKind::Post,
            entity_id,
            content_kind: content_kind.into(),
            status: status.into(),
            action: ChangeAction::Upsert,
            is_autosave: false,
            is_revision: false,
            taxonomy_terms: Vec::new(),
            extra_tags: Vec::new(),
        }
    }

    pub fn term(taxonomy: impl Into<String>, term_id: i64) -> Self {
        Self {
            entity_kind: EntityKind::Term,
            entity_id: term_id,
            content_kind: taxonomy.into(),
            status: String::new(),
            action: ChangeAction::Upsert,
            is_autosave: false,
            is_revision: false,
            taxonomy_terms: Vec::new(),
            extra_tags: Vec::new(),
        }
    }

    pub fn menu(menu_id: i64) -> Self {
        Self {
            entity_kind: EntityKind::Menu,
            entity_id: menu_id,
            content_kind: String::new(),
            status: String::new(),
            action: ChangeAction::Upsert,
            is_autosave: false,
            is_revision: false,
            taxonomy_terms: Vec::new(),
            extra_tags: Vec::new(),
        }
    }

    pub fn with_term(mut self, taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        self.taxonomy_terms.push(TaxonomyTerm::new(taxonomy, slug));
        self
    }

    pub fn with_extra_tag(mut self, tag: impl Into<String>) -> Self {
        self.extra_tags.push(tag.into());
        self
    }

    pub fn deleted(mut self) -> Self {
        self.action = ChangeAction::Delete;
        self
    }

    pub fn is_post(&self) -> bool {
        self.entity_kind == EntityKind::Post
    }

    pub fn is_deletion(&self) -> bool {
        self.action == ChangeAction::Delete
    }
}

/// Body of `POST /hooks/content`: a single event or a batch.
///
/// A batch is handled as one unit of work, so it triggers at most one CDN
/// purge no matter how many events it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentHookRequest {
    Batch { events: Vec<ContentChangeEvent> },
    Single(ContentChangeEvent),
}

impl ContentHookRequest {
    pub fn into_events(self) -> Vec<ContentChangeEvent> {
        match self {
            Self::Batch { events } => events,
            Self::Single(event) => vec![event],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentHookResponse {
    pub accepted: usize,
    pub tags: Vec<String>,
}

/// JSON body of the frontend revalidation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidationRequest {
    pub tags: Vec<String>,
    pub secret: String,
}

/// Body accepted by the CDN purge endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CdnPurgeRequest {
    pub purge_everything: bool,
}

/// Query string or JSON body for `/preview/verify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewVerifyRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewErrorCode {
    MissingToken,
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewVerifyResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PreviewErrorCode>,
}

impl PreviewVerifyResponse {
    pub fn valid(entity_id: i64) -> Self {
        Self {
            valid: true,
            entity_id: Some(entity_id),
            error: None,
        }
    }

    pub fn rejected(code: PreviewErrorCode) -> Self {
        Self {
            valid: false,
            entity_id: None,
            error: Some(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_accepts_camel_case_with_defaults() {
        let json = r#"{"entityKind":"post","entityId":42,"contentKind":"post","status":"publish"}"#;
        let event: ContentChangeEvent = serde_json::from_str(json).expect("event should parse");

        assert_eq!(event.entity_kind, EntityKind::Post);
        assert_eq!(event.entity_id, 42);
        assert_eq!(event.action, ChangeAction::Upsert);
        assert!(event.taxonomy_terms.is_empty());
        assert!(!event.is_autosave);
    }

    #[test]
    fn hook_request_distinguishes_batch_from_single() {
        let single: ContentHookRequest =
            serde_json::from_str(r#"{"entityKind":"menu","entityId":3}"#).expect("single");
        assert_eq!(single.into_events().len(), 1);

        let batch: ContentHookRequest = serde_json::from_str(
            r#"{"events":[{"entityKind":"menu","entityId":3},{"entityKind":"term","entityId":9,"contentKind":"category"}]}"#,
        )
        .expect("batch");
        assert_eq!(batch.into_events().len(), 2);
    }

    #[test]
    fn verify_response_omits_absent_fields() {
        let body = serde_json::to_value(PreviewVerifyResponse::rejected(
            PreviewErrorCode::InvalidToken,
        ))
        .expect("serialize");

        assert_eq!(
            body,
            serde_json::json!({"valid": false, "error": "invalid_token"})
        );

        let body = serde_json::to_value(PreviewVerifyResponse::valid(42)).expect("serialize");
        assert_eq!(body, serde_json::json!({"valid": true, "entityId": 42}));
    }
}
