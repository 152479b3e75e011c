//! Tag derivation for content-change events.

use std::sync::Arc;

use crate::domain::{CacheTag, ContentChangeEvent, EntityKind, TagSet};

/// Caller-supplied transform run after the built-in rules.
pub type TagExtension = Arc<dyn Fn(&ContentChangeEvent, &mut TagSet) + Send + Sync>;

/// Converts a content-change event into the set of cache tags it affects.
///
/// | Entity | Tags |
/// |---|---|
/// | post-kind | `{kind}`, `{kind}-{id}`, `{taxonomy}-{term}` per assigned term |
/// | term | `{taxonomy}`, `term-{id}` |
/// | menu | `menu`, `menu-{id}` |
///
/// Event `extra_tags` and registered extensions are applied on top.
/// Derivation never fails and never returns an empty set.
#[derive(Clone, Default)]
pub struct TagDeriver {
    extensions: Vec<TagExtension>,
}

impl TagDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension<F>(mut self, extension: F) -> Self
    where
        F: Fn(&ContentChangeEvent, &mut TagSet) + Send + Sync + 'static,
    {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn derive(&self, event: &ContentChangeEvent) -> TagSet {
        let mut tags = builtin_tags(event);
        tags.extend(event.extra_tags.iter().cloned());

        for extension in &self.extensions {
            extension(event, &mut tags);
        }

        if tags.is_empty() {
            tags.insert_str(event.entity_kind.as_str());
        }
        tags
    }
}

fn builtin_tags(event: &ContentChangeEvent) -> TagSet {
    let mut tags = TagSet::new();
    let id = (event.entity_id > 0).then_some(event.entity_id);

    match event.entity_kind {
        EntityKind::Post => {
            let kind = event.content_kind.trim();
            tags.insert_str(kind);
            if let Some(id) = id {
                tags.insert_opt(CacheTag::joined(kind, id));
            }
            for term in &event.taxonomy_terms {
                tags.insert_opt(CacheTag::joined(&term.taxonomy, &term.slug));
            }
        }
        EntityKind::Term => {
            tags.insert_str(event.content_kind.trim());
            if let Some(id) = id {
                tags.insert_opt(CacheTag::joined("term", id));
            }
        }
        EntityKind::Menu => {
            tags.insert_str("menu");
            if let Some(id) = id {
                tags.insert_opt(CacheTag::joined("menu", id));
            }
        }
    }

    tags
}
