//! Write-side validation for CMS pages.
//!
//! # Purpose
//! Turns an untrusted JSON body into a [`PageDraft`] or a per-field error
//! map. Every rule is checked and every failure reported, so a client sees
//! all problems in one response.
//!
//! # Key invariants
//! - Nothing is written when validation fails; callers only touch the store
//!   with a draft returned from here.
//! - Block errors are keyed by position, e.g. `content.1.order`.
//! - Malformed input produces errors, never a panic.
use crate::cms::path::derive_path;
use crate::model::{Block, Page, PageContent, PageDraft};
use crate::store::{PageStore, StoreError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Column width of the string fields in the pages table.
pub const MAX_STRING_LENGTH: usize = 191;

/// Field name to messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// First message overall, used as the summary line of an error response.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .find_map(|messages| messages.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum PageValidationError {
    #[error("the given data was invalid")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Optional field as sent by the client.
#[derive(Debug, Clone, PartialEq)]
enum Sent<T> {
    /// Key absent: an update keeps the stored value.
    Absent,
    /// Explicit `null`: the stored value is cleared.
    Null,
    Value(T),
}

/// Checked fields of a page write, before they are merged with a stored page.
#[derive(Debug, Clone, PartialEq)]
struct PageFields {
    slug: String,
    title: String,
    path: Option<String>,
    content: Sent<Vec<Block>>,
    meta: Sent<Map<String, Value>>,
}

impl PageFields {
    /// Build the draft for a new page (`current` is `None`) or for an update
    /// of `current`.
    ///
    /// A path is derived from the slug only when a page is created without
    /// one; an update without `path`, `content` or `meta` keeps what is stored.
    fn into_draft(self, current: Option<&Page>) -> PageDraft {
        let path = match (self.path, current) {
            (Some(path), _) => derive_path(&path),
            (None, Some(page)) => page.path.clone(),
            (None, None) => derive_path(&self.slug),
        };
        let content = match self.content {
            Sent::Absent => current.and_then(|page| page.content.clone()),
            Sent::Null => None,
            Sent::Value(blocks) => Some(PageContent::Blocks(blocks)),
        };
        let meta = match self.meta {
            Sent::Absent => current.map(|page| page.meta.clone()).unwrap_or_default(),
            Sent::Null => Map::new(),
            Sent::Value(meta) => meta,
        };
        PageDraft {
            slug: self.slug,
            path,
            title: self.title,
            content,
            meta,
        }
    }
}

fn check_fields(body: &Value) -> Result<PageFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = body.as_object() else {
        errors.add("body", "The request body must be a JSON object.");
        return Err(errors);
    };

    let slug = required_string(object, "slug", &mut errors);
    let title = required_string(object, "title", &mut errors);
    let path = optional_string(object, "path", &mut errors);
    let content = content_blocks(object.get("content"), &mut errors);
    let meta = match object.get("meta") {
        None => Some(Sent::Absent),
        Some(Value::Null) => Some(Sent::Null),
        Some(Value::Object(meta)) => Some(Sent::Value(meta.clone())),
        Some(_) => {
            errors.add("meta", "The meta must be an object.");
            None
        }
    };

    match (slug, title, path, content, meta) {
        (Some(slug), Some(title), Some(path), Some(content), Some(meta)) if errors.is_empty() => {
            Ok(PageFields {
                slug,
                title,
                path,
                content,
                meta,
            })
        }
        _ => Err(errors),
    }
}

/// Validate the shape of a new page.
///
/// A missing `path` is derived from the slug; an explicit one is normalized
/// to start with `/`.
pub fn validate_page(body: &Value) -> Result<PageDraft, ValidationErrors> {
    check_fields(body).map(|fields| fields.into_draft(None))
}

/// Full write validation: shape rules plus slug and path uniqueness.
///
/// `current` is the stored page when updating. Its own slug and path do not
/// count as taken, and fields absent from `body` keep their stored values.
pub async fn validate_page_write<S>(
    store: &S,
    body: &Value,
    current: Option<&Page>,
) -> Result<PageDraft, PageValidationError>
where
    S: PageStore + ?Sized,
{
    let except = current.map(|page| page.id);
    let shape = check_fields(body).map(|fields| fields.into_draft(current));
    let slug = match &shape {
        Ok(draft) => Some(draft.slug.as_str()),
        Err(_) => body.get("slug").and_then(Value::as_str).map(str::trim),
    };
    let mut errors = match &shape {
        Ok(_) => ValidationErrors::new(),
        Err(errors) => errors.clone(),
    };
    if let Some(slug) = slug.filter(|slug| !slug.is_empty()) {
        if store.slug_taken(slug, except).await? {
            errors.add("slug", "The slug has already been taken.");
        }
    }
    if let Ok(draft) = &shape {
        if store.path_taken(&draft.path, except).await? {
            errors.add("path", "The path has already been taken.");
        }
    }
    match shape {
        Ok(draft) if errors.is_empty() => Ok(draft),
        _ => Err(PageValidationError::Invalid(errors)),
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(Value::String(value)) => {
            let value = value.trim();
            if value.is_empty() {
                errors.add(field, format!("The {field} field is required."));
                None
            } else if too_long(value) {
                errors.add(field, max_length_message(field));
                None
            } else {
                Some(value.to_string())
            }
        }
        Some(_) => {
            errors.add(field, format!("The {field} must be a string."));
            None
        }
    }
}

/// `Some(None)` when the field is absent, `None` when it is invalid.
fn optional_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(value)) => {
            let value = value.trim();
            if value.is_empty() {
                Some(None)
            } else if too_long(value) {
                errors.add(field, max_length_message(field));
                None
            } else {
                Some(Some(value.to_string()))
            }
        }
        Some(_) => {
            errors.add(field, format!("The {field} must be a string."));
            None
        }
    }
}

fn content_blocks(
    content: Option<&Value>,
    errors: &mut ValidationErrors,
) -> Option<Sent<Vec<Block>>> {
    let items = match content {
        None => return Some(Sent::Absent),
        Some(Value::Null) => return Some(Sent::Null),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("content", "The content must be an array.");
            return None;
        }
    };

    let mut blocks = Vec::with_capacity(items.len());
    let mut valid = true;
    for (index, item) in items.iter().enumerate() {
        match block_at(index, item, errors) {
            Some(block) => blocks.push(block),
            None => valid = false,
        }
    }
    valid.then_some(Sent::Value(blocks))
}

fn block_at(index: usize, item: &Value, errors: &mut ValidationErrors) -> Option<Block> {
    let prefix = format!("content.{index}");
    let Some(object) = item.as_object() else {
        errors.add(prefix.clone(), format!("The {prefix} must be an object."));
        return None;
    };

    let type_field = format!("{prefix}.type");
    let kind = match object.get("type") {
        None | Some(Value::Null) => {
            errors.add(type_field.clone(), format!("The {type_field} field is required."));
            None
        }
        Some(Value::String(kind)) if kind.trim().is_empty() => {
            errors.add(type_field.clone(), format!("The {type_field} field is required."));
            None
        }
        Some(Value::String(kind)) => Some(kind.trim().to_string()),
        Some(_) => {
            errors.add(type_field.clone(), format!("The {type_field} must be a string."));
            None
        }
    };

    let order_field = format!("{prefix}.order");
    let order = match object.get("order") {
        None | Some(Value::Null) => {
            errors.add(order_field.clone(), format!("The {order_field} field is required."));
            None
        }
        Some(value) => match value.as_i64() {
            Some(order) => Some(order),
            None => {
                errors.add(order_field.clone(), format!("The {order_field} must be an integer."));
                None
            }
        },
    };

    let props_field = format!("{prefix}.props");
    let props = match object.get("props") {
        None | Some(Value::Null) => Some(None),
        Some(Value::Object(props)) => Some(Some(props.clone())),
        Some(_) => {
            errors.add(props_field.clone(), format!("The {props_field} must be an object."));
            None
        }
    };

    Some(Block {
        kind: kind?,
        order: order?,
        props: props?,
    })
}

fn too_long(value: &str) -> bool {
    value.chars().count() > MAX_STRING_LENGTH
}

fn max_length_message(field: &str) -> String {
    format!("The {field} may not be greater than {MAX_STRING_LENGTH} characters.")
}
