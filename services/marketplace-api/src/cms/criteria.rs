//! Optional list criteria for `GET /api/cms-pages`.
//!
//! Criteria are best-effort: the handler logs a [`CriteriaError`] and falls
//! back to [`PageCriteria::default`] instead of failing the request.
use crate::model::Page;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Slug,
    Title,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("unsupported orderBy column: {0}")]
    UnknownColumn(String),
    #[error("unsupported sortedBy direction: {0}")]
    UnknownDirection(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCriteria {
    pub search: Option<String>,
    pub order_by: SortField,
    pub direction: SortDirection,
}

impl PageCriteria {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, CriteriaError> {
        let search = query
            .get("search")
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());
        let order_by = match query.get("orderBy").map(|value| value.trim()) {
            None | Some("") | Some("id") => SortField::Id,
            Some("slug") => SortField::Slug,
            Some("title") => SortField::Title,
            Some("created_at") => SortField::CreatedAt,
            Some("updated_at") => SortField::UpdatedAt,
            Some(other) => return Err(CriteriaError::UnknownColumn(other.to_string())),
        };
        let direction = match query
            .get("sortedBy")
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(CriteriaError::UnknownDirection(other.to_string())),
        };
        Ok(Self {
            search,
            order_by,
            direction,
        })
    }

    /// Filter and order `pages`.
    pub fn apply(&self, pages: Vec<Page>) -> Vec<Page> {
        let mut pages: Vec<Page> = match &self.search {
            Some(needle) => pages
                .into_iter()
                .filter(|page| {
                    page.slug.to_lowercase().contains(needle)
                        || page.title.to_lowercase().contains(needle)
                })
                .collect(),
            None => pages,
        };
        pages.sort_by(|a, b| {
            let ordering = self.compare(a, b).then(a.id.cmp(&b.id));
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        pages
    }

    fn compare(&self, a: &Page, b: &Page) -> Ordering {
        match self.order_by {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Slug => a.slug.cmp(&b.slug),
            SortField::Title => a.title.cmp(&b.title),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}
