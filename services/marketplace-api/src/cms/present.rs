//! Read-side presentation of pages.
use crate::model::{Block, Page, PageContent, PresentedPage};

/// Blocks ordered ascending by `order`; equal orders keep submission order.
pub fn sort_blocks(blocks: &[Block]) -> Vec<Block> {
    let mut sorted = blocks.to_vec();
    // `sort_by_key` is a stable sort.
    sorted.sort_by_key(|block| block.order);
    sorted
}

/// Build the response view of `page`.
///
/// Structured content is returned in display order; opaque or absent content
/// passes through unchanged.
pub fn present(page: &Page) -> PresentedPage {
    let content = page.content.as_ref().map(|content| match content {
        PageContent::Blocks(blocks) => PageContent::Blocks(sort_blocks(blocks)),
        PageContent::Opaque(value) => PageContent::Opaque(value.clone()),
    });
    PresentedPage {
        id: page.id,
        slug: page.slug.clone(),
        path: page.path.clone(),
        title: page.title.clone(),
        content,
        meta: page.meta.clone(),
        created_at: page.created_at,
        updated_at: page.updated_at,
    }
}
