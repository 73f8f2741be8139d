//! Content module - sanitizing, splitting and rendering article content

mod article;
pub mod blocks;
pub mod dom;
pub mod interleave;
pub mod listing;
pub mod paste;
pub mod render;
pub mod sanitize;
mod slug;

pub use article::{object_name, Article, ArticleDraft, ImageRef};
pub use blocks::Block;
pub use interleave::ImageSlot;
pub use listing::{BlogListing, Category, ListingFilter};
pub use paste::ContentDocument;
pub use render::{render_article, RenderedArticle};
pub use sanitize::sanitize;
pub use self::slug::{derive_slug, is_url_safe, SlugResolver};
