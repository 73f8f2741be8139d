//! Helper functions
//!
//! Small formatting and validation helpers shared by the templates, the
//! notification function and the admin services.

mod date;
mod html;
mod url;
mod validate;

pub use date::*;
pub use html::*;
pub use url::*;
pub use validate::*;
