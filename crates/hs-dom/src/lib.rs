mod document;
mod events;
mod handle;
mod markup;
mod selector;

pub use document::Document;
pub use events::{DomEvent, ListenerId};
pub use handle::Dom;
pub use markup::{escape_text, parse_document};
pub use selector::{parse_selector_groups, SelectorGroup};
