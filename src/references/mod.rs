pub mod builder;
pub mod resolver;
pub mod store;

pub use builder::{extract_wiki_links, ReferenceIndex, ReferenceIndexBuilder};
pub use resolver::{LinkResolver, LinkTarget};
pub use store::ReferenceIndexStore;
