pub mod extractor;

pub use extractor::{ElementDescriptor, extract_elements, flatten_page_source};
