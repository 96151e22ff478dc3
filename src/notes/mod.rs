//! Note index: filesystem scanner, cached index, folder taxonomy

pub mod index;
pub mod scanner;
pub mod taxonomy;

pub use index::NoteIndexCache;
pub use taxonomy::derive_taxonomy;
