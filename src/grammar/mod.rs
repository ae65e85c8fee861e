//! Command argument grammars and the keys that address their occurrences.

pub mod ident;
pub mod key;
pub mod node;

pub use ident::identifier;
pub use key::{ArgKey, KeyParseError, Marker, Segment};
pub use node::*;
