//! Strings that remember where every byte came from.
//!
//! A [`TraceableString`] pairs its content with an ordered list of
//! [`OriginRange`] records. Slicing and concatenation keep those records
//! consistent, so after any sequence of deletions, replacements and
//! insertions each byte of the result can still be traced back to the file
//! and offset it was read from.

pub mod error;
pub mod origin;
pub mod range;
pub mod traceable;

pub use error::{TraceError, TraceResult};
pub use origin::{Origin, OriginRange};
pub use range::Range;
pub use traceable::{SourcePosition, TraceableString};
