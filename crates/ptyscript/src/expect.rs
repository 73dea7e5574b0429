//! Expect pattern matching: pattern types, the accumulation buffer and the
//! matching engine the session drives.

mod buffer;
mod matcher;
mod pattern;

pub use buffer::AccumulationBuffer;
pub use matcher::{ExpectState, Matcher};
pub use pattern::{CompiledRegex, NamedPattern, Pattern, PatternMatch, PatternSet};
