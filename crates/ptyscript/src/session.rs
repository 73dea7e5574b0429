//! Sessions: one child, one transport, one conversation.
//!
//! # Examples
//!
//! ```no_run
//! use ptyscript::{Pattern, PatternSet, Session};
//!
//! # async fn demo() -> ptyscript::Result<()> {
//! let mut session = Session::spawn("/bin/sh", &[] as &[&str]).await?;
//!
//! let mut patterns = PatternSet::new();
//! patterns.add("$ ").add("# ").add(Pattern::timeout());
//!
//! let m = session.expect_any(&patterns).await?;
//! if m.pattern_index == 2 {
//!     println!("no prompt yet: {:?}", m.before);
//! }
//! session.send_line("exit").await?;
//! session.expect_eof().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod handle;

pub use builder::SessionBuilder;
pub use handle::Session;
