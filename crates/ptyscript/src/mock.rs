//! Mock transport for testing expect scripts without spawning processes.
//!
//! ```
//! use ptyscript::Session;
//! use ptyscript::mock::MockBuilder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ptyscript::Result<()> {
//! let transport = MockBuilder::new().output("Login: ").eof().build();
//! let mut session = Session::new(transport, Default::default());
//! let m = session.expect("Login:").await?;
//! assert_eq!(m.pattern_index, 0);
//! # Ok(())
//! # }
//! ```

pub mod event;
mod transport;

pub use event::MockEvent;
pub use transport::{MockBuilder, MockTransport};

/// A transport that delivers `output` in one read, then end of stream.
#[must_use]
pub fn simple_mock(output: &str) -> MockTransport {
    MockBuilder::new().output(output).eof().build()
}

/// A transport that delivers each chunk in its own read, then end of
/// stream.
#[must_use]
pub fn chunked_mock<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> MockTransport {
    MockTransport::from_events(
        chunks
            .into_iter()
            .map(MockEvent::output)
            .chain(std::iter::once(MockEvent::Eof)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_queue_eof_last() {
        let transport = simple_mock("hi");
        assert_eq!(transport.pending_events(), 2);

        let transport = chunked_mock([&b"a"[..], &b"b"[..]]);
        assert_eq!(transport.pending_events(), 3);
    }
}
