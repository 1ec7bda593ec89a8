//! Price feed scripts.
//!
//! A feed is a line-oriented script of hub operations, used by the `price-sync` binary
//! to replay a session:
//!
//! ```text
//! # seed the analysis
//! set cement 20.5
//! watch cement
//! set cement 21
//! get cement
//! flush
//! ```

pub mod parser;
pub mod reader;

pub use parser::{parse_line, FeedCommand};
pub use reader::{FeedSource, LineFeed};
