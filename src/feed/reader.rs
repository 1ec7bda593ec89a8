//! Feed sources.

use crate::error::{PriceSyncError, Result};
use crate::feed::parser::{parse_line, FeedCommand};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Something that yields feed commands one at a time.
#[async_trait]
pub trait FeedSource: Send {
    /// Next command, or `None` at end of input
    async fn next_command(&mut self) -> Result<Option<FeedCommand>>;
}

/// Feed read line by line from any buffered async reader (file, stdin, in-memory bytes).
pub struct LineFeed<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R> LineFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// 1-based number of the last line read
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

#[async_trait]
impl<R> FeedSource for LineFeed<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_command(&mut self) -> Result<Option<FeedCommand>> {
        loop {
            let line = self.lines.next_line().await.map_err(|e| {
                PriceSyncError::feed(format!("failed after line {}", self.line_number), e)
            })?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_number += 1;

            if let Some(command) = parse_line(self.line_number, &line)? {
                return Ok(Some(command));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ResourceId;

    #[tokio::test]
    async fn test_skips_comments_and_counts_lines() {
        let script = "# header\n\nset R1 10\nget R1\n";
        let mut feed = LineFeed::new(script.as_bytes());

        assert_eq!(
            feed.next_command().await.unwrap(),
            Some(FeedCommand::Set {
                resource_id: ResourceId::new("R1"),
                price: 10.0
            })
        );
        assert_eq!(feed.line_number(), 3);
        assert!(matches!(
            feed.next_command().await.unwrap(),
            Some(FeedCommand::Get { .. })
        ));
        assert_eq!(feed.next_command().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reports_bad_line() {
        let mut feed = LineFeed::new("set R1 1\nbogus\n".as_bytes());
        feed.next_command().await.unwrap();
        assert!(matches!(
            feed.next_command().await,
            Err(PriceSyncError::InvalidCommand { line: 2, .. })
        ));
    }
}
