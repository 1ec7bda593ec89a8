//! Parsing of single feed lines.

use crate::error::{PriceSyncError, Result};
use crate::hub::{Price, ResourceId};

/// One operation of a feed script.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    /// `set <id> <price>`
    Set { resource_id: ResourceId, price: Price },
    /// `get <id>`
    Get { resource_id: ResourceId },
    /// `watch <id>`
    Watch { resource_id: ResourceId },
    /// `unwatch <id>`
    Unwatch { resource_id: ResourceId },
    /// `flush`
    Flush,
    /// `dump`
    Dump,
}

/// Parse one script line. Blank lines and `#` comments yield `Ok(None)`.
///
/// `line_number` is 1-based and only used for error messages. Prices that parse as
/// numbers are accepted even when negative: the hub decides what to do with them.
pub fn parse_line(line_number: usize, line: &str) -> Result<Option<FeedCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let expect_args = |count: usize| -> Result<()> {
        if args.len() == count {
            Ok(())
        } else {
            Err(PriceSyncError::invalid_command(
                line_number,
                format!("'{verb}' takes {count} argument(s), got {}", args.len()),
            ))
        }
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "set" => {
            expect_args(2)?;
            let price = args[1].parse::<Price>().map_err(|_| {
                PriceSyncError::invalid_command(line_number, format!("bad price '{}'", args[1]))
            })?;
            FeedCommand::Set {
                resource_id: ResourceId::new(args[0]),
                price,
            }
        }
        "get" => {
            expect_args(1)?;
            FeedCommand::Get {
                resource_id: ResourceId::new(args[0]),
            }
        }
        "watch" => {
            expect_args(1)?;
            FeedCommand::Watch {
                resource_id: ResourceId::new(args[0]),
            }
        }
        "unwatch" => {
            expect_args(1)?;
            FeedCommand::Unwatch {
                resource_id: ResourceId::new(args[0]),
            }
        }
        "flush" => {
            expect_args(0)?;
            FeedCommand::Flush
        }
        "dump" => {
            expect_args(0)?;
            FeedCommand::Dump
        }
        other => {
            return Err(PriceSyncError::invalid_command(
                line_number,
                format!("unknown verb '{other}'"),
            ))
        }
    };

    Ok(Some(command))
}
