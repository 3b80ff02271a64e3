//! Line-oriented shell over one session and one cache
//!
//! Each line is either `<operation> [json params]` or a meta command
//! starting with `:`. The session and the cache live for the whole shell,
//! so repeated reads are served locally until they expire or a mutation
//! invalidates them.

use crate::commands::{parse_params, CommandError, Request};
use crate::output;
use deskbridge_core::{catalog, CachedClient};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "\
<operation> [json]   run an operation, e.g. search_gmail_messages {\"query\": \"invoice\"}
:stats               show cache statistics
:clear               drop every cached response
:fresh on|off        bypass the cache for reads
:ops                 list known operations
:help                show this help
:quit                leave the shell";

/// A parsed shell line
#[derive(Debug, Clone, PartialEq)]
pub enum ShellInput {
    Call(Request),
    Meta(Meta),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meta {
    Stats,
    Clear,
    Fresh(bool),
    Ops,
    Help,
    Quit,
}

/// Parse one line of shell input
pub fn parse_line(line: &str) -> Result<ShellInput, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(ShellInput::Empty);
    }

    if let Some(meta) = line.strip_prefix(':') {
        let mut words = meta.split_whitespace();
        let command = words.next().unwrap_or_default();
        let meta = match (command, words.next()) {
            ("stats", None) => Meta::Stats,
            ("clear", None) => Meta::Clear,
            ("fresh", Some("on")) => Meta::Fresh(true),
            ("fresh", Some("off")) => Meta::Fresh(false),
            ("fresh", _) => return Err(CommandError::Usage("usage: :fresh on|off".to_string())),
            ("ops", None) => Meta::Ops,
            ("help", None) => Meta::Help,
            ("quit" | "exit" | "q", None) => Meta::Quit,
            _ => return Err(CommandError::UnknownMeta(meta.trim().to_string())),
        };
        return Ok(ShellInput::Meta(meta));
    }

    let (operation, rest) = match line.split_once(char::is_whitespace) {
        Some((operation, rest)) => (operation, Some(rest)),
        None => (line, None),
    };
    let params = parse_params(rest)?;
    Ok(ShellInput::Call(Request::new(operation, params)))
}

pub struct Shell {
    client: Arc<CachedClient>,
    fresh: bool,
}

impl Shell {
    pub fn new(client: Arc<CachedClient>) -> Self {
        Self {
            client,
            fresh: false,
        }
    }

    /// Start with reads bypassing the cache
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Read lines until end of input or `:quit`
    ///
    /// Errors from individual lines are reported and the shell keeps going.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W, interactive: bool) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        loop {
            if interactive {
                eprint!("deskbridge> ");
            }

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_line(&line) {
                Ok(ShellInput::Empty) => {}
                Ok(ShellInput::Meta(Meta::Quit)) => break,
                Ok(ShellInput::Meta(meta)) => self.meta(meta, out).await?,
                Ok(ShellInput::Call(request)) => self.call(request, out).await?,
                Err(e) => writeln!(out, "error: {}", e)?,
            }
        }

        Ok(())
    }

    async fn call<W: Write>(&self, request: Request, out: &mut W) -> anyhow::Result<()> {
        let result = if self.fresh {
            self.client.call_fresh(&request.operation, request.params).await
        } else {
            self.client.call(&request.operation, request.params).await
        };

        match result {
            Ok(payload) => writeln!(out, "{}", payload.render())?,
            Err(e) => {
                tracing::debug!("{} failed: {:?}", request.operation, e);
                writeln!(out, "error: {}", e)?;
            }
        }
        Ok(())
    }

    async fn meta<W: Write>(&mut self, meta: Meta, out: &mut W) -> anyhow::Result<()> {
        match meta {
            Meta::Stats => {
                let stats = self.client.cache_stats().await;
                writeln!(out, "{}", stats)?;
                writeln!(
                    out,
                    "cache {}, fresh reads {}",
                    if self.client.is_cache_enabled() { "enabled" } else { "disabled" },
                    if self.fresh { "on" } else { "off" }
                )?;
            }
            Meta::Clear => {
                let dropped = self.client.clear_cache().await;
                writeln!(out, "dropped {} cached responses", dropped)?;
            }
            Meta::Fresh(on) => {
                self.fresh = on;
                writeln!(out, "fresh reads {}", if on { "on" } else { "off" })?;
            }
            Meta::Ops => output::write_operations(out, catalog::operations())?,
            Meta::Help => writeln!(out, "{}", HELP)?,
            Meta::Quit => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_call() {
        match parse_line(r#"search_gmail_messages {"query": "invoice"}"#).unwrap() {
            ShellInput::Call(request) => {
                assert_eq!(request.operation, "search_gmail_messages");
                assert_eq!(request.params["query"], json!("invoice"));
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_line("list_calendars").unwrap() {
            ShellInput::Call(request) => assert!(request.params.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_meta() {
        assert_eq!(parse_line(":stats").unwrap(), ShellInput::Meta(Meta::Stats));
        assert_eq!(parse_line("  :fresh on ").unwrap(), ShellInput::Meta(Meta::Fresh(true)));
        assert_eq!(parse_line(":fresh off").unwrap(), ShellInput::Meta(Meta::Fresh(false)));
        assert_eq!(parse_line(":quit").unwrap(), ShellInput::Meta(Meta::Quit));
        assert!(matches!(parse_line(":fresh maybe"), Err(CommandError::Usage(_))));
        assert!(matches!(parse_line(":reboot"), Err(CommandError::UnknownMeta(name)) if name == "reboot"));
    }

    #[test]
    fn test_parse_blank_and_comment() {
        assert_eq!(parse_line("").unwrap(), ShellInput::Empty);
        assert_eq!(parse_line("# warm the cache").unwrap(), ShellInput::Empty);
    }

    #[test]
    fn test_parse_bad_params() {
        assert!(parse_line("list_tasks [1]").is_err());
        assert!(parse_line("list_tasks {").is_err());
    }
}
