//! Network clients over the simulated network

use crate::{CommandContext, CommandModule};
use kernel_api::ShellError;

const DEFAULT_PING_COUNT: u32 = 4;
const MAX_PING_COUNT: u32 = 100;

/// Takes the value following `flag`, removing both from `args`
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, ShellError> {
    let Some(index) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err(ShellError::InvalidInput(format!(
            "option {} needs a value",
            flag
        )));
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Ok(Some(value))
}

/// Measures round-trip latency to a host
pub struct Ping;

impl CommandModule for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "check that a host is reachable"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let mut args = args.to_vec();
        let count = match take_option(&mut args, "-c")? {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|c| (1..=MAX_PING_COUNT).contains(c))
                .ok_or_else(|| {
                    ShellError::InvalidInput(format!("ping: invalid count '{}'", raw))
                })?,
            None => DEFAULT_PING_COUNT,
        };
        let host = match args.as_slice() {
            [host] => host.clone(),
            _ => {
                return Err(ShellError::InvalidInput(
                    "usage: ping <host> [-c count]".to_string(),
                ))
            }
        };

        let mut lines = vec![format!("PING {}", host)];
        let mut total = 0;
        for seq in 1..=count {
            let latency = ctx.ping(&host)?;
            total += latency;
            lines.push(format!("reply from {}: seq={} time={}ms", host, seq, latency));
        }
        lines.push(format!(
            "{} packets transmitted, {} received, avg {}ms",
            count,
            count,
            total / u64::from(count)
        ));
        Ok(Some(lines.join("\n")))
    }
}

/// Downloads a document
pub struct Fetch;

impl CommandModule for Fetch {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn description(&self) -> &'static str {
        "download a URL to stdout or a file"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let mut args = args.to_vec();
        let output = take_option(&mut args, "-o")?;
        let url = match args.as_slice() {
            [url] => url.clone(),
            _ => {
                return Err(ShellError::InvalidInput(
                    "usage: fetch <url> [-o file]".to_string(),
                ))
            }
        };

        let body = ctx.fetch(&url)?;
        match output {
            Some(path) => {
                ctx.write(&path, &body)?;
                Ok(Some(format!("saved {} bytes to {}", body.len(), path)))
            }
            None => Ok(Some(body)),
        }
    }
}
