//! Line-oriented text filters

use super::{input_lines, non_empty, split_flags};
use crate::{CommandContext, CommandModule};
use kernel_api::ShellError;
use sha2::{Digest, Sha256};

const DEFAULT_HEAD_LINES: usize = 10;

fn unknown_flag(command: &str, flag: &str) -> ShellError {
    ShellError::InvalidInput(format!("{}: unknown option '{}'", command, flag))
}

/// Counts lines, words and characters
pub struct Wc;

impl CommandModule for Wc {
    fn name(&self) -> &'static str {
        "wc"
    }

    fn description(&self) -> &'static str {
        "count lines, words and characters"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (flags, files) = split_flags(args);
        let lines = input_lines(&files, ctx)?;

        let line_count = lines.len();
        let word_count: usize = lines.iter().map(|l| l.split_whitespace().count()).sum();
        let char_count: usize = lines.iter().map(|l| l.chars().count()).sum();

        let mut counts = Vec::new();
        for flag in &flags {
            match *flag {
                "-l" => counts.push(line_count),
                "-w" => counts.push(word_count),
                "-c" => counts.push(char_count),
                other => return Err(unknown_flag("wc", other)),
            }
        }
        if counts.is_empty() {
            counts = vec![line_count, word_count, char_count];
        }

        let rendered: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
        Ok(Some(rendered.join(" ")))
    }
}

/// Keeps lines containing a pattern
pub struct Grep;

impl CommandModule for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "print lines matching a pattern"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (flags, operands) = split_flags(args);
        let mut ignore_case = false;
        let mut invert = false;
        let mut count_only = false;
        for flag in flags {
            match flag {
                "-i" => ignore_case = true,
                "-v" => invert = true,
                "-c" => count_only = true,
                other => return Err(unknown_flag("grep", other)),
            }
        }

        let (pattern, files) = operands.split_first().ok_or_else(|| {
            ShellError::InvalidInput("usage: grep [-i] [-v] [-c] <pattern> [file...]".to_string())
        })?;
        let needle = if ignore_case {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };

        let matched: Vec<String> = input_lines(files, ctx)?
            .into_iter()
            .filter(|line| {
                let hit = if ignore_case {
                    line.to_lowercase().contains(&needle)
                } else {
                    line.contains(&needle)
                };
                hit != invert
            })
            .collect();

        if count_only {
            return Ok(Some(matched.len().to_string()));
        }
        Ok(non_empty(matched))
    }
}

/// Uppercases its input
pub struct Upper;

impl CommandModule for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn description(&self) -> &'static str {
        "convert text to upper case"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let lines = if ctx.stdin().is_empty() && !args.is_empty() {
            vec![args.join(" ")]
        } else {
            ctx.stdin_lines()
        };
        Ok(non_empty(lines.iter().map(|l| l.to_uppercase()).collect()))
    }
}

/// First lines of the input
pub struct Head;

impl Head {
    fn parse_count(raw: &str) -> Result<usize, ShellError> {
        raw.parse()
            .map_err(|_| ShellError::InvalidInput(format!("head: invalid line count '{}'", raw)))
    }
}

impl CommandModule for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn description(&self) -> &'static str {
        "output the first lines of input"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let mut count = DEFAULT_HEAD_LINES;
        let mut files = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-n" {
                let raw = iter.next().ok_or_else(|| {
                    ShellError::InvalidInput("head: option -n needs a value".to_string())
                })?;
                count = Self::parse_count(raw)?;
            } else if let Some(raw) = arg.strip_prefix('-').filter(|r| !r.is_empty()) {
                count = Self::parse_count(raw)?;
            } else {
                files.push(arg.as_str());
            }
        }

        let lines = input_lines(&files, ctx)?;
        Ok(non_empty(lines.into_iter().take(count).collect()))
    }
}

/// Sorts lines
pub struct Sort;

impl CommandModule for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn description(&self) -> &'static str {
        "sort lines of text"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (flags, files) = split_flags(args);
        let mut reverse = false;
        let mut unique = false;
        let mut numeric = false;
        for flag in flags {
            match flag {
                "-r" => reverse = true,
                "-u" => unique = true,
                "-n" => numeric = true,
                other => return Err(unknown_flag("sort", other)),
            }
        }

        let mut lines = input_lines(&files, ctx)?;
        if numeric {
            // Non-numeric lines sort first, as zero would.
            let key = |line: &String| line.trim().parse::<f64>().unwrap_or(0.0);
            lines.sort_by(|a, b| key(a).total_cmp(&key(b)).then_with(|| a.cmp(b)));
        } else {
            lines.sort();
        }
        if unique {
            lines.dedup();
        }
        if reverse {
            lines.reverse();
        }
        Ok(non_empty(lines))
    }
}

/// SHA-256 digests of files or stdin
pub struct Sha256Sum;

fn digest_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

impl CommandModule for Sha256Sum {
    fn name(&self) -> &'static str {
        "sha256sum"
    }

    fn description(&self) -> &'static str {
        "compute SHA-256 checksums"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (_, files) = split_flags(args);
        if files.is_empty() {
            let content = ctx.stdin_lines().join("\n");
            return Ok(Some(format!("{}  -", digest_hex(&content))));
        }

        let mut sums = Vec::with_capacity(files.len());
        for file in files {
            let content = ctx.read_file(file)?;
            sums.push(format!("{}  {}", digest_hex(&content), file));
        }
        Ok(non_empty(sums))
    }
}
