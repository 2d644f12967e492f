//! Package catalogue: command modules compiled into the binary

mod net;
mod system;
mod text;

#[cfg(test)]
pub(crate) mod testing;

pub use net::{Fetch, Ping};
pub use system::{Fib, Inbox, Msg};
pub use text::{Grep, Head, Sha256Sum, Sort, Upper, Wc};

use crate::{CommandContext, CommandModule};
use kernel_api::ShellError;

/// Every package that can be installed
pub fn catalogue() -> Vec<Box<dyn CommandModule>> {
    vec![
        Box::new(Wc),
        Box::new(Grep),
        Box::new(Upper),
        Box::new(Head),
        Box::new(Sort),
        Box::new(Sha256Sum),
        Box::new(Fib),
        Box::new(Msg),
        Box::new(Inbox),
        Box::new(Ping),
        Box::new(Fetch),
    ]
}

/// Splits `-x` style flags from operands; `--` ends flag parsing
pub(crate) fn split_flags(args: &[String]) -> (Vec<&str>, Vec<&str>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut only_operands = false;
    for arg in args {
        if only_operands {
            operands.push(arg.as_str());
        } else if arg == "--" {
            only_operands = true;
        } else if arg.len() > 1 && arg.starts_with('-') {
            flags.push(arg.as_str());
        } else {
            operands.push(arg.as_str());
        }
    }
    (flags, operands)
}

/// Lines of the named files, or of stdin when no file is named
pub(crate) fn input_lines(
    files: &[&str],
    ctx: &CommandContext<'_>,
) -> Result<Vec<String>, ShellError> {
    if files.is_empty() {
        return Ok(ctx.stdin_lines());
    }
    let mut lines = Vec::new();
    for file in files {
        lines.extend(ctx.read_file(file)?.lines().map(String::from));
    }
    Ok(lines)
}

/// `None` for empty output so the stage contributes nothing
pub(crate) fn non_empty(lines: Vec<String>) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_flags() {
        let args: Vec<String> = ["-n", "3", "--", "-x", "f"].iter().map(|s| s.to_string()).collect();
        let (flags, operands) = split_flags(&args);
        assert_eq!(flags, vec!["-n"]);
        assert_eq!(operands, vec!["3", "-x", "f"]);
    }

    #[test]
    fn test_lone_dash_is_operand() {
        let args = vec!["-".to_string()];
        let (flags, operands) = split_flags(&args);
        assert!(flags.is_empty());
        assert_eq!(operands, vec!["-"]);
    }

    #[test]
    fn test_catalogue_names_are_unique() {
        let mut names: Vec<&str> = catalogue().iter().map(|m| m.name()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
