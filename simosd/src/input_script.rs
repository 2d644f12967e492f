//! # Input Script Parser
//!
//! Provides a simple scripted input format for deterministic runs and demos.
//!
//! ## Format
//!
//! Scripts are line-based, with each line representing one input action:
//! - Key names: `Enter`, `Escape`, `Backspace`, `Tab`, `Space`
//! - Arrow keys: `Up`, `Down`, `Left`, `Right`
//! - Single characters: `a`, `A`, `7`
//! - Modifiers: `Ctrl+z`, `Ctrl+c`, `Alt+x`
//! - Text strings: `"echo hello"` (expanded to individual key presses)
//! - Comments: `# This is a comment`
//! - Delays: `wait 100ms`, `wait 2s` (advance the simulated clock)
//!
//! ## Example
//!
//! ```text
//! # Start a sleeper and stop it
//! "sleep 30"
//! Enter
//! Ctrl+z
//! "jobs"
//! Enter
//! wait 2s
//! ```

use input_types::{KeyCode, KeyEvent, Modifiers};
use std::collections::VecDeque;
use thiserror::Error;

/// Input script error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputScriptError {
    #[error("Invalid key name: {0}")]
    InvalidKeyName(String),

    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,

    #[error("Invalid delay format: {0}")]
    InvalidDelay(String),
}

/// A single scripted input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedInput {
    /// A single key press
    Key(KeyEvent),
    /// Advance the clock (in milliseconds)
    Wait(u64),
}

/// Input script
///
/// Parses and provides scripted input events for deterministic runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputScript {
    inputs: VecDeque<ScriptedInput>,
}

impl InputScript {
    /// Creates a new empty input script
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, InputScriptError> {
        let mut inputs = VecDeque::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            inputs.extend(Self::parse_line(line, line_num + 1)?);
        }

        if inputs.is_empty() {
            return Err(InputScriptError::EmptyScript);
        }

        Ok(Self { inputs })
    }

    fn parse_line(line: &str, line_num: usize) -> Result<Vec<ScriptedInput>, InputScriptError> {
        if let Some(duration) = line.strip_prefix("wait ") {
            let millis = Self::parse_duration(duration).map_err(|e| InputScriptError::ParseError {
                line: line_num,
                message: e.to_string(),
            })?;
            return Ok(vec![ScriptedInput::Wait(millis)]);
        }

        if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
            let text = &line[1..line.len() - 1];
            return Ok(text
                .chars()
                .map(|c| ScriptedInput::Key(KeyEvent::char(c)))
                .collect());
        }

        let (modifiers, key_name) = Self::parse_modifiers(line)?;
        let code = KeyCode::from_name(key_name).ok_or_else(|| InputScriptError::ParseError {
            line: line_num,
            message: InputScriptError::InvalidKeyName(key_name.to_string()).to_string(),
        })?;

        Ok(vec![ScriptedInput::Key(KeyEvent::new(code, modifiers))])
    }

    /// Splits "Ctrl+z" into (Modifiers::CTRL, "z")
    fn parse_modifiers(input: &str) -> Result<(Modifiers, &str), InputScriptError> {
        let Some((prefix, key)) = input.rsplit_once('+') else {
            return Ok((Modifiers::none(), input));
        };
        // A lone "+" is the plus key.
        if key.is_empty() {
            return Ok((Modifiers::none(), input));
        }

        let mut modifiers = Modifiers::none();
        for name in prefix.split('+') {
            let modifier = Modifiers::from_name(name.trim())
                .ok_or_else(|| InputScriptError::InvalidModifier(name.trim().to_string()))?;
            modifiers = modifiers.with(modifier);
        }
        Ok((modifiers, key.trim()))
    }

    /// Parses a duration string (e.g., "100ms", "1s")
    fn parse_duration(s: &str) -> Result<u64, InputScriptError> {
        let s = s.trim().to_lowercase();
        let invalid = || InputScriptError::InvalidDelay(s.clone());

        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim().parse::<u64>().map_err(|_| invalid())
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(|secs| secs * 1000)
                .map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }

    /// Returns the next input, if any
    pub fn next_input(&mut self) -> Option<ScriptedInput> {
        self.inputs.pop_front()
    }

    /// Returns true if the script has more inputs
    pub fn has_more(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// Returns the number of remaining inputs
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> ScriptedInput {
        ScriptedInput::Key(KeyEvent::plain(code))
    }

    #[test]
    fn test_parse_single_key() {
        let mut script = InputScript::from_text("a").unwrap();
        assert_eq!(script.remaining(), 1);
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Char('a')));
    }

    #[test]
    fn test_parse_special_keys() {
        let mut script = InputScript::from_text("Enter\nEscape\nBackspace").unwrap();
        assert_eq!(script.remaining(), 3);
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Enter));
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Escape));
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Backspace));
    }

    #[test]
    fn test_parse_modifiers() {
        let mut script = InputScript::from_text("Ctrl+z\nAlt+x\nCtrl+Shift+a").unwrap();
        assert_eq!(
            script.next_input().unwrap(),
            ScriptedInput::Key(KeyEvent::ctrl('z'))
        );
        assert_eq!(
            script.next_input().unwrap(),
            ScriptedInput::Key(KeyEvent::new(KeyCode::Char('x'), Modifiers::ALT))
        );
        assert_eq!(
            script.next_input().unwrap(),
            ScriptedInput::Key(KeyEvent::new(
                KeyCode::Char('a'),
                Modifiers::CTRL.with(Modifiers::SHIFT)
            ))
        );
    }

    #[test]
    fn test_parse_plus_key() {
        let mut script = InputScript::from_text("+").unwrap();
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Char('+')));
    }

    #[test]
    fn test_parse_quoted_string() {
        let mut script = InputScript::from_text(r#""ls -a""#).unwrap();
        assert_eq!(script.remaining(), 5);
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Char('l')));
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Char('s')));
        assert_eq!(script.next_input().unwrap(), key(KeyCode::Char(' ')));
    }

    #[test]
    fn test_parse_wait() {
        let mut script = InputScript::from_text("wait 100ms\nwait 2s").unwrap();
        assert_eq!(script.next_input().unwrap(), ScriptedInput::Wait(100));
        assert_eq!(script.next_input().unwrap(), ScriptedInput::Wait(2000));
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        let script = InputScript::from_text("# Comment\na\n\n# Another\nb").unwrap();
        assert_eq!(script.remaining(), 2);
    }

    #[test]
    fn test_empty_script_error() {
        assert_eq!(InputScript::from_text(""), Err(InputScriptError::EmptyScript));
        assert_eq!(
            InputScript::from_text("# Just comments"),
            Err(InputScriptError::EmptyScript)
        );
    }

    #[test]
    fn test_invalid_key_name() {
        let result = InputScript::from_text("F13");
        assert!(matches!(result, Err(InputScriptError::ParseError { line: 1, .. })));
    }

    #[test]
    fn test_invalid_modifier() {
        let result = InputScript::from_text("Hyper+a");
        assert_eq!(result, Err(InputScriptError::InvalidModifier("Hyper".to_string())));
    }

    #[test]
    fn test_invalid_delay() {
        let result = InputScript::from_text("a\nwait soon");
        assert!(matches!(result, Err(InputScriptError::ParseError { line: 2, .. })));
    }
}
