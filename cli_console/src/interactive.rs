//! Interactive line editing
//!
//! Turns key events into edits of the current line and into console actions:
//! submitting a line, the suspend gesture, cancelling.

use input_types::{KeyCode, KeyEvent};
use std::collections::VecDeque;

/// What the host should do after a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Nothing visible changed
    None,
    /// The line changed and should be redrawn
    Edited,
    /// Enter: run this line
    Submit(String),
    /// Ctrl+Z: suspend the foreground job
    Suspend,
    /// Ctrl+C: the line was discarded
    Cancel,
}

/// Interactive console
///
/// Owns the edit buffer and a bounded history. Up/Down walk the history;
/// the partially typed line is kept and restored when walking past the
/// newest entry.
pub struct InteractiveConsole {
    /// Typed text buffer
    text_buffer: String,
    /// Cursor position, in characters
    cursor: usize,
    history: VecDeque<String>,
    history_limit: usize,
    /// Index into `history` while browsing
    browsing: Option<usize>,
    /// Line being typed before browsing started
    draft: String,
}

impl InteractiveConsole {
    /// Creates a console keeping at most `history_limit` lines
    pub fn new(history_limit: usize) -> Self {
        Self {
            text_buffer: String::new(),
            cursor: 0,
            history: VecDeque::new(),
            history_limit,
            browsing: None,
            draft: String::new(),
        }
    }

    /// Processes one key press
    pub fn handle_key(&mut self, event: KeyEvent) -> ConsoleAction {
        if event.is_ctrl_char('z') {
            return ConsoleAction::Suspend;
        }
        if event.is_ctrl_char('c') {
            self.reset_line();
            return ConsoleAction::Cancel;
        }

        match event.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.text_buffer);
                self.reset_line();
                self.push_history(&line);
                ConsoleAction::Submit(line)
            }
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return ConsoleAction::None;
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.text_buffer.remove(at);
                ConsoleAction::Edited
            }
            KeyCode::Escape => {
                if self.text_buffer.is_empty() {
                    return ConsoleAction::None;
                }
                self.reset_line();
                ConsoleAction::Edited
            }
            KeyCode::Left if self.cursor > 0 => {
                self.cursor -= 1;
                ConsoleAction::Edited
            }
            KeyCode::Right if self.cursor < self.char_len() => {
                self.cursor += 1;
                ConsoleAction::Edited
            }
            KeyCode::Up => self.history_older(),
            KeyCode::Down => self.history_newer(),
            _ => match event.printable() {
                Some(c) => {
                    let at = self.byte_offset(self.cursor);
                    self.text_buffer.insert(at, c);
                    self.cursor += 1;
                    ConsoleAction::Edited
                }
                None => ConsoleAction::None,
            },
        }
    }

    /// Feeds every character of `text` as a key press
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.handle_key(KeyEvent::char(c));
        }
    }

    /// Returns the current text buffer
    pub fn text_buffer(&self) -> &str {
        &self.text_buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Submitted lines, oldest first
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Prompt followed by the edit buffer
    pub fn render(&self, prompt: &str) -> String {
        format!("{}{}", prompt, self.text_buffer)
    }

    fn reset_line(&mut self) {
        self.text_buffer.clear();
        self.cursor = 0;
        self.browsing = None;
        self.draft.clear();
    }

    fn set_line(&mut self, line: String) {
        self.cursor = line.chars().count();
        self.text_buffer = line;
    }

    fn push_history(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.history_limit == 0 {
            return;
        }
        if self.history.back().map(String::as_str) != Some(line) {
            self.history.push_back(line.to_string());
        }
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    fn history_older(&mut self) -> ConsoleAction {
        let index = match self.browsing {
            None if self.history.is_empty() => return ConsoleAction::None,
            None => {
                self.draft = self.text_buffer.clone();
                self.history.len() - 1
            }
            Some(0) => return ConsoleAction::None,
            Some(i) => i - 1,
        };
        self.browsing = Some(index);
        let line = self.history[index].clone();
        self.set_line(line);
        ConsoleAction::Edited
    }

    fn history_newer(&mut self) -> ConsoleAction {
        let Some(index) = self.browsing else {
            return ConsoleAction::None;
        };
        if index + 1 < self.history.len() {
            self.browsing = Some(index + 1);
            let line = self.history[index + 1].clone();
            self.set_line(line);
        } else {
            self.browsing = None;
            let draft = std::mem::take(&mut self.draft);
            self.set_line(draft);
        }
        ConsoleAction::Edited
    }

    fn char_len(&self) -> usize {
        self.text_buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text_buffer
            .char_indices()
            .nth(chars)
            .map_or(self.text_buffer.len(), |(i, _)| i)
    }
}

impl Default for InteractiveConsole {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::plain(code)
    }

    #[test]
    fn test_typing_and_submit() {
        let mut console = InteractiveConsole::default();
        console.type_text("echo hi");
        assert_eq!(console.text_buffer(), "echo hi");
        assert_eq!(
            console.handle_key(key(KeyCode::Enter)),
            ConsoleAction::Submit("echo hi".to_string())
        );
        assert_eq!(console.text_buffer(), "");
        assert_eq!(console.history().collect::<Vec<_>>(), vec!["echo hi"]);
    }

    #[test]
    fn test_backspace() {
        let mut console = InteractiveConsole::default();
        console.type_text("ab");
        console.handle_key(key(KeyCode::Backspace));
        assert_eq!(console.text_buffer(), "a");
        console.handle_key(key(KeyCode::Backspace));
        assert_eq!(console.handle_key(key(KeyCode::Backspace)), ConsoleAction::None);
    }

    #[test]
    fn test_cursor_editing() {
        let mut console = InteractiveConsole::default();
        console.type_text("ac");
        console.handle_key(key(KeyCode::Left));
        console.type_text("b");
        assert_eq!(console.text_buffer(), "abc");
        assert_eq!(console.cursor(), 2);
        console.handle_key(key(KeyCode::Right));
        assert_eq!(console.handle_key(key(KeyCode::Right)), ConsoleAction::None);
        console.type_text("é");
        assert_eq!(console.text_buffer(), "abcé");
        console.handle_key(key(KeyCode::Backspace));
        assert_eq!(console.text_buffer(), "abc");
    }

    #[test]
    fn test_escape_clears_buffer() {
        let mut console = InteractiveConsole::default();
        console.type_text("oops");
        assert_eq!(console.handle_key(key(KeyCode::Escape)), ConsoleAction::Edited);
        assert_eq!(console.text_buffer(), "");
        assert_eq!(console.handle_key(key(KeyCode::Escape)), ConsoleAction::None);
    }

    #[test]
    fn test_ctrl_keys() {
        let mut console = InteractiveConsole::default();
        console.type_text("sleep 100");
        assert_eq!(console.handle_key(KeyEvent::ctrl('z')), ConsoleAction::Suspend);
        assert_eq!(console.text_buffer(), "sleep 100");
        assert_eq!(console.handle_key(KeyEvent::ctrl('c')), ConsoleAction::Cancel);
        assert_eq!(console.text_buffer(), "");
    }

    #[test]
    fn test_history_navigation() {
        let mut console = InteractiveConsole::default();
        for line in ["one", "two", "three"] {
            console.type_text(line);
            console.handle_key(key(KeyCode::Enter));
        }
        console.type_text("dra");

        console.handle_key(key(KeyCode::Up));
        assert_eq!(console.text_buffer(), "three");
        console.handle_key(key(KeyCode::Up));
        console.handle_key(key(KeyCode::Up));
        assert_eq!(console.text_buffer(), "one");
        assert_eq!(console.handle_key(key(KeyCode::Up)), ConsoleAction::None);

        console.handle_key(key(KeyCode::Down));
        assert_eq!(console.text_buffer(), "two");
        console.handle_key(key(KeyCode::Down));
        console.handle_key(key(KeyCode::Down));
        assert_eq!(console.text_buffer(), "dra");
        assert_eq!(console.handle_key(key(KeyCode::Down)), ConsoleAction::None);
    }

    #[test]
    fn test_history_is_bounded_and_deduplicated() {
        let mut console = InteractiveConsole::new(2);
        for line in ["a", "a", "b", "  ", "c"] {
            console.type_text(line);
            console.handle_key(key(KeyCode::Enter));
        }
        assert_eq!(console.history().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_render() {
        let mut console = InteractiveConsole::default();
        console.type_text("ls");
        assert_eq!(console.render("$ "), "$ ls");
    }
}
