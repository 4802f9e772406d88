//! The editor collaborator: the text widget a note is loaded into.

/// What the session needs from an editor. Rich-text internals stay behind it,
/// and tests can substitute a plain buffer.
pub trait Editor: Send + Sync {
    /// The document serialized as Markdown.
    fn get_markdown(&self) -> String;

    /// Replaces the whole document.
    fn set_content(&mut self, content: &str);

    fn word_count(&self) -> usize;

    fn character_count(&self) -> usize;

    /// Puts the cursor on the first line.
    fn focus(&mut self);
}

/// A plain in-memory editor, used headless and in tests.
#[derive(Debug, Default, Clone)]
pub struct BufferEditor {
    buffer: String,
    focused: bool,
}

impl BufferEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the user typing a complete new document.
    pub fn type_text(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

impl Editor for BufferEditor {
    fn get_markdown(&self) -> String {
        self.buffer.clone()
    }

    fn set_content(&mut self, content: &str) {
        self.buffer = content.to_string();
    }

    fn word_count(&self) -> usize {
        self.buffer.split_whitespace().count()
    }

    fn character_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}
