/// A scrollable list of text lines with a cursor row.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    lines: Vec<String>,
    cursor: usize,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.cursor = 0;
    }

    /// Line at the cursor row shifted by `offset`. Empty and out of range
    /// lines are both `None`.
    pub fn current_line(&self, offset: isize) -> Option<&str> {
        let row = self.cursor.checked_add_signed(offset)?;
        self.lines
            .get(row)
            .map(String::as_str)
            .filter(|line| !line.is_empty())
    }

    /// Moves the cursor by `delta` rows if a line exists there.
    pub fn move_cursor(&mut self, delta: isize) -> bool {
        if self.current_line(delta).is_none() {
            return false;
        }
        self.cursor = self.cursor.saturating_add_signed(delta);
        true
    }

    pub fn set_cursor(&mut self, row: usize) -> bool {
        match self.lines.get(row) {
            Some(line) if !line.is_empty() => {
                self.cursor = row;
                true
            }
            _ => false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// First visible row of a list `height` rows tall that keeps `cursor` in view.
pub fn scroll_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return cursor;
    }
    (cursor + 1).saturating_sub(height)
}

/// Rendered payload of the selected record.
#[derive(Debug, Clone, Default)]
pub struct DetailView {
    key: Option<String>,
    text: String,
    scroll: usize,
}

impl DetailView {
    pub fn show(&mut self, key: String, text: String) {
        self.key = Some(key);
        self.text = text;
        self.scroll = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.line_count().saturating_sub(1);
    }
}
