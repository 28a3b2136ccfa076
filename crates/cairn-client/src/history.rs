/// Up/down recall of previously sent lines, shell style.
///
/// The line being typed when browsing starts is kept aside and comes back
/// when the user walks past the newest entry.
#[derive(Debug, Clone, Default)]
pub struct InputHistory {
    lines: Vec<String>,
    cursor: Option<usize>,
    scratch: String,
}

impl InputHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a sent line and stop browsing. Blank lines and immediate
    /// repeats are not recorded.
    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        self.scratch.clear();
        if line.trim().is_empty() || self.lines.last().is_some_and(|last| last == line) {
            return;
        }
        self.lines.push(line.to_string());
    }

    /// Step to an older line. `current` is what the input box holds now.
    /// `None` when there is nothing older.
    pub fn up(&mut self, current: &str) -> Option<&str> {
        let next = match self.cursor {
            None if self.lines.is_empty() => return None,
            None => {
                self.scratch = current.to_string();
                self.lines.len() - 1
            }
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(next);
        Some(&self.lines[next])
    }

    /// Step to a newer line, ending on the saved in-progress text.
    pub fn down(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 < self.lines.len() {
            self.cursor = Some(i + 1);
            Some(&self.lines[i + 1])
        } else {
            self.cursor = None;
            Some(&self.scratch)
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
