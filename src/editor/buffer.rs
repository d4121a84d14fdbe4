use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use ropey::Rope;

use super::{Buffer, BufferId};
use crate::marks::Edit;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Callback used to answer prompts when no scripted answer is queued.
pub type Prompter = Box<dyn FnMut(&str) -> Option<String>>;

/// A text buffer backed by a rope data structure.
///
/// Point and mark are char offsets. Both follow the buffer's own edits the
/// same way engine marks do. Prompts are answered from a queue of scripted
/// answers first, then from an optional prompter callback; with neither, a
/// prompt counts as cancelled.
pub struct EditorBuffer {
    id: BufferId,
    rope: Rope,
    point: usize,
    mark: Option<usize>,
    indent_width: usize,
    answers: VecDeque<String>,
    prompter: Option<Prompter>,
    prompts_seen: Vec<String>,
    dings: usize,
}

impl EditorBuffer {
    /// Create a new buffer from a string, with point at the start.
    pub fn from_text(text: &str) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            rope: Rope::from_str(text),
            point: 0,
            mark: None,
            indent_width: 4,
            answers: VecDeque::new(),
            prompter: None,
            prompts_seen: Vec::new(),
            dings: 0,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Queue answers for upcoming prompts.
    #[must_use]
    pub fn with_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Spaces added per nesting level by [`Buffer::reindent_line`].
    #[must_use]
    pub const fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn set_prompter(&mut self, prompter: Prompter) {
        self.prompter = Some(prompter);
    }

    /// Set or clear the mark (the region's anchor).
    pub fn set_mark(&mut self, mark: Option<usize>) {
        self.mark = mark.map(|m| m.min(self.len_chars()));
    }

    pub const fn mark(&self) -> Option<usize> {
        self.mark
    }

    /// Move point, clamped to the buffer.
    pub fn move_to(&mut self, pos: usize) {
        self.point = pos.min(self.len_chars());
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx);
        let s = line.to_string();
        Some(s.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Prompts shown so far, oldest first.
    pub fn prompts_seen(&self) -> &[String] {
        &self.prompts_seen
    }

    /// How many times completion signalled failure or ambiguity.
    pub const fn ding_count(&self) -> usize {
        self.dings
    }

    fn apply_edit(&mut self, edit: Edit) {
        self.point = edit.adjust(self.point);
        self.mark = self.mark.map(|m| edit.adjust(m));
    }

    fn indent_of(line: &str) -> usize {
        line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
    }

    /// Indentation wanted for `line_idx`: the previous non-blank line's
    /// indentation, one level deeper after an opening bracket, one level
    /// shallower when the line itself starts with a closing bracket.
    fn desired_indent(&self, line_idx: usize) -> usize {
        let current = self.line_at(line_idx).unwrap_or_default();
        let previous = (0..line_idx)
            .rev()
            .filter_map(|i| self.line_at(i))
            .find(|l| !l.trim().is_empty());
        let Some(previous) = previous else {
            return 0;
        };
        let mut indent = Self::indent_of(&previous);
        if previous.trim_end().ends_with(['{', '(', '[']) {
            indent += self.indent_width;
        }
        if current.trim_start().starts_with(['}', ')', ']']) {
            indent = indent.saturating_sub(self.indent_width);
        }
        indent
    }
}

impl Buffer for EditorBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn position(&self) -> usize {
        self.point
    }

    fn set_position(&mut self, pos: usize) {
        self.move_to(pos);
    }

    fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = self.point;
        let len = text.chars().count();
        self.rope.insert(at, text);
        self.apply_edit(Edit::Insert { at, len });
        // Point sits at the insertion position, so it does not shift by itself.
        self.point = at + len;
    }

    fn region(&self) -> Option<(usize, usize)> {
        self.mark.map(|mark| (self.point, mark))
    }

    fn delete_range(&mut self, start: usize, end: usize) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let end = end.min(self.len_chars());
        if start >= end {
            return;
        }
        self.rope.remove(start..end);
        self.apply_edit(Edit::Delete { start, end });
    }

    fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.len_chars());
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn line_bounds(&self) -> (usize, usize) {
        let line_idx = self.rope.char_to_line(self.point);
        let start = self.rope.line_to_char(line_idx);
        let len = self.line_at(line_idx).map_or(0, |l| l.chars().count());
        (start, start + len)
    }

    fn reindent_line(&mut self) -> Vec<Edit> {
        let line_idx = self.rope.char_to_line(self.point);
        let line_start = self.rope.line_to_char(line_idx);
        let current = self
            .line_at(line_idx)
            .map_or(0, |line| Self::indent_of(&line));
        let desired = self.desired_indent(line_idx);
        if current == desired {
            return Vec::new();
        }

        let in_indentation = self.point <= line_start + current;
        let mut edits = Vec::with_capacity(2);
        if current > 0 {
            let delete = Edit::Delete {
                start: line_start,
                end: line_start + current,
            };
            self.rope.remove(line_start..line_start + current);
            self.apply_edit(delete);
            edits.push(delete);
        }
        if desired > 0 {
            let insert = Edit::Insert {
                at: line_start,
                len: desired,
            };
            self.rope.insert(line_start, &" ".repeat(desired));
            self.apply_edit(insert);
            edits.push(insert);
        }
        if in_indentation {
            self.point = line_start + desired;
        }
        edits
    }

    fn prompt_user(&mut self, prompt: &str) -> Option<String> {
        self.prompts_seen.push(prompt.to_string());
        if let Some(answer) = self.answers.pop_front() {
            return Some(answer);
        }
        self.prompter.as_mut().and_then(|prompter| prompter(prompt))
    }

    fn ding(&mut self) {
        self.dings += 1;
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("id", &self.id)
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("point", &self.point)
            .field("mark", &self.mark)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::BackwardPattern;

    // --- Construction and basic queries ---

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = EditorBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_at(0), Some(String::new()));
    }

    #[test]
    fn test_from_text_preserves_content() {
        let buf = EditorBuffer::from_text("hello\nworld");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.line_at(0), Some("hello".to_string()));
        assert_eq!(buf.line_at(1), Some("world".to_string()));
    }

    #[test]
    fn test_buffers_get_distinct_ids() {
        let a = EditorBuffer::empty();
        let b = EditorBuffer::empty();
        assert_ne!(a.id(), b.id());
    }

    // --- Insertion ---

    #[test]
    fn test_insert_text_advances_point() {
        let mut buf = EditorBuffer::from_text("hd");
        buf.move_to(1);
        buf.insert_text("ello worl");
        assert_eq!(buf.text(), "hello world");
        assert_eq!(buf.position(), 10);
    }

    #[test]
    fn test_insert_empty_is_noop() {
        let mut buf = EditorBuffer::from_text("hello");
        buf.move_to(2);
        buf.insert_text("");
        assert_eq!(buf.text(), "hello");
        assert_eq!(buf.position(), 2);
    }

    #[test]
    fn test_insert_multibyte_counts_chars() {
        let mut buf = EditorBuffer::from_text("caf");
        buf.move_to(3);
        buf.insert_text("é!");
        assert_eq!(buf.text(), "café!");
        assert_eq!(buf.position(), 5);
    }

    #[test]
    fn test_insert_shifts_mark_after_point() {
        let mut buf = EditorBuffer::from_text("abc");
        buf.set_mark(Some(3));
        buf.insert_text("xx");
        assert_eq!(buf.mark(), Some(5));
        assert_eq!(buf.region(), Some((2, 5)));
    }

    // --- Deletion ---

    #[test]
    fn test_delete_range_adjusts_point() {
        let mut buf = EditorBuffer::from_text("hello world");
        buf.move_to(11);
        buf.delete_range(5, 11);
        assert_eq!(buf.text(), "hello");
        assert_eq!(buf.position(), 5);
    }

    #[test]
    fn test_delete_range_accepts_reversed_bounds() {
        let mut buf = EditorBuffer::from_text("abcdef");
        buf.delete_range(4, 1);
        assert_eq!(buf.text(), "aef");
    }

    // --- Lines and slices ---

    #[test]
    fn test_line_bounds_exclude_newline() {
        let mut buf = EditorBuffer::from_text("one\ntwo\r\nthree");
        buf.move_to(5);
        assert_eq!(buf.line_bounds(), (4, 7));
    }

    #[test]
    fn test_slice_clamps() {
        let buf = EditorBuffer::from_text("hello");
        assert_eq!(buf.slice(2, 100), "llo");
        assert_eq!(buf.slice(9, 100), "");
    }

    // --- Reindent ---

    #[test]
    fn test_reindent_after_open_brace() {
        let mut buf = EditorBuffer::from_text("fn main() {\nx");
        buf.move_to(12);
        let edits = buf.reindent_line();
        assert_eq!(buf.text(), "fn main() {\n    x");
        assert_eq!(edits, vec![Edit::Insert { at: 12, len: 4 }]);
        assert_eq!(buf.position(), 16);
    }

    #[test]
    fn test_reindent_uses_configured_width() {
        let mut buf = EditorBuffer::from_text("list = [\nx").with_indent_width(2);
        buf.move_to(9);
        let edits = buf.reindent_line();
        assert_eq!(buf.text(), "list = [\n  x");
        assert_eq!(edits, vec![Edit::Insert { at: 9, len: 2 }]);
    }

    #[test]
    fn test_reindent_dedents_closing_brace() {
        let mut buf = EditorBuffer::from_text("if x {\n    y\n        }");
        buf.move_to(buf.len_chars());
        buf.reindent_line();
        assert_eq!(buf.line_at(2), Some("}".to_string()));
        assert_eq!(buf.position(), buf.len_chars());
    }

    #[test]
    fn test_reindent_noop_when_already_indented() {
        let mut buf = EditorBuffer::from_text("a\nb");
        buf.move_to(2);
        assert!(buf.reindent_line().is_empty());
        assert_eq!(buf.text(), "a\nb");
    }

    // --- Prompts ---

    #[test]
    fn test_prompt_uses_answers_then_prompter() {
        let mut buf = EditorBuffer::empty().with_answers(["first"]);
        buf.set_prompter(Box::new(|prompt| Some(format!("<{prompt}>"))));
        assert_eq!(buf.prompt_user("a"), Some("first".to_string()));
        assert_eq!(buf.prompt_user("b"), Some("<b>".to_string()));
        assert_eq!(buf.prompts_seen(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_prompt_without_source_is_cancelled() {
        let mut buf = EditorBuffer::empty();
        assert_eq!(buf.prompt_user("Name: "), None);
    }

    // --- Backward search ---

    #[test]
    fn test_search_backward_finds_word_before_point() {
        let mut buf = EditorBuffer::from_text("let foo bar");
        buf.move_to(11);
        let re = BackwardPattern::new(r"\b(\w+)").unwrap();
        let found = buf.search_backward(&re).unwrap();
        assert_eq!(found.text, "bar");
        assert_eq!(found.start, 8);
    }

    #[test]
    fn test_search_backward_ignores_text_after_point() {
        let mut buf = EditorBuffer::from_text("if else");
        buf.move_to(2);
        let re = BackwardPattern::new(r"\b(\w+)").unwrap();
        assert_eq!(buf.search_backward(&re).unwrap().text, "if");
    }

    #[test]
    fn test_search_backward_reports_char_offsets() {
        let mut buf = EditorBuffer::from_text("é <di");
        buf.move_to(5);
        let re = BackwardPattern::new(r"(<\w*)").unwrap();
        let found = buf.search_backward(&re).unwrap();
        assert_eq!(found.text, "<di");
        assert_eq!(found.start, 2);
    }

    #[test]
    fn test_search_backward_no_match() {
        let mut buf = EditorBuffer::from_text("foo ");
        buf.move_to(4);
        let re = BackwardPattern::new(r"\b(\w+)").unwrap();
        assert_eq!(buf.search_backward(&re), None);
    }

    #[test]
    fn test_search_backward_long_token_is_linear() {
        let token = "a".repeat(150_000);
        let mut buf = EditorBuffer::from_text(&format!("x {token}"));
        buf.move_to(buf.len_chars());
        let re = BackwardPattern::new(r"\b(\w+)").unwrap();

        let started = std::time::Instant::now();
        let found = buf.search_backward(&re).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(found.start, 2);
        assert_eq!(found.text.len(), 150_000);
    }

    #[test]
    fn test_search_backward_dot_does_not_cross_lines() {
        let mut buf = EditorBuffer::from_text("ab\ncd");
        buf.move_to(5);
        let re = BackwardPattern::new(r"(a.*)").unwrap();
        assert_eq!(buf.search_backward(&re), None);
    }

    #[test]
    fn test_search_backward_whole_match_without_group() {
        let mut buf = EditorBuffer::from_text("call x.fo");
        buf.move_to(9);
        let re = BackwardPattern::new(r"\w+\.\w+").unwrap();
        let found = buf.search_backward(&re).unwrap();
        assert_eq!(found.text, "x.fo");
        assert_eq!(found.start, 5);
    }
}
