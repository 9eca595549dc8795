use super::highlight::HighlightedDocument;
use crate::api::TermId;
use ratatui::layout::Rect;
use textwrap::core::display_width;

/// A run of text on one laid out line. Marker runs carry their term id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaidSpan {
    pub text: String,
    pub term_id: Option<TermId>,
    pub x: u16,
    pub width: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaidLine {
    pub spans: Vec<LaidSpan>,
}

/// Marker found under a point, with the cells it occupies on that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerHit {
    pub term_id: TermId,
    pub bounds: Rect,
}

/// A highlighted document wrapped to a fixed width, in document coordinates
/// (row 0 is the first line of the body regardless of scrolling).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    width: u16,
    lines: Vec<LaidLine>,
}

impl DocumentLayout {
    /// Wraps at character boundaries using terminal display widths, so wide
    /// Hangul syllables take two cells. Explicit newlines always break.
    pub fn new(document: &HighlightedDocument, width: u16) -> Self {
        let width = width.max(1);
        let mut lines = vec![LaidLine::default()];
        let mut x: u16 = 0;

        for segment in document.segments() {
            let term_id = segment.term_id();
            let mut open_span = false;

            for c in segment.text().chars() {
                if c == '\n' {
                    lines.push(LaidLine::default());
                    x = 0;
                    open_span = false;
                    continue;
                }
                if c == '\r' {
                    continue;
                }

                let mut buf = [0u8; 4];
                let cell_width = display_width(c.encode_utf8(&mut buf)) as u16;
                if x > 0 && x + cell_width > width {
                    lines.push(LaidLine::default());
                    x = 0;
                    open_span = false;
                }

                let Some(line) = lines.last_mut() else {
                    continue;
                };
                if !open_span {
                    line.spans.push(LaidSpan {
                        text: String::new(),
                        term_id,
                        x,
                        width: 0,
                    });
                    open_span = true;
                }
                if let Some(span) = line.spans.last_mut() {
                    span.text.push(c);
                    span.width += cell_width;
                }
                x += cell_width;
            }
        }

        Self { width, lines }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn lines(&self) -> &[LaidLine] {
        &self.lines
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Resolves a point to the marker covering it. Plain text and empty
    /// space resolve to `None`.
    pub fn marker_at(&self, column: u16, row: usize) -> Option<MarkerHit> {
        let line = self.lines.get(row)?;
        let span = line
            .spans
            .iter()
            .find(|s| column >= s.x && column < s.x + s.width)?;
        let term_id = span.term_id?;
        Some(MarkerHit {
            term_id,
            bounds: Rect::new(span.x, u16::try_from(row).unwrap_or(u16::MAX), span.width, 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::term;

    fn layout(content: &str, width: u16) -> DocumentLayout {
        let doc = HighlightedDocument::render(content, &[term(1, "금리"), term(2, "rate")]);
        DocumentLayout::new(&doc, width)
    }

    fn line_text(line: &LaidLine) -> String {
        line.spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_wide_characters_take_two_cells() {
        let layout = layout("한국 금리", 40);
        let spans = &layout.lines()[0].spans;
        assert_eq!(spans[0].text, "한국 ");
        assert_eq!(spans[0].width, 5);
        assert_eq!(spans[1].term_id, Some(1));
        assert_eq!(spans[1].x, 5);
        assert_eq!(spans[1].width, 4);
    }

    #[test]
    fn test_wraps_and_breaks_on_newline() {
        let layout = layout("abcdef\nxy", 4);
        let texts: Vec<_> = layout.lines().iter().map(line_text).collect();
        assert_eq!(texts, vec!["abcd", "ef", "xy"]);
    }

    #[test]
    fn test_wide_char_does_not_straddle_edge() {
        let layout = layout("a금리", 4);
        let texts: Vec<_> = layout.lines().iter().map(line_text).collect();
        assert_eq!(texts, vec!["a금", "리"]);
        // The marker split across lines keeps its id on both fragments.
        assert_eq!(layout.lines()[0].spans[1].term_id, Some(1));
        assert_eq!(layout.lines()[1].spans[0].term_id, Some(1));
    }

    #[test]
    fn test_marker_at_hits_marker_cells_only() {
        let layout = layout("the rate rose", 40);
        let hit = layout.marker_at(5, 0).unwrap();
        assert_eq!(hit.term_id, 2);
        assert_eq!(hit.bounds, Rect::new(4, 0, 4, 1));

        assert_eq!(layout.marker_at(4, 0).map(|h| h.term_id), Some(2));
        assert_eq!(layout.marker_at(7, 0).map(|h| h.term_id), Some(2));
        assert_eq!(layout.marker_at(8, 0), None);
        assert_eq!(layout.marker_at(0, 0), None);
        assert_eq!(layout.marker_at(30, 0), None);
        assert_eq!(layout.marker_at(0, 3), None);
    }

    #[test]
    fn test_marker_at_on_second_line() {
        let layout = layout("intro\n금리 상승", 40);
        let hit = layout.marker_at(1, 1).unwrap();
        assert_eq!(hit.term_id, 1);
        assert_eq!(hit.bounds, Rect::new(0, 1, 4, 1));
    }

    #[test]
    fn test_empty_document_has_one_empty_line() {
        let layout = DocumentLayout::new(&HighlightedDocument::default(), 10);
        assert_eq!(layout.height(), 1);
        assert!(layout.lines()[0].spans.is_empty());
    }
}
