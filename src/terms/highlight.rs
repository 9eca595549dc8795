use crate::api::{Term, TermId};
use std::cmp::Reverse;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Marker { term_id: TermId, text: String },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Text(text) | Segment::Marker { text, .. } => text,
        }
    }

    pub fn term_id(&self) -> Option<TermId> {
        match self {
            Segment::Text(_) => None,
            Segment::Marker { term_id, .. } => Some(*term_id),
        }
    }
}

/// Article body split into plain text and term markers.
///
/// Always derived from scratch from the body and the current term set, so a
/// marker can only refer to a term that was in the set it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightedDocument {
    segments: Vec<Segment>,
}

impl HighlightedDocument {
    /// Marks every occurrence of every term name in `content`.
    ///
    /// Longer names are applied first so that "금리인상" wins over "금리".
    /// Each pass only scans text outside existing markers; a later name never
    /// matches inside an earlier marker.
    pub fn render(content: &str, terms: &[Term]) -> Self {
        let mut segments = Vec::new();
        if !content.is_empty() {
            segments.push(Segment::Text(content.to_string()));
        }

        let mut ordered: Vec<&Term> = terms.iter().filter(|t| !t.term_name.is_empty()).collect();
        ordered.sort_by_key(|t| Reverse(t.term_name.chars().count()));

        for term in ordered {
            segments = segments
                .into_iter()
                .flat_map(|segment| match segment {
                    Segment::Text(text) => split_on(&text, &term.term_name, term.term_id),
                    marker => vec![marker],
                })
                .collect();
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The original body, with markers unwrapped.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }

    pub fn markers(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Marker { term_id, text } => Some((*term_id, text.as_str())),
            Segment::Text(_) => None,
        })
    }

    pub fn marker_count(&self) -> usize {
        self.markers().count()
    }

    /// Markup form: markers become `<span class="term" data-term-id="..">`,
    /// everything else is escaped text.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => escape_into(&mut html, text),
                Segment::Marker { term_id, text } => {
                    let _ = write!(html, r#"<span class="term" data-term-id="{}">"#, term_id);
                    escape_into(&mut html, text);
                    html.push_str("</span>");
                }
            }
        }
        html
    }
}

fn split_on(text: &str, name: &str, term_id: TermId) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for (start, matched) in text.match_indices(name) {
        if start > last {
            out.push(Segment::Text(text[last..start].to_string()));
        }
        out.push(Segment::Marker {
            term_id,
            text: matched.to_string(),
        });
        last = start + matched.len();
    }
    if last < text.len() {
        out.push(Segment::Text(text[last..].to_string()));
    }
    out
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::term;
    use scraper::{Html, Selector};

    #[test]
    fn test_longer_term_wins_over_embedded_shorter_term() {
        let doc = HighlightedDocument::render(
            "금리인상이 우려된다",
            &[term(1, "금리"), term(2, "금리인상")],
        );
        assert_eq!(
            doc.segments(),
            &[
                Segment::Marker {
                    term_id: 2,
                    text: "금리인상".to_string()
                },
                Segment::Text("이 우려된다".to_string()),
            ]
        );
    }

    #[test]
    fn test_shorter_term_still_marked_outside_longer_one() {
        let doc = HighlightedDocument::render(
            "금리인상 뒤에도 금리는 높다",
            &[term(1, "금리"), term(2, "금리인상")],
        );
        let markers: Vec<_> = doc.markers().collect();
        assert_eq!(markers, vec![(2, "금리인상"), (1, "금리")]);
        assert_eq!(doc.plain_text(), "금리인상 뒤에도 금리는 높다");
    }

    #[test]
    fn test_every_occurrence_wrapped_once_and_text_preserved() {
        let content = "환율이 오르면 물가도 오른다.\n\n  환율, 물가!\t(환율)";
        let doc = HighlightedDocument::render(content, &[term(5, "환율"), term(6, "물가")]);

        assert_eq!(doc.plain_text(), content);
        assert_eq!(doc.markers().filter(|(id, _)| *id == 5).count(), 3);
        assert_eq!(doc.markers().filter(|(id, _)| *id == 6).count(), 2);
        assert!(doc
            .segments()
            .windows(2)
            .all(|w| !matches!(w, [Segment::Text(_), Segment::Text(_)])));
    }

    #[test]
    fn test_no_terms_yields_single_text_segment() {
        let doc = HighlightedDocument::render("본문", &[]);
        assert_eq!(doc.segments(), &[Segment::Text("본문".to_string())]);
        assert!(HighlightedDocument::render("", &[term(1, "금리")]).is_empty());
    }

    #[test]
    fn test_empty_term_name_ignored() {
        let doc = HighlightedDocument::render("abc", &[term(1, "")]);
        assert_eq!(doc.marker_count(), 0);
        assert_eq!(doc.plain_text(), "abc");
    }

    #[test]
    fn test_term_names_are_literal_not_patterns() {
        let doc = HighlightedDocument::render("S&P500 (ETF) 와 ETF", &[term(1, "(ETF)"), term(2, "S&P500")]);
        let markers: Vec<_> = doc.markers().collect();
        assert_eq!(markers, vec![(2, "S&P500"), (1, "(ETF)")]);
    }

    #[test]
    fn test_later_term_never_matches_inside_marker_or_markup() {
        // "span", "term" and "data" all appear in the generated markup; "인상"
        // appears inside the earlier "금리인상" marker.
        let content = "금리인상 and span of term data";
        let terms = [
            term(1, "금리인상"),
            term(2, "인상"),
            term(3, "span"),
            term(4, "term"),
            term(5, "data"),
        ];
        let doc = HighlightedDocument::render(content, &terms);
        assert_eq!(doc.plain_text(), content);
        assert_eq!(doc.markers().filter(|(id, _)| *id == 2).count(), 0);

        let html = Html::parse_fragment(&doc.to_html());
        let selector = Selector::parse("span[data-term-id]").unwrap();
        let spans: Vec<_> = html.select(&selector).collect();
        assert_eq!(spans.len(), 4);
        for span in &spans {
            assert_eq!(span.select(&selector).count(), 0, "nested marker");
        }
        let ids: Vec<_> = spans
            .iter()
            .map(|s| s.value().attr("data-term-id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);
    }

    #[test]
    fn test_html_escapes_text_and_roundtrips() {
        let content = "<b>금리</b> & \"인상\"";
        let doc = HighlightedDocument::render(content, &[term(9, "금리")]);
        let html = doc.to_html();
        assert!(html.starts_with("&lt;b&gt;<span class=\"term\" data-term-id=\"9\">금리</span>"));

        let fragment = Html::parse_fragment(&html);
        let text: String = fragment.root_element().text().collect();
        assert_eq!(text, content);
    }

    #[test]
    fn test_equal_length_names_keep_input_order() {
        let doc = HighlightedDocument::render("ab", &[term(1, "ab"), term(2, "ab")]);
        let markers: Vec<_> = doc.markers().collect();
        assert_eq!(markers, vec![(1, "ab")]);
    }
}
