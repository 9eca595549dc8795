use super::{bordered, center_rect, View};
use crate::api::{Term, TermDetail, TermId};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Term dictionary: searchable list plus a detail modal.
pub struct DictionaryWidget {
    terms: Vec<Term>,
    filter: String,
    editing: bool,
    loading: bool,
    loaded: bool,
    error: Option<String>,
    detail: Option<TermDetail>,
    detail_loading: bool,
    scroll_state: ListState,
}

impl Default for DictionaryWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryWidget {
    pub fn new() -> Self {
        let mut scroll_state = ListState::default();
        scroll_state.select(Some(0));

        Self {
            terms: Vec::new(),
            filter: String::new(),
            editing: false,
            loading: false,
            loaded: false,
            error: None,
            detail: None,
            detail_loading: false,
            scroll_state,
        }
    }

    /// Whether the list still has to be fetched.
    pub fn needs_load(&self) -> bool {
        !self.loaded && !self.loading
    }

    pub fn mark_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn update_data(&mut self, result: Result<Vec<Term>, String>) {
        self.loading = false;
        self.loaded = true;
        match result {
            Ok(terms) => {
                self.terms = terms;
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e);
            }
        }
        self.scroll_state.select(Some(0));
    }

    /// Terms whose name contains the filter, ignoring case.
    pub fn filtered(&self) -> Vec<&Term> {
        let needle = self.filter.to_lowercase();
        self.terms
            .iter()
            .filter(|t| t.term_name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_id(&self) -> Option<TermId> {
        let index = self.scroll_state.selected()?;
        self.filtered().get(index).map(|t| t.term_id)
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    pub fn add_char(&mut self, c: char) {
        self.filter.push(c);
        self.scroll_state.select(Some(0));
    }

    pub fn delete_char(&mut self) {
        self.filter.pop();
        self.scroll_state.select(Some(0));
    }

    pub fn open_detail(&mut self) {
        self.detail_loading = true;
    }

    pub fn show_detail(&mut self, detail: Option<TermDetail>) {
        self.detail_loading = false;
        if detail.is_none() {
            self.error = Some("상세 정보를 가져오는 데 실패했습니다.".to_string());
        }
        self.detail = detail;
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }

    pub fn close_detail(&mut self) -> bool {
        self.detail_loading = false;
        self.detail.take().is_some()
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, detail: &TermDetail) {
        let modal_area = center_rect(80, 70, area);
        frame.render_widget(Clear, modal_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Term Definition ");

        let text = vec![
            Line::from(Span::styled(
                detail.term_name.clone(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(detail.detailed_explanation.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "Esc to close",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, modal_area);
    }
}

impl View for DictionaryWidget {
    fn title(&self) -> &str {
        "Dictionary"
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let search_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let search = Paragraph::new(format!("/ {}", self.filter))
            .block(bordered("검색", self.editing))
            .style(search_style);
        frame.render_widget(search, chunks[0]);

        let block = bordered("경제 용어 사전", !self.editing);
        if self.loading {
            let loading_text =
                List::new(vec![ListItem::new("경제 용어 목록을 불러오는 중입니다...")]).block(block);
            frame.render_widget(loading_text, chunks[1]);
        } else if let Some(ref error) = self.error {
            let error_text = List::new(vec![ListItem::new(error.clone())]).block(block);
            frame.render_widget(error_text, chunks[1]);
        } else {
            let items: Vec<ListItem> = self
                .terms
                .iter()
                .filter(|t| {
                    t.term_name
                        .to_lowercase()
                        .contains(&self.filter.to_lowercase())
                })
                .map(|t| {
                    let mut spans = vec![Span::styled(
                        t.term_name.clone(),
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    )];
                    if let Some(brief) = &t.brief_explanation {
                        spans.push(Span::styled(
                            format!("  {}", brief),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect();

            let list = if items.is_empty() {
                List::new(vec![ListItem::new("검색 결과가 없습니다.")]).block(block)
            } else {
                List::new(items).block(block).highlight_style(
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )
            };
            frame.render_stateful_widget(list, chunks[1], &mut self.scroll_state);
        }

        if let Some(detail) = &self.detail {
            self.render_detail(frame, area, detail);
        } else if self.detail_loading {
            let modal_area = center_rect(40, 20, area);
            frame.render_widget(Clear, modal_area);
            frame.render_widget(
                Paragraph::new("불러오는 중...").block(bordered("Term", true)),
                modal_area,
            );
        }
    }

    fn scroll_up(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected > 0 {
                self.scroll_state.select(Some(selected - 1));
            }
        }
    }

    fn scroll_down(&mut self) {
        let len = self.filtered().len();
        if let Some(selected) = self.scroll_state.selected() {
            if selected < len.saturating_sub(1) {
                self.scroll_state.select(Some(selected + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::term;

    fn loaded() -> DictionaryWidget {
        let mut widget = DictionaryWidget::new();
        assert!(widget.needs_load());
        widget.mark_loading();
        assert!(!widget.needs_load());
        widget.update_data(Ok(vec![
            term(1, "GDP"),
            term(2, "기준금리"),
            term(3, "gdp 디플레이터"),
        ]));
        widget
    }

    #[test]
    fn test_filter_ignores_case() {
        let mut widget = loaded();
        for c in "Gdp".chars() {
            widget.add_char(c);
        }
        let ids: Vec<_> = widget.filtered().iter().map(|t| t.term_id).collect();
        assert_eq!(ids, vec![1, 3]);

        widget.scroll_down();
        assert_eq!(widget.selected_id(), Some(3));
        widget.scroll_down();
        assert_eq!(widget.selected_id(), Some(3));
    }

    #[test]
    fn test_editing_filter_resets_selection() {
        let mut widget = loaded();
        widget.scroll_down();
        assert_eq!(widget.selected_id(), Some(2));
        widget.add_char('금');
        assert_eq!(widget.selected_id(), Some(2));
        widget.delete_char();
        assert_eq!(widget.selected_id(), Some(1));
    }

    #[test]
    fn test_detail_lifecycle() {
        let mut widget = loaded();
        widget.open_detail();
        widget.show_detail(Some(TermDetail {
            term_id: 2,
            term_name: "기준금리".to_string(),
            detailed_explanation: "중앙은행이 정하는 정책금리".to_string(),
        }));
        assert!(widget.has_detail());
        assert!(widget.close_detail());
        assert!(!widget.close_detail());
    }

    #[test]
    fn test_no_match_selects_nothing() {
        let mut widget = loaded();
        widget.add_char('z');
        assert!(widget.filtered().is_empty());
        assert_eq!(widget.selected_id(), None);
    }
}
