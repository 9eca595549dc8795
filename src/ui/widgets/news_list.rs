use super::{bordered, View};
use crate::api::{format_timestamp, NewsCategory, NewsSummary};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Tabs},
    Frame,
};

pub struct NewsListWidget {
    category: NewsCategory,
    page: u32,
    items: Vec<NewsSummary>,
    loading: bool,
    error: Option<String>,
    scroll_state: ListState,
}

impl Default for NewsListWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsListWidget {
    pub fn new() -> Self {
        let mut scroll_state = ListState::default();
        scroll_state.select(Some(0));

        Self {
            category: NewsCategory::Main,
            page: 0,
            items: Vec::new(),
            loading: true,
            error: None,
            scroll_state,
        }
    }

    pub fn category(&self) -> NewsCategory {
        self.category
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn items(&self) -> &[NewsSummary] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn mark_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Applies a fetched page. Results for a category or page that is no
    /// longer shown are dropped.
    pub fn update_data(
        &mut self,
        category: NewsCategory,
        page: u32,
        result: Result<Vec<NewsSummary>, String>,
    ) -> bool {
        if category != self.category || page != self.page {
            return false;
        }
        self.loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.error = None;
            }
            Err(e) => {
                self.items.clear();
                self.error = Some(e);
            }
        }
        self.scroll_state.select(Some(0));
        true
    }

    pub fn selected(&self) -> Option<&NewsSummary> {
        self.scroll_state
            .selected()
            .and_then(|index| self.items.get(index))
    }

    pub fn next_category(&mut self) {
        self.category = self.category.next();
        self.page = 0;
    }

    pub fn prev_category(&mut self) {
        self.category = self.category.prev();
        self.page = 0;
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    /// Returns false when already on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = NewsCategory::ALL
            .iter()
            .map(|c| Line::from(c.label()))
            .collect();
        let selected = NewsCategory::ALL
            .iter()
            .position(|c| *c == self.category)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }
}

impl View for NewsListWidget {
    fn title(&self) -> &str {
        "News"
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_tabs(frame, chunks[0]);

        let block = bordered(self.category.label(), true);

        if self.loading && self.items.is_empty() {
            let loading_text = List::new(vec![ListItem::new("뉴스를 불러오는 중...")]).block(block);
            frame.render_widget(loading_text, chunks[1]);
        } else if let Some(ref error) = self.error {
            let error_text =
                List::new(vec![ListItem::new(format!("Error: {}", error))]).block(block);
            frame.render_widget(error_text, chunks[1]);
        } else if self.items.is_empty() {
            let empty_text = List::new(vec![ListItem::new("No news on this page")]).block(block);
            frame.render_widget(empty_text, chunks[1]);
        } else {
            let items: Vec<ListItem> = self
                .items
                .iter()
                .enumerate()
                .map(|(i, news)| {
                    let title_line = Line::from(vec![
                        Span::styled(
                            format!("{:>2}. ", i + 1),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::styled(
                            &news.title,
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ]);

                    let mut meta = Vec::new();
                    if let Some(published) = &news.published_at {
                        meta.push(Span::styled(
                            format!("    {} ", format_timestamp(published)),
                            Style::default().fg(Color::Yellow),
                        ));
                    }
                    if let Some(url) = &news.original_url {
                        meta.push(Span::styled(
                            format!("    {}", url),
                            Style::default().fg(Color::Cyan),
                        ));
                    }

                    ListItem::new(vec![title_line, Line::from(meta)])
                })
                .collect();

            let list = List::new(items).block(block).highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_stateful_widget(list, chunks[1], &mut self.scroll_state);
        }

        let footer = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" page {} ", self.page + 1),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ),
            Span::styled(
                "  ←/→ category  [/] page  Enter open  o browser  r reload",
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        frame.render_widget(footer, chunks[2]);
    }

    fn scroll_up(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected > 0 {
                self.scroll_state.select(Some(selected - 1));
            }
        }
    }

    fn scroll_down(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected < self.items.len().saturating_sub(1) {
                self.scroll_state.select(Some(selected + 1));
            }
        }
    }
}
