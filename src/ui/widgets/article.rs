use super::{bordered, View};
use crate::api::{NewsId, Quiz};
use crate::detail::{ArticleDetail, PollStatus};
use crate::terms::{DocumentLayout, MarkerHit, PendingLookup, PopupState, StopReason};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const POPUP_WIDTH: u16 = 40;

/// Article view: header, highlighted body and the term popup.
pub struct ArticleWidget {
    detail: ArticleDetail,
    quizzes: Vec<Quiz>,
    layout: DocumentLayout,
    body_area: Rect,
    scroll: usize,
    /// Row and column of the marker fragment selected from the keyboard.
    focused: Option<(usize, u16)>,
}

impl ArticleWidget {
    pub fn new(news_id: NewsId) -> Self {
        Self {
            detail: ArticleDetail::new(news_id),
            quizzes: Vec::new(),
            layout: DocumentLayout::default(),
            body_area: Rect::default(),
            scroll: 0,
            focused: None,
        }
    }

    pub fn news_id(&self) -> NewsId {
        self.detail.news_id()
    }

    pub fn detail(&self) -> &ArticleDetail {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut ArticleDetail {
        &mut self.detail
    }

    pub fn body_area(&self) -> Rect {
        self.body_area
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn set_quizzes(&mut self, quizzes: Vec<Quiz>) {
        self.quizzes = quizzes;
    }

    /// Resolves a mouse click in screen coordinates. Returns the term lookup
    /// to run when the click landed on a marker.
    pub fn click(&mut self, column: u16, row: u16) -> Option<PendingLookup> {
        let hit = self.hit_test(column, row);
        self.focused = None;
        self.detail.popup_mut().click(hit)
    }

    pub fn close_popup(&mut self) -> bool {
        let was_open = self.detail.popup().is_open() || self.detail.popup().pending().is_some();
        self.detail.popup_mut().close();
        was_open
    }

    fn hit_test(&self, column: u16, row: u16) -> Option<MarkerHit> {
        let body = self.body_area;
        if column < body.x
            || column >= body.x + body.width
            || row < body.y
            || row >= body.y + body.height
        {
            return None;
        }
        let doc_row = self.scroll + usize::from(row - body.y);
        let hit = self.layout.marker_at(column - body.x, doc_row)?;
        Some(MarkerHit {
            term_id: hit.term_id,
            bounds: Rect::new(body.x + hit.bounds.x, row, hit.bounds.width, 1),
        })
    }

    fn marker_positions(&self) -> Vec<(usize, u16)> {
        self.layout
            .lines()
            .iter()
            .enumerate()
            .flat_map(|(row, line)| {
                line.spans
                    .iter()
                    .filter(|s| s.term_id.is_some())
                    .map(move |s| (row, s.x))
            })
            .collect()
    }

    /// Moves keyboard focus to the next marker, scrolling it into view.
    pub fn focus_next_marker(&mut self) {
        let positions = self.marker_positions();
        if positions.is_empty() {
            self.focused = None;
            return;
        }
        let next = match self.focused {
            Some(current) => positions
                .iter()
                .position(|p| *p == current)
                .map(|i| (i + 1) % positions.len())
                .unwrap_or(0),
            None => positions
                .iter()
                .position(|(row, _)| *row >= self.scroll)
                .unwrap_or(0),
        };
        let (row, x) = positions[next];
        self.focused = Some((row, x));

        let height = usize::from(self.body_area.height.max(1));
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + height {
            self.scroll = row + 1 - height;
        }
        self.detail.popup_mut().close();
    }

    /// Opens the focused marker as if it had been clicked.
    pub fn activate_focused(&mut self) -> Option<PendingLookup> {
        let (row, x) = self.focused?;
        if row < self.scroll {
            return None;
        }
        let screen_row = self.body_area.y + u16::try_from(row - self.scroll).ok()?;
        let lookup = self.click(self.body_area.x + x, screen_row);
        self.focused = Some((row, x));
        lookup
    }

    fn max_scroll(&self) -> usize {
        self.layout
            .height()
            .saturating_sub(usize::from(self.body_area.height))
    }

    fn status_line(&self) -> Line<'static> {
        let count = self.detail.terms().len();
        let (text, color) = match self.detail.poll_status() {
            PollStatus::Idle => ("".to_string(), Color::DarkGray),
            PollStatus::Polling => ("AI가 용어를 찾는 중...".to_string(), Color::Yellow),
            PollStatus::Done(StopReason::Satisfied) => ("용어 분석 완료".to_string(), Color::Green),
            PollStatus::Done(StopReason::Exhausted) => {
                ("용어 분석이 아직 끝나지 않았습니다".to_string(), Color::DarkGray)
            }
            PollStatus::Done(StopReason::Failed) => ("용어를 불러오지 못했습니다".to_string(), Color::Red),
            PollStatus::Done(StopReason::Cancelled) => ("".to_string(), Color::DarkGray),
        };

        let mut spans = vec![
            Span::styled(
                format!(" 용어 {}개 ", count),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ),
            Span::raw(" "),
            Span::styled(text, Style::default().fg(color)),
        ];
        if !self.quizzes.is_empty() {
            spans.push(Span::styled(
                format!("   퀴즈 {}문제 준비됨 (z)", self.quizzes.len()),
                Style::default().fg(Color::Cyan),
            ));
        }
        Line::from(spans)
    }

    fn body_lines(&self) -> Vec<Line<'static>> {
        let marker_style = Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let focused_style = Style::default()
            .fg(Color::White)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD);

        self.layout
            .lines()
            .iter()
            .enumerate()
            .map(|(row, line)| {
                Line::from(
                    line.spans
                        .iter()
                        .map(|span| match span.term_id {
                            Some(_) if self.focused == Some((row, span.x)) => {
                                Span::styled(span.text.clone(), focused_style)
                            }
                            Some(_) => Span::styled(span.text.clone(), marker_style),
                            None => Span::raw(span.text.clone()),
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    fn render_popup(&self, frame: &mut Frame) {
        let PopupState::Open { term, anchor } = self.detail.popup().state() else {
            return;
        };

        let text_width = usize::from(POPUP_WIDTH - 2);
        let brief = if term.brief_explanation.is_empty() {
            "설명이 없습니다.".to_string()
        } else {
            term.brief_explanation.clone()
        };
        let wrapped: Vec<String> = textwrap::wrap(&brief, text_width)
            .into_iter()
            .take(4)
            .map(|line| line.into_owned())
            .collect();

        let height = wrapped.len() as u16 + 3;
        let area = anchor.popup_area(POPUP_WIDTH, height, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let mut lines = vec![Line::from(Span::styled(
            term.term_name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))];
        lines.extend(wrapped.into_iter().map(Line::from));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

impl View for ArticleWidget {
    fn title(&self) -> &str {
        self.detail
            .article()
            .map(|a| a.title.as_str())
            .unwrap_or("Article")
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let label = self
            .detail
            .article()
            .map(|a| a.category_label())
            .unwrap_or("경제");
        let block = bordered(label, true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(article) = self.detail.article() else {
            self.body_area = Rect::default();
            frame.render_widget(
                Paragraph::new("로딩 중...").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        let title = Paragraph::new(Span::styled(
            article.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
        .wrap(Wrap { trim: true });
        frame.render_widget(title, chunks[0]);

        let mut meta = vec![
            Span::styled(
                format!("출처: {}", article.source),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  "),
            Span::styled(
                format!("작성일: {}", article.published_display()),
                Style::default().fg(Color::Gray),
            ),
        ];
        if article.news_img_url.is_some() {
            meta.push(Span::styled("  [image]", Style::default().fg(Color::DarkGray)));
        }
        frame.render_widget(Paragraph::new(Line::from(meta)), chunks[1]);
        frame.render_widget(Paragraph::new(self.status_line()), chunks[2]);

        self.body_area = chunks[4];
        self.layout = DocumentLayout::new(self.detail.document(), self.body_area.width);
        self.scroll = self.scroll.min(self.max_scroll());

        let body = Paragraph::new(self.body_lines())
            .scroll((u16::try_from(self.scroll).unwrap_or(u16::MAX), 0));
        frame.render_widget(body, self.body_area);

        self.render_popup(frame);
    }

    fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
        self.detail.popup_mut().close();
    }

    fn scroll_down(&mut self) {
        if self.scroll < self.max_scroll() {
            self.scroll += 1;
        }
        self.detail.popup_mut().close();
    }
}
