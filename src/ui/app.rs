use super::widgets::{
    article::ArticleWidget, dictionary::DictionaryWidget, news_list::NewsListWidget,
    quiz::QuizWidget, View,
};
use crate::api::{
    Article, NewsApi, NewsCategory, NewsId, NewsSummary, Quiz, QuizId, QuizResult, Term,
    TermBrief, TermDetail,
};
use crate::config::PollingConfig;
use crate::detail::trigger_term_generation;
use crate::quiz::{QuizPhase, QuizSession};
use crate::terms::{lookup_brief, PendingLookup, PollEvent, TermPoller};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    News,
    Dictionary,
    Quiz,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::News, Tab::Dictionary, Tab::Quiz];

    fn label(self) -> &'static str {
        match self {
            Tab::News => "1 뉴스",
            Tab::Dictionary => "2 용어사전",
            Tab::Quiz => "3 퀴즈",
        }
    }
}

/// Results of background requests, delivered back to the UI loop.
#[derive(Debug)]
pub enum AppMessage {
    NewsList {
        category: NewsCategory,
        page: u32,
        result: Result<Vec<NewsSummary>, String>,
    },
    Article {
        news_id: NewsId,
        article: Option<Article>,
    },
    Terms {
        news_id: NewsId,
        terms: Vec<Term>,
    },
    TermBrief {
        news_id: NewsId,
        ticket: u64,
        term: Option<TermBrief>,
    },
    Quizzes {
        news_id: NewsId,
        quizzes: Vec<Quiz>,
    },
    QuizGraded {
        quiz_id: QuizId,
        result: Option<QuizResult>,
    },
    Dictionary(Result<Vec<Term>, String>),
    DictionaryDetail(Option<TermDetail>),
}

pub struct App {
    api: Arc<dyn NewsApi>,
    tx: UnboundedSender<AppMessage>,
    poller: TermPoller,
    tab: Tab,
    news: NewsListWidget,
    article: Option<ArticleWidget>,
    dictionary: DictionaryWidget,
    quiz: QuizWidget,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    /// Builds the app together with the receivers the run loop drains.
    pub fn new(
        api: Arc<dyn NewsApi>,
        polling: PollingConfig,
    ) -> (Self, UnboundedReceiver<AppMessage>, UnboundedReceiver<PollEvent>) {
        let (tx, messages) = mpsc::unbounded_channel();
        let (poll_tx, poll_events) = mpsc::unbounded_channel();
        let poller = TermPoller::new(api.clone(), polling, poll_tx);

        let app = Self {
            api,
            tx,
            poller,
            tab: Tab::News,
            news: NewsListWidget::new(),
            article: None,
            dictionary: DictionaryWidget::new(),
            quiz: QuizWidget::new(),
            status: None,
            should_quit: false,
        };
        (app, messages, poll_events)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn news(&self) -> &NewsListWidget {
        &self.news
    }

    pub fn article(&self) -> Option<&ArticleWidget> {
        self.article.as_ref()
    }

    pub fn quiz(&self) -> &QuizWidget {
        &self.quiz
    }

    pub fn poller(&self) -> &TermPoller {
        &self.poller
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The receiver is gone only while the app shuts down.
            let _ = tx.send(task.await);
        });
    }

    pub fn load_news(&mut self) {
        self.news.mark_loading();
        let category = self.news.category();
        let page = self.news.page();
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.news_list(category, page).await.map_err(|e| {
                warn!(?category, page, "failed to load news: {}", e);
                e.to_string()
            });
            AppMessage::NewsList {
                category,
                page,
                result,
            }
        });
    }

    fn load_dictionary(&mut self) {
        self.dictionary.mark_loading();
        let api = self.api.clone();
        self.spawn(async move {
            AppMessage::Dictionary(api.term_list().await.map_err(|e| {
                warn!("failed to load dictionary: {}", e);
                e.to_string()
            }))
        });
    }

    /// Opens an article: fetches it and its current terms, asks the backend
    /// to extract terms and build a quiz, and starts a polling session.
    pub fn open_article(&mut self, news_id: NewsId) {
        self.close_article();
        info!(news_id, "opening article");

        let api = self.api.clone();
        self.spawn(async move {
            let article = match api.news_detail(news_id).await {
                Ok(article) => Some(article),
                Err(e) => {
                    warn!(news_id, "failed to load article: {}", e);
                    None
                }
            };
            AppMessage::Article { news_id, article }
        });

        let api = self.api.clone();
        self.spawn(async move {
            let terms = api.news_terms(news_id).await.unwrap_or_else(|e| {
                warn!(news_id, "failed to load terms: {}", e);
                Vec::new()
            });
            AppMessage::Terms { news_id, terms }
        });

        trigger_term_generation(self.api.clone(), news_id);

        self.quiz.reset();
        self.quiz.set_loading(true);
        let api = self.api.clone();
        self.spawn(async move {
            let quizzes = api.generate_quiz(news_id).await.unwrap_or_else(|e| {
                warn!(news_id, "quiz generation failed: {}", e);
                Vec::new()
            });
            AppMessage::Quizzes { news_id, quizzes }
        });

        let mut widget = ArticleWidget::new(news_id);
        let session = self.poller.start(news_id);
        widget.detail_mut().attach_session(session);
        self.article = Some(widget);
        self.tab = Tab::News;
    }

    pub fn close_article(&mut self) {
        self.poller.stop();
        if let Some(mut widget) = self.article.take() {
            widget.detail_mut().detach_session();
            debug!(news_id = widget.news_id(), "article closed");
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        if tab == Tab::Dictionary && self.dictionary.needs_load() {
            self.load_dictionary();
        }
    }

    fn spawn_lookup(&self, news_id: NewsId, lookup: PendingLookup) {
        let api = self.api.clone();
        self.spawn(async move {
            let term = lookup_brief(api.as_ref(), lookup).await;
            AppMessage::TermBrief {
                news_id,
                ticket: lookup.ticket,
                term,
            }
        });
    }

    fn start_quiz(&mut self) {
        let Some(widget) = &self.article else {
            return;
        };
        match QuizSession::new(Some(widget.news_id()), widget.quizzes().to_vec()) {
            Some(session) => {
                self.quiz.load(Some(session));
                self.tab = Tab::Quiz;
            }
            None => self.status = Some("퀴즈를 준비하고 있습니다".to_string()),
        }
    }

    fn answer_quiz(&mut self, choice: usize) {
        let Some(session) = self.quiz.session_mut() else {
            return;
        };
        let Some((quiz_id, answer)) = session.choose(choice) else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let result = match api.submit_quiz(quiz_id, &answer).await {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(quiz_id, "quiz submission failed: {}", e);
                    None
                }
            };
            AppMessage::QuizGraded { quiz_id, result }
        });
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::NewsList {
                category,
                page,
                result,
            } => {
                if !self.news.update_data(category, page, result) {
                    debug!(?category, page, "dropping stale news page");
                }
            }
            AppMessage::Article { news_id, article } => {
                let Some(widget) = self.article.as_mut().filter(|w| w.news_id() == news_id) else {
                    return;
                };
                match article {
                    Some(article) => widget.detail_mut().set_article(article),
                    None => self.status = Some("기사를 불러오지 못했습니다".to_string()),
                }
            }
            AppMessage::Terms { news_id, terms } => {
                if let Some(widget) = self.article.as_mut().filter(|w| w.news_id() == news_id) {
                    // A poll may already have seen a larger set.
                    if terms.len() >= widget.detail().terms().len() {
                        widget.detail_mut().set_terms(terms);
                    }
                }
            }
            AppMessage::TermBrief {
                news_id,
                ticket,
                term,
            } => {
                if let Some(widget) = self.article.as_mut().filter(|w| w.news_id() == news_id) {
                    widget.detail_mut().popup_mut().resolve(ticket, term);
                }
            }
            AppMessage::Quizzes { news_id, quizzes } => {
                if let Some(widget) = self.article.as_mut().filter(|w| w.news_id() == news_id) {
                    widget.set_quizzes(quizzes);
                    self.quiz.set_loading(false);
                }
            }
            AppMessage::QuizGraded { quiz_id, result } => {
                if result.is_none() {
                    self.status = Some("채점에 실패했습니다. 다시 골라 주세요".to_string());
                }
                if let Some(session) = self.quiz.session_mut() {
                    session.record(quiz_id, result);
                }
            }
            AppMessage::Dictionary(result) => self.dictionary.update_data(result),
            AppMessage::DictionaryDetail(detail) => self.dictionary.show_detail(detail),
        }
    }

    pub fn handle_poll_event(&mut self, event: PollEvent) {
        if !self.poller.is_live(event.session()) {
            debug!(session = event.session(), "dropping event from stopped session");
            return;
        }
        if let PollEvent::Finished {
            news_id,
            attempts,
            reason,
            ..
        } = &event
        {
            info!(news_id, attempts, ?reason, "term polling finished");
        }
        if let Some(widget) = self.article.as_mut() {
            widget.detail_mut().apply_poll_event(event);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.tab == Tab::Dictionary && self.dictionary.is_editing() {
            self.handle_filter_key(key.code);
            return;
        }

        self.status = None;
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::F(1) => return self.switch_tab(Tab::News),
            KeyCode::F(2) => return self.switch_tab(Tab::Dictionary),
            KeyCode::F(3) => return self.switch_tab(Tab::Quiz),
            KeyCode::Char(c @ '1'..='3') if self.tab != Tab::Quiz => {
                return self.switch_tab(Tab::ALL[usize::from(c as u8 - b'1')]);
            }
            _ => {}
        }

        match self.tab {
            Tab::News if self.article.is_some() => self.handle_article_key(key.code),
            Tab::News => self.handle_news_key(key.code),
            Tab::Dictionary => self.handle_dictionary_key(key.code),
            Tab::Quiz => self.handle_quiz_key(key.code),
        }
    }

    fn handle_news_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => self.news.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.news.scroll_down(),
            KeyCode::Left | KeyCode::Char('h') => {
                self.news.prev_category();
                self.load_news();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.news.next_category();
                self.load_news();
            }
            KeyCode::Char('[') => {
                if self.news.prev_page() {
                    self.load_news();
                }
            }
            KeyCode::Char(']') => {
                self.news.next_page();
                self.load_news();
            }
            KeyCode::Char('r') => self.load_news(),
            KeyCode::Enter => {
                if let Some(news_id) = self.news.selected().map(|n| n.news_id) {
                    self.open_article(news_id);
                }
            }
            KeyCode::Char('o') => {
                if let Some(url) = self.news.selected().and_then(|n| n.original_url.clone()) {
                    if let Err(e) = open::that(&url) {
                        warn!(url, "failed to open browser: {}", e);
                        self.status = Some(format!("브라우저를 열 수 없습니다: {}", e));
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_article_key(&mut self, code: KeyCode) {
        let Some(widget) = self.article.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                if !widget.close_popup() {
                    self.close_article();
                }
            }
            KeyCode::Backspace => self.close_article(),
            KeyCode::Up | KeyCode::Char('k') => widget.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => widget.scroll_down(),
            KeyCode::Tab => widget.focus_next_marker(),
            KeyCode::Enter => {
                let news_id = widget.news_id();
                if let Some(lookup) = widget.activate_focused() {
                    self.spawn_lookup(news_id, lookup);
                }
            }
            KeyCode::Char('z') => self.start_quiz(),
            _ => {}
        }
    }

    fn handle_dictionary_key(&mut self, code: KeyCode) {
        if self.dictionary.has_detail() {
            if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace) {
                self.dictionary.close_detail();
            }
            return;
        }
        match code {
            KeyCode::Char('/') => self.dictionary.start_editing(),
            KeyCode::Up | KeyCode::Char('k') => self.dictionary.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.dictionary.scroll_down(),
            KeyCode::Char('r') => self.load_dictionary(),
            KeyCode::Esc => {
                self.dictionary.close_detail();
            }
            KeyCode::Enter => {
                let Some(term_id) = self.dictionary.selected_id() else {
                    return;
                };
                self.dictionary.open_detail();
                let api = self.api.clone();
                self.spawn(async move {
                    let detail = match api.term_detail(term_id).await {
                        Ok(detail) => Some(detail),
                        Err(e) => {
                            warn!(term_id, "failed to load term detail: {}", e);
                            None
                        }
                    };
                    AppMessage::DictionaryDetail(detail)
                });
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Enter => self.dictionary.stop_editing(),
            KeyCode::Backspace => self.dictionary.delete_char(),
            KeyCode::Char(c) => self.dictionary.add_char(c),
            _ => {}
        }
    }

    fn handle_quiz_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c @ '1'..='9') => self.answer_quiz(usize::from(c as u8 - b'1')),
            KeyCode::Enter | KeyCode::Char('n') => {
                if let Some(session) = self.quiz.session_mut() {
                    session.next();
                }
            }
            KeyCode::Esc => {
                if self
                    .quiz
                    .session()
                    .is_some_and(|s| s.phase() == QuizPhase::Finished)
                {
                    self.quiz.reset();
                }
                self.tab = Tab::News;
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.current_view().scroll_up(),
            MouseEventKind::ScrollDown => self.current_view().scroll_down(),
            MouseEventKind::Down(MouseButton::Left) if self.tab == Tab::News => {
                let Some(widget) = self.article.as_mut() else {
                    return;
                };
                let news_id = widget.news_id();
                if let Some(lookup) = widget.click(mouse.column, mouse.row) {
                    self.spawn_lookup(news_id, lookup);
                }
            }
            _ => {}
        }
    }

    fn current_view(&mut self) -> &mut dyn View {
        match self.tab {
            Tab::News => match self.article.as_mut() {
                Some(widget) => widget as &mut dyn View,
                None => &mut self.news as &mut dyn View,
            },
            Tab::Dictionary => &mut self.dictionary,
            Tab::Quiz => &mut self.quiz,
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let selected = Tab::ALL.iter().position(|t| *t == self.tab).unwrap_or(0);
        let tabs = Tabs::new(Tab::ALL.iter().map(|t| Line::from(t.label())))
            .select(selected)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, chunks[0]);

        let view = self.current_view();
        let title = view.title().to_string();
        view.render(frame, chunks[1]);

        let status = match &self.status {
            Some(message) => Span::styled(format!(" {}", message), Style::default().fg(Color::Red)),
            None => Span::styled(
                format!(" {}  q quit  F1-F3 tabs  ↑/↓ scroll  Tab term  Esc back", title),
                Style::default().fg(Color::DarkGray),
            ),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[2]);
    }
}
