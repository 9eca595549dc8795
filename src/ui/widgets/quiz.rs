use super::{bordered, View};
use crate::api::{QuizResult, QuizType};
use crate::quiz::{QuizPhase, QuizSession};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Wrap},
    Frame,
};

#[derive(Default)]
pub struct QuizWidget {
    session: Option<QuizSession>,
    loading: bool,
}

impl QuizWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut QuizSession> {
        self.session.as_mut()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn load(&mut self, session: Option<QuizSession>) {
        self.loading = false;
        self.session = session;
    }

    pub fn reset(&mut self) {
        self.session = None;
        self.loading = false;
    }

    fn render_intro(&self, frame: &mut Frame, area: Rect) {
        let text = if self.loading {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "AI가 퀴즈를 생성하고 있습니다...",
                    Style::default().fg(Color::Yellow),
                )),
            ]
        } else {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "경제 용어 퀴즈",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from("기사를 열면 AI가 핵심 체크 퀴즈를 만듭니다."),
                Line::from("기사 화면에서 z 를 눌러 도전하세요."),
            ]
        };
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
    }

    fn render_finished(&self, frame: &mut Frame, area: Rect, session: &QuizSession) {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "학습 완료!",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Total Score  {} / {}", session.score(), session.len())),
            Line::from(""),
            Line::from(Span::styled(
                "Esc 로 돌아가기",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
    }

    fn render_question(&self, frame: &mut Frame, area: Rect, session: &QuizSession) {
        let Some(quiz) = session.current() else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
            ])
            .split(area);

        let ratio = (session.index() + 1) as f64 / session.len() as f64;
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("{} / {}", session.index() + 1, session.len()));
        frame.render_widget(gauge, chunks[0]);

        let kind = match quiz.quiz_type {
            QuizType::Ox => "O/X 퀴즈",
            QuizType::MultipleChoice => "객관식",
        };

        let result = session.result();
        let mut lines = vec![
            Line::from(Span::styled(
                kind,
                Style::default().fg(Color::Black).bg(Color::Cyan),
            )),
            Line::from(""),
            Line::from(Span::styled(
                quiz.question.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        for (i, option) in session.options().into_iter().enumerate() {
            lines.push(Line::from(Span::styled(
                format!("  {}. {}", i + 1, option.option_text),
                option_style(result, &option.option_text),
            )));
        }

        lines.push(Line::from(""));
        match (session.phase(), result) {
            (QuizPhase::Submitting, _) => lines.push(Line::from(Span::styled(
                "채점 중...",
                Style::default().fg(Color::Yellow),
            ))),
            (QuizPhase::Graded, Some(result)) => {
                let verdict = if result.correct {
                    Span::styled("정답입니다!", Style::default().fg(Color::Green))
                } else {
                    Span::styled("아쉬워요!", Style::default().fg(Color::Red))
                };
                lines.push(Line::from(verdict));
                if let Some(explanation) = result.explanation.as_ref().or(quiz.explanation.as_ref()) {
                    lines.push(Line::from(explanation.clone()));
                }
                lines.push(Line::from(""));
                let next = if session.index() + 1 == session.len() {
                    "Enter 결과 보기"
                } else {
                    "Enter 다음 문제"
                };
                lines.push(Line::from(Span::styled(next, Style::default().fg(Color::DarkGray))));
            }
            _ => lines.push(Line::from(Span::styled(
                "숫자 키로 답을 고르세요",
                Style::default().fg(Color::DarkGray),
            ))),
        }

        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }),
            chunks[2],
        );
    }
}

fn option_style(result: Option<&QuizResult>, text: &str) -> Style {
    let Some(result) = result else {
        return Style::default().fg(Color::White);
    };
    if result.correct_answer.as_deref() == Some(text) {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else if result.member_answer.as_deref() == Some(text) {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

impl View for QuizWidget {
    fn title(&self) -> &str {
        "Quiz"
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = bordered("퀴즈", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match &self.session {
            None => self.render_intro(frame, inner),
            Some(session) if session.phase() == QuizPhase::Finished => {
                self.render_finished(frame, inner, session)
            }
            Some(session) => self.render_question(frame, inner, session),
        }
    }

    fn scroll_up(&mut self) {}

    fn scroll_down(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Quiz, QuizOption};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn quiz() -> Quiz {
        Quiz {
            id: 1,
            quiz_type: QuizType::Ox,
            question: "기준금리를 올리면 대출이자가 오른다".to_string(),
            quiz_option_list: vec![
                QuizOption {
                    option_order: 1,
                    option_text: "O".to_string(),
                    is_correct: Some(true),
                },
                QuizOption {
                    option_order: 2,
                    option_text: "X".to_string(),
                    is_correct: Some(false),
                },
            ],
            explanation: Some("대출금리는 기준금리를 따른다".to_string()),
        }
    }

    fn render(widget: &mut QuizWidget) -> String {
        let mut terminal = Terminal::new(TestBackend::new(70, 20)).unwrap();
        terminal
            .draw(|frame| widget.render(frame, frame.area()))
            .unwrap();
        let buf = terminal.backend().buffer();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_question_then_score() {
        let mut widget = QuizWidget::new();
        widget.load(QuizSession::new(Some(1), vec![quiz()]));
        let text = render(&mut widget);
        assert!(text.contains("1. O"));
        assert!(text.contains("2. X"));

        let session = widget.session_mut().unwrap();
        let (quiz_id, answer) = session.choose(0).unwrap();
        session.record(
            quiz_id,
            Some(QuizResult {
                correct: true,
                member_answer: Some(answer.clone()),
                correct_answer: Some(answer),
                explanation: None,
            }),
        );
        session.next();

        let text = render(&mut widget);
        assert!(text.contains("Total Score  1 / 1"));
    }

    #[test]
    fn test_intro_when_no_session() {
        let mut widget = QuizWidget::new();
        widget.load(QuizSession::new(None, vec![]));
        assert!(widget.session().is_none());
        widget.set_loading(true);
        render(&mut widget);
        widget.reset();
        assert!(widget.session().is_none());
    }
}
