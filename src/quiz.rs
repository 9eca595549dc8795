use crate::api::{NewsId, Quiz, QuizOption, QuizResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Waiting for an answer to the current question.
    Answering,
    /// An answer was sent and is being graded.
    Submitting,
    /// The current question has been graded.
    Graded,
    /// Past the last question.
    Finished,
}

/// Walks through a generated quiz one question at a time, keeping score.
#[derive(Debug, Clone)]
pub struct QuizSession {
    news_id: Option<NewsId>,
    quizzes: Vec<Quiz>,
    index: usize,
    score: usize,
    phase: QuizPhase,
    result: Option<QuizResult>,
}

impl QuizSession {
    /// Returns `None` for an empty quiz list.
    pub fn new(news_id: Option<NewsId>, quizzes: Vec<Quiz>) -> Option<Self> {
        if quizzes.is_empty() {
            return None;
        }
        Some(Self {
            news_id,
            quizzes,
            index: 0,
            score: 0,
            phase: QuizPhase::Answering,
            result: None,
        })
    }

    pub fn news_id(&self) -> Option<NewsId> {
        self.news_id
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn current(&self) -> Option<&Quiz> {
        match self.phase {
            QuizPhase::Finished => None,
            _ => self.quizzes.get(self.index),
        }
    }

    /// Options in display order.
    pub fn options(&self) -> Vec<&QuizOption> {
        let mut options: Vec<&QuizOption> = self
            .current()
            .map(|q| q.quiz_option_list.iter().collect())
            .unwrap_or_default();
        options.sort_by_key(|o| o.option_order);
        options
    }

    /// Picks the option at `choice` (0-based, display order). Returns the
    /// quiz id and option text to submit, or `None` when the question was
    /// already answered or the choice is out of range.
    pub fn choose(&mut self, choice: usize) -> Option<(u64, String)> {
        if self.phase != QuizPhase::Answering {
            return None;
        }
        let quiz_id = self.current()?.id;
        let text = self.options().get(choice)?.option_text.clone();
        self.phase = QuizPhase::Submitting;
        Some((quiz_id, text))
    }

    /// Records the grading outcome for `quiz_id`. A failed submission lets the
    /// question be answered again.
    pub fn record(&mut self, quiz_id: u64, result: Option<QuizResult>) {
        if self.phase != QuizPhase::Submitting || self.current().map(|q| q.id) != Some(quiz_id) {
            return;
        }
        match result {
            Some(result) => {
                if result.correct {
                    self.score += 1;
                }
                self.result = Some(result);
                self.phase = QuizPhase::Graded;
            }
            None => self.phase = QuizPhase::Answering,
        }
    }

    /// Moves past a graded question.
    pub fn next(&mut self) {
        if self.phase != QuizPhase::Graded {
            return;
        }
        self.result = None;
        if self.index + 1 < self.quizzes.len() {
            self.index += 1;
            self.phase = QuizPhase::Answering;
        } else {
            self.phase = QuizPhase::Finished;
        }
    }
}
