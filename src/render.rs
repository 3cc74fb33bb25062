use crate::{
    answer::{AcceptedAnswers, Verdict},
    gallery::Gallery,
    record::{Record, NO_VALUE},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub game: String,
    pub id: String,
    pub question: String,
}

impl QuestionView {
    pub fn render(record: &Record) -> Self {
        Self {
            game: record.game_label().to_string(),
            id: record.id_label(),
            question: record.question_text().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPanel {
    pub accepted: AcceptedAnswers,
    pub expected: String,
    pub rationale: String,
    pub feedback: Option<Verdict>,
}

impl AnswerPanel {
    pub fn render(record: &Record) -> Self {
        let raw = record.raw_answer();
        Self {
            accepted: AcceptedAnswers::parse(&raw),
            expected: if raw.is_empty() { NO_VALUE.into() } else { raw },
            rationale: record.rationale_text().to_string(),
            feedback: None,
        }
    }

    pub fn check(&mut self, input: &str) -> Verdict {
        let verdict = self.accepted.check(input);
        self.feedback = Some(verdict);
        verdict
    }
}

/// Everything drawn for one loaded record. Replaced wholesale on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub path: String,
    pub question: QuestionView,
    pub answer: AnswerPanel,
    pub gallery: Option<Gallery>,
}

impl RecordView {
    pub fn render(path: &str, record: &Record, image_base: &str) -> Self {
        Self {
            path: path.to_string(),
            question: QuestionView::render(record),
            answer: AnswerPanel::render(record),
            gallery: Gallery::render(record, image_base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn question_uses_fallbacks() {
        let q = QuestionView::render(&record("{}"));
        assert_eq!(q.game, "?");
        assert_eq!(q.id, "?");
        assert_eq!(q.question, "No question provided.");
    }

    #[test]
    fn answer_panel_reference_is_always_filled() {
        let panel = AnswerPanel::render(&record(r#"{"Answer":"  Paris, France "}"#));
        assert_eq!(panel.expected, "Paris, France");
        assert_eq!(panel.rationale, "—");
        assert_eq!(panel.feedback, None);

        let panel = AnswerPanel::render(&record("{}"));
        assert_eq!(panel.expected, "—");
        assert!(panel.accepted.is_empty());
    }

    #[test]
    fn check_has_two_outcomes_and_rereads_input() {
        let mut panel = AnswerPanel::render(&record(r#"{"Answer":"7 / seven"}"#));
        assert_eq!(panel.check("8"), Verdict::TryAgain);
        assert_eq!(panel.feedback, Some(Verdict::TryAgain));
        assert_eq!(panel.check("Seven"), Verdict::Correct);
        assert_eq!(panel.feedback, Some(Verdict::Correct));
        assert_eq!(panel.check("7.0"), Verdict::Correct);
    }

    #[test]
    fn fresh_render_replaces_previous_state() {
        let mut first = RecordView::render(
            "a.json",
            &record(r#"{"Answer":"x","game_state_url":"h/1.png","Game":"G"}"#),
            "images",
        );
        first.answer.check("x");
        let second = RecordView::render("b.json", &record(r#"{"Answer":"y"}"#), "images");
        assert_eq!(second.answer.feedback, None);
        assert!(second.gallery.is_none());
        assert!(first.gallery.is_some());
        assert_eq!(second.path, "b.json");
    }
}
