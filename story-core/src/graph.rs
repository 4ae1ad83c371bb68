//! Graph store: the immutable question/answer/final-variant collections
//! of one session.

use std::collections::HashMap;
use storybot::{Answer, FinalVariant, GraphPayload, NodeId, Question};

/// Order marker of the distinguished "choose a version" result node.
///
/// This is an authoring convention of the story data, not a structural
/// guarantee: a graph may lack such a node, in which case the final
/// sequence has nowhere to land.
pub const RESULT_NODE_ORDER: i64 = 10;

/// Read-only snapshot of a loaded story graph.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Questions in source order, one entry per id.
    questions: Vec<Question>,
    /// Id index into `questions`.
    index: HashMap<NodeId, usize>,
    /// Answers in source order.
    answers: Vec<Answer>,
    /// Final variants, stably sorted by `order` at load time.
    final_variants: Vec<FinalVariant>,
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all three collections at once.
    ///
    /// Questions sharing an id collapse into one entry; the last one wins
    /// but keeps the position of the first.
    pub fn load(
        &mut self,
        questions: Vec<Question>,
        answers: Vec<Answer>,
        final_variants: Vec<FinalVariant>,
    ) {
        let mut deduped: Vec<Question> = Vec::with_capacity(questions.len());
        let mut index = HashMap::with_capacity(questions.len());

        for question in questions {
            match index.get(&question.id) {
                Some(&slot) => deduped[slot] = question,
                None => {
                    index.insert(question.id.clone(), deduped.len());
                    deduped.push(question);
                }
            }
        }

        let mut final_variants = final_variants;
        // `sort_by_key` is stable, so unordered slides keep their source order.
        final_variants.sort_by_key(|variant| (variant.order.is_none(), variant.order));

        *self = Self {
            questions: deduped,
            index,
            answers,
            final_variants,
        };
    }

    /// Load a decoded backend payload.
    pub fn load_payload(&mut self, payload: GraphPayload) {
        self.load(payload.questions, payload.answers, payload.final_variants);
    }

    /// True if no questions are loaded.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// All questions in source order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// All answers in source order.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Find a question by id.
    pub fn find_question(&self, id: &NodeId) -> Option<&Question> {
        self.index.get(id).map(|&slot| &self.questions[slot])
    }

    /// Find a question by its persisted, string-coerced id.
    pub fn find_question_by_str(&self, raw: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id.matches_str(raw))
    }

    /// Answers owned by a question, in source order.
    pub fn answers_for<'a>(&'a self, question_id: &'a NodeId) -> impl Iterator<Item = &'a Answer> + 'a {
        self.answers
            .iter()
            .filter(move |answer| &answer.question_id == question_id)
    }

    /// Final variants sorted ascending by `order`, unordered ones last.
    pub fn final_variants_sorted(&self) -> &[FinalVariant] {
        &self.final_variants
    }

    /// The start node: lowest `order`, with a missing order counting as 0.
    ///
    /// Ties go to the earliest question in source order.
    pub fn start_question(&self) -> Option<&Question> {
        self.questions.iter().min_by_key(|q| q.order.unwrap_or(0))
    }

    /// First question carrying exactly this order marker.
    pub fn question_by_order(&self, order: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.order == Some(order))
    }

    /// The distinguished result node, see [`RESULT_NODE_ORDER`].
    pub fn result_question(&self) -> Option<&Question> {
        self.question_by_order(RESULT_NODE_ORDER)
    }

    /// Number of distinct questions.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Number of answers.
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{answer, final_variant, question};

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &NodeId) -> Vec<NodeId> {
        items.iter().map(|item| id(item).clone()).collect()
    }

    #[test]
    fn test_store_creation() {
        let store = GraphStore::new();
        assert!(store.is_empty());
        assert!(store.start_question().is_none());
        assert!(store.final_variants_sorted().is_empty());
    }

    #[test]
    fn test_find_question() {
        let mut store = GraphStore::new();
        store.load(vec![question(1, Some(1)), question(2, Some(2))], vec![], vec![]);

        assert_eq!(store.find_question(&NodeId::Number(2)).map(|q| q.order), Some(Some(2)));
        assert!(store.find_question(&NodeId::Number(3)).is_none());
        assert!(store.find_question(&NodeId::from("2")).is_none());
        assert!(store.find_question_by_str("2").is_some());
    }

    #[test]
    fn test_duplicate_question_last_write_wins() {
        let mut first = question(1, Some(1));
        first.text = "first".into();
        let mut second = question(1, Some(1));
        second.text = "second".into();

        let mut store = GraphStore::new();
        store.load(vec![first, question(2, Some(2)), second], vec![], vec![]);

        assert_eq!(store.question_count(), 2);
        assert_eq!(store.questions()[0].text, "second");
        assert_eq!(store.find_question(&NodeId::Number(1)).unwrap().text, "second");
    }

    #[test]
    fn test_answers_for_keeps_source_order() {
        let mut store = GraphStore::new();
        store.load(
            vec![question(1, Some(1)), question(2, Some(2))],
            vec![
                answer(12, 1, Some(2)),
                answer(20, 2, None),
                answer(11, 1, Some(2)),
            ],
            vec![],
        );

        let q1 = NodeId::Number(1);
        let first: Vec<_> = store.answers_for(&q1).map(|a| a.id.clone()).collect();
        let again: Vec<_> = store.answers_for(&q1).map(|a| a.id.clone()).collect();
        assert_eq!(first, vec![NodeId::Number(12), NodeId::Number(11)]);
        assert_eq!(first, again);
    }

    #[test]
    fn test_final_variants_stable_sort() {
        let mut store = GraphStore::new();
        store.load(
            vec![],
            vec![],
            vec![
                final_variant(1, Some(2), "B"),
                final_variant(2, Some(1), "A"),
                final_variant(3, None, "C"),
            ],
        );

        assert_eq!(
            ids(store.final_variants_sorted(), |v| &v.id),
            vec![NodeId::Number(2), NodeId::Number(1), NodeId::Number(3)]
        );
    }

    #[test]
    fn test_final_variants_ties_keep_source_order() {
        let mut store = GraphStore::new();
        store.load(
            vec![],
            vec![],
            vec![
                final_variant(1, None, "x"),
                final_variant(2, Some(5), "y"),
                final_variant(3, None, "z"),
                final_variant(4, Some(5), "w"),
            ],
        );

        assert_eq!(
            ids(store.final_variants_sorted(), |v| &v.id),
            vec![
                NodeId::Number(2),
                NodeId::Number(4),
                NodeId::Number(1),
                NodeId::Number(3)
            ]
        );
    }

    #[test]
    fn test_start_question_treats_missing_order_as_zero() {
        let mut store = GraphStore::new();
        store.load(vec![question(5, Some(3)), question(6, None), question(7, Some(1))], vec![], vec![]);
        assert_eq!(store.start_question().unwrap().id, NodeId::Number(6));

        store.load(vec![question(5, Some(3)), question(7, Some(-1))], vec![], vec![]);
        assert_eq!(store.start_question().unwrap().id, NodeId::Number(7));
    }

    #[test]
    fn test_start_question_tie_goes_to_first() {
        let mut store = GraphStore::new();
        store.load(vec![question(8, Some(1)), question(9, Some(1))], vec![], vec![]);
        assert_eq!(store.start_question().unwrap().id, NodeId::Number(8));
    }

    #[test]
    fn test_result_question() {
        let mut store = GraphStore::new();
        store.load(vec![question(1, Some(1)), question(99, Some(RESULT_NODE_ORDER))], vec![], vec![]);
        assert_eq!(store.result_question().unwrap().id, NodeId::Number(99));

        store.load(vec![question(1, Some(1))], vec![], vec![]);
        assert!(store.result_question().is_none());
    }

    #[test]
    fn test_load_replaces_everything() {
        let mut store = GraphStore::new();
        store.load(
            vec![question(1, Some(1))],
            vec![answer(10, 1, None)],
            vec![final_variant(100, Some(1), "A")],
        );
        store.load(vec![question(2, Some(1))], vec![], vec![]);

        assert!(store.find_question(&NodeId::Number(1)).is_none());
        assert_eq!(store.answer_count(), 0);
        assert!(store.final_variants_sorted().is_empty());
    }
}
