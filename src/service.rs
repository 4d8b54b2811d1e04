//! Question service: classification -> template -> query -> answer.
//!
//! Two usage modes:
//!
//! - two-phase: [`QuestionService::generate_query`] returns the query text and
//!   template id without running it; [`QuestionService::execute_query`] runs a
//!   (query text, template id) pair
//! - single-phase: [`QuestionService::process_question`] does both

use std::sync::Arc;

use serde::Serialize;

use crate::classify::{ClassificationOutcome, Classifier};
use crate::error::ServiceError;
use crate::kb::KnowledgeBase;
use crate::template::{self, TemplateStore};

/// Result type for the question service.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Default separator between answer values.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Default answer when a query matches nothing.
pub const DEFAULT_NO_RESULTS: &str = "Nenhum resultado encontrado.";

/// Templates whose answer is a ticker rather than a value.
const TICKER_TEMPLATES: [&str; 2] = ["Template_2A", "Template_3A"];

/// Variable projected from the results of template `template_id`.
///
/// Fixed by template id, never derived from the query text.
pub fn target_variable(template_id: &str) -> &'static str {
    if TICKER_TEMPLATES.contains(&template_id) {
        "ticker"
    } else {
        "valor"
    }
}

/// Output of the first phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub query_text: String,
    pub template_id: String,
}

/// Output of the second phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub query_text: String,
    pub answer: String,
}

/// How answers are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFormat {
    pub separator: String,
    pub no_results: String,
}

impl Default for AnswerFormat {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            no_results: DEFAULT_NO_RESULTS.to_string(),
        }
    }
}

impl AnswerFormat {
    /// Join `values`, or the no-results message when there are none.
    pub fn render(&self, values: &[String]) -> String {
        if values.is_empty() {
            self.no_results.clone()
        } else {
            values.join(&self.separator)
        }
    }
}

/// The orchestrator. Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct QuestionService {
    kb: Arc<KnowledgeBase>,
    classifier: Arc<dyn Classifier>,
    templates: Arc<dyn TemplateStore>,
    format: AnswerFormat,
}

impl std::fmt::Debug for QuestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionService")
            .field("kb", &self.kb)
            .field("format", &self.format)
            .finish()
    }
}

impl QuestionService {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        classifier: Arc<dyn Classifier>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            kb,
            classifier,
            templates,
            format: AnswerFormat::default(),
        }
    }

    pub fn with_format(mut self, format: AnswerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// Phase 1: classify `question` and fill the selected template.
    pub fn generate_query(&self, question: &str) -> ServiceResult<GeneratedQuery> {
        let question = require("question", question)?;

        let (template_id, placeholders) = match self.classifier.classify(question)? {
            ClassificationOutcome::Resolved {
                template_id,
                placeholders,
            } => (template_id, placeholders),
            ClassificationOutcome::Failed { message } => {
                tracing::info!(%message, "classifier could not handle question");
                return Err(ServiceError::Reported { message });
            }
        };

        let query_text = template::render(self.templates.as_ref(), &template_id, &placeholders)?;
        tracing::info!(
            template_id = %template_id,
            placeholders = placeholders.len(),
            "query generated"
        );
        Ok(GeneratedQuery {
            query_text,
            template_id,
        })
    }

    /// Phase 2: run `query_text`, projecting the variable fixed for `template_id`.
    pub fn execute_query(&self, query_text: &str, template_id: &str) -> ServiceResult<Answer> {
        let query_text = require("query text", query_text)?;
        let template_id = require("template id", template_id)?;

        let variable = target_variable(template_id);
        let values = self.kb.execute_query(query_text, variable)?;
        tracing::info!(template_id, variable, results = values.len(), "query answered");
        Ok(Answer {
            query_text: query_text.to_string(),
            answer: self.format.render(&values),
        })
    }

    /// Both phases back to back.
    pub fn process_question(&self, question: &str) -> ServiceResult<Answer> {
        let generated = self.generate_query(question)?;
        self.execute_query(&generated.query_text, &generated.template_id)
    }
}

fn require<'a>(field: &str, value: &'a str) -> ServiceResult<&'a str> {
    if value.trim().is_empty() {
        Err(ServiceError::Validation {
            message: format!("{field} must not be blank"),
        })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FixedClassifier, UnavailableClassifier};
    use crate::error::{QueryError, TemplateError};
    use crate::etl::{Cell, CompanyColumns, MemorySource, SchemaSource, Sources, TradingColumns};
    use crate::template::MemoryTemplateStore;
    use std::collections::BTreeMap;

    const TICKERS: &str = "PREFIX b3: <https://dcm.ffclrp.usp.br/lssb/stock-market-ontology#>
        SELECT ?ticker WHERE { ?s b3:ticker ?ticker . FILTER(?ticker = \"#T#\") }";

    fn kb() -> Arc<KnowledgeBase> {
        let kb = KnowledgeBase::new();
        kb.initialize(&Sources {
            schema: SchemaSource::Inline {
                name: "empty".into(),
                turtle: String::new(),
            },
            companies: Box::new(MemorySource::new(
                "companies",
                vec![
                    vec![Cell::from("Nome"), Cell::from("Tickers")],
                    vec![Cell::from("Vale"), Cell::from("VALE3")],
                ],
            )),
            trading: Vec::new(),
            company_columns: CompanyColumns::default(),
            trading_columns: TradingColumns::default(),
        })
        .unwrap();
        Arc::new(kb)
    }

    fn resolved(id: &str, pairs: &[(&str, &str)]) -> Arc<dyn Classifier> {
        Arc::new(FixedClassifier::new(ClassificationOutcome::Resolved {
            template_id: id.into(),
            placeholders: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }))
    }

    fn templates() -> Arc<dyn TemplateStore> {
        Arc::new(MemoryTemplateStore::new().with("Template_2A", TICKERS))
    }

    #[test]
    fn target_variable_table() {
        assert_eq!(target_variable("Template_2A"), "ticker");
        assert_eq!(target_variable("Template_3A"), "ticker");
        assert_eq!(target_variable("Template_1A"), "valor");
        assert_eq!(target_variable("Template_3B"), "valor");
        assert_eq!(target_variable(""), "valor");
    }

    #[test]
    fn render_joins_or_reports_no_results() {
        let f = AnswerFormat::default();
        assert_eq!(f.render(&[]), DEFAULT_NO_RESULTS);
        assert_eq!(f.render(&["a".into(), "b".into()]), "a\nb");
    }

    #[test]
    fn process_question_end_to_end() {
        let svc = QuestionService::new(kb(), resolved("Template_2A", &[("#T#", "VALE3")]), templates());
        let answer = svc.process_question("qual o ticker da Vale?").unwrap();
        assert_eq!(answer.answer, "VALE3");
        assert!(answer.query_text.contains("\"VALE3\""));
    }

    #[test]
    fn generate_then_execute_matches_single_phase() {
        let svc = QuestionService::new(kb(), resolved("Template_2A", &[("#T#", "VALE3")]), templates());
        let generated = svc.generate_query("ticker da Vale").unwrap();
        assert_eq!(generated.template_id, "Template_2A");
        let answer = svc
            .execute_query(&generated.query_text, &generated.template_id)
            .unwrap();
        assert_eq!(answer, svc.process_question("ticker da Vale").unwrap());
    }

    #[test]
    fn blank_question_is_rejected_before_classification() {
        let svc = QuestionService::new(
            kb(),
            Arc::new(UnavailableClassifier::new("unused")),
            templates(),
        );
        assert!(matches!(
            svc.generate_query("   "),
            Err(ServiceError::Validation { .. })
        ));
    }

    #[test]
    fn reported_failure_skips_template_resolution() {
        let classifier = Arc::new(FixedClassifier::new(ClassificationOutcome::Failed {
            message: "não entendi".into(),
        }));
        // An empty store would yield NotFound if resolution were attempted.
        let svc = QuestionService::new(kb(), classifier, Arc::new(MemoryTemplateStore::new()));
        match svc.process_question("?") {
            Err(ServiceError::Reported { message }) => assert_eq!(message, "não entendi"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_template_is_not_found() {
        let svc = QuestionService::new(kb(), resolved("Template_9Z", &[]), templates());
        assert!(matches!(
            svc.generate_query("?"),
            Err(ServiceError::Template(TemplateError::NotFound { .. }))
        ));
    }

    #[test]
    fn no_match_and_bad_query_are_different() {
        let svc = QuestionService::new(kb(), resolved("Template_2A", &[]), templates());
        let empty = svc
            .execute_query("SELECT ?valor WHERE { ?valor a <urn:none> }", "Template_1A")
            .unwrap();
        assert_eq!(empty.answer, DEFAULT_NO_RESULTS);

        assert!(matches!(
            svc.execute_query("SELECT ?valor WHERE {", "Template_1A"),
            Err(ServiceError::Query(QueryError::Syntax { .. }))
        ));
    }
}
