//! Assistant
//!
//! Caller-facing boundary. Validates the tenant, dispatches the question, runs
//! the chosen operation and turns every failure into a readable answer. Nothing
//! below this layer reaches the caller as an error.

use tracing::{error, info, warn};

use crate::company::CompanyId;
use crate::connection::ConnectionManager;
use crate::engine::Connector;
use crate::error::AppError;
use crate::format::{Answer, AnswerKind};
use crate::llm::{Classification, LlmClient};
use crate::operations;
use crate::router::{self, Domain, Intent, Operation};

/// Shown for transport and query failures
pub const UNAVAILABLE_MESSAGE: &str =
    "No data available right now: the ERP database could not be reached. Please try again shortly.";

/// Capabilities overview for a company
#[must_use]
pub fn help_text(company: CompanyId) -> String {
    format!(
        "I'm your ERP assistant for Company {company}.

I can help you with:

**Data Analysis:**
- Sales performance and revenue reports
- Inventory levels and stock management
- Cash flow and financial position

**Procedural Guides:**
- How to create Sales Invoices

Try asking me:
- \"How do I create a sales invoice?\"
- \"Show me sales summary\"
- \"What's our cash flow position?\"
- \"Any inventory alerts?\"
"
    )
}

/// Question answering over one connection manager
pub struct Assistant<C: Connector> {
    db: ConnectionManager<C>,
    llm: Option<LlmClient>,
}

impl<C: Connector> Assistant<C> {
    pub fn new(db: ConnectionManager<C>) -> Self {
        Self { db, llm: None }
    }

    /// Attach the optional LLM collaborator
    #[must_use]
    pub fn with_llm(mut self, llm: Option<LlmClient>) -> Self {
        self.llm = llm;
        self
    }

    pub fn connection(&mut self) -> &mut ConnectionManager<C> {
        &mut self.db
    }

    /// Answer a free-text question for the company given as raw text.
    ///
    /// Never fails: invalid input, missing data and outages all come back as
    /// answers whose `kind` says what happened.
    pub async fn ask(&mut self, company_raw: &str, question: &str) -> Answer {
        match company_raw.parse::<CompanyId>() {
            Ok(company) => self.ask_company(company, question).await,
            Err(e) => error_answer(&e),
        }
    }

    /// Answer a free-text question for an already validated company
    pub async fn ask_company(&mut self, company: CompanyId, question: &str) -> Answer {
        let operation = match router::try_dispatch(question) {
            Some(Intent::Help) => {
                return Answer::message(AnswerKind::Help, help_text(company)).for_company(company)
            }
            Some(Intent::Notice(notice)) => {
                return Answer::message(AnswerKind::Notice, notice).for_company(company)
            }
            Some(Intent::Domain(domain)) => router::route(question, domain),
            None => self.classify_unmatched(question, company).await,
        };
        info!(company = %company, operation = %operation, "dispatched question");

        let answer = self.answer(operation, company).await;
        self.maybe_polish(question, answer, company).await
    }

    /// Run an operation by name for the company given as raw text.
    ///
    /// Unknown names are a validation error here; callers picking from a menu
    /// should use [`Operation::in_domain`] for the per-domain fallback.
    pub async fn run(&mut self, company_raw: &str, operation_name: &str) -> Answer {
        let parsed = company_raw
            .parse::<CompanyId>()
            .and_then(|company| operation_name.parse::<Operation>().map(|op| (company, op)));

        match parsed {
            Ok((company, operation)) => self.answer(operation, company).await,
            Err(e) => error_answer(&e),
        }
    }

    /// Run `operation` and map its outcome onto an answer
    pub async fn answer(&mut self, operation: Operation, company: CompanyId) -> Answer {
        match operations::run(&mut self.db, operation, company).await {
            Ok(answer) => answer,
            Err(e) => error_answer(&e).with_operation(operation).for_company(company),
        }
    }

    async fn classify_unmatched(&self, question: &str, company: CompanyId) -> Operation {
        let Some(llm) = self.llm.as_ref().filter(|llm| llm.config().classify) else {
            return unclassified_operation(question);
        };

        let classification = llm.classify_or_fallback(question, company).await;
        classified_operation(&classification, question)
    }

    async fn maybe_polish(&self, question: &str, answer: Answer, company: CompanyId) -> Answer {
        let Some(llm) = self.llm.as_ref().filter(|llm| llm.config().polish) else {
            return answer;
        };
        if answer.kind != AnswerKind::Report {
            return answer;
        }

        match llm.polish(question, &answer.text, company).await {
            Ok(text) => Answer { text, ..answer },
            Err(e) => {
                warn!(error = %e, "answer polishing failed, returning formatted data");
                answer
            }
        }
    }
}

/// Operation for a message no rule matched and no model classified
fn unclassified_operation(question: &str) -> Operation {
    router::route(question, Domain::Sales)
}

/// Operation the classifier suggested, or the unclassified default for chatter
fn classified_operation(classification: &Classification, question: &str) -> Operation {
    classification.operation().unwrap_or_else(|| unclassified_operation(question))
}

/// User-facing answer for an error
fn error_answer(err: &AppError) -> Answer {
    if err.is_transport() {
        error!(code = err.error_code(), error = %err, "operation failed");
        return Answer::message(AnswerKind::Error, UNAVAILABLE_MESSAGE);
    }

    match err {
        AppError::NoData(message) => Answer::message(AnswerKind::NoData, message.clone()),
        AppError::SecurityViolation { .. } => {
            error!(error = %err, "operation blocked by write guard");
            Answer::message(AnswerKind::Error, err.message())
        }
        _ => {
            warn!(code = err.error_code(), error = %err, "request rejected");
            Answer::message(AnswerKind::Error, err.message())
        }
    }
}
