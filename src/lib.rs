// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # natural2sparql
//!
//! Answers natural-language questions about the stock market by turning them
//! into SPARQL over a small knowledge graph built from reference spreadsheets.
//!
//! ## Architecture
//!
//! - **Graph store** (`graph`): deduplicated base facts on `oxigraph::model::Graph`
//! - **ETL** (`etl`): ontology schema plus company and trading-session sheets
//! - **Inference** (`infer`): RDFS closure producing the read-only inference view
//! - **Knowledge base** (`kb`): build-once lifecycle, shared/exclusive locking, SPARQL
//! - **Templates** (`template`): SPARQL skeletons filled from placeholder maps
//! - **Classifier** (`classify`): external process choosing a template for a question
//! - **Service** (`service`): classification -> template -> query -> answer
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use natural2sparql::config::AppConfig;
//! use natural2sparql::service::QuestionService;
//!
//! let config = AppConfig::load_or_default(None).unwrap();
//! let kb = Arc::new(config.knowledge_base());
//! kb.initialize(&config.sources()).unwrap();
//!
//! let service = QuestionService::new(kb, config.classifier(), Arc::new(config.template_store()))
//!     .with_format(config.answer_format());
//! let answer = service.process_question("Qual o preço de fechamento da PETR4 em 02/01/2024?").unwrap();
//! println!("{}", answer.answer);
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod etl;
pub mod graph;
pub mod infer;
pub mod kb;
pub mod normalize;
pub mod service;
pub mod template;
pub mod vocab;
