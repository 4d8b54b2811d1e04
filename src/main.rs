//! n2s CLI: build the stock-market knowledge base and ask it questions.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::Result;

use natural2sparql::config::AppConfig;
use natural2sparql::kb::KnowledgeBase;
use natural2sparql::service::QuestionService;

#[derive(Parser)]
#[command(name = "n2s", version, about = "Natural-language questions to SPARQL over stock-market data")]
struct Cli {
    /// Configuration file (defaults to ./n2s.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the knowledge base and print load statistics.
    Build,

    /// Run a SPARQL SELECT query and print one variable's bindings.
    Query {
        /// SPARQL query text.
        sparql: String,

        /// Variable to project.
        #[arg(long, default_value = "valor")]
        var: String,
    },

    /// Classify a question and print the generated query.
    Generate {
        /// The question.
        question: String,
    },

    /// Execute a query using a template's target variable.
    Execute {
        /// SPARQL query text.
        sparql: String,

        /// Template the query came from.
        #[arg(long)]
        template_id: String,
    },

    /// Answer a question end to end.
    Ask {
        /// The question.
        question: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Build => {
            let kb = config.knowledge_base();
            let stats = kb.initialize(&config.sources())?;
            print!("{stats}");
        }

        Commands::Query { sparql, var } => {
            let kb = build(&config)?;
            let values = kb.execute_query(&sparql, &var)?;
            for value in values {
                println!("{value}");
            }
        }

        Commands::Generate { question } => {
            // Generation never touches the graph, so skip the build.
            let service = service(&config, Arc::new(KnowledgeBase::new()));
            let generated = service.generate_query(&question)?;
            println!("# template: {}", generated.template_id);
            println!("{}", generated.query_text);
        }

        Commands::Execute { sparql, template_id } => {
            let service = service(&config, build(&config)?);
            let answer = service.execute_query(&sparql, &template_id)?;
            println!("{}", answer.answer);
        }

        Commands::Ask { question } => {
            let service = service(&config, build(&config)?);
            let answer = service.process_question(&question)?;
            println!("{}", answer.query_text.trim_end());
            println!();
            println!("{}", answer.answer);
        }
    }

    Ok(())
}

fn build(config: &AppConfig) -> Result<Arc<KnowledgeBase>> {
    let kb = config.knowledge_base();
    kb.initialize(&config.sources())?;
    Ok(Arc::new(kb))
}

fn service(config: &AppConfig, kb: Arc<KnowledgeBase>) -> QuestionService {
    QuestionService::new(kb, config.classifier(), Arc::new(config.template_store()))
        .with_format(config.answer_format())
}
