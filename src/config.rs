//! Application configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration. Relative paths are resolved against the directory of the
//! configuration file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{Classifier, DEFAULT_TIMEOUT_SECS, ProcessClassifier, UnavailableClassifier};
use crate::error::ConfigError;
use crate::etl::{CompanyColumns, SchemaSource, Sources, TableSource, TradingColumns, WorkbookSource};
use crate::kb::KnowledgeBase;
use crate::service::{AnswerFormat, DEFAULT_NO_RESULTS, DEFAULT_SEPARATOR};
use crate::template::DirTemplateStore;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "n2s.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Source files of the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_schema")]
    pub schema: PathBuf,
    #[serde(default = "default_companies")]
    pub companies: PathBuf,
    #[serde(default = "default_trading")]
    pub trading: Vec<PathBuf>,
    /// Where to write the inference view; no dump when absent.
    #[serde(default)]
    pub dump: Option<PathBuf>,
}

fn default_schema() -> PathBuf {
    "assets/ontology/stock-market.ttl".into()
}
fn default_companies() -> PathBuf {
    "assets/data/Informacoes_Empresas.xlsx".into()
}
fn default_trading() -> Vec<PathBuf> {
    vec![
        "assets/data/dados_novos_anterior.xlsx".into(),
        "assets/data/dados_novos_atual.xlsx".into(),
    ]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            companies: default_companies(),
            trading: default_trading(),
            dump: None,
        }
    }
}

/// Column positions in the spreadsheets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub companies: CompanyColumns,
    #[serde(default)]
    pub trading: TradingColumns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
}

fn default_templates_dir() -> PathBuf {
    "assets/templates".into()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

/// External classifier process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the question.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Files copied into a private working directory at startup.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "python3".into()
}
fn default_args() -> Vec<String> {
    vec!["pln_processor.py".into()]
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            assets_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_no_results")]
    pub no_results: String,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.into()
}
fn default_no_results() -> String {
    DEFAULT_NO_RESULTS.into()
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            no_results: default_no_results(),
        }
    }
}

/// HTTP server settings; `N2S_SERVER_BIND` and `N2S_SERVER_PORT` override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_concurrent_classifications")]
    pub max_concurrent_classifications: usize,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_max_concurrent_classifications() -> usize {
    4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_concurrent_classifications: default_max_concurrent_classifications(),
        }
    }
}

impl ServerConfig {
    /// Apply `N2S_SERVER_BIND` / `N2S_SERVER_PORT` if set.
    pub fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var("N2S_SERVER_BIND") {
            self.bind = bind;
        }
        if let Ok(port) = std::env::var("N2S_SERVER_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid N2S_SERVER_PORT"),
            }
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AppConfig {
    /// Parse configuration text; relative paths stay relative to the working directory.
    pub fn from_toml(text: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Read configuration from `path`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&text, &path.display().to_string())?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Resolve `path` against the configuration file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// The knowledge-base sources this configuration names.
    pub fn sources(&self) -> Sources {
        Sources {
            schema: SchemaSource::File(self.resolve(&self.sources.schema)),
            companies: Box::new(WorkbookSource::new(self.resolve(&self.sources.companies))),
            trading: self
                .sources
                .trading
                .iter()
                .map(|p| Box::new(WorkbookSource::new(self.resolve(p))) as Box<dyn TableSource>)
                .collect(),
            company_columns: self.layout.companies,
            trading_columns: self.layout.trading,
        }
    }

    /// An uninitialized knowledge base, dumping where configured.
    pub fn knowledge_base(&self) -> KnowledgeBase {
        match &self.sources.dump {
            Some(dump) => KnowledgeBase::new().with_dump_path(self.resolve(dump)),
            None => KnowledgeBase::new(),
        }
    }

    pub fn template_store(&self) -> DirTemplateStore {
        DirTemplateStore::new(self.resolve(&self.templates.dir))
    }

    /// The configured classifier.
    ///
    /// If the assets cannot be staged the returned classifier fails every
    /// call with `ClassifierError::Unavailable`; startup itself goes on.
    pub fn classifier(&self) -> Arc<dyn Classifier> {
        let c = &self.classifier;
        let process = ProcessClassifier::new(&c.program)
            .with_args(c.args.iter().cloned())
            .with_timeout(Duration::from_secs(c.timeout_secs));

        match &c.assets_dir {
            None => Arc::new(process),
            Some(dir) => match process.with_staged_assets(&self.resolve(dir)) {
                Ok(process) => Arc::new(process),
                Err(err) => {
                    tracing::error!(error = %err, "classifier unavailable, questions will be rejected");
                    Arc::new(UnavailableClassifier::new(err.to_string()))
                }
            },
        }
    }

    pub fn answer_format(&self) -> AnswerFormat {
        AnswerFormat {
            separator: self.answer.separator.clone(),
            no_results: self.answer.no_results.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("", "inline").unwrap();
        assert_eq!(config.layout.companies, CompanyColumns::default());
        assert_eq!(config.layout.trading.close, 12);
        assert_eq!(config.classifier.timeout_secs, 60);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.answer.no_results, "Nenhum resultado encontrado.");
        assert_eq!(config.sources.trading.len(), 2);
        assert!(config.sources.dump.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [sources]
            trading = ["a.xlsx"]
            dump = "out.ttl"

            [layout.trading]
            close = 9

            [answer]
            separator = ", "
            "#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.sources.trading, vec![PathBuf::from("a.xlsx")]);
        assert_eq!(config.sources.schema, default_schema());
        assert_eq!(config.layout.trading.close, 9);
        assert_eq!(config.layout.trading.ticker, 4);
        assert_eq!(config.answer_format().separator, ", ");
        assert_eq!(config.answer_format().no_results, DEFAULT_NO_RESULTS);
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = AppConfig::from_toml("[sources", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = AppConfig::load(Path::new("/nonexistent/n2s.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n2s.toml");
        std::fs::write(&path, "[templates]\ndir = \"tpl\"\n").unwrap();
        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.template_store().dir(), dir.path().join("tpl"));
        assert_eq!(config.resolve(Path::new("/abs/x.ttl")), PathBuf::from("/abs/x.ttl"));
    }

    #[test]
    fn unstageable_assets_give_unavailable_classifier() {
        let config = AppConfig::from_toml(
            "[classifier]\nassets_dir = \"/nonexistent/assets\"\n",
            "inline",
        )
        .unwrap();
        let err = config.classifier().classify("?").unwrap_err();
        assert!(matches!(err, crate::error::ClassifierError::Unavailable { .. }));
    }
}
