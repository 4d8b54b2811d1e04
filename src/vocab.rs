//! The stock-market ontology vocabulary.
//!
//! Every resource lives in one fixed namespace. Resource keys are built from
//! already-normalized company/sector keys, validated tickers or ISO dates, so
//! the resulting IRIs are always well-formed.

use chrono::NaiveDate;
use oxigraph::model::NamedNode;

/// IRI namespace of the stock-market ontology.
pub const B3_NS: &str = "https://dcm.ffclrp.usp.br/lssb/stock-market-ontology#";

/// Prefix conventionally bound to [`B3_NS`] in templates and dumps.
pub const B3_PREFIX: &str = "b3";

/// Classes asserted by the loader.
pub mod class {
    pub const COMPANY: &str = "Empresa_Capital_Aberto";
    pub const SECTOR: &str = "Setor_Atuacao";
    pub const SECURITY: &str = "Valor_Mobiliario_Negociado";
    pub const SESSION: &str = "Pregao";
    pub const TRADED_FACT: &str = "Negociado_Em_Pregao";
}

/// Properties asserted by the loader.
pub mod prop {
    pub const TICKER: &str = "ticker";
    pub const HAS_SECURITY: &str = "temValorMobiliarioNegociado";
    pub const REPRESENTED_BY: &str = "representadoPor";
    pub const IN_SECTOR: &str = "atuaEm";
    pub const TRADED: &str = "negociado";
    pub const TRADED_DURING: &str = "negociadoDurante";
    pub const ON_DATE: &str = "ocorreEmData";
    pub const OPENING_PRICE: &str = "precoAbertura";
    pub const CLOSING_PRICE: &str = "precoFechamento";
}

/// Language tag carried by company and sector labels.
pub const LABEL_LANG: &str = "pt";

/// Build a node in the ontology namespace.
///
/// `local` must already be IRI-safe (normalized key, ticker, class or
/// property name).
pub fn node(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{B3_NS}{local}"))
}

pub fn company(key: &str) -> NamedNode {
    node(&format!("Empresa_{key}"))
}

pub fn sector(key: &str) -> NamedNode {
    node(&format!("Setor_{key}"))
}

pub fn security(ticker: &str) -> NamedNode {
    node(ticker)
}

pub fn security_code(ticker: &str) -> NamedNode {
    node(&format!("Codigo_{ticker}"))
}

/// Composite resource for "ticker traded on date".
pub fn traded_fact(ticker: &str, date: NaiveDate) -> NamedNode {
    node(&format!("Negociado_{ticker}_{}", compact_date(date)))
}

/// Trading session shared by every ticker traded on `date`.
pub fn session(date: NaiveDate) -> NamedNode {
    node(&format!("Pregao_{}", compact_date(date)))
}

/// `yyyymmdd` form used inside resource keys.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_keys_follow_naming_scheme() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            traded_fact("PETR4", date).as_str(),
            format!("{B3_NS}Negociado_PETR4_20240102")
        );
        assert_eq!(session(date).as_str(), format!("{B3_NS}Pregao_20240102"));
        assert_eq!(company("petrobras").as_str(), format!("{B3_NS}Empresa_petrobras"));
        assert_eq!(security_code("ITUB4").as_str(), format!("{B3_NS}Codigo_ITUB4"));
    }
}
