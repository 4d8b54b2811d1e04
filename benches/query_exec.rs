//! Benchmarks for knowledge-base build and query execution.

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use natural2sparql::etl::{Cell, CompanyColumns, MemorySource, SchemaSource, Sources, TradingColumns};
use natural2sparql::kb::KnowledgeBase;

const COMPANIES: usize = 200;
const SESSIONS: u64 = 60;

fn ticker(i: usize) -> String {
    let a = (b'A' + (i % 26) as u8) as char;
    let b = (b'A' + (i / 26 % 26) as u8) as char;
    format!("{a}{b}XX3")
}

fn sources() -> Sources {
    let mut companies = vec![vec![Cell::from("Empresa"), Cell::from("Tickers")]];
    for i in 0..COMPANIES {
        let mut row = vec![Cell::Empty; 6];
        row[0] = Cell::from(format!("Empresa {i}").as_str());
        row[1] = Cell::from(ticker(i).as_str());
        row[5] = Cell::from(format!("Setor {}", i % 12).as_str());
        companies.push(row);
    }

    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut trading = vec![vec![Cell::Empty; 13]];
    for day in 0..SESSIONS {
        let date = start.checked_add_days(Days::new(day)).unwrap();
        for i in 0..COMPANIES {
            let mut row = vec![Cell::Empty; 13];
            row[2] = Cell::Date(date);
            row[4] = Cell::from(ticker(i).as_str());
            row[8] = Cell::Number(10.0 + i as f64 / 4.0);
            row[12] = Cell::Number(10.25 + i as f64 / 4.0);
            trading.push(row);
        }
    }

    Sources {
        schema: SchemaSource::File(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/ontology/stock-market.ttl").into()),
        companies: Box::new(MemorySource::new("companies", companies)),
        trading: vec![Box::new(MemorySource::new("trading", trading))],
        company_columns: CompanyColumns::default(),
        trading_columns: TradingColumns::default(),
    }
}

fn bench_build(c: &mut Criterion) {
    let sources = sources();
    c.bench_function("build_200x60", |bench| {
        bench.iter(|| {
            let kb = KnowledgeBase::new();
            black_box(kb.initialize(&sources).unwrap())
        })
    });
}

fn bench_closing_price_query(c: &mut Criterion) {
    let kb = KnowledgeBase::new();
    kb.initialize(&sources()).unwrap();
    let query = r#"
        PREFIX b3: <https://dcm.ffclrp.usp.br/lssb/stock-market-ontology#>
        PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
        SELECT ?valor WHERE {
            ?codigo b3:ticker "KAXX3" .
            ?acao b3:representadoPor ?codigo ; b3:negociado ?n .
            ?n b3:negociadoDurante ?p ; b3:precoFechamento ?valor .
            ?p b3:ocorreEmData "2024-01-15"^^xsd:date .
        }"#;

    c.bench_function("closing_price_query", |bench| {
        bench.iter(|| black_box(kb.execute_query(query, "valor").unwrap()))
    });
}

fn bench_sector_query(c: &mut Criterion) {
    let kb = KnowledgeBase::new();
    kb.initialize(&sources()).unwrap();
    let query = r#"
        PREFIX b3: <https://dcm.ffclrp.usp.br/lssb/stock-market-ontology#>
        PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
        SELECT DISTINCT ?ticker WHERE {
            ?s rdfs:label "Setor 3"@pt .
            ?e b3:atuaEm ?s ; b3:temValorMobiliarioNegociado ?a .
            ?a b3:representadoPor ?c . ?c b3:ticker ?ticker .
        }"#;

    c.bench_function("sector_query", |bench| {
        bench.iter(|| black_box(kb.execute_query(query, "ticker").unwrap()))
    });
}

criterion_group!(benches, bench_build, bench_closing_price_query, bench_sector_query);
criterion_main!(benches);
