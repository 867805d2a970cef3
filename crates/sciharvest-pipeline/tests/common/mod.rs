//! Shared fixtures: stubbed endpoints and in-memory PDFs

#![allow(dead_code)]

use std::sync::Arc;

use lopdf::dictionary;
use lopdf::{Document, Object, Stream};
use sciharvest_core::stub::StubTransport;
use sciharvest_pipeline::config::Endpoints;
use sciharvest_pipeline::{Harvester, PipelineConfig};

pub const CROSSREF: &str = "https://crossref.test";
pub const S2: &str = "https://s2.test";
pub const OPENALEX: &str = "https://openalex.test";
pub const PUBLISHER: &str = "https://pub.test";
pub const CITATION: &str = "https://cite.test";

/// Defaults pointed at the stub hosts, with fast retries
pub fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.rate_limit.max_requests_per_window = 1000;
    config.rate_limit.window_seconds = 1.0;
    config.retry.retry_ceiling = 1;
    config.retry.base_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config.extract.extraction_workers = 2;
    config.resolver.endpoints = Endpoints {
        crossref: CROSSREF.to_string(),
        semantic_scholar: S2.to_string(),
        openalex: OPENALEX.to_string(),
        citation: CITATION.to_string(),
    };
    config
}

pub fn harvester(config: PipelineConfig, stub: StubTransport) -> (Harvester, Arc<StubTransport>) {
    let stub = Arc::new(stub);
    let harvester = Harvester::new(config, stub.clone()).expect("valid test config");
    (harvester, stub)
}

/// Crossref `/works/{doi}` body linking a PDF on the publisher host
pub fn crossref_work(doi: &str, title: &str, pdf_path: &str) -> String {
    format!(
        r#"{{"message": {{"DOI": "{doi}", "title": ["{title}"],
            "author": [{{"given": "Ada", "family": "Lovelace"}}],
            "container-title": ["Journal of Tests"],
            "issued": {{"date-parts": [[2021, 3]]}},
            "link": [{{"URL": "{PUBLISHER}{pdf_path}", "content-type": "application/pdf"}}]}}}}"#
    )
}

/// One page per entry, each showing its text in Courier
pub fn pdf(texts: &[&str]) -> Vec<u8> {
    build_pdf(texts, false)
}

/// Password-protected PDF: its `/U` entry does not match the empty user
/// password
pub fn encrypted_pdf(texts: &[&str]) -> Vec<u8> {
    build_pdf(texts, true)
}

fn build_pdf(texts: &[&str], encrypt: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = texts
        .iter()
        .map(|text| {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            })
            .into()
        })
        .collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if encrypt {
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 2,
            "R" => 3,
            "Length" => 128,
            "P" => -44,
            "O" => Object::string_literal(vec![0u8; 32]),
            "U" => Object::string_literal(vec![0u8; 32]),
        });
        let file_id = Object::string_literal(b"sciharvest-test!".to_vec());
        doc.trailer.set("Encrypt", encrypt_id);
        doc.trailer.set("ID", vec![file_id.clone(), file_id]);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("in-memory PDF");
    out
}
