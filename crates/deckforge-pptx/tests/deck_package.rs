//! Deck-to-package integration: routed blocks rendered and written, then the
//! buffer re-opened and inspected.

use deckforge_model::{Block, BlockKey, Config, RunContext, Scope};
use deckforge_pptx::render::{build_deck, DeckInput};
use deckforge_pptx::{Assets, PptxWriter, SlideKind};
use deckforge_template::{route, StyleProfileCache, TemplateContract};
use serde_json::json;
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn routed(key: BlockKey, data: serde_json::Value) -> Block {
    let contract = TemplateContract::default();
    let mut block = Block::new(key, data);
    block.route = Some(route(&contract, &block, None).unwrap().route);
    block
}

fn sample_blocks() -> Vec<Block> {
    vec![
        routed(
            BlockKey::FoundationalActs,
            json!({"acts": [
                {"name": "Energy Law", "year": 2010, "description": "Audit obligations",
                 "requirements": "Reporting", "penalties": "Fines"}
            ],
            "keyMessage": "Regulation exists; enforcement lags."}),
        ),
        routed(
            BlockKey::EscoMarket,
            json!({"segments": [
                {"name": "Industrial", "share": 55.0},
                {"name": "Commercial", "share": 30.0},
                {"name": "Public", "share": 15.0}
            ],
            "unit": "% of revenue",
            "insights": ["Industrial dominates ESCO revenue"]}),
        ),
        routed(
            BlockKey::CaseStudy,
            json!({"company": "Osaka Gas", "year": 2018, "mode": "JV",
                   "outcome": "Profitable from year three",
                   "lessons": ["Move with a local partner", "Price in dong volatility"],
                   "applicability": "A JV-first path matches current licensing ambiguity."}),
        ),
    ]
}

fn build(strict: bool) -> (Vec<u8>, Vec<SlideKind>) {
    let contract = TemplateContract::default();
    let scope = Scope::default();
    let assets = Assets::empty();
    let blocks = sample_blocks();

    let mut config = Config::default();
    config.strict_template_fidelity = strict;
    let mut run = RunContext::new(config);
    let mut styles = StyleProfileCache::new();

    let deck = build_deck(
        DeckInput {
            blocks: &blocks,
            contract: &contract,
            scope: &scope,
            country: "Vietnam",
            executive_summary: Some("A compact summary of the opportunity."),
            assets: &assets,
        },
        &mut run,
        &mut styles,
    )
    .unwrap();

    let kinds = deck.slides.iter().map(|s| s.kind).collect();

    let mut writer = PptxWriter::new(&contract).with_title("Vietnam");
    writer.add_slides(deck.slides);
    (writer.generate().unwrap(), kinds)
}

fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn package_has_all_expected_parts() {
    let (bytes, kinds) = build(true);
    let slide_count = kinds.len();

    let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
    for required in [
        "[Content_Types].xml",
        "_rels/.rels",
        "ppt/presentation.xml",
        "ppt/_rels/presentation.xml.rels",
        "ppt/theme/theme1.xml",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/slideLayouts/slideLayout2.xml",
    ] {
        assert!(archive.by_name(required).is_ok(), "missing {required}");
    }
    for i in 1..=slide_count {
        assert!(
            archive.by_name(&format!("ppt/slides/slide{i}.xml")).is_ok(),
            "missing slide {i}"
        );
    }

    // The ESCO chart produced a chart part with an override
    drop(archive);
    let types = read_entry(&bytes, "[Content_Types].xml");
    assert!(types.contains("/ppt/charts/chart1.xml"));
}

#[test]
fn content_slides_carry_rule_lines_at_contract_offsets() {
    let contract = TemplateContract::default();
    let (bytes, kinds) = build(true);

    for (i, kind) in kinds.iter().enumerate() {
        let xml = read_entry(&bytes, &format!("ppt/slides/slide{}.xml", i + 1));
        let has_rules = xml.contains(&format!("y=\"{}\"", contract.header_line_y_emu))
            && xml.contains(&format!("y=\"{}\"", contract.footer_line_y_emu));

        match kind {
            SlideKind::Content | SlideKind::ExecSummary => {
                assert!(has_rules, "slide {} ({kind:?}) missing rules", i + 1)
            }
            SlideKind::Cover | SlideKind::SectionDivider | SlideKind::Closing => {
                assert!(!has_rules, "slide {} ({kind:?}) has rules", i + 1)
            }
            _ => {}
        }
    }
}

#[test]
fn regulation_table_merges_obligations_into_one_cell() {
    let (bytes, kinds) = build(true);
    let slide_num = kinds
        .iter()
        .position(|k| *k == SlideKind::Content)
        .unwrap()
        + 1;

    let xml = read_entry(&bytes, &format!("ppt/slides/slide{slide_num}.xml"));
    assert!(xml.contains("Reporting"));
    assert!(xml.contains("Penalties: Fines"));
    assert!(xml.contains("Requirements &amp; Penalties"));
}

#[test]
fn case_study_renders_facts_and_applicability() {
    let (bytes, _) = build(true);

    // The case study lands on some slide; scan all slides for its markers
    let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
    let slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    drop(archive);

    let mut found = false;
    for name in slide_names {
        let xml = read_entry(&bytes, &name);
        if xml.contains("Osaka Gas") {
            assert!(xml.contains("Lessons Learned"));
            assert!(xml.contains("Applicability"));
            found = true;
        }
    }
    assert!(found, "case study slide not found");
}
