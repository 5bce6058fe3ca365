//! The generation pipeline.

use crate::error::{EngineError, Result};
use deckforge_core::{classify_sections, ensure_string, normalize_section, sanitize};
use deckforge_model::geometry::inches_to_emu;
use deckforge_model::{Config, PptMetrics, RunContext, Scope, Section, TemplateSource};
use deckforge_package::postprocess::{PostprocessConfig, ThemeSpec};
use deckforge_package::{
    audit_formatting, postprocess, scan_consistency, AuditReport, NoopCloner, ReferenceCloner,
    TemplateCloner,
};
use deckforge_package::audit::AuditExpectations;
use deckforge_pptx::render::{build_deck, DeckInput, RenderedDeck};
use deckforge_pptx::{Assets, PptxWriter, SlideSpec};
use deckforge_template::{
    route, route_strict, StyleProfileCache, TemplateContract, TemplateTableStyleProfile,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Static inputs for a run
pub struct EngineOptions {
    /// The template contract
    pub contract: TemplateContract,

    /// Brand assets (may be empty)
    pub assets: Assets,

    /// Reference deck bytes for the clone overlay; `None` disables it
    pub reference_template: Option<Vec<u8>>,
}

impl EngineOptions {
    /// Compiled-in contract, no assets, no reference deck
    pub fn minimal() -> Self {
        Self {
            contract: TemplateContract::default(),
            assets: Assets::empty(),
            reference_template: None,
        }
    }
}

/// A successful run: the buffer plus its metrics side channel
#[derive(Debug)]
pub struct GeneratedDeck {
    pub bytes: Vec<u8>,
    pub metrics: PptMetrics,
}

/// Generate a presentation for one country.
///
/// `synthesis` carries project metadata and Stage-3 enrichment;
/// `country_analysis` carries the section payloads plus `country`.
pub fn generate(
    synthesis: &Value,
    country_analysis: &Value,
    scope: &Scope,
    config: &Config,
    options: &EngineOptions,
) -> Result<GeneratedDeck> {
    // Scope may override the strict policy for this run
    let mut config = config.clone();
    if let Some(strict) = scope.template_strict_mode {
        config.strict_template_fidelity = strict;
    }
    let strict = config.strict_geometry();
    let mut run = RunContext::new(config);

    log::info!(
        "generate: strict={} compaction={:?} flex={:?}",
        strict,
        run.config.render_compaction_mode,
        run.config.table_flex_mode
    );

    // ---- sanitize & normalize ---------------------------------------------
    let clean_synthesis = sanitize(synthesis);
    let country = ensure_string(
        country_analysis
            .get("country")
            .and_then(Value::as_str)
            .unwrap_or("Market"),
    );

    let mut sections = BTreeMap::new();
    for section in Section::all() {
        let raw = country_analysis
            .get(section.input_key())
            .cloned()
            .unwrap_or(Value::Null);
        let normalized = normalize_section(section, &raw, strict)?;
        sections.insert(section.input_key(), normalized);
    }

    // ---- classify ----------------------------------------------------------
    let deck = classify_sections(&sections, &clean_synthesis, run.config.render_compaction_mode);

    // ---- route -------------------------------------------------------------
    let mut blocks = deck.blocks;
    let mut primary_routed = 0usize;
    for block in &mut blocks {
        let slide_override = scope.slide_override(block.key.as_str());
        let routed = if strict {
            route_strict(&options.contract, block, slide_override)?
        } else {
            route(&options.contract, block, slide_override)?
        };

        if routed.route.source == TemplateSource::Primary {
            primary_routed += 1;
        }
        if routed.recovered || routed.route.source.as_str().contains("fallback") {
            run.metrics
                .fallback_template_mappings
                .push(block.key.as_str().to_string());
        }
        block.route = Some(routed.route);
    }

    run.metrics.template_coverage_pct = if blocks.is_empty() {
        100.0
    } else {
        primary_routed as f64 * 100.0 / blocks.len() as f64
    };

    // ---- render ------------------------------------------------------------
    let executive_summary = clean_synthesis
        .get("executiveSummary")
        .and_then(Value::as_str)
        .map(ensure_string);

    let mut styles = StyleProfileCache::new();
    let rendered = build_deck(
        DeckInput {
            blocks: &blocks,
            contract: &options.contract,
            scope,
            country: &country,
            executive_summary: executive_summary.as_deref(),
            assets: &options.assets,
        },
        &mut run,
        &mut styles,
    )?;

    // ---- write -------------------------------------------------------------
    let mut writer = PptxWriter::new(&options.contract)
        .with_title(format!("{country} Market Assessment"))
        .with_author(if scope.client_name.is_empty() {
            "deckforge".to_string()
        } else {
            scope.client_name.clone()
        });
    writer.add_slides(rendered.slides.iter().cloned());
    let buffer = writer.generate()?;

    // ---- postprocess -------------------------------------------------------
    let cloner: Box<dyn TemplateCloner> = match &options.reference_template {
        Some(bytes) => Box::new(ReferenceCloner::from_bytes(bytes)?),
        None => Box::new(NoopCloner),
    };
    let postprocess_config = PostprocessConfig {
        theme: theme_spec(&options.contract),
    };
    let (buffer, post_stats) = postprocess(
        &buffer,
        cloner.as_ref(),
        &rendered.clone_map,
        &postprocess_config,
    )?;
    run.metrics.clone_stats = post_stats.clone_stats.clone();

    // ---- audit -------------------------------------------------------------
    let report = audit_formatting(&buffer, &audit_expectations(&options.contract))?;

    run.metrics.geometry_check = true;
    run.metrics.geometry_aligned = report.geometry_aligned;
    run.metrics.geometry_max_delta_emu = report.geometry_max_delta_emu;
    run.metrics.formatting_critical_count = report.critical_count();
    run.metrics.formatting_warning_count = report.warning_count();
    run.metrics.formatting_issue_codes = report.codes();

    if report.has_critical() {
        return Err(EngineError::AuditBlocked {
            summary: issue_summary(&report, &rendered, true),
        });
    }
    if strict && report.warning_count() > 0 {
        return Err(EngineError::StrictWarnings {
            count: report.warning_count(),
            summary: issue_summary(&report, &rendered, false),
        });
    }

    // ---- scan --------------------------------------------------------------
    let labels = allowed_labels(&rendered);
    scan_consistency(
        &buffer,
        run.config.ppt_sparse_slide_char_threshold,
        &labels,
    )?
    .into_result()?;

    log::info!(
        "generate complete: {} slides, coverage {:.0}%, {} recoveries",
        rendered.slides.len(),
        run.metrics.template_coverage_pct,
        run.metrics.table_recoveries.len()
    );

    Ok(GeneratedDeck {
        bytes: buffer,
        metrics: run.metrics,
    })
}

/// Theme slots forced by the postprocessor, mirroring the writer's emission
fn theme_spec(contract: &TemplateContract) -> ThemeSpec {
    let palette = &contract.palette;
    let mut colors = BTreeMap::new();
    colors.insert("dk2".to_string(), palette.primary.clone());
    colors.insert("lt2".to_string(), palette.table_alt_row.clone());
    colors.insert("accent1".to_string(), palette.secondary.clone());
    colors.insert("accent2".to_string(), palette.accent_orange.clone());
    colors.insert("accent3".to_string(), palette.accent_green.clone());
    colors.insert("accent4".to_string(), palette.accent_red.clone());
    colors.insert("accent5".to_string(), palette.table_border.clone());
    colors.insert("accent6".to_string(), palette.text.clone());
    colors.insert("hlink".to_string(), palette.secondary.clone());
    colors.insert("folHlink".to_string(), palette.primary.clone());

    ThemeSpec {
        colors,
        font: contract.minor_font.clone(),
    }
}

fn audit_expectations(contract: &TemplateContract) -> AuditExpectations {
    // The designed margin comes from the profile of any table slide
    let expected_margin_emu = contract
        .layouts
        .iter()
        .find(|(_, layout)| layout.has_table())
        .map(|(_, layout)| {
            let profile = TemplateTableStyleProfile::derive(contract, layout);
            let max_side = profile
                .margins
                .left
                .max(profile.margins.right)
                .max(profile.margins.top)
                .max(profile.margins.bottom);
            inches_to_emu(max_side)
        })
        .unwrap_or(inches_to_emu(0.06));

    AuditExpectations {
        slide_width_emu: contract.slide_width_emu,
        slide_height_emu: contract.slide_height_emu,
        header_line_y_emu: contract.header_line_y_emu,
        footer_line_y_emu: contract.footer_line_y_emu,
        expected_line_widths_emu: contract.expected_line_widths_emu.clone(),
        outer_border_width_emu: contract.outer_border_width_emu,
        expected_margin_emu,
    }
}

/// Compose an audit failure summary naming the blocking slide keys
fn issue_summary(report: &AuditReport, rendered: &RenderedDeck, critical_only: bool) -> String {
    let mut parts: Vec<String> = Vec::new();
    for issue in report.issues.iter().take(10) {
        if critical_only && issue.severity != deckforge_package::AuditSeverity::Critical {
            continue;
        }
        let location = issue
            .part
            .as_deref()
            .and_then(|part| block_key_for_part(rendered, part))
            .or_else(|| issue.part.clone())
            .unwrap_or_else(|| "package".to_string());
        parts.push(format!("{} on {}", issue.code, location));
    }
    parts.join("; ")
}

/// Map a slide part path back to the block key rendered on it
fn block_key_for_part(rendered: &RenderedDeck, part: &str) -> Option<String> {
    let num: usize = part
        .strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()?;
    rendered
        .slides
        .get(num - 1)
        .and_then(|slide: &SlideSpec| slide.block_key.clone())
}

/// Sparse-audit allow-list: the fixed structural labels plus whatever the
/// exempt slides actually carry
fn allowed_labels(rendered: &RenderedDeck) -> Vec<String> {
    let mut labels: Vec<String> = vec![
        "table of contents".to_string(),
        "appendix".to_string(),
        "thank you".to_string(),
    ];
    for section in Section::all() {
        labels.push(section.divider_title().to_ascii_lowercase());
    }
    for slide in &rendered.slides {
        if slide.kind.sparse_exempt() {
            let text = slide.plain_text();
            let normalized = text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_lowercase();
            if !normalized.is_empty() {
                labels.push(normalized);
            }
        }
    }
    labels.sort();
    labels.dedup();
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn happy_country_analysis() -> Value {
        json!({
            "country": "Vietnam",
            "policy": {
                "foundationalActs": {
                    "acts": [
                        {"name": "Energy Efficiency Law", "year": 2010,
                         "description": "Mandatory audits and energy managers for large consumers",
                         "requirements": "Annual energy reporting", "penalties": "Administrative fines"},
                        {"name": "PDP8", "year": 2023,
                         "description": "Power development plan prioritizing renewables and LNG"}
                    ],
                    "keyMessage": "The regulatory base is in place; enforcement is the open question.",
                    "citations": ["https://example.com/policy"]
                }
            },
            "market": {
                "marketSizeAndGrowth": {
                    "series": [
                        {"year": 2020, "value": 90.1},
                        {"year": 2021, "value": 95.2},
                        {"year": 2022, "value": 99.8}
                    ],
                    "unit": "Mtoe",
                    "insights": ["Primary supply grew 5% annually", "Coal still dominates the mix"]
                },
                "supplyAndDemandDynamics": {
                    "series": [
                        {"year": 2020, "value": 70.0},
                        {"year": 2021, "value": 74.5}
                    ],
                    "unit": "Mtoe",
                    "insights": ["Industry is the largest consumer"]
                }
            },
            "competitors": {
                "japanesePlayers": {
                    "players": [
                        {"name": "Marubeni", "segment": "power", "presence": "Hanoi office",
                         "description": "Marubeni develops IPP projects and has operated in Vietnam since the early 1990s, with gas-fired capacity in the south and a growing energy services pipeline targeting industrial parks."},
                        {"name": "Sumitomo", "segment": "industrial parks", "presence": "Thang Long IP",
                         "description": "Sumitomo runs the Thang Long industrial park chain and leverages its tenant base to pilot onsite generation, rooftop solar, and utility services with Japanese manufacturers."},
                        {"name": "JERA", "segment": "LNG", "presence": "JV discussions",
                         "description": "JERA pursues LNG-to-power positions and holds a stake in a local gas distributor, giving it early access to the emerging LNG import value chain."}
                    ],
                    "competitiveInsights": ["Japanese players cluster in generation and industrial parks"]
                }
            },
            "depth": {
                "goNoGo": {
                    "criteria": [
                        {"name": "Market size", "met": true, "rationale": "TPES approaching 100 Mtoe"},
                        {"name": "Regulatory clarity", "met": false, "rationale": "ESCO licensing undefined"},
                        {"name": "Partner availability", "met": true, "rationale": "Several qualified local EPCs"},
                        {"name": "Price environment", "met": null, "rationale": "Tariff reform pending"}
                    ],
                    "recommendation": "Conditional go: enter via partnership, revisit after tariff reform."
                }
            }
        })
    }

    fn happy_synthesis() -> Value {
        json!({
            "executiveSummary": "Vietnam combines strong demand growth with an immature ESCO market. Entry through a local partnership is viable within the assessment window.",
            "keyInsights": {"insights": ["Demand growth outpaces supply additions", "Energy services remain underpenetrated"]},
            "confidenceScore": 0.82
        })
    }

    fn scope() -> Scope {
        serde_json::from_value(json!({
            "industry": "energy services",
            "projectType": "market selection",
            "clientName": "Escort Energy KK",
            "projectName": "Phase 1 Market Selection"
        }))
        .unwrap()
    }

    #[test]
    fn test_happy_path_strict() {
        let deck = generate(
            &happy_synthesis(),
            &happy_country_analysis(),
            &scope(),
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap();

        assert!(!deck.bytes.is_empty());
        assert_eq!(deck.metrics.template_coverage_pct, 100.0);
        assert!(deck.metrics.fallback_template_mappings.is_empty());
        assert!(deck.metrics.slide_render_failures.is_empty());
        assert!(deck.metrics.geometry_check);
        assert!(deck.metrics.geometry_aligned);
        assert_eq!(deck.metrics.formatting_critical_count, 0);

        // The buffer is a loadable ZIP with the expected skeleton
        let cursor = std::io::Cursor::new(deck.bytes.clone());
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert!(archive.by_name("ppt/presentation.xml").is_ok());
        assert!(archive.by_name("[Content_Types].xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide1.xml").is_ok());
    }

    #[test]
    fn test_slide_count_is_deterministic() {
        let run = |n: usize| {
            let deck = generate(
                &happy_synthesis(),
                &happy_country_analysis(),
                &scope(),
                &Config::default(),
                &EngineOptions::minimal(),
            )
            .unwrap_or_else(|e| panic!("run {n} failed: {e}"));
            let cursor = std::io::Cursor::new(deck.bytes);
            let archive = zip::ZipArchive::new(cursor).unwrap();
            archive
                .file_names()
                .filter(|f| f.starts_with("ppt/slides/slide") && f.ends_with(".xml"))
                .count()
        };
        assert_eq!(run(1), run(2));
    }

    #[test]
    fn test_transient_keys_rejected_in_strict() {
        let mut analysis = happy_country_analysis();
        // A non-template key survives transient sanitization and trips strict
        analysis["market"]["mysteryMetric"] = json!({"x": 1});

        let err = generate(
            &happy_synthesis(),
            &analysis,
            &scope(),
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("rejected non-template/transient keys"));
        assert!(msg.contains("mysteryMetric"));
    }

    #[test]
    fn test_transient_keys_silently_dropped_in_lenient() {
        let mut analysis = happy_country_analysis();
        analysis["market"]["marketSizeAndGrowth"]["_synthesisError"] = json!("fail");

        let mut synthesis = happy_synthesis();
        synthesis["confidenceScore"] = json!(0.3);

        let mut scope = scope();
        scope.template_strict_mode = Some(false);

        let deck = generate(
            &synthesis,
            &analysis,
            &scope,
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap();

        // The sentinel never reaches the rendered deck
        let cursor = std::io::Cursor::new(deck.bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        for i in 0..archive.len() {
            use std::io::Read;
            let mut file = archive.by_index(i).unwrap();
            if !file.name().ends_with(".xml") {
                continue;
            }
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            assert!(!content.contains("_synthesisError"));
        }
    }

    #[test]
    fn test_geometry_recovery_forbidden_in_strict() {
        let mut scope = scope();
        // Pin a table key onto a text-only template slide
        scope
            .template_slide_selections
            .insert("japanesePlayers".to_string(), 16);

        let err = generate(
            &happy_synthesis(),
            &happy_country_analysis(),
            &scope,
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("[STRICT GEOMETRY]"));
    }

    #[test]
    fn test_geometry_recovery_allowed_in_lenient() {
        let mut scope = scope();
        scope
            .template_slide_selections
            .insert("japanesePlayers".to_string(), 16);
        scope.template_strict_mode = Some(false);

        let deck = generate(
            &happy_synthesis(),
            &happy_country_analysis(),
            &scope,
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap();

        assert!(deck
            .metrics
            .fallback_template_mappings
            .contains(&"japanesePlayers".to_string()));
        assert!(deck.metrics.template_coverage_pct < 100.0);
    }

    #[test]
    fn test_table_capacity_recovery_bounded() {
        let mut analysis = happy_country_analysis();
        let players: Vec<Value> = (0..20)
            .map(|i| {
                json!({
                    "name": format!("Company {i}"),
                    "segment": "energy services",
                    "presence": "local office",
                    "description": "A long description ".repeat(35)
                })
            })
            .collect();
        analysis["competitors"]["japanesePlayers"]["players"] = Value::Array(players);

        let mut scope = scope();
        scope.template_strict_mode = Some(false);

        let deck = generate(
            &happy_synthesis(),
            &analysis,
            &scope,
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap();

        assert!(!deck.metrics.table_fallbacks.is_empty());

        // Strict mode refuses the same input
        let err = generate(
            &happy_synthesis(),
            &analysis,
            &self::scope(),
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("flex") || err.to_string().contains("violations"));
    }

    #[test]
    fn test_metrics_record_template_usage() {
        let deck = generate(
            &happy_synthesis(),
            &happy_country_analysis(),
            &scope(),
            &Config::default(),
            &EngineOptions::minimal(),
        )
        .unwrap();

        assert!(deck.metrics.template_usage.contains_key("regulation_table"));
        assert!(deck.metrics.template_usage.contains_key("chart_callout"));
        assert!(deck.metrics.template_usage.contains_key("summary_matrix"));
    }
}
