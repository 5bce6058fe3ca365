//! Template routing with geometry recovery.
//!
//! For each block the router picks a template slide whose layout satisfies
//! the block's required geometry. When the primary candidate lacks it, a
//! ranked queue is scanned: the primary (kept for diagnostics), the default
//! route when the caller pinned an override, then every slide of the primary
//! and default patterns. Strict-geometry mode forbids recovery outright -
//! production runs fix the template map instead of silently remapping.

use crate::contract::{TemplateContract, TemplateLayout};
use crate::error::{Result, TemplateError};
use deckforge_model::{Block, RouteInfo, TemplateSource};

/// Geometry a block key demands of its slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredGeometry {
    Table,
    Chart,
    None,
}

impl RequiredGeometry {
    /// Compute from the contract's context key sets
    pub fn for_key(contract: &TemplateContract, key: &str) -> Self {
        if contract.table_context_keys.contains(key) {
            RequiredGeometry::Table
        } else if contract.chart_context_keys.contains(key) {
            RequiredGeometry::Chart
        } else {
            RequiredGeometry::None
        }
    }

    fn satisfied_by(&self, layout: &TemplateLayout) -> bool {
        match self {
            RequiredGeometry::Table => layout.has_table(),
            RequiredGeometry::Chart => layout.has_chart(),
            RequiredGeometry::None => true,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RequiredGeometry::Table => "table",
            RequiredGeometry::Chart => "chart",
            RequiredGeometry::None => "none",
        }
    }
}

/// Routing outcome for one block
#[derive(Debug, Clone)]
pub struct RoutedBlock {
    /// The route to record on the block
    pub route: RouteInfo,

    /// Layout of the chosen slide
    pub layout: TemplateLayout,

    /// True when the primary candidate was substituted
    pub recovered: bool,
}

/// One candidate in the recovery queue
#[derive(Debug, Clone)]
struct Candidate {
    pattern: String,
    slide: u32,
    source: TemplateSource,
}

/// Route a block onto a template slide.
///
/// `slide_override` is the caller's pinned slide for this key, if any.
/// Strictness is enforced by the caller: a `recovered` result must abort a
/// strict run.
pub fn route(
    contract: &TemplateContract,
    block: &Block,
    slide_override: Option<u32>,
) -> Result<RoutedBlock> {
    let key = block.key.as_str();
    let required = RequiredGeometry::for_key(contract, key);

    let primary_pattern = contract.primary_pattern_for(key).to_string();
    let primary_slide = match slide_override {
        Some(slide) => slide,
        None => first_slide(contract, &primary_pattern, key)?,
    };

    // Primary candidate satisfied: done
    if let Some(layout) = contract.layout(primary_slide) {
        if required.satisfied_by(layout) {
            return Ok(RoutedBlock {
                route: RouteInfo {
                    pattern: primary_pattern,
                    slide: primary_slide,
                    source: TemplateSource::Primary,
                    recovered: false,
                },
                layout: layout.clone(),
                recovered: false,
            });
        }
    }

    // Build the ranked recovery queue
    let mut queue: Vec<Candidate> = Vec::new();
    queue.push(Candidate {
        pattern: primary_pattern.clone(),
        slide: primary_slide,
        source: TemplateSource::Primary,
    });

    if slide_override.is_some() {
        // Re-resolve with no override
        if let Ok(default_slide) = first_slide(contract, &primary_pattern, key) {
            queue.push(Candidate {
                pattern: primary_pattern.clone(),
                slide: default_slide,
                source: TemplateSource::DefaultRoute,
            });
        }
    }

    if let Some(pattern) = contract.patterns.get(&primary_pattern) {
        for slide in &pattern.template_slides {
            queue.push(Candidate {
                pattern: primary_pattern.clone(),
                slide: *slide,
                source: TemplateSource::PrimaryPatternScan,
            });
        }
    }

    if let Some(pattern) = contract.patterns.get(&contract.default_pattern) {
        for slide in &pattern.template_slides {
            queue.push(Candidate {
                pattern: contract.default_pattern.clone(),
                slide: *slide,
                source: TemplateSource::DefaultPatternScan,
            });
        }
    }

    // Deduplicate by (pattern, slide), first occurrence wins
    let mut seen = std::collections::BTreeSet::new();
    queue.retain(|c| seen.insert((c.pattern.clone(), c.slide)));

    let scanned = queue.len();

    // First satisfying candidate past the primary wins, marked as recovery
    for candidate in &queue {
        if candidate.slide == primary_slide && candidate.pattern == primary_pattern {
            continue;
        }
        if let Some(layout) = contract.layout(candidate.slide) {
            if required.satisfied_by(layout) {
                log::warn!(
                    "geometry recovery: '{}' rerouted from slide {} to slide {} ({:?})",
                    key,
                    primary_slide,
                    candidate.slide,
                    candidate.source
                );
                return Ok(RoutedBlock {
                    route: RouteInfo {
                        pattern: candidate.pattern.clone(),
                        slide: candidate.slide,
                        source: TemplateSource::GeometryRecovery,
                        recovered: true,
                    },
                    layout: layout.clone(),
                    recovered: true,
                });
            }
        }
    }

    Err(TemplateError::NoSatisfyingCandidate {
        key: key.to_string(),
        required: required.name(),
        scanned,
    })
}

/// Strict wrapper: routing that treats recovery as a hard failure
pub fn route_strict(
    contract: &TemplateContract,
    block: &Block,
    slide_override: Option<u32>,
) -> Result<RoutedBlock> {
    let routed = route(contract, block, slide_override)?;
    if routed.recovered {
        let key = block.key.as_str();
        let required = RequiredGeometry::for_key(contract, key);
        let primary_pattern = contract.primary_pattern_for(key).to_string();
        let primary_slide = slide_override
            .or_else(|| first_slide(contract, &primary_pattern, key).ok())
            .unwrap_or(0);
        return Err(TemplateError::RecoveryForbidden {
            key: key.to_string(),
            primary_slide,
            required: required.name(),
            recovered_slide: routed.route.slide,
        });
    }
    Ok(routed)
}

fn first_slide(contract: &TemplateContract, pattern_name: &str, key: &str) -> Result<u32> {
    contract
        .patterns
        .get(pattern_name)
        .and_then(|p| p.template_slides.first().copied())
        .ok_or_else(|| TemplateError::NoPattern {
            key: key.to_string(),
        })
}
