//! Package postprocessing: invariant-restoring transforms in fixed order.
//!
//! 1. Absolute rel targets rewritten relative to their owner part.
//! 2. Template clone overlay (collaborator seam; see [`TemplateCloner`]).
//! 3. Theme normalization to the reference palette and typefaces.
//! 4. Rel-target normalization again, catching overlay changes.
//! 5. Non-visual shape-id dedupe per slide.
//! 6. Content-type reconciliation.
//!
//! Every transform takes a buffer in and returns a new buffer; the caller's
//! data is never mutated in place.

use std::collections::BTreeMap;

use crate::archive::PackageArchive;
use crate::content_types::{ContentTypes, ReconcileStats};
use crate::error::Result;
use crate::relationships::Relationships;
use deckforge_model::CloneStats;

/// Theme palette and typeface the postprocessor forces onto the package
#[derive(Debug, Clone)]
pub struct ThemeSpec {
    /// Scheme slot -> hex RGB (dk2, lt2, accent1..accent6, hlink, folHlink)
    pub colors: BTreeMap<String, String>,

    /// Typeface for both major and minor fonts
    pub font: String,
}

/// Postprocessor configuration
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    pub theme: ThemeSpec,
}

/// What the postprocessor did
#[derive(Debug, Clone, Default)]
pub struct PostprocessStats {
    /// Rel targets rewritten across both normalization passes
    pub rel_targets_rewritten: usize,

    /// Duplicate shape ids renumbered
    pub shape_ids_renumbered: usize,

    /// Clone overlay stats
    pub clone_stats: CloneStats,

    /// Content-type reconciliation deltas
    pub content_types: ReconcileStats,
}

/// Collaborator seam: overlays reference-template XML onto generated slides.
///
/// The input map pairs generated slide numbers with template slide numbers,
/// recorded by the renderer as slides were appended.
pub trait TemplateCloner {
    fn overlay(
        &self,
        package: &mut PackageArchive,
        clone_map: &[(usize, u32)],
    ) -> Result<CloneStats>;
}

/// No reference template available: overlay nothing
#[derive(Debug, Clone, Default)]
pub struct NoopCloner;

impl TemplateCloner for NoopCloner {
    fn overlay(&self, _: &mut PackageArchive, _: &[(usize, u32)]) -> Result<CloneStats> {
        Ok(CloneStats::default())
    }
}

/// Overlays static (non-placeholder) shapes from a reference deck, copying
/// any media those shapes embed.
pub struct ReferenceCloner {
    template: PackageArchive,
}

impl ReferenceCloner {
    /// Load the reference deck from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self {
            template: PackageArchive::from_bytes(data)?,
        })
    }
}

impl TemplateCloner for ReferenceCloner {
    fn overlay(
        &self,
        package: &mut PackageArchive,
        clone_map: &[(usize, u32)],
    ) -> Result<CloneStats> {
        let mut stats = CloneStats::default();
        let mut media_counter = 0usize;

        for (generated, template_num) in clone_map {
            let template_part = format!("ppt/slides/slide{template_num}.xml");
            let Some(template_xml) = self.template.get_text(&template_part)? else {
                continue;
            };

            let Some(inner) = sp_tree_inner(&template_xml) else {
                continue;
            };

            let statics: Vec<&str> = top_level_shapes(inner)
                .into_iter()
                .filter(|shape| !is_placeholder(shape))
                .collect();
            if statics.is_empty() {
                continue;
            }

            let generated_part = format!("ppt/slides/slide{generated}.xml");
            let Some(generated_xml) = package.get_text(&generated_part)? else {
                continue;
            };

            // Rewire embedded media through fresh rels in the generated slide
            let template_rels_part = format!("ppt/slides/_rels/slide{template_num}.xml.rels");
            let template_rels = match self.template.get(&template_rels_part) {
                Some(bytes) => Relationships::parse(bytes)?,
                None => Relationships::new(),
            };

            let generated_rels_part = format!("ppt/slides/_rels/slide{generated}.xml.rels");
            let mut generated_rels = match package.get(&generated_rels_part) {
                Some(bytes) => Relationships::parse(bytes)?,
                None => Relationships::new(),
            };

            let mut fragment = String::new();
            for shape in statics {
                let mut shape_xml = shape.to_string();
                for embed_id in embed_ids(shape) {
                    let Some(rel) = template_rels.get(&embed_id) else {
                        continue;
                    };
                    let source =
                        PackageArchive::resolve_target("ppt/slides", &rel.target);
                    let Some(data) = self.template.get(&source) else {
                        continue;
                    };

                    media_counter += 1;
                    let extension = source.rsplit('.').next().unwrap_or("png");
                    let dest = format!("ppt/media/clone{media_counter}.{extension}");
                    package.set(dest.clone(), data.to_vec());
                    stats.parts_copied += 1;

                    let new_id = generated_rels.add(
                        format!("../media/clone{media_counter}.{extension}"),
                        rel.rel_type.clone(),
                    );
                    shape_xml = shape_xml.replace(
                        &format!("r:embed=\"{embed_id}\""),
                        &format!("r:embed=\"{new_id}\""),
                    );
                }
                fragment.push_str(&shape_xml);
                fragment.push('\n');
            }

            if let Some(patched) = insert_before_close(&generated_xml, "</p:spTree>", &fragment) {
                package.set_text(generated_part, patched);
                package.set_text(generated_rels_part, generated_rels.to_xml());
                stats.slides_overlaid += 1;
            }
        }

        Ok(stats)
    }
}

/// Run the full transform chain over a buffer
pub fn postprocess(
    buffer: &[u8],
    cloner: &dyn TemplateCloner,
    clone_map: &[(usize, u32)],
    config: &PostprocessConfig,
) -> Result<(Vec<u8>, PostprocessStats)> {
    let mut package = PackageArchive::from_bytes(buffer)?;
    let mut stats = PostprocessStats::default();

    stats.rel_targets_rewritten += normalize_rel_targets(&mut package)?;
    stats.clone_stats = cloner.overlay(&mut package, clone_map)?;
    normalize_theme(&mut package, &config.theme)?;
    stats.rel_targets_rewritten += normalize_rel_targets(&mut package)?;
    stats.shape_ids_renumbered = dedupe_shape_ids(&mut package)?;

    let mut types = match package.get("[Content_Types].xml") {
        Some(bytes) => ContentTypes::parse(bytes)?,
        None => ContentTypes::default(),
    };
    stats.content_types = types.reconcile(&package);
    package.set_text("[Content_Types].xml", types.to_xml());

    log::debug!(
        "postprocess: {} rel target(s) rewritten, {} shape id(s) renumbered, {} slide(s) overlaid",
        stats.rel_targets_rewritten,
        stats.shape_ids_renumbered,
        stats.clone_stats.slides_overlaid
    );

    let bytes = package.to_bytes()?;
    Ok((bytes, stats))
}

/// Rewrite absolute `Target="/ppt/..."` entries relative to the rel file's
/// owner. Idempotent: a second application rewrites nothing.
pub fn normalize_rel_targets(package: &mut PackageArchive) -> Result<usize> {
    let mut rewritten = 0usize;

    for rels_path in package.rels_parts() {
        let Some(bytes) = package.get(&rels_path) else {
            continue;
        };
        let mut rels = Relationships::parse(bytes)?;
        let base_dir = PackageArchive::rels_base_dir(&rels_path).to_string();

        let updates: Vec<(String, String)> = rels
            .iter()
            .filter(|(_, rel)| rel.is_internal() && rel.target.starts_with('/'))
            .map(|(id, rel)| {
                let absolute = rel.target.trim_start_matches('/').to_string();
                (id.to_string(), relative_path(&base_dir, &absolute))
            })
            .collect();

        if updates.is_empty() {
            continue;
        }
        for (id, target) in updates {
            if rels.set_target(&id, target) {
                rewritten += 1;
            }
        }
        package.set_text(rels_path, rels.to_xml());
    }

    Ok(rewritten)
}

/// Compute a relative path from `base_dir` to `target` (both package paths)
fn relative_path(base_dir: &str, target: &str) -> String {
    let base: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let goal: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();

    let common = base
        .iter()
        .zip(goal.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..base.len() {
        segments.push("..".to_string());
    }
    for segment in &goal[common..] {
        segments.push(segment.to_string());
    }
    segments.join("/")
}

/// Force the theme color scheme and typefaces
fn normalize_theme(package: &mut PackageArchive, theme: &ThemeSpec) -> Result<()> {
    let part = "ppt/theme/theme1.xml";
    let Some(xml) = package.get_text(part)? else {
        return Ok(());
    };

    let mut out = xml;

    // Typefaces: every non-empty latin typeface becomes the reference font
    out = rewrite_attr_values(&out, "typeface=\"", |value| {
        if value.is_empty() {
            None
        } else {
            Some(theme.font.clone())
        }
    });

    // Scheme slots: rewrite the srgbClr inside each named slot
    for (slot, hex) in &theme.colors {
        let open = format!("<a:{slot}>");
        let close = format!("</a:{slot}>");
        if let (Some(start), Some(end)) = (out.find(&open), out.find(&close)) {
            if start < end {
                let replacement = format!("{open}<a:srgbClr val=\"{hex}\"/>{close}");
                out.replace_range(start..end + close.len(), &replacement);
            }
        }
    }

    package.set_text(part, out);
    Ok(())
}

/// Rewrite every occurrence of `prefix<value>"`, mapping values through `f`
/// (`None` keeps the original)
fn rewrite_attr_values(xml: &str, prefix: &str, f: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(pos) = rest.find(prefix) {
        let value_start = pos + prefix.len();
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];

        let Some(quote) = rest.find('"') else {
            break;
        };
        let value = &rest[..quote];
        match f(value) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(value),
        }
        rest = &rest[quote..];
    }
    out.push_str(rest);
    out
}

/// Renumber duplicate `p:cNvPr` ids within each slide so every non-visual id
/// is unique per part
pub fn dedupe_shape_ids(package: &mut PackageArchive) -> Result<usize> {
    let mut renumbered = 0usize;

    for slide_part in package.slide_parts() {
        let Some(xml) = package.get_text(&slide_part)? else {
            continue;
        };

        let ids = shape_ids(&xml);
        let mut max_id: u64 = ids.iter().map(|(_, id)| *id).max().unwrap_or(1);

        // First occurrence of each id keeps it; later ones get fresh ids
        let mut seen = std::collections::BTreeSet::new();
        let mut patches: Vec<(usize, u64, u64)> = Vec::new();
        for (offset, id) in &ids {
            if !seen.insert(*id) {
                max_id += 1;
                patches.push((*offset, *id, max_id));
            }
        }
        if patches.is_empty() {
            continue;
        }

        // Apply right-to-left so byte offsets stay valid while patching
        let mut patched = xml.clone();
        for (offset, old_id, new_id) in patches.iter().rev() {
            let old = format!("id=\"{old_id}\"");
            let new = format!("id=\"{new_id}\"");
            let region_end = offset + old.len();
            if patched.get(*offset..region_end) == Some(old.as_str()) {
                patched.replace_range(*offset..region_end, &new);
                renumbered += 1;
            }
        }
        package.set_text(slide_part, patched);
    }

    Ok(renumbered)
}

/// `(byte offset of the id attribute, id value)` for every `p:cNvPr` in a
/// slide, in document order
fn shape_ids(xml: &str) -> Vec<(usize, u64)> {
    let mut out = Vec::new();
    let marker = "<p:cNvPr ";
    let mut search_from = 0usize;

    while let Some(found) = xml[search_from..].find(marker) {
        let element_start = search_from + found;
        let after = &xml[element_start..];
        if let Some(id_pos) = after.find("id=\"") {
            let id_offset = element_start + id_pos;
            let value_start = id_offset + 4;
            if let Some(quote) = xml[value_start..].find('"') {
                if let Ok(id) = xml[value_start..value_start + quote].parse::<u64>() {
                    out.push((id_offset, id));
                }
            }
        }
        search_from = element_start + marker.len();
    }

    out
}

// ---------------------------------------------------------------------------
// Shape-tree surgery helpers for the clone overlay
// ---------------------------------------------------------------------------

/// The inner XML of a slide's `<p:spTree>`
fn sp_tree_inner(xml: &str) -> Option<&str> {
    let start = xml.find("<p:spTree>")? + "<p:spTree>".len();
    let end = xml.rfind("</p:spTree>")?;
    (start <= end).then(|| &xml[start..end])
}

/// Top-level drawable elements of a shape tree
fn top_level_shapes(inner: &str) -> Vec<&str> {
    const TAGS: &[&str] = &["p:sp", "p:pic", "p:cxnSp", "p:graphicFrame", "p:grpSp"];
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while cursor < inner.len() {
        let rest = &inner[cursor..];
        let mut next: Option<(usize, &str)> = None;
        for tag in TAGS {
            if let Some(pos) = rest.find(&format!("<{tag}>")) {
                if next.is_none() || pos < next.unwrap().0 {
                    next = Some((pos, tag));
                }
            }
        }
        let Some((pos, tag)) = next else { break };

        let element_start = cursor + pos;
        let close = format!("</{tag}>");
        let open = format!("<{tag}>");

        // Depth-aware scan for the matching close of this element
        let mut depth = 0usize;
        let mut scan = element_start;
        let element_end = loop {
            let slice = &inner[scan..];
            let next_open = slice.find(&open);
            let next_close = slice.find(&close);
            match (next_open, next_close) {
                (Some(o), Some(c)) if o < c => {
                    depth += 1;
                    scan += o + open.len();
                }
                (_, Some(c)) => {
                    depth -= 1;
                    scan += c + close.len();
                    if depth == 0 {
                        break Some(scan);
                    }
                }
                _ => break None,
            }
        };

        match element_end {
            Some(end) => {
                out.push(&inner[element_start..end]);
                cursor = end;
            }
            None => break,
        }
    }

    out
}

/// True when a shape is a layout placeholder
fn is_placeholder(shape: &str) -> bool {
    shape.contains("<p:ph ") || shape.contains("<p:ph/>")
}

/// Every `r:embed` id referenced by a shape
fn embed_ids(shape: &str) -> Vec<String> {
    let mut out = Vec::new();
    let marker = "r:embed=\"";
    let mut rest = shape;
    while let Some(pos) = rest.find(marker) {
        rest = &rest[pos + marker.len()..];
        if let Some(quote) = rest.find('"') {
            out.push(rest[..quote].to_string());
            rest = &rest[quote..];
        } else {
            break;
        }
    }
    out
}

/// Insert a fragment immediately before a closing tag
fn insert_before_close(xml: &str, close_tag: &str, fragment: &str) -> Option<String> {
    let pos = xml.rfind(close_tag)?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..pos]);
    out.push_str(fragment);
    out.push_str(&xml[pos..]);
    Some(out)
}
