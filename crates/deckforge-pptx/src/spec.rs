//! Slide-object specifications.
//!
//! The intermediate representation between renderers and the writer. A
//! renderer builds one [`SlideSpec`] per block; the writer turns the list
//! into OOXML parts. Geometry is final here - no reflow, no auto-paging.

use deckforge_model::Rect;
use deckforge_template::{CellVAlign, TemplateTableStyleProfile};

/// What a slide structurally is. Drives the sparse-slide allow-list and the
/// clone overlay map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Cover,
    Toc,
    ExecSummary,
    SectionDivider,
    Content,
    AppendixToc,
    Closing,
}

impl SlideKind {
    /// True when the sparse-slide audit exempts this kind
    pub fn sparse_exempt(&self) -> bool {
        matches!(
            self,
            SlideKind::Cover
                | SlideKind::Toc
                | SlideKind::SectionDivider
                | SlideKind::AppendixToc
                | SlideKind::Closing
        )
    }
}

/// One output slide
#[derive(Debug, Clone)]
pub struct SlideSpec {
    /// Structural kind
    pub kind: SlideKind,

    /// Block key for content slides
    pub block_key: Option<String>,

    /// Template slide this spec was routed to (clone overlay input map)
    pub template_slide: Option<u32>,

    /// Shapes in z-order
    pub shapes: Vec<ShapeSpec>,
}

impl SlideSpec {
    pub fn new(kind: SlideKind) -> Self {
        Self {
            kind,
            block_key: None,
            template_slide: None,
            shapes: Vec::new(),
        }
    }

    /// Attach the block key
    pub fn with_block_key(mut self, key: impl Into<String>) -> Self {
        self.block_key = Some(key.into());
        self
    }

    /// Attach the template slide mapping
    pub fn with_template_slide(mut self, slide: u32) -> Self {
        self.template_slide = Some(slide);
        self
    }

    /// Append a shape
    pub fn push(&mut self, shape: ShapeSpec) {
        self.shapes.push(shape);
    }

    /// All text on the slide, concatenated (sparse-audit view)
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for shape in &self.shapes {
            match shape {
                ShapeSpec::TextBox(tb) => {
                    for para in &tb.paragraphs {
                        for run in &para.runs {
                            out.push_str(&run.text);
                        }
                        out.push(' ');
                    }
                }
                ShapeSpec::Table(table) => {
                    for row in &table.rows {
                        for cell in row {
                            out.push_str(&cell.text);
                            out.push(' ');
                        }
                    }
                }
                ShapeSpec::Chart(chart) => {
                    out.push_str(&chart.title);
                    out.push(' ');
                }
                _ => {}
            }
        }
        out.trim().to_string()
    }
}

/// Shapes the writer knows how to emit
#[derive(Debug, Clone)]
pub enum ShapeSpec {
    TextBox(TextBoxSpec),
    Table(TableFrameSpec),
    Chart(ChartSpec),
    Line(LineSpec),
    Image(ImageSpec),
}

/// Horizontal paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn attr(&self) -> &'static str {
        match self {
            Align::Left => "l",
            Align::Center => "ctr",
            Align::Right => "r",
        }
    }
}

/// A formatted text run
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub text: String,
    pub bold: bool,
    pub italic: bool,

    /// Font size in points; `None` inherits
    pub size_pt: Option<u32>,

    /// Hex RGB color; `None` inherits
    pub color: Option<String>,
}

impl RunSpec {
    /// A plain run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            size_pt: None,
            color: None,
        }
    }

    /// A bold run
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn with_size(mut self, pt: u32) -> Self {
        self.size_pt = Some(pt);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A paragraph of runs
#[derive(Debug, Clone, Default)]
pub struct ParagraphSpec {
    pub runs: Vec<RunSpec>,
    pub bullet: bool,
    pub align: Align,

    /// Indent level for bulleted paragraphs
    pub level: u32,
}

impl ParagraphSpec {
    /// A plain paragraph with one run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![RunSpec::plain(text)],
            ..Default::default()
        }
    }

    /// A bulleted paragraph with one run
    pub fn bullet(text: impl Into<String>) -> Self {
        Self {
            runs: vec![RunSpec::plain(text)],
            bullet: true,
            ..Default::default()
        }
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

/// A positioned text box
#[derive(Debug, Clone)]
pub struct TextBoxSpec {
    pub rect: Rect,
    pub paragraphs: Vec<ParagraphSpec>,

    /// Hex RGB fill; `None` is no fill
    pub fill: Option<String>,

    /// Hex RGB outline; `None` is no outline
    pub outline: Option<String>,

    /// Vertical anchor of the body
    pub anchor: CellVAlign,

    /// Shape name (diagnostics)
    pub name: String,
}

impl TextBoxSpec {
    pub fn new(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            rect,
            paragraphs: Vec::new(),
            fill: None,
            outline: None,
            anchor: CellVAlign::Top,
            name: name.into(),
        }
    }

    pub fn with_paragraph(mut self, para: ParagraphSpec) -> Self {
        self.paragraphs.push(para);
        self
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(color.into());
        self
    }

    pub fn with_outline(mut self, color: impl Into<String>) -> Self {
        self.outline = Some(color.into());
        self
    }

    pub fn with_anchor(mut self, anchor: CellVAlign) -> Self {
        self.anchor = anchor;
        self
    }
}

/// One table cell
#[derive(Debug, Clone, Default)]
pub struct CellSpec {
    pub text: String,
    pub bold: bool,

    /// Hex RGB fill; `None` inherits banding
    pub fill: Option<String>,

    /// Hex RGB text color
    pub color: Option<String>,

    /// Cell spans the full row (capacity summary rows)
    pub span_all: bool,
}

impl CellSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn header(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            ..Default::default()
        }
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(color.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A positioned table
#[derive(Debug, Clone)]
pub struct TableFrameSpec {
    pub rect: Rect,

    /// Column widths in inches; must sum to `rect.w`
    pub col_widths: Vec<f64>,

    /// Uniform row height in inches
    pub row_height: f64,

    /// Rows, first row styled as header when `header` is set
    pub rows: Vec<Vec<CellSpec>>,

    /// First row is a header row
    pub header: bool,

    /// Style profile the cells follow
    pub style: TemplateTableStyleProfile,
}

impl TableFrameSpec {
    /// Column count (from the widest row)
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// One chart series
#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub name: String,
    pub values: Vec<f64>,
}

/// A positioned chart
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: deckforge_template::ChartKind,
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<SeriesSpec>,
    pub rect: Rect,
}

/// A straight connector line
#[derive(Debug, Clone)]
pub struct LineSpec {
    /// Offset in EMU
    pub x_emu: i64,
    pub y_emu: i64,

    /// Extent in EMU (cy = 0 for horizontal rules)
    pub cx_emu: i64,
    pub cy_emu: i64,

    /// Stroke width in EMU
    pub width_emu: i64,

    /// Hex RGB color
    pub color: String,

    /// Shape name; the auditor keys header/footer roles off it
    pub name: String,
}

/// A positioned image, bytes already loaded
#[derive(Debug, Clone)]
pub struct ImageSpec {
    /// Embedded file name (e.g. "cover-bg.png")
    pub name: String,
    pub rect: Rect,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_concatenation() {
        let mut slide = SlideSpec::new(SlideKind::Content).with_block_key("tpes");
        slide.push(ShapeSpec::TextBox(
            TextBoxSpec::new(Rect::new(0.0, 0.0, 1.0, 1.0), "Title")
                .with_paragraph(ParagraphSpec::plain("Energy Supply")),
        ));
        slide.push(ShapeSpec::Chart(ChartSpec {
            kind: deckforge_template::ChartKind::Bar,
            title: "TPES by year".to_string(),
            categories: vec!["2020".to_string()],
            series: vec![SeriesSpec {
                name: "Mtoe".to_string(),
                values: vec![95.2],
            }],
            rect: Rect::new(0.5, 1.3, 7.4, 5.0),
        }));

        let text = slide.plain_text();
        assert!(text.contains("Energy Supply"));
        assert!(text.contains("TPES by year"));
    }

    #[test]
    fn test_sparse_exemptions() {
        assert!(SlideKind::Cover.sparse_exempt());
        assert!(SlideKind::SectionDivider.sparse_exempt());
        assert!(!SlideKind::Content.sparse_exempt());
        assert!(!SlideKind::ExecSummary.sparse_exempt());
    }

    #[test]
    fn test_table_col_count() {
        let table = TableFrameSpec {
            rect: Rect::new(0.5, 1.4, 12.3, 4.9),
            col_widths: vec![4.1, 4.1, 4.1],
            row_height: 0.3,
            rows: vec![
                vec![CellSpec::header("A"), CellSpec::header("B")],
                vec![
                    CellSpec::text("1"),
                    CellSpec::text("2"),
                    CellSpec::text("3"),
                ],
            ],
            header: true,
            style: sample_profile(),
        };
        assert_eq!(table.col_count(), 3);
    }

    fn sample_profile() -> TemplateTableStyleProfile {
        use deckforge_template::TemplateContract;
        let contract = TemplateContract::default();
        let layout = contract.layout(10).unwrap();
        TemplateTableStyleProfile::derive(&contract, layout)
    }
}
