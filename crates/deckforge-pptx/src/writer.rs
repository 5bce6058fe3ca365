//! PPTX package emission from slide specs.
//!
//! Writes every OOXML part into an in-memory ZIP buffer: content types,
//! package and presentation relationships, docProps, theme, master, layouts,
//! slides, chart parts, and media. Shape ids are deterministic per slide.
//!
//! The output is structurally complete but intentionally unpolished; the
//! package postprocessor and the audits downstream are what certify it.

use crate::charts::chart_part_xml;
use crate::constants::*;
use crate::error::Result;
use crate::escape_xml;
use crate::spec::{
    ChartSpec, ImageSpec, ShapeSpec, SlideKind, SlideSpec, TableFrameSpec, TextBoxSpec,
};
use deckforge_model::geometry::inches_to_emu;
use deckforge_template::TemplateContract;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// PPTX document writer
pub struct PptxWriter<'a> {
    /// Template contract (slide size, palette, fonts)
    contract: &'a TemplateContract,

    /// Slides to render
    slides: Vec<SlideSpec>,

    /// Presentation title
    title: Option<String>,

    /// Presentation author
    author: Option<String>,
}

/// A chart scheduled for emission: global part number plus owning slide
struct PendingChart {
    part_num: usize,
    spec: ChartSpec,
}

/// An image scheduled for emission
struct PendingImage {
    part_num: usize,
    data: Vec<u8>,
}

impl<'a> PptxWriter<'a> {
    /// Create a writer over a contract
    pub fn new(contract: &'a TemplateContract) -> Self {
        Self {
            contract,
            slides: Vec::new(),
            title: None,
            author: None,
        }
    }

    /// Set the presentation title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Add a slide
    pub fn add_slide(&mut self, slide: SlideSpec) {
        self.slides.push(slide);
    }

    /// Add multiple slides
    pub fn add_slides(&mut self, slides: impl IntoIterator<Item = SlideSpec>) {
        self.slides.extend(slides);
    }

    /// Number of slides queued
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Generate the PPTX as bytes
    pub fn generate(&self) -> Result<Vec<u8>> {
        let buffer = Vec::new();
        let cursor = Cursor::new(buffer);
        let mut zip = ZipWriter::new(cursor);

        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // Assign chart and image part numbers up front so content types,
        // rels, and parts agree
        let mut charts: Vec<Vec<PendingChart>> = Vec::new();
        let mut images: Vec<Vec<PendingImage>> = Vec::new();
        let mut chart_counter = 0usize;
        let mut image_counter = 0usize;
        for slide in &self.slides {
            let mut slide_charts = Vec::new();
            let mut slide_images = Vec::new();
            for shape in &slide.shapes {
                match shape {
                    ShapeSpec::Chart(spec) => {
                        chart_counter += 1;
                        slide_charts.push(PendingChart {
                            part_num: chart_counter,
                            spec: spec.clone(),
                        });
                    }
                    ShapeSpec::Image(spec) => {
                        image_counter += 1;
                        slide_images.push(PendingImage {
                            part_num: image_counter,
                            data: spec.data.clone(),
                        });
                    }
                    _ => {}
                }
            }
            charts.push(slide_charts);
            images.push(slide_images);
        }

        self.write_content_types(&mut zip, options, &charts)?;
        self.write_root_rels(&mut zip, options)?;
        self.write_app_xml(&mut zip, options)?;
        self.write_core_xml(&mut zip, options)?;
        self.write_presentation_xml(&mut zip, options)?;
        self.write_presentation_rels(&mut zip, options)?;
        self.write_pres_props(&mut zip, options)?;
        self.write_table_styles(&mut zip, options)?;
        self.write_view_props(&mut zip, options)?;
        self.write_theme(&mut zip, options)?;
        self.write_slide_master(&mut zip, options)?;
        self.write_slide_layouts(&mut zip, options)?;

        for (i, slide) in self.slides.iter().enumerate() {
            self.write_slide(&mut zip, options, i + 1, slide, &charts[i], &images[i])?;
        }

        // Chart parts
        for slide_charts in &charts {
            for chart in slide_charts {
                zip.start_file(format!("ppt/charts/chart{}.xml", chart.part_num), options)?;
                zip.write_all(chart_part_xml(&chart.spec).as_bytes())?;
            }
        }

        // Media parts
        for slide_images in &images {
            for image in slide_images {
                zip.start_file(format!("ppt/media/image{}.png", image.part_num), options)?;
                zip.write_all(&image.data)?;
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn write_content_types<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
        charts: &[Vec<PendingChart>],
    ) -> Result<()> {
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="{}">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="jpeg" ContentType="image/jpeg"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  <Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/>
  <Override PartName="/ppt/tableStyles.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"/>
  <Override PartName="/ppt/viewProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"/>
  <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
  <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
  <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
  <Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
  <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#,
            NS_CONTENT_TYPES
        );

        for i in 1..=self.slides.len() {
            content.push_str(&format!(
                "  <Override PartName=\"/ppt/slides/slide{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>\n",
                i
            ));
        }

        for slide_charts in charts {
            for chart in slide_charts {
                content.push_str(&format!(
                    "  <Override PartName=\"/ppt/charts/chart{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.drawingml.chart+xml\"/>\n",
                    chart.part_num
                ));
            }
        }

        content.push_str("</Types>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_app_xml<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("docProps/app.xml", options)?;

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <TotalTime>0</TotalTime>
  <Words>0</Words>
  <Application>deckforge</Application>
  <PresentationFormat>On-screen Show (16:9)</PresentationFormat>
  <Slides>{}</Slides>
  <Notes>0</Notes>
  <HiddenSlides>0</HiddenSlides>
  <ScaleCrop>false</ScaleCrop>
  <LinksUpToDate>false</LinksUpToDate>
  <SharedDoc>false</SharedDoc>
  <HyperlinksChanged>false</HyperlinksChanged>
  <AppVersion>1.0</AppVersion>
</Properties>"#,
            self.slides.len()
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_core_xml<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("docProps/core.xml", options)?;

        let title = self.title.as_deref().unwrap_or("Market Assessment");
        let author = self.author.as_deref().unwrap_or("deckforge");
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
  <dc:creator>{}</dc:creator>
  <cp:lastModifiedBy>{}</cp:lastModifiedBy>
  <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>
</cp:coreProperties>"#,
            escape_xml(title),
            escape_xml(author),
            escape_xml(author),
            now,
            now
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_presentation_xml<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/presentation.xml", options)?;

        let mut slide_refs = String::new();
        for i in 1..=self.slides.len() {
            slide_refs.push_str(&format!(
                "    <p:sldId id=\"{}\" r:id=\"rId{}\"/>\n",
                255 + i,
                i + 3 // rId1=slideMaster, rId2=presProps, rId3=theme, rId4+=slides
            ));
        }

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">
  <p:sldMasterIdLst>
    <p:sldMasterId id="2147483648" r:id="rId1"/>
  </p:sldMasterIdLst>
  <p:sldIdLst>
{}  </p:sldIdLst>
  <p:sldSz cx="{}" cy="{}"/>
  <p:notesSz cx="{}" cy="{}"/>
</p:presentation>"#,
            NS_DRAWING,
            NS_RELATIONSHIPS,
            NS_PRESENTATION,
            slide_refs,
            self.contract.slide_width_emu,
            self.contract.slide_height_emu,
            self.contract.slide_height_emu, // Notes are rotated
            self.contract.slide_width_emu
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_presentation_rels<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/_rels/presentation.xml.rels", options)?;

        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps" Target="presProps.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
"#,
        );

        for i in 1..=self.slides.len() {
            rels.push_str(&format!(
                "  <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"slides/slide{}.xml\"/>\n",
                i + 3,
                REL_TYPE_SLIDE,
                i
            ));
        }

        rels.push_str("</Relationships>");
        zip.write_all(rels.as_bytes())?;
        Ok(())
    }

    fn write_pres_props<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/presProps.xml", options)?;
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentationPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:extLst/>
</p:presentationPr>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
        );
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_table_styles<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/tableStyles.xml", options)?;
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
            NS_DRAWING
        );
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_view_props<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/viewProps.xml", options)?;
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:viewPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:normalViewPr>
    <p:restoredLeft sz="15620"/>
    <p:restoredTop sz="94660"/>
  </p:normalViewPr>
  <p:slideViewPr>
    <p:cSldViewPr>
      <p:cViewPr>
        <p:scale>
          <a:sx n="100" d="100"/>
          <a:sy n="100" d="100"/>
        </p:scale>
        <p:origin x="0" y="0"/>
      </p:cViewPr>
    </p:cSldViewPr>
  </p:slideViewPr>
</p:viewPr>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION
        );
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_theme<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/theme/theme1.xml", options)?;

        let palette = &self.contract.palette;
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{ns}" name="deckforge">
  <a:themeElements>
    <a:clrScheme name="deckforge">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="{primary}"/></a:dk2>
      <a:lt2><a:srgbClr val="{alt_row}"/></a:lt2>
      <a:accent1><a:srgbClr val="{secondary}"/></a:accent1>
      <a:accent2><a:srgbClr val="{orange}"/></a:accent2>
      <a:accent3><a:srgbClr val="{green}"/></a:accent3>
      <a:accent4><a:srgbClr val="{red}"/></a:accent4>
      <a:accent5><a:srgbClr val="{border}"/></a:accent5>
      <a:accent6><a:srgbClr val="{text}"/></a:accent6>
      <a:hlink><a:srgbClr val="{secondary}"/></a:hlink>
      <a:folHlink><a:srgbClr val="{primary}"/></a:folHlink>
    </a:clrScheme>
    <a:fontScheme name="deckforge">
      <a:majorFont>
        <a:latin typeface="{major}"/>
        <a:ea typeface=""/>
        <a:cs typeface=""/>
      </a:majorFont>
      <a:minorFont>
        <a:latin typeface="{minor}"/>
        <a:ea typeface=""/>
        <a:cs typeface=""/>
      </a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="Office">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
      </a:lnStyleLst>
      <a:effectStyleLst>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
      </a:effectStyleLst>
      <a:bgFillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:bgFillStyleLst>
    </a:fmtScheme>
  </a:themeElements>
</a:theme>"#,
            ns = NS_DRAWING,
            primary = palette.primary,
            secondary = palette.secondary,
            green = palette.accent_green,
            red = palette.accent_red,
            orange = palette.accent_orange,
            text = palette.text,
            border = palette.table_border,
            alt_row = palette.table_alt_row,
            major = self.contract.major_font,
            minor = self.contract.minor_font,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Decorative rules carried by master and layouts so the deck's line
    /// width signature is present outside the slides as well
    fn decorative_rules(&self, first_id: u32) -> String {
        let width = self.contract.slide_width_emu - 2 * 411_480;
        let mut out = String::new();
        for (i, line_width) in self.contract.expected_line_widths_emu.iter().enumerate() {
            let y = if i == 0 {
                self.contract.header_line_y_emu
            } else {
                self.contract.footer_line_y_emu
            };
            out.push_str(&cxn_sp_xml(
                first_id + i as u32,
                &format!("Rule {}", i + 1),
                411_480,
                y,
                width,
                0,
                *line_width,
                &self.contract.palette.primary,
            ));
        }
        out
    }

    fn write_slide_master<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        zip.start_file("ppt/slideMasters/slideMaster1.xml", options)?;

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:cSld>
    <p:bg>
      <p:bgRef idx="1001">
        <a:schemeClr val="bg1"/>
      </p:bgRef>
    </p:bg>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
{}    </p:spTree>
  </p:cSld>
  <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
  <p:sldLayoutIdLst>
    <p:sldLayoutId id="2147483649" r:id="rId1"/>
    <p:sldLayoutId id="2147483650" r:id="rId2"/>
  </p:sldLayoutIdLst>
</p:sldMaster>"#,
            NS_DRAWING,
            NS_RELATIONSHIPS,
            NS_PRESENTATION,
            self.decorative_rules(2)
        );

        zip.write_all(content.as_bytes())?;

        zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)?;
        let rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="{}" Target="../slideLayouts/slideLayout2.xml"/>
  <Relationship Id="rId3" Type="{}" Target="../theme/theme1.xml"/>
</Relationships>"#,
            NS_RELATIONSHIPS, REL_TYPE_SLIDE_LAYOUT, REL_TYPE_SLIDE_LAYOUT, REL_TYPE_THEME
        );
        zip.write_all(rels.as_bytes())?;
        Ok(())
    }

    fn write_slide_layouts<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
    ) -> Result<()> {
        let layout_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#,
            NS_RELATIONSHIPS, REL_TYPE_SLIDE_MASTER
        );

        for (idx, (layout_type, name)) in
            [("title", "Title Slide"), ("obj", "Title and Content")]
                .iter()
                .enumerate()
        {
            let n = idx + 1;
            zip.start_file(format!("ppt/slideLayouts/slideLayout{}.xml", n), options)?;

            let content = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="{}" preserve="1">
  <p:cSld name="{}">
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
{}    </p:spTree>
  </p:cSld>
  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#,
                NS_DRAWING,
                NS_RELATIONSHIPS,
                NS_PRESENTATION,
                layout_type,
                name,
                self.decorative_rules(2)
            );
            zip.write_all(content.as_bytes())?;

            zip.start_file(
                format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", n),
                options,
            )?;
            zip.write_all(layout_rels.as_bytes())?;
        }

        Ok(())
    }

    fn write_slide<W: Write + std::io::Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: SimpleFileOptions,
        slide_num: usize,
        slide: &SlideSpec,
        charts: &[PendingChart],
        images: &[PendingImage],
    ) -> Result<()> {
        zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;

        // rId1 is the layout; charts then images follow
        let mut chart_rels: Vec<(usize, String)> = Vec::new();
        let mut image_rels: Vec<(usize, String)> = Vec::new();
        let mut next_rel = 2usize;
        for chart in charts {
            chart_rels.push((chart.part_num, format!("rId{next_rel}")));
            next_rel += 1;
        }
        for image in images {
            image_rels.push((image.part_num, format!("rId{next_rel}")));
            next_rel += 1;
        }

        let mut shapes = String::new();
        let mut shape_id = 2u32;
        let mut chart_cursor = 0usize;
        let mut image_cursor = 0usize;

        for shape in &slide.shapes {
            match shape {
                ShapeSpec::TextBox(tb) => {
                    shapes.push_str(&self.textbox_xml(shape_id, tb));
                    shape_id += 1;
                }
                ShapeSpec::Table(table) => {
                    shapes.push_str(&self.table_xml(shape_id, table));
                    shape_id += 1;
                }
                ShapeSpec::Chart(spec) => {
                    let rel_id = &chart_rels[chart_cursor].1;
                    shapes.push_str(&chart_frame_xml(shape_id, spec, rel_id));
                    shape_id += 1;
                    chart_cursor += 1;
                }
                ShapeSpec::Line(line) => {
                    shapes.push_str(&cxn_sp_xml(
                        shape_id,
                        &line.name,
                        line.x_emu,
                        line.y_emu,
                        line.cx_emu,
                        line.cy_emu,
                        line.width_emu,
                        &line.color,
                    ));
                    shape_id += 1;
                }
                ShapeSpec::Image(spec) => {
                    let rel_id = &image_rels[image_cursor].1;
                    shapes.push_str(&pic_xml(shape_id, spec, rel_id));
                    shape_id += 1;
                    image_cursor += 1;
                }
            }
        }

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr>
        <p:cNvPr id="1" name=""/>
        <p:cNvGrpSpPr/>
        <p:nvPr/>
      </p:nvGrpSpPr>
      <p:grpSpPr/>
{}    </p:spTree>
  </p:cSld>
</p:sld>"#,
            NS_DRAWING, NS_RELATIONSHIPS, NS_PRESENTATION, shapes
        );
        zip.write_all(content.as_bytes())?;

        // Slide rels
        zip.start_file(
            format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
            options,
        )?;

        let layout = match slide.kind {
            SlideKind::Cover | SlideKind::SectionDivider | SlideKind::Closing => 1,
            _ => 2,
        };

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">
  <Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout{}.xml"/>
"#,
            NS_RELATIONSHIPS, REL_TYPE_SLIDE_LAYOUT, layout
        );
        for (part_num, rel_id) in &chart_rels {
            rels.push_str(&format!(
                "  <Relationship Id=\"{}\" Type=\"{}\" Target=\"../charts/chart{}.xml\"/>\n",
                rel_id, REL_TYPE_CHART, part_num
            ));
        }
        for (part_num, rel_id) in &image_rels {
            rels.push_str(&format!(
                "  <Relationship Id=\"{}\" Type=\"{}\" Target=\"../media/image{}.png\"/>\n",
                rel_id, REL_TYPE_IMAGE, part_num
            ));
        }
        rels.push_str("</Relationships>");
        zip.write_all(rels.as_bytes())?;
        Ok(())
    }

    fn textbox_xml(&self, id: u32, tb: &TextBoxSpec) -> String {
        let (x, y) = tb.rect.off_emu();
        let (cx, cy) = tb.rect.ext_emu();

        let mut sp_pr = format!(
            "        <p:spPr>\n          <a:xfrm>\n            <a:off x=\"{}\" y=\"{}\"/>\n            <a:ext cx=\"{}\" cy=\"{}\"/>\n          </a:xfrm>\n          <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom>\n",
            x, y, cx, cy
        );
        if let Some(fill) = &tb.fill {
            sp_pr.push_str(&format!(
                "          <a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>\n",
                fill
            ));
        }
        if let Some(outline) = &tb.outline {
            sp_pr.push_str(&format!(
                "          <a:ln w=\"6350\"><a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill></a:ln>\n",
                outline
            ));
        }
        sp_pr.push_str("        </p:spPr>\n");

        let mut paragraphs = String::new();
        for para in &tb.paragraphs {
            let bullet = if para.bullet {
                "<a:buChar char=\"\u{2022}\"/>".to_string()
            } else {
                "<a:buNone/>".to_string()
            };
            paragraphs.push_str(&format!(
                "          <a:p>\n            <a:pPr lvl=\"{}\" algn=\"{}\">{}</a:pPr>\n",
                para.level,
                para.align.attr(),
                bullet
            ));
            for run in &para.runs {
                paragraphs.push_str(&self.run_xml(run));
            }
            paragraphs.push_str("          </a:p>\n");
        }

        format!(
            r#"      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="{}" name="{}"/>
          <p:cNvSpPr txBox="1"/>
          <p:nvPr/>
        </p:nvSpPr>
{}        <p:txBody>
          <a:bodyPr anchor="{}" wrap="square"/>
          <a:lstStyle/>
{}        </p:txBody>
      </p:sp>
"#,
            id,
            escape_xml(&tb.name),
            sp_pr,
            tb.anchor.anchor_attr(),
            paragraphs
        )
    }

    fn run_xml(&self, run: &crate::spec::RunSpec) -> String {
        let mut rpr = String::from("lang=\"en-US\"");
        if let Some(size) = run.size_pt {
            rpr.push_str(&format!(" sz=\"{}\"", size * 100));
        }
        if run.bold {
            rpr.push_str(" b=\"1\"");
        }
        if run.italic {
            rpr.push_str(" i=\"1\"");
        }

        let mut children = String::new();
        if let Some(color) = &run.color {
            children.push_str(&format!(
                "<a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>",
                color
            ));
        }
        children.push_str(&format!(
            "<a:latin typeface=\"{}\"/>",
            self.contract.minor_font
        ));

        format!(
            "            <a:r>\n              <a:rPr {}>{}</a:rPr>\n              <a:t>{}</a:t>\n            </a:r>\n",
            rpr,
            children,
            escape_xml(&run.text)
        )
    }

    fn table_xml(&self, id: u32, table: &TableFrameSpec) -> String {
        let (x, y) = table.rect.off_emu();
        let (cx, cy) = table.rect.ext_emu();
        let col_count = table.col_count();
        let row_height_emu = inches_to_emu(table.row_height);

        let mut grid = String::new();
        for width in &table.col_widths {
            grid.push_str(&format!(
                "              <a:gridCol w=\"{}\"/>\n",
                inches_to_emu(*width)
            ));
        }

        let margins = &table.style.margins;
        let mar_l = inches_to_emu(margins.left);
        let mar_r = inches_to_emu(margins.right);
        let mar_t = inches_to_emu(margins.top);
        let mar_b = inches_to_emu(margins.bottom);

        let inner = &table.style.inner_border;
        let outer = &table.style.outer_border;
        let border_xml = |tag: &str, outer_edge: bool| {
            let spec = if outer_edge { outer } else { inner };
            format!(
                "<a:{tag} w=\"{}\" cap=\"flat\"><a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill><a:prstDash val=\"{}\"/></a:{tag}>",
                spec.width_emu, spec.color, spec.dash
            )
        };

        let row_count = table.rows.len();
        let mut rows_xml = String::new();
        for (row_idx, row) in table.rows.iter().enumerate() {
            rows_xml.push_str(&format!("            <a:tr h=\"{}\">\n", row_height_emu));

            let span_all = row.first().is_some_and(|c| c.span_all);
            for (col_idx, cell) in row.iter().enumerate() {
                let span_attr = if span_all && col_idx == 0 && col_count > 1 {
                    format!(" gridSpan=\"{}\"", col_count)
                } else {
                    String::new()
                };

                let is_header = table.header && row_idx == 0;
                let fill = cell.fill.clone().or_else(|| {
                    if is_header {
                        Some(self.contract.palette.table_header_bg.clone())
                    } else if row_idx % 2 == 0 {
                        Some(self.contract.palette.table_alt_row.clone())
                    } else {
                        None
                    }
                });
                let color = cell.color.clone().or_else(|| {
                    if is_header {
                        Some(self.contract.palette.table_header_text.clone())
                    } else {
                        None
                    }
                });

                let mut rpr = String::from("lang=\"en-US\" sz=\"1000\"");
                if cell.bold || is_header {
                    rpr.push_str(" b=\"1\"");
                }
                let mut rpr_children = String::new();
                if let Some(color) = &color {
                    rpr_children.push_str(&format!(
                        "<a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>",
                        color
                    ));
                }
                rpr_children.push_str(&format!(
                    "<a:latin typeface=\"{}\"/>",
                    self.contract.minor_font
                ));

                let fill_xml = fill
                    .map(|f| format!("<a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>", f))
                    .unwrap_or_default();

                // txBody precedes tcPr per the reference structure
                rows_xml.push_str(&format!(
                    "              <a:tc{span}>\n                <a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr {rpr}>{rpr_children}</a:rPr><a:t>{text}</a:t></a:r></a:p></a:txBody>\n                <a:tcPr marL=\"{mar_l}\" marR=\"{mar_r}\" marT=\"{mar_t}\" marB=\"{mar_b}\" anchor=\"{anchor}\">{ln_l}{ln_r}{ln_t}{ln_b}{fill}</a:tcPr>\n              </a:tc>\n",
                    span = span_attr,
                    rpr = rpr,
                    rpr_children = rpr_children,
                    text = escape_xml(&cell.text),
                    mar_l = mar_l,
                    mar_r = mar_r,
                    mar_t = mar_t,
                    mar_b = mar_b,
                    anchor = table.style.valign.anchor_attr(),
                    ln_l = border_xml("lnL", col_idx == 0),
                    ln_r = border_xml("lnR", col_idx + 1 == col_count || span_all),
                    ln_t = border_xml("lnT", row_idx == 0),
                    ln_b = border_xml("lnB", row_idx + 1 == row_count),
                    fill = fill_xml,
                ));
            }

            // Merge continuation cells for a spanning row
            if span_all && col_count > 1 {
                for _ in 1..col_count {
                    rows_xml.push_str(
                        "              <a:tc hMerge=\"1\"><a:txBody><a:bodyPr/><a:lstStyle/><a:p/></a:txBody><a:tcPr/></a:tc>\n",
                    );
                }
            } else if row.len() < col_count {
                // Pad short rows so the grid stays rectangular
                for _ in row.len()..col_count {
                    rows_xml.push_str(
                        "              <a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p/></a:txBody><a:tcPr/></a:tc>\n",
                    );
                }
            }

            rows_xml.push_str("            </a:tr>\n");
        }

        format!(
            r#"      <p:graphicFrame>
        <p:nvGraphicFramePr>
          <p:cNvPr id="{}" name="Table {}"/>
          <p:cNvGraphicFramePr/>
          <p:nvPr/>
        </p:nvGraphicFramePr>
        <p:xfrm>
          <a:off x="{}" y="{}"/>
          <a:ext cx="{}" cy="{}"/>
        </p:xfrm>
        <a:graphic>
          <a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">
            <a:tbl>
              <a:tblPr firstRow="1" bandRow="1"/>
              <a:tblGrid>
{}              </a:tblGrid>
{}            </a:tbl>
          </a:graphicData>
        </a:graphic>
      </p:graphicFrame>
"#,
            id, id, x, y, cx, cy, grid, rows_xml
        )
    }
}

/// Chart graphic frame referencing a chart part rel
fn chart_frame_xml(id: u32, spec: &ChartSpec, rel_id: &str) -> String {
    let (x, y) = spec.rect.off_emu();
    let (cx, cy) = spec.rect.ext_emu();

    format!(
        r#"      <p:graphicFrame>
        <p:nvGraphicFramePr>
          <p:cNvPr id="{}" name="Chart {}"/>
          <p:cNvGraphicFramePr/>
          <p:nvPr/>
        </p:nvGraphicFramePr>
        <p:xfrm>
          <a:off x="{}" y="{}"/>
          <a:ext cx="{}" cy="{}"/>
        </p:xfrm>
        <a:graphic>
          <a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart">
            <c:chart xmlns:c="{}" xmlns:r="{}" r:id="{}"/>
          </a:graphicData>
        </a:graphic>
      </p:graphicFrame>
"#,
        id, id, x, y, cx, cy, NS_CHART, NS_RELATIONSHIPS, rel_id
    )
}

/// A straight connector shape
#[allow(clippy::too_many_arguments)]
fn cxn_sp_xml(
    id: u32,
    name: &str,
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
    width: i64,
    color: &str,
) -> String {
    format!(
        r#"      <p:cxnSp>
        <p:nvCxnSpPr>
          <p:cNvPr id="{}" name="{}"/>
          <p:cNvCxnSpPr/>
          <p:nvPr/>
        </p:nvCxnSpPr>
        <p:spPr>
          <a:xfrm>
            <a:off x="{}" y="{}"/>
            <a:ext cx="{}" cy="{}"/>
          </a:xfrm>
          <a:prstGeom prst="line"><a:avLst/></a:prstGeom>
          <a:ln w="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln>
        </p:spPr>
      </p:cxnSp>
"#,
        id,
        escape_xml(name),
        x,
        y,
        cx,
        cy,
        width,
        color
    )
}

/// A picture referencing a media part rel
fn pic_xml(id: u32, spec: &ImageSpec, rel_id: &str) -> String {
    let (x, y) = spec.rect.off_emu();
    let (cx, cy) = spec.rect.ext_emu();

    format!(
        r#"      <p:pic>
        <p:nvPicPr>
          <p:cNvPr id="{}" name="{}"/>
          <p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
          <p:nvPr/>
        </p:nvPicPr>
        <p:blipFill>
          <a:blip r:embed="{}"/>
          <a:stretch><a:fillRect/></a:stretch>
        </p:blipFill>
        <p:spPr>
          <a:xfrm>
            <a:off x="{}" y="{}"/>
            <a:ext cx="{}" cy="{}"/>
          </a:xfrm>
          <a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
        </p:spPr>
      </p:pic>
"#,
        id,
        escape_xml(&spec.name),
        rel_id,
        x,
        y,
        cx,
        cy
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{CellSpec, ParagraphSpec, RunSpec, SeriesSpec};
    use deckforge_model::Rect;
    use deckforge_template::{ChartKind, TemplateContract, TemplateTableStyleProfile};
    use std::io::Read;
    use zip::ZipArchive;

    fn contract() -> TemplateContract {
        TemplateContract::default()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    fn text_slide(kind: SlideKind, text: &str) -> SlideSpec {
        let mut slide = SlideSpec::new(kind);
        slide.push(ShapeSpec::TextBox(
            TextBoxSpec::new(Rect::new(0.5, 0.5, 10.0, 1.0), "Box")
                .with_paragraph(ParagraphSpec::plain(text)),
        ));
        slide
    }

    #[test]
    fn test_empty_package_is_valid_zip() {
        let contract = contract();
        let writer = PptxWriter::new(&contract).with_title("Test");
        let bytes = writer.generate().unwrap();
        assert!(ZipArchive::new(Cursor::new(bytes)).is_ok());
    }

    #[test]
    fn test_slide_parts_and_overrides() {
        let contract = contract();
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(text_slide(SlideKind::Cover, "Vietnam"));
        writer.add_slide(text_slide(SlideKind::Content, "Body"));

        let bytes = writer.generate().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        assert!(archive.by_name("ppt/slides/slide1.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide2.xml").is_ok());
        drop(archive);

        let types = read_entry(&bytes, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide1.xml"));
        assert!(types.contains("/ppt/slides/slide2.xml"));
    }

    #[test]
    fn test_slide_size_matches_contract() {
        let contract = contract();
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(text_slide(SlideKind::Content, "x"));

        let bytes = writer.generate().unwrap();
        let presentation = read_entry(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains("cx=\"12192000\" cy=\"6858000\""));
    }

    #[test]
    fn test_chart_emission() {
        let contract = contract();
        let mut slide = SlideSpec::new(SlideKind::Content);
        slide.push(ShapeSpec::Chart(ChartSpec {
            kind: ChartKind::Bar,
            title: "Demand".to_string(),
            categories: vec!["2021".to_string()],
            series: vec![SeriesSpec {
                name: "TWh".to_string(),
                values: vec![240.0],
            }],
            rect: Rect::new(0.5, 1.3, 7.4, 5.0),
        }));

        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(slide);
        let bytes = writer.generate().unwrap();

        let chart = read_entry(&bytes, "ppt/charts/chart1.xml");
        assert!(chart.contains("<c:barChart>"));

        let rels = read_entry(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains("../charts/chart1.xml"));

        let types = read_entry(&bytes, "[Content_Types].xml");
        assert!(types.contains("/ppt/charts/chart1.xml"));
    }

    #[test]
    fn test_table_emission_with_span_row() {
        let contract = contract();
        let profile = TemplateTableStyleProfile::derive(&contract, contract.layout(10).unwrap());

        let mut span_cell = CellSpec::text("+3 more items (table capacity exceeded)");
        span_cell.span_all = true;

        let table = TableFrameSpec {
            rect: Rect::new(0.5, 1.4, 12.3, 4.9),
            col_widths: vec![6.15, 6.15],
            row_height: 0.4,
            rows: vec![
                vec![CellSpec::header("A"), CellSpec::header("B")],
                vec![span_cell],
            ],
            header: true,
            style: profile,
        };

        let mut slide = SlideSpec::new(SlideKind::Content);
        slide.push(ShapeSpec::Table(table));

        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(slide);
        let bytes = writer.generate().unwrap();

        let xml = read_entry(&bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains("gridSpan=\"2\""));
        assert!(xml.contains("hMerge=\"1\""));
        assert!(xml.contains("<a:gridCol"));
    }

    #[test]
    fn test_image_emission() {
        let contract = contract();
        let mut slide = SlideSpec::new(SlideKind::Cover);
        slide.push(ShapeSpec::Image(ImageSpec {
            name: "cover-bg.png".to_string(),
            rect: Rect::new(0.0, 0.0, 13.333, 7.5),
            data: b"\x89PNG fake".to_vec(),
        }));

        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(slide);
        let bytes = writer.generate().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        assert!(archive.by_name("ppt/media/image1.png").is_ok());
        drop(archive);

        let rels = read_entry(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains("../media/image1.png"));
    }

    #[test]
    fn test_rule_lines_in_master_and_layouts() {
        let contract = contract();
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(text_slide(SlideKind::Content, "x"));
        let bytes = writer.generate().unwrap();

        for part in [
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/slideLayouts/slideLayout2.xml",
        ] {
            let xml = read_entry(&bytes, part);
            assert!(xml.contains("w=\"6350\""), "{part} missing 6350 rule");
            assert!(xml.contains("w=\"12700\""), "{part} missing 12700 rule");
        }
    }

    #[test]
    fn test_theme_fonts() {
        let contract = contract();
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(text_slide(SlideKind::Content, "x"));
        let bytes = writer.generate().unwrap();

        let theme = read_entry(&bytes, "ppt/theme/theme1.xml");
        assert!(theme.contains("typeface=\"Segoe UI\""));
    }

    #[test]
    fn test_shape_ids_unique_per_slide() {
        let contract = contract();
        let mut slide = SlideSpec::new(SlideKind::Content);
        for i in 0..4 {
            slide.push(ShapeSpec::TextBox(
                TextBoxSpec::new(Rect::new(0.5, 0.5 + i as f64, 5.0, 0.5), format!("Box {i}"))
                    .with_paragraph(ParagraphSpec::plain("t")),
            ));
        }
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(slide);
        let bytes = writer.generate().unwrap();

        let xml = read_entry(&bytes, "ppt/slides/slide1.xml");
        let mut ids: Vec<&str> = Vec::new();
        for chunk in xml.split("<p:cNvPr id=\"").skip(1) {
            ids.push(chunk.split('"').next().unwrap());
        }
        let unique: std::collections::BTreeSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_run_formatting() {
        let contract = contract();
        let mut slide = SlideSpec::new(SlideKind::Content);
        slide.push(ShapeSpec::TextBox(
            TextBoxSpec::new(Rect::new(0.5, 0.5, 5.0, 0.5), "Box").with_paragraph(
                ParagraphSpec {
                    runs: vec![RunSpec::bold("Big & bold").with_size(22).with_color("1F3864")],
                    ..Default::default()
                },
            ),
        ));
        let mut writer = PptxWriter::new(&contract);
        writer.add_slide(slide);
        let bytes = writer.generate().unwrap();

        let xml = read_entry(&bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains("sz=\"2200\""));
        assert!(xml.contains("b=\"1\""));
        assert!(xml.contains("Big &amp; bold"));
        assert!(xml.contains("val=\"1F3864\""));
    }
}
