//! PresentationML package writer.

use std::io::{Cursor, Write};

use chrono::{SecondsFormat, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::engine::{DeckBackend, DeckError};
use super::{Align, Anchor, DocumentProperties, Inline, Presentation, Rect, Shape, Slide, TextBox};
use crate::pipeline::layout::{Frame, px_to_emu};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Text box insets, in EMU.
const INSET_X: i64 = 45720;
const INSET_Y: i64 = 22860;

pub struct PptxBackend {
    name: &'static str,
    compression: CompressionMethod,
}

impl PptxBackend {
    pub fn deflated() -> Self {
        Self {
            name: "pptx-deflate",
            compression: CompressionMethod::Deflated,
        }
    }

    pub fn stored() -> Self {
        Self {
            name: "pptx-stored",
            compression: CompressionMethod::Stored,
        }
    }

    fn write_package(&self, deck: &Presentation) -> Result<Vec<u8>, DeckError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(self.compression);
        let slide_count = deck.slide_count();

        let mut parts: Vec<(String, String)> = vec![
            ("[Content_Types].xml".into(), content_types_xml(slide_count)),
            ("_rels/.rels".into(), root_rels_xml()),
            ("docProps/core.xml".into(), core_props_xml(&deck.properties)),
            ("docProps/app.xml".into(), app_props_xml(slide_count)),
            ("ppt/presentation.xml".into(), presentation_xml(deck)),
            (
                "ppt/_rels/presentation.xml.rels".into(),
                presentation_rels_xml(slide_count),
            ),
            ("ppt/slideMasters/slideMaster1.xml".into(), slide_master_xml()),
            (
                "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
                slide_master_rels_xml(),
            ),
            ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout_xml()),
            (
                "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
                slide_layout_rels_xml(),
            ),
            ("ppt/theme/theme1.xml".into(), theme_xml()),
        ];

        for (i, slide) in deck.slides().iter().enumerate() {
            let n = i + 1;
            parts.push((format!("ppt/slides/slide{n}.xml"), slide_xml(slide)));
            parts.push((
                format!("ppt/slides/_rels/slide{n}.xml.rels"),
                slide_rels_xml(),
            ));
        }

        for (name, body) in parts {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

impl DeckBackend for PptxBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn probe(&self) -> Result<(), DeckError> {
        let deck = Presentation::new(
            DocumentProperties {
                creator: "probe".into(),
                title: "probe".into(),
                subject: "probe".into(),
                created: Utc::now(),
            },
            1280,
            720,
        );
        let bytes = self.write_package(&deck)?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        for required in ["[Content_Types].xml", "ppt/presentation.xml"] {
            archive
                .by_name(required)
                .map_err(|e| DeckError::Probe(format!("{required}: {e}")))?;
        }
        Ok(())
    }

    #[tracing::instrument(name = "deck.render", skip_all, fields(deck.backend = self.name, deck.slides = deck.slide_count()))]
    fn render(&self, deck: &Presentation) -> Result<Vec<u8>, DeckError> {
        self.write_package(deck)
    }
}

/// Escapes markup and keeps only characters allowed by the XML 1.0 `Char`
/// production. Line breaks travel as `<a:br/>`, so CR and LF are dropped too.
fn xml_text(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| is_xml_text_char(*c)).collect();
    quick_xml::escape::escape(cleaned.as_str()).into_owned()
}

fn is_xml_text_char(c: char) -> bool {
    c == '\t'
        || (matches!(c, '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
            && !c.is_control())
}

fn content_types_xml(slide_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#)
}

fn rels_xml(relationships: &[String]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(r#"<Relationships xmlns="{NS_PKG_RELS}">"#));
    for rel in relationships {
        xml.push_str(rel);
    }
    xml.push_str("</Relationships>");
    xml
}

fn root_rels_xml() -> String {
    rels_xml(&[
        relationship(
            "rId1",
            &format!("{REL_BASE}/officeDocument"),
            "ppt/presentation.xml",
        ),
        relationship(
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            "docProps/core.xml",
        ),
        relationship(
            "rId3",
            &format!("{REL_BASE}/extended-properties"),
            "docProps/app.xml",
        ),
    ])
}

fn core_props_xml(props: &DocumentProperties) -> String {
    let created = props.created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut xml = String::from(XML_DECL);
    xml.push_str(concat!(
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties""#,
        r#" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/""#,
        r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#
    ));
    xml.push_str(&format!("<dc:title>{}</dc:title>", xml_text(&props.title)));
    xml.push_str(&format!(
        "<dc:subject>{}</dc:subject>",
        xml_text(&props.subject)
    ));
    xml.push_str(&format!(
        "<dc:creator>{}</dc:creator>",
        xml_text(&props.creator)
    ));
    xml.push_str(&format!(
        "<cp:lastModifiedBy>{}</cp:lastModifiedBy>",
        xml_text(&props.creator)
    ));
    xml.push_str(&format!(
        r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#
    ));
    xml.push_str(&format!(
        r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified>"#
    ));
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_props_xml(slide_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#);
    xml.push_str(&format!(
        "<Application>{}</Application>",
        env!("CARGO_PKG_NAME")
    ));
    xml.push_str(&format!("<Slides>{slide_count}</Slides>"));
    xml.push_str("</Properties>");
    xml
}

fn presentation_xml(deck: &Presentation) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(
        r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1">"#
    ));
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    if deck.slide_count() > 0 {
        xml.push_str("<p:sldIdLst>");
        for i in 0..deck.slide_count() {
            xml.push_str(&format!(
                r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                256 + i,
                i + 3
            ));
        }
        xml.push_str("</p:sldIdLst>");
    }
    xml.push_str(&format!(
        r#"<p:sldSz cx="{}" cy="{}"/>"#,
        px_to_emu(deck.width_px),
        px_to_emu(deck.height_px)
    ));
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    xml
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let mut rels = vec![
        relationship(
            "rId1",
            &format!("{REL_BASE}/slideMaster"),
            "slideMasters/slideMaster1.xml",
        ),
        relationship("rId2", &format!("{REL_BASE}/theme"), "theme/theme1.xml"),
    ];
    for n in 1..=slide_count {
        rels.push(relationship(
            &format!("rId{}", n + 2),
            &format!("{REL_BASE}/slide"),
            &format!("slides/slide{n}.xml"),
        ));
    }
    rels_xml(&rels)
}

const EMPTY_SHAPE_TREE: &str = concat!(
    r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
    r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
);

fn slide_master_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(
        r#"<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#
    ));
    xml.push_str("<p:cSld>");
    xml.push_str(EMPTY_SHAPE_TREE);
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str(concat!(
        r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2""#,
        r#" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6""#,
        r#" hlink="hlink" folHlink="folHlink"/>"#
    ));
    xml.push_str(r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#);
    xml.push_str("</p:sldMaster>");
    xml
}

fn slide_master_rels_xml() -> String {
    rels_xml(&[
        relationship(
            "rId1",
            &format!("{REL_BASE}/slideLayout"),
            "../slideLayouts/slideLayout1.xml",
        ),
        relationship("rId2", &format!("{REL_BASE}/theme"), "../theme/theme1.xml"),
    ])
}

fn slide_layout_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(
        r#"<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1">"#
    ));
    xml.push_str(r#"<p:cSld name="Blank">"#);
    xml.push_str(EMPTY_SHAPE_TREE);
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:sldLayout>");
    xml
}

fn slide_layout_rels_xml() -> String {
    rels_xml(&[relationship(
        "rId1",
        &format!("{REL_BASE}/slideMaster"),
        "../slideMasters/slideMaster1.xml",
    )])
}

fn slide_rels_xml() -> String {
    rels_xml(&[relationship(
        "rId1",
        &format!("{REL_BASE}/slideLayout"),
        "../slideLayouts/slideLayout1.xml",
    )])
}

fn theme_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(r#"<a:theme xmlns:a="{NS_A}" name="Report Theme">"#));
    xml.push_str("<a:themeElements>");
    xml.push_str(r#"<a:clrScheme name="Report">"#);
    xml.push_str(r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#);
    xml.push_str(r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#);
    for (slot, rgb) in [
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ] {
        xml.push_str(&format!(r#"<a:{slot}><a:srgbClr val="{rgb}"/></a:{slot}>"#));
    }
    xml.push_str("</a:clrScheme>");
    xml.push_str(r#"<a:fontScheme name="Report">"#);
    xml.push_str(r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#);
    xml.push_str(r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#);
    xml.push_str("</a:fontScheme>");
    xml.push_str(r#"<a:fmtScheme name="Report">"#);
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    xml.push_str(&format!("<a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst>"));
    xml.push_str("<a:lnStyleLst>");
    for width in [6350, 12700, 19050] {
        xml.push_str(&format!(r#"<a:ln w="{width}">{solid}</a:ln>"#));
    }
    xml.push_str("</a:lnStyleLst>");
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    xml.push_str(&format!(
        "<a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst>"
    ));
    xml.push_str(&format!(
        "<a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst>"
    ));
    xml.push_str("</a:fmtScheme>");
    xml.push_str("</a:themeElements>");
    xml.push_str("<a:objectDefaults/><a:extraClrSchemeLst/>");
    xml.push_str("</a:theme>");
    xml
}

fn slide_xml(slide: &Slide) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(
        r#"<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#
    ));
    xml.push_str("<p:cSld>");
    xml.push_str(EMPTY_SHAPE_TREE);
    for (i, shape) in slide.shapes.iter().enumerate() {
        // Id 1 belongs to the group shape.
        let id = i + 2;
        match shape {
            Shape::Text(text_box) => xml.push_str(&text_box_xml(id, text_box)),
            Shape::Rect(rect) => xml.push_str(&rect_xml(id, rect)),
        }
    }
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:sld>");
    xml
}

fn xfrm_xml(frame: &Frame) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        px_to_emu(frame.x),
        px_to_emu(frame.y),
        px_to_emu(frame.width),
        px_to_emu(frame.height)
    )
}

fn solid_fill_xml(rgb: &str) -> String {
    format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, xml_text(rgb))
}

fn rect_xml(id: usize, rect: &Rect) -> String {
    let mut xml = format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Rectangle {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#
    );
    xml.push_str("<p:spPr>");
    xml.push_str(&xfrm_xml(&rect.frame));
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    xml.push_str(&solid_fill_xml(&rect.fill));
    xml.push_str("<a:ln><a:noFill/></a:ln>");
    xml.push_str("</p:spPr></p:sp>");
    xml
}

fn text_box_xml(id: usize, text_box: &TextBox) -> String {
    let mut xml = format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#
    );
    xml.push_str("<p:spPr>");
    xml.push_str(&xfrm_xml(&text_box.frame));
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    match &text_box.fill {
        Some(rgb) => xml.push_str(&solid_fill_xml(rgb)),
        None => xml.push_str("<a:noFill/>"),
    }
    match &text_box.border {
        Some(rgb) => xml.push_str(&format!(r#"<a:ln w="9525">{}</a:ln>"#, solid_fill_xml(rgb))),
        None => xml.push_str("<a:ln><a:noFill/></a:ln>"),
    }
    xml.push_str("</p:spPr>");

    let anchor = match text_box.anchor {
        Anchor::Top => "t",
        Anchor::Middle => "ctr",
    };
    let align = match text_box.align {
        Align::Left => "l",
        Align::Center => "ctr",
        Align::Right => "r",
    };
    xml.push_str(&format!(
        r#"<p:txBody><a:bodyPr wrap="square" lIns="{INSET_X}" tIns="{INSET_Y}" rIns="{INSET_X}" bIns="{INSET_Y}" anchor="{anchor}"/><a:lstStyle/>"#
    ));
    xml.push_str(&format!(r#"<a:p><a:pPr algn="{align}"/>"#));
    for inline in &text_box.content {
        match inline {
            Inline::Run(run) => {
                xml.push_str(&format!(
                    r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0">{}</a:rPr><a:t>{}</a:t></a:r>"#,
                    run.size_pt * 100,
                    u8::from(run.bold),
                    solid_fill_xml(&run.color),
                    xml_text(&run.text)
                ));
            }
            Inline::Break => xml.push_str("<a:br/>"),
        }
    }
    xml.push_str(r#"<a:endParaRPr lang="en-US" dirty="0"/></a:p></p:txBody></p:sp>"#);
    xml
}
