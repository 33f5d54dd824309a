//! Word document renderer (`.docx`).

use nobestudy_shared::{ExportRequest, Result};

use crate::images::LoadedImage;
use crate::ooxml::{
    self, Package, REL_IMAGE, REL_OFFICE_DOCUMENT, Relationship, XML_DECLARATION, escape_xml,
    inches,
};

const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const PICTURE_WIDTH_IN: f64 = 4.0;

/// Render the request as `.docx` bytes: a Heading 1 title, one body
/// paragraph, then each picture inline at four inches wide.
pub fn render(request: &ExportRequest, images: &[LoadedImage]) -> Result<Vec<u8>> {
    let mut pkg = Package::new();

    pkg.add(
        "[Content_Types].xml",
        ooxml::content_types(&[
            (
                "/word/document.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
            (
                "/word/styles.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ])
        .as_bytes(),
    )?;
    pkg.add(
        "_rels/.rels",
        ooxml::relationships(&[Relationship::new(
            "rId1",
            REL_OFFICE_DOCUMENT,
            "word/document.xml",
        )])
        .as_bytes(),
    )?;

    let mut rels = vec![Relationship::new("rId1", REL_STYLES, "styles.xml")];
    for (i, img) in images.iter().enumerate() {
        pkg.add(&format!("word/media/image{}.png", i + 1), &img.png_bytes()?)?;
        rels.push(Relationship::new(
            format!("rId{}", i + 2),
            REL_IMAGE,
            format!("media/image{}.png", i + 1),
        ));
    }

    pkg.add("word/document.xml", document_xml(request, images).as_bytes())?;
    pkg.add(
        "word/_rels/document.xml.rels",
        ooxml::relationships(&rels).as_bytes(),
    )?;
    pkg.add("word/styles.xml", STYLES_XML.as_bytes())?;

    pkg.finish()
}

fn document_xml(request: &ExportRequest, images: &[LoadedImage]) -> String {
    let mut body = String::new();

    body.push_str(&format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_xml(&request.title_line())
    ));

    let runs: Vec<String> = request
        .content
        .split('\n')
        .map(|line| {
            format!(
                r#"<w:t xml:space="preserve">{}</w:t>"#,
                escape_xml(line.trim_end_matches('\r'))
            )
        })
        .collect();
    body.push_str(&format!("<w:p><w:r>{}</w:r></w:p>", runs.join("<w:br/>")));

    for (i, img) in images.iter().enumerate() {
        body.push_str(&inline_picture(i + 1, img));
    }

    body.push_str(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#);

    format!(
        r#"{XML_DECLARATION}<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{body}</w:body></w:document>"#
    )
}

/// `index` is 1-based; the relationship id is offset by the styles part.
fn inline_picture(index: usize, img: &LoadedImage) -> String {
    let cx = inches(PICTURE_WIDTH_IN);
    let cy = inches(img.scaled_height(PICTURE_WIDTH_IN));
    let rid = index + 1;
    format!(
        r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{index}" name="Picture {index}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="{index}" name="image{index}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="rId{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
    )
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/><w:szCs w:val="32"/></w:rPr></w:style></w:styles>"#;
