//! Slide deck renderer (`.pptx`).
//!
//! One 4:3 slide on a "Title and Content" layout: title placeholder, a
//! word-wrapped body text box, and the pictures. Every picture is placed at
//! the same offset, so a second picture covers the first.

use nobestudy_shared::{ExportRequest, Result};

use crate::images::LoadedImage;
use crate::ooxml::{
    self, Package, REL_IMAGE, REL_OFFICE_DOCUMENT, Relationship, XML_DECLARATION, escape_xml,
    inches,
};

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#,
);

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

const SLIDE_WIDTH_IN: f64 = 10.0;
const SLIDE_HEIGHT_IN: f64 = 7.5;

/// Fixed picture placement, identical for every picture.
const PICTURE_LEFT_IN: f64 = 5.0;
const PICTURE_TOP_IN: f64 = 1.5;
const PICTURE_WIDTH_IN: f64 = 4.0;

/// Render the request as `.pptx` bytes.
pub fn render(request: &ExportRequest, images: &[LoadedImage]) -> Result<Vec<u8>> {
    let mut pkg = Package::new();

    pkg.add(
        "[Content_Types].xml",
        ooxml::content_types(&[
            ("/ppt/presentation.xml", "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"),
            ("/ppt/slideMasters/slideMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
            ("/ppt/slideLayouts/slideLayout1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
            ("/ppt/slides/slide1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slide+xml"),
            ("/ppt/theme/theme1.xml", "application/vnd.openxmlformats-officedocument.theme+xml"),
        ])
        .as_bytes(),
    )?;
    pkg.add(
        "_rels/.rels",
        ooxml::relationships(&[Relationship::new(
            "rId1",
            REL_OFFICE_DOCUMENT,
            "ppt/presentation.xml",
        )])
        .as_bytes(),
    )?;

    pkg.add("ppt/presentation.xml", presentation_xml().as_bytes())?;
    pkg.add(
        "ppt/_rels/presentation.xml.rels",
        ooxml::relationships(&[
            Relationship::new("rId1", REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
            Relationship::new("rId2", REL_SLIDE, "slides/slide1.xml"),
            Relationship::new("rId3", REL_THEME, "theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;

    pkg.add("ppt/slideMasters/slideMaster1.xml", slide_master_xml().as_bytes())?;
    pkg.add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        ooxml::relationships(&[
            Relationship::new("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            Relationship::new("rId2", REL_THEME, "../theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;

    pkg.add("ppt/slideLayouts/slideLayout1.xml", slide_layout_xml().as_bytes())?;
    pkg.add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        ooxml::relationships(&[Relationship::new(
            "rId1",
            REL_SLIDE_MASTER,
            "../slideMasters/slideMaster1.xml",
        )])
        .as_bytes(),
    )?;

    pkg.add("ppt/theme/theme1.xml", THEME_XML.as_bytes())?;

    let mut slide_rels = vec![Relationship::new(
        "rId1",
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml",
    )];
    for (i, img) in images.iter().enumerate() {
        let media = format!("ppt/media/image{}.png", i + 1);
        pkg.add(&media, &img.png_bytes()?)?;
        slide_rels.push(Relationship::new(
            format!("rId{}", i + 2),
            REL_IMAGE,
            format!("../media/image{}.png", i + 1),
        ));
    }

    pkg.add("ppt/slides/slide1.xml", slide_xml(request, images).as_bytes())?;
    pkg.add(
        "ppt/slides/_rels/slide1.xml.rels",
        ooxml::relationships(&slide_rels).as_bytes(),
    )?;

    pkg.finish()
}

fn presentation_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz cx="{}" cy="{}" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        inches(SLIDE_WIDTH_IN),
        inches(SLIDE_HEIGHT_IN),
    )
}

const EMPTY_SP_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree>"#;

fn slide_master_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{EMPTY_SP_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="3200"/></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<p:sldLayout {NS} type="obj" preserve="1"><p:cSld name="Title and Content">{EMPTY_SP_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide_xml(request: &ExportRequest, images: &[LoadedImage]) -> String {
    let mut shapes = String::new();

    // Title placeholder
    shapes.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="3200" b="1" dirty="0"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        inches(0.5),
        inches(0.3),
        inches(9.0),
        inches(1.0),
        escape_xml(&request.title_line()),
    ));

    // Body text box
    let paragraphs: String = request
        .content
        .split('\n')
        .map(|line| {
            format!(
                r#"<a:p><a:r><a:rPr lang="en-US" sz="1200" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape_xml(line.trim_end_matches('\r'))
            )
        })
        .collect();
    shapes.push_str(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="TextBox 2"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        inches(0.5),
        inches(1.5),
        inches(4.3),
        inches(5.5),
    ));

    // Pictures, all at the same coordinates
    for (i, img) in images.iter().enumerate() {
        let shape_id = i + 4;
        let height = img.scaled_height(PICTURE_WIDTH_IN);
        shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{shape_id}" name="Picture {}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            shape_id - 1,
            i + 2,
            inches(PICTURE_LEFT_IN),
            inches(PICTURE_TOP_IN),
            inches(PICTURE_WIDTH_IN),
            inches(height),
        ));
    }

    format!(
        r#"{XML_DECLARATION}<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#;
