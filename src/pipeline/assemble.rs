//! Assembly: place converted page artifacts on slides of a PPTX deck.
//!
//! The deck is a minimal Office Open XML package written with the `zip`
//! crate: one blank master/layout, one slide per surviving page, one
//! picture per slide. Each picture is fitted into the canvas content box
//! (canvas minus margins) keeping its aspect ratio, and centred.
//!
//! Output is deterministic. Part names derive from slide position, zip
//! entries carry the fixed DOS epoch timestamp, and no creation dates are
//! written to `docProps`, so the same artifacts always produce the same
//! bytes.

use crate::config::Canvas;
use crate::error::DocumentError;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// One converted page waiting to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage {
    /// 1-based source page number.
    pub page_num: usize,
    pub path: PathBuf,
    /// Rendered page, whose aspect stands in when the artifact's is unknown.
    pub page_raster: Option<PathBuf>,
}

/// Position and size of a picture on the slide, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u64,
    pub y: u64,
    pub cx: u64,
    pub cy: u64,
}

/// Writes PPTX decks on a fixed canvas.
#[derive(Debug, Clone)]
pub struct PptxAssembler {
    canvas: Canvas,
}

impl PptxAssembler {
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    /// Assemble `slides` (already in page order) into `output`.
    ///
    /// Artifacts that cannot be read are skipped with a warning. Returns the
    /// page numbers that made it into the deck. When none did, nothing is
    /// written.
    pub fn assemble(
        &self,
        slides: &[SlideImage],
        title: &str,
        output: &Path,
    ) -> Result<Vec<usize>, DocumentError> {
        let mut media = Vec::with_capacity(slides.len());
        for slide in slides {
            match std::fs::read(&slide.path) {
                Ok(bytes) if !bytes.is_empty() => media.push((slide, bytes)),
                Ok(_) => warn!("Page {}: artifact {} is empty, skipping", slide.page_num, slide.path.display()),
                Err(e) => warn!(
                    "Page {}: cannot read artifact {}: {}, skipping",
                    slide.page_num,
                    slide.path.display(),
                    e
                ),
            }
        }

        if media.is_empty() {
            return Ok(Vec::new());
        }

        let bytes = self.build_package(&media, title).map_err(|e| DocumentError::OutputWriteFailed {
            path: output.to_path_buf(),
            detail: e.to_string(),
        })?;

        write_atomic(output, &bytes)?;
        debug!("Wrote {} ({} slides, {} bytes)", output.display(), media.len(), bytes.len());

        Ok(media.iter().map(|(s, _)| s.page_num).collect())
    }

    fn build_package(&self, media: &[(&SlideImage, Vec<u8>)], title: &str) -> zip::result::ZipResult<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut put = |name: &str, data: &[u8]| -> zip::result::ZipResult<()> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        let count = media.len();
        put("[Content_Types].xml", content_types(count).as_bytes())?;
        put("_rels/.rels", ROOT_RELS.as_bytes())?;
        put("docProps/core.xml", core_props(title).as_bytes())?;
        put("docProps/app.xml", app_props(count).as_bytes())?;
        put("ppt/presentation.xml", presentation(&self.canvas, count).as_bytes())?;
        put("ppt/_rels/presentation.xml.rels", presentation_rels(count).as_bytes())?;
        put("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
        put("ppt/slideMasters/_rels/slideMaster1.xml.rels", SLIDE_MASTER_RELS.as_bytes())?;
        put("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT.as_bytes())?;
        put("ppt/slideLayouts/_rels/slideLayout1.xml.rels", SLIDE_LAYOUT_RELS.as_bytes())?;
        put("ppt/theme/theme1.xml", THEME.as_bytes())?;

        for (i, (slide, bytes)) in media.iter().enumerate() {
            let n = i + 1;
            let ext = media_extension(&slide.path);
            let dims = artifact_dimensions(&slide.path, bytes).or_else(|| {
                let raster = slide.page_raster.as_deref()?;
                debug!("Page {}: artifact size unknown, using page raster", slide.page_num);
                image::image_dimensions(raster)
                    .ok()
                    .map(|(w, h)| (w as u64, h as u64))
            });
            let placement = place(&self.canvas, dims);
            put(&format!("ppt/media/image{n}.{ext}"), bytes.as_slice())?;
            put(
                &format!("ppt/slides/slide{n}.xml"),
                slide_xml(slide.page_num, placement).as_bytes(),
            )?;
            put(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                slide_rels(n, ext).as_bytes(),
            )?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// Write via a sibling temp file and rename, so readers never see a partial deck.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let io_err = |e: std::io::Error| DocumentError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = path.with_extension("pptx.tmp");
    std::fs::write(&tmp_path, bytes).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)
}

// ── Geometry ─────────────────────────────────────────────────────────────────

/// Fit an artifact of `dims` (any unit, aspect is what matters) into the
/// canvas content box, centred. Unknown dimensions fill the whole box;
/// callers substitute the page raster's size first when they have it.
pub fn place(canvas: &Canvas, dims: Option<(u64, u64)>) -> Placement {
    let box_w = canvas.content_width();
    let box_h = canvas.content_height();

    let (cx, cy) = match dims {
        Some((w, h)) if w > 0 && h > 0 => {
            // Compare w/h against box_w/box_h without floating point.
            if (w as u128) * (box_h as u128) >= (h as u128) * (box_w as u128) {
                (box_w, ((box_w as u128) * (h as u128) / (w as u128)) as u64)
            } else {
                (((box_h as u128) * (w as u128) / (h as u128)) as u64, box_h)
            }
        }
        _ => (box_w, box_h),
    };

    Placement {
        x: canvas.margin_emu + (box_w - cx) / 2,
        y: canvas.margin_emu + (box_h - cy) / 2,
        cx,
        cy,
    }
}

/// Read the intrinsic size of an EMF or PNG artifact.
pub fn artifact_dimensions(path: &Path, bytes: &[u8]) -> Option<(u64, u64)> {
    match media_extension(path) {
        "emf" => emf_frame_size(bytes),
        _ => image::load_from_memory(bytes)
            .ok()
            .map(|img| (img.width() as u64, img.height() as u64)),
    }
}

/// Size of the `rclFrame` rectangle in an EMF header record.
///
/// Layout: record type (1) and size, `rclBounds` at offset 8, `rclFrame` at
/// offset 24 as four little-endian i32 (0.01 mm), signature " EMF" at 40.
pub fn emf_frame_size(bytes: &[u8]) -> Option<(u64, u64)> {
    let read_u32 = |at: usize| -> Option<u32> {
        bytes
            .get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    };
    let read_i32 = |at: usize| read_u32(at).map(|v| v as i32);

    if read_u32(0)? != 1 || read_u32(40)? != 0x464D_4520 {
        return None;
    }
    let (left, top, right, bottom) = (read_i32(24)?, read_i32(28)?, read_i32(32)?, read_i32(36)?);
    let w = (right as i64) - (left as i64);
    let h = (bottom as i64) - (top as i64);
    (w > 0 && h > 0).then_some((w as u64, h as u64))
}

fn media_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "png",
        _ => "emf",
    }
}

// ── Package parts ────────────────────────────────────────────────────────────

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn content_types(slides: usize) -> String {
    let mut s = format!(
        "{XML_DECL}\n<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Default Extension=\"emf\" ContentType=\"{}\"/>\
<Default Extension=\"png\" ContentType=\"{}\"/>\
<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>\
<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>\
<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>",
        crate::config::ExportFormat::Emf.content_type(),
        crate::config::ExportFormat::Png.content_type(),
    );
    for n in 1..=slides {
        s.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
    }
    s.push_str("</Types>");
    s
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

fn core_props(title: &str) -> String {
    format!(
        "{XML_DECL}\n<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:dcmitype=\"http://purl.org/dc/dcmitype/\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
<dc:title>{}</dc:title><dc:creator>edgequake-pdf2pptx</dc:creator></cp:coreProperties>",
        xml_escape(title)
    )
}

fn app_props(slides: usize) -> String {
    format!(
        "{XML_DECL}\n<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\" \
xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\">\
<Application>edgequake-pdf2pptx</Application><Slides>{slides}</Slides></Properties>"
    )
}

/// Relationship ids: rId1 master, rId2 theme, rId3.. slides.
fn presentation(canvas: &Canvas, slides: usize) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + n, n + 2))
        .collect();
    format!(
        "{XML_DECL}\n<p:presentation xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\" saveSubsetFonts=\"1\">\
<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
<p:sldIdLst>{ids}</p:sldIdLst>\
<p:sldSz cx=\"{}\" cy=\"{}\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/></p:presentation>",
        canvas.width_emu, canvas.height_emu
    )
}

fn presentation_rels(slides: usize) -> String {
    let mut s = format!(
        "{XML_DECL}\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideMaster\" Target=\"slideMasters/slideMaster1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"{REL_BASE}/theme\" Target=\"theme/theme1.xml\"/>"
    );
    for n in 1..=slides {
        s.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"{REL_BASE}/slide\" Target=\"slides/slide{n}.xml\"/>",
            n + 2
        ));
    }
    s.push_str("</Relationships>");
    s
}

const EMPTY_GROUP: &str = "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>";

const SLIDE_MASTER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n<p:sldMaster xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" ",
    "xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">",
    "<p:cSld><p:spTree>",
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
    "<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>",
    "</p:spTree></p:cSld>",
    "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" ",
    "accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>",
    "<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>",
    "</p:sldMaster>"
);

const SLIDE_MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

const SLIDE_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n<p:sldLayout xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" ",
    "xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" type=\"blank\" preserve=\"1\">",
    "<p:cSld name=\"Blank\"><p:spTree>",
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
    "<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>",
    "</p:spTree></p:cSld>",
    "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
);

const SLIDE_LAYOUT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#;

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\"><a:themeElements>",
    "<a:clrScheme name=\"Office\">",
    "<a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1>",
    "<a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>",
    "<a:dk2><a:srgbClr val=\"44546A\"/></a:dk2><a:lt2><a:srgbClr val=\"E7E6E6\"/></a:lt2>",
    "<a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1><a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>",
    "<a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3><a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>",
    "<a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5><a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>",
    "<a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink><a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>",
    "</a:clrScheme>",
    "<a:fontScheme name=\"Office\">",
    "<a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>",
    "<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>",
    "</a:fontScheme>",
    "<a:fmtScheme name=\"Office\">",
    "<a:fillStyleLst><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:fillStyleLst>",
    "<a:lnStyleLst><a:ln w=\"6350\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln><a:ln w=\"12700\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln><a:ln w=\"19050\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln></a:lnStyleLst>",
    "<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>",
    "<a:bgFillStyleLst><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:bgFillStyleLst>",
    "</a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"
);

fn slide_xml(page_num: usize, p: Placement) -> String {
    format!(
        "{XML_DECL}\n<p:sld xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\"><p:cSld><p:spTree>{EMPTY_GROUP}\
<p:pic><p:nvPicPr><p:cNvPr id=\"2\" name=\"Page {page_num}\"/><p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>\
<p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
<p:spPr><a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm><a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>\
</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        p.x, p.y, p.cx, p.cy
    )
}

fn slide_rels(n: usize, ext: &str) -> String {
    format!(
        "{XML_DECL}\n<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"{REL_BASE}/image\" Target=\"../media/image{n}.{ext}\"/></Relationships>"
    )
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// Minimal EMF header with the given frame (0.01 mm units).
    fn emf_header(width: i32, height: i32) -> Vec<u8> {
        let mut b = vec![0u8; 88];
        b[0..4].copy_from_slice(&1u32.to_le_bytes());
        b[4..8].copy_from_slice(&88u32.to_le_bytes());
        b[32..36].copy_from_slice(&width.to_le_bytes());
        b[36..40].copy_from_slice(&height.to_le_bytes());
        b[40..44].copy_from_slice(&0x464D_4520u32.to_le_bytes());
        b
    }

    fn read_entry(deck: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(deck)).expect("valid zip");
        let mut file = archive.by_name(name).expect("entry exists");
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn emf_frame_is_parsed() {
        assert_eq!(emf_frame_size(&emf_header(33_867, 19_050)), Some((33_867, 19_050)));
    }

    #[test]
    fn non_emf_bytes_have_no_frame() {
        assert_eq!(emf_frame_size(b"EMF"), None);
        let mut bad = emf_header(10, 10);
        bad[40] = 0;
        assert_eq!(emf_frame_size(&bad), None);
    }

    #[test]
    fn wide_artifact_fills_width_and_centres_vertically() {
        let canvas = Canvas::default();
        let p = place(&canvas, Some((4000, 1000)));
        assert_eq!(p.x, canvas.margin_emu);
        assert_eq!(p.cx, canvas.content_width());
        assert_eq!(p.cy, canvas.content_width() / 4);
        assert_eq!(p.y, canvas.margin_emu + (canvas.content_height() - p.cy) / 2);
    }

    #[test]
    fn tall_artifact_fills_height() {
        let canvas = Canvas::default();
        let p = place(&canvas, Some((1000, 2000)));
        assert_eq!(p.y, canvas.margin_emu);
        assert_eq!(p.cy, canvas.content_height());
        assert!(p.x > canvas.margin_emu);
        assert!(p.x + p.cx <= canvas.width_emu - canvas.margin_emu);
    }

    #[test]
    fn unknown_dimensions_fill_box() {
        let canvas = Canvas::default();
        let p = place(&canvas, None);
        assert_eq!(
            p,
            Placement {
                x: canvas.margin_emu,
                y: canvas.margin_emu,
                cx: canvas.content_width(),
                cy: canvas.content_height(),
            }
        );
    }

    #[test]
    fn assembles_slides_in_given_order_and_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("page_1.emf");
        let c = dir.path().join("page_3.emf");
        std::fs::write(&a, emf_header(2000, 1000)).unwrap();
        std::fs::write(&c, emf_header(1000, 1000)).unwrap();
        let slides = vec![
            SlideImage { page_num: 1, path: a, page_raster: None },
            SlideImage { page_num: 2, path: dir.path().join("missing.emf"), page_raster: None },
            SlideImage { page_num: 3, path: c, page_raster: None },
        ];
        let out = dir.path().join("deck/out.pptx");
        let included = PptxAssembler::new(Canvas::default())
            .assemble(&slides, "Q3 <Charts> & more", &out)
            .unwrap();
        assert_eq!(included, vec![1, 3]);

        let deck = std::fs::read(&out).unwrap();
        let pres = read_entry(&deck, "ppt/presentation.xml");
        assert_eq!(pres.matches("<p:sldId ").count(), 2);
        assert!(read_entry(&deck, "ppt/slides/slide2.xml").contains("name=\"Page 3\""));
        assert!(read_entry(&deck, "docProps/core.xml").contains("Q3 &lt;Charts&gt; &amp; more"));
        assert!(read_entry(&deck, "ppt/slides/_rels/slide1.xml.rels").contains("image1.emf"));
        assert!(!out.with_extension("pptx.tmp").exists());
    }

    #[test]
    fn nothing_written_when_no_slides() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.pptx");
        let included = PptxAssembler::new(Canvas::default())
            .assemble(&[], "x", &out)
            .unwrap();
        assert!(included.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("page_1.emf");
        std::fs::write(&a, emf_header(500, 300)).unwrap();
        let slides = vec![SlideImage { page_num: 1, path: a, page_raster: None }];
        let asm = PptxAssembler::new(Canvas::default());
        let first = dir.path().join("1.pptx");
        let second = dir.path().join("2.pptx");
        asm.assemble(&slides, "t", &first).unwrap();
        asm.assemble(&slides, "t", &second).unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn png_dimensions_are_read() {
        use image::{DynamicImage, Rgba, RgbaImage};
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 10, Rgba([0, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
        assert_eq!(artifact_dimensions(Path::new("p.png"), &buf), Some((30, 10)));
    }

    #[test]
    fn unknown_artifact_size_takes_page_aspect() {
        use image::{DynamicImage, Rgba, RgbaImage};
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("page_1.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 10, Rgba([255, 255, 255, 255])))
            .save(&raster)
            .unwrap();
        let artifact = dir.path().join("page_1.emf");
        std::fs::write(&artifact, b"not an emf header").unwrap();

        let out = dir.path().join("deck.pptx");
        let slides = vec![SlideImage {
            page_num: 1,
            path: artifact,
            page_raster: Some(raster),
        }];
        PptxAssembler::new(Canvas::default()).assemble(&slides, "t", &out).unwrap();

        let canvas = Canvas::default();
        let expected = place(&canvas, Some((40, 10)));
        assert_eq!(expected.cx, canvas.content_width());
        assert!(expected.y > canvas.margin_emu);
        let slide = read_entry(&std::fs::read(&out).unwrap(), "ppt/slides/slide1.xml");
        assert!(slide.contains(&format!(
            "<a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/>",
            expected.x, expected.y, expected.cx, expected.cy
        )));
    }

    #[test]
    fn escape_handles_markup_chars() {
        assert_eq!(xml_escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}
