//! PDF composition and artifact upload.
//!
//! Pages are A4 with 1-inch margins and a header/footer on every page. Text
//! placement is manual: the composer walks styled words, advancing the x
//! cursor by the metric widths from `layout`, and starts a new page when the
//! y cursor runs out. Composition is CPU-bound and runs in `spawn_blocking`.

use std::io::BufWriter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb,
};
use uuid::Uuid;

use crate::models::session::{CvAnalysis, QaRecord};
use crate::report::layout::{
    metrics_for, text_width_pt, wrap_spans, StyledWord, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    PT_TO_MM,
};
use crate::report::markup::{parse_blocks, parse_spans, Block, Span, SpanStyle};
use crate::report::{RenderError, ReportArtifact, ReportRenderer};

const TITLE_SIZE: f32 = 22.0;
const HEADING_SIZE: f32 = 14.0;
const SUBHEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.5;
const BODY_LEADING_MM: f32 = 15.0 * PT_TO_MM;
const BULLET_INDENT_MM: f32 = 6.0;

const DATE_FORMAT: &str = "%d %B %Y";

fn accent() -> Color {
    // #2E86AB
    Color::Rgb(Rgb::new(0.18, 0.525, 0.67, None))
}

fn body_color() -> Color {
    Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None))
}

fn footer_color() -> Color {
    Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None))
}

/// All internal geometry is f32; convert at the printpdf boundary.
fn mm(v: f32) -> Mm {
    Mm(v as _)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn for_style(&self, style: SpanStyle) -> &IndirectFontRef {
        match style {
            SpanStyle::Regular => &self.regular,
            SpanStyle::Bold => &self.bold,
            SpanStyle::Italic => &self.oblique,
        }
    }
}

struct Composer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    cursor_y: f32,
    page_number: u32,
    date_line: String,
}

impl Composer {
    fn new(generated_at: DateTime<Utc>) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            "Professional Assessment Report",
            mm(PAGE_WIDTH_MM),
            mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| RenderError::Compose(e.to_string()))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| RenderError::Compose(e.to_string()))?,
            oblique: doc
                .add_builtin_font(BuiltinFont::HelveticaOblique)
                .map_err(|e| RenderError::Compose(e.to_string()))?,
        };
        let layer = doc.get_page(page).get_layer(layer);
        let mut composer = Composer {
            doc,
            layer,
            fonts,
            cursor_y: PAGE_HEIGHT_MM - MARGIN_MM,
            page_number: 1,
            date_line: generated_at.format(DATE_FORMAT).to_string(),
        };
        composer.draw_chrome();
        Ok(composer)
    }

    fn new_page(&mut self) {
        let (page, layer) =
            self.doc
                .add_page(mm(PAGE_WIDTH_MM), mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_number += 1;
        self.cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
        self.draw_chrome();
    }

    /// Per-page header and footer.
    fn draw_chrome(&mut self) {
        self.layer.set_fill_color(accent());
        self.layer.use_text(
            "Cadence — Professional Assessment Report",
            10.0,
            mm(MARGIN_MM),
            mm(PAGE_HEIGHT_MM - 14.0),
            &self.fonts.bold,
        );

        self.layer.set_fill_color(footer_color());
        self.layer.use_text(
            format!("Page {}", self.page_number),
            9.0,
            mm(MARGIN_MM),
            mm(10.0),
            &self.fonts.regular,
        );
        let date_width_mm =
            metrics_for(SpanStyle::Regular).measure_pt(&self.date_line, 9.0) * PT_TO_MM;
        self.layer.use_text(
            self.date_line.clone(),
            9.0,
            mm(PAGE_WIDTH_MM - MARGIN_MM - date_width_mm),
            mm(10.0),
            &self.fonts.regular,
        );
    }

    /// Starts a new page if fewer than `needed_mm` of body space remain.
    fn ensure_space(&mut self, needed_mm: f32) {
        if self.cursor_y - needed_mm < MARGIN_MM {
            self.new_page();
        }
    }

    fn advance(&mut self, mm: f32) {
        self.cursor_y -= mm;
    }

    fn gap(&mut self, mm: f32) {
        self.ensure_space(mm);
        self.advance(mm);
    }

    /// Writes one pre-wrapped line of styled words at the current cursor.
    fn write_line(&mut self, line: &[StyledWord], size_pt: f32, indent_mm: f32, color: Color) {
        self.layer.set_fill_color(color);
        let mut x = MARGIN_MM + indent_mm;
        for (i, word) in line.iter().enumerate() {
            if i > 0 {
                x += metrics_for(word.style).space_width * size_pt * PT_TO_MM;
            }
            self.layer.use_text(
                word.text.clone(),
                size_pt as _,
                mm(x),
                mm(self.cursor_y),
                self.fonts.for_style(word.style),
            );
            x += word.width_pt(size_pt) * PT_TO_MM;
        }
    }

    /// Wraps and writes styled spans as a block, paginating as needed.
    fn write_spans(
        &mut self,
        spans: &[Span],
        size_pt: f32,
        indent_mm: f32,
        leading_mm: f32,
        color: Color,
    ) {
        let max_width = text_width_pt() - indent_mm / PT_TO_MM;
        for line in wrap_spans(spans, size_pt, max_width) {
            self.ensure_space(leading_mm);
            self.advance(leading_mm);
            self.write_line(&line, size_pt, indent_mm, color.clone());
        }
    }

    fn write_paragraph(&mut self, spans: &[Span]) {
        self.write_spans(spans, BODY_SIZE, 0.0, BODY_LEADING_MM, body_color());
    }

    /// Body paragraph with a bold lead-in label, e.g. "Career Stage: …".
    fn write_labeled(&mut self, label: &str, text: &str) {
        let mut spans = vec![Span {
            text: format!("{label}: "),
            style: SpanStyle::Bold,
        }];
        spans.extend(parse_spans(text));
        self.write_paragraph(&spans);
    }

    fn write_heading(&mut self, spans: &[Span], size_pt: f32) {
        // Keep a heading and at least one body line together.
        self.ensure_space(size_pt * PT_TO_MM * 1.3 + BODY_LEADING_MM * 2.0);
        self.gap(3.0);
        let bold: Vec<Span> = spans
            .iter()
            .map(|s| Span {
                text: s.text.clone(),
                style: SpanStyle::Bold,
            })
            .collect();
        self.write_spans(&bold, size_pt, 0.0, size_pt * PT_TO_MM * 1.3, accent());
        self.advance(1.5);
    }

    fn write_bullet(&mut self, spans: &[Span]) {
        let mut with_marker = vec![Span {
            text: "\u{2022} ".to_string(),
            style: SpanStyle::Regular,
        }];
        with_marker.extend_from_slice(spans);
        self.write_spans(
            &with_marker,
            BODY_SIZE,
            BULLET_INDENT_MM,
            BODY_LEADING_MM,
            body_color(),
        );
    }

    fn write_block(&mut self, block: &Block) {
        match block {
            Block::Heading { level: 2, spans } => self.write_heading(spans, HEADING_SIZE),
            Block::Heading { spans, .. } => self.write_heading(spans, SUBHEADING_SIZE),
            Block::Bullet { spans } => self.write_bullet(spans),
            Block::Paragraph { spans } => {
                self.write_paragraph(spans);
                self.advance(1.0);
            }
        }
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| RenderError::Compose(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| RenderError::Compose(e.to_string()))
    }
}

/// Composes the complete report document and returns the PDF bytes.
pub fn compose_report(
    analysis: &CvAnalysis,
    history: &[QaRecord],
    summary: &str,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, RenderError> {
    let mut c = Composer::new(generated_at)?;

    // Title
    c.gap(14.0);
    let title = "Professional Assessment Report";
    let title_width_mm = metrics_for(SpanStyle::Bold).measure_pt(title, TITLE_SIZE) * PT_TO_MM;
    c.layer.set_fill_color(accent());
    let title_x = (PAGE_WIDTH_MM - title_width_mm) / 2.0;
    c.layer.use_text(
        title,
        TITLE_SIZE as _,
        mm(title_x),
        mm(c.cursor_y),
        &c.fonts.bold,
    );
    c.advance(BODY_LEADING_MM);
    c.write_labeled("Generated on", &generated_at.format(DATE_FORMAT).to_string());
    c.gap(6.0);

    // CV analysis overview
    c.write_heading(&parse_spans("CV Analysis Overview"), HEADING_SIZE);
    c.write_labeled("Professional Summary", &analysis.summary);
    c.write_labeled("Career Stage", &analysis.career_stage);
    c.write_labeled("Years of Experience", &analysis.experience_years.to_string());
    if !analysis.key_skills.is_empty() {
        let skills: Vec<_> = analysis.key_skills.iter().take(10).cloned().collect();
        c.write_labeled("Key Skills", &skills.join(", "));
    }
    for achievement in &analysis.notable_achievements {
        c.write_bullet(&parse_spans(achievement));
    }
    if !analysis.potential_areas_for_growth.is_empty() {
        c.write_labeled(
            "Areas for Growth",
            &analysis.potential_areas_for_growth.join(", "),
        );
    }
    c.gap(5.0);

    // Narrative summary (lightweight markup)
    c.write_heading(&parse_spans("Assessment Summary"), HEADING_SIZE);
    for block in parse_blocks(summary) {
        c.write_block(&block);
    }
    c.gap(5.0);

    // Q&A transcript, every entry in order
    c.write_heading(&parse_spans("Interview Questions and Answers"), HEADING_SIZE);
    for (i, qa) in history.iter().enumerate() {
        let mut question = vec![Span {
            text: format!("Question {}: ", i + 1),
            style: SpanStyle::Bold,
        }];
        question.extend(parse_spans(&qa.question));
        c.write_paragraph(&question);

        let mut answer = vec![Span {
            text: "Answer: ".to_string(),
            style: SpanStyle::Bold,
        }];
        answer.extend(parse_spans(&qa.answer));
        c.write_paragraph(&answer);
        c.gap(3.0);
    }

    c.finish()
}

/// Deterministic artifact key: session identity + generation timestamp.
pub fn report_key(session_id: Uuid, generated_at: DateTime<Utc>) -> String {
    format!(
        "reports/{}/assessment_{}.pdf",
        session_id,
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Production renderer: composes the PDF off the async runtime and uploads it
/// to S3 under a per-session key.
pub struct PdfReportRenderer {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl PdfReportRenderer {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { s3, bucket }
    }
}

#[async_trait]
impl ReportRenderer for PdfReportRenderer {
    async fn render(
        &self,
        session_id: Uuid,
        analysis: &CvAnalysis,
        history: &[QaRecord],
        summary: &str,
    ) -> Result<ReportArtifact, RenderError> {
        let generated_at = Utc::now();
        let analysis = analysis.clone();
        let history = history.to_vec();
        let summary = summary.to_string();

        let bytes = tokio::task::spawn_blocking(move || {
            compose_report(&analysis, &history, &summary, generated_at)
        })
        .await
        .map_err(|e| RenderError::Compose(format!("composition task panicked: {e}")))??;

        let s3_key = report_key(session_id, generated_at);
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .body(aws_sdk_s3::primitives::ByteStream::from(bytes))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| RenderError::Upload(e.to_string()))?;

        tracing::info!("Uploaded report artifact to s3://{}/{}", self.bucket, s3_key);

        Ok(ReportArtifact { s3_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> CvAnalysis {
        CvAnalysis {
            summary: "Seasoned platform engineer".to_string(),
            key_skills: vec!["Rust".to_string(), "Postgres".to_string()],
            experience_years: 9,
            career_stage: "Senior".to_string(),
            notable_achievements: vec!["Led a zero-downtime migration".to_string()],
            potential_areas_for_growth: vec!["Public speaking".to_string()],
        }
    }

    fn history(n: usize) -> Vec<QaRecord> {
        (1..=n)
            .map(|i| QaRecord {
                question: format!("Question number {i}?"),
                answer: format!("Answer number {i}."),
                asked_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_compose_produces_pdf_bytes() {
        let summary = "## Executive Summary\nStrong candidate.\n* **Communication**: clear\n";
        let bytes = compose_report(&analysis(), &history(3), summary, Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_compose_handles_long_transcript_across_pages() {
        // Enough long entries to force pagination past one A4 page.
        let long_answer = "A detailed answer that goes on for quite a while. ".repeat(12);
        let history: Vec<QaRecord> = (1..=8)
            .map(|i| QaRecord {
                question: format!("Question {i} about a long and winding career path?"),
                answer: long_answer.clone(),
                asked_at: Utc::now(),
            })
            .collect();
        let bytes =
            compose_report(&analysis(), &history, "## Summary\nFine.", Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_compose_with_empty_summary_and_history() {
        let bytes = compose_report(&analysis(), &[], "", Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_report_key_embeds_session_and_timestamp() {
        let id = Uuid::new_v4();
        let at = chrono::DateTime::parse_from_rfc3339("2026-08-07T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let key = report_key(id, at);
        assert_eq!(key, format!("reports/{id}/assessment_20260807_103000.pdf"));
    }
}
