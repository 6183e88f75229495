//! Transcript rendering to a paginated PDF
//!
//! Layout is computed separately from rendering so pagination can be checked
//! without decoding PDF bytes.

use printpdf::BuiltinFont;
use printpdf::Mm;
use printpdf::PdfDocument;
use tracing::debug;

use crate::config::ExportConfig;
use crate::errors::BarcraftError;
use crate::errors::Result;
use crate::models::Turn;

/// US Letter, in points
pub const PAGE_WIDTH_PT: f32 = 612.0;
pub const PAGE_HEIGHT_PT: f32 = 792.0;

const TOP_MARGIN_PT: f32 = 40.0;
const LEFT_MARGIN_PT: f32 = 30.0;
const TITLE_GAP_PT: f32 = 30.0;
const LINE_HEIGHT_PT: f32 = 15.0;
const BOTTOM_LIMIT_PT: f32 = 40.0;
const FONT_SIZE: f32 = 12.0;

/// One line of text at a vertical position on its page
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub y: f32,
}

/// Lines of a single page, top to bottom; the first page starts with the title
pub type PageLines = Vec<PlacedLine>;

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Words of a line, each with the whitespace run in front of it
fn spaced_words(line: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = line;
    loop {
        let word_start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
        let (gap, tail) = rest.split_at(word_start);
        if tail.is_empty() {
            break;
        }
        let word_end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let (word, next) = tail.split_at(word_end);
        pairs.push((gap, word));
        rest = next;
    }
    pairs
}

/// Break one line into pieces of at most `width` chars, preferring word boundaries
///
/// Spacing between words is kept as written; the whitespace at a break is dropped.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for (gap, word) in spaced_words(line) {
        let gap = if current_len == 0 && !out.is_empty() { "" } else { gap };
        let gap_len = gap.chars().count();
        let word_len = word.chars().count();

        if current_len + gap_len + word_len <= width {
            current.push_str(gap);
            current.push_str(word);
            current_len += gap_len + word_len;
            continue;
        }

        if current_len > 0 {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }

        // Hard-split words longer than a whole line
        let chars: Vec<char> = word.chars().collect();
        let mut pieces = chars.chunks(width).peekable();
        while let Some(piece) = pieces.next() {
            if pieces.peek().is_some() {
                out.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }

    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
    out
}

/// `"<Role>: <text>"` per turn, split on newlines, wrapped at `width`
pub fn transcript_lines(turns: &[Turn], width: usize) -> Vec<String> {
    turns
        .iter()
        .flat_map(|turn| {
            let text = format!("{}: {}", turn.role.label(), turn.content);
            text.split('\n')
                .flat_map(|line| wrap_line(line.trim_end_matches('\r'), width))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Place the title and transcript lines on pages
pub fn layout_pages(title: &str, turns: &[Turn], width: usize) -> Vec<PageLines> {
    let top = PAGE_HEIGHT_PT - TOP_MARGIN_PT;
    let mut pages = Vec::new();
    let mut page = vec![PlacedLine {
        text: title.to_string(),
        y: top,
    }];
    let mut y = top - TITLE_GAP_PT;

    for text in transcript_lines(turns, width) {
        page.push(PlacedLine { text, y });
        y -= LINE_HEIGHT_PT;
        if y < BOTTOM_LIMIT_PT {
            pages.push(std::mem::take(&mut page));
            y = top;
        }
    }

    if !page.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    pages
}

/// Renders conversation transcripts with the configured title and wrap width
#[derive(Debug, Clone)]
pub struct PdfExporter {
    title: String,
    file_name: String,
    line_width: usize,
}

impl PdfExporter {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            title: config.document_title.clone(),
            file_name: config.file_name.clone(),
            line_width: config.line_width,
        }
    }

    /// Download / attachment name
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn layout(&self, turns: &[Turn]) -> Vec<PageLines> {
        layout_pages(&self.title, turns, self.line_width)
    }

    pub fn render(&self, turns: &[Turn]) -> Result<Vec<u8>> {
        if turns.is_empty() {
            return Err(BarcraftError::Validation(
                "No chat history available".to_string(),
            ));
        }

        let pages = self.layout(turns);
        let width = pt_to_mm(PAGE_WIDTH_PT);
        let height = pt_to_mm(PAGE_HEIGHT_PT);

        let (doc, first_page, first_layer) = PdfDocument::new(&self.title, width, height, "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| BarcraftError::ExportFailure(format!("font: {e}")))?;

        for (n, lines) in pages.iter().enumerate() {
            let (page, layer) = if n == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(width, height, format!("Layer {}", n + 1))
            };
            let layer = doc.get_page(page).get_layer(layer);
            for line in lines {
                layer.use_text(
                    line.text.as_str(),
                    FONT_SIZE,
                    pt_to_mm(LEFT_MARGIN_PT),
                    pt_to_mm(line.y),
                    &font,
                );
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| BarcraftError::ExportFailure(format!("pdf: {e}")))?;
        debug!("Rendered {} turns into {} pages ({} bytes)", turns.len(), pages.len(), bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: &str = "Raise the Bar Consulting - AI Session Summary";

    #[test]
    fn test_role_prefix_and_newline_split() {
        let turns = vec![
            Turn::user("Venue Concept: tiki\n\nUser Prompt:\nrum"),
            Turn::assistant("Try a Mai Tai"),
        ];
        let lines = transcript_lines(&turns, 100);
        assert_eq!(
            lines,
            vec![
                "User: Venue Concept: tiki",
                "",
                "User Prompt:",
                "rum",
                "Assistant: Try a Mai Tai",
            ]
        );
    }

    #[test]
    fn test_wrap_prefers_word_boundaries() {
        assert_eq!(wrap_line("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_line("", 10), vec![""]);
    }

    #[test]
    fn test_wrap_keeps_spacing_inside_lines() {
        assert_eq!(
            wrap_line("Gin     2 oz    Lime  1 oz", 14),
            vec!["Gin     2 oz", "Lime  1 oz"]
        );
        assert_eq!(
            wrap_line("    - 2 oz gin, 1 oz lime", 12),
            vec!["    - 2 oz", "gin, 1 oz", "lime"]
        );
    }

    #[test]
    fn test_wrapped_lines_never_exceed_width() {
        let long = "shaken ".repeat(60);
        for line in transcript_lines(&[Turn::assistant(long)], 100) {
            assert!(line.chars().count() <= 100);
        }
    }

    #[test]
    fn test_first_page_positions() {
        let pages = layout_pages(TITLE, &[Turn::user("q"), Turn::assistant("a")], 100);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0][0], PlacedLine { text: TITLE.to_string(), y: 752.0 });
        assert_eq!(pages[0][1].y, 722.0);
        assert_eq!(pages[0][2].y, 707.0);
    }

    #[test]
    fn test_paginates_when_space_runs_out() {
        // Page one holds lines from 722 down to 47 inclusive: 46 lines
        let turns: Vec<Turn> = (0..60).map(|i| Turn::assistant(format!("line {i}"))).collect();
        let pages = layout_pages(TITLE, &turns, 100);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 1 + 46);
        assert_eq!(pages[1].len(), 14);
        assert_eq!(pages[1][0].y, 752.0);
        assert!(pages.iter().flatten().all(|l| l.y >= 40.0));
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let exporter = PdfExporter::new(&ExportConfig::default());
        let bytes = exporter
            .render(&[Turn::user("speakeasy bar"), Turn::assistant("Gin Rickey")])
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(exporter.file_name(), "raise_the_bar_ai_summary.pdf");
    }

    #[test]
    fn test_render_rejects_empty_history() {
        let exporter = PdfExporter::new(&ExportConfig::default());
        assert!(matches!(
            exporter.render(&[]),
            Err(BarcraftError::Validation(_))
        ));
    }
}
