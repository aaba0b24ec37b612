use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;

use crate::models::StoryResult;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_H: f32 = 6.5;
const WRAP_AT: usize = 88;

/// A finished story packaged for saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

pub fn story_title(child_name: &str) -> String {
    format!("{child_name}'s Adventure")
}

/// Plain-text export: title line, blank line, story.
pub fn text_download(child_name: &str, result: &StoryResult) -> StoryDownload {
    StoryDownload {
        filename: format!("{child_name}-story.txt"),
        content_type: "text/plain; charset=utf-8",
        body: format!("{}\n\n{}", story_title(child_name), result.story).into_bytes(),
    }
}

/// A4 PDF export, text only; the illustration is a remote URL and is not embedded.
pub fn pdf_download(child_name: &str, result: &StoryResult) -> Result<StoryDownload, String> {
    let title = story_title(child_name);
    let (doc, first_page, first_layer) = PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| e.to_string())?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| e.to_string())?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    layer.use_text(&title, 20.0, Mm(MARGIN), Mm(PAGE_H - MARGIN - 5.0), &bold);
    let mut y = PAGE_H - MARGIN - 20.0;
    let mut page_no = 1;

    for paragraph in result.paragraphs() {
        for line in wrap(paragraph, WRAP_AT) {
            if y < MARGIN {
                page_no += 1;
                let (page, page_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {page_no}"));
                layer = doc.get_page(page).get_layer(page_layer);
                y = PAGE_H - MARGIN;
            }
            layer.use_text(line, 11.0, Mm(MARGIN), Mm(y), &font);
            y -= LINE_H;
        }
        y -= LINE_H;
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).map_err(|e| e.to_string())?;
    }
    Ok(StoryDownload {
        filename: format!("{child_name}-story.pdf"),
        content_type: "application/pdf",
        body: buf,
    })
}

/// Greedy word wrap on character count.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `Content-Disposition` value with an ASCII fallback and the exact UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DraftStory;
    use pretty_assertions::assert_eq;

    fn result(story: &str) -> StoryResult {
        StoryResult::assemble(DraftStory { story: story.into(), image_prompt: "p".into() }, None)
    }

    #[test]
    fn text_download_is_title_blank_line_story() {
        let story = "First line.\n\nSecond paragraph with émoji 🚲 and trailing space ";
        let download = text_download("Mia", &result(story));
        assert_eq!(download.filename, "Mia-story.txt");
        assert_eq!(download.body, format!("Mia's Adventure\n\n{story}").into_bytes());
    }

    #[test]
    fn pdf_download_produces_a_pdf() {
        let long = vec!["word"; 2000].join(" ");
        let download = pdf_download("Mia", &result(&format!("Intro\n\n{long}\n\nThe end"))).unwrap();
        assert_eq!(download.filename, "Mia-story.pdf");
        assert_eq!(download.content_type, "application/pdf");
        assert!(download.body.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn disposition_quotes_safely() {
        assert_eq!(
            content_disposition("Mia-story.txt"),
            "attachment; filename=\"Mia-story.txt\"; filename*=UTF-8''Mia-story.txt"
        );
        assert_eq!(
            content_disposition("Zoë \"Z\"-story.txt"),
            "attachment; filename=\"Zo_ _Z_-story.txt\"; filename*=UTF-8''Zo%C3%AB%20%22Z%22-story.txt"
        );
    }
}
