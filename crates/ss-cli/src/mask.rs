//! Local masking of a text document.

use std::fs;
use std::io::Read;
use std::path::Path;

use log::debug;
use ss_background::BackgroundConfig;
use ss_core::{ContentSession, Document, Message};

use crate::remote::fetch_keywords;

fn read_input(input: Option<&str>) -> Result<(String, String), String> {
    match input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
            let title = Path::new(path)
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();
            Ok((text, title))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok((text, "stdin".to_string()))
        }
    }
}

/// Masked output plus the phrases that would have been reported.
pub struct MaskOutput {
    pub rendered: String,
    pub reports: Vec<String>,
}

pub fn mask_document(
    text: &str,
    url: &str,
    title: &str,
    keywords: &[String],
    html: bool,
) -> Result<MaskOutput, String> {
    let mut doc = Document::from_lines(text);
    let mut session = ContentSession::new(url, title);
    session.set_safe_mode(&mut doc, true);
    session
        .apply_keywords(&mut doc, keywords)
        .map_err(|e| e.to_string())?;
    debug!("{} mutation(s) applied", doc.mutation_count());

    let body = doc.body().ok_or_else(|| "Document has no body".to_string())?;
    let rendered = if html {
        doc.outer_html(body)
    } else {
        doc.children(body)
            .iter()
            .map(|&line| doc.text_content(line))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let reports = session
        .drain_outbox()
        .into_iter()
        .filter_map(|message| match message {
            Message::ContentFlagged { text, .. } => Some(text),
            _ => None,
        })
        .collect();

    Ok(MaskOutput { rendered, reports })
}

pub fn cmd_mask(
    config: &BackgroundConfig,
    input: Option<&str>,
    keywords: &[String],
    url: &str,
    html: bool,
) -> Result<(), String> {
    let (text, title) = read_input(input)?;

    let keywords = if keywords.is_empty() {
        fetch_keywords(config)?.into_vec()
    } else {
        keywords.to_vec()
    };

    let output = mask_document(&text, url, &title, &keywords, html)?;
    println!("{}", output.rendered);

    eprintln!();
    eprintln!("Flagged {} unique phrase(s)", output.reports.len());
    for text in output.reports {
        eprintln!("  {:?}", text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_masks_each_line() {
        let out = mask_document(
            "You are an idiot\nnothing here\n\nIDIOT again",
            "file://local",
            "t",
            &keywords(&["idiot"]),
            false,
        )
        .unwrap();
        assert_eq!(out.rendered, "You are an ***\nnothing here\n*** again");
        assert_eq!(out.reports, vec!["idiot".to_string()]);
    }

    #[test]
    fn test_html_output_keeps_original() {
        let out = mask_document("bad word", "file://local", "t", &keywords(&["bad"]), true).unwrap();
        assert!(out.rendered.contains("safespace-mask"));
        assert!(out.rendered.contains("data-original=\"bad\""));
    }

    #[test]
    fn test_no_keywords_leaves_text() {
        let out = mask_document("plain text", "file://local", "t", &[], false).unwrap();
        assert_eq!(out.rendered, "plain text");
        assert!(out.reports.is_empty());
    }
}
