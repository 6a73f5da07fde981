// src/utils.rs

use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use std::{collections::HashSet, path::Path, sync::LazyLock};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Characters escaped in object-store paths; `/` is kept as the segment separator.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub fn format_price(amount: u64) -> String {
    format!("{} €", amount)
}

pub fn human_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 {
        text.to_string()
    } else {
        format!("{}...", &text[..end_pos])
    }
}

/// Collapses runs of whitespace so user-provided labels fit on one line.
pub fn single_line(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Extension and magic bytes must both say PDF.
pub fn looks_like_pdf(file_name: &str, bytes: &[u8]) -> bool {
    let has_extension = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    has_extension && bytes.starts_with(b"%PDF")
}

/// Image MIME type sniffed from the leading bytes.
pub fn image_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.trim_ascii_start().starts_with(b"<svg") {
        Some("image/svg+xml")
    } else {
        None
    }
}

/// Storage path of a product's resource, bucket included.
pub fn object_path(bucket: &str, product_id: &str, file_name: &str) -> String {
    format!("{}/{}/{}", bucket, product_id, file_name)
}

pub fn encode_object_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_SEGMENT).to_string()
}

/// Time-based id, suffixed when two are created within the same millisecond.
pub fn unique_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let taken: HashSet<&str> = existing.collect();
    let base = format!("{}_{}", prefix, Utc::now().timestamp_millis());
    if !taken.contains(base.as_str()) {
        return base;
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;

    #[test]
    fn sizes_use_two_decimals_in_megabytes() {
        assert_eq!(human_size(2_516_582), "2.40 MB");
        assert_eq!(human_size(0), "0.00 MB");
    }

    #[test]
    fn pdf_check_needs_extension_and_header() {
        assert!(looks_like_pdf("guide.PDF", b"%PDF-1.4"));
        assert!(!looks_like_pdf("guide.pdf", b"PK\x03\x04"));
        assert!(!looks_like_pdf("guide.txt", b"%PDF-1.4"));
    }

    #[test]
    fn image_types_are_sniffed() {
        assert_eq!(image_mime_type(&[0x89, b'P', b'N', b'G', 0x0D]), Some("image/png"));
        assert_eq!(image_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(image_mime_type(b"%PDF-1.4"), None);
    }

    #[test]
    fn object_paths_keep_separators_and_escape_spaces() {
        let path = object_path(constants::DEFAULT_STORAGE_BUCKET, "p1_door_slammed", "Guide v2.pdf");
        assert_eq!(path, "secure-pdfs/p1_door_slammed/Guide v2.pdf");
        assert_eq!(
            encode_object_path(&path),
            "secure-pdfs/p1_door_slammed/Guide%20v2.pdf"
        );
    }

    #[test]
    fn unique_ids_avoid_collisions() {
        let first = unique_id("mod", std::iter::empty());
        let second = unique_id("mod", [first.as_str()].into_iter());
        assert_ne!(first, second);
        assert!(second.starts_with("mod_"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate_text("Urgence", 20), "Urgence");
        assert_eq!(truncate_text("abcdefghijkl", 8), "abcde...");
        assert_eq!(single_line("  a \n  b "), "a b");
    }
}
