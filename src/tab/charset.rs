//! Charset re-encoding of captured Requests (§4.1.10). Uses the teacher's
//! `auto_encoder` crate, which re-exports `encoding_rs`, rather than a
//! hand-rolled codepage table (SPEC_FULL.md §9).

use auto_encoder::encoding_rs;

/// `true` if `label` names anything other than UTF-8 (case/alias
/// insensitive, via `encoding_rs::Encoding::for_label`).
pub fn is_non_utf8(label: &str) -> bool {
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(enc) => enc != encoding_rs::UTF_8,
        None => false,
    }
}

/// Transcode a UTF-8 Rust string into the named charset's bytes, then
/// lossily back into a `String` so it can still be stored in a `CrawlUrl`'s
/// raw query/path text (§4.1.10: "every captured Request's raw query and
/// raw path are transcoded from UTF-8 into that charset").
pub fn reencode(text: &str, label: &str) -> String {
    let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) else {
        return text.to_string();
    };
    let (bytes, _, _) = encoding.encode(text);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_not_flagged_non_utf8() {
        assert!(!is_non_utf8("UTF-8"));
        assert!(!is_non_utf8("utf8"));
    }

    #[test]
    fn gbk_is_flagged_non_utf8() {
        assert!(is_non_utf8("GBK"));
    }

    #[test]
    fn unknown_label_is_not_flagged() {
        assert!(!is_non_utf8("not-a-real-charset"));
    }
}
