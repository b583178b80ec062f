//! Token vocabulary and marking rules for pseudo-static URL collapsing
//! (SPEC_FULL.md §4.2.1-§4.2.4).

use crate::request::ParamValue;
use hashbrown::HashSet;
use lazy_static::lazy_static;
use regex::Regex;

pub const CUSTOM_MARK: &str = "{{Custom}}";
pub const FIX_PARAM_MARK: &str = "{{fix_param}}";
pub const FIX_PATH_MARK: &str = "{{fix_path}}";
pub const LONG_MARK: &str = "{{long}}";
pub const NUMBER_MARK: &str = "{{number}}";
pub const CHINESE_MARK: &str = "{{chinese}}";
pub const UPPER_MARK: &str = "{{upper}}";
#[allow(dead_code)]
pub const LOWER_MARK: &str = "{{lower}}";
pub const URLENCODE_MARK: &str = "{{urlencode}}";
pub const UNICODE_MARK: &str = "{{unicode}}";
pub const BOOL_MARK: &str = "{{bool}}";
pub const LIST_MARK: &str = "{{list}}";
pub const TIME_MARK: &str = "{{time}}";
pub const MIX_ALPHA_NUM_MARK: &str = "{{mix_alpha_num}}";
pub const MIX_SYMBOL_MARK: &str = "{{mix_symbol}}";
pub const MIX_NUM_MARK: &str = "{{mix_num}}";
pub const NO_LOWER_MARK: &str = "{{no_lower}}";
pub const MIX_STR_MARK: &str = "{{mix_str}}";

lazy_static! {
    static ref CHINESE: Regex = Regex::new("[\u{4e00}-\u{9fa5}]+").unwrap();
    static ref URLENCODE: Regex = Regex::new("(?:%[A-Fa-f0-9]{2,6})+").unwrap();
    static ref UNICODE: Regex = Regex::new(r"(?:\\u\w{4})+").unwrap();
    static ref ONLY_ALPHA: Regex = Regex::new("^[a-zA-Z]+$").unwrap();
    static ref ONLY_ALPHA_UPPER: Regex = Regex::new("^[A-Z]+$").unwrap();
    static ref ALPHA_UPPER: Regex = Regex::new("[A-Z]+").unwrap();
    static ref ALPHA_LOWER: Regex = Regex::new("[a-z]+").unwrap();
    static ref REPLACE_NUM: Regex = Regex::new(r"[0-9]+\.[0-9]+|\d+").unwrap();
    static ref ONLY_NUMBER: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"[0-9]+").unwrap();
    static ref ONE_NUMBER: Regex = Regex::new(r"[0-9]").unwrap();
    static ref NUM_SYMBOL: Regex = Regex::new(r"\.|_|-").unwrap();
    static ref TIME_SYMBOL: Regex = Regex::new(r"-|:|\s").unwrap();
    static ref ONLY_ALPHA_NUM: Regex = Regex::new(r"^[0-9a-zA-Z]+$").unwrap();
    static ref MARKED_STRING: Regex = Regex::new(r"^\{\{.+\}\}$").unwrap();
    static ref HTML_SUFFIX: Regex = Regex::new(r"\.shtml$|\.html$|\.htm$").unwrap();
    static ref MARK_TOKEN: Regex = Regex::new(r"\{\{.+\}\}").unwrap();

    static ref SCRIPT_SUFFIXES: HashSet<&'static str> =
        ["php", "asp", "jsp", "asa", "action", "do"].into_iter().collect();

    static ref STATIC_SUFFIXES: HashSet<&'static str> = [
        "png", "gif", "jpg", "mp4", "mp3", "mng", "pct", "bmp", "jpeg", "pst", "psp", "ttf",
        "tif", "tiff", "ai", "drw", "wma", "ogg", "wav", "ra", "aac", "mid", "au", "aiff",
        "dxf", "eps", "ps", "svg", "3gp", "asf", "asx", "avi", "mov", "mpg", "qt", "rm",
        "wmv", "m4a", "bin", "xls", "xlsx", "ppt", "pptx", "doc", "docx", "odt", "ods", "odg",
        "odp", "exe", "zip", "rar", "tar", "gz", "iso", "rss", "pdf", "txt", "dll", "ico",
        "gz2", "apk", "crt", "woff", "map", "woff2", "webp", "less", "dmg", "bz2", "otf", "swf",
        "flv", "mpeg", "dat", "xsl", "csv", "cab", "exif", "wps", "m4v", "rmvb",
        "js", "css", "json",
    ].into_iter().collect();
}

/// A path/file extension counted as a common script suffix, exempt from
/// parent-path over-count collapse.
pub fn in_common_script_suffix(suffix: &str) -> bool {
    SCRIPT_SUFFIXES.contains(suffix)
}

/// A file extension treated as a static resource and dropped by
/// [`crate::filter::SimpleFilter::static_filter`].
pub fn is_static_suffix(suffix: &str) -> bool {
    STATIC_SUFFIXES.contains(suffix)
}

/// Replace CJK, percent-encoded, or unicode-escape runs in the raw query
/// string with their markers, before `Query()`-style decoding would
/// otherwise silently destroy them. Only the first matching rule applies.
pub fn pre_query_mark(raw_query: &str) -> String {
    if CHINESE.is_match(raw_query) {
        CHINESE.replace_all(raw_query, CHINESE_MARK).into_owned()
    } else if URLENCODE.is_match(raw_query) {
        URLENCODE.replace_all(raw_query, URLENCODE_MARK).into_owned()
    } else if UNICODE.is_match(raw_query) {
        UNICODE.replace_all(raw_query, UNICODE_MARK).into_owned()
    } else {
        raw_query.to_string()
    }
}

/// Mark a single parameter/path name (§4.2.2).
pub fn mark_key(key: &str) -> String {
    if ONLY_ALPHA.is_match(key) {
        key.to_string()
    } else if key.len() >= 32 {
        LONG_MARK.to_string()
    } else {
        REPLACE_NUM.replace_all(key, NUMBER_MARK).into_owned()
    }
}

fn has_special_symbol(s: &str) -> bool {
    const SYMBOLS: [char; 16] = [
        '{', '}', ' ', '|', '#', '@', '$', '*', ',', '<', '>', '/', '?', '\\', '+', '=',
    ];
    s.chars().any(|c| SYMBOLS.contains(&c))
}

/// Outcome of marking a single parameter value: the marked replacement,
/// and whether this value triggered the global `Custom` location record.
pub struct MarkedValue {
    pub value: ParamValue,
    pub is_custom: bool,
}

/// Mark a single parameter value (§4.2.3). `strict_mode` gates the
/// `{{no_lower}}`/`{{mix_str}}` branches.
pub fn mark_value(value: &ParamValue, strict_mode: bool) -> MarkedValue {
    let token = |s: &str| MarkedValue {
        value: ParamValue::String(s.to_string()),
        is_custom: false,
    };

    match value {
        ParamValue::Bool(_) => return token(BOOL_MARK),
        ParamValue::List(_) => return token(LIST_MARK),
        ParamValue::Number(_) => return token(NUMBER_MARK),
        ParamValue::String(s) | ParamValue::Other(s) => {
            let s = s.as_str();

            if is_marked_token(s) {
                return MarkedValue {
                    value: value.clone(),
                    is_custom: false,
                };
            }
            if s.contains("Custom") {
                return MarkedValue {
                    value: ParamValue::String(CUSTOM_MARK.to_string()),
                    is_custom: true,
                };
            }
            if ONLY_ALPHA_UPPER.is_match(s) {
                return token(UPPER_MARK);
            }
            if s.len() >= 16 {
                return token(LONG_MARK);
            }
            if ONLY_NUMBER.is_match(s) || ONLY_NUMBER.is_match(&NUM_SYMBOL.replace_all(s, "")) {
                return token(NUMBER_MARK);
            }
            if CHINESE.is_match(s) {
                return token(CHINESE_MARK);
            }
            if URLENCODE.is_match(s) {
                return token(URLENCODE_MARK);
            }
            if UNICODE.is_match(s) {
                return token(UNICODE_MARK);
            }
            if ONLY_NUMBER.is_match(&TIME_SYMBOL.replace_all(s, "")) {
                return token(TIME_MARK);
            }
            if ONLY_ALPHA_NUM.is_match(s) && NUMBER.is_match(s) {
                return token(MIX_ALPHA_NUM_MARK);
            }
            if has_special_symbol(s) {
                return token(MIX_SYMBOL_MARK);
            }
            let zeroed = ONE_NUMBER.replace_all(s, "0");
            if zeroed.matches('0').count() >= 3 {
                return token(MIX_NUM_MARK);
            }
            if strict_mode {
                if !ALPHA_LOWER.is_match(s) {
                    return token(NO_LOWER_MARK);
                }
                let mut classes = 1; // lowercase, matched above
                if ALPHA_UPPER.is_match(s) {
                    classes += 1;
                }
                if NUMBER.is_match(s) {
                    classes += 1;
                }
                if s.contains('_') || s.contains('-') {
                    classes += 1;
                }
                if classes >= 3 {
                    return token(MIX_STR_MARK);
                }
                return MarkedValue {
                    value: value.clone(),
                    is_custom: false,
                };
            }
            MarkedValue {
                value: value.clone(),
                is_custom: false,
            }
        }
    }
}

/// Mark every segment of a `/`-split path (§4.2.4).
pub fn mark_path(path: &str) -> String {
    let marked: Vec<String> = path.split('/').map(mark_segment).collect();
    marked.join("/")
}

fn mark_segment(part: &str) -> String {
    if is_marked_token(part) {
        return part.to_string();
    }
    if part.len() >= 32 {
        return LONG_MARK.to_string();
    }
    if ONLY_NUMBER.is_match(&NUM_SYMBOL.replace_all(part, "")) {
        return NUMBER_MARK.to_string();
    }
    if HTML_SUFFIX.is_match(part) {
        let stripped = HTML_SUFFIX.replace(part, "").into_owned();
        if NUMBER.is_match(&stripped) && ALPHA_UPPER.is_match(&stripped) && ALPHA_LOWER.is_match(&stripped)
        {
            return MIX_ALPHA_NUM_MARK.to_string();
        }
        let digits_only = NUM_SYMBOL.replace_all(&stripped, "");
        if ONLY_NUMBER.is_match(&digits_only) {
            return NUMBER_MARK.to_string();
        }
        return part.to_string();
    }
    if has_special_symbol(part) {
        return MIX_SYMBOL_MARK.to_string();
    }
    if CHINESE.is_match(part) {
        return CHINESE_MARK.to_string();
    }
    if UNICODE.is_match(part) {
        return UNICODE_MARK.to_string();
    }
    if ONLY_ALPHA_UPPER.is_match(part) {
        return UPPER_MARK.to_string();
    }
    let digits_only = NUM_SYMBOL.replace_all(part, "");
    if ONLY_NUMBER.is_match(&digits_only) {
        return NUMBER_MARK.to_string();
    }
    let zeroed = ONE_NUMBER.replace_all(part, "0");
    if zeroed.matches('0').count() > 3 {
        return MIX_NUM_MARK.to_string();
    }
    part.to_string()
}

/// True if `value` is already a bare marker token, e.g. `"{{number}}"`.
pub fn is_marked_token(value: &str) -> bool {
    MARKED_STRING.is_match(value)
}

/// Collapse any embedded `{{...}}` marker substring down to the single
/// token `{{mark}}`, used when folding a marked value into an identity
/// string so distinct marker kinds at the same key don't fragment the id.
pub fn collapse_mark_tokens(value: &str) -> String {
    MARK_TOKEN.replace_all(value, "{{mark}}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_value_marks_upper() {
        assert_eq!(
            mark_value(&ParamValue::String("AAAA".into()), false).value,
            ParamValue::String(UPPER_MARK.into())
        );
    }

    #[test]
    fn digit_value_marks_number() {
        assert_eq!(
            mark_value(&ParamValue::String("12345".into()), false).value,
            ParamValue::String(NUMBER_MARK.into())
        );
    }

    #[test]
    fn strict_mode_mixed_classes_marks_mix_str() {
        let marked = mark_value(&ParamValue::String("a_b-1".into()), true).value;
        assert_eq!(marked, ParamValue::String(MIX_STR_MARK.into()));
    }

    #[test]
    fn alnum_with_digit_marks_mix_alpha_num() {
        assert_eq!(
            mark_value(&ParamValue::String("foo1".into()), false).value,
            ParamValue::String(MIX_ALPHA_NUM_MARK.into())
        );
    }

    #[test]
    fn marking_is_idempotent_for_path() {
        let once = mark_path("/a/12345/b.html");
        let twice = mark_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn marking_is_idempotent_for_values() {
        let once = mark_value(&ParamValue::String("AAAA".into()), false).value;
        let once_str = once.as_display();
        let twice = mark_value(&ParamValue::String(once_str), false).value;
        assert_eq!(once, twice);
    }

    #[test]
    fn custom_substring_triggers_custom_mark() {
        let marked = mark_value(&ParamValue::String("CustomThing".into()), false);
        assert!(marked.is_custom);
        assert_eq!(marked.value, ParamValue::String(CUSTOM_MARK.into()));
    }
}
