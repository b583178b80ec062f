//! DOM URL harvesting, form filling, and event triggering (§4.1.5,
//! §4.1.7-§4.1.9), grounded on `browser_tab_dom.go` and the teacher's
//! `page.rs` for the "query all, branch on attributes" shape.

use std::time::Duration;

use hashbrown::HashMap;

use crate::config::CrawlConfig;
use crate::driver::BrowserDriver;
use crate::request::{Method, Request, Source};
use crate::url::CrawlUrl;

use super::js;

/// Attribute names that may carry a URL, queried during the Draining
/// phase's attribute collector (§4.1.5).
pub const URL_ATTRIBUTES: &[&str] = &[
    "src", "href", "link", "data-url", "codebase", "data-href", "action", "dynsrc",
    "image-href", "script-href", "data", "poster", "manifest", "ping", "longdesc", "usemap",
    "background", "source", "formaction",
];

/// The built-in keyword -> form value map (§6's full table).
const FORM_KEYWORD_TABLE: &[(&[&str], &str)] = &[
    (&["mail", "email", "mailbox"], "universe@gmail.com"),
    (&["code", "captcha", "yanzhengma", "ver", "verify"], "123a"),
    (&["phone", "tel", "mobile", "number", "shouji"], "18812345678"),
    (&["name", "user", "id", "login", "account"], "crawlergo@gmail.com"),
    (&["pass", "pwd", "password"], "123456"),
    (&["qq", "wechat", "tencent", "weixin"], "123456789"),
    (&["card", "shenfen", "idcard"], "511702197409284963"),
    (&["url", "site", "web", "blog", "link", "href"], "https://universe.nice.cn/"),
    (&["date", "time", "year", "now"], "2023-01-01"),
    (&["day", "age", "num", "count"], "10"),
];

const FORM_VALUE_FALLBACK: &str = "universe";

/// Resolve a form-fill value for a field, per §4.1.7's resolution order:
/// `CustomFormKeywordValues` substring match on `id+class+name` -> the
/// built-in keyword table (first match wins) -> `CustomFormValues["default"]`
/// -> the built-in fallback string.
pub fn resolve_form_value(
    id_class_name: &str,
    custom_keyword_values: &HashMap<String, String>,
    custom_values: &HashMap<String, String>,
) -> String {
    let haystack = id_class_name.to_lowercase();

    for (keyword, value) in custom_keyword_values {
        if haystack.contains(&keyword.to_lowercase()) {
            return value.clone();
        }
    }

    for (keywords, value) in FORM_KEYWORD_TABLE {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return value.to_string();
        }
    }

    if let Some(default) = custom_values.get("default") {
        return default.clone();
    }

    FORM_VALUE_FALLBACK.to_string()
}

/// The `textarea` fallback value, resolved under the key `"other"`
/// (§4.1.7).
pub fn textarea_value(
    custom_keyword_values: &HashMap<String, String>,
    custom_values: &HashMap<String, String>,
) -> String {
    resolve_form_value("other", custom_keyword_values, custom_values)
}

/// Fill every `input`, `textarea`, and `select option:first-child` node
/// (§4.1.7). Three concurrent fillers in the source; modeled here as three
/// sequential passes since each is itself driven by a handful of
/// driver round-trips per node.
pub async fn fill_forms(driver: &dyn BrowserDriver, config: &CrawlConfig) {
    let _ = tokio::join!(
        fill_inputs(driver, config),
        fill_textareas(driver, config),
        select_first_options(driver),
    );
}

async fn fill_inputs(driver: &dyn BrowserDriver, config: &CrawlConfig) {
    let Ok(nodes) = driver.query_selector_all("input").await else {
        return;
    };
    for node in nodes {
        let Ok(attrs) = driver.attributes_all(node).await else {
            continue;
        };
        let input_type = attrs.get("type").map(|s| s.to_lowercase()).unwrap_or_else(|| "text".to_string());
        match input_type.as_str() {
            "radio" | "checkbox" => {
                let _ = driver.set_attribute_value(node, "checked", "true").await;
            }
            "file" | "image" => {
                let _ = driver.set_attribute_value(node, "accept", "").await;
                let _ = driver.set_attribute_value(node, "required", "").await;
                let _ = driver.send_keys(node, "/tmp/crawlergo_placeholder.txt").await;
            }
            "email" | "password" | "tel" => {
                let value = resolve_form_value(
                    &input_type,
                    &config.custom_form_keyword_values,
                    &config.custom_form_values,
                );
                let _ = driver.set_attribute_value(node, "value", &value).await;
                let _ = driver.send_keys(node, &value).await;
            }
            "submit" | "button" | "hidden" => {}
            _ => {
                let id_class_name = format!(
                    "{}{}{}",
                    attrs.get("id").map(String::as_str).unwrap_or(""),
                    attrs.get("class").map(String::as_str).unwrap_or(""),
                    attrs.get("name").map(String::as_str).unwrap_or(""),
                );
                let value = resolve_form_value(
                    &id_class_name,
                    &config.custom_form_keyword_values,
                    &config.custom_form_values,
                );
                let _ = driver.set_attribute_value(node, "value", &value).await;
                let _ = driver.send_keys(node, &value).await;
            }
        }
    }
}

async fn fill_textareas(driver: &dyn BrowserDriver, config: &CrawlConfig) {
    let Ok(nodes) = driver.query_selector_all("textarea").await else {
        return;
    };
    let value = textarea_value(&config.custom_form_keyword_values, &config.custom_form_values);
    for node in nodes {
        let _ = driver.send_keys(node, &value).await;
    }
}

async fn select_first_options(driver: &dyn BrowserDriver) {
    let Ok(nodes) = driver.query_selector_all("select option:first-child").await else {
        return;
    };
    for node in nodes {
        let _ = driver.set_attribute_value(node, "selected", "true").await;
    }
}

/// Install the DOM mutation observer and the synthetic form-submit target
/// (§4.1.1 DomReady (b)/(c)).
pub async fn install_observer(driver: &dyn BrowserDriver) {
    let _ = driver.evaluate(js::MUTATION_OBSERVER_SCRIPT).await;
    let _ = driver.evaluate(js::SYNTHETIC_FORM_TARGET_SCRIPT).await;
}

pub async fn remove_observer(driver: &dyn BrowserDriver) {
    let _ = driver.evaluate(js::REMOVE_OBSERVER_SCRIPT).await;
}

/// Fire the three event waves, respecting `EventTriggerMode` (§4.1.8).
pub async fn trigger_events(driver: &dyn BrowserDriver, config: &CrawlConfig) {
    use crate::config::EventTriggerMode;

    match config.event_trigger_mode {
        EventTriggerMode::Async => {
            let _ = tokio::join!(
                driver.evaluate(js::SUBMIT_WAVE_SCRIPT),
                driver.evaluate(js::ANCHOR_CLICK_WAVE_SCRIPT),
                driver.evaluate(js::DOM_EVENT_WAVE_SCRIPT),
            );
        }
        EventTriggerMode::Sync => {
            let _ = driver.evaluate(js::SUBMIT_WAVE_SCRIPT).await;
            tokio::time::sleep(config.event_trigger_interval).await;
            let _ = driver.evaluate(js::ANCHOR_CLICK_WAVE_SCRIPT).await;
            tokio::time::sleep(config.event_trigger_interval).await;
            let _ = driver.evaluate(js::DOM_EVENT_WAVE_SCRIPT).await;
        }
    }
}

const HARVEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Attribute/object/comment URL harvesting, each with its own 1s timeout
/// (§4.1.5). Returns every GET Request discovered, tagged with the
/// appropriate source.
pub async fn harvest_dom_urls(driver: &dyn BrowserDriver, nav_url: &CrawlUrl) -> Vec<Request> {
    let (attrs, objects, comments) = tokio::join!(
        tokio::time::timeout(HARVEST_TIMEOUT, harvest_attributes(driver, nav_url)),
        tokio::time::timeout(HARVEST_TIMEOUT, harvest_objects(driver, nav_url)),
        tokio::time::timeout(HARVEST_TIMEOUT, harvest_comments(driver, nav_url)),
    );
    let mut out = Vec::new();
    out.extend(attrs.unwrap_or_default());
    out.extend(objects.unwrap_or_default());
    out.extend(comments.unwrap_or_default());
    out
}

async fn harvest_attributes(driver: &dyn BrowserDriver, nav_url: &CrawlUrl) -> Vec<Request> {
    let mut out = Vec::new();
    for attr in URL_ATTRIBUTES {
        let Ok(nodes) = driver.query_selector_all(&format!("[{attr}]")).await else {
            continue;
        };
        for node in nodes {
            let Ok(attrs) = driver.attributes_all(node).await else {
                continue;
            };
            if let Some(value) = attrs.get(*attr) {
                if let Ok(url) = nav_url.resolve(value) {
                    out.push(Request::new(Method::Get, url, Source::Dom));
                }
            }
        }
    }
    out
}

async fn harvest_objects(driver: &dyn BrowserDriver, nav_url: &CrawlUrl) -> Vec<Request> {
    let mut out = Vec::new();
    let Ok(nodes) = driver.query_selector_all("object[data]").await else {
        return out;
    };
    for node in nodes {
        let Ok(attrs) = driver.attributes_all(node).await else {
            continue;
        };
        if let Some(value) = attrs.get("data") {
            if let Ok(url) = nav_url.resolve(value) {
                out.push(Request::new(Method::Get, url, Source::Dom));
            }
        }
    }
    out
}

/// Comment nodes have no standard CSS selector; the driver contract models
/// them as a pseudo-selector whose `attributes_all` carries the comment's
/// text content under the synthetic `"text"` key (§9's "interface only"
/// scoping of the concrete driver).
async fn harvest_comments(driver: &dyn BrowserDriver, nav_url: &CrawlUrl) -> Vec<Request> {
    let mut out = Vec::new();
    let Ok(nodes) = driver.query_selector_all("comment()").await else {
        return out;
    };
    for node in nodes {
        let Ok(attrs) = driver.attributes_all(node).await else {
            continue;
        };
        let Some(text) = attrs.get("text") else {
            continue;
        };
        for capture in js::COMMENT_URL_RE.find_iter(text) {
            if let Ok(url) = nav_url.resolve(capture.as_str()) {
                out.push(Request::new(Method::Get, url, Source::Comment));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_keyword_before_fallback() {
        let custom_keyword = HashMap::new();
        let custom_values = HashMap::new();
        assert_eq!(
            resolve_form_value("user_email", &custom_keyword, &custom_values),
            "universe@gmail.com"
        );
    }

    #[test]
    fn custom_keyword_wins_over_builtin() {
        let mut custom_keyword = HashMap::new();
        custom_keyword.insert("email".to_string(), "a@b.com".to_string());
        let custom_values = HashMap::new();
        assert_eq!(
            resolve_form_value("user_email", &custom_keyword, &custom_values),
            "a@b.com"
        );
    }

    #[test]
    fn falls_back_to_custom_default_then_builtin_fallback() {
        let custom_keyword = HashMap::new();
        let mut custom_values = HashMap::new();
        custom_values.insert("default".to_string(), "zzz".to_string());
        assert_eq!(
            resolve_form_value("unmatched_field", &custom_keyword, &custom_values),
            "zzz"
        );
        assert_eq!(
            resolve_form_value("unmatched_field", &custom_keyword, &HashMap::new()),
            FORM_VALUE_FALLBACK
        );
    }
}
