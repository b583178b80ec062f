//! Pseudo-static URL fingerprint/dedup (SPEC_FULL.md §4.2).

use hashbrown::{HashMap, HashSet};
use std::sync::Mutex;

use super::marker::{self, is_marked_token};
use super::md5_hex;
use super::simple::SimpleFilter;
use crate::request::{Method, ParamValue, Request};
use crate::url::{self, CrawlUrl};

const MAX_PARENT_PATH_COUNT: usize = 32;
const MAX_PARAM_KEY_SINGLE_COUNT: u64 = 8;
const MAX_PARAM_KEY_ALL_COUNT: usize = 10;
const MAX_PATH_PARAM_EMPTY_COUNT: usize = 10;
const MAX_PATH_PARAM_KEY_SYMBOL_COUNT: u64 = 5;

/// Pseudo-static fingerprint/dedup filter. Runs a [`SimpleFilter`] first,
/// then marks parameter names/values and path segments, then applies a
/// heuristic over-count collapse before computing the final `uniqueId`.
///
/// Thread-safe: every counter lives behind its own mutex, so concurrent
/// tabs can share one `SmartFilter` the way the frontier does.
pub struct SmartFilter {
    pub strict_mode: bool,
    pub simple_filter: SimpleFilter,
    filter_location_set: Mutex<HashSet<String>>,
    filter_param_key_repeat_count: Mutex<HashMap<String, u64>>,
    filter_param_key_single_values: Mutex<HashMap<String, HashSet<String>>>,
    filter_path_param_key_symbol: Mutex<HashMap<String, u64>>,
    filter_param_key_all_values: Mutex<HashMap<String, HashSet<String>>>,
    filter_path_param_empty_values: Mutex<HashMap<String, HashSet<String>>>,
    filter_parent_path_values: Mutex<HashMap<String, HashSet<String>>>,
    unique_marked_ids: Mutex<HashSet<String>>,
}

impl SmartFilter {
    pub fn new(strict_mode: bool) -> Self {
        Self {
            strict_mode,
            simple_filter: SimpleFilter::new(),
            filter_location_set: Mutex::new(HashSet::new()),
            filter_param_key_repeat_count: Mutex::new(HashMap::new()),
            filter_param_key_single_values: Mutex::new(HashMap::new()),
            filter_path_param_key_symbol: Mutex::new(HashMap::new()),
            filter_param_key_all_values: Mutex::new(HashMap::new()),
            filter_path_param_empty_values: Mutex::new(HashMap::new()),
            filter_parent_path_values: Mutex::new(HashMap::new()),
            unique_marked_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_host_limit(strict_mode: bool, host_limit: impl Into<String>) -> Self {
        Self {
            simple_filter: SimpleFilter::with_host_limit(host_limit),
            ..Self::new(strict_mode)
        }
    }

    fn is_get_family(method: Method) -> bool {
        matches!(
            method,
            Method::Get | Method::Delete | Method::Head | Method::Options
        )
    }

    /// `true` means "drop this request". Mutates `req.filter` in place.
    pub fn do_filter(&self, req: &mut Request) -> bool {
        if self.simple_filter.do_filter(req) {
            return true;
        }

        req.filter.fragment_id = self.calc_fragment_id(req.url.fragment());

        if Self::is_get_family(req.method) {
            self.get_mark(req);
            self.repeat_count_statistic(req);
        } else if matches!(req.method, Method::Post | Method::Put) {
            self.post_mark(req);
        }

        if self
            .unique_marked_ids
            .lock()
            .unwrap()
            .contains(&req.filter.unique_id)
        {
            return true;
        }

        self.global_filter_location_mark(req);

        if Self::is_get_family(req.method) {
            self.over_count_mark(req);
            req.filter.query_map_id = self.get_param_map_id(&req.filter.marked_query_map);
            req.filter.path_id = self.get_path_id(&req.filter.marked_path);
        } else {
            req.filter.post_data_id = self.get_param_map_id(&req.filter.marked_post_data_map);
        }

        req.filter.unique_id = self.get_marked_unique_id(req);

        let mut ids = self.unique_marked_ids.lock().unwrap();
        if ids.contains(&req.filter.unique_id) {
            return true;
        }
        ids.insert(req.filter.unique_id.clone());
        false
    }

    /// A fragment that looks like an absolute path (`#/foo?bar=1`) is
    /// treated as a fake GET URL and contributes its own `uniqueId`;
    /// anything else (and fragments of fragments, since the fake URL is
    /// built with no further fragment) is empty — this is what bounds the
    /// recursion (§8 fragment-recursion-terminates invariant).
    pub fn calc_fragment_id(&self, fragment: &str) -> String {
        if fragment.is_empty() || !fragment.starts_with('/') {
            return String::new();
        }
        let Ok(fake_url) = CrawlUrl::parse(&format!("http://fragment.local{}", fragment)) else {
            return String::new();
        };
        let mut fake_req = Request::new(Method::Get, fake_url, crate::request::Source::Target);
        self.get_mark(&mut fake_req);
        fake_req.filter.unique_id
    }

    /// Mark the query and path of a GET-family request and compute its
    /// identity (§4.2.1-§4.2.5). Also used standalone by
    /// [`Self::calc_fragment_id`] on a synthetic request.
    pub fn get_mark(&self, req: &mut Request) {
        let pre_marked_query = marker::pre_query_mark(req.url.raw_query());
        let query_map = url::parse_query_map(&pre_marked_query);
        let query_map = self.mark_param_name(query_map);
        let query_map = self.mark_param_value(query_map, req);
        let marked_path = marker::mark_path(req.url.path());

        let (query_keys_id, query_map_id) = if query_map.is_empty() {
            (String::new(), String::new())
        } else {
            (self.get_keys_id(&query_map), self.get_param_map_id(&query_map))
        };
        let path_id = self.get_path_id(&marked_path);

        req.filter.marked_query_map = query_map;
        req.filter.query_keys_id = query_keys_id;
        req.filter.query_map_id = query_map_id;
        req.filter.marked_path = marked_path;
        req.filter.path_id = path_id;

        req.filter.unique_id = self.get_marked_unique_id(req);
    }

    fn mark_param_name(&self, map: HashMap<String, ParamValue>) -> HashMap<String, ParamValue> {
        map.into_iter()
            .map(|(k, v)| (marker::mark_key(&k), v))
            .collect()
    }

    fn mark_param_value(
        &self,
        map: HashMap<String, ParamValue>,
        req: &Request,
    ) -> HashMap<String, ParamValue> {
        let mut out = HashMap::new();
        for (key, value) in map {
            let marked = marker::mark_value(&value, self.strict_mode);
            if marked.is_custom {
                let location = format!(
                    "{}{}{}{}",
                    req.url.host(),
                    req.url.path(),
                    req.method.as_str(),
                    key
                );
                self.filter_location_set.lock().unwrap().insert(location);
            }
            out.insert(key, marked.value);
        }
        out
    }

    fn get_keys_id(&self, map: &HashMap<String, ParamValue>) -> String {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        md5_hex(&keys.into_iter().cloned().collect::<String>())
    }

    fn get_param_map_id(&self, map: &HashMap<String, ParamValue>) -> String {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        let mut id_str = String::new();
        for key in keys {
            id_str.push_str(key);
            if let ParamValue::String(s) = &map[key] {
                id_str.push_str(&marker::collapse_mark_tokens(s));
            }
        }
        md5_hex(&id_str)
    }

    fn get_path_id(&self, path: &str) -> String {
        md5_hex(path)
    }

    fn get_marked_unique_id(&self, req: &Request) -> String {
        let param_id = if Self::is_get_family(req.method) {
            &req.filter.query_map_id
        } else {
            &req.filter.post_data_id
        };

        let mut unique_str = format!(
            "{}{}{}{}{}",
            req.method.as_str(),
            param_id,
            req.filter.path_id,
            req.url.host(),
            req.filter.fragment_id
        );
        if req.redirection {
            unique_str.push_str("Redirection");
        }
        if req.url.path() == "/" && req.url.raw_query().is_empty() && req.url.scheme() == "https" {
            unique_str.push_str("https");
        }
        md5_hex(&unique_str)
    }

    fn repeat_count_statistic(&self, req: &Request) {
        let query_key_id = req.filter.query_keys_id.clone();
        let path_id = req.filter.path_id.clone();

        if !query_key_id.is_empty() {
            {
                let mut counts = self.filter_param_key_repeat_count.lock().unwrap();
                *counts.entry(query_key_id.clone()).or_insert(0) += 1;
            }

            for (key, value) in &req.filter.marked_query_map {
                let value_str = value.as_display();
                let param_query_key = format!("{}{}", query_key_id, key);
                self.filter_param_key_single_values
                    .lock()
                    .unwrap()
                    .entry(param_query_key)
                    .or_default()
                    .insert(value_str.clone());

                self.filter_param_key_all_values
                    .lock()
                    .unwrap()
                    .entry(key.clone())
                    .or_default()
                    .insert(value_str.clone());

                if value_str.is_empty() {
                    self.filter_path_param_empty_values
                        .lock()
                        .unwrap()
                        .entry(path_id.clone())
                        .or_default()
                        .insert(key.clone());
                }

                let path_id_key = format!("{}{}", path_id, key);
                let mut symbol_counts = self.filter_path_param_key_symbol.lock().unwrap();
                if symbol_counts.contains_key(&path_id_key) {
                    if is_marked_token(&value_str) {
                        *symbol_counts.entry(path_id_key).or_insert(0) += 1;
                    }
                } else {
                    symbol_counts.insert(path_id_key, 1);
                }
            }
        }

        let parent_path = req.url.parent_path();
        if parent_path.is_empty() || marker::in_common_script_suffix(&req.url.file_ext()) {
            return;
        }

        let parent_path_id = md5_hex(&parent_path);
        let current_path = req.filter.marked_path.replacen(&parent_path, "", 1);
        self.filter_parent_path_values
            .lock()
            .unwrap()
            .entry(parent_path_id)
            .or_default()
            .insert(current_path);
    }

    fn post_mark(&self, req: &mut Request) {
        let post_data_map = req.post_data_map();
        let post_data_map = self.mark_param_name(post_data_map);
        let post_data_map = self.mark_param_value(post_data_map, req);
        let marked_path = marker::mark_path(req.url.path());

        req.filter.post_data_id = if post_data_map.is_empty() {
            String::new()
        } else {
            self.get_param_map_id(&post_data_map)
        };
        req.filter.marked_post_data_map = post_data_map;
        req.filter.marked_path = marked_path.clone();
        req.filter.path_id = self.get_path_id(&marked_path);

        req.filter.unique_id = self.get_marked_unique_id(req);
    }

    fn global_filter_location_mark(&self, req: &mut Request) {
        let prefix = format!("{}{}{}", req.url.host(), req.url.path(), req.method.as_str());
        let locations = self.filter_location_set.lock().unwrap();
        if Self::is_get_family(req.method) {
            for (key, value) in req.filter.marked_query_map.iter_mut() {
                if locations.contains(&format!("{}{}", prefix, key)) {
                    *value = ParamValue::String(marker::CUSTOM_MARK.to_string());
                }
            }
        } else if matches!(req.method, Method::Post | Method::Put) {
            for (key, value) in req.filter.marked_post_data_map.iter_mut() {
                if locations.contains(&format!("{}{}", prefix, key)) {
                    *value = ParamValue::String(marker::CUSTOM_MARK.to_string());
                }
            }
        }
    }

    fn over_count_mark(&self, req: &mut Request) {
        let query_key_id = req.filter.query_keys_id.clone();
        let path_id = req.filter.path_id.clone();

        if !query_key_id.is_empty() {
            let repeated = self
                .filter_param_key_repeat_count
                .lock()
                .unwrap()
                .get(&query_key_id)
                .copied()
                .unwrap_or(0)
                > MAX_PARAM_KEY_SINGLE_COUNT;

            if repeated {
                let keys: Vec<String> = req.filter.marked_query_map.keys().cloned().collect();
                let single_values = self.filter_param_key_single_values.lock().unwrap();
                for key in &keys {
                    let param_query_key = format!("{}{}", query_key_id, key);
                    if let Some(set) = single_values.get(&param_query_key) {
                        if set.len() > 3 {
                            req.filter.marked_query_map.insert(
                                key.clone(),
                                ParamValue::String(marker::FIX_PARAM_MARK.to_string()),
                            );
                        }
                    }
                }
            }

            let keys: Vec<String> = req.filter.marked_query_map.keys().cloned().collect();
            let all_values = self.filter_param_key_all_values.lock().unwrap();
            let symbol_counts = self.filter_path_param_key_symbol.lock().unwrap();
            for key in &keys {
                if let Some(set) = all_values.get(key) {
                    if set.len() > MAX_PARAM_KEY_ALL_COUNT {
                        req.filter.marked_query_map.insert(
                            key.clone(),
                            ParamValue::String(marker::FIX_PARAM_MARK.to_string()),
                        );
                    }
                }
                let path_id_key = format!("{}{}", path_id, key);
                if symbol_counts
                    .get(&path_id_key)
                    .copied()
                    .unwrap_or(0)
                    > MAX_PATH_PARAM_KEY_SYMBOL_COUNT
                {
                    req.filter.marked_query_map.insert(
                        key.clone(),
                        ParamValue::String(marker::FIX_PARAM_MARK.to_string()),
                    );
                }
            }

            if let Some(empty_keys) = self.filter_path_param_empty_values.lock().unwrap().get(&path_id) {
                if empty_keys.len() > MAX_PATH_PARAM_EMPTY_COUNT {
                    let mut collapsed = HashMap::new();
                    for (key, value) in req.filter.marked_query_map.drain() {
                        if value.as_display().is_empty() {
                            collapsed.insert(marker::FIX_PARAM_MARK.to_string(), ParamValue::String(String::new()));
                        } else {
                            collapsed.insert(key, value);
                        }
                    }
                    req.filter.marked_query_map = collapsed;
                }
            }
        }

        let parent_path = req.url.parent_path();
        if parent_path.is_empty() || marker::in_common_script_suffix(&req.url.file_ext()) {
            return;
        }
        let parent_path_id = md5_hex(&parent_path);
        if let Some(set) = self.filter_parent_path_values.lock().unwrap().get(&parent_path_id) {
            if set.len() > MAX_PARENT_PATH_COUNT {
                req.filter.marked_path = if parent_path.ends_with('/') {
                    format!("{}{}", parent_path, marker::FIX_PATH_MARK)
                } else {
                    format!("{}/{}", parent_path, marker::FIX_PATH_MARK)
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Source};
    use crate::url::CrawlUrl;

    fn req(method: Method, url: &str) -> Request {
        Request::new(method, CrawlUrl::parse(url).unwrap(), Source::Target)
    }

    #[test]
    fn numeric_param_collapses_second_seed() {
        let filter = SmartFilter::new(false);
        let mut r1 = req(Method::Get, "http://h/?id=1");
        let mut r2 = req(Method::Get, "http://h/?id=2");
        assert!(!filter.do_filter(&mut r1));
        assert!(filter.do_filter(&mut r2));
    }

    #[test]
    fn numeric_path_segment_collapses_second_seed() {
        let filter = SmartFilter::new(false);
        let mut r1 = req(Method::Get, "http://h/2023/");
        let mut r2 = req(Method::Get, "http://h/2024/");
        assert!(!filter.do_filter(&mut r1));
        assert!(filter.do_filter(&mut r2));
    }

    #[test]
    fn custom_location_rewrites_later_request() {
        let filter = SmartFilter::new(false);
        let mut seed = req(Method::Get, "http://h/?a=Custom");
        assert!(!filter.do_filter(&mut seed));

        let mut later = req(Method::Get, "http://h/?a=x&b=y");
        filter.do_filter(&mut later);
        assert_eq!(
            later.filter.marked_query_map.get("a"),
            Some(&ParamValue::String(marker::CUSTOM_MARK.to_string()))
        );
    }

    #[test]
    fn fragment_recursion_terminates() {
        let filter = SmartFilter::new(false);
        let slash_fragment = filter.calc_fragment_id("/a?x=1");
        assert!(!slash_fragment.is_empty());
        let non_slash_fragment = filter.calc_fragment_id("section-2");
        assert!(non_slash_fragment.is_empty());
    }

    #[test]
    fn do_filter_is_idempotent() {
        let filter = SmartFilter::new(false);
        let mut r = req(Method::Get, "http://h/a?x=1");
        assert!(!filter.do_filter(&mut r));
        let mut r2 = req(Method::Get, "http://h/a?x=1");
        assert!(filter.do_filter(&mut r2));
    }
}
