//! JS snippet constants for the observer, event-trigger waves, and form
//! frame (§4.1.5, §4.1.7-§4.1.9). Authored fresh for this crate — no
//! captured source text exists for these, only the behavioral contract in
//! SPEC_FULL.md — and fed to `BrowserDriver::evaluate`/
//! `add_script_to_evaluate_on_new_document` by the tab orchestrator.

use lazy_static::lazy_static;
use regex::Regex;

/// Installed via `add_script_to_evaluate_on_new_document` before
/// navigation so it runs on every document the tab loads (§4.1.9): two
/// bindings the orchestrator records new URLs through.
pub const BINDING_ADD_LINK: &str = "addLink";
pub const BINDING_TEST: &str = "Test";

/// Acknowledgement snippet evaluated back into the page after a binding
/// call is processed (§4.1.9): lets page-side code await the crawler
/// having recorded the link before proceeding.
pub fn binding_delivery_snippet(binding: &str, token: &str) -> String {
    format!(
        "window['{binding}Callbacks'] && window['{binding}Callbacks']['{token}'] && window['{binding}Callbacks']['{token}']()"
    )
}

/// Installs a `MutationObserver` over `document` that forwards newly
/// inserted `<a>`/`<form>` nodes and attribute changes to `addLink`
/// (§4.1.1 DomReady's "install DOM mutation observer").
pub const MUTATION_OBSERVER_SCRIPT: &str = r#"
(function() {
  if (window.__crawlergoObserverInstalled) { return; }
  window.__crawlergoObserverInstalled = true;
  var observer = new MutationObserver(function(mutations) {
    mutations.forEach(function(m) {
      m.addedNodes && m.addedNodes.forEach(function(node) {
        if (node.tagName === 'A' && node.href) { window.addLink(node.href, 'DOM'); }
        if (node.tagName === 'FORM' && node.action) { window.addLink(node.action, 'DOM'); }
      });
    });
  });
  observer.observe(document.documentElement || document, { childList: true, subtree: true, attributes: true });
  window.__crawlergoObserver = observer;
})();
"#;

/// Detaches the mutation observer (§4.1.1 Draining's "remove DOM
/// listeners").
pub const REMOVE_OBSERVER_SCRIPT: &str =
    "window.__crawlergoObserver && window.__crawlergoObserver.disconnect();";

/// Sets every `<form>`'s `target` to a synthesized hidden-iframe name so
/// submitting a form doesn't navigate the tab away (§4.1.1 DomReady (c)).
pub const SYNTHETIC_FORM_TARGET_SCRIPT: &str = r#"
(function() {
  var frame = document.createElement('iframe');
  frame.name = '__crawlergo_submit_target__';
  frame.style.display = 'none';
  document.body && document.body.appendChild(frame);
  Array.prototype.forEach.call(document.querySelectorAll('form'), function(f) {
    f.target = '__crawlergo_submit_target__';
  });
})();
"#;

/// Fires synthetic `click()` on every `form` and `form button` node
/// (§4.1.1 Triggered wave 1).
pub const SUBMIT_WAVE_SCRIPT: &str = r#"
(function() {
  Array.prototype.forEach.call(document.querySelectorAll('form'), function(f) {
    try { f.requestSubmit ? f.requestSubmit() : f.submit(); } catch (e) {}
  });
  Array.prototype.forEach.call(document.querySelectorAll('form button'), function(b) {
    try { b.click(); } catch (e) {}
  });
})();
"#;

/// Clicks every synthetic `<a href>` node not already clicked in this tab,
/// and executes `javascript:` pseudo-protocol hrefs directly (§4.1.1
/// Triggered wave 2).
pub const ANCHOR_CLICK_WAVE_SCRIPT: &str = r#"
(function() {
  Array.prototype.forEach.call(document.querySelectorAll('a[href]'), function(a) {
    try {
      if (a.href && a.href.indexOf('javascript:') === 0) {
        eval(a.href.slice(11));
      } else {
        a.click();
      }
    } catch (e) {}
  });
})();
"#;

/// Dispatches inline DOM0 (`onclick=...`) and DOM2
/// (`addEventListener`-registered) handlers across every element
/// (§4.1.1 Triggered wave 3).
pub const DOM_EVENT_WAVE_SCRIPT: &str = r#"
(function() {
  var events = ['click', 'mouseover', 'focus', 'change', 'submit'];
  Array.prototype.forEach.call(document.querySelectorAll('*'), function(el) {
    events.forEach(function(type) {
      try { el.dispatchEvent(new Event(type, { bubbles: true })); } catch (e) {}
    });
  });
})();
"#;

/// Reads `document.characterSet`, used by charset detection (§4.1.10).
pub const DETECT_CHARSET_SCRIPT: &str = "document.characterSet";

lazy_static! {
    /// Matches a URL-shaped string inside an HTML comment (§4.1.5's
    /// Comment collector).
    pub static ref COMMENT_URL_RE: Regex = Regex::new(
        r#"(?i)(https?://[^\s"'<>]+|/[A-Za-z0-9_\-./]+\.[A-Za-z0-9]{2,5}(?:\?[^\s"'<>]*)?)"#
    ).unwrap();

    /// "Suspect URL" regex (§4.1.6): quoted strings resembling a URL, a
    /// relative path, or a filename with a known extension.
    pub static ref SUSPECT_URL_RE: Regex = Regex::new(
        r#"["']((?:https?:)?//[^\s"'<>]{4,200}|/[A-Za-z0-9_\-./]{1,200}|[A-Za-z0-9_\-./]+\.(?:js|css|json|php|asp|aspx|jsp|html|htm|action|do)(?:\?[^\s"'<>]*)?)["']"#
    ).unwrap();

    /// MIME-type-shaped strings the suspect-URL regex must not report as
    /// discovered paths (e.g. `image/x-icon`, `text/css`).
    pub static ref MIME_LIKE_RE: Regex = Regex::new(
        r"^(?:image|text|application|audio|video|font)/[a-zA-Z0-9.+-]+$"
    ).unwrap();
}

/// Filter out MIME-type lookalikes from a suspect-URL regex match
/// (§4.1.6).
pub fn looks_like_mime_type(candidate: &str) -> bool {
    MIME_LIKE_RE.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_regex_finds_relative_path() {
        let text = "<!-- see /api/v2/users.json for details -->";
        assert!(COMMENT_URL_RE.is_match(text));
    }

    #[test]
    fn suspect_url_regex_skips_mime_types() {
        assert!(looks_like_mime_type("image/x-icon"));
        assert!(looks_like_mime_type("text/css"));
        assert!(!looks_like_mime_type("/api/login"));
    }

    #[test]
    fn suspect_url_regex_matches_quoted_relative_path() {
        let js = r#"var u = "/api/v1/login"; fetch(u);"#;
        let m = SUSPECT_URL_RE.captures(js).unwrap();
        assert_eq!(&m[1], "/api/v1/login");
    }
}
