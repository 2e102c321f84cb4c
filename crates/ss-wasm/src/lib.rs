//! WebAssembly bindings for SafeSpace
//!
//! The extension's JS glue owns the real DOM. It hands text to these
//! bindings and builds placeholder spans from the returned segments, so the
//! matching rules are identical to the ones the core engine applies.

use wasm_bindgen::prelude::*;
use ss_core::{
    focus::{blocked_redirect, normalize_sites},
    keywords::{build_pattern, CompiledMatcher, KeywordSet},
    mask::{mask_text, MASK_CLASS, MASK_LABEL, ORIGINAL_ATTR},
    url::extract_host,
    FocusState,
    ReportedMatches,
};

fn string_list(value: &JsValue) -> Result<Vec<String>, JsValue> {
    let array = js_sys::Array::from(value);
    let mut out = Vec::with_capacity(array.length() as usize);
    for item in array.iter() {
        let text = item
            .as_string()
            .ok_or_else(|| JsValue::from_str("List entries must be strings"))?;
        out.push(text);
    }
    Ok(out)
}

fn js_array(items: &[String]) -> JsValue {
    let array = js_sys::Array::new();
    for item in items {
        array.push(&JsValue::from_str(item));
    }
    array.into()
}

/// Placeholder constants the glue needs to build and find mask spans.
#[wasm_bindgen]
pub fn mask_constants() -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"label".into(), &JsValue::from_str(MASK_LABEL));
    let _ = js_sys::Reflect::set(&result, &"className".into(), &JsValue::from_str(MASK_CLASS));
    let _ = js_sys::Reflect::set(&result, &"originalAttr".into(), &JsValue::from_str(ORIGINAL_ATTR));
    result.into()
}

#[wasm_bindgen]
pub fn normalize_keywords(keywords: JsValue) -> Result<JsValue, JsValue> {
    let set = KeywordSet::normalize(string_list(&keywords)?);
    Ok(js_array(set.as_slice()))
}

#[wasm_bindgen]
pub fn build_pattern_js(keywords: JsValue) -> Result<Option<String>, JsValue> {
    let set = KeywordSet::normalize(string_list(&keywords)?);
    Ok(build_pattern(&set))
}

// =============================================================================
// Matcher
// =============================================================================

#[wasm_bindgen]
pub struct Matcher {
    inner: CompiledMatcher,
}

#[wasm_bindgen]
impl Matcher {
    /// Compile a keyword list. Returns `undefined` for an empty list.
    pub fn compile(keywords: JsValue) -> Result<Option<Matcher>, JsValue> {
        let set = KeywordSet::normalize(string_list(&keywords)?);
        let compiled = set.compile().map_err(|e| {
            web_sys::console::warn_1(&JsValue::from_str(&format!("safespace: {}", e)));
            JsValue::from_str(&e.to_string())
        })?;
        Ok(compiled.map(|inner| Matcher { inner }))
    }

    #[wasm_bindgen(getter)]
    pub fn pattern(&self) -> String {
        self.inner.pattern().to_string()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.inner.is_match(text)
    }

    /// `[{text, masked}]` runs covering `text` in order.
    pub fn segments(&self, text: &str) -> JsValue {
        let array = js_sys::Array::new();
        for segment in self.inner.segments(text) {
            let entry = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&entry, &"text".into(), &JsValue::from_str(segment.text()));
            let _ = js_sys::Reflect::set(&entry, &"masked".into(), &JsValue::from(segment.is_match()));
            array.push(&entry);
        }
        array.into()
    }

    pub fn mask(&self, text: &str) -> String {
        mask_text(&self.inner, text)
    }
}

// =============================================================================
// Report dedup
// =============================================================================

/// Per-page record of reported matches.
#[wasm_bindgen]
#[derive(Default)]
pub struct ReportTracker {
    inner: ReportedMatches,
}

#[wasm_bindgen]
impl ReportTracker {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ReportTracker {
        ReportTracker::default()
    }

    /// `true` the first time `(text, url)` is seen.
    pub fn claim(&mut self, text: &str, url: &str) -> bool {
        self.inner.insert(text, url)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

// =============================================================================
// Focus
// =============================================================================

#[wasm_bindgen]
pub fn extract_host_js(url: &str) -> Option<String> {
    extract_host(url).map(|h| h.to_string())
}

#[wasm_bindgen]
pub fn normalize_sites_js(sites: JsValue) -> Result<JsValue, JsValue> {
    Ok(js_array(&normalize_sites(string_list(&sites)?)))
}

/// Redirect target for a tab at `url`, or `undefined` to leave it.
#[wasm_bindgen]
pub fn blocked_redirect_js(
    url: &str,
    active: bool,
    blocked_sites: JsValue,
    blocked_page: &str,
) -> Result<Option<String>, JsValue> {
    let state = FocusState {
        active,
        blocked_sites: normalize_sites(string_list(&blocked_sites)?),
        ..FocusState::default()
    };
    Ok(blocked_redirect(url, &state, blocked_page))
}
