//! Placeholder masking over a [`Document`]
//!
//! Matched text is swapped for a `span` that shows [`MASK_LABEL`] and keeps
//! the original text in [`ORIGINAL_ATTR`]. Masking never loses information:
//! [`MaskEngine::remove_all`] puts every original back.

use log::{debug, trace};

use crate::dedup::ReportedMatches;
use crate::dom::{Document, NodeId};
use crate::keywords::{CompiledMatcher, Segment};
use crate::types::FlaggedContent;

/// Text shown in place of a matched keyword.
pub const MASK_LABEL: &str = "***";
/// Class carried by every placeholder element.
pub const MASK_CLASS: &str = "safespace-mask";
/// Attribute holding the original matched text.
pub const ORIGINAL_ATTR: &str = "data-original";

/// Subtrees under these tags are never scanned.
pub const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "code", "pre", "kbd", "samp",
    "textarea", "input", "select", "option",
];

pub struct MaskEngine {
    matcher: Option<CompiledMatcher>,
    enabled: bool,
    page_url: String,
    page_title: String,
    reported: ReportedMatches,
    flagged: Vec<FlaggedContent>,
}

impl MaskEngine {
    pub fn new(page_url: impl Into<String>, page_title: impl Into<String>) -> Self {
        Self {
            matcher: None,
            enabled: false,
            page_url: page_url.into(),
            page_title: page_title.into(),
            reported: ReportedMatches::new(),
            flagged: Vec::new(),
        }
    }

    pub fn set_matcher(&mut self, matcher: Option<CompiledMatcher>) {
        self.matcher = matcher;
    }

    pub fn matcher(&self) -> Option<&CompiledMatcher> {
        self.matcher.as_ref()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Masking is on and a matcher exists.
    pub fn is_active(&self) -> bool {
        self.enabled && self.matcher.is_some()
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Forget which matches were reported on this page.
    pub fn reset_reports(&mut self) {
        self.reported.clear();
    }

    /// Reports produced since the last call, in match order.
    pub fn take_flagged(&mut self) -> Vec<FlaggedContent> {
        std::mem::take(&mut self.flagged)
    }

    // =========================================================================
    // Node predicates
    // =========================================================================

    /// Whether `node` is a placeholder inserted by this engine.
    pub fn is_mask(doc: &Document, node: NodeId) -> bool {
        doc.tag(node).is_some()
            && doc
                .attr(node, "class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == MASK_CLASS))
    }

    /// Whether `node` is an element whose subtree must be skipped.
    pub fn is_excluded(doc: &Document, node: NodeId) -> bool {
        match doc.tag(node) {
            Some(tag) => EXCLUDED_TAGS.contains(&tag) || Self::is_mask(doc, node),
            None => false,
        }
    }

    /// Whether any ancestor of `node` is excluded, so a full scan from the
    /// body would never reach it.
    pub fn has_excluded_ancestor(doc: &Document, node: NodeId) -> bool {
        let mut current = doc.parent(node);
        while let Some(ancestor) = current {
            if Self::is_excluded(doc, ancestor) {
                return true;
            }
            current = doc.parent(ancestor);
        }
        false
    }

    // =========================================================================
    // Masking
    // =========================================================================

    /// Mask every eligible text node under `root`. Returns the number of
    /// placeholders inserted.
    pub fn apply_to_subtree(&mut self, doc: &mut Document, root: NodeId) -> usize {
        if !self.is_active() {
            return 0;
        }
        if doc.is_text(root) {
            return self.mask_text_node(doc, root);
        }

        let mut text_nodes = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if doc.is_text(node) {
                text_nodes.push(node);
                continue;
            }
            if Self::is_excluded(doc, node) {
                continue;
            }
            stack.extend(doc.children(node).iter().rev());
        }

        text_nodes
            .into_iter()
            .map(|node| self.mask_text_node(doc, node))
            .sum()
    }

    /// Mask matches inside a single text node. Returns the number of
    /// placeholders inserted; on zero the node is left untouched.
    pub fn mask_text_node(&mut self, doc: &mut Document, node: NodeId) -> usize {
        if !self.enabled {
            return 0;
        }
        let Some(matcher) = self.matcher.as_ref() else {
            return 0;
        };
        let Some(text) = doc.text(node) else {
            return 0;
        };
        if text.is_empty() {
            return 0;
        }
        match doc.parent(node) {
            Some(parent) if Self::is_excluded(doc, parent) => return 0,
            Some(_) => {}
            None => return 0,
        }

        let segments: Vec<(bool, String)> = matcher
            .segments(text)
            .into_iter()
            .map(|s| (s.is_match(), s.text().to_string()))
            .collect();
        let masked = segments.iter().filter(|(is_match, _)| *is_match).count();
        if masked == 0 {
            return 0;
        }

        let mut fragment = Vec::with_capacity(segments.len());
        for (is_match, text) in segments {
            if is_match {
                self.report(&text);
                fragment.push(Self::create_placeholder(doc, &text));
            } else {
                fragment.push(doc.create_text(&text));
            }
        }

        doc.replace_with(node, &fragment);
        trace!("masked {} match(es) in node {:?}", masked, node);
        masked
    }

    fn create_placeholder(doc: &mut Document, original: &str) -> NodeId {
        let span = doc.create_element("span");
        doc.set_attr(span, "class", MASK_CLASS);
        doc.set_attr(span, ORIGINAL_ATTR, original);
        doc.set_attr(span, "title", original);
        let label = doc.create_text(MASK_LABEL);
        doc.append_child(span, label);
        span
    }

    fn report(&mut self, text: &str) {
        if self.reported.insert(text, &self.page_url) {
            debug!("flagged {:?} on {}", text, self.page_url);
            self.flagged.push(FlaggedContent {
                text: text.to_string(),
                url: self.page_url.clone(),
                title: self.page_title.clone(),
            });
        }
    }

    // =========================================================================
    // Unmasking
    // =========================================================================

    /// Replace every placeholder in `doc` with its original text. Returns the
    /// number of placeholders removed.
    pub fn remove_all(&mut self, doc: &mut Document) -> usize {
        let placeholders: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&node| Self::is_mask(doc, node))
            .collect();

        let mut removed = 0;
        for span in placeholders {
            let original = doc.attr(span, ORIGINAL_ATTR).unwrap_or_default().to_string();
            let text = doc.create_text(&original);
            if doc.replace_with(span, &[text]) {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("restored {} masked span(s)", removed);
        }
        removed
    }
}

/// Mask plain text without a document, for callers that only need the
/// rendered result.
pub fn mask_text(matcher: &CompiledMatcher, text: &str) -> String {
    matcher
        .segments(text)
        .into_iter()
        .map(|s| match s {
            Segment::Plain(t) => t,
            Segment::Match(_) => MASK_LABEL,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordSet;

    fn engine(keywords: &[&str]) -> MaskEngine {
        let mut engine = MaskEngine::new("https://page.test/", "Page");
        engine.set_matcher(KeywordSet::normalize(keywords).compile().unwrap());
        engine.set_enabled(true);
        engine
    }

    fn mask_count(doc: &Document) -> usize {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&n| MaskEngine::is_mask(doc, n))
            .count()
    }

    #[test]
    fn test_masks_matches_and_keeps_literal_runs() {
        let mut doc = Document::from_lines("this is bad   word and spam!");
        let body = doc.body().unwrap();
        let mut engine = engine(&["bad word", "spam"]);

        assert_eq!(engine.apply_to_subtree(&mut doc, body), 2);
        assert_eq!(mask_count(&doc), 2);

        let p = doc.children(body)[0];
        let parts: Vec<String> = doc
            .children(p)
            .iter()
            .map(|&n| match doc.text(n) {
                Some(t) => t.to_string(),
                None => format!("[{}]", doc.attr(n, ORIGINAL_ATTR).unwrap()),
            })
            .collect();
        assert_eq!(parts, vec!["this is ", "[bad   word]", " and ", "[spam]", "!"]);
    }

    #[test]
    fn test_remove_all_restores_original_text() {
        let original = "spam here\nnothing\nthe cat sat on SPAM";
        let mut doc = Document::from_lines(original);
        let body = doc.body().unwrap();
        let before = doc.text_content(body);

        let mut engine = engine(&["spam", "cat"]);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 3);
        assert_ne!(doc.text_content(body), before);

        assert_eq!(engine.remove_all(&mut doc), 3);
        assert_eq!(doc.text_content(body), before);
        assert_eq!(mask_count(&doc), 0);
        assert_eq!(engine.remove_all(&mut doc), 0);
    }

    #[test]
    fn test_no_match_preserves_node_identity() {
        let mut doc = Document::from_lines("nothing to see");
        let body = doc.body().unwrap();
        let p = doc.children(body)[0];
        let text = doc.children(p)[0];
        let mut engine = engine(&["spam"]);

        let count = doc.mutation_count();
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 0);
        assert_eq!(doc.children(p), &[text]);
        assert_eq!(doc.mutation_count(), count);
    }

    #[test]
    fn test_excluded_subtrees_are_skipped() {
        let mut doc = Document::with_body();
        let body = doc.ensure_body();
        for tag in ["script", "code", "textarea"] {
            let el = doc.create_element(tag);
            let t = doc.create_text("spam");
            doc.append_child(el, t);
            doc.append_child(body, el);
        }
        let mut engine = engine(&["spam"]);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 0);
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let mut doc = Document::from_lines("spam and spam");
        let body = doc.body().unwrap();
        let mut engine = engine(&["spam"]);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 2);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 0);
        assert_eq!(mask_count(&doc), 2);
    }

    #[test]
    fn test_reports_once_per_phrase() {
        let mut doc = Document::from_lines("spam\nSpam again\nbad word");
        let body = doc.body().unwrap();
        let mut engine = engine(&["spam", "bad word"]);
        engine.apply_to_subtree(&mut doc, body);

        let flagged = engine.take_flagged();
        let texts: Vec<&str> = flagged.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["spam", "bad word"]);
        assert_eq!(flagged[0].url, "https://page.test/");
        assert_eq!(flagged[0].title, "Page");
        assert!(engine.take_flagged().is_empty());
    }

    #[test]
    fn test_disabled_engine_is_noop() {
        let mut doc = Document::from_lines("spam");
        let body = doc.body().unwrap();
        let mut engine = engine(&["spam"]);
        engine.set_enabled(false);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 0);

        engine.set_enabled(true);
        engine.set_matcher(None);
        assert_eq!(engine.apply_to_subtree(&mut doc, body), 0);
    }

    #[test]
    fn test_mask_text() {
        let matcher = KeywordSet::normalize(["spam"]).compile().unwrap().unwrap();
        assert_eq!(mask_text(&matcher, "no spam please"), "no *** please");
    }
}
