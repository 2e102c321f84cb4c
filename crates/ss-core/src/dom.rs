//! Arena document model with mutation observation
//!
//! A small stand-in for the browser DOM: element and text nodes stored in an
//! arena and addressed by [`NodeId`]. Every mutation is counted and queued as
//! a [`MutationRecord`] for each observer whose root contains the target,
//! mirroring `MutationObserver` delivery. Observers pull their batch with
//! [`Document::take_records`]; nothing is delivered re-entrantly.

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A single change, as queued for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    CharacterData {
        target: NodeId,
    },
}

/// Live observation handle returned by [`Document::observe`].
///
/// Not `Clone`: whoever holds it owns the observer and must hand it back to
/// [`Document::disconnect`].
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

#[derive(Debug)]
struct Observer {
    id: u64,
    root: NodeId,
    queue: Vec<MutationRecord>,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: Option<NodeId>,
    observers: Vec<Observer>,
    next_observer: u64,
    mutation_count: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document: an `html` root with no body yet.
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Element { tag: "html".to_string(), attrs: Vec::new() },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            body: None,
            observers: Vec::new(),
            next_observer: 1,
            mutation_count: 0,
        }
    }

    /// Document with an attached `body`.
    pub fn with_body() -> Self {
        let mut doc = Self::new();
        doc.ensure_body();
        doc
    }

    /// Document whose body holds one `p` per non-empty line of `text`.
    pub fn from_lines(text: &str) -> Self {
        let mut doc = Self::with_body();
        let body = doc.ensure_body();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let p = doc.create_element("p");
            let t = doc.create_text(line);
            doc.append_child(p, t);
            doc.append_child(body, p);
        }
        doc.mutation_count = 0;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    /// Return the body, creating it on first call.
    pub fn ensure_body(&mut self) -> NodeId {
        if let Some(body) = self.body {
            return body;
        }
        let body = self.create_element("body");
        self.append_child(self.root, body);
        self.body = Some(body);
        body
    }

    /// Total mutations applied since creation.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    // =========================================================================
    // Node creation and inspection
    // =========================================================================

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { data, parent: None, children: Vec::new() });
        id
    }

    /// Create a detached element. Tags are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element { tag: tag.to_ascii_lowercase(), attrs: Vec::new() })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Text(_))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Set an attribute. Attribute changes are not observed.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Whether `node` is attached under the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, node)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    /// Pre-order list of `root` and every node under it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
        out
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent.take()?;
        self.nodes[parent.0].children.retain(|&c| c != node);
        Some(parent)
    }

    /// Append `child` to `parent`, moving it if already attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.detach(child) {
            self.record(old_parent, MutationRecord::ChildList {
                target: old_parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record(parent, MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
    }

    /// Detach `node` from its parent. No-op for detached nodes.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.detach(node) {
            self.record(parent, MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    /// Replace `old` with `replacements` in a single child-list change.
    ///
    /// Returns `false` when `old` has no parent.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let parent = match self.nodes[old.0].parent {
            Some(parent) => parent,
            None => return false,
        };

        for &node in replacements {
            self.detach(node);
        }

        let siblings = &mut self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|&c| c == old) else {
            return false;
        };
        siblings.splice(index..=index, replacements.iter().copied());
        self.nodes[old.0].parent = None;
        for &node in replacements {
            self.nodes[node.0].parent = Some(parent);
        }

        self.record(parent, MutationRecord::ChildList {
            target: parent,
            added: replacements.to_vec(),
            removed: vec![old],
        });
        true
    }

    /// Overwrite the data of a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeData::Text(data) = &mut self.nodes[node.0].data {
            *data = text.to_string();
            self.record(node, MutationRecord::CharacterData { target: node });
        }
    }

    fn record(&mut self, target: NodeId, record: MutationRecord) {
        self.mutation_count += 1;
        if self.observers.is_empty() {
            return;
        }
        let interested: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, o)| self.is_inclusive_ancestor(o.root, target))
            .map(|(i, _)| i)
            .collect();
        for i in interested {
            self.observers[i].queue.push(record.clone());
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Observe child-list and character-data changes in the subtree of `root`.
    pub fn observe(&mut self, root: NodeId) -> Subscription {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push(Observer { id, root, queue: Vec::new() });
        Subscription { id }
    }

    /// Drop the observer and any records it has not taken yet.
    pub fn disconnect(&mut self, subscription: Subscription) {
        self.observers.retain(|o| o.id != subscription.id);
    }

    /// Take the pending batch for `subscription`.
    pub fn take_records(&mut self, subscription: &Subscription) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|o| o.id == subscription.id)
            .map(|o| std::mem::take(&mut o.queue))
            .unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize the subtree at `node` as HTML.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => push_escaped(out, text),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    push_escaped(out, value);
                    out.push('"');
                }
                out.push('>');
                for &child in &self.nodes[node.0].children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
