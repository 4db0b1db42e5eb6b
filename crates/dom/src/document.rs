use std::{
    collections::{BTreeMap, HashMap},
    fmt, iter, mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{NodeId, NodeKind},
    error::DomError,
    protocol::{MutationBatch, MutationRecord, NodeRef},
};
use tokio::sync::broadcast;

use crate::selector::Selector;

pub const MUTATION_CHANNEL_CAPACITY: usize = 256;
/// Every node id must fit in a `u32`.
pub const MAX_NODES: usize = u32::MAX as usize;

/// Click listener. Receives the document and the node the listener was
/// registered on (which differs from the clicked node while bubbling).
pub type ClickHandler = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Nodes are never freed: a removed node keeps its slot, its subtree and its
/// click listeners, because the host may insert it again. A long-lived page
/// therefore grows until `node_limit`, after which node creation fails with
/// [`DomError::NodeLimit`].
pub struct Document {
    nodes: Vec<Node>,
    node_limit: usize,
    root: NodeId,
    pending: Vec<MutationRecord>,
    observers: broadcast::Sender<MutationBatch>,
    click_handlers: HashMap<NodeId, Vec<ClickHandler>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("pending_records", &self.pending.len())
            .field("observers", &self.observers.receiver_count())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding only the document node.
    pub fn empty() -> Self {
        let (observers, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            node_limit: MAX_NODES,
            root: NodeId(0),
            pending: Vec::new(),
            observers,
            click_handlers: HashMap::new(),
        }
    }

    /// `<html><head></head><body></body></html>` with no pending records.
    pub fn new() -> Self {
        let mut doc = Self::empty();
        let element = |parent: NodeId, children: Vec<NodeId>, tag: &str| Node {
            parent: Some(parent),
            children,
            data: NodeData::Element {
                tag: tag.to_owned(),
                attributes: BTreeMap::new(),
            },
        };
        doc.nodes[0].children.push(NodeId(1));
        doc.nodes.push(element(NodeId(0), vec![NodeId(2), NodeId(3)], "html"));
        doc.nodes.push(element(NodeId(1), Vec::new(), "head"));
        doc.nodes.push(element(NodeId(1), Vec::new(), "body"));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_element_by_tag("body")
    }

    /// Nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Caps the arena; clamped to [`MAX_NODES`].
    pub fn set_node_limit(&mut self, limit: usize) {
        self.node_limit = limit.min(MAX_NODES);
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::UnknownNode(id))
    }

    fn element_attributes_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut BTreeMap<String, String>, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).ok().map(|node| match node.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        })
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Element)
    }

    fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            id,
            kind: self.kind(id).unwrap_or(NodeKind::Text),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(position + 1).copied()
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Proper descendants in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        iter::successors(Some(node), |current| self.parent(*current)).any(|n| n == ancestor)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_ok() && self.contains(self.root, id)
    }

    pub fn create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        self.push_node(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> Result<NodeId, DomError> {
        self.push_node(NodeData::Text(text.into()))
    }

    fn push_node(&mut self, data: NodeData) -> Result<NodeId, DomError> {
        let limit = self.node_limit;
        if self.nodes.len() >= limit {
            return Err(DomError::NodeLimit { limit });
        }
        let index = u32::try_from(self.nodes.len()).map_err(|_| DomError::NodeLimit { limit })?;
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        Ok(NodeId(index))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first)
    }

    /// Inserts `child` under `parent` before `reference` (or last when
    /// `None`). A child that already has a parent is moved, not copied.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if matches!(self.node(parent)?.data, NodeData::Text(_)) {
            return Err(DomError::NotAContainer(parent));
        }
        if matches!(self.node(child)?.data, NodeData::Document) || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let mut reference = reference;
        if let Some(reference_id) = reference {
            if self.node(reference_id)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    reference: reference_id,
                });
            }
            if reference_id == child {
                reference = self.next_sibling(child);
            }
        }

        self.detach(child);
        let index = reference.and_then(|reference_id| {
            self.children(parent)
                .iter()
                .position(|sibling| *sibling == reference_id)
        });
        self.attach(parent, child, index);
        Ok(())
    }

    /// Removes `id` from its parent. Removing a parentless node is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child.index()].parent.take() else {
            return;
        };
        self.nodes[parent.index()]
            .children
            .retain(|sibling| *sibling != child);
        if self.is_connected(parent) {
            let removed = self.node_ref(child);
            self.pending.push(MutationRecord::removed(parent, removed));
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        let children = &mut self.nodes[parent.index()].children;
        match index {
            Some(index) if index <= children.len() => children.insert(index, child),
            _ => children.push(child),
        }
        self.nodes[child.index()].parent = Some(parent);
        if self.is_connected(parent) {
            let added = self.node_ref(child);
            self.pending.push(MutationRecord::added(parent, added));
        }
    }

    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let element = self.create_element(tag)?;
        for (name, value) in attributes {
            self.set_attribute(element, name, *value)?;
        }
        self.append_child(parent, element)?;
        Ok(element)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let node = self.create_text(text)?;
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.element_attributes_mut(id)?
            .insert(name.to_ascii_lowercase(), value.into());
        Ok(())
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|candidate| candidate == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.set_class(id, class, true)
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.set_class(id, class, false)
    }

    /// Adds or removes a single class token, leaving the others in order.
    pub fn set_class(&mut self, id: NodeId, class: &str, present: bool) -> Result<(), DomError> {
        let mut tokens: Vec<String> = self.classes(id).map(str::to_owned).collect();
        let had = tokens.iter().any(|token| token == class);
        match (had, present) {
            (false, true) => tokens.push(class.to_owned()),
            (true, false) => tokens.retain(|token| token != class),
            _ => {
                // Still validate that `id` is an element.
                self.element_attributes_mut(id)?;
                return Ok(());
            }
        }
        self.set_attribute(id, "class", tokens.join(" "))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id).map(|node| &node.data) {
            Ok(NodeData::Text(text)) => text.clone(),
            Ok(_) => self
                .descendants(id)
                .filter_map(|node| match &self.nodes[node.index()].data {
                    NodeData::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            Err(_) => String::new(),
        }
    }

    /// Replaces all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        if let NodeData::Text(existing) = &mut self.node_mut(id)?.data {
            *existing = text.to_owned();
            return Ok(());
        }
        let replacement = if text.is_empty() {
            None
        } else {
            Some(self.create_text(text)?)
        };
        let children = self.children(id).to_vec();
        for child in children {
            self.detach(child);
        }
        if let Some(node) = replacement {
            self.attach(id, node, None);
        }
        Ok(())
    }

    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|node| self.attribute(*node, "id") == Some(value))
    }

    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|node| self.tag(*node).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// Elements under `scope` (excluding `scope`) matching `selector`, in
    /// document order.
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    pub fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .find(|node| selector.matches(self, *node))
    }

    /// Nearest inclusive ancestor element matching `selector`.
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        iter::once(id)
            .chain(self.ancestors(id))
            .find(|node| selector.matches(self, *node))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MutationBatch> {
        self.observers.subscribe()
    }

    pub fn pending_record_count(&self) -> usize {
        self.pending.len()
    }

    /// Drains buffered records without delivering them to observers.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        mem::take(&mut self.pending)
    }

    /// Delivers all buffered records to every observer as one batch and
    /// returns how many records were delivered.
    pub fn flush_mutations(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let records = self.take_records();
        let count = records.len();
        if self.observers.send(MutationBatch::new(records)).is_err() {
            tracing::trace!(records = count, "mutation batch dropped, no observers");
        }
        count
    }

    pub fn add_click_handler<F>(&mut self, id: NodeId, handler: F) -> Result<(), DomError>
    where
        F: Fn(&mut Document, NodeId) + Send + Sync + 'static,
    {
        self.node(id)?;
        self.click_handlers
            .entry(id)
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }

    /// Runs the click listeners on `target` and then on each ancestor.
    /// Returns how many listeners ran.
    pub fn click(&mut self, target: NodeId) -> Result<usize, DomError> {
        self.node(target)?;
        let path: Vec<(NodeId, ClickHandler)> = iter::once(target)
            .chain(self.ancestors(target))
            .flat_map(|node| {
                self.click_handlers
                    .get(&node)
                    .into_iter()
                    .flatten()
                    .map(move |handler| (node, Arc::clone(handler)))
            })
            .collect();

        let count = path.len();
        for (node, handler) in path {
            handler(&mut *self, node);
        }
        Ok(count)
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

/// A document shared between the host page and the engine. The lock is held
/// for exactly one synchronous unit of work (a handler, a scan, a host
/// mutation batch), so work never interleaves mid-way.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument(Arc<Mutex<Document>>);

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self(Arc::new(Mutex::new(document)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/document_tests.rs"]
mod tests;
