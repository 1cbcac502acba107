//! Contract with the rendering collaborator.
//!
//! The core only describes element trees and asks a [`Renderer`] to put them
//! on a mount point. Turning a tree into a real surface is the renderer's job.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::rc::{Rc, Weak};

/// Identifier of an existing surface a tree is rendered into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountPoint(String);

impl MountPoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MountPoint {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Description of one element: tag, attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Node::Element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements with the given tag, in order.
    pub fn find_children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(element) if element.tag == tag => Some(element),
            _ => None,
        })
    }

    /// Concatenated text of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

/// Compact markup, e.g. `<div id="parent"><h1>Hi</h1></div>`.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, escape(value))?;
        }
        f.write_char('>')?;
        for node in &self.children {
            match node {
                Node::Element(child) => write!(f, "{child}")?,
                Node::Text(text) => f.write_str(&escape(text))?,
            }
        }
        write!(f, "</{}>", self.tag)
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// The external rendering collaborator.
pub trait Renderer {
    fn render(&mut self, tree: &Element, mount: &MountPoint) -> anyhow::Result<()>;
}

/// Keeps the last markup rendered into each mount point.
///
/// Used by the demo binary and tests; it does no diffing.
#[derive(Debug, Default)]
pub struct MarkupRenderer {
    surfaces: HashMap<MountPoint, String>,
    renders: usize,
}

impl MarkupRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self, mount: &MountPoint) -> Option<&str> {
        self.surfaces.get(mount).map(String::as_str)
    }

    /// Total number of render calls received.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Renderer for MarkupRenderer {
    fn render(&mut self, tree: &Element, mount: &MountPoint) -> anyhow::Result<()> {
        self.surfaces.insert(mount.clone(), tree.to_string());
        self.renders += 1;
        Ok(())
    }
}

/// A target whose tree the renderer refused.
#[derive(Debug)]
pub struct RenderFailure {
    pub mount: MountPoint,
    pub error: anyhow::Error,
}

/// Failures of one [`RenderQueue::flush`]. Every other pending target was
/// still rendered.
#[derive(Debug)]
pub struct RenderError {
    pub rendered: usize,
    pub failures: Vec<RenderFailure>,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} view(s) failed to render ({} rendered)",
            self.failures.len(),
            self.rendered
        )?;
        for failure in &self.failures {
            write!(f, "; {}: {:#}", failure.mount, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures.first().map(|failure| {
            let source: &(dyn std::error::Error + 'static) = &*failure.error;
            source
        })
    }
}

/// Something the render queue can draw later.
pub trait Renderable {
    fn mount_point(&self) -> MountPoint;

    /// Current tree, or `None` once the target has been torn down.
    fn render_tree(&self) -> Option<Element>;
}

/// Pending re-renders, drained after the current synchronous work is done.
///
/// Scheduling the same target twice before a flush renders it once.
#[derive(Clone, Default)]
pub struct RenderQueue {
    pending: Rc<RefCell<Vec<Weak<dyn Renderable>>>>,
}

impl fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, target: Weak<dyn Renderable>) {
        let mut pending = self.pending.borrow_mut();
        if !pending.iter().any(|queued| Weak::ptr_eq(queued, &target)) {
            pending.push(target);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Render every pending target that is still alive. Targets scheduled
    /// while flushing wait for the next flush.
    ///
    /// Returns the number of trees `renderer` accepted. A failing target
    /// doesn't stop the rest of the batch; all failures come back together
    /// in a [`RenderError`].
    pub fn flush(&self, renderer: &mut dyn Renderer) -> Result<usize, RenderError> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut rendered = 0;
        let mut failures = Vec::new();

        for target in pending {
            let Some(target) = target.upgrade() else {
                continue;
            };
            let Some(tree) = target.render_tree() else {
                continue;
            };
            let mount = target.mount_point();
            match renderer.render(&tree, &mount) {
                Ok(()) => {
                    tracing::trace!(mount = %mount, "Rendered view");
                    rendered += 1;
                }
                Err(error) => {
                    tracing::error!(mount = %mount, error = %error, "Render failed");
                    failures.push(RenderFailure { mount, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(rendered)
        } else {
            Err(RenderError { rendered, failures })
        }
    }
}
