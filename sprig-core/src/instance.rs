//! View Instances
//!
//! An [`Instance`] owns one reactive data object and one render function,
//! and keeps a real subtree in sync with them:
//!
//! 1. The data object is observed.
//! 2. A [`Watcher`] renders a vnode tree from the data and patches it into
//!    the real tree, first against the mount node, later against the
//!    previous vnode tree.
//! 3. Any data the render read schedules a re-render when written.
//!
//! # Example
//!
//! ```rust,ignore
//! let runtime = Runtime::new();
//! let tree = Rc::new(RefCell::new(MemoryTree::new()));
//! let el = tree.borrow_mut().mount_point()?;
//! let data = ReactiveObject::from_entries([("count", 0)]);
//!
//! let app = Instance::mount(&runtime, tree.clone(), el, data, |cx| {
//!     cx.element("p", VNodeData::new(), [cx.text_of("count")])
//! })?;
//!
//! app.set("count", 1);
//! runtime.run_microtasks()?; // <p>1</p>
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::error::{PatchError, TreeError};
use crate::reactive::{observe_object, ReactiveObject, Runtime, Value, Watcher};
use crate::vdom::{patch, NodeId, PatchTarget, TreeBackend, VNode, VNodeData};

type RenderFn = Box<dyn Fn(&RenderContext<'_>) -> VNode>;

/// What a render function sees.
pub struct RenderContext<'a> {
    data: &'a ReactiveObject,
}

impl<'a> RenderContext<'a> {
    /// The instance's data object.
    pub fn data(&self) -> &'a ReactiveObject {
        self.data
    }

    /// Tracked read of a top-level data key; missing keys read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key).unwrap_or_default()
    }

    pub fn element<C>(&self, tag: &str, data: VNodeData, children: C) -> VNode
    where
        C: IntoIterator,
        C::Item: Into<VNode>,
    {
        VNode::element(tag, data, children)
    }

    pub fn text(&self, text: impl Into<String>) -> VNode {
        VNode::text(text)
    }

    /// Text form of a value for interpolation.
    pub fn display(&self, value: &Value) -> String {
        value.display()
    }

    /// Text vnode holding the display form of a tracked data key.
    pub fn text_of(&self, key: &str) -> VNode {
        VNode::text(self.get(key).display())
    }
}

struct InstanceInner<B> {
    tree: Rc<RefCell<B>>,
    data: ReactiveObject,
    render: RenderFn,
    vnode: RefCell<Option<VNode>>,
    el: Cell<NodeId>,
    error: RefCell<Option<PatchError>>,
}

impl<B: TreeBackend> InstanceInner<B> {
    fn render_and_patch(&self) {
        let cx = RenderContext { data: &self.data };
        let next = (self.render)(&cx);

        let result = {
            let previous = self.vnode.borrow();
            let target = match previous.as_ref() {
                Some(vnode) => PatchTarget::Virtual(vnode),
                None => PatchTarget::Real(self.el.get()),
            };
            match self.tree.try_borrow_mut() {
                Ok(mut tree) => patch(&mut *tree, target, &next),
                Err(_) => Err(TreeError::Backend("tree is already borrowed".to_string()).into()),
            }
        };

        match result {
            Ok(root) => {
                debug!(?root, "instance rendered");
                self.el.set(root);
                *self.vnode.borrow_mut() = Some(next);
            }
            Err(err) => {
                // The real subtree may hold part of the failed patch, so the
                // next render rebuilds it from `el` instead of diffing.
                error!(%err, "instance render failed; next render rebuilds");
                *self.vnode.borrow_mut() = None;
                *self.error.borrow_mut() = Some(err);
            }
        }
    }
}

/// A mounted view: data, render function and the real subtree they drive.
pub struct Instance<B: TreeBackend + 'static> {
    inner: Rc<InstanceInner<B>>,
    watcher: Watcher,
    runtime: Runtime,
}

impl<B: TreeBackend + 'static> Instance<B> {
    /// Observe `data`, render, and replace the real node `el` with the result.
    ///
    /// Fails if the first render cannot be patched in; `el` is then left in
    /// place.
    pub fn mount<F>(
        runtime: &Runtime,
        tree: Rc<RefCell<B>>,
        el: NodeId,
        data: ReactiveObject,
        render: F,
    ) -> Result<Self, PatchError>
    where
        F: Fn(&RenderContext<'_>) -> VNode + 'static,
    {
        observe_object(runtime, &data);

        let inner = Rc::new(InstanceInner {
            tree,
            data,
            render: Box::new(render),
            vnode: RefCell::new(None),
            el: Cell::new(el),
            error: RefCell::new(None),
        });

        let weak: Weak<InstanceInner<B>> = Rc::downgrade(&inner);
        let watcher = Watcher::new(runtime, move || {
            if let Some(inner) = weak.upgrade() {
                inner.render_and_patch();
            }
        });

        let instance = Self {
            inner,
            watcher,
            runtime: runtime.clone(),
        };
        if let Some(err) = instance.take_error() {
            instance.watcher.teardown();
            return Err(err);
        }
        Ok(instance)
    }

    /// Tracked read of a top-level data key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.data.get(key)
    }

    /// Write a top-level data key; readers re-render on the next flush.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner.data.set(key, value);
    }

    pub fn data(&self) -> &ReactiveObject {
        &self.inner.data
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The real root node currently rendered.
    pub fn el(&self) -> NodeId {
        self.inner.el.get()
    }

    /// Run `f` with the vnode tree from the last successful render.
    ///
    /// `None` before the first render and after a failed one.
    pub fn with_vnode<R>(&self, f: impl FnOnce(Option<&VNode>) -> R) -> R {
        f(self.inner.vnode.borrow().as_ref())
    }

    /// Number of renders attempted so far.
    pub fn render_count(&self) -> usize {
        self.watcher.run_count()
    }

    /// The error from the most recent failed render, if not taken yet.
    pub fn take_error(&self) -> Option<PatchError> {
        self.inner.error.borrow_mut().take()
    }

    /// Stop reacting to data changes. The rendered tree stays as it is.
    pub fn destroy(self) {
        self.watcher.teardown();
    }
}

impl<B: TreeBackend + 'static> std::fmt::Debug for Instance<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("el", &self.el())
            .field("data", &self.inner.data)
            .field("watcher", &self.watcher)
            .finish()
    }
}
