//! GPU resource handles and deferred release

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! gpu_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw id; the all-bits-set value is reserved and rejected
            pub fn from_raw(raw: u32) -> Option<Self> {
                (raw != u32::MAX).then_some(Self(raw))
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

gpu_id!(
    /// Vertex array object: a vertex buffer, an optional index buffer and
    /// the attribute layout describing them
    VertexArrayId
);
gpu_id!(
    /// Vertex or index buffer
    BufferId
);
gpu_id!(
    /// 2D texture image
    TextureId
);
gpu_id!(
    /// Shader program
    ShaderId
);

impl ShaderId {
    /// Id of a program every backend provides, see [`crate::ShaderSet`]
    pub(crate) const fn builtin(index: u32) -> Self {
        Self(index)
    }
}

/// Identity of one rendering context.
///
/// Handles are only meaningful inside the context that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// A fresh id, distinct from every id handed out before
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Any resource a context can delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResource {
    VertexArray(VertexArrayId),
    Buffer(BufferId),
    Texture(TextureId),
}

/// Resources waiting to be deleted by their context.
///
/// Scene objects cannot reach the context from `Drop`, so they push their
/// handles here and the context deletes them on its next
/// [`collect_released`](crate::RenderContext::collect_released).
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue(Rc<RefCell<Vec<GpuResource>>>);

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, resource: GpuResource) {
        self.0.borrow_mut().push(resource);
    }

    /// Take every pending resource
    pub fn drain(&self) -> Vec<GpuResource> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// The context a set of handles belongs to
#[derive(Debug, Clone)]
pub struct ResourceOwner {
    pub context: ContextId,
    queue: ReleaseQueue,
}

impl ResourceOwner {
    pub fn of<C: crate::RenderContext + ?Sized>(ctx: &C) -> Self {
        Self {
            context: ctx.context_id(),
            queue: ctx.release_queue().clone(),
        }
    }

    /// Delete `resources` now when `ctx` owns them, otherwise hand them to
    /// the owning context's queue
    pub fn release<C, I>(&self, ctx: &mut C, resources: I)
    where
        C: crate::RenderContext + ?Sized,
        I: IntoIterator<Item = GpuResource>,
    {
        if ctx.context_id() == self.context {
            for resource in resources {
                ctx.release(resource);
            }
        } else {
            self.defer(resources);
        }
    }

    /// Queue `resources` for deletion by the owning context
    pub fn defer<I: IntoIterator<Item = GpuResource>>(&self, resources: I) {
        for resource in resources {
            self.queue.push(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_raw_id_is_rejected() {
        assert!(BufferId::from_raw(u32::MAX).is_none());
        assert_eq!(BufferId::from_raw(7).map(BufferId::raw), Some(7));
        assert!(TextureId::from_raw(0).is_some());
    }

    #[test]
    fn test_context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_release_queue_drains_once() {
        let queue = ReleaseQueue::new();
        let shared = queue.clone();
        shared.push(GpuResource::Buffer(BufferId(3)));
        shared.push(GpuResource::Texture(TextureId(1)));

        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert!(shared.drain().is_empty());
    }
}
