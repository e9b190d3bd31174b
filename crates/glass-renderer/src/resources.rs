// ABOUTME: Bookkeeping for GPU objects owned by the render context.
// ABOUTME: Counts live objects per kind and makes every release happen at most once.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

const KIND_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Shader,
    Pipeline,
    Buffer,
    Texture,
    Sampler,
    BindGroup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; KIND_COUNT] = [
        ResourceKind::Shader,
        ResourceKind::Pipeline,
        ResourceKind::Buffer,
        ResourceKind::Texture,
        ResourceKind::Sampler,
        ResourceKind::BindGroup,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// A GPU object the ledger can account for
pub trait GpuResource {
    const KIND: ResourceKind;

    /// Free the underlying memory eagerly. Objects without an explicit
    /// destroy are freed when dropped.
    fn destroy(&self) {}
}

impl GpuResource for wgpu::ShaderModule {
    const KIND: ResourceKind = ResourceKind::Shader;
}

impl GpuResource for wgpu::RenderPipeline {
    const KIND: ResourceKind = ResourceKind::Pipeline;
}

impl GpuResource for wgpu::Buffer {
    const KIND: ResourceKind = ResourceKind::Buffer;

    fn destroy(&self) {
        wgpu::Buffer::destroy(self);
    }
}

impl GpuResource for wgpu::Texture {
    const KIND: ResourceKind = ResourceKind::Texture;

    fn destroy(&self) {
        wgpu::Texture::destroy(self);
    }
}

impl GpuResource for wgpu::Sampler {
    const KIND: ResourceKind = ResourceKind::Sampler;
}

impl GpuResource for wgpu::BindGroup {
    const KIND: ResourceKind = ResourceKind::BindGroup;
}

#[derive(Debug, Default)]
struct LedgerState {
    live: [usize; KIND_COUNT],
    /// Bumped whenever the device is lost; older handles become inert
    generation: u64,
}

/// Shared counter of live GPU objects. Cloning shares the same counts.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accounting for `resource`
    pub fn track<T: GpuResource>(&self, resource: T) -> Tracked<T> {
        let mut state = self.state.lock();
        state.live[T::KIND.index()] += 1;
        Tracked {
            resource,
            generation: state.generation,
            ledger: self.clone(),
        }
    }

    pub fn live(&self, kind: ResourceKind) -> usize {
        self.state.lock().live[kind.index()]
    }

    pub fn total_live(&self) -> usize {
        self.state.lock().live.iter().sum()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// The device is gone and every object with it. Counts drop to zero and
    /// releases of handles created before this call do nothing.
    pub fn mark_lost(&self) {
        let mut state = self.state.lock();
        let leaked: usize = state.live.iter().sum();
        state.live = [0; KIND_COUNT];
        state.generation += 1;
        tracing::debug!(objects = leaked, generation = state.generation, "Resources invalidated by device loss");
    }

    /// Returns true if the object was live and should be destroyed
    fn release(&self, kind: ResourceKind, generation: u64) -> bool {
        let mut state = self.state.lock();
        if generation != state.generation {
            tracing::trace!(?kind, "Release of a resource from a lost device ignored");
            return false;
        }
        let slot = &mut state.live[kind.index()];
        if *slot == 0 {
            tracing::trace!(?kind, "Release with no live resources ignored");
            return false;
        }
        *slot -= 1;
        true
    }
}

/// GPU object released exactly once, when dropped
pub struct Tracked<T: GpuResource> {
    resource: T,
    generation: u64,
    ledger: ResourceLedger,
}

impl<T: GpuResource> Tracked<T> {
    /// Release now rather than at end of scope
    pub fn release(self) {}

    /// Whether this handle still belongs to the current device
    pub fn is_current(&self) -> bool {
        self.generation == self.ledger.generation()
    }
}

impl<T: GpuResource> std::ops::Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T: GpuResource> Drop for Tracked<T> {
    fn drop(&mut self) {
        if self.ledger.release(T::KIND, self.generation) {
            self.resource.destroy();
        }
    }
}

impl<T: GpuResource> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("kind", &T::KIND)
            .field("generation", &self.generation)
            .finish()
    }
}
