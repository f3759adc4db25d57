//! Pass/resource declaration API.
//!
//! Grounded on `RenderGraphBuilder`/`RGNodeBuilder` in
//! `examples/original_source/lib/include/RenderGraph.hpp`. The original's
//! single `PassCallback` (a `CommandBuffer`-recording closure plus a
//! separately generated barrier closure) is replaced per the redesign
//! with a tagged [`PassKind`]: `Update` and `Host` passes run with no
//! device access at all, and only `Device` passes see a command recorder,
//! which collapses the barrier/pass split into one callback kind instead
//! of two.

use crate::ids::{RgBufferId, RgNodeId, RgSemaphoreId, RgTextureId};
use crate::resource::{MemoryAccess, PipelineStage, RgBufferDesc, RgTextureDesc};
use std::any::Any;
use std::collections::HashMap;

/// What a pass does and when it needs device access.
pub enum PassKind {
    /// CPU-only bookkeeping: no device access, runs every time the graph
    /// executes (e.g. advancing animation state).
    Update(Box<dyn FnMut() + Send>),
    /// Host-visible resource access (e.g. writing to a mapped upload
    /// buffer) without a command recorder.
    Host(Box<dyn FnMut(&crate::graph::RgResources) + Send>),
    /// Records device commands. `cmd` is an opaque command-encoder handle
    /// owned by whatever graphics backend the host plugs in.
    Device(Box<dyn FnMut(&mut dyn Any, &crate::graph::RgResources) + Send>),
}

#[derive(Clone, Copy)]
pub(crate) struct TextureAccess {
    pub(crate) texture: RgTextureId,
    pub(crate) accesses: MemoryAccess,
    pub(crate) stages: PipelineStage,
}

pub(crate) struct Node {
    pub(crate) reads: Vec<TextureAccess>,
    pub(crate) writes: Vec<TextureAccess>,
    pub(crate) wait_semaphores: Vec<RgSemaphoreId>,
    pub(crate) signal_semaphores: Vec<RgSemaphoreId>,
    pub(crate) callback: Option<PassKind>,
    pub(crate) desc: String,
}

impl Node {
    fn new() -> Node {
        Node {
            reads: Vec::new(),
            writes: Vec::new(),
            wait_semaphores: Vec::new(),
            signal_semaphores: Vec::new(),
            callback: None,
            desc: String::new(),
        }
    }
}

/// Builds up a graph of passes and the resources they touch, then
/// [`RenderGraphBuilder::build`] schedules it into a [`crate::RenderGraph`].
#[derive(Default)]
pub struct RenderGraphBuilder {
    pub(crate) nodes: Vec<Node>,
    pub(crate) tex_descs: HashMap<RgTextureId, RgTextureDesc>,
    pub(crate) tex_defs: HashMap<RgTextureId, RgNodeId>,
    pub(crate) tex_external: HashMap<RgTextureId, ()>,
    pub(crate) buf_descs: HashMap<RgBufferId, RgBufferDesc>,
    pub(crate) buf_defs: HashMap<RgBufferId, RgNodeId>,
    pub(crate) sem_defs: HashMap<RgSemaphoreId, RgNodeId>,
    next_tex: u32,
    next_buf: u32,
    next_sem: u32,
}

impl RenderGraphBuilder {
    pub fn new() -> RenderGraphBuilder {
        RenderGraphBuilder::default()
    }

    pub fn add_node(&mut self) -> NodeBuilder<'_> {
        self.nodes.push(Node::new());
        let node = RgNodeId(self.nodes.len() as u32 - 1);
        NodeBuilder { node, builder: self }
    }

    fn alloc_tex(&mut self) -> RgTextureId {
        let id = RgTextureId(self.next_tex);
        self.next_tex += 1;
        id
    }

    fn alloc_buf(&mut self) -> RgBufferId {
        let id = RgBufferId(self.next_buf);
        self.next_buf += 1;
        id
    }

    fn alloc_sem(&mut self) -> RgSemaphoreId {
        let id = RgSemaphoreId(self.next_sem);
        self.next_sem += 1;
        id
    }

    pub fn build(self) -> crate::graph::RenderGraph {
        crate::schedule::build_graph(self)
    }
}

/// Scoped handle returned by [`RenderGraphBuilder::add_node`] for
/// declaring one pass's resource reads/writes and callback.
pub struct NodeBuilder<'a> {
    node: RgNodeId,
    builder: &'a mut RenderGraphBuilder,
}

impl<'a> NodeBuilder<'a> {
    pub fn id(&self) -> RgNodeId {
        self.node
    }

    pub fn add_read_input(&mut self, texture: RgTextureId, accesses: MemoryAccess, stages: PipelineStage) -> &mut Self {
        self.builder.nodes[self.node.0 as usize].reads.push(TextureAccess {
            texture,
            accesses,
            stages,
        });
        self
    }

    /// Declares a read-modify-write on `texture`, returning a new id that
    /// represents the post-write version later passes must read instead.
    pub fn add_write_input(&mut self, texture: RgTextureId, accesses: MemoryAccess, stages: PipelineStage) -> RgTextureId {
        self.builder.nodes[self.node.0 as usize].reads.push(TextureAccess {
            texture,
            accesses,
            stages,
        });
        let desc = *self
            .builder
            .tex_descs
            .get(&texture)
            .unwrap_or(&RgTextureDesc::default());
        let new_id = self.builder.alloc_tex();
        self.builder.tex_descs.insert(new_id, desc);
        self.builder.tex_defs.insert(new_id, self.node);
        self.builder.nodes[self.node.0 as usize].writes.push(TextureAccess {
            texture: new_id,
            accesses,
            stages,
        });
        new_id
    }

    pub fn add_output(&mut self, desc: RgTextureDesc, accesses: MemoryAccess, stages: PipelineStage) -> RgTextureId {
        let id = self.builder.alloc_tex();
        self.builder.tex_descs.insert(id, desc);
        self.builder.tex_defs.insert(id, self.node);
        self.builder.nodes[self.node.0 as usize].writes.push(TextureAccess {
            texture: id,
            accesses,
            stages,
        });
        id
    }

    pub fn add_external_texture_output(&mut self, accesses: MemoryAccess, stages: PipelineStage) -> RgTextureId {
        let id = self.builder.alloc_tex();
        self.builder.tex_external.insert(id, ());
        self.builder.tex_defs.insert(id, self.node);
        self.builder.nodes[self.node.0 as usize].writes.push(TextureAccess {
            texture: id,
            accesses,
            stages,
        });
        id
    }

    pub fn add_buffer_output(&mut self, desc: RgBufferDesc) -> RgBufferId {
        let id = self.builder.alloc_buf();
        self.builder.buf_descs.insert(id, desc);
        self.builder.buf_defs.insert(id, self.node);
        id
    }

    pub fn add_wait_semaphore(&mut self, sem: RgSemaphoreId) -> &mut Self {
        self.builder.nodes[self.node.0 as usize].wait_semaphores.push(sem);
        self
    }

    pub fn add_signal_semaphore(&mut self) -> RgSemaphoreId {
        let id = self.builder.alloc_sem();
        self.builder.sem_defs.insert(id, self.node);
        self.builder.nodes[self.node.0 as usize].signal_semaphores.push(id);
        id
    }

    pub fn set_callback(&mut self, kind: PassKind) -> &mut Self {
        self.builder.nodes[self.node.0 as usize].callback = Some(kind);
        self
    }

    pub fn set_desc(&mut self, desc: impl Into<String>) -> &mut Self {
        self.builder.nodes[self.node.0 as usize].desc = desc.into();
        self
    }
}
