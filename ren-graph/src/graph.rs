//! The scheduled, executable graph produced by
//! [`crate::RenderGraphBuilder::build`].
//!
//! Grounded on `RenderGraphBuilder::RenderGraph`/`RGResources` in
//! `examples/original_source/lib/include/RenderGraph.hpp`: a graph is a
//! sequence of batches (synchronization points), each batch a set of
//! passes that can run back to back without an intervening barrier, plus
//! the resolved physical textures/externals passes look up by id.

use crate::builder::{Node, PassKind};
use crate::ids::RgTextureId;
use crate::resource::RgTextureDesc;
use std::any::Any;
use std::collections::HashMap;

/// One physically backed texture slot. Several [`RgTextureId`]s with
/// disjoint lifetimes and matching descriptors may alias the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RgPhysicalTexture(pub u32);

/// Resolved resources a pass callback can look up by the id it declared
/// in the builder.
#[derive(Default)]
pub struct RgResources {
    pub(crate) texture_slots: HashMap<RgTextureId, RgPhysicalTexture>,
    pub(crate) texture_descs: HashMap<RgTextureId, RgTextureDesc>,
    pub(crate) externals: HashMap<RgTextureId, Box<dyn Any + Send>>,
}

impl RgResources {
    pub fn texture_slot(&self, id: RgTextureId) -> RgPhysicalTexture {
        *self
            .texture_slots
            .get(&id)
            .unwrap_or_else(|| panic!("ren-graph: texture {id:?} was not allocated by this graph"))
    }

    pub fn texture_desc(&self, id: RgTextureId) -> &RgTextureDesc {
        self.texture_descs
            .get(&id)
            .unwrap_or_else(|| panic!("ren-graph: texture {id:?} has no descriptor"))
    }

    /// Binds an externally owned resource (e.g. the swapchain image) to
    /// `id` before executing the graph. Must be called for every id
    /// created via `add_external_texture_output` before [`RenderGraph::execute`].
    pub fn bind_external(&mut self, id: RgTextureId, value: Box<dyn Any + Send>) {
        self.externals.insert(id, value);
    }

    pub fn external<T: 'static>(&self, id: RgTextureId) -> Option<&T> {
        self.externals.get(&id).and_then(|b| b.downcast_ref::<T>())
    }
}

pub(crate) struct Batch {
    pub(crate) nodes: Vec<Node>,
}

/// A scheduled, ready-to-run graph. Built once per frame (or whenever the
/// pass topology changes) and executed with [`RenderGraph::execute`].
pub struct RenderGraph {
    pub(crate) batches: Vec<Batch>,
    pub(crate) resources: RgResources,
}

impl RenderGraph {
    pub fn resources(&self) -> &RgResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut RgResources {
        &mut self.resources
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Runs every pass callback in schedule order. `device_cmd` is handed
    /// to every `Device` pass; `Update`/`Host` passes ignore it.
    pub fn execute(&mut self, device_cmd: &mut dyn Any) {
        for batch in &mut self.batches {
            for node in &mut batch.nodes {
                match &mut node.callback {
                    Some(PassKind::Update(f)) => f(),
                    Some(PassKind::Host(f)) => f(&self.resources),
                    Some(PassKind::Device(f)) => f(device_cmd, &self.resources),
                    None => {}
                }
            }
        }
    }
}
