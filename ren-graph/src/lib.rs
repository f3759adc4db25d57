//! Tagged-callback render graph: pass/resource declaration, topological
//! scheduling into synchronization-free batches, and texture aliasing.
//!
//! Grounded on `examples/original_source/lib/include/RenderGraph.hpp`.
//! The original's `RGNode` carries one opaque `PassCallback` plus a
//! separately generated barrier callback; here a pass instead declares
//! which of three kinds it is ([`PassKind::Update`], [`PassKind::Host`],
//! [`PassKind::Device`]), so passes with no device access never see a
//! command recorder at all.

mod builder;
mod graph;
mod ids;
mod resource;
mod schedule;

pub use builder::{NodeBuilder, PassKind, RenderGraphBuilder};
pub use graph::{RenderGraph, RgPhysicalTexture, RgResources};
pub use ids::{RgBufferId, RgNodeId, RgSemaphoreId, RgTextureId};
pub use resource::{MemoryAccess, PipelineStage, RgBufferDesc, RgTextureDesc, TextureFormat, TextureType};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn independent_passes_land_in_the_same_batch() {
        let mut builder = RenderGraphBuilder::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        builder
            .add_node()
            .set_desc("a")
            .set_callback(PassKind::Update(Box::new(move || o1.lock().unwrap().push("a"))));
        let o2 = Arc::clone(&order);
        builder
            .add_node()
            .set_desc("b")
            .set_callback(PassKind::Update(Box::new(move || o2.lock().unwrap().push("b"))));

        let mut graph = builder.build();
        assert_eq!(graph.num_batches(), 1);
        graph.execute(&mut ());
        assert_eq!(order.lock().unwrap().len(), 2);
    }

    #[test]
    fn a_write_dependency_forces_separate_batches() {
        let mut builder = RenderGraphBuilder::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let mut producer = builder.add_node();
        let tex = producer.add_output(RgTextureDesc::default(), MemoryAccess::COLOR_ATTACHMENT_WRITE, PipelineStage::COLOR_ATTACHMENT_OUTPUT);
        let ran_producer = Arc::clone(&ran);
        producer.set_callback(PassKind::Update(Box::new(move || {
            assert_eq!(ran_producer.load(Ordering::SeqCst), 0);
            ran_producer.store(1, Ordering::SeqCst);
        })));

        let mut consumer = builder.add_node();
        consumer.add_read_input(tex, MemoryAccess::SHADER_READ, PipelineStage::FRAGMENT_SHADER);
        let ran_consumer = Arc::clone(&ran);
        consumer.set_callback(PassKind::Update(Box::new(move || {
            assert_eq!(ran_consumer.load(Ordering::SeqCst), 1);
            ran_consumer.store(2, Ordering::SeqCst);
        })));

        let mut graph = builder.build();
        assert_eq!(graph.num_batches(), 2);
        graph.execute(&mut ());
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_overlapping_textures_alias_the_same_slot() {
        let mut builder = RenderGraphBuilder::new();
        let desc = RgTextureDesc::default();

        let mut n0 = builder.add_node();
        let t0 = n0.add_output(desc, MemoryAccess::COLOR_ATTACHMENT_WRITE, PipelineStage::COLOR_ATTACHMENT_OUTPUT);
        n0.add_read_input(t0, MemoryAccess::SHADER_READ, PipelineStage::FRAGMENT_SHADER);

        let mut n1 = builder.add_node();
        let t1 = n1.add_output(desc, MemoryAccess::COLOR_ATTACHMENT_WRITE, PipelineStage::COLOR_ATTACHMENT_OUTPUT);
        n1.set_callback(PassKind::Update(Box::new(|| {})));

        let graph = builder.build();
        assert_eq!(graph.resources().texture_slot(t0), graph.resources().texture_slot(t1));
    }

    #[test]
    fn external_textures_get_their_own_slot_and_bound_value() {
        let mut builder = RenderGraphBuilder::new();
        let mut n0 = builder.add_node();
        let ext = n0.add_external_texture_output(MemoryAccess::COLOR_ATTACHMENT_WRITE, PipelineStage::COLOR_ATTACHMENT_OUTPUT);
        n0.set_callback(PassKind::Update(Box::new(|| {})));

        let mut graph = builder.build();
        graph.resources_mut().bind_external(ext, Box::new(7u32));
        assert_eq!(*graph.resources().external::<u32>(ext).unwrap(), 7);
    }
}
