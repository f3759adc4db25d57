//! Opaque per-build resource identifiers.
//!
//! Grounded on `examples/original_source/lib/include/RenderGraph.hpp`'s
//! `RGTextureID`/`RGSyncID`/`RGNodeID` enum-class handles, which are plain
//! monotonically increasing indices minted by the builder — no generation
//! counter, since a graph is rebuilt from scratch every frame.

macro_rules! graph_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

graph_id!(RgNodeId);
graph_id!(RgTextureId);
graph_id!(RgBufferId);
graph_id!(RgSemaphoreId);
