//! Topological batching and texture aliasing.
//!
//! Grounded on `RenderGraphBuilder::schedulePasses`/`batchPasses`/
//! `deriveTextureUsageFlags` in
//! `examples/original_source/lib/include/RenderGraph.hpp`: passes are
//! layered into synchronization-free batches by Kahn's algorithm over the
//! read/write dependency graph, and textures with non-overlapping
//! lifetimes and matching descriptors are assigned the same physical
//! slot.

use crate::builder::{Node, RenderGraphBuilder};
use crate::graph::{Batch, RenderGraph, RgPhysicalTexture, RgResources};
use crate::ids::RgTextureId;
use crate::resource::RgTextureDesc;
use std::collections::HashMap;

fn dependency_edges(builder: &RenderGraphBuilder) -> Vec<Vec<usize>> {
    let num_nodes = builder.nodes.len();
    let mut successors = vec![Vec::new(); num_nodes];

    let mut add_edge = |successors: &mut Vec<Vec<usize>>, from: usize, to: usize| {
        if from != to && !successors[from].contains(&to) {
            successors[from].push(to);
        }
    };

    for (i, node) in builder.nodes.iter().enumerate() {
        for access in node.reads.iter().chain(node.writes.iter()) {
            if let Some(producer) = builder.tex_defs.get(&access.texture) {
                add_edge(&mut successors, producer.0 as usize, i);
            }
        }
        for sem in &node.wait_semaphores {
            if let Some(producer) = builder.sem_defs.get(sem) {
                add_edge(&mut successors, producer.0 as usize, i);
            }
        }
    }
    successors
}

fn topological_batches(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let num_nodes = successors.len();
    let mut indegree = vec![0usize; num_nodes];
    for edges in successors {
        for &to in edges {
            indegree[to] += 1;
        }
    }

    let mut batches = Vec::new();
    let mut remaining = num_nodes;
    let mut done = vec![false; num_nodes];
    while remaining > 0 {
        let layer: Vec<usize> = (0..num_nodes)
            .filter(|&i| !done[i] && indegree[i] == 0)
            .collect();
        assert!(!layer.is_empty(), "ren-graph: dependency cycle in render graph");
        for &i in &layer {
            done[i] = true;
            remaining -= 1;
            for &to in &successors[i] {
                indegree[to] -= 1;
            }
        }
        batches.push(layer);
    }
    batches
}

fn last_use(builder: &RenderGraphBuilder) -> HashMap<RgTextureId, usize> {
    let mut last = HashMap::new();
    for (i, node) in builder.nodes.iter().enumerate() {
        for access in node.reads.iter().chain(node.writes.iter()) {
            let entry = last.entry(access.texture).or_insert(i);
            *entry = (*entry).max(i);
        }
    }
    last
}

struct FreeSlot {
    slot: u32,
    desc: RgTextureDesc,
    freed_after: usize,
}

fn alias_textures(builder: &RenderGraphBuilder, last_use: &HashMap<RgTextureId, usize>) -> HashMap<RgTextureId, RgPhysicalTexture> {
    let mut ids: Vec<RgTextureId> = builder
        .tex_defs
        .keys()
        .filter(|id| !builder.tex_external.contains_key(id))
        .copied()
        .collect();
    ids.sort_by_key(|id| builder.tex_defs[id].0);

    let mut slots = HashMap::new();
    let mut free: Vec<FreeSlot> = Vec::new();
    let mut next_slot = 0u32;

    for id in ids {
        let desc = builder.tex_descs[&id];
        let first_use = builder.tex_defs[&id].0 as usize;
        let reuse_index = free
            .iter()
            .position(|f| descs_compatible(&f.desc, &desc) && f.freed_after < first_use);
        let slot = if let Some(idx) = reuse_index {
            free.remove(idx).slot
        } else {
            let slot = next_slot;
            next_slot += 1;
            slot
        };
        slots.insert(id, RgPhysicalTexture(slot));
        free.push(FreeSlot {
            slot,
            desc,
            freed_after: *last_use.get(&id).unwrap_or(&first_use),
        });
    }

    for id in builder.tex_external.keys() {
        slots.insert(*id, RgPhysicalTexture(next_slot));
        next_slot += 1;
    }

    slots
}

fn descs_compatible(a: &RgTextureDesc, b: &RgTextureDesc) -> bool {
    a.ty == b.ty
        && a.format == b.format
        && a.width == b.width
        && a.height == b.height
        && a.depth_or_layers == b.depth_or_layers
        && a.levels == b.levels
}

pub(crate) fn build_graph(mut builder: RenderGraphBuilder) -> RenderGraph {
    let successors = dependency_edges(&builder);
    let layers = topological_batches(&successors);
    let last_use = last_use(&builder);
    let texture_slots = alias_textures(&builder, &last_use);

    log::debug!(
        "ren-graph: scheduled {} passes into {} batches, {} physical texture slots",
        builder.nodes.len(),
        layers.len(),
        texture_slots.values().map(|s| s.0).max().map(|m| m + 1).unwrap_or(0)
    );

    let mut nodes: Vec<Option<Node>> = builder.nodes.drain(..).map(Some).collect();
    let batches = layers
        .into_iter()
        .map(|layer| Batch {
            nodes: layer.into_iter().map(|i| nodes[i].take().unwrap()).collect(),
        })
        .collect();

    RenderGraph {
        batches,
        resources: RgResources {
            texture_slots,
            texture_descs: builder.tex_descs,
            externals: HashMap::new(),
        },
    }
}
