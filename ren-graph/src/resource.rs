//! Resource descriptors and the access/stage flags passes declare against
//! them.
//!
//! Grounded on `RGTextureDesc`/`MemoryAccessFlags`/`PipelineStageFlags` in
//! `examples/original_source/lib/include/RenderGraph.hpp`. Format naming
//! follows `wgpu::TextureFormat` since no concrete graphics backend is
//! implemented here.

use bitflags::bitflags;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    Depth32Float,
    Bgra8UnormSrgb,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextureType {
    D1,
    D2,
    D3,
    Cube,
}

#[derive(Clone, Copy, Debug)]
pub struct RgTextureDesc {
    pub ty: TextureType,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub depth_or_layers: u32,
    pub levels: u32,
}

impl Default for RgTextureDesc {
    fn default() -> RgTextureDesc {
        RgTextureDesc {
            ty: TextureType::D2,
            format: TextureFormat::Rgba8Unorm,
            width: 1,
            height: 1,
            depth_or_layers: 1,
            levels: 1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RgBufferDesc {
    pub size: u64,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct MemoryAccess: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const SHADER_READ = 1 << 4;
        const SHADER_WRITE = 1 << 5;
        const COLOR_ATTACHMENT_READ = 1 << 6;
        const COLOR_ATTACHMENT_WRITE = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 9;
        const TRANSFER_READ = 1 << 10;
        const TRANSFER_WRITE = 1 << 11;
        const HOST_READ = 1 << 12;
        const HOST_WRITE = 1 << 13;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct PipelineStage: u32 {
        const DRAW_INDIRECT = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const EARLY_FRAGMENT_TESTS = 1 << 4;
        const LATE_FRAGMENT_TESTS = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const COMPUTE_SHADER = 1 << 7;
        const TRANSFER = 1 << 8;
        const HOST = 1 << 9;
    }
}

impl MemoryAccess {
    pub fn is_write(self) -> bool {
        self.intersects(
            MemoryAccess::SHADER_WRITE
                | MemoryAccess::COLOR_ATTACHMENT_WRITE
                | MemoryAccess::DEPTH_STENCIL_ATTACHMENT_WRITE
                | MemoryAccess::TRANSFER_WRITE
                | MemoryAccess::HOST_WRITE,
        )
    }
}
