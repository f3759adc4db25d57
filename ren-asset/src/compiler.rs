//! Gltf mesh baking.
//!
//! Grounded on `examples/original_source/editor/AssetCompiler.cpp`:
//! `compile_mesh` reads a primitive's accessor data out of a `.gltf` +
//! `.bin` pair (here via the `gltf` crate's accessor reader rather than
//! hand-rolled accessor byte-offset math) and bakes it to a flat binary
//! blob. `launch_asset_compilation` fans the work for every mesh in scope
//! out across the job scheduler in fixed-size batches, polling a stop
//! token between batches so a session can be cancelled early.

use crate::guid::Guid64;
use crate::meta::MetaGltf;
use bytemuck::{Pod, Zeroable};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const META_EXT: &str = "meta";

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to read meta file {0}: {1}")]
    Meta(PathBuf, #[source] crate::meta::MetaError),
    #[error("guid {0} not found in {1}")]
    GuidNotFound(Guid64, PathBuf),
    #[error("failed to import gltf {0}: {1}")]
    Gltf(PathBuf, #[source] gltf::Error),
    #[error("mesh {mesh_id}/{primitive_id} does not exist in {path}")]
    MissingPrimitive {
        path: PathBuf,
        mesh_id: u32,
        primitive_id: u32,
    },
    #[error("primitive has no POSITION accessor")]
    MissingPositions,
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),
}

const BLOB_MAGIC: u32 = 0x5245_4e4d; // "RENM"
const BLOB_VERSION: u32 = 1;

const FLAG_TANGENTS: u32 = 1 << 0;
const FLAG_UVS: u32 = 1 << 1;
const FLAG_COLORS: u32 = 1 << 2;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BlobHeader {
    magic: u32,
    version: u32,
    num_vertices: u32,
    num_indices: u32,
    flags: u32,
    _pad: u32,
}

struct MeshData {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    tangents: Vec<[f32; 4]>,
    uvs: Vec<[f32; 2]>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

fn bake_mesh_to_memory(mesh: &MeshData) -> Vec<u8> {
    let mut flags = 0u32;
    if !mesh.tangents.is_empty() {
        flags |= FLAG_TANGENTS;
    }
    if !mesh.uvs.is_empty() {
        flags |= FLAG_UVS;
    }
    if !mesh.colors.is_empty() {
        flags |= FLAG_COLORS;
    }
    let header = BlobHeader {
        magic: BLOB_MAGIC,
        version: BLOB_VERSION,
        num_vertices: mesh.positions.len() as u32,
        num_indices: mesh.indices.len() as u32,
        flags,
        _pad: 0,
    };
    let mut out = Vec::new();
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(bytemuck::cast_slice(&mesh.positions));
    out.extend_from_slice(bytemuck::cast_slice(&mesh.normals));
    if flags & FLAG_TANGENTS != 0 {
        out.extend_from_slice(bytemuck::cast_slice(&mesh.tangents));
    }
    if flags & FLAG_UVS != 0 {
        out.extend_from_slice(bytemuck::cast_slice(&mesh.uvs));
    }
    if flags & FLAG_COLORS != 0 {
        out.extend_from_slice(bytemuck::cast_slice(&mesh.colors));
    }
    out.extend_from_slice(bytemuck::cast_slice(&mesh.indices));
    out
}

/// Writes `bytes` to `path` by first writing to a sibling temp file and
/// renaming it into place, so a reader never observes a partially written
/// blob. The original left this as a TODO; this implements it.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Compiles one mesh primitive named by `guid` out of the gltf scene at
/// `gltf_path`, writing the baked blob to `blob_path`.
pub fn compile_mesh(guid: Guid64, gltf_path: &Path, blob_path: &Path) -> Result<(), CompileError> {
    let meta_path = append_extension(gltf_path, META_EXT);
    let meta = MetaGltf::load(&meta_path).map_err(|e| CompileError::Meta(meta_path.clone(), e))?;
    let meta_mesh = meta
        .find(guid)
        .ok_or_else(|| CompileError::GuidNotFound(guid, meta_path.clone()))?
        .clone();

    let (document, buffers, _images) =
        gltf::import(gltf_path).map_err(|e| CompileError::Gltf(gltf_path.to_path_buf(), e))?;

    let mesh = document
        .meshes()
        .nth(meta_mesh.mesh_id as usize)
        .ok_or_else(|| CompileError::MissingPrimitive {
            path: gltf_path.to_path_buf(),
            mesh_id: meta_mesh.mesh_id,
            primitive_id: meta_mesh.primitive_id,
        })?;
    let primitive = mesh
        .primitives()
        .nth(meta_mesh.primitive_id as usize)
        .ok_or_else(|| CompileError::MissingPrimitive {
            path: gltf_path.to_path_buf(),
            mesh_id: meta_mesh.mesh_id,
            primitive_id: meta_mesh.primitive_id,
        })?;

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(CompileError::MissingPositions)?
        .collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let tangents: Vec<[f32; 4]> = reader
        .read_tangents()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|rt| rt.into_f32().collect())
        .unwrap_or_default();
    let colors: Vec<[f32; 4]> = reader
        .read_colors(0)
        .map(|rc| rc.into_rgba_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|ri| ri.into_u32().collect())
        .unwrap_or_default();

    let blob = bake_mesh_to_memory(&MeshData {
        positions,
        normals,
        tangents,
        uvs,
        colors,
        indices,
    });

    write_atomically(blob_path, &blob).map_err(|e| CompileError::Write(blob_path.to_path_buf(), e))
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Which meshes a compilation pass should consider.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssetCompilationScope {
    /// Only meshes flagged dirty since their last compile.
    Dirty,
    /// Every registered mesh.
    All,
}

pub struct MeshCompileJobPayload {
    pub gltf_path: PathBuf,
    pub blob_path: PathBuf,
    pub guid: Guid64,
}

#[derive(Clone, Debug)]
pub struct MeshCompileJobResult {
    pub guid: Guid64,
    pub error: Option<String>,
}

/// Tracks an in-flight (or finished) batch compilation pass.
pub struct AssetCompilerSession {
    token: ren_job::JobToken,
    stop_token: Arc<AtomicBool>,
    num_finished: Arc<AtomicUsize>,
    num_jobs: usize,
    job_results: Arc<Mutex<Vec<MeshCompileJobResult>>>,
}

impl AssetCompilerSession {
    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    pub fn num_finished(&self) -> usize {
        self.num_finished.load(Ordering::Relaxed)
    }

    pub fn is_done(&self) -> bool {
        self.token.is_done()
    }

    pub fn wait(&self) {
        self.token.wait();
    }

    /// Requests the batcher stop scheduling further batches. Jobs already
    /// dispatched still run to completion.
    pub fn request_stop(&self) {
        self.stop_token.store(true, Ordering::Relaxed);
    }

    pub fn results(&self) -> Vec<MeshCompileJobResult> {
        self.job_results.lock().unwrap().clone()
    }
}

const MAX_BATCH_SIZE: usize = 64;

/// Dispatches a batcher job that compiles every payload in `job_data` in
/// batches of [`MAX_BATCH_SIZE`], waiting for each batch before starting
/// the next so the stop token is checked at predictable intervals.
pub fn launch_asset_compilation(job_data: Vec<MeshCompileJobPayload>) -> AssetCompilerSession {
    let num_jobs = job_data.len();
    let stop_token = Arc::new(AtomicBool::new(false));
    let num_finished = Arc::new(AtomicUsize::new(0));
    let job_results = Arc::new(Mutex::new(vec![
        MeshCompileJobResult {
            guid: Guid64::default(),
            error: None,
        };
        num_jobs
    ]));

    let batcher_stop_token = Arc::clone(&stop_token);
    let batcher_num_finished = Arc::clone(&num_finished);
    let batcher_results = Arc::clone(&job_results);
    let token = ren_job::dispatch(vec![ren_job::JobDesc::new(
        ren_job::JobPriority::Normal,
        move || {
            let mut base = 0;
            while base < job_data.len() {
                if batcher_stop_token.load(Ordering::Relaxed) {
                    return;
                }
                let end = (base + MAX_BATCH_SIZE).min(job_data.len());
                let batch_jobs = job_data[base..end]
                    .iter()
                    .map(|payload| {
                        let guid = payload.guid;
                        let gltf_path = payload.gltf_path.clone();
                        let blob_path = payload.blob_path.clone();
                        let stop_token = Arc::clone(&batcher_stop_token);
                        let num_finished = Arc::clone(&batcher_num_finished);
                        let results = Arc::clone(&batcher_results);
                        ren_job::JobDesc::new(ren_job::JobPriority::Normal, move || {
                            if stop_token.load(Ordering::Relaxed) {
                                return;
                            }
                            let compile_result = compile_mesh(guid, &gltf_path, &blob_path);
                            let output_index = num_finished.fetch_add(1, Ordering::Relaxed);
                            results.lock().unwrap()[output_index] = MeshCompileJobResult {
                                guid,
                                error: compile_result.err().map(|e| e.to_string()),
                            };
                        })
                    })
                    .collect();
                let batch_token = ren_job::dispatch(batch_jobs);
                batch_token.wait();
                base = end;
            }
        },
    )]);

    AssetCompilerSession {
        token,
        stop_token,
        num_finished,
        num_jobs,
        job_results,
    }
}
