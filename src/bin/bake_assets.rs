//! Command-line asset compiler.
//!
//! Generalizes `examples/original_source/examples/entity-stress-test.cpp`'s
//! `main()`/`CmdLineOption` surface (positional file argument, `-n/--
//! num-entities`, `-h/--help`) from "load one mesh and stress-test the
//! renderer with N instances of it" into "compile every gltf scene in a
//! project and optionally smoke-test the scene graph with N placeholder
//! instances per compiled mesh". Argument parsing itself uses `clap`
//! rather than porting `ren::core::CmdLine`'s hand-rolled parser, since
//! `clap` is already how the workspace's other binaries (if any) would
//! parse arguments idiomatically.

use clap::Parser;
use std::path::PathBuf;

/// Compiles gltf scenes registered under a project's `assets/glTF`
/// directory into content-addressed mesh blobs under `content/mesh`.
#[derive(Parser, Debug)]
#[command(name = "bake-assets", version, about)]
struct Args {
    /// Project directory containing assets/glTF and content/mesh.
    project: Option<PathBuf>,

    /// Equivalent to the positional project argument, kept as a named
    /// flag for scripts that prefer `-f`/`--file` over a bare path.
    #[arg(short = 'f', long = "file", value_name = "PROJECT")]
    file: Option<PathBuf>,

    /// Compile only this one gltf file (relative to assets/glTF), instead
    /// of every registered scene.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Recompile every mesh, not only ones flagged dirty.
    #[arg(long)]
    all: bool,

    /// Instantiate this many scene nodes per compiled mesh, as a smoke
    /// test of the project's scene graph.
    #[arg(short = 'n', long = "num-entities", default_value_t = 0)]
    num_entities: u32,

    /// Environment map to record for the renderer to pick up; not used by
    /// the compiler itself.
    #[arg(long)]
    env_map: Option<PathBuf>,
}

fn discover_meta_files(gltf_dir: &std::path::Path, scene: Option<&PathBuf>) -> std::io::Result<Vec<PathBuf>> {
    if let Some(scene) = scene {
        let meta_name = format!("{}.{}", scene.display(), ren_asset::META_EXT);
        return Ok(vec![PathBuf::from(meta_name)]);
    }

    let mut out = Vec::new();
    for entry in std::fs::read_dir(gltf_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|ext| ext == ren_asset::META_EXT).unwrap_or(false) {
            if let Some(name) = path.file_name() {
                out.push(PathBuf::from(name));
            }
        }
    }
    Ok(out)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let Some(project_dir) = args.project.clone().or_else(|| args.file.clone()) else {
        eprintln!("bake-assets: a project directory is required (positional argument or -f/--file)");
        std::process::exit(1);
    };

    if let Some(env_map) = &args.env_map {
        log::info!("bake-assets: recorded environment map {}", env_map.display());
    }

    ren_job::launch_job_server();

    let mut project = ren_editor::ProjectContext::new(&project_dir);
    let gltf_dir = project.registry.gltf_dir.clone();

    let meta_files = match discover_meta_files(&gltf_dir, args.scene.as_ref()) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("bake-assets: failed to read {}: {err}", gltf_dir.display());
            ren_job::stop_job_server();
            std::process::exit(1);
        }
    };
    if meta_files.is_empty() {
        eprintln!("bake-assets: no gltf scenes found under {}", gltf_dir.display());
    }

    for meta_file in &meta_files {
        if let Err(err) = project.registry.register_gltf_scene(meta_file) {
            eprintln!("bake-assets: failed to register {}: {err}", meta_file.display());
        }
    }

    let jobs = project.registry.collect_compile_jobs(!args.all);
    println!("bake-assets: compiling {} mesh(es)", jobs.len());
    let session = ren_asset::launch_asset_compilation(jobs);
    session.wait();

    let mut failures = 0;
    let mut compiled_guids = Vec::new();
    for result in session.results() {
        match result.error {
            Some(err) => {
                failures += 1;
                eprintln!("bake-assets: {} failed: {err}", result.guid);
            }
            None => compiled_guids.push(result.guid),
        }
    }
    println!(
        "bake-assets: {} succeeded, {} failed",
        compiled_guids.len(),
        failures
    );

    if args.num_entities > 0 {
        let root = project.scene_root;
        for guid in &compiled_guids {
            for i in 0..args.num_entities {
                project.add_child_node(root, format!("{guid}#{i}"));
            }
        }
        println!(
            "bake-assets: instantiated {} scene node(s)",
            compiled_guids.len() * args.num_entities as usize
        );
    }

    ren_job::stop_job_server();
    if failures > 0 {
        std::process::exit(1);
    }
}
