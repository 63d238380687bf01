// src/bin/demag_kernel.rs
//
// Build (or load from cache) the demag kernel of a mesh and dump it.
//
// Run:
//   cargo run --release --bin demag_kernel -- nx=64 ny=64 nz=1 dx=5e-9 dy=5e-9 dz=1e-9
//   cargo run --release --bin demag_kernel -- mesh=mesh.json acc=8 pbcx=2 plot
//
// Output (in out/<run_id>/):
//   kernel_<ij>.ovf   one file per stored component
//   summary.csv       self terms K_ij(0) of every component
//   config.json       mesh, accuracy, provenance
//   kernel_<ii>_z0.png (with `plot`)

use std::env;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{error, info};

use demag_kernel::cache::load_or_build;
use demag_kernel::config::{KernelRunConfig, OutputConfig, RunInfo};
use demag_kernel::kernel::AXIS_NAMES;
use demag_kernel::ovf::{write_kernel_ovf, OvfFormat};
use demag_kernel::visualisation::save_kernel_slice_plot;
use demag_kernel::{brute_kernel, DemagKernel, Mesh, DEFAULT_ACCURACY};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run --release --bin demag_kernel -- [nx=N] [ny=N] [nz=N] [dx=VAL] [dy=VAL] [dz=VAL]
             [pbcx=N] [pbcy=N] [pbcz=N] [mesh=FILE.json] [acc=VAL]
             [ovf=text|binary] [cache=DIR|cache=off] [plot] [out=DIR] [run=RUN_ID]

Notes:
  - The mesh is given unpadded; open axes are doubled for the kernel.
  - mesh=FILE.json reads {{"size":[..],"cell_size":[..],"pbc":[..]}}; later
    nx=/dx=/pbcx= arguments override its entries.
  - Kernels are cached in out/kernel_cache unless cache=off.
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(mesh: &Mesh, accuracy: f64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    let ts = format!("{}{:03}", now.as_secs(), now.subsec_millis());
    format!(
        "{}_kernel_{}x{}x{}_acc{}",
        ts, mesh.size[0], mesh.size[1], mesh.size[2], accuracy
    )
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

struct Args {
    mesh: Mesh,
    accuracy: f64,
    ovf: OvfFormat,
    cache_dir: Option<PathBuf>,
    plot: bool,
    out_root: String,
    run_id: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Args, String> {
    fn num<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, String> {
        val.trim()
            .parse::<T>()
            .map_err(|_| format!("bad value for {}: '{}'", key, val))
    }

    // mesh=FILE first so that explicit sizes override it
    let mut mesh = Mesh::new([64, 64, 1], [5e-9, 5e-9, 1e-9]);
    for a in argv {
        if let Some(path) = a.strip_prefix("mesh=") {
            mesh = Mesh::from_json_file(Path::new(path)).map_err(|e| e.to_string())?;
        }
    }

    let mut args = Args {
        mesh,
        accuracy: DEFAULT_ACCURACY,
        ovf: OvfFormat::Text,
        cache_dir: Some(PathBuf::from("out").join("kernel_cache")),
        plot: false,
        out_root: "out".to_string(),
        run_id: None,
    };

    for a in argv {
        if a == "plot" {
            args.plot = true;
            continue;
        }
        let Some((key, val)) = a.split_once('=') else {
            return Err(format!("unrecognised argument '{}'", a));
        };
        match key {
            "mesh" => {}
            "nx" => args.mesh.size[0] = num(key, val)?,
            "ny" => args.mesh.size[1] = num(key, val)?,
            "nz" => args.mesh.size[2] = num(key, val)?,
            "dx" => args.mesh.cell_size[0] = num(key, val)?,
            "dy" => args.mesh.cell_size[1] = num(key, val)?,
            "dz" => args.mesh.cell_size[2] = num(key, val)?,
            "pbcx" => args.mesh.pbc[0] = num(key, val)?,
            "pbcy" => args.mesh.pbc[1] = num(key, val)?,
            "pbcz" => args.mesh.pbc[2] = num(key, val)?,
            "acc" | "accuracy" => args.accuracy = num(key, val)?,
            "ovf" => {
                args.ovf = match val {
                    "text" => OvfFormat::Text,
                    "binary" | "binary4" => OvfFormat::Binary4,
                    _ => return Err(format!("unknown ovf format '{}'", val)),
                }
            }
            "cache" => {
                args.cache_dir = match val {
                    "off" | "none" => None,
                    dir => Some(PathBuf::from(dir)),
                }
            }
            "out" => args.out_root = val.to_string(),
            "run" => args.run_id = Some(sanitize_run_id(val)),
            _ => return Err(format!("unknown key '{}'", key)),
        }
    }
    Ok(args)
}

fn write_summary(path: &Path, kernel: &DemagKernel) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "component,present,k0,min,max,finite")?;
    for i in 0..3 {
        for j in i..3 {
            let name = format!("{}{}", AXIS_NAMES[i], AXIS_NAMES[j]);
            let k0 = kernel.value(i, j, 0, 0, 0).unwrap_or(0.0);
            // absent components read as zero everywhere
            let (lo, hi, finite) = match kernel.component(i, j) {
                Some(f) => {
                    let (lo, hi) = f.finite_range().unwrap_or((f64::NAN, f64::NAN));
                    (lo, hi, f.all_finite())
                }
                None => (0.0, 0.0, true),
            };
            writeln!(
                w,
                "{},{},{:.16e},{:.16e},{:.16e},{}",
                name,
                kernel.is_present(i, j),
                k0,
                lo,
                hi,
                finite
            )?;
        }
    }
    w.flush()
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(&args.mesh, args.accuracy));
    let out_dir = unique_run_dir(&args.out_root, &run_id);
    create_dir_all(&out_dir)?;

    let t_build = Instant::now();
    let (kernel, from_cache) = match &args.cache_dir {
        Some(dir) => load_or_build(dir, &args.mesh, args.accuracy)?,
        None => (brute_kernel(&args.mesh, args.accuracy)?, false),
    };
    let build_seconds = t_build.elapsed().as_secs_f64();

    let written = write_kernel_ovf(&out_dir, &kernel, args.ovf)?;
    write_summary(&out_dir.join("summary.csv"), &kernel)?;

    if args.plot {
        for i in 0..3 {
            if let Some(field) = kernel.component(i, i) {
                let name = format!("kernel_{}{}_z0.png", AXIS_NAMES[i], AXIS_NAMES[i]);
                let path = out_dir.join(name);
                save_kernel_slice_plot(field, 0, &path)?;
                info!("[demag] wrote {}", path.display());
            }
        }
    }

    let cfg = KernelRunConfig {
        mesh: args.mesh,
        kernel_mesh: *kernel.mesh(),
        accuracy: args.accuracy,
        output: OutputConfig {
            ovf_format: match args.ovf {
                OvfFormat::Text => "text".to_string(),
                OvfFormat::Binary4 => "binary4".to_string(),
            },
            cache_dir: args.cache_dir.as_ref().map(|d| d.display().to_string()),
            loaded_from_cache: from_cache,
            components: written
                .iter()
                .filter_map(|p| p.file_name().map(|f| f.to_string_lossy().into_owned()))
                .collect(),
            plots: args.plot,
        },
        run: RunInfo {
            binary: "demag_kernel".to_string(),
            run_id,
            build_seconds,
            git_commit: None,
            timestamp_utc: None,
        },
    };
    cfg.write_to_dir(&out_dir)?;

    info!("[demag] wrote {} components to {:?}", written.len(), out_dir);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = env::args().skip(1).collect();
    if argv.iter().any(|a| a == "-h" || a == "--help" || a == "help") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[demag] {}", e);
            ExitCode::FAILURE
        }
    }
}
