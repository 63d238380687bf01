// src/cache.rs
//
// On-disk cache of real-space kernels. Building a kernel takes seconds to
// minutes for realistic meshes, while loading one takes milliseconds.
//
// File layout (little endian):
//   magic    [u8; 8]  b"DMGKERN\0"
//   version  u32
//   size     3 × u32  (padded mesh)
//   pbc      3 × u32
//   cell     3 × f64
//   accuracy f64
//   present  u8       bit k set = upper-triangular slot k stored
//   data     f64 per cell, for each present slot in slot order

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{KernelError, Result};
use crate::kernel::{brute_kernel, DemagKernel};
use crate::mesh::Mesh;
use crate::scalar_field::ScalarField3D;

const MAGIC: [u8; 8] = *b"DMGKERN\0";
const VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
struct KernelCacheHeader {
    magic: [u8; 8],
    version: u32,
    size: [u32; 3],
    pbc: [u32; 3],
    cell_size: [f64; 3],
    accuracy: f64,
    present: u8,
}

impl KernelCacheHeader {
    fn new(kernel: &DemagKernel) -> Self {
        let m = kernel.mesh();
        let mut present = 0u8;
        for slot in 0..6 {
            let (i, j) = crate::kernel::slot_pair(slot);
            if kernel.is_present(i, j) {
                present |= 1 << slot;
            }
        }
        Self {
            magic: MAGIC,
            version: VERSION,
            size: m.size.map(|n| n as u32),
            pbc: m.pbc.map(|n| n as u32),
            cell_size: m.cell_size,
            accuracy: kernel.accuracy(),
            present,
        }
    }

    /// `kmesh` is the padded mesh the caller expects.
    fn matches(&self, kmesh: &Mesh, accuracy: f64) -> bool {
        self.magic == MAGIC
            && self.version == VERSION
            && self.size == kmesh.size.map(|n| n as u32)
            && self.pbc == kmesh.pbc.map(|n| n as u32)
            && self.cell_size == kmesh.cell_size
            && self.accuracy == accuracy
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.magic)?;
        w.write_all(&self.version.to_le_bytes())?;
        for n in self.size.iter().chain(self.pbc.iter()) {
            w.write_all(&n.to_le_bytes())?;
        }
        for c in &self.cell_size {
            w.write_all(&c.to_le_bytes())?;
        }
        w.write_all(&self.accuracy.to_le_bytes())?;
        w.write_all(&[self.present])?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        let version = read_u32(r)?;
        let size = [read_u32(r)?, read_u32(r)?, read_u32(r)?];
        let pbc = [read_u32(r)?, read_u32(r)?, read_u32(r)?];
        let cell_size = [read_f64(r)?, read_f64(r)?, read_f64(r)?];
        let accuracy = read_f64(r)?;
        let mut present = [0u8; 1];
        r.read_exact(&mut present)?;
        Ok(Self {
            magic,
            version,
            size,
            pbc,
            cell_size,
            accuracy,
            present: present[0],
        })
    }
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> std::io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Cache file for `mesh` (not yet padded) at `accuracy`, inside `dir`.
pub fn kernel_cache_path(dir: &Path, mesh: &Mesh, accuracy: f64) -> PathBuf {
    let k = mesh.padded();
    let fname = format!(
        "kernel_{}x{}x{}_pbc{}-{}-{}_c{:.3e}_{:.3e}_{:.3e}_acc{:.2}.bin",
        k.size[0],
        k.size[1],
        k.size[2],
        k.pbc[0],
        k.pbc[1],
        k.pbc[2],
        k.cell_size[0],
        k.cell_size[1],
        k.cell_size[2],
        accuracy
    );
    dir.join(fname)
}

/// Write `kernel` to `path`, creating parent directories.
pub fn write_kernel(path: &Path, kernel: &DemagKernel) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    KernelCacheHeader::new(kernel).write_to(&mut w)?;
    for (_, field) in kernel.components() {
        for v in &field.data {
            w.write_all(&v.to_le_bytes())?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Load a cached kernel for `mesh` (not yet padded) at `accuracy`.
///
/// Returns `Ok(None)` when there is no file or the file was written for a
/// different mesh or accuracy.
pub fn try_load_kernel(path: &Path, mesh: &Mesh, accuracy: f64) -> Result<Option<DemagKernel>> {
    if !path.exists() {
        return Ok(None);
    }
    let kmesh = mesh.padded();
    let mut r = BufReader::new(File::open(path)?);
    let header = KernelCacheHeader::read_from(&mut r)?;
    if !header.matches(&kmesh, accuracy) {
        return Ok(None);
    }
    if header.present & !0b11_1111 != 0 {
        return Err(KernelError::CacheMismatch(format!(
            "invalid component mask {:#b} in {:?}",
            header.present, path
        )));
    }

    let mut components: [Option<ScalarField3D>; 6] = Default::default();
    for (slot, comp) in components.iter_mut().enumerate() {
        if header.present & (1 << slot) == 0 {
            continue;
        }
        let mut field = ScalarField3D::zeros(kmesh.size);
        for v in field.data.iter_mut() {
            *v = read_f64(&mut r)?;
        }
        *comp = Some(field);
    }

    Ok(Some(DemagKernel::from_components(kmesh, accuracy, components)))
}

/// Load the kernel from `dir` if cached, otherwise build it and try to cache it.
///
/// Returns the kernel and whether it came from the cache. A failed cache write
/// is logged and otherwise ignored.
pub fn load_or_build(dir: &Path, mesh: &Mesh, accuracy: f64) -> Result<(DemagKernel, bool)> {
    let path = kernel_cache_path(dir, mesh, accuracy);
    match try_load_kernel(&path, mesh, accuracy) {
        Ok(Some(kernel)) => {
            info!("[demag] cache hit -> loaded kernel from {:?}", path);
            return Ok((kernel, true));
        }
        Ok(None) => info!("[demag] cache miss -> building kernel"),
        Err(e) => warn!("[demag] unreadable cache {:?} ({}), rebuilding", path, e),
    }

    let kernel = brute_kernel(mesh, accuracy)?;
    match write_kernel(&path, &kernel) {
        Ok(()) => info!("[demag] cached kernel to {:?}", path),
        Err(e) => warn!("[demag] failed to write cache {:?}: {}", path, e),
    }
    Ok((kernel, false))
}
