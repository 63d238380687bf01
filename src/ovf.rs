// src/ovf.rs
//
// OVF writers for kernel components.
// Supports OOMMF OVF 2.0 rectangular meshes with one value per cell:
//  - text data (MuMax-like)
//  - binary4 data (fast + compact)
//
// Binary4 uses little-endian floats and starts with the OVF2 check value 1234567.0f.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::kernel::{DemagKernel, AXIS_NAMES};
use crate::mesh::Mesh;
use crate::scalar_field::ScalarField3D;

#[derive(Clone, Debug, Default)]
pub struct OvfMeta {
    pub title: String,
    pub desc_lines: Vec<String>,
    pub valuelabel: String,
    pub valueunit: String,
}

impl OvfMeta {
    /// Metadata for kernel component K_ij (dimensionless).
    pub fn kernel_component(i: usize, j: usize) -> Self {
        let name = format!("K{}{}", AXIS_NAMES[i], AXIS_NAMES[j]);
        Self {
            title: name.clone(),
            desc_lines: vec![],
            valuelabel: name,
            valueunit: "1".into(),
        }
    }

    pub fn push_desc_line<S: Into<String>>(&mut self, s: S) {
        self.desc_lines.push(s.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvfFormat {
    Text,
    Binary4,
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

fn check_len(mesh: &Mesh, field: &ScalarField3D) -> std::io::Result<()> {
    if field.size != mesh.size || field.len() != mesh.n_cells() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "ScalarField3D shape mismatch: got {:?} ({} values), expected {:?}",
                field.size,
                field.len(),
                mesh.size
            ),
        ));
    }
    Ok(())
}

fn write_header<W: Write>(
    w: &mut W,
    mesh: &Mesh,
    meta: &OvfMeta,
    data_kind: &str,
) -> std::io::Result<()> {
    let [nx, ny, nz] = mesh.size;
    let [dx, dy, dz] = mesh.cell_size;

    writeln!(w, "# OOMMF OVF 2.0")?;
    writeln!(w, "# Segment count: 1")?;
    writeln!(w, "# Begin: Segment")?;
    writeln!(w, "# Begin: Header")?;
    writeln!(w, "# Title: {}", meta.title)?;
    writeln!(w, "# meshtype: rectangular")?;
    writeln!(w, "# meshunit: m")?;

    writeln!(w, "# xmin: 0")?;
    writeln!(w, "# ymin: 0")?;
    writeln!(w, "# zmin: 0")?;
    writeln!(w, "# xmax: {:.16e}", nx as f64 * dx)?;
    writeln!(w, "# ymax: {:.16e}", ny as f64 * dy)?;
    writeln!(w, "# zmax: {:.16e}", nz as f64 * dz)?;

    writeln!(w, "# valuedim: 1")?;
    writeln!(w, "# valuelabels: {}", meta.valuelabel)?;
    writeln!(w, "# valueunits: {}", meta.valueunit)?;

    for d in &meta.desc_lines {
        writeln!(w, "# Desc: {}", d)?;
    }

    writeln!(w, "# xbase: {:.16e}", 0.5 * dx)?;
    writeln!(w, "# ybase: {:.16e}", 0.5 * dy)?;
    writeln!(w, "# zbase: {:.16e}", 0.5 * dz)?;
    writeln!(w, "# xnodes: {}", nx)?;
    writeln!(w, "# ynodes: {}", ny)?;
    writeln!(w, "# znodes: {}", nz)?;
    writeln!(w, "# xstepsize: {:.16e}", dx)?;
    writeln!(w, "# ystepsize: {:.16e}", dy)?;
    writeln!(w, "# zstepsize: {:.16e}", dz)?;

    writeln!(w, "# End: Header")?;
    writeln!(w, "# Begin: Data {}", data_kind)?;
    Ok(())
}

pub fn write_component_ovf2_text(
    path: &Path,
    mesh: &Mesh,
    field: &ScalarField3D,
    meta: &OvfMeta,
) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    check_len(mesh, field)?;

    let mut w = BufWriter::new(File::create(path)?);
    write_header(&mut w, mesh, meta, "Text")?;

    // storage order is already x fastest, then y, then z
    for v in &field.data {
        writeln!(w, "{:.10e}", v)?;
    }

    writeln!(w, "# End: Data Text")?;
    writeln!(w, "# End: Segment")?;
    w.flush()?;
    Ok(())
}

pub fn write_component_ovf2_binary4(
    path: &Path,
    mesh: &Mesh,
    field: &ScalarField3D,
    meta: &OvfMeta,
) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    check_len(mesh, field)?;

    let mut f = BufWriter::new(File::create(path)?);
    write_header(&mut f, mesh, meta, "Binary 4")?;

    let check: f32 = 1234567.0;
    f.write_all(&check.to_le_bytes())?;
    for v in &field.data {
        f.write_all(&(*v as f32).to_le_bytes())?;
    }

    writeln!(f)?;
    writeln!(f, "# End: Data Binary 4")?;
    writeln!(f, "# End: Segment")?;
    writeln!(f, "# End: File")?;
    f.flush()?;
    Ok(())
}

/// Write every present component as `dir/kernel_<ij>.ovf`; returns the paths.
pub fn write_kernel_ovf(
    dir: &Path,
    kernel: &DemagKernel,
    format: OvfFormat,
) -> std::io::Result<Vec<PathBuf>> {
    create_dir_all(dir)?;
    let mut written = Vec::new();
    for ((i, j), field) in kernel.components() {
        let path = dir.join(format!("kernel_{}{}.ovf", AXIS_NAMES[i], AXIS_NAMES[j]));
        let mut meta = OvfMeta::kernel_component(i, j);
        meta.push_desc_line(format!("Demag kernel accuracy: {}", kernel.accuracy()));
        meta.push_desc_line(format!("PBC: {:?}", kernel.mesh().pbc));
        match format {
            OvfFormat::Text => write_component_ovf2_text(&path, kernel.mesh(), field, &meta)?,
            OvfFormat::Binary4 => {
                write_component_ovf2_binary4(&path, kernel.mesh(), field, &meta)?
            }
        }
        written.push(path);
    }
    Ok(written)
}
