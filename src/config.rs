use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::mesh::Mesh;

#[derive(Serialize)]
pub struct KernelRunConfig {
    pub mesh: Mesh,
    /// Mesh the kernel arrays are sized to (open axes doubled).
    pub kernel_mesh: Mesh,
    pub accuracy: f64,
    pub output: OutputConfig,
    pub run: RunInfo,
}

#[derive(Serialize)]
pub struct OutputConfig {
    pub ovf_format: String,
    pub cache_dir: Option<String>,
    pub loaded_from_cache: bool,
    pub components: Vec<String>,
    pub plots: bool,
}

#[derive(Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,
    pub build_seconds: f64,

    // Optional provenance (can be filled later)
    pub git_commit: Option<String>,
    pub timestamp_utc: Option<String>,
}

impl KernelRunConfig {
    pub fn write_to_dir(&self, out_dir: &Path) -> std::io::Result<()> {
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_serialises_meshes() {
        let mesh = Mesh::new([4, 4, 1], [1e-9, 1e-9, 2e-9]);
        let cfg = KernelRunConfig {
            mesh,
            kernel_mesh: mesh.padded(),
            accuracy: 6.0,
            output: OutputConfig {
                ovf_format: "text".into(),
                cache_dir: None,
                loaded_from_cache: false,
                components: vec!["xx".into()],
                plots: false,
            },
            run: RunInfo {
                binary: "demag_kernel".into(),
                run_id: "test".into(),
                build_seconds: 0.0,
                git_commit: None,
                timestamp_utc: None,
            },
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["kernel_mesh"]["size"], serde_json::json!([8, 8, 1]));
        assert_eq!(v["accuracy"], serde_json::json!(6.0));
    }
}
