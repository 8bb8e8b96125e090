//! Mesh file output.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use surface::TriangleMesh;

use crate::error::OrchestratorResult;

/// Periodic OBJ export while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjSequence {
    /// Target directory, created on first write.
    pub directory: PathBuf,
    /// Ticks between exports.
    pub interval: u64,
}

impl ObjSequence {
    /// Export every `interval` ticks into `directory`.
    pub fn new(directory: impl Into<PathBuf>, interval: u64) -> Self {
        Self {
            directory: directory.into(),
            interval: interval.max(1),
        }
    }

    /// Whether tick `tick` is due for export.
    pub fn is_due(&self, tick: u64) -> bool {
        tick > 0 && tick % self.interval == 0
    }

    /// File name used for tick `tick`.
    pub fn frame_path(&self, tick: u64) -> PathBuf {
        self.directory.join(format!("sim-iter-{tick:06}.obj"))
    }
}

/// Write `mesh` to `path` as OBJ, creating parent directories.
pub fn write_mesh(path: &Path, mesh: &TriangleMesh) -> OrchestratorResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    mesh.write_obj(BufWriter::new(file))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_ticks() {
        let seq = ObjSequence::new("out", 100);
        assert!(!seq.is_due(0));
        assert!(!seq.is_due(99));
        assert!(seq.is_due(100));
        assert!(seq.is_due(300));
        assert_eq!(seq.frame_path(300), PathBuf::from("out/sim-iter-000300.obj"));
    }

    #[test]
    fn writes_obj_file() {
        let dir = std::env::temp_dir().join(format!("ferro-export-{}", std::process::id()));
        let path = dir.join("nested").join("mesh.obj");
        let mesh = TriangleMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles: vec![[0, 1, 2]],
        };
        write_mesh(&path, &mesh).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("f 1 2 3"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
