//! Concat demuxer manifest (`file '<path>'` per line).

use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Ordered list of files for ffmpeg's concat demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self { entries }
    }

    /// Renders the manifest, one line per entry, newline terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&manifest_line(entry));
            out.push('\n');
        }
        out
    }

    /// Writes the rendered manifest to `path`.
    pub async fn write_to(&self, path: &Path) -> Result<(), MergeError> {
        tokio::fs::write(path, self.render())
            .await
            .map_err(|e| MergeError::io(format!("writing manifest {}", path.display()), e))
    }
}

/// Formats a single manifest line.
///
/// Backslashes become forward slashes and single quotes are closed,
/// escaped and reopened (`'\''`), which is how the concat demuxer reads
/// quoted strings.
pub fn manifest_line(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    format!("file '{}'", normalized.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_three_inputs() {
        let manifest = Manifest::new(vec![
            PathBuf::from("/tmp/ws/a.mp4"),
            PathBuf::from("/tmp/ws/b.mp4"),
            PathBuf::from("/tmp/ws/c.mp4"),
        ]);

        let rendered = manifest.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "file '/tmp/ws/a.mp4'",
                "file '/tmp/ws/b.mp4'",
                "file '/tmp/ws/c.mp4'",
            ]
        );
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn test_render_preserves_given_order() {
        let manifest = Manifest::new(vec![
            PathBuf::from("/w/c.mp4"),
            PathBuf::from("/w/a.mp4"),
            PathBuf::from("/w/b.mp4"),
        ]);
        let rendered = manifest.render();
        let order: Vec<&str> = rendered.lines().collect();
        assert_eq!(order[0], "file '/w/c.mp4'");
        assert_eq!(order[2], "file '/w/b.mp4'");
    }

    #[test]
    fn test_backslashes_become_forward_slashes() {
        let line = manifest_line(Path::new(r"C:\Temp\ws\a.mp4"));
        assert_eq!(line, "file 'C:/Temp/ws/a.mp4'");
    }

    #[test]
    fn test_single_quotes_are_escaped() {
        let line = manifest_line(Path::new("/ws/it's here.mp4"));
        assert_eq!(line, r"file '/ws/it'\''s here.mp4'");
    }

    #[test]
    fn test_shell_metacharacters_pass_through_verbatim() {
        let line = manifest_line(Path::new("/ws/$(rm -rf ~);`x`.mp4"));
        assert_eq!(line, "file '/ws/$(rm -rf ~);`x`.mp4'");
    }

    #[test]
    fn test_empty_manifest_renders_nothing() {
        let manifest = Manifest::new(Vec::new());
        assert_eq!(manifest.render(), "");
    }

    #[tokio::test]
    async fn test_write_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filelist.txt");
        let manifest = Manifest::new(vec![PathBuf::from("/ws/a.mp4")]);

        manifest.write_to(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "file '/ws/a.mp4'\n");
    }
}
