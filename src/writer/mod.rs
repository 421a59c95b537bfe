//! Graph-definition serialization
//!
//! The inference engine loads one graph-definition text file plus one plain
//! numeric text file per matrix. The definition file is a sequence of
//! directive lines; each node or edge owns one line that starts with its
//! directive head and accumulates references to the matrix files computed
//! for it. Matrix files are written eagerly as the pipeline produces them;
//! the definition file itself is written once at [`finalize`].
//!
//! Filename conventions are part of the consumer's contract:
//! - `<in>-><node>-><out>_non_obs_kernel<suffix>.txt`
//! - `<out>-><node>_obs_kernel<suffix>.txt`
//! - `<source>-><target>_<label><suffix>.txt`
//!
//! [`finalize`]: GraphDefinitionWriter::finalize

use crate::core::{NodeId, Result};
use log::debug;
use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: &str = "Graph definition file for the Kernel-BP inference engine.";

/// One line of the definition file.
#[derive(Debug, Clone)]
enum Directive {
    Comment(String),
    Blank,
    Entry {
        head: String,
        artifacts: Vec<String>,
    },
}

impl Directive {
    fn serialize(&self) -> String {
        match self {
            Directive::Comment(text) => format!("# {}", text),
            Directive::Blank => String::new(),
            Directive::Entry { head, artifacts } => {
                if artifacts.is_empty() {
                    head.clone()
                } else {
                    format!("{}\t\t{}", head, artifacts.join("\t"))
                }
            }
        }
    }
}

/// Builder for the graph-definition file and its matrix files.
///
/// Matrices land in the directory containing the destination path, which is
/// created on construction if absent.
pub struct GraphDefinitionWriter {
    destination: PathBuf,
    directory: PathBuf,
    suffix: String,
    directives: Vec<Directive>,
}

impl GraphDefinitionWriter {
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self> {
        Self::with_suffix(destination, "")
    }

    /// Create a writer appending `suffix` to every matrix filename stem.
    pub fn with_suffix<P: AsRef<Path>>(destination: P, suffix: &str) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let directory = destination
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if !directory.as_os_str().is_empty() {
            fs::create_dir_all(&directory)?;
        }

        Ok(Self {
            destination,
            directory,
            suffix: suffix.to_string(),
            directives: vec![Directive::Comment(HEADER.to_string())],
        })
    }

    /// Append a comment line.
    pub fn comment(&mut self, text: &str) {
        self.directives.push(Directive::Comment(text.to_string()));
    }

    /// Append a blank separator line.
    pub fn blank(&mut self) {
        self.directives.push(Directive::Blank);
    }

    /// Start the directive line of a non-observed node.
    pub fn begin_non_observed_node(&mut self, node: NodeId) {
        self.begin(format!("non_observed_node {}", node));
    }

    /// Write a message-product kernel for the current non-observed node and
    /// reference it as an `<in> <out> <filename>` triple.
    ///
    /// # Panics
    /// Panics if no directive line has been started.
    pub fn add_non_observed_kernel(
        &mut self,
        node: NodeId,
        in_message: NodeId,
        out_message: NodeId,
        kernel: &DMatrix<f64>,
    ) -> Result<()> {
        let filename = format!(
            "{}->{}->{}_non_obs_kernel{}.txt",
            in_message, node, out_message, self.suffix
        );
        self.write_matrix(&filename, kernel)?;
        self.push_artifact(format!("{} {} {}", in_message, out_message, filename));
        Ok(())
    }

    /// Start the directive line of an observed node.
    pub fn begin_observed_node(&mut self, node: NodeId) {
        self.begin(format!("observed_node {}", node));
    }

    /// Write an observed-node kernel vector and reference it as an
    /// `<out> <filename>` pair.
    ///
    /// # Panics
    /// Panics if no directive line has been started.
    pub fn add_observed_kernel(
        &mut self,
        node: NodeId,
        out_message: NodeId,
        kernel: &DMatrix<f64>,
    ) -> Result<()> {
        let filename = format!("{}->{}_obs_kernel{}.txt", out_message, node, self.suffix);
        self.write_matrix(&filename, kernel)?;
        self.push_artifact(format!("{} {}", out_message, filename));
        Ok(())
    }

    /// Start the directive line of an edge. The consumer reads source before
    /// target, matching the `<source>-><target>` filename order.
    pub fn begin_edge(&mut self, source: NodeId, target: NodeId) {
        self.begin(format!("edge_observed_target {} {}", source, target));
    }

    /// Write an edge system matrix and reference it as a
    /// `<label> <filename>` pair.
    ///
    /// # Panics
    /// Panics if no directive line has been started.
    pub fn add_edge_matrix(
        &mut self,
        source: NodeId,
        target: NodeId,
        label: &str,
        matrix: &DMatrix<f64>,
    ) -> Result<()> {
        let filename = format!("{}->{}_{}{}.txt", source, target, label, self.suffix);
        self.write_matrix(&filename, matrix)?;
        self.push_artifact(format!("{} {}", label, filename));
        Ok(())
    }

    /// Join all directive lines and write the definition file.
    pub fn finalize(&self) -> Result<()> {
        let contents: Vec<String> = self.directives.iter().map(Directive::serialize).collect();
        let mut file = BufWriter::new(File::create(&self.destination)?);
        file.write_all(contents.join("\n").as_bytes())?;
        file.flush()?;
        debug!("wrote graph definition {}", self.destination.display());
        Ok(())
    }

    /// Directory receiving the matrix files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn begin(&mut self, head: String) {
        self.directives.push(Directive::Entry {
            head,
            artifacts: Vec::new(),
        });
    }

    fn push_artifact(&mut self, artifact: String) {
        match self.directives.last_mut() {
            Some(Directive::Entry { artifacts, .. }) => artifacts.push(artifact),
            _ => panic!("matrix added before any directive line was started"),
        }
    }

    fn write_matrix(&self, filename: &str, matrix: &DMatrix<f64>) -> Result<()> {
        let path = self.directory.join(filename);
        let mut file = BufWriter::new(File::create(&path)?);
        for i in 0..matrix.nrows() {
            let row: Vec<String> = (0..matrix.ncols())
                .map(|j| format!("{:.18e}", matrix[(i, j)]))
                .collect();
            writeln!(file, "{}", row.join(" "))?;
        }
        file.flush()?;
        debug!("wrote matrix {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn matrix_2x2() -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0])
    }

    fn read_matrix(path: &Path) -> Vec<Vec<f64>> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| {
                line.split_whitespace()
                    .map(|v| v.parse().unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_directive_file_structure() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("graph.txt");

        let mut writer = GraphDefinitionWriter::new(&destination).unwrap();
        writer.comment("non-observed nodes");
        writer.begin_non_observed_node(1);
        writer
            .add_non_observed_kernel(1, 2, 3, &matrix_2x2())
            .unwrap();
        writer.blank();
        writer.begin_observed_node(4);
        writer.add_observed_kernel(4, 2, &matrix_2x2()).unwrap();
        writer.begin_edge(2, 4);
        writer.add_edge_matrix(2, 4, "L_s", &matrix_2x2()).unwrap();
        writer.finalize().unwrap();

        let contents = fs::read_to_string(&destination).unwrap();
        let lines: Vec<&str> = contents.split('\n').collect();
        assert!(lines[0].starts_with('#'));
        assert_eq!(lines[1], "# non-observed nodes");
        assert_eq!(
            lines[2],
            "non_observed_node 1\t\t2 3 2->1->3_non_obs_kernel.txt"
        );
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "observed_node 4\t\t2 2->4_obs_kernel.txt");
        assert_eq!(
            lines[5],
            "edge_observed_target 2 4\t\tL_s 2->4_L_s.txt"
        );
    }

    #[test]
    fn test_matrix_files_written_eagerly() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("graph.txt");

        let mut writer = GraphDefinitionWriter::new(&destination).unwrap();
        assert_eq!(writer.directory(), dir.path());
        writer.begin_edge(1, 2);
        writer.add_edge_matrix(1, 2, "L_s", &matrix_2x2()).unwrap();

        // file exists before finalize
        let matrix_path = dir.path().join("1->2_L_s.txt");
        let values = read_matrix(&matrix_path);
        assert_eq!(values, vec![vec![1.0, 0.5], vec![0.5, 1.0]]);
    }

    #[test]
    fn test_suffix_is_appended_to_filenames() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("graph.txt");

        let mut writer = GraphDefinitionWriter::with_suffix(&destination, "_run2").unwrap();
        writer.begin_observed_node(7);
        writer.add_observed_kernel(7, 3, &matrix_2x2()).unwrap();

        assert!(dir.path().join("3->7_obs_kernel_run2.txt").exists());
    }

    #[test]
    fn test_creates_missing_output_directory() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("nested").join("out").join("graph.txt");

        let mut writer = GraphDefinitionWriter::new(&destination).unwrap();
        writer.begin_edge(1, 2);
        writer.add_edge_matrix(1, 2, "L_s", &matrix_2x2()).unwrap();
        writer.finalize().unwrap();

        assert!(destination.exists());
        assert!(destination.parent().unwrap().join("1->2_L_s.txt").exists());
    }

    #[test]
    fn test_column_vector_layout() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("graph.txt");

        let mut writer = GraphDefinitionWriter::new(&destination).unwrap();
        writer.begin_observed_node(4);
        let column = DMatrix::from_row_slice(3, 1, &[0.1, 0.2, 0.3]);
        writer.add_observed_kernel(4, 2, &column).unwrap();

        let values = read_matrix(&dir.path().join("2->4_obs_kernel.txt"));
        assert_eq!(values, vec![vec![0.1], vec![0.2], vec![0.3]]);
    }

    #[test]
    #[should_panic(expected = "matrix added before any directive line")]
    fn test_artifact_without_directive_panics() {
        let dir = tempdir().unwrap();
        let mut writer = GraphDefinitionWriter::new(dir.path().join("graph.txt")).unwrap();
        let _ = writer.add_edge_matrix(1, 2, "L_s", &matrix_2x2());
    }
}
