//! Directory-based graph persistence.
//!
//! One directory holds exactly one graph. Saving wipes and repopulates the
//! directory, so a crash mid-save leaves an obviously incomplete directory
//! rather than a plausible-but-corrupt one. Two physical encodings carry the
//! same logical content: bincode records (`*.bin`) and whitespace-delimited
//! text (`*.txt`, `%.10g`-style numeric formatting).
//!
//! `nodes`, `arcs` and `targets` are always present. Masks, sample weights
//! and the node-graph matrix are written only when they differ from their
//! defaults, and are reconstructed as defaults on load. The problem type and
//! aggregation mode are never persisted; the caller supplies both.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{GraphObject, Problem};
use crate::incidence::AggregationMode;
use crate::sparse::CooMatrix;

const NODES: &str = "nodes";
const ARCS: &str = "arcs";
const TARGETS: &str = "targets";
const SET_MASK: &str = "set_mask";
const OUTPUT_MASK: &str = "output_mask";
const SAMPLE_WEIGHTS: &str = "sample_weights";
const NODE_GRAPH: &str = "node_graph";

/// Text codec options.
#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    /// Significant digits per number. The default, 10, exceeds f32 precision,
    /// so text round-trips are exact.
    pub precision: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { precision: 10 }
    }
}

/// On-disk record of a dense matrix.
#[derive(Serialize, Deserialize)]
struct MatrixRecord {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl MatrixRecord {
    fn from_array(array: &Array2<f32>) -> Self {
        Self {
            rows: array.nrows(),
            cols: array.ncols(),
            data: array.iter().copied().collect(),
        }
    }

    fn into_array(self) -> Result<Array2<f32>> {
        Array2::from_shape_vec((self.rows, self.cols), self.data)
            .map_err(|e| Error::Parse(format!("matrix record shape: {e}")))
    }
}

impl GraphObject {
    /// Save with the binary codec. The directory is wiped first.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        save(dir.as_ref(), self)
    }

    /// Save with the text codec. The directory is wiped first.
    pub fn save_txt(&self, dir: impl AsRef<Path>, opts: &TextOptions) -> Result<()> {
        save_txt(dir.as_ref(), self, opts)
    }

    /// Reconstruct a graph from a binary-codec directory.
    pub fn load(
        dir: impl AsRef<Path>,
        problem: Problem,
        aggregation: AggregationMode,
    ) -> Result<Self> {
        load(dir.as_ref(), problem, aggregation)
    }

    /// Reconstruct a graph from a text-codec directory.
    pub fn load_txt(
        dir: impl AsRef<Path>,
        problem: Problem,
        aggregation: AggregationMode,
    ) -> Result<Self> {
        load_txt(dir.as_ref(), problem, aggregation)
    }
}

pub(crate) fn load(dir: &Path, problem: Problem, aggregation: AggregationMode) -> Result<GraphObject> {
    let nodes = read_bin::<MatrixRecord>(&required(dir, NODES, "bin")?)?.into_array()?;
    let arcs = read_bin::<MatrixRecord>(&required(dir, ARCS, "bin")?)?.into_array()?;
    let targets = read_bin::<MatrixRecord>(&required(dir, TARGETS, "bin")?)?.into_array()?;

    let mut builder = GraphObject::builder(nodes, arcs, targets, problem).aggregation(aggregation);
    if let Some(path) = optional(dir, SET_MASK, "bin") {
        builder = builder.set_mask(read_bin::<Vec<bool>>(&path)?);
    }
    if let Some(path) = optional(dir, OUTPUT_MASK, "bin") {
        builder = builder.output_mask(read_bin::<Vec<bool>>(&path)?);
    }
    if let Some(path) = optional(dir, SAMPLE_WEIGHTS, "bin") {
        builder = builder.sample_weights(Array1::from(read_bin::<Vec<f32>>(&path)?));
    }
    match optional(dir, NODE_GRAPH, "bin") {
        Some(path) => {
            let stacked = read_bin::<MatrixRecord>(&path)?.into_array()?;
            builder.build_with_node_graph(unstack_node_graph(&stacked)?)
        }
        None => builder.build(),
    }
}

pub(crate) fn save(dir: &Path, g: &GraphObject) -> Result<()> {
    reset_dir(dir)?;
    write_bin(&dir.join(file(NODES, "bin")), &MatrixRecord::from_array(g.nodes()))?;
    write_bin(&dir.join(file(ARCS, "bin")), &MatrixRecord::from_array(g.arcs()))?;
    write_bin(&dir.join(file(TARGETS, "bin")), &MatrixRecord::from_array(g.targets()))?;
    if !g.set_mask().iter().all(|&m| m) {
        write_bin(&dir.join(file(SET_MASK, "bin")), &g.set_mask().to_vec())?;
    }
    if !g.output_mask().iter().all(|&m| m) {
        write_bin(&dir.join(file(OUTPUT_MASK, "bin")), &g.output_mask().to_vec())?;
    }
    if g.sample_weights().iter().any(|&w| w != 1.0) {
        write_bin(&dir.join(file(SAMPLE_WEIGHTS, "bin")), &g.sample_weights().to_vec())?;
    }
    if !g.node_graph().is_degenerate() && g.num_targets() > 1 {
        let stacked = stack_node_graph(g.node_graph());
        write_bin(&dir.join(file(NODE_GRAPH, "bin")), &MatrixRecord::from_array(&stacked))?;
    }
    Ok(())
}

fn save_txt(dir: &Path, g: &GraphObject, opts: &TextOptions) -> Result<()> {
    reset_dir(dir)?;
    write_txt_matrix(&dir.join(file(NODES, "txt")), g.nodes(), opts)?;
    write_txt_matrix(&dir.join(file(ARCS, "txt")), g.arcs(), opts)?;
    write_txt_matrix(&dir.join(file(TARGETS, "txt")), g.targets(), opts)?;
    if !g.set_mask().iter().all(|&m| m) {
        write_txt_mask(&dir.join(file(SET_MASK, "txt")), g.set_mask())?;
    }
    if !g.output_mask().iter().all(|&m| m) {
        write_txt_mask(&dir.join(file(OUTPUT_MASK, "txt")), g.output_mask())?;
    }
    if g.sample_weights().iter().any(|&w| w != 1.0) {
        write_txt_vector(&dir.join(file(SAMPLE_WEIGHTS, "txt")), g.sample_weights(), opts)?;
    }
    if !g.node_graph().is_degenerate() && g.num_targets() > 1 {
        let stacked = stack_node_graph(g.node_graph());
        write_txt_matrix(&dir.join(file(NODE_GRAPH, "txt")), &stacked, opts)?;
    }
    Ok(())
}

fn load_txt(dir: &Path, problem: Problem, aggregation: AggregationMode) -> Result<GraphObject> {
    let nodes = read_txt_matrix(&required(dir, NODES, "txt")?)?;
    let mut arcs = read_txt_matrix(&required(dir, ARCS, "txt")?)?;
    if arcs.nrows() == 0 {
        // An arcless graph writes an empty file; keep the endpoint columns.
        arcs = Array2::zeros((0, 2));
    }
    let targets = read_txt_matrix(&required(dir, TARGETS, "txt")?)?;

    let mut builder = GraphObject::builder(nodes, arcs, targets, problem).aggregation(aggregation);
    if let Some(path) = optional(dir, SET_MASK, "txt") {
        builder = builder.set_mask(read_txt_mask(&path)?);
    }
    if let Some(path) = optional(dir, OUTPUT_MASK, "txt") {
        builder = builder.output_mask(read_txt_mask(&path)?);
    }
    if let Some(path) = optional(dir, SAMPLE_WEIGHTS, "txt") {
        builder = builder.sample_weights(read_txt_vector(&path)?);
    }
    match optional(dir, NODE_GRAPH, "txt") {
        Some(path) => {
            let stacked = read_txt_matrix(&path)?;
            builder.build_with_node_graph(unstack_node_graph(&stacked)?)
        }
        None => builder.build(),
    }
}

/// Node-graph matrices persist as a stacked 3xK array:
/// row 0 = values, row 1 = row indices, row 2 = column indices.
fn stack_node_graph(ng: &CooMatrix) -> Array2<f32> {
    let k = ng.nnz();
    let mut stacked = Array2::zeros((3, k));
    for (i, (r, c, v)) in ng.entries().enumerate() {
        stacked[(0, i)] = v;
        stacked[(1, i)] = r as f32;
        stacked[(2, i)] = c as f32;
    }
    stacked
}

fn unstack_node_graph(stacked: &Array2<f32>) -> Result<CooMatrix> {
    if stacked.nrows() != 3 {
        return Err(Error::Parse(format!(
            "node-graph record has {} rows, expected 3 (values, rows, cols)",
            stacked.nrows()
        )));
    }
    let data: Vec<f32> = stacked.row(0).to_vec();
    let rows: Vec<usize> = stacked.row(1).iter().map(|&r| r as usize).collect();
    let cols: Vec<usize> = stacked.row(2).iter().map(|&c| c as usize).collect();
    // The stacked form carries no shape; every node appears as a row and
    // every sub-graph owns at least one node, so the maxima recover it.
    let shape = (
        rows.iter().max().map_or(0, |&r| r + 1),
        cols.iter().max().map_or(0, |&c| c + 1),
    );
    CooMatrix::new(shape, rows, cols, data)
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn file(stem: &str, ext: &str) -> String {
    format!("{stem}.{ext}")
}

fn required(dir: &Path, stem: &str, ext: &str) -> Result<std::path::PathBuf> {
    let path = dir.join(file(stem, ext));
    if !path.is_file() {
        return Err(Error::MissingFile(path));
    }
    Ok(path)
}

fn optional(dir: &Path, stem: &str, ext: &str) -> Option<std::path::PathBuf> {
    let path = dir.join(file(stem, ext));
    path.is_file().then_some(path)
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn write_txt_matrix(path: &Path, array: &Array2<f32>, opts: &TextOptions) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in array.rows() {
        let line: Vec<String> = row.iter().map(|&v| format_sig(v, opts.precision)).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}

fn write_txt_vector(path: &Path, vector: &Array1<f32>, opts: &TextOptions) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for &v in vector {
        writeln!(writer, "{}", format_sig(v, opts.precision))?;
    }
    Ok(())
}

fn write_txt_mask(path: &Path, mask: &[bool]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for &m in mask {
        writeln!(writer, "{}", u8::from(m))?;
    }
    Ok(())
}

fn read_txt_rows(path: &Path) -> Result<Vec<Vec<f32>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: std::result::Result<Vec<f32>, _> =
            line.split_whitespace().map(str::parse::<f32>).collect();
        rows.push(row.map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?);
    }
    Ok(rows)
}

fn read_txt_matrix(path: &Path) -> Result<Array2<f32>> {
    let rows = read_txt_rows(path)?;
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::Parse(format!("{}: ragged rows", path.display())));
    }
    Array2::from_shape_vec((rows.len(), width), rows.into_iter().flatten().collect())
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))
}

fn read_txt_vector(path: &Path) -> Result<Array1<f32>> {
    let rows = read_txt_rows(path)?;
    Ok(Array1::from(rows.into_iter().flatten().collect::<Vec<f32>>()))
}

fn read_txt_mask(path: &Path) -> Result<Vec<bool>> {
    let rows = read_txt_rows(path)?;
    Ok(rows.into_iter().flatten().map(|v| v != 0.0).collect())
}

/// `%g`-style formatting: `sig` significant digits, fixed or exponential
/// notation by magnitude, trailing zeros trimmed.
fn format_sig(v: f32, sig: usize) -> String {
    let sig = sig.max(1);
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return v.to_string();
    }
    let exp = f64::from(v.abs()).log10().floor() as i32;
    if exp < -4 || exp >= sig as i32 {
        let s = format!("{:.*e}", sig - 1, v);
        let (mantissa, exponent) = s.split_once('e').expect("exponential format");
        format!("{}e{exponent}", trim_zeros(mantissa))
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
