//! Reading and writing character matrices.
//!
//! Inputs may be gzip-compressed; any path ending in `.gz` is decompressed on
//! the fly. Output paths ending in `.gz` are compressed, and `-` writes to
//! stdout.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use phylotree::tree::Tree;

use crate::error::{CharMatrixError, Result};
use crate::matrix::CharacterMatrix;
use crate::sequence::CharacterSequence;
use crate::taxon::TaxonNamespace;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatrixFormat {
    Fasta,
    Nexus,
}

impl MatrixFormat {
    /// Guesses the format from the file extension, ignoring a trailing `.gz`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.trim_end_matches(".gz");
        let ext = name.rsplit_once('.')?.1;
        match ext {
            "fa" | "fas" | "fasta" | "fna" | "faa" => Some(MatrixFormat::Fasta),
            "nex" | "nexus" | "nxs" => Some(MatrixFormat::Nexus),
            _ => None,
        }
    }
}

fn is_gz<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().to_string_lossy().ends_with(".gz")
}

fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let p = path.as_ref();
    if !is_gz(p) {
        return Ok(fs::read_to_string(p)?);
    }
    let mut content = String::new();
    MultiGzDecoder::new(BufReader::new(File::open(p)?)).read_to_string(&mut content)?;
    Ok(content)
}

/// Run `body` against a buffered writer for `path`, finishing the gzip stream
/// explicitly so trailer write errors are reported.
fn with_writer<P, F>(path: P, body: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        let mut out = BufWriter::new(io::stdout());
        body(&mut out)?;
        out.flush()?;
        return Ok(());
    }
    let f = BufWriter::new(File::create(p)?);
    if is_gz(p) {
        let mut enc = GzEncoder::new(f, Compression::default());
        body(&mut enc)?;
        enc.finish()?.flush()?;
    } else {
        let mut out = f;
        body(&mut out)?;
        out.flush()?;
    }
    Ok(())
}

/// Read a character matrix, choosing the parser from `format`.
///
/// With `taxon_namespace` set, every record must name a taxon already in it;
/// otherwise taxa are registered into a fresh namespace in file order.
pub fn read_matrix<P: AsRef<Path>>(
    path: P,
    format: MatrixFormat,
    taxon_namespace: Option<&TaxonNamespace>,
) -> Result<CharacterMatrix> {
    let content = read_to_string(path.as_ref())?;
    let matrix = match format {
        MatrixFormat::Fasta => parse_fasta_matrix(&content, taxon_namespace)?,
        MatrixFormat::Nexus => parse_nexus_matrix(&content, taxon_namespace)?,
    };
    info!(
        "Read {} sequences from {}",
        matrix.len(),
        path.as_ref().display()
    );
    Ok(matrix)
}

/// Resolves a record label to a matrix entry, enforcing the bound namespace
/// when there is one.
fn add_record(
    matrix: &mut CharacterMatrix,
    bound: bool,
    label: &str,
    seq: CharacterSequence,
    line: usize,
) -> Result<()> {
    let taxon = if bound {
        matrix
            .taxon_namespace()
            .get_by_label(label)
            .ok_or_else(|| CharMatrixError::NotInNamespace(label.to_owned()))?
    } else {
        matrix.taxon_namespace().require_taxon(label)
    };
    if matrix.contains(&taxon)? {
        return Err(CharMatrixError::parse(line, format!("duplicate sequence for taxon '{label}'")));
    }
    matrix.set(&taxon, seq)
}

fn new_matrix(taxon_namespace: Option<&TaxonNamespace>) -> CharacterMatrix {
    match taxon_namespace {
        Some(ns) => CharacterMatrix::with_taxon_namespace(ns.clone()),
        None => CharacterMatrix::new(),
    }
}

/// Parse FASTA records into a matrix of symbol sequences.
///
/// The record name is the header up to the first whitespace; sequence lines
/// are concatenated with whitespace removed.
pub fn parse_fasta_matrix(content: &str, taxon_namespace: Option<&TaxonNamespace>) -> Result<CharacterMatrix> {
    let mut matrix = new_matrix(taxon_namespace);
    let bound = taxon_namespace.is_some();

    // (label, header line, sequence)
    let mut current: Option<(String, usize, String)> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some((label, at, seq)) = current.take() {
                add_record(&mut matrix, bound, &label, seq.as_str().into(), at)?;
            }
            let label = header
                .split_whitespace()
                .next()
                .ok_or_else(|| CharMatrixError::parse(line_no, "empty FASTA header"))?;
            current = Some((label.to_owned(), line_no, String::new()));
        } else {
            let (_, _, seq) = current
                .as_mut()
                .ok_or_else(|| CharMatrixError::parse(line_no, "sequence data before first FASTA header"))?;
            seq.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }
    if let Some((label, at, seq)) = current {
        add_record(&mut matrix, bound, &label, seq.as_str().into(), at)?;
    }

    debug!("Parsed {} FASTA records", matrix.len());
    Ok(matrix)
}

/// Parse the MATRIX command of a NEXUS CHARACTERS or DATA block.
///
/// Each row is a (possibly quoted) taxon label followed by its states.
/// Interleaved files are supported: a label seen again has its states
/// appended to the earlier row.
pub fn parse_nexus_matrix(content: &str, taxon_namespace: Option<&TaxonNamespace>) -> Result<CharacterMatrix> {
    let rows = collect_matrix_rows(content)?;
    let mut matrix = new_matrix(taxon_namespace);
    let bound = taxon_namespace.is_some();

    // Interleaved blocks repeat labels; merge before touching the matrix.
    let mut merged: Vec<(String, usize, String)> = Vec::new();
    for row in rows {
        match merged.iter_mut().find(|(label, _, _)| *label == row.label) {
            Some((_, _, seq)) => seq.push_str(&row.states),
            None => merged.push((row.label, row.line, row.states)),
        }
    }
    for (label, line, seq) in merged {
        add_record(&mut matrix, bound, &label, seq.as_str().into(), line)?;
    }

    debug!("Parsed {} NEXUS matrix rows", matrix.len());
    Ok(matrix)
}

struct MatrixRow {
    label: String,
    line: usize,
    states: String,
}

fn collect_matrix_rows(content: &str) -> Result<Vec<MatrixRow>> {
    let mut lines = content
        .lines()
        .enumerate()
        .skip_while(|(_, line)| !line.trim().to_ascii_uppercase().starts_with("MATRIX"));

    if lines.next().is_none() {
        return Err(CharMatrixError::parse(0, "no MATRIX command found"));
    }

    let mut rows = Vec::new();
    let mut comment_depth = 0usize;
    for (idx, line) in lines {
        let line_no = idx + 1;
        let line = strip_nexus_comments(line, &mut comment_depth);
        let mut line = line.trim();
        let terminated = line.ends_with(';');
        if terminated {
            line = line.trim_end_matches(';').trim();
        }
        if !line.is_empty() {
            let (label, rest) = split_label(line)
                .ok_or_else(|| CharMatrixError::parse(line_no, "unterminated quoted taxon label"))?;
            let states: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
            rows.push(MatrixRow { label, line: line_no, states });
        }
        if terminated {
            return Ok(rows);
        }
    }
    Err(CharMatrixError::parse(content.lines().count(), "MATRIX command is not terminated by ';'"))
}

/// Drop `[...]` comments. `depth` carries over between lines so a comment
/// may span several rows.
fn strip_nexus_comments(line: &str, depth: &mut usize) -> String {
    let mut result = String::with_capacity(line.len());
    for ch in line.chars() {
        match ch {
            '[' => *depth += 1,
            ']' if *depth > 0 => *depth -= 1,
            _ if *depth == 0 => result.push(ch),
            _ => {}
        }
    }
    result
}

/// Split a matrix row into its label and the remainder.
///
/// Inside quotes a doubled `''` stands for one apostrophe. Unquoted labels
/// are taken verbatim, underscores included, so they match FASTA and Newick
/// labels for the same taxon.
///
/// STRUCTURE:
/// 'Homo sapiens'  ACGT-
/// 'O''Brien'      ACGTA
/// Pan_paniscus    ACGTT
fn split_label(line: &str) -> Option<(String, &str)> {
    if let Some(quoted) = line.strip_prefix('\'') {
        let mut label = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch != '\'' {
                label.push(ch);
            } else if matches!(chars.peek(), Some((_, '\''))) {
                label.push('\'');
                chars.next();
            } else {
                return Some((label, &quoted[i + 1..]));
            }
        }
        return None;
    }
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    Some((line[..end].to_string(), &line[end..]))
}

/// Write the matrix as FASTA, wrapping sequence lines at `line_width` states
/// (0 disables wrapping).
///
/// # Errors
/// `NonSymbolicSequence` if any sequence holds integer codes or multi-character
/// tokens, which FASTA cannot represent. Nothing is written in that case.
pub fn write_fasta<P: AsRef<Path>>(path: P, matrix: &CharacterMatrix, line_width: usize) -> Result<()> {
    if let Some((taxon, _)) = matrix.iter().find(|(_, seq)| !seq.is_symbolic()) {
        return Err(CharMatrixError::NonSymbolicSequence(taxon.label().to_owned()));
    }
    with_writer(path, |out| {
        for (taxon, seq) in matrix {
            writeln!(out, ">{}", taxon.label())?;
            let text = seq.to_string();
            if line_width == 0 {
                writeln!(out, "{text}")?;
                continue;
            }
            let chars: Vec<char> = text.chars().collect();
            for chunk in chars.chunks(line_width) {
                writeln!(out, "{}", chunk.iter().collect::<String>())?;
            }
        }
        Ok(())
    })
}

/// Write a labeled square matrix as TSV to a file or stdout.
/// If `path` ends with `.gz`, the output is gzip-compressed.
pub fn write_matrix_tsv<P: AsRef<Path>, T: std::fmt::Display>(
    path: P,
    names: &[String],
    mat: &[Vec<T>],
) -> Result<()> {
    with_writer(path, |out| {
        // Header row
        write!(out, "\t")?;
        for (k, name) in names.iter().enumerate() {
            if k > 0 { write!(out, "\t")?; }
            write!(out, "{}", name)?;
        }
        writeln!(out)?;

        // Rows
        for (i, row) in mat.iter().enumerate() {
            write!(out, "{}", names[i])?;
            for val in row {
                write!(out, "\t{}", val)?;
            }
            writeln!(out)?;
        }
        Ok(())
    })
}

/// Strip BEAST annotations from Newick strings.
///
/// BEAST format includes annotations like :[&rate=0.123]2.45 where 2.45 is the actual branch length.
/// This function removes the [&...] annotations while preserving the branch lengths.
fn strip_beast_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }

    result
}

/// Build a taxon namespace from the leaves of the first tree in a Newick file.
pub fn read_newick_namespace<P: AsRef<Path>>(path: P) -> Result<TaxonNamespace> {
    let content = read_to_string(path.as_ref())?;
    let newick = content
        .split_inclusive(';')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| CharMatrixError::Tree(format!("no tree in {}", path.as_ref().display())))?;

    let tree = Tree::from_newick(&strip_beast_annotations(newick))
        .map_err(|e| CharMatrixError::Tree(e.to_string()))?;
    let ns = TaxonNamespace::from_tree(&tree)?;
    debug!("Read {} taxa from {}", ns.len(), path.as_ref().display());
    Ok(ns)
}

/// Read a list of taxon labels, one per line, skipping blanks and `#` comments.
pub fn read_taxon_labels<R: BufRead>(reader: R) -> Result<TaxonNamespace> {
    let ns = TaxonNamespace::new();
    for line in reader.lines() {
        let line = line?;
        let label = line.trim();
        if label.is_empty() || label.starts_with('#') {
            continue;
        }
        ns.require_taxon(label);
    }
    Ok(ns)
}
