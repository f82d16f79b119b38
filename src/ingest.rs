//! Graph ingestion (C12): edge lists, DIMACS challenge 9 arc lists, and
//! gzip-wrapped variants of either, including SNAP exports whose first four
//! lines are a header banner rather than data.
//!
//! Parsing failures are an [`IngestError`], never the core engines'
//! [`crate::error::Error`] — by the time a [`Graph`] reaches an engine it has
//! already been validated here.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::IngestError;
use crate::graph::Graph;

type Result<T> = std::result::Result<T, IngestError>;

/// Which textual convention a graph file follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// `u v` (unit weight) or `u v w` per line.
    EdgeList,
    /// Like [`Format::EdgeList`], but the first four lines are a SNAP-style
    /// header banner and are skipped rather than parsed.
    SnapEdgeList,
    /// DIMACS challenge 9: `c` comment, `p` problem-line, `a u v w` arc.
    Dimacs,
}

/// Loads a graph from `path`, transparently gzip-decompressing if the
/// filename ends in `.gz`.
pub fn load_graph_file(path: &Path, format: Format) -> Result<Graph> {
    let file = File::open(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        load_graph(GzDecoder::new(file), format)
    } else {
        load_graph(file, format)
    }
}

/// Loads a graph from any reader already producing the chosen plaintext
/// format (the caller is responsible for any decompression).
pub fn load_graph<R: Read>(reader: R, format: Format) -> Result<Graph> {
    let lines = BufReader::new(reader).lines();
    match format {
        Format::EdgeList => parse_edge_list(lines, 0),
        Format::SnapEdgeList => parse_edge_list(lines, 4),
        Format::Dimacs => parse_dimacs(lines),
    }
}

fn parse_edge_list<I>(lines: I, skip: usize) -> Result<Graph>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut graph = Graph::new();
    for (lineno, line) in lines.enumerate().skip(skip) {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (u, v, w) = match fields.as_slice() {
            [u, v] => (*u, *v, "1"),
            [u, v, w] => (*u, *v, *w),
            _ => {
                return Err(IngestError::Parse {
                    line: lineno + 1,
                    reason: format!("expected 'u v' or 'u v w', got {:?}", line),
                })
            }
        };
        graph.add_edge(parse_vertex(u, lineno + 1)?, parse_vertex(v, lineno + 1)?, parse_weight(w, lineno + 1)?);
    }
    Ok(graph)
}

fn parse_dimacs<I>(lines: I) -> Result<Graph>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut graph = Graph::new();
    for (lineno, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("c") | Some("p") => continue,
            Some("a") => {
                let u = fields.next().ok_or_else(|| parse_err(lineno, "missing arc tail"))?;
                let v = fields.next().ok_or_else(|| parse_err(lineno, "missing arc head"))?;
                let w = fields.next().ok_or_else(|| parse_err(lineno, "missing arc weight"))?;
                graph.add_edge(
                    parse_vertex(u, lineno + 1)?,
                    parse_vertex(v, lineno + 1)?,
                    parse_weight(w, lineno + 1)?,
                );
            }
            Some(other) => {
                return Err(IngestError::Parse {
                    line: lineno + 1,
                    reason: format!("unrecognised DIMACS line type {:?}", other),
                })
            }
            None => {}
        }
    }
    Ok(graph)
}

fn parse_err(lineno: usize, reason: &str) -> IngestError {
    IngestError::Parse {
        line: lineno + 1,
        reason: reason.to_string(),
    }
}

fn parse_vertex(s: &str, line: usize) -> Result<usize> {
    s.parse().map_err(|_| IngestError::Parse {
        line,
        reason: format!("{:?} is not a valid vertex id", s),
    })
}

fn parse_weight(s: &str, line: usize) -> Result<f64> {
    s.parse().map_err(|_| IngestError::Parse {
        line,
        reason: format!("{:?} is not a valid edge weight", s),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn edge_list_unit_and_weighted() {
        let text = "1 2\n2 3 5.5\n# a comment\n3 4 1\n";
        let g = load_graph(text.as_bytes(), Format::EdgeList).unwrap();
        assert_eq!(g.weight(1, 2), Some(1.0));
        assert_eq!(g.weight(2, 3), Some(5.5));
        assert_eq!(g.weight(3, 4), Some(1.0));
    }

    #[test]
    fn snap_edge_list_skips_header_banner() {
        let text = "# Directed graph\n# Nodes: 3 Edges: 2\n# FromNodeId ToNodeId\n# header line 4\n1 2\n2 3\n";
        let g = load_graph(text.as_bytes(), Format::SnapEdgeList).unwrap();
        assert_eq!(g.weight(1, 2), Some(1.0));
        assert_eq!(g.weight(2, 3), Some(1.0));
    }

    #[test]
    fn dimacs_arcs_and_comments() {
        let text = "c this is a DIMACS graph\np sp 4 3\na 1 2 10\na 2 3 1\na 3 4 10\n";
        let g = load_graph(text.as_bytes(), Format::Dimacs).unwrap();
        assert_eq!(g.weight(1, 2), Some(10.0));
        assert_eq!(g.weight(2, 3), Some(1.0));
        assert_eq!(g.weight(3, 4), Some(10.0));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let text = "1 2\nnot-a-number 3\n";
        let err = load_graph(text.as_bytes(), Format::EdgeList).unwrap_err();
        match err {
            IngestError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn gzip_wrapped_edge_list_round_trips() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"1 2 3\n2 3 4\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let g = load_graph(GzDecoder::new(&compressed[..]), Format::EdgeList).unwrap();
        assert_eq!(g.weight(1, 2), Some(3.0));
        assert_eq!(g.weight(2, 3), Some(4.0));
    }
}
