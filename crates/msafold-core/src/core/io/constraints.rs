//! Sanity checks for Rosetta-style structural constraint files.
//!
//! The structure predictor turns its distance and orientation predictions into
//! `AtomPair`, `Angle` and `Dihedral` constraints before folding. A constraint that points
//! at a residue outside the query, or that carries no numeric function parameter, makes
//! the folding step fail late and opaquely; this checker reports such lines up front.

use serde::Serialize;
use std::fmt;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    AtomPair,
    Angle,
    Dihedral,
}

impl ConstraintKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "AtomPair" => Some(Self::AtomPair),
            "Angle" => Some(Self::Angle),
            "Dihedral" => Some(Self::Dihedral),
            _ => None,
        }
    }

    fn atom_count(self) -> usize {
        match self {
            Self::AtomPair => 2,
            Self::Angle => 3,
            Self::Dihedral => 4,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AtomPair => "AtomPair",
            Self::Angle => "Angle",
            Self::Dihedral => "Dihedral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintIssue {
    pub line: usize,
    pub kind: ConstraintKind,
    pub reason: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintCounts {
    pub atom_pair: usize,
    pub angle: usize,
    pub dihedral: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintReport {
    pub counts: ConstraintCounts,
    pub issues: Vec<ConstraintIssue>,
}

impl ConstraintReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Writes the issues as a tab-separated table (`line`, `kind`, `reason`, `text`).
    pub fn write_issues_tsv(&self, writer: impl Write) -> io::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for issue in &self.issues {
            wtr.serialize(issue).map_err(io::Error::other)?;
        }
        wtr.flush()
    }
}

/// Checks every constraint line against a query of `query_len` residues. Blank lines and
/// `#` comments are skipped; lines of other constraint types are only counted.
pub fn check_constraints(reader: impl BufRead, query_len: usize) -> io::Result<ConstraintReport> {
    let mut report = ConstraintReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some(kind) = ConstraintKind::from_keyword(tokens[0]) else {
            report.counts.other += 1;
            continue;
        };
        match kind {
            ConstraintKind::AtomPair => report.counts.atom_pair += 1,
            ConstraintKind::Angle => report.counts.angle += 1,
            ConstraintKind::Dihedral => report.counts.dihedral += 1,
        }

        if let Err(reason) = check_line(kind, &tokens, query_len) {
            report.issues.push(ConstraintIssue {
                line: idx + 1,
                kind,
                reason,
                text: text.to_string(),
            });
        }
    }

    Ok(report)
}

// Layout: <Kind> (<atom> <residue>){n} <function> <params...>
fn check_line(kind: ConstraintKind, tokens: &[&str], query_len: usize) -> Result<(), String> {
    let atoms = kind.atom_count();
    let function_idx = 1 + 2 * atoms;
    if tokens.len() <= function_idx {
        return Err(format!(
            "too few fields ({} found, at least {} expected)",
            tokens.len(),
            function_idx + 1
        ));
    }

    let positional: Option<Vec<usize>> = (0..atoms)
        .map(|i| tokens[2 + 2 * i].parse().ok())
        .collect();
    let residues = match positional {
        Some(residues) => residues,
        None => {
            let found: Vec<usize> = tokens[1..function_idx]
                .iter()
                .filter_map(|t| t.parse().ok())
                .collect();
            if found.len() < atoms {
                return Err(format!(
                    "expected {} residue indices, found {}",
                    atoms,
                    found.len()
                ));
            }
            found[..atoms].to_vec()
        }
    };

    if let Some(bad) = residues.iter().find(|&&r| r < 1 || r > query_len) {
        return Err(format!(
            "residue index {} out of range 1..={} ({:?})",
            bad, query_len, residues
        ));
    }

    let has_numeric_param = tokens[function_idx + 1..]
        .iter()
        .filter_map(|t| t.parse::<f64>().ok())
        .any(f64::is_finite);
    if !has_numeric_param {
        return Err("no numeric function parameters".to_string());
    }

    Ok(())
}
