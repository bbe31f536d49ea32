//! Fake external tools for exercising stages and whole runs without the real
//! bioinformatics suite. Each fake is a small `sh` script invoked as `sh <script>`, so no
//! executable bit is needed.

use crate::core::io::blast_xml::sample_report;
use crate::engine::config::{ToolCommand, ToolPaths};
use std::fs;
use std::path::{Path, PathBuf};

const STANDARD_RESIDUES: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

const ARG_PARSER: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    -in|-i|-query) input="$2"; shift ;;
    -out|-o) out="$2"; shift ;;
    -oa3m) a3m="$2"; shift ;;
  esac
  shift
done
"#;

pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> ToolCommand {
    let path = dir.join(format!("{name}.sh"));
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    ToolCommand::new("sh").with_args([path.to_string_lossy().into_owned()])
}

/// A deterministic pseudo-protein of `len` standard residues.
pub(crate) fn protein(seed: usize, len: usize) -> String {
    (0..len)
        .map(|i| {
            let idx = (seed * 7 + i * 13 + i / 3) % STANDARD_RESIDUES.len();
            STANDARD_RESIDUES[idx] as char
        })
        .collect()
}

/// Writes `n` records `seq1..seqN` of `len` residues to `<dir>/db.fasta`.
pub(crate) fn write_database(dir: &Path, n: usize, len: usize) -> PathBuf {
    let path = dir.join("db.fasta");
    let text: String = (1..=n)
        .map(|i| format!(">seq{i} synthetic homolog {i}\n{}\n", protein(i, len)))
        .collect();
    fs::write(&path, text).unwrap();
    path
}

/// Creates `<prefix>.pin`/`.psq` and appends one line to `counter` per invocation.
pub(crate) fn indexer(dir: &Path, counter: &Path) -> ToolCommand {
    let body = format!(
        "{ARG_PARSER}\necho \"Building a new DB from $input\"\necho indexed >> '{}'\ntouch \"$out.pin\" \"$out.psq\"",
        counter.display()
    );
    fake_tool(dir, "makeblastdb", &body)
}

pub(crate) fn failing_tool(dir: &Path, name: &str, code: i32) -> ToolCommand {
    let body = format!("echo \"{name}: fatal error\" >&2\nexit {code}");
    fake_tool(dir, name, &body)
}

/// Writes a BLAST XML report listing `hit_ids` and touches `marker` when it runs.
pub(crate) fn blastp(dir: &Path, hit_ids: &[String], marker: &Path) -> ToolCommand {
    let defs: Vec<String> = hit_ids.iter().map(|id| format!("{id} hypothetical")).collect();
    let defs: Vec<&str> = defs.iter().map(String::as_str).collect();
    let body = format!(
        "touch '{}'\n{ARG_PARSER}\ncat > \"$out\" <<'XML'\n{}XML\necho \"searched {} subjects\"",
        marker.display(),
        sample_report(&defs),
        hit_ids.len()
    );
    fake_tool(dir, "blastp", &body)
}

/// Writes the query followed by `homologs` as an A3M file, plus an empty `.hhr`.
pub(crate) fn hhblits(dir: &Path, homologs: &[(String, String)]) -> ToolCommand {
    let records: String = homologs
        .iter()
        .map(|(id, residues)| format!(">{id}\n{residues}\n"))
        .collect();
    let body = format!(
        "{ARG_PARSER}\ncat \"$input\" > \"$a3m\"\ncat >> \"$a3m\" <<'A3M'\n{records}A3M\n: > \"$out\"\necho \"- 13:37:00.000 INFO: Iteration 1\""
    );
    fake_tool(dir, "hhblits", &body)
}

/// Pads every record to the widest one; with `--addfragments`, fragments are stripped of
/// insertions and fitted to the query's length instead.
pub(crate) fn aligner(dir: &Path) -> ToolCommand {
    let body = r#"
frags=""
prev=""
for arg; do
  if [ "$prev" = "--addfragments" ]; then frags="$arg"; fi
  prev="$arg"
done
echo "aligning $prev" >&2
awk -v fixed="$frags" '
/^#/ { next }
/^>/ { n++; hdr[n]=$0; seq[n]=""; next }
{ seq[n]=seq[n] $0 }
END {
  w=0
  if (fixed!="") { w=length(seq[1]) } else { for (i=1;i<=n;i++) if (length(seq[i])>w) w=length(seq[i]) }
  for (i=1;i<=n;i++) {
    s=seq[i]
    if (fixed!="") { gsub(/[a-z.]/,"",s); s=substr(s,1,w) }
    while (length(s)<w) s=s "-"
    print hdr[i]; print s
  }
}' "$prev" $frags
"#;
    fake_tool(dir, "mafft", body)
}

/// Streams a few progress lines, keeps a copy of its input alignment and its arguments,
/// and writes one model into the output directory.
pub(crate) fn predictor(dir: &Path) -> ToolCommand {
    let body = r#"
echo "loading alignment $1"
echo "predicting distances" >&2
cp "$1" "$2/input.aln"
echo "$@" > "$2/arguments.txt"
echo "MODEL 1" > "$2/model_1.pdb"
echo "done"
"#;
    fake_tool(dir, "run_ProFOLD", body)
}

pub(crate) fn slow_predictor(dir: &Path) -> ToolCommand {
    fake_tool(dir, "run_ProFOLD", "echo started\nsleep 30\necho finished")
}

pub(crate) fn silent_predictor(dir: &Path) -> ToolCommand {
    fake_tool(dir, "run_ProFOLD", "echo \"nothing to do\"")
}

/// Fake tools for a complete run; `counter` records indexer invocations and `marker` is
/// touched by the search tool.
pub(crate) fn tool_paths(
    dir: &Path,
    counter: &Path,
    marker: &Path,
    blast_hits: &[String],
    homologs: &[(String, String)],
) -> ToolPaths {
    ToolPaths {
        indexer: indexer(dir, counter),
        pairwise_search: blastp(dir, blast_hits, marker),
        profile_search: hhblits(dir, homologs),
        aligner: aligner(dir),
        predictor: predictor(dir),
    }
}

pub(crate) fn count_lines(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|text| text.lines().count())
        .unwrap_or(0)
}
