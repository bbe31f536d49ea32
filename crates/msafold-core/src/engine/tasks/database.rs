use crate::engine::command::ManagedCommand;
use crate::engine::config::AlignmentStrategy;
use crate::engine::context::RunContext;
use crate::engine::error::PipelineError;
use flate2::read::MultiGzDecoder;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

const BLAST_INDEX_EXTENSIONS: [&str; 2] = ["pin", "psq"];
const HHSUITE_REQUIRED_SUFFIXES: [&str; 2] = ["_a3m.ffdata", "_a3m.ffindex"];

/// A database ready to be searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedDatabase {
    /// A protein BLAST database built next to its (decompressed) FASTA source.
    Blast {
        fasta: PathBuf,
        prefix: PathBuf,
        freshly_indexed: bool,
    },
    /// A prebuilt HH-suite database, referenced by its prefix.
    HhSuite { prefix: PathBuf },
}

impl PreparedDatabase {
    pub fn prefix(&self) -> &Path {
        match self {
            PreparedDatabase::Blast { prefix, .. } | PreparedDatabase::HhSuite { prefix } => {
                prefix
            }
        }
    }

    /// The FASTA collection hit sequences are extracted from, when there is one.
    pub fn fasta(&self) -> Option<&Path> {
        match self {
            PreparedDatabase::Blast { fasta, .. } => Some(fasta),
            PreparedDatabase::HhSuite { .. } => None,
        }
    }
}

#[instrument(skip_all, name = "database_task")]
pub async fn run(ctx: &RunContext<'_>, database: &Path) -> Result<PreparedDatabase, PipelineError> {
    match ctx.config.strategy {
        AlignmentStrategy::Direct => prepare_blast(ctx, database).await,
        AlignmentStrategy::FragmentInsertion => check_hhsuite(database),
    }
}

/// Decompresses and indexes a FASTA collection unless that already happened.
pub async fn prepare_blast(
    ctx: &RunContext<'_>,
    database: &Path,
) -> Result<PreparedDatabase, PipelineError> {
    if !database.is_file() {
        return Err(PipelineError::InvalidInput(format!(
            "database file '{}' does not exist",
            database.display()
        )));
    }

    let fasta = if is_gzipped(database) {
        ctx.message(format!("Decompressing {}", database.display()));
        let source = database.to_path_buf();
        tokio::task::spawn_blocking(move || decompress_once(&source))
            .await
            .map_err(|e| PipelineError::Internal(format!("decompression task failed: {e}")))??
    } else {
        database.to_path_buf()
    };

    let prefix = blast_prefix(&fasta);
    if is_blast_indexed(&prefix) {
        info!(prefix = %prefix.display(), "BLAST database already indexed; skipping makeblastdb.");
        ctx.message(format!("Using existing database {}", prefix.display()));
        return Ok(PreparedDatabase::Blast {
            fasta,
            prefix,
            freshly_indexed: false,
        });
    }

    ctx.message(format!("Indexing {}", fasta.display()));
    let command = ManagedCommand::new(&ctx.config.tools.indexer)
        .arg("-in")
        .arg(&fasta)
        .args(["-dbtype", "prot"])
        .arg("-out")
        .arg(&prefix);
    ctx.run_tool(command, PipelineError::DatabaseBuild).await?;

    if !is_blast_indexed(&prefix) {
        warn!(prefix = %prefix.display(), "Indexer succeeded but no index files were found.");
    }

    Ok(PreparedDatabase::Blast {
        fasta,
        prefix,
        freshly_indexed: true,
    })
}

/// Verifies that the files an HH-suite profile search reads exist for `prefix`.
pub fn check_hhsuite(prefix: &Path) -> Result<PreparedDatabase, PipelineError> {
    let missing: Vec<String> = HHSUITE_REQUIRED_SUFFIXES
        .iter()
        .map(|suffix| with_suffix(prefix, suffix))
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();

    if !missing.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "HH-suite database '{}' is incomplete; missing {}",
            prefix.display(),
            missing.join(", ")
        )));
    }

    Ok(PreparedDatabase::HhSuite {
        prefix: prefix.to_path_buf(),
    })
}

/// `<dir>/<stem>` of the FASTA file, where the index files are written.
pub fn blast_prefix(fasta: &Path) -> PathBuf {
    match fasta.file_stem() {
        Some(stem) => fasta.with_file_name(stem),
        None => fasta.to_path_buf(),
    }
}

pub fn is_blast_indexed(prefix: &Path) -> bool {
    BLAST_INDEX_EXTENSIONS
        .iter()
        .any(|ext| with_suffix(prefix, &format!(".{ext}")).exists())
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Decompresses `gz` to its sibling without the `.gz` extension, reusing the sibling if
/// it already exists. The output is written to a `.part` file first and renamed into
/// place, so an interrupted run never leaves a truncated collection behind.
fn decompress_once(gz: &Path) -> Result<PathBuf, PipelineError> {
    let target = gz.with_extension("");
    if target.is_file() {
        info!(path = %target.display(), "Reusing decompressed database.");
        return Ok(target);
    }

    let tmp = with_suffix(&target, ".part");
    let result = (|| -> io::Result<()> {
        let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(gz)?));
        let mut writer = BufWriter::new(File::create(&tmp)?);
        io::copy(&mut decoder, &mut writer)?;
        writer.flush()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                PipelineError::InvalidInput(format!(
                    "could not decompress '{}': {e}",
                    gz.display()
                ))
            }
            _ => PipelineError::io(gz, e),
        });
    }

    fs::rename(&tmp, &target).map_err(|e| PipelineError::io(&target, e))?;
    info!(path = %target.display(), "Decompressed database.");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PipelineConfig, PipelineConfigBuilder, ToolPaths};
    use crate::engine::progress::ProgressReporter;
    use crate::testing;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;
    use tokio::sync::watch;

    fn direct_config(tools: ToolPaths) -> PipelineConfig {
        PipelineConfigBuilder::new()
            .strategy(AlignmentStrategy::Direct)
            .tools(tools)
            .build()
            .unwrap()
    }

    fn indexer_only(dir: &Path, counter: &Path) -> ToolPaths {
        ToolPaths {
            indexer: testing::indexer(dir, counter),
            ..ToolPaths::default()
        }
    }

    #[test]
    fn prefix_strips_the_last_extension() {
        assert_eq!(
            blast_prefix(Path::new("/db/uniref50.fasta")),
            PathBuf::from("/db/uniref50")
        );
        assert_eq!(blast_prefix(Path::new("/db/seqs")), PathBuf::from("/db/seqs"));
    }

    #[tokio::test]
    async fn indexing_runs_once_across_repeated_preparations() {
        let dir = TempDir::new().unwrap();
        let counter = dir.path().join("indexer_calls");
        let db = testing::write_database(dir.path(), 5, 40);
        let config = direct_config(indexer_only(dir.path(), &counter));
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.path().join("work"), &config, &reporter, rx).unwrap();

        let first = run(&ctx, &db).await.unwrap();
        let second = run(&ctx, &db).await.unwrap();

        assert_eq!(first.prefix(), dir.path().join("db"));
        assert_eq!(first.prefix(), second.prefix());
        assert!(matches!(first, PreparedDatabase::Blast { freshly_indexed: true, .. }));
        assert!(matches!(second, PreparedDatabase::Blast { freshly_indexed: false, .. }));
        assert_eq!(testing::count_lines(&counter), 1);
        assert!(ctx.log_dir.join("makeblastdb.log").is_file());
    }

    #[tokio::test]
    async fn gzipped_collections_are_decompressed_once_to_their_sibling() {
        let dir = TempDir::new().unwrap();
        let counter = dir.path().join("indexer_calls");
        let plain = ">seq1\nMKV\n>seq2\nLAG\n";
        let gz = dir.path().join("small.fasta.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(plain.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let config = direct_config(indexer_only(dir.path(), &counter));
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.path().join("work"), &config, &reporter, rx).unwrap();

        let prepared = run(&ctx, &gz).await.unwrap();
        let fasta = dir.path().join("small.fasta");
        assert_eq!(prepared.fasta(), Some(fasta.as_path()));
        assert_eq!(fs::read_to_string(&fasta).unwrap(), plain);
        assert!(!with_suffix(&fasta, ".part").exists());

        run(&ctx, &gz).await.unwrap();
        assert_eq!(testing::count_lines(&counter), 1);
    }

    #[tokio::test]
    async fn indexer_failure_is_a_database_build_error() {
        let dir = TempDir::new().unwrap();
        let db = testing::write_database(dir.path(), 3, 20);
        let tools = ToolPaths {
            indexer: testing::failing_tool(dir.path(), "makeblastdb", 1),
            ..ToolPaths::default()
        };
        let config = direct_config(tools);
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.path().join("work"), &config, &reporter, rx).unwrap();

        let err = run(&ctx, &db).await.unwrap_err();
        let failure = match &err {
            PipelineError::DatabaseBuild(failure) => failure,
            other => panic!("unexpected error: {other:?}"),
        };
        assert_eq!(failure.exit_code, Some(1));
        assert_eq!(failure.tail, vec!["makeblastdb: fatal error"]);
    }

    #[tokio::test]
    async fn missing_database_file_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let config = direct_config(ToolPaths::default());
        let reporter = ProgressReporter::new();
        let (_tx, rx) = watch::channel(false);
        let ctx = RunContext::new(dir.path(), &config, &reporter, rx).unwrap();

        let err = run(&ctx, &dir.path().join("absent.fasta")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn hhsuite_databases_need_their_a3m_ffindex_pair() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("uniclust30");

        let err = check_hhsuite(&prefix).unwrap_err();
        assert!(err.to_string().contains("uniclust30_a3m.ffdata"));

        fs::write(with_suffix(&prefix, "_a3m.ffdata"), "").unwrap();
        fs::write(with_suffix(&prefix, "_a3m.ffindex"), "").unwrap();
        assert_eq!(
            check_hhsuite(&prefix).unwrap(),
            PreparedDatabase::HhSuite { prefix }
        );
    }
}
