use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{self, ParseError};
use msafold::engine::config::{self as core_config, AlignmentStrategy, ToolCommand};
use msafold::workflows::pipeline::QueryInput;
use std::path::PathBuf;
use tracing::debug;

/// Resolves the final run configuration. A value set on the command line wins over a
/// `-S` override, which wins over the config file, which wins over the built-in default.
pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let strategy = match (args.strategy, file_config.strategy.as_deref()) {
        (Some(cli), _) => cli.into(),
        (None, Some(name)) => name
            .parse::<AlignmentStrategy>()
            .map_err(|e| CliError::Config(e.to_string()))?,
        (None, None) => defaults.strategy,
    };

    let search_file = file_config.search.take().unwrap_or_default();
    let top_hits = args
        .top_hits
        .or(search_file.top_hits)
        .unwrap_or(defaults.top_hits);
    let search_threads = args
        .search_threads
        .or(search_file.threads)
        .unwrap_or(defaults.search_threads);

    let prediction_file = file_config.prediction.take().unwrap_or_default();
    let workers = args
        .workers
        .or(prediction_file.workers)
        .unwrap_or(defaults.workers);
    let n_structures = args
        .n_structures
        .or(prediction_file.n_structures)
        .unwrap_or(defaults.n_structures);
    let n_iterations = args
        .n_iterations
        .or(prediction_file.n_iterations)
        .unwrap_or(defaults.n_iterations);

    let tools = merge_tools(file_config.tools.take().unwrap_or_default(), defaults.tools)?;

    let core_config = core_config::PipelineConfigBuilder::new()
        .strategy(strategy)
        .top_hits(top_hits)
        .search_threads(search_threads)
        .workers(workers)
        .n_structures(n_structures)
        .n_iterations(n_iterations)
        .tools(tools)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;
    debug!("Resolved pipeline configuration: {:?}", core_config);

    let query = match (&args.query.query_file, &args.query.sequence) {
        (Some(path), _) => QueryInput::File(path.clone()),
        (None, Some(text)) => QueryInput::Text(text.clone()),
        (None, None) => {
            return Err(CliError::Argument(
                "either --query or --sequence is required".to_string(),
            ));
        }
    };

    let work_dir = args
        .work_dir
        .clone()
        .or(file_config.work_dir)
        .unwrap_or(defaults.work_dir);

    Ok(AppConfig {
        query,
        database: args.database.clone(),
        work_dir,
        output_dir: args.output_dir.clone(),
        core_config,
    })
}

fn merge_tools(
    file_val: super::file::FileToolsConfig,
    defaults: core_config::ToolPaths,
) -> Result<core_config::ToolPaths> {
    let resolve = |value: Option<String>, key: &str, default: ToolCommand| -> Result<ToolCommand> {
        match value {
            Some(line) => parser::parse_tool_command(key, &line).map_err(config_error),
            None => Ok(default),
        }
    };

    Ok(core_config::ToolPaths {
        indexer: resolve(file_val.indexer, "tools.indexer", defaults.indexer)?,
        pairwise_search: resolve(
            file_val.pairwise_search,
            "tools.pairwise-search",
            defaults.pairwise_search,
        )?,
        profile_search: resolve(
            file_val.profile_search,
            "tools.profile-search",
            defaults.profile_search,
        )?,
        aligner: resolve(file_val.aligner, "tools.aligner", defaults.aligner)?,
        predictor: resolve(file_val.predictor, "tools.predictor", defaults.predictor)?,
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = parser::parse_assignment(kv_pair).map_err(config_error)?;
        let count = || parser::parse_count(key, value).map_err(config_error);

        match key {
            "strategy" => config.strategy = Some(value.to_string()),
            "work-dir" => config.work_dir = Some(PathBuf::from(value)),
            "search.top-hits" => {
                config.search.get_or_insert_with(Default::default).top_hits = Some(count()?);
            }
            "search.threads" => {
                config.search.get_or_insert_with(Default::default).threads = Some(count()?);
            }
            "prediction.workers" => {
                config.prediction.get_or_insert_with(Default::default).workers = Some(count()?);
            }
            "prediction.n-structures" => {
                config
                    .prediction
                    .get_or_insert_with(Default::default)
                    .n_structures = Some(count()?);
            }
            "prediction.n-iterations" => {
                config
                    .prediction
                    .get_or_insert_with(Default::default)
                    .n_iterations = Some(count()?);
            }
            "tools.indexer" => {
                config.tools.get_or_insert_with(Default::default).indexer = Some(value.to_string());
            }
            "tools.pairwise-search" => {
                config
                    .tools
                    .get_or_insert_with(Default::default)
                    .pairwise_search = Some(value.to_string());
            }
            "tools.profile-search" => {
                config
                    .tools
                    .get_or_insert_with(Default::default)
                    .profile_search = Some(value.to_string());
            }
            "tools.aligner" => {
                config.tools.get_or_insert_with(Default::default).aligner = Some(value.to_string());
            }
            "tools.predictor" => {
                config.tools.get_or_insert_with(Default::default).predictor =
                    Some(value.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

fn config_error(e: ParseError) -> CliError {
    CliError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{QuerySource, StrategyArg};
    use std::fs;
    use tempfile::tempdir;

    fn base_run_args() -> RunArgs {
        RunArgs {
            query: QuerySource {
                query_file: Some(PathBuf::from("query.fasta")),
                sequence: None,
            },
            database: PathBuf::from("db.fasta"),
            work_dir: None,
            output_dir: None,
            config: None,
            strategy: None,
            top_hits: None,
            search_threads: None,
            workers: None,
            n_structures: None,
            n_iterations: None,
            set_values: vec![],
        }
    }

    #[test]
    fn build_config_falls_back_to_defaults() {
        let app = build_config(&base_run_args()).expect("build ok");
        let cfg = app.core_config;
        let defaults = DefaultsConfig::default();

        assert_eq!(app.query, QueryInput::File(PathBuf::from("query.fasta")));
        assert_eq!(app.work_dir, PathBuf::from("."));
        assert!(app.output_dir.is_none());
        assert_eq!(cfg.strategy, AlignmentStrategy::FragmentInsertion);
        assert_eq!(cfg.search.top_hits, defaults.top_hits);
        assert_eq!(cfg.search.threads, defaults.search_threads);
        assert_eq!(cfg.prediction.workers, defaults.workers);
        assert_eq!(cfg.prediction.n_structures, defaults.n_structures);
        assert_eq!(cfg.prediction.n_iterations, defaults.n_iterations);
        assert_eq!(cfg.tools, core_config::ToolPaths::default());
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        let toml = r#"
            strategy = "direct"
            work-dir = "/scratch/run1"

            [search]
            top-hits = 40
            threads = 8

            [prediction]
            workers = 16
            n-structures = 10

            [tools]
            predictor = "sh /opt/profold/run_ProFOLD.sh"
            "#;
        fs::write(&cfg_path, toml).unwrap();

        let mut args = base_run_args();
        args.config = Some(cfg_path);

        let app = build_config(&args).expect("build ok");
        let cfg = app.core_config;

        assert_eq!(app.work_dir, PathBuf::from("/scratch/run1"));
        assert_eq!(cfg.strategy, AlignmentStrategy::Direct);
        assert_eq!(cfg.search.top_hits, 40);
        assert_eq!(cfg.search.threads, 8);
        assert_eq!(cfg.prediction.workers, 16);
        assert_eq!(cfg.prediction.n_structures, 10);
        assert_eq!(cfg.prediction.n_iterations, DefaultsConfig::default().n_iterations);
        assert_eq!(
            cfg.tools.predictor,
            ToolCommand::new("sh").with_args(["/opt/profold/run_ProFOLD.sh"])
        );
        assert_eq!(cfg.tools.aligner, ToolCommand::new("mafft"));
    }

    #[test]
    fn cli_overrides_set_values_and_file_values() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            "strategy = \"direct\"\n[prediction]\nworkers = 2\nn-iterations = 9\n",
        )
        .unwrap();

        let mut args = base_run_args();
        args.config = Some(cfg_path);
        args.strategy = Some(StrategyArg::FragmentInsertion);
        args.workers = Some(12);
        args.set_values = vec![
            "prediction.workers=6".to_string(),
            "prediction.n-iterations=4".to_string(),
        ];

        let cfg = build_config(&args).expect("build ok").core_config;
        assert_eq!(cfg.strategy, AlignmentStrategy::FragmentInsertion);
        assert_eq!(cfg.prediction.workers, 12);
        assert_eq!(cfg.prediction.n_iterations, 4);
    }

    #[test]
    fn set_values_override() {
        let mut args = base_run_args();
        args.set_values = vec![
            "strategy=direct".to_string(),
            "search.top-hits=3".to_string(),
            "search.threads=1".to_string(),
            "prediction.n-structures=1".to_string(),
            "tools.aligner=conda run -n msa mafft".to_string(),
        ];

        let cfg = build_config(&args).expect("build ok").core_config;
        assert_eq!(cfg.strategy, AlignmentStrategy::Direct);
        assert_eq!(cfg.search.top_hits, 3);
        assert_eq!(cfg.search.threads, 1);
        assert_eq!(cfg.prediction.n_structures, 1);
        assert_eq!(cfg.tools.aligner.program, "conda");
        assert_eq!(cfg.tools.aligner.args, vec!["run", "-n", "msa", "mafft"]);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let cases = [
            vec!["unknown.key=1".to_string()],
            vec!["search.top-hits=many".to_string()],
            vec!["search.top-hits=0".to_string()],
            vec!["strategy=psiblast".to_string()],
            vec!["tools.predictor=".to_string()],
            vec!["prediction.workers".to_string()],
        ];
        for set_values in cases {
            let mut args = base_run_args();
            args.set_values = set_values.clone();
            let result = build_config(&args);
            assert!(
                matches!(result, Err(CliError::Config(_))),
                "expected a config error for {:?}",
                set_values
            );
        }
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[search]\nevalue = 0.1\n").unwrap();

        let mut args = base_run_args();
        args.config = Some(cfg_path);
        assert!(matches!(
            build_config(&args),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn inline_sequence_becomes_text_query() {
        let mut args = base_run_args();
        args.query = QuerySource {
            query_file: None,
            sequence: Some("MKVLAG".to_string()),
        };
        args.output_dir = Some(PathBuf::from("out"));

        let app = build_config(&args).expect("build ok");
        assert_eq!(app.query, QueryInput::Text("MKVLAG".to_string()));
        let request = app.into_request();
        assert_eq!(request.output_dir(), PathBuf::from("out"));
    }
}
