use msafold::engine::config as core_config;
use msafold::workflows::orchestrator::RunRequest;
use msafold::workflows::pipeline::QueryInput;
use std::path::PathBuf;

pub struct AppConfig {
    pub query: QueryInput,
    pub database: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub core_config: core_config::PipelineConfig,
}

impl AppConfig {
    pub fn into_request(self) -> RunRequest {
        let request = RunRequest::new(self.query, self.database, self.work_dir)
            .with_config(self.core_config);
        match self.output_dir {
            Some(dir) => request.with_output_dir(dir),
            None => request,
        }
    }
}
