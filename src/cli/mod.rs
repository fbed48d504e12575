//! CLI argument parsing and command handling

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inferbench_core::{
    AsyncTransport, BenchConfig, DispatchMode, DriverBuilder, Example, PredictionLog, Protocol,
    RequestCodec, Transport, TransportHandle,
};
use inferbench_datasets::{load_validation_set, synthetic, Preprocessor};
use inferbench_report::{print_banner, print_summary, JsonExporter};
use inferbench_transports::{
    codec_for, wrk, GrpcTransport, HttpConfig, HttpTransport, OnWorker, PredictCodec,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;

/// inferbench - accuracy and latency benchmark for image-classification endpoints
#[derive(Parser, Debug)]
#[command(name = "inferbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark against a serving endpoint
    Run(RunArgs),
    /// Write a wrk Lua script posting a random predict request
    WrkScript(WrkScriptArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON configuration file; flags given on the command line override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serving endpoint as host:port (REST port, or gRPC port with --protocol grpc)
    #[arg(long, visible_alias = "target")]
    pub host: Option<String>,

    /// Model name in the predict URL
    #[arg(long)]
    pub model_name: Option<String>,

    /// Number of requests to send
    #[arg(short, long)]
    pub num_tests: Option<usize>,

    /// Maximum number of requests in flight
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Directory holding validation_label.txt and val/
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Wire protocol (tf-serving, kf-serving, grpc)
    #[arg(long)]
    pub protocol: Option<Protocol>,

    /// Dispatch mode (callback, worker, inline)
    #[arg(long)]
    pub dispatch: Option<DispatchMode>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<f64>,

    /// Append "<image> <predicted label>" lines to this file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Reshuffle the dataset whenever it wraps around
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for the reshuffle (implies --shuffle)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    pub output_json: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct WrkScriptArgs {
    /// Output script path
    #[arg(short, long, default_value = wrk::DEFAULT_SCRIPT_NAME)]
    pub output: PathBuf,

    /// Image side length of the random input
    #[arg(long, default_value = "299")]
    pub size: usize,

    /// RNG seed for the random input
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Run the selected command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run_benchmark(args),
            Commands::WrkScript(args) => write_wrk_script(&args),
        }
    }
}

impl RunArgs {
    /// Merge the optional config file with command-line flags
    pub fn resolve(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::from_file(path)
                .with_context(|| format!("Failed to load config from: {}", path.display()))?,
            None => {
                let host = self
                    .host
                    .clone()
                    .context("--host is required when no --config is given")?;
                let data_dir = self
                    .data_dir
                    .clone()
                    .context("--data-dir is required when no --config is given")?;
                BenchConfig::new(host, data_dir)
            }
        };

        if let Some(host) = &self.host {
            config.target = host.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(model_name) = &self.model_name {
            config.model_name = model_name.clone();
        }
        if let Some(num_tests) = self.num_tests {
            config.num_tests = num_tests;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(dispatch) = self.dispatch {
            config.dispatch = dispatch;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid timeout: {}", secs))?;
        }
        if let Some(path) = &self.save {
            config.save_predictions = Some(path.clone());
        }
        if self.shuffle || self.seed.is_some() {
            let seed = self.seed.or(config.seed);
            config = config.with_shuffle(seed);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Transport for the configured protocol, wrapped for the dispatch mode
fn build_transport(config: &BenchConfig, runtime: &Handle) -> Result<TransportHandle> {
    if config.protocol.is_grpc() {
        let grpc = GrpcTransport::new(config.endpoint(), config.timeout, runtime.clone())
            .with_context(|| format!("Invalid gRPC target: {}", config.endpoint()))?;
        return Ok(dispatch(config.dispatch, grpc, runtime));
    }

    let http_config = HttpConfig::default()
        .with_request_timeout(config.timeout)
        .with_pool_max_idle(config.effective_concurrency());
    let http = HttpTransport::new(config.endpoint(), &http_config, runtime.clone())
        .context("Failed to build HTTP client")?;
    Ok(dispatch(config.dispatch, http, runtime))
}

fn dispatch<T>(mode: DispatchMode, transport: T, runtime: &Handle) -> TransportHandle
where
    T: Transport + AsyncTransport + 'static,
{
    match mode {
        DispatchMode::Inline => TransportHandle::Inline(Arc::new(transport)),
        DispatchMode::Callback => TransportHandle::Callback(Arc::new(transport)),
        DispatchMode::Worker => {
            TransportHandle::Worker(Arc::new(OnWorker::new(transport, runtime.clone())))
        }
    }
}

fn run_benchmark(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;
    print_banner(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("inferbench-io")
        .build()
        .context("Failed to start async runtime")?;

    let mut dataset = load_validation_set(&config.data_dir, config.num_tests, &Preprocessor::default())
        .with_context(|| format!("Failed to load dataset from: {}", config.data_dir.display()))?;
    if config.shuffle {
        dataset = dataset.with_shuffle(config.seed);
    }

    let transport = build_transport(&config, runtime.handle())?;

    let mut builder = DriverBuilder::new()
        .config(&config)
        .codec(codec_for(&config));
    if let Some(path) = &config.save_predictions {
        let sink = PredictionLog::open(path)
            .with_context(|| format!("Failed to open prediction log: {}", path.display()))?;
        builder = builder.sink(Arc::new(sink));
    }
    if !args.no_progress {
        builder = builder.progress(progress_bar(config.num_tests));
    }
    let driver = builder.build()?;

    let summary = driver.run(&mut dataset, &transport)?;

    println!();
    print_summary(&summary);

    if let Some(path) = &args.output_json {
        JsonExporter::export(&summary, path)
            .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
        println!("JSON exported to: {}", path.display());
    }

    let (error_rate, elapsed_secs) = summary.into_tuple();
    println!("Time: {:.3}", elapsed_secs);
    println!("Error rate: {:.4}", error_rate);

    Ok(())
}

fn write_wrk_script(args: &WrkScriptArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let shape = vec![args.size, args.size, 3];
    let input = synthetic::normal_tensor(vec![1, args.size, args.size, 3], -1.0, 1.0, &mut rng)?;
    let codec = PredictCodec::kf_serving().with_input_shape(shape);
    let body = codec.encode(&Example::new("synthetic", input, 0))?;
    let body = String::from_utf8(body).context("Request body is not UTF-8")?;

    wrk::write_script(&args.output, &body)
        .with_context(|| format!("Failed to write wrk script: {}", args.output.display()))?;
    println!("wrk script written to: {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn run_args(cli: Cli) -> RunArgs {
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_from_flags() {
        let args = run_args(parse(&[
            "inferbench",
            "run",
            "--host",
            "127.0.0.1:8500",
            "--data-dir",
            "/data",
            "--num-tests",
            "50",
            "--concurrency",
            "8",
            "--protocol",
            "kf",
            "--dispatch",
            "inline",
            "--timeout-secs",
            "2.5",
        ]));
        let config = args.resolve().unwrap();

        assert_eq!(config.target, "127.0.0.1:8500");
        assert_eq!(config.num_tests, 50);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.protocol, Protocol::KfServing);
        assert_eq!(config.dispatch, DispatchMode::Inline);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert!(!config.shuffle);
    }

    #[test]
    fn test_target_alias_and_seed() {
        let args = run_args(parse(&[
            "inferbench", "run", "--target", "svc:80", "-d", "/data", "--seed", "9",
        ]));
        let config = args.resolve().unwrap();

        assert_eq!(config.target, "svc:80");
        assert!(config.shuffle);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_grpc_protocol_flag() {
        let args = run_args(parse(&[
            "inferbench", "run", "--host", "serving:8500", "-d", "/data", "--protocol", "grpc",
        ]));
        let config = args.resolve().unwrap();

        assert_eq!(config.protocol, Protocol::Grpc);
        assert_eq!(config.endpoint(), "http://serving:8500");
    }

    #[test]
    fn test_build_transport_per_protocol() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let config = BenchConfig::new("127.0.0.1:8500", "/data")
            .with_protocol(Protocol::Grpc)
            .with_dispatch(DispatchMode::Worker);

        let handle = build_transport(&config, rt.handle()).unwrap();
        assert_eq!(handle.mode(), DispatchMode::Worker);
        assert_eq!(handle.name(), "grpc");

        let config = config
            .with_protocol(Protocol::KfServing)
            .with_dispatch(DispatchMode::Inline);
        let handle = build_transport(&config, rt.handle()).unwrap();
        assert_eq!(handle.mode(), DispatchMode::Inline);
        assert_eq!(handle.name(), "http");
    }

    #[test]
    fn test_missing_host() {
        let args = run_args(parse(&["inferbench", "run", "--data-dir", "/data"]));
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let args = run_args(parse(&[
            "inferbench", "run", "--host", "h:1", "-d", "/data", "-c", "0",
        ]));
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target": "file:8501", "data_dir": "/file/data", "num_tests": 20, "dispatch": "worker"}}"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = run_args(parse(&["inferbench", "run", "--config", &path, "-n", "5"]));
        let config = args.resolve().unwrap();

        assert_eq!(config.target, "file:8501");
        assert_eq!(config.num_tests, 5);
        assert_eq!(config.dispatch, DispatchMode::Worker);
    }

    #[test]
    fn test_wrk_script_command() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("post.lua");
        let cli = parse(&[
            "inferbench",
            "wrk-script",
            "--output",
            output.to_str().unwrap(),
            "--size",
            "4",
            "--seed",
            "1",
        ]);
        cli.run().unwrap();

        let script = std::fs::read_to_string(&output).unwrap();
        assert!(script.starts_with("wrk.method = \"POST\""));
        assert!(script.contains("wrk.body = '{\"instances\":[[[["));
    }
}
