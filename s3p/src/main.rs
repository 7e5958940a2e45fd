use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "s3p",
    version,
    about = "Parallel bulk transfer between the local filesystem and S3",
    long_about = "`s3p` uploads and downloads files and directory trees to and from S3 (or any \
S3-compatible service), running many object transfers in parallel.

EXAMPLES:
    # Upload a directory tree under a prefix
    s3p put ./data s3://bucket/backup

    # Download everything under a prefix into ./out
    s3p get -r s3://bucket/backup/data/ ./out

    # Download a specific version of an object
    s3p get --version-id 3HL4kqtJlcpXroDTDmJ s3://bucket/report.csv ./report.csv

The number of parallel transfers defaults to twice the number of CPUs and can be set with \
--jobs or the S3P_JOBS environment variable."
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, global = true, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Progress & output")]
    quiet: bool,

    // Object store
    /// Named profile from the shared AWS config and credentials files
    #[arg(long, value_name = "NAME", global = true, help_heading = "Object store")]
    profile: Option<String>,

    /// Region to send requests to (default: taken from the environment or profile)
    #[arg(long, value_name = "REGION", global = true, help_heading = "Object store")]
    region: Option<String>,

    /// Endpoint of an S3-compatible service, e.g. http://127.0.0.1:9000
    #[arg(long, value_name = "URL", global = true, help_heading = "Object store")]
    endpoint_url: Option<String>,

    /// Use path-style addressing (endpoint/bucket/key), required by most S3-compatible services
    #[arg(long, global = true, help_heading = "Object store")]
    path_style: bool,

    // Advanced settings
    /// Number of runtime worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List the first page (up to 1000) of objects under a prefix
    List {
        /// s3://bucket/prefix
        #[arg(value_name = "URI")]
        uri: String,
    },
    /// Download an object, or every object under a prefix with --recursive
    ///
    /// With --recursive, a prefix ending in `/` is mirrored into LOCAL_PATH directly; without the
    /// trailing `/` the last segment of the prefix becomes a directory under LOCAL_PATH.
    Get {
        /// Download every object under the prefix
        #[arg(short = 'r', long)]
        recursive: bool,

        /// Number of parallel transfers, 0 means default (S3P_JOBS or 2 x CPUs)
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,

        /// Download this version of the object (not allowed with --recursive)
        #[arg(long, value_name = "ID")]
        version_id: Option<String>,

        /// Skip the directory-traversal checks on local paths derived from object keys
        #[arg(long)]
        no_local_path_check: bool,

        /// s3://bucket/key or s3://bucket/prefix
        #[arg(value_name = "URI")]
        uri: String,

        /// Destination file or directory
        #[arg(value_name = "LOCAL_PATH")]
        local_path: std::path::PathBuf,
    },
    /// Upload files and directory trees under a prefix
    Put {
        /// Number of parallel transfers, 0 means default (S3P_JOBS or 2 x CPUs)
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,

        /// Skip the directory-traversal checks on generated object keys
        #[arg(long)]
        no_local_path_check: bool,

        /// Local files or directories followed by the destination s3://bucket/prefix
        #[arg(value_name = "PATH... URI", num_args = 2.., required = true)]
        paths: Vec<String>,
    },
    /// Print version and build information
    Version,
}

impl Args {
    fn client_config(&self) -> store::s3::ClientConfig {
        store::s3::ClientConfig {
            profile: self.profile.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.path_style,
        }
    }
}

async fn connect(config: &store::s3::ClientConfig) -> Result<store::SharedStore> {
    let store = store::s3::S3Store::connect(config)
        .await
        .map_err(common::Error::Config)?;
    Ok(std::sync::Arc::new(store))
}

async fn list(config: &store::s3::ClientConfig, uri: &str) -> Result<common::Summary> {
    let uri: common::S3Uri = uri.parse()?;
    let store = connect(config).await?;
    let page = store
        .list_objects(&uri.bucket, &uri.key)
        .await
        .map_err(|error| common::Error::remote(format!("failed listing {uri}"), error))?;
    println!("first page results:");
    for entry in &page.entries {
        println!("key={} size={}", entry.key, entry.size);
    }
    if page.truncated {
        tracing::warn!(
            "{} has more than {} objects, only the first page was listed",
            &uri,
            page.entries.len()
        );
    }
    Ok(common::Summary::default())
}

async fn get(
    config: &store::s3::ClientConfig,
    request: common::TransferRequest,
    jobs: Option<usize>,
) -> Result<common::Summary> {
    request.validate()?;
    let store = connect(config).await?;
    let downloader = common::Downloader::new(store, common::jobs::resolve_jobs(jobs));
    downloader.submit(&request).await?;
    Ok(downloader.wait().await?)
}

async fn put(
    config: &store::s3::ClientConfig,
    requests: Vec<common::TransferRequest>,
    jobs: Option<usize>,
) -> Result<common::Summary> {
    for request in &requests {
        request.validate()?;
    }
    let store = connect(config).await?;
    let uploader = common::Uploader::new(store, common::jobs::resolve_jobs(jobs));
    for request in &requests {
        // dropping the uploader on error abandons whatever was already queued
        uploader.submit(request).await?;
    }
    Ok(uploader.wait().await?)
}

#[instrument(skip(args))]
async fn async_main(args: Args) -> Result<common::Summary> {
    let config = args.client_config();
    match args.command {
        Command::List { uri } => list(&config, &uri).await,
        Command::Get {
            recursive,
            jobs,
            version_id,
            no_local_path_check,
            uri,
            local_path,
        } => {
            let uri: common::S3Uri = uri.parse()?;
            let request = common::TransferRequest::download(&uri, local_path)
                .with_recursive(recursive)
                .with_version_id(version_id)
                .with_skip_path_validation(no_local_path_check);
            get(&config, request, jobs).await
        }
        Command::Put {
            jobs,
            no_local_path_check,
            mut paths,
        } => {
            let uri = paths
                .pop()
                .ok_or_else(|| anyhow!("missing destination URI"))?;
            if paths.is_empty() {
                return Err(anyhow!("missing local path to upload"));
            }
            let uri: common::S3Uri = uri.parse()?;
            let requests = paths
                .into_iter()
                .map(|path| {
                    common::TransferRequest::upload(path, &uri)
                        .with_skip_path_validation(no_local_path_check)
                })
                .collect();
            put(&config, requests, jobs).await
        }
        Command::Version => {
            println!("{}", common::version::BuildInfo::current());
            Ok(common::Summary::default())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let res = common::run(output, runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
