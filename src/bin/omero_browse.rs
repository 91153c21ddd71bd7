use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use omero_browse::browser::{Browser, LocalMetadata};
use omero_browse::config::{ConfigLoader, ResolvedConfig};
use omero_browse::domain::{ObjectKind, Owner, RemoteObject};
use omero_browse::error::BrowseError;
use omero_browse::events::BrowseEvent;
use omero_browse::filter::Filter;
use omero_browse::metadata::MergePolicy;
use omero_browse::omero::OmeroHttpClient;
use omero_browse::output::{JsonOutput, OutputMode, TreeNode};
use omero_browse::repository::Credentials;
use omero_browse::uri::{parse_object_uri, parse_server_uri};

#[derive(Parser)]
#[command(name = "omero-browse")]
#[command(about = "Browse an OMERO server and sync key/value pairs and tags")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Print the project/screen hierarchy")]
    Tree(TreeArgs),
    #[command(about = "Read or push key/value pairs and tags")]
    Annotations(AnnotationsArgs),
    #[command(about = "Show the server and object a web client link points to")]
    Uri(UriArgs),
}

#[derive(Args)]
struct TreeArgs {
    #[arg(long, default_value_t = 2)]
    depth: usize,

    #[arg(long, help = "Owner id, or \"all\" for every member of the group")]
    owner: Option<String>,

    #[arg(long)]
    group: Option<i64>,

    #[arg(long, default_value = "")]
    filter: String,

    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[derive(Args)]
struct AnnotationsArgs {
    #[command(subcommand)]
    command: AnnotationsCommand,
}

#[derive(Subcommand)]
enum AnnotationsCommand {
    #[command(about = "Show annotations of an object")]
    Show { object: String },
    #[command(about = "Push annotations from a JSON file")]
    Push(PushArgs),
}

#[derive(Args)]
struct PushArgs {
    object: String,

    #[arg(long)]
    file: String,

    #[arg(long)]
    kv_policy: Option<MergePolicy>,

    #[arg(long)]
    tag_policy: Option<MergePolicy>,
}

#[derive(Args)]
struct UriArgs {
    uri: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<BrowseError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BrowseError) -> u8 {
    match error {
        BrowseError::BadCredentials(_)
        | BrowseError::NoAccess(_)
        | BrowseError::BadUrl(_)
        | BrowseError::NotLoggedIn => 2,
        BrowseError::Unreachable(_) | BrowseError::Http(_) | BrowseError::Status { .. } => 3,
        BrowseError::AmbiguousKeys(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match cli.command {
        Commands::Uri(args) => run_uri(args, output_mode),
        Commands::Tree(args) => {
            let browser = connect(&cli.server, &cli.username, &config)?;
            let result = run_tree(&browser, args, output_mode);
            browser.logout()?;
            result
        }
        Commands::Annotations(args) => {
            let browser = connect(&cli.server, &cli.username, &config)?;
            let result = run_annotations(&browser, args, &config, output_mode);
            browser.logout()?;
            result
        }
    }
}

fn connect(
    server: &Option<String>,
    username: &Option<String>,
    config: &ResolvedConfig,
) -> miette::Result<Browser> {
    let server = server
        .clone()
        .or_else(|| config.server.clone())
        .ok_or_else(|| miette::Report::msg("no server given (use --server or the config file)"))?;
    let username = username
        .clone()
        .or_else(|| config.username.clone())
        .ok_or_else(|| miette::Report::msg("no username given (use --username)"))?;
    let password = std::env::var("OMERO_PASSWORD")
        .map_err(|_| miette::Report::msg("set OMERO_PASSWORD to log in"))?;

    let client = OmeroHttpClient::new(config.request_timeout_secs)?;
    let credentials = Credentials {
        server,
        username,
        password,
    };
    Ok(Browser::connect(Arc::new(client), &credentials, config)?)
}

fn run_uri(args: UriArgs, output_mode: OutputMode) -> miette::Result<()> {
    let server = parse_server_uri(&args.uri)?;
    let object = parse_object_uri(&args.uri).ok();
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&serde_json::json!({
            "server": server,
            "object": object,
        }))
        .into_diagnostic()?,
        OutputMode::Text => {
            println!("server: {server}");
            if let Some(object) = object {
                println!("object: {object}");
            }
        }
    }
    Ok(())
}

fn run_tree(browser: &Browser, args: TreeArgs, output_mode: OutputMode) -> miette::Result<()> {
    if let Some(group_id) = args.group {
        if !browser.switch_group(group_id)? {
            warn!(group_id, "not a member of group, staying in current group");
        }
    }
    match args.owner.as_deref() {
        Some("all") => browser.select_owner(Owner::all_members()),
        Some(id) => {
            let id = id.parse::<i64>().into_diagnostic()?;
            browser.select_owner(Owner::new(id, format!("user {id}")));
        }
        None => {}
    }

    let filter = Filter::new(
        browser.session().active_group(),
        browser.selected_owner(),
        &args.filter,
    );
    let events = browser.subscribe();
    let timeout = Duration::from_secs(args.timeout_secs);
    let tree = load_tree(browser, &browser.root(), &filter, args.depth, &events, timeout)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_tree(&tree).into_diagnostic()?,
        OutputMode::Text => tree
            .write_text(&mut std::io::stdout(), 0)
            .into_diagnostic()?,
    }
    Ok(())
}

fn load_tree(
    browser: &Browser,
    node: &Arc<RemoteObject>,
    filter: &Filter,
    depth: usize,
    events: &Receiver<BrowseEvent>,
    timeout: Duration,
) -> miette::Result<TreeNode> {
    let mut tree = TreeNode::leaf(node);
    if depth == 0 || browser.is_leaf(node) {
        return Ok(tree);
    }
    for child in filter.apply(&wait_for_children(browser, node, events, timeout)?) {
        tree.children
            .push(load_tree(browser, &child, filter, depth - 1, events, timeout)?);
    }
    Ok(tree)
}

fn wait_for_children(
    browser: &Browser,
    node: &Arc<RemoteObject>,
    events: &Receiver<BrowseEvent>,
    timeout: Duration,
) -> miette::Result<Vec<Arc<RemoteObject>>> {
    let children = browser.children(node);
    if node.kind() == ObjectKind::OrphanedFolder {
        return Ok(children);
    }
    let key = browser.key_of(node);
    loop {
        if browser.cache().is_loaded(&key) {
            return Ok(browser.children(node));
        }
        match events.recv_timeout(timeout) {
            Ok(BrowseEvent::FetchFailed { key: failed, message }) if failed == key => {
                warn!("{}: {message}", node.name());
                return Ok(Vec::new());
            }
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                return Err(miette::Report::msg(format!(
                    "timed out loading children of {}",
                    node.name()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(Vec::new()),
        }
    }
}

fn run_annotations(
    browser: &Browser,
    args: AnnotationsArgs,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match args.command {
        AnnotationsCommand::Show { object } => {
            let object = parse_object_uri(&object)?;
            let metadata = browser.pull_metadata(object)?;
            if !metadata.duplicate_keys.is_empty() {
                warn!(keys = ?metadata.duplicate_keys, "keys present more than once");
            }
            match output_mode {
                OutputMode::Json => JsonOutput::print_metadata(&metadata).into_diagnostic()?,
                OutputMode::Text => {
                    println!("{}", browser.object_uri(object)?);
                    for (key, value) in &metadata.key_values {
                        println!("  {key} = {value}");
                    }
                    for tag in &metadata.tags {
                        println!("  #{}", tag.name);
                    }
                }
            }
        }
        AnnotationsCommand::Push(push) => {
            let object = parse_object_uri(&push.object)?;
            let content = fs::read_to_string(&push.file)
                .map_err(|err| BrowseError::Filesystem(format!("{}: {err}", push.file)))?;
            let local: LocalMetadata = serde_json::from_str(&content)
                .map_err(|err| BrowseError::ConfigParse(err.to_string()))?;
            let report = browser.push_metadata(
                object,
                &local,
                push.kv_policy.unwrap_or(config.key_value_policy),
                push.tag_policy.unwrap_or(config.tag_policy),
            )?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_push(&report).into_diagnostic()?,
                OutputMode::Text => {
                    println!("key/value pairs: {}", report.key_values);
                    println!("tags: {}", report.tags);
                }
            }
        }
    }
    Ok(())
}
