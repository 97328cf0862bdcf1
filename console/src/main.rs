//! Practice Console - command shell for the practice administration backend.
//!
//! Each command works on one entity type through an [`EntityReconciler`], so
//! records created while the backend is down are kept on disk and submitted
//! later with `sync`.

use clap::{Parser, Subcommand};
use practice_console::{
    Config, EntityReconciler, FileStorage, FormModal, HttpRemoteStore, ListScreen, RemoteStore,
};
use practice_engine::{
    practice_schema, EntitySchema, KeyValueStorage, LocalFallbackStore, RecordId, Schema,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "practice-console")]
#[command(about = "Practice administration console", long_about = None)]
struct Cli {
    /// Backend base address (overrides PRACTICE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local storage directory (overrides PRACTICE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entity types
    Entities,
    /// Show records, server records first
    List {
        entity: String,
        /// Only show records matching this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Create a record
    Create {
        entity: String,
        /// Field value as name=value
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Edit a record
    Update {
        entity: String,
        id: RecordId,
        /// Field value as name=value
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Delete a record
    Delete { entity: String, id: RecordId },
    /// Show records kept on this device
    Pending { entity: String },
    /// Submit records kept on this device
    Sync { entity: Option<String> },
}

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{text}'")),
    }
}

type Reconciler = EntityReconciler<Arc<HttpRemoteStore>, FileStorage>;

struct App {
    schema: Schema,
    remote: Arc<HttpRemoteStore>,
    config: Config,
}

impl App {
    fn reconciler(&self, entity: &str) -> Result<Reconciler, Box<dyn std::error::Error>> {
        let schema = self.schema.entity(entity)?.clone();
        let storage = FileStorage::open(&self.config.data_dir)?;
        Ok(EntityReconciler::new(
            schema,
            self.remote.clone(),
            LocalFallbackStore::new(storage),
            self.config.retry_policy,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "practice_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing::debug!(
        "Using {} with local storage in {}",
        config.api_url,
        config.data_dir.display()
    );

    let app = App {
        schema: practice_schema(),
        remote: Arc::new(HttpRemoteStore::new(&config.api_url, config.http_timeout)?),
        config,
    };

    match cli.command {
        Commands::Entities => {
            for name in app.schema.names() {
                println!("{}", name);
            }
        }
        Commands::List { entity, filter } => {
            let mut reconciler = app.reconciler(&entity)?;
            let mut screen = ListScreen::new();
            screen.set_filter(filter.unwrap_or_default());

            let loaded = screen.refresh(&mut reconciler).await;
            if let Some(banner) = &screen.banner {
                eprintln!("{}", banner);
            }
            if !loaded {
                return Err("could not load records".into());
            }

            let records = screen.visible(&reconciler);
            print_header(reconciler.schema());
            for record in &records {
                print_record(reconciler.schema(), record);
            }
            println!("{} record(s)", records.len());
        }
        Commands::Create { entity, set } => {
            let mut reconciler = app.reconciler(&entity)?;
            let mut screen = ListScreen::new();
            screen.refresh(&mut reconciler).await;
            if let Some(banner) = &screen.banner {
                eprintln!("{}", banner);
            }

            let mut modal = FormModal::open_create(reconciler.schema());
            apply_inputs(&mut modal, reconciler.schema(), &set)?;
            submit(&mut modal, &mut reconciler).await?;
        }
        Commands::Update { entity, id, set } => {
            let mut reconciler = app.reconciler(&entity)?;
            let mut screen = ListScreen::new();
            screen.refresh(&mut reconciler).await;
            if let Some(banner) = &screen.banner {
                eprintln!("{}", banner);
            }

            // Records missing from the view are left for the server to answer
            let mut modal = match reconciler.current().iter().find(|r| r.id == id) {
                Some(record) => FormModal::open_edit(record),
                None => FormModal::open_edit_by_id(id),
            };
            apply_inputs(&mut modal, reconciler.schema(), &set)?;
            submit(&mut modal, &mut reconciler).await?;
        }
        Commands::Delete { entity, id } => {
            let mut reconciler = app.reconciler(&entity)?;
            let mut screen = ListScreen::new();
            screen.refresh(&mut reconciler).await;

            if !screen.delete(&mut reconciler, id).await {
                let message = screen.banner.unwrap_or_default();
                return Err(message.into());
            }
            println!("Deleted {} {}", entity, id);
        }
        Commands::Pending { entity } => {
            let reconciler = app.reconciler(&entity)?;
            let records = reconciler
                .local_store()
                .load_all(&reconciler.schema().name)?;
            print_header(reconciler.schema());
            for record in &records {
                print_record(reconciler.schema(), record);
            }
            println!("{} record(s) kept on this device", records.len());
        }
        Commands::Sync { entity } => {
            let entities: Vec<String> = match entity {
                Some(entity) => vec![entity],
                None => app.schema.names().map(str::to_string).collect(),
            };

            let mut pending = 0;
            for entity in entities {
                let mut reconciler = app.reconciler(&entity)?;
                if reconciler.local_ids()?.is_empty() {
                    continue;
                }

                reconciler.view().await?;
                let report = reconciler.migrate_pending().await?;
                for (from, to) in &report.migrated {
                    println!("{}: {} -> {}", entity, from, to);
                }
                for id in &report.unidentified {
                    println!("{}: {} -> saved, refresh to see its id", entity, id);
                }
                pending += report.pending.len();
            }

            if pending > 0 {
                println!("{} record(s) still kept on this device", pending);
            } else {
                println!("Everything is on the server");
            }
        }
    }

    Ok(())
}

fn apply_inputs(
    modal: &mut FormModal,
    schema: &EntitySchema,
    inputs: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    for (name, value) in inputs {
        if !modal.set_input(schema, name, value) {
            return Err(modal.error.clone().unwrap_or_default().into());
        }
    }
    Ok(())
}

async fn submit<R, S>(
    modal: &mut FormModal,
    reconciler: &mut EntityReconciler<R, S>,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: RemoteStore,
    S: KeyValueStorage,
{
    match modal.submit(reconciler).await {
        Some(outcome) => {
            if let Some(notice) = &modal.notice {
                eprintln!("{}", notice);
            }
            print_header(reconciler.schema());
            print_record(reconciler.schema(), outcome.record());
            Ok(())
        }
        None => Err(modal.error.clone().unwrap_or_default().into()),
    }
}

fn print_header(schema: &EntitySchema) {
    let mut line = format!("{:>6}  {:<6}", "id", "origin");
    for field in &schema.fields {
        line.push_str(&format!("  {}", field.name));
    }
    println!("{}", line);
}

fn print_record(schema: &EntitySchema, record: &practice_engine::Record) {
    let mut line = format!("{:>6}  {:<6}", record.id, record.origin.to_string());
    for field in &schema.fields {
        line.push_str(&format!("  {}", record.display(&field.name)));
    }
    println!("{}", line);
}
