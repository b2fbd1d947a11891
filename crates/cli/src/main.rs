use clap::{Parser, Subcommand};
use omstorage_core::{
    AppConfig, FileRepository, InMemoryFileRepository, IncomingFile,
    PgFileRepository, UploadRequest, UploadService,
};
use omstorage_files::LocalBlobStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "omstorage")]
#[command(about = "omstorage file upload service CLI")]
struct Cli {
    /// Keep metadata in memory instead of Postgres (dry run; blobs are still written)
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file through the same pipeline as the HTTP API
    Upload {
        /// Project the file belongs to
        project: String,
        /// Path of the file to upload
        path: PathBuf,
        /// Folder inside the project (defaults to "default")
        #[arg(long)]
        folder: Option<String>,
        /// Declared MIME type (guessed from the extension if omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// List a project's files, newest first
    List {
        /// Project to list
        project: String,
        /// Restrict to one folder
        #[arg(long)]
        folder: Option<String>,
    },
    /// Show one file's metadata
    Show {
        /// File id
        id: String,
    },
    /// Create the metadata table and indexes
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("omstorage=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let pg = PgFileRepository::connect_lazy(&config.database);
    let repository: Arc<dyn FileRepository> = if cli.in_memory {
        Arc::new(InMemoryFileRepository::new())
    } else {
        Arc::new(pg.clone())
    };

    match cli.command {
        Some(Commands::Upload {
            project,
            path,
            folder,
            mime,
        }) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
            let original_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mime_type = mime.unwrap_or_else(|| {
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string()
            });

            let service = upload_service(&config, repository).await?;
            let outcome = service
                .upload(UploadRequest {
                    project_id: project,
                    folder,
                    file: Some(IncomingFile {
                        original_name,
                        mime_type,
                        bytes: bytes.into(),
                    }),
                })
                .await?;

            println!("Uploaded {} as {}", path.display(), outcome.id());
            println!("  public url:  {}", outcome.record.public_url);
            if !outcome.record.low_res_url.is_empty() {
                println!("  low-res url: {}", outcome.record.low_res_url);
            }
            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning);
            }
        }
        Some(Commands::List { project, folder }) => {
            let service = upload_service(&config, repository).await?;
            let records = service.list_files(&project, folder.as_deref()).await?;
            if records.is_empty() {
                println!("No files found.");
            } else {
                for record in records {
                    println!(
                        "ID: {}, Folder: {}, Name: {}, Size: {}, Created: {}",
                        record.id,
                        record.folder_name,
                        record.original_name,
                        record.size_bytes,
                        record.created_at.to_rfc3339()
                    );
                }
            }
        }
        Some(Commands::Show { id }) => {
            let service = upload_service(&config, repository).await?;
            let record = service.find_file(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Some(Commands::Migrate) => {
            if cli.in_memory {
                println!("Nothing to migrate for the in-memory repository.");
            } else {
                pg.migrate().await?;
                println!("Metadata schema is up to date.");
            }
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

async fn upload_service(
    config: &AppConfig,
    repository: Arc<dyn FileRepository>,
) -> anyhow::Result<UploadService> {
    let root = config.core.storage_root();
    tracing::debug!(storage_root = %root.display(), "opening blob store");
    tokio::fs::create_dir_all(root).await?;
    let store = LocalBlobStore::new(root)?;
    let core = config
        .core
        .with_storage_root(store.root_directory().to_path_buf());
    Ok(UploadService::new(
        Arc::new(core),
        Arc::new(store),
        repository,
    ))
}
