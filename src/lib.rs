//! formgate: a REST persistence gateway for forms.
//!
//! formgate exposes form definitions, form data, drafts and their attachments as
//! REST resources and keeps them in a tagged document store.
//!
//! # Request path
//!
//! ```text
//! PUT /crud/acme/invoice/data/42/data.xml
//!   → resolve   ResourceRef::FormData { app: acme, form: invoice, id: 42, draft: false }
//!   → map       /orbeon/fr/acme/invoice/data/42.xml
//!               {orbeon/fr, app/acme, form/invoice, formdata, 42formdataxml}
//!   → store     DocumentStore::write_document
//! ```
//!
//! Searches (`POST /search/{app}/{form}`) are always confined to the collection
//! tags of one (app, form) pair, so a query can never see another form's data.
//!
//! # Examples
//!
//! ```bash
//! # Serve with an on-disk SQLite store
//! formgate serve --db forms.db
//!
//! # Serve a throwaway in-memory store with debug logs
//! formgate serve --memory -v
//!
//! # Inspect how a path maps to storage
//! formgate resolve PUT /crud/acme/invoice/draft/7/scan.png
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: errors, configuration, logging and the document store backends
//! - [`gateway`]: resolver, address mapper, operations, dispatcher and HTTP server

pub mod core;
pub mod gateway;

mod cli;

use cli::{Cli, Command, InitDbCli, ResolveCli, ServeCli};
use crate::core::config::{GatewayConfig, load_config};
use crate::core::error::FormgateError;
use crate::core::memory::MemoryStore;
use crate::core::sqlite::SqliteStore;
use crate::core::store::{DocumentStore, StoreKind};
use crate::core::{db, logging};
use crate::gateway::address::AddressMapper;
use crate::gateway::dispatch::Dispatcher;
use crate::gateway::resolve::{Method, resolve};
use crate::gateway::resource::Route;
use crate::gateway::server::GatewayServer;

use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

pub fn run() -> Result<(), FormgateError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args),
        Command::InitDb(args) => init_db(args),
        Command::Resolve(args) => resolve_path(args),
    }
}

/// Build the configured Document Store backend.
pub fn open_store(config: &GatewayConfig) -> Result<Arc<dyn DocumentStore>, FormgateError> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.store.path)?),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

fn serve(args: ServeCli) -> Result<(), FormgateError> {
    logging::init(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db) = args.db {
        config.store.backend = StoreKind::Sqlite;
        config.store.path = db;
    }
    if args.memory {
        config.store.backend = StoreKind::Memory;
    }
    config.validate()?;

    let store = open_store(&config)?;
    match config.store.backend {
        StoreKind::Sqlite => {
            tracing::info!(path = %config.store.path.display(), "using sqlite document store")
        }
        StoreKind::Memory => tracing::warn!("using in-memory document store; data is not persisted"),
    }

    let dispatcher = Arc::new(Dispatcher::new(store, &config));
    let server = GatewayServer::bind(&config.server.bind, dispatcher, config.server.workers)
        .map_err(|e| FormgateError::ServerError(e.to_string()))?;
    println!("formgate listening on http://{}", server.addr());
    server
        .run()
        .map_err(|e| FormgateError::ServerError(format!("{e:#}")))
}

fn init_db(args: InitDbCli) -> Result<(), FormgateError> {
    let config = load_config(args.config.as_deref())?;
    let path = args.db.unwrap_or(config.store.path);
    db::initialize_document_db(&path)?;
    println!("{} {}", "initialized".green(), path.display());
    Ok(())
}

fn resolve_path(args: ResolveCli) -> Result<(), FormgateError> {
    let probe = GatewayConfig {
        namespace: args.namespace.clone(),
        ..GatewayConfig::default()
    };
    probe.validate()?;

    let method = Method::from(args.method.to_ascii_uppercase().as_str());
    let route = resolve(&method, &args.path).map_err(|e| {
        FormgateError::ValidationError(format!("{} ({}, HTTP {})", e, e.code(), e.status()))
    })?;
    let mapper = AddressMapper::new(args.namespace);

    let (location, tags) = match &route {
        Route::Resource(resource) => {
            let (location, tags) = mapper.map(resource);
            (Some(location), tags)
        }
        Route::Search(scope) => (None, mapper.search_tags(scope)),
    };

    if args.format == "json" {
        let out = serde_json::json!({
            "route": route,
            "location": location,
            "tags": tags,
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| FormgateError::ValidationError(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    match &route {
        Route::Resource(resource) => {
            println!("{:<10} {}", "kind".bold(), resource.kind().to_string().as_str().cyan());
            println!("{:<10} {}", "scope".bold(), resource.scope());
            if let Some(id) = resource.document_id() {
                println!("{:<10} {}", "id".bold(), id);
            }
            if let Some(name) = resource.attachment_name() {
                println!("{:<10} {}", "name".bold(), name);
            }
            println!("{:<10} {}", "draft".bold(), resource.is_draft());
        }
        Route::Search(scope) => {
            println!("{:<10} {}", "kind".bold(), "search".cyan());
            println!("{:<10} {}", "scope".bold(), scope);
        }
    }
    if let Some(location) = location {
        println!("{:<10} {}", "location".bold(), location.as_str().green());
    }
    let tags: Vec<&str> = tags.iter().collect();
    println!("{:<10} {}", "tags".bold(), tags.join(", ").as_str().yellow());
    Ok(())
}
