//! SignupEngine operator console
//!
//! Drives the sign-up engine in-process from stdin, one command per line.
//! Runs against Postgres by default, or against the in-memory store with
//! `--in-memory`.

use anyhow::{anyhow, bail, Context};
use chrono::{Duration, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use SignupEngine::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, MemorySignUpStore},
    models::{CapacityPolicy, CreateEventRequest, CreateSlotRequest, Event, Slot},
    services::ServiceFactory,
    utils::logging,
    SignupError,
};

const HELP: &str = "\
commands:
  event <name> <capacity>[,<capacity>...]   create an event (one slot per capacity)
  signup <user> <event> [slot]              sign a user up
  retract <user> <event>                    withdraw a user's own sign-up
  remove <actor> <event> <user>             withdraw another user's sign-up
  availability <event>                      per-slot capacity snapshot
  status <user> <event>                     latest sign-up of a user
  list <actor> <event>                      all sign-ups of an event
  help | quit";

/// Where events are created; sign-ups always go through the engine
enum Backend {
    Postgres(DatabaseService),
    Memory(MemorySignUpStore),
}

impl Backend {
    async fn create_event(&self, request: CreateEventRequest) -> Result<(Event, Vec<Slot>), SignupError> {
        match self {
            Backend::Postgres(database) => database.create_event(request).await,
            Backend::Memory(store) => store.create_event(request),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load settings")?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", SignupEngine::info());

    let in_memory = std::env::args().any(|arg| arg == "--in-memory");
    let (backend, services) = if in_memory {
        info!("Using in-memory store");
        let store = MemorySignUpStore::new();
        let services = ServiceFactory::in_memory(&settings, store.clone());
        (Backend::Memory(store), services)
    } else {
        info!("Connecting to database...");
        let pool = create_pool(&settings.database, &settings.engine).await?;
        run_migrations(&pool).await?;
        let database = DatabaseService::new(pool);
        let services = ServiceFactory::with_database(&settings, &database);
        (Backend::Postgres(database), services)
    };

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied() {
            None => continue,
            Some("quit") | Some("exit") => break,
            Some("help") => println!("{}", HELP),
            Some(_) => {
                if let Err(e) = run_command(&parts, &backend, &services).await {
                    match e.downcast_ref::<SignupError>() {
                        Some(engine_error) => println!("error: {}", engine_error.public_message()),
                        None => println!("error: {:#}", e),
                    }
                }
            }
        }
    }

    let stats = services.notification_service.stats();
    info!(sent = stats.total_sent, failed = stats.total_failed, "Console closed");
    Ok(())
}

fn id_arg(parts: &[&str], index: usize, name: &str) -> anyhow::Result<i64> {
    let raw = parts.get(index).ok_or_else(|| anyhow!("missing <{}>", name))?;
    raw.parse().with_context(|| format!("<{}> must be an integer, got '{}'", name, raw))
}

async fn run_command(parts: &[&str], backend: &Backend, services: &ServiceFactory) -> anyhow::Result<()> {
    let engine = &services.sign_up_service;

    match parts.first().copied().unwrap_or_default() {
        "event" => {
            let name = parts.get(1).ok_or_else(|| anyhow!("missing <name>"))?.to_string();
            let capacities = parts
                .get(2)
                .ok_or_else(|| anyhow!("missing <capacity>"))?
                .split(',')
                .map(|c| c.parse::<i32>().with_context(|| format!("bad capacity '{}'", c)))
                .collect::<anyhow::Result<Vec<i32>>>()?;
            let capacity = match capacities.as_slice() {
                [single] => CapacityPolicy::Single { capacity: *single },
                many => CapacityPolicy::Slots(
                    many.iter()
                        .enumerate()
                        .map(|(i, capacity)| CreateSlotRequest {
                            name: format!("{} #{}", name, i + 1),
                            capacity: *capacity,
                        })
                        .collect(),
                ),
            };
            let start = Utc::now() + Duration::days(7);
            let (event, slots) = backend
                .create_event(CreateEventRequest {
                    organization_id: None,
                    name,
                    description: None,
                    start_time: start,
                    end_time: start + Duration::hours(3),
                    signup_opens_at: None,
                    signup_closes_at: None,
                    created_by: None,
                    capacity,
                })
                .await?;
            println!("{}", serde_json::to_string(&event)?);
            println!("{}", serde_json::to_string(&slots)?);
        }
        "signup" => {
            let user_id = id_arg(parts, 1, "user")?;
            let event_id = id_arg(parts, 2, "event")?;
            let sign_up = match parts.get(3) {
                Some(_) => engine.sign_up_for_slot(user_id, event_id, id_arg(parts, 3, "slot")?).await?,
                None => engine.sign_up(user_id, event_id).await?,
            };
            println!("{}", serde_json::to_string(&sign_up)?);
        }
        "retract" => {
            let withdrawal = engine.retract_sign_up(id_arg(parts, 1, "user")?, id_arg(parts, 2, "event")?).await?;
            println!("{}", serde_json::to_string(&withdrawal.withdrawn)?);
            if let Some(promoted) = withdrawal.promoted {
                println!("promoted: {}", serde_json::to_string(&promoted)?);
            }
        }
        "remove" => {
            let withdrawal = engine
                .remove_sign_up(id_arg(parts, 1, "actor")?, id_arg(parts, 2, "event")?, id_arg(parts, 3, "user")?)
                .await?;
            println!("{}", serde_json::to_string(&withdrawal.withdrawn)?);
            if let Some(promoted) = withdrawal.promoted {
                println!("promoted: {}", serde_json::to_string(&promoted)?);
            }
        }
        "availability" => {
            let availability = engine.get_availability(id_arg(parts, 1, "event")?).await?;
            println!("{}", serde_json::to_string_pretty(&availability)?);
        }
        "status" => {
            match engine.get_sign_up(id_arg(parts, 1, "user")?, id_arg(parts, 2, "event")?).await? {
                Some(sign_up) => println!("{}", serde_json::to_string(&sign_up)?),
                None => println!("not signed up"),
            }
        }
        "list" => {
            for sign_up in engine.list_sign_ups(id_arg(parts, 1, "actor")?, id_arg(parts, 2, "event")?).await? {
                println!("{}", serde_json::to_string(&sign_up)?);
            }
        }
        other => {
            warn!(command = other, "Unknown console command");
            bail!("unknown command '{}', try 'help'", other);
        }
    }

    Ok(())
}
