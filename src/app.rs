//! Wiring of stores, caches, engine and runner from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use topicron_config::{Backend, Config, ConfigLoader};
use topicron_core::{
    HandlerRegistry, LoggingTopicHandler, ResourceCache, ScheduleCache, ScheduleEventService,
    ScheduleManager, StrategyRegistry, TopicDispatcher,
};
use topicron_engine::{EngineRunner, EngineScheduler, MemoryEngine, SqliteEngine};
use topicron_protocols::{JobEngine, ResourceRepository, ScheduleRepository, Topic};
use topicron_store::{MemoryResourceRepository, MemoryScheduleRepository, SqliteStore};

type Repositories = (Arc<dyn ScheduleRepository>, Arc<dyn ResourceRepository>);

/// Everything `run` needs, assembled but not started.
pub(crate) struct App {
    pub manager: Arc<ScheduleManager>,
    pub handlers: Arc<HandlerRegistry>,
    pub runner: Arc<EngineRunner>,
}

impl App {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let (schedule_repo, resource_repo) = open_store(config).await?;
        let engine = open_engine(config).await?;

        let scheduler = Arc::new(EngineScheduler::new(engine.clone()));
        let indexed = scheduler.rebuild_index().await?;
        info!(engine = engine.name(), jobs = indexed, "Engine ready");

        let events = ScheduleEventService::new(
            Arc::new(StrategyRegistry::with_defaults()),
            scheduler,
        )
        .with_update_policy(config.engine.update_policy);

        let resources = Arc::new(ResourceCache::new(resource_repo));
        let schedules = Arc::new(ScheduleCache::new(schedule_repo, resources));
        let manager = Arc::new(ScheduleManager::new(schedules, events));

        let handlers = Arc::new(HandlerRegistry::new());
        for handler in &config.handlers {
            let topics = handler.topics.iter().map(|t| Topic::from(t.as_str())).collect();
            handlers.register(Arc::new(LoggingTopicHandler::new(handler.id.clone(), topics)))?;
        }
        info!("Registered {} topic handler(s)", handlers.len());

        let dispatcher = Arc::new(TopicDispatcher::new(handlers.clone()));
        let runner = Arc::new(
            EngineRunner::new(engine, dispatcher)
                .with_tick_interval(Duration::from_millis(config.engine.tick_interval_ms)),
        );

        Ok(Self {
            manager,
            handlers,
            runner,
        })
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Repositories> {
    match config.store.backend {
        Backend::Memory => {
            let schedules: Arc<dyn ScheduleRepository> = Arc::new(MemoryScheduleRepository::new());
            let resources: Arc<dyn ResourceRepository> = Arc::new(MemoryResourceRepository::new());
            Ok((schedules, resources))
        }
        Backend::Sqlite => {
            let path = ConfigLoader::expand_path(&config.store.path);
            ensure_parent(Path::new(&path))?;
            let store = Arc::new(SqliteStore::open(&path).await?);
            info!(path = %path, "Opened sqlite store");
            let schedules: Arc<dyn ScheduleRepository> = store.clone();
            let resources: Arc<dyn ResourceRepository> = store;
            Ok((schedules, resources))
        }
    }
}

async fn open_engine(config: &Config) -> anyhow::Result<Arc<dyn JobEngine>> {
    let engine: Arc<dyn JobEngine> = match config.engine.backend {
        Backend::Memory => Arc::new(MemoryEngine::new()),
        Backend::Sqlite => {
            let path = ConfigLoader::expand_path(&config.engine.path);
            ensure_parent(Path::new(&path))?;
            Arc::new(SqliteEngine::open(&path).await?)
        }
    };
    Ok(engine)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
