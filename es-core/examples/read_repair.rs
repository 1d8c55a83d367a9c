//! 读修复与快照保留演示
//!
//! 运行：`RUST_LOG=es_core=debug cargo run -p es-core --example read_repair --features inmemory`
//!
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use es_core::domain_event::{SaveRequest, Snapshot};
use es_core::entity::{Entity, EntityType, FromStrConverter, IdentifierConverter};
use es_core::error::{DomainError, DomainResult};
use es_core::mutation::{DependencyInjector, DeprecatedMutation, Mutation, MutationType};
use es_core::persist::inmemory::{InMemoryEventStorage, InMemorySnapshotStorage};
use es_core::persist::{EventRepository, PersistenceContext, SnapshotRepository};
use es_core::registry::{EntityConfiguration, EntityDescriptor, InMemoryDescriptorRegistry};
use es_core::serializer::{JsonSerializer, Serializer};
use es_core::utility::{ProbabilityArbiter, SeededRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    title: String,
    revision: i64,
}

impl Entity for Document {
    type Id = String;
    type Mutation = DocumentMutation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Retitled {
    title: String,
}

/// v1 标题带有历史遗留的首尾空白
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RetitledV1 {
    raw_title: String,
}

#[derive(Debug, Clone, PartialEq)]
enum DocumentMutation {
    Retitled(Retitled),
    RetitledV1(RetitledV1),
}

impl Mutation for DocumentMutation {
    fn symbol(&self) -> &'static str {
        match self {
            DocumentMutation::Retitled(_) => "Retitled",
            DocumentMutation::RetitledV1(_) => "RetitledV1",
        }
    }

    fn deprecated(&self) -> Option<&dyn DeprecatedMutation<Self>> {
        match self {
            DocumentMutation::RetitledV1(v1) => Some(v1),
            DocumentMutation::Retitled(_) => None,
        }
    }

    fn encode<S>(&self, serializer: &S) -> DomainResult<Vec<u8>>
    where
        S: Serializer,
    {
        match self {
            DocumentMutation::Retitled(retitled) => serializer.serialize(retitled),
            DocumentMutation::RetitledV1(v1) => serializer.serialize(v1),
        }
    }

    fn decode<S>(symbol: &str, payload: &[u8], serializer: &S) -> DomainResult<Self>
    where
        S: Serializer,
    {
        match symbol {
            "Retitled" => serializer
                .deserialize(payload)
                .map(DocumentMutation::Retitled),
            "RetitledV1" => serializer
                .deserialize(payload)
                .map(DocumentMutation::RetitledV1),
            other => Err(DomainError::codec(format!(
                "document has no mutation for symbol {other}"
            ))),
        }
    }
}

#[async_trait]
impl DeprecatedMutation<DocumentMutation> for RetitledV1 {
    async fn upgrade(&self, _injector: &dyn DependencyInjector) -> DomainResult<DocumentMutation> {
        Ok(DocumentMutation::Retitled(Retitled {
            title: self.raw_title.trim().to_string(),
        }))
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "es_core=debug".into()),
        )
        .init();

    let registry = InMemoryDescriptorRegistry::new();
    registry.register(
        EntityDescriptor::<Document>::builder()
            .entity_type(EntityType::of::<Document>("document"))
            .identifier_converter(Arc::new(FromStrConverter::<String>::new()))
            .mutation_types(vec![
                MutationType::new("Retitled", "document.retitled", 2),
                MutationType::new("RetitledV1", "document.retitled", 1),
            ])
            .configuration(
                EntityConfiguration::builder()
                    .event_repair_probability(1.0)
                    .snapshot_history_length(2)
                    .snapshot_cleanup_probability(0.5)
                    .build(),
            )
            .build(),
    )?;

    let context = PersistenceContext::builder()
        .registry(Arc::new(registry))
        .serializer(Arc::new(JsonSerializer))
        .arbiter(ProbabilityArbiter::new(Arc::new(SeededRandom::new(7))))
        .build();

    let event_storage = Arc::new(InMemoryEventStorage::new());
    let snapshot_storage = Arc::new(InMemorySnapshotStorage::new());
    let events = EventRepository::new(&context, event_storage.clone());
    let snapshots = SnapshotRepository::new(&context, snapshot_storage.clone());

    let id = "doc-1".to_string();
    let titles = ["  draft ", "  review", "final  "];
    let mut document = Document::default();

    for (index, title) in titles.iter().enumerate() {
        let sequence_number = index as i64 + 1;
        let saved = events
            .save(
                &SaveRequest::<Document>::builder()
                    .id(id.clone())
                    .mutation(DocumentMutation::RetitledV1(RetitledV1 {
                        raw_title: title.to_string(),
                    }))
                    .sequence_number(sequence_number)
                    .occurred_at(Utc::now())
                    .build(),
            )
            .await?;
        println!("saved v1 event #{sequence_number}: {saved}");
    }

    // 每次 list 最多修复一个事件
    for round in 1..=titles.len() {
        let listed = events.list::<Document>(&id, 0, 10).await?;
        let printed: Vec<_> = listed
            .iter()
            .map(|event| event.mutation_type().to_string())
            .collect();
        println!("list round {round}: {printed:?}");
    }

    for event in events.list::<Document>(&id, 0, 10).await? {
        if let DocumentMutation::Retitled(retitled) = event.mutation() {
            document.title = retitled.title.clone();
        }
        document.revision = event.sequence_number();

        let snapshot = Snapshot::<Document>::builder()
            .entity_type(EntityType::of::<Document>("document"))
            .entity_id(FromStrConverter::<String>::new().identifier(&id))
            .sequence_number(event.sequence_number())
            .entity_version(event.sequence_number())
            .entity(document.clone())
            .event_occurred_at(event.occurred_at())
            .event_acknowledged_at(event.acknowledged_at())
            .entity_created_at(event.occurred_at())
            .created_at(Utc::now())
            .build();
        snapshots.save(&snapshot).await?;
    }

    println!(
        "retained snapshots: {:?}",
        snapshot_storage.sequence_numbers("document", &id)
    );
    if let Some(last) = snapshots.get_last::<Document>(&id).await? {
        println!("current state: {:?}", last.entity());
    }
    println!("replace calls: {}", event_storage.calls("replace"));
    Ok(())
}
