//! 单元测试共享夹具：计数器实体及其新旧两种增量变更
//!
use crate::{
    domain_event::Snapshot,
    entity::{Entity, EntityType, FromStrConverter, IdentifierConverter},
    error::{DomainError, DomainResult},
    mutation::{
        Dependencies, DependencyInjector, DependencyInjectorExt, DeprecatedMutation, Mutation,
        MutationType,
    },
    persist::{PersistenceContext, SerializedEvent, SerializedSnapshot},
    registry::{EntityConfiguration, EntityDescriptor, InMemoryDescriptorRegistry},
    serializer::{JsonSerializer, Serializer},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub value: i64,
}

impl Entity for Counter {
    type Id = String;
    type Mutation = CounterMutation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Increment {
    pub by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyIncrement {
    pub amount: i64,
}

/// 上抬时的放大倍数
pub struct Multiplier(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub enum CounterMutation {
    Increment(Increment),
    LegacyIncrement(LegacyIncrement),
}

impl CounterMutation {
    pub fn increment(by: i64) -> Self {
        CounterMutation::Increment(Increment { by })
    }

    pub fn legacy(amount: i64) -> Self {
        CounterMutation::LegacyIncrement(LegacyIncrement { amount })
    }
}

impl Mutation for CounterMutation {
    fn symbol(&self) -> &'static str {
        match self {
            CounterMutation::Increment(_) => "Increment",
            CounterMutation::LegacyIncrement(_) => "LegacyIncrement",
        }
    }

    fn deprecated(&self) -> Option<&dyn DeprecatedMutation<Self>> {
        match self {
            CounterMutation::LegacyIncrement(legacy) => Some(legacy),
            CounterMutation::Increment(_) => None,
        }
    }

    fn encode<S>(&self, serializer: &S) -> DomainResult<Vec<u8>>
    where
        S: Serializer,
    {
        match self {
            CounterMutation::Increment(increment) => serializer.serialize(increment),
            CounterMutation::LegacyIncrement(legacy) => serializer.serialize(legacy),
        }
    }

    fn decode<S>(symbol: &str, payload: &[u8], serializer: &S) -> DomainResult<Self>
    where
        S: Serializer,
    {
        match symbol {
            "Increment" => serializer
                .deserialize(payload)
                .map(CounterMutation::Increment),
            "LegacyIncrement" => serializer
                .deserialize(payload)
                .map(CounterMutation::LegacyIncrement),
            other => Err(DomainError::codec(format!(
                "counter has no mutation for symbol {other}"
            ))),
        }
    }
}

#[async_trait]
impl DeprecatedMutation<CounterMutation> for LegacyIncrement {
    async fn upgrade(&self, injector: &dyn DependencyInjector) -> DomainResult<CounterMutation> {
        let factor = injector.get::<Multiplier>().map_or(1, |m| m.0);
        let by = self.amount.checked_mul(factor).ok_or_else(|| {
            DomainError::upgrade(format!("increment {} x {factor} overflows", self.amount))
        })?;
        Ok(CounterMutation::increment(by))
    }
}

pub fn counter_mutation_types() -> Vec<MutationType> {
    vec![
        MutationType::new("Increment", "increment", 2),
        MutationType::new("LegacyIncrement", "increment", 1),
    ]
}

pub fn counter_descriptor(configuration: EntityConfiguration) -> EntityDescriptor<Counter> {
    descriptor_with(configuration, counter_mutation_types())
}

fn descriptor_with(
    configuration: EntityConfiguration,
    mutation_types: Vec<MutationType>,
) -> EntityDescriptor<Counter> {
    EntityDescriptor::<Counter>::builder()
        .entity_type(EntityType::of::<Counter>("counter"))
        .identifier_converter(Arc::new(FromStrConverter::<String>::new()))
        .mutation_types(mutation_types)
        .configuration(configuration)
        .build()
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// 随机抽样固定为 0.5，时间源固定为 `fixed_time() + 1s`
pub fn context(configuration: EntityConfiguration) -> PersistenceContext<JsonSerializer> {
    context_with_mutation_types(configuration, counter_mutation_types())
}

pub fn context_with_mutation_types(
    configuration: EntityConfiguration,
    mutation_types: Vec<MutationType>,
) -> PersistenceContext<JsonSerializer> {
    build_context(configuration, mutation_types, Dependencies::new())
}

pub fn context_with_dependencies(
    configuration: EntityConfiguration,
    dependencies: Dependencies,
) -> PersistenceContext<JsonSerializer> {
    build_context(configuration, counter_mutation_types(), dependencies)
}

fn build_context(
    configuration: EntityConfiguration,
    mutation_types: Vec<MutationType>,
    dependencies: Dependencies,
) -> PersistenceContext<JsonSerializer> {
    let registry = InMemoryDescriptorRegistry::new();
    registry
        .register(descriptor_with(configuration, mutation_types))
        .unwrap();

    PersistenceContext::builder()
        .registry(Arc::new(registry))
        .serializer(Arc::new(JsonSerializer))
        .time_source(Arc::new(|| fixed_time() + Duration::seconds(1)))
        .arbiter(crate::utility::ProbabilityArbiter::new(Arc::new(|| 0.5)))
        .injector(Arc::new(dependencies))
        .build()
}

/// 以旧表示（increment@v1）存储的事件
pub fn serialized_event(id: &str, sequence_number: i64) -> SerializedEvent {
    serialized_legacy(id, sequence_number, 1)
}

pub fn serialized_legacy(id: &str, sequence_number: i64, amount: i64) -> SerializedEvent {
    SerializedEvent::builder()
        .entity_type("counter".to_string())
        .entity_id(id.to_string())
        .sequence_number(sequence_number)
        .mutation_type("increment".to_string())
        .mutation_version(1)
        .payload(serde_json::to_vec(&LegacyIncrement { amount }).unwrap())
        .occurred_at(fixed_time())
        .acknowledged_at(fixed_time())
        .build()
}

pub fn counter_snapshot(id: &str, sequence_number: i64) -> Snapshot<Counter> {
    Snapshot::<Counter>::builder()
        .entity_type(EntityType::of::<Counter>("counter"))
        .entity_id(FromStrConverter::<String>::new().identifier(&id.to_string()))
        .sequence_number(sequence_number)
        .entity_version(sequence_number)
        .entity(Counter {
            value: sequence_number,
        })
        .event_occurred_at(fixed_time())
        .event_acknowledged_at(fixed_time())
        .entity_created_at(fixed_time())
        .created_at(fixed_time())
        .build()
}

pub fn serialized_snapshot(id: &str, sequence_number: i64) -> SerializedSnapshot {
    SerializedSnapshot::builder()
        .entity_type("counter".to_string())
        .entity_id(id.to_string())
        .sequence_number(sequence_number)
        .entity_version(sequence_number)
        .payload(
            serde_json::to_vec(&Counter {
                value: sequence_number,
            })
            .unwrap(),
        )
        .event_occurred_at(fixed_time())
        .event_acknowledged_at(fixed_time())
        .entity_created_at(fixed_time())
        .created_at(fixed_time())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multiplier_scales_upgrade() {
        let legacy = LegacyIncrement { amount: 3 };
        assert_eq!(
            legacy.upgrade(&Dependencies::new()).await.unwrap(),
            CounterMutation::increment(3)
        );

        let deps = Dependencies::new().with(Multiplier(10));
        assert_eq!(
            legacy.upgrade(&deps).await.unwrap(),
            CounterMutation::increment(30)
        );

        let overflowing = Dependencies::new().with(Multiplier(i64::MAX));
        assert!(matches!(
            LegacyIncrement { amount: 2 }.upgrade(&overflowing).await,
            Err(DomainError::Upgrade { .. })
        ));
    }

    #[test]
    fn payload_carries_only_the_variant_value() {
        let payload = CounterMutation::legacy(4).encode(&JsonSerializer).unwrap();
        assert_eq!(payload, br#"{"amount":4}"#.to_vec());

        let decoded =
            CounterMutation::decode("LegacyIncrement", &payload, &JsonSerializer).unwrap();
        assert_eq!(decoded, CounterMutation::legacy(4));
        assert!(matches!(
            CounterMutation::decode("Reset", &payload, &JsonSerializer),
            Err(DomainError::Codec { .. })
        ));
    }
}
