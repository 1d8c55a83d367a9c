#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use es_core::domain_event::{SaveRequest, Snapshot};
use es_core::entity::{Entity, EntityType, FromStrConverter, IdentifierConverter};
use es_core::error::{DomainError, DomainResult};
use es_core::mutation::{
    DependencyInjector, DependencyInjectorExt, DeprecatedMutation, Mutation, MutationType,
};
use es_core::persist::PersistenceContext;
use es_core::registry::{EntityConfiguration, EntityDescriptor, InMemoryDescriptorRegistry};
use es_core::serializer::{JsonSerializer, Serializer};
use es_core::utility::ProbabilityArbiter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance_cents: i64,
}

impl Entity for Wallet {
    type Id = Uuid;
    type Mutation = WalletMutation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposited {
    pub amount_cents: i64,
}

/// 旧版存款以整单位记录金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDeposited {
    pub amount: i64,
}

/// 每单位对应的分值，缺省为 100
pub struct CentsPerUnit(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub enum WalletMutation {
    Deposited(Deposited),
    LegacyDeposited(LegacyDeposited),
}

impl WalletMutation {
    pub fn deposit(amount_cents: i64) -> Self {
        WalletMutation::Deposited(Deposited { amount_cents })
    }

    pub fn legacy(amount: i64) -> Self {
        WalletMutation::LegacyDeposited(LegacyDeposited { amount })
    }
}

impl Mutation for WalletMutation {
    fn symbol(&self) -> &'static str {
        match self {
            WalletMutation::Deposited(_) => "Deposited",
            WalletMutation::LegacyDeposited(_) => "LegacyDeposited",
        }
    }

    fn deprecated(&self) -> Option<&dyn DeprecatedMutation<Self>> {
        match self {
            WalletMutation::LegacyDeposited(legacy) => Some(legacy),
            WalletMutation::Deposited(_) => None,
        }
    }

    fn encode<S>(&self, serializer: &S) -> DomainResult<Vec<u8>>
    where
        S: Serializer,
    {
        match self {
            WalletMutation::Deposited(deposited) => serializer.serialize(deposited),
            WalletMutation::LegacyDeposited(legacy) => serializer.serialize(legacy),
        }
    }

    fn decode<S>(symbol: &str, payload: &[u8], serializer: &S) -> DomainResult<Self>
    where
        S: Serializer,
    {
        match symbol {
            "Deposited" => serializer
                .deserialize(payload)
                .map(WalletMutation::Deposited),
            "LegacyDeposited" => serializer
                .deserialize(payload)
                .map(WalletMutation::LegacyDeposited),
            other => Err(DomainError::codec(format!(
                "wallet has no mutation for symbol {other}"
            ))),
        }
    }
}

#[async_trait]
impl DeprecatedMutation<WalletMutation> for LegacyDeposited {
    async fn upgrade(&self, injector: &dyn DependencyInjector) -> DomainResult<WalletMutation> {
        let cents = injector.get::<CentsPerUnit>().map_or(100, |rate| rate.0);
        Ok(WalletMutation::deposit(self.amount * cents))
    }
}

pub fn wallet_mutation_types() -> Vec<MutationType> {
    vec![
        MutationType::new("Deposited", "wallet.deposited", 2),
        MutationType::new("LegacyDeposited", "wallet.deposited", 1),
    ]
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn context(configuration: EntityConfiguration) -> PersistenceContext<JsonSerializer> {
    context_with(configuration, wallet_mutation_types())
}

/// 抽样固定为 0.5：概率 >= 0.5 的维护动作总会执行
pub fn context_with(
    configuration: EntityConfiguration,
    mutation_types: Vec<MutationType>,
) -> PersistenceContext<JsonSerializer> {
    let registry = InMemoryDescriptorRegistry::new();
    registry
        .register(
            EntityDescriptor::<Wallet>::builder()
                .entity_type(EntityType::of::<Wallet>("wallet"))
                .identifier_converter(Arc::new(FromStrConverter::<Uuid>::new()))
                .mutation_types(mutation_types)
                .configuration(configuration)
                .build(),
        )
        .unwrap();

    PersistenceContext::builder()
        .registry(Arc::new(registry))
        .serializer(Arc::new(JsonSerializer))
        .arbiter(ProbabilityArbiter::new(Arc::new(|| 0.5)))
        .build()
}

pub fn save_request(
    id: Uuid,
    sequence_number: i64,
    mutation: WalletMutation,
) -> SaveRequest<Wallet> {
    SaveRequest::<Wallet>::builder()
        .id(id)
        .mutation(mutation)
        .sequence_number(sequence_number)
        .occurred_at(fixed_time())
        .build()
}

pub fn snapshot(id: Uuid, sequence_number: i64) -> Snapshot<Wallet> {
    Snapshot::<Wallet>::builder()
        .entity_type(EntityType::of::<Wallet>("wallet"))
        .entity_id(FromStrConverter::<Uuid>::new().identifier(&id))
        .sequence_number(sequence_number)
        .entity_version(sequence_number)
        .entity(Wallet {
            balance_cents: sequence_number * 100,
        })
        .event_occurred_at(fixed_time())
        .event_acknowledged_at(fixed_time())
        .entity_created_at(fixed_time())
        .created_at(fixed_time())
        .build()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
