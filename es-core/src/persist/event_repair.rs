//! 事件读修复（上抬）
//!
//! 读路径上概率性地把已废弃的变更上抬为新表示，并以原记录字节为期望值 CAS 回写：
//! eligible → upgrading → validated → replaced | conflict | suppressed。
//!
//! - 资格：后端支持替换，且变更声明了上抬能力；
//! - 校验：上抬前后存储印记相同视为上抬实现错误，始终抛出；
//!   类型名变化或版本回退仅记录警告；
//! - CAS 失败说明并发修复者已获胜，返回原事件。
//!
use crate::{
    domain_event::Event,
    entity::Entity,
    error::{DomainError, DomainResult},
    mutation::{DependencyInjector, Mutation},
    persist::{EventSerializer, EventStorageAdapter, PersistenceContext},
    registry::{DescriptorRegistry, DescriptorRegistryExt, EntityDescriptor},
    serializer::Serializer,
    utility::ProbabilityArbiter,
};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

pub struct EventRepairFacility<S> {
    registry: Arc<dyn DescriptorRegistry>,
    adapter: EventStorageAdapter,
    serializer: Arc<EventSerializer<S>>,
    arbiter: ProbabilityArbiter,
    injector: Arc<dyn DependencyInjector>,
}

impl<S> EventRepairFacility<S>
where
    S: Serializer,
{
    pub fn new(
        context: &PersistenceContext<S>,
        adapter: EventStorageAdapter,
        serializer: Arc<EventSerializer<S>>,
    ) -> Self {
        Self {
            registry: Arc::clone(context.registry()),
            adapter,
            serializer,
            arbiter: context.arbiter().clone(),
            injector: Arc::clone(context.injector()),
        }
    }

    pub fn eligible<E>(&self, event: &Event<E>) -> bool
    where
        E: Entity,
    {
        self.adapter.supports_replace() && event.mutation().deprecated().is_some()
    }

    /// 尝试修复事件，返回修复后的事件或原事件
    pub async fn process<E>(&self, event: Event<E>) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        if !self.eligible(&event) {
            return Ok(event);
        }

        let descriptor = self.registry.descriptor::<E>()?;
        let configuration = descriptor.configuration();
        if !self.arbiter.decide(configuration.event_repair_probability) {
            trace!(
                entity = %event.entity_type(),
                id = event.entity_id().encoded(),
                sequence_number = event.sequence_number(),
                "event repair skipped by draw"
            );
            return Ok(event);
        }

        match self.repair(&descriptor, &event).await {
            Ok(repaired) => Ok(repaired),
            Err(err) if err.is_illegal_upgrade() => {
                error!(
                    entity = %event.entity_type(),
                    id = event.entity_id().encoded(),
                    sequence_number = event.sequence_number(),
                    error = %err,
                    "illegal mutation upgrade"
                );
                Err(err)
            }
            Err(err) if configuration.suppress_repair_errors => {
                warn!(
                    entity = %event.entity_type(),
                    id = event.entity_id().encoded(),
                    sequence_number = event.sequence_number(),
                    mutation_type = %event.mutation_type(),
                    error = %err,
                    "event repair failed, returning original event"
                );
                Ok(event)
            }
            Err(err) => {
                error!(
                    entity = %event.entity_type(),
                    id = event.entity_id().encoded(),
                    sequence_number = event.sequence_number(),
                    mutation_type = %event.mutation_type(),
                    error = %err,
                    "event repair failed"
                );
                Err(err)
            }
        }
    }

    async fn repair<E>(
        &self,
        descriptor: &EntityDescriptor<E>,
        event: &Event<E>,
    ) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        let Some(deprecated) = event.mutation().deprecated() else {
            return Ok(event.clone());
        };

        let upgraded = deprecated.upgrade(self.injector.as_ref()).await?;
        let upgraded_type = descriptor.mutation_type_of(upgraded.symbol())?.clone();
        let original_type = event.mutation_type();

        if original_type.equal_storage_print(&upgraded_type) {
            return Err(DomainError::IllegalMutationUpgrade {
                original: original_type.to_string(),
                upgraded: upgraded_type.to_string(),
            });
        }
        if original_type.type_name() != upgraded_type.type_name() {
            warn!(
                entity = %event.entity_type(),
                original = %original_type,
                upgraded = %upgraded_type,
                "mutation type name changed during upgrade"
            );
        } else if upgraded_type.version() < original_type.version() {
            warn!(
                entity = %event.entity_type(),
                original = %original_type,
                upgraded = %upgraded_type,
                "mutation version decreased during upgrade"
            );
        }

        let replacement = event.with_mutation(upgraded_type, upgraded);
        let current = self.serializer.serialize(event)?;
        let next = self.serializer.serialize(&replacement)?;

        if self.adapter.replace(&current, &next)?.await? {
            debug!(
                entity = %event.entity_type(),
                id = event.entity_id().encoded(),
                sequence_number = event.sequence_number(),
                original = %event.mutation_type(),
                upgraded = %replacement.mutation_type(),
                "event repaired"
            );
            Ok(replacement)
        } else {
            debug!(
                entity = %event.entity_type(),
                id = event.entity_id().encoded(),
                sequence_number = event.sequence_number(),
                "event repair lost to a concurrent writer"
            );
            Ok(event.clone())
        }
    }
}
