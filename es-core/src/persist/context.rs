//! 仓储共享的协作者
//!
use crate::{
    mutation::{Dependencies, DependencyInjector},
    registry::DescriptorRegistry,
    utility::{ProbabilityArbiter, SystemTimeSource, TimeSource},
};
use bon::Builder;
use std::sync::Arc;

fn default_time_source() -> Arc<dyn TimeSource> {
    Arc::new(SystemTimeSource)
}

fn default_injector() -> Arc<dyn DependencyInjector> {
    Arc::new(Dependencies::new())
}

/// 注册表、载荷序列化器、时间源、概率仲裁器与依赖注入器的组合
#[derive(Builder)]
pub struct PersistenceContext<S> {
    registry: Arc<dyn DescriptorRegistry>,
    serializer: Arc<S>,
    #[builder(default = default_time_source())]
    time_source: Arc<dyn TimeSource>,
    #[builder(default)]
    arbiter: ProbabilityArbiter,
    #[builder(default = default_injector())]
    injector: Arc<dyn DependencyInjector>,
}

impl<S> PersistenceContext<S> {
    pub fn registry(&self) -> &Arc<dyn DescriptorRegistry> {
        &self.registry
    }

    pub fn serializer(&self) -> &Arc<S> {
        &self.serializer
    }

    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.time_source
    }

    pub fn arbiter(&self) -> &ProbabilityArbiter {
        &self.arbiter
    }

    pub fn injector(&self) -> &Arc<dyn DependencyInjector> {
        &self.injector
    }
}

impl<S> Clone for PersistenceContext<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            serializer: Arc::clone(&self.serializer),
            time_source: Arc::clone(&self.time_source),
            arbiter: self.arbiter.clone(),
            injector: Arc::clone(&self.injector),
        }
    }
}
