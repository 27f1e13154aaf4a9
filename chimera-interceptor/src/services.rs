//! 外部协作服务
//!
//! 解析器只在两处依赖外部子系统：
//! - 依赖注入子系统提供的首尾拦截器类
//! - 拦截器类的对象工厂（原样放入结果，解析器不解释其内容）

use crate::class::ClassDescriptor;
use crate::component::{ComponentMetadata, ModuleMetadata};
use std::any::Any;
use std::sync::Arc;

/// 框架层对象工厂，具体类型由容器决定
pub type ObjectFactory = Arc<dyn Any + Send + Sync>;

/// 依赖注入子系统提供的首尾拦截器
///
/// 首拦截器的方法总在调用链最前面，尾拦截器的方法排在目标类自身方法之前
pub trait InjectionInterceptorProvider: Send + Sync {
    fn first_interceptor(
        &self,
        module: &ModuleMetadata,
        component: &ComponentMetadata,
    ) -> Option<Arc<ClassDescriptor>>;

    fn last_interceptor(
        &self,
        module: &ModuleMetadata,
        component: &ComponentMetadata,
    ) -> Option<Arc<ClassDescriptor>>;
}

/// 拦截器类的对象工厂查询
pub trait ObjectFactoryProvider: Send + Sync {
    fn object_factory(&self, class: &ClassDescriptor) -> Option<ObjectFactory>;
}

/// 未启用依赖注入时使用
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInjectionInterceptors;

impl InjectionInterceptorProvider for NoInjectionInterceptors {
    fn first_interceptor(&self, _: &ModuleMetadata, _: &ComponentMetadata) -> Option<Arc<ClassDescriptor>> {
        None
    }

    fn last_interceptor(&self, _: &ModuleMetadata, _: &ComponentMetadata) -> Option<Arc<ClassDescriptor>> {
        None
    }
}

/// 对所有组件返回同一对首尾拦截器
#[derive(Debug, Clone, Default)]
pub struct FixedInjectionInterceptors {
    pub first: Option<Arc<ClassDescriptor>>,
    pub last: Option<Arc<ClassDescriptor>>,
}

impl FixedInjectionInterceptors {
    pub fn new(first: Option<Arc<ClassDescriptor>>, last: Option<Arc<ClassDescriptor>>) -> Self {
        Self { first, last }
    }
}

impl InjectionInterceptorProvider for FixedInjectionInterceptors {
    fn first_interceptor(&self, _: &ModuleMetadata, _: &ComponentMetadata) -> Option<Arc<ClassDescriptor>> {
        self.first.clone()
    }

    fn last_interceptor(&self, _: &ModuleMetadata, _: &ComponentMetadata) -> Option<Arc<ClassDescriptor>> {
        self.last.clone()
    }
}

/// 不提供任何对象工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObjectFactories;

impl ObjectFactoryProvider for NoObjectFactories {
    fn object_factory(&self, _: &ClassDescriptor) -> Option<ObjectFactory> {
        None
    }
}
