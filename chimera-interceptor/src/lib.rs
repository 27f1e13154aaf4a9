//! Chimera Interceptor - 拦截器绑定解析与调用顺序引擎
//!
//! 为托管组件计算拦截器调用链，支持：
//! - 模块默认、类级、按方法名、按方法签名四种绑定风格及其合并
//! - 默认拦截器 / 类级拦截器的排除与显式全序校验
//! - 沿类层次收集拦截器方法（父类优先，覆盖抑制）
//! - 按种类校验拦截器方法签名与旧式回调命名
//! - 依赖注入子系统提供的首尾拦截器
//!
//! 入口是 [`InterceptorResolver::resolve`]。

pub mod binding;
pub mod class;
pub mod component;
pub mod config;
pub mod constants;
pub mod error;
pub mod kind;
pub mod merge;
pub mod ordering;
pub mod proxy;
pub mod resolver;
pub mod scanner;
pub mod services;
pub mod validator;

// 重新导出核心类型
pub use binding::{BindingStyle, InterceptorBinding, MethodSelector};
pub use class::{ClassDescriptor, ClassIntrospector, ClassTable, MethodDescriptor, MethodModifiers};
pub use component::{ComponentMetadata, ComponentProfile, ComponentType, KindMethodMap, ModuleMetadata};
pub use config::{InterceptorRevision, ResolverConfig};
pub use error::{ComponentRole, InterceptorError, InterceptorResult, MethodBindingStyle, SignatureProblem};
pub use kind::InterceptorKind;
pub use merge::MergedBindings;
pub use proxy::{InterceptorProxy, MethodChain, ProxyTarget, ResolvedInterceptors};
pub use resolver::InterceptorResolver;
pub use services::{
    FixedInjectionInterceptors, InjectionInterceptorProvider, NoInjectionInterceptors,
    NoObjectFactories, ObjectFactory, ObjectFactoryProvider,
};

/// 预导入模块
pub mod prelude {
    pub use crate::binding::InterceptorBinding;
    pub use crate::class::{ClassDescriptor, ClassIntrospector, ClassTable, MethodDescriptor};
    pub use crate::component::{ComponentMetadata, ComponentType, ModuleMetadata};
    pub use crate::config::{InterceptorRevision, ResolverConfig};
    pub use crate::error::{InterceptorError, InterceptorResult};
    pub use crate::kind::InterceptorKind;
    pub use crate::proxy::{InterceptorProxy, ProxyTarget, ResolvedInterceptors};
    pub use crate::resolver::InterceptorResolver;
    pub use crate::services::{InjectionInterceptorProvider, ObjectFactoryProvider};
}
