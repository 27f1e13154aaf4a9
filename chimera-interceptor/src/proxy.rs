//! 拦截器代理与解析结果

use crate::class::{ClassDescriptor, MethodDescriptor};
use crate::kind::{InterceptorKind, LIFECYCLE_SLOT_COUNT};
use crate::services::ObjectFactory;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 代理方法的调用对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyTarget {
    /// 组件实例持有的拦截器实例数组下标
    Interceptor(usize),
    /// 目标组件实例自身
    Component,
}

/// 拦截器代理：方法引用 + 调用对象
///
/// 解析期间创建一次，之后只读共享
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorProxy {
    pub method: Arc<MethodDescriptor>,
    pub target: ProxyTarget,
}

impl InterceptorProxy {
    pub fn new(method: Arc<MethodDescriptor>, target: ProxyTarget) -> Self {
        Self { method, target }
    }

    pub fn is_component(&self) -> bool {
        self.target == ProxyTarget::Component
    }

    /// 拦截器实例下标，目标组件自身的方法返回 `None`
    pub fn interceptor_index(&self) -> Option<usize> {
        match self.target {
            ProxyTarget::Interceptor(index) => Some(index),
            ProxyTarget::Component => None,
        }
    }
}

impl fmt::Display for InterceptorProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            ProxyTarget::Interceptor(index) => {
                write!(f, "InterceptorProxy[{}, index={}]", self.method.qualified_name(), index)
            }
            ProxyTarget::Component => {
                write!(f, "InterceptorProxy[{}, component]", self.method.qualified_name())
            }
        }
    }
}

/// 单个类（含父类链）的 种类 -> 代理列表，最一般的父类在前
pub type ProxyMap = BTreeMap<InterceptorKind, Vec<InterceptorProxy>>;

/// 按生命周期槽位存放的目标类自身声明的生命周期方法
pub type LifecycleMethods = [Option<Arc<MethodDescriptor>>; LIFECYCLE_SLOT_COUNT];

/// 单个业务/定时方法的环绕拦截链
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodChain {
    pub method: Arc<MethodDescriptor>,
    pub proxies: Vec<InterceptorProxy>,
}

/// 目标组件的拦截器解析结果
#[derive(Debug, Clone)]
pub struct ResolvedInterceptors {
    /// 组件使用的互不相同的拦截器类，下标即实例槽位
    pub interceptor_classes: Vec<Arc<ClassDescriptor>>,
    /// 与 `interceptor_classes` 一一对应的对象工厂，没有任何工厂时为 `None`
    pub object_factories: Option<Vec<Option<ObjectFactory>>>,
    /// 生命周期种类 -> 调用链，空链不记录
    pub lifecycle_chains: BTreeMap<InterceptorKind, Vec<InterceptorProxy>>,
    /// 业务方法的 around-invoke 链，空链不记录
    pub business_method_chains: Vec<MethodChain>,
    /// 定时方法的 around-timeout 链，空链不记录
    pub timer_method_chains: Vec<MethodChain>,
    /// 目标类直接声明的生命周期方法
    pub component_lifecycle_methods: Option<LifecycleMethods>,
}

impl ResolvedInterceptors {
    /// 指定生命周期种类的调用链
    pub fn lifecycle_chain(&self, kind: InterceptorKind) -> &[InterceptorProxy] {
        self.lifecycle_chains
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn interceptor_class_names(&self) -> Vec<&str> {
        self.interceptor_classes.iter().map(|c| c.name.as_str()).collect()
    }

    /// 业务方法的调用链
    pub fn business_chain(&self, method: &MethodDescriptor) -> Option<&[InterceptorProxy]> {
        find_chain(&self.business_method_chains, method)
    }

    /// 定时方法的调用链
    pub fn timer_chain(&self, method: &MethodDescriptor) -> Option<&[InterceptorProxy]> {
        find_chain(&self.timer_method_chains, method)
    }

    /// 槽位对应的目标类生命周期方法
    pub fn component_lifecycle_method(&self, slot: usize) -> Option<&Arc<MethodDescriptor>> {
        self.component_lifecycle_methods
            .as_ref()
            .and_then(|methods| methods.get(slot))
            .and_then(Option::as_ref)
    }
}

fn find_chain<'a>(chains: &'a [MethodChain], method: &MethodDescriptor) -> Option<&'a [InterceptorProxy]> {
    chains
        .iter()
        .find(|chain| *chain.method == *method)
        .map(|chain| chain.proxies.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SLOT_PRE_DESTROY;

    fn method(class: &str, name: &str) -> Arc<MethodDescriptor> {
        ClassDescriptor::new(class)
            .method(MethodDescriptor::new(name))
            .methods[0]
            .clone()
    }

    #[test]
    fn test_proxy_target() {
        let proxy = InterceptorProxy::new(method("A", "audit"), ProxyTarget::Interceptor(2));
        assert_eq!(proxy.interceptor_index(), Some(2));
        assert!(!proxy.is_component());
        assert_eq!(proxy.to_string(), "InterceptorProxy[A.audit(), index=2]");

        let own = InterceptorProxy::new(method("Foo", "m1"), ProxyTarget::Component);
        assert!(own.is_component());
        assert_eq!(own.interceptor_index(), None);
    }

    #[test]
    fn test_result_lookups() {
        let bar = method("Foo", "bar");
        let destroy = method("Foo", "destroy");
        let mut slots: LifecycleMethods = Default::default();
        slots[SLOT_PRE_DESTROY] = Some(destroy.clone());

        let mut lifecycle_chains = BTreeMap::new();
        lifecycle_chains.insert(
            InterceptorKind::PreDestroy,
            vec![InterceptorProxy::new(destroy.clone(), ProxyTarget::Component)],
        );

        let result = ResolvedInterceptors {
            interceptor_classes: vec![Arc::new(ClassDescriptor::new("A"))],
            object_factories: None,
            lifecycle_chains,
            business_method_chains: vec![MethodChain {
                method: bar.clone(),
                proxies: vec![InterceptorProxy::new(method("A", "audit"), ProxyTarget::Interceptor(0))],
            }],
            timer_method_chains: Vec::new(),
            component_lifecycle_methods: Some(slots),
        };

        assert_eq!(result.interceptor_class_names(), vec!["A"]);
        assert_eq!(result.lifecycle_chain(InterceptorKind::PreDestroy).len(), 1);
        assert!(result.lifecycle_chain(InterceptorKind::PostConstruct).is_empty());
        assert_eq!(result.business_chain(&bar).map(|c| c.len()), Some(1));
        assert!(result.timer_chain(&bar).is_none());
        assert_eq!(result.component_lifecycle_method(SLOT_PRE_DESTROY), Some(&destroy));
        assert!(result.component_lifecycle_method(0).is_none());
    }
}
