//! 拦截器解析器
//!
//! 对一个目标组件按固定步骤解析拦截器：
//! 1. 合并绑定记录
//! 2. 计算类级是否排除默认拦截器
//! 3. 收集默认拦截器名
//! 4. 收集类级拦截器名
//! 5. 计算类级顺序
//! 6. 注入依赖注入子系统提供的首尾拦截器
//! 7. 扫描目标类自身的拦截器方法
//! 8. 为每个业务/定时方法构建环绕拦截链
//! 9. 为每个生命周期种类构建调用链
//! 10. 组装结果
//!
//! 任何一步出错都会终止整个解析，不产生部分结果。
//!
//! # Example
//! ```
//! use chimera_interceptor::prelude::*;
//! use std::sync::Arc;
//!
//! let table = Arc::new(ClassTable::new());
//! table.register(
//!     ClassDescriptor::new("Audit").method(
//!         MethodDescriptor::new("audit")
//!             .param("InvocationContext")
//!             .returns("Object")
//!             .annotated("AroundInvoke"),
//!     ),
//! );
//! let foo = table.register(ClassDescriptor::new("Foo").method(MethodDescriptor::new("bar")));
//!
//! let module = ModuleMetadata::new("app", "mod")
//!     .binding(InterceptorBinding::module_default().classes(["Audit"]));
//! let component = ComponentMetadata::new("Foo", "Foo", ComponentType::Stateless)
//!     .business_method(foo.methods[0].clone());
//!
//! let resolver = InterceptorResolver::new(table);
//! let resolved = resolver.resolve(&module, &component)?.expect("Audit is referenced");
//! assert_eq!(resolved.interceptor_class_names(), vec!["Audit"]);
//! # Ok::<(), InterceptorError>(())
//! ```

use crate::class::{ClassDescriptor, ClassIntrospector, MethodDescriptor};
use crate::component::{ComponentMetadata, ComponentProfile, ModuleMetadata};
use crate::config::ResolverConfig;
use crate::error::{InterceptorError, InterceptorResult};
use crate::kind::InterceptorKind;
use crate::merge::{merge_bindings, MergedBindings};
use crate::ordering::{
    class_excludes_default, class_interceptor_names, default_interceptor_names,
    order_class_interceptors, order_method_interceptors, MethodOrderInput,
};
use crate::proxy::{
    InterceptorProxy, LifecycleMethods, MethodChain, ProxyMap, ProxyTarget, ResolvedInterceptors,
};
use crate::scanner::{create_proxy_map, ScanContext};
use crate::services::{
    InjectionInterceptorProvider, NoInjectionInterceptors, NoObjectFactories, ObjectFactory,
    ObjectFactoryProvider,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 拦截器解析器
///
/// 自身不持有可变状态，可在多个组件的并发解析之间共享
pub struct InterceptorResolver {
    config: ResolverConfig,
    introspector: Arc<dyn ClassIntrospector>,
    injection: Arc<dyn InjectionInterceptorProvider>,
    object_factories: Arc<dyn ObjectFactoryProvider>,
}

/// 单次解析的只读上下文
struct ResolutionContext<'a> {
    config: &'a ResolverConfig,
    introspector: &'a dyn ClassIntrospector,
    module: &'a ModuleMetadata,
    component_class: Arc<ClassDescriptor>,
    component_id: String,
    profile: ComponentProfile,
}

impl ResolutionContext<'_> {
    fn scan_context(&self) -> ScanContext<'_> {
        ScanContext {
            config: self.config,
            profile: &self.profile,
            metadata_complete: self.module.metadata_complete,
            introspector: self.introspector,
        }
    }
}

/// 单次解析私有的工作集
#[derive(Default)]
struct WorkingSet {
    /// 拦截器名 -> 已加载的类
    name_to_class: HashMap<String, Arc<ClassDescriptor>>,
    /// 已分配实例槽位的拦截器类，下标即槽位
    interceptor_classes: Vec<Arc<ClassDescriptor>>,
    /// 拦截器类名 -> 代理表（首次使用时构建）
    proxy_maps: HashMap<String, ProxyMap>,
    /// 目标类自身的代理表
    component_proxies: ProxyMap,
    first: Option<Arc<ClassDescriptor>>,
    last: Option<Arc<ClassDescriptor>>,
}

impl WorkingSet {
    fn load_interceptor(
        &mut self,
        ctx: &ResolutionContext<'_>,
        name: &str,
    ) -> InterceptorResult<Arc<ClassDescriptor>> {
        if let Some(class) = self.name_to_class.get(name) {
            return Ok(Arc::clone(class));
        }

        let class = ctx
            .introspector
            .load_class(name)
            .ok_or_else(|| InterceptorError::ClassNotFound { name: name.to_string() }.logged())?;
        self.name_to_class.insert(name.to_string(), Arc::clone(&class));
        Ok(class)
    }

    fn load_all(&mut self, ctx: &ResolutionContext<'_>, names: &[String]) -> InterceptorResult<()> {
        for name in names {
            self.load_interceptor(ctx, name)?;
        }
        Ok(())
    }

    /// 拦截器类的代理表，首次使用时分配槽位并扫描
    fn proxy_map(
        &mut self,
        ctx: &ResolutionContext<'_>,
        class: &Arc<ClassDescriptor>,
    ) -> InterceptorResult<&ProxyMap> {
        if !self.proxy_maps.contains_key(&class.name) {
            let index = self.interceptor_classes.len();
            let declared = ctx.module.interceptor_methods.get(&class.name);
            let map = create_proxy_map(
                class,
                ProxyTarget::Interceptor(index),
                declared,
                &ctx.scan_context(),
            )?;

            tracing::debug!("Interceptor class {} assigned index {}", class.name, index);
            self.interceptor_classes.push(Arc::clone(class));
            self.proxy_maps.insert(class.name.clone(), map);
        }

        Ok(&self.proxy_maps[&class.name])
    }

    fn kind_proxies(
        &mut self,
        ctx: &ResolutionContext<'_>,
        class: &Arc<ClassDescriptor>,
        kind: InterceptorKind,
    ) -> InterceptorResult<Vec<InterceptorProxy>> {
        Ok(self
            .proxy_map(ctx, class)?
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    /// 按顺序拼接指定种类的代理：首拦截器、有序拦截器、尾拦截器、目标类自身
    ///
    /// 槽位按有序拦截器、首拦截器、尾拦截器的次序分配，
    /// 首拦截器的代理随后插到链头
    fn interceptor_proxies(
        &mut self,
        ctx: &ResolutionContext<'_>,
        kind: InterceptorKind,
        order: &[String],
    ) -> InterceptorResult<Vec<InterceptorProxy>> {
        let mut proxies = Vec::new();

        for name in order {
            let class = self.load_interceptor(ctx, name)?;
            proxies.extend(self.kind_proxies(ctx, &class, kind)?);
        }

        if let Some(first) = self.first.clone() {
            let mut head = self.kind_proxies(ctx, &first, kind)?;
            head.append(&mut proxies);
            proxies = head;
        }

        if let Some(last) = self.last.clone() {
            proxies.extend(self.kind_proxies(ctx, &last, kind)?);
        }

        if let Some(own) = self.component_proxies.get(&kind) {
            proxies.extend(own.iter().cloned());
        }

        Ok(proxies)
    }
}

/// 目标类直接声明的生命周期方法，按槽位存放
fn collect_component_lifecycle_methods(class: &ClassDescriptor, proxies: &ProxyMap) -> LifecycleMethods {
    let mut methods: LifecycleMethods = Default::default();
    for kind in InterceptorKind::ALL {
        let slot = match kind.slot() {
            Some(slot) => slot,
            None => continue,
        };
        methods[slot] = proxies
            .get(&kind)
            .and_then(|list| list.iter().find(|p| p.method.declaring_class == class.name))
            .map(|p| {
                tracing::debug!("Found component {} method: {}", kind, p.method.qualified_name());
                Arc::clone(&p.method)
            });
    }
    methods
}

impl InterceptorResolver {
    /// 使用默认配置，不提供首尾拦截器和对象工厂
    pub fn new(introspector: Arc<dyn ClassIntrospector>) -> Self {
        Self {
            config: ResolverConfig::default(),
            introspector,
            injection: Arc::new(NoInjectionInterceptors),
            object_factories: Arc::new(NoObjectFactories),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_injection_provider(mut self, provider: Arc<dyn InjectionInterceptorProvider>) -> Self {
        self.injection = provider;
        self
    }

    pub fn with_object_factory_provider(mut self, provider: Arc<dyn ObjectFactoryProvider>) -> Self {
        self.object_factories = provider;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// 解析目标组件的拦截器
    ///
    /// 目标类既没有拦截器方法、也没有引用任何拦截器类时返回 `Ok(None)`
    pub fn resolve(
        &self,
        module: &ModuleMetadata,
        component: &ComponentMetadata,
    ) -> InterceptorResult<Option<ResolvedInterceptors>> {
        let component_id = module.qualified_name(&component.name);
        tracing::debug!("Resolving interceptors for {}", component_id);

        let component_class = self.introspector.load_class(&component.class_name).ok_or_else(|| {
            InterceptorError::ClassNotFound {
                name: component.class_name.clone(),
            }
            .logged()
        })?;
        let profile = ComponentProfile::detect(
            component.component_type,
            &component_class,
            self.introspector.as_ref(),
        );

        let ctx = ResolutionContext {
            config: &self.config,
            introspector: self.introspector.as_ref(),
            module,
            component_class,
            component_id,
            profile,
        };
        let mut working = WorkingSet::default();
        let metadata_complete = module.metadata_complete;

        // 1. 合并绑定
        let merged = merge_bindings(module, component)?;
        tracing::debug!(
            "Merged bindings: default = {:?}, class = {:?}, {} method-name, {} signature",
            merged.module_default.as_ref().map(ToString::to_string),
            merged.class_binding.as_ref().map(ToString::to_string),
            merged.by_method_name.len(),
            merged.by_signature.len()
        );

        // 2-5. 类级名称与顺序
        let excludes_default =
            class_excludes_default(&ctx.component_class, merged.class_binding.as_ref(), metadata_complete);
        let default_names = default_interceptor_names(merged.module_default.as_ref());
        let class_names = class_interceptor_names(
            &ctx.component_class,
            merged.class_binding.as_ref(),
            &default_names,
            metadata_complete,
        );
        working.load_all(&ctx, &class_names)?;

        let class_order = order_class_interceptors(
            &ctx.component_id,
            excludes_default,
            &default_names,
            &class_names,
            merged.class_binding.as_ref(),
        )?;
        working.load_all(&ctx, &class_order)?;

        tracing::debug!(
            "Exclude default = {}, default names = {:?}, class names = {:?}, class order = {:?}",
            excludes_default,
            default_names,
            class_names,
            class_order
        );

        // 6. 首尾拦截器
        if component.component_type.supports_injection_interceptors() {
            working.first = self.injection.first_interceptor(module, component);
            working.last = self.injection.last_interceptor(module, component);

            for class in working.first.iter().chain(working.last.iter()) {
                tracing::debug!("Injection interceptor {} for {}", class.name, ctx.component_id);
                working.name_to_class.insert(class.name.clone(), Arc::clone(class));
            }
        }

        // 7. 目标类自身
        working.component_proxies = create_proxy_map(
            &ctx.component_class,
            ProxyTarget::Component,
            component.descriptor_methods.as_ref(),
            &ctx.scan_context(),
        )?;
        let component_lifecycle_methods = component
            .component_type
            .collects_lifecycle_methods(&self.config)
            .then(|| collect_component_lifecycle_methods(&ctx.component_class, &working.component_proxies));

        // 8. 业务方法与定时方法
        let input = MethodOrderInput {
            component_id: &ctx.component_id,
            class_order: &class_order,
            class_excludes_default: excludes_default,
            default_names: &default_names,
            class_names: &class_names,
            metadata_complete,
        };
        let business_method_chains = method_chains(
            &ctx,
            &mut working,
            &merged,
            &input,
            &component.business_methods,
            InterceptorKind::AroundInvoke,
        )?;
        let timer_method_chains = method_chains(
            &ctx,
            &mut working,
            &merged,
            &input,
            &component.timer_methods,
            InterceptorKind::AroundTimeout,
        )?;

        // 9. 生命周期
        let mut lifecycle_chains = BTreeMap::new();
        for kind in InterceptorKind::LIFECYCLE_CHAIN_ORDER {
            let proxies = working.interceptor_proxies(&ctx, kind, &class_order)?;
            if !proxies.is_empty() {
                tracing::debug!("{} chain: {} proxies", kind, proxies.len());
                lifecycle_chains.insert(kind, proxies);
            }
        }

        // 10. 结果
        if working.component_proxies.is_empty() && working.interceptor_classes.is_empty() {
            tracing::debug!("No interceptors for {}", ctx.component_id);
            return Ok(None);
        }

        let factories: Vec<Option<ObjectFactory>> = working
            .interceptor_classes
            .iter()
            .map(|class| self.object_factories.object_factory(class))
            .collect();
        let object_factories = factories.iter().any(Option::is_some).then_some(factories);

        tracing::debug!(
            "Resolved {} interceptor classes for {}",
            working.interceptor_classes.len(),
            ctx.component_id
        );

        Ok(Some(ResolvedInterceptors {
            interceptor_classes: working.interceptor_classes,
            object_factories,
            lifecycle_chains,
            business_method_chains,
            timer_method_chains,
            component_lifecycle_methods,
        }))
    }
}

fn method_chains(
    ctx: &ResolutionContext<'_>,
    working: &mut WorkingSet,
    merged: &MergedBindings,
    input: &MethodOrderInput<'_>,
    methods: &[Arc<MethodDescriptor>],
    kind: InterceptorKind,
) -> InterceptorResult<Vec<MethodChain>> {
    let mut chains = Vec::new();

    for method in methods {
        let order = order_method_interceptors(input, method, merged.for_method(method))?;
        working.load_all(ctx, &order)?;

        let proxies = working.interceptor_proxies(ctx, kind, &order)?;
        tracing::debug!(
            "{} order for {}: {:?} ({} proxies)",
            kind,
            method.qualified_name(),
            order,
            proxies.len()
        );

        if !proxies.is_empty() {
            chains.push(MethodChain {
                method: Arc::clone(method),
                proxies,
            });
        }
    }

    Ok(chains)
}
