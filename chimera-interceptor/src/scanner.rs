//! 类层次拦截器方法扫描
//!
//! 对一个类（目标组件类或拦截器类）构建 种类 -> 代理列表：
//! 1. 从类本身沿父类链向上收集祖先（不含顶层类型），反转后最一般的祖先在前
//! 2. 逐层处理：先处理部署描述符声明的方法，再处理注解（元数据不完整时）
//! 3. 被更具体层级中同签名方法覆盖的声明会被忽略
//! 4. 同一层级同一种类只能有一个方法

use crate::class::{ClassDescriptor, ClassIntrospector, MethodDescriptor};
use crate::component::{ComponentProfile, KindMethodMap};
use crate::config::ResolverConfig;
use crate::constants::{TOP_TYPE, VOID_TYPE};
use crate::error::{InterceptorError, InterceptorResult};
use crate::kind::InterceptorKind;
use crate::proxy::{InterceptorProxy, ProxyMap, ProxyTarget};
use crate::validator::{
    validate_around_signature, validate_legacy_callback, validate_lifecycle_signature,
    DeclarationSource,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// 扫描所需的只读上下文
#[derive(Clone, Copy)]
pub struct ScanContext<'a> {
    pub config: &'a ResolverConfig,
    pub profile: &'a ComponentProfile,
    /// 为 true 时忽略注解
    pub metadata_complete: bool,
    pub introspector: &'a dyn ClassIntrospector,
}

/// 祖先链，最一般的祖先在前，类本身在最后
pub fn lifo_superclasses(
    class: &Arc<ClassDescriptor>,
    introspector: &dyn ClassIntrospector,
) -> InterceptorResult<Vec<Arc<ClassDescriptor>>> {
    let mut chain = vec![Arc::clone(class)];
    let mut seen: HashSet<String> = HashSet::from([class.name.clone()]);
    let mut current = Arc::clone(class);

    while let Some(parent) = current.superclass.clone() {
        if parent == TOP_TYPE || !seen.insert(parent.clone()) {
            break;
        }
        let loaded = introspector
            .load_class(&parent)
            .ok_or_else(|| InterceptorError::ClassNotFound { name: parent.clone() }.logged())?;
        chain.push(Arc::clone(&loaded));
        current = loaded;
    }

    chain.reverse();
    Ok(chain)
}

/// 方法是否被祖先链中更具体层级的同签名方法覆盖
///
/// 私有方法不会被覆盖；覆盖方法自身是否带拦截器注解无关紧要
pub fn is_method_overridden(method: &MethodDescriptor, supers: &[Arc<ClassDescriptor>]) -> bool {
    if method.modifiers.is_private {
        return false;
    }

    let declaring_level = match supers.iter().position(|c| c.name == method.declaring_class) {
        Some(level) => level,
        None => return false,
    };

    supers[declaring_level + 1..]
        .iter()
        .any(|c| c.declares_same_signature(method))
}

/// 单个层级上已收集的方法，每个种类至多一个
type LevelMethods = BTreeMap<InterceptorKind, Arc<MethodDescriptor>>;

struct LevelScan<'a, 'b> {
    ctx: &'b ScanContext<'a>,
    level: &'b ClassDescriptor,
    target: ProxyTarget,
    found: LevelMethods,
    proxies: &'b mut ProxyMap,
}

impl LevelScan<'_, '_> {
    fn on_component(&self) -> bool {
        self.target == ProxyTarget::Component
    }

    fn duplicate(&self, kind: InterceptorKind, existing: &MethodDescriptor, method: &MethodDescriptor) -> InterceptorError {
        InterceptorError::DuplicateInterceptorMethod {
            class: self.level.name.clone(),
            kind,
            first: existing.name.clone(),
            second: method.name.clone(),
        }
        .logged()
    }

    fn add(&mut self, kind: InterceptorKind, method: &Arc<MethodDescriptor>) {
        let proxy = InterceptorProxy::new(Arc::clone(method), self.target);
        tracing::trace!("Adding {}: {}", kind, proxy);
        self.found.insert(kind, Arc::clone(method));
        self.proxies.entry(kind).or_default().push(proxy);
    }

    fn validate(
        &self,
        kind: InterceptorKind,
        method: &MethodDescriptor,
        source: DeclarationSource,
    ) -> InterceptorResult<()> {
        if !kind.is_lifecycle() {
            return validate_around_signature(kind, method, self.ctx.config);
        }

        if self.on_component() && kind.is_legacy_validation_required(self.ctx.profile) {
            validate_legacy_callback(kind, method, self.ctx.profile, source)?;
        }
        validate_lifecycle_signature(kind, method, self.on_component(), self.ctx.config)
    }

    /// 部署描述符声明的方法
    fn scan_descriptor(
        &mut self,
        declared: &KindMethodMap,
        supers: &[Arc<ClassDescriptor>],
    ) -> InterceptorResult<()> {
        for (kind, methods) in declared {
            for method in methods {
                if method.declaring_class != self.level.name || is_method_overridden(method, supers) {
                    continue;
                }

                if let Some(existing) = self.found.get(kind) {
                    return Err(self.duplicate(*kind, existing, method));
                }

                self.validate(*kind, method, DeclarationSource::Descriptor)?;
                self.add(*kind, method);
            }
        }
        Ok(())
    }

    /// 注解声明的方法，以及按旧式回调名隐式识别的方法
    fn scan_annotations(&mut self, supers: &[Arc<ClassDescriptor>]) -> InterceptorResult<()> {
        let level = self.level;
        for method in &level.methods {
            if method.modifiers.is_synthetic {
                continue;
            }

            let annotated: Vec<InterceptorKind> = method
                .annotations
                .iter()
                .filter_map(|annotation| InterceptorKind::from_annotation(annotation))
                .collect();

            if !annotated.is_empty() && !is_method_overridden(method, supers) {
                for &kind in &annotated {
                    self.validate(kind, method, DeclarationSource::Annotation)?;
                    self.add_unless_same(kind, method)?;
                }
            }

            for kind in InterceptorKind::ALL {
                if !annotated.contains(&kind) && self.is_implicit_callback(kind, method) {
                    self.add_unless_same(kind, method)?;
                }
            }
        }
        Ok(())
    }

    fn add_unless_same(&mut self, kind: InterceptorKind, method: &Arc<MethodDescriptor>) -> InterceptorResult<()> {
        match self.found.get(&kind) {
            None => {
                self.add(kind, method);
                Ok(())
            }
            Some(existing) if **existing == **method => Ok(()),
            Some(existing) => Err(self.duplicate(kind, existing, method)),
        }
    }

    fn is_implicit_callback(&self, kind: InterceptorKind, method: &MethodDescriptor) -> bool {
        self.on_component()
            && kind.is_implicit_callback_required(self.ctx.profile)
            && kind.legacy_callback() == Some(method.name.as_str())
            && method.parameter_types.is_empty()
            && method.return_type == VOID_TYPE
    }
}

/// 构建类（含祖先链）的 种类 -> 代理列表
///
/// `declared` 为部署描述符中为该类声明的拦截器方法
pub fn create_proxy_map(
    class: &Arc<ClassDescriptor>,
    target: ProxyTarget,
    declared: Option<&KindMethodMap>,
    ctx: &ScanContext<'_>,
) -> InterceptorResult<ProxyMap> {
    let supers = lifo_superclasses(class, ctx.introspector)?;
    let mut proxies = ProxyMap::new();

    tracing::debug!(
        "Scanning interceptor methods of {} ({} levels, target = {:?})",
        class.name,
        supers.len(),
        target
    );

    for level in &supers {
        let mut scan = LevelScan {
            ctx,
            level,
            target,
            found: LevelMethods::new(),
            proxies: &mut proxies,
        };

        if let Some(declared) = declared {
            scan.scan_descriptor(declared, &supers)?;
        }
        if !ctx.metadata_complete {
            scan.scan_annotations(&supers)?;
        }
    }

    Ok(proxies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassTable;
    use crate::component::ComponentType;
    use crate::constants::INVOCATION_CONTEXT_TYPE;

    struct Fixture {
        table: ClassTable,
        config: ResolverConfig,
        profile: ComponentProfile,
        metadata_complete: bool,
    }

    impl Fixture {
        fn new(component_type: ComponentType, has_component_interface: bool) -> Self {
            Self {
                table: ClassTable::new(),
                config: ResolverConfig::default(),
                profile: ComponentProfile {
                    component_type,
                    has_component_interface,
                },
                metadata_complete: false,
            }
        }

        fn ctx(&self) -> ScanContext<'_> {
            ScanContext {
                config: &self.config,
                profile: &self.profile,
                metadata_complete: self.metadata_complete,
                introspector: &self.table,
            }
        }

        fn scan(&self, class: &str, target: ProxyTarget) -> InterceptorResult<ProxyMap> {
            let class = self.table.get(class).unwrap();
            create_proxy_map(&class, target, None, &self.ctx())
        }
    }

    fn names(proxies: &ProxyMap, kind: InterceptorKind) -> Vec<String> {
        proxies
            .get(&kind)
            .map(|list| list.iter().map(|p| p.method.qualified_name()).collect())
            .unwrap_or_default()
    }

    fn around_invoke(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name)
            .param(INVOCATION_CONTEXT_TYPE)
            .returns("Object")
            .annotated("AroundInvoke")
    }

    #[test]
    fn test_lifo_superclasses_most_general_first() {
        let table = ClassTable::new();
        table.register(ClassDescriptor::new("Base").extends("Object"));
        table.register(ClassDescriptor::new("Middle").extends("Base"));
        let leaf = table.register(ClassDescriptor::new("Leaf").extends("Middle"));

        let chain: Vec<_> = lifo_superclasses(&leaf, &table)
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(chain, vec!["Base", "Middle", "Leaf"]);
    }

    #[test]
    fn test_lifo_superclasses_missing_parent() {
        let table = ClassTable::new();
        let leaf = table.register(ClassDescriptor::new("Leaf").extends("Gone"));

        let err = lifo_superclasses(&leaf, &table).unwrap_err();
        assert_eq!(err, InterceptorError::ClassNotFound { name: "Gone".into() });
    }

    #[test]
    fn test_base_interceptor_methods_come_first() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture
            .table
            .register(ClassDescriptor::new("BaseAudit").method(around_invoke("baseAudit")));
        fixture.table.register(
            ClassDescriptor::new("Audit")
                .extends("BaseAudit")
                .method(around_invoke("audit")),
        );

        let proxies = fixture.scan("Audit", ProxyTarget::Interceptor(3)).unwrap();
        assert_eq!(
            names(&proxies, InterceptorKind::AroundInvoke),
            vec!["BaseAudit.baseAudit(InvocationContext)", "Audit.audit(InvocationContext)"]
        );
        assert!(proxies[&InterceptorKind::AroundInvoke]
            .iter()
            .all(|p| p.target == ProxyTarget::Interceptor(3)));
    }

    #[test]
    fn test_overridden_base_lifecycle_method_is_suppressed() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture
            .table
            .register(ClassDescriptor::new("Base").method(MethodDescriptor::new("init").annotated("PostConstruct")));
        fixture
            .table
            .register(ClassDescriptor::new("Foo").extends("Base").method(MethodDescriptor::new("init")));

        let proxies = fixture.scan("Foo", ProxyTarget::Component).unwrap();
        assert!(names(&proxies, InterceptorKind::PostConstruct).is_empty());
    }

    #[test]
    fn test_private_base_method_is_not_overridden() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.table.register(
            ClassDescriptor::new("Base").method(MethodDescriptor::new("init").private().annotated("PostConstruct")),
        );
        fixture
            .table
            .register(ClassDescriptor::new("Foo").extends("Base").method(MethodDescriptor::new("init")));

        let proxies = fixture.scan("Foo", ProxyTarget::Component).unwrap();
        assert_eq!(names(&proxies, InterceptorKind::PostConstruct), vec!["Base.init()"]);
    }

    #[test]
    fn test_duplicate_kind_at_same_level() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.table.register(
            ClassDescriptor::new("Audit")
                .method(around_invoke("first"))
                .method(around_invoke("second")),
        );

        let err = fixture.scan("Audit", ProxyTarget::Interceptor(0)).unwrap_err();
        assert_eq!(
            err,
            InterceptorError::DuplicateInterceptorMethod {
                class: "Audit".into(),
                kind: InterceptorKind::AroundInvoke,
                first: "first".into(),
                second: "second".into(),
            }
        );
    }

    #[test]
    fn test_same_kind_on_different_levels_is_allowed() {
        let fixture = Fixture::new(ComponentType::Singleton, false);
        fixture
            .table
            .register(ClassDescriptor::new("Base").method(MethodDescriptor::new("setup").annotated("PostConstruct")));
        fixture.table.register(
            ClassDescriptor::new("Foo")
                .extends("Base")
                .method(MethodDescriptor::new("init").annotated("PostConstruct")),
        );

        let proxies = fixture.scan("Foo", ProxyTarget::Component).unwrap();
        assert_eq!(
            names(&proxies, InterceptorKind::PostConstruct),
            vec!["Base.setup()", "Foo.init()"]
        );
    }

    #[test]
    fn test_descriptor_and_annotation_naming_same_method() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        let audit = fixture
            .table
            .register(ClassDescriptor::new("Audit").method(around_invoke("audit")));

        let mut declared = KindMethodMap::new();
        declared.insert(InterceptorKind::AroundInvoke, vec![audit.methods[0].clone()]);

        let proxies =
            create_proxy_map(&audit, ProxyTarget::Interceptor(0), Some(&declared), &fixture.ctx()).unwrap();
        assert_eq!(proxies[&InterceptorKind::AroundInvoke].len(), 1);
    }

    #[test]
    fn test_descriptor_method_conflicts_with_annotation() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        let audit = fixture.table.register(
            ClassDescriptor::new("Audit")
                .method(around_invoke("annotated"))
                .method(MethodDescriptor::new("declared").param(INVOCATION_CONTEXT_TYPE).returns("Object")),
        );

        let mut declared = KindMethodMap::new();
        declared.insert(InterceptorKind::AroundInvoke, vec![audit.methods[1].clone()]);

        let err = create_proxy_map(&audit, ProxyTarget::Interceptor(0), Some(&declared), &fixture.ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            InterceptorError::DuplicateInterceptorMethod { ref first, ref second, .. }
                if first == "declared" && second == "annotated"
        ));
    }

    #[test]
    fn test_metadata_complete_ignores_annotations() {
        let mut fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.metadata_complete = true;
        fixture
            .table
            .register(ClassDescriptor::new("Audit").method(around_invoke("audit")));

        let proxies = fixture.scan("Audit", ProxyTarget::Interceptor(0)).unwrap();
        assert!(proxies.is_empty());
    }

    #[test]
    fn test_synthetic_methods_are_skipped() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.table.register(
            ClassDescriptor::new("Audit")
                .method(around_invoke("audit"))
                .method(around_invoke("audit").synthetic()),
        );

        let proxies = fixture.scan("Audit", ProxyTarget::Interceptor(0)).unwrap();
        assert_eq!(proxies[&InterceptorKind::AroundInvoke].len(), 1);
    }

    #[test]
    fn test_implicit_legacy_callbacks() {
        let fixture = Fixture::new(ComponentType::Stateless, true);
        fixture.table.register(
            ClassDescriptor::new("Foo")
                .implements("SessionBean")
                .method(MethodDescriptor::new("ejbCreate"))
                .method(MethodDescriptor::new("ejbRemove"))
                .method(MethodDescriptor::new("ejbActivate"))
                .method(MethodDescriptor::new("ejbCreate").param("String")),
        );

        let proxies = fixture.scan("Foo", ProxyTarget::Component).unwrap();
        assert_eq!(names(&proxies, InterceptorKind::PostConstruct), vec!["Foo.ejbCreate()"]);
        assert_eq!(names(&proxies, InterceptorKind::PreDestroy), vec!["Foo.ejbRemove()"]);
        assert!(names(&proxies, InterceptorKind::PostActivate).is_empty());
    }

    #[test]
    fn test_implicit_callbacks_require_component_interface() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture
            .table
            .register(ClassDescriptor::new("Foo").method(MethodDescriptor::new("ejbCreate")));

        let proxies = fixture.scan("Foo", ProxyTarget::Component).unwrap();
        assert!(proxies.is_empty());
    }

    #[test]
    fn test_annotated_legacy_callback_with_wrong_kind() {
        let fixture = Fixture::new(ComponentType::Stateless, true);
        fixture.table.register(
            ClassDescriptor::new("Foo")
                .implements("SessionBean")
                .method(MethodDescriptor::new("ejbRemove").annotated("PostConstruct")),
        );

        let err = fixture.scan("Foo", ProxyTarget::Component).unwrap_err();
        assert_eq!(err.code(), "INVALID_CALLBACK_METHOD");
    }

    #[test]
    fn test_around_construct_on_component_class() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.table.register(
            ClassDescriptor::new("Foo").method(
                MethodDescriptor::new("construct")
                    .param(INVOCATION_CONTEXT_TYPE)
                    .annotated("AroundConstruct"),
            ),
        );

        let err = fixture.scan("Foo", ProxyTarget::Component).unwrap_err();
        assert_eq!(err.code(), "AROUND_CONSTRUCT_ON_COMPONENT_CLASS");
    }

    #[test]
    fn test_interceptor_lifecycle_method_takes_context() {
        let fixture = Fixture::new(ComponentType::Stateless, false);
        fixture.table.register(
            ClassDescriptor::new("Audit").method(
                MethodDescriptor::new("created")
                    .param(INVOCATION_CONTEXT_TYPE)
                    .annotated("PostConstruct"),
            ),
        );

        let proxies = fixture.scan("Audit", ProxyTarget::Interceptor(1)).unwrap();
        assert_eq!(
            names(&proxies, InterceptorKind::PostConstruct),
            vec!["Audit.created(InvocationContext)"]
        );
    }
}
