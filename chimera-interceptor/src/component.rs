//! 目标组件与模块元数据
//!
//! 解析器的输入：目标组件（被拦截的类及其业务/定时方法）和所在模块
//! （绑定记录、描述符中声明的拦截器方法）

use crate::binding::InterceptorBinding;
use crate::class::{ClassDescriptor, ClassIntrospector, MethodDescriptor};
use crate::config::ResolverConfig;
use crate::constants::{MESSAGE_DRIVEN_BEAN_INTERFACE, SESSION_BEAN_INTERFACE};
use crate::error::ComponentRole;
use crate::kind::InterceptorKind;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 种类 -> 描述符中声明的方法列表
pub type KindMethodMap = BTreeMap<InterceptorKind, Vec<Arc<MethodDescriptor>>>;

/// 组件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Stateless,
    Stateful,
    Singleton,
    MessageDriven,
    /// 托管对象，不参与依赖注入提供的首尾拦截器
    Managed,
}

impl ComponentType {
    /// 旧式组件接口
    pub fn legacy_interface(&self) -> Option<&'static str> {
        match self {
            ComponentType::Stateless | ComponentType::Stateful => Some(SESSION_BEAN_INTERFACE),
            ComponentType::MessageDriven => Some(MESSAGE_DRIVEN_BEAN_INTERFACE),
            ComponentType::Singleton | ComponentType::Managed => None,
        }
    }

    /// 回调命名冲突错误中使用的角色
    pub fn role(&self) -> Option<ComponentRole> {
        match self {
            ComponentType::Stateless => Some(ComponentRole::Stateless),
            ComponentType::Stateful => Some(ComponentRole::Stateful),
            ComponentType::MessageDriven => Some(ComponentRole::MessageDriven),
            ComponentType::Singleton | ComponentType::Managed => None,
        }
    }

    /// 是否需要收集目标类自身声明的生命周期方法（按槽位存放）
    pub fn collects_lifecycle_methods(&self, config: &ResolverConfig) -> bool {
        match self {
            ComponentType::Singleton => true,
            ComponentType::Stateful => config.transactional_stateful_lifecycle,
            _ => false,
        }
    }

    /// 是否向依赖注入子系统请求首尾拦截器
    pub fn supports_injection_interceptors(&self) -> bool {
        *self != ComponentType::Managed
    }
}

/// 组件画像：组件类型 + 是否实现了旧式组件接口
///
/// 每次解析计算一次，供种类描述符中的谓词使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentProfile {
    pub component_type: ComponentType,
    pub has_component_interface: bool,
}

impl ComponentProfile {
    pub fn detect(
        component_type: ComponentType,
        class: &ClassDescriptor,
        introspector: &dyn ClassIntrospector,
    ) -> Self {
        let has_component_interface = component_type
            .legacy_interface()
            .map(|iface| introspector.is_assignable_to(class, iface))
            .unwrap_or(false);

        tracing::debug!(
            "Component interface detected = {} for class {}",
            has_component_interface,
            class.name
        );

        Self {
            component_type,
            has_component_interface,
        }
    }
}

/// 目标组件元数据
#[derive(Debug, Clone)]
pub struct ComponentMetadata {
    /// 组件名，与绑定记录的 `component_name` 匹配
    pub name: String,
    /// 组件实现类
    pub class_name: String,
    pub component_type: ComponentType,
    /// 业务方法（均为实现类上的方法）
    pub business_methods: Vec<Arc<MethodDescriptor>>,
    /// 定时回调方法
    pub timer_methods: Vec<Arc<MethodDescriptor>>,
    /// 描述符中为组件类声明的拦截器方法，`None` 表示组件只通过注解定义
    pub descriptor_methods: Option<KindMethodMap>,
}

impl ComponentMetadata {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        component_type: ComponentType,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            component_type,
            business_methods: Vec::new(),
            timer_methods: Vec::new(),
            descriptor_methods: None,
        }
    }

    pub fn business_method(mut self, method: Arc<MethodDescriptor>) -> Self {
        self.business_methods.push(method);
        self
    }

    pub fn timer_method(mut self, method: Arc<MethodDescriptor>) -> Self {
        self.timer_methods.push(method);
        self
    }

    pub fn descriptor_method(mut self, kind: InterceptorKind, method: Arc<MethodDescriptor>) -> Self {
        self.descriptor_methods
            .get_or_insert_with(KindMethodMap::new)
            .entry(kind)
            .or_default()
            .push(method);
        self
    }

    /// 可被拦截的方法：业务方法 + 定时方法
    pub fn interceptable_methods(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.business_methods.iter().chain(self.timer_methods.iter())
    }
}

/// 模块元数据
#[derive(Debug, Clone, Default)]
pub struct ModuleMetadata {
    pub application: String,
    pub name: String,
    /// 为 true 时模块内所有组件与拦截器类的声明式注解都被忽略
    pub metadata_complete: bool,
    /// 模块内的全部绑定记录（已解析）
    pub bindings: Vec<InterceptorBinding>,
    /// 描述符中为拦截器类声明的拦截器方法，按类名索引
    pub interceptor_methods: HashMap<String, KindMethodMap>,
}

impl ModuleMetadata {
    pub fn new(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            name: name.into(),
            metadata_complete: false,
            bindings: Vec::new(),
            interceptor_methods: HashMap::new(),
        }
    }

    pub fn metadata_complete(mut self, complete: bool) -> Self {
        self.metadata_complete = complete;
        self
    }

    pub fn binding(mut self, binding: InterceptorBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn interceptor_method(
        mut self,
        class_name: impl Into<String>,
        kind: InterceptorKind,
        method: Arc<MethodDescriptor>,
    ) -> Self {
        self.interceptor_methods
            .entry(class_name.into())
            .or_default()
            .entry(kind)
            .or_default()
            .push(method);
        self
    }

    /// 组件的全限定名 `application#module#component`
    pub fn qualified_name(&self, component: &str) -> String {
        format!("{}#{}#{}", self.application, self.name, component)
    }
}
