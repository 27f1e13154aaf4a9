//! 拦截器种类注册表
//!
//! 封闭的拦截器种类集合。每个种类对应一个静态描述符，描述符携带：
//! - 声明式注解标识
//! - 部署描述符中的元素名
//! - 旧式回调方法名（如果有）
//! - 生命周期槽位（如果有）
//! - 旧式回调校验谓词

use crate::component::{ComponentProfile, ComponentType};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// 生命周期槽位数量（post-construct、pre-destroy、pre-passivate、post-activate）
pub const LIFECYCLE_SLOT_COUNT: usize = 4;

pub const SLOT_POST_CONSTRUCT: usize = 0;
pub const SLOT_PRE_DESTROY: usize = 1;
pub const SLOT_PRE_PASSIVATE: usize = 2;
pub const SLOT_POST_ACTIVATE: usize = 3;

/// 拦截器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterceptorKind {
    AroundInvoke,
    AroundTimeout,
    AroundConstruct,
    PostConstruct,
    PreDestroy,
    PostActivate,
    PrePassivate,
}

/// 种类描述符
///
/// 按种类分派的行为以函数指针的形式保存，而不是散落在 match 分支中
pub struct KindDescriptor {
    pub kind: InterceptorKind,
    /// 声明式注解的简单名
    pub annotation: &'static str,
    /// 部署描述符元素名
    pub element_name: &'static str,
    pub lifecycle: bool,
    /// 旧式组件接口中对应的回调方法名
    pub legacy_callback: Option<&'static str>,
    pub slot: Option<usize>,
    /// 当方法被显式声明为该种类时，是否需要与旧式回调名交叉校验
    pub legacy_validation_required: fn(&ComponentProfile) -> bool,
    /// 未加注解、仅凭旧式回调名即视为该种类的方法是否需要收集
    pub implicit_callback_required: fn(&ComponentProfile) -> bool,
}

fn never(_: &ComponentProfile) -> bool {
    false
}

fn has_component_interface(profile: &ComponentProfile) -> bool {
    profile.has_component_interface
}

fn implicit_create(profile: &ComponentProfile) -> bool {
    profile.has_component_interface
        && matches!(
            profile.component_type,
            ComponentType::Stateless | ComponentType::MessageDriven
        )
}

fn implicit_stateful_only(profile: &ComponentProfile) -> bool {
    profile.has_component_interface && profile.component_type == ComponentType::Stateful
}

static DESCRIPTORS: [KindDescriptor; 7] = [
    KindDescriptor {
        kind: InterceptorKind::AroundInvoke,
        annotation: "AroundInvoke",
        element_name: "around-invoke",
        lifecycle: false,
        legacy_callback: None,
        slot: None,
        legacy_validation_required: never,
        implicit_callback_required: never,
    },
    KindDescriptor {
        kind: InterceptorKind::AroundTimeout,
        annotation: "AroundTimeout",
        element_name: "around-timeout",
        lifecycle: false,
        legacy_callback: None,
        slot: None,
        legacy_validation_required: never,
        implicit_callback_required: never,
    },
    KindDescriptor {
        kind: InterceptorKind::AroundConstruct,
        annotation: "AroundConstruct",
        element_name: "around-construct",
        lifecycle: true,
        legacy_callback: None,
        slot: None,
        legacy_validation_required: never,
        implicit_callback_required: never,
    },
    KindDescriptor {
        kind: InterceptorKind::PostConstruct,
        annotation: "PostConstruct",
        element_name: "post-construct",
        lifecycle: true,
        legacy_callback: Some("ejbCreate"),
        slot: Some(SLOT_POST_CONSTRUCT),
        legacy_validation_required: has_component_interface,
        implicit_callback_required: implicit_create,
    },
    KindDescriptor {
        kind: InterceptorKind::PreDestroy,
        annotation: "PreDestroy",
        element_name: "pre-destroy",
        lifecycle: true,
        legacy_callback: Some("ejbRemove"),
        slot: Some(SLOT_PRE_DESTROY),
        legacy_validation_required: has_component_interface,
        implicit_callback_required: has_component_interface,
    },
    KindDescriptor {
        kind: InterceptorKind::PostActivate,
        annotation: "PostActivate",
        element_name: "post-activate",
        lifecycle: true,
        legacy_callback: Some("ejbActivate"),
        slot: Some(SLOT_POST_ACTIVATE),
        legacy_validation_required: has_component_interface,
        implicit_callback_required: implicit_stateful_only,
    },
    KindDescriptor {
        kind: InterceptorKind::PrePassivate,
        annotation: "PrePassivate",
        element_name: "pre-passivate",
        lifecycle: true,
        legacy_callback: Some("ejbPassivate"),
        slot: Some(SLOT_PRE_PASSIVATE),
        legacy_validation_required: has_component_interface,
        implicit_callback_required: implicit_stateful_only,
    },
];

/// 旧式回调方法名 -> 种类
static LEGACY_CALLBACKS: Lazy<HashMap<&'static str, InterceptorKind>> = Lazy::new(|| {
    DESCRIPTORS
        .iter()
        .filter(|d| d.lifecycle)
        .filter_map(|d| d.legacy_callback.map(|name| (name, d.kind)))
        .collect()
});

impl InterceptorKind {
    /// 所有种类，按描述符表顺序
    pub const ALL: [InterceptorKind; 7] = [
        InterceptorKind::AroundInvoke,
        InterceptorKind::AroundTimeout,
        InterceptorKind::AroundConstruct,
        InterceptorKind::PostConstruct,
        InterceptorKind::PreDestroy,
        InterceptorKind::PostActivate,
        InterceptorKind::PrePassivate,
    ];

    /// 构建生命周期链的顺序，决定拦截器类首次使用时分配的槽位
    pub const LIFECYCLE_CHAIN_ORDER: [InterceptorKind; 5] = [
        InterceptorKind::PostConstruct,
        InterceptorKind::PreDestroy,
        InterceptorKind::PrePassivate,
        InterceptorKind::PostActivate,
        InterceptorKind::AroundConstruct,
    ];

    pub fn descriptor(&self) -> &'static KindDescriptor {
        &DESCRIPTORS[*self as usize]
    }

    pub fn is_lifecycle(&self) -> bool {
        self.descriptor().lifecycle
    }

    pub fn annotation(&self) -> &'static str {
        self.descriptor().annotation
    }

    pub fn element_name(&self) -> &'static str {
        self.descriptor().element_name
    }

    pub fn legacy_callback(&self) -> Option<&'static str> {
        self.descriptor().legacy_callback
    }

    pub fn slot(&self) -> Option<usize> {
        self.descriptor().slot
    }

    pub fn is_legacy_validation_required(&self, profile: &ComponentProfile) -> bool {
        self.is_lifecycle() && (self.descriptor().legacy_validation_required)(profile)
    }

    pub fn is_implicit_callback_required(&self, profile: &ComponentProfile) -> bool {
        self.is_lifecycle() && (self.descriptor().implicit_callback_required)(profile)
    }

    /// 旧式回调方法名对应的种类
    ///
    /// 只有 `ejbCreate`、`ejbRemove`、`ejbActivate`、`ejbPassivate` 会返回 `Some`
    pub fn from_legacy_callback(method_name: &str) -> Option<InterceptorKind> {
        LEGACY_CALLBACKS.get(method_name).copied()
    }

    /// 按注解简单名查找种类
    pub fn from_annotation(annotation: &str) -> Option<InterceptorKind> {
        DESCRIPTORS
            .iter()
            .find(|d| d.annotation == annotation)
            .map(|d| d.kind)
    }
}

impl fmt::Display for InterceptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(component_type: ComponentType, has_component_interface: bool) -> ComponentProfile {
        ComponentProfile {
            component_type,
            has_component_interface,
        }
    }

    #[test]
    fn test_descriptor_table_is_indexed_by_kind() {
        for kind in InterceptorKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
        }
    }

    #[test]
    fn test_lifecycle_flags() {
        assert!(!InterceptorKind::AroundInvoke.is_lifecycle());
        assert!(!InterceptorKind::AroundTimeout.is_lifecycle());
        assert!(InterceptorKind::AroundConstruct.is_lifecycle());
        assert!(InterceptorKind::PostConstruct.is_lifecycle());
        assert!(InterceptorKind::PrePassivate.is_lifecycle());
    }

    #[test]
    fn test_slots_are_unique_and_bounded() {
        let slots: Vec<usize> = InterceptorKind::ALL.iter().filter_map(|k| k.slot()).collect();
        assert_eq!(slots.len(), LIFECYCLE_SLOT_COUNT);
        let unique: std::collections::HashSet<_> = slots.iter().collect();
        assert_eq!(unique.len(), LIFECYCLE_SLOT_COUNT);
        assert!(slots.iter().all(|s| *s < LIFECYCLE_SLOT_COUNT));
    }

    #[test]
    fn test_legacy_callback_lookup() {
        assert_eq!(
            InterceptorKind::from_legacy_callback("ejbCreate"),
            Some(InterceptorKind::PostConstruct)
        );
        assert_eq!(
            InterceptorKind::from_legacy_callback("ejbPassivate"),
            Some(InterceptorKind::PrePassivate)
        );
        assert_eq!(InterceptorKind::from_legacy_callback("ejbLoad"), None);
    }

    #[test]
    fn test_annotation_lookup() {
        assert_eq!(
            InterceptorKind::from_annotation("AroundTimeout"),
            Some(InterceptorKind::AroundTimeout)
        );
        assert_eq!(InterceptorKind::from_annotation("Schedule"), None);
    }

    #[test]
    fn test_implicit_callbacks_depend_on_component_type() {
        let stateless = profile(ComponentType::Stateless, true);
        let stateful = profile(ComponentType::Stateful, true);
        let plain = profile(ComponentType::Stateless, false);

        assert!(InterceptorKind::PostConstruct.is_implicit_callback_required(&stateless));
        assert!(!InterceptorKind::PostConstruct.is_implicit_callback_required(&stateful));
        assert!(InterceptorKind::PostActivate.is_implicit_callback_required(&stateful));
        assert!(!InterceptorKind::PostActivate.is_implicit_callback_required(&stateless));
        assert!(!InterceptorKind::PreDestroy.is_implicit_callback_required(&plain));
        assert!(!InterceptorKind::AroundInvoke.is_legacy_validation_required(&stateless));
    }

    #[test]
    fn test_display_uses_element_name() {
        assert_eq!(InterceptorKind::PreDestroy.to_string(), "pre-destroy");
    }
}
