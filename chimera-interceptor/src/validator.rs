//! 拦截器方法签名校验
//!
//! 按种类检查方法形态：
//! - around-invoke / around-timeout：非 final/static，唯一参数为调用上下文，返回顶层类型
//! - 生命周期种类：非 final/static，返回 void（新版本允许返回顶层类型），
//!   目标类上无参，拦截器类上唯一参数为调用上下文
//!
//! 另外负责旧式回调方法名与实际种类的交叉校验。
//! 校验策略通过 [`ResolverConfig`] 显式传入。

use crate::class::MethodDescriptor;
use crate::component::{ComponentProfile, ComponentType};
use crate::config::ResolverConfig;
use crate::constants::{is_reference_type, INVOCATION_CONTEXT_TYPE, TOP_TYPE, VOID_TYPE};
use crate::error::{InterceptorError, InterceptorResult, SignatureProblem};
use crate::kind::InterceptorKind;

/// 方法声明的来源，影响错误信息中种类的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSource {
    /// 声明式注解
    Annotation,
    /// 部署描述符
    Descriptor,
}

fn invalid(kind: InterceptorKind, method: &MethodDescriptor, problem: SignatureProblem) -> InterceptorError {
    InterceptorError::InvalidSignature {
        class: method.declaring_class.clone(),
        method: method.name.clone(),
        kind,
        problem,
    }
    .logged()
}

fn check_modifiers(kind: InterceptorKind, method: &MethodDescriptor) -> InterceptorResult<()> {
    if method.modifiers.is_final || method.modifiers.is_static {
        return Err(invalid(kind, method, SignatureProblem::FinalOrStatic));
    }
    Ok(())
}

fn takes_invocation_context(method: &MethodDescriptor) -> bool {
    method.parameter_types.len() == 1 && method.parameter_types[0] == INVOCATION_CONTEXT_TYPE
}

/// 校验 around-invoke / around-timeout 方法
pub fn validate_around_signature(
    kind: InterceptorKind,
    method: &MethodDescriptor,
    config: &ResolverConfig,
) -> InterceptorResult<()> {
    check_modifiers(kind, method)?;

    if !takes_invocation_context(method) {
        return Err(invalid(
            kind,
            method,
            SignatureProblem::Parameters {
                expected: format!("a single {} parameter", INVOCATION_CONTEXT_TYPE),
                found: method.parameter_types.clone(),
            },
        ));
    }

    if method.return_type == TOP_TYPE {
        return Ok(());
    }

    let problem = SignatureProblem::ReturnType {
        expected: TOP_TYPE.to_string(),
        found: method.return_type.clone(),
    };

    // around-invoke 的协变返回类型为兼容旧应用而容忍
    if kind == InterceptorKind::AroundInvoke && is_reference_type(&method.return_type) {
        if config.validation_loggable {
            tracing::warn!(
                "The {} {} method returns {} instead of {}",
                method.qualified_name(),
                kind,
                method.return_type,
                TOP_TYPE
            );
            if config.validation_failable {
                return Err(invalid(kind, method, problem));
            }
        }
        return Ok(());
    }

    Err(invalid(kind, method, problem))
}

/// 校验生命周期方法
///
/// `on_target` 为 true 表示方法声明在目标组件类（或其父类）上
pub fn validate_lifecycle_signature(
    kind: InterceptorKind,
    method: &MethodDescriptor,
    on_target: bool,
    config: &ResolverConfig,
) -> InterceptorResult<()> {
    if on_target && kind == InterceptorKind::AroundConstruct {
        return Err(InterceptorError::AroundConstructOnTarget {
            class: method.declaring_class.clone(),
            method: method.name.clone(),
        }
        .logged());
    }

    check_modifiers(kind, method)?;

    let return_ok = method.return_type == VOID_TYPE
        || (config.allows_lifecycle_return_value() && method.return_type == TOP_TYPE);
    if !return_ok {
        let expected = if config.allows_lifecycle_return_value() {
            format!("{} or {}", VOID_TYPE, TOP_TYPE)
        } else {
            VOID_TYPE.to_string()
        };
        return Err(invalid(
            kind,
            method,
            SignatureProblem::ReturnType {
                expected,
                found: method.return_type.clone(),
            },
        ));
    }

    if on_target {
        if !method.parameter_types.is_empty() {
            return Err(invalid(
                kind,
                method,
                SignatureProblem::Parameters {
                    expected: "no parameters".to_string(),
                    found: method.parameter_types.clone(),
                },
            ));
        }
    } else if !takes_invocation_context(method) {
        return Err(invalid(
            kind,
            method,
            SignatureProblem::Parameters {
                expected: format!("a single {} parameter", INVOCATION_CONTEXT_TYPE),
                found: method.parameter_types.clone(),
            },
        ));
    }

    Ok(())
}

/// 错误信息中种类的写法
///
/// 有状态组件的 post-construct 在要求方写作 `@Init` / `init-method`
fn kind_label(
    kind: InterceptorKind,
    component_type: ComponentType,
    required_side: bool,
    source: DeclarationSource,
) -> String {
    let init_mapping = required_side
        && kind == InterceptorKind::PostConstruct
        && component_type == ComponentType::Stateful;

    match (init_mapping, source) {
        (true, DeclarationSource::Annotation) => "@Init".to_string(),
        (true, DeclarationSource::Descriptor) => "init-method".to_string(),
        (false, DeclarationSource::Annotation) => kind.annotation().to_string(),
        (false, DeclarationSource::Descriptor) => kind.element_name().to_string(),
    }
}

/// 旧式回调方法名交叉校验
///
/// 实现了旧式组件接口的目标类上，`ejbCreate` 等方法只能被声明为对应的生命周期种类
pub fn validate_legacy_callback(
    actual: InterceptorKind,
    method: &MethodDescriptor,
    profile: &ComponentProfile,
    source: DeclarationSource,
) -> InterceptorResult<()> {
    let required = match InterceptorKind::from_legacy_callback(&method.name) {
        Some(required) if required != actual => required,
        _ => return Ok(()),
    };

    let role = match profile.component_type.role() {
        Some(role) => role,
        None => return Ok(()),
    };

    Err(InterceptorError::LegacyCallbackMismatch {
        role,
        class: method.declaring_class.clone(),
        method: method.name.clone(),
        required: kind_label(required, profile.component_type, true, source),
        actual: kind_label(actual, profile.component_type, false, source),
    }
    .logged())
}
