//! 拦截器顺序计算
//!
//! 两个层面的顺序：
//! - 类级：默认拦截器（未排除时）+ 类级拦截器；显式全序存在时必须覆盖全部名称并直接替换
//! - 方法级：排除决定与类级一致时复用类级顺序，否则按方法自身的排除决定重建，
//!   然后追加方法级拦截器；方法绑定带显式全序时同样做完整性校验
//!
//! 排除标志的优先级：目标类上的排除决定 > 绑定记录显式设置的标志 > 注解（元数据不完整时）

use crate::binding::InterceptorBinding;
use crate::class::{ClassDescriptor, MethodDescriptor};
use crate::constants::{EXCLUDE_CLASS_INTERCEPTORS, EXCLUDE_DEFAULT_INTERCEPTORS};
use crate::error::{InterceptorError, InterceptorResult};
use std::collections::HashSet;

/// 方法级排除决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodExclusions {
    pub exclude_default: bool,
    pub exclude_class: bool,
}

/// 目标类是否排除默认拦截器
pub fn class_excludes_default(
    class: &ClassDescriptor,
    class_binding: Option<&InterceptorBinding>,
    metadata_complete: bool,
) -> bool {
    match class_binding.and_then(|b| b.exclude_default) {
        Some(exclude) => exclude,
        None => !metadata_complete && class.has_annotation(EXCLUDE_DEFAULT_INTERCEPTORS),
    }
}

/// 方法的排除决定
pub fn method_exclusions(
    class_excludes_default: bool,
    method: &MethodDescriptor,
    method_binding: Option<&InterceptorBinding>,
    metadata_complete: bool,
) -> MethodExclusions {
    let annotated = |annotation: &str| !metadata_complete && method.has_annotation(annotation);

    let exclude_default = class_excludes_default
        || method_binding
            .and_then(|b| b.exclude_default)
            .unwrap_or_else(|| annotated(EXCLUDE_DEFAULT_INTERCEPTORS));

    let exclude_class = method_binding
        .and_then(|b| b.exclude_class)
        .unwrap_or_else(|| annotated(EXCLUDE_CLASS_INTERCEPTORS));

    MethodExclusions {
        exclude_default,
        exclude_class,
    }
}

/// 默认拦截器名：模块默认绑定的无序列表，为空时取其全序列表
pub fn default_interceptor_names(module_default: Option<&InterceptorBinding>) -> Vec<String> {
    module_default
        .map(|b| b.declared_names().to_vec())
        .unwrap_or_default()
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// 类级拦截器名
///
/// 先取类上 `@Interceptors` 注解（元数据不完整时），再追加绑定记录中的名称：
/// 无序列表中已由注解提供的名称被跳过；全序列表中的默认拦截器名和注解名被跳过
pub fn class_interceptor_names(
    class: &ClassDescriptor,
    class_binding: Option<&InterceptorBinding>,
    default_names: &[String],
    metadata_complete: bool,
) -> Vec<String> {
    let mut names = Vec::new();

    if !metadata_complete {
        for name in class.interceptors.iter().flatten() {
            push_unique(&mut names, name);
        }
    }

    if let Some(binding) = class_binding {
        let annotated: HashSet<String> = names.iter().cloned().collect();

        if !binding.interceptor_classes.is_empty() {
            for name in &binding.interceptor_classes {
                if !annotated.contains(name) {
                    push_unique(&mut names, name);
                }
            }
        } else {
            for name in &binding.interceptor_order {
                if !default_names.contains(name) && !annotated.contains(name) {
                    push_unique(&mut names, name);
                }
            }
        }
    }

    names
}

/// `required` 中不在 `order` 里的名称，保持 `required` 的顺序
pub fn missing_names(required: &[String], order: &[String]) -> Vec<String> {
    let present: HashSet<&str> = order.iter().map(String::as_str).collect();
    let mut missing = Vec::new();
    for name in required {
        if !present.contains(name.as_str()) {
            push_unique(&mut missing, name);
        }
    }
    missing
}

/// 类级顺序
pub fn order_class_interceptors(
    component_id: &str,
    exclude_default: bool,
    default_names: &[String],
    class_names: &[String],
    class_binding: Option<&InterceptorBinding>,
) -> InterceptorResult<Vec<String>> {
    let mut required = Vec::new();
    if !exclude_default {
        for name in default_names {
            push_unique(&mut required, name);
        }
    }
    for name in class_names {
        push_unique(&mut required, name);
    }

    let explicit = class_binding
        .map(|b| b.interceptor_order.as_slice())
        .unwrap_or_default();
    if explicit.is_empty() {
        return Ok(required);
    }

    let missing = missing_names(&required, explicit);
    if !missing.is_empty() {
        return Err(InterceptorError::PartialClassOrder {
            component: component_id.to_string(),
            order: explicit.to_vec(),
            missing,
        }
        .logged());
    }

    Ok(explicit.to_vec())
}

/// 方法级顺序计算的输入
#[derive(Debug, Clone, Copy)]
pub struct MethodOrderInput<'a> {
    pub component_id: &'a str,
    pub class_order: &'a [String],
    pub class_excludes_default: bool,
    pub default_names: &'a [String],
    pub class_names: &'a [String],
    pub metadata_complete: bool,
}

/// 方法级顺序
pub fn order_method_interceptors(
    input: &MethodOrderInput<'_>,
    method: &MethodDescriptor,
    method_binding: Option<&InterceptorBinding>,
) -> InterceptorResult<Vec<String>> {
    let exclusions = method_exclusions(
        input.class_excludes_default,
        method,
        method_binding,
        input.metadata_complete,
    );

    let mut order = if !exclusions.exclude_class
        && exclusions.exclude_default == input.class_excludes_default
    {
        input.class_order.to_vec()
    } else {
        tracing::debug!(
            "Rebuilding interceptor order for {}: {:?}",
            method.qualified_name(),
            exclusions
        );
        let mut rebuilt = Vec::new();
        if !exclusions.exclude_default {
            for name in input.default_names {
                push_unique(&mut rebuilt, name);
            }
        }
        if !exclusions.exclude_class {
            for name in input.class_names {
                push_unique(&mut rebuilt, name);
            }
        }
        rebuilt
    };

    if !input.metadata_complete {
        for name in method.interceptors.iter().flatten() {
            push_unique(&mut order, name);
        }
    }

    let binding = match method_binding {
        Some(binding) => binding,
        None => return Ok(order),
    };

    for name in &binding.interceptor_classes {
        push_unique(&mut order, name);
    }

    if binding.interceptor_order.is_empty() {
        return Ok(order);
    }

    let missing = missing_names(&order, &binding.interceptor_order);
    if !missing.is_empty() {
        return Err(InterceptorError::PartialMethodOrder {
            component: input.component_id.to_string(),
            method: method.name.clone(),
            order: binding.interceptor_order.clone(),
            missing,
        }
        .logged());
    }

    Ok(binding.interceptor_order.clone())
}
