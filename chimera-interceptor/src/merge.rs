//! 绑定合并
//!
//! 同一作用域可能有多条绑定记录，这里把它们校验并合并为一条规范记录：
//! - 模块默认绑定最多一条，重复即为致命错误
//! - 类级、方法级绑定按声明顺序拼接拦截器列表，后一条记录显式设置的排除标志覆盖前一条
//! - 方法级绑定必须能匹配到至少一个可拦截方法

use crate::binding::{BindingStyle, InterceptorBinding};
use crate::class::MethodDescriptor;
use crate::component::{ComponentMetadata, ModuleMetadata};
use crate::error::{InterceptorError, InterceptorResult, MethodBindingStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static BLANKS_BEFORE_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +([\[\]])").expect("bracket pattern is valid"));
static REPEATED_BLANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" {2,}").expect("blank pattern is valid"));

/// 生成 `name:param1,param2,...` 形式的方法签名
///
/// # Example
/// ```
/// use chimera_interceptor::merge::method_signature;
///
/// assert_eq!(method_signature("bar", &["int", "String[]"]), "bar:int,String[]");
/// assert_eq!(method_signature("bar", &[] as &[&str]), "bar:");
/// ```
pub fn method_signature<S: AsRef<str>>(name: &str, params: &[S]) -> String {
    let params: Vec<&str> = params.iter().map(|p| p.as_ref()).collect();
    format!("{}:{}", name, params.join(","))
}

/// 删除数组括号附近的空白，使 `char [ ]` 与 `char[]` 比较相等
///
/// # Example
/// ```
/// use chimera_interceptor::merge::normalize_signature;
///
/// assert_eq!(normalize_signature("int char [] char[ ] [ ]"), "int char[] char[][]");
/// ```
pub fn normalize_signature(signature: &str) -> String {
    let signature = signature.trim();
    let without_bracket_blanks = BLANKS_BEFORE_BRACKET.replace_all(signature, "$1");
    REPEATED_BLANKS
        .replace_all(&without_bracket_blanks, " ")
        .into_owned()
}

/// 合并后的绑定记录
#[derive(Debug, Clone, Default)]
pub struct MergedBindings {
    /// 模块默认绑定
    pub module_default: Option<InterceptorBinding>,
    /// 组件的类级绑定
    pub class_binding: Option<InterceptorBinding>,
    /// 方法名 -> 按方法名的绑定
    pub by_method_name: HashMap<String, InterceptorBinding>,
    /// 规范化签名 -> 按签名的绑定
    pub by_signature: HashMap<String, InterceptorBinding>,
}

impl MergedBindings {
    /// 查找方法适用的绑定，按签名的绑定优先于按方法名的绑定
    pub fn for_method(&self, method: &MethodDescriptor) -> Option<&InterceptorBinding> {
        let signature = normalize_signature(&method.signature());
        let binding = self
            .by_signature
            .get(&signature)
            .or_else(|| self.by_method_name.get(&method.name));

        if let Some(binding) = binding {
            tracing::trace!("Binding for method {}: {}", signature, binding);
        }
        binding
    }
}

/// 合并两条同作用域的记录
///
/// 拦截器列表与全序列表分别按声明顺序拼接；排除标志只有在后一条显式设置时才覆盖
pub fn merge_pair(first: InterceptorBinding, second: &InterceptorBinding) -> InterceptorBinding {
    let mut merged = first;
    merged
        .interceptor_classes
        .extend(second.interceptor_classes.iter().cloned());
    merged
        .interceptor_order
        .extend(second.interceptor_order.iter().cloned());

    if second.exclude_default.is_some() {
        merged.exclude_default = second.exclude_default;
    }
    if second.exclude_class.is_some() {
        merged.exclude_class = second.exclude_class;
    }

    merged
}

/// 校验并合并模块中与目标组件相关的全部绑定记录
pub fn merge_bindings(
    module: &ModuleMetadata,
    component: &ComponentMetadata,
) -> InterceptorResult<MergedBindings> {
    let mut merged = MergedBindings::default();
    let component_id = module.qualified_name(&component.name);

    for binding in &module.bindings {
        match binding.style() {
            BindingStyle::Default => {
                if merged.module_default.is_some() {
                    return Err(InterceptorError::DuplicateDefaultBinding {
                        application: module.application.clone(),
                        module: module.name.clone(),
                    }
                    .logged());
                }
                merged.module_default = Some(binding.clone());
            }
            _ if binding.component_name != component.name => {}
            BindingStyle::Class => {
                merged.class_binding = Some(match merged.class_binding.take() {
                    Some(existing) => merge_pair(existing, binding),
                    None => binding.clone(),
                });
            }
            BindingStyle::MethodName => {
                let method_name = binding.method_name().unwrap_or_default().to_string();
                match merged.by_method_name.remove(&method_name) {
                    Some(existing) => {
                        merged
                            .by_method_name
                            .insert(method_name, merge_pair(existing, binding));
                    }
                    None => {
                        let found = component
                            .interceptable_methods()
                            .any(|m| m.name == method_name);
                        if !found {
                            tracing::debug!("Method not found for {}", binding);
                            return Err(InterceptorError::MethodNotFound {
                                component: component_id,
                                method: method_name,
                                style: MethodBindingStyle::MethodName,
                            }
                            .logged());
                        }
                        merged.by_method_name.insert(method_name, binding.clone());
                    }
                }
            }
            BindingStyle::MethodSignature => {
                let selector = match &binding.method {
                    Some(selector) => selector,
                    None => continue,
                };
                let params = selector.params.as_deref().unwrap_or_default();
                let signature = normalize_signature(&method_signature(&selector.name, params));

                match merged.by_signature.remove(&signature) {
                    Some(existing) => {
                        tracing::debug!("Replaced signature binding for {}", signature);
                        merged
                            .by_signature
                            .insert(signature, merge_pair(existing, binding));
                    }
                    None => {
                        let found = component.interceptable_methods().any(|m| {
                            m.name == selector.name
                                && normalize_signature(&m.signature()) == signature
                        });
                        if !found {
                            tracing::debug!("Method not found for {}", binding);
                            return Err(InterceptorError::MethodNotFound {
                                component: component_id,
                                method: selector.name.clone(),
                                style: MethodBindingStyle::MethodSignature,
                            }
                            .logged());
                        }
                        tracing::debug!("Added signature binding for {}", signature);
                        merged.by_signature.insert(signature, binding.clone());
                    }
                }
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassDescriptor;
    use crate::component::ComponentType;

    fn component() -> ComponentMetadata {
        let class = ClassDescriptor::new("FooBean")
            .method(MethodDescriptor::new("bar"))
            .method(MethodDescriptor::new("bar").param("int"))
            .method(MethodDescriptor::new("load").param("char[]").param("String"))
            .method(MethodDescriptor::new("expire").param("Timer"));

        ComponentMetadata::new("Foo", "FooBean", ComponentType::Stateless)
            .business_method(class.methods[0].clone())
            .business_method(class.methods[1].clone())
            .business_method(class.methods[2].clone())
            .timer_method(class.methods[3].clone())
    }

    fn module(bindings: Vec<InterceptorBinding>) -> ModuleMetadata {
        let mut module = ModuleMetadata::new("app", "mod");
        module.bindings = bindings;
        module
    }

    #[test]
    fn test_normalize_signature() {
        assert_eq!(normalize_signature("load:char [ ],String"), "load:char[],String");
        assert_eq!(normalize_signature("  load:int  [][ ] "), "load:int[][]");
        assert_eq!(normalize_signature("load:a  b"), "load:a b");
        assert_eq!(normalize_signature("load:"), "load:");
    }

    #[test]
    fn test_merge_pair_appends_and_keeps_order() {
        let first = InterceptorBinding::for_component("Foo")
            .order(["B", "A"])
            .exclude_default(false);
        let second = InterceptorBinding::for_component("Foo").classes(["C"]);

        let merged = merge_pair(first, &second);
        assert_eq!(merged.interceptor_order, vec!["B", "A"]);
        assert_eq!(merged.interceptor_classes, vec!["C"]);
        assert_eq!(merged.exclude_default, Some(false));
    }

    #[test]
    fn test_merge_pair_explicit_flag_overrides() {
        let first = InterceptorBinding::for_component("Foo")
            .classes(["A"])
            .exclude_default(false);
        let second = InterceptorBinding::for_component("Foo")
            .classes(["B"])
            .exclude_default(true);

        let merged = merge_pair(first, &second);
        assert_eq!(merged.interceptor_classes, vec!["A", "B"]);
        assert_eq!(merged.exclude_default, Some(true));
    }

    #[test]
    fn test_merge_pair_unset_flag_never_overrides() {
        let first = InterceptorBinding::for_method("Foo", "bar").exclude_class(true);
        let second = InterceptorBinding::for_method("Foo", "bar").classes(["A"]);

        let merged = merge_pair(first, &second);
        assert_eq!(merged.exclude_class, Some(true));
        assert_eq!(merged.exclude_default, None);
    }

    #[test]
    fn test_duplicate_module_default_is_fatal() {
        let module = module(vec![
            InterceptorBinding::module_default().classes(["A"]),
            InterceptorBinding::module_default().classes(["B"]),
        ]);

        let err = merge_bindings(&module, &component()).unwrap_err();
        assert!(matches!(
            err,
            InterceptorError::DuplicateDefaultBinding { ref module, .. } if module == "mod"
        ));
    }

    #[test]
    fn test_bindings_for_other_components_are_ignored() {
        let module = module(vec![
            InterceptorBinding::for_component("Other").classes(["A"]),
            InterceptorBinding::for_method("Other", "missing"),
        ]);

        let merged = merge_bindings(&module, &component()).unwrap();
        assert!(merged.class_binding.is_none());
        assert!(merged.by_method_name.is_empty());
    }

    #[test]
    fn test_class_bindings_are_merged_in_declaration_order() {
        let module = module(vec![
            InterceptorBinding::for_component("Foo").classes(["A"]),
            InterceptorBinding::for_component("Foo").classes(["B"]).exclude_default(true),
        ]);

        let merged = merge_bindings(&module, &component()).unwrap();
        let class_binding = merged.class_binding.unwrap();
        assert_eq!(class_binding.interceptor_classes, vec!["A", "B"]);
        assert_eq!(class_binding.exclude_default, Some(true));
    }

    #[test]
    fn test_method_name_binding_must_match_interceptable_method() {
        let module = module(vec![InterceptorBinding::for_method("Foo", "missing")]);

        let err = merge_bindings(&module, &component()).unwrap_err();
        assert_eq!(
            err,
            InterceptorError::MethodNotFound {
                component: "app#mod#Foo".into(),
                method: "missing".into(),
                style: MethodBindingStyle::MethodName,
            }
        );
    }

    #[test]
    fn test_method_name_binding_matches_timer_method() {
        let module = module(vec![InterceptorBinding::for_method("Foo", "expire").classes(["T"])]);

        let merged = merge_bindings(&module, &component()).unwrap();
        assert!(merged.by_method_name.contains_key("expire"));
    }

    #[test]
    fn test_signature_binding_normalizes_array_blanks() {
        let module = module(vec![
            InterceptorBinding::for_signature("Foo", "load", ["char [ ]", "String"]).classes(["A"]),
            InterceptorBinding::for_signature("Foo", "load", ["char[]", "String"]).classes(["B"]),
        ]);

        let merged = merge_bindings(&module, &component()).unwrap();
        let binding = &merged.by_signature["load:char[],String"];
        assert_eq!(binding.interceptor_classes, vec!["A", "B"]);
    }

    #[test]
    fn test_signature_binding_must_match_exact_parameters() {
        let module = module(vec![InterceptorBinding::for_signature("Foo", "bar", ["long"])]);

        let err = merge_bindings(&module, &component()).unwrap_err();
        assert!(matches!(
            err,
            InterceptorError::MethodNotFound {
                style: MethodBindingStyle::MethodSignature,
                ..
            }
        ));
    }

    #[test]
    fn test_signature_binding_takes_precedence_over_method_name() {
        let module = module(vec![
            InterceptorBinding::for_method("Foo", "bar").classes(["ByName"]),
            InterceptorBinding::for_signature("Foo", "bar", ["int"]).classes(["BySignature"]),
        ]);
        let component = component();
        let merged = merge_bindings(&module, &component).unwrap();

        let no_arg = &component.business_methods[0];
        let int_arg = &component.business_methods[1];
        assert_eq!(
            merged.for_method(no_arg).unwrap().interceptor_classes,
            vec!["ByName"]
        );
        assert_eq!(
            merged.for_method(int_arg).unwrap().interceptor_classes,
            vec!["BySignature"]
        );
    }
}
