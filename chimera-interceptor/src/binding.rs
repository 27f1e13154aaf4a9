//! 拦截器绑定记录
//!
//! 绑定记录由外部的描述符解析器生成，这里只是它的规范化内存表示。
//! 一条记录的作用域由 `component_name` 和可选的方法选择器决定：
//!
//! | 风格 | component_name | method |
//! |------|----------------|--------|
//! | 默认（style 1） | `*` | 无 |
//! | 类级（style 2） | 组件名 | 无 |
//! | 方法名（style 3） | 组件名 | 只有方法名 |
//! | 方法签名（style 4） | 组件名 | 方法名 + 参数列表 |

use crate::constants::DEFAULT_BINDING_COMPONENT;
use serde::Deserialize;
use std::fmt;

/// 方法选择器
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodSelector {
    pub name: String,
    /// `None` 表示按方法名匹配所有重载
    #[serde(default)]
    pub params: Option<Vec<String>>,
}

/// 绑定风格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingStyle {
    /// 模块默认绑定
    Default,
    /// 类级绑定
    Class,
    /// 按方法名绑定
    MethodName,
    /// 按方法签名绑定
    MethodSignature,
}

/// 拦截器绑定记录
///
/// `interceptor_classes` 与 `interceptor_order` 在描述符中互斥；
/// 合并多条记录后两者可能同时非空
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterceptorBinding {
    /// 目标组件名，`*` 表示模块默认绑定
    pub component_name: String,

    /// 追加的拦截器类名（无序声明，按声明顺序追加）
    #[serde(default)]
    pub interceptor_classes: Vec<String>,

    /// 显式的全序拦截器列表
    #[serde(default)]
    pub interceptor_order: Vec<String>,

    /// 排除默认拦截器（未设置 / true / false）
    #[serde(default)]
    pub exclude_default: Option<bool>,

    /// 排除类级拦截器（未设置 / true / false）
    #[serde(default)]
    pub exclude_class: Option<bool>,

    #[serde(default)]
    pub method: Option<MethodSelector>,
}

impl InterceptorBinding {
    fn new(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            interceptor_classes: Vec::new(),
            interceptor_order: Vec::new(),
            exclude_default: None,
            exclude_class: None,
            method: None,
        }
    }

    /// 模块默认绑定
    pub fn module_default() -> Self {
        Self::new(DEFAULT_BINDING_COMPONENT)
    }

    /// 类级绑定
    pub fn for_component(component_name: impl Into<String>) -> Self {
        Self::new(component_name)
    }

    /// 按方法名的绑定
    pub fn for_method(component_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        let mut binding = Self::new(component_name);
        binding.method = Some(MethodSelector {
            name: method_name.into(),
            params: None,
        });
        binding
    }

    /// 按方法签名的绑定
    pub fn for_signature<I, S>(
        component_name: impl Into<String>,
        method_name: impl Into<String>,
        params: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut binding = Self::new(component_name);
        binding.method = Some(MethodSelector {
            name: method_name.into(),
            params: Some(params.into_iter().map(Into::into).collect()),
        });
        binding
    }

    /// 设置无序的拦截器类列表
    pub fn classes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptor_classes = names.into_iter().map(Into::into).collect();
        self
    }

    /// 设置显式的全序列表
    pub fn order<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptor_order = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_default(mut self, exclude: bool) -> Self {
        self.exclude_default = Some(exclude);
        self
    }

    pub fn exclude_class(mut self, exclude: bool) -> Self {
        self.exclude_class = Some(exclude);
        self
    }

    pub fn style(&self) -> BindingStyle {
        match &self.method {
            _ if self.component_name == DEFAULT_BINDING_COMPONENT => BindingStyle::Default,
            None => BindingStyle::Class,
            Some(MethodSelector { params: None, .. }) => BindingStyle::MethodName,
            Some(MethodSelector { params: Some(_), .. }) => BindingStyle::MethodSignature,
        }
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().map(|m| m.name.as_str())
    }

    /// 已声明的拦截器名：优先取无序列表，为空时取全序列表
    pub fn declared_names(&self) -> &[String] {
        if !self.interceptor_classes.is_empty() {
            &self.interceptor_classes
        } else {
            &self.interceptor_order
        }
    }
}

impl fmt::Display for InterceptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interceptor-binding[{}", self.component_name)?;
        if let Some(method) = &self.method {
            write!(f, ".{}", method.name)?;
            if let Some(params) = &method.params {
                write!(f, "({})", params.join(","))?;
            }
        }
        if !self.interceptor_classes.is_empty() {
            write!(f, " classes={:?}", self.interceptor_classes)?;
        }
        if !self.interceptor_order.is_empty() {
            write!(f, " order={:?}", self.interceptor_order)?;
        }
        if let Some(exclude) = self.exclude_default {
            write!(f, " exclude-default={}", exclude)?;
        }
        if let Some(exclude) = self.exclude_class {
            write!(f, " exclude-class={}", exclude)?;
        }
        write!(f, "]")
    }
}
