//! 拦截器解析错误
//!
//! 所有配置错误都是致命的：出现任何一个错误，目标组件的拦截器元数据都不会被构建。
//! 不存在部分结果或降级结果。

use crate::constants::{MESSAGE_DRIVEN_BEAN_INTERFACE, SESSION_BEAN_INTERFACE};
use crate::kind::InterceptorKind;
use std::fmt;
use thiserror::Error;

/// 绑定记录作用于方法时的两种选择器风格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodBindingStyle {
    /// 按方法名匹配（style 3）
    MethodName,
    /// 按方法名 + 精确参数列表匹配（style 4）
    MethodSignature,
}

impl fmt::Display for MethodBindingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBindingStyle::MethodName => write!(f, "style 3"),
            MethodBindingStyle::MethodSignature => write!(f, "style 4"),
        }
    }
}

/// 旧式组件接口对应的组件角色，用于回调命名冲突的错误信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRole {
    Stateless,
    Stateful,
    MessageDriven,
}

impl ComponentRole {
    /// 该角色实现的旧式组件接口
    pub fn legacy_interface(&self) -> &'static str {
        match self {
            ComponentRole::Stateless | ComponentRole::Stateful => SESSION_BEAN_INTERFACE,
            ComponentRole::MessageDriven => MESSAGE_DRIVEN_BEAN_INTERFACE,
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentRole::Stateless => write!(f, "stateless session"),
            ComponentRole::Stateful => write!(f, "stateful session"),
            ComponentRole::MessageDriven => write!(f, "message-driven"),
        }
    }
}

/// 方法签名校验失败的具体原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureProblem {
    /// 方法被声明为 final 或 static
    FinalOrStatic,
    /// 参数列表不符合要求
    Parameters {
        expected: String,
        found: Vec<String>,
    },
    /// 返回类型不符合要求
    ReturnType {
        expected: String,
        found: String,
    },
}

impl fmt::Display for SignatureProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureProblem::FinalOrStatic => {
                write!(f, "the method must not be declared final or static")
            }
            SignatureProblem::Parameters { expected, found } => write!(
                f,
                "the method must take {} but takes ({})",
                expected,
                found.join(", ")
            ),
            SignatureProblem::ReturnType { expected, found } => write!(
                f,
                "the method must return {} but returns {}",
                expected, found
            ),
        }
    }
}

/// 拦截器配置错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterceptorError {
    #[error(
        "The {module} module of the {application} application has more than one default \
         interceptor binding. Only one default interceptor binding is allowed"
    )]
    DuplicateDefaultBinding { application: String, module: String },

    #[error(
        "The {method} method is not found among the business or timer methods of the \
         {component} component. A {style} interceptor binding requires the method to be \
         interceptable"
    )]
    MethodNotFound {
        component: String,
        method: String,
        style: MethodBindingStyle,
    },

    #[error(
        "{order:?} is not a total ordering of class-level interceptors for component \
         {component}. It is missing interceptor names: {missing:?}"
    )]
    PartialClassOrder {
        component: String,
        order: Vec<String>,
        missing: Vec<String>,
    },

    #[error(
        "{order:?} is not a total ordering of method-level interceptors for method {method} \
         of component {component}. It is missing interceptor names: {missing:?}"
    )]
    PartialMethodOrder {
        component: String,
        method: String,
        order: Vec<String>,
        missing: Vec<String>,
    },

    #[error(
        "Only one {kind} interceptor method is allowed in class {class}. Both {first} and \
         {second} are configured as {kind} methods"
    )]
    DuplicateInterceptorMethod {
        class: String,
        kind: InterceptorKind,
        first: String,
        second: String,
    },

    #[error("The {method} {kind} method of class {class} has an invalid signature: {problem}")]
    InvalidSignature {
        class: String,
        method: String,
        kind: InterceptorKind,
        problem: SignatureProblem,
    },

    #[error(
        "The {method} method of the {class} component class is an around-construct method. \
         Around-construct methods are only allowed on interceptor classes"
    )]
    AroundConstructOnTarget { class: String, method: String },

    #[error(
        "Because the {class} {role} component implements the {} interface, the {method} \
         method must be a {required} method and not a {actual} method",
        .role.legacy_interface()
    )]
    LegacyCallbackMismatch {
        role: ComponentRole,
        class: String,
        method: String,
        required: String,
        actual: String,
    },

    #[error("The interceptor class {name} could not be found or loaded")]
    ClassNotFound { name: String },
}

impl InterceptorError {
    /// 稳定的消息键，写入日志以便运维检索
    pub fn code(&self) -> &'static str {
        match self {
            InterceptorError::DuplicateDefaultBinding { .. } => "DUPLICATE_DEFAULT_INTERCEPTOR_BINDING",
            InterceptorError::MethodNotFound { .. } => "METHOD_NOT_FOUND_FOR_INTERCEPTOR_BINDING",
            InterceptorError::PartialClassOrder { .. } => "PARTIAL_CLASS_INTERCEPTOR_ORDER",
            InterceptorError::PartialMethodOrder { .. } => "PARTIAL_METHOD_INTERCEPTOR_ORDER",
            InterceptorError::DuplicateInterceptorMethod { .. } => "DUPLICATE_INTERCEPTOR_METHOD",
            InterceptorError::InvalidSignature { .. } => "INVALID_INTERCEPTOR_METHOD_SIGNATURE",
            InterceptorError::AroundConstructOnTarget { .. } => "AROUND_CONSTRUCT_ON_COMPONENT_CLASS",
            InterceptorError::LegacyCallbackMismatch { .. } => "INVALID_CALLBACK_METHOD",
            InterceptorError::ClassNotFound { .. } => "INTERCEPTOR_CLASS_NOT_FOUND",
        }
    }

    /// 记录错误日志后返回自身，便于 `return Err(e.logged())`
    pub(crate) fn logged(self) -> Self {
        tracing::error!(code = self.code(), "{}", self);
        self
    }
}

/// 拦截器解析结果类型
pub type InterceptorResult<T> = Result<T, InterceptorError>;
