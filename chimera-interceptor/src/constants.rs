/// 类型与注解标识常量
///
/// 这个模块定义了解析过程中用到的类型名、注解名和接口名，
/// 确保描述符注册表、扫描器和校验器使用相同的标识符

/// 顶层引用类型
pub const TOP_TYPE: &str = "Object";

/// 无返回值
pub const VOID_TYPE: &str = "void";

/// 拦截器方法的调用上下文参数类型
pub const INVOCATION_CONTEXT_TYPE: &str = "InvocationContext";

/// 基本类型名称（不能作为引用类型返回）
pub const PRIMITIVE_TYPE_NAMES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// 类级 / 方法级排除默认拦截器的注解
pub const EXCLUDE_DEFAULT_INTERCEPTORS: &str = "ExcludeDefaultInterceptors";

/// 方法级排除类级拦截器的注解
pub const EXCLUDE_CLASS_INTERCEPTORS: &str = "ExcludeClassInterceptors";

/// 模块默认绑定使用的组件名
pub const DEFAULT_BINDING_COMPONENT: &str = "*";

/// 会话组件的旧式组件接口
pub const SESSION_BEAN_INTERFACE: &str = "SessionBean";

/// 消息驱动组件的旧式组件接口
pub const MESSAGE_DRIVEN_BEAN_INTERFACE: &str = "MessageDrivenBean";

/// 检查类型名是否为引用类型
///
/// # Example
/// ```
/// use chimera_interceptor::constants::is_reference_type;
///
/// assert!(is_reference_type("String"));
/// assert!(!is_reference_type("int"));
/// assert!(!is_reference_type("void"));
/// ```
pub fn is_reference_type(type_name: &str) -> bool {
    !PRIMITIVE_TYPE_NAMES.contains(&type_name)
}
