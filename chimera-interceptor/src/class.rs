//! 类与方法描述
//!
//! 解析器不做任何运行时反射，只通过 [`ClassIntrospector`] 查询预先构建好的元数据：
//! 类的继承关系、声明的方法、方法上的注解。默认实现是 [`ClassTable`]。

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// 方法修饰符
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodModifiers {
    pub is_final: bool,
    pub is_static: bool,
    pub is_private: bool,
    /// 编译器生成的桥接/合成方法，由外部的方法分类服务给出
    pub is_synthetic: bool,
}

/// 方法描述
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// 声明该方法的类
    pub declaring_class: String,
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: String,
    pub modifiers: MethodModifiers,
    /// 方法上的标记注解（简单名）
    pub annotations: BTreeSet<String>,
    /// 方法级 `@Interceptors` 列出的拦截器类名
    pub interceptors: Option<Vec<String>>,
}

impl MethodDescriptor {
    /// 创建无参、无返回值的方法，声明类在加入 [`ClassDescriptor`] 时填充
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            declaring_class: String::new(),
            name: name.into(),
            parameter_types: Vec::new(),
            return_type: crate::constants::VOID_TYPE.to_string(),
            modifiers: MethodModifiers::default(),
            annotations: BTreeSet::new(),
            interceptors: None,
        }
    }

    /// 追加一个参数类型
    pub fn param(mut self, type_name: impl Into<String>) -> Self {
        self.parameter_types.push(type_name.into());
        self
    }

    /// 设置返回类型
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }

    /// 添加标记注解
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// 设置方法级 `@Interceptors`
    pub fn interceptors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn final_(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn static_(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.modifiers.is_private = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.modifiers.is_synthetic = true;
        self
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// 名称与参数列表都相同
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name && self.parameter_types == other.parameter_types
    }

    /// `name:param1,param2,...` 形式的签名，与方法级绑定的签名比较时使用
    pub fn signature(&self) -> String {
        crate::merge::method_signature(&self.name, &self.parameter_types[..])
    }

    /// `Class.name(params)` 形式，用于日志
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}({})",
            self.declaring_class,
            self.name,
            self.parameter_types.join(",")
        )
    }
}

/// 类描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    /// 直接父类，`None` 表示父类是顶层类型
    pub superclass: Option<String>,
    /// 直接实现的接口
    pub interfaces: Vec<String>,
    /// 类上的标记注解（简单名）
    pub annotations: BTreeSet<String>,
    /// 类级 `@Interceptors` 列出的拦截器类名
    pub interceptors: Option<Vec<String>>,
    /// 类自身声明的方法（不含继承的方法）
    pub methods: Vec<Arc<MethodDescriptor>>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            annotations: BTreeSet::new(),
            interceptors: None,
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    pub fn interceptors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// 添加声明方法，声明类设置为当前类
    pub fn method(mut self, mut method: MethodDescriptor) -> Self {
        method.declaring_class = self.name.clone();
        self.methods.push(Arc::new(method));
        self
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// 是否声明了与给定方法签名相同的非合成方法
    pub fn declares_same_signature(&self, method: &MethodDescriptor) -> bool {
        self.methods
            .iter()
            .any(|m| !m.modifiers.is_synthetic && m.same_signature(method))
    }
}

/// 类元数据查询能力
///
/// 相当于"类加载 + 反射"，由容器提供实现
pub trait ClassIntrospector: Send + Sync {
    /// 按名称加载类，找不到时返回 `None`
    fn load_class(&self, name: &str) -> Option<Arc<ClassDescriptor>>;

    /// 检查类是否（直接或间接）继承或实现了指定类型
    fn is_assignable_to(&self, class: &ClassDescriptor, type_name: &str) -> bool {
        if class.name == type_name {
            return true;
        }

        let mut visited = HashSet::new();
        let mut pending: Vec<String> = class.interfaces.clone();
        pending.extend(class.superclass.iter().cloned());

        while let Some(name) = pending.pop() {
            if name == type_name {
                return true;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(current) = self.load_class(&name) {
                pending.extend(current.interfaces.iter().cloned());
                pending.extend(current.superclass.iter().cloned());
            }
        }

        false
    }
}

/// 内存中的类元数据表
///
/// 可在多个模块的并发解析之间共享
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: RwLock<HashMap<String, Arc<ClassDescriptor>>>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类描述，同名类会被替换
    pub fn register(&self, class: ClassDescriptor) -> Arc<ClassDescriptor> {
        let class = Arc::new(class);
        let previous = self
            .classes
            .write()
            .insert(class.name.clone(), Arc::clone(&class));
        if previous.is_some() {
            tracing::debug!("Replaced class metadata for '{}'", class.name);
        }
        class
    }

    /// 批量注册
    pub fn register_all(&self, classes: impl IntoIterator<Item = ClassDescriptor>) {
        for class in classes {
            self.register(class);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl ClassIntrospector for ClassTable {
    fn load_class(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_attaches_declaring_class() {
        let class = ClassDescriptor::new("Foo").method(MethodDescriptor::new("bar").param("int"));

        assert_eq!(class.methods[0].declaring_class, "Foo");
        assert_eq!(class.methods[0].qualified_name(), "Foo.bar(int)");
        assert_eq!(class.methods[0].signature(), "bar:int");
    }

    #[test]
    fn test_synthetic_methods_do_not_match_signature() {
        let base = MethodDescriptor::new("init");
        let class = ClassDescriptor::new("Sub").method(MethodDescriptor::new("init").synthetic());

        assert!(!class.declares_same_signature(&base));
    }

    #[test]
    fn test_class_table_register_and_load() {
        let table = ClassTable::new();
        assert!(table.is_empty());

        table.register(ClassDescriptor::new("A"));
        table.register(ClassDescriptor::new("A").annotated("Marker"));

        assert_eq!(table.len(), 1);
        assert!(table.load_class("A").unwrap().has_annotation("Marker"));
        assert!(table.load_class("B").is_none());
    }

    #[test]
    fn test_is_assignable_to_walks_hierarchy() {
        let table = ClassTable::new();
        table.register(ClassDescriptor::new("LegacyBase").implements("SessionBean"));
        table.register(ClassDescriptor::new("Middle").extends("LegacyBase"));
        let leaf = table.register(ClassDescriptor::new("Leaf").extends("Middle"));
        let other = table.register(ClassDescriptor::new("Other").implements("Runnable"));

        assert!(table.is_assignable_to(&leaf, "SessionBean"));
        assert!(table.is_assignable_to(&leaf, "Leaf"));
        assert!(!table.is_assignable_to(&other, "SessionBean"));
    }

    #[test]
    fn test_is_assignable_to_unregistered_class() {
        let table = ClassTable::new();
        let detached = ClassDescriptor::new("Detached").implements("MessageDrivenBean");

        assert!(table.is_assignable_to(&detached, "MessageDrivenBean"));
    }
}
