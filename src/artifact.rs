//! Generated artifact model.
//!
//! Units are structured and syntax-agnostic: a downstream emitter renders them
//! into a concrete language. The pipeline hands them off serialized as JSON.

use serde::Serialize;

/// Runtime types that generated code implements or calls into.
pub mod runtime {
    pub const OPTIMIZATION_LOADER: &str = "prebake.runtime.OptimizationLoader";
    pub const APPLICATION_CONFIGURER: &str = "prebake.runtime.ApplicationConfigurer";
    pub const SERVICE_TABLE: &str = "prebake.runtime.ServiceTable";
    pub const STATIC_SERVICES: &str = "prebake.runtime.StaticServices";
    pub const PROPERTY_SOURCE: &str = "prebake.runtime.PropertySource";
    pub const CONSTANT_PROPERTY_SOURCES: &str = "prebake.runtime.ConstantPropertySources";
    pub const ENVIRONMENT: &str = "prebake.runtime.Environment";
    pub const ENVIRONMENT_PROPERTIES: &str = "prebake.runtime.EnvironmentProperties";
    pub const KNOWN_MISSING_TYPES: &str = "prebake.runtime.KnownMissingTypes";
    pub const PUBLISHERS: &str = "prebake.runtime.Publishers";
    pub const LOGGING_CONFIGURATOR: &str = "prebake.runtime.LoggingConfigurator";
    pub const ENVIRONMENT_CONFIGURER: &str = "prebake.runtime.EnvironmentConfigurer";
    pub const CONTEXT_BUILDER: &str = "prebake.runtime.ContextBuilder";
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Reference to a type (class literal).
    TypeRef(String),
    /// Local variable or parameter.
    Ident(String),
    Call {
        target: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    New {
        type_name: String,
        args: Vec<Expr>,
    },
    /// Reference to a method or constructor (`Type::method`, `Type::new`).
    MethodRef {
        type_name: String,
        method: String,
    },
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn type_ref(name: impl Into<String>) -> Self {
        Expr::TypeRef(name.into())
    }

    /// Call on the current unit (no receiver).
    pub fn call(method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: None,
            method: method.into(),
            args,
        }
    }

    pub fn call_on(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: Some(Box::new(target)),
            method: method.into(),
            args,
        }
    }

    /// Static call `Type.method(args)`.
    pub fn call_static(type_name: impl Into<String>, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::call_on(Expr::TypeRef(type_name.into()), method, args)
    }

    pub fn new_instance(type_name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::New {
            type_name: type_name.into(),
            args,
        }
    }

    pub fn method_ref(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Expr::MethodRef {
            type_name: type_name.into(),
            method: method.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Expr(Expr),
    Let { name: String, value: Expr },
    Return(Expr),
    If { condition: Expr, then: Vec<Statement> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSpec {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<Param>,
    pub returns: Option<String>,
    pub body: Vec<Statement>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            params: Vec::new(),
            returns: None,
            body: Vec::new(),
        }
    }

    pub fn new_static(name: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::new(name)
        }
    }

    pub fn param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.returns = Some(type_name.into());
        self
    }

    pub fn statement(mut self, statement: Statement) -> Self {
        self.body.push(statement);
        self
    }

    pub fn body(mut self, statements: Vec<Statement>) -> Self {
        self.body.extend(statements);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub is_static: bool,
    pub initializer: Option<Expr>,
}

/// Reference to a generated unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactRef {
    pub namespace: String,
    pub name: String,
}

impl ArtifactRef {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// A generated source unit (one type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUnit {
    pub namespace: String,
    pub name: String,
    pub implements: Vec<String>,
    pub fields: Vec<FieldSpec>,
    pub methods: Vec<MethodSpec>,
    pub static_init: Vec<Statement>,
}

impl SourceUnit {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            implements: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            static_init: Vec::new(),
        }
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodSpec>) -> Self {
        self.methods.extend(methods);
        self
    }

    pub fn with_static_init(mut self, statements: Vec<Statement>) -> Self {
        self.static_init.extend(statements);
        self
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    pub fn artifact_ref(&self) -> ArtifactRef {
        ArtifactRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }
}
