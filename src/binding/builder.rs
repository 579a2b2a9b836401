//! Declarative schema construction.
//!
//! A configuration type lists its bound fields once, in order, together with
//! the handlers they dispatch to. Handler names used in annotations resolve
//! against the builder's registry; names that do not resolve are dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binding::annotation::Annotation;
use crate::binding::key;
use crate::binding::table::{field_setter, Binding, BindingTable, FieldSetter, Handler, SchemaError};
use crate::coerce::Coerce;

/// A configuration structure that declares its own KV schema.
///
/// ```
/// use owl_config::{Configurable, Field, SchemaBuilder};
///
/// #[derive(Clone, Default)]
/// struct AppConfig {
///     port: Option<i64>,
///     url: String,
/// }
///
/// impl AppConfig {
///     fn on_port(&self, _key: &str, _value: &str) {}
/// }
///
/// impl Configurable for AppConfig {
///     fn schema() -> SchemaBuilder<Self> {
///         SchemaBuilder::new()
///             .namespace("App")
///             .handler("on_port", AppConfig::on_port)
///             .field(
///                 Field::bind("api-port:on_port", |c: &mut Self| &mut c.port)
///                     .default_value("8080"),
///             )
///             .field(Field::bind("api-url", |c: &mut Self| &mut c.url))
///     }
/// }
///
/// let schema = AppConfig::schema().build().unwrap();
/// assert!(schema.table().lookup("App/api-port").unwrap().auto_watch());
/// ```
pub trait Configurable: Clone + Send + Sync + 'static {
    fn schema() -> SchemaBuilder<Self>;
}

/// Declaration of one bound field.
pub struct Field<T> {
    annotation: String,
    default: Option<String>,
    handlers: Vec<Handler<T>>,
    watch: bool,
    kind: &'static str,
    setter: FieldSetter<T>,
}

impl<T> Field<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Bind the field reached through `accessor` using an annotation of the
    /// form `key[:handler1,handler2|*]`.
    pub fn bind<F, A>(annotation: impl Into<String>, accessor: A) -> Self
    where
        F: Coerce + Clone,
        A: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        Self {
            annotation: annotation.into(),
            default: None,
            handlers: Vec::new(),
            watch: false,
            kind: F::KIND,
            setter: field_setter(accessor),
        }
    }

    /// Value applied at construction, before any remote value.
    pub fn default_value(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    /// Append a handler after the annotation's named handlers. Implies watching.
    pub fn on_change<H>(mut self, handler: H) -> Self
    where
        H: Fn(&T, &str, &str) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Watch the key without a handler; same as the `*` token.
    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("annotation", &self.annotation)
            .field("default", &self.default)
            .field("handlers", &self.handlers.len())
            .field("watch", &self.watch)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Collects the namespace, named handlers and fields of a configuration type.
pub struct SchemaBuilder<T> {
    namespace: Option<String>,
    handlers: HashMap<String, Handler<T>>,
    fields: Vec<Field<T>>,
}

impl<T> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self {
            namespace: None,
            handlers: HashMap::new(),
            fields: Vec::new(),
        }
    }
}

impl<T> SchemaBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Base path joined in front of every key.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Register a handler that annotations can refer to by `name`.
    pub fn handler<H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&T, &str, &str) + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Resolve annotations and handlers into a binding table.
    ///
    /// Fields with an unusable annotation are skipped with a warning. A key
    /// bound twice fails the whole build.
    pub fn build(self) -> Result<Schema<T>, SchemaError> {
        let namespace = self
            .namespace
            .filter(|ns| !ns.trim_matches('/').is_empty());
        let mut table = BindingTable::with_capacity(self.fields.len());

        for field in self.fields {
            let annotation = match field.annotation.parse::<Annotation>() {
                Ok(annotation) => annotation,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping field with unusable binding annotation");
                    continue;
                }
            };

            let key = key::join(namespace.as_deref(), &annotation.key);

            let mut handlers = Vec::with_capacity(annotation.handlers.len() + field.handlers.len());
            for name in &annotation.handlers {
                match self.handlers.get(name) {
                    Some(handler) => handlers.push(Arc::clone(handler)),
                    None => {
                        tracing::debug!(key = %key, handler = %name, "Ignoring unresolved handler")
                    }
                }
            }
            handlers.extend(field.handlers);

            let auto_watch = annotation.wildcard || field.watch || !handlers.is_empty();

            table.insert(Binding {
                key,
                local_key: annotation.key,
                default: field.default,
                auto_watch,
                handlers,
                kind: field.kind,
                setter: field.setter,
            })?;
        }

        Ok(Schema { namespace, table })
    }
}

/// Output of the schema builder.
pub struct Schema<T> {
    namespace: Option<String>,
    table: BindingTable<T>,
}

impl<T> Schema<T> {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn table(&self) -> &BindingTable<T> {
        &self.table
    }

    pub(crate) fn into_parts(self) -> (Option<String>, BindingTable<T>) {
        (self.namespace, self.table)
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("namespace", &self.namespace)
            .field("table", &self.table)
            .finish()
    }
}
