//! Builds the gateway schema out of the local schema, Gravity's schema and
//! the stitching extensions

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext as FieldContext, Scalar, Schema, TypeRef, Union,
};
use async_graphql::parser::types::{BaseType, InputValueDefinition, OperationType, Type};
use async_graphql::{Name, Value};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::registry::{named_type, FieldInfo, TypeInfo, TypeKind, MUTATION, QUERY};
use super::{
    Delegate, DelegationRequest, ExtensionResolver, Fields, SchemaDelegator, SchemaTarget,
    StitchingExtension, SubSchema, TypeRegistry,
};
use crate::context::ResolverContext;
use crate::{GatewayError, Result};

/// Source of the current time for computed fields
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct StitchedSchemaBuilder {
    local: Option<(Arc<dyn SubSchema>, String)>,
    gravity: Option<(Arc<dyn SubSchema>, String)>,
    extension_sdl: String,
    extensions: Vec<StitchingExtension>,
    delegate: Option<Arc<dyn Delegate>>,
    clock: Clock,
    allow_introspection: bool,
}

impl Default for StitchedSchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StitchedSchemaBuilder {
    pub fn new() -> Self {
        Self {
            local: None,
            gravity: None,
            extension_sdl: String::new(),
            extensions: Vec::new(),
            delegate: None,
            clock: Arc::new(Utc::now),
            allow_introspection: true,
        }
    }

    pub fn local(mut self, schema: Arc<dyn SubSchema>, sdl: impl Into<String>) -> Self {
        self.local = Some((schema, sdl.into()));
        self
    }

    pub fn gravity(mut self, schema: Arc<dyn SubSchema>, sdl: impl Into<String>) -> Self {
        self.gravity = Some((schema, sdl.into()));
        self
    }

    pub fn extensions(mut self, sdl: impl Into<String>, extensions: Vec<StitchingExtension>) -> Self {
        self.extension_sdl = sdl.into();
        self.extensions = extensions;
        self
    }

    /// Replace the default delegation to the two sub-schemas
    pub fn delegate(mut self, delegate: Arc<dyn Delegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn allow_introspection(mut self, allow: bool) -> Self {
        self.allow_introspection = allow;
        self
    }

    pub fn build(self) -> Result<Schema> {
        let (local, local_sdl) = self
            .local
            .ok_or_else(|| GatewayError::SchemaBuild("local schema is required".to_string()))?;
        let (gravity, gravity_sdl) = self
            .gravity
            .ok_or_else(|| GatewayError::SchemaBuild("gravity schema is required".to_string()))?;

        let mut registry = TypeRegistry::default();
        registry.add_schema(SchemaTarget::Local, &local_sdl)?;
        registry.add_schema(SchemaTarget::Gravity, &gravity_sdl)?;
        if !self.extension_sdl.trim().is_empty() || !self.extensions.is_empty() {
            registry.add_extensions(&self.extension_sdl, &self.extensions)?;
        }

        let delegate = self
            .delegate
            .unwrap_or_else(|| Arc::new(SchemaDelegator::new(local, gravity)));
        tracing::info!(
            types = registry.types().count(),
            extensions = self.extensions.len(),
            "stitching gateway schema"
        );
        let extensions = self
            .extensions
            .into_iter()
            .map(|ext| ((ext.type_name.to_string(), ext.field_name.to_string()), ext))
            .collect();

        let engine = Arc::new(Engine {
            registry,
            delegate,
            extensions,
            clock: self.clock,
        });
        engine.schema(self.allow_introspection)
    }
}

/// Shared by every resolver of the gateway schema
struct Engine {
    registry: TypeRegistry,
    delegate: Arc<dyn Delegate>,
    extensions: HashMap<(String, String), StitchingExtension>,
    clock: Clock,
}

impl Engine {
    fn schema(self: &Arc<Self>, allow_introspection: bool) -> Result<Schema> {
        let has_mutation = self
            .registry
            .get(MUTATION)
            .is_some_and(|root| root.fields.values().any(|f| !f.hidden));

        let mut builder = Schema::build(QUERY, has_mutation.then_some(MUTATION), None);
        for info in self.registry.types() {
            match info.kind {
                TypeKind::Object => {
                    if info.name == MUTATION && !has_mutation {
                        continue;
                    }
                    builder = builder.register(self.object(info));
                }
                TypeKind::Interface => builder = builder.register(interface(info)),
                TypeKind::Union => {
                    let union = info
                        .members
                        .iter()
                        .fold(Union::new(info.name.as_str()), |union, member| {
                            union.possible_type(member.as_str())
                        });
                    builder = builder.register(with_description(union, info, |ty, d| {
                        ty.description(d)
                    }));
                }
                TypeKind::Enum => {
                    let items = info.enum_values.iter().map(|v| EnumItem::new(v.as_str()));
                    let enum_type = Enum::new(info.name.as_str()).items(items);
                    builder = builder.register(with_description(enum_type, info, |ty, d| {
                        ty.description(d)
                    }));
                }
                TypeKind::InputObject => {
                    let input = info
                        .input_fields
                        .iter()
                        .fold(InputObject::new(info.name.as_str()), |input, field| {
                            input.field(input_value(field))
                        });
                    builder = builder.register(with_description(input, info, |ty, d| {
                        ty.description(d)
                    }));
                }
                TypeKind::Scalar => {
                    builder = builder.register(with_description(
                        Scalar::new(info.name.as_str()),
                        info,
                        |ty, d| ty.description(d),
                    ));
                }
            }
        }

        if !allow_introspection {
            builder = builder.disable_introspection();
        }
        builder
            .finish()
            .map_err(|e| GatewayError::SchemaBuild(e.to_string()))
    }

    fn object(self: &Arc<Self>, info: &TypeInfo) -> Object {
        let operation = match info.name.as_str() {
            QUERY => Some(OperationType::Query),
            MUTATION => Some(OperationType::Mutation),
            _ => None,
        };

        let mut object = with_description(Object::new(info.name.as_str()), info, |ty, d| {
            ty.description(d)
        });
        for name in &info.implements {
            object = object.implement(name.as_str());
        }

        for field in info.fields.values().filter(|f| !f.hidden) {
            let resolved = match operation {
                Some(operation) => self.root_field(operation, field),
                None if field.extension => self.extension_field(&info.name, field),
                None => self.merged_field(field),
            };
            object = object.field(resolved);
        }
        object
    }

    /// Root field: delegate the whole selection to the owning schema
    fn root_field(self: &Arc<Self>, operation: OperationType, info: &FieldInfo) -> Field {
        let engine = self.clone();
        let field = info.clone();
        let target = info.owner.unwrap_or(SchemaTarget::Local);

        let resolved = Field::new(info.name.as_str(), type_ref(&info.ty), move |ctx| {
            let engine = engine.clone();
            let field = field.clone();
            FieldFuture::new(async move {
                let request = DelegationRequest {
                    target,
                    operation,
                    field_name: field.name.clone(),
                    args: collect_args(&ctx, &field.arguments),
                    selection: engine.selection(&field.ty, &ctx)?,
                    context: ctx.ctx.data_opt::<ResolverContext>().cloned(),
                };
                let value = engine.delegate.delegate(request).await?;
                Ok(engine.to_field_value(&field.ty, value))
            })
        });
        with_arguments(resolved, info)
    }

    /// Field of a delegated object: read it from the parent's response
    fn merged_field(self: &Arc<Self>, info: &FieldInfo) -> Field {
        let engine = self.clone();
        let field = info.clone();

        let resolved = Field::new(info.name.as_str(), type_ref(&info.ty), move |ctx| {
            let engine = engine.clone();
            let field = field.clone();
            FieldFuture::new(async move {
                let key = ctx.ctx.field().alias().unwrap_or(field.name.as_str());
                let value = parent_fields(&ctx)
                    .and_then(|parent| parent.get(key))
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(engine.to_field_value(&field.ty, value))
            })
        });
        with_arguments(resolved, info)
    }

    /// Field added by a stitching extension
    fn extension_field(self: &Arc<Self>, type_name: &str, info: &FieldInfo) -> Field {
        let engine = self.clone();
        let field = info.clone();
        let extension = self
            .extensions
            .get(&(type_name.to_string(), info.name.clone()))
            .copied();

        let resolved = Field::new(info.name.as_str(), type_ref(&info.ty), move |ctx| {
            let engine = engine.clone();
            let field = field.clone();
            FieldFuture::new(async move {
                let Some(extension) = extension else {
                    return Err(GatewayError::SchemaBuild(format!(
                        "no resolver for {}",
                        field.name
                    ))
                    .into());
                };
                let empty = Fields::new();
                let parent = parent_fields(&ctx).unwrap_or(&empty);
                let args = collect_args(&ctx, &field.arguments);

                let value = match extension.resolver {
                    ExtensionResolver::Compute(compute) => {
                        compute(parent, &args, (engine.clock)()).unwrap_or(Value::Null)
                    }
                    ExtensionResolver::Delegate(delegation) => {
                        let request = DelegationRequest {
                            target: delegation.target,
                            operation: OperationType::Query,
                            field_name: delegation.field_name.to_string(),
                            args: (delegation.map_args)(parent, args),
                            selection: engine.selection(&field.ty, &ctx)?,
                            context: ctx.ctx.data_opt::<ResolverContext>().cloned(),
                        };
                        engine.delegate.delegate(request).await?
                    }
                };
                Ok(engine.to_field_value(&field.ty, value))
            })
        });
        with_arguments(resolved, info)
    }

    fn selection(&self, ty: &Type, ctx: &FieldContext<'_>) -> Result<Option<String>> {
        let type_name = named_type(ty);
        if !self.registry.is_composite(type_name) {
            return Ok(None);
        }
        let fields: Vec<_> = ctx.ctx.field().selection_set().collect();
        self.registry
            .print_selection_set(type_name, &fields)
            .map(Some)
    }

    /// Convert a sub-schema value into a value of the gateway field's type
    fn to_field_value(&self, ty: &Type, value: Value) -> Option<FieldValue<'static>> {
        match (&ty.base, value) {
            (_, Value::Null) => None,
            (BaseType::List(inner), Value::List(items)) => Some(FieldValue::list(
                items
                    .into_iter()
                    .map(|item| self.to_field_value(inner, item).unwrap_or(FieldValue::NULL)),
            )),
            (BaseType::List(_), value) => Some(FieldValue::value(value)),
            (BaseType::Named(name), value) => Some(self.named_value(name.as_str(), value)),
        }
    }

    fn named_value(&self, type_name: &str, value: Value) -> FieldValue<'static> {
        let Some(info) = self.registry.get(type_name) else {
            return FieldValue::value(value);
        };

        match (info.kind, value) {
            (TypeKind::Enum, Value::String(item)) => FieldValue::value(Value::Enum(Name::new(item))),
            (TypeKind::Interface | TypeKind::Union, value) => {
                let concrete = match &value {
                    Value::Object(object) => match object.get("__typename") {
                        Some(Value::String(name)) => Some(name.clone()),
                        _ => None,
                    },
                    _ => None,
                };
                match concrete {
                    Some(concrete) => FieldValue::value(value).with_type(concrete),
                    None => {
                        tracing::warn!(type_name, "abstract value without __typename");
                        FieldValue::value(value)
                    }
                }
            }
            (_, value) => FieldValue::value(value),
        }
    }
}

fn parent_fields<'a>(ctx: &FieldContext<'a>) -> Option<&'a Fields> {
    match ctx.parent_value.as_value()? {
        Value::Object(fields) => Some(fields),
        _ => None,
    }
}

/// Declared arguments present in the request, without explicit nulls
fn collect_args(ctx: &FieldContext<'_>, declared: &[InputValueDefinition]) -> Fields {
    declared
        .iter()
        .filter_map(|arg| {
            let name = arg.name.node.as_str();
            let value = ctx.args.get(name)?.as_value().clone();
            (value != Value::Null).then(|| (Name::new(name), value))
        })
        .collect()
}

fn type_ref(ty: &Type) -> TypeRef {
    let base = match &ty.base {
        BaseType::Named(name) => TypeRef::named(name.to_string()),
        BaseType::List(inner) => TypeRef::List(Box::new(type_ref(inner))),
    };
    if ty.nullable {
        base
    } else {
        TypeRef::NonNull(Box::new(base))
    }
}

fn input_value(definition: &InputValueDefinition) -> InputValue {
    let mut input = InputValue::new(definition.name.node.as_str(), type_ref(&definition.ty.node));
    if let Some(description) = &definition.description {
        input = input.description(description.node.as_str());
    }
    if let Some(default) = &definition.default_value {
        input = input.default_value(default.node.clone());
    }
    input
}

fn with_arguments(field: Field, info: &FieldInfo) -> Field {
    let field = match &info.description {
        Some(description) => field.description(description.as_str()),
        None => field,
    };
    info.arguments
        .iter()
        .fold(field, |field, arg| field.argument(input_value(arg)))
}

fn with_description<T>(ty: T, info: &TypeInfo, describe: impl FnOnce(T, String) -> T) -> T {
    match &info.description {
        Some(description) => describe(ty, description.clone()),
        None => ty,
    }
}

fn interface(info: &TypeInfo) -> Interface {
    let mut interface = with_description(
        Interface::new(info.name.as_str()),
        info,
        |ty, d| ty.description(d),
    );
    for name in &info.implements {
        interface = interface.implement(name.as_str());
    }
    for field in info.fields.values() {
        let resolved = field.arguments.iter().fold(
            InterfaceField::new(field.name.as_str(), type_ref(&field.ty)),
            |resolved, arg| resolved.argument(input_value(arg)),
        );
        interface = interface.field(resolved);
    }
    interface
}
