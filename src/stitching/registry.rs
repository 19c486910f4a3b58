//! Merged type information for the gateway schema
//!
//! The registry records every type of the local and Gravity schemas, which
//! schema owns each root field, and which fields were added by stitching
//! extensions. It also prints the selection set forwarded to a sub-schema:
//! extension fields are swapped for their fragment fields, `__typename` is
//! requested on every composite selection, and selections on abstract types
//! are split per possible type.

use async_graphql::parser::parse_schema;
use async_graphql::parser::types::{
    BaseType, FieldDefinition, InputValueDefinition, OperationType, Type, TypeDefinition,
    TypeKind as DefinitionKind, TypeSystemDefinition,
};
use async_graphql::SelectionField;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::Write;

use super::{SchemaTarget, StitchingExtension};
use crate::{GatewayError, Result};

pub const QUERY: &str = "Query";
pub const MUTATION: &str = "Mutation";

/// Root fields with this prefix stay reachable for delegation but are not
/// exposed by the gateway.
pub const HIDDEN_ROOT_PREFIX: &str = "_unused_gravity_";

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub description: Option<String>,
    pub ty: Type,
    pub arguments: Vec<InputValueDefinition>,
    /// Owning schema of a root field
    pub owner: Option<SchemaTarget>,
    /// Added by a stitching extension
    pub extension: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub owner: SchemaTarget,
    pub fields: IndexMap<String, FieldInfo>,
    pub input_fields: Vec<InputValueDefinition>,
    pub enum_values: Vec<String>,
    pub members: Vec<String>,
    pub implements: Vec<String>,
}

impl TypeInfo {
    fn new(name: &str, kind: TypeKind, owner: SchemaTarget) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: None,
            owner,
            fields: IndexMap::new(),
            input_fields: Vec::new(),
            enum_values: Vec::new(),
            members: Vec::new(),
            implements: Vec::new(),
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Union)
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object | TypeKind::Interface | TypeKind::Union
        )
    }
}

/// Innermost named type of a (possibly wrapped) type
pub fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeInfo>,
    fragments: HashMap<(String, String), Vec<String>>,
}

impl TypeRegistry {
    /// Record every type of a sub-schema's SDL.
    ///
    /// Root operation types are folded into the gateway's `Query` and
    /// `Mutation`; on a name conflict the type registered first wins.
    pub fn add_schema(&mut self, target: SchemaTarget, sdl: &str) -> Result<()> {
        let document = parse_schema(sdl).map_err(|e| GatewayError::SchemaParse(e.to_string()))?;

        let mut roots: HashMap<String, OperationType> = HashMap::new();
        roots.insert(QUERY.to_string(), OperationType::Query);
        roots.insert(MUTATION.to_string(), OperationType::Mutation);
        roots.insert("Subscription".to_string(), OperationType::Subscription);
        for definition in &document.definitions {
            if let TypeSystemDefinition::Schema(schema) = definition {
                let schema = &schema.node;
                roots.clear();
                if let Some(query) = &schema.query {
                    roots.insert(query.node.to_string(), OperationType::Query);
                }
                if let Some(mutation) = &schema.mutation {
                    roots.insert(mutation.node.to_string(), OperationType::Mutation);
                }
                if let Some(subscription) = &schema.subscription {
                    roots.insert(subscription.node.to_string(), OperationType::Subscription);
                }
            }
        }

        for definition in &document.definitions {
            let TypeSystemDefinition::Type(definition) = definition else {
                continue;
            };
            let definition = &definition.node;
            let name = definition.name.node.as_str();

            match roots.get(name) {
                Some(OperationType::Query) => self.add_root_fields(QUERY, target, definition),
                Some(OperationType::Mutation) => {
                    self.add_root_fields(MUTATION, target, definition)
                }
                Some(OperationType::Subscription) => {
                    tracing::debug!(%target, "ignoring subscription root");
                }
                None if definition.extend => self.extend_type(target, definition),
                None => self.add_type(target, definition),
            }
        }

        Ok(())
    }

    /// Apply the extension SDL and attach each extension's fragment.
    ///
    /// Every field declared in `sdl` needs a matching extension and every
    /// extension needs a declared field.
    pub fn add_extensions(&mut self, sdl: &str, extensions: &[StitchingExtension]) -> Result<()> {
        let document = parse_schema(sdl).map_err(|e| GatewayError::SchemaParse(e.to_string()))?;
        let by_field: HashMap<(&str, &str), &StitchingExtension> = extensions
            .iter()
            .map(|ext| ((ext.type_name, ext.field_name), ext))
            .collect();
        let mut declared = 0;

        for definition in &document.definitions {
            let TypeSystemDefinition::Type(definition) = definition else {
                continue;
            };
            let definition = &definition.node;
            let type_name = definition.name.node.as_str();

            if !definition.extend {
                self.add_type(SchemaTarget::Local, definition);
                continue;
            }

            let DefinitionKind::Object(object) = &definition.kind else {
                return Err(GatewayError::SchemaBuild(format!(
                    "only object types can be extended, got {type_name}"
                )));
            };
            let Some(existing) = self.types.get_mut(type_name) else {
                return Err(GatewayError::SchemaBuild(format!(
                    "cannot extend unknown type {type_name}"
                )));
            };

            for field in &object.fields {
                let field = &field.node;
                let field_name = field.name.node.as_str();
                let Some(extension) = by_field.get(&(type_name, field_name)) else {
                    return Err(GatewayError::SchemaBuild(format!(
                        "no resolver for extension field {type_name}.{field_name}"
                    )));
                };

                let mut info = field_info(field, None);
                info.extension = true;
                existing.fields.insert(field_name.to_string(), info);
                self.fragments.insert(
                    (type_name.to_string(), field_name.to_string()),
                    extension.fragment.iter().map(|f| f.to_string()).collect(),
                );
                declared += 1;
            }
        }

        if declared != extensions.len() {
            let missing: Vec<String> = extensions
                .iter()
                .filter(|ext| {
                    !self
                        .fragments
                        .contains_key(&(ext.type_name.to_string(), ext.field_name.to_string()))
                })
                .map(|ext| format!("{}.{}", ext.type_name, ext.field_name))
                .collect();
            return Err(GatewayError::SchemaBuild(format!(
                "extensions without a declared field: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Root field `name` of the given operation
    pub fn root_field(&self, operation: OperationType, name: &str) -> Option<&FieldInfo> {
        let root = match operation {
            OperationType::Query => QUERY,
            OperationType::Mutation => MUTATION,
            OperationType::Subscription => return None,
        };
        self.types.get(root)?.fields.get(name)
    }

    /// Fragment fields required by an extension field
    pub fn fragment(&self, type_name: &str, field_name: &str) -> Option<&[String]> {
        self.fragments
            .get(&(type_name.to_string(), field_name.to_string()))
            .map(Vec::as_slice)
    }

    pub fn is_composite(&self, name: &str) -> bool {
        self.get(name).is_some_and(TypeInfo::is_composite)
    }

    /// Concrete object types an abstract type can resolve to
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        let Some(info) = self.get(name) else {
            return Vec::new();
        };
        match info.kind {
            TypeKind::Union => info.members.iter().map(String::as_str).collect(),
            TypeKind::Interface => self
                .types
                .values()
                .filter(|candidate| {
                    candidate.kind == TypeKind::Object
                        && candidate.implements.iter().any(|i| i == name)
                })
                .map(|candidate| candidate.name.as_str())
                .collect(),
            _ => vec![info.name.as_str()],
        }
    }

    /// Print the selection set to forward for `fields` selected on
    /// `type_name`, e.g. `{ __typename title startAt }`.
    pub fn print_selection_set(
        &self,
        type_name: &str,
        fields: &[SelectionField<'_>],
    ) -> Result<String> {
        let mut out = String::new();
        self.write_selection_set(type_name, fields, &mut out)?;
        Ok(out)
    }

    fn write_selection_set(
        &self,
        type_name: &str,
        fields: &[SelectionField<'_>],
        out: &mut String,
    ) -> Result<()> {
        let info = self
            .get(type_name)
            .ok_or_else(|| GatewayError::SchemaBuild(format!("unknown type {type_name}")))?;

        if !info.is_abstract() {
            return self.write_object_selection(info, fields, out);
        }

        out.push_str("{ __typename");
        for possible in self.possible_types(type_name) {
            let Some(concrete) = self.get(possible) else {
                continue;
            };
            let applicable: Vec<SelectionField<'_>> = fields
                .iter()
                .filter(|field| concrete.fields.contains_key(field.name()))
                .cloned()
                .collect();
            if applicable.is_empty() {
                continue;
            }
            let _ = write!(out, " ... on {possible} ");
            self.write_object_selection(concrete, &applicable, out)?;
        }
        out.push_str(" }");
        Ok(())
    }

    fn write_object_selection(
        &self,
        info: &TypeInfo,
        fields: &[SelectionField<'_>],
        out: &mut String,
    ) -> Result<()> {
        out.push_str("{ __typename");
        let mut required: Vec<&str> = Vec::new();
        let mut selected: Vec<&str> = Vec::new();

        for field in fields {
            let name = field.name();
            if name == "__typename" {
                continue;
            }
            let Some(field_info) = info.fields.get(name) else {
                tracing::debug!(type_name = %info.name, field = name, "dropping unknown field");
                continue;
            };

            if field_info.extension {
                if let Some(fragment) = self.fragment(&info.name, name) {
                    required.extend(fragment.iter().map(String::as_str));
                }
                continue;
            }

            if field.alias().is_none() {
                selected.push(name);
            }
            out.push(' ');
            self.write_field(field, field_info, out)?;
        }

        for name in required {
            if !selected.contains(&name) {
                let _ = write!(out, " {name}");
                selected.push(name);
            }
        }

        out.push_str(" }");
        Ok(())
    }

    fn write_field(
        &self,
        field: &SelectionField<'_>,
        info: &FieldInfo,
        out: &mut String,
    ) -> Result<()> {
        if let Some(alias) = field.alias() {
            let _ = write!(out, "{alias}: ");
        }
        out.push_str(field.name());

        let arguments = field
            .arguments()
            .map_err(|e| GatewayError::InvalidSelection(e.message))?;
        if !arguments.is_empty() {
            let arguments: Vec<String> = arguments
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            let _ = write!(out, "({})", arguments.join(", "));
        }

        let type_name = named_type(&info.ty);
        if self.is_composite(type_name) {
            let children: Vec<SelectionField<'_>> = field.selection_set().collect();
            out.push(' ');
            self.write_selection_set(type_name, &children, out)?;
        }
        Ok(())
    }

    fn add_root_fields(&mut self, root: &str, target: SchemaTarget, definition: &TypeDefinition) {
        let DefinitionKind::Object(object) = &definition.kind else {
            return;
        };
        let info = self
            .types
            .entry(root.to_string())
            .or_insert_with(|| TypeInfo::new(root, TypeKind::Object, target));

        for field in &object.fields {
            let field = &field.node;
            let name = field.name.node.as_str();
            if info.fields.contains_key(name) {
                tracing::warn!(%target, root, field = name, "root field already provided, keeping the first");
                continue;
            }
            let mut field_info = field_info(field, Some(target));
            field_info.hidden = name.starts_with(HIDDEN_ROOT_PREFIX);
            info.fields.insert(name.to_string(), field_info);
        }
    }

    fn add_type(&mut self, target: SchemaTarget, definition: &TypeDefinition) {
        let name = definition.name.node.as_str();
        if name.starts_with("__") {
            return;
        }
        if let Some(existing) = self.types.get(name) {
            if existing.owner != target {
                tracing::warn!(
                    type_name = name,
                    kept = %existing.owner,
                    dropped = %target,
                    "type defined by both schemas"
                );
            }
            return;
        }

        let mut info = match &definition.kind {
            DefinitionKind::Scalar => {
                if BUILTIN_SCALARS.contains(&name) {
                    return;
                }
                TypeInfo::new(name, TypeKind::Scalar, target)
            }
            DefinitionKind::Object(object) => {
                let mut info = TypeInfo::new(name, TypeKind::Object, target);
                info.implements = object.implements.iter().map(|i| i.node.to_string()).collect();
                info.fields = fields(&object.fields);
                info
            }
            DefinitionKind::Interface(interface) => {
                let mut info = TypeInfo::new(name, TypeKind::Interface, target);
                info.implements = interface
                    .implements
                    .iter()
                    .map(|i| i.node.to_string())
                    .collect();
                info.fields = fields(&interface.fields);
                info
            }
            DefinitionKind::Union(union) => {
                let mut info = TypeInfo::new(name, TypeKind::Union, target);
                info.members = union.members.iter().map(|m| m.node.to_string()).collect();
                info
            }
            DefinitionKind::Enum(enum_type) => {
                let mut info = TypeInfo::new(name, TypeKind::Enum, target);
                info.enum_values = enum_type
                    .values
                    .iter()
                    .map(|v| v.node.value.node.to_string())
                    .collect();
                info
            }
            DefinitionKind::InputObject(input) => {
                let mut info = TypeInfo::new(name, TypeKind::InputObject, target);
                info.input_fields = input.fields.iter().map(|f| f.node.clone()).collect();
                info
            }
        };
        info.description = definition.description.as_ref().map(|d| d.node.clone());
        self.types.insert(name.to_string(), info);
    }

    fn extend_type(&mut self, target: SchemaTarget, definition: &TypeDefinition) {
        let name = definition.name.node.as_str();
        let Some(existing) = self.types.get_mut(name) else {
            self.add_type(target, definition);
            return;
        };
        match &definition.kind {
            DefinitionKind::Object(object) => existing.fields.extend(fields(&object.fields)),
            DefinitionKind::Interface(interface) => {
                existing.fields.extend(fields(&interface.fields))
            }
            _ => tracing::warn!(type_name = name, "unsupported type extension ignored"),
        }
    }
}

fn fields(
    definitions: &[async_graphql::Positioned<FieldDefinition>],
) -> IndexMap<String, FieldInfo> {
    definitions
        .iter()
        .map(|field| (field.node.name.node.to_string(), field_info(&field.node, None)))
        .collect()
}

fn field_info(field: &FieldDefinition, owner: Option<SchemaTarget>) -> FieldInfo {
    FieldInfo {
        name: field.name.node.to_string(),
        description: field.description.as_ref().map(|d| d.node.clone()),
        ty: field.ty.node.clone(),
        arguments: field.arguments.iter().map(|a| a.node.clone()).collect(),
        owner,
        extension: false,
        hidden: false,
    }
}
