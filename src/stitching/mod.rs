//! Schema stitching between the local schema and Gravity's GraphQL schema
//!
//! Types owned by one schema are extended with fields whose data lives in the
//! other. Each extended field is described once by a [`StitchingExtension`]:
//! the parent fields it needs (its fragment) and either a delegation to a root
//! field of a target schema or a local computation over those parent fields.
//! [`StitchedSchemaBuilder`] merges both schemas plus [`EXTENSION_SCHEMA`] into
//! the gateway schema.

pub mod delegate;
pub mod merge;
pub mod registry;
pub mod relative_time;
pub mod remote;

use async_graphql::{Name, Value};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::dates::parse_timestamp;

pub use delegate::{Delegate, DelegationRequest, SchemaDelegator, SubSchema};
pub use merge::StitchedSchemaBuilder;
pub use registry::TypeRegistry;
pub use remote::RemoteSchema;

/// Field values of a parent object, or arguments of a field
pub type Fields = IndexMap<Name, Value>;

/// Maps `(parent fields, field arguments)` to the target field's arguments
pub type ArgMapping = fn(&Fields, Fields) -> Fields;

/// Resolves a field from its parent fields and arguments at time `now`
pub type Computation = fn(&Fields, &Fields, DateTime<Utc>) -> Option<Value>;

/// The schemas a field can be delegated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaTarget {
    Local,
    Gravity,
}

impl std::fmt::Display for SchemaTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaTarget::Local => f.write_str("local"),
            SchemaTarget::Gravity => f.write_str("gravity"),
        }
    }
}

/// Forward a field to a root query field of another schema
#[derive(Debug, Clone, Copy)]
pub struct Delegation {
    pub target: SchemaTarget,
    pub field_name: &'static str,
    pub map_args: ArgMapping,
}

/// How a stitched field is resolved
#[derive(Debug, Clone, Copy)]
pub enum ExtensionResolver {
    Delegate(Delegation),
    Compute(Computation),
}

/// A field added to a type owned by another schema
#[derive(Debug, Clone, Copy)]
pub struct StitchingExtension {
    pub type_name: &'static str,
    pub field_name: &'static str,
    /// Parent fields that must be fetched before this field resolves
    pub fragment: &'static [&'static str],
    pub resolver: ExtensionResolver,
}

/// SDL for the fields added on top of both schemas
pub const EXTENSION_SCHEMA: &str = r#"
extend type Me {
  secondFactors(kinds: [SecondFactorKind]): [SecondFactor]
}

extend type ViewingRoom {
  artworksConnection(
    first: Int
    last: Int
    after: String
    before: String
  ): ArtworkConnection
  distanceToOpen(short: Boolean! = false): String
  distanceToClose(short: Boolean! = false): String
  partner: Partner
}

extend type Partner {
  viewingRoomsConnection(
    first: Int
    last: Int
    after: String
    before: String
  ): ViewingRoomConnection
}
"#;

/// Resolvers for every field declared in [`EXTENSION_SCHEMA`]
pub fn gravity_extensions() -> Vec<StitchingExtension> {
    vec![
        StitchingExtension {
            type_name: "Me",
            field_name: "secondFactors",
            fragment: &[],
            resolver: ExtensionResolver::Delegate(Delegation {
                target: SchemaTarget::Gravity,
                field_name: "_unused_gravity_secondFactors",
                map_args: pass_args,
            }),
        },
        StitchingExtension {
            type_name: "ViewingRoom",
            field_name: "artworksConnection",
            fragment: &["artworkIDs"],
            resolver: ExtensionResolver::Delegate(Delegation {
                target: SchemaTarget::Local,
                field_name: "artworks",
                map_args: artworks_connection_args,
            }),
        },
        StitchingExtension {
            type_name: "ViewingRoom",
            field_name: "distanceToOpen",
            fragment: &["startAt"],
            resolver: ExtensionResolver::Compute(distance_to_open),
        },
        StitchingExtension {
            type_name: "ViewingRoom",
            field_name: "distanceToClose",
            fragment: &["startAt", "endAt"],
            resolver: ExtensionResolver::Compute(distance_to_close),
        },
        StitchingExtension {
            type_name: "ViewingRoom",
            field_name: "partner",
            fragment: &["partnerID"],
            resolver: ExtensionResolver::Delegate(Delegation {
                target: SchemaTarget::Local,
                field_name: "partner",
                map_args: partner_args,
            }),
        },
        StitchingExtension {
            type_name: "Partner",
            field_name: "viewingRoomsConnection",
            fragment: &["internalID"],
            resolver: ExtensionResolver::Delegate(Delegation {
                target: SchemaTarget::Gravity,
                field_name: "viewingRooms",
                map_args: viewing_rooms_args,
            }),
        },
    ]
}

fn pass_args(_parent: &Fields, args: Fields) -> Fields {
    args
}

/// `{ids, ...args}`. An empty id list becomes `[null]` so the target reads it
/// as "matches nothing" rather than as a missing filter.
pub fn artworks_connection_args(parent: &Fields, args: Fields) -> Fields {
    let ids = match parent.get("artworkIDs") {
        Some(Value::List(ids)) if !ids.is_empty() => Value::List(ids.clone()),
        _ => Value::List(vec![Value::Null]),
    };

    let mut mapped = Fields::new();
    mapped.insert(Name::new("ids"), ids);
    mapped.extend(args);
    mapped
}

fn partner_args(parent: &Fields, _args: Fields) -> Fields {
    let mut mapped = Fields::new();
    mapped.insert(
        Name::new("id"),
        parent.get("partnerID").cloned().unwrap_or(Value::Null),
    );
    mapped
}

fn viewing_rooms_args(parent: &Fields, args: Fields) -> Fields {
    let mut mapped = Fields::new();
    mapped.insert(
        Name::new("partnerId"),
        parent.get("internalID").cloned().unwrap_or(Value::Null),
    );
    mapped.extend(args);
    mapped
}

fn timestamp(fields: &Fields, name: &str) -> Option<DateTime<Utc>> {
    match fields.get(name)? {
        Value::String(raw) => parse_timestamp(raw),
        _ => None,
    }
}

fn short_flag(args: &Fields) -> bool {
    matches!(args.get("short"), Some(Value::Boolean(true)))
}

fn distance_to_open(parent: &Fields, args: &Fields, now: DateTime<Utc>) -> Option<Value> {
    let start_at = timestamp(parent, "startAt")?;
    relative_time::distance_to_open(start_at, now, short_flag(args)).map(Value::String)
}

fn distance_to_close(parent: &Fields, args: &Fields, now: DateTime<Utc>) -> Option<Value> {
    let start_at = timestamp(parent, "startAt")?;
    let end_at = timestamp(parent, "endAt")?;
    relative_time::distance_to_close(start_at, end_at, now, short_flag(args)).map(Value::String)
}
