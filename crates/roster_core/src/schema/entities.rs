//! Member and Team table descriptions.

use super::{Cardinality, EntityGraph, EntitySchema, FieldDef, FieldKind, RelationDef};

/// Member with its team.
pub const MEMBER_ALL_GRAPH: &str = "Member.all";

pub static MEMBER_SCHEMA: EntitySchema = EntitySchema {
    name: "Member",
    table: "member",
    alias: "m",
    fields: &[
        FieldDef {
            name: "id",
            column: "member_id",
            kind: FieldKind::Key,
        },
        FieldDef {
            name: "username",
            column: "username",
            kind: FieldKind::Text,
        },
        FieldDef {
            name: "age",
            column: "age",
            kind: FieldKind::Integer,
        },
        FieldDef {
            name: "team_id",
            column: "team_id",
            kind: FieldKind::Reference,
        },
        FieldDef {
            name: "created_at",
            column: "created_at",
            kind: FieldKind::Timestamp,
        },
        FieldDef {
            name: "updated_at",
            column: "updated_at",
            kind: FieldKind::Timestamp,
        },
    ],
    relations: &[RelationDef {
        name: "team",
        target: &TEAM_SCHEMA,
        cardinality: Cardinality::ToOne,
        local_column: "team_id",
        remote_column: "team_id",
    }],
    graphs: &[EntityGraph {
        name: MEMBER_ALL_GRAPH,
        fetch: &["team"],
    }],
};

pub static TEAM_SCHEMA: EntitySchema = EntitySchema {
    name: "Team",
    table: "team",
    alias: "t",
    fields: &[
        FieldDef {
            name: "id",
            column: "team_id",
            kind: FieldKind::Key,
        },
        FieldDef {
            name: "name",
            column: "name",
            kind: FieldKind::Text,
        },
        FieldDef {
            name: "created_at",
            column: "created_at",
            kind: FieldKind::Timestamp,
        },
        FieldDef {
            name: "updated_at",
            column: "updated_at",
            kind: FieldKind::Timestamp,
        },
    ],
    relations: &[RelationDef {
        name: "members",
        target: &MEMBER_SCHEMA,
        cardinality: Cardinality::ToMany,
        local_column: "team_id",
        remote_column: "team_id",
    }],
    graphs: &[],
};
