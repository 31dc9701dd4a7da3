//! Built-in field tables for the core classes the staff client touches.
//!
//! Field order follows the ILS IDL for the schema version below. Deployments
//! on a different schema ship a table file instead (see `FieldmapperConfig`).

use tracing::error;

use super::registry::{ClassDef, FieldRegistry};

/// IDL version the built-in tables were taken from.
pub const BUILTIN_SCHEMA_VERSION: &str = "3.13";

struct Builtin {
    tag: &'static str,
    fields: &'static [&'static str],
    pkey: &'static str,
    links: &'static [(&'static str, &'static str)],
}

const BUILTINS: &[Builtin] = &[
    // config.copy_status
    Builtin {
        tag: "ccs",
        fields: &[
            "id",
            "name",
            "holdable",
            "opac_visible",
            "copy_active",
            "restrict_copy_delete",
            "is_available",
            "hopeless_prone",
        ],
        pkey: "id",
        links: &[],
    },
    // asset.copy
    Builtin {
        tag: "acp",
        fields: &[
            "age_protect",
            "alert_message",
            "barcode",
            "call_number",
            "circ_as_type",
            "circ_lib",
            "circ_modifier",
            "circulate",
            "copy_number",
            "create_date",
            "active_date",
            "creator",
            "deleted",
            "dummy_isbn",
            "deposit",
            "deposit_amount",
            "dummy_author",
            "dummy_title",
            "edit_date",
            "editor",
            "fine_level",
            "holdable",
            "id",
            "loan_duration",
            "location",
            "opac_visible",
            "price",
            "ref",
            "status",
            "status_changed_time",
            "mint_condition",
            "floating",
            "cost",
        ],
        pkey: "id",
        links: &[("circ_lib", "aou"), ("status", "ccs")],
    },
    // asset.copy_tag
    Builtin {
        tag: "acpt",
        fields: &[
            "id",
            "tag_type",
            "label",
            "value",
            "index_vector",
            "staff_note",
            "pub",
            "owner",
            "url",
        ],
        pkey: "id",
        links: &[("owner", "aou")],
    },
    // actor.org_unit
    Builtin {
        tag: "aou",
        fields: &[
            "children",
            "billing_address",
            "holds_address",
            "id",
            "ill_address",
            "mailing_address",
            "name",
            "ou_type",
            "parent_ou",
            "shortname",
            "email",
            "phone",
            "opac_visible",
            "fiscal_calendar",
        ],
        pkey: "id",
        links: &[("children", "aou"), ("parent_ou", "aou")],
    },
    // permission.perm_list
    Builtin {
        tag: "ppl",
        fields: &["id", "code", "description"],
        pkey: "id",
        links: &[],
    },
];

pub(super) fn registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    registry.set_version(BUILTIN_SCHEMA_VERSION);

    for builtin in BUILTINS {
        match ClassDef::new(builtin.tag, builtin.fields.iter().copied()) {
            Ok(def) => {
                let def = builtin
                    .links
                    .iter()
                    .fold(def.with_pkey(builtin.pkey), |def, (field, class)| {
                        def.with_link(field, class)
                    });
                registry.register(def);
            }
            Err(e) => error!(class = builtin.tag, error = %e, "Invalid built-in field table"),
        }
    }
    registry
}
