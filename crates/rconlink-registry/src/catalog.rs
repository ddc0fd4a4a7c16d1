//! The catalog of tools, skills and composite handlers.
//!
//! Tool names are the server command names without the `fac_` prefix.

use crate::spec::{
    CompositeKind, CompositeSpec, DefaultValue, ParamSpec, ParamType, RoutineRef, SkillSpec,
    ToolSpec,
};

const COMPANION_ID: ParamSpec =
    ParamSpec::required("companionId", ParamType::Number, "Companion id");
const X: ParamSpec = ParamSpec::required("x", ParamType::Number, "X coordinate");
const Y: ParamSpec = ParamSpec::required("y", ParamType::Number, "Y coordinate");
const ENTITY: ParamSpec = ParamSpec::required(
    "entity",
    ParamType::String,
    "Entity prototype name, e.g. stone-furnace",
);
const DIRECTION: ParamSpec = ParamSpec::optional(
    "direction",
    ParamType::Number,
    "Facing: 0=north, 1=east, 2=south, 3=west",
);

const ID_ONLY: &[ParamSpec] = &[COMPANION_ID];

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "companion_spawn",
        description: "Spawn a companion character next to the first connected player.",
        template: "/fac_companion_spawn id={companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "companion_list",
        description: "List all spawned companions with their ids and positions.",
        template: "/fac_companion_list",
        params: &[],
    },
    ToolSpec {
        name: "companion_position",
        description: "Get a companion's current position.",
        template: "/fac_companion_position {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "companion_inventory",
        description: "List the items in a companion's main inventory.",
        template: "/fac_companion_inventory {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "companion_health",
        description: "Get a companion's health as absolute value, maximum and percentage.",
        template: "/fac_companion_health {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "companion_stop_all",
        description: "Cancel every in-game action (walking, mining, attacking) of a companion.",
        template: "/fac_companion_stop_all {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "move_to",
        description: "Walk a companion to a map position.",
        template: "/fac_move_to {companionId} {x} {y}",
        params: &[COMPANION_ID, X, Y],
    },
    ToolSpec {
        name: "move_stop",
        description: "Stop a companion's walking.",
        template: "/fac_move_stop {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "chat_say",
        description: "Post a chat message as the companion.",
        template: "/fac_chat_say {companionId} {message}",
        params: &[
            COMPANION_ID,
            ParamSpec::required("message", ParamType::String, "Message text"),
        ],
    },
    ToolSpec {
        name: "chat_get",
        description: "Fetch unread chat messages addressed to companions.",
        template: "/fac_chat_get {companionId}",
        params: &[ParamSpec::optional(
            "companionId",
            ParamType::Number,
            "Only messages for this companion",
        )],
    },
    ToolSpec {
        name: "resource_nearest",
        description: "Find the nearest patch of a resource to a companion.",
        template: "/fac_resource_nearest {companionId} {resource}",
        params: &[
            COMPANION_ID,
            ParamSpec::required(
                "resource",
                ParamType::String,
                "Resource name, e.g. iron-ore, copper-ore, coal, stone",
            ),
        ],
    },
    ToolSpec {
        name: "resource_mine",
        description: "Start mining the resource at a position.",
        template: "/fac_resource_mine {companionId} {x} {y} {count} {resource}",
        params: &[
            COMPANION_ID,
            X,
            Y,
            ParamSpec::optional("count", ParamType::Number, "Stop after this many items")
                .with_default(DefaultValue::Int(50)),
            ParamSpec::optional(
                "resource",
                ParamType::String,
                "Only mine this resource type",
            ),
        ],
    },
    ToolSpec {
        name: "resource_mine_status",
        description: "Report whether a companion is mining and how much it harvested.",
        template: "/fac_resource_mine_status {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "resource_mine_stop",
        description: "Stop a companion's mining.",
        template: "/fac_resource_mine_stop {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "world_enemies",
        description: "List enemies within a radius of a companion, nearest first.",
        template: "/fac_world_enemies {companionId} {radius}",
        params: &[
            COMPANION_ID,
            ParamSpec::optional("radius", ParamType::Number, "Scan radius in tiles")
                .with_default(DefaultValue::Int(50)),
        ],
    },
    ToolSpec {
        name: "action_attack_start",
        description: "Attack the enemy at a position.",
        template: "/fac_action_attack_start {companionId} {x} {y}",
        params: &[COMPANION_ID, X, Y],
    },
    ToolSpec {
        name: "action_attack_status",
        description: "Report whether a companion is attacking and its kill count.",
        template: "/fac_action_attack_status {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "action_attack_stop",
        description: "Stop a companion's attack.",
        template: "/fac_action_attack_stop {companionId}",
        params: ID_ONLY,
    },
    ToolSpec {
        name: "building_can_place",
        description: "Check whether an entity can be placed at a position.",
        template: "/fac_building_can_place {companionId} {entity} {x} {y} {direction}",
        params: &[COMPANION_ID, ENTITY, X, Y, DIRECTION],
    },
    ToolSpec {
        name: "building_place",
        description: "Place an entity from the companion's inventory.",
        template: "/fac_building_place {companionId} {entity} {x} {y} {direction}",
        params: &[COMPANION_ID, ENTITY, X, Y, DIRECTION],
    },
    ToolSpec {
        name: "version",
        description: "Report the companion mod version.",
        template: "/fac_version",
        params: &[],
    },
    ToolSpec {
        name: "help",
        description: "List the server-side companion commands.",
        template: "/fac_help",
        params: &[],
    },
];

pub static SKILLS: &[SkillSpec] = &[
    SkillSpec {
        name: "mine_until",
        description: "Mine a resource in the background until the companion holds the target \
                      amount, walking between patches as they deplete.",
        routine: RoutineRef::MineUntil,
        params: &[
            COMPANION_ID,
            ParamSpec::required(
                "resource",
                ParamType::String,
                "Resource name or alias: iron, copper, coal, stone, uranium",
            ),
            ParamSpec::optional("targetAmount", ParamType::Number, "Items to collect")
                .with_default(DefaultValue::Int(50)),
            ParamSpec::optional(
                "returnX",
                ParamType::Number,
                "X position to walk back to when done (requires returnY)",
            ),
            ParamSpec::optional(
                "returnY",
                ParamType::Number,
                "Y position to walk back to when done (requires returnX)",
            ),
        ],
    },
    SkillSpec {
        name: "combat_until",
        description: "Hunt enemies in the background until the kill target is reached, \
                      retreating when health drops below 30%.",
        routine: RoutineRef::CombatUntil,
        params: &[
            COMPANION_ID,
            ParamSpec::optional(
                "targetType",
                ParamType::String,
                "all, spawner, worm, biter or spitter",
            )
            .with_default(DefaultValue::Text("all")),
            ParamSpec::optional("maxKills", ParamType::Number, "Stop after this many kills")
                .with_default(DefaultValue::Int(10)),
        ],
    },
    SkillSpec {
        name: "build_smelter_line",
        description: "Place a row of furnaces, each fed by an inserter on the input side.",
        routine: RoutineRef::BuildSmelterLine,
        params: &[
            COMPANION_ID,
            ParamSpec::required("x", ParamType::Number, "X of the first furnace"),
            ParamSpec::required("y", ParamType::Number, "Y of the first furnace"),
            ParamSpec::required("count", ParamType::Number, "Number of furnaces"),
            ParamSpec::optional(
                "furnaceType",
                ParamType::String,
                "stone-furnace, steel-furnace or electric-furnace",
            )
            .with_default(DefaultValue::Text("stone-furnace")),
            ParamSpec::optional("direction", ParamType::String, "horizontal or vertical")
                .with_default(DefaultValue::Text("horizontal")),
            ParamSpec::optional(
                "inputSide",
                ParamType::String,
                "left, right, top or bottom",
            )
            .with_default(DefaultValue::Text("left")),
        ],
    },
];

pub static COMPOSITES: &[CompositeSpec] = &[
    CompositeSpec {
        name: "companion_status",
        description: "Position, health and running skill of a companion; without companionId, \
                      of every companion.",
        kind: CompositeKind::Status,
        params: &[ParamSpec::optional(
            "companionId",
            ParamType::Number,
            "Companion id; omit for all",
        )],
    },
    CompositeSpec {
        name: "companion_stop",
        description: "Stop a companion's in-game actions and any running skill.",
        kind: CompositeKind::Stop,
        params: ID_ONLY,
    },
];

/// A catalog entry resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEntry {
    Tool(&'static ToolSpec),
    Skill(&'static SkillSpec),
    Composite(&'static CompositeSpec),
}

impl CatalogEntry {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tool(spec) => spec.name,
            Self::Skill(spec) => spec.name,
            Self::Composite(spec) => spec.name,
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Self::Tool(spec) => spec.params,
            Self::Skill(spec) => spec.params,
            Self::Composite(spec) => spec.params,
        }
    }
}

/// Find a tool, skill or composite by name.
pub fn lookup(name: &str) -> Option<CatalogEntry> {
    if let Some(spec) = TOOLS.iter().find(|spec| spec.name == name) {
        return Some(CatalogEntry::Tool(spec));
    }
    if let Some(spec) = SKILLS.iter().find(|spec| spec.name == name) {
        return Some(CatalogEntry::Skill(spec));
    }
    COMPOSITES
        .iter()
        .find(|spec| spec.name == name)
        .map(CatalogEntry::Composite)
}

/// Every entry in advertisement order: tools, skills, composites.
pub fn entries() -> impl Iterator<Item = CatalogEntry> {
    TOOLS
        .iter()
        .map(CatalogEntry::Tool)
        .chain(SKILLS.iter().map(CatalogEntry::Skill))
        .chain(COMPOSITES.iter().map(CatalogEntry::Composite))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn placeholders(template: &str) -> Vec<&str> {
        let mut found = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            found.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        found
    }

    #[test]
    fn names_are_unique_across_tables() {
        let mut seen = HashSet::new();
        for entry in entries() {
            assert!(seen.insert(entry.name()), "duplicate name {}", entry.name());
        }
    }

    #[test]
    fn templates_and_params_agree() {
        for tool in TOOLS {
            let used: HashSet<&str> = placeholders(tool.template).into_iter().collect();
            let declared: HashSet<&str> = tool.params.iter().map(|p| p.name).collect();
            assert_eq!(used, declared, "tool {}", tool.name);
        }
    }

    #[test]
    fn tool_names_mirror_server_commands() {
        for tool in TOOLS {
            let command = tool.template.split_whitespace().next().unwrap();
            assert_eq!(command, format!("/fac_{}", tool.name));
        }
    }

    #[test]
    fn skills_take_companion_id_first() {
        for skill in SKILLS {
            assert_eq!(skill.params[0].name, "companionId", "skill {}", skill.name);
            assert!(skill.params[0].required);
            assert_eq!(skill.routine.as_str(), skill.name);
        }
    }

    #[test]
    fn required_params_have_no_default() {
        for entry in entries() {
            for param in entry.params() {
                assert!(
                    !(param.required && param.default.is_some()),
                    "{}.{}",
                    entry.name(),
                    param.name
                );
            }
        }
    }

    #[test]
    fn lookup_finds_each_kind() {
        assert!(matches!(lookup("move_to"), Some(CatalogEntry::Tool(_))));
        assert!(matches!(lookup("mine_until"), Some(CatalogEntry::Skill(_))));
        assert!(matches!(
            lookup("companion_stop"),
            Some(CatalogEntry::Composite(spec)) if spec.kind == CompositeKind::Stop
        ));
        assert_eq!(lookup("fac_move_to"), None);
    }
}
