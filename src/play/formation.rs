//! Canned formation layouts.
//!
//! Coordinates are in the same court space as tokens (800x600 half court,
//! basket at the bottom).

use serde::Serialize;

use super::model::{ObjectKind, PlayObject};

/// Which side of the ball a formation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationCategory {
    Offense,
    Defense,
}

/// One token slot in a formation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormationSlot {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub x: f64,
    pub y: f64,
    pub label: &'static str,
}

/// A named layout of tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormationPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: FormationCategory,
    pub slots: &'static [FormationSlot],
}

impl FormationPreset {
    /// Instantiates the layout as tokens with fresh ids.
    pub fn spawn_objects(&self) -> Vec<PlayObject> {
        self.slots
            .iter()
            .map(|slot| PlayObject::spawn(slot.kind, slot.x, slot.y).with_label(slot.label))
            .collect()
    }
}

const fn offense(x: f64, y: f64, label: &'static str) -> FormationSlot {
    FormationSlot {
        kind: ObjectKind::OffensePlayer,
        x,
        y,
        label,
    }
}

const fn defense(x: f64, y: f64, label: &'static str) -> FormationSlot {
    FormationSlot {
        kind: ObjectKind::DefensePlayer,
        x,
        y,
        label,
    }
}

static PRESETS: &[FormationPreset] = &[
    FormationPreset {
        id: "5-out",
        name: "5-Out Open",
        description: "Five perimeter players spacing the floor; opens driving lanes",
        category: FormationCategory::Offense,
        slots: &[
            offense(400.0, 200.0, "1"), // top
            offense(200.0, 300.0, "2"), // left wing
            offense(600.0, 300.0, "3"), // right wing
            offense(100.0, 500.0, "4"), // left corner
            offense(700.0, 500.0, "5"), // right corner
        ],
    },
    FormationPreset {
        id: "horns",
        name: "Horns Set",
        description: "Point guard up top, bigs at both elbows, shooters in the corners",
        category: FormationCategory::Offense,
        slots: &[
            offense(400.0, 200.0, "1"),
            offense(100.0, 500.0, "2"),
            offense(700.0, 500.0, "3"),
            offense(320.0, 350.0, "4"), // left elbow
            offense(480.0, 350.0, "5"), // right elbow
        ],
    },
    FormationPreset {
        id: "1-4-high",
        name: "1-4 High",
        description: "Ball handler up top with four players across the free-throw line extended",
        category: FormationCategory::Offense,
        slots: &[
            offense(400.0, 180.0, "1"),
            offense(150.0, 300.0, "2"),
            offense(650.0, 300.0, "3"),
            offense(320.0, 300.0, "4"),
            offense(480.0, 300.0, "5"),
        ],
    },
    FormationPreset {
        id: "2-3-zone",
        name: "2-3 Zone Defense",
        description: "Two guards up top, three defenders along the baseline",
        category: FormationCategory::Defense,
        slots: &[
            defense(300.0, 250.0, "X1"),
            defense(500.0, 250.0, "X2"),
            defense(150.0, 450.0, "X3"),
            defense(400.0, 450.0, "X4"),
            defense(650.0, 450.0, "X5"),
        ],
    },
];

/// Every built-in preset.
pub fn presets() -> &'static [FormationPreset] {
    PRESETS
}

/// Looks up a preset by id.
pub fn find_preset(id: &str) -> Option<&'static FormationPreset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Presets of one category, in library order.
pub fn presets_in(category: FormationCategory) -> impl Iterator<Item = &'static FormationPreset> {
    PRESETS.iter().filter(move |p| p.category == category)
}
