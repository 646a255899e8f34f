// src/schema.rs

//! Voyage feature names as the fuel model is fitted on them.

pub const DWT: &str = "DWT";
pub const ENGINE_POWER_KW: &str = "Engine_Power_kW";
pub const DESIGN_SPEED: &str = "Design_Speed";
pub const AVG_SPEED_KNOTS: &str = "Avg_Speed_Knots";
pub const DISTANCE_NM: &str = "Distance_NM";
pub const DRAFT_PERCENTAGE: &str = "Draft_Percentage";
pub const WIND_BEAUFORT: &str = "Wind_Beaufort";
pub const WAVE_HEIGHT_M: &str = "Wave_Height_m";
pub const CURRENT_SPEED_KNOTS: &str = "Current_Speed_Knots";

pub const SHIP_TYPE: &str = "Ship_Type";
pub const CURRENT_DIRECTION: &str = "Current_Direction";
pub const SEASON: &str = "Season";

/// Scaled numeric inputs, in transform order.
pub const NUMERIC_FEATURES: &[&str] = &[
    DWT,
    ENGINE_POWER_KW,
    DESIGN_SPEED,
    AVG_SPEED_KNOTS,
    DISTANCE_NM,
    DRAFT_PERCENTAGE,
    WIND_BEAUFORT,
    WAVE_HEIGHT_M,
    CURRENT_SPEED_KNOTS,
];

/// One-hot encoded inputs, in transform order.
pub const CATEGORICAL_FEATURES: &[&str] = &[SHIP_TYPE, CURRENT_DIRECTION, SEASON];

pub const SHIP_TYPES: &[&str] = &["Container", "Bulker", "Tanker"];
pub const CURRENT_DIRECTIONS: &[&str] = &["Head", "Beam", "Following"];
pub const SEASONS: &[&str] = &["Inter-Monsoon", "Southwest Monsoon", "Northeast Monsoon"];
