//! Farmer profile
//!
//! Accumulates what the assistant learns about a farmer over a session.
//! How each field absorbs new values is decided by an explicit policy table
//! (`ProfileField::policy`): list fields take the union of everything seen,
//! scalar fields keep the first value recorded.

use crate::planning::PlanningContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a profile field absorbs a new value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep the first non-empty value, ignore later ones
    FirstWriteWins,
    /// Add the value unless already present (case-insensitive)
    Union,
}

/// Addressable profile field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Location,
    FarmSize,
    Experience,
    BudgetRange,
    Crops,
    Interests,
    FarmingMethods,
    Concerns,
    Equipment,
}

impl ProfileField {
    pub const ALL: [ProfileField; 10] = [
        ProfileField::Name,
        ProfileField::Location,
        ProfileField::FarmSize,
        ProfileField::Experience,
        ProfileField::BudgetRange,
        ProfileField::Crops,
        ProfileField::Interests,
        ProfileField::FarmingMethods,
        ProfileField::Concerns,
        ProfileField::Equipment,
    ];

    /// Merge policy table
    pub fn policy(self) -> MergePolicy {
        match self {
            ProfileField::Name
            | ProfileField::Location
            | ProfileField::FarmSize
            | ProfileField::Experience
            | ProfileField::BudgetRange => MergePolicy::FirstWriteWins,
            ProfileField::Crops
            | ProfileField::Interests
            | ProfileField::FarmingMethods
            | ProfileField::Concerns
            | ProfileField::Equipment => MergePolicy::Union,
        }
    }
}

/// Facts extracted from one exchange, keyed by profile field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContext(BTreeMap<ProfileField, Vec<String>>);

impl ExtractedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `field`; blank values are ignored
    pub fn insert(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let values = self.0.entry(field).or_default();
        if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            values.push(value.to_string());
        }
    }

    /// Builder form of `insert`
    pub fn with(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: ProfileField) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &String)> {
        self.0
            .iter()
            .flat_map(|(field, values)| values.iter().map(move |v| (*field, v)))
    }

    /// Explicit slots of a planning request
    pub fn from_planning_context(context: &PlanningContext) -> Self {
        let mut extracted = Self::new();
        let slots = [
            (ProfileField::Location, &context.location),
            (ProfileField::FarmSize, &context.farm_size),
            (ProfileField::Experience, &context.experience),
            (ProfileField::BudgetRange, &context.budget),
        ];
        for (field, slot) in slots {
            if let Some(value) = slot {
                extracted.insert(field, value.as_str());
            }
        }
        if let Some(crops) = &context.crop_type {
            for crop in crops.split(',') {
                extracted.insert(ProfileField::Crops, crop);
            }
        }
        extracted
    }
}

/// Accumulated farmer profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub farm_size: Option<String>,
    pub experience: Option<String>,
    pub budget_range: Option<String>,
    pub crops: Vec<String>,
    pub interests: Vec<String>,
    pub farming_methods: Vec<String>,
    pub concerns: Vec<String>,
    pub equipment: Vec<String>,
}

impl FarmerProfile {
    /// Merge one value into `field` according to its policy
    pub fn merge(&mut self, field: ProfileField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        match field.policy() {
            MergePolicy::FirstWriteWins => {
                let slot = self.scalar_mut(field);
                if slot.is_none() {
                    *slot = Some(value.to_string());
                }
            }
            MergePolicy::Union => {
                let list = self.list_mut(field);
                if !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                    list.push(value.to_string());
                }
            }
        }
    }

    /// Merge every value in `extracted`
    pub fn apply(&mut self, extracted: &ExtractedContext) {
        for (field, value) in extracted.iter() {
            self.merge(field, value);
        }
    }

    /// Profile facts as planning slots
    pub fn to_planning_context(&self) -> PlanningContext {
        PlanningContext {
            location: self.location.clone(),
            crop_type: (!self.crops.is_empty()).then(|| self.crops.join(", ")),
            farm_size: self.farm_size.clone(),
            budget: self.budget_range.clone(),
            experience: self.experience.clone(),
            resources: (!self.equipment.is_empty()).then(|| self.equipment.join(", ")),
            ..Default::default()
        }
    }

    fn scalar_mut(&mut self, field: ProfileField) -> &mut Option<String> {
        match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Location => &mut self.location,
            ProfileField::FarmSize => &mut self.farm_size,
            ProfileField::Experience => &mut self.experience,
            _ => &mut self.budget_range,
        }
    }

    fn list_mut(&mut self, field: ProfileField) -> &mut Vec<String> {
        match field {
            ProfileField::Crops => &mut self.crops,
            ProfileField::Interests => &mut self.interests,
            ProfileField::FarmingMethods => &mut self.farming_methods,
            ProfileField::Concerns => &mut self.concerns,
            _ => &mut self.equipment,
        }
    }
}
