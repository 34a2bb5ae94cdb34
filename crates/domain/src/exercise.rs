use std::{fmt, str::FromStr};

use derive_more::{Deref, Display as DeriveDisplay};
use log::debug;
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub id: ExerciseID,
    pub name: String,
    pub body_part: BodyPart,
    pub target: String,
    pub equipment: String,
    pub secondary_muscles: Vec<String>,
    pub instructions: Vec<String>,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
}

impl Exercise {
    /// Case-insensitive substring match over name, target and equipment.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        [&self.name, &self.target, &self.equipment]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

#[derive(Deref, DeriveDisplay, Debug, Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExerciseID(String);

impl AsRef<str> for ExerciseID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ExerciseID {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_string())
    }
}

impl From<&str> for ExerciseID {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExerciseID {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(
    AsRefStr, Display, EnumString, EnumIter, Debug, Default, Clone, Copy, Hash, PartialEq, Eq,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BodyPart {
    Back,
    #[default]
    Cardio,
    Chest,
    #[strum(serialize = "lower arms")]
    LowerArms,
    #[strum(serialize = "lower legs")]
    LowerLegs,
    Neck,
    Shoulders,
    #[strum(serialize = "upper arms")]
    UpperArms,
    #[strum(serialize = "upper legs")]
    UpperLegs,
    Waist,
}

impl BodyPart {
    /// Unknown values map to the default variant to tolerate new values sent by the API.
    #[must_use]
    pub fn from_name(value: &str) -> Self {
        parse_or_default(value, "body part")
    }
}

#[derive(AsRefStr, Display, EnumString, Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn from_name(value: &str) -> Self {
        parse_or_default(value, "difficulty")
    }
}

#[derive(AsRefStr, Display, EnumString, Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    #[default]
    Strength,
    Cardio,
    Mobility,
    Balance,
    Stretching,
    Plyometrics,
    Rehabilitation,
}

impl Category {
    #[must_use]
    pub fn from_name(value: &str) -> Self {
        parse_or_default(value, "category")
    }
}

fn parse_or_default<T: FromStr + Default + fmt::Display>(value: &str, kind: &str) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        let default = T::default();
        debug!("unknown {kind} \"{value}\", falling back to \"{default}\"");
        default
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case("back", BodyPart::Back)]
    #[case("lower arms", BodyPart::LowerArms)]
    #[case("Upper Legs", BodyPart::UpperLegs)]
    #[case(" waist ", BodyPart::Waist)]
    #[case("tail", BodyPart::Cardio)]
    #[case("", BodyPart::Cardio)]
    fn test_body_part_from_name(#[case] value: &str, #[case] expected: BodyPart) {
        assert_eq!(BodyPart::from_name(value), expected);
    }

    #[rstest]
    #[case("beginner", Difficulty::Beginner)]
    #[case("ADVANCED", Difficulty::Advanced)]
    #[case("expert", Difficulty::Beginner)]
    fn test_difficulty_from_name(#[case] value: &str, #[case] expected: Difficulty) {
        assert_eq!(Difficulty::from_name(value), expected);
    }

    #[rstest]
    #[case("plyometrics", Category::Plyometrics)]
    #[case("Rehabilitation", Category::Rehabilitation)]
    #[case("yoga", Category::Strength)]
    fn test_category_from_name(#[case] value: &str, #[case] expected: Category) {
        assert_eq!(Category::from_name(value), expected);
    }

    #[test]
    fn test_body_part_names_parse_back() {
        for body_part in BodyPart::iter() {
            assert_eq!(BodyPart::from_name(body_part.as_ref()), body_part);
        }
        assert_eq!(BodyPart::UpperArms.to_string(), "upper arms");
    }

    #[test]
    fn test_exercise_id_trimmed() {
        assert_eq!(ExerciseID::from(" 0001 ").as_str(), "0001");
        assert_eq!(ExerciseID::from("0001".to_string()), ExerciseID::new("0001"));
    }

    #[rstest]
    #[case("squat", true)]
    #[case("SQUAT", true)]
    #[case("glutes", true)]
    #[case("barbell", true)]
    #[case("  Bar ", true)]
    #[case("", true)]
    #[case("chest", false)]
    #[case("upper legs", false)]
    fn test_exercise_matches(#[case] query: &str, #[case] expected: bool) {
        let exercise = Exercise {
            id: "0043".into(),
            name: "Barbell Full Squat".to_string(),
            body_part: BodyPart::UpperLegs,
            target: "glutes".to_string(),
            equipment: "barbell".to_string(),
            secondary_muscles: vec!["quadriceps".to_string()],
            instructions: vec![],
            description: String::new(),
            difficulty: Difficulty::Intermediate,
            category: Category::Strength,
        };
        assert_eq!(exercise.matches(query), expected);
    }
}
