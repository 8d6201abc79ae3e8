use crate::client::error::ApiError;
use serde::Serialize;

pub use crate::client::models::session::SessionUser as UserProfile;

/// Gender as the profile endpoint spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
    None,
}

impl Gender {
    /// Maps the labels forms produce (`M`, `F`, `N`, full words) to the wire value.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "M" | "Male" | "male" | "남성" => Some(Gender::Male),
            "F" | "Female" | "female" | "여성" => Some(Gender::Female),
            "N" | "None" | "none" | "상관없음" | "무관" | "선택안함" => Some(Gender::None),
            _ => None,
        }
    }
}

/// Digits of a grade label such as `"3학년"` or `"grade 2"`.
pub fn parse_grade(label: &str) -> Option<u32> {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Body of `PUT /api/auth/profile/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub grade: u32,
    pub gender: Gender,
    pub nickname: String,
}

impl ProfileUpdate {
    /// Validates raw form input; grade, gender and nickname are all required.
    pub fn from_form(grade: &str, gender: &str, nickname: &str) -> Result<Self, ApiError> {
        let grade = parse_grade(grade).filter(|g| *g > 0);
        let gender = Gender::from_label(gender);
        let nickname = nickname.trim();
        match (grade, gender) {
            (Some(grade), Some(gender)) if !nickname.is_empty() => {
                Ok(Self { grade, gender, nickname: nickname.to_string() })
            }
            _ => Err(ApiError::Validation("grade, gender and nickname are all required".to_string())),
        }
    }
}
