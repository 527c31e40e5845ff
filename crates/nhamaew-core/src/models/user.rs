use serde::{Deserialize, Serialize};

/// Profile stored by the pet store backend for a LINE user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct LineProfile {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub picture_url: String,
    pub status_message: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    Unspecified,
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Unspecified => "",
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "N",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "M" | "m" => Gender::Male,
            "F" | "f" => Gender::Female,
            "N" | "n" => Gender::Other,
            _ => Gender::Unspecified,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Unspecified => "ไม่ระบุ",
            Gender::Male => "ชาย",
            Gender::Female => "หญิง",
            Gender::Other => "อื่นๆ",
        }
    }
}

/// Body for `register-update-profile`. `None` fields are left out of the
/// request so they do not overwrite what the backend already has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub line_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_omits_none_fields() {
        let update = ProfileUpdate {
            line_user_id: "U1".into(),
            gender: Some(Gender::Female.code().into()),
            ..ProfileUpdate::default()
        };
        let body = serde_json::to_value(&update).expect("serialize update");
        let obj = body.as_object().expect("object body");
        assert_eq!(obj.len(), 2);
        assert_eq!(body["gender"], "F");
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("M"), Gender::Male);
        assert_eq!(Gender::from_code(""), Gender::Unspecified);
        assert_eq!(Gender::Other.code(), "N");
    }
}
