use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel entry in a visibility list meaning "every authenticated user".
pub const VISIBLE_TO_ALL: &str = "ALL";

pub fn now_stamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Principal,
    Teacher,
    Student,
}

impl Role {
    /// Role tags compare case-insensitively everywhere ("admin" == "ADMIN").
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "PRINCIPAL" => Some(Role::Principal),
            "TEACHER" => Some(Role::Teacher),
            "STUDENT" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Principal => "PRINCIPAL",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }

    /// Subdirectory of uploads/ that receives this role's files.
    pub fn upload_dir(role: &str) -> &'static str {
        match role.trim().to_ascii_lowercase().as_str() {
            "admin" => "admin",
            "teacher" => "teachers",
            "student" => "students",
            _ => "others",
        }
    }
}

/// Metadata for one uploaded file. Append-only: records are never mutated
/// after creation, and the visibility list is a frozen snapshot of what the
/// uploader chose at upload time (it is not recomputed against live rosters).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: i64,
    pub file_name: String,
    pub uploaded_by: String,
    pub role: String,
    pub file_path: String,
    pub timestamp: String,
    pub file_size: i64,
    /// Explicit viewer emails, or the "ALL" sentinel. Empty means private
    /// (owner and admins only). Order and duplicates are preserved as given.
    #[serde(default)]
    pub visible_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Stored as plaintext; never echoed in query responses.
    #[serde(default)]
    pub password: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default)]
    pub enrolled_courses: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub credit_hours: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_times: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_dates: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: i64,
    pub from_user_id: String,
    pub from_user_name: String,
    pub from_role: String,
    pub to_user_id: String,
    pub to_user_name: String,
    pub to_role: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub course_id: String,
    pub teacher_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: i64,
    pub assignment_id: i64,
    pub student_id: String,
    pub file_name: String,
    pub file_path: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub student_id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub grade: String,
}
