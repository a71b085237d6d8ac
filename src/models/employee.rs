use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub designation: String,
    pub gender: String,
    pub courses: Vec<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully specified employee, ready to be inserted.
#[derive(Debug, Clone, Validate)]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 32))]
    pub mobile: String,
    #[validate(length(min = 1, max = 100))]
    pub designation: String,
    #[validate(length(min = 1, max = 32))]
    pub gender: String,
    #[validate(length(min = 1), custom = "validate_courses")]
    pub courses: Vec<String>,
    pub image: Option<String>,
}

/// Incoming employee fields. Absent fields are `None`; on update they keep
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct EmployeeChanges {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub mobile: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub designation: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    #[validate(length(min = 1), custom = "validate_courses")]
    pub courses: Option<Vec<String>>,
    // Only ever set from an uploaded file part.
    #[serde(skip)]
    pub image: Option<String>,
}

impl EmployeeChanges {
    /// Trims every value and turns blank strings into absent fields. Blank
    /// course entries are dropped, and an empty course list counts as absent.
    pub fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
            email: non_blank(self.email),
            mobile: non_blank(self.mobile),
            designation: non_blank(self.designation),
            gender: non_blank(self.gender),
            courses: self.courses.and_then(|courses| {
                let courses: Vec<String> = courses
                    .into_iter()
                    .filter_map(|course| non_blank(Some(course)))
                    .collect();
                if courses.is_empty() {
                    None
                } else {
                    Some(courses)
                }
            }),
            image: non_blank(self.image),
        }
    }

    /// Converts into a [`NewEmployee`], or returns the names of the required
    /// fields that are missing.
    pub fn into_new_employee(self) -> Result<NewEmployee, Vec<&'static str>> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        if self.mobile.is_none() {
            missing.push("mobile");
        }
        if self.designation.is_none() {
            missing.push("designation");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if self.courses.is_none() {
            missing.push("courses");
        }

        match self {
            EmployeeChanges {
                name: Some(name),
                email: Some(email),
                mobile: Some(mobile),
                designation: Some(designation),
                gender: Some(gender),
                courses: Some(courses),
                image,
            } => Ok(NewEmployee {
                name,
                email,
                mobile,
                designation,
                gender,
                courses,
                image,
            }),
            _ => Err(missing),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_courses(courses: &[String]) -> Result<(), validator::ValidationError> {
    if courses.iter().any(|course| course.trim().is_empty()) {
        return Err(validator::ValidationError::new("blank_course"));
    }
    Ok(())
}

/// Accepts `"courses": ["a", "b"]` as well as a lone `"courses": "a"`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(course)) => Some(vec![course]),
        Some(OneOrMany::Many(courses)) => Some(courses),
        None => None,
    })
}
