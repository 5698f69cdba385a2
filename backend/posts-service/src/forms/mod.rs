/// HTML form handling
///
/// Forms turn raw submitted strings into validated values or a `FormErrors`
/// map keyed by field name. Raw values are kept so a rejected form can be
/// re-rendered with what the user typed.
pub mod submission;

pub use submission::{read_post_submission, Upload};

use serde::Deserialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

use crate::models::{Group, Post};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const USERNAME_MAX_CHARS: u64 = 150;
pub const IMAGE_NAME_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: u64 = 8;

/// Key for errors not tied to a single field.
pub const NON_FIELD: &str = "__all__";

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages for one field, empty when it is valid.
    pub fn field(&self, field: &str) -> Vec<String> {
        self.0.get(field).cloned().unwrap_or_default()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.field(NON_FIELD)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let field = field.to_string();
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// Option of the group `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChoice {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Build select options, marking the group whose id matches `selected`.
pub fn group_choices(groups: &[Group], selected: &str) -> Vec<GroupChoice> {
    groups
        .iter()
        .map(|g| GroupChoice {
            id: g.id,
            title: g.title.clone(),
            selected: selected == g.id.to_string(),
        })
        .collect()
}

/// Submitted post fields, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFormData {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: String,
    #[serde(skip)]
    pub image: Option<Upload>,
}

impl PostFormData {
    /// Prefill from a stored post for the edit page.
    pub fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
            image: None,
        }
    }
}

/// A validated image upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A validated post.
#[derive(Debug, Clone)]
pub struct ValidPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ImageUpload>,
}

pub struct PostForm;

impl PostForm {
    /// Validate against the groups that exist right now.
    pub fn validate(
        data: &PostFormData,
        groups: &[Group],
        max_upload_bytes: usize,
    ) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = data.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_raw = data.group.trim();
        let group_id = if group_raw.is_empty() {
            None
        } else {
            match group_raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            }
        };

        let image = match &data.image {
            Some(upload) if !upload.is_empty() => match validate_image(upload, max_upload_bytes) {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            _ => None,
        };

        errors.into_result(ValidPost {
            text: text.to_string(),
            group_id,
            image,
        })
    }
}

fn validate_image(upload: &Upload, max_upload_bytes: usize) -> Result<ImageUpload, String> {
    if upload.bytes.len() > max_upload_bytes {
        return Err(format!(
            "Ensure this file is at most {} bytes (it is {} bytes).",
            max_upload_bytes,
            upload.bytes.len()
        ));
    }
    if upload.filename.trim().is_empty() {
        return Err("No file was submitted. Check the encoding type on the form.".to_string());
    }
    let name_chars = upload.filename.chars().count();
    if name_chars > IMAGE_NAME_MAX_CHARS {
        return Err(format!(
            "Ensure this filename has at most {} characters (it has {}).",
            IMAGE_NAME_MAX_CHARS, name_chars
        ));
    }

    let format = image::guess_format(&upload.bytes).map_err(|_| INVALID_IMAGE.to_string())?;
    image::io::Reader::with_format(std::io::Cursor::new(&upload.bytes), format)
        .into_dimensions()
        .map_err(|_| INVALID_IMAGE.to_string())?;

    Ok(ImageUpload {
        filename: upload.filename.clone(),
        bytes: upload.bytes.clone(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentFormData {
    #[serde(default)]
    pub text: String,
}

pub struct CommentForm;

impl CommentForm {
    /// Returns the stripped comment text.
    pub fn validate(data: &CommentFormData) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = data.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(text.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Enter a username of at most 150 characters."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Cleaned signup values.
#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    /// Checks everything except username uniqueness, which needs the store.
    pub fn clean(&self) -> Result<ValidSignup, FormErrors> {
        let trimmed = SignupForm {
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password1: self.password1.clone(),
            password2: self.password2.clone(),
        };

        let mut errors = match trimmed.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        if trimmed.username.is_empty() {
            errors = without(errors, "username");
            errors.add("username", REQUIRED);
        } else if !trimmed.username.chars().all(is_username_char) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if trimmed.password1.is_empty() {
            errors = without(errors, "password1");
            errors.add("password1", REQUIRED);
        } else if trimmed.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "This password is entirely numeric.");
        }
        if trimmed.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if trimmed.password1 != trimmed.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        let SignupForm {
            username,
            first_name,
            last_name,
            email,
            password1,
            ..
        } = trimmed;
        errors.into_result(ValidSignup {
            username,
            first_name,
            last_name,
            email,
            password: password1,
        })
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn without(mut errors: FormErrors, field: &str) -> FormErrors {
    errors.0.remove(field);
    errors
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn groups() -> Vec<Group> {
        vec![Group {
            id: 7,
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        }]
    }

    fn data(text: &str, group: &str) -> PostFormData {
        PostFormData {
            text: text.to_string(),
            group: group.to_string(),
            image: None,
        }
    }

    #[test]
    fn post_text_is_required() {
        let errors = PostForm::validate(&data("   ", ""), &groups(), 1024).unwrap_err();
        assert_eq!(errors.field("text"), vec![REQUIRED.to_string()]);
        assert!(errors.field("group").is_empty());
    }

    #[test]
    fn post_group_must_exist() {
        let errors = PostForm::validate(&data("hi", "99"), &groups(), 1024).unwrap_err();
        assert_eq!(errors.field("group"), vec![INVALID_CHOICE.to_string()]);

        let valid = PostForm::validate(&data("  hi  ", "7"), &groups(), 1024).unwrap();
        assert_eq!(valid.text, "hi");
        assert_eq!(valid.group_id, Some(7));

        let no_group = PostForm::validate(&data("hi", ""), &groups(), 1024).unwrap();
        assert_eq!(no_group.group_id, None);
    }

    #[test]
    fn post_image_must_be_an_image() {
        let mut submitted = data("hi", "");
        submitted.image = Some(Upload {
            filename: "notes.txt".to_string(),
            bytes: b"plain text".to_vec(),
        });
        let errors = PostForm::validate(&submitted, &groups(), 1024).unwrap_err();
        assert_eq!(errors.field("image"), vec![INVALID_IMAGE.to_string()]);

        submitted.image = Some(Upload {
            filename: "small.gif".to_string(),
            bytes: SMALL_GIF.to_vec(),
        });
        let valid = PostForm::validate(&submitted, &groups(), 1024).unwrap();
        assert_eq!(valid.image.map(|i| i.filename), Some("small.gif".to_string()));
    }

    #[test]
    fn oversized_image_rejected() {
        let mut submitted = data("hi", "");
        submitted.image = Some(Upload {
            filename: "small.gif".to_string(),
            bytes: SMALL_GIF.to_vec(),
        });
        let errors = PostForm::validate(&submitted, &groups(), 10).unwrap_err();
        assert!(errors.has("image"));
    }

    #[test]
    fn long_image_filename_rejected() {
        let mut submitted = data("hi", "");
        submitted.image = Some(Upload {
            filename: format!("{}.gif", "b".repeat(296)),
            bytes: SMALL_GIF.to_vec(),
        });
        let errors = PostForm::validate(&submitted, &groups(), 1024).unwrap_err();
        assert_eq!(
            errors.field("image"),
            vec!["Ensure this filename has at most 100 characters (it has 300).".to_string()]
        );

        submitted.image = Some(Upload {
            filename: format!("{}.gif", "b".repeat(96)),
            bytes: SMALL_GIF.to_vec(),
        });
        assert!(PostForm::validate(&submitted, &groups(), 1024).is_ok());
    }

    #[test]
    fn comment_text_is_stripped_and_required() {
        let text = CommentForm::validate(&CommentFormData {
            text: " nice ".to_string(),
        })
        .unwrap();
        assert_eq!(text, "nice");
        assert!(CommentForm::validate(&CommentFormData::default()).is_err());
    }

    fn signup(username: &str, p1: &str, p2: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            password1: p1.to_string(),
            password2: p2.to_string(),
            ..SignupForm::default()
        }
    }

    #[test]
    fn signup_rules() {
        assert!(signup("leo.t+1@x_y-z", "war-and-peace", "war-and-peace")
            .clean()
            .is_ok());

        let errors = signup("bad name", "12345678", "12345679").clean().unwrap_err();
        assert!(errors.has("username"));
        assert_eq!(
            errors.field("password1"),
            vec!["This password is entirely numeric.".to_string()]
        );
        assert!(errors.has("password2"));

        let errors = signup("leo", "short", "short").clean().unwrap_err();
        assert_eq!(errors.field("password1").len(), 1);

        let errors = signup("", "", "").clean().unwrap_err();
        assert_eq!(errors.field("username"), vec![REQUIRED.to_string()]);
        assert_eq!(errors.field("password1"), vec![REQUIRED.to_string()]);

        let long = "a".repeat(151);
        assert!(signup(&long, "war-and-peace", "war-and-peace")
            .clean()
            .unwrap_err()
            .has("username"));
    }

    #[test]
    fn next_must_be_local_path() {
        assert_eq!(safe_next(Some("/create/")), Some("/create/".to_string()));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn choices_mark_selected() {
        let choices = group_choices(&groups(), "7");
        assert!(choices[0].selected);
        assert!(!group_choices(&groups(), "")[0].selected);
    }
}
