use crate::auth::{self, Field};
use crate::user::model::{Gender, User};
use crate::{clock, user};

#[derive(Clone, Debug, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: Gender,
    pub date_of_birth: String,
    pub university: String,
    pub degree: String,
    pub semester: String,
}

impl SignUpForm {
    /// Every problem with the form, by field.
    pub fn validate(&self) -> Vec<(Field, String)> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push((Field::Name, "Name is required".to_string()));
        }

        if self.email.trim().is_empty() {
            errors.push((Field::Email, "Email is required".to_string()));
        } else if auth::validate_email(&self.email).is_err() {
            errors.push((Field::Email, "Please enter a valid email address".to_string()));
        }

        if self.password.is_empty() {
            errors.push((Field::Password, "Password is required".to_string()));
        } else if auth::validate_password(&self.password).is_err() {
            errors.push((
                Field::Password,
                format!(
                    "Password must be at least {} characters",
                    auth::MIN_PASSWORD_LEN
                ),
            ));
        }

        if self.password != self.confirm_password {
            errors.push((Field::ConfirmPassword, "Passwords do not match".to_string()));
        }

        errors
    }

    pub fn into_user(self, uid: user::Id) -> User {
        let mut user = User::new(uid, self.name.trim(), self.email.trim());
        user.gender = self.gender;
        user.date_of_birth = self.date_of_birth;
        user.university = self.university;
        user.degree = self.degree;
        user.semester = self.semester;
        user.created_at = Some(clock::now());
        user
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Vec<(Field, String)> {
    let mut errors = Vec::new();
    if email.trim().is_empty() {
        errors.push((Field::Email, "Email is required".to_string()));
    }
    if password.is_empty() {
        errors.push((Field::Password, "Password is required".to_string()));
    }
    errors
}

#[cfg(test)]
mod test {
    use super::*;

    fn form() -> SignUpForm {
        SignUpForm {
            name: "Jora".into(),
            email: "jora@focushub.app".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn should_accept_valid_form() {
        assert!(form().validate().is_empty());
    }

    #[test]
    fn should_collect_every_field_error() {
        let invalid = SignUpForm {
            name: " ".into(),
            email: "jora".into(),
            password: "123".into(),
            confirm_password: "1234".into(),
            ..Default::default()
        };

        let fields = invalid
            .validate()
            .into_iter()
            .map(|(f, _)| f)
            .collect::<Vec<_>>();

        assert_eq!(
            fields,
            vec![
                Field::Name,
                Field::Email,
                Field::Password,
                Field::ConfirmPassword
            ]
        );
    }

    #[test]
    fn should_require_credentials() {
        assert_eq!(validate_credentials("", "").len(), 2);
        assert!(validate_credentials("jora@focushub.app", "x").is_empty());
    }
}
