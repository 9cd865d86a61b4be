use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s]+$").expect("name regex");
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex");
}

const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if !NAME_RE.is_match(name) {
        return Err("name should contain only letters and spaces".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email cannot be empty".into());
    }
    if !EMAIL_RE.is_match(email) {
        return Err("email must be in valid format (e.g. user@domain.com)".into());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password cannot be empty".into());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), String> {
    if user_id.trim().is_empty() {
        return Err("user id cannot be empty".into());
    }
    if user_id.contains(char::is_whitespace) {
        return Err("user id cannot contain spaces".into());
    }
    Ok(())
}
