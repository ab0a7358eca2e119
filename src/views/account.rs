//! Login and registration forms

use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::Session;
use crate::binder::SessionBinder;
use crate::error::Error;

pub const LOGIN_SUCCESS: &str = "登录成功！";
pub const LOGIN_FAILURE: &str = "登录失败，请稍后再试。";
pub const REGISTER_SUCCESS: &str = "注册成功！请检查您的邮箱以确认帐户。";
pub const REGISTER_FAILURE: &str = "注册失败，请稍后再试。";

/// Feedback shown under a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    pub submitting: bool,
    pub message: Option<String>,
    /// Route to navigate to after a successful submit
    pub redirect: Option<&'static str>,
}

/// Message to show for a failed submit. Provider and validation messages
/// are shown as they are; anything else gets `fallback`.
fn failure_message(err: &Error, fallback: &str) -> String {
    match err {
        Error::Auth(msg) if !msg.trim().is_empty() => msg.clone(),
        Error::Invalid(msg) => msg.to_string(),
        _ => fallback.to_string(),
    }
}

fn required(value: &str, message: &'static str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::Invalid(message));
    }
    Ok(())
}

fn is_email(value: &str) -> bool {
    let (local, domain) = match value.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    !local.is_empty()
        && !value.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Mainland mobile number: `1`, then `3`-`9`, then nine digits
fn is_phone(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 11
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
        && bytes.iter().all(u8::is_ascii_digit)
}

/// Controller of the login page
pub struct LoginView {
    binder: Arc<SessionBinder>,
    state: Mutex<FormSnapshot>,
}

impl LoginView {
    pub fn mount(binder: Arc<SessionBinder>) -> Self {
        Self {
            binder,
            state: Mutex::new(FormSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        self.state.lock().await.clone()
    }

    /// Sign in with `email` and `password`. Provider errors come back
    /// unchanged.
    pub async fn submit(&self, email: &str, password: &str) -> Result<Session, Error> {
        let result = async {
            required(email, "请输入用户名或邮箱!")?;
            required(password, "请输入密码!")?;
            self.state.lock().await.submitting = true;
            self.binder.sign_in(email.trim(), password).await
        }
        .await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        match &result {
            Ok(_) => {
                info!("Signed in as {}", email.trim());
                state.message = Some(LOGIN_SUCCESS.to_string());
                state.redirect = Some("/");
            }
            Err(e) => {
                error!("Login error: {}", e);
                state.message = Some(failure_message(e, LOGIN_FAILURE));
                state.redirect = None;
            }
        }
        result
    }
}

/// Fields of the registration form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check every field; the first failing rule wins
    pub fn validate(&self) -> Result<(), Error> {
        required(&self.username, "请输入用户名!")?;
        if self.username.trim().chars().count() < 3 {
            return Err(Error::Invalid("用户名至少3个字符!"));
        }
        required(&self.email, "请输入邮箱!")?;
        if !is_email(self.email.trim()) {
            return Err(Error::Invalid("请输入有效的邮箱地址!"));
        }
        required(&self.phone, "请输入手机号!")?;
        if !is_phone(self.phone.trim()) {
            return Err(Error::Invalid("请输入有效的手机号!"));
        }
        required(&self.password, "请输入密码!")?;
        if self.password.chars().count() < 6 {
            return Err(Error::Invalid("密码至少6个字符!"));
        }
        required(&self.confirm_password, "请确认密码!")?;
        if self.password != self.confirm_password {
            return Err(Error::Invalid("两次输入的密码不一致!"));
        }
        Ok(())
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    /// The provider waits for the address to be confirmed
    ConfirmEmail,
    /// The provider signed the new user in right away
    SignedIn(Session),
}

impl RegisterOutcome {
    pub fn message(&self) -> &'static str {
        REGISTER_SUCCESS
    }
}

/// Controller of the registration page
pub struct RegisterView {
    binder: Arc<SessionBinder>,
    state: Mutex<FormSnapshot>,
}

impl RegisterView {
    pub fn mount(binder: Arc<SessionBinder>) -> Self {
        Self {
            binder,
            state: Mutex::new(FormSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        self.state.lock().await.clone()
    }

    /// Register the account described by `form`. Only the email and the
    /// password are sent to the provider.
    pub async fn submit(&self, form: &RegisterForm) -> Result<RegisterOutcome, Error> {
        let result = async {
            form.validate()?;
            self.state.lock().await.submitting = true;
            let session = self.binder.sign_up(form.email.trim(), &form.password).await?;
            Ok(match session {
                Some(session) => RegisterOutcome::SignedIn(session),
                None => RegisterOutcome::ConfirmEmail,
            })
        }
        .await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        match &result {
            Ok(outcome) => {
                info!("Registered {}", form.email.trim());
                state.message = Some(outcome.message().to_string());
                state.redirect = Some("/login");
            }
            Err(e) => {
                error!("Registration error: {}", e);
                state.message = Some(failure_message(e, REGISTER_FAILURE));
                state.redirect = None;
            }
        }
        result
    }
}
