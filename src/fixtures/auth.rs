use crate::dom::{DomQuery, NamePattern};
use crate::error::{Error, Result};
use crate::resolver::{LookupSpec, Resolver};
use std::fmt;
use std::time::Duration;

pub const EMAIL_VAR: &str = "E2E_USER_EMAIL";
pub const PASSWORD_VAR: &str = "E2E_USER_PASSWORD";

/// Login credentials for the account under test
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `E2E_USER_EMAIL` and `E2E_USER_PASSWORD`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(EMAIL_VAR, PASSWORD_VAR)
    }

    /// Read credentials from the named environment variables
    pub fn from_vars(email_var: &str, password_var: &str) -> Result<Self> {
        let read = |name: &str| std::env::var(name).map_err(|_| Error::MissingCredential(name.to_string()));
        Ok(Self::new(read(email_var)?, read(password_var)?))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub fn email_field() -> LookupSpec {
    LookupSpec::any_of([
        LookupSpec::test_id("email-input"),
        LookupSpec::role("textbox", NamePattern::contains("email")),
        LookupSpec::css([r#"input[type="email"]"#, r#"input[name="email"]"#, "#email"]),
    ])
}

pub fn password_field() -> LookupSpec {
    LookupSpec::any_of([
        LookupSpec::test_id("password-input"),
        LookupSpec::role("textbox", NamePattern::contains("password")),
        LookupSpec::css([r#"input[type="password"]"#, r#"input[name="password"]"#, "#password"]),
    ])
}

pub fn submit_button() -> LookupSpec {
    LookupSpec::any_of([
        LookupSpec::test_id("login-submit"),
        LookupSpec::role("button", NamePattern::contains("sign in")),
        LookupSpec::role("button", NamePattern::contains("log in")),
        LookupSpec::role("button", NamePattern::contains("login")),
        LookupSpec::css([r#"button[type="submit"]"#]),
    ])
}

/// Fill and submit the login form on the current page.
///
/// Overlays are swept first. Each field gets the full `budget`.
pub fn sign_in<D: DomQuery>(resolver: &Resolver, dom: &D, credentials: &Credentials, budget: Duration) -> Result<()> {
    let swept = resolver.dismiss_transient_overlays(dom);
    if !swept.is_noop() {
        log::debug!(
            "Dismissed {} overlay(s) before sign-in, {} left",
            swept.dismissed.len(),
            swept.undismissed.len()
        );
    }

    let email = resolver.resolve(dom, &email_field(), budget)?;
    let password = resolver.resolve(dom, &password_field(), budget)?;

    dom.fill(&email, &credentials.email)?;
    dom.fill(&password, &credentials.password)?;

    let submit = resolver.resolve(dom, &submit_button(), budget)?;
    dom.click(&submit)?;

    log::info!("Submitted sign-in form for {}", credentials.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode, NodeRef};
    use crate::resolver::ResolverOptions;

    fn resolver() -> Resolver {
        Resolver::new(ResolverOptions::new().poll_interval(Duration::from_millis(2)))
    }

    fn login_page() -> DomTree {
        let form = ElementNode::new("form")
            .with_child(ElementNode::new("input").with_attr("type", "email").with_attr("placeholder", "Email address"))
            .with_child(ElementNode::new("input").with_attr("type", "password").with_attr("id", "pw"))
            .with_child(ElementNode::new("button").with_attr("type", "submit").with_text("Sign in"));

        let promo = ElementNode::new("div")
            .with_attr("class", "popup")
            .with_child(ElementNode::new("button").with_attr("data-dismiss", "popup").with_text("No thanks"));

        DomTree::new(ElementNode::new("body").with_child(form).with_child(promo))
    }

    #[test]
    fn test_sign_in_fills_and_submits() {
        let dom = login_page();
        let credentials = Credentials::new("qa@example.com", "hunter2");

        sign_in(&resolver(), &dom, &credentials, Duration::from_millis(50)).unwrap();

        let form = NodeRef::root().child(0);
        assert_eq!(dom.value_of(&form.child(0)).as_deref(), Some("qa@example.com"));
        assert_eq!(dom.value_of(&dom.find_by_id("pw").unwrap()).as_deref(), Some("hunter2"));

        // popup dismissal, then submit
        let clicks = dom.clicks();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[1], form.child(2));
    }

    #[test]
    fn test_missing_form_is_element_not_found() {
        let dom = DomTree::new(ElementNode::new("body").with_child(ElementNode::new("p").with_text("Welcome back")));
        let err = sign_in(&resolver(), &dom, &Credentials::new("a", "b"), Duration::ZERO).unwrap_err();

        match err {
            Error::Resolve(err) => assert_eq!(err.attempts().len(), 5),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_env_var() {
        let err = Credentials::from_vars("E2E_KIT_SURELY_UNSET_EMAIL", "E2E_KIT_SURELY_UNSET_PASSWORD").unwrap_err();
        assert!(matches!(err, Error::MissingCredential(name) if name == "E2E_KIT_SURELY_UNSET_EMAIL"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("qa@example.com", "hunter2"));
        assert!(debug.contains("qa@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
