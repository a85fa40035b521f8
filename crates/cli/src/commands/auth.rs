//! Account commands.

use secrecy::SecretString;
use shopfront_storefront::Storefront;
use shopfront_storefront::forms::{LoginForm, SignupForm};
use shopfront_storefront::router::Route;

use super::{CliError, enter};
use crate::render;

pub async fn signup(
    shop: &Storefront,
    username: String,
    email: String,
    password: String,
) -> Result<(), CliError> {
    enter(shop, Route::Signup)?;
    let form = SignupForm {
        username,
        email,
        password: SecretString::from(password),
    };
    let message = shop.signup(&form).await?;
    render::line(&message);
    Ok(())
}

pub async fn login(shop: &Storefront, username: String, password: String) -> Result<(), CliError> {
    enter(shop, Route::Login)?;
    let form = LoginForm {
        username,
        password: SecretString::from(password),
    };
    let user = shop.login(&form).await?;
    render::line(&format!("Logged in as {}", user.username));
    if user.is_admin() {
        render::line("Staff tools are available: `shopfront admin --help`");
    }
    Ok(())
}

pub fn logout(shop: &Storefront) {
    if shop.session().is_authenticated() {
        shop.logout();
        render::line("Logged out");
    } else {
        render::line("Not logged in");
    }
}

pub fn whoami(shop: &Storefront) {
    match shop.session().auth_state().user() {
        Some(user) => render::user(user),
        None if shop.session().is_authenticated() => render::line("Logged in"),
        None => render::line("Not logged in"),
    }
}
