use rocket::Route;

mod auth;
mod common;
mod diagnostics;
mod group;
mod imports;
mod poll;
mod public;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(public::routes());
    routes.extend(group::routes());
    routes.extend(poll::routes());
    routes.extend(imports::routes());
    routes.extend(diagnostics::routes());
    routes
}
