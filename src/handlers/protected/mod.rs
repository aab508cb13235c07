// Bearer-JWT handlers; `AuthUser` is inserted by middleware::auth
pub mod auth;
pub mod data;
pub mod procedure;
pub mod two_factor;
pub mod upload;
