pub mod alumni;
pub mod auth;
pub mod employment;
pub mod home;
pub mod json_error;
pub mod students;
pub mod system;
pub mod trash;
pub mod users;
